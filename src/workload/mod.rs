//! Workload identifiers, command encoding and the in-process routine registry.
//!
//! A workload is addressed by a `WorkloadId`, encoded into a `Command` by the
//! catalogue, and executed either in-process through the `WorkloadRegistry` or
//! on the far side of an isolation boundary that runs the same registry.

pub mod catalogue;
pub mod command;
pub mod registry;
pub mod routines;

use std::fmt;
use std::str::FromStr;

use crate::BenchError;

pub use catalogue::command_for;
pub use command::Command;
pub use registry::{Routine, WorkloadRegistry};

/// The closed set of benchmark workloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WorkloadId {
    Empty,
    Fannkuch,
    Mandelbrot,
    Himeno,
    Nbody,
    SpectralNorm,
    BinaryTrees,
    Fasta,
    Pidigits,
}

impl WorkloadId {
    pub const ALL: [WorkloadId; 9] = [
        WorkloadId::Empty,
        WorkloadId::Fannkuch,
        WorkloadId::Mandelbrot,
        WorkloadId::Himeno,
        WorkloadId::Nbody,
        WorkloadId::SpectralNorm,
        WorkloadId::BinaryTrees,
        WorkloadId::Fasta,
        WorkloadId::Pidigits,
    ];

    /// Benchmark name used for selection and reporting (e.g. `spectral_norm`).
    pub fn bench_name(&self) -> &'static str {
        match self {
            WorkloadId::Empty => "empty",
            WorkloadId::Fannkuch => "fannkuch",
            WorkloadId::Mandelbrot => "mandelbrot",
            WorkloadId::Himeno => "himeno",
            WorkloadId::Nbody => "nbody",
            WorkloadId::SpectralNorm => "spectral_norm",
            WorkloadId::BinaryTrees => "binary_trees",
            WorkloadId::Fasta => "fasta",
            WorkloadId::Pidigits => "pidigits",
        }
    }

    /// Routine name as it appears in the first token of a command (e.g. `spectralnorm`).
    pub fn canonical_name(&self) -> &'static str {
        match self {
            WorkloadId::SpectralNorm => "spectralnorm",
            WorkloadId::BinaryTrees => "binarytrees",
            other => other.bench_name(),
        }
    }

    /// Parse either the benchmark name or the canonical command name.
    pub fn from_name(name: &str) -> Option<WorkloadId> {
        let name = name.trim();
        WorkloadId::ALL
            .into_iter()
            .find(|w| w.bench_name() == name || w.canonical_name() == name)
    }
}

impl fmt::Display for WorkloadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.bench_name())
    }
}

impl FromStr for WorkloadId {
    type Err = BenchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        WorkloadId::from_name(s)
            .ok_or_else(|| BenchError::Configuration(format!("unknown workload: {s}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_name_accepts_both_spellings() {
        assert_eq!(WorkloadId::from_name("spectral_norm"), Some(WorkloadId::SpectralNorm));
        assert_eq!(WorkloadId::from_name("spectralnorm"), Some(WorkloadId::SpectralNorm));
        assert_eq!(WorkloadId::from_name("binarytrees"), Some(WorkloadId::BinaryTrees));
        assert_eq!(WorkloadId::from_name("nope"), None);
    }

    #[test]
    fn test_from_str_unknown_is_configuration_error() {
        let err = "nope".parse::<WorkloadId>().unwrap_err();
        assert!(matches!(err, BenchError::Configuration(_)));
    }

    #[test]
    fn test_names_are_unique() {
        let mut names: Vec<&str> = WorkloadId::ALL.iter().map(|w| w.bench_name()).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), WorkloadId::ALL.len());
    }
}
