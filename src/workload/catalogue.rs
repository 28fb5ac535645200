//! Fixed mapping from workload to its command line and default problem size.

use super::{Command, WorkloadId};

/// Literal command for each workload. The first token is always
/// `WorkloadId::canonical_name`.
fn literal(id: WorkloadId) -> &'static str {
    match id {
        WorkloadId::Empty => "empty",
        WorkloadId::Fannkuch => "fannkuch 10",
        WorkloadId::Mandelbrot => "mandelbrot 2000",
        WorkloadId::Himeno => "himeno S",
        WorkloadId::Nbody => "nbody 10000000",
        WorkloadId::SpectralNorm => "spectralnorm 1000",
        WorkloadId::BinaryTrees => "binarytrees 10",
        WorkloadId::Fasta => "fasta 2500000",
        WorkloadId::Pidigits => "pidigits 1000",
    }
}

/// Command for a workload. Pure and total over `WorkloadId`.
pub fn command_for(id: WorkloadId) -> Command {
    Command::trusted(literal(id))
}
