//! Optional TOML configuration for `enclave-bench run`.
//!
//! ```toml
//! platforms = ["host", "isolated-simulation"]
//! workloads = ["fannkuch", "spectral_norm"]
//! warmup = 2
//! iterations = 5
//! attestation = "dcap"
//! jsonl = "results/runs.jsonl"
//! csv = "results/runs.csv"
//! ```
//!
//! Every key is optional. Command-line flags win over the file.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::platform::{
    AttestationMode, HOST, ISOLATED_DEBUG, ISOLATED_SIMULATION, PlatformDescriptor,
    parse_platform_list,
};
use crate::workload::WorkloadId;
use crate::{BenchError, BenchResult};

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BenchConfig {
    #[serde(default)]
    pub platforms: Option<Vec<String>>,
    #[serde(default)]
    pub workloads: Option<Vec<String>>,
    #[serde(default)]
    pub warmup: Option<u32>,
    #[serde(default)]
    pub iterations: Option<u32>,
    #[serde(default)]
    pub attestation: Option<String>,
    #[serde(default)]
    pub jsonl: Option<PathBuf>,
    #[serde(default)]
    pub csv: Option<PathBuf>,
}

pub fn load_bench_config(path: &Path) -> BenchResult<BenchConfig> {
    let s = std::fs::read_to_string(path).map_err(|e| {
        BenchError::Configuration(format!("failed to read {}: {e}", path.display()))
    })?;
    parse_bench_config(&s)
}

pub fn parse_bench_config(s: &str) -> BenchResult<BenchConfig> {
    toml::from_str(s).map_err(|e| BenchError::Configuration(e.to_string()))
}

/// Settings for a run after merging CLI flags over the config file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedRun {
    pub platforms: Vec<PlatformDescriptor>,
    pub workloads: Vec<WorkloadId>,
    pub warmup: u32,
    pub iterations: u32,
    pub jsonl: Option<PathBuf>,
    pub csv: Option<PathBuf>,
}

/// Values given on the command line; `None` means "not given".
#[derive(Debug, Clone, Default)]
pub struct RunOverrides {
    pub platforms: Option<Vec<String>>,
    pub workloads: Option<Vec<String>>,
    pub warmup: Option<u32>,
    pub iterations: Option<u32>,
    pub attestation: Option<String>,
    pub jsonl: Option<PathBuf>,
    pub csv: Option<PathBuf>,
}

pub const DEFAULT_WARMUP: u32 = 2;
pub const DEFAULT_ITERATIONS: u32 = 5;
pub const DEFAULT_ATTESTATION: AttestationMode = AttestationMode::Dcap;

impl BenchConfig {
    /// Merge `cli` over this file config and validate the result.
    ///
    /// Platform ids are not checked here; an unknown id fails its own trials
    /// at setup. Workload names and the attestation mode must be valid.
    pub fn resolve(self, cli: RunOverrides) -> BenchResult<ResolvedRun> {
        let attestation = cli
            .attestation
            .or(self.attestation)
            .map(|s| s.parse::<AttestationMode>())
            .transpose()?
            .unwrap_or(DEFAULT_ATTESTATION);

        let platform_ids = cli.platforms.or(self.platforms).unwrap_or_else(|| {
            vec![
                HOST.to_string(),
                ISOLATED_SIMULATION.to_string(),
                ISOLATED_DEBUG.to_string(),
            ]
        });
        let platforms = parse_platform_list(&platform_ids.join(","), Some(attestation));

        let workloads = match cli.workloads.or(self.workloads) {
            None => WorkloadId::ALL.to_vec(),
            Some(names) => names
                .iter()
                .map(|n| n.trim().parse::<WorkloadId>())
                .collect::<BenchResult<Vec<_>>>()?,
        };

        let iterations = cli.iterations.or(self.iterations).unwrap_or(DEFAULT_ITERATIONS);
        if iterations == 0 {
            return Err(BenchError::Configuration(
                "iterations must be at least 1".into(),
            ));
        }
        if platforms.is_empty() {
            return Err(BenchError::Configuration("no platforms selected".into()));
        }
        if workloads.is_empty() {
            return Err(BenchError::Configuration("no workloads selected".into()));
        }

        Ok(ResolvedRun {
            platforms,
            workloads,
            warmup: cli.warmup.or(self.warmup).unwrap_or(DEFAULT_WARMUP),
            iterations,
            jsonl: cli.jsonl.or(self.jsonl),
            csv: cli.csv.or(self.csv),
        })
    }
}
