//! Execution platform selection.
//!
//! A `PlatformDescriptor` names the backend a trial should run on. The runtime
//! identifier is deliberately kept as free text until setup time, where it is
//! resolved into a `RuntimeKind`; unknown identifiers become configuration
//! errors there and not when arguments are parsed.

pub mod probe;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{BenchError, BenchResult};

pub use probe::{CapabilityProbe, IsolationSupport, ProbeOutcome, SystemIsolationSupport, probe_once};

pub const HOST: &str = "host";
pub const ISOLATED_SIMULATION: &str = "isolated-simulation";
pub const ISOLATED_DEBUG: &str = "isolated-debug";

/// Attestation scheme requested when starting an isolated runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttestationMode {
    Dcap,
    Epid,
}

impl AttestationMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttestationMode::Dcap => "dcap",
            AttestationMode::Epid => "epid",
        }
    }
}

impl fmt::Display for AttestationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AttestationMode {
    type Err = BenchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "dcap" => Ok(AttestationMode::Dcap),
            "epid" => Ok(AttestationMode::Epid),
            other => Err(BenchError::Configuration(format!(
                "unknown attestation mode: {other}"
            ))),
        }
    }
}

/// Description of one target backend for a trial.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformDescriptor {
    pub runtime_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attestation: Option<AttestationMode>,
    /// Backend-specific parameters handed to the runtime's `start` untouched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra_params: Option<Vec<u8>>,
}

impl PlatformDescriptor {
    pub fn new(runtime_id: impl Into<String>) -> Self {
        PlatformDescriptor {
            runtime_id: runtime_id.into(),
            attestation: None,
            extra_params: None,
        }
    }

    pub fn with_attestation(mut self, mode: AttestationMode) -> Self {
        self.attestation = Some(mode);
        self
    }

    pub fn with_extra_params(mut self, params: impl Into<Vec<u8>>) -> Self {
        self.extra_params = Some(params.into());
        self
    }

    /// Resolve the runtime identifier. Fails with `BenchError::Configuration`
    /// for identifiers outside the recognised set.
    pub fn kind(&self) -> BenchResult<RuntimeKind> {
        RuntimeKind::resolve(&self.runtime_id)
    }
}

/// The recognised backends. Isolated kinds differ only in the image they load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuntimeKind {
    Host,
    IsolatedSimulation,
    IsolatedDebug,
}

impl RuntimeKind {
    pub const ALL: [RuntimeKind; 3] = [
        RuntimeKind::Host,
        RuntimeKind::IsolatedSimulation,
        RuntimeKind::IsolatedDebug,
    ];

    pub fn resolve(runtime_id: &str) -> BenchResult<RuntimeKind> {
        RuntimeKind::ALL
            .into_iter()
            .find(|k| k.runtime_id() == runtime_id)
            .ok_or_else(|| {
                BenchError::Configuration(format!("invalid runtime specified: {runtime_id}"))
            })
    }

    pub fn runtime_id(&self) -> &'static str {
        match self {
            RuntimeKind::Host => HOST,
            RuntimeKind::IsolatedSimulation => ISOLATED_SIMULATION,
            RuntimeKind::IsolatedDebug => ISOLATED_DEBUG,
        }
    }

    /// Fully-qualified image identifier for isolated kinds; `None` for the host.
    pub fn entry_id(&self) -> Option<&'static str> {
        match self {
            RuntimeKind::Host => None,
            RuntimeKind::IsolatedSimulation => Some(SIMULATION_ENTRY),
            RuntimeKind::IsolatedDebug => Some(DEBUG_ENTRY),
        }
    }

    /// Reverse of `entry_id`: the isolated kind that loads `entry_id`.
    pub fn from_entry_id(entry_id: &str) -> Option<RuntimeKind> {
        RuntimeKind::ALL
            .into_iter()
            .find(|k| k.entry_id() == Some(entry_id))
    }

    /// Whether this kind can only run on hardware with isolation support.
    pub fn requires_hardware(&self) -> bool {
        matches!(self, RuntimeKind::IsolatedDebug)
    }
}

pub const SIMULATION_ENTRY: &str = "enclave_bench.simulation.BenchmarkEnclave";
pub const DEBUG_ENTRY: &str = "enclave_bench.debug.BenchmarkEnclave";

/// Split a comma separated `--platform` list into descriptors without validating ids.
pub fn parse_platform_list(list: &str, attestation: Option<AttestationMode>) -> Vec<PlatformDescriptor> {
    list.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|id| PlatformDescriptor {
            runtime_id: id.to_string(),
            attestation,
            extra_params: None,
        })
        .collect()
}
