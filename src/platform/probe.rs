//! Detection of hardware-backed isolated execution.
//!
//! Unsupported hardware is not an error for the harness as a whole: the probe
//! prints operator guidance and the run continues, so simulation and host
//! trials still complete. Trials that do need hardware fail later through the
//! normal setup error path.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{BenchError, BenchResult};

/// Capability check for hardware isolation.
pub trait IsolationSupport: Send + Sync {
    /// Returns `BenchError::UnsupportedPlatform` when isolated execution is not available.
    ///
    /// With `strict` the hardware must be usable right now; otherwise it is
    /// enough that the CPU advertises the feature.
    fn check(&self, strict: bool) -> BenchResult<()>;
}

/// Looks for SGX device nodes and the `sgx` CPU flag.
#[derive(Debug, Clone)]
pub struct SystemIsolationSupport {
    pub device_paths: Vec<PathBuf>,
    pub cpuinfo_path: PathBuf,
}

impl Default for SystemIsolationSupport {
    fn default() -> Self {
        SystemIsolationSupport {
            device_paths: vec![
                PathBuf::from("/dev/sgx_enclave"),
                PathBuf::from("/dev/sgx/enclave"),
                PathBuf::from("/dev/isgx"),
            ],
            cpuinfo_path: PathBuf::from("/proc/cpuinfo"),
        }
    }
}

impl SystemIsolationSupport {
    fn device_present(&self) -> Option<&Path> {
        self.device_paths
            .iter()
            .map(PathBuf::as_path)
            .find(|p| p.exists())
    }

    fn cpu_flag_present(&self) -> bool {
        std::fs::read_to_string(&self.cpuinfo_path)
            .map(|info| {
                info.lines()
                    .filter(|l| l.starts_with("flags"))
                    .any(|l| l.split_whitespace().any(|f| f == "sgx"))
            })
            .unwrap_or(false)
    }
}

impl IsolationSupport for SystemIsolationSupport {
    fn check(&self, strict: bool) -> BenchResult<()> {
        if !cfg!(target_os = "linux") {
            return Err(BenchError::UnsupportedPlatform(format!(
                "isolated execution is only supported on linux, not {}",
                std::env::consts::OS
            )));
        }
        if let Some(dev) = self.device_present() {
            debug!(device = %dev.display(), "found isolation device");
            return Ok(());
        }
        if !strict && self.cpu_flag_present() {
            debug!("cpu advertises sgx but no device node is present");
            return Ok(());
        }
        Err(BenchError::UnsupportedPlatform(
            "no SGX device found (looked for /dev/sgx_enclave, /dev/sgx/enclave, /dev/isgx)".into(),
        ))
    }
}

/// Result of the start-up capability probe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ProbeOutcome {
    Hardware,
    SimulationOnly { reason: String },
}

impl ProbeOutcome {
    pub fn hardware_available(&self) -> bool {
        matches!(self, ProbeOutcome::Hardware)
    }
}

pub const GUIDANCE: &str = "This platform currently only supports isolated runtimes in simulation mode.\n\
Please ensure you run only simulation benchmarks through the use of the platform parameter:\n\
--platform \"isolated-simulation,host\"";

pub struct CapabilityProbe;

impl CapabilityProbe {
    /// Run the check, writing guidance to `out` when hardware is unavailable. Never fails.
    pub fn run<W: Write>(support: &dyn IsolationSupport, out: &mut W) -> ProbeOutcome {
        match support.check(true) {
            Ok(()) => ProbeOutcome::Hardware,
            Err(e) => {
                let reason = match e {
                    BenchError::UnsupportedPlatform(reason) => reason,
                    other => other.to_string(),
                };
                warn!(%reason, "hardware isolation unavailable, continuing in simulation-only mode");
                let _ = writeln!(out, "{GUIDANCE}");
                ProbeOutcome::SimulationOnly { reason }
            }
        }
    }
}

static PROCESS_PROBE: OnceLock<ProbeOutcome> = OnceLock::new();

/// Probe the current machine once per process; later calls return the cached outcome.
pub fn probe_once() -> &'static ProbeOutcome {
    PROCESS_PROBE.get_or_init(|| {
        CapabilityProbe::run(&SystemIsolationSupport::default(), &mut std::io::stdout())
    })
}
