//! Where a record was measured: machine, OS, source revision and isolation support.

use std::process::{Command, Output};

use serde::{Deserialize, Serialize};
use sysinfo::System;

use crate::platform::ProbeOutcome;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentInfo {
    pub os: String,
    pub harness_version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub machine: Option<MachineSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revision: Option<SourceRevision>,
    /// Set when the start-up capability check ran.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub isolation: Option<ProbeOutcome>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MachineSpec {
    pub cpu_model: Option<String>,
    pub physical_cores: Option<u32>,
    pub total_ram_bytes: u64,
    pub hostname: Option<String>,
}

/// Git commit of the working directory the harness was started from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceRevision {
    pub sha: String,
    pub dirty: bool,
}

impl Default for EnvironmentInfo {
    fn default() -> Self {
        EnvironmentInfo {
            os: std::env::consts::OS.to_string(),
            harness_version: env!("CARGO_PKG_VERSION").to_string(),
            machine: None,
            revision: None,
            isolation: None,
        }
    }
}

impl EnvironmentInfo {
    pub fn detect() -> Self {
        let mut sys = System::new();
        sys.refresh_cpu();
        sys.refresh_memory();

        EnvironmentInfo {
            os: System::long_os_version().unwrap_or_else(|| std::env::consts::OS.to_string()),
            machine: Some(MachineSpec {
                cpu_model: sys.cpus().first().map(|c| c.brand().trim().to_string()),
                physical_cores: sys.physical_core_count().map(|c| c as u32),
                total_ram_bytes: sys.total_memory(),
                hostname: System::host_name(),
            }),
            revision: SourceRevision::current(),
            ..EnvironmentInfo::default()
        }
    }

    pub fn with_isolation(mut self, outcome: ProbeOutcome) -> Self {
        self.isolation = Some(outcome);
        self
    }

    pub fn git_sha(&self) -> Option<&str> {
        self.revision.as_ref().map(|r| r.sha.as_str())
    }
}

impl SourceRevision {
    /// `None` outside a git checkout or when git is not installed.
    pub fn current() -> Option<Self> {
        let head = git(&["rev-parse", "HEAD"])?;
        let sha = String::from_utf8(head.stdout).ok()?.trim().to_string();
        if sha.is_empty() {
            return None;
        }
        let dirty = git(&["status", "--porcelain"]).is_some_and(|o| !o.stdout.is_empty());
        Some(SourceRevision { sha, dirty })
    }
}

fn git(args: &[&str]) -> Option<Output> {
    Command::new("git")
        .args(args)
        .output()
        .ok()
        .filter(|o| o.status.success())
}
