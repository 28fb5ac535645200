pub mod backend;
pub mod config;
pub mod core;
pub mod engine;
pub mod platform;
pub mod run_cmd;
pub mod storage;
pub mod worker;
pub mod workload;

use thiserror::Error;

/// Failure of a single workload invocation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvocationError {
    #[error("no such workload: {0}")]
    NoSuchWorkload(String),
    #[error("invalid command: {0}")]
    InvalidCommand(String),
    #[error("workload {workload} failed: {reason}")]
    RoutineFailed { workload: String, reason: String },
    #[error("isolated call failed: {0}")]
    CallFailed(String),
}

#[derive(Debug, Error)]
pub enum BenchError {
    /// Unrecognized runtime identifier or invalid configuration value.
    #[error("configuration error: {0}")]
    Configuration(String),
    /// The isolated runtime could not be loaded or started.
    #[error("failed to load isolated runtime: {0}")]
    Load(String),
    #[error(transparent)]
    Invocation(#[from] InvocationError),
    /// Hardware-backed isolation is unavailable on this machine.
    #[error("unsupported platform: {0}")]
    UnsupportedPlatform(String),
    /// Lifecycle precondition violated (e.g. dispatch before setup).
    ///
    /// This is a programming error on the caller's side and is never retried.
    #[error("invalid lifecycle state: {0}")]
    InvalidState(String),
    #[error("{0}")]
    Message(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

impl BenchError {
    /// Returns `true` for lifecycle precondition violations.
    pub fn is_invalid_state(&self) -> bool {
        matches!(self, BenchError::InvalidState(_))
    }
}

pub type BenchResult<T> = Result<T, BenchError>;

pub fn sha256_hex(bytes: &[u8]) -> String {
    use sha256::digest;
    digest(bytes)
}

pub(crate) fn now_string() -> String {
    time::OffsetDateTime::now_utc()
        .format(&time::format_description::well_known::Rfc3339)
        .unwrap_or_else(|_| "".to_string())
}
