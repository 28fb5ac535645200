//! Backend handle trait and the injected isolated-runtime capability.

use std::fmt;

use crate::platform::AttestationMode;
use crate::workload::Command;
use crate::{BenchError, BenchResult};

/// Lifecycle of a backend handle: `Uninitialized → Started → Stopped`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleState {
    Uninitialized,
    Started,
    Stopped,
}

impl fmt::Display for HandleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            HandleState::Uninitialized => "uninitialized",
            HandleState::Started => "started",
            HandleState::Stopped => "stopped",
        };
        f.write_str(s)
    }
}

/// A backend that executes workload commands for a single trial.
///
/// Caller contract: a handle is owned by exactly one trial and is never shared
/// between threads or reused across trials. Implementations do no internal
/// locking, and `invoke` blocks until the workload has completed.
pub trait BackendHandle: Send {
    /// Returns the backend name (e.g., "host", "isolated-simulation").
    fn name(&self) -> &str;

    fn state(&self) -> HandleState;

    /// Execute one command. All-or-nothing; only valid while `Started`.
    fn invoke(&mut self, command: &Command) -> BenchResult<()>;

    /// Release the backend's resources and move to `Stopped`.
    ///
    /// Safe to call in any state and more than once; release failures are
    /// logged rather than returned so that teardown always completes.
    fn shutdown(&mut self);
}

/// Loads isolated-runtime images by fully-qualified identifier.
pub trait RuntimeLoader: Send + Sync {
    fn load(&self, entry_id: &str) -> BenchResult<Box<dyn LoadedRuntime>>;
}

/// An isolated runtime image that has been loaded but not necessarily started.
pub trait LoadedRuntime: Send {
    fn start(
        &mut self,
        attestation: Option<AttestationMode>,
        extra_params: Option<&[u8]>,
    ) -> BenchResult<()>;

    /// Submit a raw command buffer and block until the runtime reports completion.
    fn call(&mut self, bytes: &[u8]) -> BenchResult<()>;

    fn close(&mut self) -> BenchResult<()>;
}

pub(crate) fn require_started(name: &str, state: HandleState) -> BenchResult<()> {
    if state == HandleState::Started {
        Ok(())
    } else {
        Err(BenchError::InvalidState(format!(
            "backend {name} is {state}; invoke requires a started backend"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_require_started() {
        assert!(require_started("host", HandleState::Started).is_ok());
        let err = require_started("host", HandleState::Stopped).unwrap_err();
        assert!(err.is_invalid_state());
        assert!(err.to_string().contains("stopped"));
        assert!(require_started("host", HandleState::Uninitialized).is_err());
    }
}
