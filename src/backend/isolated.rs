//! Backend handle wrapping one isolated runtime.

use tracing::{debug, info, warn};

use crate::platform::AttestationMode;
use crate::workload::Command;
use crate::{BenchError, BenchResult, InvocationError};

use super::traits::{BackendHandle, HandleState, LoadedRuntime, RuntimeLoader, require_started};

/// Lifecycle wrapper around a runtime produced by a `RuntimeLoader`.
///
/// The simulation and debug variants differ only in `entry_id`. A started
/// handle that is dropped without `shutdown` still closes its runtime.
pub struct IsolatedRuntimeHandle {
    name: String,
    entry_id: String,
    runtime: Option<Box<dyn LoadedRuntime>>,
    state: HandleState,
}

impl IsolatedRuntimeHandle {
    pub fn new(name: impl Into<String>, entry_id: impl Into<String>) -> Self {
        IsolatedRuntimeHandle {
            name: name.into(),
            entry_id: entry_id.into(),
            runtime: None,
            state: HandleState::Uninitialized,
        }
    }

    /// Load and start the runtime image.
    ///
    /// If the image loads but fails to start, it is closed before the
    /// `BenchError::Load` is returned, leaving nothing live.
    pub fn initialize(
        &mut self,
        loader: &dyn RuntimeLoader,
        attestation: Option<AttestationMode>,
        extra_params: Option<&[u8]>,
    ) -> BenchResult<()> {
        if self.state != HandleState::Uninitialized {
            return Err(BenchError::InvalidState(format!(
                "isolated backend {} already {}; initialize may only be called once",
                self.name, self.state
            )));
        }

        debug!(entry = %self.entry_id, "loading isolated runtime");
        let mut runtime = loader.load(&self.entry_id).map_err(into_load_error)?;

        if let Err(e) = runtime.start(attestation, extra_params) {
            if let Err(close_err) = runtime.close() {
                warn!(entry = %self.entry_id, error = %close_err, "failed to release runtime after start failure");
            }
            return Err(into_load_error(e));
        }

        info!(entry = %self.entry_id, attestation = ?attestation, "isolated runtime started");
        self.runtime = Some(runtime);
        self.state = HandleState::Started;
        Ok(())
    }
}

fn into_load_error(e: BenchError) -> BenchError {
    match e {
        BenchError::Load(_) => e,
        other => BenchError::Load(other.to_string()),
    }
}

impl BackendHandle for IsolatedRuntimeHandle {
    fn name(&self) -> &str {
        &self.name
    }

    fn state(&self) -> HandleState {
        self.state
    }

    fn invoke(&mut self, command: &Command) -> BenchResult<()> {
        require_started(&self.name, self.state)?;
        let runtime = self.runtime.as_mut().ok_or_else(|| {
            BenchError::InvalidState(format!("isolated backend {} has no runtime", self.name))
        })?;
        runtime.call(command.as_bytes()).map_err(|e| match e {
            BenchError::Invocation(_) => e,
            other => BenchError::Invocation(InvocationError::CallFailed(other.to_string())),
        })
    }

    fn shutdown(&mut self) {
        if let Some(mut runtime) = self.runtime.take() {
            debug!(entry = %self.entry_id, "closing isolated runtime");
            if let Err(e) = runtime.close() {
                warn!(entry = %self.entry_id, error = %e, "isolated runtime did not close cleanly");
            }
        }
        self.state = HandleState::Stopped;
    }
}

impl Drop for IsolatedRuntimeHandle {
    fn drop(&mut self) {
        if self.runtime.is_some() {
            self.shutdown();
        }
    }
}
