//! Bare-host backend: runs workload routines in the calling process.

use std::sync::Arc;

use crate::platform::HOST;
use crate::workload::{Command, WorkloadRegistry};
use crate::{BenchError, BenchResult};

use super::traits::{BackendHandle, HandleState, require_started};

/// Invokes routines from a `WorkloadRegistry` directly, with no isolation boundary.
///
/// There is no external resource, so `initialize` and `shutdown` only move
/// the lifecycle state.
pub struct DirectHandle {
    registry: Arc<WorkloadRegistry>,
    state: HandleState,
}

impl DirectHandle {
    pub fn new(registry: Arc<WorkloadRegistry>) -> Self {
        DirectHandle {
            registry,
            state: HandleState::Uninitialized,
        }
    }

    pub fn initialize(&mut self) -> BenchResult<()> {
        if self.state != HandleState::Uninitialized {
            return Err(BenchError::InvalidState(format!(
                "host backend already {}",
                self.state
            )));
        }
        self.state = HandleState::Started;
        Ok(())
    }
}

impl BackendHandle for DirectHandle {
    fn name(&self) -> &str {
        HOST
    }

    fn state(&self) -> HandleState {
        self.state
    }

    fn invoke(&mut self, command: &Command) -> BenchResult<()> {
        require_started(HOST, self.state)?;
        self.registry.run(command)?;
        Ok(())
    }

    fn shutdown(&mut self) {
        self.state = HandleState::Stopped;
    }
}
