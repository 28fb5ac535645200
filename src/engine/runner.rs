//! Per-trial backend lifecycle: `Idle --setup--> Ready --dispatch*--> Ready --teardown--> Idle`.

use std::sync::Arc;

use tracing::{debug, info};

use crate::backend::{BackendHandle, DirectHandle, HandleState, IsolatedRuntimeHandle, RuntimeLoader};
use crate::platform::{PlatformDescriptor, RuntimeKind};
use crate::workload::{Command, WorkloadId, WorkloadRegistry, command_for};
use crate::{BenchError, BenchResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunnerState {
    Idle,
    Ready,
}

/// The started backend for the current trial.
enum ActiveHandle {
    Direct(DirectHandle),
    Isolated(IsolatedRuntimeHandle),
}

impl ActiveHandle {
    fn as_handle(&mut self) -> &mut dyn BackendHandle {
        match self {
            ActiveHandle::Direct(h) => h,
            ActiveHandle::Isolated(h) => h,
        }
    }
}

/// Owns at most one started backend and routes workload dispatches to it.
///
/// A runner belongs to a single trial: it must not be shared across threads,
/// and a new backend is created on every `setup`. Dropping a runner tears down
/// any active backend.
pub struct BenchmarkRunner {
    registry: Arc<WorkloadRegistry>,
    loader: Arc<dyn RuntimeLoader>,
    active: Option<(RuntimeKind, ActiveHandle)>,
}

impl BenchmarkRunner {
    pub fn new(registry: Arc<WorkloadRegistry>, loader: Arc<dyn RuntimeLoader>) -> Self {
        BenchmarkRunner {
            registry,
            loader,
            active: None,
        }
    }

    pub fn state(&self) -> RunnerState {
        if self.active.is_some() {
            RunnerState::Ready
        } else {
            RunnerState::Idle
        }
    }

    pub fn active_kind(&self) -> Option<RuntimeKind> {
        self.active.as_ref().map(|(kind, _)| *kind)
    }

    /// Start the backend named by `platform`.
    ///
    /// Unknown runtime ids fail with `BenchError::Configuration`, isolated
    /// runtimes that cannot be loaded or started fail with `BenchError::Load`;
    /// in both cases the runner stays `Idle` with nothing left to tear down.
    pub fn setup(&mut self, platform: &PlatformDescriptor) -> BenchResult<()> {
        if let Some((kind, _)) = &self.active {
            return Err(BenchError::InvalidState(format!(
                "setup called while {} is active; teardown first",
                kind.runtime_id()
            )));
        }
        let kind = platform.kind()?;

        let handle = match kind.entry_id() {
            None => {
                let mut direct = DirectHandle::new(self.registry.clone());
                direct.initialize()?;
                ActiveHandle::Direct(direct)
            }
            Some(entry_id) => {
                let mut isolated = IsolatedRuntimeHandle::new(kind.runtime_id(), entry_id);
                isolated.initialize(
                    self.loader.as_ref(),
                    platform.attestation,
                    platform.extra_params.as_deref(),
                )?;
                ActiveHandle::Isolated(isolated)
            }
        };

        info!(runtime = kind.runtime_id(), "backend ready");
        self.active = Some((kind, handle));
        Ok(())
    }

    /// Run one catalogue workload on the active backend.
    pub fn dispatch(&mut self, workload: WorkloadId) -> BenchResult<()> {
        self.dispatch_command(&command_for(workload))
    }

    /// Run an arbitrary command on the active backend.
    ///
    /// Errors propagate unchanged and leave the runner `Ready`.
    pub fn dispatch_command(&mut self, command: &Command) -> BenchResult<()> {
        let (_, handle) = self.active.as_mut().ok_or_else(|| {
            BenchError::InvalidState(format!(
                "cannot dispatch `{command}`: no backend has been set up"
            ))
        })?;
        let handle = handle.as_handle();
        debug_assert_eq!(handle.state(), HandleState::Started);
        handle.invoke(command)
    }

    /// Shut down and release the active backend, if any. Always completes.
    pub fn teardown(&mut self) {
        if let Some((kind, mut handle)) = self.active.take() {
            handle.as_handle().shutdown();
            info!(runtime = kind.runtime_id(), "backend released");
        } else {
            debug!("teardown with no active backend");
        }
    }
}

impl Drop for BenchmarkRunner {
    fn drop(&mut self) {
        self.teardown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::InvocationError;
    use crate::backend::{MockConfig, MockEvent, MockLoader};
    use crate::platform::{AttestationMode, SIMULATION_ENTRY};
    use std::sync::Mutex;

    fn runner_with(loader: MockLoader) -> BenchmarkRunner {
        BenchmarkRunner::new(Arc::new(WorkloadRegistry::builtin()), Arc::new(loader))
    }

    #[test]
    fn test_host_setup_dispatch_teardown() {
        let mut runner = runner_with(MockLoader::default());
        runner.setup(&PlatformDescriptor::new("host")).unwrap();
        assert_eq!(runner.state(), RunnerState::Ready);
        assert_eq!(runner.active_kind(), Some(RuntimeKind::Host));
        runner.dispatch(WorkloadId::Empty).unwrap();
        runner.teardown();
        assert_eq!(runner.state(), RunnerState::Idle);
    }

    #[test]
    fn test_host_dispatch_invokes_stub_once_with_size() {
        let calls: Arc<Mutex<Vec<Vec<String>>>> = Arc::default();
        let sink = calls.clone();
        let registry = WorkloadRegistry::new().with("fannkuch", move |args: &[&str]| {
            sink.lock().unwrap().push(args.iter().map(|a| a.to_string()).collect());
            Ok(())
        });
        let mut runner = BenchmarkRunner::new(Arc::new(registry), Arc::new(MockLoader::default()));
        runner.setup(&PlatformDescriptor::new("host")).unwrap();
        runner.dispatch(WorkloadId::Fannkuch).unwrap();
        assert_eq!(*calls.lock().unwrap(), vec![vec!["10".to_string()]]);
    }

    #[test]
    fn test_host_unknown_workload_keeps_ready() {
        let mut runner = runner_with(MockLoader::default());
        runner.setup(&PlatformDescriptor::new("host")).unwrap();
        let err = runner
            .dispatch_command(&Command::parse("nonexistent").unwrap())
            .unwrap_err();
        assert!(matches!(
            err,
            BenchError::Invocation(InvocationError::NoSuchWorkload(_))
        ));
        assert_eq!(runner.state(), RunnerState::Ready);
    }

    #[test]
    fn test_unknown_platform_is_configuration_error() {
        let loader = MockLoader::default();
        let mut runner = runner_with(loader.clone());
        let err = runner.setup(&PlatformDescriptor::new("avian-simulation")).unwrap_err();
        assert!(matches!(err, BenchError::Configuration(_)));
        assert_eq!(runner.state(), RunnerState::Idle);
        runner.teardown();
        assert!(loader.events().is_empty());
    }

    #[test]
    fn test_dispatch_before_setup_and_after_teardown() {
        let mut runner = runner_with(MockLoader::default());
        assert!(runner.dispatch(WorkloadId::Empty).unwrap_err().is_invalid_state());
        runner.setup(&PlatformDescriptor::new("host")).unwrap();
        runner.teardown();
        assert!(runner.dispatch(WorkloadId::Empty).unwrap_err().is_invalid_state());
    }

    #[test]
    fn test_double_teardown_is_noop() {
        let loader = MockLoader::default();
        let mut runner = runner_with(loader.clone());
        runner.setup(&PlatformDescriptor::new("isolated-simulation")).unwrap();
        runner.teardown();
        runner.teardown();
        assert_eq!(loader.close_count(), 1);
    }

    #[test]
    fn test_close_failure_still_returns_to_idle() {
        let loader = MockLoader::new(MockConfig::new().close_fails());
        let mut runner = runner_with(loader.clone());
        runner.setup(&PlatformDescriptor::new("isolated-simulation")).unwrap();
        runner.dispatch(WorkloadId::Empty).unwrap();
        runner.teardown();
        assert_eq!(runner.state(), RunnerState::Idle);
        assert_eq!(loader.close_count(), 1);
        runner.teardown();
        drop(runner);
        assert_eq!(loader.close_count(), 1);
    }

    #[test]
    fn test_host_oversized_argument_is_routine_failure() {
        let mut runner = runner_with(MockLoader::default());
        runner.setup(&PlatformDescriptor::new("host")).unwrap();
        let err = runner
            .dispatch_command(&Command::parse("pidigits 4611686018427387904").unwrap())
            .unwrap_err();
        match err {
            BenchError::Invocation(InvocationError::RoutineFailed { workload, reason }) => {
                assert_eq!(workload, "pidigits");
                assert!(reason.contains("at most"), "{reason}");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(runner.state(), RunnerState::Ready);
    }

    #[test]
    fn test_setup_twice_is_rejected() {
        let loader = MockLoader::default();
        let mut runner = runner_with(loader.clone());
        runner.setup(&PlatformDescriptor::new("isolated-simulation")).unwrap();
        let err = runner.setup(&PlatformDescriptor::new("host")).unwrap_err();
        assert!(err.is_invalid_state());
        assert_eq!(runner.active_kind(), Some(RuntimeKind::IsolatedSimulation));
        assert_eq!(loader.load_count(), 1);
    }

    #[test]
    fn test_isolated_dispatch_sends_catalogue_command() {
        let loader = MockLoader::default();
        let mut runner = runner_with(loader.clone());
        let platform =
            PlatformDescriptor::new("isolated-simulation").with_attestation(AttestationMode::Dcap);
        runner.setup(&platform).unwrap();
        runner.dispatch(WorkloadId::SpectralNorm).unwrap();
        runner.teardown();
        assert_eq!(
            loader.events(),
            vec![
                MockEvent::Load(SIMULATION_ENTRY.into()),
                MockEvent::Start(Some(AttestationMode::Dcap)),
                MockEvent::Call("spectralnorm 1000".into()),
                MockEvent::Close,
            ]
        );
    }

    #[test]
    fn test_isolated_load_failure_leaves_idle() {
        let loader = MockLoader::new(MockConfig::new().load_fails());
        let mut runner = runner_with(loader.clone());
        let err = runner.setup(&PlatformDescriptor::new("isolated-simulation")).unwrap_err();
        assert!(matches!(err, BenchError::Load(_)));
        assert_eq!(runner.state(), RunnerState::Idle);
        runner.teardown();
        assert_eq!(runner.state(), RunnerState::Idle);
    }

    #[test]
    fn test_drop_releases_backend() {
        let loader = MockLoader::default();
        {
            let mut runner = runner_with(loader.clone());
            runner.setup(&PlatformDescriptor::new("isolated-debug")).unwrap();
        }
        assert_eq!(loader.close_count(), 1);
    }
}
