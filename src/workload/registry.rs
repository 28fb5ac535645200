//! In-process lookup of workload routines by command name.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::InvocationError;

use super::Command;
use super::routines;

/// A workload routine. Receives the argument tokens that follow the workload name.
pub type Routine = Arc<dyn Fn(&[&str]) -> anyhow::Result<()> + Send + Sync>;

/// Name → routine table consulted by `DirectHandle` and by the isolated worker.
#[derive(Clone, Default)]
pub struct WorkloadRegistry {
    routines: BTreeMap<String, Routine>,
}

impl std::fmt::Debug for WorkloadRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkloadRegistry")
            .field("routines", &self.names())
            .finish()
    }
}

impl WorkloadRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        WorkloadRegistry::default()
    }

    /// Registry populated with every built-in benchmark routine.
    pub fn builtin() -> Self {
        WorkloadRegistry::new()
            .with("empty", routines::empty)
            .with("fannkuch", routines::fannkuch)
            .with("mandelbrot", routines::mandelbrot)
            .with("himeno", routines::himeno)
            .with("nbody", routines::nbody)
            .with("spectralnorm", routines::spectral_norm)
            .with("binarytrees", routines::binary_trees)
            .with("fasta", routines::fasta)
            .with("pidigits", routines::pidigits)
    }

    /// Register (or replace) a routine under `name`.
    pub fn with<F>(mut self, name: impl Into<String>, routine: F) -> Self
    where
        F: Fn(&[&str]) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.routines.insert(name.into(), Arc::new(routine));
        self
    }

    pub fn lookup(&self, name: &str) -> Option<&Routine> {
        self.routines.get(name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.routines.keys().map(String::as_str).collect()
    }

    /// Run the routine named by the command's first token with the remaining tokens.
    pub fn run(&self, command: &Command) -> Result<(), InvocationError> {
        let name = command.workload();
        let routine = self
            .lookup(name)
            .ok_or_else(|| InvocationError::NoSuchWorkload(name.to_string()))?;
        let args = command.args();
        routine(args.as_slice()).map_err(|e| InvocationError::RoutineFailed {
            workload: name.to_string(),
            reason: format!("{e:#}"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workload::{WorkloadId, command_for};
    use std::sync::Mutex;

    #[test]
    fn test_builtin_covers_catalogue() {
        let registry = WorkloadRegistry::builtin();
        for id in WorkloadId::ALL {
            let cmd = command_for(id);
            assert!(registry.lookup(cmd.workload()).is_some(), "missing routine for {id}");
        }
    }

    #[test]
    fn test_run_passes_arguments() {
        let seen: Arc<Mutex<Vec<Vec<String>>>> = Arc::default();
        let sink = seen.clone();
        let registry = WorkloadRegistry::new().with("stub", move |args: &[&str]| {
            sink.lock().unwrap().push(args.iter().map(|s| s.to_string()).collect());
            Ok(())
        });
        registry.run(&Command::parse("stub 1 2").unwrap()).unwrap();
        assert_eq!(*seen.lock().unwrap(), vec![vec!["1".to_string(), "2".to_string()]]);
    }

    #[test]
    fn test_run_unknown_workload() {
        let registry = WorkloadRegistry::new();
        let err = registry.run(&Command::parse("missing 3").unwrap()).unwrap_err();
        assert_eq!(err, InvocationError::NoSuchWorkload("missing".into()));
    }

    #[test]
    fn test_run_wraps_routine_failure() {
        let registry = WorkloadRegistry::new().with("bad", |_: &[&str]| anyhow::bail!("boom"));
        let err = registry.run(&Command::parse("bad").unwrap()).unwrap_err();
        assert!(matches!(err, InvocationError::RoutineFailed { ref workload, .. } if workload == "bad"));
    }

    #[test]
    fn test_empty_routine_runs() {
        let registry = WorkloadRegistry::builtin();
        registry.run(&command_for(WorkloadId::Empty)).unwrap();
    }
}
