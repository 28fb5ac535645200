//! Mock isolated-runtime loader for testing.

use std::sync::{Arc, Mutex, MutexGuard};

use crate::platform::AttestationMode;
use crate::{BenchError, BenchResult, InvocationError};

use super::traits::{LoadedRuntime, RuntimeLoader};

/// Configuration for mock runtime behaviour.
#[derive(Debug, Clone, Default)]
pub struct MockConfig {
    /// Whether `load` should fail
    pub load_fails: bool,
    /// Whether `start` should fail
    pub start_fails: bool,
    /// Whether every `call` should fail
    pub call_fails: bool,
    /// Whether `close` should report an error (the runtime is still released)
    pub close_fails: bool,
    /// Workload names whose calls fail
    pub failing_workloads: Vec<String>,
}

impl MockConfig {
    pub fn new() -> Self {
        MockConfig::default()
    }

    /// Make load fail.
    pub fn load_fails(mut self) -> Self {
        self.load_fails = true;
        self
    }

    /// Make start fail.
    pub fn start_fails(mut self) -> Self {
        self.start_fails = true;
        self
    }

    /// Make every call fail.
    pub fn call_fails(mut self) -> Self {
        self.call_fails = true;
        self
    }

    /// Make close report an error.
    pub fn close_fails(mut self) -> Self {
        self.close_fails = true;
        self
    }

    /// Make calls for one workload fail.
    pub fn fail_workload(mut self, name: impl Into<String>) -> Self {
        self.failing_workloads.push(name.into());
        self
    }
}

/// Lifecycle event observed by the mock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockEvent {
    Load(String),
    Start(Option<AttestationMode>),
    Call(String),
    Close,
}

/// Loader whose runtimes record every lifecycle event into a shared log.
#[derive(Clone, Default)]
pub struct MockLoader {
    config: MockConfig,
    events: Arc<Mutex<Vec<MockEvent>>>,
}

impl MockLoader {
    pub fn new(config: MockConfig) -> Self {
        MockLoader {
            config,
            events: Arc::default(),
        }
    }

    fn log(&self) -> MutexGuard<'_, Vec<MockEvent>> {
        self.events.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn events(&self) -> Vec<MockEvent> {
        self.log().clone()
    }

    pub fn load_count(&self) -> usize {
        self.log().iter().filter(|e| matches!(e, MockEvent::Load(_))).count()
    }

    pub fn close_count(&self) -> usize {
        self.log().iter().filter(|e| matches!(e, MockEvent::Close)).count()
    }

    /// Commands received by `call`, in order.
    pub fn calls(&self) -> Vec<String> {
        self.log()
            .iter()
            .filter_map(|e| match e {
                MockEvent::Call(c) => Some(c.clone()),
                _ => None,
            })
            .collect()
    }
}

impl RuntimeLoader for MockLoader {
    fn load(&self, entry_id: &str) -> BenchResult<Box<dyn LoadedRuntime>> {
        self.log().push(MockEvent::Load(entry_id.to_string()));
        if self.config.load_fails {
            return Err(BenchError::Load(format!("mock image {entry_id} not found")));
        }
        Ok(Box::new(MockRuntime {
            config: self.config.clone(),
            events: self.events.clone(),
        }))
    }
}

struct MockRuntime {
    config: MockConfig,
    events: Arc<Mutex<Vec<MockEvent>>>,
}

impl MockRuntime {
    fn record(&self, event: MockEvent) {
        self.events
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(event);
    }
}

impl LoadedRuntime for MockRuntime {
    fn start(
        &mut self,
        attestation: Option<AttestationMode>,
        _extra_params: Option<&[u8]>,
    ) -> BenchResult<()> {
        self.record(MockEvent::Start(attestation));
        if self.config.start_fails {
            return Err(BenchError::Load("mock start failed".into()));
        }
        Ok(())
    }

    fn call(&mut self, bytes: &[u8]) -> BenchResult<()> {
        let text = String::from_utf8_lossy(bytes).into_owned();
        let workload = text.split(' ').next().unwrap_or_default().to_string();
        self.record(MockEvent::Call(text));
        if self.config.call_fails || self.config.failing_workloads.contains(&workload) {
            return Err(InvocationError::CallFailed(format!("mock call to {workload} failed")).into());
        }
        Ok(())
    }

    fn close(&mut self) -> BenchResult<()> {
        self.record(MockEvent::Close);
        if self.config.close_fails {
            return Err(BenchError::Message("mock close failed".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_records_events() {
        let loader = MockLoader::new(MockConfig::new());
        let mut rt = loader.load("img").unwrap();
        rt.start(None, None).unwrap();
        rt.call(b"fasta 10").unwrap();
        rt.close().unwrap();
        assert_eq!(loader.load_count(), 1);
        assert_eq!(loader.calls(), vec!["fasta 10".to_string()]);
        assert_eq!(loader.close_count(), 1);
    }

    #[test]
    fn test_mock_failing_workload() {
        let loader = MockLoader::new(MockConfig::new().fail_workload("nbody"));
        let mut rt = loader.load("img").unwrap();
        rt.start(None, None).unwrap();
        assert!(rt.call(b"fasta 10").is_ok());
        assert!(rt.call(b"nbody 10").is_err());
    }

    #[test]
    fn test_mock_load_fails() {
        let loader = MockLoader::new(MockConfig::new().load_fails());
        assert!(matches!(loader.load("img"), Err(BenchError::Load(_))));
    }
}
