//! Isolated runtime hosted in a child process.
//!
//! Each image runs as `<worker_exe> worker --image <entry-id>`. Commands go to
//! the child's stdin one per line and the child answers each with `ok` or
//! `err <message>` on stdout. Commands never contain control characters, so the
//! newline is an unambiguous message boundary. Closing stdin asks the child to
//! exit.

use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::PathBuf;
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::sync::Arc;

use tracing::{debug, warn};

use crate::platform::{AttestationMode, IsolationSupport, RuntimeKind, SystemIsolationSupport};
use crate::{BenchError, BenchResult, InvocationError};

use super::traits::{LoadedRuntime, RuntimeLoader};

pub const READY_LINE: &str = "ready";
pub const OK_LINE: &str = "ok";
pub const ERR_PREFIX: &str = "err ";

/// Loader that runs isolated images as worker child processes.
#[derive(Clone)]
pub struct ProcessLoader {
    worker_exe: PathBuf,
    support: Arc<dyn IsolationSupport>,
}

impl ProcessLoader {
    /// Create a loader that spawns `worker_exe` for each image.
    pub fn new(worker_exe: impl Into<PathBuf>) -> Self {
        ProcessLoader {
            worker_exe: worker_exe.into(),
            support: Arc::new(SystemIsolationSupport::default()),
        }
    }

    /// Loader that re-executes the current binary as the worker.
    pub fn current_exe() -> BenchResult<Self> {
        let exe = std::env::current_exe()
            .map_err(|e| BenchError::Load(format!("cannot locate current executable: {e}")))?;
        Ok(Self::new(exe))
    }

    /// Override the hardware check used for images that require it.
    pub fn with_isolation_support(mut self, support: Arc<dyn IsolationSupport>) -> Self {
        self.support = support;
        self
    }
}

impl RuntimeLoader for ProcessLoader {
    fn load(&self, entry_id: &str) -> BenchResult<Box<dyn LoadedRuntime>> {
        let requires_hardware = RuntimeKind::from_entry_id(entry_id)
            .map(|kind| kind.requires_hardware())
            .ok_or_else(|| BenchError::Load(format!("no such isolated image: {entry_id}")))?;
        if !self.worker_exe.exists() {
            return Err(BenchError::Load(format!(
                "worker executable not found: {}",
                self.worker_exe.display()
            )));
        }
        Ok(Box::new(ProcessRuntime {
            entry_id: entry_id.to_string(),
            worker_exe: self.worker_exe.clone(),
            requires_hardware,
            support: self.support.clone(),
            child: None,
        }))
    }
}

struct RunningWorker {
    process: Child,
    stdin: Option<BufWriter<ChildStdin>>,
    stdout: BufReader<ChildStdout>,
}

impl RunningWorker {
    fn read_line(&mut self) -> BenchResult<Option<String>> {
        let mut line = String::new();
        let n = self.stdout.read_line(&mut line)?;
        if n == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
    }

    fn kill(&mut self) {
        let _ = self.process.kill();
        let _ = self.process.wait();
    }
}

struct ProcessRuntime {
    entry_id: String,
    worker_exe: PathBuf,
    requires_hardware: bool,
    support: Arc<dyn IsolationSupport>,
    child: Option<RunningWorker>,
}

impl ProcessRuntime {
    fn spawn(
        &self,
        attestation: Option<AttestationMode>,
        extra_params: Option<&[u8]>,
    ) -> BenchResult<RunningWorker> {
        let mut cmd = Command::new(&self.worker_exe);
        cmd.arg("worker").arg("--image").arg(&self.entry_id);
        if let Some(mode) = attestation {
            cmd.arg("--attestation").arg(mode.as_str());
        }
        if let Some(params) = extra_params {
            cmd.arg("--params").arg(hex::encode(params));
        }
        cmd.stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit());

        let mut process = cmd
            .spawn()
            .map_err(|e| BenchError::Load(format!("failed to spawn worker: {e}")))?;
        let (Some(stdin), Some(stdout)) = (process.stdin.take(), process.stdout.take()) else {
            let _ = process.kill();
            let _ = process.wait();
            return Err(BenchError::Load("worker pipes unavailable".into()));
        };
        Ok(RunningWorker {
            process,
            stdin: Some(BufWriter::new(stdin)),
            stdout: BufReader::new(stdout),
        })
    }
}

impl LoadedRuntime for ProcessRuntime {
    fn start(
        &mut self,
        attestation: Option<AttestationMode>,
        extra_params: Option<&[u8]>,
    ) -> BenchResult<()> {
        if self.child.is_some() {
            return Err(BenchError::InvalidState(format!(
                "image {} already started",
                self.entry_id
            )));
        }
        if self.requires_hardware {
            self.support.check(true).map_err(|e| {
                BenchError::Load(format!("image {} requires hardware isolation: {e}", self.entry_id))
            })?;
        }

        let mut worker = self.spawn(attestation, extra_params)?;
        match worker.read_line() {
            Ok(Some(line)) if line == READY_LINE => {
                debug!(entry = %self.entry_id, pid = worker.process.id(), "worker ready");
                self.child = Some(worker);
                Ok(())
            }
            Ok(Some(line)) => {
                worker.kill();
                Err(BenchError::Load(format!(
                    "worker for {} did not start: {}",
                    self.entry_id,
                    line.strip_prefix(ERR_PREFIX).unwrap_or(&line)
                )))
            }
            Ok(None) => {
                worker.kill();
                Err(BenchError::Load(format!(
                    "worker for {} exited during start-up",
                    self.entry_id
                )))
            }
            Err(e) => {
                worker.kill();
                Err(BenchError::Load(e.to_string()))
            }
        }
    }

    fn call(&mut self, bytes: &[u8]) -> BenchResult<()> {
        if bytes.iter().any(|b| *b == b'\n' || *b == b'\r') {
            return Err(InvocationError::InvalidCommand("line break in command".into()).into());
        }
        let worker = self
            .child
            .as_mut()
            .ok_or_else(|| BenchError::InvalidState(format!("image {} not started", self.entry_id)))?;
        let stdin = worker
            .stdin
            .as_mut()
            .ok_or_else(|| BenchError::InvalidState(format!("image {} is closing", self.entry_id)))?;

        let sent = stdin
            .write_all(bytes)
            .and_then(|_| stdin.write_all(b"\n"))
            .and_then(|_| stdin.flush());
        if let Err(e) = sent {
            return Err(InvocationError::CallFailed(format!("failed to send command: {e}")).into());
        }

        match worker.read_line() {
            Ok(Some(line)) if line == OK_LINE => Ok(()),
            Ok(Some(line)) => match line.strip_prefix(ERR_PREFIX) {
                Some(reason) => Err(InvocationError::CallFailed(reason.to_string()).into()),
                None => Err(InvocationError::CallFailed(format!("unexpected reply: {line}")).into()),
            },
            Ok(None) => Err(InvocationError::CallFailed("worker exited".into()).into()),
            Err(e) => Err(InvocationError::CallFailed(e.to_string()).into()),
        }
    }

    fn close(&mut self) -> BenchResult<()> {
        let Some(mut worker) = self.child.take() else {
            return Ok(());
        };
        // Dropping stdin signals end of input to the worker.
        if let Some(mut stdin) = worker.stdin.take() {
            let _ = stdin.flush();
        }
        let status = worker.process.wait()?;
        if status.success() {
            debug!(entry = %self.entry_id, "worker exited");
            Ok(())
        } else {
            Err(BenchError::Message(format!(
                "worker for {} exited with {status}",
                self.entry_id
            )))
        }
    }
}

impl Drop for ProcessRuntime {
    fn drop(&mut self) {
        if let Some(mut worker) = self.child.take() {
            warn!(entry = %self.entry_id, "isolated runtime dropped without close; killing worker");
            worker.kill();
        }
    }
}

pub(crate) fn decode_params(text: &str) -> BenchResult<Vec<u8>> {
    hex::decode(text).map_err(|e| BenchError::Configuration(format!("invalid hex parameter: {e}")))
}
