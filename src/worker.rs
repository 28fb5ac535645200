//! Child side of the process-hosted isolated runtime.
//!
//! Announces `ready`, then executes one command per input line against the
//! workload registry and answers `ok` or `err <message>`. Returns when the
//! input stream closes.

use std::io::{BufRead, Write};

use tracing::{debug, info};

use crate::backend::process::{ERR_PREFIX, OK_LINE, READY_LINE, decode_params};
use crate::platform::{AttestationMode, RuntimeKind};
use crate::workload::{Command, WorkloadRegistry};
use crate::{BenchError, BenchResult};

/// Start-up options for a worker.
#[derive(Debug, Clone)]
pub struct WorkerOptions {
    pub image: String,
    pub attestation: Option<AttestationMode>,
    /// Hex-encoded backend parameters.
    pub params: Option<String>,
}

/// Serve commands from `input` until end of stream.
pub fn serve<R: BufRead, W: Write>(
    options: &WorkerOptions,
    registry: &WorkloadRegistry,
    input: R,
    mut output: W,
) -> BenchResult<()> {
    if RuntimeKind::from_entry_id(&options.image).is_none() {
        writeln!(output, "{ERR_PREFIX}no such isolated image: {}", options.image)?;
        output.flush()?;
        return Err(BenchError::Load(format!("no such isolated image: {}", options.image)));
    }
    let params = match options.params.as_deref() {
        Some(hex) => decode_params(hex)?,
        None => Vec::new(),
    };
    info!(
        image = %options.image,
        attestation = ?options.attestation,
        params_len = params.len(),
        "worker started"
    );

    writeln!(output, "{READY_LINE}")?;
    output.flush()?;

    let mut served = 0usize;
    for line in input.lines() {
        let line = line?;
        let outcome = Command::parse(line.as_str()).and_then(|cmd| {
            debug!(command = %cmd, "executing");
            registry.run(&cmd)
        });
        match outcome {
            Ok(()) => writeln!(output, "{OK_LINE}")?,
            Err(e) => writeln!(output, "{ERR_PREFIX}{e}")?,
        }
        output.flush()?;
        served += 1;
    }

    info!(image = %options.image, served, "worker input closed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::{DEBUG_ENTRY, SIMULATION_ENTRY};
    use std::io::Cursor;

    fn options(image: &str) -> WorkerOptions {
        WorkerOptions {
            image: image.to_string(),
            attestation: None,
            params: None,
        }
    }

    #[test]
    fn test_serve_replies_per_line() {
        let registry = WorkloadRegistry::new().with("noop", |_: &[&str]| Ok(()));
        let input = Cursor::new("noop 1\nmissing\nnoop\n");
        let mut out = Vec::new();
        serve(&options(SIMULATION_ENTRY), &registry, input, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "ready");
        assert_eq!(lines[1], "ok");
        assert!(lines[2].starts_with("err no such workload: missing"));
        assert_eq!(lines[3], "ok");
        assert_eq!(lines.len(), 4);
    }

    #[test]
    fn test_serve_rejects_unknown_image() {
        let registry = WorkloadRegistry::new();
        let mut out = Vec::new();
        let err = serve(&options("bogus.Image"), &registry, Cursor::new(""), &mut out).unwrap_err();
        assert!(matches!(err, BenchError::Load(_)));
        assert!(String::from_utf8(out).unwrap().starts_with("err "));
    }

    #[test]
    fn test_serve_rejects_bad_params() {
        let registry = WorkloadRegistry::new();
        let mut opts = options(DEBUG_ENTRY);
        opts.params = Some("xyz".into());
        let err = serve(&opts, &registry, Cursor::new(""), Vec::new()).unwrap_err();
        assert!(matches!(err, BenchError::Configuration(_)));
    }

    #[test]
    fn test_serve_accepts_encoded_params() {
        let registry = WorkloadRegistry::new().with("noop", |_: &[&str]| Ok(()));
        let mut opts = options(SIMULATION_ENTRY);
        opts.params = Some(hex::encode([1u8, 2, 0xff]));
        let mut out = Vec::new();
        serve(&opts, &registry, Cursor::new("noop\n"), &mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "ready\nok\n");
    }
}
