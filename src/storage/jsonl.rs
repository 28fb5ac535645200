//! JSON Lines storage: one `BenchRecord` per line, appended as each trial completes.

use std::fs::{File, OpenOptions};
use std::io::{BufReader, Write};
use std::path::{Path, PathBuf};

use crate::BenchError;
use crate::core::schema::{BenchRecord, SCHEMA_VERSION};

#[derive(Debug, Clone)]
pub struct JsonlWriter {
    path: PathBuf,
}

impl JsonlWriter {
    pub fn new(path: impl AsRef<Path>) -> Self {
        JsonlWriter {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Append one record. An interrupted run keeps every trial written so far.
    ///
    /// Records from a different schema version are refused.
    pub fn append(&self, record: &BenchRecord) -> Result<(), BenchError> {
        if record.schema_version != SCHEMA_VERSION {
            return Err(BenchError::Message(format!(
                "schema version mismatch: record has v{}, expected v{}",
                record.schema_version, SCHEMA_VERSION
            )));
        }
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)?;
        }

        let line = serde_json::to_string(record)
            .map_err(|e| BenchError::Message(format!("failed to serialize record: {e}")))?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{line}")?;
        Ok(())
    }

    /// Read every record back in file order.
    pub fn read_all(&self) -> Result<Vec<BenchRecord>, BenchError> {
        let file = File::open(&self.path).map_err(|e| {
            BenchError::Message(format!("failed to open {}: {e}", self.path.display()))
        })?;
        serde_json::Deserializer::from_reader(BufReader::new(file))
            .into_iter::<BenchRecord>()
            .enumerate()
            .map(|(i, r)| {
                r.map_err(|e| BenchError::Message(format!("record {}: {e}", i + 1)))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::env::EnvironmentInfo;
    use crate::core::schema::{PlatformInfo, RunConfig, TrialStatus};

    fn make_test_record(workload: &str) -> BenchRecord {
        BenchRecord::new(
            workload.to_string(),
            format!("{workload} 1"),
            PlatformInfo {
                runtime_id: "host".to_string(),
                entry_id: None,
                attestation: None,
            },
            EnvironmentInfo::default(),
            RunConfig::default(),
        )
    }

    #[test]
    fn test_schema_version_validation() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.jsonl");
        let writer = JsonlWriter::new(&path);

        let mut record = make_test_record("fannkuch");
        record.schema_version = 999;

        let err = writer.append(&record).unwrap_err();
        assert!(err.to_string().contains("schema version mismatch"));
        assert!(!path.exists());
    }

    #[test]
    fn test_append_creates_directory_and_preserves_order() {
        let dir = tempfile::tempdir().unwrap();
        let writer = JsonlWriter::new(dir.path().join("nested").join("runs.jsonl"));

        writer.append(&make_test_record("fannkuch")).unwrap();
        let mut failed = make_test_record("nbody");
        failed.fail("load error: no hardware");
        writer.append(&failed).unwrap();

        let records = writer.read_all().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].workload, "fannkuch");
        assert_eq!(records[1].status, TrialStatus::Failed);
        assert_eq!(records[1].error.as_deref(), Some("load error: no hardware"));
    }

    #[test]
    fn test_read_reports_bad_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("runs.jsonl");
        let writer = JsonlWriter::new(&path);
        writer.append(&make_test_record("empty")).unwrap();
        std::fs::OpenOptions::new()
            .append(true)
            .open(&path)
            .unwrap()
            .write_all(b"{not json}\n")
            .unwrap();
        let err = writer.read_all().unwrap_err();
        assert!(err.to_string().contains("record 2"), "{err}");
    }

    #[test]
    fn test_read_missing_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(JsonlWriter::new(dir.path().join("absent.jsonl")).read_all().is_err());
    }
}
