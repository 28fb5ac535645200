//! CSV export for benchmark records.

use std::io::Write;
use std::path::Path;

use crate::BenchError;
use crate::core::schema::{BenchRecord, TrialStatus};

/// CSV column headers in deterministic order.
pub const CSV_HEADERS: &[&str] = &[
    "schema_version",
    "record_id",
    "timestamp",
    "workload",
    "command",
    "runtime_id",
    "entry_id",
    "attestation",
    "status",
    "error",
    "git_sha",
    "warmup",
    "iterations",
    "ops_per_iteration",
    "setup_ms",
    "teardown_ms",
    "iteration_mean_ms",
    "iteration_stddev_ms",
    "iteration_min_ms",
    "iteration_max_ms",
    "ops_per_sec_mean",
    "ops_per_sec_stddev",
    "rss_mb_after_trial",
];

/// CSV exporter for benchmark records.
///
/// Flattens each record into one row with a fixed column order so runs can be
/// diffed or pasted into a spreadsheet.
#[derive(Debug, Clone, Default)]
pub struct CsvExporter;

impl CsvExporter {
    pub fn new() -> Self {
        CsvExporter
    }

    /// Export records to a CSV file, replacing it if present.
    pub fn export(&self, records: &[BenchRecord], output: &Path) -> Result<(), BenchError> {
        if let Some(parent) = output.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| BenchError::Message(format!("failed to create directory: {e}")))?;
            }
        }

        let file = std::fs::File::create(output)
            .map_err(|e| BenchError::Message(format!("failed to create file: {e}")))?;

        self.export_to_writer(records, file)
    }

    pub fn export_to_writer<W: Write>(
        &self,
        records: &[BenchRecord],
        writer: W,
    ) -> Result<(), BenchError> {
        let mut csv_writer = csv::Writer::from_writer(writer);

        csv_writer
            .write_record(CSV_HEADERS)
            .map_err(|e| BenchError::Message(format!("failed to write CSV headers: {e}")))?;

        for record in records {
            csv_writer
                .write_record(&self.record_to_row(record))
                .map_err(|e| BenchError::Message(format!("failed to write CSV row: {e}")))?;
        }

        csv_writer
            .flush()
            .map_err(|e| BenchError::Message(format!("failed to flush CSV writer: {e}")))?;

        Ok(())
    }

    fn record_to_row(&self, record: &BenchRecord) -> Vec<String> {
        let ms = |v: Option<f64>| v.map(|v| format!("{v:.3}")).unwrap_or_default();
        let stats = record.iteration_stats.as_ref();
        let throughput = record.throughput.as_ref();

        vec![
            record.schema_version.to_string(),
            record.record_id.clone(),
            record.timestamp.clone(),
            record.workload.clone(),
            record.command.clone(),
            record.platform.runtime_id.clone(),
            record.platform.entry_id.clone().unwrap_or_default(),
            record.platform.attestation.clone().unwrap_or_default(),
            match record.status {
                TrialStatus::Ok => "ok".to_string(),
                TrialStatus::Failed => "failed".to_string(),
            },
            record.error.clone().unwrap_or_default(),
            record.env.git_sha().unwrap_or_default().to_string(),
            record.config.warmup_iterations.to_string(),
            record.config.measured_iterations.to_string(),
            record.config.ops_per_iteration.to_string(),
            ms(record.setup_ms),
            ms(record.teardown_ms),
            ms(stats.map(|s| s.mean_ms)),
            ms(stats.and_then(|s| s.stddev_ms)),
            ms(stats.map(|s| s.min_ms)),
            ms(stats.map(|s| s.max_ms)),
            ms(throughput.map(|t| t.mean_ops_per_sec)),
            ms(throughput.and_then(|t| t.stddev_ops_per_sec)),
            record
                .rss_mb_after_trial
                .map(|v| format!("{v:.2}"))
                .unwrap_or_default(),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::env::EnvironmentInfo;
    use crate::core::schema::{PlatformInfo, RunConfig, ThroughputStat, TimingStat};

    fn make_test_record(workload: &str) -> BenchRecord {
        BenchRecord::new(
            workload.to_string(),
            format!("{workload} 10"),
            PlatformInfo {
                runtime_id: "isolated-simulation".to_string(),
                entry_id: Some("enclave_bench.simulation.BenchmarkEnclave".to_string()),
                attestation: Some("dcap".to_string()),
            },
            EnvironmentInfo::default(),
            RunConfig::default(),
        )
    }

    fn column(name: &str) -> usize {
        CSV_HEADERS.iter().position(|h| *h == name).unwrap()
    }

    #[test]
    fn test_record_to_row_length() {
        let row = CsvExporter::new().record_to_row(&make_test_record("fannkuch"));
        assert_eq!(row.len(), CSV_HEADERS.len());
    }

    #[test]
    fn test_export_to_writer() {
        let exporter = CsvExporter::new();
        let mut record = make_test_record("fannkuch");
        record.setup_ms = Some(12.5);
        record.iteration_stats = Some(TimingStat::from_samples(&[100.0, 110.0, 105.0]));
        record.throughput = ThroughputStat::from_iterations(&[100.0, 110.0, 105.0], 1);

        let mut buffer = Vec::new();
        exporter.export_to_writer(&[record], &mut buffer).unwrap();

        let csv_str = String::from_utf8(buffer).unwrap();
        let lines: Vec<&str> = csv_str.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("schema_version,record_id,timestamp,workload"));
        assert!(lines[1].contains("fannkuch 10"));
        assert!(lines[1].contains("isolated-simulation"));
        assert!(lines[1].contains("12.500"));
        assert!(lines[1].contains("105.000"));
    }

    #[test]
    fn test_failed_record_row() {
        let mut record = make_test_record("nbody");
        record.fail("load error: hardware isolation unavailable");
        let row = CsvExporter::new().record_to_row(&record);
        assert_eq!(row[column("status")], "failed");
        assert_eq!(row[column("error")], "load error: hardware isolation unavailable");
        assert_eq!(row[column("iteration_mean_ms")], "");
        assert_eq!(row[column("setup_ms")], "");
    }

    #[test]
    fn test_rss_column_is_after_trial_sample() {
        let mut record = make_test_record("binarytrees");
        record.rss_mb_after_trial = Some(42.25);
        let row = CsvExporter::new().record_to_row(&record);
        assert_eq!(row[column("rss_mb_after_trial")], "42.25");
        assert!(!CSV_HEADERS.iter().any(|h| h.contains("peak")));
    }

    #[test]
    fn test_export_to_file_and_empty() {
        let dir = tempfile::tempdir().unwrap();
        let output_path = dir.path().join("out").join("runs.csv");
        CsvExporter::new()
            .export(&[make_test_record("pidigits")], &output_path)
            .unwrap();
        let contents = std::fs::read_to_string(&output_path).unwrap();
        assert!(contents.contains("pidigits"));

        let mut buffer = Vec::new();
        CsvExporter::new().export_to_writer(&[], &mut buffer).unwrap();
        assert_eq!(String::from_utf8(buffer).unwrap().lines().count(), 1);
    }
}
