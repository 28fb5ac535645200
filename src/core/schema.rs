//! BenchRecord schema v1 - canonical record for one (workload, platform) trial.

use serde::{Deserialize, Serialize};

use super::env::EnvironmentInfo;

/// Schema version for forward compatibility
pub const SCHEMA_VERSION: u32 = 1;

/// Timing statistics over measured iterations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimingStat {
    pub iterations: u32,
    pub mean_ms: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub median_ms: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stddev_ms: Option<f64>,
    pub min_ms: f64,
    pub max_ms: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub p95_ms: Option<f64>,
}

impl TimingStat {
    /// Create TimingStat from a slice of sample times in milliseconds
    pub fn from_samples(samples: &[f64]) -> Self {
        let n = samples.len();
        if n == 0 {
            return TimingStat {
                iterations: 0,
                mean_ms: 0.0,
                median_ms: None,
                stddev_ms: None,
                min_ms: 0.0,
                max_ms: 0.0,
                p95_ms: None,
            };
        }

        let mean_ms = samples.iter().sum::<f64>() / n as f64;
        let min_ms = samples.iter().cloned().fold(f64::INFINITY, f64::min);
        let max_ms = samples.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        let variance: f64 = samples.iter().map(|x| (x - mean_ms).powi(2)).sum::<f64>() / n as f64;

        let mut sorted = samples.to_vec();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        let median_ms = if n % 2 == 0 {
            (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
        } else {
            sorted[n / 2]
        };
        // p95: index = ceil(0.95 * n) - 1, clamped
        let p95_idx = ((0.95 * n as f64).ceil() as usize)
            .saturating_sub(1)
            .min(n - 1);

        TimingStat {
            iterations: n as u32,
            mean_ms,
            median_ms: Some(median_ms),
            stddev_ms: Some(variance.sqrt()),
            min_ms,
            max_ms,
            p95_ms: Some(sorted[p95_idx]),
        }
    }
}

/// Throughput in operations per second, one sample per measured iteration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThroughputStat {
    pub mean_ops_per_sec: f64,
    pub min_ops_per_sec: f64,
    pub max_ops_per_sec: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stddev_ops_per_sec: Option<f64>,
}

impl ThroughputStat {
    /// Derive throughput from per-iteration wall times and the ops run in each iteration.
    ///
    /// Iterations with a zero duration are skipped.
    pub fn from_iterations(iteration_ms: &[f64], ops_per_iteration: u32) -> Option<Self> {
        let rates: Vec<f64> = iteration_ms
            .iter()
            .filter(|ms| **ms > 0.0)
            .map(|ms| ops_per_iteration as f64 * 1000.0 / ms)
            .collect();
        if rates.is_empty() {
            return None;
        }
        let n = rates.len() as f64;
        let mean = rates.iter().sum::<f64>() / n;
        let variance = rates.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / n;
        Some(ThroughputStat {
            mean_ops_per_sec: mean,
            min_ops_per_sec: rates.iter().cloned().fold(f64::INFINITY, f64::min),
            max_ops_per_sec: rates.iter().cloned().fold(f64::NEG_INFINITY, f64::max),
            stddev_ops_per_sec: Some(variance.sqrt()),
        })
    }
}

/// Platform a trial ran on
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlatformInfo {
    pub runtime_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entry_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attestation: Option<String>,
}

/// Run configuration for a trial
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    pub warmup_iterations: u32,
    pub measured_iterations: u32,
    pub ops_per_iteration: u32,
}

impl Default for RunConfig {
    fn default() -> Self {
        RunConfig {
            warmup_iterations: 2,
            measured_iterations: 5,
            ops_per_iteration: 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrialStatus {
    Ok,
    Failed,
}

/// Canonical benchmark record - one per (workload, platform) trial
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchRecord {
    /// Schema version for forward compatibility
    pub schema_version: u32,

    /// Unique identifier for this record
    pub record_id: String,

    /// ISO 8601 timestamp
    pub timestamp: String,

    /// Benchmark name (e.g. `spectral_norm`)
    pub workload: String,

    /// Command line sent to the backend
    pub command: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command_sha256: Option<String>,

    pub platform: PlatformInfo,

    /// Environment information (CPU, OS, git, isolation support)
    pub env: EnvironmentInfo,

    pub config: RunConfig,

    pub status: TrialStatus,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Backend setup time (load + start for isolated runtimes)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub setup_ms: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub teardown_ms: Option<f64>,

    /// Wall time per measured iteration
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iteration_stats: Option<TimingStat>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub throughput: Option<ThroughputStat>,

    /// Resident set size of the harness process after the trial, in MB
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rss_mb_after_trial: Option<f64>,

    /// Command line arguments used
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cli_args: Vec<String>,
}

impl BenchRecord {
    /// Create a new BenchRecord with required fields
    pub fn new(
        workload: String,
        command: String,
        platform: PlatformInfo,
        env: EnvironmentInfo,
        config: RunConfig,
    ) -> Self {
        let timestamp = crate::now_string();
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or(0);
        let compact: String = timestamp
            .chars()
            .take(19)
            .filter(|c| !matches!(c, ':' | '-' | 'T'))
            .collect();
        let record_id = format!("{nanos:x}-{compact}");

        BenchRecord {
            schema_version: SCHEMA_VERSION,
            record_id,
            timestamp,
            command_sha256: Some(crate::sha256_hex(command.as_bytes())),
            workload,
            command,
            platform,
            env,
            config,
            status: TrialStatus::Ok,
            error: None,
            setup_ms: None,
            teardown_ms: None,
            iteration_stats: None,
            throughput: None,
            rss_mb_after_trial: None,
            cli_args: Vec::new(),
        }
    }

    /// Mark the trial as failed with the given error.
    pub fn fail(&mut self, error: impl std::fmt::Display) {
        self.status = TrialStatus::Failed;
        self.error = Some(error.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timing_stat_from_samples() {
        let samples = vec![100.0, 110.0, 105.0, 115.0, 120.0];
        let stat = TimingStat::from_samples(&samples);

        assert_eq!(stat.iterations, 5);
        assert!((stat.mean_ms - 110.0).abs() < 0.001);
        assert_eq!(stat.min_ms, 100.0);
        assert_eq!(stat.max_ms, 120.0);
        assert_eq!(stat.median_ms, Some(110.0));
        // sqrt((100 + 0 + 25 + 25 + 100) / 5) = sqrt(50)
        assert!((stat.stddev_ms.unwrap() - 7.071).abs() < 0.01);
        assert_eq!(stat.p95_ms, Some(120.0));
    }

    #[test]
    fn test_timing_stat_empty_samples() {
        let stat = TimingStat::from_samples(&[]);
        assert_eq!(stat.iterations, 0);
        assert_eq!(stat.mean_ms, 0.0);
        assert!(stat.median_ms.is_none());
    }

    #[test]
    fn test_throughput_from_iterations() {
        // 2 ops in 500ms = 4 ops/s, 2 ops in 1000ms = 2 ops/s
        let t = ThroughputStat::from_iterations(&[500.0, 1000.0], 2).unwrap();
        assert!((t.mean_ops_per_sec - 3.0).abs() < 1e-9);
        assert_eq!(t.min_ops_per_sec, 2.0);
        assert_eq!(t.max_ops_per_sec, 4.0);
        assert!(ThroughputStat::from_iterations(&[0.0], 1).is_none());
        assert!(ThroughputStat::from_iterations(&[], 1).is_none());
    }

    #[test]
    fn test_new_record_defaults() {
        let platform = PlatformInfo {
            runtime_id: "host".into(),
            entry_id: None,
            attestation: None,
        };
        let mut record = BenchRecord::new(
            "fannkuch".into(),
            "fannkuch 10".into(),
            platform,
            EnvironmentInfo::default(),
            RunConfig::default(),
        );
        assert_eq!(record.schema_version, SCHEMA_VERSION);
        assert!(!record.record_id.is_empty());
        assert_eq!(record.status, TrialStatus::Ok);
        assert_eq!(record.command_sha256.as_deref().map(str::len), Some(64));
        record.fail("boom");
        assert_eq!(record.status, TrialStatus::Failed);
        assert_eq!(record.error.as_deref(), Some("boom"));
    }
}
