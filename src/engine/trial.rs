//! Trial driver: runs each (workload, platform) pair as one trial and records its timings.
//!
//! Each trial gets its own `BenchmarkRunner`: setup once, warmup iterations,
//! measured iterations, teardown. Setup and teardown are timed separately and
//! are never part of an iteration. A failed trial produces a record with
//! `status = failed` and the run moves on to the next trial.

use std::sync::Arc;
use std::time::Instant;

use tracing::{info, info_span, warn};

use crate::backend::RuntimeLoader;
use crate::core::{BenchRecord, EnvironmentInfo, PlatformInfo, RunConfig, ThroughputStat, TimingStat};
use crate::platform::{PlatformDescriptor, RuntimeKind};
use crate::workload::{WorkloadId, WorkloadRegistry, command_for};
use crate::{BenchError, BenchResult};

use super::runner::BenchmarkRunner;

/// What to run: every workload on every platform, with one iteration config.
#[derive(Debug, Clone)]
pub struct TrialPlan {
    pub workloads: Vec<WorkloadId>,
    pub platforms: Vec<PlatformDescriptor>,
    pub config: RunConfig,
}

impl TrialPlan {
    pub fn validate(&self) -> BenchResult<()> {
        if self.config.measured_iterations == 0 {
            return Err(BenchError::Configuration(
                "iterations must be at least 1".into(),
            ));
        }
        if self.config.ops_per_iteration == 0 {
            return Err(BenchError::Configuration(
                "ops per iteration must be at least 1".into(),
            ));
        }
        if self.workloads.is_empty() {
            return Err(BenchError::Configuration("no workloads selected".into()));
        }
        if self.platforms.is_empty() {
            return Err(BenchError::Configuration("no platforms selected".into()));
        }
        Ok(())
    }
}

pub struct TrialDriver {
    registry: Arc<WorkloadRegistry>,
    loader: Arc<dyn RuntimeLoader>,
    env: EnvironmentInfo,
    cli_args: Vec<String>,
}

impl TrialDriver {
    pub fn new(
        registry: Arc<WorkloadRegistry>,
        loader: Arc<dyn RuntimeLoader>,
        env: EnvironmentInfo,
    ) -> Self {
        TrialDriver {
            registry,
            loader,
            env,
            cli_args: Vec::new(),
        }
    }

    pub fn with_cli_args(mut self, args: Vec<String>) -> Self {
        self.cli_args = args;
        self
    }

    /// Run the whole plan, handing each record to `on_record` as soon as it is complete.
    pub fn run_plan<F>(&self, plan: &TrialPlan, mut on_record: F) -> BenchResult<Vec<BenchRecord>>
    where
        F: FnMut(&BenchRecord) -> BenchResult<()>,
    {
        plan.validate()?;
        let mut records = Vec::with_capacity(plan.workloads.len() * plan.platforms.len());
        for workload in &plan.workloads {
            for platform in &plan.platforms {
                let record = self.run_trial(*workload, platform, &plan.config);
                on_record(&record)?;
                records.push(record);
            }
        }
        Ok(records)
    }

    /// Run one trial. Never fails; failures are captured in the returned record.
    pub fn run_trial(
        &self,
        workload: WorkloadId,
        platform: &PlatformDescriptor,
        config: &RunConfig,
    ) -> BenchRecord {
        let span = info_span!("trial", workload = %workload, platform = %platform.runtime_id);
        let _guard = span.enter();

        let command = command_for(workload);
        let mut record = BenchRecord::new(
            workload.bench_name().to_string(),
            command.to_string(),
            platform_info(platform),
            self.env.clone(),
            config.clone(),
        );
        record.cli_args = self.cli_args.clone();

        let mut runner = BenchmarkRunner::new(self.registry.clone(), self.loader.clone());

        let setup_start = Instant::now();
        if let Err(e) = runner.setup(platform) {
            warn!(error = %e, "trial setup failed");
            record.fail(e);
            return record;
        }
        record.setup_ms = Some(elapsed_ms(setup_start));

        let measured = measure(&mut runner, workload, config);

        let teardown_start = Instant::now();
        runner.teardown();
        record.teardown_ms = Some(elapsed_ms(teardown_start));

        match measured {
            Ok(samples) => {
                record.throughput = ThroughputStat::from_iterations(&samples, config.ops_per_iteration);
                record.iteration_stats = Some(TimingStat::from_samples(&samples));
                if let Some(t) = &record.throughput {
                    info!(ops_per_sec = t.mean_ops_per_sec, "trial complete");
                }
            }
            Err(e) => {
                warn!(error = %e, "trial dispatch failed");
                record.fail(e);
            }
        }
        record.rss_mb_after_trial = current_rss_mb();
        record
    }
}

fn platform_info(platform: &PlatformDescriptor) -> PlatformInfo {
    PlatformInfo {
        runtime_id: platform.runtime_id.clone(),
        entry_id: RuntimeKind::resolve(&platform.runtime_id)
            .ok()
            .and_then(|k| k.entry_id())
            .map(str::to_string),
        attestation: platform.attestation.map(|a| a.to_string()),
    }
}

/// Run warmup then measured iterations; returns wall time per measured iteration.
fn measure(runner: &mut BenchmarkRunner, workload: WorkloadId, config: &RunConfig) -> BenchResult<Vec<f64>> {
    let warmup = config.warmup_iterations as usize;
    let total = warmup + config.measured_iterations as usize;
    let mut samples = Vec::with_capacity(config.measured_iterations as usize);

    for i in 0..total {
        let start = Instant::now();
        for _ in 0..config.ops_per_iteration {
            runner.dispatch(workload)?;
        }
        let ms = elapsed_ms(start);
        if i >= warmup {
            samples.push(ms);
        } else {
            tracing::debug!(iteration = i, ms, "warmup");
        }
    }
    Ok(samples)
}

fn elapsed_ms(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1000.0
}

#[cfg(feature = "mem")]
fn current_rss_mb() -> Option<f64> {
    use sysinfo::{ProcessRefreshKind, RefreshKind, System};
    let pid = sysinfo::get_current_pid().ok()?;
    let mut sys = System::new_with_specifics(
        RefreshKind::new().with_processes(ProcessRefreshKind::new().with_memory()),
    );
    sys.refresh_process(pid);
    sys.process(pid)
        .map(|p| p.memory() as f64 / (1024.0 * 1024.0))
}

#[cfg(not(feature = "mem"))]
fn current_rss_mb() -> Option<f64> {
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{MockConfig, MockLoader};
    use crate::core::TrialStatus;

    fn driver(loader: MockLoader) -> TrialDriver {
        TrialDriver::new(
            Arc::new(WorkloadRegistry::builtin()),
            Arc::new(loader),
            EnvironmentInfo::default(),
        )
    }

    fn config(warmup: u32, iterations: u32) -> RunConfig {
        RunConfig {
            warmup_iterations: warmup,
            measured_iterations: iterations,
            ops_per_iteration: 1,
        }
    }

    #[test]
    fn test_trial_runs_warmup_and_measured_iterations() {
        let loader = MockLoader::default();
        let d = driver(loader.clone());
        let record = d.run_trial(
            WorkloadId::Fannkuch,
            &PlatformDescriptor::new("isolated-simulation"),
            &config(2, 3),
        );
        assert_eq!(record.status, TrialStatus::Ok);
        assert_eq!(loader.calls().len(), 5);
        assert_eq!(record.iteration_stats.as_ref().unwrap().iterations, 3);
        assert!(record.setup_ms.is_some());
        assert!(record.teardown_ms.is_some());
        assert_eq!(loader.close_count(), 1);
        assert_eq!(record.platform.entry_id.as_deref(), Some(crate::platform::SIMULATION_ENTRY));
    }

    #[test]
    fn test_failed_setup_is_recorded() {
        let d = driver(MockLoader::default());
        let record = d.run_trial(WorkloadId::Empty, &PlatformDescriptor::new("nope"), &config(0, 1));
        assert_eq!(record.status, TrialStatus::Failed);
        assert!(record.error.unwrap().contains("configuration error"));
        assert!(record.setup_ms.is_none());
    }

    #[test]
    fn test_failed_dispatch_still_tears_down() {
        let loader = MockLoader::new(MockConfig::new().fail_workload("nbody"));
        let d = driver(loader.clone());
        let record = d.run_trial(
            WorkloadId::Nbody,
            &PlatformDescriptor::new("isolated-debug"),
            &config(1, 1),
        );
        assert_eq!(record.status, TrialStatus::Failed);
        assert_eq!(loader.calls().len(), 1);
        assert_eq!(loader.close_count(), 1);
        assert!(record.teardown_ms.is_some());
    }

    #[test]
    fn test_plan_produces_record_per_pair() {
        let d = driver(MockLoader::default());
        let plan = TrialPlan {
            workloads: vec![WorkloadId::Empty, WorkloadId::Fannkuch],
            platforms: vec![
                PlatformDescriptor::new("isolated-simulation"),
                PlatformDescriptor::new("bogus"),
            ],
            config: config(0, 1),
        };
        let mut seen = 0;
        let records = d
            .run_plan(&plan, |_| {
                seen += 1;
                Ok(())
            })
            .unwrap();
        assert_eq!(records.len(), 4);
        assert_eq!(seen, 4);
        let failed = records.iter().filter(|r| r.status == TrialStatus::Failed).count();
        assert_eq!(failed, 2);
    }

    #[test]
    fn test_plan_rejects_zero_iterations() {
        let d = driver(MockLoader::default());
        let plan = TrialPlan {
            workloads: vec![WorkloadId::Empty],
            platforms: vec![PlatformDescriptor::new("host")],
            config: config(0, 0),
        };
        assert!(matches!(
            d.run_plan(&plan, |_| Ok(())),
            Err(BenchError::Configuration(_))
        ));
    }
}
