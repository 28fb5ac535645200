//! `run`, `list` and `probe` command implementations.

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use tracing::{info, warn};

use crate::backend::{ProcessLoader, RuntimeLoader};
use crate::config::{BenchConfig, ResolvedRun, RunOverrides, load_bench_config};
use crate::core::{BenchRecord, EnvironmentInfo, RunConfig, TrialStatus};
use crate::engine::{TrialDriver, TrialPlan};
use crate::platform::{CapabilityProbe, RuntimeKind, SystemIsolationSupport, probe_once};
use crate::storage::{CsvExporter, JsonlWriter};
use crate::workload::{WorkloadId, WorkloadRegistry, command_for};
use crate::{BenchError, BenchResult};

/// Arguments of `enclave-bench run` as parsed from the command line.
#[derive(Debug, Clone, Default)]
pub struct RunArgs {
    pub config: Option<PathBuf>,
    pub overrides: RunOverrides,
    pub skip_probe: bool,
}

pub fn run(args: RunArgs) -> BenchResult<()> {
    let file_cfg = match &args.config {
        Some(path) => load_bench_config(path)?,
        None => BenchConfig::default(),
    };
    let resolved = file_cfg.resolve(args.overrides)?;

    let mut env = EnvironmentInfo::detect();
    if args.skip_probe {
        info!("capability probe skipped");
    } else {
        env = env.with_isolation(probe_once().clone());
    }

    let loader = ProcessLoader::current_exe()?;
    let cli_args: Vec<String> = std::env::args().collect();
    let stdout = std::io::stdout();
    let records = execute(
        &resolved,
        Arc::new(loader),
        env,
        cli_args,
        &mut stdout.lock(),
    )?;

    let failed = records
        .iter()
        .filter(|r| r.status == TrialStatus::Failed)
        .count();
    if failed > 0 {
        warn!(failed, total = records.len(), "some trials failed");
    }
    Ok(())
}

/// Run every trial of `resolved`, persisting and summarising records as they complete.
pub fn execute<W: Write>(
    resolved: &ResolvedRun,
    loader: Arc<dyn RuntimeLoader>,
    env: EnvironmentInfo,
    cli_args: Vec<String>,
    out: &mut W,
) -> BenchResult<Vec<BenchRecord>> {
    let plan = TrialPlan {
        workloads: resolved.workloads.clone(),
        platforms: resolved.platforms.clone(),
        config: RunConfig {
            warmup_iterations: resolved.warmup,
            measured_iterations: resolved.iterations,
            ..RunConfig::default()
        },
    };
    let driver = TrialDriver::new(Arc::new(WorkloadRegistry::builtin()), loader, env)
        .with_cli_args(cli_args);
    let jsonl = resolved.jsonl.as_ref().map(JsonlWriter::new);

    info!(
        workloads = plan.workloads.len(),
        platforms = plan.platforms.len(),
        warmup = plan.config.warmup_iterations,
        iterations = plan.config.measured_iterations,
        "starting run"
    );

    let records = driver.run_plan(&plan, |record| {
        if let Some(writer) = &jsonl {
            writer.append(record)?;
        }
        writeln!(out, "{}", summary_line(record))?;
        Ok(())
    })?;

    if let Some(path) = &resolved.csv {
        CsvExporter::new().export(&records, path)?;
        info!(path = %path.display(), rows = records.len(), "wrote csv");
    }
    Ok(records)
}

/// One human-readable line per trial.
pub fn summary_line(record: &BenchRecord) -> String {
    let label = format!("{:<14} {:<20}", record.workload, record.platform.runtime_id);
    match (&record.status, &record.throughput) {
        (TrialStatus::Ok, Some(t)) => format!(
            "{label} {:>14.3} ops/s  (± {:.3}, setup {:.1} ms)",
            t.mean_ops_per_sec,
            t.stddev_ops_per_sec.unwrap_or(0.0),
            record.setup_ms.unwrap_or(0.0)
        ),
        (TrialStatus::Ok, None) => format!("{label} {:>14}", "n/a"),
        (TrialStatus::Failed, _) => format!(
            "{label} FAILED: {}",
            record.error.as_deref().unwrap_or("unknown error")
        ),
    }
}

/// Print every workload with its command, then the known platforms.
pub fn list<W: Write>(out: &mut W) -> BenchResult<()> {
    writeln!(out, "workloads:")?;
    for id in WorkloadId::ALL {
        writeln!(out, "  {:<14} {}", id.bench_name(), command_for(id))?;
    }
    writeln!(out, "platforms:")?;
    for kind in RuntimeKind::ALL {
        match kind.entry_id() {
            Some(entry) => writeln!(out, "  {:<20} {}", kind.runtime_id(), entry)?,
            None => writeln!(out, "  {:<20} (in-process)", kind.runtime_id())?,
        }
    }
    Ok(())
}

/// Report hardware isolation support. With `strict`, missing support is an error.
pub fn probe<W: Write>(strict: bool, out: &mut W) -> BenchResult<()> {
    let outcome = CapabilityProbe::run(&SystemIsolationSupport::default(), out);
    writeln!(out, "{}", serde_json::to_string(&outcome).map_err(anyhow::Error::from)?)?;
    if strict && !outcome.hardware_available() {
        return Err(BenchError::UnsupportedPlatform(
            "hardware isolation is not available".into(),
        ));
    }
    Ok(())
}
