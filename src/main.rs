#![forbid(unsafe_code)]

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, fmt::format::FmtSpan};

use enclave_bench::config::RunOverrides;
use enclave_bench::platform::AttestationMode;
use enclave_bench::run_cmd::{self, RunArgs};
use enclave_bench::worker::{self, WorkerOptions};
use enclave_bench::workload::WorkloadRegistry;

#[derive(Parser, Debug)]
#[command(name = "enclave-bench")]
#[command(about = "Micro-benchmarks on host and isolated runtimes", long_about = None)]
struct Cli {
    /// Enable verbose logging (or set ENCLAVE_BENCH_LOG)
    #[arg(long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run workloads on one or more platforms
    Run {
        /// Comma separated platforms (host, isolated-simulation, isolated-debug)
        #[arg(long, value_delimiter = ',')]
        platform: Option<Vec<String>>,
        /// Comma separated workloads (default: all)
        #[arg(long, value_delimiter = ',')]
        workload: Option<Vec<String>>,
        /// Number of warmup iterations to run before measuring
        #[arg(long)]
        warmup: Option<u32>,
        /// Number of measured iterations to run
        #[arg(long)]
        iterations: Option<u32>,
        /// Attestation mode for isolated runtimes (dcap, epid)
        #[arg(long)]
        attestation: Option<String>,
        /// TOML config file
        #[arg(long, value_name = "bench.toml")]
        config: Option<PathBuf>,
        /// Append one JSON record per trial to this file
        #[arg(long)]
        jsonl: Option<PathBuf>,
        /// Write all records as CSV to this file
        #[arg(long)]
        csv: Option<PathBuf>,
        /// Do not check for hardware isolation support at start-up
        #[arg(long)]
        skip_probe: bool,
    },

    /// List workloads, their commands and the known platforms
    List,

    /// Check whether hardware isolation is available
    Probe {
        /// Exit with an error when only simulation is possible
        #[arg(long)]
        strict: bool,
    },

    /// Serve an isolated image over stdin/stdout
    #[command(hide = true)]
    Worker {
        #[arg(long)]
        image: String,
        #[arg(long)]
        attestation: Option<AttestationMode>,
        /// Hex-encoded runtime parameters
        #[arg(long)]
        params: Option<String>,
    },
}

fn init_tracing(verbose: bool) {
    let env = std::env::var("ENCLAVE_BENCH_LOG").unwrap_or_else(|_| {
        if verbose { "enclave_bench=debug".to_string() } else { "enclave_bench=info".to_string() }
    });
    let _ = tracing_subscriber::fmt()
        .with_span_events(FmtSpan::ACTIVE)
        .with_writer(std::io::stderr)
        .with_ansi(true)
        .with_env_filter(EnvFilter::new(env))
        .try_init();
}

fn main() {
    color_eyre::install().ok();
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::Run { platform, workload, warmup, iterations, attestation, config, jsonl, csv, skip_probe } => {
            run_cmd::run(RunArgs {
                config,
                overrides: RunOverrides { platforms: platform, workloads: workload, warmup, iterations, attestation, jsonl, csv },
                skip_probe,
            })
        }
        Commands::List => run_cmd::list(&mut std::io::stdout().lock()),
        Commands::Probe { strict } => run_cmd::probe(strict, &mut std::io::stdout().lock()),
        Commands::Worker { image, attestation, params } => {
            let stdin = std::io::stdin();
            let stdout = std::io::stdout();
            worker::serve(
                &WorkerOptions { image, attestation, params },
                &WorkloadRegistry::builtin(),
                stdin.lock(),
                stdout.lock(),
            )
        }
    };

    if let Err(e) = result {
        eprintln!("{:#}", e);
        std::process::exit(1);
    }
}
