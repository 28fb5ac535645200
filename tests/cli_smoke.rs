//! Smoke tests for the `enclave-bench` binary.

use std::process::Command;

use enclave_bench::core::TrialStatus;
use enclave_bench::storage::JsonlWriter;

fn bin() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_enclave-bench"));
    cmd.env("ENCLAVE_BENCH_LOG", "off");
    cmd
}

#[test]
fn list_prints_catalogue() {
    let out = bin().arg("list").output().unwrap();
    assert!(out.status.success());
    let stdout = String::from_utf8(out.stdout).unwrap();
    assert!(stdout.contains("nbody 10000000"));
    assert!(stdout.contains("binary_trees"));
    assert!(stdout.contains("isolated-simulation"));
}

#[test]
fn run_host_and_unknown_platform_records_both() {
    let dir = tempfile::tempdir().unwrap();
    let jsonl = dir.path().join("runs.jsonl");
    let csv = dir.path().join("runs.csv");

    let out = bin()
        .args(["run", "--skip-probe", "--platform", "host,avian-simulation"])
        .args(["--workload", "empty,pidigits", "--warmup", "0", "--iterations", "2"])
        .arg("--jsonl")
        .arg(&jsonl)
        .arg("--csv")
        .arg(&csv)
        .output()
        .unwrap();
    assert!(
        out.status.success(),
        "{}",
        String::from_utf8_lossy(&out.stderr)
    );

    let records = JsonlWriter::new(&jsonl).read_all().unwrap();
    assert_eq!(records.len(), 4);
    let host: Vec<_> = records
        .iter()
        .filter(|r| r.platform.runtime_id == "host")
        .collect();
    assert_eq!(host.len(), 2);
    assert!(host.iter().all(|r| r.status == TrialStatus::Ok));
    assert!(host.iter().all(|r| r.iteration_stats.as_ref().unwrap().iterations == 2));
    let unknown = records
        .iter()
        .filter(|r| r.platform.runtime_id == "avian-simulation");
    assert!(unknown.into_iter().all(|r| r.status == TrialStatus::Failed));

    assert_eq!(std::fs::read_to_string(&csv).unwrap().lines().count(), 5);
}

#[test]
fn run_rejects_zero_iterations() {
    let out = bin()
        .args(["run", "--skip-probe", "--platform", "host", "--iterations", "0"])
        .output()
        .unwrap();
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("iterations"));
}

#[test]
fn worker_rejects_unknown_image() {
    let out = bin()
        .args(["worker", "--image", "com.example.Missing"])
        .output()
        .unwrap();
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stdout).starts_with("err "));
}
