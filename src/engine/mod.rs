//! Engine module: drives backends through benchmark trials.
//!
//! # Architecture
//!
//! - **Runner**: `BenchmarkRunner` owns at most one started backend and walks
//!   the `Idle -> Ready -> Idle` lifecycle. It knows how to build a backend
//!   from a `PlatformDescriptor`, nothing about timing.
//!
//! - **Trial**: `TrialDriver` wraps a fresh runner per (workload, platform)
//!   pair, times setup, warmup, measured iterations and teardown, and emits a
//!   `BenchRecord` for each trial.
//!
//! # Boundaries
//!
//! - The runner does NOT measure anything; the trial driver does NOT know how
//!   backends are loaded.
//! - Backends are defined in `crate::backend`, workloads in `crate::workload`.

pub mod runner;
pub mod trial;

pub use runner::{BenchmarkRunner, RunnerState};
pub use trial::{TrialDriver, TrialPlan};
