//! Core types and schemas for enclave-bench.
//!
//! This module contains the canonical `BenchRecord` schema (v1) used for all benchmark outputs.

pub mod env;
pub mod schema;

// Re-export key types for convenience
pub use env::EnvironmentInfo;
pub use schema::{
    BenchRecord, PlatformInfo, RunConfig, SCHEMA_VERSION, ThroughputStat, TimingStat, TrialStatus,
};
