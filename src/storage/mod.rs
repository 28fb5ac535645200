//! Storage layer for benchmark records.
//!
//! This module provides persistence for `BenchRecord` data in various formats.

pub mod csv;
pub mod jsonl;

// Re-export key types
pub use csv::{CSV_HEADERS, CsvExporter};
pub use jsonl::JsonlWriter;
