//! PARTBENCH - Partitioned Benchmark Runner
//!
//! Measures single-threaded versus multi-threaded throughput of CPU-bound
//! workloads by splitting an integer range into contiguous partitions,
//! running them on a per-run worker pool and comparing wall-clock times.

use std::time::Duration;

use thiserror::Error;

// Public re-exports
pub mod bench;
pub mod cli;
pub mod config;
pub mod models;
pub mod report;
pub mod util;
pub mod workload;

pub use workload::WorkloadError;

/// Errors surfaced by the benchmark runner
#[derive(Debug, Error)]
pub enum PartbenchError {
    /// Worker count, range or other setting rejected before anything was scheduled
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
    /// A workload invocation failed while the batch was running
    #[error("Worker failure in partition {index}: {cause}")]
    WorkerFailure {
        /// Index of the first failing partition
        index: usize,
        /// Error raised by the workload
        #[source]
        cause: WorkloadError,
    },
    /// The concurrent batch did not finish within the configured limit
    #[error("Batch timed out after {}", humantime::format_duration(*.0))]
    Timeout(Duration),
    /// I/O error (runtime start-up, config file access)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// Report serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl PartbenchError {
    /// Process exit code for this error
    pub fn exit_code(&self) -> u8 {
        match self {
            PartbenchError::InvalidConfiguration(_) => 2,
            _ => 1,
        }
    }
}

/// Result type alias for PARTBENCH operations
pub type Result<T> = std::result::Result<T, PartbenchError>;

/// Error handling utilities
pub mod error {
    use super::PartbenchError;

    /// Convert error to user-friendly message with suggestions
    pub fn user_friendly_message(error: &PartbenchError) -> String {
        match error {
            PartbenchError::InvalidConfiguration(msg) => {
                format!("Configuration error: {}. Check your flags, environment and config file.", msg)
            }
            PartbenchError::WorkerFailure { index, cause } => {
                format!("Partition {} failed: {}. No results were reported for this run.", index, cause)
            }
            PartbenchError::Timeout(_) => {
                format!("{}. Raise --timeout or reduce --size.", error)
            }
            _ => error.to_string(),
        }
    }
}

// Common types and constants
pub const APP_NAME: &str = "partbench";
pub const CONFIG_FILE: &str = "partbench.toml";
pub const WORKERS_ENV: &str = "PARTBENCH_WORKERS";
pub const SIZE_ENV: &str = "PARTBENCH_SIZE";
pub const MAX_WORKERS: usize = 1024;
