//! Benchmark engine module
//!
//! Contains range partitioning, the per-run worker pool and the
//! sequential-versus-concurrent timing harness.

pub mod executor;
pub mod harness;
pub mod partition;

// Re-export commonly used types
pub use executor::{BatchOptions, ProgressUpdate, WorkerPool};
pub use harness::{benchmark, timed, Benchmark};
pub use partition::{partition, replicate, Partition, Plan};
