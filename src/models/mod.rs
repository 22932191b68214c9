//! Data models module
//!
//! Contains the per-run report, speedup computation and host description.

pub mod result;

// Re-export commonly used types
pub use result::{compute_speedup, HostInfo, Measurement, RunContext, RunReport};
