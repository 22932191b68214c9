//! Utility functions module
//!
//! Contains helper functions for duration formatting and parsing,
//! rates and speedup formatting.

pub mod units;

// Re-export commonly used functions
pub use units::{
    calculate_rate, format_millis, format_rate, format_speedup, parse_duration,
};
