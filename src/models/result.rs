//! Benchmark result data models
//!
//! Contains the report produced by one sequential-versus-concurrent run
//! and the host information printed alongside it.

use std::ops::Range;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::bench::partition::Plan;
use crate::util::units::{format_millis, format_speedup};
use crate::workload::Accumulate;

/// Ratio of sequential to concurrent elapsed time.
///
/// Undefined (`None`) when the concurrent run measured as zero.
///
/// # Examples
/// ```
/// use std::time::Duration;
/// use partbench::models::compute_speedup;
///
/// assert_eq!(compute_speedup(Duration::from_secs(6), Duration::from_secs(2)), Some(3.0));
/// assert_eq!(compute_speedup(Duration::from_millis(300), Duration::ZERO), None);
/// ```
pub fn compute_speedup(sequential: Duration, concurrent: Duration) -> Option<f64> {
    if concurrent.is_zero() {
        return None;
    }
    Some(sequential.as_secs_f64() / concurrent.as_secs_f64())
}

/// Result and elapsed time of one timed phase
#[derive(Debug, Clone, Copy)]
pub struct Measurement<T> {
    pub result: T,
    pub elapsed: Duration,
}

/// Parameters a run was executed with
#[derive(Debug, Clone)]
pub struct RunContext {
    pub workload: String,
    pub plan: Plan,
    pub range: Range<i64>,
    pub worker_count: usize,
    pub partition_count: usize,
}

/// Outcome of one benchmark invocation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport<T> {
    /// Timestamp when the run finished
    pub timestamp: DateTime<Utc>,
    /// Workload label
    pub workload: String,
    /// How the range was turned into units of work
    pub plan: Plan,
    /// First value of the input range (inclusive)
    pub range_start: i64,
    /// Last value of the input range (exclusive)
    pub range_end: i64,
    /// Worker threads in the pool
    pub worker_count: usize,
    /// Units submitted to the pool
    pub partition_count: usize,
    /// Elapsed time of the sequential baseline
    #[serde(with = "millis_serde")]
    pub sequential_time: Duration,
    /// Elapsed time of the concurrent phase
    #[serde(with = "millis_serde")]
    pub concurrent_time: Duration,
    /// Total computed by the sequential baseline
    pub sequential_result: T,
    /// Total reduced from the concurrent partial results
    pub concurrent_result: T,
    /// `sequential_time / concurrent_time`, `None` when undefined
    pub speedup: Option<f64>,
}

impl<T: Accumulate> RunReport<T> {
    /// Assemble a report from the two timed phases
    pub fn new(context: RunContext, sequential: Measurement<T>, concurrent: Measurement<T>) -> Self {
        Self {
            timestamp: Utc::now(),
            workload: context.workload,
            plan: context.plan,
            range_start: context.range.start,
            range_end: context.range.end,
            worker_count: context.worker_count,
            partition_count: context.partition_count,
            sequential_time: sequential.elapsed,
            concurrent_time: concurrent.elapsed,
            sequential_result: sequential.result,
            concurrent_result: concurrent.result,
            speedup: compute_speedup(sequential.elapsed, concurrent.elapsed),
        }
    }

    /// Whether both phases produced the same total
    pub fn results_agree(&self) -> bool {
        self.sequential_result.agrees_with(self.concurrent_result)
    }

    /// Speedup per worker thread (1.0 is perfect scaling)
    pub fn efficiency(&self) -> Option<f64> {
        match self.speedup {
            Some(speedup) if self.worker_count > 0 => Some(speedup / self.worker_count as f64),
            _ => None,
        }
    }

    /// Values processed by the sequential baseline
    pub fn values_processed(&self) -> u64 {
        let width = self.range_end.abs_diff(self.range_start);
        match self.plan {
            Plan::Partitioned => width,
            Plan::Replicated { copies } => width.saturating_mul(copies as u64),
        }
    }

    /// Get a human-readable summary of the run
    pub fn summary(&self) -> String {
        format!(
            "{} - {} - {} workers - sequential {} - concurrent {} - speedup {}",
            self.workload,
            self.plan.description(),
            self.worker_count,
            format_millis(self.sequential_time),
            format_millis(self.concurrent_time),
            format_speedup(self.speedup)
        )
    }
}

/// Host information printed with every run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostInfo {
    /// Operating system name
    pub os: String,
    /// CPU architecture
    pub arch: String,
    /// Execution units reported by the OS
    pub available_parallelism: usize,
    /// Version of this tool
    pub version: String,
}

impl HostInfo {
    /// Create host info by detecting the current system
    pub fn detect() -> Self {
        Self {
            os: std::env::consts::OS.to_string(),
            arch: std::env::consts::ARCH.to_string(),
            available_parallelism: available_parallelism(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Number of execution units, falling back to 1 when unknown
pub fn available_parallelism() -> usize {
    std::thread::available_parallelism().map_or(1, |n| n.get())
}

// Durations are written as fractional milliseconds
mod millis_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        (duration.as_secs_f64() * 1000.0).serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(millis / 1000.0).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_context() -> RunContext {
        RunContext {
            workload: "primes".to_string(),
            plan: Plan::Partitioned,
            range: 2..50,
            worker_count: 4,
            partition_count: 4,
        }
    }

    fn measurement<T>(result: T, millis: u64) -> Measurement<T> {
        Measurement {
            result,
            elapsed: Duration::from_millis(millis),
        }
    }

    #[test]
    fn test_report_creation() {
        let report = RunReport::new(create_test_context(), measurement(14u64, 400), measurement(14u64, 100));

        assert_eq!(report.workload, "primes");
        assert_eq!(report.range_start, 2);
        assert_eq!(report.range_end, 50);
        assert_eq!(report.speedup, Some(4.0));
        assert_eq!(report.efficiency(), Some(1.0));
        assert!(report.results_agree());
        assert!(report.timestamp <= Utc::now());
    }

    #[test]
    fn test_speedup_of_inexact_millis() {
        // 0.3 / 0.1 is not exactly 3.0 in binary floating point
        let speedup = compute_speedup(Duration::from_millis(300), Duration::from_millis(100)).unwrap();
        assert!((speedup - 3.0).abs() < 1e-12, "{}", speedup);
        assert_eq!(format_speedup(Some(speedup)), "3.00x");
    }

    #[test]
    fn test_zero_concurrent_time_leaves_speedup_undefined() {
        let report = RunReport::new(create_test_context(), measurement(14u64, 3), measurement(14u64, 0));

        assert_eq!(report.speedup, None);
        assert_eq!(report.efficiency(), None);
        assert!(report.summary().contains("undefined"));
    }

    #[test]
    fn test_disagreeing_results() {
        let report = RunReport::new(create_test_context(), measurement(14u64, 10), measurement(13u64, 5));
        assert!(!report.results_agree());

        let float_ctx = RunContext {
            workload: "trig".to_string(),
            ..create_test_context()
        };
        let report = RunReport::new(float_ctx, measurement(1.0e6f64, 10), measurement(1.0e6 + 1e-7, 5));
        assert!(report.results_agree());
    }

    #[test]
    fn test_summary() {
        let report = RunReport::new(create_test_context(), measurement(14u64, 300), measurement(14u64, 100));

        let summary = report.summary();
        assert!(summary.contains("primes"));
        assert!(summary.contains("partitioned"));
        assert!(summary.contains("4 workers"));
        assert!(summary.contains("3.00x"));
    }

    #[test]
    fn test_values_processed() {
        let report = RunReport::new(create_test_context(), measurement(14u64, 1), measurement(14u64, 1));
        assert_eq!(report.values_processed(), 48);

        let replicated = RunContext {
            plan: Plan::Replicated { copies: 4 },
            ..create_test_context()
        };
        let report = RunReport::new(replicated, measurement(56u64, 1), measurement(56u64, 1));
        assert_eq!(report.values_processed(), 192);
    }

    #[test]
    fn test_json_output() {
        let report = RunReport::new(create_test_context(), measurement(14u64, 250), measurement(14u64, 50));

        let json = serde_json::to_value(&report).expect("Failed to serialize to JSON");
        assert_eq!(json["sequential_time"], 250.0);
        assert_eq!(json["concurrent_time"], 50.0);
        assert_eq!(json["sequential_result"], 14);
        assert_eq!(json["plan"], "partitioned");
        assert_eq!(json["speedup"], 5.0);
    }

    #[test]
    fn test_host_info_detection() {
        let host = HostInfo::detect();
        assert!(!host.os.is_empty());
        assert!(host.available_parallelism >= 1);
        assert_eq!(host.version, env!("CARGO_PKG_VERSION"));
    }
}
