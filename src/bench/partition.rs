//! Range partitioning
//!
//! Splits a half-open integer range into contiguous, non-overlapping
//! sub-ranges, one per worker.

use std::fmt;
use std::ops::Range;

use serde::{Deserialize, Serialize};

use crate::{PartbenchError, Result, MAX_WORKERS};

/// A contiguous, half-open slice of the input range assigned to one unit of work
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Partition {
    /// Position of this partition in the ordered sequence
    pub index: usize,
    /// First value (inclusive)
    pub start: i64,
    /// Last value (exclusive)
    pub end: i64,
}

impl Partition {
    /// The partition as a `Range`
    pub fn range(&self) -> Range<i64> {
        self.start..self.end
    }

    /// Number of values covered
    pub fn len(&self) -> u64 {
        self.end.abs_diff(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }
}

impl fmt::Display for Partition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{} [{}, {})", self.index, self.start, self.end)
    }
}

/// How the input range is turned into units of work
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Plan {
    /// One contiguous slice of the range per worker
    #[default]
    Partitioned,
    /// The whole range, submitted `copies` times
    Replicated {
        /// Number of identical units
        copies: usize,
    },
}

impl Plan {
    /// Build the units for the concurrent phase
    pub fn units(&self, range: Range<i64>, worker_count: usize) -> Result<Vec<Partition>> {
        match *self {
            Plan::Partitioned => partition(range.start, range.end, worker_count),
            Plan::Replicated { copies } => replicate(range.start, range.end, copies),
        }
    }

    /// Ranges the sequential baseline runs back to back
    pub fn sequential_units(&self, range: Range<i64>) -> Result<Vec<Partition>> {
        match *self {
            Plan::Partitioned => Ok(vec![Partition {
                index: 0,
                start: range.start,
                end: range.end.max(range.start),
            }]),
            Plan::Replicated { copies } => replicate(range.start, range.end, copies),
        }
    }

    /// Get a human-readable description of the plan
    pub fn description(&self) -> String {
        match self {
            Plan::Partitioned => "partitioned".to_string(),
            Plan::Replicated { copies } => format!("replicated x{}", copies),
        }
    }
}

/// Divide `[total_start, total_end)` into `worker_count` contiguous partitions.
///
/// Every partition has `floor(width / worker_count)` values except the last,
/// which absorbs the remainder. An empty or reversed range yields no
/// partitions at all.
///
/// # Examples
/// ```
/// use partbench::bench::partition::partition;
///
/// let parts = partition(2, 50, 4).unwrap();
/// assert_eq!(parts.len(), 4);
/// assert_eq!((parts[0].start, parts[0].end), (2, 14));
/// assert_eq!((parts[3].start, parts[3].end), (38, 50));
/// ```
pub fn partition(total_start: i64, total_end: i64, worker_count: usize) -> Result<Vec<Partition>> {
    if worker_count == 0 {
        return Err(PartbenchError::InvalidConfiguration(
            "Worker count must be greater than 0".to_string(),
        ));
    }
    if worker_count > MAX_WORKERS {
        return Err(PartbenchError::InvalidConfiguration(format!(
            "Too many workers: {} (max: {})",
            worker_count, MAX_WORKERS
        )));
    }

    if total_end <= total_start {
        return Ok(Vec::new());
    }

    let width = total_end.checked_sub(total_start).ok_or_else(|| {
        PartbenchError::InvalidConfiguration(format!(
            "Range [{}, {}) is too wide to partition",
            total_start, total_end
        ))
    })?;

    let chunk = width / worker_count as i64;

    let mut partitions = Vec::with_capacity(worker_count);
    let mut start = total_start;
    for index in 0..worker_count {
        let end = if index == worker_count - 1 { total_end } else { start + chunk };
        partitions.push(Partition { index, start, end });
        start = end;
    }

    Ok(partitions)
}

/// `copies` units that each cover the whole range
pub fn replicate(total_start: i64, total_end: i64, copies: usize) -> Result<Vec<Partition>> {
    if copies == 0 {
        return Err(PartbenchError::InvalidConfiguration(
            "Replica count must be greater than 0".to_string(),
        ));
    }
    if copies > MAX_WORKERS {
        return Err(PartbenchError::InvalidConfiguration(format!(
            "Too many replicas: {} (max: {})",
            copies, MAX_WORKERS
        )));
    }

    let end = total_end.max(total_start);
    Ok((0..copies)
        .map(|index| Partition {
            index,
            start: total_start,
            end,
        })
        .collect())
}
