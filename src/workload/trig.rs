//! Trigonometric accumulation workload

use std::ops::Range;

use super::{Workload, WorkloadError};

/// Sums `sin(i) * cos(i) + sqrt(i)` over a sub-range
#[derive(Debug, Clone, Copy, Default)]
pub struct TrigSum;

impl TrigSum {
    pub fn new() -> Self {
        Self
    }
}

impl Workload for TrigSum {
    type Output = f64;

    fn name(&self) -> &str {
        "trig"
    }

    fn run(&self, range: Range<i64>) -> Result<f64, WorkloadError> {
        if range.start < 0 && range.start < range.end {
            return Err(format!("no real square root for index {}", range.start).into());
        }

        let mut result = 0.0;
        for i in range {
            let x = i as f64;
            result += x.sin() * x.cos() + x.sqrt();
        }
        Ok(result)
    }
}

/// Sums `sin(i) * cos(i)` over a sub-range
///
/// Defined for every index, so negative ranges are accepted.
#[derive(Debug, Clone, Copy, Default)]
pub struct SinCosSum;

impl SinCosSum {
    pub fn new() -> Self {
        Self
    }
}

impl Workload for SinCosSum {
    type Output = f64;

    fn name(&self) -> &str {
        "sincos"
    }

    fn run(&self, range: Range<i64>) -> Result<f64, WorkloadError> {
        let mut result = 0.0;
        for i in range {
            let x = i as f64;
            result += x.sin() * x.cos();
        }
        Ok(result)
    }
}
