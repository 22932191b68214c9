//! Workload capability
//!
//! A workload is a pure function over a half-open integer sub-range. The
//! built-in prime counting, trigonometric accumulation and Fibonacci
//! summation loops are interchangeable implementations of [`Workload`].

use std::fmt;
use std::ops::Range;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

pub mod fibonacci;
pub mod prime;
pub mod trig;

pub use fibonacci::FibonacciSum;
pub use prime::PrimeCount;
pub use trig::{SinCosSum, TrigSum};

/// Error raised by a single workload invocation
pub type WorkloadError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Relative tolerance used when comparing floating-point totals
pub const FLOAT_RELATIVE_TOLERANCE: f64 = 1e-9;

/// Numeric output of a workload, reduced by summation
pub trait Accumulate: Copy + Send + Sync + fmt::Debug + fmt::Display + Serialize + 'static {
    /// Identity of the reduction
    const ZERO: Self;

    /// Combine two partial results
    fn combine(self, other: Self) -> Self;

    /// Whether two totals of the same workload should be considered equal
    fn agrees_with(self, other: Self) -> bool;
}

impl Accumulate for u64 {
    const ZERO: Self = 0;

    fn combine(self, other: Self) -> Self {
        self.wrapping_add(other)
    }

    fn agrees_with(self, other: Self) -> bool {
        self == other
    }
}

impl Accumulate for i64 {
    const ZERO: Self = 0;

    fn combine(self, other: Self) -> Self {
        self.wrapping_add(other)
    }

    fn agrees_with(self, other: Self) -> bool {
        self == other
    }
}

impl Accumulate for f64 {
    const ZERO: Self = 0.0;

    fn combine(self, other: Self) -> Self {
        self + other
    }

    fn agrees_with(self, other: Self) -> bool {
        if self == other {
            return true;
        }
        let scale = self.abs().max(other.abs());
        (self - other).abs() <= scale * FLOAT_RELATIVE_TOLERANCE
    }
}

/// Fold partial results in iteration order
pub fn reduce<T: Accumulate>(values: impl IntoIterator<Item = T>) -> T {
    values.into_iter().fold(T::ZERO, T::combine)
}

/// A pure computation over an integer sub-range
///
/// One instance is shared by every partition of a run, so implementations
/// must not rely on mutable state.
pub trait Workload: Send + Sync + 'static {
    /// Partial result type
    type Output: Accumulate;

    /// Short label used in reports and logs
    fn name(&self) -> &str;

    /// Compute the result for `[range.start, range.end)`
    fn run(&self, range: Range<i64>) -> Result<Self::Output, WorkloadError>;
}

/// Workload backed by a closure
pub struct FnWorkload<F> {
    name: String,
    func: F,
}

impl<F> fmt::Debug for FnWorkload<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnWorkload").field("name", &self.name).finish_non_exhaustive()
    }
}

impl<F, T> Workload for FnWorkload<F>
where
    F: Fn(Range<i64>) -> Result<T, WorkloadError> + Send + Sync + 'static,
    T: Accumulate,
{
    type Output = T;

    fn name(&self) -> &str {
        &self.name
    }

    fn run(&self, range: Range<i64>) -> Result<T, WorkloadError> {
        (self.func)(range)
    }
}

/// Wrap a closure as a [`Workload`]
pub fn from_fn<F, T>(name: impl Into<String>, func: F) -> FnWorkload<F>
where
    F: Fn(Range<i64>) -> Result<T, WorkloadError> + Send + Sync + 'static,
    T: Accumulate,
{
    FnWorkload {
        name: name.into(),
        func,
    }
}

/// Built-in workload selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum WorkloadKind {
    /// Prime counting by trial division
    Primes,
    /// Sum of sin(i) * cos(i) + sqrt(i)
    Trig,
    /// Sum of fib(i mod 40)
    Fibonacci,
    /// Sum of sin(i) * cos(i), usually run with replicated units
    Sincos,
}

impl WorkloadKind {
    /// Every built-in workload, in report order
    pub const ALL: [WorkloadKind; 4] = [
        WorkloadKind::Primes,
        WorkloadKind::Trig,
        WorkloadKind::Fibonacci,
        WorkloadKind::Sincos,
    ];

    /// Range used when no size override is given
    pub fn default_range(&self) -> Range<i64> {
        match self {
            WorkloadKind::Primes => 2..5_000_000,
            WorkloadKind::Trig => 0..20_000_000,
            WorkloadKind::Fibonacci => 0..10_000_000,
            WorkloadKind::Sincos => 0..5_000_000,
        }
    }

    /// Range with the end replaced by `size` when one is given
    pub fn range_with_size(&self, size: Option<i64>) -> Range<i64> {
        let range = self.default_range();
        match size {
            Some(end) => range.start..end,
            None => range,
        }
    }

    /// Get a human-readable description of the workload
    pub fn description(&self) -> &'static str {
        match self {
            WorkloadKind::Primes => "Prime Counting",
            WorkloadKind::Trig => "Trigonometric Accumulation",
            WorkloadKind::Fibonacci => "Fibonacci Summation",
            WorkloadKind::Sincos => "Sine-Cosine Accumulation",
        }
    }
}

impl fmt::Display for WorkloadKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}
