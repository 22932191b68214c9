//! Fibonacci summation workload

use std::ops::Range;

use super::{Workload, WorkloadError};

/// Indices are reduced modulo this value to keep terms within `u64`
pub const FIB_MODULUS: i64 = 40;

/// Iterative Fibonacci with `fib(0) = 0` and `fib(1) = 1`.
///
/// # Example
///
/// ```
/// use partbench::workload::fibonacci::fibonacci;
///
/// let fibs: Vec<u64> = (0..10).map(fibonacci).collect();
/// assert_eq!(fibs, vec![0, 1, 1, 2, 3, 5, 8, 13, 21, 34]);
/// ```
pub fn fibonacci(n: u32) -> u64 {
    if n <= 1 {
        return n as u64;
    }
    let (mut a, mut b) = (0u64, 1u64);
    for _ in 2..=n {
        let next = a.wrapping_add(b);
        a = b;
        b = next;
    }
    b
}

/// Sums `fib(i mod 40)` over a sub-range
#[derive(Debug, Clone, Copy, Default)]
pub struct FibonacciSum;

impl FibonacciSum {
    pub fn new() -> Self {
        Self
    }
}

impl Workload for FibonacciSum {
    type Output = u64;

    fn name(&self) -> &str {
        "fibonacci"
    }

    fn run(&self, range: Range<i64>) -> Result<u64, WorkloadError> {
        let mut total = 0u64;
        for i in range {
            total = total.wrapping_add(fibonacci(i.rem_euclid(FIB_MODULUS) as u32));
        }
        Ok(total)
    }
}
