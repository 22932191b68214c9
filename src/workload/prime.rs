//! Prime counting workload

use std::ops::Range;

use super::{Workload, WorkloadError};

/// Trial division over 6k ± 1 candidates.
///
/// # Example
///
/// ```
/// use partbench::workload::prime::is_prime;
///
/// let primes: Vec<i64> = (0..20).filter(|&n| is_prime(n)).collect();
/// assert_eq!(primes, vec![2, 3, 5, 7, 11, 13, 17, 19]);
/// ```
pub fn is_prime(n: i64) -> bool {
    if n <= 1 {
        return false;
    }
    if n <= 3 {
        return true;
    }
    if n % 2 == 0 || n % 3 == 0 {
        return false;
    }

    let mut i = 5i64;
    while i.saturating_mul(i) <= n {
        if n % i == 0 || n % (i + 2) == 0 {
            return false;
        }
        i += 6;
    }
    true
}

/// Counts the primes in a sub-range
#[derive(Debug, Clone, Copy, Default)]
pub struct PrimeCount;

impl PrimeCount {
    pub fn new() -> Self {
        Self
    }
}

impl Workload for PrimeCount {
    type Output = u64;

    fn name(&self) -> &str {
        "primes"
    }

    fn run(&self, range: Range<i64>) -> Result<u64, WorkloadError> {
        Ok(range.filter(|&n| is_prime(n)).count() as u64)
    }
}
