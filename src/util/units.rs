//! Units formatting and conversion utilities
//!
//! Provides functions for human-readable formatting of durations, rates
//! and speedup ratios.

use std::time::Duration;

/// Format elapsed time in milliseconds with microsecond precision
///
/// # Examples
/// ```
/// use std::time::Duration;
/// use partbench::util::units::format_millis;
///
/// assert_eq!(format_millis(Duration::from_micros(1500)), "1.500 ms");
/// ```
pub fn format_millis(duration: Duration) -> String {
    format!("{:.3} ms", duration.as_secs_f64() * 1000.0)
}

/// Parse duration string such as "30s", "1m 30s" or "500ms"
///
/// # Examples
/// ```
/// use std::time::Duration;
/// use partbench::util::units::parse_duration;
///
/// assert_eq!(parse_duration("30s").unwrap(), Duration::from_secs(30));
/// assert_eq!(parse_duration("1m 30s").unwrap(), Duration::from_secs(90));
/// ```
pub fn parse_duration(input: &str) -> Result<Duration, String> {
    humantime::parse_duration(input.trim()).map_err(|e| format!("Invalid duration '{}': {}", input, e))
}

/// Format a speedup ratio, or "undefined" when it could not be computed
///
/// # Examples
/// ```
/// use partbench::util::units::format_speedup;
///
/// assert_eq!(format_speedup(Some(3.456)), "3.46x");
/// assert_eq!(format_speedup(None), "undefined");
/// ```
pub fn format_speedup(speedup: Option<f64>) -> String {
    match speedup {
        Some(ratio) => format!("{:.2}x", ratio),
        None => "undefined".to_string(),
    }
}

/// Calculate values processed per second
///
/// # Examples
/// ```
/// use std::time::Duration;
/// use partbench::util::units::calculate_rate;
///
/// let rate = calculate_rate(1000, Duration::from_secs(1));
/// assert!((rate - 1000.0).abs() < 0.01);
/// ```
pub fn calculate_rate(values: u64, duration: Duration) -> f64 {
    if duration.is_zero() {
        return 0.0;
    }

    values as f64 / duration.as_secs_f64()
}

/// Format a rate of values per second with appropriate units
///
/// # Examples
/// ```
/// use partbench::util::units::format_rate;
///
/// assert_eq!(format_rate(1500.0), "1.5K values/s");
/// assert_eq!(format_rate(2500000.0), "2.5M values/s");
/// ```
pub fn format_rate(rate: f64) -> String {
    if rate >= 1_000_000_000.0 {
        format!("{:.1}G values/s", rate / 1_000_000_000.0)
    } else if rate >= 1_000_000.0 {
        format!("{:.1}M values/s", rate / 1_000_000.0)
    } else if rate >= 1_000.0 {
        format!("{:.1}K values/s", rate / 1_000.0)
    } else {
        format!("{:.0} values/s", rate)
    }
}
