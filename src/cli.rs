//! Command-line front end
//!
//! Parses flags, merges them over the config file and drives one
//! benchmark per selected workload.

use std::path::PathBuf;
use std::time::Duration;

use clap::{ArgAction, Parser};
use tracing::info;

use crate::bench::Benchmark;
use crate::config::BenchmarkConfig;
use crate::models::HostInfo;
use crate::report::{self, ProgressDisplay};
use crate::util::units::parse_duration;
use crate::workload::{FibonacciSum, PrimeCount, SinCosSum, TrigSum, Workload, WorkloadKind};
use crate::{Result, SIZE_ENV, WORKERS_ENV};

#[derive(Debug, Parser)]
#[command(name = "partbench", version)]
#[command(about = "Compare sequential and multi-threaded throughput of CPU-bound workloads")]
pub struct Cli {
    /// Worker threads (and partitions); defaults to the available execution units
    #[arg(short, long, env = WORKERS_ENV)]
    pub workers: Option<usize>,

    /// End of the input range for every selected workload
    #[arg(short, long, env = SIZE_ENV, allow_negative_numbers = true)]
    pub size: Option<i64>,

    /// Workload to run; repeat to select several (default: all)
    #[arg(long = "workload", value_enum)]
    pub workloads: Vec<WorkloadKind>,

    /// Submit the whole range this many times instead of partitioning it
    #[arg(short, long)]
    pub replicas: Option<usize>,

    /// Abort the concurrent phase after this long, e.g. "30s"
    #[arg(short, long, value_parser = parse_duration)]
    pub timeout: Option<Duration>,

    /// Read settings from this TOML file instead of the default location
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Print one JSON report per workload
    #[arg(long)]
    pub json: bool,

    /// Do not draw a progress bar
    #[arg(long)]
    pub no_progress: bool,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    /// Override `config` with every flag that was given
    pub fn apply(&self, mut config: BenchmarkConfig) -> BenchmarkConfig {
        if let Some(workers) = self.workers {
            config.workers = Some(workers);
        }
        if let Some(size) = self.size {
            config.size = Some(size);
        }
        if !self.workloads.is_empty() {
            config.workloads = self.workloads.clone();
        }
        if let Some(replicas) = self.replicas {
            config.replicas = Some(replicas);
        }
        if let Some(timeout) = self.timeout {
            config.timeout = Some(timeout);
        }
        if self.json {
            config.json = true;
        }
        if self.no_progress {
            config.progress = false;
        }
        config
    }

    /// Load the config file, apply flags and validate the result
    pub fn resolve_config(&self) -> Result<BenchmarkConfig> {
        let base = match &self.config {
            Some(path) => BenchmarkConfig::load_from(path)?,
            None => BenchmarkConfig::load()?,
        };
        let config = self.apply(base);
        config.validate()?;
        Ok(config)
    }

    /// Log filter implied by `-v`, `None` when the environment should decide
    pub fn log_filter(&self) -> Option<&'static str> {
        match self.verbose {
            0 => None,
            1 => Some("info"),
            _ => Some("debug"),
        }
    }
}

/// Run every configured workload in order, stopping at the first failure
pub fn run(config: &BenchmarkConfig) -> Result<()> {
    let host = HostInfo::detect();
    if config.json {
        report::print_host_json(&host)?;
    } else {
        report::print_banner(&host, config);
    }

    for &kind in &config.workloads {
        match kind {
            WorkloadKind::Primes => run_workload(kind, PrimeCount::new(), config)?,
            WorkloadKind::Trig => run_workload(kind, TrigSum::new(), config)?,
            WorkloadKind::Fibonacci => run_workload(kind, FibonacciSum::new(), config)?,
            WorkloadKind::Sincos => run_workload(kind, SinCosSum::new(), config)?,
        }
    }

    Ok(())
}

fn run_workload<W: Workload>(kind: WorkloadKind, workload: W, config: &BenchmarkConfig) -> Result<()> {
    let range = config.range_for(kind);
    info!(workload = %kind, start = range.start, end = range.end, "starting workload");

    let mut bench = Benchmark::new(workload, range)
        .with_worker_count(config.worker_count())
        .with_plan(config.plan());
    if let Some(timeout) = config.timeout {
        bench = bench.with_timeout(timeout);
    }

    let display = if config.progress && !config.json {
        let (tx, display) = ProgressDisplay::spawn(kind, config.unit_count());
        bench = bench.with_progress(tx);
        Some(display)
    } else {
        None
    };

    // The bench owns the only sender, so the bar closes when run() returns
    let result = bench.run();
    if let Some(display) = display {
        display.finish();
    }
    let report = result?;

    if config.json {
        report::print_json(&report)
    } else {
        report::print_report(kind, &report);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bench::Plan;

    #[test]
    fn test_parse_flags() {
        let cli = Cli::try_parse_from([
            "partbench",
            "--workers",
            "4",
            "--size",
            "1000",
            "--workload",
            "primes",
            "--workload",
            "fibonacci",
            "--timeout",
            "1m 30s",
            "--json",
            "-vv",
        ])
        .unwrap();

        assert_eq!(cli.workers, Some(4));
        assert_eq!(cli.size, Some(1000));
        assert_eq!(cli.workloads, vec![WorkloadKind::Primes, WorkloadKind::Fibonacci]);
        assert_eq!(cli.timeout, Some(Duration::from_secs(90)));
        assert!(cli.json);
        assert_eq!(cli.log_filter(), Some("debug"));
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(Cli::try_parse_from(["partbench", "--workload", "sorting"]).is_err());
        assert!(Cli::try_parse_from(["partbench", "--timeout", "soon"]).is_err());
        assert!(Cli::try_parse_from(["partbench", "--replicas", "-1"]).is_err());
    }

    #[test]
    fn test_apply_overrides_config() {
        let cli = Cli::try_parse_from(["partbench", "-r", "3", "--no-progress", "--workload", "trig"]).unwrap();
        let base = BenchmarkConfig::new().with_workers(2).with_size(500);

        let config = cli.apply(base);
        assert_eq!(config.workers, Some(2));
        assert_eq!(config.size, Some(500));
        assert_eq!(config.workloads, vec![WorkloadKind::Trig]);
        assert_eq!(config.plan(), Plan::Replicated { copies: 3 });
        assert!(!config.progress);
        assert_eq!(cli.log_filter(), None);
    }

    #[test]
    fn test_resolve_config_validates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("partbench.toml");
        std::fs::write(&path, "workers = 2\n").unwrap();
        let path = path.to_string_lossy().into_owned();

        let cli = Cli::try_parse_from(["partbench", "--config", path.as_str(), "--replicas", "0"]).unwrap();
        assert!(cli.resolve_config().is_err());

        let cli = Cli::try_parse_from(["partbench", "--config", path.as_str(), "--size", "100"]).unwrap();
        let config = cli.resolve_config().unwrap();
        assert_eq!(config.workers, Some(2));
        assert_eq!(config.size, Some(100));
    }

    #[test]
    fn test_run_small_suite() {
        let config = BenchmarkConfig::new()
            .with_workers(2)
            .with_size(1000)
            .with_progress(false)
            .with_json(true);
        assert!(run(&config).is_ok());
    }
}
