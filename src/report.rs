//! Console output for benchmark runs
//!
//! Prints the host banner, per-workload reports (text or JSON) and a
//! progress bar fed by the executor's progress channel.

use std::fmt::Write as _;
use std::thread::{self, JoinHandle};

use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::warn;

use crate::bench::ProgressUpdate;
use crate::config::BenchmarkConfig;
use crate::models::{HostInfo, RunReport};
use crate::util::units::{calculate_rate, format_millis, format_rate, format_speedup};
use crate::workload::{Accumulate, WorkloadKind};
use crate::Result;

/// Banner printed once before the first workload
pub fn render_banner(host: &HostInfo, config: &BenchmarkConfig) -> String {
    let mut banner = format!(
        "PARTBENCH v{} - {}/{} - {} execution units\nWorkers: {}, plan: {}",
        host.version,
        host.os,
        host.arch,
        host.available_parallelism,
        config.worker_count(),
        config.plan().description()
    );
    if let Some(timeout) = config.timeout {
        let _ = write!(banner, ", timeout: {}", humantime::format_duration(timeout));
    }
    banner
}

pub fn print_banner(host: &HostInfo, config: &BenchmarkConfig) {
    println!("{}\n", render_banner(host, config));
}

/// Host description as a single JSON line, written before the reports
pub fn print_host_json(host: &HostInfo) -> Result<()> {
    println!("{}", serde_json::to_string(host)?);
    Ok(())
}

/// Text report for one workload
pub fn render_report<T: Accumulate>(kind: WorkloadKind, report: &RunReport<T>) -> String {
    let mut out = String::new();
    let values = report.values_processed();

    let _ = writeln!(out, "=== {} ({}) ===", kind.description(), report.workload);
    let _ = writeln!(
        out,
        "Range:      [{}, {}) {} across {} workers",
        report.range_start,
        report.range_end,
        report.plan.description(),
        report.worker_count
    );
    let _ = writeln!(
        out,
        "Sequential: result {:<24} {:>14}  ({})",
        report.sequential_result,
        format_millis(report.sequential_time),
        format_rate(calculate_rate(values, report.sequential_time))
    );
    let _ = writeln!(
        out,
        "Concurrent: result {:<24} {:>14}  ({} partitions)",
        report.concurrent_result,
        format_millis(report.concurrent_time),
        report.partition_count
    );

    let speedup = format_speedup(report.speedup);
    match report.efficiency() {
        Some(efficiency) => {
            let _ = writeln!(out, "Speedup:    {} (efficiency {:.1}%)", speedup, efficiency * 100.0);
        }
        None => {
            let _ = writeln!(out, "Speedup:    {}", speedup);
        }
    }

    if !report.results_agree() {
        let _ = writeln!(out, "WARNING: sequential and concurrent results differ");
    }

    out
}

pub fn print_report<T: Accumulate>(kind: WorkloadKind, report: &RunReport<T>) {
    println!("{}", render_report(kind, report));
}

/// One JSON object per report, on a single line
pub fn render_json<T: Serialize>(report: &RunReport<T>) -> Result<String> {
    Ok(serde_json::to_string(report)?)
}

pub fn print_json<T: Serialize>(report: &RunReport<T>) -> Result<()> {
    println!("{}", render_json(report)?);
    Ok(())
}

/// Progress bar drawn on stderr while the concurrent phase runs
pub struct ProgressDisplay {
    handle: JoinHandle<()>,
}

impl ProgressDisplay {
    /// Start drawing; the bar closes once every sender is dropped
    pub fn spawn(kind: WorkloadKind, total_units: usize) -> (mpsc::UnboundedSender<ProgressUpdate>, Self) {
        let (tx, mut rx) = mpsc::unbounded_channel::<ProgressUpdate>();

        let pb = ProgressBar::new(total_units as u64);
        pb.set_style(
            ProgressStyle::with_template("{spinner} {prefix} [{bar:30}] {pos}/{len} partitions ({elapsed}) {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=> "),
        );
        pb.set_prefix(kind.description());
        pb.set_message("sequential baseline");

        let handle = thread::spawn(move || {
            while let Some(update) = rx.blocking_recv() {
                pb.set_length(update.total as u64);
                pb.set_position(update.completed as u64);
                pb.set_message(format!(
                    "partition {} done ({:.0}%)",
                    update.partition,
                    update.completion_percentage() * 100.0
                ));
            }
            pb.finish_and_clear();
        });

        (tx, Self { handle })
    }

    /// Wait for the bar to be cleared
    pub fn finish(self) {
        if self.handle.join().is_err() {
            warn!("progress display thread panicked");
        }
    }
}
