//! Timing and reduction harness
//!
//! Runs a workload once sequentially and once on a fresh worker pool,
//! reduces the partial results and reports both timings with the
//! derived speedup.

use std::ops::Range;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::bench::executor::{panic_cause, BatchOptions, ProgressUpdate, WorkerPool};
use crate::bench::partition::{Partition, Plan};
use crate::models::result::available_parallelism;
use crate::models::{Measurement, RunContext, RunReport};
use crate::workload::{reduce, Workload};
use crate::{PartbenchError, Result, MAX_WORKERS};

/// Run `f` and measure it with the monotonic clock
pub fn timed<T>(f: impl FnOnce() -> T) -> (T, Duration) {
    let start = Instant::now();
    let value = f();
    (value, start.elapsed())
}

/// Sequential-versus-concurrent benchmark of one workload over one range
pub struct Benchmark<W: Workload> {
    workload: Arc<W>,
    range: Range<i64>,
    worker_count: usize,
    plan: Plan,
    options: BatchOptions,
}

impl<W: Workload> Benchmark<W> {
    /// Create a benchmark sized to the available execution units
    pub fn new(workload: W, range: Range<i64>) -> Self {
        Self {
            workload: Arc::new(workload),
            range,
            worker_count: available_parallelism(),
            plan: Plan::default(),
            options: BatchOptions::default(),
        }
    }

    /// Set the number of worker threads (and partitions)
    pub fn with_worker_count(mut self, count: usize) -> Self {
        self.worker_count = count;
        self
    }

    /// Set the partitioning plan
    pub fn with_plan(mut self, plan: Plan) -> Self {
        self.plan = plan;
        self
    }

    /// Give up on the concurrent phase after `timeout`
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.options.timeout = Some(timeout);
        self
    }

    /// Stream concurrent-phase progress to `progress_tx`
    pub fn with_progress(mut self, progress_tx: mpsc::UnboundedSender<ProgressUpdate>) -> Self {
        self.options.progress_tx = Some(progress_tx);
        self
    }

    pub fn worker_count(&self) -> usize {
        self.worker_count
    }

    /// Validate the benchmark parameters
    pub fn validate(&self) -> Result<()> {
        if self.worker_count == 0 {
            return Err(PartbenchError::InvalidConfiguration(
                "Worker count must be greater than 0".to_string(),
            ));
        }
        if self.worker_count > MAX_WORKERS {
            return Err(PartbenchError::InvalidConfiguration(format!(
                "Too many workers: {} (max: {})",
                self.worker_count, MAX_WORKERS
            )));
        }

        if self.range.end < self.range.start {
            return Err(PartbenchError::InvalidConfiguration(format!(
                "Range end {} precedes range start {}",
                self.range.end, self.range.start
            )));
        }

        match self.plan {
            Plan::Replicated { copies: 0 } => {
                return Err(PartbenchError::InvalidConfiguration(
                    "Replica count must be greater than 0".to_string(),
                ));
            }
            Plan::Replicated { copies } if copies > MAX_WORKERS => {
                return Err(PartbenchError::InvalidConfiguration(format!(
                    "Too many replicas: {} (max: {})",
                    copies, MAX_WORKERS
                )));
            }
            _ => {}
        }

        Ok(())
    }

    /// Execute both phases and build the report
    ///
    /// Any failure aborts the run; no partial report is produced.
    pub fn run(self) -> Result<RunReport<W::Output>> {
        self.validate()?;

        let sequential_units = self.plan.sequential_units(self.range.clone())?;
        let units = self.plan.units(self.range.clone(), self.worker_count)?;
        let name = self.workload.name().to_string();

        for unit in &units {
            debug!(workload = %name, partition = %unit, "planned unit");
        }

        info!(
            workload = %name,
            plan = %self.plan.description(),
            start = self.range.start,
            end = self.range.end,
            workers = self.worker_count,
            "running sequential baseline"
        );
        let (sequential_result, sequential_time) = timed(|| run_sequential(&*self.workload, &sequential_units));
        let sequential_result = sequential_result?;
        info!(workload = %name, elapsed_ms = sequential_time.as_secs_f64() * 1000.0, "sequential baseline finished");

        let (concurrent_result, concurrent_time) = timed(|| -> Result<W::Output> {
            let mut pool = WorkerPool::new(self.worker_count)?;
            let partials = pool.run_concurrently(&units, &self.workload, &self.options)?;
            pool.shutdown();
            Ok(reduce(partials))
        });
        let concurrent_result = concurrent_result?;
        info!(workload = %name, elapsed_ms = concurrent_time.as_secs_f64() * 1000.0, "concurrent run finished");

        let report = RunReport::new(
            RunContext {
                workload: name,
                plan: self.plan,
                range: self.range,
                worker_count: self.worker_count,
                partition_count: units.len(),
            },
            Measurement {
                result: sequential_result,
                elapsed: sequential_time,
            },
            Measurement {
                result: concurrent_result,
                elapsed: concurrent_time,
            },
        );

        info!("{}", report.summary());

        if !report.results_agree() {
            warn!(
                workload = %report.workload,
                sequential = %report.sequential_result,
                concurrent = %report.concurrent_result,
                "sequential and concurrent totals differ"
            );
        }

        Ok(report)
    }
}

/// Run `workload` over `range` with `worker_count` workers
///
/// # Examples
/// ```
/// use partbench::bench::benchmark;
/// use partbench::workload::PrimeCount;
///
/// let report = benchmark(PrimeCount::new(), 2..50, 4).unwrap();
/// assert_eq!(report.sequential_result, 15);
/// assert_eq!(report.concurrent_result, 15);
/// ```
pub fn benchmark<W: Workload>(workload: W, range: Range<i64>, worker_count: usize) -> Result<RunReport<W::Output>> {
    Benchmark::new(workload, range).with_worker_count(worker_count).run()
}

/// Run every unit on the calling thread, in order
fn run_sequential<W: Workload>(workload: &W, units: &[Partition]) -> Result<W::Output> {
    let mut partials = Vec::with_capacity(units.len());
    for unit in units {
        let value = match panic::catch_unwind(AssertUnwindSafe(|| workload.run(unit.range()))) {
            Ok(result) => result,
            Err(payload) => Err(panic_cause(payload)),
        }
        .map_err(|cause| PartbenchError::WorkerFailure {
            index: unit.index,
            cause,
        })?;
        partials.push(value);
    }
    Ok(reduce(partials))
}
