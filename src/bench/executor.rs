//! Worker pool management
//!
//! Runs one unit of work per partition on a fixed-size pool of blocking
//! threads owned by a dedicated tokio runtime, collects the results in
//! partition order and tears the pool down when the run is over.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::runtime::{Builder, Runtime};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{debug, warn};

use crate::bench::partition::Partition;
use crate::workload::{Workload, WorkloadError};
use crate::{PartbenchError, Result, MAX_WORKERS};

/// Progress update sent each time a unit of work completes
#[derive(Debug, Clone)]
pub struct ProgressUpdate {
    /// Index of the partition that just completed
    pub partition: usize,
    /// Units completed so far in this batch
    pub completed: usize,
    /// Units submitted in this batch
    pub total: usize,
    /// Elapsed time since the batch was submitted
    pub elapsed: Duration,
}

impl ProgressUpdate {
    /// Calculate completion percentage (0.0 to 1.0)
    pub fn completion_percentage(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            (self.completed as f64) / (self.total as f64)
        }
    }
}

/// Per-batch execution options
#[derive(Debug, Clone, Default)]
pub struct BatchOptions {
    /// Give up on the batch after this long
    pub timeout: Option<Duration>,
    /// Receives one update per completed unit
    pub progress_tx: Option<mpsc::UnboundedSender<ProgressUpdate>>,
}

impl BatchOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the batch timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set the progress channel
    pub fn with_progress(mut self, progress_tx: mpsc::UnboundedSender<ProgressUpdate>) -> Self {
        self.progress_tx = Some(progress_tx);
        self
    }
}

/// What a single unit of work came back with
enum UnitOutcome<T> {
    Done(T),
    Failed(WorkloadError),
    /// Not started because the batch was already cancelled
    Skipped,
}

/// Fixed-size pool of worker threads, scoped to one benchmark run
///
/// Must be created and used from synchronous code: the pool drives its own
/// runtime with `block_on`.
#[derive(Debug)]
pub struct WorkerPool {
    runtime: Option<Runtime>,
    size: usize,
    abandoned: bool,
}

impl WorkerPool {
    /// Start a pool with `size` worker threads
    pub fn new(size: usize) -> Result<Self> {
        if size == 0 {
            return Err(PartbenchError::InvalidConfiguration(
                "Worker count must be greater than 0".to_string(),
            ));
        }
        if size > MAX_WORKERS {
            return Err(PartbenchError::InvalidConfiguration(format!(
                "Too many workers: {} (max: {})",
                size, MAX_WORKERS
            )));
        }

        let runtime = Builder::new_multi_thread()
            .worker_threads(1)
            .max_blocking_threads(size)
            .thread_name("partbench-worker")
            .enable_time()
            .build()?;

        debug!(size, "worker pool started");

        Ok(Self {
            runtime: Some(runtime),
            size,
            abandoned: false,
        })
    }

    /// Number of worker threads
    pub fn size(&self) -> usize {
        self.size
    }

    /// Run `workload` over every partition and return the outputs in partition order.
    ///
    /// Blocks until every unit has completed. The first failing unit aborts
    /// the batch: units that have not started yet are skipped, the partial
    /// results are discarded and a [`PartbenchError::WorkerFailure`] naming
    /// the partition is returned.
    pub fn run_concurrently<W: Workload>(
        &mut self,
        partitions: &[Partition],
        workload: &Arc<W>,
        options: &BatchOptions,
    ) -> Result<Vec<W::Output>> {
        let runtime = self.runtime.as_ref().ok_or_else(|| {
            PartbenchError::InvalidConfiguration("Worker pool has already been shut down".to_string())
        })?;

        let cancelled = Arc::new(AtomicBool::new(false));
        let batch = collect(
            partitions,
            Arc::clone(workload),
            Arc::clone(&cancelled),
            options.progress_tx.clone(),
        );

        let outcome = match options.timeout {
            Some(limit) => runtime
                .block_on(async move { tokio::time::timeout(limit, batch).await })
                .unwrap_or(Err(PartbenchError::Timeout(limit))),
            None => runtime.block_on(batch),
        };

        if let Err(PartbenchError::Timeout(limit)) = &outcome {
            cancelled.store(true, Ordering::Release);
            self.abandoned = true;
            warn!(
                timeout = %humantime::format_duration(*limit),
                "batch timed out, abandoning running partitions"
            );
        }

        outcome
    }

    /// Stop all worker threads
    pub fn shutdown(mut self) {
        self.teardown();
    }

    fn teardown(&mut self) {
        if let Some(runtime) = self.runtime.take() {
            if self.abandoned {
                runtime.shutdown_background();
                debug!(size = self.size, "worker pool released in background");
            } else {
                // Joins every worker thread, including units still running
                // after a failure elsewhere in the batch.
                drop(runtime);
                debug!(size = self.size, "worker pool stopped");
            }
        }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.teardown();
    }
}

/// Submit one unit per partition and gather the outputs into partition-ordered slots
async fn collect<W: Workload>(
    partitions: &[Partition],
    workload: Arc<W>,
    cancelled: Arc<AtomicBool>,
    progress_tx: Option<mpsc::UnboundedSender<ProgressUpdate>>,
) -> Result<Vec<W::Output>> {
    let started = Instant::now();
    let total = partitions.len();
    let mut set = JoinSet::new();

    for (slot, part) in partitions.iter().copied().enumerate() {
        let workload = Arc::clone(&workload);
        let cancelled = Arc::clone(&cancelled);
        set.spawn_blocking(move || {
            if cancelled.load(Ordering::Acquire) {
                return (slot, UnitOutcome::Skipped);
            }
            let outcome = match panic::catch_unwind(AssertUnwindSafe(|| workload.run(part.range()))) {
                Ok(Ok(value)) => UnitOutcome::Done(value),
                Ok(Err(cause)) => UnitOutcome::Failed(cause),
                Err(payload) => UnitOutcome::Failed(panic_cause(payload)),
            };
            (slot, outcome)
        });
    }

    let mut slots: Vec<Option<W::Output>> = vec![None; total];
    let mut completed = 0usize;

    while let Some(joined) = set.join_next().await {
        let (slot, outcome) = joined.map_err(|e| {
            PartbenchError::Io(std::io::Error::other(format!("Worker join failed: {}", e)))
        })?;

        match outcome {
            UnitOutcome::Done(value) => {
                slots[slot] = Some(value);
                completed += 1;
                if let Some(tx) = &progress_tx {
                    // Receiver dropped means nobody is watching
                    let _ = tx.send(ProgressUpdate {
                        partition: partitions[slot].index,
                        completed,
                        total,
                        elapsed: started.elapsed(),
                    });
                }
            }
            UnitOutcome::Failed(cause) => {
                cancelled.store(true, Ordering::Release);
                set.abort_all();
                let index = partitions[slot].index;
                warn!(partition = index, error = %cause, "workload failed, abandoning batch");
                return Err(PartbenchError::WorkerFailure { index, cause });
            }
            UnitOutcome::Skipped => {}
        }
    }

    slots
        .into_iter()
        .zip(partitions)
        .map(|(value, part)| {
            value.ok_or_else(|| {
                PartbenchError::Io(std::io::Error::other(format!(
                    "Partition {} produced no result",
                    part.index
                )))
            })
        })
        .collect()
}

pub(crate) fn panic_cause(payload: Box<dyn std::any::Any + Send>) -> WorkloadError {
    let message = if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic payload".to_string()
    };
    format!("workload panicked: {}", message).into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bench::partition::partition;
    use crate::workload::{from_fn, PrimeCount};
    use std::ops::Range;
    use std::sync::atomic::AtomicUsize;
    use std::thread;

    #[test]
    fn test_pool_creation() {
        let pool = WorkerPool::new(3).unwrap();
        assert_eq!(pool.size(), 3);
        pool.shutdown();
    }

    #[test]
    fn test_zero_sized_pool_is_rejected() {
        let err = WorkerPool::new(0).unwrap_err();
        assert!(matches!(err, PartbenchError::InvalidConfiguration(_)));

        let err = WorkerPool::new(MAX_WORKERS + 1).unwrap_err();
        assert!(matches!(err, PartbenchError::InvalidConfiguration(_)));
    }

    #[test]
    fn test_results_follow_partition_order() {
        // Earlier partitions sleep longer, so they complete last
        let workload = Arc::new(from_fn("reverse", |range: Range<i64>| {
            thread::sleep(Duration::from_millis(((4 - range.start / 10) * 20) as u64));
            Ok(range.start as u64)
        }));
        let parts = partition(0, 40, 4).unwrap();

        let mut pool = WorkerPool::new(4).unwrap();
        let results = pool.run_concurrently(&parts, &workload, &BatchOptions::new()).unwrap();
        assert_eq!(results, vec![0, 10, 20, 30]);
    }

    #[test]
    fn test_partial_counts_sum_to_total() {
        let workload = Arc::new(PrimeCount::new());
        let parts = partition(2, 50, 3).unwrap();

        let mut pool = WorkerPool::new(2).unwrap();
        let results = pool.run_concurrently(&parts, &workload, &BatchOptions::new()).unwrap();
        assert_eq!(results.len(), 3);
        assert_eq!(results.iter().sum::<u64>(), 15);
    }

    #[test]
    fn test_failure_reports_partition_index() {
        let workload = Arc::new(from_fn("fails-on-30", |range: Range<i64>| {
            if range.contains(&30) {
                Err("bad input 30".into())
            } else {
                Ok(1u64)
            }
        }));
        let parts = partition(0, 40, 4).unwrap();

        let mut pool = WorkerPool::new(4).unwrap();
        let err = pool.run_concurrently(&parts, &workload, &BatchOptions::new()).unwrap_err();
        match err {
            PartbenchError::WorkerFailure { index, cause } => {
                assert_eq!(index, 3);
                assert!(cause.to_string().contains("bad input 30"));
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_panic_becomes_worker_failure() {
        let workload = Arc::new(from_fn("panics", |range: Range<i64>| {
            if range.start == 0 {
                panic!("boom");
            }
            Ok(0u64)
        }));
        let parts = partition(0, 20, 2).unwrap();

        let mut pool = WorkerPool::new(2).unwrap();
        let err = pool.run_concurrently(&parts, &workload, &BatchOptions::new()).unwrap_err();
        match err {
            PartbenchError::WorkerFailure { index, cause } => {
                assert_eq!(index, 0);
                assert!(cause.to_string().contains("boom"));
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_failure_skips_queued_units() {
        let started = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&started);
        let workload = Arc::new(from_fn("first-fails", move |range: Range<i64>| {
            if range.start == 0 {
                return Err("first partition failed".into());
            }
            counter.fetch_add(1, Ordering::SeqCst);
            thread::sleep(Duration::from_millis(300));
            Ok(1u64)
        }));
        let parts = partition(0, 8, 8).unwrap();

        let mut pool = WorkerPool::new(1).unwrap();
        let result = pool.run_concurrently(&parts, &workload, &BatchOptions::new());
        assert!(matches!(result, Err(PartbenchError::WorkerFailure { index: 0, .. })));
        pool.shutdown();

        assert!(started.load(Ordering::SeqCst) < 3);
    }

    #[test]
    fn test_timeout_abandons_batch() {
        let workload = Arc::new(from_fn("slow", |_range: Range<i64>| {
            thread::sleep(Duration::from_secs(2));
            Ok(0u64)
        }));
        let parts = partition(0, 4, 2).unwrap();

        let started = Instant::now();
        let mut pool = WorkerPool::new(2).unwrap();
        let options = BatchOptions::new().with_timeout(Duration::from_millis(50));
        let err = pool.run_concurrently(&parts, &workload, &options).unwrap_err();
        drop(pool);

        assert!(matches!(err, PartbenchError::Timeout(_)));
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[test]
    fn test_progress_updates() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let workload = Arc::new(PrimeCount::new());
        let parts = partition(0, 1000, 4).unwrap();

        let mut pool = WorkerPool::new(2).unwrap();
        let options = BatchOptions::new().with_progress(tx);
        pool.run_concurrently(&parts, &workload, &options).unwrap();
        drop(options);

        let mut updates = Vec::new();
        while let Ok(update) = rx.try_recv() {
            updates.push(update);
        }
        assert_eq!(updates.len(), 4);
        let last = updates.last().unwrap();
        assert_eq!(last.completed, 4);
        assert_eq!(last.total, 4);
        assert_eq!(last.completion_percentage(), 1.0);
    }

    #[test]
    fn test_empty_batch() {
        let workload = Arc::new(PrimeCount::new());
        let mut pool = WorkerPool::new(2).unwrap();
        let results = pool.run_concurrently(&[], &workload, &BatchOptions::new()).unwrap();
        assert!(results.is_empty());
    }
}
