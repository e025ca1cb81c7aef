//! Batched, bounded-concurrency frame classification.
//!
//! [`BatchWorkerPool`] walks a frame directory in consecutive batches of
//! `batch_size` frames. Every frame of a batch is classified on its own
//! worker thread; the batch is a full barrier, so the next batch starts only
//! once every worker of the current one has returned, failures included.
//!
//! After each barrier the pool asks the [`CreditLocator`] about the prefix of
//! the store filled so far and stops as soon as a credit start is found,
//! saving the classifier invocations for every later batch.

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use rayon::{ThreadPool, ThreadPoolBuilder};
use serde::Serialize;

use crate::classifier::ClassifierAdapter;
use crate::configuration::ScanOptions;
use crate::error::CreditScanError;
use crate::frames::{Frame, list_frames};
use crate::locator::{CreditLocator, CreditStart};
use crate::progress::{CancellationToken, ProgressCallback, ProgressTracker};
use crate::store::FrameResultStore;

/// State owned by one pipeline run: the result store and the adapter that
/// fills it.
pub struct RunContext {
    store: FrameResultStore,
    adapter: ClassifierAdapter,
    first_frame_number: u64,
}

impl RunContext {
    /// Create a context with a store of `store_len` slots.
    ///
    /// Frame number `first_frame_number` maps to slot 0.
    pub fn new(store_len: usize, adapter: ClassifierAdapter, first_frame_number: u64) -> Self {
        Self {
            store: FrameResultStore::new(store_len),
            adapter,
            first_frame_number,
        }
    }

    /// The per-frame result store.
    pub fn store(&self) -> &FrameResultStore {
        &self.store
    }

    /// The classifier adapter.
    pub fn adapter(&self) -> &ClassifierAdapter {
        &self.adapter
    }

    fn classify_into_store(&self, frame: &Frame) -> bool {
        let verdict = self.adapter.classify(frame);
        let recorded = frame
            .slot(self.first_frame_number)
            .is_some_and(|slot| self.store.record(slot, verdict.is_credits()));
        if !recorded {
            log::warn!(
                "Frame {} has no free slot in a store of {} (first frame number {})",
                frame.file_name(),
                self.store.len(),
                self.first_frame_number,
            );
        }
        verdict.is_failure()
    }
}

/// Summary of one pool run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PoolReport {
    /// Where credits start, relative to the store.
    pub credit_start: CreditStart,
    /// Frames found in the frame directory.
    pub frames_total: usize,
    /// Frames handed to the classifier.
    pub frames_classified: usize,
    /// Frames whose classification failed.
    pub failures: usize,
    /// Batches that passed their barrier.
    pub batches_completed: usize,
    /// End of the store range the last locator scan covered.
    pub range_end: usize,
    /// `true` when batches were skipped because a credit start was found.
    pub stopped_early: bool,
}

/// Classifies frames batch by batch and locates the credit start.
pub struct BatchWorkerPool {
    batch_size: usize,
    locator: CreditLocator,
    threads: ThreadPool,
    progress: Arc<dyn ProgressCallback>,
    cancellation: Option<CancellationToken>,
}

impl BatchWorkerPool {
    /// Build a pool from scan options.
    ///
    /// The pool owns exactly `batch_size` worker threads, so every frame of a
    /// batch runs concurrently and no more than `batch_size` classifications
    /// are ever in flight.
    ///
    /// # Errors
    ///
    /// Returns [`CreditScanError::WorkerPool`] if the threads cannot be
    /// spawned.
    pub fn new(options: &ScanOptions) -> Result<Self, CreditScanError> {
        let batch_size = options.batch_size.max(1);
        let threads = ThreadPoolBuilder::new()
            .num_threads(batch_size)
            .thread_name(|index| format!("creditscan-worker-{index}"))
            .build()
            .map_err(|error| CreditScanError::WorkerPool(error.to_string()))?;

        Ok(Self {
            batch_size,
            locator: options.locator(),
            threads,
            progress: Arc::clone(&options.progress),
            cancellation: options.cancellation.clone(),
        })
    }

    /// Frames per batch.
    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Classify the frames in `frame_directory` into `context` and return the
    /// credit start.
    ///
    /// # Errors
    ///
    /// Returns [`CreditScanError::FrameDirectory`] if the directory cannot be
    /// listed and [`CreditScanError::Cancelled`] if the cancellation token
    /// fires between batches. Individual classifier failures are not errors.
    pub fn run(
        &self,
        frame_directory: &Path,
        context: &RunContext,
    ) -> Result<PoolReport, CreditScanError> {
        let frames = list_frames(frame_directory)?;
        let mut report = PoolReport {
            credit_start: CreditStart::NotFound,
            frames_total: frames.len(),
            frames_classified: 0,
            failures: 0,
            batches_completed: 0,
            range_end: 0,
            stopped_early: false,
        };

        if frames.is_empty() {
            log::info!("No frames found in {}", frame_directory.display());
            return Ok(report);
        }

        log::info!(
            "Classifying {} frames in batches of {}",
            frames.len(),
            self.batch_size
        );

        let store_len = context.store.len();
        let batch_count = frames.len().div_ceil(self.batch_size);
        let mut tracker = ProgressTracker::new(Arc::clone(&self.progress), Some(frames.len() as u64));

        for (batch_index, batch) in frames.chunks(self.batch_size).enumerate() {
            if self
                .cancellation
                .as_ref()
                .is_some_and(|token| token.is_cancelled())
            {
                log::info!("Cancelled before batch {}", batch_index + 1);
                return Err(CreditScanError::Cancelled);
            }

            let failures = AtomicUsize::new(0);
            self.threads.scope(|scope| {
                for frame in batch {
                    let failures = &failures;
                    scope.spawn(move |_| {
                        if context.classify_into_store(frame) {
                            failures.fetch_add(1, Ordering::Relaxed);
                        }
                    });
                }
            });

            let batch_end = batch
                .iter()
                .filter_map(|frame| frame.slot(context.first_frame_number))
                .map(|slot| slot.saturating_add(1))
                .max()
                .unwrap_or(0);
            report.range_end = report.range_end.max(batch_end).min(store_len);
            report.frames_classified += batch.len();
            report.failures += failures.into_inner();
            report.batches_completed += 1;
            tracker.complete_batch(batch.len() as u64, batch.last().map(|frame| frame.number));

            let is_last_batch = batch_index + 1 == batch_count;
            let complete = is_last_batch || report.range_end >= store_len;
            let flags = context.store.snapshot(report.range_end);
            let credit_start = self.locator.locate_settled(&flags, complete);

            log::debug!(
                "Batch {}/{} done, scanned [0, {}): {:?}",
                batch_index + 1,
                batch_count,
                report.range_end,
                credit_start
            );

            if credit_start.is_found() {
                report.credit_start = credit_start;
                report.stopped_early = !is_last_batch;
                log::info!(
                    "Credit start found at store offset {:?} after {} of {} batches",
                    credit_start.offset(),
                    batch_index + 1,
                    batch_count
                );
                return Ok(report);
            }
        }

        log::info!("No credit start found in {} frames", report.frames_classified);
        Ok(report)
    }
}
