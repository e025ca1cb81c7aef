//! Progress reporting and cancellation support.
//!
//! This module provides [`ProgressCallback`] for monitoring classification
//! progress, [`CancellationToken`] for cooperative cancellation, and
//! [`ProgressInfo`] for detailed progress snapshots.
//!
//! Progress is reported once per batch, after the batch barrier, so the
//! callback is never invoked concurrently with itself.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use creditscan::{CreditScanError, CreditScanner, ProgressCallback, ProgressInfo, ScanOptions};
//!
//! struct PrintProgress;
//!
//! impl ProgressCallback for PrintProgress {
//!     fn on_progress(&self, info: &ProgressInfo) {
//!         if let Some(pct) = info.percentage {
//!             println!("{pct:.1}% of frames classified");
//!         }
//!     }
//! }
//!
//! let options = ScanOptions::new().with_progress(Arc::new(PrintProgress));
//! let report = CreditScanner::new(options).scan("movie.mp4")?;
//! # Ok::<(), CreditScanError>(())
//! ```

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use std::time::{Duration, Instant};

/// A snapshot of classification progress.
#[derive(Debug, Clone)]
pub struct ProgressInfo {
    /// How many frames have been classified so far.
    pub current: u64,
    /// Total frames found in the frame directory.
    pub total: Option<u64>,
    /// Completion percentage (0.0 – 100.0), if `total` is known.
    pub percentage: Option<f32>,
    /// Number of batches that have passed their barrier.
    pub batches_completed: u64,
    /// Wall-clock time elapsed since classification started.
    pub elapsed: Duration,
    /// Estimated time remaining, based on current throughput.
    pub estimated_remaining: Option<Duration>,
    /// The highest frame number classified so far.
    pub current_frame: Option<u64>,
}

/// Trait for receiving progress updates during a scan.
///
/// Implementations must be [`Send`] and [`Sync`] because the options holding
/// them are shared with worker threads.
///
/// Progress callbacks are **infallible**: they observe but cannot halt the
/// run. Use [`CancellationToken`] for cooperative cancellation.
pub trait ProgressCallback: Send + Sync {
    /// Called after every completed batch.
    fn on_progress(&self, info: &ProgressInfo);
}

/// A no-op implementation that discards all progress notifications.
///
/// This is the default when no callback is configured.
pub(crate) struct NoOpProgress;

impl ProgressCallback for NoOpProgress {
    fn on_progress(&self, _info: &ProgressInfo) {}
}

/// Cooperative cancellation token backed by an [`AtomicBool`].
///
/// Clone this token and share it between threads; call [`cancel`](CancellationToken::cancel)
/// from any thread to request cancellation of the associated run.
/// The worker pool checks [`is_cancelled`](CancellationToken::is_cancelled)
/// before starting each batch. A batch that is already running always
/// finishes.
///
/// # Example
///
/// ```
/// use creditscan::CancellationToken;
///
/// let token = CancellationToken::new();
/// assert!(!token.is_cancelled());
///
/// token.cancel();
/// assert!(token.is_cancelled());
/// ```
#[derive(Debug, Clone)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    /// Create a new, non-cancelled token.
    pub fn new() -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Request cancellation.
    ///
    /// All clones of this token will observe the cancellation.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    /// Check whether cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

/// Internal helper that tracks progress timing and emits callbacks.
pub(crate) struct ProgressTracker {
    callback: Arc<dyn ProgressCallback>,
    total: Option<u64>,
    current: u64,
    batches_completed: u64,
    start_time: Instant,
}

impl ProgressTracker {
    pub(crate) fn new(callback: Arc<dyn ProgressCallback>, total: Option<u64>) -> Self {
        Self {
            callback,
            total,
            current: 0,
            batches_completed: 0,
            start_time: Instant::now(),
        }
    }

    /// Record a completed batch of `frames` frames and fire the callback.
    pub(crate) fn complete_batch(&mut self, frames: u64, last_frame: Option<u64>) {
        self.current += frames;
        self.batches_completed += 1;
        self.report(last_frame);
    }

    fn report(&self, frame_number: Option<u64>) {
        let elapsed = self.start_time.elapsed();

        let percentage = self
            .total
            .filter(|&t| t > 0)
            .map(|t| (self.current as f32 / t as f32) * 100.0);

        let estimated_remaining = if self.current > 0 {
            self.total.map(|t| {
                let remaining = t.saturating_sub(self.current);
                let per_item = elapsed / self.current as u32;
                per_item * remaining as u32
            })
        } else {
            None
        };

        let info = ProgressInfo {
            current: self.current,
            total: self.total,
            percentage,
            batches_completed: self.batches_completed,
            elapsed,
            estimated_remaining,
            current_frame: frame_number,
        };

        self.callback.on_progress(&info);
    }
}
