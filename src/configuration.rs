//! Scan configuration.
//!
//! [`ScanOptions`] is a builder that threads thresholds, concurrency limits,
//! external tool locations, progress callbacks, and cancellation tokens
//! through a scan without polluting every function signature.
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//!
//! use creditscan::{CancellationToken, ScanOptions};
//!
//! let token = CancellationToken::new();
//! let options = ScanOptions::new()
//!     .with_credits_threshold(0.85)
//!     .with_batch_size(16)
//!     .with_classifier_timeout(Some(Duration::from_secs(30)))
//!     .with_cancellation(token.clone());
//! ```

use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::classifier::DEFAULT_CLASSIFIER_COMMAND;
use crate::error::CreditScanError;
use crate::locator::{CreditLocator, WindowDivisor};
use crate::progress::{CancellationToken, NoOpProgress, ProgressCallback};

/// Default per-frame credits probability threshold.
pub const DEFAULT_CREDITS_THRESHOLD: f64 = 0.9;
/// Default windowed-mean threshold.
pub const DEFAULT_MEAN_THRESHOLD: f64 = 0.7;
/// Default sliding window length, in frames.
pub const DEFAULT_SAMPLE_SIZE: usize = 10;
/// Default number of frames classified concurrently.
pub const DEFAULT_BATCH_SIZE: usize = 10;
/// Default length of the tail of the video that is sampled.
pub const DEFAULT_TAIL_WINDOW: Duration = Duration::from_secs(600);
/// Default per-frame classifier timeout.
pub const DEFAULT_CLASSIFIER_TIMEOUT: Duration = Duration::from_secs(120);

/// Configuration for a credit scan.
///
/// All fields have sensible defaults; a default-constructed value reproduces
/// the stock detector (threshold 0.9, window of 10 frames averaging above
/// 0.7, 10 concurrent classifications, last 10 minutes of the video).
#[derive(Clone)]
pub struct ScanOptions {
    pub(crate) credits_threshold: f64,
    pub(crate) mean_threshold: f64,
    pub(crate) sample_size: usize,
    pub(crate) batch_size: usize,
    pub(crate) window_divisor: WindowDivisor,
    pub(crate) tail_window: Duration,
    pub(crate) classifier_command: String,
    pub(crate) classifier_timeout: Option<Duration>,
    pub(crate) regenerate_frames: bool,
    pub(crate) first_frame_number: u64,
    pub(crate) cache_directory: Option<PathBuf>,
    pub(crate) audit_log: Option<PathBuf>,
    pub(crate) ffprobe: String,
    pub(crate) ffmpeg: String,
    pub(crate) progress: Arc<dyn ProgressCallback>,
    pub(crate) cancellation: Option<CancellationToken>,
}

impl Debug for ScanOptions {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("ScanOptions")
            .field("credits_threshold", &self.credits_threshold)
            .field("mean_threshold", &self.mean_threshold)
            .field("sample_size", &self.sample_size)
            .field("batch_size", &self.batch_size)
            .field("window_divisor", &self.window_divisor)
            .field("tail_window", &self.tail_window)
            .field("classifier_command", &self.classifier_command)
            .field("classifier_timeout", &self.classifier_timeout)
            .field("regenerate_frames", &self.regenerate_frames)
            .field("first_frame_number", &self.first_frame_number)
            .field("has_cancellation", &self.cancellation.is_some())
            .finish()
    }
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl ScanOptions {
    /// Create a new configuration with default settings.
    pub fn new() -> Self {
        Self {
            credits_threshold: DEFAULT_CREDITS_THRESHOLD,
            mean_threshold: DEFAULT_MEAN_THRESHOLD,
            sample_size: DEFAULT_SAMPLE_SIZE,
            batch_size: DEFAULT_BATCH_SIZE,
            window_divisor: WindowDivisor::Available,
            tail_window: DEFAULT_TAIL_WINDOW,
            classifier_command: DEFAULT_CLASSIFIER_COMMAND.to_string(),
            classifier_timeout: Some(DEFAULT_CLASSIFIER_TIMEOUT),
            regenerate_frames: true,
            first_frame_number: 1,
            cache_directory: None,
            audit_log: None,
            ffprobe: "ffprobe".to_string(),
            ffmpeg: "ffmpeg".to_string(),
            progress: Arc::new(NoOpProgress),
            cancellation: None,
        }
    }

    /// Probability above which a single frame counts as credits.
    #[must_use]
    pub fn with_credits_threshold(mut self, threshold: f64) -> Self {
        self.credits_threshold = threshold;
        self
    }

    /// Mean a window of frames must strictly exceed to mark the credit start.
    #[must_use]
    pub fn with_mean_threshold(mut self, threshold: f64) -> Self {
        self.mean_threshold = threshold;
        self
    }

    /// Sliding window length in frames. Clamped to a minimum of 1.
    #[must_use]
    pub fn with_sample_size(mut self, size: usize) -> Self {
        self.sample_size = size.max(1);
        self
    }

    /// Number of frames classified concurrently per batch. Clamped to a
    /// minimum of 1.
    #[must_use]
    pub fn with_batch_size(mut self, size: usize) -> Self {
        self.batch_size = size.max(1);
        self
    }

    /// How clipped windows at the end of the range are averaged.
    #[must_use]
    pub fn with_window_divisor(mut self, divisor: WindowDivisor) -> Self {
        self.window_divisor = divisor;
        self
    }

    /// Length of the tail of the video to sample. Sampling starts at
    /// `duration - tail_window`, or at zero for shorter videos.
    #[must_use]
    pub fn with_tail_window(mut self, window: Duration) -> Self {
        self.tail_window = window;
        self
    }

    /// Whitespace-separated classifier command line. `{frame}` is replaced by
    /// the frame path.
    #[must_use]
    pub fn with_classifier_command<S: Into<String>>(mut self, command: S) -> Self {
        self.classifier_command = command.into();
        self
    }

    /// Per-frame classifier timeout. `None` waits indefinitely.
    #[must_use]
    pub fn with_classifier_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.classifier_timeout = timeout;
        self
    }

    /// Whether to wipe the cache directory and extract fresh stills. When
    /// `false`, stills already in the cache are reused.
    #[must_use]
    pub fn with_regenerate_frames(mut self, regenerate: bool) -> Self {
        self.regenerate_frames = regenerate;
        self
    }

    /// Number of the first still the extractor writes (`1` for `001.jpeg`).
    #[must_use]
    pub fn with_first_frame_number(mut self, number: u64) -> Self {
        self.first_frame_number = number;
        self
    }

    /// Directory for extracted stills. Defaults to `~cache` next to the
    /// input.
    #[must_use]
    pub fn with_cache_directory<P: Into<PathBuf>>(mut self, directory: P) -> Self {
        self.cache_directory = Some(directory.into());
        self
    }

    /// Audit log path. Defaults to `results.txt` inside the frame directory.
    #[must_use]
    pub fn with_audit_log<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.audit_log = Some(path.into());
        self
    }

    /// Path or name of the `ffprobe` binary.
    #[must_use]
    pub fn with_ffprobe<S: Into<String>>(mut self, program: S) -> Self {
        self.ffprobe = program.into();
        self
    }

    /// Path or name of the `ffmpeg` binary.
    #[must_use]
    pub fn with_ffmpeg<S: Into<String>>(mut self, program: S) -> Self {
        self.ffmpeg = program.into();
        self
    }

    /// Attach a progress callback, invoked after every batch.
    #[must_use]
    pub fn with_progress(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.progress = callback;
        self
    }

    /// Attach a cancellation token, checked before every batch.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    /// Per-frame credits threshold.
    pub fn credits_threshold(&self) -> f64 {
        self.credits_threshold
    }

    /// Windowed-mean threshold.
    pub fn mean_threshold(&self) -> f64 {
        self.mean_threshold
    }

    /// Sliding window length.
    pub fn sample_size(&self) -> usize {
        self.sample_size
    }

    /// Concurrency bound.
    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Tail window used to compute the seek offset.
    pub fn tail_window(&self) -> Duration {
        self.tail_window
    }

    /// Whether stills are regenerated.
    pub fn regenerate_frames(&self) -> bool {
        self.regenerate_frames
    }

    /// The locator these options describe.
    pub fn locator(&self) -> CreditLocator {
        CreditLocator::new(self.sample_size, self.mean_threshold).with_divisor(self.window_divisor)
    }

    /// Check that every value is usable.
    ///
    /// # Errors
    ///
    /// Returns [`CreditScanError::InvalidOption`] for thresholds outside
    /// `[0, 1]`, a zero classifier timeout, or an empty classifier command.
    pub fn validate(&self) -> Result<(), CreditScanError> {
        for (name, value) in [
            ("credits_threshold", self.credits_threshold),
            ("mean_threshold", self.mean_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(CreditScanError::InvalidOption {
                    name,
                    reason: format!("{value} is outside [0, 1]"),
                });
            }
        }

        if self.classifier_timeout.is_some_and(|timeout| timeout.is_zero()) {
            return Err(CreditScanError::InvalidOption {
                name: "classifier_timeout",
                reason: "must be greater than zero".to_string(),
            });
        }

        if self.classifier_command.trim().is_empty() {
            return Err(CreditScanError::InvalidOption {
                name: "classifier_command",
                reason: "must not be empty".to_string(),
            });
        }

        Ok(())
    }
}

/// Second of the source video at which sampling starts.
///
/// Videos no longer than `tail_window` are sampled from the beginning.
pub fn seek_offset(duration_seconds: u64, tail_window: Duration) -> u64 {
    let window = tail_window.as_secs();
    if duration_seconds > window {
        duration_seconds - window
    } else {
        0
    }
}
