//! Credit scan orchestration.
//!
//! [`CreditScanner`] is the main entry point. A scan probes the input's
//! duration, samples the tail of the video into a cache directory, classifies
//! the stills through the [`BatchWorkerPool`], and reports where the credits
//! start in seconds from the beginning of the video.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;

use crate::audit::AuditLog;
use crate::classifier::{ClassifierAdapter, CommandClassifier, FrameClassifier};
use crate::configuration::{ScanOptions, seek_offset};
use crate::error::CreditScanError;
use crate::extract::{cache_directory_for, extract_stills, prepare_cache_directory};
use crate::frames::{MAX_FRAME_SLOTS, list_frames};
use crate::locator::CreditStart;
use crate::pool::{BatchWorkerPool, PoolReport, RunContext};
use crate::probe::probe_duration;

/// File name of the audit log inside the frame directory.
pub const AUDIT_LOG_NAME: &str = "results.txt";

/// Result of a credit scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreditReport {
    /// Probed duration of the input in whole seconds, when a video was
    /// scanned.
    pub duration_seconds: Option<u64>,
    /// Second of the video that store offset 0 corresponds to.
    pub seek_offset: u64,
    /// Second of the video at which the credits start, if found.
    pub credits_start_seconds: Option<u64>,
    /// Directory the stills were read from.
    pub frame_directory: PathBuf,
    /// Audit log written during the scan.
    pub audit_log: Option<PathBuf>,
    /// Number of slots in the frame result store.
    pub store_len: usize,
    /// Worker pool statistics.
    #[serde(flatten)]
    pub pool: PoolReport,
}

impl CreditReport {
    /// Where credits start relative to the seek offset.
    pub fn credit_start(&self) -> CreditStart {
        self.pool.credit_start
    }

    /// Credit start as a timestamp from the beginning of the video.
    pub fn credits_timestamp(&self) -> Option<Duration> {
        self.credits_start_seconds.map(Duration::from_secs)
    }
}

/// Locates closing credits in video files.
///
/// # Example
///
/// ```no_run
/// use creditscan::{CreditScanError, CreditScanner, ScanOptions};
///
/// let scanner = CreditScanner::new(ScanOptions::new().with_batch_size(8));
/// let report = scanner.scan("movie.mp4")?;
/// match report.credits_start_seconds {
///     Some(seconds) => println!("Credits start at {seconds}s"),
///     None => println!("No credits found"),
/// }
/// # Ok::<(), CreditScanError>(())
/// ```
pub struct CreditScanner {
    options: ScanOptions,
    classifier: Arc<dyn FrameClassifier>,
}

impl CreditScanner {
    /// Create a scanner that classifies frames with the command configured in
    /// `options`.
    pub fn new(options: ScanOptions) -> Self {
        let classifier = CommandClassifier::from_command_line(&options.classifier_command)
            .unwrap_or_default()
            .with_timeout(options.classifier_timeout);
        Self::with_classifier(options, Arc::new(classifier))
    }

    /// Create a scanner with a custom classifier.
    pub fn with_classifier(options: ScanOptions, classifier: Arc<dyn FrameClassifier>) -> Self {
        Self {
            options,
            classifier,
        }
    }

    /// The options this scanner runs with.
    pub fn options(&self) -> &ScanOptions {
        &self.options
    }

    /// Scan a video file.
    ///
    /// # Errors
    ///
    /// Fails if the options are invalid, the duration cannot be probed, the
    /// cache directory cannot be prepared, stills cannot be extracted, the
    /// frame directory cannot be read, or the scan is cancelled. Individual
    /// frame classification failures do not fail the scan.
    pub fn scan<P: AsRef<Path>>(&self, input: P) -> Result<CreditReport, CreditScanError> {
        let input = input.as_ref();
        self.options.validate()?;

        let duration = probe_duration(&self.options.ffprobe, input)?;
        let seek = seek_offset(duration, self.options.tail_window);

        let directory = self
            .options
            .cache_directory
            .clone()
            .unwrap_or_else(|| cache_directory_for(input));

        let regenerate = self.options.regenerate_frames;
        prepare_cache_directory(&directory, regenerate)?;
        if regenerate || list_frames(&directory)?.is_empty() {
            if !regenerate {
                log::info!(
                    "No cached stills in {}, extracting",
                    directory.display()
                );
            }
            extract_stills(&self.options.ffmpeg, input, &directory, seek)?;
        } else {
            log::info!("Reusing cached stills in {}", directory.display());
        }

        let store_len = usize::try_from(duration - seek).unwrap_or(usize::MAX);
        let mut report = self.run_pool(&directory, store_len, seek)?;
        report.duration_seconds = Some(duration);
        Ok(report)
    }

    /// Classify an existing directory of stills.
    ///
    /// `seek_offset` is the second of the video the first still was taken
    /// at. When `store_len` is `None` the store is sized to the highest frame
    /// number found, ignoring frames past [`MAX_FRAME_SLOTS`].
    ///
    /// # Errors
    ///
    /// Fails if the options are invalid, the directory cannot be read, or the
    /// scan is cancelled.
    pub fn scan_frames<P: AsRef<Path>>(
        &self,
        directory: P,
        store_len: Option<usize>,
        seek_offset: u64,
    ) -> Result<CreditReport, CreditScanError> {
        let directory = directory.as_ref();
        self.options.validate()?;

        let store_len = match store_len {
            Some(len) => len,
            None => {
                let frames = list_frames(directory)?;
                let first = self.options.first_frame_number;
                for frame in frames.iter().filter(|frame| {
                    frame.slot(first).is_some() && frame.bounded_slot(first).is_none()
                }) {
                    log::warn!(
                        "Ignoring {} when sizing the store: frame number is past {MAX_FRAME_SLOTS} slots",
                        frame.file_name()
                    );
                }
                frames
                    .iter()
                    .filter_map(|frame| frame.bounded_slot(first))
                    .map(|slot| slot + 1)
                    .max()
                    .unwrap_or(0)
            }
        };

        self.run_pool(directory, store_len, seek_offset)
    }

    fn run_pool(
        &self,
        directory: &Path,
        store_len: usize,
        seek: u64,
    ) -> Result<CreditReport, CreditScanError> {
        let audit_path = self
            .options
            .audit_log
            .clone()
            .unwrap_or_else(|| directory.join(AUDIT_LOG_NAME));
        let audit = AuditLog::open(&audit_path);

        let adapter = ClassifierAdapter::new(
            Arc::clone(&self.classifier),
            self.options.credits_threshold,
            audit,
        );
        let context = RunContext::new(store_len, adapter, self.options.first_frame_number);
        let pool = BatchWorkerPool::new(&self.options)?;

        let pool_report = pool.run(directory, &context)?;
        let credits_start_seconds = pool_report
            .credit_start
            .offset()
            .map(|offset| seek + offset as u64);

        if let Some(seconds) = credits_start_seconds {
            log::info!("Closing credits start at {seconds} seconds");
        }

        Ok(CreditReport {
            duration_seconds: None,
            seek_offset: seek,
            credits_start_seconds,
            frame_directory: directory.to_path_buf(),
            audit_log: Some(audit_path),
            store_len,
            pool: pool_report,
        })
    }
}
