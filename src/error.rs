//! Error types for the `creditscan` crate.
//!
//! This module defines [`CreditScanError`], the unified error type returned by
//! all fallible pipeline operations, and [`ClassifierError`], the per-frame
//! failure produced by a [`FrameClassifier`](crate::FrameClassifier).
//!
//! A `CreditScanError` aborts a run. A `ClassifierError` never leaves the
//! worker pool: the frame is recorded as not-credits and the failure goes to
//! the log and the audit log.

use std::{io::Error as IoError, path::PathBuf, process::ExitStatus, time::Duration};

use thiserror::Error;

/// The unified error type for all `creditscan` operations.
///
/// Every public method that can abort a run returns
/// `Result<T, CreditScanError>`. Variants carry enough context to diagnose the
/// problem without needing additional logging at the call site.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CreditScanError {
    /// An external tool (`ffprobe`, `ffmpeg`) could not be started.
    #[error("Failed to launch {tool}: {reason}")]
    ToolLaunch {
        /// Program name or path that was executed.
        tool: String,
        /// Underlying reason the launch failed.
        reason: String,
    },

    /// An external tool ran but exited unsuccessfully.
    #[error("{tool} failed ({status}): {stderr}")]
    ToolFailed {
        /// Program name or path that was executed.
        tool: String,
        /// Exit status reported by the operating system.
        status: ExitStatus,
        /// Captured standard error, trimmed.
        stderr: String,
    },

    /// The duration probe produced output that is not a number of seconds.
    #[error("Could not parse media duration from {output:?}")]
    DurationParse {
        /// The raw probe output.
        output: String,
    },

    /// The frame directory could not be read.
    #[error("Failed to read frame directory {path}: {reason}")]
    FrameDirectory {
        /// Directory that was listed.
        path: PathBuf,
        /// Underlying reason the listing failed.
        reason: String,
    },

    /// A [`ScanOptions`](crate::ScanOptions) value is out of range.
    #[error("Invalid option {name}: {reason}")]
    InvalidOption {
        /// Option name as used by the builder.
        name: &'static str,
        /// Why the value was rejected.
        reason: String,
    },

    /// The batch worker pool could not be created.
    #[error("Failed to build worker pool: {0}")]
    WorkerPool(String),

    /// An I/O error occurred while reading or writing files.
    #[error("I/O error: {0}")]
    IoError(#[from] IoError),

    /// The run was cancelled via a [`CancellationToken`](crate::CancellationToken).
    #[error("Operation cancelled")]
    Cancelled,
}

/// A single frame could not be classified.
///
/// Produced by [`FrameClassifier::classify`](crate::FrameClassifier::classify).
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ClassifierError {
    /// The classifier process could not be started.
    #[error("failed to launch classifier {program}: {reason}")]
    Launch {
        /// Program that was executed.
        program: String,
        /// Underlying reason the launch failed.
        reason: String,
    },

    /// The classifier exited unsuccessfully.
    #[error("classifier exited with {status}: {stderr}")]
    Failed {
        /// Exit status of the classifier process.
        status: ExitStatus,
        /// Captured standard error, trimmed.
        stderr: String,
    },

    /// The classifier did not finish within the configured timeout and was
    /// killed.
    #[error("classifier timed out after {0:?}")]
    TimedOut(Duration),

    /// The classifier output is not a valid score record.
    #[error("malformed classifier output: {0}")]
    MalformedOutput(String),

    /// Reading the classifier's output failed.
    #[error("classifier I/O error: {0}")]
    Io(#[from] IoError),
}

impl From<serde_json::Error> for ClassifierError {
    fn from(error: serde_json::Error) -> Self {
        ClassifierError::MalformedOutput(error.to_string())
    }
}
