//! # creditscan
//!
//! Locate the timestamp at which a video's closing credits begin.
//!
//! `creditscan` samples one still per second from the tail of a video,
//! classifies every still with an external image classifier, and scans the
//! resulting credits / not-credits sequence with a sliding window for the
//! earliest sustained run of credits frames.
//!
//! ## Quick Start
//!
//! ### Scan a Video
//!
//! ```no_run
//! use creditscan::{CreditScanner, ScanOptions};
//!
//! let scanner = CreditScanner::new(ScanOptions::new());
//! let report = scanner.scan("movie.mp4").unwrap();
//! if let Some(seconds) = report.credits_start_seconds {
//!     println!("Closing credits start at {seconds} seconds");
//! }
//! ```
//!
//! ### Bring Your Own Classifier
//!
//! ```no_run
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! use creditscan::{ClassificationScore, ClassifierError, CreditScanner, FrameClassifier, ScanOptions};
//!
//! struct AlwaysCredits;
//!
//! impl FrameClassifier for AlwaysCredits {
//!     fn classify(&self, _frame: &Path) -> Result<ClassificationScore, ClassifierError> {
//!         Ok(ClassificationScore {
//!             evaluation_time: 0.0,
//!             credits_probability: 1.0,
//!             scene_probability: 0.0,
//!         })
//!     }
//! }
//!
//! let scanner = CreditScanner::with_classifier(ScanOptions::new(), Arc::new(AlwaysCredits));
//! let report = scanner.scan_frames("stills/", None, 0).unwrap();
//! ```
//!
//! ### Re-score an Audit Log
//!
//! ```no_run
//! use creditscan::{CreditLocator, audit};
//!
//! let records = audit::read_audit_log("stills/results.txt").unwrap();
//! let flags = audit::flags_from_records(&records, 1);
//! let start = CreditLocator::new(10, 0.7).locate(&flags);
//! ```
//!
//! ## Pipeline
//!
//! - **Duration probe and still extraction** run `ffprobe` / `ffmpeg`; their
//!   failures abort the scan
//! - **Classification** runs in batches of bounded concurrency; a failing
//!   frame counts as not-credits and never aborts the scan
//! - **Audit log** records one line per classified frame
//! - **Locator** runs after every batch and stops the scan as soon as a
//!   credit start is settled
//!
//! ## Requirements
//!
//! `ffprobe` and `ffmpeg` must be on the `PATH` (or configured through
//! [`ScanOptions`]), along with a classifier program that prints a JSON score
//! record for an image.

pub mod audit;
pub mod classifier;
pub mod configuration;
pub mod error;
pub mod extract;
mod ffmpeg;
pub mod frames;
pub mod locator;
pub mod pool;
pub mod probe;
pub mod progress;
pub mod scanner;
pub mod store;

pub use audit::{AuditLog, AuditRecord};
pub use classifier::{
    ClassificationScore, ClassifierAdapter, CommandClassifier, FrameClassifier, FrameVerdict,
};
pub use configuration::{ScanOptions, seek_offset};
pub use error::{ClassifierError, CreditScanError};
pub use frames::{Frame, list_frames};
pub use locator::{CreditLocator, CreditStart, WindowDivisor};
pub use pool::{BatchWorkerPool, PoolReport, RunContext};
pub use probe::{parse_duration, probe_duration};
pub use progress::{CancellationToken, ProgressCallback, ProgressInfo};
pub use scanner::{CreditReport, CreditScanner};
pub use store::FrameResultStore;
