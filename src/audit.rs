//! Append-only audit log of per-frame classifications.
//!
//! Every classification attempt, successful or not, produces exactly one line:
//!
//! ```text
//! 001.jpeg | 0 | {"evaluationTime":0.41,"credits":0.02,"scene":0.98}
//! 002.jpeg | 1 | {"evaluationTime":0.39,"credits":0.97,"scene":0.03}
//! 003.jpeg | 0 | FAILED: classifier exited with exit status: 1: no such file
//! ```
//!
//! Workers of a batch append concurrently, so [`AuditLog`] serialises appends
//! behind a mutex. The log is best-effort: if it cannot be opened or written,
//! a warning is logged and the run continues.
//!
//! [`read_audit_log`] parses a log back into records so a finished run can be
//! re-scored offline.

use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::classifier::{ClassificationScore, FrameVerdict};
use crate::error::CreditScanError;
use crate::frames::{Frame, MAX_FRAME_SLOTS};

const SEPARATOR: &str = " | ";
const FAILURE_PREFIX: &str = "FAILED: ";

/// Shared, serialised writer for the audit log file.
#[derive(Debug)]
pub struct AuditLog {
    path: Option<PathBuf>,
    file: Mutex<Option<File>>,
}

impl AuditLog {
    /// Open (or create) `path` for appending.
    ///
    /// Failure to open is not an error: it is logged and the returned log
    /// discards every record.
    pub fn open<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        let file = match OpenOptions::new().create(true).append(true).open(path) {
            Ok(file) => Some(file),
            Err(error) => {
                log::warn!("Cannot open audit log {}: {error}", path.display());
                None
            }
        };

        Self {
            path: Some(path.to_path_buf()),
            file: Mutex::new(file),
        }
    }

    /// A log that records nothing.
    pub fn disabled() -> Self {
        Self {
            path: None,
            file: Mutex::new(None),
        }
    }

    /// Path of the underlying file, if any.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Append one line for `frame`.
    pub fn append(&self, frame: &Frame, verdict: &FrameVerdict) {
        let line = format_line(&frame.file_name(), verdict);

        // A worker that panicked mid-write leaves a usable file behind.
        let mut guard = match self.file.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let Some(file) = guard.as_mut() else {
            return;
        };

        if let Err(error) = writeln!(file, "{line}") {
            log::warn!("Write to audit log failed for {}: {error}", frame.file_name());
        }
    }
}

/// Render one audit line (without the trailing newline).
pub fn format_line(file_name: &str, verdict: &FrameVerdict) -> String {
    let flag = u8::from(verdict.is_credits());
    let detail = match verdict {
        FrameVerdict::Classified { score, .. } => {
            serde_json::to_string(score).unwrap_or_else(|error| format!("{FAILURE_PREFIX}{error}"))
        }
        FrameVerdict::Failed { reason } => format!("{FAILURE_PREFIX}{}", single_line(reason)),
    };
    format!("{file_name}{SEPARATOR}{flag}{SEPARATOR}{detail}")
}

/// Join the non-empty lines of `text` with spaces. Classifier stderr is
/// often a multi-line traceback.
fn single_line(text: &str) -> String {
    text.split(['\r', '\n'])
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// One parsed audit line.
#[derive(Debug, Clone, PartialEq)]
pub struct AuditRecord {
    /// Frame file name as logged.
    pub file_name: String,
    /// Credits flag as logged.
    pub is_credits: bool,
    /// Raw scores, or `None` for a failed classification.
    pub score: Option<ClassificationScore>,
}

impl AuditRecord {
    /// Parse a single line. Returns `None` for lines that do not follow the
    /// audit format.
    pub fn parse(line: &str) -> Option<Self> {
        let mut parts = line.splitn(3, SEPARATOR);
        let file_name = parts.next()?.trim();
        let is_credits = match parts.next()?.trim() {
            "0" => false,
            "1" => true,
            _ => return None,
        };
        let detail = parts.next()?.trim();

        if file_name.is_empty() {
            return None;
        }

        let score = if detail.starts_with(FAILURE_PREFIX.trim_end()) {
            None
        } else {
            Some(serde_json::from_str(detail).ok()?)
        };

        Some(Self {
            file_name: file_name.to_string(),
            is_credits,
            score,
        })
    }

    /// The frame this record describes, if its file name is a frame name.
    pub fn frame(&self) -> Option<Frame> {
        Frame::from_path(Path::new(&self.file_name))
    }
}

/// Read every well-formed record from an audit log.
///
/// Malformed lines are skipped with a debug message.
///
/// # Errors
///
/// Returns [`CreditScanError::IoError`] if the file cannot be read.
pub fn read_audit_log<P: AsRef<Path>>(path: P) -> Result<Vec<AuditRecord>, CreditScanError> {
    let reader = BufReader::new(File::open(path.as_ref())?);
    let mut records = Vec::new();
    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        match AuditRecord::parse(&line) {
            Some(record) => records.push(record),
            None => log::debug!("Skipping malformed audit line {line:?}"),
        }
    }
    Ok(records)
}

/// Rebuild store flags from audit records.
///
/// Records are placed by frame number relative to `first_frame_number`. The
/// result is as long as the highest slot seen; missing slots are
/// not-credits. When a frame appears more than once the last record wins.
/// Records numbered past [`MAX_FRAME_SLOTS`] are skipped with a warning.
pub fn flags_from_records(records: &[AuditRecord], first_frame_number: u64) -> Vec<bool> {
    let placed: Vec<(usize, bool)> = records
        .iter()
        .filter_map(|record| {
            let frame = record.frame()?;
            let slot = frame.slot(first_frame_number)?;
            if slot >= MAX_FRAME_SLOTS {
                log::warn!(
                    "Skipping audit record {}: frame number is past {MAX_FRAME_SLOTS} slots",
                    record.file_name
                );
                return None;
            }
            Some((slot, record.is_credits))
        })
        .collect();

    let len = placed.iter().map(|(slot, _)| slot + 1).max().unwrap_or(0);
    let mut flags = vec![false; len];
    for (slot, is_credits) in placed {
        flags[slot] = is_credits;
    }
    flags
}
