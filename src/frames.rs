//! Frame discovery.
//!
//! The extractor writes one still per sampled second, named by a sequential
//! frame number (`001.jpeg`, `002.jpeg`, …). [`list_frames`] reads such a
//! directory once and returns the frames in frame-number order. Entries that
//! are not images or whose stem is not a base-10 integer (the audit log, stray
//! files) are skipped.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::CreditScanError;

/// Image extensions recognised as frames.
const FRAME_EXTENSIONS: [&str; 2] = ["jpeg", "jpg"];

/// Largest number of store slots derived from frame numbers: one day of
/// stills at one frame per second. Frames numbered past it are stray files.
pub const MAX_FRAME_SLOTS: usize = 86_400;

/// One extracted still image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Sequential number parsed from the file stem.
    pub number: u64,
    /// Full path to the image.
    pub path: PathBuf,
}

impl Frame {
    /// Parse a frame from a path, returning `None` for non-frame entries.
    pub fn from_path(path: &Path) -> Option<Self> {
        let extension = path.extension()?.to_str()?.to_ascii_lowercase();
        if !FRAME_EXTENSIONS.contains(&extension.as_str()) {
            return None;
        }

        let stem = path.file_stem()?.to_str()?.trim();
        if stem.is_empty() || !stem.bytes().all(|byte| byte.is_ascii_digit()) {
            return None;
        }

        let number = stem.parse::<u64>().ok()?;
        Some(Self {
            number,
            path: path.to_path_buf(),
        })
    }

    /// The file name, as written to the audit log.
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Store slot for this frame, given the number of the first frame the
    /// extractor writes.
    ///
    /// Returns `None` for frames numbered below `first_frame_number`.
    pub fn slot(&self, first_frame_number: u64) -> Option<usize> {
        self.number
            .checked_sub(first_frame_number)
            .and_then(|slot| usize::try_from(slot).ok())
    }

    /// Like [`slot`](Frame::slot), but `None` past [`MAX_FRAME_SLOTS`].
    pub fn bounded_slot(&self, first_frame_number: u64) -> Option<usize> {
        self.slot(first_frame_number)
            .filter(|&slot| slot < MAX_FRAME_SLOTS)
    }
}

/// List the frames in `directory`, sorted by frame number.
///
/// # Errors
///
/// Returns [`CreditScanError::FrameDirectory`] if the directory cannot be
/// read.
pub fn list_frames(directory: &Path) -> Result<Vec<Frame>, CreditScanError> {
    let to_error = |error: std::io::Error| CreditScanError::FrameDirectory {
        path: directory.to_path_buf(),
        reason: error.to_string(),
    };

    let mut frames = Vec::new();
    for entry in fs::read_dir(directory).map_err(to_error)? {
        let entry = entry.map_err(to_error)?;
        if entry.file_type().map_err(to_error)?.is_dir() {
            continue;
        }
        match Frame::from_path(&entry.path()) {
            Some(frame) => frames.push(frame),
            None => log::debug!("Skipping non-frame entry {}", entry.path().display()),
        }
    }

    frames.sort_by_key(|frame| frame.number);
    Ok(frames)
}
