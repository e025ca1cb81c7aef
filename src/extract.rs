//! Still extraction and the frame cache directory.
//!
//! Stills are written by `ffmpeg` at one frame per second, starting at the
//! seek offset, as `001.jpeg`, `002.jpeg`, … inside a cache directory that by
//! default lives next to the input as `~cache`.

use std::ffi::OsStr;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::error::CreditScanError;
use crate::ffmpeg::run_tool;

/// Name of the cache directory created next to the input.
pub const CACHE_DIRECTORY_NAME: &str = "~cache";

/// Output pattern handed to `ffmpeg`; produces `001.jpeg`, `002.jpeg`, ….
pub const STILL_PATTERN: &str = "%03d.jpeg";

/// Default cache directory for `input`: `~cache` in the input's directory.
pub fn cache_directory_for(input: &Path) -> PathBuf {
    match input.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.join(CACHE_DIRECTORY_NAME),
        _ => PathBuf::from(CACHE_DIRECTORY_NAME),
    }
}

/// Make sure `directory` exists.
///
/// With `regenerate` set, any existing directory and its contents are
/// removed first so that no stale stills or audit lines survive.
///
/// # Errors
///
/// Returns [`CreditScanError::IoError`] if the directory cannot be removed or
/// created.
pub fn prepare_cache_directory(directory: &Path, regenerate: bool) -> Result<(), CreditScanError> {
    if regenerate {
        match fs::remove_dir_all(directory) {
            Ok(()) => log::debug!("Removed cache directory {}", directory.display()),
            Err(error) if error.kind() == ErrorKind::NotFound => {}
            Err(error) => return Err(error.into()),
        }
    }
    fs::create_dir_all(directory)?;
    Ok(())
}

/// Remove `directory` and everything in it. A missing directory is not an
/// error.
///
/// # Errors
///
/// Returns [`CreditScanError::IoError`] if removal fails.
pub fn remove_cache_directory(directory: &Path) -> Result<(), CreditScanError> {
    match fs::remove_dir_all(directory) {
        Ok(()) => Ok(()),
        Err(error) if error.kind() == ErrorKind::NotFound => Ok(()),
        Err(error) => Err(error.into()),
    }
}

/// Extract one still per second of `input`, from `seek_seconds` to the end,
/// into `directory`.
///
/// # Errors
///
/// Returns [`CreditScanError::ToolLaunch`] or [`CreditScanError::ToolFailed`]
/// if `ffmpeg` cannot run.
pub fn extract_stills(
    ffmpeg: &str,
    input: &Path,
    directory: &Path,
    seek_seconds: u64,
) -> Result<(), CreditScanError> {
    log::info!(
        "Creating stills from {} starting at {seek_seconds}s",
        input.display()
    );

    let seek = seek_seconds.to_string();
    let pattern = directory.join(STILL_PATTERN);
    run_tool(
        ffmpeg,
        [
            OsStr::new("-hide_banner"),
            OsStr::new("-loglevel"),
            OsStr::new("error"),
            OsStr::new("-ss"),
            OsStr::new(&seek),
            OsStr::new("-i"),
            input.as_os_str(),
            OsStr::new("-vf"),
            OsStr::new("fps=1"),
            pattern.as_os_str(),
        ],
    )?;

    log::info!("Creating stills done");
    Ok(())
}
