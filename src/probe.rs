//! Media duration probing.
//!
//! Asks `ffprobe` for the container duration and truncates it to whole
//! seconds, which is the resolution of the frame sampling.

use std::ffi::OsStr;
use std::path::Path;

use crate::error::CreditScanError;
use crate::ffmpeg::run_tool;

/// Probe the duration of `path` in whole seconds using `ffprobe`.
///
/// # Errors
///
/// Returns [`CreditScanError::ToolLaunch`] or [`CreditScanError::ToolFailed`]
/// if `ffprobe` cannot run, and [`CreditScanError::DurationParse`] if its
/// output is not a duration.
pub fn probe_duration(ffprobe: &str, path: &Path) -> Result<u64, CreditScanError> {
    log::info!("Getting duration of {}", path.display());

    let output = run_tool(
        ffprobe,
        [
            OsStr::new("-v"),
            OsStr::new("error"),
            OsStr::new("-show_entries"),
            OsStr::new("format=duration"),
            OsStr::new("-of"),
            OsStr::new("default=noprint_wrappers=1:nokey=1"),
            path.as_os_str(),
        ],
    )?;

    let seconds = parse_duration(&String::from_utf8_lossy(&output.stdout))?;
    log::info!("Duration of {} is {seconds}s", path.display());
    Ok(seconds)
}

/// Parse `ffprobe` duration output (`"5400.250000\n"`) into whole seconds.
///
/// The fractional part is discarded, not rounded.
///
/// # Errors
///
/// Returns [`CreditScanError::DurationParse`] if the integral part is not a
/// non-negative integer.
pub fn parse_duration(output: &str) -> Result<u64, CreditScanError> {
    let trimmed = output.trim();
    let whole = trimmed.split('.').next().unwrap_or_default();
    whole
        .parse::<u64>()
        .map_err(|_| CreditScanError::DurationParse {
            output: trimmed.to_string(),
        })
}
