//! Invocation of the external FFmpeg command-line tools.
//!
//! Duration probing and still extraction are delegated to `ffprobe` and
//! `ffmpeg`. Both are prerequisites for a scan: any failure here is fatal and
//! surfaces as [`CreditScanError::ToolLaunch`] or
//! [`CreditScanError::ToolFailed`].

use std::ffi::OsStr;
use std::process::{Command, Output, Stdio};

use crate::error::CreditScanError;

/// Run `program` with `args` to completion and return its captured output.
///
/// # Errors
///
/// Returns [`CreditScanError::ToolLaunch`] if the program cannot be started
/// and [`CreditScanError::ToolFailed`] if it exits unsuccessfully.
pub(crate) fn run_tool<I, S>(program: &str, args: I) -> Result<Output, CreditScanError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let mut command = Command::new(program);
    command
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    log::debug!("Running {command:?}");

    let output = command.output().map_err(|error| CreditScanError::ToolLaunch {
        tool: program.to_string(),
        reason: error.to_string(),
    })?;

    if !output.status.success() {
        return Err(CreditScanError::ToolFailed {
            tool: program.to_string(),
            status: output.status,
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    Ok(output)
}
