//! Error handling integration tests.
//!
//! These tests verify that meaningful errors are returned for various
//! failure conditions.

use std::path::PathBuf;

use creditscan::{ClassifierError, CreditScanError, parse_duration, probe_duration};

#[test]
fn duration_is_truncated_to_whole_seconds() {
    assert_eq!(parse_duration("5400.250000\n").unwrap(), 5400);
    assert_eq!(parse_duration("  95.999 ").unwrap(), 95);
    assert_eq!(parse_duration("42").unwrap(), 42);
}

#[test]
fn unparsable_duration_is_reported() {
    for output in ["N/A", "", "-3.5", "abc.1"] {
        match parse_duration(output) {
            Err(CreditScanError::DurationParse { output: raw }) => {
                assert_eq!(raw, output.trim())
            }
            other => panic!("Expected DurationParse for {output:?}, got: {other:?}"),
        }
    }

    let error_message = parse_duration("N/A\n").unwrap_err().to_string();
    assert!(
        error_message.contains("Could not parse media duration"),
        "Error message should mention the duration: {error_message}",
    );
}

#[test]
fn missing_probe_tool_is_a_launch_error() {
    let result = probe_duration(
        "creditscan-no-such-ffprobe",
        &PathBuf::from("movie.mp4"),
    );
    match result {
        Err(CreditScanError::ToolLaunch { tool, .. }) => {
            assert_eq!(tool, "creditscan-no-such-ffprobe")
        }
        other => panic!("Expected ToolLaunch, got: {other:?}"),
    }
}

#[test]
fn frame_directory_error_names_the_path() {
    let error = CreditScanError::FrameDirectory {
        path: PathBuf::from("/tmp/~cache"),
        reason: "No such file or directory".to_string(),
    };
    let error_message = error.to_string();
    assert!(error_message.contains("/tmp/~cache"));
    assert!(error_message.contains("No such file or directory"));
}

#[test]
fn io_errors_convert() {
    let io_error = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
    let error: CreditScanError = io_error.into();
    assert!(matches!(error, CreditScanError::IoError(_)));
    assert!(error.to_string().contains("denied"));
}

#[test]
fn classifier_errors_describe_the_failure() {
    let error = ClassifierError::TimedOut(std::time::Duration::from_secs(2));
    assert_eq!(error.to_string(), "classifier timed out after 2s");

    let error = ClassifierError::MalformedOutput("expected value".to_string());
    assert!(error.to_string().starts_with("malformed classifier output"));
}

#[test]
fn cancelled_message() {
    assert_eq!(CreditScanError::Cancelled.to_string(), "Operation cancelled");
}
