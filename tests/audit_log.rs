//! Audit log writer and parser tests.

mod common;

use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::thread;

use common::score;
use creditscan::audit::{self, AuditLog, AuditRecord, format_line};
use creditscan::frames::MAX_FRAME_SLOTS;
use creditscan::{ClassifierAdapter, CommandClassifier, Frame, FrameVerdict};

fn frame(name: &str) -> Frame {
    Frame::from_path(Path::new(name)).expect("Not a frame name")
}

// ── Line format ────────────────────────────────────────────────────

#[test]
fn classified_line_carries_flag_and_scores() {
    let verdict = FrameVerdict::Classified {
        score: score(0.95),
        is_credits: true,
    };
    let line = format_line("042.jpeg", &verdict);
    assert!(line.starts_with("042.jpeg | 1 | {"), "unexpected line {line}");
    assert!(line.contains("\"credits\":0.95"));
    assert!(line.contains("\"evaluationTime\":0.25"));
}

#[test]
fn failed_line_is_marked() {
    let verdict = FrameVerdict::Failed {
        reason: "classifier timed out after 2s".to_string(),
    };
    assert_eq!(
        format_line("007.jpeg", &verdict),
        "007.jpeg | 0 | FAILED: classifier timed out after 2s"
    );
}

#[test]
fn multi_line_failure_reason_stays_on_one_line() {
    let verdict = FrameVerdict::Failed {
        reason: "classifier exited with exit status: 1: Traceback (most recent call last):\r\n  File \"label_image.py\", line 12\n\nValueError: bad\n".to_string(),
    };
    let line = format_line("007.jpeg", &verdict);
    assert!(!line.contains('\n') && !line.contains('\r'), "unexpected line {line:?}");
    assert_eq!(
        line,
        "007.jpeg | 0 | FAILED: classifier exited with exit status: 1: Traceback (most recent call last): File \"label_image.py\", line 12 ValueError: bad"
    );
}

#[cfg(unix)]
#[test]
fn traceback_from_classifier_is_one_audit_record() {
    let temporary_directory = tempfile::tempdir().expect("Failed to create temp dir");
    let path = temporary_directory.path().join("results.txt");
    let classifier = CommandClassifier::new("sh").args([
        "-c",
        "printf 'Traceback (most recent call last):\\n  File x\\nValueError: bad\\n' >&2; exit 1",
        "{frame}",
    ]);
    let adapter = ClassifierAdapter::new(Arc::new(classifier), 0.9, AuditLog::open(&path));

    assert!(adapter.classify(&frame("007.jpeg")).is_failure());

    let contents = fs::read_to_string(&path).unwrap();
    assert_eq!(contents.lines().count(), 1);
    let records = audit::read_audit_log(&path).unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].file_name, "007.jpeg");
    assert!(records[0].score.is_none());
}

#[test]
fn parse_reads_back_formatted_lines() {
    let verdict = FrameVerdict::Classified {
        score: score(0.2),
        is_credits: false,
    };
    let record = AuditRecord::parse(&format_line("003.jpeg", &verdict)).expect("Unparsable");
    assert_eq!(record.file_name, "003.jpeg");
    assert!(!record.is_credits);
    assert_eq!(record.score, Some(score(0.2)));
    assert_eq!(record.frame().map(|frame| frame.number), Some(3));
}

#[test]
fn parse_rejects_malformed_lines() {
    assert!(AuditRecord::parse("").is_none());
    assert!(AuditRecord::parse("001.jpeg-1").is_none());
    assert!(AuditRecord::parse("001.jpeg | yes | {}").is_none());
    assert!(AuditRecord::parse("001.jpeg | 1 | not json").is_none());
    assert!(AuditRecord::parse(" | 1 | FAILED: x").is_none());
}

// ── Writer ─────────────────────────────────────────────────────────

#[test]
fn concurrent_appends_never_interleave() {
    let temporary_directory = tempfile::tempdir().expect("Failed to create temp dir");
    let path = temporary_directory.path().join("results.txt");
    let log = Arc::new(AuditLog::open(&path));

    let handles: Vec<_> = (0..8)
        .map(|worker| {
            let log = Arc::clone(&log);
            thread::spawn(move || {
                for index in 0..50 {
                    let number = worker * 50 + index + 1;
                    let verdict = FrameVerdict::Classified {
                        score: score(0.5),
                        is_credits: number % 2 == 0,
                    };
                    log.append(&frame(&format!("{number:03}.jpeg")), &verdict);
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().expect("Writer panicked");
    }

    let records = audit::read_audit_log(&path).expect("Failed to read log");
    assert_eq!(records.len(), 400);
    let contents = fs::read_to_string(&path).unwrap();
    for line in contents.lines() {
        assert!(AuditRecord::parse(line).is_some(), "corrupted line {line:?}");
    }
}

#[test]
fn appends_to_an_existing_log() {
    let temporary_directory = tempfile::tempdir().expect("Failed to create temp dir");
    let path = temporary_directory.path().join("results.txt");
    fs::write(&path, "001.jpeg | 1 | FAILED: earlier run\n").unwrap();

    let log = AuditLog::open(&path);
    log.append(
        &frame("002.jpeg"),
        &FrameVerdict::Failed {
            reason: "boom".to_string(),
        },
    );

    let records = audit::read_audit_log(&path).unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[1].file_name, "002.jpeg");
}

#[test]
fn unopenable_log_is_silently_disabled() {
    let temporary_directory = tempfile::tempdir().expect("Failed to create temp dir");
    let path = temporary_directory.path().join("missing").join("results.txt");

    let log = AuditLog::open(&path);
    log.append(
        &frame("001.jpeg"),
        &FrameVerdict::Failed {
            reason: "boom".to_string(),
        },
    );

    assert_eq!(log.path(), Some(path.as_path()));
    assert!(!path.exists());
    assert!(AuditLog::disabled().path().is_none());
}

// ── Replay ─────────────────────────────────────────────────────────

#[test]
fn flags_are_rebuilt_by_frame_number() {
    let temporary_directory = tempfile::tempdir().expect("Failed to create temp dir");
    let path = temporary_directory.path().join("results.txt");
    // Out of order, as concurrent workers write them, with a gap at 4.
    let contents = [
        "003.jpeg | 1 | {\"evaluationTime\":0.1,\"credits\":0.95,\"scene\":0.05}",
        "001.jpeg | 0 | {\"evaluationTime\":0.1,\"credits\":0.05,\"scene\":0.95}",
        "garbage",
        "002.jpeg | 0 | FAILED: classifier exited with exit status: 1: oops",
        "005.jpeg | 1 | {\"evaluationTime\":0.1,\"credits\":0.91,\"scene\":0.09}",
    ]
    .join("\n");
    fs::write(&path, contents).unwrap();

    let records = audit::read_audit_log(&path).unwrap();
    assert_eq!(records.len(), 4);
    assert_eq!(
        audit::flags_from_records(&records, 1),
        vec![false, false, true, false, true]
    );
}

#[test]
fn stray_frame_numbers_do_not_size_the_flags() {
    let temporary_directory = tempfile::tempdir().expect("Failed to create temp dir");
    let path = temporary_directory.path().join("results.txt");
    fs::write(
        &path,
        "001.jpeg | 1 | FAILED: x\n99999999999999999.jpeg | 0 | FAILED: y\n002.jpeg | 0 | FAILED: z\n",
    )
    .unwrap();

    let records = audit::read_audit_log(&path).unwrap();
    assert_eq!(records.len(), 3);
    assert_eq!(audit::flags_from_records(&records, 1), vec![true, false]);
}

#[test]
fn frames_up_to_the_slot_limit_are_kept() {
    let record = |number: usize| AuditRecord {
        file_name: format!("{number}.jpeg"),
        is_credits: true,
        score: None,
    };
    let records = vec![record(MAX_FRAME_SLOTS), record(MAX_FRAME_SLOTS + 1)];

    let flags = audit::flags_from_records(&records, 1);
    assert_eq!(flags.len(), MAX_FRAME_SLOTS);
    assert_eq!(flags.last(), Some(&true));
}

#[test]
fn missing_log_is_an_error() {
    let temporary_directory = tempfile::tempdir().expect("Failed to create temp dir");
    assert!(audit::read_audit_log(temporary_directory.path().join("nope.txt")).is_err());
}
