//! Frame discovery and result store tests.

mod common;

use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::thread;

use common::write_frames;
use creditscan::frames::MAX_FRAME_SLOTS;
use creditscan::{CreditScanError, Frame, FrameResultStore, list_frames};

// ── Frame names ────────────────────────────────────────────────────

#[test]
fn frame_numbers_come_from_the_stem() {
    let frame = Frame::from_path(Path::new("/tmp/~cache/042.jpeg")).expect("Not a frame");
    assert_eq!(frame.number, 42);
    assert_eq!(frame.file_name(), "042.jpeg");
    assert_eq!(frame.slot(1), Some(41));
    assert_eq!(frame.slot(0), Some(42));

    assert_eq!(Frame::from_path(Path::new("7.JPG")).map(|f| f.number), Some(7));
    assert_eq!(Frame::from_path(Path::new("1000.jpg")).map(|f| f.number), Some(1000));
}

#[test]
fn non_frame_names_are_rejected() {
    for name in [
        "results.txt",
        "001.png",
        "cover.jpeg",
        "-01.jpeg",
        "1e3.jpeg",
        ".jpeg",
        "001",
    ] {
        assert!(Frame::from_path(Path::new(name)).is_none(), "{name}");
    }
}

#[test]
fn frames_below_first_number_have_no_slot() {
    let frame = Frame::from_path(Path::new("000.jpeg")).unwrap();
    assert_eq!(frame.slot(1), None);
}

#[test]
fn bounded_slot_stops_at_the_slot_limit() {
    let last = Frame::from_path(Path::new(&format!("{MAX_FRAME_SLOTS}.jpeg"))).unwrap();
    assert_eq!(last.bounded_slot(1), Some(MAX_FRAME_SLOTS - 1));
    assert_eq!(last.bounded_slot(0), None);

    let stray = Frame::from_path(Path::new("99999999999999999.jpeg")).unwrap();
    assert!(stray.slot(1).is_some());
    assert_eq!(stray.bounded_slot(1), None);
}

// ── Directory listing ─────────────────────────────────────────────

#[test]
fn listing_is_sorted_by_frame_number() {
    let temporary_directory = tempfile::tempdir().expect("Failed to create temp dir");
    let directory = temporary_directory.path();
    write_frames(directory, [10, 2, 1000, 1, 99]);
    fs::write(directory.join("results.txt"), "").unwrap();
    fs::write(directory.join("poster.jpeg"), "").unwrap();
    fs::create_dir(directory.join("050.jpeg")).unwrap();

    let numbers: Vec<u64> = list_frames(directory)
        .expect("Failed to list")
        .iter()
        .map(|frame| frame.number)
        .collect();
    assert_eq!(numbers, vec![1, 2, 10, 99, 1000]);
}

#[test]
fn missing_directory_is_an_error() {
    let temporary_directory = tempfile::tempdir().expect("Failed to create temp dir");
    let missing = temporary_directory.path().join("gone");
    match list_frames(&missing) {
        Err(CreditScanError::FrameDirectory { path, .. }) => assert_eq!(path, missing),
        other => panic!("Expected FrameDirectory error, got: {other:?}"),
    }
}

// ── Result store ──────────────────────────────────────────────────

#[test]
fn unwritten_slots_read_as_not_credits() {
    let store = FrameResultStore::new(4);
    assert_eq!(store.len(), 4);
    assert!(!store.is_empty());
    assert_eq!(store.snapshot(4), vec![false; 4]);
    assert!(!store.is_written(0));
    assert!(FrameResultStore::new(0).is_empty());
}

#[test]
fn slots_are_written_once() {
    let store = FrameResultStore::new(3);
    assert!(store.record(1, true));
    assert!(!store.record(1, false));
    assert!(store.get(1));
    assert!(store.is_written(1));
    assert!(!store.record(3, true));
    assert!(!store.get(3));
}

#[test]
fn snapshot_is_clamped_to_the_store() {
    let store = FrameResultStore::new(3);
    store.record(2, true);
    assert_eq!(store.snapshot(2), vec![false, false]);
    assert_eq!(store.snapshot(10), vec![false, false, true]);
}

#[test]
fn concurrent_writers_own_distinct_slots() {
    let store = Arc::new(FrameResultStore::new(256));
    let handles: Vec<_> = (0..8)
        .map(|worker| {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                for index in (worker..256).step_by(8) {
                    assert!(store.record(index, index % 3 == 0));
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().expect("Writer panicked");
    }

    let flags = store.snapshot(256);
    for (index, flag) in flags.iter().enumerate() {
        assert_eq!(*flag, index % 3 == 0);
    }
}
