//! Shared fixtures: scripted classifiers and synthetic frame directories.

#![allow(dead_code)]

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

use creditscan::{ClassificationScore, ClassifierError, FrameClassifier};

/// Write empty `NNN.jpeg` files for every number in `numbers`.
pub fn write_frames(directory: &Path, numbers: impl IntoIterator<Item = u64>) {
    for number in numbers {
        fs::write(directory.join(format!("{number:03}.jpeg")), b"").expect("Failed to write frame");
    }
}

pub fn frame_number(path: &Path) -> u64 {
    path.file_stem()
        .and_then(|stem| stem.to_str())
        .and_then(|stem| stem.parse().ok())
        .expect("Frame path without numeric stem")
}

pub fn score(credits: f64) -> ClassificationScore {
    ClassificationScore {
        evaluation_time: 0.25,
        credits_probability: credits,
        scene_probability: 1.0 - credits,
    }
}

/// Classifier whose answer depends only on the frame number.
pub struct ScriptedClassifier {
    credits_from: Option<u64>,
    failing: HashSet<u64>,
    delay: Duration,
    batch_size: usize,
    first_frame: u64,
    pub calls: AtomicUsize,
    in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
    completed: AtomicUsize,
    pub barrier_violations: AtomicUsize,
    pub seen: Mutex<Vec<PathBuf>>,
}

impl ScriptedClassifier {
    /// Frames numbered `credits_from` and above score 0.95, others 0.05.
    pub fn new(credits_from: Option<u64>) -> Self {
        Self {
            credits_from,
            failing: HashSet::new(),
            delay: Duration::ZERO,
            batch_size: usize::MAX,
            first_frame: 1,
            calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            completed: AtomicUsize::new(0),
            barrier_violations: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(mut self, numbers: impl IntoIterator<Item = u64>) -> Self {
        self.failing.extend(numbers);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Check that a frame only starts once every earlier batch finished.
    /// Assumes contiguous frame numbers starting at `first_frame`.
    pub fn checking_barrier(mut self, batch_size: usize, first_frame: u64) -> Self {
        self.batch_size = batch_size;
        self.first_frame = first_frame;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl FrameClassifier for ScriptedClassifier {
    fn classify(&self, frame: &Path) -> Result<ClassificationScore, ClassifierError> {
        let number = frame_number(frame);
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().unwrap().push(frame.to_path_buf());

        if self.batch_size != usize::MAX {
            let position = (number - self.first_frame) as usize;
            let batch_start = position / self.batch_size * self.batch_size;
            if self.completed.load(Ordering::SeqCst) < batch_start {
                self.barrier_violations.fetch_add(1, Ordering::SeqCst);
            }
        }

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        if !self.delay.is_zero() {
            thread::sleep(self.delay);
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.completed.fetch_add(1, Ordering::SeqCst);

        if self.failing.contains(&number) {
            return Err(ClassifierError::MalformedOutput(format!(
                "no score for frame {number}"
            )));
        }

        let is_credits = self.credits_from.is_some_and(|from| number >= from);
        Ok(score(if is_credits { 0.95 } else { 0.05 }))
    }
}
