//! Per-frame result storage.
//!
//! [`FrameResultStore`] holds one slot per sampled second, pre-allocated
//! before classification starts. Slot `0` corresponds to the seek offset of
//! the source video.
//!
//! Each slot is owned by exactly one worker, so writes need no lock: slots are
//! atomics and a slot can only move out of its unwritten state once. Readers
//! (the locator) run between batches, after the batch barrier has published
//! every write of that batch.

use std::sync::atomic::{AtomicU8, Ordering};

const UNWRITTEN: u8 = 0;
const NOT_CREDITS: u8 = 1;
const CREDITS: u8 = 2;

/// Fixed-length, shared store of credits / not-credits flags.
#[derive(Debug)]
pub struct FrameResultStore {
    slots: Box<[AtomicU8]>,
}

impl FrameResultStore {
    /// Allocate a store with `len` unwritten slots.
    ///
    /// Unwritten slots read as not-credits.
    pub fn new(len: usize) -> Self {
        let slots = (0..len).map(|_| AtomicU8::new(UNWRITTEN)).collect();
        Self { slots }
    }

    /// Number of slots.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Returns `true` if the store has no slots.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Record the verdict for `index`.
    ///
    /// Returns `false` without modifying anything if the index is out of
    /// bounds or the slot was already written.
    pub fn record(&self, index: usize, is_credits: bool) -> bool {
        let Some(slot) = self.slots.get(index) else {
            return false;
        };
        let value = if is_credits { CREDITS } else { NOT_CREDITS };
        slot.compare_exchange(UNWRITTEN, value, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Read the flag at `index`. Unwritten and out-of-range slots read as
    /// not-credits.
    pub fn get(&self, index: usize) -> bool {
        self.slots
            .get(index)
            .is_some_and(|slot| slot.load(Ordering::Acquire) == CREDITS)
    }

    /// Returns `true` if `index` has been written.
    pub fn is_written(&self, index: usize) -> bool {
        self.slots
            .get(index)
            .is_some_and(|slot| slot.load(Ordering::Acquire) != UNWRITTEN)
    }

    /// Copy the flags of `[0, range_end)` into a plain vector.
    ///
    /// `range_end` is clamped to the store length.
    pub fn snapshot(&self, range_end: usize) -> Vec<bool> {
        let end = range_end.min(self.slots.len());
        (0..end).map(|index| self.get(index)).collect()
    }
}
