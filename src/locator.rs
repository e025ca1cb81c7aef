//! Sliding-window credit-start detection.
//!
//! Individual frame verdicts are noisy: a dark scene may look like credits,
//! and a credits card with a logo may not. [`CreditLocator`] smooths them by
//! averaging a window of consecutive verdicts and reporting the first window
//! start whose mean strictly exceeds a threshold.
//!
//! # Example
//!
//! ```
//! use creditscan::{CreditLocator, CreditStart};
//!
//! let flags = [false, false, true, true, true, true];
//! let locator = CreditLocator::new(4, 0.8);
//! assert_eq!(locator.locate(&flags), CreditStart::Found { offset: 2 });
//! ```

use serde::Serialize;

/// Outcome of a credit-start search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CreditStart {
    /// Credits start `offset` seconds after the seek offset.
    Found {
        /// Index into the frame result store.
        offset: usize,
    },
    /// No window crossed the threshold.
    NotFound,
}

impl CreditStart {
    /// The store offset, if one was found.
    pub fn offset(self) -> Option<usize> {
        match self {
            CreditStart::Found { offset } => Some(offset),
            CreditStart::NotFound => None,
        }
    }

    /// Returns `true` for [`CreditStart::Found`].
    pub fn is_found(self) -> bool {
        matches!(self, CreditStart::Found { .. })
    }
}

/// How the mean of a window that is clipped by the end of the range is
/// computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WindowDivisor {
    /// Divide by the number of samples actually in the window. A full window
    /// divides by the sample size.
    #[default]
    Available,
    /// Divide by one more than the number of samples in the window. This
    /// penalises every window, clipped or not, and reproduces older
    /// detections.
    AvailablePlusOne,
}

impl WindowDivisor {
    fn divide(self, sum: usize, available: usize) -> f64 {
        let divisor = match self {
            WindowDivisor::Available => available,
            WindowDivisor::AvailablePlusOne => available + 1,
        };
        sum as f64 / divisor as f64
    }
}

/// Finds the earliest sustained run of credits frames.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CreditLocator {
    sample_size: usize,
    mean_threshold: f64,
    divisor: WindowDivisor,
}

impl CreditLocator {
    /// Create a locator with the given window length and threshold.
    ///
    /// `sample_size` is clamped to a minimum of 1.
    pub fn new(sample_size: usize, mean_threshold: f64) -> Self {
        Self {
            sample_size: sample_size.max(1),
            mean_threshold,
            divisor: WindowDivisor::default(),
        }
    }

    /// Select the clipped-window divisor policy.
    #[must_use]
    pub fn with_divisor(mut self, divisor: WindowDivisor) -> Self {
        self.divisor = divisor;
        self
    }

    /// Window length.
    pub fn sample_size(&self) -> usize {
        self.sample_size
    }

    /// Threshold the windowed mean must strictly exceed.
    pub fn mean_threshold(&self) -> f64 {
        self.mean_threshold
    }

    /// Clipped-window divisor policy.
    pub fn divisor(&self) -> WindowDivisor {
        self.divisor
    }

    /// Scan `flags` and return the first start index whose windowed mean
    /// exceeds the threshold.
    ///
    /// `flags` is the known range `[0, range_end)`. Windows that run past its
    /// end are clipped, never padded.
    pub fn locate(&self, flags: &[bool]) -> CreditStart {
        self.scan(flags, true)
    }

    /// Scan a prefix that may still grow.
    ///
    /// While `complete` is `false`, only windows that fit entirely inside
    /// `flags` are considered, so a later scan over a longer prefix can never
    /// report an earlier or different index. Once `complete` is `true` this
    /// is identical to [`locate`](CreditLocator::locate).
    pub fn locate_settled(&self, flags: &[bool], complete: bool) -> CreditStart {
        self.scan(flags, complete)
    }

    fn scan(&self, flags: &[bool], allow_clipped: bool) -> CreditStart {
        let range_end = flags.len();
        let last_start = if allow_clipped {
            range_end
        } else {
            // Starts past this point only have clipped windows.
            match range_end.checked_sub(self.sample_size) {
                Some(last_full) => last_full + 1,
                None => return CreditStart::NotFound,
            }
        };

        // Running sum over the window [start, window_end).
        let mut sum = 0usize;
        let mut window_end = 0usize;
        for start in 0..last_start {
            let target_end = (start + self.sample_size).min(range_end);
            while window_end < target_end {
                sum += usize::from(flags[window_end]);
                window_end += 1;
            }

            let available = window_end - start;
            if self.divisor.divide(sum, available) > self.mean_threshold {
                return CreditStart::Found { offset: start };
            }

            sum -= usize::from(flags[start]);
        }

        CreditStart::NotFound
    }
}
