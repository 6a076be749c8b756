// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Resumable, time-sliced record parsing.
//!
//! A [`ParseCursor`] walks a record sequence one index at a time. Every
//! [`CHECK_EVERY`] records it compares the elapsed time against a
//! [`Deadline`]; when the deadline has passed and at least [`MIN_REMAINING`]
//! records remain, it yields. The cursor keeps its position, so the next slice
//! picks up where this one stopped.
//!
//! ```
//! use core::time::Duration;
//! use understory_scene::{ParseCursor, ParseStep};
//! use understory_timing::{Deadline, ManualClock};
//!
//! let clock = ManualClock::new();
//! let mut cursor = ParseCursor::new();
//! let deadline = Deadline::new(Duration::ZERO, Duration::from_millis(5));
//!
//! cursor.begin_slice();
//! let mut seen = 0;
//! loop {
//!     match cursor.step(3, &clock, &deadline) {
//!         ParseStep::Record(_) => seen += 1,
//!         ParseStep::Yield { .. } => unreachable!(),
//!         ParseStep::Done => break,
//!     }
//! }
//! assert_eq!(seen, 3);
//! assert_eq!(cursor.position(), 0);
//! ```

use understory_timing::{Clock, Deadline};

/// Records processed between two deadline checks.
pub const CHECK_EVERY: usize = 100;

/// A slice never yields when fewer records than this remain.
pub const MIN_REMAINING: usize = 10;

/// What the caller should do next.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ParseStep {
    /// Process the record at this index, then call `step` again.
    Record(usize),
    /// Stop for this frame. The cursor is parked on the next unprocessed
    /// record.
    Yield {
        /// Fraction of the sequence processed, `position / len`.
        progress: f64,
    },
    /// Every record has been processed; the cursor is back at zero.
    Done,
}

/// Resumable position in a record sequence.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ParseCursor {
    next: usize,
    since_check: usize,
    in_record: bool,
}

impl ParseCursor {
    /// A cursor at the start of the sequence.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            next: 0,
            since_check: 0,
            in_record: false,
        }
    }

    /// The index of the next record to process (`parse_from`).
    #[must_use]
    pub const fn position(&self) -> usize {
        self.next
    }

    /// Moves the cursor. Used when records are appended (resume after the
    /// already-parsed prefix) or evicted (shift back).
    pub fn seek(&mut self, position: usize) {
        self.next = position;
        self.in_record = false;
    }

    /// Starts a new time slice, resetting the check counter.
    pub fn begin_slice(&mut self) {
        self.since_check = 0;
        self.in_record = false;
    }

    /// Advances past the record handed out by the previous call (if any) and
    /// decides what comes next.
    pub fn step(&mut self, len: usize, clock: &dyn Clock, deadline: &Deadline) -> ParseStep {
        if self.in_record {
            self.in_record = false;
            let done = self.next;
            self.next += 1;
            self.since_check += 1;
            if self.since_check == CHECK_EVERY {
                self.since_check = 0;
                if done + MIN_REMAINING < len && deadline.is_exceeded(clock.now()) {
                    let progress = self.next as f64 / len as f64;
                    return ParseStep::Yield { progress };
                }
            }
        }
        if self.next >= len {
            self.next = 0;
            return ParseStep::Done;
        }
        self.in_record = true;
        ParseStep::Record(self.next)
    }
}
