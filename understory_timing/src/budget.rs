// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Per-phase time budgets.

use core::time::Duration;

/// An adaptive per-phase time budget.
///
/// Under backlog the budget is kept tight so that a frame with a lot of queued
/// work still returns to the host quickly. Once a frame finishes with nothing
/// left to do, the budget relaxes: the next burst of work (for example a large
/// data assignment) may then use a longer slice before yielding. Any frame that
/// ends with remaining work tightens it again.
///
/// ```
/// use core::time::Duration;
/// use understory_timing::StepBudget;
///
/// let mut budget = StepBudget::new(Duration::from_millis(45), Duration::from_millis(200));
/// assert_eq!(budget.current(), Duration::from_millis(45));
///
/// budget.settle(true);
/// assert_eq!(budget.current(), Duration::from_millis(200));
///
/// budget.settle(false);
/// assert_eq!(budget.current(), Duration::from_millis(45));
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StepBudget {
    tight: Duration,
    relaxed: Duration,
    current: Duration,
}

impl StepBudget {
    /// Creates a budget that starts tight.
    ///
    /// If `relaxed` is shorter than `tight`, the two are swapped.
    #[must_use]
    pub fn new(tight: Duration, relaxed: Duration) -> Self {
        let (tight, relaxed) = if tight <= relaxed {
            (tight, relaxed)
        } else {
            (relaxed, tight)
        };
        Self {
            tight,
            relaxed,
            current: tight,
        }
    }

    /// Returns the budget currently in force.
    #[must_use]
    pub fn current(&self) -> Duration {
        self.current
    }

    /// Returns `true` if the relaxed budget is in force.
    #[must_use]
    pub fn is_relaxed(&self) -> bool {
        self.current == self.relaxed && self.relaxed != self.tight
    }

    /// Updates the budget at the end of a frame.
    ///
    /// `idle` is `true` when the frame left no pending work behind.
    pub fn settle(&mut self, idle: bool) {
        self.current = if idle { self.relaxed } else { self.tight };
    }

    /// Starts measuring a slice of work at `now` against the current budget.
    #[must_use]
    pub fn deadline(&self, now: Duration) -> Deadline {
        Deadline::new(now, self.current)
    }
}

/// A point in time after which a slice of cooperative work should yield.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Deadline {
    start: Duration,
    budget: Duration,
}

impl Deadline {
    /// Creates a deadline `budget` after `start`.
    #[must_use]
    pub const fn new(start: Duration, budget: Duration) -> Self {
        Self { start, budget }
    }

    /// Returns when the measured slice started.
    #[must_use]
    pub const fn start(&self) -> Duration {
        self.start
    }

    /// Returns the time spent since the slice started.
    #[must_use]
    pub fn elapsed(&self, now: Duration) -> Duration {
        now.saturating_sub(self.start)
    }

    /// Returns `true` once strictly more than the budget has elapsed.
    #[must_use]
    pub fn is_exceeded(&self, now: Duration) -> bool {
        self.elapsed(now) > self.budget
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn swapped_bounds_are_normalized() {
        let b = StepBudget::new(Duration::from_millis(200), Duration::from_millis(45));
        assert_eq!(b.current(), Duration::from_millis(45));
        assert!(!b.is_relaxed());
    }

    #[test]
    fn deadline_is_strict() {
        let d = Deadline::new(Duration::from_millis(10), Duration::from_millis(5));
        assert!(!d.is_exceeded(Duration::from_millis(15)));
        assert!(d.is_exceeded(Duration::from_millis(16)));
        assert_eq!(d.elapsed(Duration::from_millis(4)), Duration::ZERO);
    }
}
