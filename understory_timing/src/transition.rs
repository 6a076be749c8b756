// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Scalar transitions keyed by target.
//!
//! This module only does the bookkeeping: which targets are animating, from
//! where to where, and what value each should display at a given time. What a
//! target *is* (a working value, a zoom edge, an opacity) is up to the caller.
//! Easing curves are opaque function pointers; this crate ships only
//! [`linear`].

use alloc::vec::Vec;
use core::time::Duration;

/// An easing curve mapping linear progress in `[0, 1]` to eased progress.
pub type Easing = fn(f64) -> f64;

/// The identity easing curve.
#[must_use]
pub fn linear(t: f64) -> f64 {
    t
}

/// One scalar transition from `from` to `to` over `duration`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transition<T> {
    /// What the transition drives.
    pub target: T,
    /// Value at progress zero.
    pub from: f64,
    /// Value at progress one.
    pub to: f64,
    /// Clock reading when the transition started.
    pub start: Duration,
    /// Total length.
    pub duration: Duration,
    /// Easing curve applied to linear progress.
    pub easing: Easing,
}

impl<T> Transition<T> {
    /// Creates a linear transition.
    #[must_use]
    pub fn new(target: T, from: f64, to: f64, start: Duration, duration: Duration) -> Self {
        Self {
            target,
            from,
            to,
            start,
            duration,
            easing: linear,
        }
    }

    /// Replaces the easing curve.
    #[must_use]
    pub fn with_easing(mut self, easing: Easing) -> Self {
        self.easing = easing;
        self
    }

    /// Returns linear progress in `[0, 1]` at `now`.
    #[must_use]
    pub fn progress(&self, now: Duration) -> f64 {
        if self.duration.is_zero() {
            return 1.0;
        }
        let elapsed = now.saturating_sub(self.start).as_secs_f64();
        (elapsed / self.duration.as_secs_f64()).clamp(0.0, 1.0)
    }

    /// Returns the displayed value at `now`.
    #[must_use]
    pub fn value_at(&self, now: Duration) -> f64 {
        let p = self.progress(now);
        if p >= 1.0 {
            return self.to;
        }
        self.from + (self.to - self.from) * (self.easing)(p)
    }

    /// Returns `true` once the transition has reached its end.
    #[must_use]
    pub fn is_finished(&self, now: Duration) -> bool {
        self.progress(now) >= 1.0
    }
}

/// A value produced by [`TransitionSet::tick`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Sample<T> {
    /// The target that moved.
    pub target: T,
    /// The value to display.
    pub value: f64,
    /// `true` if this was the final sample; the transition has been removed.
    pub finished: bool,
}

/// The set of active transitions, at most one per target.
///
/// ```
/// use core::time::Duration;
/// use understory_timing::{Transition, TransitionSet};
///
/// let mut set = TransitionSet::new();
/// let ms = Duration::from_millis;
/// set.start(Transition::new("opacity", 0.0, 1.0, ms(0), ms(100)));
///
/// // Starting again on the same target replaces the running transition.
/// let replaced = set.start(Transition::new("opacity", 0.5, 0.0, ms(50), ms(100)));
/// assert_eq!(replaced.map(|t| t.to), Some(1.0));
/// assert_eq!(set.len(), 1);
///
/// let samples = set.tick(ms(150));
/// assert_eq!(samples[0].value, 0.0);
/// assert!(samples[0].finished);
/// assert!(set.is_empty());
/// ```
#[derive(Clone, Debug)]
pub struct TransitionSet<T> {
    active: Vec<Transition<T>>,
}

impl<T> Default for TransitionSet<T> {
    fn default() -> Self {
        Self { active: Vec::new() }
    }
}

impl<T: Copy + PartialEq> TransitionSet<T> {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts `transition`, replacing (and returning) any running transition
    /// on the same target.
    pub fn start(&mut self, transition: Transition<T>) -> Option<Transition<T>> {
        match self.active.iter_mut().find(|t| t.target == transition.target) {
            Some(slot) => Some(core::mem::replace(slot, transition)),
            None => {
                self.active.push(transition);
                None
            }
        }
    }

    /// Returns the running transition on `target`, if any.
    #[must_use]
    pub fn get(&self, target: T) -> Option<&Transition<T>> {
        self.active.iter().find(|t| t.target == target)
    }

    /// Stops the transition on `target` without applying its end value.
    pub fn cancel(&mut self, target: T) -> Option<Transition<T>> {
        let pos = self.active.iter().position(|t| t.target == target)?;
        Some(self.active.remove(pos))
    }

    /// Stops every transition whose target matches `pred`.
    ///
    /// Returns the number of transitions stopped.
    pub fn cancel_where(&mut self, mut pred: impl FnMut(&T) -> bool) -> usize {
        let before = self.active.len();
        self.active.retain(|t| !pred(&t.target));
        before - self.active.len()
    }

    /// Samples every transition at `now`, removing those that finished.
    ///
    /// Samples are returned in start order.
    pub fn tick(&mut self, now: Duration) -> Vec<Sample<T>> {
        let samples: Vec<_> = self
            .active
            .iter()
            .map(|t| Sample {
                target: t.target,
                value: t.value_at(now),
                finished: t.is_finished(now),
            })
            .collect();
        self.active.retain(|t| !t.is_finished(now));
        samples
    }

    /// Returns the number of running transitions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.active.len()
    }

    /// Returns `true` if nothing is animating.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }

    /// Iterates running transitions in start order.
    pub fn iter(&self) -> impl Iterator<Item = &Transition<T>> {
        self.active.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    #[test]
    fn zero_duration_finishes_immediately() {
        let t = Transition::new(0_u8, 1.0, 2.0, ms(5), Duration::ZERO);
        assert!(t.is_finished(ms(5)));
        assert_eq!(t.value_at(ms(5)), 2.0);
    }

    #[test]
    fn midpoint_is_interpolated() {
        let t = Transition::new(0_u8, 0.0, 10.0, ms(0), ms(100));
        assert!((t.value_at(ms(50)) - 5.0).abs() < 1e-9);
        assert!(!t.is_finished(ms(50)));
    }

    #[test]
    fn easing_hook_is_applied() {
        fn square(t: f64) -> f64 {
            t * t
        }
        let t = Transition::new(0_u8, 0.0, 10.0, ms(0), ms(100)).with_easing(square);
        assert!((t.value_at(ms(50)) - 2.5).abs() < 1e-9);
    }

    #[test]
    fn cancel_where_filters_targets() {
        let mut set = TransitionSet::new();
        set.start(Transition::new((1_u32, 0_u8), 0.0, 1.0, ms(0), ms(10)));
        set.start(Transition::new((1_u32, 1_u8), 0.0, 1.0, ms(0), ms(10)));
        set.start(Transition::new((2_u32, 0_u8), 0.0, 1.0, ms(0), ms(10)));
        assert_eq!(set.cancel_where(|(owner, _)| *owner == 1), 2);
        assert_eq!(set.len(), 1);
        assert!(set.cancel((2, 0)).is_some());
        assert!(set.cancel((2, 0)).is_none());
    }

    #[test]
    fn tick_keeps_unfinished() {
        let mut set = TransitionSet::new();
        set.start(Transition::new(1_u8, 0.0, 1.0, ms(0), ms(10)));
        set.start(Transition::new(2_u8, 0.0, 1.0, ms(0), ms(100)));
        let samples = set.tick(ms(20));
        assert_eq!(samples.len(), 2);
        assert!(samples[0].finished);
        assert!(!samples[1].finished);
        assert_eq!(set.len(), 1);
        assert!(set.get(2).is_some());
    }
}
