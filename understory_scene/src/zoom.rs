// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Zoom windows over a data-bound node's item collection.
//!
//! A window is a pair of fractions of the collection (`0.0..1.0` is
//! everything). [`clamp_window`] enforces the zoom limits by moving the edge
//! the caller is *not* dragging; [`index_window`] turns fractions into item
//! indices.

use crate::ConfigError;

/// A zoom window as fractions of the item collection.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ZoomRange {
    /// Start fraction.
    pub start: f64,
    /// End fraction.
    pub end: f64,
}

impl ZoomRange {
    /// The whole collection.
    pub const FULL: Self = Self {
        start: 0.0,
        end: 1.0,
    };

    /// Creates a range.
    #[must_use]
    pub const fn new(start: f64, end: f64) -> Self {
        Self { start, end }
    }

    /// Checks that both edges are finite and ordered.
    pub fn validate(self) -> Result<Self, ConfigError> {
        if self.start.is_finite() && self.end.is_finite() && self.start <= self.end {
            Ok(self)
        } else {
            Err(ConfigError::InvalidZoomRange {
                start: self.start,
                end: self.end,
            })
        }
    }

    /// `1 / (end - start)`; infinite for an empty window.
    #[must_use]
    pub fn factor(self) -> f64 {
        1.0 / (self.end - self.start)
    }
}

impl Default for ZoomRange {
    fn default() -> Self {
        Self::FULL
    }
}

/// Which edge the caller is moving; the other edge absorbs clamping.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ZoomPriority {
    /// Keep `start`, adjust `end`.
    Start,
    /// Keep `end`, adjust `start`.
    #[default]
    End,
}

/// Limits applied by [`clamp_window`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ZoomLimits {
    /// Largest allowed `1 / (end - start)`.
    pub max_zoom_factor: f64,
    /// At least this many items stay visible. `0` disables the check.
    pub min_zoom_count: usize,
    /// At most this many items are visible. `0` disables the check.
    pub max_zoom_count: usize,
    /// How far the window may extend past either end of the collection.
    pub max_zoom_declination: f64,
}

impl ZoomLimits {
    /// Default limits: factor 100, at least one item, no upper count, no
    /// overscroll.
    pub const DEFAULT: Self = Self {
        max_zoom_factor: 100.0,
        min_zoom_count: 1,
        max_zoom_count: 0,
        max_zoom_declination: 0.0,
    };
}

impl Default for ZoomLimits {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Options for [`Scene::zoom`](crate::Scene::zoom).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ZoomOptions {
    /// Which edge is being dragged.
    pub priority: ZoomPriority,
    /// Suppress the range-changed event for the resulting data-range pass.
    pub skip_range_event: bool,
    /// Apply immediately even if the component animates range changes.
    pub instantly: bool,
}

/// Clamps `requested` against `limits`.
///
/// `current` is the window before the request; it decides whether a
/// request that pins one end of the collection flips the priority.
/// `item_count` turns the count limits into factor limits.
///
/// ```
/// use understory_scene::{ZoomLimits, ZoomPriority, ZoomRange, clamp_window};
///
/// let limits = ZoomLimits { max_zoom_factor: 10.0, ..ZoomLimits::DEFAULT };
/// let w = clamp_window(ZoomRange::new(0.0, 0.05), ZoomPriority::End, &limits, ZoomRange::FULL, 100);
/// assert!(w.end - w.start >= 0.1 - 1e-9);
/// assert!(w.start >= 0.0 && w.end <= 1.0);
/// ```
#[must_use]
pub fn clamp_window(
    requested: ZoomRange,
    priority: ZoomPriority,
    limits: &ZoomLimits,
    current: ZoomRange,
    item_count: usize,
) -> ZoomRange {
    let ZoomRange { mut start, mut end } = requested;
    let mut priority = priority;

    let count = item_count as f64;
    let mut max_factor = limits.max_zoom_factor.max(1.0);
    if item_count > 0 && limits.min_zoom_count > 0 {
        let by_count = count / limits.min_zoom_count as f64;
        max_factor = max_factor.min(by_count.max(1.0));
    }
    let min_factor = if item_count > 0 && limits.max_zoom_count > 0 {
        let by_count = count / limits.max_zoom_count as f64;
        by_count.min(max_factor)
    } else {
        0.0
    };
    let declination = limits.max_zoom_declination.max(0.0);

    if start == end {
        start -= 0.5 / max_factor;
        end += 0.5 / max_factor;
    }
    if priority == ZoomPriority::End && end >= 1.0 && start != 0.0 && start < current.start {
        priority = ZoomPriority::Start;
    }
    if priority == ZoomPriority::Start && start <= 0.0 && end > current.end {
        priority = ZoomPriority::End;
    }

    let factor = |s: f64, e: f64| 1.0 / (e - s);
    match priority {
        ZoomPriority::Start => {
            if min_factor > 0.0 && factor(start, end) < min_factor {
                end = start + 1.0 / min_factor;
            }
            if factor(start, end) > max_factor {
                end = start + 1.0 / max_factor;
            }
            if end > 1.0 + declination && end - start < 1.0 / max_factor {
                start = end - 1.0 / max_factor;
            }
        }
        ZoomPriority::End => {
            if min_factor > 0.0 && factor(start, end) < min_factor {
                start = end - 1.0 / min_factor;
            }
            if factor(start, end) > max_factor {
                start = end - 1.0 / max_factor;
            }
            if start < -declination && end - start < 1.0 / max_factor {
                end = start + 1.0 / max_factor;
            }
        }
    }

    if start < -declination {
        start = -declination;
    }
    if factor(start, end) > max_factor {
        end = start + 1.0 / max_factor;
    }
    if end > 1.0 + declination {
        end = 1.0 + declination;
    }
    if factor(start, end) > max_factor {
        start = end - 1.0 / max_factor;
    }
    ZoomRange { start, end }
}

/// Converts a window to `(start_index, end_index)`: floor and ceil, clamped
/// to `[0, item_count]`.
#[must_use]
pub fn index_window(range: ZoomRange, item_count: usize) -> (usize, usize) {
    let count = item_count as f64;
    let clamp = |v: f64| {
        #[expect(
            clippy::cast_possible_truncation,
            reason = "value is clamped to [0, item_count] first"
        )]
        let i = v.clamp(0.0, count) as usize;
        i
    };
    let start = clamp((range.start * count).floor());
    let end = clamp((range.end * count).ceil());
    (start, end.max(start))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limits(max_zoom_factor: f64) -> ZoomLimits {
        ZoomLimits {
            max_zoom_factor,
            ..ZoomLimits::DEFAULT
        }
    }

    #[test]
    fn narrow_window_is_widened_inside_bounds() {
        let w = clamp_window(
            ZoomRange::new(0.0, 0.05),
            ZoomPriority::End,
            &limits(10.0),
            ZoomRange::FULL,
            100,
        );
        assert!(w.end >= w.start + 0.1 - 1e-9, "window too narrow: {w:?}");
        assert!(w.start >= 0.0, "start escaped: {w:?}");
        let (s, e) = index_window(w, 100);
        assert!(s <= e && e <= 100);
    }

    #[test]
    fn start_priority_moves_end() {
        let w = clamp_window(
            ZoomRange::new(0.4, 0.41),
            ZoomPriority::Start,
            &limits(10.0),
            ZoomRange::FULL,
            100,
        );
        assert!((w.start - 0.4).abs() < 1e-9, "start moved: {w:?}");
        assert!((w.end - 0.5).abs() < 1e-9, "{w:?}");
    }

    #[test]
    fn end_priority_moves_start() {
        let w = clamp_window(
            ZoomRange::new(0.59, 0.6),
            ZoomPriority::End,
            &limits(10.0),
            ZoomRange::FULL,
            100,
        );
        assert!((w.start - 0.5).abs() < 1e-9, "{w:?}");
        assert!((w.end - 0.6).abs() < 1e-9, "end moved: {w:?}");
    }

    #[test]
    fn min_zoom_count_limits_factor() {
        let l = ZoomLimits {
            max_zoom_factor: 100.0,
            min_zoom_count: 5,
            ..ZoomLimits::DEFAULT
        };
        let w = clamp_window(ZoomRange::new(0.5, 0.5), ZoomPriority::End, &l, ZoomRange::FULL, 20);
        assert!((w.end - w.start - 0.25).abs() < 1e-9, "{w:?}");
    }

    #[test]
    fn max_zoom_count_limits_width() {
        let l = ZoomLimits {
            max_zoom_count: 10,
            ..ZoomLimits::DEFAULT
        };
        let w = clamp_window(ZoomRange::FULL, ZoomPriority::End, &l, ZoomRange::FULL, 100);
        assert!((w.end - w.start - 0.1).abs() < 1e-9, "{w:?}");
        assert_eq!(w.end, 1.0);
    }

    #[test]
    fn declination_allows_overscroll() {
        let l = ZoomLimits {
            max_zoom_declination: 0.2,
            ..ZoomLimits::DEFAULT
        };
        let w = clamp_window(ZoomRange::new(-0.5, 0.5), ZoomPriority::End, &l, ZoomRange::FULL, 100);
        assert_eq!(w.start, -0.2);
        assert_eq!(w.end, 0.5);
    }

    #[test]
    fn invalid_ranges_are_rejected() {
        assert!(ZoomRange::new(f64::NAN, 1.0).validate().is_err());
        assert!(ZoomRange::new(0.6, 0.5).validate().is_err());
        assert!(ZoomRange::new(0.5, 0.5).validate().is_ok());
    }

    #[test]
    fn index_window_floors_and_ceils() {
        assert_eq!(index_window(ZoomRange::new(0.105, 0.201), 100), (10, 21));
        assert_eq!(index_window(ZoomRange::new(-0.2, 1.3), 100), (0, 100));
        assert_eq!(index_window(ZoomRange::FULL, 0), (0, 0));
    }
}
