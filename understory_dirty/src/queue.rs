// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Queue identifiers and queue sets.

use core::fmt;
use core::ops::{BitAnd, BitOr, BitOrAssign, Not};

/// Number of queues a [`DirtyRegistry`](crate::DirtyRegistry) maintains per partition.
pub const QUEUE_COUNT: usize = 7;

/// Identifies one named work queue (data, layout, paint, ...).
///
/// Queues are fixed: the set of kinds of pending work in a scene graph does not
/// grow at runtime, so each queue is a small index into a per-partition array.
///
/// ```
/// use understory_dirty::Queue;
///
/// assert_eq!(Queue::LAYOUT.name(), "layout");
/// assert!(Queue::DATA < Queue::PAINT);
/// ```
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Queue(u8);

impl Queue {
    /// Data-bound nodes whose raw data must be (re)parsed into data items.
    pub const DATA: Self = Self(0);
    /// Data-bound nodes whose already-parsed raw records changed in place.
    pub const RAW_DATA: Self = Self(1);
    /// Data-bound nodes whose per-item derived values must be recomputed.
    pub const DATA_ITEMS: Self = Self(2);
    /// Data-bound nodes whose selected index window must be resolved.
    pub const DATA_RANGE: Self = Self(3);
    /// Composite nodes whose children must be measured and arranged.
    pub const LAYOUT: Self = Self(4);
    /// Nodes whose transform must be resolved.
    pub const POSITION: Self = Self(5);
    /// Nodes that must be redrawn.
    pub const PAINT: Self = Self(6);

    /// Every queue, in the order a frame visits them.
    pub const ALL: [Self; QUEUE_COUNT] = [
        Self::DATA,
        Self::RAW_DATA,
        Self::DATA_ITEMS,
        Self::DATA_RANGE,
        Self::LAYOUT,
        Self::POSITION,
        Self::PAINT,
    ];

    /// Returns the index of this queue.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    /// Returns a stable lowercase name, used in diagnostics.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self.0 {
            0 => "data",
            1 => "raw_data",
            2 => "data_items",
            3 => "data_range",
            4 => "layout",
            5 => "position",
            _ => "paint",
        }
    }

    /// Converts this queue into a single-element [`QueueSet`].
    #[must_use]
    pub const fn into_set(self) -> QueueSet {
        QueueSet(1_u8 << self.0)
    }
}

impl fmt::Debug for Queue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Queue").field(&self.name()).finish()
    }
}

impl fmt::Display for Queue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A compact set of [`Queue`]s.
///
/// Used to report which queues an entity is a member of, and to remove an
/// entity from several queues at once.
///
/// ```
/// use understory_dirty::{Queue, QueueSet};
///
/// let set = Queue::LAYOUT.into_set() | Queue::PAINT.into_set();
/// assert!(set.contains(Queue::PAINT));
/// assert!(!set.contains(Queue::DATA));
/// assert_eq!(set.len(), 2);
/// ```
#[derive(Copy, Clone, PartialEq, Eq, Hash, Default)]
pub struct QueueSet(u8);

impl QueueSet {
    /// An empty set.
    pub const EMPTY: Self = Self(0);

    /// Every queue.
    pub const ALL: Self = Self((1 << QUEUE_COUNT) - 1);

    /// Data-lifecycle queues (data, raw data, data items, data range).
    pub const DATA_LIFECYCLE: Self = Self(0b0000_1111);

    /// Display queues (layout, position, paint).
    pub const DISPLAY: Self = Self(0b0111_0000);

    /// Returns `true` if this set contains no queues.
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Returns `true` if this set contains `queue`.
    #[must_use]
    pub const fn contains(self, queue: Queue) -> bool {
        (self.0 & (1_u8 << queue.0)) != 0
    }

    /// Inserts a queue into the set.
    pub fn insert(&mut self, queue: Queue) {
        self.0 |= 1_u8 << queue.0;
    }

    /// Removes a queue from the set.
    pub fn remove(&mut self, queue: Queue) {
        self.0 &= !(1_u8 << queue.0);
    }

    /// Returns the number of queues in the set.
    #[must_use]
    pub const fn len(self) -> u32 {
        self.0.count_ones()
    }

    /// Returns an iterator over the queues in this set, in frame order.
    pub fn iter(self) -> impl Iterator<Item = Queue> {
        Queue::ALL.into_iter().filter(move |q| self.contains(*q))
    }
}

impl fmt::Debug for QueueSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl BitOr for QueueSet {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self::Output {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for QueueSet {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for QueueSet {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self::Output {
        Self(self.0 & rhs.0)
    }
}

impl Not for QueueSet {
    type Output = Self;

    fn not(self) -> Self::Output {
        Self(!self.0 & Self::ALL.0)
    }
}

impl From<Queue> for QueueSet {
    fn from(queue: Queue) -> Self {
        queue.into_set()
    }
}
