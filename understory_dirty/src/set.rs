// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Insertion-ordered, deduplicated work queue.

use alloc::vec::Vec;
use core::hash::Hash;

use hashbrown::HashSet;

/// An insertion-ordered set of keys awaiting work.
///
/// Inserting a key that is already present is a no-op, and removing a key that
/// is absent is a no-op. The queue is a live list: callers peek at
/// [`first`](Self::first) or [`last`](Self::last), do their work (which may
/// insert further keys), and only then remove the key. This keeps re-entrant
/// insertion during a drain well defined without snapshotting.
///
/// # Example
///
/// ```
/// use understory_dirty::DirtyQueue;
///
/// let mut queue = DirtyQueue::<u32>::new();
/// assert!(queue.insert(1));
/// assert!(queue.insert(2));
/// assert!(!queue.insert(1));
///
/// assert_eq!(queue.first(), Some(1));
/// assert_eq!(queue.last(), Some(2));
/// assert_eq!(queue.len(), 2);
///
/// assert!(queue.remove(1));
/// assert!(!queue.remove(1));
/// assert_eq!(queue.iter().collect::<Vec<_>>(), vec![2]);
/// ```
#[derive(Debug, Clone)]
pub struct DirtyQueue<K>
where
    K: Copy + Eq + Hash,
{
    order: Vec<K>,
    members: HashSet<K>,
}

impl<K> Default for DirtyQueue<K>
where
    K: Copy + Eq + Hash,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K> DirtyQueue<K>
where
    K: Copy + Eq + Hash,
{
    /// Creates a new empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self {
            order: Vec::new(),
            members: HashSet::new(),
        }
    }

    /// Appends `key` unless it is already queued.
    ///
    /// Returns `true` if the key was newly inserted.
    pub fn insert(&mut self, key: K) -> bool {
        if self.members.insert(key) {
            self.order.push(key);
            true
        } else {
            false
        }
    }

    /// Removes `key` if present.
    ///
    /// Returns `true` if the key was queued.
    pub fn remove(&mut self, key: K) -> bool {
        if !self.members.remove(&key) {
            return false;
        }
        if let Some(pos) = self.order.iter().rposition(|k| *k == key) {
            self.order.remove(pos);
        }
        true
    }

    /// Returns `true` if `key` is queued.
    #[must_use]
    pub fn contains(&self, key: K) -> bool {
        self.members.contains(&key)
    }

    /// Returns the oldest queued key.
    #[must_use]
    pub fn first(&self) -> Option<K> {
        self.order.first().copied()
    }

    /// Returns the most recently queued key.
    #[must_use]
    pub fn last(&self) -> Option<K> {
        self.order.last().copied()
    }

    /// Removes and returns the most recently queued key.
    pub fn pop_last(&mut self) -> Option<K> {
        let key = self.order.pop()?;
        self.members.remove(&key);
        Some(key)
    }

    /// Returns the number of queued keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Returns `true` if nothing is queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Iterates queued keys in insertion order.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = K> + '_ {
        self.order.iter().copied()
    }

    /// Appends every key from `keys`, skipping those already queued.
    ///
    /// Returns the number of keys newly inserted.
    pub fn extend<I>(&mut self, keys: I) -> usize
    where
        I: IntoIterator<Item = K>,
    {
        keys.into_iter().filter(|k| self.insert(*k)).count()
    }

    /// Removes every key.
    pub fn clear(&mut self) {
        self.order.clear();
        self.members.clear();
    }
}
