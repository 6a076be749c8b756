// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Root-partitioned set of dirty queues.

use alloc::vec::Vec;
use core::hash::Hash;

use hashbrown::HashMap;

use crate::queue::{QUEUE_COUNT, Queue, QueueSet};
use crate::set::DirtyQueue;

/// The queues belonging to one root (or to the "no root" bucket).
#[derive(Debug, Clone)]
struct Partition<K>
where
    K: Copy + Eq + Hash,
{
    queues: [DirtyQueue<K>; QUEUE_COUNT],
}

impl<K> Partition<K>
where
    K: Copy + Eq + Hash,
{
    fn new() -> Self {
        Self {
            queues: core::array::from_fn(|_| DirtyQueue::new()),
        }
    }

    fn queue(&self, queue: Queue) -> &DirtyQueue<K> {
        &self.queues[queue.index()]
    }

    fn queue_mut(&mut self, queue: Queue) -> &mut DirtyQueue<K> {
        &mut self.queues[queue.index()]
    }

    fn is_empty(&self) -> bool {
        self.queues.iter().all(DirtyQueue::is_empty)
    }
}

/// A passive registry of deduplicated work queues, partitioned by root.
///
/// Several independent scene graphs can share one registry; each is identified
/// by a root id `R`, and entities that are not (yet) attached to any root live
/// in the "no root" partition (`None`). Every queue in every partition is a
/// [`DirtyQueue`]: an entity appears at most once, and removal is idempotent.
///
/// The registry never drains itself and never schedules work; a scheduler
/// peeks at and removes entries as it validates them.
///
/// # Type Parameters
///
/// - `K`: entity key, typically a generational node id.
/// - `R`: root identifier.
///
/// # Example
///
/// ```
/// use understory_dirty::{DirtyRegistry, Queue};
///
/// let mut registry = DirtyRegistry::<u32, u8>::new();
///
/// registry.mark(Queue::LAYOUT, 10, Some(1));
/// registry.mark(Queue::LAYOUT, 10, Some(1));
/// registry.mark(Queue::PAINT, 11, None);
///
/// assert_eq!(registry.len(Queue::LAYOUT, Some(1)), 1);
/// assert!(registry.contains(Queue::PAINT, 11, None));
///
/// // Clearing removes from the root partition and the "no root" partition.
/// registry.clear(Queue::PAINT, 11, Some(1));
/// assert!(!registry.contains(Queue::PAINT, 11, None));
///
/// // Clearing an absent entity is a no-op.
/// registry.clear(Queue::DATA, 99, None);
/// ```
#[derive(Debug, Clone)]
pub struct DirtyRegistry<K, R>
where
    K: Copy + Eq + Hash,
    R: Copy + Eq + Hash,
{
    partitions: Vec<(Option<R>, Partition<K>)>,
    index: HashMap<Option<R>, usize>,
    /// Incremented on each mutation.
    generation: u64,
}

impl<K, R> Default for DirtyRegistry<K, R>
where
    K: Copy + Eq + Hash,
    R: Copy + Eq + Hash,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, R> DirtyRegistry<K, R>
where
    K: Copy + Eq + Hash,
    R: Copy + Eq + Hash,
{
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            partitions: Vec::new(),
            index: HashMap::new(),
            generation: 0,
        }
    }

    /// Returns the current generation.
    ///
    /// The generation changes whenever a mark or removal actually modifies a
    /// queue, so observers can cheaply detect "nothing happened".
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    fn bump(&mut self) {
        self.generation = self.generation.wrapping_add(1);
    }

    fn partition(&self, root: Option<R>) -> Option<&Partition<K>> {
        self.index.get(&root).map(|&i| &self.partitions[i].1)
    }

    fn partition_mut(&mut self, root: Option<R>) -> Option<&mut Partition<K>> {
        let i = *self.index.get(&root)?;
        Some(&mut self.partitions[i].1)
    }

    fn partition_or_insert(&mut self, root: Option<R>) -> &mut Partition<K> {
        let i = match self.index.get(&root) {
            Some(&i) => i,
            None => {
                let i = self.partitions.len();
                self.partitions.push((root, Partition::new()));
                self.index.insert(root, i);
                i
            }
        };
        &mut self.partitions[i].1
    }

    /// Queues `key` in `queue` of the `root` partition.
    ///
    /// Returns `true` if the key was newly queued.
    pub fn mark(&mut self, queue: Queue, key: K, root: Option<R>) -> bool {
        let inserted = self.partition_or_insert(root).queue_mut(queue).insert(key);
        if inserted {
            self.bump();
        }
        inserted
    }

    /// Removes `key` from `queue` in the `root` partition and in the "no root"
    /// partition.
    ///
    /// Removing from both is cheaper than tracking which partition an entity
    /// was queued under before it was attached. Returns `true` if anything was
    /// removed.
    pub fn clear(&mut self, queue: Queue, key: K, root: Option<R>) -> bool {
        let mut removed = false;
        if let Some(p) = self.partition_mut(root) {
            removed |= p.queue_mut(queue).remove(key);
        }
        if root.is_some()
            && let Some(p) = self.partition_mut(None)
        {
            removed |= p.queue_mut(queue).remove(key);
        }
        if removed {
            self.bump();
        }
        removed
    }

    /// Removes `key` from every queue in every partition.
    ///
    /// Used when an entity is disposed. Returns the queues it was removed from.
    pub fn remove_everywhere(&mut self, key: K) -> QueueSet {
        let mut removed = QueueSet::EMPTY;
        for (_, p) in &mut self.partitions {
            for queue in Queue::ALL {
                if p.queue_mut(queue).remove(key) {
                    removed.insert(queue);
                }
            }
        }
        if !removed.is_empty() {
            self.bump();
        }
        removed
    }

    /// Moves every queue membership of `key` from the `from` partition to the
    /// `to` partition.
    ///
    /// Returns the set of queues that were moved.
    pub fn reassign(&mut self, key: K, from: Option<R>, to: Option<R>) -> QueueSet {
        if from == to {
            return QueueSet::EMPTY;
        }
        let mut moved = QueueSet::EMPTY;
        if let Some(p) = self.partition_mut(from) {
            for queue in Queue::ALL {
                if p.queue_mut(queue).remove(key) {
                    moved.insert(queue);
                }
            }
        }
        if moved.is_empty() {
            return moved;
        }
        let target = self.partition_or_insert(to);
        for queue in moved.iter() {
            target.queue_mut(queue).insert(key);
        }
        self.bump();
        moved
    }

    /// Returns the queues `key` is a member of in the `root` partition.
    #[must_use]
    pub fn memberships(&self, key: K, root: Option<R>) -> QueueSet {
        let mut set = QueueSet::EMPTY;
        if let Some(p) = self.partition(root) {
            for queue in Queue::ALL {
                if p.queue(queue).contains(key) {
                    set.insert(queue);
                }
            }
        }
        set
    }

    /// Returns `true` if `key` is queued in `queue` of the `root` partition.
    #[must_use]
    pub fn contains(&self, queue: Queue, key: K, root: Option<R>) -> bool {
        self.partition(root)
            .is_some_and(|p| p.queue(queue).contains(key))
    }

    /// Returns `true` if `key` is queued anywhere.
    #[must_use]
    pub fn contains_anywhere(&self, key: K) -> bool {
        self.partitions
            .iter()
            .any(|(_, p)| p.queues.iter().any(|q| q.contains(key)))
    }

    /// Returns the number of keys in `queue` of the `root` partition.
    #[must_use]
    pub fn len(&self, queue: Queue, root: Option<R>) -> usize {
        self.partition(root).map_or(0, |p| p.queue(queue).len())
    }

    /// Returns the number of keys in `queue` across all partitions.
    #[must_use]
    pub fn total_len(&self, queue: Queue) -> usize {
        self.partitions
            .iter()
            .map(|(_, p)| p.queue(queue).len())
            .sum()
    }

    /// Returns `true` if `queue` is empty in every partition.
    #[must_use]
    pub fn is_queue_empty(&self, queue: Queue) -> bool {
        self.partitions.iter().all(|(_, p)| p.queue(queue).is_empty())
    }

    /// Returns `true` if every queue in every partition is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.partitions.iter().all(|(_, p)| p.is_empty())
    }

    /// Returns the live partitions, in creation order.
    pub fn roots(&self) -> impl Iterator<Item = Option<R>> + '_ {
        self.partitions.iter().map(|(r, _)| *r)
    }

    /// Returns the partitions as an owned list, for drains that mutate the
    /// registry while walking roots.
    #[must_use]
    pub fn root_list(&self) -> Vec<Option<R>> {
        self.roots().collect()
    }

    /// Returns the oldest key in `queue` of the `root` partition.
    #[must_use]
    pub fn first(&self, queue: Queue, root: Option<R>) -> Option<K> {
        self.partition(root)?.queue(queue).first()
    }

    /// Returns the most recently queued key in `queue` of the `root` partition.
    #[must_use]
    pub fn last(&self, queue: Queue, root: Option<R>) -> Option<K> {
        self.partition(root)?.queue(queue).last()
    }

    /// Removes and returns the most recently queued key.
    pub fn pop_last(&mut self, queue: Queue, root: Option<R>) -> Option<K> {
        let key = self.partition_mut(root)?.queue_mut(queue).pop_last();
        if key.is_some() {
            self.bump();
        }
        key
    }

    /// Iterates the keys in `queue` of the `root` partition, oldest first.
    pub fn iter(&self, queue: Queue, root: Option<R>) -> impl Iterator<Item = K> + '_ {
        self.partition(root)
            .into_iter()
            .flat_map(move |p| p.queue(queue).iter())
    }

    /// Re-queues `keys` at the tail of `queue` in the `root` partition.
    ///
    /// Returns the number of keys newly queued.
    pub fn extend<I>(&mut self, queue: Queue, root: Option<R>, keys: I) -> usize
    where
        I: IntoIterator<Item = K>,
    {
        let added = self.partition_or_insert(root).queue_mut(queue).extend(keys);
        if added > 0 {
            self.bump();
        }
        added
    }

    /// Drops the `root` partition, along with any keys still queued there.
    ///
    /// Used once a root is disposed or attached under another root, so the
    /// partition list does not grow with dead roots. Returns `true` if the
    /// partition existed.
    pub fn remove_partition(&mut self, root: Option<R>) -> bool {
        let Some(i) = self.index.remove(&root) else {
            return false;
        };
        self.partitions.remove(i);
        for slot in self.index.values_mut() {
            if *slot > i {
                *slot -= 1;
            }
        }
        self.bump();
        true
    }

    /// Empties every queue in every partition.
    pub fn clear_all(&mut self) {
        for (_, p) in &mut self.partitions {
            for q in &mut p.queues {
                q.clear();
            }
        }
        self.bump();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    #[test]
    fn mark_twice_keeps_one_entry() {
        let mut r = DirtyRegistry::<u32, u8>::new();
        assert!(r.mark(Queue::DATA, 1, None));
        assert!(!r.mark(Queue::DATA, 1, None));
        assert_eq!(r.len(Queue::DATA, None), 1);
    }

    #[test]
    fn partitions_are_independent() {
        let mut r = DirtyRegistry::<u32, u8>::new();
        r.mark(Queue::LAYOUT, 1, Some(1));
        r.mark(Queue::LAYOUT, 1, Some(2));
        assert_eq!(r.len(Queue::LAYOUT, Some(1)), 1);
        assert_eq!(r.len(Queue::LAYOUT, Some(2)), 1);
        assert_eq!(r.total_len(Queue::LAYOUT), 2);
        assert_eq!(r.root_list(), vec![Some(1), Some(2)]);
    }

    #[test]
    fn clear_also_sweeps_no_root_partition() {
        let mut r = DirtyRegistry::<u32, u8>::new();
        r.mark(Queue::PAINT, 5, None);
        r.mark(Queue::PAINT, 5, Some(3));
        assert!(r.clear(Queue::PAINT, 5, Some(3)));
        assert!(!r.contains(Queue::PAINT, 5, None));
        assert!(!r.contains(Queue::PAINT, 5, Some(3)));
    }

    #[test]
    fn clear_absent_does_not_bump_generation() {
        let mut r = DirtyRegistry::<u32, u8>::new();
        let g = r.generation();
        assert!(!r.clear(Queue::PAINT, 5, Some(3)));
        assert_eq!(r.generation(), g);
    }

    #[test]
    fn remove_everywhere_reports_queues() {
        let mut r = DirtyRegistry::<u32, u8>::new();
        r.mark(Queue::DATA, 9, None);
        r.mark(Queue::LAYOUT, 9, Some(1));
        r.mark(Queue::PAINT, 9, Some(1));
        let removed = r.remove_everywhere(9);
        assert_eq!(removed.len(), 3);
        assert!(!r.contains_anywhere(9));
        assert!(r.is_empty());
    }

    #[test]
    fn reassign_moves_memberships() {
        let mut r = DirtyRegistry::<u32, u8>::new();
        r.mark(Queue::DATA, 4, None);
        r.mark(Queue::PAINT, 4, None);
        r.mark(Queue::PAINT, 2, Some(1));
        let moved = r.reassign(4, None, Some(1));
        assert!(moved.contains(Queue::DATA));
        assert!(moved.contains(Queue::PAINT));
        assert!(r.memberships(4, None).is_empty());
        assert_eq!(r.iter(Queue::PAINT, Some(1)).collect::<Vec<_>>(), vec![2, 4]);
    }

    #[test]
    fn removed_partition_is_forgotten() {
        let mut r = DirtyRegistry::<u32, u8>::new();
        r.mark(Queue::PAINT, 1, Some(1));
        r.mark(Queue::PAINT, 2, Some(2));
        r.mark(Queue::PAINT, 3, Some(3));
        assert!(r.remove_partition(Some(2)));
        assert!(!r.remove_partition(Some(2)));
        assert_eq!(r.root_list(), vec![Some(1), Some(3)]);
        assert!(!r.contains_anywhere(2));
        // Later partitions are still reachable after the shift.
        assert_eq!(r.first(Queue::PAINT, Some(3)), Some(3));
        r.mark(Queue::PAINT, 4, Some(3));
        assert_eq!(r.len(Queue::PAINT, Some(3)), 2);
    }

    #[test]
    fn pop_last_is_lifo() {
        let mut r = DirtyRegistry::<u32, u8>::new();
        r.extend(Queue::LAYOUT, None, [1, 2, 3]);
        assert_eq!(r.pop_last(Queue::LAYOUT, None), Some(3));
        assert_eq!(r.last(Queue::LAYOUT, None), Some(2));
        assert_eq!(r.first(Queue::LAYOUT, None), Some(1));
    }
}
