// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Identifiers and the generational arena behind them.

/// Identifier for a node in a [`Scene`](crate::Scene).
///
/// A slot index plus a generation counter. Freed slots are reused with a bumped
/// generation, so a `NodeId` that outlives its node never aliases a newer one.
/// Use [`Scene::is_alive`](crate::Scene::is_alive) to test liveness.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct NodeId(u32, u32);

/// Identifier for a [`DataItem`](crate::DataItem) in a [`Scene`](crate::Scene).
///
/// Same generational semantics as [`NodeId`].
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct DataItemId(u32, u32);

/// Identifier of a root partition.
///
/// Every node that is (transitively) attached under the same root shares its
/// `RootId`; queue entries are partitioned by it.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct RootId(pub(crate) u32);

impl RootId {
    /// Returns the raw partition number.
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }
}

pub(crate) trait ArenaKey: Copy {
    fn from_parts(idx: u32, generation: u32) -> Self;
    fn idx(self) -> usize;
    fn generation(self) -> u32;
}

macro_rules! arena_key {
    ($name:ident) => {
        impl ArenaKey for $name {
            fn from_parts(idx: u32, generation: u32) -> Self {
                Self(idx, generation)
            }

            fn idx(self) -> usize {
                self.0 as usize
            }

            fn generation(self) -> u32 {
                self.1
            }
        }
    };
}

arena_key!(NodeId);
arena_key!(DataItemId);

#[derive(Clone, Debug)]
struct Slot<T> {
    generation: u32,
    value: Option<T>,
}

/// Slot storage with free-list reuse.
///
/// Fresh slots start at generation `1`; reuse increments it.
#[derive(Clone, Debug)]
pub(crate) struct Arena<K, T> {
    slots: Vec<Slot<T>>,
    free: Vec<u32>,
    live: usize,
    _key: core::marker::PhantomData<K>,
}

impl<K, T> Default for Arena<K, T> {
    fn default() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            live: 0,
            _key: core::marker::PhantomData,
        }
    }
}

impl<K: ArenaKey, T> Arena<K, T> {
    pub(crate) fn insert_with(&mut self, make: impl FnOnce(K) -> T) -> K {
        self.live += 1;
        if let Some(idx) = self.free.pop() {
            let slot = &mut self.slots[idx as usize];
            slot.generation = slot.generation.wrapping_add(1);
            let key = K::from_parts(idx, slot.generation);
            slot.value = Some(make(key));
            key
        } else {
            #[expect(
                clippy::cast_possible_truncation,
                reason = "more than u32::MAX live slots is out of scope"
            )]
            let idx = self.slots.len() as u32;
            let key = K::from_parts(idx, 1);
            self.slots.push(Slot {
                generation: 1,
                value: Some(make(key)),
            });
            key
        }
    }

    pub(crate) fn remove(&mut self, key: K) -> Option<T> {
        let slot = self.slots.get_mut(key.idx())?;
        if slot.generation != key.generation() {
            return None;
        }
        let value = slot.value.take()?;
        #[expect(
            clippy::cast_possible_truncation,
            reason = "indices originate from u32 keys"
        )]
        self.free.push(key.idx() as u32);
        self.live -= 1;
        Some(value)
    }

    pub(crate) fn get(&self, key: K) -> Option<&T> {
        let slot = self.slots.get(key.idx())?;
        if slot.generation != key.generation() {
            return None;
        }
        slot.value.as_ref()
    }

    pub(crate) fn get_mut(&mut self, key: K) -> Option<&mut T> {
        let slot = self.slots.get_mut(key.idx())?;
        if slot.generation != key.generation() {
            return None;
        }
        slot.value.as_mut()
    }

    pub(crate) fn contains(&self, key: K) -> bool {
        self.get(key).is_some()
    }

    pub(crate) fn len(&self) -> usize {
        self.live
    }
}
