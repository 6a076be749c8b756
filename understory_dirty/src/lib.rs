// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Understory Dirty: deduplicated, root-partitioned work queues for
//! invalidation engines.
//!
//! A retained scene graph accumulates pending work between frames: data to
//! parse, layouts to resolve, nodes to repaint. This crate provides the passive
//! bookkeeping for that work:
//!
//! - **Queues** ([`Queue`], [`QueueSet`]): the fixed kinds of pending work,
//!   in the order a frame visits them (data, raw data, data items, data range,
//!   layout, position, paint).
//! - **Dirty queues** ([`DirtyQueue`]): insertion-ordered sets. Marking an
//!   entity twice keeps one entry; removing an absent entity is a no-op.
//! - **Registry** ([`DirtyRegistry`]): one set of queues per root, plus a
//!   "no root" bucket for entities not yet attached to a tree, so that several
//!   independent scene graphs sharing one context do not interfere.
//!
//! The registry never drains itself and never schedules frames. Schedulers
//! peek at the live queues, validate entities (which may enqueue further
//! work), and remove entries as they go.
//!
//! ## Quick Start
//!
//! ```rust
//! use understory_dirty::{DirtyRegistry, Queue};
//!
//! let mut registry = DirtyRegistry::<u32, u32>::new();
//! let root = Some(1);
//!
//! registry.mark(Queue::LAYOUT, 10, root);
//! registry.mark(Queue::LAYOUT, 11, root);
//! registry.mark(Queue::LAYOUT, 10, root);
//!
//! // Depth-first layout drain: most recently queued first.
//! let mut order = Vec::new();
//! while let Some(key) = registry.pop_last(Queue::LAYOUT, root) {
//!     order.push(key);
//! }
//! assert_eq!(order, vec![11, 10]);
//! assert!(registry.is_empty());
//! ```
//!
//! ## `no_std` Support
//!
//! This crate is `no_std` and uses `alloc`. It does not depend on `std`.

#![no_std]

extern crate alloc;

mod queue;
mod registry;
mod set;

pub use queue::{QUEUE_COUNT, Queue, QueueSet};
pub use registry::DirtyRegistry;
pub use set::DirtyQueue;
