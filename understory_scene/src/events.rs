// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Events buffered by the scene, and frame observers.

use std::collections::VecDeque;

use crate::{DataItemId, FieldId, NodeId};

/// Something that happened while mutating or validating the scene.
///
/// Events are buffered in order; drain them with
/// [`Scene::take_events`](crate::Scene::take_events). The buffer holds at most
/// [`SchedulerConfig::event_capacity`](crate::SchedulerConfig::event_capacity)
/// events; older ones are dropped first.
#[derive(Clone, Debug, PartialEq)]
pub enum SceneEvent {
    /// A frame began.
    FrameStarted {
        /// Frame number, starting at 1.
        frame: u64,
    },
    /// A frame finished all phases.
    FrameEnded {
        /// Frame number.
        frame: u64,
    },
    /// A parse slice yielded before finishing.
    ParseProgress {
        /// The data-bound node.
        node: NodeId,
        /// Fraction of records processed.
        progress: f64,
    },
    /// Parsing finished; items match the raw data.
    DataValidated {
        /// The data-bound node.
        node: NodeId,
    },
    /// Derived item values were recomputed.
    DataItemsValidated {
        /// The data-bound node.
        node: NodeId,
    },
    /// The index window was resolved.
    RangeChanged {
        /// The data-bound node.
        node: NodeId,
        /// First index inside the window.
        start_index: usize,
        /// One past the last index inside the window.
        end_index: usize,
    },
    /// An animated zoom started.
    RangeChangeStarted {
        /// The data-bound node.
        node: NodeId,
    },
    /// An animated zoom reached its target.
    RangeChangeEnded {
        /// The data-bound node.
        node: NodeId,
    },
    /// A data item's target value changed.
    ValueChanged {
        /// The item.
        item: DataItemId,
        /// The field.
        field: FieldId,
        /// Previous target value.
        old: Option<f64>,
        /// New target value.
        new: Option<f64>,
    },
    /// A node's measured size changed.
    SizeChanged {
        /// The node.
        node: NodeId,
    },
    /// Validation of a node failed; the node was isolated.
    CriticalError {
        /// The node.
        node: NodeId,
        /// Rendered error.
        message: String,
    },
    /// A node was disposed.
    Disposed {
        /// The stale id.
        node: NodeId,
    },
}

/// Receives frame boundary notifications.
pub trait FrameObserver {
    /// Called before any phase runs.
    fn frame_started(&mut self, frame: u64) {
        let _ = frame;
    }

    /// Called after every phase, before idle callbacks.
    fn frame_ended(&mut self, frame: u64) {
        let _ = frame;
    }
}

/// Bounded, ordered event buffer. Once full, each push drops the oldest event.
#[derive(Clone, Debug)]
pub(crate) struct EventLog {
    events: VecDeque<SceneEvent>,
    capacity: usize,
    dropped: u64,
}

impl EventLog {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            events: VecDeque::new(),
            capacity,
            dropped: 0,
        }
    }

    pub(crate) fn push(&mut self, event: SceneEvent) {
        if self.capacity == 0 {
            self.dropped += 1;
            return;
        }
        if self.events.len() == self.capacity {
            self.events.pop_front();
            self.dropped += 1;
        }
        self.events.push_back(event);
    }

    pub(crate) fn take(&mut self) -> Vec<SceneEvent> {
        self.events.drain(..).collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.events.len()
    }

    /// Events discarded because nobody drained the buffer in time.
    pub(crate) fn dropped(&self) -> u64 {
        self.dropped
    }
}
