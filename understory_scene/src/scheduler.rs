// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The frame loop.
//!
//! [`Scene::run_frame`] drains the dirty queues of every root partition in a
//! fixed phase order:
//!
//! | Phase      | Queue        | Order | Notes                                         |
//! |------------|--------------|-------|-----------------------------------------------|
//! | data       | `DATA`       | FIFO  | resumable; providers first; step budget       |
//! | raw data   | `RAW_DATA`   | FIFO  | re-syncs records replaced in place            |
//! | data items | `DATA_ITEMS` | FIFO  | only once the component and provider parsed   |
//! | data range | `DATA_RANGE` | FIFO  | same precondition                             |
//! | layout     | `LAYOUT`     | LIFO  | until empty                                   |
//! | position   | `POSITION`   | LIFO  | until empty                                   |
//! | paint      | `PAINT`      | LIFO  | time-boxed; not-ready nodes deferred          |
//!
//! Transitions are ticked after painting, followed by one more layout and
//! position pass. Nodes outside any root keep their flags and are processed
//! once they are attached under a root.

use core::time::Duration;

use understory_dirty::Queue;

use crate::data::DataOutcome;
use crate::props::NumericProperty;
use crate::{DrawContext, NodeFlags, NodeId, RootId, Scene, SceneEvent};

/// Scheduler tuning.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SchedulerConfig {
    /// Step budget while work is backlogged.
    pub tight_step: Duration,
    /// Step budget once a frame ended with nothing left to do.
    pub relaxed_step: Duration,
    /// The paint phase checks its budget every this many nodes.
    pub paint_check_every: usize,
    /// Upper bound on layout validations per partition per pass, guarding
    /// against layouts that keep invalidating each other.
    pub layout_pass_limit: usize,
    /// Most events kept for [`Scene::take_events`]; older ones are dropped
    /// first. Zero disables buffering.
    pub event_capacity: usize,
}

impl SchedulerConfig {
    /// The default configuration.
    pub const DEFAULT: Self = Self {
        tight_step: Duration::from_millis(45),
        relaxed_step: Duration::from_millis(200),
        paint_check_every: 5,
        layout_pass_limit: 4096,
        event_capacity: 4096,
    };
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Work done by one [`Scene::run_frame`] call.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameReport {
    /// Frame number, starting at 1.
    pub frame: u64,
    /// Records turned into data items.
    pub records_parsed: usize,
    /// Data-bound nodes whose parse completed.
    pub data_validated: usize,
    /// Parse slices that ran out of time.
    pub data_yields: usize,
    /// Raw-data passes.
    pub raw_data_validated: usize,
    /// Derived-value passes.
    pub data_items_validated: usize,
    /// Index-window passes.
    pub ranges_validated: usize,
    /// Composite layouts.
    pub layouts_validated: usize,
    /// Transforms resolved.
    pub positions_validated: usize,
    /// Successful draws.
    pub nodes_painted: usize,
    /// Paint entries pushed back to a later frame.
    pub deferred: usize,
    /// Transition samples applied.
    pub transitions_ticked: usize,
    /// Critical errors raised.
    pub errors: usize,
    /// Whether another frame was requested at the end.
    pub requested_next: bool,
}

impl Scene {
    /// Runs one frame. Called by the host when the requested frame fires.
    pub fn run_frame(&mut self) -> FrameReport {
        self.gate.begin_frame();
        self.in_frame = true;
        let frame = self.gate.frames();
        self.report = FrameReport {
            frame,
            ..FrameReport::default()
        };
        tracing::trace!(frame, budget = ?self.budget.current(), "frame started");
        self.events.push(SceneEvent::FrameStarted { frame });
        for observer in &mut self.observers {
            observer.frame_started(frame);
        }

        self.data_phase();
        self.raw_data_phase();
        self.data_items_phase();
        self.data_range_phase();
        self.layout_phase();
        self.position_phase();
        self.paint_phase();
        self.tick_transitions();
        self.layout_phase();
        self.position_phase();

        self.in_frame = false;
        self.events.push(SceneEvent::FrameEnded { frame });
        for observer in &mut self.observers {
            observer.frame_ended(frame);
        }
        let idle = core::mem::take(&mut self.idle);
        for callback in idle {
            callback(self);
        }

        let pending = self.has_pending_work();
        self.budget.settle(!pending);
        if pending {
            self.request_frame();
        }
        self.report.requested_next = self.gate.is_pending();
        tracing::trace!(frame, pending, "frame ended");
        self.report
    }

    /// `true` if a rooted queue is non-empty, a transition is running, or an
    /// idle callback is waiting.
    #[must_use]
    pub fn has_pending_work(&self) -> bool {
        let backlog = self.partitions().into_iter().any(|root| {
            Queue::ALL
                .into_iter()
                .any(|q| self.dirty.len(q, root) > 0)
        });
        backlog || !self.transitions.is_empty() || !self.idle.is_empty()
    }

    /// The report of the last frame.
    #[must_use]
    pub fn last_report(&self) -> &FrameReport {
        &self.report
    }

    /// The scheduler configuration.
    #[must_use]
    pub fn scheduler_config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// The current step budget.
    #[must_use]
    pub fn step_budget(&self) -> Duration {
        self.budget.current()
    }

    fn partitions(&self) -> Vec<Option<RootId>> {
        let mut roots = self.dirty.root_list();
        roots.retain(Option::is_some);
        roots
    }

    /// Drops a queue entry that must not be validated now. Returns `true`
    /// if the entry was dropped.
    fn skip_entry(&mut self, queue: Queue, id: NodeId, root: Option<RootId>) -> bool {
        let skip = !self.nodes.contains(id) || self.is_disabled_tree(id);
        if skip {
            self.dirty.clear(queue, id, root);
        }
        skip
    }

    // --- data ---------------------------------------------------------------

    fn data_phase(&mut self) {
        let deadline = self.budget.deadline(self.clock.now());
        for root in self.partitions() {
            while let Some(id) = self.dirty.first(Queue::DATA, root) {
                if self.skip_entry(Queue::DATA, id, root) {
                    continue;
                }
                let provider = self.component(id).ok().and_then(|c| c.provider);
                if let Some(provider) = provider
                    && self.nodes.contains(provider)
                    && self.is_data_invalid(provider)
                    && !self.is_disabled_tree(provider)
                    && self.run_data_slice(provider) == DataOutcome::Yielded
                {
                    break;
                }
                if self.run_data_slice(id) == DataOutcome::Yielded {
                    break;
                }
                if deadline.is_exceeded(self.clock.now()) {
                    tracing::trace!(?root, "data phase out of time");
                    return;
                }
            }
        }
    }

    fn run_data_slice(&mut self, id: NodeId) -> DataOutcome {
        match self.validate_data(id) {
            Ok(outcome) => outcome,
            Err(error) => {
                self.abort_parse(id);
                self.raise_critical_error(id, error);
                DataOutcome::Complete
            }
        }
    }

    fn raw_data_phase(&mut self) {
        for root in self.partitions() {
            while let Some(id) = self.dirty.first(Queue::RAW_DATA, root) {
                if self.skip_entry(Queue::RAW_DATA, id, root) {
                    continue;
                }
                if let Err(error) = self.validate_raw_data(id) {
                    self.raise_critical_error(id, error);
                }
            }
        }
    }

    fn data_items_phase(&mut self) {
        for root in self.partitions() {
            while let Some(id) = self.dirty.first(Queue::DATA_ITEMS, root) {
                if self.skip_entry(Queue::DATA_ITEMS, id, root) {
                    continue;
                }
                if !self.data_settled(id) {
                    // Re-queued by the data phase once parsing completes.
                    self.dirty.clear(Queue::DATA_ITEMS, id, root);
                    continue;
                }
                self.validate_data_items(id);
            }
        }
    }

    fn data_range_phase(&mut self) {
        for root in self.partitions() {
            while let Some(id) = self.dirty.first(Queue::DATA_RANGE, root) {
                if self.skip_entry(Queue::DATA_RANGE, id, root) {
                    continue;
                }
                if !self.data_settled(id) {
                    self.dirty.clear(Queue::DATA_RANGE, id, root);
                    continue;
                }
                self.validate_data_range(id);
            }
        }
    }

    // --- layout and position ----------------------------------------------------

    fn layout_phase(&mut self) {
        for root in self.partitions() {
            self.settle_layouts(root);
        }
    }

    fn settle_layouts(&mut self, root: Option<RootId>) {
        let mut passes = 0;
        while let Some(id) = self.dirty.last(Queue::LAYOUT, root) {
            if passes >= self.config.layout_pass_limit {
                tracing::warn!(?root, passes, "layout did not settle");
                return;
            }
            passes += 1;
            if !self.nodes.contains(id) || self.is_suppressed(id) {
                self.dirty.clear(Queue::LAYOUT, id, root);
                continue;
            }
            if let Err(error) = self.validate_layout(id, true) {
                self.raise_critical_error(id, error.into());
            }
        }
    }

    fn position_phase(&mut self) {
        for root in self.partitions() {
            self.settle_positions(root);
        }
    }

    fn settle_positions(&mut self, root: Option<RootId>) {
        while let Some(id) = self.dirty.pop_last(Queue::POSITION, root) {
            if !self.nodes.contains(id) || self.is_suppressed(id) {
                continue;
            }
            self.validate_position(id);
        }
    }

    // --- paint ------------------------------------------------------------

    fn paint_phase(&mut self) {
        let deadline = self.budget.deadline(self.clock.now());
        let check_every = self.config.paint_check_every.max(1);
        let mut painted = 0_usize;
        for root in self.partitions() {
            let mut deferred = Vec::new();
            let mut out_of_time = false;
            while let Some(id) = self.dirty.last(Queue::PAINT, root) {
                if painted > 0
                    && painted % check_every == 0
                    && deadline.is_exceeded(self.clock.now())
                {
                    out_of_time = true;
                    break;
                }
                self.dirty.clear(Queue::PAINT, id, root);
                if !self.nodes.contains(id) || self.is_suppressed(id) {
                    continue;
                }
                if !self.node(id).visual.is_ready() || self.waits_for_data(id) {
                    deferred.push(id);
                    continue;
                }
                painted += 1;
                self.validate_node(id);
                self.settle_layouts(root);
                self.settle_positions(root);
            }
            if !deferred.is_empty() {
                self.report.deferred += deferred.len();
                tracing::debug!(?root, count = deferred.len(), "paint deferred");
                self.dirty.extend(Queue::PAINT, root, deferred);
            }
            if out_of_time {
                tracing::trace!(painted, "paint phase out of time");
                return;
            }
        }
    }

    /// `true` if the node's data item belongs to a component that is still
    /// parsing.
    fn waits_for_data(&self, id: NodeId) -> bool {
        self.effective_data_item(id)
            .and_then(|item| self.items.get(item))
            .and_then(|d| d.component)
            .and_then(|c| self.nodes.get(c))
            .is_some_and(|c| c.flags.contains(NodeFlags::DATA_INVALID))
    }

    /// Measures (leaves only) and draws one node.
    fn validate_node(&mut self, id: NodeId) {
        if self.node(id).host.is_none() {
            self.measure_leaf(id, true);
        }
        self.unmark(id, NodeFlags::INVALID, Queue::PAINT);
        let item_id = self.effective_data_item(id);

        let Self { nodes, items, .. } = &mut *self;
        let Some(node) = nodes.get_mut(id) else {
            return;
        };
        let item = item_id.and_then(|i| items.get(i));
        let overrides = item.map(|d| d.properties).unwrap_or_default();
        if !node.props.visible || overrides.visible == Some(false) {
            return;
        }
        let opacity = node.numeric(NumericProperty::Opacity, node.props.opacity)
            * overrides.opacity.unwrap_or(1.0);
        let cx = DrawContext {
            node: id,
            bounds: node.bounds,
            transform: node.transform,
            opacity,
            data_item: item,
        };
        match node.visual.draw(&cx) {
            Ok(()) => {
                node.draws += 1;
                self.report.nodes_painted += 1;
            }
            Err(error) => self.raise_critical_error(id, error.into()),
        }
    }
}
