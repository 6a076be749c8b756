// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Transitions on node properties, item working values and zoom edges.

use core::time::Duration;

use understory_timing::{Sample, Transition};

use crate::{DataItemId, FieldId, NodeId, Scene, SceneEvent};

/// What a running transition drives.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TransitionTarget {
    /// The working value of a data item field.
    WorkingValue(DataItemId, FieldId),
    /// The working location of a data item field.
    WorkingLocation(DataItemId, FieldId),
    /// The start edge of a data-bound node's zoom window.
    ZoomStart(NodeId),
    /// The end edge of a data-bound node's zoom window.
    ZoomEnd(NodeId),
    /// A node's opacity.
    Opacity(NodeId),
    /// A node's horizontal offset.
    Dx(NodeId),
    /// A node's vertical offset.
    Dy(NodeId),
}

impl TransitionTarget {
    /// The node this target belongs to, if it drives a node.
    #[must_use]
    pub fn node(self) -> Option<NodeId> {
        match self {
            Self::ZoomStart(n) | Self::ZoomEnd(n) | Self::Opacity(n) | Self::Dx(n) | Self::Dy(n) => {
                Some(n)
            }
            Self::WorkingValue(..) | Self::WorkingLocation(..) => None,
        }
    }

    /// The data item this target belongs to, if it drives an item.
    #[must_use]
    pub fn item(self) -> Option<DataItemId> {
        match self {
            Self::WorkingValue(i, _) | Self::WorkingLocation(i, _) => Some(i),
            _ => None,
        }
    }
}

/// Node properties that can be animated with [`Scene::animate`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AnimatedProperty {
    /// `opacity`.
    Opacity,
    /// `dx`.
    Dx,
    /// `dy`.
    Dy,
}

impl Scene {
    /// Animates a node property from its current value to `to`.
    ///
    /// A zero `duration` applies the value at once. A running transition on
    /// the same property is replaced.
    pub fn animate(&mut self, id: NodeId, property: AnimatedProperty, to: f64, duration: Duration) {
        let props = self.props(id);
        let (target, from) = match property {
            AnimatedProperty::Opacity => (TransitionTarget::Opacity(id), props.opacity),
            AnimatedProperty::Dx => (TransitionTarget::Dx(id), props.dx),
            AnimatedProperty::Dy => (TransitionTarget::Dy(id), props.dy),
        };
        if duration.is_zero() {
            self.transitions.cancel(target);
            self.apply_sample(Sample {
                target,
                value: to,
                finished: true,
            });
            return;
        }
        let now = self.clock.now();
        self.transitions
            .start(Transition::new(target, from, to, now, duration));
        self.request_frame();
    }

    /// `true` while a transition drives `target`.
    #[must_use]
    pub fn is_animating(&self, target: TransitionTarget) -> bool {
        self.transitions.get(target).is_some()
    }

    /// Samples every running transition and applies the values.
    pub(crate) fn tick_transitions(&mut self) {
        if self.transitions.is_empty() {
            return;
        }
        let now = self.clock.now();
        let samples = self.transitions.tick(now);
        self.report.transitions_ticked += samples.len();
        for sample in samples {
            self.apply_sample(sample);
        }
    }

    fn apply_sample(&mut self, sample: Sample<TransitionTarget>) {
        let Sample {
            target,
            value,
            finished,
        } = sample;
        if let Some(n) = target.node()
            && !self.nodes.contains(n)
        {
            return;
        }
        match target {
            TransitionTarget::WorkingValue(item, field) => {
                let Some(slot) = self
                    .items
                    .get_mut(item)
                    .and_then(|d| d.values.get_mut(field.index()))
                else {
                    return;
                };
                slot.working_value = Some(value);
                self.notify_item(item);
            }
            TransitionTarget::WorkingLocation(item, field) => {
                let Some(slot) = self
                    .items
                    .get_mut(item)
                    .and_then(|d| d.locations.get_mut(field.index()))
                else {
                    return;
                };
                slot.working_location = value;
                self.notify_item(item);
            }
            TransitionTarget::ZoomStart(n) | TransitionTarget::ZoomEnd(n) => {
                let Ok(c) = self.component_mut(n) else {
                    return;
                };
                if matches!(target, TransitionTarget::ZoomStart(_)) {
                    c.start = value;
                } else {
                    c.end = value;
                }
                self.invalidate_data_range(n);
                if finished && matches!(target, TransitionTarget::ZoomEnd(_)) {
                    self.events.push(SceneEvent::RangeChangeEnded { node: n });
                }
            }
            TransitionTarget::Opacity(n) => {
                self.node_mut(n).props.opacity = value;
                self.invalidate(n);
            }
            TransitionTarget::Dx(n) => {
                self.node_mut(n).props.dx = value;
                self.invalidate_position(n);
            }
            TransitionTarget::Dy(n) => {
                self.node_mut(n).props.dy = value;
                self.invalidate_position(n);
            }
        }
    }
}
