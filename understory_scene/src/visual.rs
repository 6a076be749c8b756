// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The seam between nodes and a drawing backend.

use core::fmt;

use kurbo::{Affine, Rect};

use crate::{DataItem, NodeId, VisualError};

/// Sizing information passed to [`Visual::measure`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MeasureContext {
    /// The node being measured.
    pub node: NodeId,
    /// Resolved explicit width, after hooks.
    pub width: Option<f64>,
    /// Resolved explicit height, after hooks.
    pub height: Option<f64>,
    /// Largest width the parent can give.
    pub max_width: Option<f64>,
    /// Largest height the parent can give.
    pub max_height: Option<f64>,
}

/// Everything a backend needs to draw one node.
#[derive(Clone, Copy, Debug)]
pub struct DrawContext<'a> {
    /// The node being drawn.
    pub node: NodeId,
    /// Measured bounds in the node's local space.
    pub bounds: Rect,
    /// Local-to-parent transform.
    pub transform: Affine,
    /// Opacity after hooks.
    pub opacity: f64,
    /// The data item the node represents, inherited from ancestors if unset.
    pub data_item: Option<&'a DataItem>,
}

/// Backend hook for one node's content.
///
/// The rectangle returned by [`measure`](Self::measure) is ground truth for a
/// leaf's content size; composites are sized by their layout and only use
/// [`draw`](Self::draw) for their own background.
pub trait Visual: fmt::Debug {
    /// Returns the content bounds in local coordinates.
    fn measure(&mut self, cx: &MeasureContext) -> Rect;

    /// Draws the node.
    fn draw(&mut self, cx: &DrawContext<'_>) -> Result<(), VisualError>;

    /// Returns `false` while the backend is still waiting on resources (fonts,
    /// images). Not-ready nodes are deferred to a later frame.
    fn is_ready(&self) -> bool {
        true
    }
}

/// A plain rectangle sized by the node's explicit width and height.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct BoxVisual;

impl Visual for BoxVisual {
    fn measure(&mut self, cx: &MeasureContext) -> Rect {
        Rect::new(0.0, 0.0, cx.width.unwrap_or(0.0), cx.height.unwrap_or(0.0))
    }

    fn draw(&mut self, _cx: &DrawContext<'_>) -> Result<(), VisualError> {
        Ok(())
    }
}
