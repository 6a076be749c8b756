// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Node storage: flags, facets, and layout results.

use kurbo::{Affine, Point, Rect};

use crate::component::Component;
use crate::props::{NumericProperty, apply_hooks};
use crate::{
    Align, ComponentConfig, DataItemId, Dimension, NodeId, NodeProps, PropertyHook, RootId,
    ValidationError, Valign, Visual,
};

bitflags::bitflags! {
    /// Per-node state bits.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct NodeFlags: u16 {
        /// Needs to be measured and drawn.
        const INVALID             = 1 << 0;
        /// Transform is stale.
        const POSITION_INVALID    = 1 << 1;
        /// Composite only: children must be re-laid-out.
        const LAYOUT_INVALID      = 1 << 2;
        /// Data-bound only: raw data changed, items must be re-parsed.
        const DATA_INVALID        = 1 << 3;
        /// Data-bound only: raw records were replaced in place.
        const RAW_DATA_INVALID    = 1 << 4;
        /// Data-bound only: derived item values are stale.
        const DATA_ITEMS_INVALID  = 1 << 5;
        /// Data-bound only: the index window is stale.
        const DATA_RANGE_INVALID  = 1 << 6;
        /// Disabled by the user (or by a critical error).
        const DISABLED            = 1 << 7;
        /// Hidden because its data item is outside the zoom window.
        const INTERNALLY_DISABLED = 1 << 8;
        /// Parsing yielded at least once and has not finished.
        const PARSING             = 1 << 9;
    }
}

/// Layout mode of a composite node.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Layout {
    /// Children are placed at their own coordinates, or aligned if they ask.
    #[default]
    Absolute,
    /// Children are stacked top to bottom.
    Vertical,
    /// Children are stacked left to right.
    Horizontal,
    /// Children flow into columns, wrapping into rows.
    Grid,
    /// Children are not arranged at all; their positions are left untouched.
    None,
}

/// Configuration of a composite node.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HostConfig {
    /// How children are arranged.
    pub layout: Layout,
    /// Horizontal alignment of the content block inside the node.
    pub content_align: Align,
    /// Vertical alignment of the content block inside the node.
    pub content_valign: Valign,
    /// Arrange children last-to-first.
    pub reverse_order: bool,
    /// Grid only: upper bound on columns.
    pub max_columns: usize,
    /// Grid only: every column gets the width of the widest child.
    pub fixed_width_grid: bool,
}

impl HostConfig {
    /// Default composite configuration.
    pub const DEFAULT: Self = Self {
        layout: Layout::Absolute,
        content_align: Align::None,
        content_valign: Valign::None,
        reverse_order: false,
        max_columns: usize::MAX,
        fixed_width_grid: false,
    };

    /// A config with the given layout and defaults otherwise.
    #[must_use]
    pub const fn with_layout(layout: Layout) -> Self {
        Self {
            layout,
            ..Self::DEFAULT
        }
    }
}

impl Default for HostConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Which facets a new node gets.
#[derive(Clone, Debug)]
pub enum NodeKind {
    /// A plain visual node.
    Leaf,
    /// A node that hosts children.
    Composite(HostConfig),
    /// A composite node bound to a data sequence.
    DataBound(HostConfig, ComponentConfig),
}

#[derive(Clone, Debug, Default)]
pub(crate) struct ChildHost {
    pub(crate) config: HostConfig,
    pub(crate) children: Vec<NodeId>,
    pub(crate) layout_order: Vec<NodeId>,
    pub(crate) order_stale: bool,
    pub(crate) grid_replans: u32,
}

impl ChildHost {
    pub(crate) fn new(config: HostConfig) -> Self {
        Self {
            config,
            order_stale: true,
            ..Self::default()
        }
    }
}

#[derive(Debug)]
pub(crate) struct Node {
    pub(crate) parent: Option<NodeId>,
    pub(crate) virtual_parent: Option<NodeId>,
    pub(crate) root: Option<RootId>,
    pub(crate) top_parent: Option<NodeId>,
    pub(crate) key: Option<String>,
    pub(crate) props: NodeProps,
    pub(crate) hooks: Vec<PropertyHook>,
    pub(crate) flags: NodeFlags,
    pub(crate) data_item: Option<DataItemId>,
    pub(crate) visual: Box<dyn Visual>,
    pub(crate) host: Option<ChildHost>,
    pub(crate) component: Option<Component>,
    /// Width cap imposed by the parent's layout (percent sizing).
    pub(crate) imposed_width: Option<f64>,
    pub(crate) imposed_height: Option<f64>,
    /// Measured bounds in parent-aligned local space (rotation and scale applied).
    pub(crate) bounds: Rect,
    /// Origin assigned by the parent's layout, or resolved from `x`/`y`.
    pub(crate) position: Point,
    pub(crate) transform: Affine,
    pub(crate) draws: u64,
    pub(crate) last_error: Option<ValidationError>,
}

impl Node {
    pub(crate) fn new(
        props: NodeProps,
        visual: Box<dyn Visual>,
        host: Option<ChildHost>,
        component: Option<Component>,
    ) -> Self {
        Self {
            parent: None,
            virtual_parent: None,
            root: None,
            top_parent: None,
            key: None,
            props,
            hooks: Vec::new(),
            flags: NodeFlags::empty(),
            data_item: None,
            visual,
            host,
            component,
            imposed_width: None,
            imposed_height: None,
            bounds: Rect::ZERO,
            position: Point::ZERO,
            transform: Affine::IDENTITY,
            draws: 0,
            last_error: None,
        }
    }

    pub(crate) fn numeric(&self, property: NumericProperty, raw: f64) -> f64 {
        apply_hooks(&self.hooks, property, raw)
    }

    /// Explicit width in pixels after hooks. Percent widths resolve to the
    /// cap the parent's layout imposed.
    pub(crate) fn resolved_width(&self) -> Option<f64> {
        let w = match self.props.width? {
            Dimension::Px(v) => v,
            Dimension::Percent(_) => self.imposed_width?,
        };
        Some(self.numeric(NumericProperty::Width, w))
    }

    pub(crate) fn resolved_height(&self) -> Option<f64> {
        let h = match self.props.height? {
            Dimension::Px(v) => v,
            Dimension::Percent(_) => self.imposed_height?,
        };
        Some(self.numeric(NumericProperty::Height, h))
    }

    /// Rotation and scale about the local origin.
    pub(crate) fn shape_transform(&self) -> Affine {
        let rotation = self.numeric(NumericProperty::Rotation, self.props.rotation);
        let scale = self.numeric(NumericProperty::Scale, self.props.scale);
        Affine::rotate(rotation.to_radians()) * Affine::scale(scale)
    }

    /// Clamps a content size by min/max props and the parent's cap, then
    /// applies rotation and scale.
    pub(crate) fn finish_bounds(&self, content: Rect) -> Rect {
        let mut w = content.width();
        let mut h = content.height();
        if let Some(max) = self.props.max_width {
            w = w.min(max);
        }
        if let Some(max) = self.imposed_width {
            w = w.min(max);
        }
        if let Some(min) = self.props.min_width {
            w = w.max(min);
        }
        if let Some(max) = self.props.max_height {
            h = h.min(max);
        }
        if let Some(max) = self.imposed_height {
            h = h.min(max);
        }
        if let Some(min) = self.props.min_height {
            h = h.max(min);
        }
        let local = Rect::new(content.x0, content.y0, content.x0 + w, content.y0 + h);
        let shape = self.shape_transform();
        if shape == Affine::IDENTITY {
            local
        } else {
            shape.transform_rect_bbox(local)
        }
    }

    pub(crate) fn is_relative_width(&self) -> bool {
        matches!(self.props.width, Some(Dimension::Percent(_)))
    }

    pub(crate) fn is_relative_height(&self) -> bool {
        matches!(self.props.height, Some(Dimension::Percent(_)))
    }
}
