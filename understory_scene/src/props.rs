// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Typed node properties and numeric transform hooks.
//!
//! Every node carries one [`NodeProps`]. Mutations go through
//! [`Scene::set_props`](crate::Scene::set_props), which diffs the old and new
//! values with [`NodeProps::classify`] to decide what to invalidate.
//!
//! [`PropertyHook`]s post-process numeric properties when they are resolved
//! to pixels. Hooks run in insertion order; each one sees the output of the
//! previous one.

/// A length that is either absolute or relative to the parent's inner size.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Dimension {
    /// Pixels.
    Px(f64),
    /// Percent of the space the parent makes available (`50.0` is half).
    Percent(f64),
}

impl Dimension {
    /// Resolves against `available`.
    ///
    /// Percentages resolve to `None` when the available space is unknown.
    #[must_use]
    pub fn resolve(self, available: Option<f64>) -> Option<f64> {
        match self {
            Self::Px(v) => Some(v),
            Self::Percent(p) => available.map(|a| a * p / 100.0),
        }
    }

    /// Returns the percentage, if relative.
    #[must_use]
    pub fn percent(self) -> Option<f64> {
        match self {
            Self::Percent(p) => Some(p),
            Self::Px(_) => None,
        }
    }
}

impl Default for Dimension {
    fn default() -> Self {
        Self::Px(0.0)
    }
}

/// Horizontal alignment of a node inside its parent, or of a parent's content.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Align {
    /// Use the node's own `x`.
    #[default]
    None,
    /// Flush left.
    Left,
    /// Centered.
    Center,
    /// Flush right.
    Right,
}

/// Vertical counterpart of [`Align`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Valign {
    /// Use the node's own `y`.
    #[default]
    None,
    /// Flush top.
    Top,
    /// Centered.
    Middle,
    /// Flush bottom.
    Bottom,
}

/// Four-sided spacing (margins, paddings).
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Edges {
    /// Top.
    pub top: f64,
    /// Right.
    pub right: f64,
    /// Bottom.
    pub bottom: f64,
    /// Left.
    pub left: f64,
}

impl Edges {
    /// All sides set to `v`.
    #[must_use]
    pub const fn uniform(v: f64) -> Self {
        Self {
            top: v,
            right: v,
            bottom: v,
            left: v,
        }
    }

    /// Sum of left and right.
    #[must_use]
    pub fn horizontal(&self) -> f64 {
        self.left + self.right
    }

    /// Sum of top and bottom.
    #[must_use]
    pub fn vertical(&self) -> f64 {
        self.top + self.bottom
    }
}

/// The property set of a node.
#[derive(Clone, Debug, PartialEq)]
pub struct NodeProps {
    /// Horizontal position inside the parent, when not placed by a layout.
    pub x: Dimension,
    /// Vertical position inside the parent, when not placed by a layout.
    pub y: Dimension,
    /// Extra horizontal offset applied after layout.
    pub dx: f64,
    /// Extra vertical offset applied after layout.
    pub dy: f64,
    /// Explicit width; `None` sizes to content.
    pub width: Option<Dimension>,
    /// Explicit height; `None` sizes to content.
    pub height: Option<Dimension>,
    /// Lower bound on the measured width.
    pub min_width: Option<f64>,
    /// Upper bound on the measured width.
    pub max_width: Option<f64>,
    /// Lower bound on the measured height.
    pub min_height: Option<f64>,
    /// Upper bound on the measured height.
    pub max_height: Option<f64>,
    /// Outer spacing used by the parent's layout.
    pub margin: Edges,
    /// Inner spacing between a composite's bounds and its content.
    pub padding: Edges,
    /// Opacity in `[0, 1]`.
    pub opacity: f64,
    /// Rotation in degrees.
    pub rotation: f64,
    /// Uniform scale.
    pub scale: f64,
    /// Horizontal alignment inside the parent.
    pub align: Align,
    /// Vertical alignment inside the parent.
    pub valign: Valign,
    /// Hidden nodes still take part in layout but are not drawn.
    pub visible: bool,
    /// Unmeasured nodes are ignored by the parent's layout.
    pub is_measured: bool,
    /// Disable the node when a critical error is raised on it.
    pub disable_on_error: bool,
}

impl Default for NodeProps {
    fn default() -> Self {
        Self {
            x: Dimension::Px(0.0),
            y: Dimension::Px(0.0),
            dx: 0.0,
            dy: 0.0,
            width: None,
            height: None,
            min_width: None,
            max_width: None,
            min_height: None,
            max_height: None,
            margin: Edges::default(),
            padding: Edges::default(),
            opacity: 1.0,
            rotation: 0.0,
            scale: 1.0,
            align: Align::None,
            valign: Valign::None,
            visible: true,
            is_measured: true,
            disable_on_error: true,
        }
    }
}

impl NodeProps {
    /// Shorthand for a node with a fixed pixel size.
    #[must_use]
    pub fn sized(width: f64, height: f64) -> Self {
        Self {
            width: Some(Dimension::Px(width)),
            height: Some(Dimension::Px(height)),
            ..Self::default()
        }
    }

    /// Classifies the difference between `self` (old) and `new`.
    #[must_use]
    pub fn classify(&self, new: &Self) -> PropChange {
        let mut change = PropChange::empty();
        if self.width != new.width
            || self.height != new.height
            || self.min_width != new.min_width
            || self.max_width != new.max_width
            || self.min_height != new.min_height
            || self.max_height != new.max_height
            || self.margin != new.margin
            || self.padding != new.padding
            || self.rotation != new.rotation
            || self.scale != new.scale
            || self.is_measured != new.is_measured
        {
            change |= PropChange::GEOMETRY;
        }
        if self.x != new.x || self.y != new.y || self.align != new.align || self.valign != new.valign
        {
            change |= PropChange::PLACEMENT | PropChange::PARENT_LAYOUT;
        }
        if self.dx != new.dx || self.dy != new.dy {
            change |= PropChange::PLACEMENT;
        }
        if self.opacity != new.opacity || self.visible != new.visible {
            change |= PropChange::APPEARANCE;
        }
        if change.contains(PropChange::GEOMETRY) {
            change |= PropChange::PARENT_LAYOUT;
        }
        change
    }
}

bitflags::bitflags! {
    /// What a property change affects.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct PropChange: u8 {
        /// Size-affecting: the node must be re-measured.
        const GEOMETRY      = 0b0000_0001;
        /// Position-affecting: the node's transform must be recomputed.
        const PLACEMENT     = 0b0000_0010;
        /// Draw-only.
        const APPEARANCE    = 0b0000_0100;
        /// The parent must re-run its layout.
        const PARENT_LAYOUT = 0b0000_1000;
    }
}

/// Numeric properties that hooks can adjust.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NumericProperty {
    /// [`NodeProps::x`] after resolution to pixels.
    X,
    /// [`NodeProps::y`] after resolution to pixels.
    Y,
    /// [`NodeProps::dx`].
    Dx,
    /// [`NodeProps::dy`].
    Dy,
    /// Resolved width.
    Width,
    /// Resolved height.
    Height,
    /// [`NodeProps::opacity`].
    Opacity,
    /// [`NodeProps::rotation`].
    Rotation,
    /// [`NodeProps::scale`].
    Scale,
}

/// A numeric adjustment.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum HookFn {
    /// Multiply.
    Scale(f64),
    /// Add.
    Offset(f64),
    /// Clamp to an inclusive range.
    Clamp {
        /// Lower bound.
        min: f64,
        /// Upper bound.
        max: f64,
    },
    /// Arbitrary mapping.
    Map(fn(f64) -> f64),
}

impl HookFn {
    /// Applies the adjustment.
    #[must_use]
    pub fn apply(self, v: f64) -> f64 {
        match self {
            Self::Scale(k) => v * k,
            Self::Offset(d) => v + d,
            Self::Clamp { min, max } => v.max(min).min(max),
            Self::Map(f) => f(v),
        }
    }
}

/// A hook bound to one property.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PropertyHook {
    /// The property adjusted.
    pub property: NumericProperty,
    /// The adjustment.
    pub hook: HookFn,
}

impl PropertyHook {
    /// Creates a hook.
    #[must_use]
    pub const fn new(property: NumericProperty, hook: HookFn) -> Self {
        Self { property, hook }
    }
}

/// Runs every hook on `property`, in order.
pub(crate) fn apply_hooks(hooks: &[PropertyHook], property: NumericProperty, raw: f64) -> f64 {
    hooks
        .iter()
        .filter(|h| h.property == property)
        .fold(raw, |v, h| h.hook.apply(v))
}
