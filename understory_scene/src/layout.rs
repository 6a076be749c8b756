// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Two-pass layout of composite nodes.
//!
//! The measure pass walks the layout order (fixed-size children before
//! relatively-sized ones along the layout axis), turns percentages into
//! absolute caps based on the space the fixed children left over, and
//! measures children inline. The arrange pass then places every measured,
//! enabled child according to the layout mode and derives the composite's own
//! bounds from the extremes of what it placed.
//!
//! Layout is idempotent: positions are recomputed from scratch every pass, so
//! running it again on an unchanged tree yields the same result.

use kurbo::{Affine, Point, Rect, Vec2};
use understory_dirty::Queue;

use crate::props::NumericProperty;
use crate::{
    Align, Edges, Layout, LayoutError, MeasureContext, NodeFlags, NodeId, NodeProps, Scene,
    SceneEvent, Valign,
};

/// Column re-plans allowed in one grid arrange pass before giving up.
pub const GRID_REPLAN_LIMIT: u32 = 32;

/// A child as seen by the arrange pass.
#[derive(Clone, Copy, Debug)]
struct Slot {
    id: NodeId,
    bounds: Rect,
    margin: Edges,
    align: Align,
    valign: Valign,
    x: f64,
    y: f64,
}

impl Slot {
    fn outer_width(&self) -> f64 {
        self.bounds.width() + self.margin.horizontal()
    }

    fn outer_height(&self) -> f64 {
        self.bounds.height() + self.margin.vertical()
    }

    /// Horizontal placement inside a band of width `band` starting at `start`.
    fn align_x(&self, start: f64, band: f64) -> f64 {
        let b = self.bounds;
        match self.align {
            Align::Left => start + self.margin.left - b.x0,
            Align::Center => start + (band - self.outer_width()) / 2.0 + self.margin.left - b.x0,
            Align::Right => start + band - self.margin.right - b.x1,
            Align::None => self.x,
        }
    }

    fn align_y(&self, start: f64, band: f64) -> f64 {
        let b = self.bounds;
        match self.valign {
            Valign::Top => start + self.margin.top - b.y0,
            Valign::Middle => start + (band - self.outer_height()) / 2.0 + self.margin.top - b.y0,
            Valign::Bottom => start + band - self.margin.bottom - b.y1,
            Valign::None => self.y,
        }
    }
}

/// Inner sizes of a composite.
#[derive(Clone, Copy, Debug)]
struct Inner {
    /// Explicit inner size (explicit or imposed size minus padding).
    explicit_w: Option<f64>,
    explicit_h: Option<f64>,
    /// Space children may use: explicit size, else `max_width`, minus padding.
    avail_w: Option<f64>,
    avail_h: Option<f64>,
}

impl Scene {
    /// Measures a leaf from its visual.
    ///
    /// With `notify`, a size change invalidates the parent's layout.
    pub(crate) fn measure_leaf(&mut self, id: NodeId, notify: bool) {
        let node = self.node_mut(id);
        let cx = MeasureContext {
            node: id,
            width: node.resolved_width(),
            height: node.resolved_height(),
            max_width: node.imposed_width.or(node.props.max_width),
            max_height: node.imposed_height.or(node.props.max_height),
        };
        let content = node.visual.measure(&cx);
        let bounds = node.finish_bounds(content);
        self.store_bounds(id, bounds, notify);
    }

    fn store_bounds(&mut self, id: NodeId, bounds: Rect, notify: bool) {
        let node = self.node_mut(id);
        if node.bounds == bounds {
            return;
        }
        node.bounds = bounds;
        let parent = node.parent;
        self.events.push(SceneEvent::SizeChanged { node: id });
        if notify && let Some(parent) = parent {
            self.invalidate_layout(parent);
        }
    }

    /// Lays out one composite: order, measure, arrange, own bounds.
    pub(crate) fn validate_layout(&mut self, id: NodeId, notify: bool) -> Result<(), LayoutError> {
        self.unmark(id, NodeFlags::LAYOUT_INVALID, Queue::LAYOUT);
        if self.node(id).host.is_none() {
            return Ok(());
        }
        self.report.layouts_validated += 1;
        self.refresh_layout_order(id);
        let inner = self.inner(id);
        self.measure_children(id, inner);
        let bounds = self.arrange(id, inner)?;
        let finished = self.node(id).finish_bounds(bounds);
        self.store_bounds(id, finished, notify);
        Ok(())
    }

    fn inner(&self, id: NodeId) -> Inner {
        let node = self.node(id);
        let padding = node.props.padding;
        let explicit_w = node.resolved_width().map(|w| (w - padding.horizontal()).max(0.0));
        let explicit_h = node.resolved_height().map(|h| (h - padding.vertical()).max(0.0));
        let max_w = node
            .props
            .max_width
            .map(|w| (w - padding.horizontal()).max(0.0));
        let max_h = node
            .props
            .max_height
            .map(|h| (h - padding.vertical()).max(0.0));
        Inner {
            explicit_w,
            explicit_h,
            avail_w: explicit_w.or(max_w),
            avail_h: explicit_h.or(max_h),
        }
    }

    fn refresh_layout_order(&mut self, id: NodeId) {
        let Some(host) = self.node(id).host.as_ref() else {
            return;
        };
        if !host.order_stale {
            return;
        }
        let layout = host.config.layout;
        let (fixed, relative): (Vec<NodeId>, Vec<NodeId>) =
            host.children.iter().copied().partition(|c| {
                let child = self.node(*c);
                match layout {
                    Layout::Horizontal => !child.is_relative_width(),
                    Layout::Vertical => !child.is_relative_height(),
                    _ => !child.is_relative_width() && !child.is_relative_height(),
                }
            });
        if let Some(host) = self.node_mut(id).host.as_mut() {
            host.layout_order = fixed;
            host.layout_order.extend(relative);
            host.order_stale = false;
        }
    }

    fn is_laid_out(&self, child: NodeId) -> bool {
        let node = self.node(child);
        node.props.is_measured
            && !node
                .flags
                .intersects(NodeFlags::DISABLED | NodeFlags::INTERNALLY_DISABLED)
    }

    fn measure_children(&mut self, id: NodeId, inner: Inner) {
        let Some(host) = self.node(id).host.as_ref() else {
            return;
        };
        let layout = host.config.layout;
        let order = host.layout_order.clone();
        let active: Vec<NodeId> = order.into_iter().filter(|c| self.is_laid_out(*c)).collect();

        let total = |pick: fn(&NodeProps) -> Option<f64>| -> f64 {
            active
                .iter()
                .filter_map(|c| pick(&self.node(*c).props))
                .sum()
        };
        let scale_w = match layout {
            Layout::Horizontal => normalizer(total(|p| p.width.and_then(|d| d.percent()))),
            _ => 1.0,
        };
        let scale_h = match layout {
            Layout::Vertical => normalizer(total(|p| p.height.and_then(|d| d.percent()))),
            _ => 1.0,
        };

        let mut remaining_w = inner.avail_w;
        let mut remaining_h = inner.avail_h;
        for child in active {
            let node = self.node(child);
            let margin = node.props.margin;
            let width_pct = node.props.width.and_then(|d| d.percent());
            let height_pct = node.props.height.and_then(|d| d.percent());
            let is_host = node.host.is_some();

            let mut changed = false;
            if let Some(p) = width_pct {
                let base = if layout == Layout::Horizontal {
                    remaining_w
                } else {
                    inner.avail_w
                };
                let cap = base.map(|b| (b * p * scale_w / 100.0 - margin.horizontal()).max(0.0));
                let node = self.node_mut(child);
                changed |= node.imposed_width != cap;
                node.imposed_width = cap;
            }
            if let Some(p) = height_pct {
                let base = if layout == Layout::Vertical {
                    remaining_h
                } else {
                    inner.avail_h
                };
                let cap = base.map(|b| (b * p * scale_h / 100.0 - margin.vertical()).max(0.0));
                let node = self.node_mut(child);
                changed |= node.imposed_height != cap;
                node.imposed_height = cap;
            }

            let flags = self.node(child).flags;
            if is_host {
                if changed || flags.contains(NodeFlags::LAYOUT_INVALID) {
                    if let Err(e) = self.validate_layout(child, false) {
                        self.raise_critical_error(child, e.into());
                    }
                }
            } else if changed || flags.contains(NodeFlags::INVALID) {
                self.measure_leaf(child, false);
            }

            let bounds = self.node(child).bounds;
            if layout == Layout::Horizontal && width_pct.is_none() {
                remaining_w = remaining_w.map(|r| (r - bounds.width() - margin.horizontal()).max(0.0));
            }
            if layout == Layout::Vertical && height_pct.is_none() {
                remaining_h = remaining_h.map(|r| (r - bounds.height() - margin.vertical()).max(0.0));
            }
        }
    }

    /// Places children and returns the composite's unclamped local bounds.
    fn arrange(&mut self, id: NodeId, inner: Inner) -> Result<Rect, LayoutError> {
        let node = self.node(id);
        let Some(host) = node.host.as_ref() else {
            return Ok(node.bounds);
        };
        let config = host.config;
        let padding = node.props.padding;
        let min_w = node.props.min_width;
        let min_h = node.props.min_height;
        let mut children = host.children.clone();
        if config.reverse_order {
            children.reverse();
        }

        let mut slots = Vec::with_capacity(children.len());
        let mut loose = Vec::new();
        let mut suppressed = Vec::new();
        for child in children {
            let c = self.node(child);
            if c.flags
                .intersects(NodeFlags::DISABLED | NodeFlags::INTERNALLY_DISABLED)
            {
                suppressed.push(child);
                continue;
            }
            if !c.props.is_measured {
                loose.push(child);
                continue;
            }
            let x = c.numeric(
                NumericProperty::X,
                c.props.x.resolve(inner.avail_w).unwrap_or(0.0),
            );
            let y = c.numeric(
                NumericProperty::Y,
                c.props.y.resolve(inner.avail_h).unwrap_or(0.0),
            );
            slots.push(Slot {
                id: child,
                bounds: c.bounds,
                margin: c.props.margin,
                align: c.props.align,
                valign: c.props.valign,
                x,
                y,
            });
        }

        let band_w = inner.avail_w.unwrap_or_else(|| {
            slots.iter().map(Slot::outer_width).fold(0.0, f64::max)
        });
        let band_h = inner.avail_h.unwrap_or_else(|| {
            slots.iter().map(Slot::outer_height).fold(0.0, f64::max)
        });

        let mut replans = 0;
        let placed: Vec<(Slot, Point)> = match config.layout {
            Layout::None => slots
                .iter()
                .map(|s| (*s, self.node(s.id).position))
                .collect(),
            Layout::Absolute => slots
                .iter()
                .map(|s| (*s, Point::new(s.align_x(0.0, band_w), s.align_y(0.0, band_h))))
                .collect(),
            Layout::Vertical => {
                let mut next_y = 0.0;
                slots
                    .iter()
                    .map(|s| {
                        let y = next_y + s.margin.top - s.bounds.y0;
                        next_y = y + s.bounds.y1 + s.margin.bottom;
                        (*s, Point::new(s.align_x(0.0, band_w), y))
                    })
                    .collect()
            }
            Layout::Horizontal => {
                let mut next_x = 0.0;
                slots
                    .iter()
                    .map(|s| {
                        let x = next_x + s.margin.left - s.bounds.x0;
                        next_x = x + s.bounds.x1 + s.margin.right;
                        (*s, Point::new(x, s.align_y(0.0, band_h)))
                    })
                    .collect()
            }
            Layout::Grid => {
                let (placed, r) = arrange_grid(
                    &slots,
                    inner.avail_w,
                    config.max_columns,
                    config.fixed_width_grid,
                )?;
                replans = r;
                placed
            }
        };

        // Extremes of everything placed, margins included.
        let content = placed
            .iter()
            .map(|(s, p)| {
                Rect::new(
                    p.x + s.bounds.x0 - s.margin.left,
                    p.y + s.bounds.y0 - s.margin.top,
                    p.x + s.bounds.x1 + s.margin.right,
                    p.y + s.bounds.y1 + s.margin.bottom,
                )
            })
            .reduce(|a, b| a.union(b))
            .unwrap_or(Rect::ZERO);

        let mut w = inner.explicit_w.unwrap_or(content.width());
        let mut h = inner.explicit_h.unwrap_or(content.height());
        if let Some(min) = min_w
            && w + padding.horizontal() < min
        {
            w = min - padding.horizontal();
        }
        if let Some(min) = min_h
            && h + padding.vertical() < min
        {
            h = min - padding.vertical();
        }

        let shift_x = match config.content_align {
            Align::Center if config.layout != Layout::None => (w - content.width()) / 2.0 - content.x0,
            Align::Right if config.layout != Layout::None => w - content.width() - content.x0,
            _ => 0.0,
        };
        let shift_y = match config.content_valign {
            Valign::Middle if config.layout != Layout::None => (h - content.height()) / 2.0 - content.y0,
            Valign::Bottom if config.layout != Layout::None => h - content.height() - content.y0,
            _ => 0.0,
        };
        let along_x = matches!(config.layout, Layout::Horizontal | Layout::Grid);
        let along_y = matches!(config.layout, Layout::Vertical | Layout::Grid);

        for (slot, p) in &placed {
            let dx = if along_x || slot.align == Align::None { shift_x } else { 0.0 };
            let dy = if along_y || slot.valign == Valign::None { shift_y } else { 0.0 };
            let pos = if config.layout == Layout::None {
                *p
            } else {
                Point::new(p.x + padding.left + dx, p.y + padding.top + dy)
            };
            self.place(slot.id, pos);
        }
        for child in loose {
            let c = self.node(child);
            let x = c.numeric(NumericProperty::X, c.props.x.resolve(inner.avail_w).unwrap_or(0.0));
            let y = c.numeric(NumericProperty::Y, c.props.y.resolve(inner.avail_h).unwrap_or(0.0));
            self.place(child, Point::new(x + padding.left, y + padding.top));
        }
        for child in suppressed {
            if self.node(child).flags.contains(NodeFlags::POSITION_INVALID) {
                self.validate_position(child);
            }
        }
        if let Some(host) = self.node_mut(id).host.as_mut() {
            host.grid_replans = replans;
        }

        let x0 = if inner.explicit_w.is_some() {
            0.0
        } else {
            (content.x0 + shift_x).min(0.0)
        };
        let y0 = if inner.explicit_h.is_some() {
            0.0
        } else {
            (content.y0 + shift_y).min(0.0)
        };
        Ok(Rect::new(
            x0,
            y0,
            x0 + w + padding.horizontal(),
            y0 + h + padding.vertical(),
        ))
    }

    fn place(&mut self, child: NodeId, pos: Point) {
        let node = self.node_mut(child);
        if node.position != pos {
            node.position = pos;
            self.invalidate_position(child);
        }
    }

    /// Resolves the node's local transform.
    pub(crate) fn validate_position(&mut self, id: NodeId) {
        self.unmark(id, NodeFlags::POSITION_INVALID, Queue::POSITION);
        let placed_by_parent = self
            .node(id)
            .parent
            .and_then(|p| self.node(p).host.as_ref())
            .is_some_and(|h| h.config.layout != Layout::None);
        let node = self.node_mut(id);
        if !placed_by_parent {
            let x = node.props.x.resolve(None).unwrap_or(0.0);
            let y = node.props.y.resolve(None).unwrap_or(0.0);
            node.position = Point::new(
                node.numeric(NumericProperty::X, x),
                node.numeric(NumericProperty::Y, y),
            );
        }
        let dx = node.numeric(NumericProperty::Dx, node.props.dx);
        let dy = node.numeric(NumericProperty::Dy, node.props.dy);
        let origin = node.position.to_vec2() + Vec2::new(dx, dy);
        node.transform = Affine::translate(origin) * node.shape_transform();
        self.report.positions_validated += 1;
    }
}

fn normalizer(total_percent: f64) -> f64 {
    if total_percent > 100.0 {
        100.0 / total_percent
    } else {
        1.0
    }
}

/// Flows slots into columns, re-planning with fewer columns when a row
/// overflows the available width.
fn arrange_grid(
    slots: &[Slot],
    avail_w: Option<f64>,
    max_columns: usize,
    fixed_width: bool,
) -> Result<(Vec<(Slot, Point)>, u32), LayoutError> {
    if slots.is_empty() {
        return Ok((Vec::new(), 0));
    }
    let max_w = avail_w.unwrap_or(f64::INFINITY);
    let min_cell = slots
        .iter()
        .map(Slot::outer_width)
        .fold(f64::INFINITY, f64::min)
        .max(1.0);
    let max_cell = slots.iter().map(Slot::outer_width).fold(0.0, f64::max);
    let predicted = if fixed_width {
        (max_w / max_cell.max(1.0)).floor()
    } else {
        (max_w / min_cell).floor()
    };
    #[expect(
        clippy::cast_possible_truncation,
        reason = "saturating float-to-int conversion of a non-negative count"
    )]
    let predicted = predicted as usize;
    let mut column_count = predicted.max(1).min(max_columns.max(1)).min(slots.len());

    let mut replans = 0_u32;
    'plan: loop {
        let widths: Vec<f64> = if fixed_width {
            vec![max_cell; column_count]
        } else {
            let mut w = vec![0.0_f64; column_count];
            for (i, s) in slots.iter().enumerate() {
                let col = i % column_count;
                w[col] = w[col].max(s.outer_width());
            }
            w
        };

        let mut placed = Vec::with_capacity(slots.len());
        let (mut column, mut next_x, mut row_y, mut row_h) = (0_usize, 0.0_f64, 0.0_f64, 0.0_f64);
        for s in slots {
            let cell = widths[column];
            let x = if s.align == Align::None {
                next_x + s.margin.left - s.bounds.x0
            } else {
                s.align_x(next_x, cell)
            };
            let y = row_y + s.margin.top - s.bounds.y0;
            placed.push((*s, Point::new(x, y)));
            row_h = row_h.max(s.outer_height());
            next_x += cell;
            column += 1;

            let next_cell = widths.get(column).copied().unwrap_or(max_cell);
            if next_x > max_w - next_cell + 1.0 && column < column_count {
                replans += 1;
                if replans > GRID_REPLAN_LIMIT {
                    return Err(LayoutError::GridDidNotConverge {
                        replans: GRID_REPLAN_LIMIT,
                    });
                }
                tracing::debug!(
                    from = column_count,
                    to = column,
                    "grid overflow, re-planning columns"
                );
                column_count = column;
                continue 'plan;
            }
            if column >= column_count {
                column = 0;
                next_x = 0.0;
                row_y += row_h;
                row_h = 0.0;
            }
        }
        return Ok((placed, replans));
    }
}
