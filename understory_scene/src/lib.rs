// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Understory Scene: a retained scene graph that validates itself in frames.
//!
//! Mutations never do work directly. They set dirty flags on nodes and queue
//! those nodes in a [`DirtyRegistry`]; the host calls [`Scene::run_frame`]
//! when the frame it was asked for fires, and the scheduler drains the queues
//! in phase order: data, raw data, data items, data range, layout, position,
//! paint. Expensive work is time-boxed: record parsing yields after its
//! `parsing_step_duration` and resumes in the next frame, and painting checks
//! the frame budget as it goes.
//!
//! - **Nodes** ([`NodeKind`]): leaves draw through a [`Visual`]; composites
//!   additionally lay out children ([`Layout`]); data-bound nodes also turn
//!   [`Record`]s into [`DataItem`]s, optionally creating one sprite per item.
//! - **Data** ([`ComponentConfig`]): declared fields, derived values and
//!   summaries, a zoom window ([`ZoomRange`]) hiding items outside it, and
//!   data providers shared with users.
//! - **Transitions** ([`TransitionTarget`]): working values, zoom edges and a
//!   few node properties animate over time and are applied every frame.
//! - **Failures** ([`ValidationError`]): a failing parse, layout or draw is
//!   raised as a critical error on that node only; the rest of the frame
//!   proceeds.
//!
//! Ids are generational: a disposed node's id stays stale forever.
//!
//! ## Quick Start
//!
//! ```rust
//! use understory_scene::{
//!     ComponentConfig, DataField, DataState, HostConfig, Layout, ManualClock, NodeKind,
//!     NodeProps, NoopRequester, Record, Scene,
//! };
//!
//! let mut scene = Scene::new(ManualClock::new(), NoopRequester);
//! let chart = scene.create_root(
//!     NodeKind::DataBound(
//!         HostConfig::with_layout(Layout::Horizontal),
//!         ComponentConfig::with_fields([DataField::category("name"), DataField::value("value")]),
//!     ),
//!     NodeProps::sized(300.0, 100.0),
//! );
//! scene
//!     .set_data(
//!         chart,
//!         [
//!             Record::new().with("name", "a").with("value", 3.0),
//!             Record::new().with("name", "b").with("value", 5.0),
//!         ],
//!     )
//!     .unwrap();
//!
//! let report = scene.run_frame();
//! assert_eq!(report.records_parsed, 2);
//! assert_eq!(scene.data_state(chart), Some(DataState::Clean));
//!
//! let value = scene.field_id(chart, "value").unwrap();
//! assert_eq!(scene.summary(chart, value).unwrap().sum, 8.0);
//! ```

mod animation;
mod component;
mod data;
mod data_item;
mod error;
mod events;
mod id;
mod layout;
mod node;
mod parse;
mod props;
mod record;
mod scene;
mod scheduler;
mod visual;
mod zoom;

pub use understory_dirty::{DirtyRegistry, Queue};
pub use understory_timing::{
    Clock, CountingRequester, FrameRequester, ManualClock, NoopRequester, StdClock,
};

pub use animation::{AnimatedProperty, TransitionTarget};
pub use component::{
    ComponentConfig, DataField, DataState, FieldKind, FieldSummary, RecordProcessor,
    SpriteFactory,
};
pub use data_item::{
    Calculated, DataItem, FieldId, FieldValue, ItemProperties, Location, SpriteRef,
};
pub use error::{ConfigError, LayoutError, ValidationError, VisualError};
pub use events::{FrameObserver, SceneEvent};
pub use id::{DataItemId, NodeId, RootId};
pub use layout::GRID_REPLAN_LIMIT;
pub use node::{HostConfig, Layout, NodeFlags, NodeKind};
pub use parse::{CHECK_EVERY, MIN_REMAINING, ParseCursor, ParseStep};
pub use props::{
    Align, Dimension, Edges, HookFn, NodeProps, NumericProperty, PropChange, PropertyHook, Valign,
};
pub use record::{RawValue, Record};
pub use scene::Scene;
pub use scheduler::{FrameReport, SchedulerConfig};
pub use visual::{BoxVisual, DrawContext, MeasureContext, Visual};
pub use zoom::{ZoomLimits, ZoomOptions, ZoomPriority, ZoomRange, clamp_window, index_window};
