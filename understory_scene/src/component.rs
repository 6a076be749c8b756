// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The data-bound facet of a node.

use core::fmt;
use core::time::Duration;
use std::rc::Rc;

use smallvec::SmallVec;

use crate::parse::ParseCursor;
use crate::{
    DataItem, DataItemId, FieldId, NodeId, NodeProps, Record, ValidationError, Visual, ZoomLimits,
};

/// How a field is read from a raw record.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldKind {
    /// Numeric; gets a value, a working value and derived statistics.
    Value,
    /// A category label.
    Category,
}

/// One field declared by a data-bound node.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DataField {
    /// Name used to address the field (`Scene::field_id`).
    pub name: String,
    /// Key read from each raw record.
    pub source: String,
    /// How the raw value is interpreted.
    pub kind: FieldKind,
}

impl DataField {
    /// A numeric field read from the record key of the same name.
    pub fn value(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            source: name.clone(),
            name,
            kind: FieldKind::Value,
        }
    }

    /// A category field read from the record key of the same name.
    pub fn category(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            source: name.clone(),
            name,
            kind: FieldKind::Category,
        }
    }

    /// Reads the field from a different record key.
    #[must_use]
    pub fn from_source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }
}

/// Custom per-record processing, run after the declared fields are read.
///
/// Returning an error fails the whole parse of the owning node, which is then
/// isolated by the scheduler.
pub trait RecordProcessor: fmt::Debug {
    /// Adjusts `item`, freshly built from `record` at `index`.
    fn process(
        &self,
        index: usize,
        record: &Record,
        item: &mut DataItem,
    ) -> Result<(), ValidationError>;
}

/// Builds the owned sprite for a newly parsed item.
pub type SpriteFactory = fn(&DataItem) -> (NodeProps, Box<dyn Visual>);

/// Configuration of a data-bound node.
#[derive(Clone)]
pub struct ComponentConfig {
    /// Declared fields, addressed by [`FieldId`] in declaration order.
    pub fields: Vec<DataField>,
    /// How long one parse slice may run before yielding.
    pub parsing_step_duration: Duration,
    /// Default duration for value and location changes.
    pub interpolation_duration: Duration,
    /// Duration of animated zoom changes; zero applies them immediately.
    pub range_change_duration: Duration,
    /// Zoom limits.
    pub zoom: ZoomLimits,
    /// Optional custom record processing.
    pub processor: Option<Rc<dyn RecordProcessor>>,
    /// Optional per-item sprite factory. Sprites are attached under the node.
    pub sprite_factory: Option<SpriteFactory>,
}

impl fmt::Debug for ComponentConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentConfig")
            .field("fields", &self.fields)
            .field("parsing_step_duration", &self.parsing_step_duration)
            .field("interpolation_duration", &self.interpolation_duration)
            .field("range_change_duration", &self.range_change_duration)
            .field("zoom", &self.zoom)
            .field("processor", &self.processor)
            .field("sprite_factory", &self.sprite_factory.is_some())
            .finish()
    }
}

impl Default for ComponentConfig {
    fn default() -> Self {
        Self {
            fields: Vec::new(),
            parsing_step_duration: Duration::from_millis(50),
            interpolation_duration: Duration::ZERO,
            range_change_duration: Duration::ZERO,
            zoom: ZoomLimits::DEFAULT,
            processor: None,
            sprite_factory: None,
        }
    }
}

impl ComponentConfig {
    /// A config declaring `fields` with default timings.
    #[must_use]
    pub fn with_fields(fields: impl IntoIterator<Item = DataField>) -> Self {
        Self {
            fields: fields.into_iter().collect(),
            ..Self::default()
        }
    }

    pub(crate) fn field_id(&self, name: &str) -> Option<FieldId> {
        let i = self.fields.iter().position(|f| f.name == name)?;
        u16::try_from(i).ok().map(FieldId)
    }
}

/// Aggregate statistics of one numeric field.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FieldSummary {
    /// Items with a value.
    pub count: usize,
    /// Sum of values.
    pub sum: f64,
    /// Smallest value.
    pub min: Option<f64>,
    /// Largest value.
    pub max: Option<f64>,
    /// `sum / count`.
    pub average: Option<f64>,
}

impl FieldSummary {
    pub(crate) fn add(&mut self, v: f64) {
        self.count += 1;
        self.sum += v;
        self.min = Some(self.min.map_or(v, |m| m.min(v)));
        self.max = Some(self.max.map_or(v, |m| m.max(v)));
    }

    pub(crate) fn finish(&mut self) {
        let count = self.count as f64;
        self.average = (self.count > 0).then(|| self.sum / count);
    }
}

/// Where a data-bound node is in its lifecycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DataState {
    /// Nothing pending.
    Clean,
    /// Data changed; parsing has not started.
    DataDirty,
    /// Parsing started and yielded at least once.
    Parsing,
    /// Items exist; derived values are stale.
    DataItemsDirty,
    /// Derived values are fresh; the index window is stale.
    DataRangeDirty,
}

pub(crate) struct Component {
    pub(crate) config: ComponentConfig,
    pub(crate) records: Vec<Rc<Record>>,
    pub(crate) own_data: bool,
    pub(crate) items: Vec<DataItemId>,
    pub(crate) cursor: ParseCursor,
    pub(crate) progress: f64,
    pub(crate) provider: Option<NodeId>,
    pub(crate) users: SmallVec<[NodeId; 2]>,
    pub(crate) start: f64,
    pub(crate) end: f64,
    pub(crate) start_index: usize,
    pub(crate) end_index: usize,
    pub(crate) skip_range_event: bool,
    pub(crate) changed_records: Vec<usize>,
    pub(crate) summaries: Vec<FieldSummary>,
}

impl fmt::Debug for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Component")
            .field("config", &self.config)
            .field("records", &self.records.len())
            .field("own_data", &self.own_data)
            .field("items", &self.items.len())
            .field("cursor", &self.cursor)
            .field("progress", &self.progress)
            .field("provider", &self.provider)
            .field("users", &self.users)
            .field("start", &self.start)
            .field("end", &self.end)
            .field("start_index", &self.start_index)
            .field("end_index", &self.end_index)
            .field("skip_range_event", &self.skip_range_event)
            .field("changed_records", &self.changed_records)
            .field("summaries", &self.summaries)
            .finish()
    }
}

impl Component {
    pub(crate) fn new(config: ComponentConfig) -> Self {
        let fields = config.fields.len();
        Self {
            config,
            records: Vec::new(),
            own_data: false,
            items: Vec::new(),
            cursor: ParseCursor::new(),
            progress: 1.0,
            provider: None,
            users: SmallVec::new(),
            start: 0.0,
            end: 1.0,
            start_index: 0,
            end_index: 0,
            skip_range_event: false,
            changed_records: Vec::new(),
            summaries: vec![FieldSummary::default(); fields],
        }
    }
}
