// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Data-bound node operations and the data phases of a frame.

use core::time::Duration;
use std::rc::Rc;

use understory_dirty::Queue;
use understory_timing::{Deadline, Transition};

use crate::animation::TransitionTarget;
use crate::component::{DataState, FieldKind, FieldSummary};
use crate::parse::{ParseCursor, ParseStep};
use crate::zoom::{clamp_window, index_window};
use crate::{
    ConfigError, DataField, DataItem, DataItemId, FieldId, FieldValue, ItemProperties, NodeFlags,
    NodeId, NodeKind, Record, Scene, SceneEvent, SpriteRef, ValidationError, ZoomOptions,
    ZoomRange,
};

/// How a data slice ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum DataOutcome {
    Complete,
    Yielded,
}

fn read_number(
    field: &DataField,
    index: usize,
    record: &Record,
) -> Result<Option<f64>, ValidationError> {
    match record.get(&field.source) {
        None => Ok(None),
        Some(raw) => raw.to_number().map_err(|()| ValidationError::Parse {
            index,
            reason: format!("field `{}` is not numeric: {raw:?}", field.source),
        }),
    }
}

fn fill_item(
    item: &mut DataItem,
    fields: &[DataField],
    index: usize,
    record: &Record,
) -> Result<(), ValidationError> {
    for (i, field) in fields.iter().enumerate() {
        match field.kind {
            FieldKind::Value => {
                let v = read_number(field, index, record)?;
                item.values[i].value = v;
                item.values[i].working_value = v;
            }
            FieldKind::Category => {
                item.categories[i] = record.get(&field.source).and_then(|r| r.to_category());
            }
        }
    }
    Ok(())
}

impl Scene {
    // --- queries ------------------------------------------------------------

    /// Resolves a field name declared by the data-bound node.
    pub fn field_id(&self, component: NodeId, name: &str) -> Result<FieldId, ConfigError> {
        self.component(component)?
            .config
            .field_id(name)
            .ok_or_else(|| ConfigError::UnknownField(name.into()))
    }

    /// Items of a data-bound node, in index order. Empty for other nodes.
    #[must_use]
    pub fn data_items(&self, component: NodeId) -> &[DataItemId] {
        match self.node(component).component.as_ref() {
            Some(c) => &c.items,
            None => &[],
        }
    }

    /// A data item.
    ///
    /// # Panics
    ///
    /// Panics if `item` is stale.
    #[must_use]
    #[track_caller]
    pub fn data_item(&self, item: DataItemId) -> &DataItem {
        match self.items.get(item) {
            Some(d) => d,
            None => panic!("{item:?} refers to a disposed data item"),
        }
    }

    /// A data item, or `None` if stale.
    #[must_use]
    pub fn try_data_item(&self, item: DataItemId) -> Option<&DataItem> {
        self.items.get(item)
    }

    #[track_caller]
    fn item_mut(&mut self, item: DataItemId) -> &mut DataItem {
        match self.items.get_mut(item) {
            Some(d) => d,
            None => panic!("{item:?} refers to a disposed data item"),
        }
    }

    /// Lifecycle state of a data-bound node; `None` for other nodes.
    #[must_use]
    pub fn data_state(&self, component: NodeId) -> Option<DataState> {
        let node = self.node(component);
        let c = node.component.as_ref()?;
        let flags = node.flags;
        Some(if flags.contains(NodeFlags::DATA_INVALID) {
            if flags.contains(NodeFlags::PARSING) || c.cursor.position() > 0 {
                DataState::Parsing
            } else {
                DataState::DataDirty
            }
        } else if flags.contains(NodeFlags::DATA_ITEMS_INVALID) {
            DataState::DataItemsDirty
        } else if flags.contains(NodeFlags::DATA_RANGE_INVALID) {
            DataState::DataRangeDirty
        } else {
            DataState::Clean
        })
    }

    /// `true` if the node is data-bound and waiting to be parsed.
    #[must_use]
    pub fn is_data_invalid(&self, component: NodeId) -> bool {
        self.flags(component).contains(NodeFlags::DATA_INVALID)
    }

    /// Fraction of records parsed by the last slice.
    pub fn parse_progress(&self, component: NodeId) -> Result<f64, ConfigError> {
        Ok(self.component(component)?.progress)
    }

    /// Index of the next record to parse; `0` when idle.
    pub fn parse_position(&self, component: NodeId) -> Result<usize, ConfigError> {
        Ok(self.component(component)?.cursor.position())
    }

    /// Number of raw records.
    pub fn record_count(&self, component: NodeId) -> Result<usize, ConfigError> {
        Ok(self.component(component)?.records.len())
    }

    /// Aggregate statistics of a numeric field as of the last data-item pass.
    pub fn summary(&self, component: NodeId, field: FieldId) -> Result<FieldSummary, ConfigError> {
        let c = self.component(component)?;
        c.summaries
            .get(field.index())
            .copied()
            .ok_or_else(|| ConfigError::UnknownField(format!("#{}", field.index())))
    }

    /// The current zoom window.
    pub fn zoom_range(&self, component: NodeId) -> Result<ZoomRange, ConfigError> {
        let c = self.component(component)?;
        Ok(ZoomRange::new(c.start, c.end))
    }

    /// `(start_index, end_index)` as of the last data-range pass.
    pub fn index_window(&self, component: NodeId) -> Result<(usize, usize), ConfigError> {
        let c = self.component(component)?;
        Ok((c.start_index, c.end_index))
    }

    /// The node this one reads its data from.
    pub fn data_provider(&self, component: NodeId) -> Result<Option<NodeId>, ConfigError> {
        Ok(self.component(component)?.provider)
    }

    /// Nodes reading their data from this one.
    pub fn data_users(&self, component: NodeId) -> Result<&[NodeId], ConfigError> {
        Ok(self.component(component)?.users.as_slice())
    }

    // --- data mutation ----------------------------------------------------------

    /// Replaces the node's records. Every existing item (and owned sprite) is
    /// disposed; data users without their own records follow.
    pub fn set_data(
        &mut self,
        component: NodeId,
        records: impl IntoIterator<Item = Record>,
    ) -> Result<(), ConfigError> {
        let records: Vec<Rc<Record>> = records.into_iter().map(Rc::new).collect();
        self.component_mut(component)?.own_data = true;
        self.reset_data(component, records);
        Ok(())
    }

    fn reset_data(&mut self, id: NodeId, records: Vec<Rc<Record>>) {
        let Ok(c) = self.component_mut(id) else {
            return;
        };
        let items = core::mem::take(&mut c.items);
        c.records = records;
        c.cursor = ParseCursor::new();
        c.progress = 0.0;
        c.changed_records.clear();
        let users = c.users.clone();
        self.node_mut(id).flags.remove(NodeFlags::PARSING);
        for item in items {
            self.drop_item(item);
        }
        self.mark(id, NodeFlags::DATA_INVALID, Queue::DATA);
        for user in users {
            if self.follows_provider(user) {
                let shared = self.component(id).map(|c| c.records.clone()).unwrap_or_default();
                self.reset_data(user, shared);
            } else {
                self.invalidate_data(user);
            }
        }
    }

    fn follows_provider(&self, user: NodeId) -> bool {
        self.nodes
            .get(user)
            .and_then(|n| n.component.as_ref())
            .is_some_and(|c| !c.own_data)
    }

    /// Appends records, parsing only the new ones, after evicting the
    /// `remove_count` oldest records and items. Data users without their own
    /// records receive the same edit.
    pub fn add_data(
        &mut self,
        component: NodeId,
        records: impl IntoIterator<Item = Record>,
        remove_count: usize,
    ) -> Result<(), ConfigError> {
        let records: Vec<Rc<Record>> = records.into_iter().map(Rc::new).collect();
        self.component_mut(component)?.own_data = true;
        self.append_data(component, &records, remove_count);
        Ok(())
    }

    fn append_data(&mut self, id: NodeId, records: &[Rc<Record>], remove_count: usize) {
        let Ok(c) = self.component_mut(id) else {
            return;
        };
        let remove = remove_count.min(c.records.len());
        let evicted: Vec<DataItemId> = c.items.drain(..remove.min(c.items.len())).collect();
        c.records.drain(..remove);
        c.records.extend(records.iter().cloned());
        let parsed = c.items.len();
        c.cursor.seek(parsed);
        c.changed_records.retain_mut(|i| {
            if *i >= remove {
                *i -= remove;
                true
            } else {
                false
            }
        });
        let remaining = c.items.clone();
        let users = c.users.clone();
        for item in evicted {
            self.drop_item(item);
        }
        for (index, item) in remaining.into_iter().enumerate() {
            if let Some(d) = self.items.get_mut(item) {
                d.index = Some(index);
            }
        }
        self.mark(id, NodeFlags::DATA_INVALID, Queue::DATA);
        if remove > 0 {
            self.invalidate_data_items(id);
        }
        for user in users {
            if self.follows_provider(user) {
                self.append_data(user, records, remove_count);
            } else {
                self.invalidate_data(user);
            }
        }
    }

    /// Removes the raw record at `index` after its item left the collection,
    /// keeping the parse cursor and pending re-syncs on the same records.
    pub(crate) fn remove_record(&mut self, id: NodeId, index: usize) {
        let Ok(c) = self.component_mut(id) else {
            return;
        };
        if index >= c.records.len() {
            return;
        }
        c.records.remove(index);
        let position = c.cursor.position();
        if position > index {
            c.cursor.seek(position - 1);
        }
        c.changed_records.retain_mut(|i| match (*i).cmp(&index) {
            core::cmp::Ordering::Less => true,
            core::cmp::Ordering::Equal => false,
            core::cmp::Ordering::Greater => {
                *i -= 1;
                true
            }
        });
        let users = c.users.clone();
        for user in users {
            if !self.follows_provider(user) {
                continue;
            }
            match self.component(user).ok().and_then(|u| u.items.get(index).copied()) {
                Some(mirrored) => {
                    self.dispose_data_item(mirrored);
                }
                None => self.remove_record(user, index),
            }
        }
    }

    /// Replaces one raw record in place. Parsed items are re-synced in the
    /// raw-data phase; unparsed ones are simply parsed later.
    pub fn update_record(
        &mut self,
        component: NodeId,
        index: usize,
        record: Record,
    ) -> Result<(), ConfigError> {
        let len = self.component(component)?.records.len();
        if index >= len {
            return Err(ConfigError::RecordOutOfRange { index, len });
        }
        self.replace_record(component, index, Rc::new(record));
        Ok(())
    }

    fn replace_record(&mut self, id: NodeId, index: usize, record: Rc<Record>) {
        let Ok(c) = self.component_mut(id) else {
            return;
        };
        let Some(slot) = c.records.get_mut(index) else {
            return;
        };
        *slot = Rc::clone(&record);
        let parsed = index < c.items.len();
        if parsed {
            c.changed_records.push(index);
        }
        let users = c.users.clone();
        if parsed {
            self.invalidate_raw_data(id);
        }
        for user in users {
            if self.follows_provider(user) {
                self.replace_record(user, index, Rc::clone(&record));
            }
        }
    }

    /// Makes `user` read its data from `provider`.
    ///
    /// A user without records of its own takes the provider's records; all
    /// later data edits on the provider cascade to it.
    pub fn add_data_user(&mut self, provider: NodeId, user: NodeId) -> Result<(), ConfigError> {
        self.component(provider)?;
        self.component(user)?;
        let mut cursor = Some(provider);
        while let Some(p) = cursor {
            if p == user {
                return Err(ConfigError::ProviderCycle { provider, user });
            }
            cursor = self.component(p)?.provider;
        }
        if let Some(old) = self.component(user)?.provider {
            self.remove_data_user(old, user)?;
        }
        let c = self.component_mut(provider)?;
        if !c.users.contains(&user) {
            c.users.push(user);
        }
        let records = c.records.clone();
        self.component_mut(user)?.provider = Some(provider);
        if self.follows_provider(user) {
            self.reset_data(user, records);
        } else {
            self.invalidate_data(user);
        }
        Ok(())
    }

    /// Unlinks `user` from `provider`. The user keeps its current records.
    pub fn remove_data_user(&mut self, provider: NodeId, user: NodeId) -> Result<(), ConfigError> {
        self.component_mut(provider)?.users.retain(|u| *u != user);
        let c = self.component_mut(user)?;
        if c.provider == Some(provider) {
            c.provider = None;
            c.own_data = true;
        }
        Ok(())
    }

    // --- zoom -------------------------------------------------------------

    /// Zooms a data-bound node to `range` (fractions of its items).
    ///
    /// The window is clamped against the node's zoom limits and returned.
    /// With a non-zero `range_change_duration` the edges animate; a request
    /// equivalent to the running animation does not restart it.
    pub fn zoom(
        &mut self,
        component: NodeId,
        range: ZoomRange,
        options: ZoomOptions,
    ) -> Result<ZoomRange, ConfigError> {
        let range = range.validate()?;
        let c = self.component(component)?;
        let current = ZoomRange::new(c.start, c.end);
        let window = clamp_window(range, options.priority, &c.config.zoom, current, c.items.len());
        let duration = c.config.range_change_duration;

        let start_target = TransitionTarget::ZoomStart(component);
        let end_target = TransitionTarget::ZoomEnd(component);
        if !duration.is_zero() && !options.instantly {
            let running_to = |t| self.transitions.get(t).map(|t| t.to);
            if running_to(start_target) == Some(window.start)
                && running_to(end_target) == Some(window.end)
            {
                return Ok(window);
            }
            if window == current
                && running_to(start_target).is_none()
                && running_to(end_target).is_none()
            {
                return Ok(window);
            }
            let now = self.clock.now();
            self.transitions.start(Transition::new(
                start_target,
                current.start,
                window.start,
                now,
                duration,
            ));
            self.transitions.start(Transition::new(
                end_target,
                current.end,
                window.end,
                now,
                duration,
            ));
            self.component_mut(component)?.skip_range_event = options.skip_range_event;
            self.events
                .push(SceneEvent::RangeChangeStarted { node: component });
            self.request_frame();
        } else {
            self.transitions.cancel(start_target);
            self.transitions.cancel(end_target);
            if window != current {
                self.component_mut(component)?.skip_range_event = options.skip_range_event;
                self.set_window(component, window);
            }
        }
        Ok(window)
    }

    pub(crate) fn set_window(&mut self, id: NodeId, window: ZoomRange) {
        let Ok(c) = self.component_mut(id) else {
            return;
        };
        if c.start == window.start && c.end == window.end {
            return;
        }
        c.start = window.start;
        c.end = window.end;
        self.invalidate_data_range(id);
    }

    // --- item values --------------------------------------------------------

    fn default_duration(&self, item: DataItemId) -> Duration {
        self.data_item(item)
            .component
            .and_then(|c| self.nodes.get(c))
            .and_then(|n| n.component.as_ref())
            .map_or(Duration::ZERO, |c| c.config.interpolation_duration)
    }

    /// Sets the target value of `field`.
    ///
    /// A change emits [`SceneEvent::ValueChanged`] and marks the component's
    /// derived values stale; the working value then follows via
    /// [`set_working_value`](Self::set_working_value). `duration` defaults to
    /// the component's `interpolation_duration`.
    ///
    /// # Panics
    ///
    /// Panics if `item` is stale.
    #[track_caller]
    pub fn set_value(
        &mut self,
        item: DataItemId,
        field: FieldId,
        value: Option<f64>,
        duration: Option<Duration>,
    ) {
        let d = self.item_mut(item);
        let Some(slot) = d.values.get_mut(field.index()) else {
            return;
        };
        let old = slot.value;
        if old != value {
            slot.value = value;
            let component = d.component;
            self.events.push(SceneEvent::ValueChanged {
                item,
                field,
                old,
                new: value,
            });
            if let Some(c) = component {
                self.invalidate_data_items(c);
            }
        }
        self.set_working_value(item, field, value, duration);
    }

    /// Moves the displayed value of `field` towards `value`.
    ///
    /// With a positive duration and a finite current working value a
    /// transition is started (replacing any running one); otherwise the value
    /// is applied at once and the item's sprites and component are
    /// invalidated.
    #[track_caller]
    pub fn set_working_value(
        &mut self,
        item: DataItemId,
        field: FieldId,
        value: Option<f64>,
        duration: Option<Duration>,
    ) {
        let duration = duration.unwrap_or_else(|| self.default_duration(item));
        let target = TransitionTarget::WorkingValue(item, field);
        let Some(current) = self.item_mut(item).values.get(field.index()).map(|v| v.working_value)
        else {
            return;
        };
        match (current, value) {
            (Some(from), Some(to)) if !duration.is_zero() && from.is_finite() => {
                if from == to && self.transitions.get(target).is_none() {
                    return;
                }
                let now = self.clock.now();
                self.transitions
                    .start(Transition::new(target, from, to, now, duration));
                self.request_frame();
            }
            _ => {
                self.transitions.cancel(target);
                if let Some(slot) = self.item_mut(item).values.get_mut(field.index()) {
                    slot.working_value = value;
                }
                self.notify_item(item);
            }
        }
    }

    /// Sets the target location of `field` within its category slot.
    #[track_caller]
    pub fn set_location(
        &mut self,
        item: DataItemId,
        field: FieldId,
        location: f64,
        duration: Option<Duration>,
    ) {
        let d = self.item_mut(item);
        let Some(slot) = d.locations.get_mut(field.index()) else {
            return;
        };
        if slot.location != location {
            slot.location = location;
            if let Some(c) = d.component {
                self.invalidate_data_items(c);
            }
        }
        self.set_working_location(item, field, location, duration);
    }

    /// Moves the displayed location of `field` towards `location`.
    #[track_caller]
    pub fn set_working_location(
        &mut self,
        item: DataItemId,
        field: FieldId,
        location: f64,
        duration: Option<Duration>,
    ) {
        let duration = duration.unwrap_or_else(|| self.default_duration(item));
        let target = TransitionTarget::WorkingLocation(item, field);
        let Some(from) = self
            .item_mut(item)
            .locations
            .get(field.index())
            .map(|l| l.working_location)
        else {
            return;
        };
        if !duration.is_zero() && from.is_finite() {
            if from == location && self.transitions.get(target).is_none() {
                return;
            }
            let now = self.clock.now();
            self.transitions
                .start(Transition::new(target, from, location, now, duration));
            self.request_frame();
        } else {
            self.transitions.cancel(target);
            if let Some(slot) = self.item_mut(item).locations.get_mut(field.index()) {
                slot.working_location = location;
            }
            self.notify_item(item);
        }
    }

    /// Edits the per-item visual overrides.
    #[track_caller]
    pub fn set_item_properties(&mut self, item: DataItemId, edit: impl FnOnce(&mut ItemProperties)) {
        edit(&mut self.item_mut(item).properties);
        self.notify_item(item);
    }

    /// Marks the item's sprites and component for redraw.
    pub(crate) fn notify_item(&mut self, item: DataItemId) {
        let Some(d) = self.items.get(item) else {
            return;
        };
        let sprites: Vec<NodeId> = d.sprites.iter().map(|s| s.node).collect();
        let component = d.component;
        for s in sprites {
            if self.nodes.contains(s) {
                self.invalidate(s);
            }
        }
        if let Some(c) = component
            && self.nodes.contains(c)
        {
            self.invalidate(c);
        }
    }

    // --- phases -------------------------------------------------------------

    /// Runs one parse slice of a data-bound node.
    pub(crate) fn validate_data(&mut self, id: NodeId) -> Result<DataOutcome, ValidationError> {
        let now = self.clock.now();
        let Some(c) = self.nodes.get_mut(id).and_then(|n| n.component.as_mut()) else {
            self.unmark(id, NodeFlags::DATA_INVALID, Queue::DATA);
            return Ok(DataOutcome::Complete);
        };
        let deadline = Deadline::new(now, c.config.parsing_step_duration);
        if c.cursor.position() == 0 && !c.items.is_empty() {
            let stale = core::mem::take(&mut c.items);
            for item in stale {
                self.drop_item(item);
            }
        }

        if let Some(c) = self.nodes.get_mut(id).and_then(|n| n.component.as_mut()) {
            c.cursor.begin_slice();
        }
        loop {
            let clock = &*self.clock;
            let Some(c) = self.nodes.get_mut(id).and_then(|n| n.component.as_mut()) else {
                return Ok(DataOutcome::Complete);
            };
            let len = c.records.len();
            match c.cursor.step(len, clock, &deadline) {
                ParseStep::Record(index) => {
                    self.parse_record(id, index)?;
                    self.report.records_parsed += 1;
                }
                ParseStep::Yield { progress } => {
                    c.progress = progress;
                    self.node_mut(id).flags.insert(NodeFlags::PARSING);
                    tracing::debug!(node = ?id, progress, "parse slice yielded");
                    self.events.push(SceneEvent::ParseProgress { node: id, progress });
                    self.report.data_yields += 1;
                    return Ok(DataOutcome::Yielded);
                }
                ParseStep::Done => {
                    c.progress = 1.0;
                    break;
                }
            }
        }

        self.node_mut(id).flags.remove(NodeFlags::PARSING);
        self.unmark(id, NodeFlags::DATA_INVALID, Queue::DATA);
        self.events.push(SceneEvent::DataValidated { node: id });
        self.report.data_validated += 1;
        self.invalidate_data_items(id);
        Ok(DataOutcome::Complete)
    }

    /// Resets a node's parse after a failure so a later edit starts over.
    pub(crate) fn abort_parse(&mut self, id: NodeId) {
        if let Some(node) = self.nodes.get_mut(id) {
            node.flags.remove(NodeFlags::PARSING);
            if let Some(c) = node.component.as_mut() {
                c.cursor = ParseCursor::new();
                c.progress = 1.0;
            }
        }
        self.unmark(id, NodeFlags::DATA_INVALID, Queue::DATA);
    }

    fn parse_record(&mut self, id: NodeId, index: usize) -> Result<(), ValidationError> {
        let c = self.component(id).map_err(|e| ValidationError::Parse {
            index,
            reason: e.to_string(),
        })?;
        let record = Rc::clone(&c.records[index]);
        let mut item = DataItem::new(id, index, c.config.fields.len(), Rc::clone(&record));
        fill_item(&mut item, &c.config.fields, index, &record)?;
        if let Some(processor) = c.config.processor.clone() {
            processor.process(index, &record, &mut item)?;
        }
        let factory = c.config.sprite_factory;

        let item_id = self.items.insert_with(|_| item);
        if let Ok(c) = self.component_mut(id) {
            c.items.push(item_id);
        }
        if let Some(factory) = factory {
            let (props, visual) = factory(self.data_item(item_id));
            let sprite = self.create_node_with_visual(NodeKind::Leaf, props, visual);
            self.node_mut(sprite).data_item = Some(item_id);
            self.item_mut(item_id).sprites.push(SpriteRef {
                node: sprite,
                owned: true,
            });
            self.insert_child(id, usize::MAX, sprite)
                .map_err(|e| ValidationError::Parse {
                    index,
                    reason: e.to_string(),
                })?;
        }
        Ok(())
    }

    /// Re-syncs items whose raw records were replaced in place.
    pub(crate) fn validate_raw_data(&mut self, id: NodeId) -> Result<(), ValidationError> {
        self.unmark(id, NodeFlags::RAW_DATA_INVALID, Queue::RAW_DATA);
        let Ok(c) = self.component_mut(id) else {
            return Ok(());
        };
        let mut changed = core::mem::take(&mut c.changed_records);
        changed.sort_unstable();
        changed.dedup();
        let fields = c.config.fields.clone();
        let processor = c.config.processor.clone();

        for index in changed {
            let Ok(c) = self.component(id) else {
                break;
            };
            let (Some(&item), Some(record)) = (c.items.get(index), c.records.get(index).cloned())
            else {
                continue;
            };
            let mut scratch = DataItem::new(id, index, fields.len(), Rc::clone(&record));
            fill_item(&mut scratch, &fields, index, &record)?;
            if let Some(p) = &processor {
                p.process(index, &record, &mut scratch)?;
            }
            for (i, field) in fields.iter().enumerate() {
                let Ok(i16) = u16::try_from(i) else {
                    break;
                };
                let fid = FieldId(i16);
                match field.kind {
                    FieldKind::Value => {
                        self.set_value(item, fid, scratch.values[i].value, None);
                    }
                    FieldKind::Category => {
                        self.item_mut(item).categories[i] = scratch.categories[i].take();
                    }
                }
            }
            self.item_mut(item).record = Some(record);
            self.notify_item(item);
        }
        self.report.raw_data_validated += 1;
        Ok(())
    }

    /// Recomputes summaries and per-item derived values.
    pub(crate) fn validate_data_items(&mut self, id: NodeId) {
        self.unmark(id, NodeFlags::DATA_ITEMS_INVALID, Queue::DATA_ITEMS);
        let Ok(c) = self.component(id) else {
            return;
        };
        let items = c.items.clone();
        let kinds: Vec<FieldKind> = c.config.fields.iter().map(|f| f.kind).collect();
        let mut summaries = vec![FieldSummary::default(); kinds.len()];

        for (fi, kind) in kinds.iter().enumerate() {
            if *kind != FieldKind::Value {
                continue;
            }
            let mut previous: Option<f64> = None;
            for item in &items {
                let Some(slot) = self.items.get_mut(*item).and_then(|d| d.values.get_mut(fi)) else {
                    continue;
                };
                let FieldValue {
                    value, calculated, ..
                } = slot;
                calculated.change = None;
                calculated.change_percent = None;
                if let Some(v) = *value {
                    summaries[fi].add(v);
                    if let Some(p) = previous {
                        calculated.change = Some(v - p);
                        calculated.change_percent = (p != 0.0).then(|| (v - p) / p * 100.0);
                    }
                    previous = Some(v);
                }
            }
            summaries[fi].finish();
            let sum = summaries[fi].sum;
            for item in &items {
                if let Some(slot) = self.items.get_mut(*item).and_then(|d| d.values.get_mut(fi)) {
                    slot.calculated.percent = match slot.value {
                        Some(v) if sum != 0.0 => Some(v / sum * 100.0),
                        _ => None,
                    };
                }
            }
        }

        if let Ok(c) = self.component_mut(id) {
            c.summaries = summaries;
        }
        self.events.push(SceneEvent::DataItemsValidated { node: id });
        self.report.data_items_validated += 1;
        self.invalidate_data_range(id);
        self.invalidate(id);
        self.invalidate_layout(id);
    }

    /// Resolves the index window and hides sprites of items outside it.
    pub(crate) fn validate_data_range(&mut self, id: NodeId) {
        self.unmark(id, NodeFlags::DATA_RANGE_INVALID, Queue::DATA_RANGE);
        let Ok(c) = self.component_mut(id) else {
            return;
        };
        let (start_index, end_index) =
            index_window(ZoomRange::new(c.start, c.end), c.items.len());
        c.start_index = start_index;
        c.end_index = end_index;
        let skip = core::mem::take(&mut c.skip_range_event);
        let items = c.items.clone();

        for (index, item) in items.into_iter().enumerate() {
            let hidden = index < start_index || index >= end_index;
            let sprites: Vec<NodeId> = self
                .items
                .get(item)
                .map(|d| d.sprites.iter().map(|s| s.node).collect())
                .unwrap_or_default();
            for sprite in sprites {
                if self.nodes.contains(sprite) {
                    self.set_internally_disabled(sprite, hidden);
                }
            }
        }
        if !skip {
            self.events.push(SceneEvent::RangeChanged {
                node: id,
                start_index,
                end_index,
            });
        }
        self.report.ranges_validated += 1;
        self.invalidate(id);
    }

    /// `true` once the node and its provider (if any) have parsed their data.
    pub(crate) fn data_settled(&self, id: NodeId) -> bool {
        let Some(node) = self.nodes.get(id) else {
            return false;
        };
        if node.flags.contains(NodeFlags::DATA_INVALID) {
            return false;
        }
        match node.component.as_ref().and_then(|c| c.provider) {
            Some(p) => self
                .nodes
                .get(p)
                .is_none_or(|n| !n.flags.contains(NodeFlags::DATA_INVALID)),
            None => true,
        }
    }
}
