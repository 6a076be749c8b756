// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Data items: one parsed record inside a data-bound node.
//!
//! Items are stored in the scene's item arena and addressed by
//! [`DataItemId`](crate::DataItemId). Mutation goes through the scene
//! (`Scene::set_value` and friends) so that events, component invalidation
//! and transitions stay consistent; this module only holds the state.

use std::rc::Rc;

use smallvec::SmallVec;

use crate::{NodeId, Record};

/// Index of a field declared in a
/// [`ComponentConfig`](crate::ComponentConfig).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FieldId(pub(crate) u16);

impl FieldId {
    /// Returns the position of the field in the component's field list.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// Values derived from the whole item collection during data-item validation.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Calculated {
    /// Difference from the previous item's value.
    pub change: Option<f64>,
    /// `change` as a percentage of the previous item's value.
    pub change_percent: Option<f64>,
    /// Share of the field total, in percent.
    pub percent: Option<f64>,
}

/// The numeric slot of one field.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FieldValue {
    /// The target value.
    pub value: Option<f64>,
    /// The value currently displayed; converges to `value`.
    pub working_value: Option<f64>,
    /// Derived statistics.
    pub calculated: Calculated,
}

/// A fractional position inside a category slot (`0.5` is the middle).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Location {
    /// Target location.
    pub location: f64,
    /// Displayed location.
    pub working_location: f64,
}

impl Default for Location {
    fn default() -> Self {
        Self {
            location: 0.5,
            working_location: 0.5,
        }
    }
}

/// Per-item overrides applied to the item's sprites.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ItemProperties {
    /// Opacity override.
    pub opacity: Option<f64>,
    /// Visibility override.
    pub visible: Option<bool>,
}

/// A node that represents an item.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SpriteRef {
    /// The node.
    pub node: NodeId,
    /// Owned sprites are disposed with the item.
    pub owned: bool,
}

/// One record, materialized.
#[derive(Clone, Debug)]
pub struct DataItem {
    pub(crate) component: Option<NodeId>,
    pub(crate) index: Option<usize>,
    pub(crate) values: SmallVec<[FieldValue; 4]>,
    pub(crate) categories: SmallVec<[Option<String>; 4]>,
    pub(crate) locations: SmallVec<[Location; 4]>,
    pub(crate) properties: ItemProperties,
    pub(crate) record: Option<Rc<Record>>,
    pub(crate) sprites: SmallVec<[SpriteRef; 2]>,
}

impl DataItem {
    pub(crate) fn new(component: NodeId, index: usize, fields: usize, record: Rc<Record>) -> Self {
        Self {
            component: Some(component),
            index: Some(index),
            values: SmallVec::from_elem(FieldValue::default(), fields),
            categories: SmallVec::from_elem(None, fields),
            locations: SmallVec::from_elem(Location::default(), fields),
            properties: ItemProperties::default(),
            record: Some(record),
            sprites: SmallVec::new(),
        }
    }

    /// The owning component, or `None` once detached.
    #[must_use]
    pub fn component(&self) -> Option<NodeId> {
        self.component
    }

    /// Position in the owning component's collection.
    #[must_use]
    pub fn index(&self) -> Option<usize> {
        self.index
    }

    /// Target value of `field`.
    #[must_use]
    pub fn value(&self, field: FieldId) -> Option<f64> {
        self.values.get(field.index()).and_then(|v| v.value)
    }

    /// Displayed value of `field`.
    #[must_use]
    pub fn working_value(&self, field: FieldId) -> Option<f64> {
        self.values.get(field.index()).and_then(|v| v.working_value)
    }

    /// The full numeric slot of `field`.
    #[must_use]
    pub fn field(&self, field: FieldId) -> Option<&FieldValue> {
        self.values.get(field.index())
    }

    /// Mutable numeric slot, for record processors filling derived fields.
    pub fn field_mut(&mut self, field: FieldId) -> Option<&mut FieldValue> {
        self.values.get_mut(field.index())
    }

    /// Category label of `field`.
    #[must_use]
    pub fn category(&self, field: FieldId) -> Option<&str> {
        self.categories.get(field.index())?.as_deref()
    }

    /// Location of `field`.
    #[must_use]
    pub fn location(&self, field: FieldId) -> Option<Location> {
        self.locations.get(field.index()).copied()
    }

    /// Per-item visual overrides.
    #[must_use]
    pub fn properties(&self) -> &ItemProperties {
        &self.properties
    }

    /// Mutable per-item visual overrides.
    ///
    /// Changes take effect the next time the item's sprites are drawn.
    pub fn properties_mut(&mut self) -> &mut ItemProperties {
        &mut self.properties
    }

    /// The raw record this item was parsed from.
    #[must_use]
    pub fn record(&self) -> Option<&Record> {
        self.record.as_deref()
    }

    /// Nodes representing this item.
    #[must_use]
    pub fn sprites(&self) -> &[SpriteRef] {
        &self.sprites
    }
}
