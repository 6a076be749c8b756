// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The scene context: node and item arenas, dirty queues, and tree edits.

use core::fmt;

use hashbrown::HashMap;
use kurbo::{Affine, Point, Rect};
use understory_dirty::{DirtyRegistry, Queue};
use understory_timing::{
    Clock, FrameGate, FrameRequester, NoopRequester, StdClock, StepBudget, TransitionSet,
};

use crate::animation::TransitionTarget;
use crate::component::Component;
use crate::events::EventLog;
use crate::id::Arena;
use crate::node::{ChildHost, Node};
use crate::{
    BoxVisual, ConfigError, DataItem, DataItemId, FrameObserver, FrameReport, HostConfig, NodeFlags,
    NodeId, NodeKind, NodeProps, PropChange, PropertyHook, RootId, SceneEvent, SchedulerConfig,
    SpriteRef, ValidationError, Visual,
};

/// Flags that mirror a queue membership.
pub(crate) const FLAG_QUEUES: [(NodeFlags, Queue); 7] = [
    (NodeFlags::DATA_INVALID, Queue::DATA),
    (NodeFlags::RAW_DATA_INVALID, Queue::RAW_DATA),
    (NodeFlags::DATA_ITEMS_INVALID, Queue::DATA_ITEMS),
    (NodeFlags::DATA_RANGE_INVALID, Queue::DATA_RANGE),
    (NodeFlags::LAYOUT_INVALID, Queue::LAYOUT),
    (NodeFlags::POSITION_INVALID, Queue::POSITION),
    (NodeFlags::INVALID, Queue::PAINT),
];

type IdleCallback = Box<dyn FnOnce(&mut Scene)>;

/// A retained scene graph with phase-ordered dirty queues.
///
/// The scene owns every node and data item. Mutations mark nodes dirty and
/// ask the host for a frame through the [`FrameRequester`]; the host then calls
/// [`run_frame`](Self::run_frame), which validates the queued work in
/// dependency order under a time budget.
///
/// ```
/// use understory_scene::{HostConfig, Layout, NodeKind, NodeProps, Scene};
/// use understory_timing::{CountingRequester, ManualClock};
///
/// let requester = CountingRequester::default();
/// let mut scene = Scene::new(ManualClock::new(), requester.clone());
///
/// let root = scene.create_root(
///     NodeKind::Composite(HostConfig::with_layout(Layout::Vertical)),
///     NodeProps::sized(100.0, 100.0),
/// );
/// let a = scene.create_node(NodeKind::Leaf, NodeProps::sized(100.0, 20.0));
/// let b = scene.create_node(NodeKind::Leaf, NodeProps::sized(100.0, 30.0));
/// scene.attach(root, a).unwrap();
/// scene.attach(root, b).unwrap();
///
/// // Many mutations, one frame request.
/// assert_eq!(requester.count(), 1);
///
/// scene.run_frame();
/// assert_eq!(scene.position(b).y, 20.0);
/// assert!(!scene.has_pending_work());
/// ```
pub struct Scene {
    pub(crate) nodes: Arena<NodeId, Node>,
    pub(crate) items: Arena<DataItemId, DataItem>,
    pub(crate) dirty: DirtyRegistry<NodeId, RootId>,
    keys: HashMap<String, NodeId>,
    next_root: u32,
    pub(crate) clock: Box<dyn Clock>,
    requester: Box<dyn FrameRequester>,
    pub(crate) gate: FrameGate,
    pub(crate) in_frame: bool,
    pub(crate) budget: StepBudget,
    pub(crate) config: SchedulerConfig,
    pub(crate) transitions: TransitionSet<TransitionTarget>,
    pub(crate) events: EventLog,
    pub(crate) observers: Vec<Box<dyn FrameObserver>>,
    pub(crate) idle: Vec<IdleCallback>,
    pub(crate) report: FrameReport,
}

impl fmt::Debug for Scene {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scene")
            .field("nodes", &self.nodes.len())
            .field("items", &self.items.len())
            .field("dirty", &self.dirty)
            .field("keys", &self.keys)
            .field("next_root", &self.next_root)
            .field("gate", &self.gate)
            .field("in_frame", &self.in_frame)
            .field("budget", &self.budget)
            .field("config", &self.config)
            .field("transitions", &self.transitions.len())
            .field("events", &self.events.len())
            .field("observers", &self.observers.len())
            .field("idle", &self.idle.len())
            .field("report", &self.report)
            .finish_non_exhaustive()
    }
}

impl Default for Scene {
    fn default() -> Self {
        Self::new(StdClock::new(), NoopRequester)
    }
}

impl Scene {
    /// Creates an empty scene with the default scheduler configuration.
    pub fn new(clock: impl Clock + 'static, requester: impl FrameRequester + 'static) -> Self {
        Self::with_config(clock, requester, SchedulerConfig::DEFAULT)
    }

    /// Creates an empty scene.
    pub fn with_config(
        clock: impl Clock + 'static,
        requester: impl FrameRequester + 'static,
        config: SchedulerConfig,
    ) -> Self {
        let events = EventLog::new(config.event_capacity);
        Self {
            nodes: Arena::default(),
            items: Arena::default(),
            dirty: DirtyRegistry::new(),
            keys: HashMap::new(),
            next_root: 0,
            clock: Box::new(clock),
            requester: Box::new(requester),
            gate: FrameGate::new(),
            in_frame: false,
            budget: StepBudget::new(config.tight_step, config.relaxed_step),
            config,
            transitions: TransitionSet::new(),
            events,
            observers: Vec::new(),
            idle: Vec::new(),
            report: FrameReport::default(),
        }
    }

    // --- creation ---------------------------------------------------------

    /// Creates a standalone node drawn by [`BoxVisual`].
    pub fn create_node(&mut self, kind: NodeKind, props: NodeProps) -> NodeId {
        self.create_node_with_visual(kind, props, Box::new(BoxVisual))
    }

    /// Creates a standalone node drawn by `visual`.
    ///
    /// The node starts invalid; composites also start layout-invalid and
    /// data-bound nodes data-invalid.
    pub fn create_node_with_visual(
        &mut self,
        kind: NodeKind,
        props: NodeProps,
        visual: Box<dyn Visual>,
    ) -> NodeId {
        let (host, component) = match kind {
            NodeKind::Leaf => (None, None),
            NodeKind::Composite(config) => (Some(ChildHost::new(config)), None),
            NodeKind::DataBound(config, data) => {
                (Some(ChildHost::new(config)), Some(Component::new(data)))
            }
        };
        let composite = host.is_some();
        let data_bound = component.is_some();
        let id = self
            .nodes
            .insert_with(|_| Node::new(props, visual, host, component));
        self.invalidate(id);
        self.invalidate_position(id);
        if composite {
            self.invalidate_layout(id);
        }
        if data_bound {
            self.invalidate_data(id);
        }
        id
    }

    /// Creates a node that starts its own root partition.
    pub fn create_root(&mut self, kind: NodeKind, props: NodeProps) -> NodeId {
        let id = self.create_node(kind, props);
        self.make_root(id);
        id
    }

    /// Creates a root drawn by `visual`.
    pub fn create_root_with_visual(
        &mut self,
        kind: NodeKind,
        props: NodeProps,
        visual: Box<dyn Visual>,
    ) -> NodeId {
        let id = self.create_node_with_visual(kind, props, visual);
        self.make_root(id);
        id
    }

    fn make_root(&mut self, id: NodeId) {
        let root = RootId(self.next_root);
        self.next_root += 1;
        self.set_subtree_root(id, Some(root), Some(id));
    }

    // --- lookups ----------------------------------------------------------

    #[track_caller]
    pub(crate) fn node(&self, id: NodeId) -> &Node {
        match self.nodes.get(id) {
            Some(node) => node,
            None => panic!("{id:?} refers to a disposed node"),
        }
    }

    #[track_caller]
    pub(crate) fn node_mut(&mut self, id: NodeId) -> &mut Node {
        match self.nodes.get_mut(id) {
            Some(node) => node,
            None => panic!("{id:?} refers to a disposed node"),
        }
    }

    #[track_caller]
    pub(crate) fn component(&self, id: NodeId) -> Result<&Component, ConfigError> {
        self.node(id)
            .component
            .as_ref()
            .ok_or(ConfigError::NotDataBound(id))
    }

    #[track_caller]
    pub(crate) fn component_mut(&mut self, id: NodeId) -> Result<&mut Component, ConfigError> {
        self.node_mut(id)
            .component
            .as_mut()
            .ok_or(ConfigError::NotDataBound(id))
    }

    /// Returns `true` if `id` refers to a live node.
    #[must_use]
    pub fn is_alive(&self, id: NodeId) -> bool {
        self.nodes.contains(id)
    }

    /// Returns `true` if `item` refers to a live data item.
    #[must_use]
    pub fn is_item_alive(&self, item: DataItemId) -> bool {
        self.items.contains(item)
    }

    /// Number of live nodes.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of live data items.
    #[must_use]
    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    /// The node's properties.
    ///
    /// # Panics
    ///
    /// Panics if `id` is stale; likewise for every accessor taking a `NodeId`
    /// unless documented otherwise.
    #[must_use]
    #[track_caller]
    pub fn props(&self, id: NodeId) -> &NodeProps {
        &self.node(id).props
    }

    /// The node's state bits.
    #[must_use]
    pub fn flags(&self, id: NodeId) -> NodeFlags {
        self.node(id).flags
    }

    /// Waiting to be measured and drawn.
    #[must_use]
    pub fn is_invalid(&self, id: NodeId) -> bool {
        self.flags(id).contains(NodeFlags::INVALID)
    }

    /// Waiting for its transform to be resolved.
    #[must_use]
    pub fn is_position_invalid(&self, id: NodeId) -> bool {
        self.flags(id).contains(NodeFlags::POSITION_INVALID)
    }

    /// Waiting for its children to be laid out.
    #[must_use]
    pub fn is_layout_invalid(&self, id: NodeId) -> bool {
        self.flags(id).contains(NodeFlags::LAYOUT_INVALID)
    }

    /// Disabled by the user or by a critical error (the node itself).
    #[must_use]
    pub fn is_disabled(&self, id: NodeId) -> bool {
        self.flags(id).contains(NodeFlags::DISABLED)
    }

    /// Hidden by a zoom window.
    #[must_use]
    pub fn is_internally_disabled(&self, id: NodeId) -> bool {
        self.flags(id).contains(NodeFlags::INTERNALLY_DISABLED)
    }

    /// Measured bounds in the node's local space.
    #[must_use]
    pub fn bounds(&self, id: NodeId) -> Rect {
        self.node(id).bounds
    }

    /// Origin assigned by the parent's layout.
    #[must_use]
    pub fn position(&self, id: NodeId) -> Point {
        self.node(id).position
    }

    /// Local-to-parent transform resolved in the position phase.
    #[must_use]
    pub fn transform(&self, id: NodeId) -> Affine {
        self.node(id).transform
    }

    /// Number of successful draws.
    #[must_use]
    pub fn draw_count(&self, id: NodeId) -> u64 {
        self.node(id).draws
    }

    /// The last critical error raised on the node.
    #[must_use]
    pub fn last_error(&self, id: NodeId) -> Option<&ValidationError> {
        self.node(id).last_error.as_ref()
    }

    /// The parent, if attached.
    #[must_use]
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).parent
    }

    /// The topmost ancestor, if the node belongs to a root.
    #[must_use]
    pub fn top_parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).top_parent
    }

    /// The node's root partition.
    #[must_use]
    pub fn root_of(&self, id: NodeId) -> Option<RootId> {
        self.node(id).root
    }

    /// Children in z-order (first is bottom-most). Empty for leaves.
    #[must_use]
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.node(id)
            .host
            .as_ref()
            .map_or(&[], |h| h.children.as_slice())
    }

    /// Children in the order the last layout pass measured them.
    #[must_use]
    pub fn layout_order(&self, id: NodeId) -> &[NodeId] {
        self.node(id)
            .host
            .as_ref()
            .map_or(&[], |h| h.layout_order.as_slice())
    }

    /// Index among the parent's children.
    #[must_use]
    pub fn z_index(&self, id: NodeId) -> Option<usize> {
        let parent = self.node(id).parent?;
        self.children(parent).iter().position(|c| *c == id)
    }

    /// Number of grid column re-plans in the node's last layout pass.
    #[must_use]
    pub fn grid_replans(&self, id: NodeId) -> u32 {
        self.node(id).host.as_ref().map_or(0, |h| h.grid_replans)
    }

    /// The composite configuration, if the node hosts children.
    #[must_use]
    pub fn host_config(&self, id: NodeId) -> Option<&HostConfig> {
        self.node(id).host.as_ref().map(|h| &h.config)
    }

    /// The node's own data item.
    #[must_use]
    pub fn data_item_of(&self, id: NodeId) -> Option<DataItemId> {
        self.node(id).data_item
    }

    /// The node's data item, or the nearest one found walking up virtual
    /// parents and parents.
    #[must_use]
    pub fn effective_data_item(&self, id: NodeId) -> Option<DataItemId> {
        let mut cursor = Some(id);
        while let Some(n) = cursor {
            let node = self.nodes.get(n)?;
            if node.data_item.is_some() {
                return node.data_item;
            }
            cursor = node.virtual_parent.or(node.parent);
        }
        None
    }

    /// Looks up a node by key.
    #[must_use]
    pub fn find_by_key(&self, key: &str) -> Option<NodeId> {
        self.keys.get(key).copied()
    }

    /// The node's key.
    #[must_use]
    pub fn key(&self, id: NodeId) -> Option<&str> {
        self.node(id).key.as_deref()
    }

    /// Current monotonic time from the scene's clock.
    #[must_use]
    pub fn now(&self) -> core::time::Duration {
        self.clock.now()
    }

    // --- property mutation --------------------------------------------------

    /// Edits the node's properties and invalidates whatever the edit affects.
    ///
    /// Returns the classification of the change.
    #[track_caller]
    pub fn set_props(&mut self, id: NodeId, edit: impl FnOnce(&mut NodeProps)) -> PropChange {
        let node = self.node_mut(id);
        let old = node.props.clone();
        edit(&mut node.props);
        let change = old.classify(&node.props);
        self.apply_change(id, change);
        change
    }

    pub(crate) fn apply_change(&mut self, id: NodeId, change: PropChange) {
        if change.is_empty() {
            return;
        }
        if change.intersects(PropChange::GEOMETRY | PropChange::APPEARANCE) {
            self.invalidate(id);
        }
        if change.contains(PropChange::GEOMETRY) && self.node(id).host.is_some() {
            self.invalidate_layout(id);
        }
        if change.contains(PropChange::PLACEMENT) {
            self.invalidate_position(id);
        }
        if change.contains(PropChange::PARENT_LAYOUT)
            && let Some(parent) = self.node(id).parent
        {
            if change.contains(PropChange::GEOMETRY)
                && let Some(host) = self.node_mut(parent).host.as_mut()
            {
                host.order_stale = true;
            }
            self.invalidate_layout(parent);
        }
    }

    /// Appends a numeric transform hook.
    pub fn add_hook(&mut self, id: NodeId, hook: PropertyHook) {
        self.node_mut(id).hooks.push(hook);
        self.apply_change(
            id,
            PropChange::GEOMETRY | PropChange::PLACEMENT | PropChange::APPEARANCE,
        );
    }

    /// Removes every hook from the node.
    pub fn clear_hooks(&mut self, id: NodeId) {
        let node = self.node_mut(id);
        if node.hooks.is_empty() {
            return;
        }
        node.hooks.clear();
        self.apply_change(
            id,
            PropChange::GEOMETRY | PropChange::PLACEMENT | PropChange::APPEARANCE,
        );
    }

    /// Hooks in application order.
    #[must_use]
    pub fn hooks(&self, id: NodeId) -> &[PropertyHook] {
        &self.node(id).hooks
    }

    /// Replaces the node's visual.
    pub fn set_visual(&mut self, id: NodeId, visual: Box<dyn Visual>) {
        self.node_mut(id).visual = visual;
        self.apply_change(id, PropChange::GEOMETRY);
    }

    /// Edits a composite's configuration.
    pub fn set_host_config(
        &mut self,
        id: NodeId,
        edit: impl FnOnce(&mut HostConfig),
    ) -> Result<(), ConfigError> {
        let host = self
            .node_mut(id)
            .host
            .as_mut()
            .ok_or(ConfigError::NotComposite(id))?;
        let old = host.config;
        edit(&mut host.config);
        if host.config != old {
            host.order_stale = true;
            self.invalidate_layout(id);
        }
        Ok(())
    }

    /// Assigns a unique key. `None` removes the current key.
    pub fn set_key(&mut self, id: NodeId, key: Option<&str>) -> Result<(), ConfigError> {
        if let Some(k) = key
            && let Some(other) = self.keys.get(k)
            && *other != id
        {
            return Err(ConfigError::DuplicateKey(k.into()));
        }
        let old = core::mem::replace(&mut self.node_mut(id).key, key.map(Into::into));
        if let Some(old) = old {
            self.keys.remove(&old);
        }
        if let Some(k) = key {
            self.keys.insert(k.into(), id);
        }
        Ok(())
    }

    /// Sets the node that stands in for the parent when resolving the data
    /// item. Does not affect layout or root membership.
    pub fn set_virtual_parent(&mut self, id: NodeId, virtual_parent: Option<NodeId>) {
        self.node_mut(id).virtual_parent = virtual_parent;
        self.invalidate(id);
    }

    /// Binds the node to `item` as a borrowed sprite, or unbinds it.
    ///
    /// # Panics
    ///
    /// Panics if `item` is stale.
    pub fn set_data_item(&mut self, id: NodeId, item: Option<DataItemId>) {
        let old = self.node(id).data_item;
        if old == item {
            return;
        }
        if let Some(old) = old
            && let Some(d) = self.items.get_mut(old)
        {
            d.sprites.retain(|s| s.node != id);
        }
        if let Some(new) = item {
            match self.items.get_mut(new) {
                Some(d) => d.sprites.push(SpriteRef {
                    node: id,
                    owned: false,
                }),
                None => panic!("{new:?} refers to a disposed data item"),
            }
        }
        self.node_mut(id).data_item = item;
        self.invalidate(id);
    }

    // --- tree -------------------------------------------------------------

    /// Appends `child` to `parent`'s children, detaching it from any previous
    /// parent first.
    pub fn attach(&mut self, parent: NodeId, child: NodeId) -> Result<(), ConfigError> {
        let len = self.children(parent).len();
        let index = if self.node(child).parent == Some(parent) {
            len - 1
        } else {
            len
        };
        self.insert_child(parent, index, child)
    }

    /// Inserts `child` at `index` (clamped) in `parent`'s children.
    pub fn insert_child(
        &mut self,
        parent: NodeId,
        index: usize,
        child: NodeId,
    ) -> Result<(), ConfigError> {
        if self.node(parent).host.is_none() {
            return Err(ConfigError::NotComposite(parent));
        }
        let _ = self.node(child);
        let mut cursor = Some(parent);
        while let Some(n) = cursor {
            if n == child {
                return Err(ConfigError::Cycle { parent, child });
            }
            cursor = self.node(n).parent;
        }
        if self.node(child).parent.is_some() {
            self.detach(child);
        }
        let retired = {
            let c = self.node(child);
            c.root.filter(|_| c.top_parent == Some(child))
        };
        let (root, top) = {
            let p = self.node(parent);
            (p.root, p.top_parent)
        };
        if let Some(host) = self.node_mut(parent).host.as_mut() {
            let index = index.min(host.children.len());
            host.children.insert(index, child);
            host.order_stale = true;
        }
        self.node_mut(child).parent = Some(parent);
        self.set_subtree_root(child, root, top);
        if retired.is_some() {
            self.dirty.remove_partition(retired);
        }
        self.invalidate_layout(parent);
        self.invalidate(child);
        self.invalidate_position(child);
        Ok(())
    }

    /// Moves `child` to `index` among its siblings.
    pub fn move_child(
        &mut self,
        parent: NodeId,
        child: NodeId,
        index: usize,
    ) -> Result<(), ConfigError> {
        let host = self
            .node_mut(parent)
            .host
            .as_mut()
            .ok_or(ConfigError::NotComposite(parent))?;
        let Some(from) = host.children.iter().position(|c| *c == child) else {
            return self.insert_child(parent, index, child);
        };
        host.children.remove(from);
        let index = index.min(host.children.len());
        host.children.insert(index, child);
        host.order_stale = true;
        self.invalidate_layout(parent);
        self.invalidate(parent);
        Ok(())
    }

    /// Detaches `child` from its parent. The child keeps living as a
    /// standalone node with no root.
    pub fn detach(&mut self, child: NodeId) {
        let Some(parent) = self.node(child).parent else {
            return;
        };
        if let Some(host) = self.node_mut(parent).host.as_mut() {
            host.children.retain(|c| *c != child);
            host.layout_order.retain(|c| *c != child);
            host.order_stale = true;
        }
        let node = self.node_mut(child);
        node.parent = None;
        node.imposed_width = None;
        node.imposed_height = None;
        self.set_subtree_root(child, None, None);
        self.invalidate_layout(parent);
    }

    fn set_subtree_root(&mut self, id: NodeId, root: Option<RootId>, top: Option<NodeId>) {
        let mut stack = vec![id];
        while let Some(n) = stack.pop() {
            let node = self.node_mut(n);
            let old = core::mem::replace(&mut node.root, root);
            node.top_parent = top;
            if let Some(host) = node.host.as_ref() {
                stack.extend(host.children.iter().copied());
            }
            if old != root {
                self.dirty.reassign(n, old, root);
            }
        }
    }

    /// Collects `id` and all its descendants, parents before children.
    pub(crate) fn subtree(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(n) = stack.pop() {
            out.push(n);
            if let Some(host) = self.nodes.get(n).and_then(|n| n.host.as_ref()) {
                stack.extend(host.children.iter().rev().copied());
            }
        }
        out
    }

    // --- invalidation -------------------------------------------------------

    /// Asks the host for a frame. Coalesced: at most one request reaches the
    /// host between two frames, and requests made while a frame runs are
    /// decided at the end of that frame.
    pub fn request_frame(&mut self) {
        if self.in_frame {
            return;
        }
        if self.gate.request() {
            self.requester.request_frame();
        }
    }

    pub(crate) fn mark(&mut self, id: NodeId, flag: NodeFlags, queue: Queue) {
        let node = self.node_mut(id);
        node.flags |= flag;
        let root = node.root;
        self.dirty.mark(queue, id, root);
        self.request_frame();
    }

    pub(crate) fn unmark(&mut self, id: NodeId, flag: NodeFlags, queue: Queue) {
        if let Some(node) = self.nodes.get_mut(id) {
            node.flags.remove(flag);
            let root = node.root;
            self.dirty.clear(queue, id, root);
        }
    }

    /// Marks the node for measure and draw.
    #[track_caller]
    pub fn invalidate(&mut self, id: NodeId) {
        self.mark(id, NodeFlags::INVALID, Queue::PAINT);
    }

    /// Marks the node's transform stale.
    #[track_caller]
    pub fn invalidate_position(&mut self, id: NodeId) {
        self.mark(id, NodeFlags::POSITION_INVALID, Queue::POSITION);
    }

    /// Marks a composite's layout stale. No-op for leaves.
    #[track_caller]
    pub fn invalidate_layout(&mut self, id: NodeId) {
        if self.node(id).host.is_some() {
            self.mark(id, NodeFlags::LAYOUT_INVALID, Queue::LAYOUT);
        }
    }

    /// Marks a data-bound node (and every data user) for re-parsing.
    #[track_caller]
    pub fn invalidate_data(&mut self, id: NodeId) {
        self.cascade(id, NodeFlags::DATA_INVALID, Queue::DATA);
    }

    /// Marks derived item values stale on the node and every data user.
    #[track_caller]
    pub fn invalidate_data_items(&mut self, id: NodeId) {
        self.cascade(id, NodeFlags::DATA_ITEMS_INVALID, Queue::DATA_ITEMS);
    }

    /// Marks the index window stale on the node and every data user.
    #[track_caller]
    pub fn invalidate_data_range(&mut self, id: NodeId) {
        self.cascade(id, NodeFlags::DATA_RANGE_INVALID, Queue::DATA_RANGE);
    }

    pub(crate) fn invalidate_raw_data(&mut self, id: NodeId) {
        if self.node(id).component.is_some() {
            self.mark(id, NodeFlags::RAW_DATA_INVALID, Queue::RAW_DATA);
        }
    }

    fn cascade(&mut self, id: NodeId, flag: NodeFlags, queue: Queue) {
        let mut stack = vec![id];
        while let Some(n) = stack.pop() {
            let Some(component) = self.node(n).component.as_ref() else {
                continue;
            };
            stack.extend(component.users.iter().copied());
            self.mark(n, flag, queue);
        }
    }

    // --- disablement --------------------------------------------------------

    /// Disables or re-enables a node and its subtree.
    ///
    /// Disabled nodes are skipped (and dropped from queues) by every phase;
    /// their dirty flags are kept and re-queued when they are enabled again.
    pub fn set_disabled(&mut self, id: NodeId, disabled: bool) {
        self.set_flag_state(id, NodeFlags::DISABLED, disabled);
    }

    /// Hides or shows a node for data-window reasons.
    pub fn set_internally_disabled(&mut self, id: NodeId, disabled: bool) {
        self.set_flag_state(id, NodeFlags::INTERNALLY_DISABLED, disabled);
    }

    fn set_flag_state(&mut self, id: NodeId, flag: NodeFlags, on: bool) {
        let node = self.node_mut(id);
        if node.flags.contains(flag) == on {
            return;
        }
        node.flags.set(flag, on);
        let parent = node.parent;
        if !on {
            self.requeue_subtree(id);
        }
        if let Some(parent) = parent {
            self.invalidate_layout(parent);
        }
        self.request_frame();
    }

    fn requeue_subtree(&mut self, id: NodeId) {
        for n in self.subtree(id) {
            let node = self.node(n);
            let (flags, root) = (node.flags, node.root);
            for (flag, queue) in FLAG_QUEUES {
                if flags.contains(flag) {
                    self.dirty.mark(queue, n, root);
                }
            }
        }
    }

    /// The node or an ancestor is user-disabled.
    pub(crate) fn is_disabled_tree(&self, id: NodeId) -> bool {
        self.any_ancestor(id, NodeFlags::DISABLED)
    }

    /// The node or an ancestor is disabled either way.
    pub(crate) fn is_suppressed(&self, id: NodeId) -> bool {
        self.any_ancestor(id, NodeFlags::DISABLED | NodeFlags::INTERNALLY_DISABLED)
    }

    fn any_ancestor(&self, id: NodeId, mask: NodeFlags) -> bool {
        let mut cursor = Some(id);
        while let Some(n) = cursor {
            let Some(node) = self.nodes.get(n) else {
                return true;
            };
            if node.flags.intersects(mask) {
                return true;
            }
            cursor = node.parent;
        }
        false
    }

    // --- errors -------------------------------------------------------------

    /// Records a critical error on `id`: logs it, stores it, emits
    /// [`SceneEvent::CriticalError`], and disables the node if its
    /// `disable_on_error` property is set.
    pub fn raise_critical_error(&mut self, id: NodeId, error: ValidationError) {
        tracing::error!(node = ?id, %error, "critical error");
        self.report.errors += 1;
        let message = error.to_string();
        let Some(node) = self.nodes.get_mut(id) else {
            return;
        };
        let disable = node.props.disable_on_error;
        node.last_error = Some(error);
        self.events.push(SceneEvent::CriticalError { node: id, message });
        if disable {
            self.set_disabled(id, true);
        }
    }

    // --- disposal -----------------------------------------------------------

    /// Disposes a node and its subtree.
    ///
    /// Removes it from every queue, cancels its transitions, disposes the
    /// items of a data-bound node (and their owned sprites), and unlinks it
    /// from parent, provider, users and data item. Returns `false` if the id
    /// was already stale.
    pub fn dispose(&mut self, id: NodeId) -> bool {
        let Some(node) = self.nodes.get(id) else {
            return false;
        };
        let own_root = node.root.filter(|_| node.top_parent == Some(id));
        let children = node.host.as_ref().map(|h| h.children.clone());
        for child in children.into_iter().flatten() {
            self.dispose(child);
        }

        if let Some(component) = self.node_mut(id).component.as_mut() {
            let items = core::mem::take(&mut component.items);
            let provider = component.provider.take();
            let users = core::mem::take(&mut component.users);
            for item in items {
                self.drop_item(item);
            }
            if let Some(p) = provider
                && let Some(pc) = self.nodes.get_mut(p).and_then(|n| n.component.as_mut())
            {
                pc.users.retain(|u| *u != id);
            }
            for u in users {
                if let Some(uc) = self.nodes.get_mut(u).and_then(|n| n.component.as_mut()) {
                    uc.provider = None;
                }
            }
        }

        if let Some(item) = self.node(id).data_item
            && let Some(d) = self.items.get_mut(item)
        {
            d.sprites.retain(|s| s.node != id);
        }
        self.detach(id);
        if let Some(key) = self.node_mut(id).key.take() {
            self.keys.remove(&key);
        }
        self.dirty.remove_everywhere(id);
        if own_root.is_some() {
            self.dirty.remove_partition(own_root);
        }
        self.transitions.cancel_where(|t| t.node() == Some(id));
        self.nodes.remove(id);
        self.events.push(SceneEvent::Disposed { node: id });
        true
    }

    /// Disposes a data item: it leaves its component's collection together
    /// with its raw record (later items shift down), its owned sprites are
    /// disposed, borrowed sprites are unbound. Data users following the
    /// component lose the matching item and record. Returns `false` if the id
    /// was already stale.
    pub fn dispose_data_item(&mut self, item: DataItemId) -> bool {
        let Some(d) = self.items.get(item) else {
            return false;
        };
        if let Some(component) = d.component
            && let Some(c) = self
                .nodes
                .get_mut(component)
                .and_then(|n| n.component.as_mut())
            && let Some(pos) = c.items.iter().position(|i| *i == item)
        {
            c.items.remove(pos);
            let shifted: Vec<_> = c.items[pos..].to_vec();
            for (offset, later) in shifted.into_iter().enumerate() {
                if let Some(l) = self.items.get_mut(later) {
                    l.index = Some(pos + offset);
                }
            }
            self.drop_item(item);
            self.remove_record(component, pos);
            self.invalidate_data_items(component);
        } else {
            self.drop_item(item);
        }
        true
    }

    /// Frees an item without touching its component's collection.
    pub(crate) fn drop_item(&mut self, item: DataItemId) {
        let Some(d) = self.items.remove(item) else {
            return;
        };
        self.transitions.cancel_where(|t| t.item() == Some(item));
        for sprite in d.sprites {
            if sprite.owned {
                self.dispose(sprite.node);
            } else if let Some(n) = self.nodes.get_mut(sprite.node) {
                n.data_item = None;
                self.invalidate(sprite.node);
            }
        }
    }

    // --- events and hooks -------------------------------------------------------

    /// Drains buffered events, oldest first.
    pub fn take_events(&mut self) -> Vec<SceneEvent> {
        self.events.take()
    }

    /// Number of events dropped because the buffer was full.
    #[must_use]
    pub fn dropped_events(&self) -> u64 {
        self.events.dropped()
    }

    /// Registers a frame observer.
    pub fn add_observer(&mut self, observer: Box<dyn FrameObserver>) {
        self.observers.push(observer);
    }

    /// Runs `callback` once, after the current (or next) frame has finished
    /// all phases.
    pub fn call_later(&mut self, callback: impl FnOnce(&mut Self) + 'static) {
        self.idle.push(Box::new(callback));
        self.request_frame();
    }

    /// The dirty queues, for inspection.
    #[must_use]
    pub fn dirty(&self) -> &DirtyRegistry<NodeId, RootId> {
        &self.dirty
    }
}
