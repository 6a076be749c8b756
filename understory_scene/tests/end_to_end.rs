// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Whole frames: parsing across frames, provider ordering, failure isolation,
//! observers and idle callbacks.

use core::time::Duration;
use std::cell::RefCell;
use std::rc::Rc;

use kurbo::Rect;
use understory_scene::{
    ComponentConfig, CountingRequester, DataField, DataItem, DataState, DrawContext,
    FrameObserver, HostConfig, Layout, ManualClock, MeasureContext, NodeKind, NodeProps,
    NoopRequester, Record, RecordProcessor, Scene, SceneEvent, SchedulerConfig, ValidationError,
    Visual, VisualError,
};

/// Advances the clock while processing one specific record, simulating a
/// slow record.
#[derive(Debug)]
struct SlowAt {
    clock: ManualClock,
    index: usize,
    by: Duration,
}

impl RecordProcessor for SlowAt {
    fn process(
        &self,
        index: usize,
        _record: &Record,
        _item: &mut DataItem,
    ) -> Result<(), ValidationError> {
        if index == self.index {
            self.clock.advance(self.by);
        }
        Ok(())
    }
}

#[derive(Debug)]
struct Broken;

impl Visual for Broken {
    fn measure(&mut self, cx: &MeasureContext) -> Rect {
        Rect::new(0.0, 0.0, cx.width.unwrap_or(0.0), cx.height.unwrap_or(0.0))
    }

    fn draw(&mut self, _cx: &DrawContext<'_>) -> Result<(), VisualError> {
        Err(VisualError::new("boom"))
    }
}

fn values(n: usize) -> Vec<Record> {
    (0..n).map(|i| Record::new().with("value", i as f64)).collect()
}

fn data_bound(config: ComponentConfig) -> NodeKind {
    NodeKind::DataBound(HostConfig::DEFAULT, config)
}

#[test]
fn parsing_resumes_in_the_next_frame() {
    let clock = ManualClock::new();
    let requester = CountingRequester::default();
    let mut scene = Scene::new(clock.clone(), requester.clone());

    let mut config = ComponentConfig::with_fields([DataField::value("value")]);
    config.parsing_step_duration = Duration::from_millis(10);
    config.processor = Some(Rc::new(SlowAt {
        clock: clock.clone(),
        index: 99,
        by: Duration::from_millis(20),
    }));
    let chart = scene.create_root(data_bound(config), NodeProps::sized(200.0, 100.0));
    scene.set_data(chart, values(250)).unwrap();

    let first = scene.run_frame();
    assert_eq!(first.records_parsed, 100);
    assert_eq!(first.data_yields, 1);
    assert!(first.requested_next);
    assert_eq!(scene.data_items(chart).len(), 100);
    assert_eq!(scene.parse_position(chart).unwrap(), 100);
    assert_eq!(scene.parse_progress(chart).unwrap(), 100.0 / 250.0);
    assert_eq!(scene.data_state(chart), Some(DataState::Parsing));
    assert!(
        scene
            .take_events()
            .iter()
            .any(|e| matches!(e, SceneEvent::ParseProgress { node, .. } if *node == chart))
    );

    let second = scene.run_frame();
    assert_eq!(second.records_parsed, 150);
    assert_eq!(second.data_validated, 1);
    assert_eq!(scene.data_items(chart).len(), 250);
    assert_eq!(scene.parse_position(chart).unwrap(), 0);
    assert_eq!(scene.parse_progress(chart).unwrap(), 1.0);
    assert_eq!(scene.data_state(chart), Some(DataState::Clean));

    // Items are in record order with contiguous indices.
    let field = scene.field_id(chart, "value").unwrap();
    for (i, item) in scene.data_items(chart).iter().enumerate() {
        let item = scene.data_item(*item);
        assert_eq!(item.index(), Some(i));
        assert_eq!(item.value(field), Some(i as f64));
    }
    assert!(!scene.has_pending_work());
}

#[test]
fn provider_is_parsed_before_its_user() {
    let mut scene = Scene::new(ManualClock::new(), NoopRequester);
    let root = scene.create_root(
        NodeKind::Composite(HostConfig::with_layout(Layout::Vertical)),
        NodeProps::sized(100.0, 100.0),
    );
    let fields = || ComponentConfig::with_fields([DataField::value("value")]);
    let user = scene.create_node(data_bound(fields()), NodeProps::default());
    scene.attach(root, user).unwrap();
    let provider = scene.create_node(data_bound(fields()), NodeProps::default());
    scene.attach(root, provider).unwrap();

    scene.add_data_user(provider, user).unwrap();
    scene.set_data(provider, values(3)).unwrap();
    scene.run_frame();

    let validated: Vec<_> = scene
        .take_events()
        .into_iter()
        .filter_map(|e| match e {
            SceneEvent::DataValidated { node } => Some(node),
            _ => None,
        })
        .collect();
    assert_eq!(validated, vec![provider, user]);

    assert_eq!(scene.record_count(user).unwrap(), 3);
    assert_eq!(scene.data_items(user).len(), 3);
    assert_eq!(scene.data_provider(user).unwrap(), Some(provider));
    assert_eq!(scene.data_users(provider).unwrap(), &[user]);
    let field = scene.field_id(user, "value").unwrap();
    assert_eq!(scene.summary(user, field).unwrap().sum, 3.0);
    assert_eq!(scene.data_state(user), Some(DataState::Clean));
}

#[test]
fn failing_draw_is_isolated_to_its_node() {
    let mut scene = Scene::new(ManualClock::new(), NoopRequester);
    let root = scene.create_root(
        NodeKind::Composite(HostConfig::with_layout(Layout::Vertical)),
        NodeProps::sized(100.0, 100.0),
    );
    let a = scene.create_node(NodeKind::Leaf, NodeProps::sized(100.0, 10.0));
    let b = scene.create_node_with_visual(
        NodeKind::Leaf,
        NodeProps::sized(100.0, 10.0),
        Box::new(Broken),
    );
    let c = scene.create_node(NodeKind::Leaf, NodeProps::sized(100.0, 10.0));
    for child in [a, b, c] {
        scene.attach(root, child).unwrap();
    }

    let report = scene.run_frame();
    assert_eq!(report.errors, 1);
    assert_eq!(report.nodes_painted, 3);
    assert_eq!(scene.draw_count(a), 1);
    assert_eq!(scene.draw_count(b), 0);
    assert_eq!(scene.draw_count(c), 1);

    assert!(scene.is_disabled(b));
    match scene.last_error(b) {
        Some(ValidationError::Visual(e)) => assert_eq!(e.message(), "boom"),
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(scene.take_events().contains(&SceneEvent::CriticalError {
        node: b,
        message: "draw failed: boom".into(),
    }));

    // The disabled node no longer takes space.
    assert_eq!(scene.position(c).y, 10.0);

    // And is skipped from then on.
    scene.invalidate(b);
    let report = scene.run_frame();
    assert_eq!(report.errors, 0);
    assert_eq!(scene.draw_count(b), 0);
}

#[test]
fn unparsable_record_fails_only_its_component() {
    let mut scene = Scene::new(ManualClock::new(), NoopRequester);
    let root = scene.create_root(
        NodeKind::Composite(HostConfig::DEFAULT),
        NodeProps::sized(100.0, 100.0),
    );
    let fields = || ComponentConfig::with_fields([DataField::value("value")]);
    let bad = scene.create_node(data_bound(fields()), NodeProps::default());
    let good = scene.create_node(data_bound(fields()), NodeProps::default());
    scene.attach(root, bad).unwrap();
    scene.attach(root, good).unwrap();

    scene
        .set_data(
            bad,
            [
                Record::new().with("value", 1.0),
                Record::new().with("value", "abc"),
                Record::new().with("value", 3.0),
            ],
        )
        .unwrap();
    scene.set_data(good, values(2)).unwrap();

    let report = scene.run_frame();
    assert_eq!(report.errors, 1);
    assert!(matches!(
        scene.last_error(bad),
        Some(ValidationError::Parse { index: 1, .. })
    ));
    assert!(scene.is_disabled(bad));
    assert!(!scene.is_data_invalid(bad));

    assert_eq!(scene.data_items(good).len(), 2);
    assert_eq!(scene.data_state(good), Some(DataState::Clean));
    assert!(scene.last_error(good).is_none());
}

#[derive(Debug, Default)]
struct Log(Rc<RefCell<Vec<String>>>);

impl FrameObserver for Log {
    fn frame_started(&mut self, frame: u64) {
        self.0.borrow_mut().push(format!("start {frame}"));
    }

    fn frame_ended(&mut self, frame: u64) {
        self.0.borrow_mut().push(format!("end {frame}"));
    }
}

#[test]
fn observers_and_idle_callbacks_bracket_the_frame() {
    let log = Rc::new(RefCell::new(Vec::new()));
    let mut scene = Scene::new(ManualClock::new(), NoopRequester);
    scene.add_observer(Box::new(Log(log.clone())));
    let root = scene.create_root(NodeKind::Leaf, NodeProps::sized(5.0, 5.0));

    let idle_log = log.clone();
    scene.call_later(move |scene| {
        idle_log
            .borrow_mut()
            .push(format!("idle drawn={}", scene.draw_count(root)));
    });
    scene.run_frame();

    assert_eq!(
        *log.borrow(),
        vec![
            "start 1".to_string(),
            "end 1".to_string(),
            "idle drawn=1".to_string(),
        ]
    );

    let events = scene.take_events();
    assert_eq!(events.first(), Some(&SceneEvent::FrameStarted { frame: 1 }));
    assert_eq!(events.last(), Some(&SceneEvent::FrameEnded { frame: 1 }));
}

#[test]
fn frame_requests_are_coalesced() {
    let requester = CountingRequester::default();
    let mut scene = Scene::new(ManualClock::new(), requester.clone());
    let root = scene.create_root(
        NodeKind::Composite(HostConfig::with_layout(Layout::Horizontal)),
        NodeProps::sized(100.0, 20.0),
    );
    for _ in 0..10 {
        let child = scene.create_node(NodeKind::Leaf, NodeProps::sized(5.0, 5.0));
        scene.attach(root, child).unwrap();
    }
    assert_eq!(requester.count(), 1);

    let report = scene.run_frame();
    assert!(!report.requested_next);
    assert_eq!(requester.count(), 1);

    // Requests made from an idle callback schedule exactly one more frame.
    scene.call_later(move |scene| {
        scene.invalidate(root);
        scene.invalidate_layout(root);
    });
    assert_eq!(requester.count(), 2);
    let report = scene.run_frame();
    assert!(report.requested_next);
    assert_eq!(requester.count(), 3);
}

#[test]
fn undrained_events_are_bounded() {
    let config = SchedulerConfig {
        event_capacity: 8,
        ..SchedulerConfig::DEFAULT
    };
    let mut scene = Scene::with_config(ManualClock::new(), NoopRequester, config);
    scene.create_root(NodeKind::Leaf, NodeProps::sized(5.0, 5.0));
    for _ in 0..1000 {
        scene.run_frame();
    }

    assert!(scene.dropped_events() > 0);
    let events = scene.take_events();
    assert_eq!(events.len(), 8);
    assert_eq!(events.first(), Some(&SceneEvent::FrameStarted { frame: 997 }));
    assert_eq!(events.last(), Some(&SceneEvent::FrameEnded { frame: 1000 }));
    assert!(scene.take_events().is_empty());
}
