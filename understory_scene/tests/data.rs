// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Data-bound nodes: zoom windows, value changes, incremental edits, derived
//! values and rejected calls.

use core::time::Duration;

use understory_scene::{
    BoxVisual, ComponentConfig, ConfigError, DataField, DataItem, DataState, HostConfig, Layout,
    ManualClock, NodeId, NodeKind, NodeProps, NoopRequester, RawValue, Record, Scene, SceneEvent,
    TransitionTarget, Visual, ZoomLimits, ZoomOptions, ZoomRange,
};

fn bar(_item: &DataItem) -> (NodeProps, Box<dyn Visual>) {
    (NodeProps::sized(2.0, 10.0), Box::new(BoxVisual))
}

fn values(vs: impl IntoIterator<Item = f64>) -> Vec<Record> {
    vs.into_iter()
        .map(|v| Record::new().with("value", v))
        .collect()
}

fn chart(scene: &mut Scene, config: ComponentConfig) -> NodeId {
    scene.create_root(
        NodeKind::DataBound(HostConfig::with_layout(Layout::Horizontal), config),
        NodeProps::sized(300.0, 100.0),
    )
}

fn zoomable() -> ComponentConfig {
    ComponentConfig {
        zoom: ZoomLimits {
            max_zoom_factor: 10.0,
            ..ZoomLimits::DEFAULT
        },
        ..ComponentConfig::with_fields([DataField::value("value")])
    }
}

fn sprite_of(scene: &Scene, chart: NodeId, index: usize) -> NodeId {
    let item = scene.data_items(chart)[index];
    scene.data_item(item).sprites()[0].node
}

#[test]
fn zoom_is_clamped_and_hides_items_outside_the_window() {
    let mut scene = Scene::new(ManualClock::new(), NoopRequester);
    let config = ComponentConfig {
        sprite_factory: Some(bar),
        ..zoomable()
    };
    let chart = chart(&mut scene, config);
    scene.set_data(chart, values((0_u8..100).map(f64::from))).unwrap();
    scene.run_frame();
    assert_eq!(scene.children(chart).len(), 100);
    assert_eq!(scene.index_window(chart).unwrap(), (0, 100));
    scene.take_events();

    let window = scene
        .zoom(chart, ZoomRange::new(0.0, 0.05), ZoomOptions::default())
        .unwrap();
    assert_eq!(window, ZoomRange::new(0.0, 0.1));
    assert_eq!(scene.data_state(chart), Some(DataState::DataRangeDirty));

    let report = scene.run_frame();
    assert_eq!(report.ranges_validated, 1);
    assert_eq!(scene.index_window(chart).unwrap(), (0, 10));
    assert!(!scene.is_internally_disabled(sprite_of(&scene, chart, 5)));
    assert!(scene.is_internally_disabled(sprite_of(&scene, chart, 50)));
    assert!(scene.take_events().contains(&SceneEvent::RangeChanged {
        node: chart,
        start_index: 0,
        end_index: 10,
    }));

    // Hidden sprites no longer take part in layout.
    scene
        .zoom(chart, ZoomRange::new(0.5, 1.0), ZoomOptions::default())
        .unwrap();
    scene.run_frame();
    assert_eq!(scene.index_window(chart).unwrap(), (50, 100));
    assert!(scene.is_internally_disabled(sprite_of(&scene, chart, 5)));
    assert_eq!(scene.position(sprite_of(&scene, chart, 50)).x, 0.0);
    assert_eq!(scene.position(sprite_of(&scene, chart, 99)).x, 98.0);
}

#[test]
fn range_event_can_be_skipped() {
    let mut scene = Scene::new(ManualClock::new(), NoopRequester);
    let chart = chart(&mut scene, zoomable());
    scene.set_data(chart, values((0_u8..100).map(f64::from))).unwrap();
    scene.run_frame();
    scene.take_events();

    let options = ZoomOptions {
        skip_range_event: true,
        ..ZoomOptions::default()
    };
    scene.zoom(chart, ZoomRange::new(0.5, 1.0), options).unwrap();
    scene.run_frame();
    assert_eq!(scene.index_window(chart).unwrap(), (50, 100));
    assert!(
        !scene
            .take_events()
            .iter()
            .any(|e| matches!(e, SceneEvent::RangeChanged { .. }))
    );
}

#[test]
fn animated_zoom_is_not_restarted_by_an_equivalent_request() {
    let clock = ManualClock::new();
    let mut scene = Scene::new(clock.clone(), NoopRequester);
    let config = ComponentConfig {
        range_change_duration: Duration::from_millis(100),
        ..zoomable()
    };
    let chart = chart(&mut scene, config);
    scene.set_data(chart, values((0_u8..100).map(f64::from))).unwrap();
    scene.run_frame();
    scene.take_events();

    let target = ZoomRange::new(0.5, 1.0);
    scene.zoom(chart, target, ZoomOptions::default()).unwrap();
    assert!(scene.is_animating(TransitionTarget::ZoomStart(chart)));
    clock.advance(Duration::from_millis(30));
    scene.zoom(chart, target, ZoomOptions::default()).unwrap();
    let started = scene
        .take_events()
        .iter()
        .filter(|e| matches!(e, SceneEvent::RangeChangeStarted { .. }))
        .count();
    assert_eq!(started, 1);

    // The original transition keeps its start time.
    clock.advance(Duration::from_millis(20));
    scene.run_frame();
    let midway = scene.zoom_range(chart).unwrap();
    assert!((midway.start - 0.25).abs() < 1e-9, "{midway:?}");

    clock.advance(Duration::from_millis(60));
    scene.run_frame();
    assert_eq!(scene.zoom_range(chart).unwrap(), target);
    assert!(!scene.is_animating(TransitionTarget::ZoomStart(chart)));
    assert!(
        scene
            .take_events()
            .contains(&SceneEvent::RangeChangeEnded { node: chart })
    );

    scene.run_frame();
    assert_eq!(scene.index_window(chart).unwrap(), (50, 100));
}

#[test]
fn value_changes_animate_the_working_value() {
    let clock = ManualClock::new();
    let mut scene = Scene::new(clock.clone(), NoopRequester);
    let config = ComponentConfig {
        interpolation_duration: Duration::from_millis(100),
        ..ComponentConfig::with_fields([DataField::value("value")])
    };
    let chart = chart(&mut scene, config);
    scene.set_data(chart, values([10.0, 20.0])).unwrap();
    scene.run_frame();
    scene.take_events();

    let field = scene.field_id(chart, "value").unwrap();
    let item = scene.data_items(chart)[0];
    scene.set_value(item, field, Some(30.0), None);
    assert_eq!(scene.data_item(item).value(field), Some(30.0));
    assert_eq!(scene.data_item(item).working_value(field), Some(10.0));
    assert_eq!(
        scene.take_events(),
        vec![SceneEvent::ValueChanged {
            item,
            field,
            old: Some(10.0),
            new: Some(30.0),
        }]
    );

    clock.advance(Duration::from_millis(50));
    scene.run_frame();
    let working = scene.data_item(item).working_value(field).unwrap();
    assert!((working - 20.0).abs() < 1e-9, "{working}");
    // Summaries follow the target value, not the displayed one.
    assert_eq!(scene.summary(chart, field).unwrap().sum, 50.0);

    clock.advance(Duration::from_millis(50));
    scene.run_frame();
    assert_eq!(scene.data_item(item).working_value(field), Some(30.0));
    assert!(!scene.is_animating(TransitionTarget::WorkingValue(item, field)));

    // An explicit zero duration applies at once.
    scene.set_value(item, field, Some(5.0), Some(Duration::ZERO));
    assert_eq!(scene.data_item(item).working_value(field), Some(5.0));
}

#[test]
fn appended_records_evict_the_oldest_and_reach_users() {
    let mut scene = Scene::new(ManualClock::new(), NoopRequester);
    let root = scene.create_root(
        NodeKind::Composite(HostConfig::DEFAULT),
        NodeProps::sized(100.0, 100.0),
    );
    let fields = || ComponentConfig::with_fields([DataField::value("value")]);
    let provider = scene.create_node(
        NodeKind::DataBound(HostConfig::DEFAULT, fields()),
        NodeProps::default(),
    );
    let user = scene.create_node(
        NodeKind::DataBound(HostConfig::DEFAULT, fields()),
        NodeProps::default(),
    );
    scene.attach(root, provider).unwrap();
    scene.attach(root, user).unwrap();
    scene.add_data_user(provider, user).unwrap();
    scene.set_data(provider, values([0.0, 1.0, 2.0])).unwrap();
    scene.run_frame();
    let kept = scene.data_items(provider)[1];

    scene.add_data(provider, values([3.0, 4.0]), 1).unwrap();
    // Surviving items are reindexed immediately.
    assert_eq!(scene.data_item(kept).index(), Some(0));

    let report = scene.run_frame();
    assert_eq!(report.records_parsed, 4);
    for node in [provider, user] {
        let field = scene.field_id(node, "value").unwrap();
        assert_eq!(scene.record_count(node).unwrap(), 4);
        let items = scene.data_items(node);
        assert_eq!(items.len(), 4);
        for (i, item) in items.iter().enumerate() {
            let item = scene.data_item(*item);
            assert_eq!(item.index(), Some(i));
            assert_eq!(item.value(field), Some(i as f64 + 1.0));
        }
        assert_eq!(scene.summary(node, field).unwrap().sum, 10.0);
    }
    assert_eq!(scene.data_items(provider)[0], kept);
}

#[test]
fn updated_records_are_resynced_in_place() {
    let mut scene = Scene::new(ManualClock::new(), NoopRequester);
    let chart = chart(
        &mut scene,
        ComponentConfig::with_fields([DataField::value("value")]),
    );
    scene.set_data(chart, values([0.0, 1.0, 2.0])).unwrap();
    scene.run_frame();
    let before = scene.data_items(chart).to_vec();

    scene
        .update_record(chart, 1, Record::new().with("value", 10.0))
        .unwrap();
    let report = scene.run_frame();
    assert_eq!(report.raw_data_validated, 1);
    assert_eq!(report.records_parsed, 0);
    assert_eq!(scene.data_items(chart), before.as_slice());

    let field = scene.field_id(chart, "value").unwrap();
    let item = scene.data_item(before[1]);
    assert_eq!(item.value(field), Some(10.0));
    assert_eq!(
        item.record().and_then(|r| r.get("value")),
        Some(&RawValue::Number(10.0))
    );
    assert_eq!(scene.summary(chart, field).unwrap().sum, 12.0);

    assert_eq!(
        scene.update_record(chart, 3, Record::new()),
        Err(ConfigError::RecordOutOfRange { index: 3, len: 3 })
    );
}

#[test]
fn derived_values_compare_with_the_previous_item() {
    let mut scene = Scene::new(ManualClock::new(), NoopRequester);
    let chart = chart(
        &mut scene,
        ComponentConfig::with_fields([DataField::category("name"), DataField::value("value")]),
    );
    let records = [10.0, 15.0, 0.0, 5.0]
        .into_iter()
        .enumerate()
        .map(|(i, v)| Record::new().with("name", format!("n{i}")).with("value", v));
    scene.set_data(chart, records).unwrap();
    scene.run_frame();

    let name = scene.field_id(chart, "name").unwrap();
    let value = scene.field_id(chart, "value").unwrap();
    let items = scene.data_items(chart).to_vec();
    let calc = |i: usize| scene.data_item(items[i]).field(value).unwrap().calculated;

    assert_eq!(scene.data_item(items[2]).category(name), Some("n2"));
    assert_eq!(calc(0).change, None);
    assert_eq!(calc(1).change, Some(5.0));
    assert_eq!(calc(1).change_percent, Some(50.0));
    assert_eq!(calc(2).change, Some(-15.0));
    assert_eq!(calc(2).change_percent, Some(-100.0));
    // No percentage change from zero.
    assert_eq!(calc(3).change, Some(5.0));
    assert_eq!(calc(3).change_percent, None);
    assert_eq!(calc(1).percent, Some(50.0));

    let summary = scene.summary(chart, value).unwrap();
    assert_eq!(summary.count, 4);
    assert_eq!(summary.min, Some(0.0));
    assert_eq!(summary.max, Some(15.0));
    assert_eq!(summary.average, Some(7.5));
}

#[test]
fn unusable_arguments_are_rejected() {
    let mut scene = Scene::new(ManualClock::new(), NoopRequester);
    let fields = || ComponentConfig::with_fields([DataField::value("value")]);
    let a = chart(&mut scene, fields());
    let b = chart(&mut scene, fields());
    let leaf = scene.create_node(NodeKind::Leaf, NodeProps::default());

    assert_eq!(
        scene.field_id(a, "missing"),
        Err(ConfigError::UnknownField("missing".into()))
    );
    assert_eq!(
        scene.add_data_user(a, a),
        Err(ConfigError::ProviderCycle { provider: a, user: a })
    );
    scene.add_data_user(a, b).unwrap();
    assert_eq!(
        scene.add_data_user(b, a),
        Err(ConfigError::ProviderCycle { provider: b, user: a })
    );
    assert!(matches!(
        scene.zoom(a, ZoomRange::new(0.8, 0.2), ZoomOptions::default()),
        Err(ConfigError::InvalidZoomRange { .. })
    ));
    assert!(matches!(
        scene.zoom(a, ZoomRange::new(f64::NAN, 1.0), ZoomOptions::default()),
        Err(ConfigError::InvalidZoomRange { .. })
    ));
    assert_eq!(
        scene.set_data(leaf, values([1.0])),
        Err(ConfigError::NotDataBound(leaf))
    );
    assert_eq!(scene.data_state(leaf), None);
    assert!(scene.data_items(leaf).is_empty());
}
