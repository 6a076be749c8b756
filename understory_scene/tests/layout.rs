// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Composite layout driven through whole frames.

use kurbo::Point;
use understory_scene::{
    Align, Dimension, Edges, HookFn, HostConfig, Layout, ManualClock, NodeId, NodeKind, NodeProps,
    NoopRequester, NumericProperty, PropertyHook, Scene, SceneEvent, Valign,
};

fn scene() -> Scene {
    Scene::new(ManualClock::new(), NoopRequester)
}

fn close(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

/// A padded vertical stack with two children, the first with a top margin.
fn stack(scene: &mut Scene) -> (NodeId, NodeId, NodeId) {
    let root = scene.create_root(
        NodeKind::Composite(HostConfig::with_layout(Layout::Vertical)),
        NodeProps {
            padding: Edges::uniform(5.0),
            ..NodeProps::sized(100.0, 200.0)
        },
    );
    let a = scene.create_node(
        NodeKind::Leaf,
        NodeProps {
            margin: Edges {
                top: 3.0,
                ..Edges::default()
            },
            ..NodeProps::sized(50.0, 20.0)
        },
    );
    let b = scene.create_node(NodeKind::Leaf, NodeProps::sized(50.0, 30.0));
    scene.attach(root, a).unwrap();
    scene.attach(root, b).unwrap();
    (root, a, b)
}

#[test]
fn vertical_stack_respects_padding_and_margins() {
    let mut scene = scene();
    let (root, a, b) = stack(&mut scene);
    let report = scene.run_frame();
    assert_eq!(report.layouts_validated, 1);

    assert_eq!(scene.position(a), Point::new(5.0, 8.0));
    assert_eq!(scene.position(b), Point::new(5.0, 28.0));
    assert_eq!(scene.bounds(root).width(), 100.0);
    assert_eq!(scene.bounds(root).height(), 200.0);
    assert_eq!(
        scene.transform(b).translation(),
        Point::new(5.0, 28.0).to_vec2()
    );
}

#[test]
fn layout_is_idempotent() {
    let mut scene = scene();
    let (root, a, b) = stack(&mut scene);
    scene.run_frame();
    let before = (scene.position(a), scene.position(b));

    let report = scene.run_frame();
    assert_eq!(report.layouts_validated, 0);

    scene.invalidate_layout(root);
    let report = scene.run_frame();
    assert_eq!(report.layouts_validated, 1);
    assert_eq!(report.positions_validated, 0);
    assert_eq!((scene.position(a), scene.position(b)), before);
}

#[test]
fn resizing_a_child_moves_its_siblings() {
    let mut scene = scene();
    let (_, a, b) = stack(&mut scene);
    scene.run_frame();
    scene.take_events();

    scene.set_props(a, |p| p.height = Some(Dimension::Px(40.0)));
    scene.run_frame();
    assert_eq!(scene.bounds(a).height(), 40.0);
    assert_eq!(scene.position(b), Point::new(5.0, 48.0));
    assert!(
        scene
            .take_events()
            .contains(&SceneEvent::SizeChanged { node: a })
    );
}

#[test]
fn disabled_children_leave_the_stack() {
    let mut scene = scene();
    let (_, a, b) = stack(&mut scene);
    scene.run_frame();

    scene.set_disabled(a, true);
    scene.run_frame();
    assert_eq!(scene.position(b), Point::new(5.0, 5.0));

    scene.set_disabled(a, false);
    scene.run_frame();
    assert_eq!(scene.position(b), Point::new(5.0, 28.0));
}

#[test]
fn percent_widths_share_the_space_left_by_fixed_children() {
    let mut scene = scene();
    let root = scene.create_root(
        NodeKind::Composite(HostConfig::with_layout(Layout::Horizontal)),
        NodeProps::sized(200.0, 50.0),
    );
    let fixed = scene.create_node(NodeKind::Leaf, NodeProps::sized(50.0, 10.0));
    let relative = |pct| NodeProps {
        width: Some(Dimension::Percent(pct)),
        height: Some(Dimension::Px(10.0)),
        ..NodeProps::default()
    };
    let wide = scene.create_node(NodeKind::Leaf, relative(100.0));
    let narrow = scene.create_node(NodeKind::Leaf, relative(50.0));
    for child in [wide, fixed, narrow] {
        scene.attach(root, child).unwrap();
    }
    scene.run_frame();

    // Fixed children are measured first.
    assert_eq!(scene.layout_order(root), &[fixed, wide, narrow]);

    // 150% in total is scaled down to the 150px left over.
    assert!(close(scene.bounds(wide).width(), 100.0));
    assert!(close(scene.bounds(narrow).width(), 50.0));
    assert!(close(scene.position(fixed).x, 100.0));
    assert!(close(scene.position(narrow).x, 150.0));
}

#[test]
fn overflowing_grid_replans_once() {
    let mut scene = scene();
    let root = scene.create_root(
        NodeKind::Composite(HostConfig {
            max_columns: 3,
            ..HostConfig::with_layout(Layout::Grid)
        }),
        NodeProps::sized(250.0, 100.0),
    );
    let children: Vec<_> = [50.0, 100.0, 100.0, 100.0, 50.0, 50.0]
        .into_iter()
        .map(|w| {
            let child = scene.create_node(NodeKind::Leaf, NodeProps::sized(w, 10.0));
            scene.attach(root, child).unwrap();
            child
        })
        .collect();
    scene.run_frame();

    assert_eq!(scene.grid_replans(root), 1);
    assert_eq!(scene.position(children[0]), Point::new(0.0, 0.0));
    assert_eq!(scene.position(children[1]), Point::new(100.0, 0.0));
    assert_eq!(scene.position(children[2]), Point::new(0.0, 10.0));
    assert_eq!(scene.position(children[4]), Point::new(0.0, 20.0));
}

#[test]
fn absolute_children_align_inside_the_parent() {
    let mut scene = scene();
    let root = scene.create_root(
        NodeKind::Composite(HostConfig::with_layout(Layout::Absolute)),
        NodeProps::sized(100.0, 100.0),
    );
    let aligned = scene.create_node(
        NodeKind::Leaf,
        NodeProps {
            align: Align::Center,
            valign: Valign::Bottom,
            ..NodeProps::sized(20.0, 10.0)
        },
    );
    let loose = scene.create_node(
        NodeKind::Leaf,
        NodeProps {
            x: Dimension::Px(30.0),
            is_measured: false,
            ..NodeProps::sized(5.0, 5.0)
        },
    );
    scene.attach(root, aligned).unwrap();
    scene.attach(root, loose).unwrap();
    scene.run_frame();

    assert_eq!(scene.position(aligned), Point::new(40.0, 90.0));
    assert_eq!(scene.position(loose), Point::new(30.0, 0.0));
}

#[test]
fn content_block_is_centered_vertically() {
    let mut scene = scene();
    let root = scene.create_root(
        NodeKind::Composite(HostConfig {
            content_valign: Valign::Middle,
            ..HostConfig::with_layout(Layout::Vertical)
        }),
        NodeProps::sized(100.0, 100.0),
    );
    let a = scene.create_node(NodeKind::Leaf, NodeProps::sized(10.0, 10.0));
    let b = scene.create_node(NodeKind::Leaf, NodeProps::sized(10.0, 10.0));
    scene.attach(root, a).unwrap();
    scene.attach(root, b).unwrap();
    scene.run_frame();

    assert_eq!(scene.position(a), Point::new(0.0, 40.0));
    assert_eq!(scene.position(b), Point::new(0.0, 50.0));
}

#[test]
fn rotation_turns_the_bounds() {
    let mut scene = scene();
    let leaf = scene.create_root(
        NodeKind::Leaf,
        NodeProps {
            rotation: 90.0,
            ..NodeProps::sized(10.0, 20.0)
        },
    );
    scene.run_frame();
    let bounds = scene.bounds(leaf);
    assert!(close(bounds.width(), 20.0));
    assert!(close(bounds.height(), 10.0));
}

#[test]
fn hooks_adjust_resolved_sizes() {
    let mut scene = scene();
    let leaf = scene.create_root(NodeKind::Leaf, NodeProps::sized(10.0, 10.0));
    scene.add_hook(
        leaf,
        PropertyHook::new(NumericProperty::Width, HookFn::Scale(2.0)),
    );
    scene.add_hook(
        leaf,
        PropertyHook::new(NumericProperty::Width, HookFn::Offset(1.0)),
    );
    scene.run_frame();
    assert_eq!(scene.bounds(leaf).width(), 21.0);

    scene.clear_hooks(leaf);
    scene.run_frame();
    assert_eq!(scene.bounds(leaf).width(), 10.0);
}
