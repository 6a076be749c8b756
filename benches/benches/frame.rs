// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use criterion::{BatchSize, Criterion, black_box, criterion_group, criterion_main};
use understory_scene::{
    BoxVisual, ComponentConfig, DataField, DataItem, HostConfig, Layout, ManualClock, NodeKind,
    NodeProps, NoopRequester, Record, Scene, Visual,
};

fn bar(_item: &DataItem) -> (NodeProps, Box<dyn Visual>) {
    (NodeProps::sized(4.0, 20.0), Box::new(BoxVisual))
}

fn records(n: usize) -> Vec<Record> {
    (0..n)
        .map(|i| {
            Record::new()
                .with("category", format!("c{i}"))
                .with("value", (i % 97) as f64)
        })
        .collect()
}

fn data_scene(n: usize, sprites: bool) -> (Scene, understory_scene::NodeId) {
    let mut scene = Scene::new(ManualClock::new(), NoopRequester);
    let mut config = ComponentConfig::with_fields([
        DataField::category("category"),
        DataField::value("value"),
    ]);
    if sprites {
        config.sprite_factory = Some(bar);
    }
    let chart = scene.create_root(
        NodeKind::DataBound(HostConfig::with_layout(Layout::Horizontal), config),
        NodeProps::sized(4_000.0, 400.0),
    );
    let _ = scene.set_data(chart, records(n));
    (scene, chart)
}

fn grid_scene(n: usize) -> Scene {
    let mut scene = Scene::new(ManualClock::new(), NoopRequester);
    let root = scene.create_root(
        NodeKind::Composite(HostConfig::with_layout(Layout::Grid)),
        NodeProps::sized(800.0, 600.0),
    );
    for i in 0..n {
        let child = scene.create_node(
            NodeKind::Leaf,
            NodeProps::sized(20.0 + (i % 7) as f64 * 10.0, 16.0),
        );
        let _ = scene.attach(root, child);
    }
    scene
}

fn bench_frame(c: &mut Criterion) {
    let mut group = c.benchmark_group("understory_scene");
    group.sample_size(20);

    for &n in &[1_000_usize, 10_000] {
        group.bench_function(format!("parse(n={n})"), |b| {
            b.iter_batched(
                || data_scene(n, false),
                |(mut scene, _)| black_box(scene.run_frame()),
                BatchSize::LargeInput,
            );
        });

        group.bench_function(format!("parse_with_sprites(n={n})"), |b| {
            b.iter_batched(
                || data_scene(n, true),
                |(mut scene, _)| black_box(scene.run_frame()),
                BatchSize::LargeInput,
            );
        });

        group.bench_function(format!("append_and_evict(n={n})"), |b| {
            b.iter_batched(
                || {
                    let (mut scene, chart) = data_scene(n, true);
                    scene.run_frame();
                    (scene, chart)
                },
                |(mut scene, chart)| {
                    let _ = scene.add_data(chart, records(n / 10), n / 10);
                    black_box(scene.run_frame())
                },
                BatchSize::LargeInput,
            );
        });
    }

    for &n in &[100_usize, 1_000] {
        group.bench_function(format!("grid_layout(n={n})"), |b| {
            b.iter_batched(
                || grid_scene(n),
                |mut scene| black_box(scene.run_frame()),
                BatchSize::LargeInput,
            );
        });
    }

    group.finish();
}

criterion_group!(benches, bench_frame);
criterion_main!(benches);
