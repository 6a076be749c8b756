// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use criterion::{BatchSize, Criterion, black_box, criterion_group, criterion_main};
use understory_dirty::{DirtyRegistry, Queue};

#[derive(Clone)]
struct Lcg(u64);

impl Lcg {
    fn new(seed: u64) -> Self {
        Self(seed)
    }

    fn next_u32(&mut self) -> u32 {
        // Numerical Recipes LCG parameters.
        self.0 = self.0.wrapping_mul(6364136223846793005).wrapping_add(1);
        (self.0 >> 32) as u32
    }
}

/// `n` keys spread over `roots` partitions, each marked in every queue.
fn build_registry(n: u32, roots: u32, seed: u64) -> DirtyRegistry<u32, u32> {
    let mut registry = DirtyRegistry::new();
    let mut rng = Lcg::new(seed);
    for key in 0..n {
        let root = Some(rng.next_u32() % roots);
        for queue in Queue::ALL {
            registry.mark(queue, key, root);
        }
    }
    registry
}

fn bench_dirty(c: &mut Criterion) {
    let mut group = c.benchmark_group("understory_dirty");
    group.sample_size(50);

    for &(n, roots) in &[(256_u32, 1_u32), (4_096_u32, 1_u32), (4_096_u32, 16_u32)] {
        group.bench_function(format!("mark_repeated(n={n},roots={roots})"), |b| {
            b.iter_batched(
                DirtyRegistry::<u32, u32>::new,
                |mut registry| {
                    // Every key is marked four times; only the first sticks.
                    for i in 0..n * 4 {
                        let key = i % n;
                        registry.mark(Queue::PAINT, key, Some(key % roots));
                    }
                    black_box(registry);
                },
                BatchSize::LargeInput,
            );
        });

        group.bench_function(format!("fifo_drain(n={n},roots={roots})"), |b| {
            b.iter_batched(
                || build_registry(n, roots, 0xD1A7_0000_0000_0001),
                |mut registry| {
                    let mut sum = 0_u64;
                    for root in registry.root_list() {
                        while let Some(key) = registry.first(Queue::DATA, root) {
                            registry.clear(Queue::DATA, key, root);
                            sum += u64::from(key);
                        }
                    }
                    black_box(sum);
                },
                BatchSize::LargeInput,
            );
        });

        group.bench_function(format!("lifo_drain(n={n},roots={roots})"), |b| {
            b.iter_batched(
                || build_registry(n, roots, 0xD1A7_0000_0000_0002),
                |mut registry| {
                    let mut sum = 0_u64;
                    for root in registry.root_list() {
                        while let Some(key) = registry.pop_last(Queue::LAYOUT, root) {
                            sum += u64::from(key);
                        }
                    }
                    black_box(sum);
                },
                BatchSize::LargeInput,
            );
        });

        group.bench_function(format!("remove_everywhere(n={n},roots={roots})"), |b| {
            b.iter_batched(
                || build_registry(n, roots, 0xD1A7_0000_0000_0003),
                |mut registry| {
                    for key in (0..n).step_by(3) {
                        black_box(registry.remove_everywhere(key));
                    }
                    black_box(registry);
                },
                BatchSize::LargeInput,
            );
        });

        // Moving a subtree between roots moves every membership.
        group.bench_function(format!("reassign(n={n},roots={roots})"), |b| {
            b.iter_batched(
                || build_registry(n, 1, 0xD1A7_0000_0000_0004),
                |mut registry| {
                    for key in 0..n {
                        registry.reassign(key, Some(0), Some(1 + key % roots));
                    }
                    black_box(registry);
                },
                BatchSize::LargeInput,
            );
        });
    }

    group.finish();
}

criterion_group!(benches, bench_dirty);
criterion_main!(benches);
