//! World hot-path benchmarks: object churn, transform propagation and
//! batch component dispatch.

use std::any::Any;
use std::hint::black_box;

use criterion::{criterion_group, criterion_main, Criterion};
use glam::Vec3;
use northlight_world::{
    Component, ObjectDesc, Transform, UpdateDesc, World, WorldConfig,
};

struct Body {
    velocity: Vec3,
    position: Vec3,
}

impl Component for Body {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

fn bench_object_churn(c: &mut Criterion) {
    c.bench_function("create_destroy_1k_objects", |b| {
        b.iter(|| {
            let mut world = World::new(WorldConfig::default()).unwrap();
            let ids: Vec<_> = (0..1_000)
                .map(|_| world.create_object(&ObjectDesc::default()))
                .collect();
            for id in ids {
                world.destroy_object(id);
            }
            world.tick(0.016);
            black_box(world.object_count());
        });
    });
}

fn propagation_world(workers: usize) -> (World, northlight_world::ObjectId) {
    let config = WorldConfig {
        worker_threads: workers,
        ..WorldConfig::default()
    };
    let mut world = World::new(config).unwrap();
    let root = world.create_object(&ObjectDesc::default());
    for _ in 0..10_000 {
        world.create_object(&ObjectDesc {
            parent: Some(root),
            local: Transform::from_position(Vec3::X),
            ..ObjectDesc::default()
        });
    }
    (world, root)
}

fn bench_propagation(c: &mut Criterion) {
    let mut group = c.benchmark_group("propagate_10k_dynamic");
    for workers in [0, 4] {
        let (mut world, root) = propagation_world(workers);
        let mut offset = 0.0f32;
        group.bench_function(format!("workers_{workers}"), |b| {
            b.iter(|| {
                // Move the root so every child actually recomputes.
                offset += 1.0;
                world.set_local_transform(root, Transform::from_position(Vec3::new(offset, 0.0, 0.0)));
                world.tick(0.016);
            });
        });
    }
    group.finish();
}

fn bench_batch_update(c: &mut Criterion) {
    let mut group = c.benchmark_group("integrate_10k_bodies");
    for (label, workers, granularity) in [("single_task", 0, 0), ("split_512", 4, 512)] {
        let config = WorldConfig {
            worker_threads: workers,
            ..WorldConfig::default()
        };
        let mut world = World::new(config).unwrap();
        world
            .register_component_update::<Body>(
                UpdateDesc::new("integrate", "simulation").with_granularity(granularity),
                |entries, ctx| {
                    for entry in entries {
                        let velocity = entry.component.velocity;
                        entry.component.position += velocity * ctx.delta;
                    }
                },
            )
            .unwrap();
        for _ in 0..10_000 {
            let object = world.create_object(&ObjectDesc::default());
            world
                .attach_component(
                    object,
                    Body {
                        velocity: Vec3::X,
                        position: Vec3::ZERO,
                    },
                )
                .unwrap();
        }
        // Drain initialization before measuring dispatch.
        for _ in 0..1_000 {
            world.tick(0.016);
            if world.init_batch_finished(world.default_init_batch()) {
                break;
            }
        }

        group.bench_function(label, |b| {
            b.iter(|| world.tick(black_box(0.016)));
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_object_churn,
    bench_propagation,
    bench_batch_update
);
criterion_main!(benches);
