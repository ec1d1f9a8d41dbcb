#![allow(dead_code)]

use archetype_ecs::migration::ComponentData;
use archetype_ecs::pool::{PoolConfig, StorageStrategy};
use archetype_ecs::{ComponentMask, World};
use criterion::{black_box, criterion_group, criterion_main, Criterion};

#[derive(Debug, Clone, Copy)]
struct Position(f32, f32, f32);

#[derive(Debug, Clone, Copy)]
struct Velocity(f32, f32, f32);

#[derive(Debug, Clone, Copy)]
struct Health(u32);

archetype_ecs::define_components! { Position, Velocity, Health }

fn spawn_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("spawn_bench");

    group.bench_function("archetype_spawn_2_components", |b| {
        b.iter(|| {
            let mut world = World::init();
            world
                .declare_pool(PoolConfig::new(
                    "movers",
                    ComponentMask::of::<Position>().union(ComponentMask::of::<Velocity>()),
                    StorageStrategy::Archetype,
                ))
                .unwrap();
            let mut pool = world.get_pool("movers").unwrap();
            for _ in 0..1000 {
                black_box(
                    pool.create(vec![
                        (Position::BIT, ComponentData::new(Position(1.0, 2.0, 3.0))),
                        (Velocity::BIT, ComponentData::new(Velocity(1.0, 0.0, 0.0))),
                    ])
                    .unwrap(),
                );
            }
        });
    });

    group.bench_function("archetype_spawn_mixed_archetypes", |b| {
        b.iter(|| {
            let mut world = World::init();
            world
                .declare_pool(
                    PoolConfig::new("movers", ComponentMask::of::<Position>().union(ComponentMask::of::<Velocity>()), StorageStrategy::Archetype)
                        .with_optional(ComponentMask::of::<Health>()),
                )
                .unwrap();
            let mut pool = world.get_pool("movers").unwrap();
            for i in 0..1000 {
                if i % 2 == 0 {
                    black_box(
                        pool.create(vec![
                            (Position::BIT, ComponentData::new(Position(1.0, 2.0, 3.0))),
                            (Velocity::BIT, ComponentData::new(Velocity(1.0, 0.0, 0.0))),
                        ])
                        .unwrap(),
                    );
                } else {
                    black_box(
                        pool.create(vec![
                            (Position::BIT, ComponentData::new(Position(1.0, 2.0, 3.0))),
                            (Velocity::BIT, ComponentData::new(Velocity(1.0, 0.0, 0.0))),
                            (Health::BIT, ComponentData::new(Health(100))),
                        ])
                        .unwrap(),
                    );
                }
            }
        });
    });

    group.bench_function("sparse_spawn_2_components", |b| {
        b.iter(|| {
            let mut world = World::init();
            world
                .declare_pool(
                    PoolConfig::new("general", ComponentMask::of::<Position>(), StorageStrategy::Sparse)
                        .with_optional(ComponentMask::of::<Velocity>()),
                )
                .unwrap();
            let mut pool = world.get_pool("general").unwrap();
            for _ in 0..1000 {
                black_box(
                    pool.create(vec![
                        (Position::BIT, ComponentData::new(Position(1.0, 2.0, 3.0))),
                        (Velocity::BIT, ComponentData::new(Velocity(1.0, 0.0, 0.0))),
                    ])
                    .unwrap(),
                );
            }
        });
    });

    group.finish();
}

criterion_group!(benches, spawn_benchmark);
criterion_main!(benches);
