//! Example: a sparse-set "General" pool with per-entity component shapes,
//! and a system that enqueues a component add from inside iteration.

use archetype_ecs::migration::ComponentData;
use archetype_ecs::pool::{PoolConfig, StorageStrategy};
use archetype_ecs::query::{Query, Read};
use archetype_ecs::system::System;
use archetype_ecs::{ComponentMask, PoolManager, World};

#[derive(Debug, Clone, Copy)]
struct Position {
    x: f32,
    y: f32,
}

#[derive(Debug, Clone, Copy)]
struct Velocity {
    dx: f32,
    dy: f32,
}

archetype_ecs::define_components! { Position, Velocity }

/// Gives every entity still missing a velocity one, the first time it runs.
struct AwakenSystem {
    query: Query<(Read<Position>,)>,
    done: bool,
}

impl System for AwakenSystem {
    fn name(&self) -> &'static str {
        "awaken"
    }

    fn refresh(&mut self, manager: &PoolManager) {
        self.query.refresh(manager);
    }

    fn run(&mut self, manager: &mut PoolManager) {
        if self.done {
            return;
        }
        self.done = true;

        // Can't enqueue through `manager` while `self.query` borrows it for
        // iteration, so collect handles first, then mutate.
        let mut awakened = Vec::new();
        self.query.for_each_mut(manager, |entity, _| awakened.push(entity));

        let pool_id = manager.pool_id("General").unwrap();
        for entity in awakened {
            manager
                .pool_mut(pool_id)
                .queue_migration(entity, archetype_ecs::MigrationEntry::add(Velocity::BIT, ComponentData::new(Velocity { dx: 1.0, dy: 0.0 })));
        }
    }
}

fn main() {
    println!("=== Sparse Pool Example ===");

    let mut world = World::init();
    world
        .declare_pool(
            PoolConfig::new("General", ComponentMask::of::<Position>(), StorageStrategy::Sparse)
                .with_optional(ComponentMask::of::<Velocity>()),
        )
        .unwrap();

    {
        let mut pool = world.get_pool("General").unwrap();
        for i in 0..5 {
            pool.create(vec![(Position::BIT, ComponentData::new(Position { x: i as f32, y: 0.0 }))]).unwrap();
        }
    }

    let query = Query::new(world.manager());
    world.add_system(Box::new(AwakenSystem { query, done: false }));

    println!("Tick 1: enqueue velocity for every entity");
    world.update();
    println!("Tick 2: migrations applied, entities now carry Velocity");
    world.update();

    let with_velocity: Query<(Read<Position>, Read<Velocity>)> = Query::new(world.manager());
    let mut count = 0;
    with_velocity.for_each_mut(world.manager_mut(), |_entity, _| count += 1);
    println!("Entities with Position+Velocity: {count}");

    println!("=== Example Complete ===");
}
