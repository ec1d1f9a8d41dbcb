//! Example: declaring a pool, spawning entities, and running one tick.

use archetype_ecs::migration::ComponentData;
use archetype_ecs::pool::{PoolConfig, StorageStrategy};
use archetype_ecs::query::{Query, Read, Write};
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

struct MovementSystem {
    query: Query<(Write<Position>, Read<Velocity>)>,
}

impl System for MovementSystem {
    fn name(&self) -> &'static str {
        "movement"
    }

    fn refresh(&mut self, manager: &PoolManager) {
        self.query.refresh(manager);
    }

    fn run(&mut self, manager: &mut PoolManager) {
        self.query.for_each_mut(manager, |_entity, (pos, vel)| {
            pos.x += vel.dx;
            pos.y += vel.dy;
        });
    }
}

fn main() {
    println!("=== Basic ECS Example ===");

    let mut world = World::init();
    world
        .declare_pool(PoolConfig::new(
            "Movement",
            ComponentMask::of::<Position>().union(ComponentMask::of::<Velocity>()),
            StorageStrategy::Archetype,
        ))
        .unwrap();

    println!("Spawning entities...");
    let mut handles = Vec::new();
    {
        let mut pool = world.get_pool("Movement").unwrap();
        for i in 0..10 {
            let handle = pool
                .create(vec![
                    (Position::BIT, ComponentData::new(Position { x: i as f32, y: i as f32 })),
                    (Velocity::BIT, ComponentData::new(Velocity { dx: 0.1, dy: 0.0 })),
                ])
                .unwrap();
            handles.push(handle);
        }
    }
    println!("Spawned {} entities", handles.len());

    let query = Query::new(world.manager());
    world.add_system(Box::new(MovementSystem { query }));

    println!("Running 5 ticks...");
    for _ in 0..5 {
        world.update();
    }

    let pool = world.get_pool("Movement").unwrap();
    let first = pool.get_component::<Position>(handles[0]).unwrap();
    println!("Entity 0 is now at ({}, {})", first.x, first.y);

    println!("=== Example Complete ===");
}
