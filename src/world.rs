// Copyright 2024 Saptak Santra
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! World: owns every declared pool, the entity directory, and the systems
//! that step them each tick.

#[cfg(feature = "profiling")]
use tracing::info_span;

use crate::entity::EntityDirectory;
use crate::error::EcsError;
use crate::interface::PoolInterface;
use crate::pool::PoolConfig;
use crate::pool_manager::PoolManager;
use crate::system::BoxedSystem;

/// Central ECS world. Holds every declared pool (via [`PoolManager`]), the
/// cross-pool [`EntityDirectory`], and the closed system list that runs each
/// tick.
pub struct World {
    manager: PoolManager,
    directory: EntityDirectory,
    systems: Vec<BoxedSystem>,
}

impl World {
    /// Build an empty world. Pools are declared afterward via [`World::declare_pool`].
    pub fn init() -> Self {
        Self {
            manager: PoolManager::new(),
            directory: EntityDirectory::new(),
            systems: Vec::new(),
        }
    }

    /// Tear the world down. Provided for symmetry with `init`; dropping a
    /// `World` is otherwise sufficient since no state escapes it.
    pub fn deinit(self) {
        drop(self);
    }

    pub fn declare_pool(&mut self, config: PoolConfig) -> Result<(), EcsError> {
        self.manager.declare(config)?;
        Ok(())
    }

    pub fn add_system(&mut self, system: BoxedSystem) {
        self.systems.push(system);
    }

    pub fn get_pool(&mut self, name: &str) -> Result<PoolInterface<'_>, EcsError> {
        let id = self.manager.pool_id(name)?;
        Ok(PoolInterface::new(id, &mut self.manager, &mut self.directory))
    }

    pub fn manager(&self) -> &PoolManager {
        &self.manager
    }

    pub fn manager_mut(&mut self) -> &mut PoolManager {
        &mut self.manager
    }

    pub fn directory(&self) -> &EntityDirectory {
        &self.directory
    }

    /// One tick: flush pending migrations, refresh every system's queries
    /// against the post-flush archetype state, run the systems, then clear
    /// the notify lists the refresh step just consumed.
    pub fn update(&mut self) {
        #[cfg(feature = "profiling")]
        let _span = info_span!("world_update").entered();

        self.manager.flush_all_pools(&mut self.directory);

        for system in &mut self.systems {
            system.refresh(&self.manager);
        }
        for system in &mut self.systems {
            system.run(&mut self.manager);
        }

        self.manager.clear_notify_lists();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::Component;
    use crate::mask::ComponentMask;
    use crate::pool::StorageStrategy;
    use crate::query::{Query, Write};

    #[derive(Debug, Clone, Copy)]
    struct Position {
        x: f32,
    }
    #[derive(Debug, Clone, Copy)]
    struct Velocity {
        dx: f32,
    }
    crate::define_components! { Position, Velocity }

    struct MoveSystem {
        query: Query<(Write<Position>, crate::query::Read<Velocity>)>,
    }

    impl crate::system::System for MoveSystem {
        fn name(&self) -> &'static str {
            "move"
        }
        fn refresh(&mut self, manager: &PoolManager) {
            self.query.refresh(manager);
        }
        fn run(&mut self, manager: &mut PoolManager) {
            self.query.for_each_mut(manager, |_entity, (pos, vel)| {
                pos.x += vel.dx;
            });
        }
    }

    #[test]
    fn init_declare_create_update_round_trip() {
        let mut world = World::init();
        world
            .declare_pool(PoolConfig::new(
                "Movement",
                ComponentMask::of::<Position>().union(ComponentMask::of::<Velocity>()),
                StorageStrategy::Archetype,
            ))
            .unwrap();

        let handle = {
            let mut pool = world.get_pool("Movement").unwrap();
            pool.create(vec![
                (Position::BIT, crate::migration::ComponentData::new(Position { x: 0.0 })),
                (Velocity::BIT, crate::migration::ComponentData::new(Velocity { dx: 1.0 })),
            ])
            .unwrap()
        };

        let query: Query<(Write<Position>, crate::query::Read<Velocity>)> = Query::new(world.manager());
        world.add_system(Box::new(MoveSystem { query }));

        world.update();
        world.update();

        let pool = world.get_pool("Movement").unwrap();
        assert_eq!(pool.get_component::<Position>(handle).unwrap().x, 2.0);
    }

    #[test]
    fn get_pool_rejects_unknown_name() {
        let mut world = World::init();
        assert!(matches!(world.get_pool("missing"), Err(EcsError::PoolNotFound { .. })));
    }
}
