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

//! The per-tick driver loop that invokes queries. Scheduling itself -- the
//! order systems run in, conflict detection between them -- is a collaborator
//! this crate does not implement; `System` is deliberately a thin trait a
//! caller-provided driver steps through once per tick.

use crate::pool_manager::PoolManager;

/// One unit of per-tick logic. A system typically owns one or more
/// [`crate::query::Query`] values, refreshing them in [`System::refresh`]
/// (called after `flush_all_pools`) and iterating them in [`System::run`].
pub trait System {
    fn name(&self) -> &'static str;

    /// Called once per tick, after migrations are flushed and before `run`.
    fn refresh(&mut self, manager: &PoolManager);

    /// Called once per tick, after `refresh`.
    fn run(&mut self, manager: &mut PoolManager);
}

pub type BoxedSystem = Box<dyn System>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::Component;
    use crate::entity::EntityDirectory;
    use crate::mask::ComponentMask;
    use crate::migration::ComponentData;
    use crate::pool::{PoolConfig, StorageStrategy};
    use crate::query::{Query, Write};

    #[derive(Debug, Clone, Copy)]
    struct Counter {
        value: u32,
    }
    crate::define_components! { Counter }

    struct IncrementSystem {
        query: Query<(Write<Counter>,)>,
        ticks: u32,
    }

    impl System for IncrementSystem {
        fn name(&self) -> &'static str {
            "increment"
        }

        fn refresh(&mut self, manager: &PoolManager) {
            self.query.refresh(manager);
        }

        fn run(&mut self, manager: &mut PoolManager) {
            self.query.for_each_mut(manager, |_entity, (counter,)| {
                counter.value += 1;
            });
            self.ticks += 1;
        }
    }

    #[test]
    fn system_runs_against_a_declared_pool() {
        let mut manager = PoolManager::new();
        let mut directory = EntityDirectory::new();
        let pool_id = manager
            .declare(PoolConfig::new("counters", ComponentMask::of::<Counter>(), StorageStrategy::Archetype))
            .unwrap();
        let entity = directory.allocate(crate::entity::EntitySlot::new(pool_id, 0, 0));
        let (storage_index, mask_list_index) = manager
            .pool_mut(pool_id)
            .spawn(entity, vec![(Counter::BIT, ComponentData::new(Counter { value: 0 }))]);
        if let Some(slot) = directory.get_mut(entity) {
            slot.mask_list_index = mask_list_index;
            slot.storage_index = storage_index;
        }

        let mut system = IncrementSystem { query: Query::new(&manager), ticks: 0 };
        system.refresh(&manager);
        system.run(&mut manager);

        assert_eq!(system.ticks, 1);
        assert_eq!(
            manager.pool(pool_id).as_archetype().unwrap().get_component::<Counter>(0, 0).unwrap().value,
            1
        );
    }
}
