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

//! Owns every declared pool; drives flushes and keeps the entity directory
//! coherent with their results.

use ahash::AHashMap;

use crate::entity::EntityDirectory;
use crate::error::EcsError;
use crate::pool::{Pool, PoolConfig, PoolId};

#[derive(Default)]
pub struct PoolManager {
    pools: Vec<Pool>,
    by_name: AHashMap<String, PoolId>,
}

impl PoolManager {
    pub fn new() -> Self {
        Self {
            pools: Vec::new(),
            by_name: AHashMap::new(),
        }
    }

    /// Register a pool declared at build time. At least one pool must exist
    /// before any entity is created; pool names are unique.
    pub fn declare(&mut self, config: PoolConfig) -> Result<PoolId, EcsError> {
        if config.required_mask.is_empty() && config.optional_mask.is_empty() {
            return Err(EcsError::PoolMustContainAtLeastOneComponent { pool: config.name });
        }
        if self.by_name.contains_key(&config.name) {
            return Err(EcsError::DuplicatePoolName { pool: config.name });
        }
        let id = PoolId(self.pools.len() as u32);
        self.by_name.insert(config.name.clone(), id);
        self.pools.push(Pool::new(id, config));
        Ok(id)
    }

    pub fn pool_id(&self, name: &str) -> Result<PoolId, EcsError> {
        self.by_name.get(name).copied().ok_or_else(|| EcsError::PoolNotFound { pool: name.to_string() })
    }

    pub fn pool(&self, id: PoolId) -> &Pool {
        &self.pools[id.0 as usize]
    }

    pub fn pool_mut(&mut self, id: PoolId) -> &mut Pool {
        &mut self.pools[id.0 as usize]
    }

    pub fn pool_by_name(&self, name: &str) -> Result<&Pool, EcsError> {
        Ok(self.pool(self.pool_id(name)?))
    }

    pub fn pool_by_name_mut(&mut self, name: &str) -> Result<&mut Pool, EcsError> {
        let id = self.pool_id(name)?;
        Ok(self.pool_mut(id))
    }

    pub fn pools(&self) -> impl Iterator<Item = &Pool> {
        self.pools.iter()
    }

    /// Flush every pool with pending migrations, applying their results to
    /// the entity directory: the flushed entity's slot is rewritten to its
    /// post-flush location, and where an archetype pool reports a displaced
    /// handle, that handle's slot is rewritten to the vacated source index.
    /// `is_migrating` is cleared last, after both rewrites.
    pub fn flush_all_pools(&mut self, directory: &mut EntityDirectory) {
        for pool in &mut self.pools {
            if !pool.has_pending_migrations() {
                continue;
            }
            let results = pool.flush(directory);
            for (entity, new_slot) in results {
                if let Some(slot) = directory.get_mut(entity) {
                    slot.mask_list_index = new_slot.mask_list_index;
                    slot.storage_index = new_slot.storage_index;
                    slot.is_migrating = false;
                }
            }
        }
    }

    /// Drain every pool's `new_archetypes`/`reindexed_archetypes` lists. Must
    /// run only after the query engine has consumed them for this tick.
    pub fn clear_notify_lists(&mut self) {
        for pool in &mut self.pools {
            pool.clear_notify_lists();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::Component;
    use crate::entity::EntitySlot;
    use crate::mask::ComponentMask;
    use crate::migration::{ComponentData, MigrationEntry};
    use crate::pool::StorageStrategy;

    #[derive(Debug, Clone, Copy)]
    struct Position {
        #[allow(dead_code)]
        x: f32,
    }
    #[derive(Debug, Clone, Copy)]
    struct Velocity {
        #[allow(dead_code)]
        dx: f32,
    }
    crate::define_components! { Position, Velocity }

    #[test]
    fn declare_rejects_duplicate_names() {
        let mut manager = PoolManager::new();
        let config = PoolConfig::new("movers", ComponentMask::of::<Position>(), StorageStrategy::Archetype);
        manager.declare(config.clone()).unwrap();
        let err = manager.declare(config).unwrap_err();
        assert!(matches!(err, EcsError::DuplicatePoolName { .. }));
    }

    #[test]
    fn declare_rejects_empty_mask() {
        let mut manager = PoolManager::new();
        let config = PoolConfig::new("empty", ComponentMask::EMPTY, StorageStrategy::Archetype);
        let err = manager.declare(config).unwrap_err();
        assert!(matches!(err, EcsError::PoolMustContainAtLeastOneComponent { .. }));
    }

    #[test]
    fn flush_all_pools_updates_directory_and_clears_migrating_flag() {
        let mut manager = PoolManager::new();
        let id = manager
            .declare(PoolConfig::new("movers", ComponentMask::of::<Position>(), StorageStrategy::Archetype))
            .unwrap();
        let mut directory = EntityDirectory::new();
        let entity = directory.allocate(EntitySlot::new(id, 0, 0));

        let (storage_index, mask_list_index) = manager
            .pool_mut(id)
            .spawn(entity, vec![(Position::BIT, ComponentData::new(Position { x: 1.0 }))]);
        if let Some(slot) = directory.get_mut(entity) {
            slot.mask_list_index = mask_list_index;
            slot.storage_index = storage_index;
            slot.is_migrating = true;
        }

        manager
            .pool_mut(id)
            .queue_migration(entity, MigrationEntry::add(Velocity::BIT, ComponentData::new(Velocity { dx: 1.0 })));
        manager.flush_all_pools(&mut directory);

        let slot = directory.get(entity).unwrap();
        assert!(!slot.is_migrating);
        assert_ne!(slot.mask_list_index, mask_list_index);
    }
}
