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

//! Entity pools: user-declared, statically-typed partitions of entity storage.
//!
//! A pool is declared once with a required-component mask, an optional-component
//! mask, and a storage strategy, then backed by one of the two storage engines in
//! [`crate::archetype_pool`] or [`crate::sparse_pool`]. [`Pool`] is the dispatch
//! layer the rest of the crate talks to; it never inspects engine internals.

use crate::archetype_pool::ArchetypePool;
use crate::entity::{EntityDirectory, EntityId, EntitySlot};
use crate::error::EcsError;
use crate::mask::ComponentMask;
use crate::migration::{ComponentData, MigrationEntry, MigrationQueue};
use crate::sparse_pool::SparsePool;

/// Identifies one pool within a [`crate::pool_manager::PoolManager`].
///
/// A small integer rather than a name at the hot path: names are resolved to a
/// `PoolId` once, at pool-creation time, the same way an archetype index
/// resolves a signature to a `usize` once per lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PoolId(pub u32);

/// Which storage engine backs a pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageStrategy {
    /// Structure-of-arrays grouped by exact component mask; best when entities
    /// within the pool share a small number of distinct shapes.
    Archetype,
    /// Flat structure-of-arrays with per-slot presence and virtual archetypes
    /// as membership indices; best when shapes vary per-entity.
    Sparse,
}

/// Static declaration of a pool, fixed at construction time.
#[derive(Debug, Clone)]
pub struct PoolConfig {
    pub name: String,
    pub required_mask: ComponentMask,
    pub optional_mask: ComponentMask,
    pub strategy: StorageStrategy,
}

impl PoolConfig {
    pub fn new(name: impl Into<String>, required_mask: ComponentMask, strategy: StorageStrategy) -> Self {
        Self {
            name: name.into(),
            required_mask,
            optional_mask: ComponentMask::EMPTY,
            strategy,
        }
    }

    pub fn with_optional(mut self, optional_mask: ComponentMask) -> Self {
        self.optional_mask = optional_mask;
        self
    }

    /// Full mask a pool may legally hold: required components plus whatever
    /// optional components happen to be attached.
    pub fn pool_mask(&self) -> ComponentMask {
        self.required_mask.union(self.optional_mask)
    }
}

/// A live pool: its static [`PoolConfig`] plus the storage engine holding data.
pub struct Pool {
    pub id: PoolId,
    pub config: PoolConfig,
    storage: PoolStorage,
}

enum PoolStorage {
    Archetype(ArchetypePool),
    Sparse(SparsePool),
}

impl Pool {
    pub fn new(id: PoolId, config: PoolConfig) -> Self {
        let storage = match config.strategy {
            StorageStrategy::Archetype => PoolStorage::Archetype(ArchetypePool::new(config.required_mask)),
            StorageStrategy::Sparse => PoolStorage::Sparse(SparsePool::new(config.required_mask)),
        };
        Self { id, config, storage }
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn required_mask(&self) -> ComponentMask {
        self.config.required_mask
    }

    /// Reject masks that omit a required component or include a component
    /// outside the pool's declared mask.
    pub fn validate_mask(&self, mask: ComponentMask) -> Result<(), EcsError> {
        if !self.config.required_mask.is_subset_of(mask) {
            return Err(EcsError::RequiredComponentMissing {
                pool: self.config.name.clone(),
            });
        }
        if !mask.is_subset_of(self.config.pool_mask()) {
            return Err(EcsError::ComponentNotInPool {
                pool: self.config.name.clone(),
            });
        }
        Ok(())
    }

    /// `components` must carry exactly one entry per bit in the entity's mask.
    /// Returns `(storage_index, mask_list_index)`.
    pub fn spawn(&mut self, entity: EntityId, components: Vec<(u32, ComponentData)>) -> (usize, usize) {
        match &mut self.storage {
            PoolStorage::Archetype(p) => p.spawn(entity, components),
            PoolStorage::Sparse(p) => p.spawn(entity, components),
        }
    }

    /// Remove the entity at `slot`. For an archetype pool this is a
    /// swap-remove that may displace another live entity; the caller must
    /// rewrite that entity's directory slot to `(mask_list_index,
    /// slot.storage_index)` when `Some` is returned.
    pub fn despawn(&mut self, slot: EntitySlot) -> Option<EntityId> {
        match &mut self.storage {
            PoolStorage::Archetype(p) => p.despawn_at(slot.mask_list_index, slot.storage_index),
            PoolStorage::Sparse(p) => {
                p.despawn_at(slot.storage_index);
                None
            }
        }
    }

    pub fn queue_migration(&mut self, entity: EntityId, entry: MigrationEntry) {
        match &mut self.storage {
            PoolStorage::Archetype(p) => p.queue_migration(entity, entry),
            PoolStorage::Sparse(p) => p.queue_migration(entity, entry),
        }
    }

    pub fn has_pending_migrations(&self) -> bool {
        match &self.storage {
            PoolStorage::Archetype(p) => !p.migrations().is_empty(),
            PoolStorage::Sparse(p) => !p.migrations().is_empty(),
        }
    }

    /// Apply every queued migration, returning the entities whose slot changed
    /// so the caller (pool manager) can update the entity directory.
    pub fn flush(&mut self, directory: &EntityDirectory) -> Vec<(EntityId, EntitySlot)> {
        let id = self.id;
        let raw = match &mut self.storage {
            PoolStorage::Archetype(p) => p.flush(directory),
            PoolStorage::Sparse(p) => p.flush(directory),
        };
        raw.into_iter()
            .map(|(entity, mask_list_index, storage_index)| (entity, EntitySlot::new(id, mask_list_index, storage_index)))
            .collect()
    }

    pub fn as_archetype(&self) -> Option<&ArchetypePool> {
        match &self.storage {
            PoolStorage::Archetype(p) => Some(p),
            PoolStorage::Sparse(_) => None,
        }
    }

    pub fn as_archetype_mut(&mut self) -> Option<&mut ArchetypePool> {
        match &mut self.storage {
            PoolStorage::Archetype(p) => Some(p),
            PoolStorage::Sparse(_) => None,
        }
    }

    pub fn as_sparse(&self) -> Option<&SparsePool> {
        match &self.storage {
            PoolStorage::Sparse(p) => Some(p),
            PoolStorage::Archetype(_) => None,
        }
    }

    pub fn as_sparse_mut(&mut self) -> Option<&mut SparsePool> {
        match &mut self.storage {
            PoolStorage::Sparse(p) => Some(p),
            PoolStorage::Archetype(_) => None,
        }
    }

    /// Archetype/virtual-archetype masks created since the last notify-list
    /// clear, for query cache refresh.
    pub fn new_archetypes(&self) -> &[usize] {
        match &self.storage {
            PoolStorage::Archetype(p) => p.new_archetypes(),
            PoolStorage::Sparse(p) => p.new_archetypes(),
        }
    }

    pub fn reindexed_archetypes(&self) -> &[usize] {
        match &self.storage {
            PoolStorage::Archetype(p) => p.reindexed_archetypes(),
            PoolStorage::Sparse(p) => p.reindexed_archetypes(),
        }
    }

    pub fn clear_notify_lists(&mut self) {
        match &mut self.storage {
            PoolStorage::Archetype(p) => p.clear_notify_lists(),
            PoolStorage::Sparse(p) => p.clear_notify_lists(),
        }
    }

    pub fn archetype_mask(&self, mask_list_index: usize) -> Option<ComponentMask> {
        match &self.storage {
            PoolStorage::Archetype(p) => p.archetype_mask(mask_list_index),
            PoolStorage::Sparse(p) => p.archetype_mask(mask_list_index),
        }
    }

    pub fn archetype_count(&self) -> usize {
        match &self.storage {
            PoolStorage::Archetype(p) => p.archetype_count(),
            PoolStorage::Sparse(p) => p.archetype_count(),
        }
    }

    /// The mask an entity will have once its already-queued migrations are
    /// applied, without waiting for a flush: the entity's current archetype
    /// mask folded with any pending entries for it.
    pub fn effective_mask(&self, entity: EntityId, mask_list_index: usize) -> Option<ComponentMask> {
        let base = self.archetype_mask(mask_list_index)?;
        let queue = match &self.storage {
            PoolStorage::Archetype(p) => p.migrations(),
            PoolStorage::Sparse(p) => p.migrations(),
        };
        Some(match queue.peek(entity) {
            Some(entries) => MigrationQueue::fold_mask(base, entries),
            None => base,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::Component;

    #[derive(Debug, Clone, Copy)]
    struct Position {
        #[allow(dead_code)]
        x: f32,
    }
    crate::define_components! { Position }

    #[test]
    fn validate_mask_rejects_missing_required_component() {
        let config = PoolConfig::new("movers", ComponentMask::of::<Position>(), StorageStrategy::Archetype);
        let pool = Pool::new(PoolId(0), config);
        let result = pool.validate_mask(ComponentMask::EMPTY);
        assert!(matches!(result, Err(EcsError::RequiredComponentMissing { .. })));
    }

    #[test]
    fn validate_mask_accepts_required_only() {
        let config = PoolConfig::new("movers", ComponentMask::of::<Position>(), StorageStrategy::Archetype);
        let pool = Pool::new(PoolId(0), config);
        assert!(pool.validate_mask(ComponentMask::of::<Position>()).is_ok());
    }
}
