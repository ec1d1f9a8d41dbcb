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

//! Thin facade combining a pool with the entity directory so callers
//! manipulate entities by handle instead of juggling storage indices.

use crate::component::Component;
use crate::entity::{EntityDirectory, EntityId, EntitySlot};
use crate::error::EcsError;
use crate::mask::ComponentMask;
use crate::migration::{ComponentData, MigrationEntry};
use crate::pool::PoolId;
use crate::pool_manager::PoolManager;

/// Handle for creating, destroying, and mutating entities of one pool.
pub struct PoolInterface<'a> {
    pool_id: PoolId,
    manager: &'a mut PoolManager,
    directory: &'a mut EntityDirectory,
}

impl<'a> PoolInterface<'a> {
    pub fn new(pool_id: PoolId, manager: &'a mut PoolManager, directory: &'a mut EntityDirectory) -> Self {
        Self { pool_id, manager, directory }
    }

    fn check_pool(&self, handle: EntityId) -> Result<EntitySlot, EcsError> {
        let slot = self.directory.get(handle).ok_or(EcsError::StaleEntity)?;
        if slot.pool_id != self.pool_id {
            return Err(EcsError::EntityPoolMismatch { pool: self.manager.pool(self.pool_id).name().to_string() });
        }
        Ok(*slot)
    }

    /// Create an entity with exactly the components supplied (which must
    /// satisfy the pool's required mask).
    pub fn create(&mut self, components: Vec<(u32, ComponentData)>) -> Result<EntityId, EcsError> {
        let mask = components.iter().fold(ComponentMask::EMPTY, |m, (bit, _)| m.add_bit(*bit));
        self.manager.pool(self.pool_id).validate_mask(mask)?;

        let placeholder = self.directory.allocate(EntitySlot::new(self.pool_id, 0, 0));
        let (storage_index, mask_list_index) = self.manager.pool_mut(self.pool_id).spawn(placeholder, components);
        if let Some(slot) = self.directory.get_mut(placeholder) {
            slot.mask_list_index = mask_list_index;
            slot.storage_index = storage_index;
        }
        Ok(placeholder)
    }

    /// Destroy an entity immediately (not deferred). Swap-remove fallout is
    /// applied to the directory before returning.
    pub fn destroy(&mut self, handle: EntityId) -> Result<(), EcsError> {
        let slot = self.check_pool(handle)?;
        let swapped = self.manager.pool_mut(self.pool_id).despawn(slot);
        self.directory.release(handle);
        if let Some(swapped_handle) = swapped {
            if let Some(swapped_slot) = self.directory.get_mut(swapped_handle) {
                swapped_slot.storage_index = slot.storage_index;
            }
        }
        Ok(())
    }

    /// Enqueue a component add; applied at the next `flush_all_pools`.
    pub fn add_component<T: Component>(&mut self, handle: EntityId, value: T) -> Result<(), EcsError> {
        let slot = self.check_pool(handle)?;
        let mask = ComponentMask::of::<T>();
        if !mask.is_subset_of(self.manager.pool(self.pool_id).config.pool_mask()) {
            return Err(EcsError::ComponentNotInPool { pool: self.manager.pool(self.pool_id).name().to_string() });
        }
        let pool = self.manager.pool(self.pool_id);
        if pool.effective_mask(handle, slot.mask_list_index).is_some_and(|m| m.contains::<T>()) {
            return Err(EcsError::AddingExistingComponent);
        }
        self.manager
            .pool_mut(self.pool_id)
            .queue_migration(handle, MigrationEntry::add(T::BIT, ComponentData::new(value)));
        if let Some(slot_mut) = self.directory.get_mut(handle) {
            slot_mut.is_migrating = true;
        }
        Ok(())
    }

    /// Enqueue a component remove; applied at the next `flush_all_pools`.
    pub fn remove_component<T: Component>(&mut self, handle: EntityId) -> Result<(), EcsError> {
        let slot = self.check_pool(handle)?;
        if self.manager.pool(self.pool_id).required_mask().contains::<T>() {
            return Err(EcsError::CannotRemoveRequiredComponent { pool: self.manager.pool(self.pool_id).name().to_string() });
        }
        let pool = self.manager.pool(self.pool_id);
        if !pool.effective_mask(handle, slot.mask_list_index).is_some_and(|m| m.contains::<T>()) {
            return Err(EcsError::RemovingNonexistingComponent);
        }
        self.manager.pool_mut(self.pool_id).queue_migration(handle, MigrationEntry::remove(T::BIT));
        if let Some(slot_mut) = self.directory.get_mut(handle) {
            slot_mut.is_migrating = true;
        }
        Ok(())
    }

    pub fn get_component<T: Component>(&self, handle: EntityId) -> Result<&T, EcsError> {
        let slot = self.check_pool(handle)?;
        let pool = self.manager.pool(self.pool_id);
        if let Some(archetype_pool) = pool.as_archetype() {
            archetype_pool
                .get_component::<T>(slot.mask_list_index, slot.storage_index)
                .ok_or(EcsError::EntityDoesNotHaveComponent)
        } else if let Some(sparse_pool) = pool.as_sparse() {
            sparse_pool.get_component::<T>(slot.storage_index).ok_or(EcsError::EntityDoesNotHaveComponent)
        } else {
            unreachable!("a pool is backed by exactly one storage engine")
        }
    }

    pub fn get_component_mut<T: Component>(&mut self, handle: EntityId) -> Result<&mut T, EcsError> {
        let slot = self.check_pool(handle)?;
        let pool = self.manager.pool_mut(self.pool_id);
        if let Some(archetype_pool) = pool.as_archetype_mut() {
            archetype_pool
                .get_component_mut::<T>(slot.mask_list_index, slot.storage_index)
                .ok_or(EcsError::EntityDoesNotHaveComponent)
        } else if let Some(sparse_pool) = pool.as_sparse_mut() {
            sparse_pool.get_component_mut::<T>(slot.storage_index).ok_or(EcsError::EntityDoesNotHaveComponent)
        } else {
            unreachable!("a pool is backed by exactly one storage engine")
        }
    }
}

/// Cross-pool dispatch: looks up an entity's `pool_id` and forwards to the
/// matching pool interface. Mirrors `PoolInterface` one level up, for callers
/// that only have a handle and not its owning pool's name.
pub struct Ent;

impl Ent {
    pub fn destroy(manager: &mut PoolManager, directory: &mut EntityDirectory, handle: EntityId) -> Result<(), EcsError> {
        let pool_id = directory.get(handle).ok_or(EcsError::StaleEntity)?.pool_id;
        PoolInterface::new(pool_id, manager, directory).destroy(handle)
    }

    pub fn add_component<T: Component>(
        manager: &mut PoolManager,
        directory: &mut EntityDirectory,
        handle: EntityId,
        value: T,
    ) -> Result<(), EcsError> {
        let pool_id = directory.get(handle).ok_or(EcsError::StaleEntity)?.pool_id;
        PoolInterface::new(pool_id, manager, directory).add_component(handle, value)
    }

    pub fn remove_component<T: Component>(manager: &mut PoolManager, directory: &mut EntityDirectory, handle: EntityId) -> Result<(), EcsError> {
        let pool_id = directory.get(handle).ok_or(EcsError::StaleEntity)?.pool_id;
        PoolInterface::new(pool_id, manager, directory).remove_component::<T>(handle)
    }

    pub fn get_component<'a, T: Component>(manager: &'a PoolManager, directory: &'a EntityDirectory, handle: EntityId) -> Result<&'a T, EcsError> {
        let slot = directory.get(handle).ok_or(EcsError::StaleEntity)?;
        let pool = manager.pool(slot.pool_id);
        if let Some(archetype_pool) = pool.as_archetype() {
            archetype_pool
                .get_component::<T>(slot.mask_list_index, slot.storage_index)
                .ok_or(EcsError::EntityDoesNotHaveComponent)
        } else if let Some(sparse_pool) = pool.as_sparse() {
            sparse_pool.get_component::<T>(slot.storage_index).ok_or(EcsError::EntityDoesNotHaveComponent)
        } else {
            unreachable!("a pool is backed by exactly one storage engine")
        }
    }
}
