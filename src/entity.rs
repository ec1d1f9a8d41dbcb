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

//! Entity handles and the cross-pool entity directory.
//!
//! The directory maps opaque, generationally-versioned [`EntityId`] handles to
//! the pool and physical storage location currently holding that entity's data.
//! It is the only structure shared (read) by every pool; pools never read each
//! other's storage directly.

use slotmap::new_key_type;

use crate::pool::PoolId;

new_key_type! {
    /// Opaque, generationally-versioned entity handle.
    ///
    /// Backed by `slotmap`'s key type: an `(index, generation)` pair, with a
    /// stale generation rejected by the slot map itself rather than requiring
    /// a manual check.
    pub struct EntityId;
}

/// Where an entity currently lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntitySlot {
    /// Which pool owns the entity.
    pub pool_id: PoolId,
    /// Index into the pool's archetype / virtual-archetype list.
    pub mask_list_index: usize,
    /// Index into the pool's per-component arrays.
    pub storage_index: usize,
    /// True iff there is at least one unflushed migration entry for this entity.
    pub is_migrating: bool,
}

impl EntitySlot {
    pub fn new(pool_id: PoolId, mask_list_index: usize, storage_index: usize) -> Self {
        Self {
            pool_id,
            mask_list_index,
            storage_index,
            is_migrating: false,
        }
    }
}

/// Directory mapping every live entity handle to its [`EntitySlot`].
///
/// Backed by a `slotmap::SlotMap` so that generation bookkeeping (bump on
/// destruction, reuse of freed indices) comes from a well-tested data structure
/// rather than a hand-rolled free list.
#[derive(Debug, Default)]
pub struct EntityDirectory {
    slots: slotmap::SlotMap<EntityId, EntitySlot>,
}

impl EntityDirectory {
    pub fn new() -> Self {
        Self {
            slots: slotmap::SlotMap::with_key(),
        }
    }

    /// Allocate a new handle for a slot, reusing a freed index where possible.
    pub fn allocate(&mut self, slot: EntitySlot) -> EntityId {
        self.slots.insert(slot)
    }

    /// Look up a slot by handle. `None` means the handle is stale or unknown.
    pub fn get(&self, handle: EntityId) -> Option<&EntitySlot> {
        self.slots.get(handle)
    }

    /// Look up a slot mutably.
    pub fn get_mut(&mut self, handle: EntityId) -> Option<&mut EntitySlot> {
        self.slots.get_mut(handle)
    }

    /// True iff the handle is valid (generation matches a live slot).
    pub fn is_alive(&self, handle: EntityId) -> bool {
        self.slots.contains_key(handle)
    }

    /// Release a handle: bumps its generation and frees the index for reuse.
    pub fn release(&mut self, handle: EntityId) -> Option<EntitySlot> {
        self.slots.remove(handle)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stale_handle_after_release() {
        let mut dir = EntityDirectory::new();
        let handle = dir.allocate(EntitySlot::new(PoolId(0), 0, 0));
        assert!(dir.is_alive(handle));

        dir.release(handle);
        assert!(!dir.is_alive(handle));
        assert!(dir.get(handle).is_none());
    }

    #[test]
    fn generation_distinguishes_reused_index() {
        let mut dir = EntityDirectory::new();
        let first = dir.allocate(EntitySlot::new(PoolId(0), 0, 0));
        dir.release(first);
        let second = dir.allocate(EntitySlot::new(PoolId(0), 0, 0));

        // slotmap may or may not reuse the index, but the old handle must never
        // resolve to the new slot.
        assert!(!dir.is_alive(first));
        assert!(dir.is_alive(second));
    }
}
