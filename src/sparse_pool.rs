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

//! Sparse-set pool storage: one flat, gappy column per pool component.
//!
//! `storage_index` is stable for an entity's entire lifetime in the pool --
//! that is the defining property this engine exists for. Membership in a
//! "virtual archetype" (an index over storage indices sharing a mask) is
//! tracked separately from physical storage, with an `in_list_index`
//! back-pointer so removal from a virtual archetype stays O(1).

use ahash::AHashMap;

use crate::column::SparseColumn;
use crate::entity::{EntityDirectory, EntityId};
use crate::mask::ComponentMask;
use crate::migration::{ComponentData, MigrationDirection, MigrationQueue, MigrationEntry};

pub struct SparsePool {
    #[allow(dead_code)]
    required_mask: ComponentMask,
    entities: Vec<Option<EntityId>>,
    /// `(virtual archetype index, position within that archetype's list)` per storage index.
    bitmap_map: Vec<Option<(usize, usize)>>,
    columns: AHashMap<u32, SparseColumn>,
    free_list: Vec<usize>,
    mask_list: Vec<ComponentMask>,
    virtual_archetypes: Vec<Vec<usize>>,
    migrations: MigrationQueue,
    new_archetypes: Vec<usize>,
    reindexed_archetypes: Vec<usize>,
}

impl SparsePool {
    pub fn new(required_mask: ComponentMask) -> Self {
        Self {
            required_mask,
            entities: Vec::new(),
            bitmap_map: Vec::new(),
            columns: AHashMap::new(),
            free_list: Vec::new(),
            mask_list: Vec::new(),
            virtual_archetypes: Vec::new(),
            migrations: MigrationQueue::new(),
            new_archetypes: Vec::new(),
            reindexed_archetypes: Vec::new(),
        }
    }

    pub fn migrations(&self) -> &MigrationQueue {
        &self.migrations
    }

    pub fn queue_migration(&mut self, entity: EntityId, entry: MigrationEntry) {
        self.migrations.push(entity, entry);
    }

    pub fn archetype_count(&self) -> usize {
        self.mask_list.len()
    }

    pub fn archetype_mask(&self, mask_list_index: usize) -> Option<ComponentMask> {
        self.mask_list.get(mask_list_index).copied()
    }

    pub fn new_archetypes(&self) -> &[usize] {
        &self.new_archetypes
    }

    pub fn reindexed_archetypes(&self) -> &[usize] {
        &self.reindexed_archetypes
    }

    pub fn clear_notify_lists(&mut self) {
        self.new_archetypes.clear();
        self.reindexed_archetypes.clear();
    }

    /// Storage indices currently tracked under virtual archetype `mask_list_index`.
    pub fn members(&self, mask_list_index: usize) -> Option<&[usize]> {
        self.virtual_archetypes.get(mask_list_index).map(Vec::as_slice)
    }

    pub fn entity_at(&self, storage_index: usize) -> Option<EntityId> {
        self.entities.get(storage_index).copied().flatten()
    }

    fn locate_or_create_virtual(&mut self, mask: ComponentMask) -> usize {
        if let Some(idx) = self.mask_list.iter().position(|m| *m == mask) {
            return idx;
        }
        self.mask_list.push(mask);
        self.virtual_archetypes.push(Vec::new());
        let idx = self.mask_list.len() - 1;
        self.new_archetypes.push(idx);
        idx
    }

    fn allocate_storage_index(&mut self) -> usize {
        if let Some(index) = self.free_list.pop() {
            index
        } else {
            self.entities.push(None);
            self.bitmap_map.push(None);
            self.entities.len() - 1
        }
    }

    /// Swap-remove `storage_index` out of whatever virtual archetype it
    /// currently belongs to, fixing the back-pointer of whichever entry
    /// slides into its place.
    fn leave_virtual_archetype(&mut self, storage_index: usize) {
        let Some((archetype_index, in_list_index)) = self.bitmap_map[storage_index] else {
            return;
        };
        let list = &mut self.virtual_archetypes[archetype_index];
        let last = list.len() - 1;
        if in_list_index != last {
            list.swap(in_list_index, last);
        }
        list.pop();
        if in_list_index != last {
            let moved_storage_index = list[in_list_index];
            if let Some(entry) = self.bitmap_map.get_mut(moved_storage_index) {
                if let Some((_, idx)) = entry {
                    *idx = in_list_index;
                }
            }
        }
        self.bitmap_map[storage_index] = None;
    }

    fn join_virtual_archetype(&mut self, storage_index: usize, mask: ComponentMask) -> usize {
        let archetype_index = self.locate_or_create_virtual(mask);
        self.virtual_archetypes[archetype_index].push(storage_index);
        let in_list_index = self.virtual_archetypes[archetype_index].len() - 1;
        self.bitmap_map[storage_index] = Some((archetype_index, in_list_index));
        self.reindexed_archetypes.push(archetype_index);
        archetype_index
    }

    pub fn spawn(&mut self, entity: EntityId, components: Vec<(u32, ComponentData)>) -> (usize, usize) {
        let mask = components
            .iter()
            .fold(ComponentMask::EMPTY, |m, (bit, _)| m.add_bit(*bit));
        let storage_index = self.allocate_storage_index();
        self.entities[storage_index] = Some(entity);
        for (bit, data) in components {
            self.columns
                .entry(bit)
                .or_insert_with(|| SparseColumn::from_layout(bit, data.len(), data.drop_fn()))
                .set_component_data(storage_index, data);
        }
        let archetype_index = self.join_virtual_archetype(storage_index, mask);
        (storage_index, archetype_index)
    }

    pub fn despawn_at(&mut self, storage_index: usize) {
        for column in self.columns.values_mut() {
            column.clear(storage_index);
        }
        self.leave_virtual_archetype(storage_index);
        self.entities[storage_index] = None;
        self.free_list.push(storage_index);
    }

    pub fn get_component<T: crate::component::Component>(&self, storage_index: usize) -> Option<&T> {
        self.columns.get(&T::BIT)?.get::<T>(storage_index)
    }

    pub fn get_component_mut<T: crate::component::Component>(&mut self, storage_index: usize) -> Option<&mut T> {
        self.columns.get_mut(&T::BIT)?.get_mut::<T>(storage_index)
    }

    /// `storage_index` never changes for a sparse pool; only the virtual
    /// archetype (`mask_list_index`) membership does.
    pub fn flush(&mut self, directory: &EntityDirectory) -> Vec<(EntityId, usize, usize)> {
        let mut results = Vec::new();
        for (entity, entries) in self.migrations.drain() {
            let Some(slot) = directory.get(entity) else { continue };
            let storage_index = slot.storage_index;
            let old_mask_list_index = slot.mask_list_index;
            let Some(old_mask) = self.mask_list.get(old_mask_list_index).copied() else {
                continue;
            };
            let final_mask = MigrationQueue::fold_mask(old_mask, &entries);

            if final_mask == old_mask {
                results.push((entity, old_mask_list_index, storage_index));
                continue;
            }

            for entry in entries {
                match entry.direction {
                    MigrationDirection::Remove => {
                        if let Some(column) = self.columns.get_mut(&entry.bit) {
                            column.clear(storage_index);
                        }
                    }
                    MigrationDirection::Add => {
                        if let Some(data) = entry.data {
                            self.columns
                                .entry(entry.bit)
                                .or_insert_with(|| SparseColumn::from_layout(entry.bit, data.len(), data.drop_fn()))
                                .set_component_data(storage_index, data);
                        }
                    }
                }
            }

            self.leave_virtual_archetype(storage_index);
            let new_archetype_index = self.join_virtual_archetype(storage_index, final_mask);
            results.push((entity, new_archetype_index, storage_index));
        }
        results
    }
}
