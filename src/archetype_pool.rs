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

//! Archetype-based pool storage: entities grouped by exact component mask.
//!
//! Layout per pool: parallel vectors `masks[i]` / `archetypes[i]`. Each
//! archetype holds an `entities` list and one [`DenseColumn`] per bit set in
//! its mask, all sharing the same row indexing. Removal is always
//! swap-with-last so no archetype ever has a gap.

use ahash::AHashMap;

use crate::column::DenseColumn;
use crate::entity::{EntityDirectory, EntityId};
use crate::mask::ComponentMask;
use crate::migration::{ComponentData, MigrationDirection, MigrationEntry, MigrationQueue};

#[derive(Default)]
struct ArchetypeStorage {
    entities: Vec<EntityId>,
    columns: AHashMap<u32, DenseColumn>,
}

pub struct ArchetypePool {
    required_mask: ComponentMask,
    masks: Vec<ComponentMask>,
    archetypes: Vec<ArchetypeStorage>,
    migrations: MigrationQueue,
    new_archetypes: Vec<usize>,
    reindexed_archetypes: Vec<usize>,
}

type Layout = (usize, Option<unsafe fn(*mut u8)>);

impl ArchetypePool {
    pub fn new(required_mask: ComponentMask) -> Self {
        Self {
            required_mask,
            masks: Vec::new(),
            archetypes: Vec::new(),
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
        self.archetypes.len()
    }

    pub fn archetype_mask(&self, mask_list_index: usize) -> Option<ComponentMask> {
        self.masks.get(mask_list_index).copied()
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

    /// Entities and the requested component's column for archetype `mask_list_index`.
    pub fn view(&self, mask_list_index: usize, bit: u32) -> Option<(&[EntityId], &DenseColumn)> {
        let storage = self.archetypes.get(mask_list_index)?;
        let column = storage.columns.get(&bit)?;
        Some((&storage.entities, column))
    }

    pub fn entities(&self, mask_list_index: usize) -> &[EntityId] {
        &self.archetypes[mask_list_index].entities
    }

    fn find_archetype(&self, mask: ComponentMask) -> Option<usize> {
        self.masks.iter().position(|m| *m == mask)
    }

    fn locate_or_create(&mut self, mask: ComponentMask, layouts: &AHashMap<u32, Layout>) -> usize {
        if let Some(idx) = self.find_archetype(mask) {
            return idx;
        }
        let mut columns = AHashMap::new();
        for bit in mask.iter_bits() {
            let (item_size, drop_fn) = layouts.get(&bit).copied().unwrap_or((0, None));
            columns.insert(bit, DenseColumn::from_layout(bit, item_size, drop_fn));
        }
        self.masks.push(mask);
        self.archetypes.push(ArchetypeStorage {
            entities: Vec::new(),
            columns,
        });
        let idx = self.archetypes.len() - 1;
        self.new_archetypes.push(idx);
        idx
    }

    /// `components` must carry exactly one entry per bit set in the entity's
    /// mask (required + any optional components supplied at creation).
    pub fn spawn(&mut self, entity: EntityId, components: Vec<(u32, ComponentData)>) -> (usize, usize) {
        let mask = components
            .iter()
            .fold(ComponentMask::EMPTY, |m, (bit, _)| m.add_bit(*bit));
        let layouts: AHashMap<u32, Layout> = components.iter().map(|(bit, data)| (*bit, (data.len(), data.drop_fn()))).collect();
        let archetype_index = self.locate_or_create(mask, &layouts);
        let storage = &mut self.archetypes[archetype_index];
        storage.entities.push(entity);
        for (bit, data) in components {
            storage
                .columns
                .get_mut(&bit)
                .expect("column created for every bit in mask")
                .push_component_data(data);
        }
        let storage_index = storage.entities.len() - 1;
        (storage_index, archetype_index)
    }

    /// Swap-remove the entity at `storage_index` from archetype
    /// `mask_list_index`. Returns the handle of the entity that was moved
    /// into the vacated slot, if any.
    pub fn despawn_at(&mut self, mask_list_index: usize, storage_index: usize) -> Option<EntityId> {
        let storage = &mut self.archetypes[mask_list_index];
        let len = storage.entities.len();
        if storage_index >= len {
            return None;
        }
        let last = len - 1;
        let swapped = (storage_index != last).then(|| storage.entities[last]);
        storage.entities.swap_remove(storage_index);
        for column in storage.columns.values_mut() {
            column.swap_remove_row(storage_index);
        }
        swapped
    }

    pub fn get_component<T: crate::component::Component>(&self, mask_list_index: usize, storage_index: usize) -> Option<&T> {
        self.archetypes.get(mask_list_index)?.columns.get(&T::BIT)?.get::<T>(storage_index)
    }

    pub fn get_component_mut<T: crate::component::Component>(
        &mut self,
        mask_list_index: usize,
        storage_index: usize,
    ) -> Option<&mut T> {
        self.archetypes
            .get_mut(mask_list_index)?
            .columns
            .get_mut(&T::BIT)?
            .get_mut::<T>(storage_index)
    }

    /// Apply every queued migration. Returns `(entity, new_mask_list_index,
    /// new_storage_index)` for every entity whose slot changed or whose
    /// `is_migrating` flag must be cleared (no-op folds included), plus an
    /// entry for any entity displaced by a swap-remove.
    ///
    /// A swap-remove performed while processing one entity can relocate
    /// another entity that is *also* pending in this same drain -- the
    /// directory is not updated until every entity in the batch has been
    /// processed, so `directory` alone cannot be trusted for positions once
    /// the first swap-remove has happened. `current` tracks each pending
    /// entity's live `(mask_list_index, storage_index)`, seeded from the
    /// directory and kept in sync on every swap-remove this call performs.
    pub fn flush(&mut self, directory: &EntityDirectory) -> Vec<(EntityId, usize, usize)> {
        let mut results = Vec::new();
        let drained = self.migrations.drain();
        let mut current: AHashMap<EntityId, (usize, usize)> = AHashMap::new();
        for (entity, _) in &drained {
            if let Some(slot) = directory.get(*entity) {
                current.insert(*entity, (slot.mask_list_index, slot.storage_index));
            }
        }

        for (entity, entries) in drained {
            let Some(&(old_mask_list_index, old_storage_index)) = current.get(&entity) else { continue };
            let Some(&old_mask) = self.masks.get(old_mask_list_index) else { continue };
            let final_mask = MigrationQueue::fold_mask(old_mask, &entries);

            if final_mask == old_mask {
                results.push((entity, old_mask_list_index, old_storage_index));
                continue;
            }

            let mut adds: AHashMap<u32, ComponentData> = AHashMap::new();
            for entry in entries {
                if entry.direction == MigrationDirection::Add {
                    if let Some(data) = entry.data {
                        adds.insert(entry.bit, data);
                    }
                }
            }

            // Only bits genuinely gained by this fold need a destination slot --
            // a bit added then removed within the same batch never appears in
            // `final_mask`, so it must not be looked up among the destination
            // archetype's columns.
            let keep_mask = old_mask.intersection(final_mask);
            let add_mask = final_mask.difference(old_mask);
            let mut layouts: AHashMap<u32, Layout> = add_mask
                .iter_bits()
                .filter_map(|bit| adds.get(&bit).map(|data| (bit, (data.len(), data.drop_fn()))))
                .collect();
            for bit in keep_mask.iter_bits() {
                if let Some(col) = self.archetypes[old_mask_list_index].columns.get(&bit) {
                    layouts.entry(bit).or_insert((col.item_size(), col.drop_fn()));
                }
            }

            let dest_index = self.locate_or_create(final_mask, &layouts);
            debug_assert_ne!(dest_index, old_mask_list_index, "fold changed the mask, so the archetype must differ");

            for bit in keep_mask.iter_bits() {
                let src_ptr = self.archetypes[old_mask_list_index].columns.get(&bit).expect("component tracked in old mask").get_ptr(old_storage_index);
                unsafe {
                    self.archetypes[dest_index]
                        .columns
                        .get_mut(&bit)
                        .expect("column created for every bit in final_mask")
                        .push_raw(src_ptr);
                }
            }
            for bit in add_mask.iter_bits() {
                let data = adds.remove(&bit).expect("bit gained by the fold was set by an add entry");
                self.archetypes[dest_index]
                    .columns
                    .get_mut(&bit)
                    .expect("column created for every bit in final_mask")
                    .push_component_data(data);
            }

            let entities_len = self.archetypes[old_mask_list_index].entities.len();
            let last = entities_len - 1;
            let swapped_handle = (old_storage_index != last).then(|| self.archetypes[old_mask_list_index].entities[last]);
            let entity_handle = self.archetypes[old_mask_list_index].entities.swap_remove(old_storage_index);
            for column in self.archetypes[old_mask_list_index].columns.values_mut() {
                column.swap_remove_row_no_drop(old_storage_index);
            }

            self.archetypes[dest_index].entities.push(entity_handle);
            let new_storage_index = self.archetypes[dest_index].entities.len() - 1;
            results.push((entity, dest_index, new_storage_index));
            current.insert(entity, (dest_index, new_storage_index));
            if let Some(swapped) = swapped_handle {
                results.push((swapped, old_mask_list_index, old_storage_index));
                current.insert(swapped, (old_mask_list_index, old_storage_index));
            }
        }
        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::EntitySlot;
    use crate::pool::PoolId;

    #[derive(Debug, Clone, Copy)]
    struct Position {
        x: f32,
    }
    #[derive(Debug, Clone, Copy)]
    struct Velocity {
        dx: f32,
    }
    crate::define_components! { Position, Velocity }

    fn spawn_with(pool: &mut ArchetypePool, entity: EntityId, pos: Position, vel: Option<Velocity>) -> (usize, usize) {
        let mut components = vec![(Position::BIT, ComponentData::new(pos))];
        if let Some(v) = vel {
            components.push((Velocity::BIT, ComponentData::new(v)));
        }
        pool.spawn(entity, components)
    }

    #[test]
    fn spawn_then_get_component() {
        let mut pool = ArchetypePool::new(ComponentMask::of::<Position>());
        let mut dir = EntityDirectory::new();
        let e = dir.allocate(EntitySlot::new(PoolId(0), 0, 0));
        let (storage_index, archetype_index) = spawn_with(&mut pool, e, Position { x: 1.0 }, None);
        assert_eq!(pool.get_component::<Position>(archetype_index, storage_index).unwrap().x, 1.0);
    }

    #[test]
    fn swap_remove_reports_displaced_handle() {
        let mut pool = ArchetypePool::new(ComponentMask::of::<Position>());
        let mut dir = EntityDirectory::new();
        let a = dir.allocate(EntitySlot::new(PoolId(0), 0, 0));
        let b = dir.allocate(EntitySlot::new(PoolId(0), 0, 0));
        let c = dir.allocate(EntitySlot::new(PoolId(0), 0, 0));
        spawn_with(&mut pool, a, Position { x: 0.0 }, None);
        spawn_with(&mut pool, b, Position { x: 1.0 }, None);
        let (_, archetype_index) = spawn_with(&mut pool, c, Position { x: 2.0 }, None);

        let swapped = pool.despawn_at(archetype_index, 0);
        assert_eq!(swapped, Some(c));
        assert_eq!(pool.get_component::<Position>(archetype_index, 0).unwrap().x, 2.0);
    }

    #[test]
    fn flush_migrates_entity_to_new_archetype() {
        let mut pool = ArchetypePool::new(ComponentMask::of::<Position>());
        let mut dir = EntityDirectory::new();
        let e = dir.allocate(EntitySlot::new(PoolId(0), 0, 0));
        let (storage_index, archetype_index) = spawn_with(&mut pool, e, Position { x: 3.0 }, None);
        if let Some(slot) = dir.get_mut(e) {
            slot.mask_list_index = archetype_index;
            slot.storage_index = storage_index;
        }

        pool.queue_migration(e, MigrationEntry::add(Velocity::BIT, ComponentData::new(Velocity { dx: 9.0 })));
        let results = pool.flush(&dir);

        assert_eq!(results.len(), 1);
        let (_, new_mask_list_index, new_storage_index) = results[0];
        assert_ne!(new_mask_list_index, archetype_index);
        assert_eq!(pool.get_component::<Position>(new_mask_list_index, new_storage_index).unwrap().x, 3.0);
        assert_eq!(pool.get_component::<Velocity>(new_mask_list_index, new_storage_index).unwrap().dx, 9.0);
    }

    #[test]
    fn flush_fold_no_op_leaves_entity_in_place() {
        let mut pool = ArchetypePool::new(ComponentMask::of::<Position>());
        let mut dir = EntityDirectory::new();
        let e = dir.allocate(EntitySlot::new(PoolId(0), 0, 0));
        let (storage_index, archetype_index) = spawn_with(&mut pool, e, Position { x: 4.0 }, None);
        if let Some(slot) = dir.get_mut(e) {
            slot.mask_list_index = archetype_index;
            slot.storage_index = storage_index;
        }

        pool.queue_migration(e, MigrationEntry::add(Velocity::BIT, ComponentData::new(Velocity { dx: 1.0 })));
        pool.queue_migration(e, MigrationEntry::remove(Velocity::BIT));
        let results = pool.flush(&dir);

        assert_eq!(results, vec![(e, archetype_index, storage_index)]);
        assert_eq!(pool.archetype_count(), 1);
    }
}
