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

//! Query planning and iteration.
//!
//! A query is built once from a component predicate `Q` and classified per
//! declared pool: `Q ⊆ pool.pool_mask` is required for the pool to match at
//! all; within that, `Q ⊆ pool.required_mask` means every archetype the pool
//! will ever hold contains `Q` (`Direct`), otherwise each archetype must be
//! tested individually (`Lookup`). The plan is fixed at build time; only the
//! per-pool archetype membership lists are refreshed per tick, consuming each
//! pool's `new_archetypes`/`reindexed_archetypes` notify lists.

use std::marker::PhantomData;

use crate::archetype_pool::ArchetypePool;
use crate::component::Component;
use crate::entity::EntityId;
use crate::mask::ComponentMask;
use crate::pool::PoolId;
use crate::pool_manager::PoolManager;
use crate::sparse_pool::SparsePool;

/// Read-only access to a component within a query.
pub struct Read<T>(PhantomData<fn() -> T>);
/// Mutable access to a component within a query.
pub struct Write<T>(PhantomData<fn() -> T>);

/// One component access requested by a query.
pub trait QueryTerm {
    type Component: Component;
    type Item<'a>;

    fn mask() -> ComponentMask {
        ComponentMask::of::<Self::Component>()
    }

    /// # Safety
    /// Caller must ensure no other live term for the same query aliases this
    /// component's bit with conflicting mutability, and that the component is
    /// present at `(mask_list_index, row)` (guaranteed by the query's mask).
    unsafe fn fetch_archetype<'a>(pool: *mut ArchetypePool, mask_list_index: usize, row: usize) -> Self::Item<'a>;

    /// # Safety
    /// Same contract as [`Self::fetch_archetype`], for the sparse-set engine.
    unsafe fn fetch_sparse<'a>(pool: *mut SparsePool, storage_index: usize) -> Self::Item<'a>;
}

impl<T: Component> QueryTerm for Read<T> {
    type Component = T;
    type Item<'a> = &'a T;

    unsafe fn fetch_archetype<'a>(pool: *mut ArchetypePool, mask_list_index: usize, row: usize) -> Self::Item<'a> {
        unsafe { (*pool).get_component::<T>(mask_list_index, row) }.expect("component present per query mask")
    }

    unsafe fn fetch_sparse<'a>(pool: *mut SparsePool, storage_index: usize) -> Self::Item<'a> {
        unsafe { (*pool).get_component::<T>(storage_index) }.expect("component present per query mask")
    }
}

impl<T: Component> QueryTerm for Write<T> {
    type Component = T;
    type Item<'a> = &'a mut T;

    unsafe fn fetch_archetype<'a>(pool: *mut ArchetypePool, mask_list_index: usize, row: usize) -> Self::Item<'a> {
        unsafe { (*pool).get_component_mut::<T>(mask_list_index, row) }.expect("component present per query mask")
    }

    unsafe fn fetch_sparse<'a>(pool: *mut SparsePool, storage_index: usize) -> Self::Item<'a> {
        unsafe { (*pool).get_component_mut::<T>(storage_index) }.expect("component present per query mask")
    }
}

/// The tuple of [`QueryTerm`]s that defines a query's predicate and yielded item.
pub trait QueryShape {
    type Item<'a>;

    fn mask() -> ComponentMask;

    /// # Safety
    /// Same contract as the individual terms' `fetch_archetype`.
    unsafe fn fetch_archetype<'a>(pool: &'a mut ArchetypePool, mask_list_index: usize, row: usize) -> Self::Item<'a>;

    /// # Safety
    /// Same contract as the individual terms' `fetch_sparse`.
    unsafe fn fetch_sparse<'a>(pool: &'a mut SparsePool, storage_index: usize) -> Self::Item<'a>;
}

macro_rules! impl_query_shape {
    ($($term:ident),+) => {
        impl<$($term: QueryTerm),+> QueryShape for ($($term,)+) {
            type Item<'a> = ($($term::Item<'a>,)+);

            fn mask() -> ComponentMask {
                ComponentMask::EMPTY $(.union($term::mask()))+
            }

            unsafe fn fetch_archetype<'a>(pool: &'a mut ArchetypePool, mask_list_index: usize, row: usize) -> Self::Item<'a> {
                let ptr = pool as *mut ArchetypePool;
                unsafe { ($($term::fetch_archetype(ptr, mask_list_index, row),)+) }
            }

            unsafe fn fetch_sparse<'a>(pool: &'a mut SparsePool, storage_index: usize) -> Self::Item<'a> {
                let ptr = pool as *mut SparsePool;
                unsafe { ($($term::fetch_sparse(ptr, storage_index),)+) }
            }
        }
    };
}

impl_query_shape!(A);
impl_query_shape!(A, B);
impl_query_shape!(A, B, C);
impl_query_shape!(A, B, C, D);

/// Whether every archetype of a matching pool is guaranteed to satisfy the
/// query (`Direct`), or each archetype must be tested individually (`Lookup`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Direct,
    Lookup,
}

struct PlanEntry {
    pool_id: PoolId,
    access: Access,
}

/// A built, refreshable query over the declared pools.
pub struct Query<Q: QueryShape> {
    mask: ComponentMask,
    plan: Vec<PlanEntry>,
    /// Per plan-entry, the archetype / virtual-archetype indices known to match,
    /// in discovery order.
    tracked: Vec<Vec<usize>>,
    _marker: PhantomData<fn() -> Q>,
}

impl<Q: QueryShape> Query<Q> {
    /// Build the plan once against the currently-declared pools, then
    /// populate it against every archetype each matching pool already holds
    /// -- a query may be constructed long after pools it matches have had
    /// their notify lists drained, so initial population cannot rely on
    /// `new_archetypes` alone. Later updates flow through [`Self::refresh`].
    pub fn new(manager: &PoolManager) -> Self {
        let mask = Q::mask();
        let mut plan = Vec::new();
        let mut tracked = Vec::new();
        for pool in manager.pools() {
            if !mask.is_subset_of(pool.config.pool_mask()) {
                continue;
            }
            let access = if mask.is_subset_of(pool.required_mask()) { Access::Direct } else { Access::Lookup };
            let matches: Vec<usize> = (0..pool.archetype_count())
                .filter(|&archetype_index| match access {
                    Access::Direct => true,
                    Access::Lookup => pool.archetype_mask(archetype_index).is_some_and(|m| mask.is_subset_of(m)),
                })
                .collect();
            plan.push(PlanEntry { pool_id: pool.id, access });
            tracked.push(matches);
        }
        Self { mask, plan, tracked, _marker: PhantomData }
    }

    pub fn access_for(&self, pool_id: PoolId) -> Option<Access> {
        self.plan.iter().find(|e| e.pool_id == pool_id).map(|e| e.access)
    }

    /// Consume each plan entry's pool's notify lists, extending the tracked
    /// archetype indices. Call once per tick after `flush_all_pools`, before
    /// iterating. Idempotent against repeated calls before the next
    /// `clear_notify_lists` -- a pool's `new_archetypes` stays populated
    /// until that clear, so a second refresh in the same window must not
    /// re-track an index it already holds.
    pub fn refresh(&mut self, manager: &PoolManager) {
        for (entry, tracked) in self.plan.iter().zip(self.tracked.iter_mut()) {
            let pool = manager.pool(entry.pool_id);
            for &archetype_index in pool.new_archetypes() {
                if tracked.contains(&archetype_index) {
                    continue;
                }
                match entry.access {
                    Access::Direct => tracked.push(archetype_index),
                    Access::Lookup => {
                        if let Some(archetype_mask) = pool.archetype_mask(archetype_index) {
                            if self.mask.is_subset_of(archetype_mask) {
                                tracked.push(archetype_index);
                            }
                        }
                    }
                }
            }
            // reindexed_archetypes: component values are re-fetched by index on
            // every iteration rather than cached as raw pointers, so a growth
            // notification needs no action here; tracked indices stay valid.
        }
    }

    /// Visit every matching entity, in plan declaration order and discovery
    /// order within each pool.
    pub fn for_each_mut(&self, manager: &mut PoolManager, mut f: impl FnMut(EntityId, Q::Item<'_>)) {
        for (entry, archetype_indices) in self.plan.iter().zip(self.tracked.iter()) {
            let pool = manager.pool_mut(entry.pool_id);
            if let Some(archetype_pool) = pool.as_archetype_mut() {
                for &mask_list_index in archetype_indices {
                    let len = archetype_pool.entities(mask_list_index).len();
                    for row in 0..len {
                        let entity = archetype_pool.entities(mask_list_index)[row];
                        let item = unsafe { Q::fetch_archetype(archetype_pool, mask_list_index, row) };
                        f(entity, item);
                    }
                }
            } else if let Some(sparse_pool) = pool.as_sparse_mut() {
                for &mask_list_index in archetype_indices {
                    let members = sparse_pool.members(mask_list_index).map(<[usize]>::to_vec).unwrap_or_default();
                    for storage_index in members {
                        if let Some(entity) = sparse_pool.entity_at(storage_index) {
                            let item = unsafe { Q::fetch_sparse(sparse_pool, storage_index) };
                            f(entity, item);
                        }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::EntityDirectory;
    use crate::mask::ComponentMask;
    use crate::migration::ComponentData;
    use crate::pool::{PoolConfig, StorageStrategy};

    #[derive(Debug, Clone, Copy)]
    struct Position {
        x: f32,
        #[allow(dead_code)]
        y: f32,
    }
    #[derive(Debug, Clone, Copy)]
    struct Velocity {
        dx: f32,
        #[allow(dead_code)]
        dy: f32,
    }
    #[derive(Debug, Clone, Copy)]
    struct Health {
        #[allow(dead_code)]
        cur: u32,
    }
    crate::define_components! { Position, Velocity, Health }

    fn spawn(manager: &mut PoolManager, directory: &mut EntityDirectory, pool_id: PoolId, components: Vec<(u32, ComponentData)>) -> EntityId {
        let entity = directory.allocate(crate::entity::EntitySlot::new(pool_id, 0, 0));
        let (storage_index, mask_list_index) = manager.pool_mut(pool_id).spawn(entity, components);
        if let Some(slot) = directory.get_mut(entity) {
            slot.mask_list_index = mask_list_index;
            slot.storage_index = storage_index;
        }
        entity
    }

    #[test]
    fn basic_move_over_five_ticks() {
        let mut manager = PoolManager::new();
        let mut directory = EntityDirectory::new();
        let movement = manager
            .declare(PoolConfig::new(
                "Movement",
                ComponentMask::of::<Position>().union(ComponentMask::of::<Velocity>()),
                StorageStrategy::Archetype,
            ))
            .unwrap();

        for x in [0.0f32, 1.0, 2.0] {
            spawn(
                &mut manager,
                &mut directory,
                movement,
                vec![
                    (Position::BIT, ComponentData::new(Position { x, y: x })),
                    (Velocity::BIT, ComponentData::new(Velocity { dx: 1.0, dy: 0.0 })),
                ],
            );
        }

        let mut query: Query<(Write<Position>, Read<Velocity>)> = Query::new(&manager);
        for _ in 0..5 {
            query.for_each_mut(&mut manager, |_entity, (pos, vel)| {
                pos.x += vel.dx;
            });
            manager.flush_all_pools(&mut directory);
            query.refresh(&manager);
            manager.clear_notify_lists();
        }

        let mut xs: Vec<f32> = Vec::new();
        query.for_each_mut(&mut manager, |_entity, (pos, _vel)| xs.push(pos.x));
        xs.sort_by(|a, b| a.partial_cmp(b).unwrap());
        assert_eq!(xs, vec![5.0, 6.0, 7.0]);
    }

    #[test]
    fn direct_vs_lookup_classification() {
        let mut manager = PoolManager::new();
        let combat_required = ComponentMask::of::<Health>().union(ComponentMask::of::<Velocity>());
        let combat = manager.declare(PoolConfig::new("Combat", combat_required, StorageStrategy::Archetype)).unwrap();
        let general = manager
            .declare(
                PoolConfig::new("General", ComponentMask::EMPTY.add_bit(Position::BIT), StorageStrategy::Sparse)
                    .with_optional(ComponentMask::of::<Health>().union(ComponentMask::of::<Velocity>())),
            )
            .unwrap();

        let query: Query<(Read<Health>, Read<Velocity>)> = Query::new(&manager);
        assert_eq!(query.access_for(combat), Some(Access::Direct));
        assert_eq!(query.access_for(general), Some(Access::Lookup));
    }
}
