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

//! Deferred structural mutation.
//!
//! Callers may add/remove components (or destroy entities) from within a query
//! loop. Rather than restructure storage mid-iteration, the mutation is appended
//! to a per-entity, per-pool queue and applied at the next explicit flush
//! boundary (see [`crate::pool_manager::PoolManager::flush_all_pools`]). This
//! mirrors a deferred command-buffer pattern, but keyed by entity and folded
//! into a single resolved mask per flush instead of replayed as opaque
//! closures.

use ahash::AHashMap;

use crate::entity::EntityId;
use crate::mask::ComponentMask;

/// Direction of a single queued structural change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationDirection {
    Add,
    Remove,
}

/// Type-erased component payload carried by an `Add` migration entry.
///
/// Stored as raw bytes plus a drop function so the queue does not need a
/// generic parameter per component type; the pool that drains the queue knows
/// which component the bit identifies and reinterprets the bytes accordingly.
pub struct ComponentData {
    bytes: Box<[u8]>,
    drop_fn: Option<unsafe fn(*mut u8)>,
}

impl ComponentData {
    /// # Safety
    /// `T` must match the component bit this payload will be installed under.
    pub fn new<T: 'static>(value: T) -> Self {
        let boxed = Box::new(value);
        let ptr = Box::into_raw(boxed) as *mut u8;
        let len = std::mem::size_of::<T>();
        let bytes = unsafe { Box::from_raw(std::slice::from_raw_parts_mut(ptr, len)) };
        Self {
            bytes,
            drop_fn: if std::mem::needs_drop::<T>() {
                Some(|ptr| unsafe { std::ptr::drop_in_place(ptr as *mut T) })
            } else {
                None
            },
        }
    }

    /// Size in bytes of the carried value; used to lazily size a column when
    /// the first instance of a component arrives.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn drop_fn(&self) -> Option<unsafe fn(*mut u8)> {
        self.drop_fn
    }

    /// Raw pointer to the payload bytes, for copying into a column slot.
    pub fn as_ptr(&self) -> *const u8 {
        self.bytes.as_ptr()
    }

    /// Copy the payload into `dst`, consuming this entry. `dst` must have room
    /// for exactly `self.bytes.len()` bytes and the correct alignment for `T`.
    ///
    /// # Safety
    /// Caller must ensure `dst` is valid for `size_of::<T>()` writes and that
    /// `T` matches the type this payload was created with.
    pub unsafe fn write_into(mut self, dst: *mut u8) {
        unsafe {
            std::ptr::copy_nonoverlapping(self.bytes.as_ptr(), dst, self.bytes.len());
        }
        // Ownership of the bytes moved to `dst`; skip our own drop.
        self.drop_fn = None;
    }
}

impl Drop for ComponentData {
    fn drop(&mut self) {
        if let Some(drop_fn) = self.drop_fn.take() {
            unsafe { drop_fn(self.bytes.as_mut_ptr()) };
        }
    }
}

impl std::fmt::Debug for ComponentData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComponentData")
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// A single queued structural change for one entity.
#[derive(Debug)]
pub struct MigrationEntry {
    pub direction: MigrationDirection,
    pub bit: u32,
    /// Present only for `Add` entries; `None` means "component data supplied
    /// elsewhere" (unused in the add path, kept for symmetry/debugging).
    pub data: Option<ComponentData>,
}

impl MigrationEntry {
    pub fn add(bit: u32, data: ComponentData) -> Self {
        Self {
            direction: MigrationDirection::Add,
            bit,
            data: Some(data),
        }
    }

    pub fn remove(bit: u32) -> Self {
        Self {
            direction: MigrationDirection::Remove,
            bit,
            data: None,
        }
    }
}

/// Per-pool queue of pending migrations, keyed by entity.
///
/// Entries for one entity are kept in insertion (FIFO) order so the fold that
/// computes the final mask is well-defined even for a conflicting pair on the
/// same bit (add then remove, or vice versa): the net effect is the last one.
#[derive(Debug, Default)]
pub struct MigrationQueue {
    pending: AHashMap<EntityId, Vec<MigrationEntry>>,
}

impl MigrationQueue {
    pub fn new() -> Self {
        Self {
            pending: AHashMap::new(),
        }
    }

    pub fn push(&mut self, entity: EntityId, entry: MigrationEntry) {
        self.pending.entry(entity).or_default().push(entry);
    }

    pub fn is_pending(&self, entity: EntityId) -> bool {
        self.pending.contains_key(&entity)
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Entries already queued for `entity`, if any, without draining them.
    pub fn peek(&self, entity: EntityId) -> Option<&[MigrationEntry]> {
        self.pending.get(&entity).map(Vec::as_slice)
    }

    /// Fold a queue of entries over a starting mask: `|=` for adds, `& !` for
    /// removes, applied in insertion order.
    pub fn fold_mask(old_mask: ComponentMask, entries: &[MigrationEntry]) -> ComponentMask {
        entries.iter().fold(old_mask, |mask, entry| match entry.direction {
            MigrationDirection::Add => mask.add_bit(entry.bit),
            MigrationDirection::Remove => mask.remove_bit(entry.bit),
        })
    }

    /// Drain the queue, returning each entity's entry vector. The queue is
    /// empty after this call; per-entity vectors are freed by the caller once
    /// consumed.
    pub fn drain(&mut self) -> Vec<(EntityId, Vec<MigrationEntry>)> {
        self.pending.drain().collect()
    }
}
