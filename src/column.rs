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

//! Type-erased component columns shared by both storage engines.
//!
//! Components are a closed, compile-time enumeration (see [`crate::component`]),
//! so columns are identified by bit position rather than `TypeId`, but the
//! underlying byte-array + drop-function erasure technique is the same one the
//! teacher archetype used for its `ComponentColumn`.

use crate::component::Component;
use crate::migration::ComponentData;

/// A dense, gap-free column: used by the archetype pool, where every row in an
/// archetype has every component in the archetype's mask.
pub struct DenseColumn {
    data: Vec<u8>,
    item_size: usize,
    drop_fn: Option<unsafe fn(*mut u8)>,
    bit: u32,
}

impl DenseColumn {
    pub fn new<T: Component>() -> Self {
        Self {
            data: Vec::new(),
            item_size: std::mem::size_of::<T>(),
            drop_fn: if std::mem::needs_drop::<T>() {
                Some(|ptr| unsafe { std::ptr::drop_in_place(ptr as *mut T) })
            } else {
                None
            },
            bit: T::BIT,
        }
    }

    /// Build a column from an erased layout, used when the pool only knows a
    /// component's bit and byte layout (taken from the first [`ComponentData`]
    /// it receives) rather than its static type.
    pub fn from_layout(bit: u32, item_size: usize, drop_fn: Option<unsafe fn(*mut u8)>) -> Self {
        Self {
            data: Vec::new(),
            item_size,
            drop_fn,
            bit,
        }
    }

    /// Append an erased component value, consuming it.
    pub fn push_component_data(&mut self, data: ComponentData) {
        debug_assert_eq!(self.item_size, data.len());
        let ptr = self.get_ptr_mut(self.len());
        unsafe { data.write_into(ptr) };
    }

    pub fn bit(&self) -> u32 {
        self.bit
    }

    pub fn item_size(&self) -> usize {
        self.item_size
    }

    pub fn len(&self) -> usize {
        if self.item_size == 0 {
            0
        } else {
            self.data.len() / self.item_size
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn reserve(&mut self, additional_rows: usize) {
        self.data.reserve(additional_rows * self.item_size.max(1));
    }

    /// Push a raw, already-initialized row onto the end of the column.
    ///
    /// # Safety
    /// `src` must point to `item_size` readable, properly aligned bytes of the
    /// column's component type; ownership moves into the column (the caller
    /// must not drop the source).
    pub unsafe fn push_raw(&mut self, src: *const u8) {
        let old_len = self.data.len();
        self.data.resize(old_len + self.item_size, 0);
        unsafe {
            std::ptr::copy_nonoverlapping(src, self.data.as_mut_ptr().add(old_len), self.item_size);
        }
    }

    /// Pointer to row `index`, growing the backing buffer if needed. Used to
    /// write a freshly-allocated row in place.
    pub fn get_ptr_mut(&mut self, index: usize) -> *mut u8 {
        let offset = index * self.item_size;
        if offset + self.item_size > self.data.len() {
            self.data.resize(offset + self.item_size, 0);
        }
        unsafe { self.data.as_mut_ptr().add(offset) }
    }

    pub fn get<T: Component>(&self, index: usize) -> Option<&T> {
        let offset = index * self.item_size;
        if offset + self.item_size > self.data.len() {
            return None;
        }
        Some(unsafe { &*(self.data.as_ptr().add(offset) as *const T) })
    }

    pub fn get_mut<T: Component>(&mut self, index: usize) -> Option<&mut T> {
        let offset = index * self.item_size;
        if offset + self.item_size > self.data.len() {
            return None;
        }
        Some(unsafe { &mut *(self.data.as_mut_ptr().add(offset) as *mut T) })
    }

    /// Read-only pointer to row `index`. Caller must not read past `item_size` bytes.
    pub fn get_ptr(&self, index: usize) -> *const u8 {
        let offset = index * self.item_size;
        debug_assert!(offset + self.item_size <= self.data.len());
        unsafe { self.data.as_ptr().add(offset) }
    }

    pub fn drop_fn(&self) -> Option<unsafe fn(*mut u8)> {
        self.drop_fn
    }

    /// Swap-remove row `index` with the last row, dropping whichever ends up
    /// past the new length. Returns true if a swap occurred (i.e. `index` was
    /// not already the last row).
    pub fn swap_remove_row(&mut self, index: usize) -> bool {
        let len = self.len();
        if index >= len {
            return false;
        }
        let last = len - 1;
        if index != last {
            let (a, b) = (index * self.item_size, last * self.item_size);
            for i in 0..self.item_size {
                self.data.swap(a + i, b + i);
            }
        }
        if let Some(drop_fn) = self.drop_fn {
            let offset = last * self.item_size;
            unsafe { drop_fn(self.data.as_mut_ptr().add(offset)) };
        }
        self.data.truncate(last * self.item_size);
        index != last
    }

    /// Swap-remove row `index` like [`Self::swap_remove_row`] but without
    /// running the destructor on the vacated row: used when the row's value
    /// was already bit-copied elsewhere (an archetype migration), so it is
    /// logically moved rather than dropped.
    pub fn swap_remove_row_no_drop(&mut self, index: usize) -> bool {
        let len = self.len();
        if index >= len {
            return false;
        }
        let last = len - 1;
        if index != last {
            let (a, b) = (index * self.item_size, last * self.item_size);
            for i in 0..self.item_size {
                self.data.swap(a + i, b + i);
            }
        }
        self.data.truncate(last * self.item_size);
        index != last
    }

    /// Copy row `src_index` from `other` into a freshly-pushed row here. Used
    /// when migrating an entity between archetypes that share this component.
    ///
    /// # Safety
    /// `other` must be a column for the same component type.
    pub unsafe fn copy_row_from(&mut self, other: &DenseColumn, src_index: usize) {
        debug_assert_eq!(self.item_size, other.item_size);
        let offset = src_index * other.item_size;
        debug_assert!(offset + other.item_size <= other.data.len());
        unsafe {
            let src = other.data.as_ptr().add(offset);
            self.push_raw(src);
        }
    }
}

impl Drop for DenseColumn {
    fn drop(&mut self) {
        if let Some(drop_fn) = self.drop_fn {
            let count = self.len();
            for i in 0..count {
                let offset = i * self.item_size;
                unsafe { drop_fn(self.data.as_mut_ptr().add(offset)) };
            }
        }
    }
}

/// A column with holes: used by the sparse-set pool, where `storage_index` is
/// stable across the entity's lifetime but not every component is present at
/// every index.
pub struct SparseColumn {
    data: Vec<u8>,
    present: Vec<bool>,
    item_size: usize,
    drop_fn: Option<unsafe fn(*mut u8)>,
    bit: u32,
}

impl SparseColumn {
    pub fn new<T: Component>() -> Self {
        Self {
            data: Vec::new(),
            present: Vec::new(),
            item_size: std::mem::size_of::<T>(),
            drop_fn: if std::mem::needs_drop::<T>() {
                Some(|ptr| unsafe { std::ptr::drop_in_place(ptr as *mut T) })
            } else {
                None
            },
            bit: T::BIT,
        }
    }

    pub fn from_layout(bit: u32, item_size: usize, drop_fn: Option<unsafe fn(*mut u8)>) -> Self {
        Self {
            data: Vec::new(),
            present: Vec::new(),
            item_size,
            drop_fn,
            bit,
        }
    }

    /// Install an erased component value at `index`, consuming it and
    /// dropping whatever was previously there.
    pub fn set_component_data(&mut self, index: usize, data: ComponentData) {
        debug_assert_eq!(self.item_size, data.len());
        self.clear(index);
        self.ensure_capacity(index);
        let offset = index * self.item_size;
        unsafe { data.write_into(self.data.as_mut_ptr().add(offset)) };
        self.present[index] = true;
    }

    pub fn bit(&self) -> u32 {
        self.bit
    }

    fn ensure_capacity(&mut self, index: usize) {
        if index >= self.present.len() {
            self.present.resize(index + 1, false);
            self.data.resize((index + 1) * self.item_size.max(1), 0);
        }
    }

    pub fn has(&self, index: usize) -> bool {
        self.present.get(index).copied().unwrap_or(false)
    }

    /// # Safety
    /// `src` must point to `item_size` readable bytes of the column's component type.
    pub unsafe fn set_raw(&mut self, index: usize, src: *const u8) {
        self.clear(index);
        self.ensure_capacity(index);
        let offset = index * self.item_size;
        unsafe {
            std::ptr::copy_nonoverlapping(src, self.data.as_mut_ptr().add(offset), self.item_size);
        }
        self.present[index] = true;
    }

    pub fn get<T: Component>(&self, index: usize) -> Option<&T> {
        if !self.has(index) {
            return None;
        }
        let offset = index * self.item_size;
        Some(unsafe { &*(self.data.as_ptr().add(offset) as *const T) })
    }

    pub fn get_mut<T: Component>(&mut self, index: usize) -> Option<&mut T> {
        if !self.has(index) {
            return None;
        }
        let offset = index * self.item_size;
        Some(unsafe { &mut *(self.data.as_mut_ptr().add(offset) as *mut T) })
    }

    /// Drop and unmark the value at `index`, if present.
    pub fn clear(&mut self, index: usize) {
        if !self.has(index) {
            return;
        }
        if let Some(drop_fn) = self.drop_fn {
            let offset = index * self.item_size;
            unsafe { drop_fn(self.data.as_mut_ptr().add(offset)) };
        }
        self.present[index] = false;
    }

    /// Move the value at `src` to `dst` (used when migrating between virtual
    /// archetypes without moving physical storage).
    pub fn move_within(&mut self, src: usize, dst: usize) {
        if src == dst || !self.has(src) {
            return;
        }
        self.ensure_capacity(dst);
        self.clear(dst);
        let (src_off, dst_off) = (src * self.item_size, dst * self.item_size);
        for i in 0..self.item_size {
            let byte = self.data[src_off + i];
            self.data[dst_off + i] = byte;
        }
        self.present[dst] = true;
        self.present[src] = false;
    }
}

impl Drop for SparseColumn {
    fn drop(&mut self) {
        if let Some(drop_fn) = self.drop_fn {
            for (index, &present) in self.present.iter().enumerate() {
                if present {
                    let offset = index * self.item_size;
                    unsafe { drop_fn(self.data.as_mut_ptr().add(offset)) };
                }
            }
        }
    }
}
