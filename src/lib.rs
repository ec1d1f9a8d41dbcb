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

//! Archetype ECS - Entity Component System runtime with entity pools
//!
//! Entities are partitioned at build time into named **pools**, each with its
//! own required/optional component mask and storage strategy (archetype or
//! sparse-set). Structural changes are deferred through a migration queue and
//! applied at an explicit flush boundary so iteration is never invalidated by
//! mutation.

pub mod column;
pub mod component;
pub mod entity;
pub mod error;
pub mod interface;
pub mod mask;
pub mod migration;
pub mod pool;
pub mod pool_manager;
pub mod query;
pub mod system;
pub mod world;

mod archetype_pool;
mod sparse_pool;

// Re-exports for convenience
pub use component::{Component, ComponentInfo};
pub use entity::{EntityDirectory, EntityId, EntitySlot};
pub use error::{EcsError, Result};
pub use interface::{Ent, PoolInterface};
pub use mask::{ComponentMask, MAX_COMPONENTS};
pub use migration::{ComponentData, MigrationDirection, MigrationEntry, MigrationQueue};
pub use pool::{Pool, PoolConfig, PoolId, StorageStrategy};
pub use pool_manager::PoolManager;
pub use query::{Access, Query, QueryShape, QueryTerm, Read, Write};
pub use system::{BoxedSystem, System};
pub use world::World;
