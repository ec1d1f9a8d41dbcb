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

//! Error types.

use std::fmt;

/// ECS error type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EcsError {
    /// A handle's generation no longer matches any live entity.
    StaleEntity,

    /// The entity's current pool does not match the pool an operation targeted.
    EntityPoolMismatch { pool: String },

    /// The pool's declared mask does not include this component at all.
    ComponentNotInPool { pool: String },

    /// The component is not part of the archetype currently holding the entity.
    ComponentNotInArchetype,

    /// Queried or accessed a component the entity does not currently have.
    EntityDoesNotHaveComponent,

    /// Tried to add a component the entity already has pending or present.
    EntityAlreadyHasComponent,

    /// A migration queued an `Add` for a bit already set on the entity's mask.
    AddingExistingComponent,

    /// A migration queued a `Remove` for a bit not set on the entity's mask.
    RemovingNonexistingComponent,

    /// An `Add` migration carried no component payload.
    NullComponentData,

    /// Referenced an archetype index outside the pool's archetype list.
    ArchetypeDoesNotExist,

    /// A pool was declared with an empty required mask.
    PoolMustContainAtLeastOneComponent { pool: String },

    /// A spawn or migration mask is missing one of the pool's required components.
    RequiredComponentMissing { pool: String },

    /// A migration tried to remove a component the pool declares as required.
    CannotRemoveRequiredComponent { pool: String },

    /// No pool is registered under the given name.
    PoolNotFound { pool: String },

    /// A pool name was registered twice.
    DuplicatePoolName { pool: String },
}

impl fmt::Display for EcsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EcsError::StaleEntity => write!(f, "entity handle is stale"),
            EcsError::EntityPoolMismatch { pool } => write!(f, "entity does not belong to pool '{pool}'"),
            EcsError::ComponentNotInPool { pool } => write!(f, "component is not declared on pool '{pool}'"),
            EcsError::ComponentNotInArchetype => write!(f, "component is not part of the entity's current archetype"),
            EcsError::EntityDoesNotHaveComponent => write!(f, "entity does not have the requested component"),
            EcsError::EntityAlreadyHasComponent => write!(f, "entity already has this component"),
            EcsError::AddingExistingComponent => write!(f, "cannot add a component the entity already has"),
            EcsError::RemovingNonexistingComponent => write!(f, "cannot remove a component the entity does not have"),
            EcsError::NullComponentData => write!(f, "add migration is missing its component payload"),
            EcsError::ArchetypeDoesNotExist => write!(f, "archetype index does not exist in this pool"),
            EcsError::PoolMustContainAtLeastOneComponent { pool } => {
                write!(f, "pool '{pool}' must require at least one component")
            }
            EcsError::RequiredComponentMissing { pool } => write!(f, "mask is missing a component required by pool '{pool}'"),
            EcsError::CannotRemoveRequiredComponent { pool } => {
                write!(f, "cannot remove a component required by pool '{pool}'")
            }
            EcsError::PoolNotFound { pool } => write!(f, "no pool named '{pool}'"),
            EcsError::DuplicatePoolName { pool } => write!(f, "a pool named '{pool}' already exists"),
        }
    }
}

impl std::error::Error for EcsError {}

/// Result type alias.
pub type Result<T> = std::result::Result<T, EcsError>;
