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

//! Component registry.
//!
//! Components form a closed, build-time enumeration: the bit position of each
//! component type is derived from its declaration order in [`define_components!`],
//! not discovered at runtime. This keeps masks, column indices, and archetype
//! signatures fully static, per the "closed enumeration" design used throughout
//! this crate for components, pools, and systems alike.

use std::any::TypeId;

/// Marker trait for a component kind that has been given a fixed bit position by
/// [`define_components!`]. Never implement this by hand; the macro derives `BIT`
/// from declaration order and guarantees distinct values across the closed set.
pub trait Component: 'static + Send + Sync {
    /// Bit position of this component within a [`crate::mask::ComponentMask`].
    const BIT: u32;

    /// Human-readable name, used in diagnostics and error messages.
    fn name() -> &'static str;
}

/// Declare the closed set of component types used by a world.
///
/// Declaration order fixes bit positions `0..N-1`; `N` must not exceed
/// [`crate::mask::MAX_COMPONENTS`] (checked at compile time via a static assertion).
///
/// ```
/// # use archetype_ecs::define_components;
/// #[derive(Debug, Clone, Copy)]
/// pub struct Position { pub x: f32, pub y: f32 }
/// #[derive(Debug, Clone, Copy)]
/// pub struct Velocity { pub dx: f32, pub dy: f32 }
///
/// define_components! {
///     Position,
///     Velocity,
/// }
/// ```
#[macro_export]
macro_rules! define_components {
    ($($ty:ty),+ $(,)?) => {
        $crate::define_components!(@impl 0u32; $($ty),+);
        $crate::__component_count_assert!($($ty),+);
    };
    (@impl $n:expr; $head:ty $(, $tail:ty)*) => {
        impl $crate::component::Component for $head {
            const BIT: u32 = $n;
            fn name() -> &'static str {
                stringify!($head)
            }
        }
        $crate::define_components!(@impl $n + 1u32; $($tail),*);
    };
    (@impl $n:expr;) => {};
}

/// Internal: compile-time bound on component count, expanded by [`define_components!`].
#[macro_export]
#[doc(hidden)]
macro_rules! __component_count_assert {
    ($($ty:ty),+) => {
        const _: () = {
            const COUNT: u32 = 0u32 $(+ { let _ = stringify!($ty); 1u32 })+;
            assert!(COUNT <= $crate::mask::MAX_COMPONENTS, "component count exceeds mask width");
        };
    };
}

/// Erased identity of a declared component, used where a `TypeId` is needed
/// alongside its registry bit (debug assertions, diagnostics).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ComponentInfo {
    pub type_id: TypeId,
    pub bit: u32,
    pub name: &'static str,
}

impl ComponentInfo {
    pub fn of<T: Component>() -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            bit: T::BIT,
            name: T::name(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mask::ComponentMask;

    #[derive(Debug, Clone, Copy)]
    struct Position {
        #[allow(dead_code)]
        x: f32,
    }
    #[derive(Debug, Clone, Copy)]
    struct Velocity {
        #[allow(dead_code)]
        dx: f32,
    }
    #[derive(Debug, Clone, Copy)]
    struct Health {
        #[allow(dead_code)]
        cur: u32,
    }

    crate::define_components! {
        Position,
        Velocity,
        Health,
    }

    #[test]
    fn bits_follow_declaration_order() {
        assert_eq!(Position::BIT, 0);
        assert_eq!(Velocity::BIT, 1);
        assert_eq!(Health::BIT, 2);
    }

    #[test]
    fn mask_of_matches_bit() {
        let mask = ComponentMask::of::<Velocity>();
        assert!(mask.contains::<Velocity>());
        assert!(!mask.contains::<Position>());
    }

    #[test]
    fn component_info_roundtrip() {
        let info = ComponentInfo::of::<Health>();
        assert_eq!(info.bit, Health::BIT);
        assert_eq!(info.name, "Health");
    }
}
