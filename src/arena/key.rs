//======---------------------------------------------------------------======//
//                                                                           //
// Copyright 2022-2023 Evan Cox <evanacox00@gmail.com>. All rights reserved. //
//                                                                           //
// Use of this source code is governed by a BSD-style license that can be    //
// found in the LICENSE.txt file at the root of this project, or at the      //
// following link: https://opensource.org/licenses/BSD-3-Clause              //
//                                                                           //
//======---------------------------------------------------------------======//

use std::fmt::Debug;

/// Models a type that can act as a key for the arena map types and for the
/// sparse containers in [`utility`](crate::utility).
///
/// Keys are dense: they are created from a `usize` index and convert back to
/// that same index. Most of the optimizer relies on this to index flat tables
/// by value or block ID.
///
/// Prefer the [`arena_key`](crate::arena_key) or [`dense_arena_key`](crate::dense_arena_key)
/// macros over implementing this by hand.
pub trait ArenaKey: Copy + Eq + Debug {
    /// The underlying data type of the key.
    type Item;

    /// Creates a new key from a given arena index.
    ///
    /// Panics if the index is not representable with the key's storage type,
    /// an overflowing key would silently alias another entity otherwise.
    fn new(index: usize) -> Self;

    /// Converts the key back into the `usize` index it was created from.
    fn index(self) -> usize;
}

/// Creates a type-safe key for a [`ArenaMap`](crate::arena::ArenaMap) and associated data structures.
///
/// The inner storage type of the key can be customized, if it is not specified
/// `usize` is used.
///
/// ```
/// # use opal::arena_key;
/// # use opal::arena::ArenaMap;
/// arena_key! {
///     /// We can have doc comments! This one uses the default data type.
///     pub struct EntityRef;
///
///     // this one is private, and uses u8 as the key type.
///     struct ExtremelyDenseRef(u8);
/// }
///
/// type EntityMap<V> = ArenaMap<EntityRef, V>;
/// type ExtremelyDenseMap<V> = ArenaMap<ExtremelyDenseRef, V>;
/// ```
#[macro_export(local_inner_macros)]
macro_rules! arena_key {
    ( $(#[$outer:meta])* $vis:vis struct $name:ident($ty:ty); $($rest:tt)* ) => {
        $(#[$outer])*
        #[repr(transparent)]
        #[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
        #[cfg_attr(feature = "enable-serde", derive(serde::Serialize, serde::Deserialize))]
        $vis struct $name($ty);

        impl $crate::arena::ArenaKey for $name {
            type Item = $ty;

            #[inline]
            fn new(index: usize) -> Self {
                use std::convert::TryInto;

                Self(index.try_into().expect("index is not representable with key type"))
            }

            #[inline]
            fn index(self) -> usize {
                self.0 as usize
            }
        }

        impl ::std::fmt::Debug for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> ::std::result::Result<(), ::std::fmt::Error> {
                std::write!(f, "{}({})", std::stringify!($name), self.0)
            }
        }

        arena_key!($($rest)*);
    };

    ( $(#[$outer:meta])* $vis:vis struct $name:ident; $($rest:tt)* ) => {
        arena_key! { $(#[$outer])* $vis struct $name(usize); $($rest)* }
    };

    () => {}
}

/// Creates a type-safe key with [`u32`] as the underlying data type. Acts
/// like [`arena_key`] otherwise.
///
/// This also implements [`Packable`](crate::utility::Packable) with `u32::MAX`
/// reserved as the "none" value, so these keys can be stored inside of a
/// [`PackedOption`](crate::utility::PackedOption) at no extra cost.
///
/// A key can optionally be given a short textual prefix, in which case it also
/// implements [`Display`](std::fmt::Display) as `{prefix}{index}`. This is how
/// `v12` and `b3` get printed in diagnostics.
///
/// ```
/// # use opal::dense_arena_key;
/// # use opal::arena::ArenaMap;
/// dense_arena_key! {
///     pub struct DenseRef;
///
///     pub struct Node: "n";
/// }
///
/// type DenseMapping = ArenaMap<DenseRef, String>;
/// ```
#[macro_export(local_inner_macros)]
macro_rules! dense_arena_key {
    ( $(#[$outer:meta])* $vis:vis struct $name:ident: $prefix:literal; $($rest:tt)* ) => {
        dense_arena_key! { $(#[$outer])* $vis struct $name; }

        impl ::std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> Result<(), std::fmt::Error> {
                std::write!(f, "{}{}", $prefix, self.0)
            }
        }

        dense_arena_key!($($rest)*);
    };

    ( $(#[$outer:meta])* $vis:vis struct $name:ident; $($rest:tt)* ) => {
        arena_key! { $(#[$outer])* $vis struct $name(u32); }

        impl $crate::utility::Packable for $name {
            #[inline]
            fn reserved_null() -> Self {
                Self(u32::MAX)
            }

            #[inline]
            fn is_reserved_null(&self) -> bool {
                self.0 == u32::MAX
            }
        }

        dense_arena_key!($($rest)*);
    };

    () => {}
}

#[cfg(test)]
mod tests {
    use crate::arena::*;
    use crate::utility::Packable;
    use crate::{arena_key, dense_arena_key};
    use static_assertions::assert_eq_size;

    #[test]
    fn reserved_key_works() {
        dense_arena_key! { struct K; }

        let mut map = ArenaMap::<K, i32>::default();

        let k1 = map.insert(15);
        let k2 = map.insert(32);
        let k3 = K::reserved_null();

        assert!(k3.is_reserved_null());
        assert!(!k2.is_reserved_null());
        assert!(!k1.is_reserved_null());
    }

    #[test]
    fn arena_key_default_is_usize() {
        arena_key! { struct Key; }

        assert_eq_size!(Key, usize);
    }

    #[test]
    fn dense_arena_key_is_u32() {
        dense_arena_key! { struct Key; }

        assert_eq_size!(Key, u32);
    }

    #[test]
    fn prefixed_key_displays_with_prefix() {
        dense_arena_key! { struct Node: "n"; }

        let mut map = ArenaMap::new();
        let _: Node = map.insert(());
        let second: Node = map.insert(());

        assert_eq!(second.to_string(), "n1");
        assert_eq!(std::format!("{second:?}"), "Node(1)");
    }

    #[test]
    fn can_use_arena_key_non_default_in_map() {
        arena_key! { struct Key(u16); }

        let mut map = ArenaMap::new();
        let k1: Key = map.insert(1);
        let k2: Key = map.insert(2);

        assert_eq!(map[k1], 1);
        assert_eq!(map[k2], 2);
        assert_eq!(k2.index(), 1);
    }

    #[test]
    #[should_panic(expected = "index is not representable with key type")]
    fn arena_key_bounds_causes_panic() {
        arena_key! { struct Key(u8); }

        let mut map = ArenaMap::new();

        // 1 past what u8 can represent
        for i in 0..=256 {
            let k: Key = map.insert(i);

            assert_eq!(map[k], i);
        }
    }
}
