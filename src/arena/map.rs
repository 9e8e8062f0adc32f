//======---------------------------------------------------------------======//
//                                                                           //
// Copyright 2022-2023 Evan Cox <evanacox00@gmail.com>. All rights reserved. //
//                                                                           //
// Use of this source code is governed by a BSD-style license that can be    //
// found in the LICENSE.txt file at the root of this project, or at the      //
// following link: https://opensource.org/licenses/BSD-3-Clause              //
//                                                                           //
//======---------------------------------------------------------------======//

use crate::arena::ArenaKey;
use std::fmt;
use std::fmt::{Debug, Formatter};
use std::marker::PhantomData;
use std::ops::{Index, IndexMut};

#[cfg(feature = "enable-serde")]
use serde::{Deserialize, Serialize};

/// This is meant to act as a primary mapping of `K -> V`, where `K` is some key
/// type and `V` is the value being stored. Other mappings that use the same
/// key as an existing [`ArenaMap`] should use [`SecondaryMap`](super::SecondaryMap) instead.
///
/// This is effectively a typed wrapper around `Vec<T>`: it only allows indexing
/// with the correct key type, and slots are never removed. Entities that are
/// logically deleted stay in their slot (e.g. an `Invalid` value), which is what
/// keeps every key that was ever handed out valid for the lifetime of the arena.
///
/// ```
/// # use opal::arena_key;
/// # use opal::arena::ArenaMap;
/// arena_key! {
///     struct Name;
/// }
///
/// let mut blocks = ArenaMap::new();
/// let bb: Name = blocks.insert("Hello!");
///
/// assert_eq!(blocks[bb], "Hello!");
/// ```
#[derive(Clone)]
#[cfg_attr(feature = "enable-serde", derive(Serialize, Deserialize))]
pub struct ArenaMap<K: ArenaKey, V> {
    slots: Vec<V>,
    #[cfg_attr(feature = "enable-serde", serde(skip))]
    _unused: PhantomData<fn() -> K>,
}

impl<K: ArenaKey, V> ArenaMap<K, V> {
    /// Creates a new, empty arena.
    #[inline]
    pub fn new() -> Self {
        Self::from_storage(Vec::new())
    }

    /// Creates an empty arena with an initial capacity.
    #[inline]
    pub fn with_capacity(capacity: usize) -> Self {
        Self::from_storage(Vec::with_capacity(capacity))
    }

    /// Creates an arena that reuses the allocation of `storage`. Anything
    /// left inside of `storage` is dropped first.
    ///
    /// This is how recycled slabs from a [`Cache`](crate::ir::Cache) are turned
    /// back into arenas without going back to the allocator.
    #[inline]
    pub fn from_storage(mut storage: Vec<V>) -> Self {
        storage.clear();

        Self {
            slots: storage,
            _unused: PhantomData,
        }
    }

    /// Gives up the arena and returns the underlying allocation.
    #[inline]
    pub fn into_storage(self) -> Vec<V> {
        self.slots
    }

    /// Checks if the arena contains a given key, i.e. whether a given key
    /// has been returned from [`Self::insert`] at some point.
    ///
    /// ```
    /// # use opal::arena_key;
    /// # use opal::arena::*;
    /// # arena_key! { struct Key; }
    /// let mut map = ArenaMap::default();
    /// let k1: Key = map.insert(true);
    /// let k2 = map.next_key();
    /// assert_eq!(map.contains(k1), true);
    /// assert_eq!(map.contains(k2), false);
    /// ```
    #[inline]
    pub fn contains(&self, key: K) -> bool {
        key.index() < self.slots.len()
    }

    /// Gets the value associated with `key`, if the key exists.
    #[inline]
    pub fn get(&self, key: K) -> Option<&V> {
        self.slots.get(key.index())
    }

    /// Gets the value associated with `key` mutably, if the key exists.
    #[inline]
    pub fn get_mut(&mut self, key: K) -> Option<&mut V> {
        self.slots.get_mut(key.index())
    }

    /// Inserts a value into the arena, returning the key that now refers to it.
    #[inline]
    pub fn insert(&mut self, value: V) -> K {
        let key = self.next_key();

        self.slots.push(value);

        key
    }

    /// Returns the key that the next call to [`Self::insert`] will return.
    #[inline]
    pub fn next_key(&self) -> K {
        K::new(self.slots.len())
    }

    /// Returns the number of slots that have been allocated.
    #[inline]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Checks if nothing has been inserted yet.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Returns the capacity of the underlying storage.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.slots.capacity()
    }

    /// Iterates over every key in insertion order.
    pub fn keys(&self) -> impl DoubleEndedIterator<Item = K> + ExactSizeIterator {
        (0..self.slots.len()).map(K::new)
    }

    /// Iterates over every value in insertion order.
    pub fn values(&self) -> impl DoubleEndedIterator<Item = &V> + ExactSizeIterator {
        self.slots.iter()
    }

    /// Iterates over every `(key, value)` pair in insertion order.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = (K, &V)> + ExactSizeIterator {
        self.slots.iter().enumerate().map(|(i, v)| (K::new(i), v))
    }

    /// Iterates over every `(key, value)` pair in insertion order, allowing
    /// the values to be modified.
    pub fn iter_mut(&mut self) -> impl DoubleEndedIterator<Item = (K, &mut V)> + ExactSizeIterator {
        self.slots.iter_mut().enumerate().map(|(i, v)| (K::new(i), v))
    }
}

impl<K: ArenaKey, V> Default for ArenaMap<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: ArenaKey, V> Index<K> for ArenaMap<K, V> {
    type Output = V;

    #[inline]
    fn index(&self, key: K) -> &Self::Output {
        &self.slots[key.index()]
    }
}

impl<K: ArenaKey, V> IndexMut<K> for ArenaMap<K, V> {
    #[inline]
    fn index_mut(&mut self, key: K) -> &mut Self::Output {
        &mut self.slots[key.index()]
    }
}

impl<K: ArenaKey, V: Debug> Debug for ArenaMap<K, V> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str("ArenaMap ")?;
        f.debug_map().entries(self.iter()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arena_key;

    arena_key! { struct E; }

    #[test]
    fn keys_are_handed_out_in_order() {
        let mut map = ArenaMap::new();
        let k1: E = map.insert("a");
        let k2: E = map.insert("b");

        assert_eq!(k1.index(), 0);
        assert_eq!(k2.index(), 1);
        assert_eq!(map.keys().collect::<Vec<_>>(), [k1, k2]);
        assert_eq!(map.values().copied().collect::<Vec<_>>(), ["a", "b"]);
    }

    #[test]
    fn storage_can_be_recycled() {
        let mut map = ArenaMap::<E, u64>::with_capacity(32);

        for i in 0..10 {
            map.insert(i);
        }

        let storage = map.into_storage();
        let cap = storage.capacity();
        let map = ArenaMap::<E, u64>::from_storage(storage);

        assert!(map.is_empty());
        assert_eq!(map.capacity(), cap);
        assert_eq!(map.next_key(), E::new(0));
    }

    #[test]
    fn get_out_of_range_is_none() {
        let mut map = ArenaMap::new();
        let k: E = map.insert(1);

        assert_eq!(map.get(k), Some(&1));
        assert_eq!(map.get(map.next_key()), None);

        *map.get_mut(k).unwrap() = 5;
        assert_eq!(map[k], 5);
    }
}
