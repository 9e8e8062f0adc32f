//======---------------------------------------------------------------======//
//                                                                           //
// Copyright 2022 Evan Cox <evanacox00@gmail.com>. All rights reserved.      //
//                                                                           //
// Use of this source code is governed by a BSD-style license that can be    //
// found in the LICENSE.txt file at the root of this project, or at the      //
// following link: https://opensource.org/licenses/BSD-3-Clause              //
//                                                                           //
//======---------------------------------------------------------------======//

use crate::arena::{ArenaKey, ArenaMap};
use std::fmt;
use std::fmt::{Debug, Formatter};
use std::marker::PhantomData;
use std::ops::{Index, IndexMut};

#[cfg(feature = "enable-serde")]
use serde::{Deserialize, Serialize};

/// Intended to be a dense secondary mapping `K -> V` for keys from a primary [`ArenaMap`]. This
/// is to associate extra data with most (but ideally *all*) keys from a given primary map, e.g.
/// the immediate dominator of every block or the postorder number of every block.
///
/// Space is reserved for every key up to the highest one inserted, so this should not be used
/// to map a handful of keys out of a large key space. Use a
/// [`SparseMap`](crate::utility::SparseMap) for that.
///
/// ```
/// # use opal::arena_key;
/// # use opal::arena::*;
/// arena_key! { struct Key; }
///
/// let mut primary = ArenaMap::new();
/// let k1: Key = primary.insert("first");
/// let k2 = primary.insert("second");
/// let mut lengths = SecondaryMap::new();
///
/// lengths.insert(k2, primary[k2].len());
///
/// assert_eq!(lengths.get(k1), None);
/// assert_eq!(lengths[k2], 6);
/// ```
#[derive(Clone, PartialEq, Eq)]
#[cfg_attr(feature = "enable-serde", derive(Serialize, Deserialize))]
pub struct SecondaryMap<K: ArenaKey, V> {
    slots: Vec<Option<V>>,
    #[cfg_attr(feature = "enable-serde", serde(skip))]
    _unused: PhantomData<fn() -> K>,
}

impl<K: ArenaKey, V> SecondaryMap<K, V> {
    /// Creates an empty map.
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Creates an empty map with room for keys up to `cap` without reallocating.
    pub fn with_capacity(cap: usize) -> Self {
        Self {
            slots: Vec::with_capacity(cap),
            _unused: PhantomData,
        }
    }

    /// Creates a map where every key with an index below `len` maps to a copy of `value`.
    ///
    /// ```
    /// # use opal::arena_key;
    /// # use opal::arena::*;
    /// # arena_key! { struct Key; }
    /// let live = SecondaryMap::<Key, bool>::fill(3, false);
    ///
    /// assert_eq!(live[Key::new(2)], false);
    /// ```
    pub fn fill(len: usize, value: V) -> Self
    where
        V: Clone,
    {
        Self {
            slots: vec![Some(value); len],
            _unused: PhantomData,
        }
    }

    /// Checks if `key` has a mapping.
    #[inline]
    pub fn contains(&self, key: K) -> bool {
        matches!(self.slots.get(key.index()), Some(Some(_)))
    }

    /// Gets the value mapped to `key`, if there is one.
    #[inline]
    pub fn get(&self, key: K) -> Option<&V> {
        self.slots.get(key.index()).and_then(Option::as_ref)
    }

    /// Gets the value mapped to `key` mutably, if there is one.
    #[inline]
    pub fn get_mut(&mut self, key: K) -> Option<&mut V> {
        self.slots.get_mut(key.index()).and_then(Option::as_mut)
    }

    /// Maps `key` to `value`, returning the previous value if there was one.
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        let index = key.index();

        if index >= self.slots.len() {
            self.slots.resize_with(index + 1, || None);
        }

        self.slots[index].replace(value)
    }

    /// Removes the mapping for `key` and returns it.
    pub fn take(&mut self, key: K) -> Option<V> {
        self.slots.get_mut(key.index()).and_then(Option::take)
    }

    /// Removes every mapping while keeping the allocation.
    pub fn clear(&mut self) {
        self.slots.clear();
    }

    /// Iterates over every key that has a mapping, in key order.
    pub fn keys(&self) -> impl Iterator<Item = K> + '_ {
        self.iter().map(|(k, _)| k)
    }

    /// Iterates over every `(key, value)` mapping in key order.
    pub fn iter(&self) -> impl Iterator<Item = (K, &V)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, v)| v.as_ref().map(|v| (K::new(i), v)))
    }
}

impl<K: ArenaKey, V> Default for SecondaryMap<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: ArenaKey, V> Index<K> for SecondaryMap<K, V> {
    type Output = V;

    #[inline]
    fn index(&self, key: K) -> &Self::Output {
        self.get(key)
            .expect("attempted to get value of key that wasn't in secondary map")
    }
}

impl<K: ArenaKey, V> IndexMut<K> for SecondaryMap<K, V> {
    #[inline]
    fn index_mut(&mut self, key: K) -> &mut Self::Output {
        self.get_mut(key)
            .expect("attempted to get value of key that wasn't in secondary map")
    }
}

impl<K: ArenaKey, V: Debug> Debug for SecondaryMap<K, V> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str("SecondaryMap ")?;
        f.debug_map().entries(self.iter()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arena_key;

    arena_key! { struct E; }

    #[test]
    fn insert_sparse_keys() {
        let mut primary = ArenaMap::new();
        let keys: Vec<E> = (0..8).map(|i| primary.insert(i)).collect();
        let mut secondary = SecondaryMap::with_capacity(primary.len());

        assert_eq!(secondary.insert(keys[5], "five"), None);
        assert_eq!(secondary.insert(keys[1], "one"), None);
        assert_eq!(secondary.insert(keys[5], "FIVE"), Some("five"));

        assert!(secondary.contains(keys[1]));
        assert!(!secondary.contains(keys[2]));
        assert!(!secondary.contains(keys[7]));
        assert_eq!(secondary.keys().collect::<Vec<_>>(), [keys[1], keys[5]]);
    }

    #[test]
    fn take_removes_mapping() {
        let mut secondary = SecondaryMap::<E, i32>::fill(4, 0);

        secondary[E::new(3)] += 7;

        assert_eq!(secondary.take(E::new(3)), Some(7));
        assert_eq!(secondary.get(E::new(3)), None);
        assert_eq!(secondary.iter().count(), 3);
    }

    #[test]
    #[should_panic(expected = "wasn't in secondary map")]
    fn index_missing_panics() {
        let secondary = SecondaryMap::<E, i32>::new();

        let _ = secondary[E::new(0)];
    }

    #[cfg(feature = "enable-serde")]
    use serde_test::{assert_tokens, Token};

    #[test]
    #[cfg(feature = "enable-serde")]
    fn serialize_holes() {
        let mut secondary = SecondaryMap::<E, u32>::new();

        secondary.insert(E::new(1), 9);

        assert_tokens(
            &secondary,
            &[
                Token::Struct {
                    name: "SecondaryMap",
                    len: 1,
                },
                Token::Str("slots"),
                Token::Seq { len: Some(2) },
                Token::None,
                Token::Some,
                Token::U32(9),
                Token::SeqEnd,
                Token::StructEnd,
            ],
        );
    }
}
