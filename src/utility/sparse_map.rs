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

/// A sparse-set keyed map from dense keys to small `Copy` values.
///
/// Works exactly like [`SparseSet`](super::SparseSet), except each dense
/// entry also carries a value. Clearing is O(1).
#[derive(Clone)]
pub struct SparseMap<K: ArenaKey, V: Copy> {
    dense: Vec<(K, V)>,
    sparse: Vec<u32>,
}

impl<K: ArenaKey, V: Copy> SparseMap<K, V> {
    /// Creates a map that can hold keys with indices in `[0, n)`.
    pub fn new(n: usize) -> Self {
        Self {
            dense: Vec::new(),
            sparse: vec![0; n],
        }
    }

    /// The exclusive upper bound on key indices.
    #[inline]
    pub fn cap(&self) -> usize {
        self.sparse.len()
    }

    /// The number of mappings.
    #[inline]
    pub fn size(&self) -> usize {
        self.dense.len()
    }

    /// Checks if there are no mappings.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.dense.is_empty()
    }

    #[inline]
    fn position(&self, key: K) -> Option<usize> {
        let i = *self.sparse.get(key.index())? as usize;

        match self.dense.get(i) {
            Some((k, _)) if *k == key => Some(i),
            _ => None,
        }
    }

    /// Checks if `key` has a mapping.
    #[inline]
    pub fn contains(&self, key: K) -> bool {
        self.position(key).is_some()
    }

    /// Returns the value mapped to `key`.
    #[inline]
    pub fn get(&self, key: K) -> Option<V> {
        self.position(key).map(|i| self.dense[i].1)
    }

    /// Maps `key` to `value`, overwriting any existing mapping.
    pub fn set(&mut self, key: K, value: V) {
        match self.position(key) {
            Some(i) => self.dense[i].1 = value,
            None => {
                self.sparse[key.index()] = self.dense.len() as u32;
                self.dense.push((key, value));
            }
        }
    }

    /// Removes the mapping for `key`, if it exists.
    pub fn remove(&mut self, key: K) {
        let i = match self.position(key) {
            Some(i) => i,
            None => return,
        };

        if let Some(last) = self.dense.pop() {
            if i < self.dense.len() {
                self.sparse[last.0.index()] = i as u32;
                self.dense[i] = last;
            }
        }
    }

    /// Removes every mapping in O(1).
    #[inline]
    pub fn clear(&mut self) {
        self.dense.clear();
    }

    /// Clears the map and makes sure it can hold keys in `[0, n)`.
    pub fn reset(&mut self, n: usize) {
        self.dense.clear();

        if self.sparse.len() < n {
            self.sparse.resize(n, 0);
        }
    }

    /// Every `(key, value)` mapping, in insertion order (modulo removals).
    #[inline]
    pub fn contents(&self) -> &[(K, V)] {
        &self.dense
    }
}

impl<K: ArenaKey> SparseMap<K, i32> {
    /// ORs `1 << bit` into the value for `key`, inserting `0` first if
    /// `key` has no mapping yet.
    pub fn set_bit(&mut self, key: K, bit: u32) {
        let old = self.get(key).unwrap_or(0);

        self.set(key, old | (1 << bit));
    }
}

impl<K: ArenaKey, V: Copy + Debug> Debug for SparseMap<K, V> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.dense.iter().map(|(k, v)| (k, v)))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dense_arena_key;

    dense_arena_key! { struct Id; }

    #[test]
    fn set_get_remove() {
        let mut map = SparseMap::new(16);

        map.set(Id::new(3), 30);
        map.set(Id::new(9), 90);
        map.set(Id::new(3), 33);

        assert_eq!(map.get(Id::new(3)), Some(33));
        assert_eq!(map.get(Id::new(4)), None);
        assert_eq!(map.size(), 2);

        map.remove(Id::new(3));

        assert!(!map.contains(Id::new(3)));
        assert_eq!(map.contents(), [(Id::new(9), 90)]);
    }

    #[test]
    fn set_bit_accumulates() {
        let mut map = SparseMap::<Id, i32>::new(4);

        map.set_bit(Id::new(1), 0);
        map.set_bit(Id::new(1), 3);

        assert_eq!(map.get(Id::new(1)), Some(0b1001));
    }

    #[test]
    fn clear_is_constant_time_and_safe() {
        let mut map = SparseMap::new(4);

        map.set(Id::new(2), 'a');
        map.set(Id::new(1), 'b');
        map.clear();

        assert!(map.is_empty());
        assert_eq!(map.get(Id::new(1)), None);

        map.set(Id::new(0), 'c');
        assert_eq!(map.get(Id::new(2)), None);
        assert_eq!(map.get(Id::new(0)), Some('c'));
    }
}
