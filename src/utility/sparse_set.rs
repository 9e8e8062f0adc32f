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

/// A set of dense keys with O(1) `add`, `remove`, `contains` and `clear`.
///
/// This is the Briggs/Torczon sparse set: `dense` holds the members in
/// insertion order and `sparse[k]` holds the position of `k` in `dense`.
/// `clear` only truncates `dense`, so `sparse` is allowed to hold garbage.
/// A key is only a member if its `sparse` slot points back at itself.
///
/// ```
/// # use opal::dense_arena_key;
/// # use opal::arena::ArenaKey;
/// # use opal::utility::SparseSet;
/// dense_arena_key! { struct Id; }
///
/// let mut set = SparseSet::new(10);
/// set.add(Id::new(4));
/// set.add(Id::new(2));
///
/// assert!(set.contains(Id::new(4)));
/// assert_eq!(set.contents(), [Id::new(4), Id::new(2)]);
/// ```
#[derive(Clone)]
pub struct SparseSet<K: ArenaKey> {
    dense: Vec<K>,
    sparse: Vec<u32>,
}

impl<K: ArenaKey> SparseSet<K> {
    /// Creates a set that can hold keys with indices in `[0, n)`.
    pub fn new(n: usize) -> Self {
        Self {
            dense: Vec::new(),
            sparse: vec![0; n],
        }
    }

    /// The exclusive upper bound on key indices this set can hold.
    #[inline]
    pub fn cap(&self) -> usize {
        self.sparse.len()
    }

    /// The number of keys in the set.
    #[inline]
    pub fn size(&self) -> usize {
        self.dense.len()
    }

    /// Checks if the set has no members.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.dense.is_empty()
    }

    /// Checks if `key` is a member. Keys past [`Self::cap`] are never members.
    #[inline]
    pub fn contains(&self, key: K) -> bool {
        match self.sparse.get(key.index()) {
            Some(&i) => (i as usize) < self.dense.len() && self.dense[i as usize] == key,
            None => false,
        }
    }

    /// Adds `key` to the set. Adding an existing member does nothing.
    ///
    /// Panics if `key` is past [`Self::cap`].
    #[inline]
    pub fn add(&mut self, key: K) {
        if self.contains(key) {
            return;
        }

        self.sparse[key.index()] = self.dense.len() as u32;
        self.dense.push(key);
    }

    /// Adds every key in `keys`.
    pub fn add_all<I: IntoIterator<Item = K>>(&mut self, keys: I) {
        for key in keys {
            self.add(key);
        }
    }

    /// Removes `key` if it's a member. The last member takes its place in
    /// [`Self::contents`].
    pub fn remove(&mut self, key: K) {
        if !self.contains(key) {
            return;
        }

        let i = self.sparse[key.index()] as usize;

        if let Some(last) = self.dense.pop() {
            if i < self.dense.len() {
                self.dense[i] = last;
                self.sparse[last.index()] = i as u32;
            }
        }
    }

    /// Removes and returns the most recently added member still in the set.
    #[inline]
    pub fn pop(&mut self) -> Option<K> {
        self.dense.pop()
    }

    /// Removes every member in O(1).
    #[inline]
    pub fn clear(&mut self) {
        self.dense.clear();
    }

    /// Clears the set and makes sure it can hold keys in `[0, n)`. Used when
    /// a set is handed back out of a scratch pool.
    pub fn reset(&mut self, n: usize) {
        self.dense.clear();

        if self.sparse.len() < n {
            self.sparse.resize(n, 0);
        }
    }

    /// The members, in insertion order (modulo removals).
    #[inline]
    pub fn contents(&self) -> &[K] {
        &self.dense
    }
}

impl<K: ArenaKey> Debug for SparseSet<K> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.dense.iter()).finish()
    }
}
