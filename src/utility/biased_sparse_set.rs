//======---------------------------------------------------------------======//
//                                                                           //
// Copyright 2022-2023 Evan Cox <evanacox00@gmail.com>. All rights reserved. //
//                                                                           //
// Use of this source code is governed by a BSD-style license that can be    //
// found in the LICENSE.txt file at the root of this project, or at the      //
// following link: https://opensource.org/licenses/BSD-3-Clause              //
//                                                                           //
//======---------------------------------------------------------------======//

use std::fmt;
use std::fmt::{Debug, Formatter};

/// A sparse set of integers in a contiguous window `[first, last]`.
///
/// Only `last - first + 1` slots are allocated, so this is useful for tracking
/// a narrow range out of a huge integer space (e.g. the case constants of a
/// switch, or a band of value IDs).
///
/// Integers outside of the window are never members. Adding one is silently
/// ignored instead of being an error, so callers that care have to check
/// [`Self::in_range`] themselves.
#[derive(Clone)]
pub struct BiasedSparseSet {
    first: i64,
    dense: Vec<u32>,
    sparse: Vec<u32>,
}

impl BiasedSparseSet {
    /// The widest window a set can have. Members are indexed with `u32`.
    pub const MAX_WINDOW: u64 = u32::MAX as u64;

    /// Creates a set that can hold integers in `[first, last]`. An inverted
    /// window makes a set that can hold nothing.
    ///
    /// A slot is allocated up front for every integer in the window, so this
    /// costs `O(last - first)` memory no matter how few members end up in
    /// the set.
    ///
    /// # Panics
    ///
    /// Panics if the window is wider than [`Self::MAX_WINDOW`].
    pub fn new(first: i64, last: i64) -> Self {
        let len = if last < first {
            0
        } else {
            (last.wrapping_sub(first) as u64).saturating_add(1)
        };

        assert!(
            len <= Self::MAX_WINDOW,
            "window [{first}, {last}] is wider than {} integers",
            Self::MAX_WINDOW
        );

        Self {
            first,
            dense: Vec::new(),
            sparse: vec![0; len as usize],
        }
    }

    /// The number of integers that fit in the window.
    #[inline]
    pub fn cap(&self) -> usize {
        self.sparse.len()
    }

    /// The number of members.
    #[inline]
    pub fn size(&self) -> usize {
        self.dense.len()
    }

    /// Checks if there are no members.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.dense.is_empty()
    }

    /// Checks if `x` falls inside of the window.
    #[inline]
    pub fn in_range(&self, x: i64) -> bool {
        self.offset(x).is_some()
    }

    #[inline]
    fn offset(&self, x: i64) -> Option<u32> {
        if x < self.first {
            return None;
        }

        let off = x.wrapping_sub(self.first) as u64;

        if off < self.sparse.len() as u64 {
            Some(off as u32)
        } else {
            None
        }
    }

    /// Checks if `x` is a member. Out-of-window integers are never members.
    pub fn contains(&self, x: i64) -> bool {
        match self.offset(x) {
            Some(off) => {
                let i = self.sparse[off as usize] as usize;

                i < self.dense.len() && self.dense[i] == off
            }
            None => false,
        }
    }

    /// Adds `x` to the set. Out-of-window integers are dropped silently.
    pub fn add(&mut self, x: i64) {
        let off = match self.offset(x) {
            Some(off) => off,
            None => return,
        };

        if self.contains(x) {
            return;
        }

        self.sparse[off as usize] = self.dense.len() as u32;
        self.dense.push(off);
    }

    /// Removes `x` if it's a member.
    pub fn remove(&mut self, x: i64) {
        if !self.contains(x) {
            return;
        }

        let Some(off) = self.offset(x) else { return };
        let i = self.sparse[off as usize] as usize;

        if let Some(last) = self.dense.pop() {
            if i < self.dense.len() {
                self.dense[i] = last;
                self.sparse[last as usize] = i as u32;
            }
        }
    }

    /// Removes and returns the most recently added remaining member.
    pub fn pop(&mut self) -> Option<i64> {
        self.dense.pop().map(|off| self.first + off as i64)
    }

    /// Removes every member in O(1).
    #[inline]
    pub fn clear(&mut self) {
        self.dense.clear();
    }

    /// Returns the `i`th member in insertion order (modulo removals).
    #[inline]
    pub fn get(&self, i: usize) -> Option<i64> {
        self.dense.get(i).map(|&off| self.first + off as i64)
    }

    /// Iterates over every member in insertion order (modulo removals).
    pub fn contents(&self) -> impl Iterator<Item = i64> + '_ {
        self.dense.iter().map(|&off| self.first + off as i64)
    }
}

impl Debug for BiasedSparseSet {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.contents()).finish()
    }
}
