//======---------------------------------------------------------------======//
//                                                                           //
// Copyright 2022-2023 Evan Cox <evanacox00@gmail.com>. All rights reserved. //
//                                                                           //
// Use of this source code is governed by a BSD-style license that can be    //
// found in the LICENSE.txt file at the root of this project, or at the      //
// following link: https://opensource.org/licenses/BSD-3-Clause              //
//                                                                           //
//======---------------------------------------------------------------======//

use crate::ir::{Block, BlockData, Value, ValueData};
use crate::utility::{SparseMap, SparseSet};

/// The per-compilation allocator.
///
/// A [`Func`](crate::ir::Func) takes its value and block storage from a
/// cache when it's created, and gives all of it back when it's turned back
/// into a cache with [`Func::into_cache`](crate::ir::Func::into_cache).
/// Scratch sparse sets and maps borrowed by passes are pooled here as well,
/// so compiling many functions in a row doesn't keep going back to the
/// allocator.
///
/// A cache is owned by exactly one compilation at a time.
#[derive(Default)]
pub struct Cache {
    pub(super) values: Vec<ValueData>,
    pub(super) blocks: Vec<BlockData>,
    value_sets: Vec<SparseSet<Value>>,
    block_sets: Vec<SparseSet<Block>>,
    value_maps: Vec<SparseMap<Value, i32>>,
    block_maps: Vec<SparseMap<Block, i32>>,
}

impl Cache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Clears everything held by the cache while keeping the allocations.
    /// Nothing from a previous compilation is visible after this.
    pub fn reset(&mut self) {
        self.values.clear();
        self.blocks.clear();

        for set in self.value_sets.iter_mut() {
            set.clear();
        }

        for set in self.block_sets.iter_mut() {
            set.clear();
        }

        for map in self.value_maps.iter_mut() {
            map.clear();
        }

        for map in self.block_maps.iter_mut() {
            map.clear();
        }
    }

    /// The number of pooled scratch structures currently held.
    pub fn pooled(&self) -> usize {
        self.value_sets.len() + self.block_sets.len() + self.value_maps.len() + self.block_maps.len()
    }
}

/// A scratch structure that can be borrowed from and returned to a [`Cache`].
pub trait Pooled: Sized {
    /// Takes a cleared structure able to hold keys in `[0, n)` out of the
    /// pool, or makes a new one.
    fn take(cache: &mut Cache, n: usize) -> Self;

    /// Returns a structure to the pool.
    fn give(self, cache: &mut Cache);
}

macro_rules! pooled {
    ($ty:ty, $field:ident) => {
        impl Pooled for $ty {
            fn take(cache: &mut Cache, n: usize) -> Self {
                match cache.$field.pop() {
                    Some(mut s) => {
                        s.reset(n);
                        s
                    }
                    None => <$ty>::new(n),
                }
            }

            fn give(self, cache: &mut Cache) {
                cache.$field.push(self);
            }
        }
    };
}

pooled!(SparseSet<Value>, value_sets);
pooled!(SparseSet<Block>, block_sets);
pooled!(SparseMap<Value, i32>, value_maps);
pooled!(SparseMap<Block, i32>, block_maps);
