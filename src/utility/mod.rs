//======---------------------------------------------------------------======//
//                                                                           //
// Copyright 2022 Evan Cox <evanacox00@gmail.com>. All rights reserved.      //
//                                                                           //
// Use of this source code is governed by a BSD-style license that can be    //
// found in the LICENSE.txt file at the root of this project, or at the      //
// following link: https://opensource.org/licenses/BSD-3-Clause              //
//                                                                           //
//======---------------------------------------------------------------======//

//! Provides several utility APIs that are used inside of various modules
//! inside of the optimizer.
//!
//! Mostly these are the scratch containers the passes lean on: sparse sets
//! and maps keyed by dense IDs that can be cleared in O(1) and recycled
//! through a [`Cache`](crate::ir::Cache).

mod biased_sparse_set;
mod hash;
mod packed_option;
mod sparse_map;
mod sparse_set;
mod trees;

pub use biased_sparse_set::*;
pub use hash::*;
pub use packed_option::*;
pub use sparse_map::*;
pub use sparse_set::*;
pub use trees::*;
