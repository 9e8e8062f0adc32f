//======---------------------------------------------------------------======//
//                                                                           //
// Copyright 2022-2023 Evan Cox <evanacox00@gmail.com>. All rights reserved. //
//                                                                           //
// Use of this source code is governed by a BSD-style license that can be    //
// found in the LICENSE.txt file at the root of this project, or at the      //
// following link: https://opensource.org/licenses/BSD-3-Clause              //
//                                                                           //
//======---------------------------------------------------------------======//

//! Contains the analyses that passes query while rewriting a function.
//!
//! The CFG-derived ones (postorder, dominators, the sparse dominator tree
//! and the loop nest) are cached on the [`Func`](crate::ir::Func) itself and
//! thrown away whenever a pass reports that it didn't preserve them. The
//! [`Poset`] is a standalone fact database that `prove` builds while walking
//! the dominator tree.

mod dominators;
mod loopnest;
mod poset;
mod sparse_tree;

pub use dominators::*;
pub use loopnest::*;
pub use poset::*;
pub use sparse_tree::*;
