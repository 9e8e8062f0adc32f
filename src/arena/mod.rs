//======---------------------------------------------------------------======//
//                                                                           //
// Copyright 2022-2023 Evan Cox <evanacox00@gmail.com>. All rights reserved. //
//                                                                           //
// Use of this source code is governed by a BSD-style license that can be    //
// found in the LICENSE.txt file at the root of this project, or at the      //
// following link: https://opensource.org/licenses/BSD-3-Clause              //
//                                                                           //
//======---------------------------------------------------------------======//

//! A simple typed arena module.
//!
//! These arenas do not allow deletion and hand out dense keys, which is what
//! lets the SSA graph refer to values and blocks by index instead of by
//! pointer. A "deleted" value keeps its slot (it's just reset to an invalid
//! opcode), so no key can ever dangle while its arena is alive.
//!
//! ```
//! # use opal::arena_key;
//! # use opal::arena::*;
//! arena_key! {
//!     pub struct Node;
//! }
//!
//! enum AstNode {
//!     Immediate(u64),
//!     Add(Node, Node),
//!     Mul(Node, Node)
//! }
//!
//! let mut arena = ArenaMap::new();
//!
//! // (16 + 3) * 3
//! let e1: Node = arena.insert(AstNode::Immediate(16));
//! let e2 = arena.insert(AstNode::Immediate(3));
//! let e3 = arena.insert(AstNode::Add(e1, e2));
//! let e4 = arena.insert(AstNode::Mul(e2, e3));
//! ```

mod key;
mod map;
mod secondary;

pub use key::ArenaKey;
pub use map::ArenaMap;
pub use secondary::SecondaryMap;
