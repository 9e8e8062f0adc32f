//======---------------------------------------------------------------======//
//                                                                           //
// Copyright 2022-2023 Evan Cox <evanacox00@gmail.com>. All rights reserved. //
//                                                                           //
// Use of this source code is governed by a BSD-style license that can be    //
// found in the LICENSE.txt file at the root of this project, or at the      //
// following link: https://opensource.org/licenses/BSD-3-Clause              //
//                                                                           //
//======---------------------------------------------------------------======//

#![deny(
    unreachable_pub,
    missing_docs,
    missing_abi,
    rust_2018_idioms,
    rustdoc::broken_intra_doc_links,
    rustdoc::private_intra_doc_links
)]

//! # Opal
//!
//! The middle of an optimizing compiler: an SSA IR made of blocks and
//! values, the analyses needed to reason about it, and the passes that
//! rewrite it.
//!
//! ```
//! # use opal::ir::*;
//! # use opal::pass::*;
//! # use std::sync::Arc;
//! let mut b = FuncBuilder::new("answer", Arc::new(Config::default()));
//! let entry = b.create_block();
//!
//! b.switch_to(entry);
//! let mem = b.init_mem();
//! let x = b.iconst(Type::I64, 40);
//! let y = b.iconst(Type::I64, 2);
//! let sum = b.binary(Opcode::Add64, x, y);
//! b.ret(Some(sum), mem);
//!
//! let mut f = b.define();
//!
//! standard_pipeline(PassOptions::default()).run(&mut f).unwrap();
//! ```

pub mod analysis;
pub mod arena;
pub mod ir;
pub mod pass;
pub mod transforms;
pub mod utility;
