//======---------------------------------------------------------------======//
//                                                                           //
// Copyright 2022-2023 Evan Cox <evanacox00@gmail.com>. All rights reserved. //
//                                                                           //
// Use of this source code is governed by a BSD-style license that can be    //
// found in the LICENSE.txt file at the root of this project, or at the      //
// following link: https://opensource.org/licenses/BSD-3-Clause              //
//                                                                           //
//======---------------------------------------------------------------======//

//! The SSA graph: values, blocks and the functions that own them.
//!
//! This only contains the code for representing and editing the IR itself,
//! the analyses and transforms that run over it live in other modules.

mod block;
mod builder;
mod cache;
mod check;
mod config;
mod func;
mod opcode;
mod types;
mod value;

pub use block::*;
pub use builder::*;
pub use cache::*;
pub use check::*;
pub use config::*;
pub use func::*;
pub use opcode::*;
pub use types::*;
pub use value::*;
