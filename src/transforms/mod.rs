//======---------------------------------------------------------------======//
//                                                                           //
// Copyright 2022-2023 Evan Cox <evanacox00@gmail.com>. All rights reserved. //
//                                                                           //
// Use of this source code is governed by a BSD-style license that can be    //
// found in the LICENSE.txt file at the root of this project, or at the      //
// following link: https://opensource.org/licenses/BSD-3-Clause              //
//                                                                           //
//======---------------------------------------------------------------======//

//! The optimization passes.
//!
//! Every pass is a [`FunctionTransformPass`](crate::pass::FunctionTransformPass)
//! with a stable name, see [`pass_by_name`](crate::pass::pass_by_name). The
//! work each one does is also exposed as a plain function so that passes
//! can call each other and tests can poke at the pieces directly.

mod copyelim;
mod cse;
mod dce;
mod fuse;
mod generic;
mod jumptable;
mod layout;
mod licm;
mod loopbce;
mod lower;
mod nilcheck;
mod phielim;
mod phiopt;
mod prove;
mod tailrec;

pub use copyelim::*;
pub use cse::*;
pub use dce::*;
pub use fuse::*;
pub use generic::*;
pub use jumptable::*;
pub use layout::*;
pub use licm::*;
pub use loopbce::*;
pub use lower::*;
pub use nilcheck::*;
pub use phielim::*;
pub use phiopt::*;
pub use prove::*;
pub use tailrec::*;
