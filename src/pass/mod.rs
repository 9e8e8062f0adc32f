//======---------------------------------------------------------------======//
//                                                                           //
// Copyright 2022-2023 Evan Cox <evanacox00@gmail.com>. All rights reserved. //
//                                                                           //
// Use of this source code is governed by a BSD-style license that can be    //
// found in the LICENSE.txt file at the root of this project, or at the      //
// following link: https://opensource.org/licenses/BSD-3-Clause              //
//                                                                           //
//======---------------------------------------------------------------======//

//! Defines the pass infrastructure used by the optimizer.
//!
//! Passes at their core are just objects that take in a function and
//! rewrite it:
//!
//! ```
//! # use opal::ir::Func;
//! struct Pass { /* ... */ }
//!
//! impl Pass {
//!     fn run(&mut self, f: &mut Func) { /* ... */ }
//! }
//! ```
//!
//! Of course it's a bit more complicated than that, but at their core,
//! every single pass boils down to roughly that pattern.
//!
//! # Transform Passes
//! Logically, transforms are pure functions that map input IR -> output IR.
//! They are allowed to take a `&mut self` to keep scratch state between
//! runs, but multiple runs of the same pass over the same IR should
//! produce the same output.
//!
//! Analyses are cached on the [`Func`](crate::ir::Func) itself, so every
//! pass has to return the set of analyses it preserved. A pass that only
//! rewrites values can keep everything derived from the CFG
//! ([`PreservedAnalyses::cfg`]), anything that adds or removes an edge has
//! to give those up.
//!
//! # Driving Passes
//! [`FunctionPassManager`] runs a list of passes in order, throwing away
//! stale analyses, compacting dead values and (optionally) checking the
//! function after each one. [`standard_pipeline`] builds the usual list,
//! and [`PassOptions`] controls which passes run and how much they log.
//!
//! # Rewriting
//! Most local simplifications are written as callbacks for
//! [`apply_rewrite`], which runs them to a fixpoint.

mod analysis;
mod manager;
mod options;
mod pipeline;
mod rewrite;
mod transform;

pub use analysis::*;
pub use manager::*;
pub use options::*;
pub use pipeline::*;
pub use rewrite::*;
pub use transform::*;
