//======---------------------------------------------------------------======//
//                                                                           //
// Copyright 2022 Evan Cox <evanacox00@gmail.com>. All rights reserved.      //
//                                                                           //
// Use of this source code is governed by a BSD-style license that can be    //
// found in the LICENSE.txt file at the root of this project, or at the      //
// following link: https://opensource.org/licenses/BSD-3-Clause              //
//                                                                           //
//======---------------------------------------------------------------======//

use crate::ir::Func;
use crate::pass::PreservedAnalyses;

/// Defines a transformation over a single function.
///
/// While the pass may not actually modify the IR, it has the ability to, and needs to
/// declare what it changed (if anything) through [`PreservedAnalyses`](crate::pass::PreservedAnalyses).
pub trait FunctionTransformPass {
    /// The name of the pass. This is what pass options refer to it by, and
    /// it's what diagnostics from the pass are tagged with.
    fn name(&self) -> &'static str;

    /// Performs the transformation over a given function.
    ///
    /// This function is expected to act as-if it was pure, i.e. calling the same
    /// pass multiple times on the same IR should produce equivalent IR each time
    /// and should return the same preserved analyses each time.
    fn run(&mut self, func: &mut Func) -> PreservedAnalyses;
}
