//======---------------------------------------------------------------======//
//                                                                           //
// Copyright 2022-2023 Evan Cox <evanacox00@gmail.com>. All rights reserved. //
//                                                                           //
// Use of this source code is governed by a BSD-style license that can be    //
// found in the LICENSE.txt file at the root of this project, or at the      //
// following link: https://opensource.org/licenses/BSD-3-Clause              //
//                                                                           //
//======---------------------------------------------------------------======//

use crate::ir::{check_func, CheckError, Func};
use crate::pass::*;
use thiserror::Error;

/// An internal compiler error: a pass left the function in a state that
/// fails [`check_func`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("ICE: function is malformed after `{pass}`: {source}")]
pub struct CompileError {
    /// The pass after which the problem was found. This is `"input"` if the
    /// function was malformed before any pass ran.
    pub pass: &'static str,
    /// What exactly was wrong.
    #[source]
    pub source: CheckError,
}

/// Manages running a set of passes over a single function.
///
/// Passes run in the order they were added. After each one, the analyses
/// cached on the function that the pass didn't preserve are thrown away and
/// invalid values are compacted out of their blocks, so the next pass
/// always starts from a clean function.
pub struct FunctionPassManager {
    passes: Vec<Box<dyn FunctionTransformPass>>,
    options: PassOptions,
}

impl FunctionPassManager {
    /// Creates a new, empty, function pass manager.
    pub fn new(options: PassOptions) -> Self {
        Self {
            passes: Vec::default(),
            options,
        }
    }

    /// Adds a transformation pass to the pass manager. This pass's order is defined
    /// relative to other calls to [`Self::add_pass`].
    pub fn add_pass<T: FunctionTransformPass + 'static>(&mut self, pass: T) {
        self.passes.push(Box::new(pass));
    }

    /// Adds an already-boxed pass.
    pub fn add_boxed(&mut self, pass: Box<dyn FunctionTransformPass>) {
        self.passes.push(pass);
    }

    /// The names of the passes, in the order they run.
    pub fn names(&self) -> Vec<&'static str> {
        self.passes.iter().map(|p| p.name()).collect()
    }

    /// The options the passes run with.
    pub fn options(&self) -> &PassOptions {
        &self.options
    }

    /// Runs every enabled pass over `func`, returning what was preserved by
    /// all of them.
    ///
    /// With checking on, the function is checked before the first pass and
    /// after every pass, and the first problem found stops the run.
    pub fn run(&mut self, func: &mut Func) -> Result<PreservedAnalyses, CompileError> {
        let mut preserved = PreservedAnalyses::all();

        if self.options.check() {
            check_func(func).map_err(|source| CompileError {
                pass: "input",
                source,
            })?;
        }

        for pass in self.passes.iter_mut() {
            let name = pass.name();

            if !self.options.is_enabled(name) {
                log::debug!("skipping disabled pass `{name}` on `{}`", func.name());

                continue;
            }

            func.set_pass(name, self.options.debug_level(name));

            let other = pass.run(func);

            log::debug!(
                "ran `{name}` on `{}`, {} blocks live",
                func.name(),
                func.layout().len()
            );

            func.invalidate(&other);
            func.compact_values();

            if self.options.check() {
                check_func(func).map_err(|source| CompileError { pass: name, source })?;
            }

            preserved = preserved.intersect(other);
        }

        func.set_pass("", 0);

        Ok(preserved)
    }
}

impl Default for FunctionPassManager {
    fn default() -> Self {
        Self::new(PassOptions::default())
    }
}
