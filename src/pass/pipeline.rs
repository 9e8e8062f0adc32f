//======---------------------------------------------------------------======//
//                                                                           //
// Copyright 2022-2023 Evan Cox <evanacox00@gmail.com>. All rights reserved. //
//                                                                           //
// Use of this source code is governed by a BSD-style license that can be    //
// found in the LICENSE.txt file at the root of this project, or at the      //
// following link: https://opensource.org/licenses/BSD-3-Clause              //
//                                                                           //
//======---------------------------------------------------------------======//

use crate::ir::{ConfigError, Func};
use crate::pass::*;
use crate::transforms::*;

/// The name of every pass that can be created with [`pass_by_name`].
pub const PASS_NAMES: &[&str] = &[
    "tailrec",
    "phielim",
    "copyelim",
    "deadcode",
    "opt",
    "cse",
    "phiopt",
    "nilcheckelim",
    "prove",
    "loopbce",
    "fuse",
    "licm",
    "jumptable",
    "lower",
    "layout",
];

/// The passes of the standard pipeline, in order. Some run more than once.
pub const STANDARD_PIPELINE: &[&str] = &[
    "tailrec",
    "phielim",
    "copyelim",
    "deadcode",
    "opt",
    "deadcode",
    "cse",
    "phiopt",
    "deadcode",
    "nilcheckelim",
    "prove",
    "loopbce",
    "fuse",
    "licm",
    "jumptable",
    "opt",
    "deadcode",
    "lower",
    "layout",
];

/// Creates a fresh instance of the pass called `name`.
pub fn pass_by_name(name: &str) -> Option<Box<dyn FunctionTransformPass>> {
    let pass: Box<dyn FunctionTransformPass> = match name {
        "tailrec" => Box::new(TailCallLoopPass),
        "phielim" => Box::new(PhiElimPass),
        "copyelim" => Box::new(CopyElimPass),
        "deadcode" => Box::new(DeadCodePass),
        "opt" => Box::new(GenericRewritePass),
        "cse" => Box::new(CsePass),
        "phiopt" => Box::new(PhiOptPass),
        "nilcheckelim" => Box::new(NilCheckElimPass),
        "prove" => Box::new(ProvePass),
        "loopbce" => Box::new(LoopBcePass),
        "fuse" => Box::new(FusePass),
        "licm" => Box::new(LoopInvariantsPass),
        "jumptable" => Box::new(JumpTablePass),
        "lower" => Box::new(LowerPass),
        "layout" => Box::new(LayoutPass),
        _ => return None,
    };

    Some(pass)
}

/// Builds a pass manager that runs `passes` in order.
pub fn custom_pipeline(
    passes: &[&str],
    options: PassOptions,
) -> Result<FunctionPassManager, ConfigError> {
    let mut fpm = FunctionPassManager::new(options);

    for &name in passes {
        let pass = pass_by_name(name).ok_or_else(|| ConfigError::UnknownPass(name.to_owned()))?;

        fpm.add_boxed(pass);
    }

    Ok(fpm)
}

/// Builds a pass manager for the [`STANDARD_PIPELINE`].
pub fn standard_pipeline(options: PassOptions) -> FunctionPassManager {
    let mut fpm = FunctionPassManager::new(options);

    for pass in STANDARD_PIPELINE.iter().filter_map(|name| pass_by_name(name)) {
        fpm.add_boxed(pass);
    }

    fpm
}

/// Runs the standard pipeline over `f`.
pub fn run_passes(f: &mut Func, options: PassOptions) -> Result<PreservedAnalyses, CompileError> {
    standard_pipeline(options).run(f)
}
