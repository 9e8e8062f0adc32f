//======---------------------------------------------------------------======//
//                                                                           //
// Copyright 2022-2023 Evan Cox <evanacox00@gmail.com>. All rights reserved. //
//                                                                           //
// Use of this source code is governed by a BSD-style license that can be    //
// found in the LICENSE.txt file at the root of this project, or at the      //
// following link: https://opensource.org/licenses/BSD-3-Clause              //
//                                                                           //
//======---------------------------------------------------------------======//

use crate::arena::SecondaryMap;
use crate::ir::*;
use thiserror::Error;

/// A structural problem found in a function.
///
/// These always mean that some pass (or whoever built the function) broke
/// an invariant of the IR, they are never caused by the input program.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CheckError {
    /// A block in the layout has kind `Invalid`.
    #[error("{0} has invalid kind")]
    InvalidBlock(Block),
    /// The entry block has predecessors.
    #[error("entry block {0} has predecessors")]
    EntryHasPreds(Block),
    /// A block has the wrong number of controls for its kind.
    #[error("{block} is {kind:?} but has {got} controls")]
    ControlCount {
        /// The block.
        block: Block,
        /// Its kind.
        kind: BlockKind,
        /// The number of controls it has.
        got: usize,
    },
    /// A block has the wrong number of successors for its kind.
    #[error("{block} is {kind:?} but has {got} successors")]
    SuccCount {
        /// The block.
        block: Block,
        /// Its kind.
        kind: BlockKind,
        /// The number of successors it has.
        got: usize,
    },
    /// An `If` is controlled by something that isn't a `bool`.
    #[error("{0} branches on a non-bool {1}")]
    NonBoolControl(Block, Value),
    /// The two ends of an edge disagree.
    #[error("edge {0} -> {1} has mismatched back indices")]
    BadEdge(Block, Block),
    /// A value is listed in a block other than the one it claims.
    #[error("{value} is in {listed} but claims to be in {claimed}")]
    WrongBlock {
        /// The value.
        value: Value,
        /// Where it's listed.
        listed: Block,
        /// Where it thinks it is.
        claimed: Block,
    },
    /// A value in a block has opcode `Invalid`.
    #[error("{0} is invalid but still in a block")]
    InvalidValue(Value),
    /// A value has the wrong number of arguments for its opcode.
    #[error("{value} ({op}) has {got} arguments")]
    Arity {
        /// The value.
        value: Value,
        /// Its opcode.
        op: Opcode,
        /// The number of arguments it has.
        got: usize,
    },
    /// A phi doesn't have one argument per predecessor.
    #[error("phi {0} has {1} arguments but its block has {2} predecessors")]
    PhiArity(Value, usize, usize),
    /// A value refers to a value that has been removed.
    #[error("{0} uses dead value {1}")]
    UseOfDead(Value, Value),
    /// A value isn't dominated by one of its arguments.
    #[error("{arg} does not dominate its use in {user}")]
    Dominance {
        /// The argument.
        arg: Value,
        /// The value using it.
        user: Value,
    },
    /// The recorded use count of a value is wrong.
    #[error("{value} has {recorded} recorded uses but {actual} actual uses")]
    UseCount {
        /// The value.
        value: Value,
        /// What the value says.
        recorded: u32,
        /// What was counted.
        actual: u32,
    },
}

/// Checks every structural invariant of `f`. This is run after every pass
/// when checking is enabled.
pub fn check_func(f: &mut Func) -> Result<(), CheckError> {
    check_blocks(f)?;
    check_values(f)?;
    check_uses(f)?;
    check_dominance(f)
}

fn check_blocks(f: &Func) -> Result<(), CheckError> {
    let entry = f.entry();

    if !f[entry].preds().is_empty() {
        return Err(CheckError::EntryHasPreds(entry));
    }

    for &b in f.layout() {
        let data = &f[b];
        let kind = data.kind();

        if kind == BlockKind::Invalid {
            return Err(CheckError::InvalidBlock(b));
        }

        if data.controls().len() != kind.num_controls() {
            return Err(CheckError::ControlCount {
                block: b,
                kind,
                got: data.controls().len(),
            });
        }

        let succs_ok = match kind.num_succs() {
            Some(n) => data.succs().len() == n,
            None => !data.succs().is_empty(),
        };

        if !succs_ok {
            return Err(CheckError::SuccCount {
                block: b,
                kind,
                got: data.succs().len(),
            });
        }

        if kind == BlockKind::If {
            let c = data.controls()[0];

            if !f[c].ty().is_bool() {
                return Err(CheckError::NonBoolControl(b, c));
            }
        }

        for (i, e) in data.succs().iter().enumerate() {
            let back = f[e.block].preds().get(e.index);

            if back != Some(&Edge { block: b, index: i }) {
                return Err(CheckError::BadEdge(b, e.block));
            }
        }

        for (i, e) in data.preds().iter().enumerate() {
            let back = f[e.block].succs().get(e.index);

            if back != Some(&Edge { block: b, index: i }) {
                return Err(CheckError::BadEdge(e.block, b));
            }
        }
    }

    Ok(())
}

fn check_values(f: &Func) -> Result<(), CheckError> {
    for &b in f.layout() {
        for &v in f[b].values() {
            let data = &f[v];

            if data.op() == Opcode::Invalid {
                return Err(CheckError::InvalidValue(v));
            }

            if data.block() != b {
                return Err(CheckError::WrongBlock {
                    value: v,
                    listed: b,
                    claimed: data.block(),
                });
            }

            if let Some(n) = data.op().arity() {
                if data.args().len() != n {
                    return Err(CheckError::Arity {
                        value: v,
                        op: data.op(),
                        got: data.args().len(),
                    });
                }
            }

            if data.op() == Opcode::Phi && data.args().len() != f[b].preds().len() {
                return Err(CheckError::PhiArity(v, data.args().len(), f[b].preds().len()));
            }

            for &arg in data.args() {
                if f[arg].op() == Opcode::Invalid {
                    return Err(CheckError::UseOfDead(v, arg));
                }
            }
        }
    }

    Ok(())
}

fn check_uses(f: &Func) -> Result<(), CheckError> {
    let mut counts = SecondaryMap::<Value, u32>::fill(f.num_values(), 0);

    for &b in f.layout() {
        for &v in f[b].values() {
            for &arg in f[v].args() {
                counts[arg] += 1;
            }
        }

        for &c in f[b].controls() {
            counts[c] += 1;
        }
    }

    for &b in f.layout() {
        for &v in f[b].values() {
            if counts[v] != f[v].uses() {
                return Err(CheckError::UseCount {
                    value: v,
                    recorded: f[v].uses(),
                    actual: counts[v],
                });
            }
        }
    }

    Ok(())
}

fn check_dominance(f: &mut Func) -> Result<(), CheckError> {
    let sdom = f.sdom();
    let po = f.postorder();

    // values inside a block are unordered until scheduling, so a use in the
    // defining block is always fine
    for &b in po.iter() {
        for &v in f[b].values() {
            let is_phi = f[v].op() == Opcode::Phi;

            for (i, &arg) in f[v].args().iter().enumerate() {
                let def = f[arg].block();

                let ok = if is_phi {
                    let pred = f[b].pred(i);

                    !sdom.is_reachable(pred) || sdom.is_ancestor_eq(def, pred)
                } else {
                    sdom.is_ancestor_eq(def, b)
                };

                if !ok {
                    return Err(CheckError::Dominance { arg, user: v });
                }
            }
        }

        for &c in f[b].controls() {
            if !sdom.is_ancestor_eq(f[c].block(), b) {
                return Err(CheckError::Dominance {
                    arg: c,
                    user: c,
                });
            }
        }
    }

    Ok(())
}
