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
use crate::ir::{Block, BlockKind, Func, Opcode, Value};
use crate::pass::{FunctionTransformPass, PreservedAnalyses};

/// Dead code elimination.
///
/// Blocks that can't be reached from the entry are removed entirely, and
/// values are assumed to be dead until proven otherwise. Everything that
/// can't cause side effects and isn't needed by something live is removed.
pub struct DeadCodePass;

impl FunctionTransformPass for DeadCodePass {
    fn name(&self) -> &'static str {
        "deadcode"
    }

    fn run(&mut self, func: &mut Func) -> PreservedAnalyses {
        if deadcode(func) {
            PreservedAnalyses::none()
        } else {
            PreservedAnalyses::cfg()
        }
    }
}

/// Finds the blocks reachable from the entry. Only the first successor of a
/// `First` block is ever taken.
pub fn reachable_blocks(func: &Func) -> SecondaryMap<Block, bool> {
    let mut reachable = SecondaryMap::fill(func.num_blocks(), false);
    let mut stack = vec![func.entry()];

    reachable[func.entry()] = true;

    while let Some(b) = stack.pop() {
        let succs = match func[b].kind() {
            BlockKind::First => &func[b].succs()[..1],
            _ => func[b].succs(),
        };

        for e in succs {
            if !reachable[e.block] {
                reachable[e.block] = true;
                stack.push(e.block);
            }
        }
    }

    reachable
}

/// Finds the live values of the reachable blocks. Controls and values that
/// can't be removed are live, and so is everything a live value uses.
pub fn live_values(
    func: &mut Func,
    reachable: &SecondaryMap<Block, bool>,
) -> SecondaryMap<Value, bool> {
    let mut live = SecondaryMap::fill(func.num_values(), false);
    let mut worklist = func.new_sparse_set::<Value>(func.num_values());

    for &b in func.layout() {
        if !reachable[b] {
            continue;
        }

        for &c in func[b].controls() {
            worklist.add(c);
        }

        for &v in func[b].values() {
            if func[v].op() != Opcode::Invalid && !func[v].removeable() {
                worklist.add(v);
            }
        }
    }

    while let Some(v) = worklist.pop() {
        if live[v] {
            continue;
        }

        live[v] = true;

        for &arg in func[v].args() {
            if !live[arg] {
                worklist.add(arg);
            }
        }
    }

    func.ret_sparse_set(worklist);

    live
}

/// Removes unreachable blocks and dead values, then compacts the value
/// lists of the remaining blocks. Returns whether the CFG changed.
pub fn deadcode(func: &mut Func) -> bool {
    let reachable = reachable_blocks(func);
    let layout = func.layout().to_vec();
    let mut cfg_changed = false;

    // the second edge of a `First` block is never taken
    for &b in layout.iter() {
        if reachable[b] && func[b].kind() == BlockKind::First {
            func.remove_edge(b, 1);
            func.set_kind(b, BlockKind::Plain);
            cfg_changed = true;
        }
    }

    let mut removed_blocks = 0;

    for &b in layout.iter() {
        if !reachable[b] {
            func.remove_block(b);
            removed_blocks += 1;
            cfg_changed = true;
        }
    }

    let live = live_values(func, &reachable);
    let mut removed_values = 0;

    // resetting drops the arguments too, so the order doesn't matter
    for &b in func.layout().to_vec().iter() {
        for vi in 0..func[b].values().len() {
            let v = func[b].values()[vi];

            if !live[v] && func[v].op() != Opcode::Invalid {
                func.reset_value(v, Opcode::Invalid);
                removed_values += 1;
            }
        }
    }

    func.compact_values();

    log::debug!(
        "deadcode: removed {removed_blocks} blocks and {removed_values} values from `{}`",
        func.name()
    );

    cfg_changed
}
