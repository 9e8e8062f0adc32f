//======---------------------------------------------------------------======//
//                                                                           //
// Copyright 2022-2023 Evan Cox <evanacox00@gmail.com>. All rights reserved. //
//                                                                           //
// Use of this source code is governed by a BSD-style license that can be    //
// found in the LICENSE.txt file at the root of this project, or at the      //
// following link: https://opensource.org/licenses/BSD-3-Clause              //
//                                                                           //
//======---------------------------------------------------------------======//

use crate::analysis::{Loop, LoopNest, SparseTree};
use crate::ir::{Block, Func, Opcode, Pos, Value};
use crate::pass::{FunctionTransformPass, PreservedAnalyses};
use crate::utility::{SaHashMap, SparseSet};

/// Hoists loop-invariant values out of innermost loops.
///
/// Only values in blocks that run on every iteration are considered, and
/// only the few most expensive ones (plus whatever they need) are moved
/// into the block that enters the loop. Hoisting everything would just
/// trade recomputation for register pressure.
pub struct LoopInvariantsPass;

impl FunctionTransformPass for LoopInvariantsPass {
    fn name(&self) -> &'static str {
        "licm"
    }

    fn run(&mut self, func: &mut Func) -> PreservedAnalyses {
        let hoisted = hoist_loop_invariants(func);

        log::debug!("licm: hoisted {hoisted} values in `{}`", func.name());

        PreservedAnalyses::cfg()
    }
}

/// The number of invariants worth hoisting on their own, per loop.
pub const HOIST_LIMIT: usize = 4;

// loads through these can't fault
fn possibly_faulting_addr(f: &Func, a: Value) -> bool {
    match f[a].op() {
        Opcode::Addr => false,
        Opcode::OffPtr | Opcode::PtrIndex | Opcode::AddPtr => f[f[a].arg(0)].op() != Opcode::Addr,
        _ => true,
    }
}

/// Whether `v` should never be hoisted, no matter what its arguments are.
pub fn always_variant(f: &Func, v: Value) -> bool {
    let data = &f[v];
    let op = data.op();

    if op.has_side_effects() || op.is_call() || op.is_nil_check() || op == Opcode::Phi {
        return true;
    }

    if (op.is_faults() || op == Opcode::Load) && possibly_faulting_addr(f, data.arg(0)) {
        return true;
    }

    data.ty().is_memory() || data.ty().is_flags() || data.ty().is_tuple()
}

/// The cost of recomputing `v` every iteration, not counting its arguments.
/// `None` for values that can't be hoisted because they might trap.
pub fn hoist_cost(f: &Func, v: Value) -> Option<u32> {
    let data = &f[v];
    let op = data.op();

    if op.is_div_or_mod() {
        return None;
    }

    let mut cost = if op.is_expensive() {
        4
    } else if op.is_rematerializable() {
        1
    } else {
        2
    };

    // loads are semi-expensive
    if data.args().last().map_or(false, |&m| f[m].ty().is_memory()) {
        cost = 4;
    }

    Some(cost)
}

/// The blocks of an inner loop that run on every iteration, in execution
/// order. These are the ones that dominate every back edge.
pub fn articulation_blocks(f: &Func, nest: &LoopNest, sdom: &SparseTree, l: Loop) -> Vec<Block> {
    let header = nest.header(l);
    let backedges: Vec<Block> = f[header]
        .preds()
        .iter()
        .map(|e| e.block)
        .filter(|&p| sdom.is_ancestor_eq(header, p))
        .collect();

    nest.blocks(l)
        .iter()
        .rev()
        .copied()
        .filter(|&b| backedges.iter().all(|&be| sdom.is_ancestor_eq(b, be)))
        .collect()
}

// one sweep over the blocks, returns whether any new invariant was found
fn find_invariants1(
    f: &Func,
    nest: &LoopNest,
    l: Loop,
    blocks: &[Block],
    seen: &mut SparseSet<Value>,
    costs: &mut SaHashMap<Value, u8>,
) -> bool {
    let mut changed = false;

    'values: for &b in blocks {
        for &v in f[b].values() {
            if always_variant(f, v) || seen.contains(v) {
                continue;
            }

            let mut cost = match hoist_cost(f, v) {
                Some(c) => c,
                None => continue,
            };

            for &a in f[v].args() {
                if nest.loop_of(f[a].block()) == Some(l) && !seen.contains(a) {
                    continue 'values;
                }

                cost = (cost + costs.get(&a).copied().unwrap_or(0) as u32).min(255);
            }

            seen.add(v);
            costs.insert(v, cost as u8);
            changed = true;
        }
    }

    changed
}

/// Finds the invariants of an inner loop, along with their cost.
pub fn loop_invariants(
    f: &mut Func,
    nest: &LoopNest,
    sdom: &SparseTree,
    l: Loop,
) -> SaHashMap<Value, u8> {
    let mut costs = SaHashMap::default();

    if !nest.is_inner(l) {
        return costs;
    }

    let blocks = articulation_blocks(f, nest, sdom, l);
    let mut seen = f.new_sparse_set::<Value>(f.num_values());

    if f.debug_level() > 2 {
        f.logf(format_args!("articulation blocks for `{}` = {blocks:?}\n", f.name()));
    }

    while find_invariants1(f, nest, l, &blocks, &mut seen, &mut costs) {}

    f.ret_sparse_set(seen);

    costs
}

/// Hoists the invariants of every inner loop of a reducible function.
/// Returns the number of values moved.
pub fn hoist_loop_invariants(f: &mut Func) -> usize {
    let nest = f.loopnest();

    if nest.has_irreducible() || nest.is_empty() {
        return 0;
    }

    let sdom = f.sdom();
    let mut hoisted = 0;

    for l in nest.loops() {
        if !nest.is_inner(l) {
            continue;
        }

        let header = nest.header(l);
        let mut outside = f[header]
            .preds()
            .iter()
            .map(|e| e.block)
            .filter(|&p| !nest.contains(l, p));

        let parent = match (outside.next(), outside.next()) {
            (Some(p), None) => p,
            _ => continue,
        };

        let costs = loop_invariants(f, &nest, &sdom, l);

        if costs.is_empty() {
            continue;
        }

        // highest cost first, ties broken by ID so the result is stable
        let mut roots: Vec<Value> = costs.keys().copied().collect();

        roots.sort_unstable_by(|&a, &b| costs[&b].cmp(&costs[&a]).then(a.cmp(&b)));
        roots.truncate(HOIST_LIMIT);

        let root_count = roots.len();

        if f.debug_level() == 1 {
            for &v in roots.iter() {
                f.warnl(
                    f[v].pos(),
                    format_args!(
                        "inner loop root invariant cost {}, header {header}, val {}",
                        costs[&v],
                        f.value_string(v)
                    ),
                );
            }
        }

        // cheap invariants still have to move if a hoisted one needs them
        let mut hoist = roots;
        let mut i = 0;

        while i < hoist.len() {
            let v = hoist[i];

            for &a in f[v].args() {
                if costs.contains_key(&a) && !hoist.contains(&a) {
                    hoist.push(a);
                }
            }

            i += 1;
        }

        if f.debug_level() > 1 {
            for (i, &v) in hoist.iter().enumerate() {
                let what = if i < root_count { "root" } else { "input" };

                f.warnl(
                    f[v].pos(),
                    format_args!(
                        "inner loop {what} invariant cost {}, header {header}, val {}",
                        costs[&v],
                        f.value_string(v)
                    ),
                );
            }
        }

        for &v in hoist.iter() {
            log::trace!("licm: hoisting {v} from {} to {parent}", f[v].block());

            f.set_pos(v, Pos::default());
            f.move_value(v, parent);
        }

        hoisted += hoist.len();
    }

    hoisted
}
