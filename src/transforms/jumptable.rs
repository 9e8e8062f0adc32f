//======---------------------------------------------------------------======//
//                                                                           //
// Copyright 2022-2023 Evan Cox <evanacox00@gmail.com>. All rights reserved. //
//                                                                           //
// Use of this source code is governed by a BSD-style license that can be    //
// found in the LICENSE.txt file at the root of this project, or at the      //
// following link: https://opensource.org/licenses/BSD-3-Clause              //
//                                                                           //
//======---------------------------------------------------------------======//

use crate::ir::{
    Aux, Block, BlockKind, BranchPrediction, Edge, Func, Opcode, Relation, Type, Value,
};
use crate::pass::{FunctionTransformPass, PreservedAnalyses};
use crate::utility::{sorted_keys, SaHashMap};

/// The fewest comparisons a group needs before it becomes a table.
pub const MIN_COMPARISONS: usize = 4;

/// Turns trees of `If` blocks comparing one value against a dense set of
/// constants into a bounds check followed by a `JumpTable` block.
///
/// ```none
/// b1 ----------> b2 --> t1
/// |              |
/// v              v
/// b3 --> t2      t3
/// |
/// v
/// t4
/// ```
///
/// The root of the group becomes a `First` block jumping to the bounds
/// check, and the rest of the group is left for `deadcode` to remove.
pub struct JumpTablePass;

impl FunctionTransformPass for JumpTablePass {
    fn name(&self) -> &'static str {
        "jumptable"
    }

    fn run(&mut self, func: &mut Func) -> PreservedAnalyses {
        let tables = jump_tables(func);

        log::debug!("jumptable: built {tables} tables in `{}`", func.name());

        if tables > 0 {
            PreservedAnalyses::none()
        } else {
            PreservedAnalyses::all()
        }
    }
}

/// If `v` compares something against a `Const64`, gets the something,
/// the constant, and the relation with the operands in that order.
fn const_compare(f: &Func, v: Value) -> Option<(Value, i64, Relation)> {
    let op = f[v].op();

    if !matches!(op, Opcode::Eq64 | Opcode::Neq64 | Opcode::Leq64 | Opcode::Less64) {
        return None;
    }

    let rel = op.comparison()?.rel;
    let (x, y) = (f[v].arg(0), f[v].arg(1));
    let is_const = |v: Value| f[v].op() == Opcode::Const64;

    match (is_const(x), is_const(y)) {
        (false, true) => Some((x, f[y].aux_int(), rel)),
        (true, false) => Some((y, f[x].aux_int(), rel.swapped())),
        // no way to tell which side is being switched on
        _ => None,
    }
}

/// Gets the value `b` switches on along with the constant it compares it
/// to, if `b` is a plain compare-and-branch with nothing else in it.
fn switch_block(f: &Func, b: Block) -> Option<(Value, i64, Relation)> {
    if f[b].kind() != BlockKind::If {
        return None;
    }

    let c = f[b].control()?;

    if f[b].values() != [c] || f[c].uses() != 1 {
        return None;
    }

    const_compare(f, c)
}

/// Finds every block that compares the same value as its only predecessor,
/// mapped to the root of the tree it's a part of.
fn find_groups(f: &Func) -> SaHashMap<Block, Block> {
    let mut parent = SaHashMap::default();

    for &b in f.layout() {
        let Some((value, _, _)) = switch_block(f, b) else {
            continue;
        };

        if f[b].preds().len() != 1 {
            continue;
        }

        let p = f[b].pred(0);

        if f[p].kind() != BlockKind::If || f[p].likely() != BranchPrediction::Unknown {
            continue;
        }

        // the root may compute other things, it just has to branch on
        // the same value
        let same = f[p]
            .control()
            .and_then(|c| const_compare(f, c))
            .map_or(false, |(x, _, _)| x == value);

        if same {
            parent.insert(b, p);
        }
    }

    // point everything directly at its root. chains that never reach a
    // root can only be in unreachable cycles, those are dropped
    let limit = parent.len();
    let mut roots = SaHashMap::default();

    for b in sorted_keys(&parent) {
        let mut root = parent[&b];
        let mut steps = 0;

        while let Some(&p) = parent.get(&root) {
            root = p;
            steps += 1;

            if steps > limit {
                break;
            }
        }

        if steps <= limit {
            roots.insert(b, root);
        }
    }

    roots
}

/// The edge leaving `b` when the switched-on value is `c`.
fn next_edge(f: &Func, b: Block, c: i64) -> Option<Edge> {
    let (_, d, rel) = const_compare(f, f[b].control()?)?;
    let idx = if rel.holds(c.cmp(&d)) { 0 } else { 1 };

    Some(f[b].succs()[idx])
}

/// Follows the group from `root` to the edge leaving it when the
/// switched-on value is `c`. Branching back to the root counts as leaving.
fn group_exit(f: &Func, parent: &SaHashMap<Block, Block>, root: Block, c: i64) -> Option<Edge> {
    let mut b = root;

    loop {
        let e = next_edge(f, b, c)?;

        if parent.get(&e.block) != Some(&root) {
            return Some(e);
        }

        b = e.block;
    }
}

/// Skips over empty `Plain` blocks, to notice defaults that end up in the
/// same place.
fn skip_empty(f: &Func, mut e: Edge) -> Edge {
    for _ in 0..f.num_blocks() {
        let data = &f[e.block];

        if data.kind() != BlockKind::Plain || !data.values().is_empty() {
            break;
        }

        e = data.succs()[0];
    }

    e
}

/// Converts every suitable group of comparisons in `f` into a jump table.
/// Returns the number of tables built.
pub fn jump_tables(f: &mut Func) -> usize {
    let parent = find_groups(f);

    let mut groups: SaHashMap<Block, Vec<Block>> = SaHashMap::default();

    for (&b, &root) in parent.iter() {
        groups.entry(root).or_default().push(b);
    }

    let mut built = 0;

    'groups: for root in sorted_keys(&groups) {
        let mut group = groups[&root].clone();

        group.push(root);
        group.sort_unstable();

        f.logf(format_args!("{}: root = {root}, group = {group:?}", f.name()));

        let consts: Vec<i64> = group
            .iter()
            .filter_map(|&b| f[b].control().and_then(|c| const_compare(f, c)))
            .map(|(_, c, _)| c)
            .collect();

        let (Some(&min), Some(&max)) = (consts.iter().min(), consts.iter().max()) else {
            continue;
        };

        // the extremes are used to probe for the default
        if min == i64::MIN || max == i64::MAX {
            continue;
        }

        let count = consts.len();
        let width = i128::from(max) - i128::from(min) + 1;

        if count < MIN_COMPARISONS {
            f.logf(format_args!("  abort: only {count} comparisons"));
            continue;
        }

        if width / 4 > count as i128 {
            f.logf(format_args!("  abort: only {count} out of {width} entries used"));
            continue;
        }

        let (Some(low), Some(high)) = (
            group_exit(f, &parent, root, i64::MIN),
            group_exit(f, &parent, root, i64::MAX),
        ) else {
            continue;
        };

        let default = skip_empty(f, low);
        let default2 = skip_empty(f, high);

        if default.block != default2.block {
            f.logf(format_args!(
                "  abort: defaults {} and {} differ",
                default.block, default2.block
            ));
            continue;
        }

        for phi in f.phis(default.block) {
            if f[phi].arg(default.index) != f[phi].arg(default2.index) {
                f.logf(format_args!("  abort: defaults disagree on {phi}"));
                continue 'groups;
            }
        }

        let mut exits = Vec::with_capacity(width as usize);

        for c in min..=max {
            match group_exit(f, &parent, root, c) {
                Some(e) => exits.push(e),
                None => continue 'groups,
            }
        }

        // committed from here on
        let Some((val, _, _)) = f[root].control().and_then(|c| const_compare(f, c)) else {
            continue;
        };

        let pos = f[root].pos();
        let jump = f.new_block(BlockKind::JumpTable);

        f.set_block_pos(jump, pos);

        for e in exits {
            f.add_edge_to(jump, e.block);

            for phi in f.phis(e.block) {
                let a = f[phi].arg(e.index);

                f.add_arg(phi, a);
            }
        }

        let bcb = f.new_block(BlockKind::If);
        let min_val = f.const_int(Type::I64, min);
        let width_val = f.const_int(Type::I64, width as i64);
        let idx = f.new_value(bcb, Opcode::Sub64, Type::I64, Aux::None, &[val, min_val]);
        let cmp = f.new_value(bcb, Opcode::Less64U, Type::Bool, Aux::None, &[idx, width_val]);

        f.set_pos(idx, pos);
        f.set_pos(cmp, pos);
        f.set_block_pos(bcb, pos);
        f.set_control(bcb, cmp);
        f.add_edge_to(bcb, jump);
        f.add_edge_to(bcb, default.block);
        f.set_likely(bcb, BranchPrediction::Likely);

        for phi in f.phis(default.block) {
            let a = f[phi].arg(default.index);

            f.add_arg(phi, a);
        }

        f.set_control(jump, idx);

        // one of the root's successors is in the group and has the root as
        // its only predecessor, so that edge is easy to take over
        if parent.get(&f[root].succ(0)) != Some(&root) {
            f.swap_successors(root);
        }

        let inner = f[root].succ(0);

        f.remove_pred(inner, 0);
        f.redirect_succ(root, 0, bcb);
        f.reset_controls(root);
        f.set_kind(root, BlockKind::First);
        f.set_likely(root, BranchPrediction::Unknown);

        f.warnl(pos, format_args!("built a jump table with {width} entries"));
        f.invalidate_cfg();
        built += 1;
    }

    built
}
