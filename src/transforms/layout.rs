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
use crate::arena::SecondaryMap;
use crate::ir::{Block, BlockKind, BranchPrediction, Func};
use crate::pass::{FunctionTransformPass, PreservedAnalyses};

/// Orders the blocks of a function for emission, trying to make as many
/// branches as possible fall through.
pub struct LayoutPass;

impl FunctionTransformPass for LayoutPass {
    fn name(&self) -> &'static str {
        "layout"
    }

    fn run(&mut self, func: &mut Func) -> PreservedAnalyses {
        let changed = layout(func);

        log::debug!("layout: `{}` reordered: {changed}", func.name());

        PreservedAnalyses::all()
    }
}

/// Computes the emission order greedily, starting from the entry block.
/// After a block is placed, the next one is:
///
/// 1. its likely successor, if it has one
/// 2. the successor with the fewest predecessors left to place
/// 3. any block with nothing left to wait for
/// 4. any block at all
///
/// `Exit` blocks always go at the very end. When the chosen block enters a
/// new loop, the loop is laid out starting from its [`good_top`] instead
/// of its header. Returns whether the order changed.
pub fn layout(f: &mut Func) -> bool {
    let blocks = f.layout().to_vec();
    let n = f.num_blocks();
    let ln = f.loopnest();
    let sdom = f.sdom();
    let mut po_number = SecondaryMap::<Block, i32>::fill(n, -1);

    for (i, &b) in f.postorder().iter().enumerate() {
        po_number[b] = i as i32;
    }

    let mut scheduled = SecondaryMap::<Block, bool>::fill(n, false);
    let mut indegree = SecondaryMap::<Block, i32>::fill(n, 0);
    let mut waiting = f.new_sparse_set::<Block>(n);
    let mut ready = f.new_sparse_set::<Block>(n);
    let mut exits = f.new_sparse_set::<Block>(n);

    for &b in blocks.iter() {
        if f[b].kind() == BlockKind::Exit {
            exits.add(b);
            continue;
        }

        indegree[b] = f[b].preds().len() as i32;

        if indegree[b] == 0 {
            ready.add(b);
        } else {
            waiting.add(b);
        }
    }

    let mut order = Vec::with_capacity(blocks.len());
    let mut next = Some(f.entry());

    while let Some(mut b) = next.take() {
        if let Some(&last) = order.last() {
            if let Some(bl) = ln.loop_of(b) {
                let entering = match ln.loop_of(last) {
                    Some(lastl) => bl != lastl && ln.depth(bl) >= ln.depth(lastl),
                    None => true,
                };

                if entering {
                    if let Some(top) = good_top(f, &ln, &sdom, &po_number, bl) {
                        if !scheduled[top] {
                            log::trace!("layout: loop {bl} starts at {top} instead of {b}");

                            b = top;
                        }
                    }
                }
            }
        }

        order.push(b);
        scheduled[b] = true;

        if order.len() == blocks.len() {
            break;
        }

        for e in f[b].succs() {
            let c = e.block;

            indegree[c] -= 1;

            if indegree[c] == 0 {
                waiting.remove(c);
                ready.add(c);
            }
        }

        let likely = match f[b].likely() {
            BranchPrediction::Likely => f[b].succs().first(),
            BranchPrediction::Unlikely => f[b].succs().get(1),
            BranchPrediction::Unknown => None,
        };

        if let Some(e) = likely {
            if !scheduled[e.block] {
                next = Some(e.block);
                continue;
            }
        }

        next = f[b]
            .succs()
            .iter()
            .map(|e| e.block)
            .filter(|&c| !scheduled[c] && f[c].kind() != BlockKind::Exit)
            .fold(None, |best: Option<Block>, c| match best {
                Some(x) if indegree[x] <= indegree[c] => Some(x),
                _ => Some(c),
            });

        if next.is_some() {
            continue;
        }

        for set in [&mut ready, &mut waiting, &mut exits] {
            while let Some(c) = set.pop() {
                if !scheduled[c] {
                    next = Some(c);
                    break;
                }
            }

            if next.is_some() {
                break;
            }
        }
    }

    f.ret_sparse_set(waiting);
    f.ret_sparse_set(ready);
    f.ret_sparse_set(exits);

    let changed = order != blocks;

    f.set_layout(order);

    changed
}

// which successor of `b` (a two-way branch with one edge leaving `l`)
// stays inside of `l`
fn in_loop_successor(ln: &LoopNest, f: &Func, l: Loop, b: Block) -> usize {
    match ln.loop_of(f[b].succ(0)) {
        Some(l0) if l0 == l || ln.depth(l0) < ln.depth(l) => 0,
        _ => 1,
    }
}

/// Picks a block to start the layout of `l` with, so that the loop's exit
/// branch ends up at the bottom and the back edge can fall through.
///
/// The best candidate is a branch out of the loop that dominates every back
/// edge: the loop then starts at its in-loop successor. Failing that, any
/// exiting branch is used, backing up to the top of a diamond if its
/// in-loop successor is reached through a plain block. Branches whose exit
/// comes latest in postorder win ties.
pub fn good_top(
    f: &Func,
    ln: &LoopNest,
    sdom: &SparseTree,
    po_number: &SecondaryMap<Block, i32>,
    l: Loop,
) -> Option<Block> {
    let header = ln.header(l);
    let mut dominates_one: Option<(Block, Block)> = None;
    let mut dominates_all: Option<(Block, Block)> = None;

    'blocks: for &b in ln.blocks(l) {
        if f[b].succs().len() != 2 {
            continue;
        }

        let (b0, b1) = (f[b].succ(0), f[b].succ(1));
        let (l0, l1) = (ln.loop_of(b0), ln.loop_of(b1));

        // both edges stay in the loop
        if l0 == l1 {
            continue;
        }

        let nested = |x: Option<Loop>| match x {
            Some(x) => x == l || ln.depth(x) > ln.depth(l),
            None => false,
        };

        if nested(l0) && nested(l1) {
            continue;
        }

        let exit = if l1 != Some(l) { b1 } else { b0 };
        let later = |best: Option<(Block, Block)>| match best {
            Some((_, e)) => po_number[exit] > po_number[e],
            None => true,
        };

        if later(dominates_one) {
            dominates_one = Some((b, exit));
        }

        for e in f[header].preds() {
            let source = e.block;

            if sdom.is_ancestor_eq(header, source) && !sdom.is_ancestor_eq(b, source) {
                continue 'blocks;
            }
        }

        if later(dominates_all) {
            dominates_all = Some((b, exit));
        }
    }

    if let Some((b, _)) = dominates_all {
        return Some(f[b].succ(in_loop_successor(ln, f, l, b)));
    }

    let (b, _) = dominates_one?;
    let inner = f[b].succ(in_loop_successor(ln, f, l, b));

    for e in f[inner].preds() {
        if f[e.block].kind() != BlockKind::Plain {
            continue;
        }

        let mut top = e.block;
        let mut cur = Some(e.block);

        while let Some(ib) = cur {
            if sdom.is_ancestor_eq(ib, b) {
                break;
            }

            top = ib;
            cur = sdom.parent(ib);
        }

        return Some(top);
    }

    Some(inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::*;
    use std::sync::Arc;

    #[test]
    fn exit_blocks_go_last() {
        let mut b = FuncBuilder::new("f", Arc::new(Config::default()));
        let entry = b.create_block();
        let fail = b.create_block();
        let ok = b.create_block();

        b.switch_to(entry);
        let mem = b.init_mem();
        let c = b.arg(0, Type::Bool);
        b.branch(c, fail, ok);

        b.switch_to(fail);
        b.exit(mem);

        b.switch_to(ok);
        b.ret(None, mem);

        let mut f = b.define();

        assert!(layout(&mut f));
        assert_eq!(f.layout(), [entry, ok, fail]);
    }

    #[test]
    fn likely_successors_fall_through() {
        let mut b = FuncBuilder::new("f", Arc::new(Config::default()));
        let entry = b.create_block();
        let rare = b.create_block();
        let common = b.create_block();

        b.switch_to(entry);
        let mem = b.init_mem();
        let c = b.arg(0, Type::Bool);
        b.branch(c, rare, common);

        b.switch_to(rare);
        b.ret(None, mem);

        b.switch_to(common);
        b.ret(None, mem);

        let mut f = b.define();

        f.set_likely(entry, BranchPrediction::Unlikely);

        assert!(layout(&mut f));
        assert_eq!(f.layout(), [entry, common, rare]);
    }

    #[test]
    fn joins_follow_their_last_predecessor() {
        let mut b = FuncBuilder::new("f", Arc::new(Config::default()));
        let entry = b.create_block();
        let merge = b.create_block();
        let left = b.create_block();
        let right = b.create_block();

        b.switch_to(entry);
        let mem = b.init_mem();
        let c = b.arg(0, Type::Bool);
        b.branch(c, left, right);

        b.switch_to(left);
        b.jump(merge);

        b.switch_to(right);
        b.jump(merge);

        b.switch_to(merge);
        b.ret(None, mem);

        let mut f = b.define();

        assert!(layout(&mut f));
        assert_eq!(f.layout(), [entry, left, merge, right]);

        // already in order
        assert!(!layout(&mut f));
    }

    #[test]
    fn loops_are_rotated_to_end_on_their_exit_test() {
        let mut b = FuncBuilder::new("f", Arc::new(Config::default()));
        let entry = b.create_block();
        let header = b.create_block();
        let body = b.create_block();
        let done = b.create_block();

        b.switch_to(entry);
        let mem = b.init_mem();
        let c = b.arg(0, Type::Bool);
        b.jump(header);

        b.switch_to(header);
        b.branch(c, body, done);

        b.switch_to(body);
        b.jump(header);

        b.switch_to(done);
        b.ret(None, mem);

        let mut f = b.define();
        let ln = f.loopnest();
        let sdom = f.sdom();
        let l = ln.loop_of(header).unwrap();
        let mut po_number = SecondaryMap::<Block, i32>::fill(f.num_blocks(), -1);

        for (i, &b) in f.postorder().iter().enumerate() {
            po_number[b] = i as i32;
        }

        assert_eq!(good_top(&f, &ln, &sdom, &po_number, l), Some(body));

        assert!(layout(&mut f));
        assert_eq!(f.layout(), [entry, body, header, done]);
    }

    #[test]
    fn straight_line_code_has_no_loop_top() {
        let mut b = FuncBuilder::new("f", Arc::new(Config::default()));
        let entry = b.create_block();
        let next = b.create_block();

        b.switch_to(entry);
        let mem = b.init_mem();
        b.jump(next);

        b.switch_to(next);
        b.ret(None, mem);

        let mut f = b.define();

        assert!(f.loopnest().is_empty());
        assert!(!layout(&mut f));
        assert_eq!(f.layout(), [entry, next]);
    }
}
