//======---------------------------------------------------------------======//
//                                                                           //
// Copyright 2022-2023 Evan Cox <evanacox00@gmail.com>. All rights reserved. //
//                                                                           //
// Use of this source code is governed by a BSD-style license that can be    //
// found in the LICENSE.txt file at the root of this project, or at the      //
// following link: https://opensource.org/licenses/BSD-3-Clause              //
//                                                                           //
//======---------------------------------------------------------------======//

use crate::analysis::{compute_postorder, SparseTree};
use crate::arena::{ArenaMap, SecondaryMap};
use crate::dense_arena_key;
use crate::ir::{Block, Func};
use crate::utility::PackedOption;
use smallvec::SmallVec;

dense_arena_key! {
    /// A reference to a natural loop inside of a [`LoopNest`]. Printed as `l{n}`.
    pub struct Loop: "l";
}

#[derive(Debug, Clone)]
struct LoopData {
    header: Block,
    outer: PackedOption<Loop>,
    children: SmallVec<[Loop; 4]>,
    depth: u32,
    blocks: Vec<Block>,
    exits: Vec<Block>,
}

/// The natural loops of a function and how they nest.
///
/// A loop is found for every block that dominates one of its predecessors
/// (the header of the loop), and contains every block that can reach one of
/// those back edges without going through the header. Loops with the same
/// header are merged.
///
/// Loops are numbered in reverse postorder of their headers, so an outer
/// loop always comes before the loops inside of it.
#[derive(Debug)]
pub struct LoopNest {
    loops: ArenaMap<Loop, LoopData>,
    b2l: SecondaryMap<Block, PackedOption<Loop>>,
    has_irreducible: bool,
}

impl LoopNest {
    /// Finds the loops of `f`, given its dominator tree.
    pub fn new(f: &Func, sdom: &SparseTree) -> Self {
        let po = compute_postorder(f);
        let mut nest = Self {
            loops: ArenaMap::new(),
            b2l: SecondaryMap::fill(f.num_blocks(), PackedOption::none()),
            has_irreducible: false,
        };

        let mut rpo_number = SecondaryMap::<Block, usize>::fill(f.num_blocks(), usize::MAX);

        for (i, &b) in po.iter().rev().enumerate() {
            rpo_number[b] = i;
        }

        for &b in po.iter().rev() {
            let mut is_header = false;

            for e in f[b].preds() {
                let p = e.block;

                if !sdom.is_reachable(p) {
                    continue;
                }

                if sdom.is_ancestor_eq(b, p) {
                    is_header = true;
                } else if rpo_number[b] <= rpo_number[p] {
                    // going backwards without dominating the source means
                    // the loop has more than one entry
                    nest.has_irreducible = true;
                }
            }

            if is_header {
                nest.loops.insert(LoopData {
                    header: b,
                    outer: PackedOption::none(),
                    children: SmallVec::new(),
                    depth: 0,
                    blocks: Vec::new(),
                    exits: Vec::new(),
                });
            }
        }

        nest.map_blocks(f, sdom);
        nest.compute_depths();

        // blocks are listed innermost loop first, in postorder
        for &b in po.iter() {
            let mut l = nest.b2l[b].expand();

            while let Some(lp) = l {
                nest.loops[lp].blocks.push(b);
                l = nest.loops[lp].outer.expand();
            }
        }

        let keys: Vec<Loop> = nest.loops.keys().collect();

        for l in keys {
            let mut exits = Vec::new();

            for &b in nest.loops[l].blocks.iter() {
                for e in f[b].succs() {
                    if !nest.contains(l, e.block) && !exits.contains(&e.block) {
                        exits.push(e.block);
                    }
                }
            }

            nest.loops[l].exits = exits;
        }

        nest
    }

    // walks backwards from the back edges of each loop, innermost loops
    // first. a block that already belongs to an inner loop makes that
    // loop's outermost ancestor a child of the current one
    fn map_blocks(&mut self, f: &Func, sdom: &SparseTree) {
        let mut worklist: Vec<Block> = Vec::new();
        let keys: Vec<Loop> = self.loops.keys().collect();

        let reachable_preds = |b: Block| {
            f[b].preds()
                .iter()
                .map(|e| e.block)
                .filter(|&p| sdom.is_reachable(p))
                .collect::<SmallVec<[Block; 4]>>()
        };

        for &cur in keys.iter().rev() {
            let header = self.loops[cur].header;

            for p in reachable_preds(header) {
                if sdom.is_ancestor_eq(header, p) {
                    worklist.push(p);
                }
            }

            while let Some(b) = worklist.pop() {
                match self.b2l[b].expand() {
                    Some(inner) => {
                        let outermost = self.outermost(inner);

                        if outermost == cur {
                            continue;
                        }

                        self.loops[cur].children.push(outermost);
                        self.loops[outermost].outer = PackedOption::some(cur);

                        worklist.extend(reachable_preds(self.loops[outermost].header));
                    }
                    None => {
                        self.b2l[b] = PackedOption::some(cur);

                        if b != header {
                            worklist.extend(reachable_preds(b));
                        }
                    }
                }
            }
        }
    }

    fn outermost(&self, mut l: Loop) -> Loop {
        while let Some(outer) = self.loops[l].outer.expand() {
            l = outer;
        }

        l
    }

    fn compute_depths(&mut self) {
        // outer loops always have lower keys
        let keys: Vec<Loop> = self.loops.keys().collect();

        for l in keys {
            self.loops[l].depth = match self.loops[l].outer.expand() {
                Some(outer) => self.loops[outer].depth + 1,
                None => 1,
            };
        }
    }

    /// Every loop, outer loops before the loops they contain.
    pub fn loops(&self) -> impl DoubleEndedIterator<Item = Loop> + ExactSizeIterator {
        self.loops.keys()
    }

    /// The number of loops.
    pub fn len(&self) -> usize {
        self.loops.len()
    }

    /// Whether the function has no loops.
    pub fn is_empty(&self) -> bool {
        self.loops.is_empty()
    }

    /// Whether any loop has more than one entry. Passes that need a single
    /// header don't run on such functions.
    pub fn has_irreducible(&self) -> bool {
        self.has_irreducible
    }

    /// The header of `l`, the only block through which it can be entered.
    pub fn header(&self, l: Loop) -> Block {
        self.loops[l].header
    }

    /// The loop that `l` is directly inside of.
    pub fn outer(&self, l: Loop) -> Option<Loop> {
        self.loops[l].outer.expand()
    }

    /// The loops directly inside of `l`.
    pub fn children(&self, l: Loop) -> &[Loop] {
        &self.loops[l].children
    }

    /// How deeply `l` is nested, outermost loops have depth 1.
    pub fn depth(&self, l: Loop) -> u32 {
        self.loops[l].depth
    }

    /// Whether `l` contains no other loops.
    pub fn is_inner(&self, l: Loop) -> bool {
        self.loops[l].children.is_empty()
    }

    /// Every block in `l`, including those of nested loops, in postorder.
    pub fn blocks(&self, l: Loop) -> &[Block] {
        &self.loops[l].blocks
    }

    /// The blocks outside of `l` that are successors of blocks inside of it.
    pub fn exits(&self, l: Loop) -> &[Block] {
        &self.loops[l].exits
    }

    /// The innermost loop that `b` is in.
    pub fn loop_of(&self, b: Block) -> Option<Loop> {
        self.b2l.get(b).and_then(|l| l.expand())
    }

    /// Whether `b` is in `l` or in a loop nested inside of it.
    pub fn contains(&self, l: Loop, b: Block) -> bool {
        let mut cur = self.loop_of(b);

        while let Some(lp) = cur {
            if lp == l {
                return true;
            }

            cur = self.outer(lp);
        }

        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::*;
    use std::sync::Arc;

    #[test]
    fn nested_loops() {
        let mut b = FuncBuilder::new("f", Arc::new(Config::default()));

        //
        // entry -> outer
        // outer -> inner, exit
        // inner -> inner_body, latch
        // inner_body -> inner
        // latch -> outer
        //
        let entry = b.create_block();
        let outer = b.create_block();
        let inner = b.create_block();
        let inner_body = b.create_block();
        let latch = b.create_block();
        let exit = b.create_block();

        b.switch_to(entry);
        let mem = b.init_mem();
        let c = b.arg(0, Type::Bool);
        b.jump(outer);
        b.switch_to(outer);
        b.branch(c, inner, exit);
        b.switch_to(inner);
        b.branch(c, inner_body, latch);
        b.switch_to(inner_body);
        b.jump(inner);
        b.switch_to(latch);
        b.jump(outer);
        b.switch_to(exit);
        b.ret(None, mem);

        let mut f = b.define();
        let nest = f.loopnest();

        assert_eq!(nest.len(), 2);
        assert!(!nest.has_irreducible());

        let lo = nest.loop_of(outer).unwrap();
        let li = nest.loop_of(inner).unwrap();

        assert_eq!(nest.header(lo), outer);
        assert_eq!(nest.header(li), inner);
        assert_eq!(nest.outer(li), Some(lo));
        assert_eq!(nest.depth(lo), 1);
        assert_eq!(nest.depth(li), 2);
        assert!(nest.is_inner(li));
        assert!(!nest.is_inner(lo));
        assert_eq!(nest.loop_of(latch), Some(lo));
        assert_eq!(nest.loop_of(inner_body), Some(li));
        assert_eq!(nest.loop_of(exit), None);
        assert!(nest.contains(lo, inner_body));
        assert!(!nest.contains(li, latch));
        assert_eq!(nest.blocks(li).len(), 2);
        assert_eq!(nest.blocks(lo).len(), 4);
        assert_eq!(nest.exits(lo), [exit]);
        assert_eq!(nest.exits(li), [latch]);
    }

    #[test]
    fn irreducible_loop_is_flagged() {
        let mut b = FuncBuilder::new("f", Arc::new(Config::default()));
        let entry = b.create_block();
        let x = b.create_block();
        let y = b.create_block();

        b.switch_to(entry);
        let c = b.arg(0, Type::Bool);
        b.branch(c, x, y);
        b.switch_to(x);
        b.jump(y);
        b.switch_to(y);
        b.jump(x);

        let mut f = b.define();
        let nest = f.loopnest();

        assert!(nest.has_irreducible());
        assert!(nest.is_empty());
    }

    #[test]
    fn straight_line_has_no_loops() {
        let mut b = FuncBuilder::new("f", Arc::new(Config::default()));
        let entry = b.create_block();

        b.switch_to(entry);
        let mem = b.init_mem();
        b.ret(None, mem);

        let mut f = b.define();

        assert!(f.loopnest().is_empty());
    }
}
