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
use crate::ir::{Block, Func};
use smallvec::SmallVec;

/// Directly computes a valid post-ordering of the reachable blocks in `f`,
/// starting from the entry block. Successors are visited in edge order.
///
/// This should not be used directly in most cases, [`Func::postorder`]
/// caches the result until the CFG changes.
pub fn compute_postorder(f: &Func) -> Vec<Block> {
    let mut po = Vec::with_capacity(f.layout().len());
    let mut seen = SecondaryMap::<Block, bool>::fill(f.num_blocks(), false);

    // (block, index of the next successor to visit)
    let mut stack: Vec<(Block, usize)> = Vec::with_capacity(32);
    let entry = f.entry();

    // we need to mark blocks as seen **before** going to any successors,
    // loops would have us visit them forever otherwise
    seen[entry] = true;
    stack.push((entry, 0));

    while let Some(&mut (b, ref mut next)) = stack.last_mut() {
        let succs = f[b].succs();

        if *next < succs.len() {
            let target = succs[*next].block;

            *next += 1;

            if !seen[target] {
                seen[target] = true;
                stack.push((target, 0));
            }

            continue;
        }

        stack.pop();
        po.push(b);
    }

    po
}

fn intersect(
    po_numbers: &SecondaryMap<Block, usize>,
    idoms: &SecondaryMap<Block, Block>,
    bb1: Block,
    bb2: Block,
) -> Block {
    let mut f1 = bb1;
    let mut f2 = bb2;

    while f1 != f2 {
        let f2v = po_numbers[f2];

        while po_numbers[f1] < f2v {
            f1 = idoms[f1];
        }

        let f1v = po_numbers[f1];

        while po_numbers[f2] < f1v {
            f2 = idoms[f2];
        }
    }

    f1
}

/// Maps every reachable block except the entry to its immediate dominator,
/// given a postorder from [`compute_postorder`].
///
/// Unreachable blocks and the entry block have no entry in the map.
//
// this implements the dominator algorithm described in "A Simple, Fast Dominance Algorithm"
// by Cooper et. al. See the paper: http://www.hipersoft.rice.edu/grads/publications/dom14.pdf.
//
pub fn compute_idoms(f: &Func, po: &[Block]) -> SecondaryMap<Block, Block> {
    let mut idoms = SecondaryMap::default();

    let root = match po.last() {
        Some(&root) => root,
        None => return idoms,
    };

    // map block -> postorder number.
    // this is just mapping block -> index of block in `po`
    let po_numbers = {
        let mut map = SecondaryMap::default();

        for (i, bb) in po.iter().copied().enumerate() {
            map.insert(bb, i);
        }

        map
    };

    let mut changed = true;

    // for the purposes of the algorithm, the entry node is its own idom
    idoms.insert(root, root);

    while changed {
        changed = false;

        // root has no predecessors, so we need to make sure we skip the root node.
        for block in po.iter().rev().copied().skip(1) {
            // every block has at least one processed predecessor when walking
            // in reverse postorder, the one it was first reached through
            let preds: SmallVec<[Block; 8]> = f[block]
                .preds()
                .iter()
                .map(|e| e.block)
                .filter(|&p| idoms.contains(p))
                .collect();

            let mut iter = preds.into_iter();
            let mut idom = match iter.next() {
                Some(b) => b,
                None => continue,
            };

            for pred in iter {
                idom = intersect(&po_numbers, &idoms, pred, idom);
            }

            if idoms.insert(block, idom) != Some(idom) {
                changed = true;
            }
        }
    }

    // the entry has no idom
    idoms.take(root);

    idoms
}
