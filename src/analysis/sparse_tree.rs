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
use crate::utility::{stringify_tree, IntoTree, PackedOption};
use std::fmt;

#[derive(Copy, Clone, Debug, Default)]
struct SparseTreeNode {
    child: PackedOption<Block>,
    sibling: PackedOption<Block>,
    parent: PackedOption<Block>,
    // every node gets an entry and exit number from a DFS over the tree.
    // the numbers are spaced out so that other code can place things
    // "just before" or "just after" a node in the order
    entry: i32,
    exit: i32,
}

/// A tree (usually the dominator tree) stored so that ancestor queries
/// are O(1).
///
/// Each node is numbered on the way into and out of a depth-first walk,
/// `x` is an ancestor of `y` exactly when `x`'s range of numbers encloses
/// `y`'s. Unreachable blocks aren't in the tree, they have entry number 0.
pub struct SparseTree {
    nodes: SecondaryMap<Block, SparseTreeNode>,
    root: Block,
    max_entry: i32,
}

impl SparseTree {
    /// Builds the tree from a block -> parent map, as returned by
    /// [`compute_idoms`](crate::analysis::compute_idoms).
    pub fn new(f: &Func, parents: &SecondaryMap<Block, Block>) -> Self {
        let mut nodes = SecondaryMap::fill(f.num_blocks(), SparseTreeNode::default());

        for &b in f.layout() {
            if let Some(&p) = parents.get(b) {
                nodes[b].parent = PackedOption::some(p);
                nodes[b].sibling = nodes[p].child;
                nodes[p].child = PackedOption::some(b);
            }
        }

        let root = f.entry();
        let mut tree = Self {
            nodes,
            root,
            max_entry: 0,
        };

        tree.number(root);

        tree
    }

    // (entry, exit) numbers are handed out as (n+1, m+1) where n is the
    // previous number and m is the last number of the subtree. both leave
    // room for one adjustment on each side
    fn number(&mut self, root: Block) {
        enum Step {
            Enter(Block),
            Exit(Block),
        }

        let mut n = 1;
        let mut stack = vec![Step::Enter(root)];

        while let Some(step) = stack.pop() {
            match step {
                Step::Enter(b) => {
                    n += 1;
                    self.nodes[b].entry = n;
                    self.max_entry = self.max_entry.max(n);
                    n += 2;

                    stack.push(Step::Exit(b));

                    let mark = stack.len();
                    let mut c = self.nodes[b].child.expand();

                    while let Some(child) = c {
                        stack.push(Step::Enter(child));
                        c = self.nodes[child].sibling.expand();
                    }

                    // children are numbered in sibling order
                    stack[mark..].reverse();
                }
                Step::Exit(b) => {
                    n += 1;
                    self.nodes[b].exit = n;
                    n += 2;
                }
            }
        }
    }

    fn node(&self, b: Block) -> SparseTreeNode {
        self.nodes.get(b).copied().unwrap_or_default()
    }

    /// The root of the tree.
    pub fn root(&self) -> Block {
        self.root
    }

    /// The parent of `b`, if it has one.
    pub fn parent(&self, b: Block) -> Option<Block> {
        self.node(b).parent.expand()
    }

    /// The first child of `b`.
    pub fn child(&self, b: Block) -> Option<Block> {
        self.node(b).child.expand()
    }

    /// The next sibling of `b`.
    pub fn sibling(&self, b: Block) -> Option<Block> {
        self.node(b).sibling.expand()
    }

    /// Iterates over the children of `b`.
    pub fn children(&self, b: Block) -> impl Iterator<Item = Block> + '_ {
        std::iter::successors(self.child(b), move |&c| self.sibling(c))
    }

    /// The entry number of `b`, or 0 if it isn't in the tree.
    pub fn entry_number(&self, b: Block) -> i32 {
        self.node(b).entry
    }

    /// The highest entry number in the tree.
    pub fn max_entry_number(&self) -> i32 {
        self.max_entry
    }

    /// Whether `b` is in the tree.
    pub fn is_reachable(&self, b: Block) -> bool {
        self.node(b).entry != 0
    }

    /// Whether `x` is `y` or one of its ancestors.
    pub fn is_ancestor_eq(&self, x: Block, y: Block) -> bool {
        if x == y {
            return true;
        }

        let (xx, yy) = (self.node(x), self.node(y));

        xx.entry != 0 && xx.entry <= yy.entry && yy.exit <= xx.exit
    }

    /// Whether `x` is a proper ancestor of `y`.
    pub fn is_ancestor(&self, x: Block, y: Block) -> bool {
        if x == y {
            return false;
        }

        let (xx, yy) = (self.node(x), self.node(y));

        xx.entry != 0 && xx.entry < yy.entry && yy.exit < xx.exit
    }
}

impl IntoTree for SparseTree {
    type Node = Block;

    fn root(&self) -> Block {
        self.root
    }

    fn children(&self, node: Block) -> Vec<Block> {
        SparseTree::children(self, node).collect()
    }
}

impl fmt::Debug for SparseTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tree = stringify_tree(self, |b| {
            let node = self.node(b);

            format!("{b} [{}, {}]", node.entry, node.exit)
        });

        f.write_str(&tree)
    }
}
