//======---------------------------------------------------------------======//
//                                                                           //
// Copyright 2022-2023 Evan Cox <evanacox00@gmail.com>. All rights reserved. //
//                                                                           //
// Use of this source code is governed by a BSD-style license that can be    //
// found in the LICENSE.txt file at the root of this project, or at the      //
// following link: https://opensource.org/licenses/BSD-3-Clause              //
//                                                                           //
//======---------------------------------------------------------------======//

use crate::dense_arena_key;
use crate::ir::{Pos, Value};
use smallvec::SmallVec;

#[cfg(feature = "enable-serde")]
use serde::{Deserialize, Serialize};

dense_arena_key! {
    /// A reference to a basic block inside of a [`Func`](crate::ir::Func).
    /// Printed as `b{n}`.
    pub struct Block: "b";
}

/// How control leaves a block.
#[derive(Copy, Clone, Debug, Hash, PartialEq, Eq)]
#[cfg_attr(feature = "enable-serde", derive(Serialize, Deserialize))]
pub enum BlockKind {
    /// A removed block.
    Invalid,
    /// Unconditionally goes to its single successor.
    Plain,
    /// Goes to `succs[0]` if its control is true, `succs[1]` otherwise.
    If,
    /// Has two successors but always goes to `succs[0]`. Left behind when a
    /// branch is proven, deadcode removes the dead edge later.
    First,
    /// Returns from the function. The control is a `MakeResult`.
    Ret,
    /// Leaves the function without returning (e.g. a panic). The control is a memory state.
    Exit,
    /// Goes to `succs[control]`. The control is an index that has already
    /// been bounds checked.
    JumpTable,
}

impl BlockKind {
    /// The number of control values a block of this kind has.
    pub fn num_controls(self) -> usize {
        match self {
            BlockKind::Invalid | BlockKind::Plain | BlockKind::First => 0,
            BlockKind::If | BlockKind::Ret | BlockKind::Exit | BlockKind::JumpTable => 1,
        }
    }

    /// The number of successors a block of this kind has, `None` if any
    /// number is allowed.
    pub fn num_succs(self) -> Option<usize> {
        match self {
            BlockKind::Invalid | BlockKind::Ret | BlockKind::Exit => Some(0),
            BlockKind::Plain => Some(1),
            BlockKind::If | BlockKind::First => Some(2),
            BlockKind::JumpTable => None,
        }
    }
}

/// One end of a CFG edge.
///
/// If `b.succs[i] == Edge { block: c, index: j }`, then
/// `c.preds[j] == Edge { block: b, index: i }`. This lets edges be
/// removed and redirected in O(1).
#[derive(Copy, Clone, Debug, Hash, PartialEq, Eq)]
#[cfg_attr(feature = "enable-serde", derive(Serialize, Deserialize))]
pub struct Edge {
    /// The block on the other end.
    pub block: Block,
    /// The index of the reverse edge in `block`'s edge list.
    pub index: usize,
}

/// Static branch prediction for a block with two successors.
#[derive(Copy, Clone, Debug, Default, Hash, PartialEq, Eq)]
#[cfg_attr(feature = "enable-serde", derive(Serialize, Deserialize))]
pub enum BranchPrediction {
    /// `succs[1]` is likely.
    Unlikely,
    /// Nothing is known.
    #[default]
    Unknown,
    /// `succs[0]` is likely.
    Likely,
}

impl BranchPrediction {
    /// The prediction after the successors are swapped.
    pub fn flipped(self) -> Self {
        match self {
            BranchPrediction::Unlikely => BranchPrediction::Likely,
            BranchPrediction::Unknown => BranchPrediction::Unknown,
            BranchPrediction::Likely => BranchPrediction::Unlikely,
        }
    }
}

/// The data for a single basic block.
#[derive(Clone, Debug)]
pub struct BlockData {
    pub(super) kind: BlockKind,
    pub(super) controls: SmallVec<[Value; 2]>,
    pub(super) values: Vec<Value>,
    pub(super) preds: SmallVec<[Edge; 2]>,
    pub(super) succs: SmallVec<[Edge; 2]>,
    pub(super) likely: BranchPrediction,
    pub(super) pos: Pos,
}

impl BlockData {
    pub(super) fn new(kind: BlockKind) -> Self {
        Self {
            kind,
            controls: SmallVec::new(),
            values: Vec::new(),
            preds: SmallVec::new(),
            succs: SmallVec::new(),
            likely: BranchPrediction::Unknown,
            pos: Pos::default(),
        }
    }

    /// How control leaves the block.
    #[inline]
    pub fn kind(&self) -> BlockKind {
        self.kind
    }

    /// The values that decide where control goes.
    #[inline]
    pub fn controls(&self) -> &[Value] {
        &self.controls
    }

    /// The first control value, if there is one.
    #[inline]
    pub fn control(&self) -> Option<Value> {
        self.controls.first().copied()
    }

    /// The values defined in the block. Unordered until scheduling, except
    /// that this is a stable order for iteration.
    #[inline]
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// The incoming edges, in the order phi arguments are in.
    #[inline]
    pub fn preds(&self) -> &[Edge] {
        &self.preds
    }

    /// The outgoing edges.
    #[inline]
    pub fn succs(&self) -> &[Edge] {
        &self.succs
    }

    /// Gets the block on the other end of the `i`th incoming edge.
    #[inline]
    pub fn pred(&self, i: usize) -> Block {
        self.preds[i].block
    }

    /// Gets the block on the other end of the `i`th outgoing edge.
    #[inline]
    pub fn succ(&self, i: usize) -> Block {
        self.succs[i].block
    }

    /// Static branch prediction.
    #[inline]
    pub fn likely(&self) -> BranchPrediction {
        self.likely
    }

    /// The source position of the block's terminator.
    #[inline]
    pub fn pos(&self) -> Pos {
        self.pos
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_have_expected_shapes() {
        assert_eq!(BlockKind::If.num_succs(), Some(2));
        assert_eq!(BlockKind::First.num_controls(), 0);
        assert_eq!(BlockKind::Ret.num_controls(), 1);
        assert_eq!(BlockKind::JumpTable.num_succs(), None);
    }

    #[test]
    fn flipping_prediction_twice_is_identity() {
        for p in [
            BranchPrediction::Likely,
            BranchPrediction::Unknown,
            BranchPrediction::Unlikely,
        ] {
            assert_eq!(p.flipped().flipped(), p);
        }
    }
}
