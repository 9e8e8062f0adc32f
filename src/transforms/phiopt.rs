//======---------------------------------------------------------------======//
//                                                                           //
// Copyright 2022-2023 Evan Cox <evanacox00@gmail.com>. All rights reserved. //
//                                                                           //
// Use of this source code is governed by a BSD-style license that can be    //
// found in the LICENSE.txt file at the root of this project, or at the      //
// following link: https://opensource.org/licenses/BSD-3-Clause              //
//                                                                           //
//======---------------------------------------------------------------======//

use crate::analysis::SparseTree;
use crate::ir::{Aux, Block, BlockKind, Func, Opcode, Type, Value};
use crate::pass::{FunctionTransformPass, PreservedAnalyses};

/// Replaces boolean phis that just recreate the condition of an earlier
/// branch with that condition.
///
/// The typical case is
///
/// ```text
/// x := false
/// if c {
///     x = true
/// }
/// ```
///
/// which becomes `x = c`.
pub struct PhiOptPass;

impl FunctionTransformPass for PhiOptPass {
    fn name(&self) -> &'static str {
        "phiopt"
    }

    fn run(&mut self, func: &mut Func) -> PreservedAnalyses {
        let n = phiopt(func);

        log::debug!("phiopt: rewrote {n} phis in `{}`", func.name());

        PreservedAnalyses::cfg()
    }
}

// walks up from `b` through blocks with one predecessor and one successor,
// returning the last block before the chain stops and the block it stopped at
fn chain_start(func: &Func, b: Block, pred: usize) -> (Block, Block) {
    let mut prev = b;
    let mut cur = func[b].pred(pred);

    while func[cur].succs().len() == 1 && func[cur].preds().len() == 1 {
        prev = cur;
        cur = func[cur].pred(0);
    }

    (prev, cur)
}

// which of the two edges out of `b0` leads to `pb0` (the block the phi's
// first argument comes through). 0 if it's the true edge
fn reverse_of(func: &Func, b0: Block, pb0: Block, pb1: Block) -> Option<usize> {
    let (s0, s1) = (func[b0].succ(0), func[b0].succ(1));

    if s0 == pb0 && s1 == pb1 {
        Some(0)
    } else if s0 == pb1 && s1 == pb0 {
        Some(1)
    } else {
        None
    }
}

fn const_bool(func: &Func, v: Value) -> Option<bool> {
    match func[v].op() {
        Opcode::ConstBool => Some(func[v].aux_int() != 0),
        _ => None,
    }
}

/// Rewrites boolean and 0/1 integer phis in terms of the branch condition
/// that decides between their arguments. Returns the number of phis changed.
pub fn phiopt(func: &mut Func) -> usize {
    let sdom = func.sdom();
    let mut count = 0;

    for bi in 0..func.layout().len() {
        let b = func.layout()[bi];

        if func[b].preds().len() != 2 || func[b].values().is_empty() {
            continue;
        }

        let (pb0, b0) = chain_start(func, b, 0);
        let (pb1, b1) = chain_start(func, b, 1);

        if b0 != b1 || func[b0].kind() != BlockKind::If {
            continue;
        }

        let reverse = match reverse_of(func, b0, pb0, pb1) {
            Some(r) => r,
            None => panic!("invalid predecessors of {b} from {b0}"),
        };

        let cond = func[b0].controls()[0];

        for v in func.phis(b) {
            if func[v].ty().is_integer() {
                if phiopt_int(func, v, cond, reverse) {
                    count += 1;
                }

                continue;
            }

            if !func[v].ty().is_bool() {
                continue;
            }

            if phiopt_bool(func, &sdom, v, cond, reverse) {
                count += 1;
            }
        }
    }

    count += phiopt_dominator(func, &sdom);

    count
}

fn phiopt_bool(func: &mut Func, sdom: &SparseTree, v: Value, cond: Value, reverse: usize) -> bool {
    let b = func[v].block();
    let taken = func[v].arg(reverse);
    let other = func[v].arg(1 - reverse);

    // if a { x = true } else { x = false }  =>  x = a
    // if a { x = false } else { x = true }  =>  x = !a
    if let (Some(t), Some(o)) = (const_bool(func, taken), const_bool(func, other)) {
        if t != o {
            let op = if t { Opcode::Copy } else { Opcode::Not };

            func.reset_value(v, op);
            func.add_arg(v, cond);
            func.warnl(func[b].pos(), format_args!("converted OpPhi to {op}"));

            return true;
        }
    }

    // if a { x = true } else { x = value }  =>  x = a || value
    //
    // value has to dominate x, so that it's computed no matter what `a` is
    if const_bool(func, taken) == Some(true) && sdom.is_ancestor_eq(func[other].block(), b) {
        func.reset_value(v, Opcode::OrB);
        func.set_args(v, &[cond, other]);
        func.warnl(func[b].pos(), format_args!("converted OpPhi to OrB"));

        return true;
    }

    // if a { x = value } else { x = false }  =>  x = a && value
    if const_bool(func, other) == Some(false) && sdom.is_ancestor_eq(func[taken].block(), b) {
        func.reset_value(v, Opcode::AndB);
        func.set_args(v, &[cond, taken]);
        func.warnl(func[b].pos(), format_args!("converted OpPhi to AndB"));

        return true;
    }

    false
}

// if a { x = 1 } else { x = 0 }  =>  x = zext(a)
fn phiopt_int(func: &mut Func, v: Value, cond: Value, reverse: usize) -> bool {
    let (a0, a1) = (func[v].arg(0), func[v].arg(1));

    if func[a0].op() != func[a1].op() || !func[a0].op().is_const_int() {
        return false;
    }

    let mut negate = match (func[a0].aux_int(), func[a1].aux_int()) {
        (0, 1) => true,
        (1, 0) => false,
        _ => return false,
    };

    if reverse == 1 {
        negate = !negate;
    }

    let b = func[v].block();
    let pos = func[v].pos();
    let mut a = cond;

    if negate {
        a = func.new_value(b, Opcode::Not, Type::Bool, Aux::None, &[a]);
        func.set_pos(a, pos);
    }

    let cvt = func.new_value(b, Opcode::CvtBoolToUint8, Type::I8, Aux::None, &[a]);
    let ty = func[v].ty();
    let op = match ty.bits() {
        Some(8) => Opcode::Copy,
        Some(16) => Opcode::ZeroExt8to16,
        Some(32) => Opcode::ZeroExt8to32,
        Some(64) => Opcode::ZeroExt8to64,
        bits => panic!("bad int size {bits:?} for {v}"),
    };

    func.set_pos(cvt, pos);
    func.reset_value(v, op);
    func.add_arg(v, cvt);
    func.warnl(func[b].pos(), format_args!("converted OpPhi bool -> {ty}"));

    true
}

// the same rewrite as the first half of `phiopt_bool`, but the two arms can
// be arbitrary subgraphs as long as each one is entered only through its
// edge out of the deciding `If`:
//
//      b0
//     /   \
//    sb0  sb1
//    ...  ...
//    pb0  pb1
//      \   /
//        b
fn phiopt_dominator(func: &mut Func, sdom: &SparseTree) -> usize {
    let mut count = 0;

    for bi in 0..func.layout().len() {
        let b = func.layout()[bi];

        if func[b].preds().len() != 2 {
            continue;
        }

        let v = func[b].values().iter().copied().find(|&v| {
            func[v].op() == Opcode::Phi
                && func[func[v].arg(0)].op() == Opcode::ConstBool
                && func[func[v].arg(1)].op() == Opcode::ConstBool
        });

        let v = match v {
            Some(v) => v,
            None => continue,
        };

        let (pb0, pb1) = (func[b].pred(0), func[b].pred(1));
        let parent = sdom.parent(b);

        let found = if func[pb0].kind() == BlockKind::If && Some(pb0) == parent {
            // pb0 is the deciding block, walk pb1 up until it's a child of pb0
            climb_to(sdom, pb0, pb1).map(|p1| (pb0, b, p1))
        } else if func[pb1].kind() == BlockKind::If && Some(pb1) == parent {
            climb_to(sdom, pb1, pb0).map(|p0| (pb1, p0, b))
        } else {
            common_if(func, sdom, pb0, pb1)
        };

        if let Some((b0, p0, p1)) = found {
            if replace_with_cond(func, b0, p0, p1, v) {
                count += 1;
            }
        }
    }

    count
}

// walks `b` up the dominator tree until its parent is `top`
fn climb_to(sdom: &SparseTree, top: Block, mut b: Block) -> Option<Block> {
    while let Some(p) = sdom.parent(b) {
        if p == top {
            return Some(b);
        }

        b = p;
    }

    None
}

fn common_if(func: &Func, sdom: &SparseTree, pb0: Block, pb1: Block) -> Option<(Block, Block, Block)> {
    let mut p0 = pb0;

    while let Some(d0) = sdom.parent(p0) {
        if func[d0].kind() == BlockKind::If {
            let mut p1 = pb1;

            while let Some(d1) = sdom.parent(p1) {
                if d0 == d1 {
                    let sb0 = func[d0].succ(0);
                    let sb1 = func[d0].succ(1);

                    // `if a || b { x = true }` reaches an arm from two
                    // places, so each arm needs exactly one way in
                    if func[sb0].preds().len() == 1 && func[sb1].preds().len() == 1 {
                        return Some((d0, p0, p1));
                    }
                }

                p1 = d1;
            }
        }

        p0 = d0;
    }

    None
}

fn replace_with_cond(func: &mut Func, b0: Block, pb0: Block, pb1: Block, v: Value) -> bool {
    let reverse = match reverse_of(func, b0, pb0, pb1) {
        Some(r) => r,
        None => return false,
    };

    let taken = func[func[v].arg(reverse)].aux_int();
    let other = func[func[v].arg(1 - reverse)].aux_int();

    if taken == other {
        return false;
    }

    let op = if taken != 0 { Opcode::Copy } else { Opcode::Not };
    let cond = func[b0].controls()[0];
    let b = func[v].block();

    func.reset_value(v, op);
    func.add_arg(v, cond);
    func.warnl(func[b].pos(), format_args!("converted OpPhi to {op}"));

    true
}
