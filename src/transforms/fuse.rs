//======---------------------------------------------------------------======//
//                                                                           //
// Copyright 2022-2023 Evan Cox <evanacox00@gmail.com>. All rights reserved. //
//                                                                           //
// Use of this source code is governed by a BSD-style license that can be    //
// found in the LICENSE.txt file at the root of this project, or at the      //
// following link: https://opensource.org/licenses/BSD-3-Clause              //
//                                                                           //
//======---------------------------------------------------------------======//

use crate::ir::{Block, BlockKind, Edge, Func, Opcode, Relation, Type, Value};
use crate::pass::{FunctionTransformPass, PreservedAnalyses};
use smallvec::SmallVec;

/// Simplifies the control flow graph by short-circuiting branches whose
/// outcome is already decided by a predecessor, and by merging straight
/// line chains of blocks.
pub struct FusePass;

impl FunctionTransformPass for FusePass {
    fn name(&self) -> &'static str {
        "fuse"
    }

    fn run(&mut self, func: &mut Func) -> PreservedAnalyses {
        let changed = fuse(func);

        log::debug!("fuse: `{}` changed = {changed}", func.name());

        if changed {
            PreservedAnalyses::none()
        } else {
            PreservedAnalyses::all()
        }
    }
}

/// Runs both transformations over every block until nothing changes.
pub fn fuse(f: &mut Func) -> bool {
    let mut changed = false;

    loop {
        let mut again = false;

        for b in f.layout().to_vec() {
            if f[b].kind() == BlockKind::Invalid {
                continue;
            }

            again |= fuse_branch_redirect(f, b);
            again |= fuse_block_plain(f, b);
        }

        if !again {
            break;
        }

        changed = true;
    }

    if changed {
        f.invalidate_cfg();
    }

    changed
}

/// Looks through `Copy` and `Not` to the value actually being branched on.
/// The flag is whether an odd number of `Not`s were skipped.
fn strip_negations(f: &Func, mut v: Value) -> (Value, bool) {
    let mut negated = false;

    loop {
        match f[v].op() {
            Opcode::Copy => v = f[v].arg(0),
            Opcode::Not => {
                negated = !negated;
                v = f[v].arg(0);
            }
            _ => return (v, negated),
        }
    }
}

/// Whether `rel` always, never, or only sometimes holds given that the
/// outcome of comparing the same operands is one of `known`.
fn implied(known: u8, rel: Relation) -> Option<bool> {
    let mask = rel.mask();

    if known & !mask == 0 {
        Some(true)
    } else if known & mask == 0 {
        Some(false)
    } else {
        None
    }
}

fn is_ordering(rel: Relation) -> bool {
    !matches!(rel, Relation::Eq | Relation::Neq)
}

/// If `pcond` is known to be `ptrue`, works out what `bcond` must be.
fn implied_truth(f: &Func, pcond: Value, ptrue: bool, bcond: Value) -> Option<bool> {
    if pcond == bcond {
        return Some(ptrue);
    }

    let (pd, bd) = (&f[pcond], &f[bcond]);

    if pd.op() == Opcode::IsNonNil && bd.op() == Opcode::IsNonNil && pd.arg(0) == bd.arg(0) {
        return Some(ptrue);
    }

    let pc = pd.op().comparison()?;
    let bc = bd.op().comparison()?;
    let is_ptr = |op: Opcode| matches!(op, Opcode::EqPtr | Opcode::NeqPtr);

    if pc.bits != bc.bits || is_ptr(pd.op()) != is_ptr(bd.op()) {
        return None;
    }

    // equality doesn't care about signedness, orderings do
    if is_ordering(pc.rel) && is_ordering(bc.rel) && pc.unsigned != bc.unsigned {
        return None;
    }

    let rel = if ptrue { pc.rel } else { pc.rel.negated() };

    let rel = match (pd.args(), bd.args()) {
        (&[a, b], &[c, d]) if a == c && b == d => rel,
        (&[a, b], &[c, d]) if a == d && b == c => rel.swapped(),
        _ => return None,
    };

    implied(rel.mask(), bc.rel)
}

/// Redirects predecessors of the `If` block `b` straight to the successor
/// `b` would take when coming from them.
///
/// ```none
/// p:                               p:
///   v5 = Less64 v3 v4                v5 = Less64 v3 v4
///   If v5 -> b, s                    If v5 -> t, s
/// b:                        =>     b:
///   v6 = Leq64 v3 v4                 ...
///   If v6 -> t, u
/// ```
///
/// `b` may not contain anything besides the chain computing its control,
/// since the redirected paths no longer execute it. Returns whether any
/// edge moved.
pub fn fuse_branch_redirect(f: &mut Func, b: Block) -> bool {
    if f[b].kind() != BlockKind::If {
        return false;
    }

    let Some(ctl) = f[b].control() else {
        return false;
    };

    if f[ctl].ty() != Type::Bool {
        return false;
    }

    let (cond, bnot) = strip_negations(f, ctl);

    let mut local = 0;
    let mut v = ctl;

    loop {
        if f[v].block() == b && f[v].uses() == 1 {
            local += 1;
        }

        if v == cond {
            break;
        }

        v = f[v].arg(0);
    }

    if local != f[b].values().len() {
        return false;
    }

    // a phi in `b` has a different value on every incoming edge
    if f[cond].block() == b && f[cond].op() == Opcode::Phi {
        return false;
    }

    let mut changed = false;
    let mut k = 0;

    while k < f[b].preds().len() {
        let Edge { block: p, index: pi } = f[b].preds()[k];

        if p == b || f[p].kind() != BlockKind::If {
            k += 1;
            continue;
        }

        let Some(pctl) = f[p].control() else {
            k += 1;
            continue;
        };

        let (pcond, pnot) = strip_negations(f, pctl);
        let ptrue = (pi == 0) != pnot;

        let Some(btrue) = implied_truth(f, pcond, ptrue, cond) else {
            k += 1;
            continue;
        };

        let bsi = usize::from(btrue == bnot);
        let Edge { block: tb, index: tbpi } = f[b].succs()[bsi];

        if tb == b || tb == p {
            k += 1;
            continue;
        }

        log::trace!("fuse: {p} -> {b} always continues to {tb}");

        // the last predecessor moves into slot k, so k is looked at again
        f.remove_pred(b, k);
        f.redirect_succ(p, pi, tb);

        for phi in f.phis(tb) {
            let a = f[phi].arg(tbpi);

            f.add_arg(phi, a);
        }

        f.warnl(f[p].pos(), format_args!("redirected {p} past {b}"));
        changed = true;
    }

    if changed && f[b].preds().is_empty() {
        f.remove_block(b);
    }

    changed
}

/// Merges the `Plain` block `b` with its successor, if `b` is the only way
/// into it. Everything ends up in `b`, which takes over the successor's
/// kind, controls and outgoing edges. Returns whether the blocks merged.
pub fn fuse_block_plain(f: &mut Func, b: Block) -> bool {
    if f[b].kind() != BlockKind::Plain || f[b].succs().len() != 1 {
        return false;
    }

    let c = f[b].succ(0);

    if c == b || c == f.entry() || f[c].preds().len() != 1 {
        return false;
    }

    let phis = f.phis(c);

    if phis.iter().any(|&phi| f[phi].arg(0) == phi) {
        return false;
    }

    for phi in phis {
        let a = f[phi].arg(0);

        f.copy_of(phi, a);
    }

    f.remove_succ(b, 0);
    f.remove_pred(c, 0);

    for v in f[c].values().to_vec() {
        f.move_value(v, b);
    }

    let controls: SmallVec<[Value; 2]> = f[c].controls().iter().copied().collect();

    f.reset_controls(c);

    for v in controls {
        f.add_control(b, v);
    }

    let (kind, likely) = (f[c].kind(), f[c].likely());

    f.set_kind(b, kind);
    f.set_likely(b, likely);
    f.move_succs(c, b);
    f.remove_block(c);

    log::trace!("fuse: merged {c} into {b}");

    true
}
