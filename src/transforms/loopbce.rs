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
use crate::ir::{Block, BlockKind, Func, Opcode, Value};
use crate::pass::{FunctionTransformPass, PreservedAnalyses};
use crate::utility::SaHashMap;

/// Loop-based bounds check elimination.
///
/// Finds induction variables of loops shaped like `for i := min; i < max;
/// i += inc`, and removes bounds checks on them that the loop condition
/// already guarantees.
pub struct LoopBcePass;

impl FunctionTransformPass for LoopBcePass {
    fn name(&self) -> &'static str {
        "loopbce"
    }

    fn run(&mut self, func: &mut Func) -> PreservedAnalyses {
        let removed = loopbce(func);

        log::debug!("loopbce: removed {removed} bounds checks in `{}`", func.name());

        if removed > 0 {
            PreservedAnalyses::none()
        } else {
            PreservedAnalyses::cfg()
        }
    }
}

/// An induction variable, along with the loop that drives it.
///
/// For every block dominated by `entry`, `min <= ind < max + max_off` and
/// `min <= nxt <= max + max_off`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct IndVar {
    /// The phi holding the current value.
    pub ind: Value,
    /// The constant added every iteration, always positive.
    pub inc: i64,
    /// `ind + inc`.
    pub nxt: Value,
    /// The first value, inclusive.
    pub min: Value,
    /// The bound, exclusive.
    pub max: Value,
    /// A non-positive offset that was dropped off of `max`.
    pub max_off: i64,
    /// The first block of the loop body.
    pub entry: Block,
}

/// Splits `x + c` into `(x, c)`. Anything else is `(v, 0)`.
pub fn drop_add64(f: &Func, v: Value) -> (Value, i64) {
    let data = &f[v];

    if data.op() == Opcode::Add64 {
        for i in 0..2 {
            let c = data.arg(i);

            if f[c].op() == Opcode::Const64 {
                return (data.arg(1 - i), f[c].aux_int());
            }
        }
    }

    (v, 0)
}

/// Whether `v` is known to never be negative just from how it's computed.
pub fn is_non_negative(f: &Func, v: Value) -> bool {
    let data = &f[v];

    match data.op() {
        op if op.is_const_int() => data.aux_int() >= 0,
        Opcode::SliceLen
        | Opcode::SliceCap
        | Opcode::StringLen
        | Opcode::ZeroExt8to16
        | Opcode::ZeroExt8to32
        | Opcode::ZeroExt8to64 => true,
        _ => false,
    }
}

/// Finds the induction variables of `f`. Looks for loops shaped like:
///
/// ```none
/// header:
///     ind = Phi min nxt
///     If (Less64 ind max) body exit
/// body:
///     ...
///     nxt = Add64 ind inc
///     Plain header
/// ```
pub fn find_ind_vars(f: &Func, sdom: &SparseTree) -> Vec<IndVar> {
    let mut ivs = Vec::new();

    for &b in f.layout() {
        if f[b].kind() != BlockKind::If || f[b].preds().len() != 2 {
            continue;
        }

        let cond = match f[b].control() {
            Some(c) => c,
            None => continue,
        };

        let (ind, max) = match f[cond].op() {
            Opcode::Less64 => (f[cond].arg(0), f[cond].arg(1)),
            Opcode::Greater64 => (f[cond].arg(1), f[cond].arg(0)),
            _ => continue,
        };

        if f[ind].op() != Opcode::Phi || f[ind].args().len() != 2 {
            continue;
        }

        let adds_ind = |n: Value| f[n].op() == Opcode::Add64 && f[n].args().contains(&ind);

        let (min, nxt) = if adds_ind(f[ind].arg(0)) {
            (f[ind].arg(1), f[ind].arg(0))
        } else if adds_ind(f[ind].arg(1)) {
            (f[ind].arg(0), f[ind].arg(1))
        } else {
            continue;
        };

        let inc = match f[nxt].arg(0) == ind {
            true => f[nxt].arg(1),
            false => f[nxt].arg(0),
        };

        if f[inc].op() != Opcode::Const64 || f[inc].aux_int() <= 0 {
            continue;
        }

        let inc = f[inc].aux_int();
        let entry = f[b].succ(0);

        // the body is only entered through the `ind < max` edge
        if f[entry].preds().len() != 1 {
            continue;
        }

        // nxt is only computed once ind < max held, so nxt <= max
        if !sdom.is_ancestor_eq(entry, f[nxt].block()) {
            continue;
        }

        // `len + c` with c <= 0 can't overflow, drop the offset
        let mut max = max;
        let mut max_off = 0;
        let (w, c) = drop_add64(f, max);

        if matches!(f[w].op(), Opcode::SliceLen | Opcode::StringLen) && c <= 0 && c != i64::MIN {
            max = w;
            max_off = c;
        }

        // past a step of 1 the loop could jump over max, unless it's
        // provably going to hit it exactly
        if inc != 1 {
            let bounds = (f[min].op(), f[max].op());

            if bounds != (Opcode::Const64, Opcode::Const64) {
                continue;
            }

            let (lo, hi) = (f[min].aux_int(), f[max].aux_int());

            if hi <= lo || hi.rem_euclid(inc) != lo.rem_euclid(inc) {
                continue;
            }
        }

        if f.debug_level() > 1 {
            match f[min].op() {
                Opcode::Const64 => f.warnl(
                    f[b].pos(),
                    format_args!(
                        "induction variable with minimum {} and increment {inc}",
                        f[min].aux_int()
                    ),
                ),
                _ => f.warnl(
                    f[b].pos(),
                    format_args!("induction variable with non-const minimum and increment {inc}"),
                ),
            }
        }

        log::trace!("loopbce: found induction variable {ind} (inc = {inc}, min = {min}, max = {max})");

        ivs.push(IndVar {
            ind,
            inc,
            nxt,
            min,
            max,
            max_off,
            entry,
        });
    }

    ivs
}

fn redundant_check(f: &Func, sdom: &SparseTree, ivs: &SaHashMap<Value, IndVar>, b: Block, v: Value) -> bool {
    let op = f[v].op();

    if !matches!(op, Opcode::IsInBounds | Opcode::IsSliceInBounds) {
        return false;
    }

    let (ind, add) = drop_add64(f, f[v].arg(0));
    let len = f[v].arg(1);

    let iv = match ivs.get(&ind) {
        Some(iv) if sdom.is_ancestor_eq(iv.entry, b) && is_non_negative(f, iv.min) => iv,
        _ => return false,
    };

    // IsInBounds ind max, IsSliceInBounds (ind + 0|1) max
    let offset_ok = match op {
        Opcode::IsInBounds => add == 0,
        _ => (0..=1).contains(&add),
    };

    if offset_ok && len == iv.max {
        return true;
    }

    // IsSliceInBounds (ind + 0|1) (SliceCap s) where max is SliceLen s
    op == Opcode::IsSliceInBounds
        && (0..=1).contains(&add)
        && f[len].op() == Opcode::SliceCap
        && f[iv.max].op() == Opcode::SliceLen
        && f[len].arg(0) == f[iv.max].arg(0)
}

/// Turns `If` blocks checking bounds that the induction variables already
/// guarantee into `First` blocks. Returns the number of checks removed.
pub fn remove_bounds_checks(
    f: &mut Func,
    sdom: &SparseTree,
    ivs: &SaHashMap<Value, IndVar>,
) -> usize {
    let mut removed = 0;

    for bi in 0..f.layout().len() {
        let b = f.layout()[bi];

        if f[b].kind() != BlockKind::If {
            continue;
        }

        let v = match f[b].control() {
            Some(v) => v,
            None => continue,
        };

        if !redundant_check(f, sdom, ivs, b, v) {
            continue;
        }

        if f.debug_level() > 0 {
            f.warnl(f[b].pos(), format_args!("found redundant {}", f[v].op()));
        }

        log::trace!("loopbce: removing bounds check {v} at {b}");

        f.reset_controls(b);
        f.set_kind(b, BlockKind::First);
        removed += 1;
    }

    removed
}

/// Runs loop bounds check elimination, returning the number of checks removed.
///
/// Only bounds checks are touched. Induction variables are left in place,
/// even when nothing but the loop's exit test uses them.
pub fn loopbce(f: &mut Func) -> usize {
    let sdom = f.sdom();
    let ivs: SaHashMap<Value, IndVar> = find_ind_vars(f, &sdom)
        .into_iter()
        .map(|iv| (iv.ind, iv))
        .collect();

    remove_bounds_checks(f, &sdom, &ivs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::*;
    use std::sync::Arc;

    struct Loop {
        f: Func,
        header: Block,
        check: Block,
        ind: Value,
    }

    // for i := start; i < limit; i += step { s[i + off] }
    fn slice_loop(start: i64, step: i64, limit: Option<i64>, op: Opcode, off: i64) -> Loop {
        let mut b = FuncBuilder::new("f", Arc::new(Config::default()));
        let entry = b.create_block();
        let header = b.create_block();
        let check = b.create_block();
        let body = b.create_block();
        let panic = b.create_block();
        let exit = b.create_block();

        b.switch_to(entry);
        let mem = b.init_mem();
        let s = b.arg(0, Type::Slice);
        let len = b.unary(Opcode::SliceLen, s);
        let min = b.iconst(Type::I64, start);
        let inc = b.iconst(Type::I64, step);
        let max = match limit {
            Some(c) => b.iconst(Type::I64, c),
            None => len,
        };
        b.jump(header);

        b.switch_to(header);
        let ind = b.phi(Type::I64, &[min]);
        let cond = b.binary(Opcode::Less64, ind, max);
        b.branch(cond, check, exit);

        b.switch_to(check);
        let idx = match off {
            0 => ind,
            c => {
                let c = b.iconst(Type::I64, c);

                b.binary(Opcode::Add64, ind, c)
            }
        };
        let ok = b.binary(op, idx, len);
        b.branch(ok, body, panic);

        b.switch_to(body);
        let nxt = b.binary(Opcode::Add64, ind, inc);
        b.jump(header);

        b.switch_to(panic);
        b.exit(mem);

        b.switch_to(exit);
        b.ret(Some(ind), mem);

        let mut f = b.define();

        f.add_arg(ind, nxt);

        Loop {
            f,
            header,
            check,
            ind,
        }
    }

    #[test]
    fn finds_the_induction_variable() {
        let mut l = slice_loop(0, 1, None, Opcode::IsInBounds, 0);
        let sdom = l.f.sdom();
        let ivs = find_ind_vars(&l.f, &sdom);

        assert_eq!(ivs.len(), 1);
        assert_eq!(ivs[0].ind, l.ind);
        assert_eq!(ivs[0].inc, 1);
        assert_eq!(ivs[0].entry, l.check);
        assert_eq!(l.f[l.header].kind(), BlockKind::If);
    }

    #[test]
    fn removes_in_bounds_checks() {
        let mut l = slice_loop(0, 1, None, Opcode::IsInBounds, 0);

        assert_eq!(loopbce(&mut l.f), 1);
        assert_eq!(l.f[l.check].kind(), BlockKind::First);
        assert!(l.f[l.check].controls().is_empty());
        assert_eq!(check_func(&mut l.f), Ok(()));
    }

    #[test]
    fn induction_variables_are_left_alone() {
        let mut l = slice_loop(0, 1, None, Opcode::IsInBounds, 0);
        let header = l.header;

        assert_eq!(loopbce(&mut l.f), 1);

        // the exit test still compares the phi against the length
        assert_eq!(l.f[l.ind].op(), Opcode::Phi);
        assert_eq!(l.f[l.ind].args().len(), 2);

        let cond = l.f[header].control().unwrap();

        assert_eq!(l.f[cond].op(), Opcode::Less64);
        assert_eq!(l.f[cond].arg(0), l.ind);
    }

    #[test]
    fn slice_bounds_allow_one_past_the_end() {
        let mut l = slice_loop(0, 1, None, Opcode::IsSliceInBounds, 1);

        assert_eq!(loopbce(&mut l.f), 1);

        let mut l = slice_loop(0, 1, None, Opcode::IsInBounds, 1);

        assert_eq!(loopbce(&mut l.f), 0);
    }

    #[test]
    fn negative_start_keeps_the_check() {
        let mut l = slice_loop(-1, 1, None, Opcode::IsInBounds, 0);

        assert_eq!(loopbce(&mut l.f), 0);
        assert_eq!(l.f[l.check].kind(), BlockKind::If);
    }

    #[test]
    fn larger_steps_need_constant_bounds() {
        // the bound is the length, a step of 2 could jump over it
        let mut l = slice_loop(0, 2, None, Opcode::IsInBounds, 0);
        let sdom = l.f.sdom();

        assert!(find_ind_vars(&l.f, &sdom).is_empty());

        let mut l = slice_loop(0, 2, Some(10), Opcode::IsInBounds, 0);
        let sdom = l.f.sdom();

        assert_eq!(find_ind_vars(&l.f, &sdom).len(), 1);

        let mut l = slice_loop(0, 2, Some(9), Opcode::IsInBounds, 0);
        let sdom = l.f.sdom();

        assert!(find_ind_vars(&l.f, &sdom).is_empty());
    }

    #[test]
    fn drops_constant_offsets() {
        let mut b = FuncBuilder::new("f", Arc::new(Config::default()));
        let entry = b.create_block();

        b.switch_to(entry);
        let mem = b.init_mem();
        let x = b.arg(0, Type::I64);
        let c = b.iconst(Type::I64, -3);
        let sum = b.binary(Opcode::Add64, c, x);
        b.ret(Some(sum), mem);

        let f = b.define();

        assert_eq!(drop_add64(&f, sum), (x, -3));
        assert_eq!(drop_add64(&f, x), (x, 0));
        assert!(!is_non_negative(&f, x));
    }
}
