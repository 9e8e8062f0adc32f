//======---------------------------------------------------------------======//
//                                                                           //
// Copyright 2022-2023 Evan Cox <evanacox00@gmail.com>. All rights reserved. //
//                                                                           //
// Use of this source code is governed by a BSD-style license that can be    //
// found in the LICENSE.txt file at the root of this project, or at the      //
// following link: https://opensource.org/licenses/BSD-3-Clause              //
//                                                                           //
//======---------------------------------------------------------------======//

use crate::ir::{Block, BlockKind, Comparison, Func, Opcode, Type, Value};
use crate::pass::{apply_rewrite, FunctionTransformPass, PreservedAnalyses};
use smallvec::SmallVec;
use std::cmp::Ordering;

/// Machine-independent peephole rules: constant folding, algebraic
/// identities and branches on constants.
///
/// Branches whose condition folds to a constant become `First` blocks,
/// the dead edge is left for deadcode to remove.
pub struct GenericRewritePass;

impl FunctionTransformPass for GenericRewritePass {
    fn name(&self) -> &'static str {
        "opt"
    }

    fn run(&mut self, func: &mut Func) -> PreservedAnalyses {
        let mut blocks_changed = false;

        let changed = apply_rewrite(
            func,
            |f, b| {
                let changed = rewrite_block_generic(f, b);

                blocks_changed |= changed;
                changed
            },
            rewrite_value_generic,
        );

        log::debug!("opt: `{}` changed: {changed}", func.name());

        if blocks_changed {
            PreservedAnalyses::none()
        } else {
            PreservedAnalyses::cfg()
        }
    }
}

/// Sign-extends the low `bits` bits of `c`, the canonical form of constants.
#[inline]
pub fn sign_extend(c: i64, bits: u32) -> i64 {
    let shift = 64 - bits;

    (c << shift) >> shift
}

/// Zero-extends the low `bits` bits of `c`.
#[inline]
pub fn zero_extend(c: i64, bits: u32) -> u64 {
    if bits >= 64 {
        c as u64
    } else {
        (c as u64) & ((1u64 << bits) - 1)
    }
}

/// Evaluates a compare on two constants.
pub fn fold_compare(cmp: Comparison, x: i64, y: i64) -> bool {
    let ord = if cmp.unsigned {
        zero_extend(x, cmp.bits).cmp(&zero_extend(y, cmp.bits))
    } else {
        sign_extend(x, cmp.bits).cmp(&sign_extend(y, cmp.bits))
    };

    cmp.rel.holds(ord)
}

/// Evaluates a unary operation on a constant. `None` if `op` isn't
/// something that can be folded.
pub fn fold_unary(op: Opcode, x: i64) -> Option<i64> {
    Some(match op {
        Opcode::Neg64 => x.wrapping_neg(),
        Opcode::Not => (x == 0) as i64,
        Opcode::CvtBoolToUint8 => x,
        Opcode::ZeroExt8to16 | Opcode::ZeroExt8to32 | Opcode::ZeroExt8to64 => x as u8 as i64,
        Opcode::SignExt32to64 => x as i32 as i64,
        Opcode::Trunc64to32 => x as i32 as i64,
        _ => return None,
    })
}

/// Evaluates a binary operation on two constants. `None` if `op` can't be
/// folded, or if evaluating it would trap (division by zero).
pub fn fold_binary(op: Opcode, x: i64, y: i64) -> Option<i64> {
    use Opcode::*;

    Some(match op {
        Add8 | Add16 | Add32 | Add64 => x.wrapping_add(y),
        Sub8 | Sub16 | Sub32 | Sub64 => x.wrapping_sub(y),
        Mul32 | Mul64 => x.wrapping_mul(y),
        And64 | AndB => x & y,
        Or64 | OrB => x | y,
        Xor64 => x ^ y,
        Lsh64x64 => match y as u64 {
            n if n >= 64 => 0,
            n => x << n,
        },
        Rsh64x64 => match y as u64 {
            n if n >= 64 => x >> 63,
            n => x >> n,
        },
        Div64 if y != 0 => x.wrapping_div(y),
        Mod64 if y != 0 => x.wrapping_rem(y),
        Div64u if y != 0 => ((x as u64) / (y as u64)) as i64,
        Mod64u if y != 0 => ((x as u64) % (y as u64)) as i64,
        _ => return None,
    })
}

fn const_of(f: &Func, v: Value) -> Option<i64> {
    let data = &f[v];

    data.op().is_const_int().then(|| data.aux_int())
}

fn bool_of(f: &Func, v: Value) -> Option<bool> {
    let data = &f[v];

    (data.op() == Opcode::ConstBool).then(|| data.aux_int() != 0)
}

fn replace_with_const(f: &mut Func, v: Value, ty: Type, c: i64) -> bool {
    let k = if ty.is_bool() {
        f.const_bool(c != 0)
    } else if ty.is_integer() {
        f.const_int(ty, c)
    } else {
        return false;
    };

    log::trace!("opt: folded {} to {c}", f.value_string(v));

    f.copy_of(v, k);

    true
}

fn fold_constants(f: &mut Func, v: Value) -> bool {
    let op = f[v].op();
    let ty = f[v].ty();

    if op.is_const_int() || op == Opcode::Phi || f[v].args().is_empty() {
        return false;
    }

    let mut consts: SmallVec<[i64; 2]> = SmallVec::new();

    for &a in f[v].args() {
        match const_of(f, a) {
            Some(c) => consts.push(c),
            None => return false,
        }
    }

    let folded = match (op.comparison(), consts.as_slice()) {
        (Some(cmp), &[x, y]) => Some(fold_compare(cmp, x, y) as i64),
        (None, &[x]) => fold_unary(op, x),
        (None, &[x, y]) => fold_binary(op, x, y),
        _ => None,
    };

    match folded {
        Some(c) => replace_with_const(f, v, ty, c),
        None => false,
    }
}

fn simplify(f: &mut Func, v: Value) -> bool {
    use Opcode::*;

    let op = f[v].op();
    let ty = f[v].ty();
    let args: SmallVec<[Value; 2]> = f[v].args().into();

    if let Some(cmp) = op.comparison() {
        if args[0] == args[1] {
            return replace_with_const(f, v, Type::Bool, cmp.rel.holds(Ordering::Equal) as i64);
        }

        return false;
    }

    let forward = |f: &mut Func, to: Value| {
        f.copy_of(v, to);
        true
    };

    match op {
        Not if f[args[0]].op() == Not => {
            let inner = f[args[0]].arg(0);

            forward(f, inner)
        }
        Neg64 if f[args[0]].op() == Neg64 => {
            let inner = f[args[0]].arg(0);

            forward(f, inner)
        }
        AndB | OrB | And64 | Or64 if args[0] == args[1] => forward(f, args[0]),
        Sub8 | Sub16 | Sub32 | Sub64 | Xor64 if args[0] == args[1] => {
            replace_with_const(f, v, ty, 0)
        }
        AndB | OrB => {
            let absorbing = op == OrB;

            for (i, &a) in args.iter().enumerate() {
                match bool_of(f, a) {
                    Some(c) if c == absorbing => return forward(f, a),
                    Some(_) => return forward(f, args[1 - i]),
                    None => {}
                }
            }

            false
        }
        Add8 | Add16 | Add32 | Add64 | Or64 | Xor64 => {
            match (const_of(f, args[0]), const_of(f, args[1])) {
                (Some(0), _) => forward(f, args[1]),
                (_, Some(0)) => forward(f, args[0]),
                _ => false,
            }
        }
        Sub8 | Sub16 | Sub32 | Sub64 | Lsh64x64 | Rsh64x64 => match const_of(f, args[1]) {
            Some(0) => forward(f, args[0]),
            _ => false,
        },
        Mul32 | Mul64 | And64 => {
            let identity = if op == And64 { -1 } else { 1 };

            for (i, &a) in args.iter().enumerate() {
                match const_of(f, a) {
                    Some(0) => return replace_with_const(f, v, ty, 0),
                    Some(c) if c == identity => return forward(f, args[1 - i]),
                    _ => {}
                }
            }

            false
        }
        IsNonNil => match f[args[0]].op() {
            Addr => replace_with_const(f, v, Type::Bool, 1),
            ConstNil => replace_with_const(f, v, Type::Bool, 0),
            _ => false,
        },
        _ => false,
    }
}

/// The value rules of the generic rewrite.
pub fn rewrite_value_generic(f: &mut Func, v: Value) -> bool {
    fold_constants(f, v) || simplify(f, v)
}

/// The block rules of the generic rewrite:
///
/// ```none
/// If (ConstBool true) yes no   => First yes no
/// If (ConstBool false) yes no  => First no yes
/// If (Not c) yes no            => If c no yes
/// ```
pub fn rewrite_block_generic(f: &mut Func, b: Block) -> bool {
    if f[b].kind() != BlockKind::If {
        return false;
    }

    let c = match f[b].control() {
        Some(c) => c,
        None => return false,
    };

    if let Some(taken) = bool_of(f, c) {
        f.reset_controls(b);
        f.set_kind(b, BlockKind::First);

        if !taken {
            f.swap_successors(b);
        }

        f.warnl(f[b].pos(), format_args!("branch on constant {taken}"));

        return true;
    }

    if f[c].op() == Opcode::Not {
        let inner = f[c].arg(0);

        f.set_control(b, inner);
        f.swap_successors(b);

        return true;
    }

    false
}
