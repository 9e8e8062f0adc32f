//======---------------------------------------------------------------======//
//                                                                           //
// Copyright 2022-2023 Evan Cox <evanacox00@gmail.com>. All rights reserved. //
//                                                                           //
// Use of this source code is governed by a BSD-style license that can be    //
// found in the LICENSE.txt file at the root of this project, or at the      //
// following link: https://opensource.org/licenses/BSD-3-Clause              //
//                                                                           //
//======---------------------------------------------------------------======//

use crate::ir::{Block, Func, Opcode, Value};

/// The number of full scans after which a rewrite is assumed to be cycling.
pub const MAX_REWRITE_ITERATIONS: usize = 1000;

/// Applies local rewrites to every block and value of `f` until a full scan
/// changes nothing.
///
/// `rb` is called on every block and `rv` on every value, and either should
/// return `true` if it changed something. Scans are in layout order, then
/// in the order values are listed in their block, so the result only
/// depends on the input function.
///
/// Along the way:
/// - copies feeding arguments and controls are skipped over, so rules
///   never have to look through them
/// - phis with a single distinct argument become copies
/// - removable values that end up with no uses are reset to `Invalid`
///
/// Invalid values are compacted out of their blocks once the scans are done.
/// Returns whether anything changed.
///
/// Panics if the rules haven't settled after [`MAX_REWRITE_ITERATIONS`]
/// scans, which means two of them undo each other.
pub fn apply_rewrite<RB, RV>(f: &mut Func, mut rb: RB, mut rv: RV) -> bool
where
    RB: FnMut(&mut Func, Block) -> bool,
    RV: FnMut(&mut Func, Value) -> bool,
{
    let mut any = false;
    let mut iters = 0;

    loop {
        let mut changed = false;
        let layout = f.layout().to_vec();

        for b in layout {
            for i in 0..f[b].controls().len() {
                let c = f[b].controls()[i];
                let src = f.copy_source(c);

                if src != c {
                    f.replace_control(b, i, src);
                    changed = true;
                }
            }

            changed |= rb(f, b);

            // rules may append values (constants go in the entry block)
            let mut i = 0;

            while i < f[b].values().len() {
                let v = f[b].values()[i];

                i += 1;

                if f[v].op() == Opcode::Invalid {
                    continue;
                }

                changed |= f.phielim_value(v);

                for j in 0..f[v].args().len() {
                    let a = f[v].arg(j);

                    if f[a].op() != Opcode::Copy {
                        continue;
                    }

                    let src = f.copy_source(a);

                    f.set_arg(v, j, src);
                    changed = true;

                    if f[a].uses() == 0 {
                        f.reset_value(a, Opcode::Invalid);
                    }
                }

                changed |= rv(f, v);

                if f[v].uses() == 0 && f[v].removeable() && f[v].op() != Opcode::Invalid {
                    log::trace!("rewrite: {} is dead", f.value_string(v));

                    f.reset_value(v, Opcode::Invalid);
                    changed = true;
                }
            }
        }

        if !changed {
            break;
        }

        any = true;
        iters += 1;

        if iters > MAX_REWRITE_ITERATIONS {
            panic!("rewrite cycle detected in `{}`", f.name());
        }
    }

    log::trace!("rewrite of `{}` settled after {} scans", f.name(), iters + 1);

    f.compact_values();

    any
}

/// A block callback that never changes anything.
pub fn no_block_rewrite(_: &mut Func, _: Block) -> bool {
    false
}

/// A value callback that never changes anything.
pub fn no_value_rewrite(_: &mut Func, _: Value) -> bool {
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::*;
    use std::sync::Arc;

    #[test]
    fn copies_are_skipped_and_removed() {
        let mut b = FuncBuilder::new("f", Arc::new(Config::default()));
        let entry = b.create_block();

        b.switch_to(entry);
        let mem = b.init_mem();
        let x = b.arg(0, Type::I64);
        let c1 = b.unary(Opcode::Copy, x);
        let c2 = b.unary(Opcode::Copy, c1);
        let neg = b.unary(Opcode::Neg64, c2);
        b.ret(Some(neg), mem);

        let mut f = b.define();

        assert!(apply_rewrite(&mut f, no_block_rewrite, no_value_rewrite));
        assert_eq!(f[neg].args(), [x]);
        assert_eq!(f[c1].op(), Opcode::Invalid);
        assert_eq!(f[c2].op(), Opcode::Invalid);
        assert!(!f[entry].values().contains(&c1));
        assert_eq!(check_func(&mut f), Ok(()));

        // nothing left to do the second time around
        assert!(!apply_rewrite(&mut f, no_block_rewrite, no_value_rewrite));
    }

    #[test]
    fn rules_run_to_fixpoint() {
        let mut b = FuncBuilder::new("f", Arc::new(Config::default()));
        let entry = b.create_block();

        b.switch_to(entry);
        let mem = b.init_mem();
        let x = b.arg(0, Type::I64);
        let n1 = b.unary(Opcode::Neg64, x);
        let n2 = b.unary(Opcode::Neg64, n1);
        let n3 = b.unary(Opcode::Neg64, n2);
        let n4 = b.unary(Opcode::Neg64, n3);
        b.ret(Some(n4), mem);

        let mut f = b.define();
        let result = f[entry].control().unwrap();

        // Neg64 (Neg64 x) => Copy x
        let mut calls = 0;

        apply_rewrite(&mut f, no_block_rewrite, |f, v| {
            calls += 1;

            if f[v].op() != Opcode::Neg64 {
                return false;
            }

            let a = f[v].arg(0);

            if f[a].op() != Opcode::Neg64 {
                return false;
            }

            let inner = f[a].arg(0);

            f.copy_of(v, inner);

            true
        });

        assert!(calls > 0);
        assert_eq!(f[result].arg(0), x);
        assert_eq!(f.all_values().filter(|&v| f[v].op() == Opcode::Neg64).count(), 0);
        assert_eq!(check_func(&mut f), Ok(()));
    }

    #[test]
    fn phis_with_one_input_collapse() {
        let mut b = FuncBuilder::new("f", Arc::new(Config::default()));
        let entry = b.create_block();
        let left = b.create_block();
        let right = b.create_block();
        let merge = b.create_block();

        b.switch_to(entry);
        let mem = b.init_mem();
        let x = b.arg(0, Type::I64);
        let c = b.arg(1, Type::Bool);
        b.branch(c, left, right);
        b.switch_to(left);
        b.jump(merge);
        b.switch_to(right);
        b.jump(merge);
        b.switch_to(merge);
        let phi = b.phi(Type::I64, &[x, x]);
        let neg = b.unary(Opcode::Neg64, phi);
        b.ret(Some(neg), mem);

        let mut f = b.define();

        apply_rewrite(&mut f, no_block_rewrite, no_value_rewrite);

        assert_eq!(f[neg].args(), [x]);
        assert_eq!(f[phi].op(), Opcode::Invalid);
    }

    #[test]
    #[should_panic(expected = "rewrite cycle")]
    fn flip_flopping_rules_are_fatal() {
        let mut b = FuncBuilder::new("f", Arc::new(Config::default()));
        let entry = b.create_block();

        b.switch_to(entry);
        let mem = b.init_mem();
        let x = b.arg(0, Type::I64);
        let y = b.arg(1, Type::I64);
        let add = b.binary(Opcode::Add64, x, y);
        b.ret(Some(add), mem);

        let mut f = b.define();

        apply_rewrite(&mut f, no_block_rewrite, |f, v| {
            if f[v].op() != Opcode::Add64 {
                return false;
            }

            let (l, r) = (f[v].arg(0), f[v].arg(1));

            f.set_args(v, &[r, l]);

            true
        });
    }
}
