//======---------------------------------------------------------------======//
//                                                                           //
// Copyright 2022-2023 Evan Cox <evanacox00@gmail.com>. All rights reserved. //
//                                                                           //
// Use of this source code is governed by a BSD-style license that can be    //
// found in the LICENSE.txt file at the root of this project, or at the      //
// following link: https://opensource.org/licenses/BSD-3-Clause              //
//                                                                           //
//======---------------------------------------------------------------======//

use crate::ir::{Aux, Block, BlockKind, Func, Opcode, Value};
use crate::pass::{FunctionTransformPass, PreservedAnalyses};
use smallvec::SmallVec;

/// Turns self-recursive tail calls into loops.
///
/// ```none
/// b0:                                  b9:
///   v1 = Arg [0]                         v1 = Arg [0]
///   ...                                  Plain b0
///                          =>          b0:
/// b5:                                    v20 = Phi v1 v7
///   v8 = StaticCall {f} v7 mem           ...
///   v9 = Select0 v8                    b5:
///   v10 = Select1 v8                     Plain b0
///   Ret (MakeResult v9 v10)
/// ```
///
/// The old entry becomes the loop header, and a new entry block holding
/// the arguments and initial memory jumps to it.
pub struct TailCallLoopPass;

impl FunctionTransformPass for TailCallLoopPass {
    fn name(&self) -> &'static str {
        "tailrec"
    }

    fn run(&mut self, func: &mut Func) -> PreservedAnalyses {
        let converted = tailrec(func);

        log::debug!("tailrec: {converted} tail calls in `{}` became jumps", func.name());

        if converted > 0 {
            PreservedAnalyses::none()
        } else {
            PreservedAnalyses::cfg()
        }
    }
}

/// A `Ret` block that just returns what a call to the function itself
/// returned.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct TailCall {
    /// The returning block.
    pub block: Block,
    /// The `StaticCall`.
    pub call: Value,
}

/// Checks whether `b` returns the result of a self-recursive call that
/// nothing else looks at.
pub fn find_tail_call(f: &Func, b: Block) -> Option<TailCall> {
    if f[b].kind() != BlockKind::Ret {
        return None;
    }

    let result = f[b].control()?;

    if f[result].op() != Opcode::MakeResult || f[result].uses() != 1 {
        return None;
    }

    let args = f[result].args();
    let (val, mem) = match args {
        &[val, mem] => (Some(val), mem),
        &[mem] => (None, mem),
        _ => return None,
    };

    if f[mem].op() != Opcode::Select1 {
        return None;
    }

    let call = f[mem].arg(0);
    let data = &f[call];

    if data.op() != Opcode::StaticCall || data.aux() != Aux::Sym(f.symbol()) || data.block() != b {
        return None;
    }

    if let Some(val) = val {
        if f[val].op() != Opcode::Select0 || f[val].arg(0) != call {
            return None;
        }
    }

    // every use of the call has to be a select in this block that only
    // feeds the return (or nothing at all)
    let mut selects = 0;

    for &v in f[b].values() {
        let vd = &f[v];

        if !matches!(vd.op(), Opcode::Select0 | Opcode::Select1) || vd.arg(0) != call {
            continue;
        }

        let in_result = args.iter().filter(|&&a| a == v).count() as u32;

        if vd.uses() != in_result {
            return None;
        }

        selects += 1;
    }

    if data.uses() != selects {
        return None;
    }

    Some(TailCall { block: b, call })
}

fn incoming(f: &Func, call: Value, param: Value) -> Option<Value> {
    let args = f[call].args();
    let (mem, rest) = args.split_last()?;

    match f[param].op() {
        Opcode::InitMem => Some(*mem),
        _ => {
            let idx = usize::try_from(f[param].aux_int()).ok()?;

            rest.get(idx).copied()
        }
    }
}

/// Rewrites every self-recursive tail call in `f` into a jump back to the
/// top of the function. Returns the number of calls converted.
pub fn tailrec(f: &mut Func) -> usize {
    let old_entry = f.entry();
    let params: SmallVec<[Value; 8]> = f[old_entry]
        .values()
        .iter()
        .copied()
        .filter(|&v| matches!(f[v].op(), Opcode::Arg | Opcode::InitMem))
        .collect();

    let sites: Vec<TailCall> = f
        .layout()
        .iter()
        .filter_map(|&b| find_tail_call(f, b))
        .filter(|tc| params.iter().all(|&p| incoming(f, tc.call, p).is_some()))
        .collect();

    if sites.is_empty() || !f[old_entry].preds().is_empty() {
        return 0;
    }

    // the parameters move into a new entry in front of the loop
    let entry = f.new_block(BlockKind::Plain);

    for &p in params.iter() {
        f.move_value(p, entry);
    }

    f.add_edge_to(entry, old_entry);
    f.set_entry(entry);

    let mut order = f.layout().to_vec();

    order.retain(|&b| b != entry);
    order.insert(0, entry);
    f.set_layout(order);

    let mut phis: SmallVec<[(Value, Value); 8]> = SmallVec::new();

    for &p in params.iter() {
        let ty = f[p].ty();
        let phi = f.new_value(old_entry, Opcode::Phi, ty, Aux::None, &[]);

        f.replace_uses(p, phi);
        f.add_arg(phi, p);
        phis.push((p, phi));
    }

    for site in sites.iter() {
        let TailCall { block: b, call } = *site;

        // already checked that these exist
        let args: SmallVec<[Value; 8]> = phis
            .iter()
            .filter_map(|&(p, _)| incoming(f, call, p))
            .collect();

        for (&(_, phi), &a) in phis.iter().zip(args.iter()) {
            f.add_arg(phi, a);
        }

        if let Some(result) = f[b].control() {
            f.reset_controls(b);
            f.reset_value(result, Opcode::Invalid);
        }

        for vi in 0..f[b].values().len() {
            let v = f[b].values()[vi];

            if matches!(f[v].op(), Opcode::Select0 | Opcode::Select1) && f[v].arg(0) == call {
                f.reset_value(v, Opcode::Invalid);
            }
        }

        f.reset_value(call, Opcode::Invalid);
        f.set_kind(b, BlockKind::Plain);
        f.add_edge_to(b, old_entry);

        f.warnl(f[b].pos(), format_args!("tail call became a jump"));
    }

    f.compact_values();
    f.invalidate_cfg();

    sites.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::*;
    use std::sync::Arc;

    // fact(n, acc) = if n <= 1 { acc } else { fact(n - 1, acc * n) }
    fn factorial(extra_use: bool) -> (Func, Block, Block) {
        let mut b = FuncBuilder::new("fact", Arc::new(Config::default()));
        let entry = b.create_block();
        let base = b.create_block();
        let rec = b.create_block();

        b.switch_to(entry);
        let mem = b.init_mem();
        let n = b.arg(0, Type::I64);
        let acc = b.arg(1, Type::I64);
        let one = b.iconst(Type::I64, 1);
        let done = b.binary(Opcode::Leq64, n, one);
        b.branch(done, base, rec);

        b.switch_to(base);
        b.ret(Some(acc), mem);

        b.switch_to(rec);
        let n1 = b.binary(Opcode::Sub64, n, one);
        let acc1 = b.binary(Opcode::Mul64, acc, n);
        let (res, mem1) = b.call("fact", Type::I64, &[n1, acc1], mem);
        let out = match extra_use {
            true => b.binary(Opcode::Add64, res, one),
            false => res,
        };
        b.ret(Some(out), mem1);

        (b.define(), entry, rec)
    }

    #[test]
    fn self_tail_call_becomes_a_loop() {
        let (mut f, header, rec) = factorial(false);

        assert_eq!(tailrec(&mut f), 1);

        let entry = f.entry();

        assert_ne!(entry, header);
        assert_eq!(f.layout()[0], entry);
        assert_eq!(f[entry].succs().len(), 1);
        assert_eq!(f[entry].succ(0), header);
        assert_eq!(f[rec].kind(), BlockKind::Plain);
        assert_eq!(f[rec].succ(0), header);
        assert_eq!(f[header].preds().len(), 2);

        // n, acc and the memory each get a phi
        let phis = f.phis(header);

        assert_eq!(phis.len(), 3);
        assert!(phis.iter().all(|&p| f[p].args().len() == 2));
        assert!(f.all_values().all(|v| f[v].op() != Opcode::StaticCall));
        assert!(f[entry]
            .values()
            .iter()
            .all(|&v| matches!(f[v].op(), Opcode::Arg | Opcode::InitMem)));
        assert_eq!(check_func(&mut f), Ok(()));
    }

    #[test]
    fn results_that_are_used_are_not_tail_calls() {
        let (mut f, _, rec) = factorial(true);

        assert_eq!(find_tail_call(&f, rec), None);
        assert_eq!(tailrec(&mut f), 0);
    }

    #[test]
    fn calls_to_other_functions_stay() {
        let mut b = FuncBuilder::new("f", Arc::new(Config::default()));
        let entry = b.create_block();

        b.switch_to(entry);
        let mem = b.init_mem();
        let x = b.arg(0, Type::I64);
        let (_, mem1) = b.call("g", Type::Void, &[x], mem);
        b.ret(None, mem1);

        let mut f = b.define();

        assert_eq!(tailrec(&mut f), 0);

        // the same shape calling itself is fine, the unused Select0 is ignored
        let mut b = FuncBuilder::new("g", Arc::new(Config::default()));
        let entry = b.create_block();

        b.switch_to(entry);
        let mem = b.init_mem();
        let x = b.arg(0, Type::I64);
        let (_, mem1) = b.call("g", Type::Void, &[x], mem);
        b.ret(None, mem1);

        let mut g = b.define();

        assert!(find_tail_call(&g, entry).is_some());
        assert_eq!(tailrec(&mut g), 1);
        assert_eq!(check_func(&mut g), Ok(()));
    }
}
