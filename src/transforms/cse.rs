//======---------------------------------------------------------------======//
//                                                                           //
// Copyright 2022-2023 Evan Cox <evanacox00@gmail.com>. All rights reserved. //
//                                                                           //
// Use of this source code is governed by a BSD-style license that can be    //
// found in the LICENSE.txt file at the root of this project, or at the      //
// following link: https://opensource.org/licenses/BSD-3-Clause              //
//                                                                           //
//======---------------------------------------------------------------======//

use crate::arena::{ArenaKey, SecondaryMap};
use crate::ir::{Aux, Block, Func, Opcode, Type, Value};
use crate::pass::{FunctionTransformPass, PreservedAnalyses};
use crate::utility::PackedOption;
use smallvec::SmallVec;

/// Common subexpression elimination.
///
/// This is the partition-refinement flavour of value numbering: values start
/// out in classes keyed by everything but their arguments, and classes are
/// split until every member of a class has arguments in the same classes.
/// Anything left in a class together is equivalent, and uses of a value are
/// pointed at an equivalent value that dominates it.
pub struct CsePass;

impl FunctionTransformPass for CsePass {
    fn name(&self) -> &'static str {
        "cse"
    }

    fn run(&mut self, func: &mut Func) -> PreservedAnalyses {
        let n = cse(func);

        log::debug!("cse: {n} uses rewritten in `{}`", func.name());

        PreservedAnalyses::cfg()
    }
}

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct PartitionKey {
    op: Opcode,
    ty: Type,
    aux: (u8, i64),
    nargs: usize,
    // phis in different blocks are never the same, even with the same args
    phi_block: Option<usize>,
}

fn partition_key(func: &Func, v: Value) -> PartitionKey {
    let data = &func[v];
    let aux = match data.aux() {
        Aux::None => (0, 0),
        Aux::Int(i) => (1, i),
        Aux::Sym(s) => (2, s.index() as i64),
    };

    PartitionKey {
        op: data.op(),
        ty: data.ty(),
        aux,
        nargs: data.args().len(),
        phi_block: (data.op() == Opcode::Phi).then(|| data.block().index()),
    }
}

fn participates(func: &Func, v: Value) -> bool {
    let data = &func[v];

    !(data.op() == Opcode::Invalid
        || data.ty().is_memory()
        || data.op().has_side_effects()
        || data.op().is_nil_check())
}

type Signature = SmallVec<[usize; 4]>;

// splits a sorted list into the values of each run of equal keys
fn runs<K: PartialEq>(sorted: &[(K, Value)]) -> Vec<Vec<Value>> {
    let mut out: Vec<Vec<Value>> = Vec::new();

    for (i, (key, v)) in sorted.iter().enumerate() {
        match out.last_mut() {
            Some(run) if i > 0 && sorted[i - 1].0 == *key => run.push(*v),
            _ => out.push(vec![*v]),
        }
    }

    out
}

fn signature(func: &Func, class_of: &SecondaryMap<Value, usize>, v: Value) -> Signature {
    let mut sig: Signature = func[v].args().iter().map(|&a| class_of[a]).collect();

    if func[v].op().is_commutative() && sig.len() == 2 && sig[1] < sig[0] {
        sig.swap(0, 1);
    }

    sig
}

/// Partitions the values of `func` into classes of equivalent values.
/// Values that can never be merged are left out.
pub fn partition_values(func: &Func) -> Vec<Vec<Value>> {
    let mut candidates: Vec<(PartitionKey, Value)> = func
        .all_values()
        .filter(|&v| participates(func, v))
        .map(|v| (partition_key(func, v), v))
        .collect();

    candidates.sort_unstable();

    // every value gets a class number, values that don't participate get
    // one to themselves
    let mut class_of = SecondaryMap::fill(func.num_values(), usize::MAX);
    let mut classes: Vec<Vec<Value>> = Vec::new();

    for group in runs(&candidates) {
        let id = classes.len();

        for &v in group.iter() {
            class_of[v] = id;
        }

        classes.push(group);
    }

    let mut next = classes.len();

    for v in func.all_values() {
        if class_of[v] == usize::MAX {
            class_of[v] = next;
            next += 1;
        }
    }

    loop {
        let mut changed = false;

        for ci in 0..classes.len() {
            if classes[ci].len() < 2 {
                continue;
            }

            let mut members: Vec<(Signature, Value)> = classes[ci]
                .iter()
                .map(|&v| (signature(func, &class_of, v), v))
                .collect();

            members.sort_unstable();

            let mut split_off = runs(&members).into_iter();
            let first = split_off.next();

            for split in split_off {
                let id = classes.len();

                for &v in split.iter() {
                    class_of[v] = id;
                }

                log::trace!("cse: split {} values off class {ci}", split.len());

                classes.push(split);
                changed = true;
            }

            if let Some(first) = first {
                classes[ci] = first;
            }
        }

        if !changed {
            break;
        }
    }

    classes.retain(|c| c.len() > 1);
    classes
}

/// Runs CSE over `func`, returning the number of arguments and controls
/// that were rewritten. The values that were replaced are left for
/// dead code elimination.
pub fn cse(func: &mut Func) -> usize {
    let sdom = func.sdom();
    let classes = partition_values(func);
    let mut rewrite = SecondaryMap::<Value, PackedOption<Value>>::fill(
        func.num_values(),
        PackedOption::none(),
    );

    for mut class in classes {
        let entry = |b: Block| sdom.entry_number(b);

        class.sort_unstable_by_key(|&v| (entry(func[v].block()), v));

        let mut remaining: Vec<PackedOption<Value>> =
            class.iter().copied().map(PackedOption::some).collect();

        // a subtree of the dominator tree is a contiguous range of entry
        // numbers, so the members dominated by `v` come right after it
        for i in 0..remaining.len() {
            let v = match remaining[i].take() {
                Some(v) => v,
                None => continue,
            };

            for slot in remaining[i + 1..].iter_mut() {
                let w = match slot.expand() {
                    Some(w) => w,
                    None => continue,
                };

                if !sdom.is_ancestor_eq(func[v].block(), func[w].block()) {
                    break;
                }

                log::trace!("cse: {w} => {v}");

                rewrite[w] = PackedOption::some(v);
                *slot = PackedOption::none();
            }
        }
    }

    let mut count = 0;
    let layout = func.layout().to_vec();

    for &b in layout.iter() {
        for vi in 0..func[b].values().len() {
            let v = func[b].values()[vi];

            for i in 0..func[v].args().len() {
                let a = func[v].arg(i);

                if let Some(w) = rewrite[a].expand() {
                    func.set_arg(v, i, w);
                    count += 1;
                }
            }
        }

        for i in 0..func[b].controls().len() {
            let c = func[b].controls()[i];

            if let Some(w) = rewrite[c].expand() {
                func.replace_control(b, i, w);
                count += 1;
            }
        }
    }

    count
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::*;
    use std::sync::Arc;

    #[test]
    fn duplicate_constants_merge() {
        let mut b = FuncBuilder::new("f", Arc::new(Config::default()));
        let entry = b.create_block();
        let next = b.create_block();

        b.switch_to(entry);
        let mem = b.init_mem();

        // not using `iconst`, that would share them up front
        let consts: Vec<Value> = (0..3)
            .map(|_| b.value(Opcode::Const64, Type::I64, Aux::Int(25), &[]))
            .collect();

        b.jump(next);
        b.switch_to(next);

        let copies: Vec<Value> = consts.iter().map(|&c| b.unary(Opcode::Copy, c)).collect();
        let sum = b.binary(Opcode::Add64, copies[0], copies[1]);
        let sum = b.binary(Opcode::Add64, sum, copies[2]);
        b.ret(Some(sum), mem);

        let mut f = b.define();

        assert!(cse(&mut f) > 0);

        let survivor = f[copies[0]].arg(0);

        for &c in copies.iter() {
            assert_eq!(f[c].arg(0), survivor);
        }

        assert!(consts.contains(&survivor));
        assert_eq!(check_func(&mut f), Ok(()));

        // running it again finds nothing new
        assert_eq!(cse(&mut f), 0);
    }

    #[test]
    fn only_dominating_values_are_reused() {
        let mut b = FuncBuilder::new("f", Arc::new(Config::default()));
        let entry = b.create_block();
        let left = b.create_block();
        let right = b.create_block();
        let merge = b.create_block();

        b.switch_to(entry);
        let mem = b.init_mem();
        let x = b.arg(0, Type::I64);
        let y = b.arg(1, Type::I64);
        let c = b.arg(2, Type::Bool);
        b.branch(c, left, right);

        b.switch_to(left);
        let l = b.binary(Opcode::Add64, x, y);
        b.jump(merge);

        b.switch_to(right);
        let r = b.binary(Opcode::Add64, y, x);
        b.jump(merge);

        b.switch_to(merge);
        let m = b.binary(Opcode::Add64, x, y);
        let phi = b.phi(Type::I64, &[l, r]);
        let out = b.binary(Opcode::Sub64, phi, m);
        b.ret(Some(out), mem);

        let mut f = b.define();

        // l, r and m are all equivalent but none dominates another
        assert_eq!(cse(&mut f), 0);
        assert_eq!(f[phi].args(), [l, r]);
        assert_eq!(f[out].args(), [phi, m]);
    }

    #[test]
    fn refinement_separates_different_args() {
        let mut b = FuncBuilder::new("f", Arc::new(Config::default()));
        let entry = b.create_block();

        b.switch_to(entry);
        let mem = b.init_mem();
        let x = b.arg(0, Type::I64);
        let y = b.arg(1, Type::I64);
        let nx1 = b.unary(Opcode::Neg64, x);
        let nx2 = b.unary(Opcode::Neg64, x);
        let ny = b.unary(Opcode::Neg64, y);
        let a1 = b.binary(Opcode::Add64, nx1, ny);
        let a2 = b.binary(Opcode::Add64, ny, nx2);
        let a3 = b.binary(Opcode::Add64, nx1, nx2);
        let s = b.binary(Opcode::Sub64, a1, a2);
        let s = b.binary(Opcode::Sub64, s, a3);
        b.ret(Some(s), mem);

        let f = b.define();
        let classes = partition_values(&f);
        let class_with = |v: Value| classes.iter().find(|c| c.contains(&v)).cloned();

        let adds = class_with(a1).unwrap();

        assert!(adds.contains(&a2));
        assert!(!adds.contains(&a3));
        assert!(class_with(nx1).unwrap().contains(&nx2));
        assert!(!class_with(nx1).unwrap().contains(&ny));
        assert!(class_with(x).is_none());
    }

    #[test]
    fn memory_and_side_effects_are_left_alone() {
        let mut b = FuncBuilder::new("f", Arc::new(Config::default()));
        let entry = b.create_block();

        b.switch_to(entry);
        let mem = b.init_mem();
        let p = b.arg(0, Type::Ptr);
        let x = b.arg(1, Type::I64);
        let m1 = b.store(p, x, mem);
        let m2 = b.store(p, x, mem);
        let _ = b.nil_check(p, m1);
        b.ret(None, m2);

        let f = b.define();

        assert!(partition_values(&f).is_empty());
    }
}
