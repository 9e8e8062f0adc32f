//======---------------------------------------------------------------======//
//                                                                           //
// Copyright 2022-2023 Evan Cox <evanacox00@gmail.com>. All rights reserved. //
//                                                                           //
// Use of this source code is governed by a BSD-style license that can be    //
// found in the LICENSE.txt file at the root of this project, or at the      //
// following link: https://opensource.org/licenses/BSD-3-Clause              //
//                                                                           //
//======---------------------------------------------------------------======//

use crate::ir::{Func, Opcode, Value};
use crate::pass::{FunctionTransformPass, PreservedAnalyses};

/// Removes copies by pointing every use of a copy at the copy's source.
pub struct CopyElimPass;

impl FunctionTransformPass for CopyElimPass {
    fn name(&self) -> &'static str {
        "copyelim"
    }

    fn run(&mut self, func: &mut Func) -> PreservedAnalyses {
        copyelim(func);

        PreservedAnalyses::cfg()
    }
}

/// Rewrites the arguments of `v` that are copies to the values at the
/// bottom of their copy chains. Returns whether anything changed.
pub fn copyelim_value(func: &mut Func, v: Value) -> bool {
    let mut changed = false;

    for i in 0..func[v].args().len() {
        let a = func[v].arg(i);

        if func[a].op() == Opcode::Copy {
            let src = func.copy_source(a);

            func.set_arg(v, i, src);
            changed = true;
        }
    }

    changed
}

/// Rewrites every argument and block control that refers to a copy, then
/// deletes the copies that are left without uses.
pub fn copyelim(func: &mut Func) {
    let layout = func.layout().to_vec();

    for &b in layout.iter() {
        for vi in 0..func[b].values().len() {
            let v = func[b].values()[vi];

            copyelim_value(func, v);
        }

        for i in 0..func[b].controls().len() {
            let c = func[b].controls()[i];

            if func[c].op() == Opcode::Copy {
                let src = func.copy_source(c);

                func.replace_control(b, i, src);
            }
        }
    }

    let mut removed = 0;

    for &b in layout.iter() {
        for vi in 0..func[b].values().len() {
            let v = func[b].values()[vi];

            if func[v].op() == Opcode::Copy && func[v].uses() == 0 {
                func.reset_value(v, Opcode::Invalid);
                removed += 1;
            }
        }
    }

    log::debug!("copyelim: removed {removed} copies from `{}`", func.name());

    func.compact_values();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::*;
    use std::sync::Arc;

    #[test]
    fn chains_and_controls() {
        let mut b = FuncBuilder::new("f", Arc::new(Config::default()));
        let entry = b.create_block();
        let yes = b.create_block();
        let no = b.create_block();

        b.switch_to(entry);
        let mem = b.init_mem();
        let x = b.arg(0, Type::I64);
        let c = b.arg(1, Type::Bool);
        let x1 = b.unary(Opcode::Copy, x);
        let x2 = b.unary(Opcode::Copy, x1);
        let c1 = b.unary(Opcode::Copy, c);
        let add = b.binary(Opcode::Add64, x2, x1);
        b.branch(c1, yes, no);
        b.switch_to(yes);
        b.ret(Some(add), mem);
        b.switch_to(no);
        b.ret(Some(x2), mem);

        let mut f = b.define();

        copyelim(&mut f);

        assert_eq!(f[add].args(), [x, x]);
        assert_eq!(f[entry].control(), Some(c));
        assert!(f.all_values().all(|v| f[v].op() != Opcode::Copy));
        assert_eq!(check_func(&mut f), Ok(()));
    }
}
