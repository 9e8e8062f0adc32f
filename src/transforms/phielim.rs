//======---------------------------------------------------------------======//
//                                                                           //
// Copyright 2022-2023 Evan Cox <evanacox00@gmail.com>. All rights reserved. //
//                                                                           //
// Use of this source code is governed by a BSD-style license that can be    //
// found in the LICENSE.txt file at the root of this project, or at the      //
// following link: https://opensource.org/licenses/BSD-3-Clause              //
//                                                                           //
//======---------------------------------------------------------------======//

use crate::ir::{Func, Opcode};
use crate::pass::{FunctionTransformPass, PreservedAnalyses};
use crate::transforms::copyelim_value;

/// Turns phis that only ever see one value into copies of that value.
pub struct PhiElimPass;

impl FunctionTransformPass for PhiElimPass {
    fn name(&self) -> &'static str {
        "phielim"
    }

    fn run(&mut self, func: &mut Func) -> PreservedAnalyses {
        let n = phielim(func);

        log::debug!("phielim: {n} phis eliminated in `{}`", func.name());

        PreservedAnalyses::cfg()
    }
}

/// Eliminates every phi whose arguments (other than the phi itself, and
/// looking through copies) are all the same value. This is repeated until
/// nothing changes, since one phi becoming a copy can make another one
/// redundant.
///
/// Returns the number of phis that were eliminated.
pub fn phielim(func: &mut Func) -> usize {
    let mut count = 0;

    loop {
        let mut changed = false;

        for bi in 0..func.layout().len() {
            let b = func.layout()[bi];

            for vi in 0..func[b].values().len() {
                let v = func[b].values()[vi];

                if func[v].op() != Opcode::Phi {
                    continue;
                }

                copyelim_value(func, v);

                if func.phielim_value(v) {
                    changed = true;
                    count += 1;
                }
            }
        }

        if !changed {
            break;
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
    fn cascading_phis() {
        let mut b = FuncBuilder::new("f", Arc::new(Config::default()));
        let entry = b.create_block();
        let header = b.create_block();
        let body = b.create_block();
        let exit = b.create_block();

        b.switch_to(entry);
        let mem = b.init_mem();
        let x = b.arg(0, Type::I64);
        let c = b.arg(1, Type::Bool);
        b.jump(header);

        // p1 = phi(x, p2), p2 = phi(p1) only ever hold x
        b.switch_to(header);
        let p1 = b.phi(Type::I64, &[x]);
        b.branch(c, body, exit);
        b.switch_to(body);
        let p2 = b.phi(Type::I64, &[p1]);
        b.jump(header);
        b.switch_to(exit);
        b.ret(Some(p1), mem);

        let mut f = b.define();

        f.add_arg(p1, p2);

        assert_eq!(phielim(&mut f), 2);
        assert_eq!(f[p1].op(), Opcode::Copy);
        assert_eq!(f[p2].op(), Opcode::Copy);
        assert_eq!(f.copy_source(p1), x);
        assert_eq!(f.copy_source(p2), x);

        // already at a fixpoint
        assert_eq!(phielim(&mut f), 0);
    }

    #[test]
    fn distinct_inputs_stay() {
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
        b.jump(merge);
        b.switch_to(right);
        b.jump(merge);
        b.switch_to(merge);
        let phi = b.phi(Type::I64, &[x, y]);
        b.ret(Some(phi), mem);

        let mut f = b.define();

        assert_eq!(phielim(&mut f), 0);
        assert_eq!(f[phi].op(), Opcode::Phi);
    }
}
