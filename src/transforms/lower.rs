//======---------------------------------------------------------------======//
//                                                                           //
// Copyright 2022-2023 Evan Cox <evanacox00@gmail.com>. All rights reserved. //
//                                                                           //
// Use of this source code is governed by a BSD-style license that can be    //
// found in the LICENSE.txt file at the root of this project, or at the      //
// following link: https://opensource.org/licenses/BSD-3-Clause              //
//                                                                           //
//======---------------------------------------------------------------======//

use crate::ir::Func;
use crate::pass::{apply_rewrite, FunctionTransformPass, PreservedAnalyses};

/// Hands the function to the target's [`Backend`](crate::ir::Backend),
/// which rewrites blocks and values into machine form until it runs out
/// of things to do. Without a backend nothing happens.
pub struct LowerPass;

impl FunctionTransformPass for LowerPass {
    fn name(&self) -> &'static str {
        "lower"
    }

    fn run(&mut self, func: &mut Func) -> PreservedAnalyses {
        let Some(backend) = func.config().backend().cloned() else {
            log::debug!("lower: no backend, `{}` left alone", func.name());

            return PreservedAnalyses::all();
        };

        let changed = apply_rewrite(
            func,
            |f, b| backend.lower_block(f, b),
            |f, v| backend.lower_value(f, v),
        );

        log::debug!("lower: `{}` lowered for {}, changed: {changed}", func.name(), backend.name());

        if changed {
            PreservedAnalyses::none()
        } else {
            PreservedAnalyses::all()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    // turns negation into subtraction from zero and counts block visits
    #[derive(Default)]
    struct NoNeg {
        blocks: AtomicUsize,
    }

    impl Backend for NoNeg {
        fn name(&self) -> &str {
            "noneg"
        }

        fn lower_block(&self, _: &mut Func, _: Block) -> bool {
            self.blocks.fetch_add(1, Ordering::Relaxed);

            false
        }

        fn lower_value(&self, f: &mut Func, v: Value) -> bool {
            if f[v].op() != Opcode::Neg64 {
                return false;
            }

            let x = f[v].arg(0);
            let zero = f.const_int(Type::I64, 0);

            f.reset_value(v, Opcode::Sub64);
            f.add_arg(v, zero);
            f.add_arg(v, x);

            true
        }
    }

    fn negate(config: Config) -> (Func, Value) {
        let mut b = FuncBuilder::new("f", Arc::new(config));
        let entry = b.create_block();

        b.switch_to(entry);
        let mem = b.init_mem();
        let x = b.arg(0, Type::I64);
        let neg = b.unary(Opcode::Neg64, x);
        b.ret(Some(neg), mem);

        (b.define(), neg)
    }

    #[test]
    fn backend_rules_run_to_completion() {
        let backend = Arc::new(NoNeg::default());
        let config = Config::builder().backend(backend.clone()).build().unwrap();
        let (mut f, neg) = negate(config);

        assert!(!LowerPass.run(&mut f).preserves_all());
        assert_eq!(f[neg].op(), Opcode::Sub64);
        assert_eq!(f[f[neg].arg(0)].aux_int(), 0);
        assert!(backend.blocks.load(Ordering::Relaxed) > 0);
        assert_eq!(check_func(&mut f), Ok(()));
    }

    #[test]
    fn nothing_happens_without_a_backend() {
        let (mut f, neg) = negate(Config::default());

        assert!(LowerPass.run(&mut f).preserves_all());
        assert_eq!(f[neg].op(), Opcode::Neg64);
    }
}
