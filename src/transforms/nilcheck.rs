//======---------------------------------------------------------------======//
//                                                                           //
// Copyright 2022-2023 Evan Cox <evanacox00@gmail.com>. All rights reserved. //
//                                                                           //
// Use of this source code is governed by a BSD-style license that can be    //
// found in the LICENSE.txt file at the root of this project, or at the      //
// following link: https://opensource.org/licenses/BSD-3-Clause              //
//                                                                           //
//======---------------------------------------------------------------======//

use crate::ir::{Block, BlockKind, Func, Opcode, Value};
use crate::pass::{FunctionTransformPass, PreservedAnalyses};
use crate::utility::SaHashSet;
use std::hash::Hash;

/// Removes nil checks of pointers that are already known to be non-nil.
///
/// A pointer is known to be non-nil inside the region dominated by an
/// earlier check of it, on the true edge of an `If(IsNonNil(p))`, or if
/// it's an address (or an offset from a non-nil pointer). Redundant
/// `IsNonNil` tests are folded to `true` along the way.
pub struct NilCheckElimPass;

impl FunctionTransformPass for NilCheckElimPass {
    fn name(&self) -> &'static str {
        "nilcheckelim"
    }

    fn run(&mut self, func: &mut Func) -> PreservedAnalyses {
        let removed = nilcheckelim(func);

        log::debug!("nilcheckelim: removed {removed} checks from `{}`", func.name());

        PreservedAnalyses::cfg()
    }
}

/// A set where everything inserted since the last [`Self::enter_scope`]
/// is forgotten by the matching [`Self::leave_scope`].
#[derive(Debug, Clone)]
struct ScopedSet<K> {
    inner: Vec<SaHashSet<K>>,
}

impl<K> ScopedSet<K>
where
    K: Hash + Eq,
{
    fn new() -> Self {
        Self { inner: Vec::default() }
    }

    fn enter_scope(&mut self) {
        self.inner.push(SaHashSet::default());
    }

    fn leave_scope(&mut self) {
        self.inner.pop();
    }

    fn insert(&mut self, key: K) {
        if let Some(scope) = self.inner.last_mut() {
            scope.insert(key);
        }
    }

    fn contains(&self, key: &K) -> bool {
        self.inner.iter().rev().any(|scope| scope.contains(key))
    }
}

enum Walk {
    Enter(Block),
    Leave,
}

/// Gets the pointer `b` is known to be non-nil on entry, from the branch
/// of its only predecessor.
fn non_nil_on_entry(f: &Func, b: Block) -> Option<Value> {
    let [pred] = f[b].preds() else {
        return None;
    };

    let p = pred.block;

    if f[p].kind() != BlockKind::If || pred.index != 0 || f[p].succ(0) == f[p].succ(1) {
        return None;
    }

    let c = f[p].control()?;

    (f[c].op() == Opcode::IsNonNil).then(|| f[c].arg(0))
}

/// Runs the elimination over `f`, returning how many nil checks were
/// removed.
pub fn nilcheckelim(f: &mut Func) -> usize {
    let sdom = f.sdom();
    let mut known = ScopedSet::new();
    let mut stack = vec![Walk::Enter(sdom.root())];
    let mut removed = 0;

    while let Some(item) = stack.pop() {
        let b = match item {
            Walk::Enter(b) => b,
            Walk::Leave => {
                known.leave_scope();
                continue;
            }
        };

        known.enter_scope();

        if let Some(ptr) = non_nil_on_entry(f, b) {
            known.insert(ptr);
        }

        // constants may get added to the entry block while it's walked
        let mut i = 0;

        while i < f[b].values().len() {
            let v = f[b].values()[i];
            i += 1;

            match f[v].op() {
                Opcode::Addr => known.insert(v),
                Opcode::OffPtr | Opcode::AddPtr | Opcode::PtrIndex => {
                    if known.contains(&f[v].arg(0)) {
                        known.insert(v);
                    }
                }
                Opcode::IsNonNil if known.contains(&f[v].arg(0)) => {
                    let t = f.const_bool(true);

                    f.copy_of(v, t);
                    f.warnl(f[v].pos(), format_args!("removed nil test"));
                }
                Opcode::NilCheck => {
                    let ptr = f[v].arg(0);

                    if known.contains(&ptr) {
                        log::trace!("nilcheckelim: {v} checks {ptr} again");

                        f.warnl(f[v].pos(), format_args!("removed nil check"));
                        f.reset_value(v, Opcode::Invalid);
                        removed += 1;
                    } else {
                        known.insert(ptr);
                    }
                }
                _ => {}
            }
        }

        stack.push(Walk::Leave);
        stack.extend(sdom.children(b).map(Walk::Enter));
    }

    if removed > 0 {
        f.compact_values();
    }

    removed
}
