//======---------------------------------------------------------------======//
//                                                                           //
// Copyright 2022-2023 Evan Cox <evanacox00@gmail.com>. All rights reserved. //
//                                                                           //
// Use of this source code is governed by a BSD-style license that can be    //
// found in the LICENSE.txt file at the root of this project, or at the      //
// following link: https://opensource.org/licenses/BSD-3-Clause              //
//                                                                           //
//======---------------------------------------------------------------======//

use crate::analysis::{Poset, PosetValue};
use crate::ir::{Block, BlockKind, Func, Opcode, Relation, Type, Value, REL_EQ, REL_GT, REL_LT};
use crate::pass::{FunctionTransformPass, PreservedAnalyses};

/// Removes branches whose outcome is implied by the branches that dominate
/// them.
///
/// The dominator tree is walked depth-first. Going down an edge out of an
/// `If` records the condition of that edge as facts in a pair of posets
/// (one for signed and one for unsigned comparisons), and coming back up
/// undoes them. A branch where assuming one outcome contradicts the facts
/// gets turned into a `First` block that always takes the other one.
pub struct ProvePass;

impl FunctionTransformPass for ProvePass {
    fn name(&self) -> &'static str {
        "prove"
    }

    fn run(&mut self, func: &mut Func) -> PreservedAnalyses {
        let proven = prove(func);

        log::debug!("prove: {proven} branches proven in `{}`", func.name());

        if proven > 0 {
            PreservedAnalyses::none()
        } else {
            PreservedAnalyses::cfg()
        }
    }
}

const REL_FULL: u8 = REL_LT | REL_EQ | REL_GT;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Domain {
    Signed,
    // pointers live here too, they only ever get (non-)equality facts
    Unsigned,
}

/// The facts known at one point of the dominator tree walk.
struct FactsTable {
    signed: Poset,
    unsigned: Poset,
    // the facts are contradictory, the current block can't be reached
    unsat: bool,
    unsat_stack: Vec<bool>,
    zero: Option<PosetValue>,
    nil: Option<PosetValue>,
}

impl FactsTable {
    fn new(zero: Option<Value>, nil: Option<Value>) -> Self {
        Self {
            signed: Poset::new(false),
            unsigned: Poset::new(true),
            unsat: false,
            unsat_stack: Vec::new(),
            zero: zero.map(|z| PosetValue::const64(z, 0)),
            nil: nil.map(|n| PosetValue::const64(n, 0)),
        }
    }

    fn operand(&self, f: &Func, v: Value) -> PosetValue {
        match f[v].op() {
            Opcode::ConstNil => PosetValue::const64(v, 0),
            _ => PosetValue::of(f, v),
        }
    }

    fn checkpoint(&mut self) {
        self.signed.checkpoint();
        self.unsigned.checkpoint();
        self.unsat_stack.push(self.unsat);
    }

    fn restore(&mut self) {
        self.signed.undo();
        self.unsigned.undo();
        self.unsat = self.unsat_stack.pop().unwrap_or(false);
    }

    fn non_negative(&mut self, x: PosetValue) -> bool {
        if self.signed.signed_bounds(x).0 >= 0 {
            return true;
        }

        match self.zero {
            Some(z) if z.id() == x.id() => true,
            Some(z) => self.signed.ordered_or_equal(z, x),
            None => false,
        }
    }

    /// Records that comparing `a` with `b` has one of the outcomes in `mask`.
    fn update(&mut self, domain: Domain, a: PosetValue, b: PosetValue, mask: u8) {
        if self.unsat {
            return;
        }

        if a.id() == b.id() {
            self.unsat = mask & REL_EQ == 0;

            return;
        }

        let po = match domain {
            Domain::Signed => &mut self.signed,
            Domain::Unsigned => &mut self.unsigned,
        };

        let ok = match mask {
            REL_LT => po.set_order(a, b),
            m if m == REL_LT | REL_EQ => po.set_order_or_equal(a, b),
            REL_GT => po.set_order(b, a),
            m if m == REL_GT | REL_EQ => po.set_order_or_equal(b, a),
            REL_EQ => po.set_equal(a, b),
            m if m == REL_LT | REL_GT => po.set_non_equal(a, b),
            0 => false,
            _ => true,
        };

        if !ok {
            log::trace!("prove: {:?} fact on {} and {} is unsat", domain, a.id(), b.id());

            self.unsat = true;

            return;
        }

        // orderings between non-negative values are the same either way
        let ordering = mask != REL_EQ && mask != REL_LT | REL_GT && mask != REL_FULL;

        if domain == Domain::Signed && ordering && self.non_negative(a) && self.non_negative(b) {
            self.update(Domain::Unsigned, a, b, mask);
        }
    }

    /// Records the facts implied by `cond` having been `positive`.
    fn add_condition(&mut self, f: &Func, cond: Value, positive: bool) {
        let data = &f[cond];

        match data.op() {
            Opcode::IsInBounds | Opcode::IsSliceInBounds => {
                let i = self.operand(f, data.arg(0));
                let len = self.operand(f, data.arg(1));
                let below = match data.op() {
                    Opcode::IsInBounds => REL_LT,
                    _ => REL_LT | REL_EQ,
                };

                // the failing side is either negative or too big, only the
                // unsigned view of that is a single fact
                if positive {
                    if let Some(z) = self.zero {
                        self.update(Domain::Signed, z, i, REL_LT | REL_EQ);
                    }

                    self.update(Domain::Signed, i, len, below);
                    self.update(Domain::Unsigned, i, len, below);
                } else {
                    self.update(Domain::Unsigned, i, len, REL_FULL ^ below);
                }
            }
            Opcode::IsNonNil => {
                let p = self.operand(f, data.arg(0));

                if let Some(nil) = self.nil {
                    let mask = if positive { REL_LT | REL_GT } else { REL_EQ };

                    self.update(Domain::Unsigned, p, nil, mask);
                }
            }
            op => {
                let cmp = match op.comparison() {
                    Some(cmp) => cmp,
                    None => return,
                };

                let a = self.operand(f, data.arg(0));
                let b = self.operand(f, data.arg(1));
                let mask = match positive {
                    true => cmp.rel.mask(),
                    false => REL_FULL ^ cmp.rel.mask(),
                };

                match cmp.rel {
                    Relation::Eq | Relation::Neq => {
                        if !matches!(op, Opcode::EqPtr | Opcode::NeqPtr) {
                            self.update(Domain::Signed, a, b, mask);
                        }

                        self.update(Domain::Unsigned, a, b, mask);
                    }
                    _ if cmp.unsigned => self.update(Domain::Unsigned, a, b, mask),
                    _ => self.update(Domain::Signed, a, b, mask),
                }
            }
        }
    }

    /// Records what is known about the values defined in `b`.
    fn add_block_values(&mut self, f: &Func, b: Block) {
        let zero = match self.zero {
            Some(z) => z,
            None => return,
        };

        for &v in f[b].values() {
            if matches!(
                f[v].op(),
                Opcode::SliceLen | Opcode::SliceCap | Opcode::StringLen
            ) {
                let len = self.operand(f, v);

                self.update(Domain::Signed, zero, len, REL_LT | REL_EQ);
            }
        }
    }
}

fn is_condition(f: &Func, v: Value) -> bool {
    let op = f[v].op();

    op.is_compare() || matches!(op, Opcode::IsInBounds | Opcode::IsSliceInBounds | Opcode::IsNonNil)
}

/// If the only way into `b` is one edge out of the `If` block that
/// immediately dominates it, gets that `If` and whether it's the true edge.
fn dominating_branch(f: &Func, idom: Option<Block>, b: Block) -> Option<(Block, bool)> {
    let parent = idom?;

    if f[parent].kind() != BlockKind::If || f[b].preds().len() != 1 {
        return None;
    }

    if f[b].pred(0) != parent || f[parent].succ(0) == f[parent].succ(1) {
        return None;
    }

    Some((parent, f[parent].succ(0) == b))
}

enum Walk {
    Descend(Block),
    Simplify(Block),
}

/// Runs prove over `func`, returning the number of branches that were
/// turned into `First` blocks.
pub fn prove(func: &mut Func) -> usize {
    let sdom = func.sdom();
    let needs_zero = func.all_values().any(|v| {
        matches!(
            func[v].op(),
            Opcode::IsInBounds
                | Opcode::IsSliceInBounds
                | Opcode::SliceLen
                | Opcode::SliceCap
                | Opcode::StringLen
        )
    });
    let needs_nil = func.all_values().any(|v| func[v].op() == Opcode::IsNonNil);

    let zero = needs_zero.then(|| func.const_int(Type::I64, 0));
    let nil = needs_nil.then(|| func.const_nil());
    let mut ft = FactsTable::new(zero, nil);
    let mut work = vec![Walk::Descend(func.entry())];
    let mut proven = 0;

    while let Some(node) = work.pop() {
        match node {
            Walk::Descend(b) => {
                ft.checkpoint();

                if let Some((parent, positive)) = dominating_branch(func, sdom.parent(b), b) {
                    if let Some(c) = func[parent].control().filter(|&c| is_condition(func, c)) {
                        ft.add_condition(func, c, positive);
                    }
                }

                ft.add_block_values(func, b);

                work.push(Walk::Simplify(b));
                work.extend(sdom.children(b).map(Walk::Descend));
            }
            Walk::Simplify(b) => {
                if simplify_block(func, &mut ft, b) {
                    proven += 1;
                }

                ft.restore();
            }
        }
    }

    proven
}

// tries both outcomes of an `If`, if one of them is impossible the block
// always takes the other
fn simplify_block(f: &mut Func, ft: &mut FactsTable, b: Block) -> bool {
    if f[b].kind() != BlockKind::If || ft.unsat {
        return false;
    }

    let c = match f[b].control() {
        Some(c) if is_condition(f, c) => c,
        _ => return false,
    };

    for (positive, live) in [(true, 1), (false, 0)] {
        ft.checkpoint();
        ft.add_condition(f, c, positive);

        let dead = ft.unsat;

        ft.restore();

        if !dead {
            continue;
        }

        f.warnl(
            f[b].pos(),
            format_args!("proved {} is {}", f.value_string(c), !positive),
        );

        f.reset_controls(b);
        f.set_kind(b, BlockKind::First);

        if live == 1 {
            f.swap_successors(b);
        }

        return true;
    }

    false
}
