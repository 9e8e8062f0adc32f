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
use crate::utility::SaHashMap;
use log::trace;
use smallbitvec::SmallBitVec;
use std::fmt;

/// The integer value of a constant, in both of the views a poset can use.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
struct PosetConst {
    signed: i64,
    unsigned: u64,
}

/// An operand of a [`Poset`] operation: an SSA value, plus its integer
/// value if it's a constant.
///
/// Two different values can be the same constant, the poset treats them as
/// equal without ever being told so.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct PosetValue {
    id: Value,
    konst: Option<PosetConst>,
}

impl PosetValue {
    /// A value that isn't a known constant.
    pub fn value(id: Value) -> Self {
        Self { id, konst: None }
    }

    /// A constant, given its signed and unsigned interpretation.
    pub fn constant(id: Value, signed: i64, unsigned: u64) -> Self {
        Self {
            id,
            konst: Some(PosetConst { signed, unsigned }),
        }
    }

    /// A 64-bit constant.
    pub fn const64(id: Value, c: i64) -> Self {
        Self::constant(id, c, c as u64)
    }

    /// Builds the operand for `v`, recognizing the integer constant opcodes.
    pub fn of(f: &Func, v: Value) -> Self {
        let c = f[v].aux_int();
        let unsigned = match f[v].op() {
            Opcode::Const8 => c as u8 as u64,
            Opcode::Const16 => c as u16 as u64,
            Opcode::Const32 => c as u32 as u64,
            Opcode::Const64 => c as u64,
            _ => return Self::value(v),
        };

        Self::constant(v, c, unsigned)
    }

    /// The SSA value this refers to.
    pub fn id(&self) -> Value {
        self.id
    }

    /// Whether this is an integer constant.
    pub fn is_const(&self) -> bool {
        self.konst.is_some()
    }
}

// packs the target node index (31 bits) and the strict flag (1 bit).
// the zero edge is the null edge
#[derive(Copy, Clone, Default, PartialEq, Eq)]
struct PosetEdge(u32);

impl PosetEdge {
    const NONE: PosetEdge = PosetEdge(0);

    fn new(target: u32, strict: bool) -> Self {
        Self(target << 1 | strict as u32)
    }

    fn target(self) -> u32 {
        self.0 >> 1
    }

    fn strict(self) -> bool {
        self.0 & 1 != 0
    }

    fn is_none(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Debug for PosetEdge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.target(), if self.strict() { "*" } else { "" })
    }
}

#[derive(Copy, Clone, Debug, Default)]
struct PosetNode {
    l: PosetEdge,
    r: PosetEdge,
    // inclusive bounds, compared with the poset's signedness
    min: i64,
    max: i64,
}

#[derive(Copy, Clone, Debug)]
enum Undo {
    Checkpoint,
    // restore the left child of `idx` to `edge`
    SetChl { idx: u32, edge: PosetEdge },
    // restore the right child of `idx` to `edge`
    SetChr { idx: u32, edge: PosetEdge },
    // forget that `hi` != `lo`
    NonEqual { hi: u32, lo: u32 },
    // remove node `idx`, and the value bound to it if there is one
    NewNode { id: Option<Value>, idx: u32 },
    // remove the constant at node `idx`, or give it back to `old`
    NewConstant { idx: u32, old: u32 },
    // point `id` back at `prev`, or forget it if `prev` is 0
    AliasNode { id: Value, prev: u32 },
    // remove `idx` from the root list
    NewRoot { idx: u32 },
    // put `old` back as a root in place of `idx`
    ChangeRoot { idx: u32, old: u32 },
    // split `idx` back into the two roots that are its children
    MergeRoot { idx: u32 },
}

fn bound_lt(a: i64, b: i64, signed: bool) -> bool {
    if signed {
        a < b
    } else {
        (a as u64) < (b as u64)
    }
}

fn bound_le(a: i64, b: i64, signed: bool) -> bool {
    if signed {
        a <= b
    } else {
        (a as u64) <= (b as u64)
    }
}

// saturating, returns false when the bound can't move
fn bound_inc(b: &mut i64, signed: bool) -> bool {
    if (signed && *b != i64::MAX) || (!signed && *b as u64 != u64::MAX) {
        *b = b.wrapping_add(1);
        true
    } else {
        false
    }
}

fn bound_dec(b: &mut i64, signed: bool) -> bool {
    if (signed && *b != i64::MIN) || (!signed && *b != 0) {
        *b = b.wrapping_sub(1);
        true
    } else {
        false
    }
}

fn bitset(n: usize) -> SmallBitVec {
    SmallBitVec::from_elem(n, false)
}

fn test(bs: &SmallBitVec, i: u32) -> bool {
    bs.get(i as usize).unwrap_or(false)
}

/// A partially ordered set of SSA values, used by `prove` to record and
/// query facts like `a < b`, `a <= b`, `a == b` and `a != b`.
///
/// The set is a forest of DAGs. A path from `A` to `B` means `A <= B`, or
/// `A < B` if any edge on it is strict. Equality is represented by mapping
/// several values to the same node, and non-equality is recorded separately
/// since it isn't transitive. Each node has at most two outgoing edges,
/// so dummy nodes are inserted to record more.
///
/// All integer constants live in the first DAG and are linked to each
/// other as they are added, so learning `x <= 3` is enough to answer
/// `x < 5`. Numeric `[min, max]` bounds are derived from those constants
/// and cached until the next mutation.
///
/// Every mutation is recorded in an undo log, [`Self::checkpoint`] and
/// [`Self::undo`] roll the set back to an earlier state. Contradictions
/// are reported by the `set_*` methods returning `false`, and leave the
/// set exactly as it was.
pub struct Poset {
    lastidx: u32,
    signed: bool,
    dirty: bool,
    values: SaHashMap<Value, u32>,
    constants: SaHashMap<i64, u32>,
    nodes: Vec<PosetNode>,
    roots: Vec<u32>,
    noneq: SaHashMap<u32, SmallBitVec>,
    undo_log: Vec<Undo>,
}

impl Poset {
    /// Creates an empty poset. `unsigned` decides how constants compare.
    pub fn new(unsigned: bool) -> Self {
        Self {
            lastidx: 0,
            signed: !unsigned,
            dirty: false,
            values: SaHashMap::default(),
            constants: SaHashMap::default(),
            nodes: vec![PosetNode::default()],
            roots: Vec::with_capacity(4),
            noneq: SaHashMap::default(),
            undo_log: Vec::with_capacity(4),
        }
    }

    /// Changes how constants compare. Only meaningful while the poset is empty.
    pub fn set_unsigned(&mut self, unsigned: bool) {
        self.signed = !unsigned;
    }

    /// Whether constants compare as unsigned.
    pub fn is_unsigned(&self) -> bool {
        !self.signed
    }

    fn push_undo(&mut self, u: Undo) {
        self.undo_log.push(u);
        self.dirty = true;
    }

    fn no_bounds(&self) -> (i64, i64) {
        if self.signed {
            (i64::MIN, i64::MAX)
        } else {
            (0, -1)
        }
    }

    fn const_bits(&self, c: PosetConst) -> i64 {
        if self.signed {
            c.signed
        } else {
            c.unsigned as i64
        }
    }

    fn children(&self, i: u32) -> (PosetEdge, PosetEdge) {
        let node = &self.nodes[i as usize];

        (node.l, node.r)
    }

    fn set_chl(&mut self, i: u32, e: PosetEdge) {
        self.nodes[i as usize].l = e;
    }

    fn set_chr(&mut self, i: u32, e: PosetEdge) {
        self.nodes[i as usize].r = e;
    }

    fn set_bounds(&mut self, i: u32, min: i64, max: i64) {
        let node = &mut self.nodes[i as usize];

        node.min = min;
        node.max = max;
    }

    fn add_child(&mut self, i1: u32, i2: u32, strict: bool) {
        let (i1l, i1r) = self.children(i1);
        let e2 = PosetEdge::new(i2, strict);

        if i1l.is_none() {
            self.set_chl(i1, e2);
            self.push_undo(Undo::SetChl {
                idx: i1,
                edge: PosetEdge::NONE,
            });
        } else if i1r.is_none() {
            self.set_chr(i1, e2);
            self.push_undo(Undo::SetChr {
                idx: i1,
                edge: PosetEdge::NONE,
            });
        } else {
            // i1 is full, push one of its edges down into a dummy:
            //
            //      i1
            //     /  \
            //   i1l  dummy
            //        /   \
            //      i1r    i2
            //
            // the side is picked from the indices to avoid degenerate chains
            let dummy = self.new_node(None);

            if (i1 ^ i2) & 1 != 0 {
                self.set_chl(dummy, i1r);
                self.set_chr(dummy, e2);
                self.set_chr(i1, PosetEdge::new(dummy, false));
                self.push_undo(Undo::SetChr { idx: i1, edge: i1r });
            } else {
                self.set_chl(dummy, i1l);
                self.set_chr(dummy, e2);
                self.set_chl(i1, PosetEdge::new(dummy, false));
                self.push_undo(Undo::SetChl { idx: i1, edge: i1l });
            }
        }
    }

    // allocates a node bound to `id`, or a dummy if `id` is `None`
    fn new_node(&mut self, id: Option<Value>) -> u32 {
        self.lastidx += 1;

        let i = self.lastidx;
        let (min, max) = self.no_bounds();

        self.nodes.push(PosetNode {
            l: PosetEdge::NONE,
            r: PosetEdge::NONE,
            min,
            max,
        });

        if let Some(v) = id {
            if self.values.insert(v, i).is_some() {
                panic!("new poset node for {v}, which is already inserted");
            }
        }

        self.push_undo(Undo::NewNode { id, idx: i });

        i
    }

    // finds the node of `n` and its bounds. bounds are always meaningful:
    // constants have exact bounds even if they aren't in the poset, and
    // unknown values get the full range.
    //
    // if `materialize` is set, looking up a constant adds it to the poset
    fn lookup(&mut self, n: PosetValue, materialize: bool) -> (u32, i64, i64, bool) {
        if let Some(&i) = self.values.get(&n.id) {
            self.recalc_bounds();

            let node = &self.nodes[i as usize];

            return (i, node.min, node.max, true);
        }

        match n.konst {
            Some(c) => {
                let mut i = 0;
                let mut found = false;

                if materialize {
                    self.new_const(n);

                    if let Some(&idx) = self.values.get(&n.id) {
                        i = idx;
                        found = true;
                    }
                }

                let val = self.const_bits(c);

                (i, val, val, found)
            }
            None => {
                let (min, max) = self.no_bounds();

                (0, min, max, false)
            }
        }
    }

    // creates the node for a constant, linked between the nearest lower and
    // higher constants already present
    fn new_const(&mut self, n: PosetValue) {
        let c = match n.konst {
            Some(c) => c,
            None => panic!("new_const on non-constant {}", n.id),
        };

        let val = self.const_bits(c);

        // same constant through a different value, just alias it
        if let Some(&idx) = self.constants.get(&val) {
            self.values.insert(n.id, idx);
            self.push_undo(Undo::AliasNode { id: n.id, prev: 0 });

            return;
        }

        let i = self.new_node(Some(n.id));

        self.set_bounds(i, val, val);

        // the first constant starts the constant DAG, which must be roots[0]
        if self.constants.is_empty() {
            let idx = self.roots.len();

            self.roots.push(i);
            self.roots.swap(0, idx);
            self.push_undo(Undo::NewRoot { idx: i });
            self.constants.insert(val, i);
            self.push_undo(Undo::NewConstant { idx: i, old: 0 });

            return;
        }

        let signed = self.signed;
        let mut lower: Option<(i64, u32)> = None;
        let mut higher: Option<(i64, u32)> = None;

        for (&val2, &ptr) in self.constants.iter() {
            assert_ne!(val, val2, "constant {val} is already in the poset");

            if bound_lt(val2, val, signed) && lower.map_or(true, |(l, _)| bound_lt(l, val2, signed))
            {
                lower = Some((val2, ptr));
            } else if bound_lt(val, val2, signed)
                && higher.map_or(true, |(h, _)| bound_lt(val2, h, signed))
            {
                higher = Some((val2, ptr));
            }
        }

        match (lower, higher) {
            (Some((_, lo)), Some((_, hi))) => {
                self.add_child(lo, i, true);
                self.add_child(i, hi, true);
            }
            (Some((_, lo)), None) => {
                self.add_child(lo, i, true);
            }
            (None, Some((_, hi))) => {
                // only a higher bound, a dummy root is needed to link it:
                //
                //        dummy
                //        /   \
                //      root   \
                //       /      n
                //     ....    /
                //       \    /
                //       higher
                let r2 = self.find_root(hi);

                assert_eq!(r2, self.roots[0], "constant not in root #0");

                let dummy = self.new_node(None);

                self.change_root(r2, dummy);
                self.push_undo(Undo::ChangeRoot {
                    idx: dummy,
                    old: r2,
                });
                self.add_child(dummy, r2, false);
                self.add_child(dummy, i, false);
                self.add_child(i, hi, true);
            }
            (None, None) => panic!("no constant found in a poset with constants"),
        }

        self.constants.insert(val, i);
        self.push_undo(Undo::NewConstant { idx: i, old: 0 });
    }

    // records that `n2` (not in the poset yet) is an alias of `n1`
    fn alias_new_node(&mut self, n1: PosetValue, n2: PosetValue) {
        let i1 = self.values.get(&n1.id).copied().unwrap_or(0);

        assert!(
            i1 != 0 && !self.values.contains_key(&n2.id),
            "alias_new_node with invalid arguments"
        );

        self.values.insert(n2.id, i1);
        self.push_undo(Undo::AliasNode { id: n2.id, prev: 0 });
    }

    // makes every node in `i2s` an alias of the node of `n1`, moving their
    // edges over to it
    fn alias_nodes(&mut self, n1: PosetValue, i2s: &SmallBitVec) {
        let i1 = match self.values.get(&n1.id) {
            Some(&i) => i,
            None => panic!("alias_nodes for non-existing node {}", n1.id),
        };

        assert!(!test(i2s, i1), "alias_nodes set contains the master node");

        let n = self.nodes.len() as u32;

        for idx in 0..n {
            // touching i1 itself would create self-loops
            if idx == i1 {
                continue;
            }

            let (l, r) = self.children(idx);

            if test(i2s, l.target()) {
                self.set_chl(idx, PosetEdge::new(i1, l.strict()));
                self.push_undo(Undo::SetChl { idx, edge: l });
            }

            if test(i2s, r.target()) {
                self.set_chr(idx, PosetEdge::new(i1, r.strict()));
                self.push_undo(Undo::SetChr { idx, edge: r });
            }

            if test(i2s, idx) {
                if !l.is_none() && !test(i2s, l.target()) {
                    self.add_child(i1, l.target(), l.strict());
                }

                if !r.is_none() && !test(i2s, r.target()) {
                    self.add_child(i1, r.target(), r.strict());
                }

                self.set_chl(idx, PosetEdge::NONE);
                self.set_chr(idx, PosetEdge::NONE);
                self.push_undo(Undo::SetChl { idx, edge: l });
                self.push_undo(Undo::SetChr { idx, edge: r });
            }
        }

        let moved: Vec<(Value, u32)> = self
            .values
            .iter()
            .filter(|(_, &i)| test(i2s, i))
            .map(|(&k, &i)| (k, i))
            .collect();

        for (k, prev) in moved {
            self.values.insert(k, i1);
            self.push_undo(Undo::AliasNode { id: k, prev });
        }

        let moved: Vec<(i64, u32)> = self
            .constants
            .iter()
            .filter(|(_, &i)| test(i2s, i))
            .map(|(&val, &i)| (val, i))
            .collect();

        for (val, old) in moved {
            self.constants.insert(val, i1);
            self.push_undo(Undo::NewConstant { idx: i1, old });
            self.set_bounds(i1, val, val);
        }
    }

    fn is_root(&self, r: u32) -> bool {
        self.roots.contains(&r)
    }

    fn change_root(&mut self, oldr: u32, newr: u32) {
        match self.roots.iter().position(|&r| r == oldr) {
            Some(i) => self.roots[i] = newr,
            None => panic!("change_root on non-root {oldr}"),
        }
    }

    fn remove_root(&mut self, r: u32) {
        match self.roots.iter().position(|&x| x == r) {
            Some(i) => {
                self.roots.remove(i);
            }
            None => panic!("remove_root on non-root {r}"),
        }
    }

    // depth-first walk of the DAG under `r`, root included. stops and
    // returns true as soon as `f` does.
    //
    // if `strict`, only nodes reached through at least one strict edge
    // are visited: for A<=B<=C<D<=E<F from A, that's D, E and F
    fn dfs<F: FnMut(u32) -> bool>(&self, r: u32, strict: bool, mut f: F) -> bool {
        let mut closed = bitset(self.lastidx as usize + 1);
        let mut open: Vec<u32> = Vec::with_capacity(64);

        open.push(r);

        if strict {
            // first pass walks the non-strict edges and collects the
            // targets of strict ones, those are where the real walk starts
            let mut next: Vec<u32> = Vec::with_capacity(64);

            while let Some(i) = open.pop() {
                if test(&closed, i) {
                    continue;
                }

                closed.set(i as usize, true);

                let (l, r) = self.children(i);

                for e in [l, r] {
                    if e.is_none() {
                        continue;
                    }

                    if e.strict() {
                        next.push(e.target());
                    } else {
                        open.push(e.target());
                    }
                }
            }

            open = next;
            closed = bitset(self.lastidx as usize + 1);
        }

        while let Some(i) = open.pop() {
            if test(&closed, i) {
                continue;
            }

            if f(i) {
                return true;
            }

            closed.set(i as usize, true);

            let (l, r) = self.children(i);

            if !l.is_none() {
                open.push(l.target());
            }

            if !r.is_none() {
                open.push(r.target());
            }
        }

        false
    }

    // whether there's a path from i1 to i2, a strict one if `strict`
    fn reaches(&self, i1: u32, i2: u32, strict: bool) -> bool {
        self.dfs(i1, strict, |n| n == i2)
    }

    fn find_root(&self, i: u32) -> u32 {
        for &r in self.roots.iter() {
            if self.reaches(r, i, false) {
                return r;
            }
        }

        panic!("find_root didn't find a root for node {i}");
    }

    // joins two DAGs under a new dummy root
    fn merge_root(&mut self, r1: u32, r2: u32) -> u32 {
        // r2 stops being a root, and roots[0] must stay the constant DAG
        let (r1, r2) = if r2 == self.roots[0] { (r2, r1) } else { (r1, r2) };
        let r = self.new_node(None);

        self.set_chl(r, PosetEdge::new(r1, false));
        self.set_chr(r, PosetEdge::new(r2, false));
        self.change_root(r1, r);
        self.remove_root(r2);
        self.push_undo(Undo::MergeRoot { idx: r });

        r
    }

    // marks n1 and n2 equal, along with every node on a path between them.
    // fails without changing anything if one of the paths is strict
    fn collapse_path(&mut self, n1: PosetValue, n2: PosetValue) -> bool {
        let i1 = self.values[&n1.id];
        let i2 = self.values[&n2.id];

        if self.reaches(i1, i2, true) {
            return false;
        }

        let mut paths = self.find_paths(i1, i2);

        paths.set(i1 as usize, false);
        self.alias_nodes(n1, &paths);

        true
    }

    // every node on at least one path from cur to dst
    fn find_paths(&self, cur: u32, dst: u32) -> SmallBitVec {
        let mut seen = bitset(self.lastidx as usize + 1);
        let mut path = bitset(self.lastidx as usize + 1);

        path.set(dst as usize, true);
        self.find_paths1(cur, dst, &mut seen, &mut path);

        path
    }

    fn find_paths1(&self, cur: u32, dst: u32, seen: &mut SmallBitVec, path: &mut SmallBitVec) {
        if cur == dst {
            return;
        }

        seen.set(cur as usize, true);

        let (l, r) = self.children(cur);
        let (l, r) = (l.target(), r.target());

        if !test(seen, l) {
            self.find_paths1(l, dst, seen, path);
        }

        if !test(seen, r) {
            self.find_paths1(r, dst, seen, path);
        }

        if test(path, l) || test(path, r) {
            path.set(cur as usize, true);
        }
    }

    fn is_non_eq(&self, i1: u32, i2: u32) -> bool {
        if i1 == i2 {
            return false;
        }

        let (hi, lo) = if i1 < i2 { (i2, i1) } else { (i1, i2) };

        self.noneq.get(&hi).map_or(false, |bs| test(bs, lo))
    }

    fn set_non_eq(&mut self, n1: PosetValue, n2: PosetValue) {
        let (mut i1, _, _, f1) = self.lookup(n1, true);
        let (mut i2, _, _, f2) = self.lookup(n2, true);

        // unknown nodes have no order relations yet, they become new roots
        if !f1 {
            i1 = self.new_node(Some(n1.id));
            self.roots.push(i1);
            self.push_undo(Undo::NewRoot { idx: i1 });
        }

        if !f2 {
            i2 = self.new_node(Some(n2.id));
            self.roots.push(i2);
            self.push_undo(Undo::NewRoot { idx: i2 });
        }

        assert_ne!(i1, i2, "set_non_eq on the same node");

        let (hi, lo) = if i1 < i2 { (i2, i1) } else { (i1, i2) };

        // keyed by the higher index, so the bitset never needs to grow
        let bs = self
            .noneq
            .entry(hi)
            .or_insert_with(|| bitset(hi as usize));

        if test(bs, lo) {
            return;
        }

        bs.set(lo as usize, true);
        self.push_undo(Undo::NonEqual { hi, lo });
    }

    /// Verifies the internal invariants of the poset, panicking if any of
    /// them are broken.
    pub fn check_integrity(&mut self) {
        let size = self.lastidx as usize + 1;
        let mut constants = bitset(size);

        for (&val, &c) in self.constants.iter() {
            constants.set(c as usize, true);

            let node = &self.nodes[c as usize];

            assert!(
                node.min == val && node.max == val,
                "invalid bounds on constant {val}"
            );
        }

        // every node is in exactly one DAG, constants in the first one
        let mut seen = bitset(size);

        for (ridx, &r) in self.roots.iter().enumerate() {
            assert_ne!(r, 0, "empty root");

            self.dfs(r, false, |i| {
                assert!(!test(&seen, i), "duplicate node {i}");

                seen.set(i as usize, true);

                assert!(
                    !test(&constants, i) || ridx == 0,
                    "constants not in the first DAG"
                );

                false
            });
        }

        for (id, &idx) in self.values.iter() {
            assert!(test(&seen, idx), "spurious value [{id}]={idx}");
        }

        for (i, node) in self.nodes.iter().enumerate() {
            if node.l.is_none() && node.r.is_none() {
                continue;
            }

            assert!(
                test(&seen, i as u32),
                "children of unknown node {i}->{:?}",
                node
            );
            assert!(
                node.l.target() != i as u32 && node.r.target() != i as u32,
                "self-loop on node {i}"
            );
        }

        self.recalc_bounds();

        for (i, node) in self.nodes.iter().enumerate().skip(1) {
            assert!(
                !bound_lt(node.max, node.min, self.signed),
                "inverted min/max bound on node {i} [{}, {}]",
                node.min,
                node.max
            );
        }
    }

    fn empty_violation(&self) -> Option<String> {
        if self.nodes.len() != 1 {
            return Some(format!("non-empty nodes list: {:?}", self.nodes));
        }

        if !self.values.is_empty() {
            return Some(format!("non-empty value map: {:?}", self.values));
        }

        if !self.roots.is_empty() {
            return Some(format!("non-empty root list: {:?}", self.roots));
        }

        if !self.constants.is_empty() {
            return Some(format!("non-empty constants: {:?}", self.constants));
        }

        if !self.undo_log.is_empty() {
            return Some(format!("non-empty undo list: {:?}", self.undo_log));
        }

        if self.lastidx != 0 {
            return Some(format!("lastidx is not zero: {}", self.lastidx));
        }

        if self.noneq.values().any(|bs| bs.iter().any(|b| b)) {
            return Some("non-empty noneq map".to_owned());
        }

        None
    }

    /// Whether the poset is completely empty, as it should be after every
    /// checkpoint has been undone.
    pub fn is_empty(&self) -> bool {
        self.empty_violation().is_none()
    }

    /// Panics if the poset isn't completely empty.
    pub fn check_empty(&self) {
        if let Some(why) = self.empty_violation() {
            panic!("poset is not empty: {why}");
        }
    }

    /// Whether `n1 < n2` is known. `false` means either that it's known to
    /// be false or that nothing is known.
    pub fn ordered(&mut self, n1: PosetValue, n2: PosetValue) -> bool {
        assert_ne!(n1.id, n2.id, "ordered called with n1 == n2");

        let (i1, _, max1, f1) = self.lookup(n1, false);
        let (i2, min2, _, f2) = self.lookup(n2, false);

        if bound_lt(max1, min2, self.signed) {
            return true;
        }

        f1 && f2 && i1 != i2 && self.reaches(i1, i2, true)
    }

    /// Whether `n1 <= n2` is known.
    pub fn ordered_or_equal(&mut self, n1: PosetValue, n2: PosetValue) -> bool {
        assert_ne!(n1.id, n2.id, "ordered_or_equal called with n1 == n2");

        let (i1, _, max1, f1) = self.lookup(n1, false);
        let (i2, min2, _, f2) = self.lookup(n2, false);

        if bound_le(max1, min2, self.signed) {
            return true;
        }

        f1 && f2 && (i1 == i2 || self.reaches(i1, i2, false))
    }

    /// Whether `n1 == n2` is known.
    pub fn equal(&mut self, n1: PosetValue, n2: PosetValue) -> bool {
        assert_ne!(n1.id, n2.id, "equal called with n1 == n2");

        let (i1, min1, max1, f1) = self.lookup(n1, false);
        let (i2, min2, max2, f2) = self.lookup(n2, false);

        if min1 == max1 && min2 == max2 && min1 == min2 {
            return true;
        }

        f1 && f2 && i1 == i2
    }

    /// Whether `n1 != n2` is known, either directly or because the two
    /// are strictly ordered.
    pub fn non_equal(&mut self, n1: PosetValue, n2: PosetValue) -> bool {
        assert_ne!(n1.id, n2.id, "non_equal called with n1 == n2");

        let (i1, min1, max1, f1) = self.lookup(n1, false);
        let (i2, min2, max2, f2) = self.lookup(n2, false);

        if bound_lt(max2, min1, self.signed) || bound_lt(max1, min2, self.signed) {
            return true;
        }

        if !f1 || !f2 {
            return false;
        }

        if self.is_non_eq(i1, i2) {
            return true;
        }

        self.ordered(n1, n2) || self.ordered(n2, n1)
    }

    // runs a mutation, rolling back whatever it did if it reports a
    // contradiction. constants may be materialized before the
    // contradiction is found
    fn transact<F: FnOnce(&mut Self) -> bool>(&mut self, f: F) -> bool {
        let mark = self.undo_log.len();

        if f(self) {
            return true;
        }

        self.dirty = true;

        while self.undo_log.len() > mark {
            if let Some(pass) = self.undo_log.pop() {
                self.revert(pass);
            }
        }

        false
    }

    fn set_order_impl(&mut self, n1: PosetValue, n2: PosetValue, mut strict: bool) -> bool {
        // n1 < n2 contradicts max2 <= min1, n1 <= n2 contradicts max2 < min1
        let (_, min1, _, _) = self.lookup(n1, false);
        let (_, _, max2, _) = self.lookup(n2, false);

        let contradiction = if strict {
            bound_le(max2, min1, self.signed)
        } else {
            bound_lt(max2, min1, self.signed)
        };

        if contradiction {
            return false;
        }

        // constants only get materialized once they're known to be needed
        let (i1, _, _, f1) = self.lookup(n1, true);
        let (i2, _, _, f2) = self.lookup(n2, true);

        match (f1, f2) {
            (false, false) => {
                // unrelated to anything, start a new DAG
                let i1 = self.new_node(Some(n1.id));
                let i2 = self.new_node(Some(n2.id));

                self.roots.push(i1);
                self.push_undo(Undo::NewRoot { idx: i1 });
                self.add_child(i1, i2, strict);
            }
            (true, false) => {
                let i2 = self.new_node(Some(n2.id));

                self.add_child(i1, i2, strict);
            }
            (false, true) => {
                let i1 = self.new_node(Some(n1.id));

                // n1 can just take n2's place as a root
                if self.is_root(i2) {
                    self.change_root(i2, i1);
                    self.push_undo(Undo::ChangeRoot { idx: i1, old: i2 });
                    self.add_child(i1, i2, strict);

                    return true;
                }

                // otherwise re-parent under a dummy:
                //
                //                  dummy
                //     r            /   \
                //      \   ===>   r    i1
                //      i2          \   /
                //                    i2
                let r = self.find_root(i2);
                let dummy = self.new_node(None);

                self.change_root(r, dummy);
                self.push_undo(Undo::ChangeRoot { idx: dummy, old: r });
                self.add_child(dummy, r, false);
                self.add_child(dummy, i1, false);
                self.add_child(i1, i2, strict);
            }
            (true, true) => {
                // aliased nodes can only be ordered non-strictly
                if i1 == i2 {
                    return !strict;
                }

                // n1 <= n2 with n1 != n2 is n1 < n2
                if !strict && self.is_non_eq(i1, i2) {
                    strict = true;
                }

                if self.reaches(i1, i2, false) {
                    //      DAG          New      Action
                    //      ---------------------------------------------------
                    // #1:  N1<=X<=N2 |  N1<=N2 | do nothing
                    // #2:  N1<=X<=N2 |  N1<N2  | add strict edge (N1<N2)
                    // #3:  N1<X<N2   |  N1<=N2 | do nothing (we already know more)
                    // #4:  N1<X<N2   |  N1<N2  | do nothing
                    if strict && !self.reaches(i1, i2, true) {
                        self.add_child(i1, i2, true);
                    }

                    return true;
                }

                if self.reaches(i2, i1, false) {
                    //      DAG           New      Action
                    //      ---------------------------------------------------
                    // #5:  N2<=X<=N1  |  N1<=N2 | collapse path (learn that N1=X=N2)
                    // #6:  N2<=X<=N1  |  N1<N2  | contradiction
                    // #7:  N2<X<N1    |  N1<=N2 | contradiction in the path
                    // #8:  N2<X<N1    |  N1<N2  | contradiction
                    if strict {
                        return false;
                    }

                    // collapse_path notices case #7 on its own
                    return self.collapse_path(n2, n1);
                }

                // no known relation, they may or may not share a DAG
                let r1 = self.find_root(i1);
                let r2 = self.find_root(i2);

                if r1 != r2 {
                    self.merge_root(r1, r2);
                }

                self.add_child(i1, i2, strict);
            }
        }

        true
    }

    /// Records `n1 < n2`. Returns `false` if that contradicts what's known.
    pub fn set_order(&mut self, n1: PosetValue, n2: PosetValue) -> bool {
        assert_ne!(n1.id, n2.id, "set_order called with n1 == n2");
        trace!("poset: {} < {}", n1.id, n2.id);

        self.transact(|po| po.set_order_impl(n1, n2, true))
    }

    /// Records `n1 <= n2`. Returns `false` if that contradicts what's known.
    pub fn set_order_or_equal(&mut self, n1: PosetValue, n2: PosetValue) -> bool {
        assert_ne!(n1.id, n2.id, "set_order_or_equal called with n1 == n2");
        trace!("poset: {} <= {}", n1.id, n2.id);

        self.transact(|po| po.set_order_impl(n1, n2, false))
    }

    /// Records `n1 == n2`. Returns `false` if that contradicts what's known.
    pub fn set_equal(&mut self, n1: PosetValue, n2: PosetValue) -> bool {
        assert_ne!(n1.id, n2.id, "set_equal called with n1 == n2");
        trace!("poset: {} == {}", n1.id, n2.id);

        self.transact(|po| po.set_equal_impl(n1, n2))
    }

    fn set_equal_impl(&mut self, n1: PosetValue, n2: PosetValue) -> bool {
        // disjoint ranges can't be equal
        let (_, min1, max1, _) = self.lookup(n1, false);
        let (_, min2, max2, _) = self.lookup(n2, false);

        if bound_lt(max2, min1, self.signed) || bound_lt(max1, min2, self.signed) {
            return false;
        }

        let (i1, _, _, f1) = self.lookup(n1, true);
        let (i2, _, _, f2) = self.lookup(n2, true);

        match (f1, f2) {
            (false, false) => {
                let i1 = self.new_node(Some(n1.id));

                self.roots.push(i1);
                self.push_undo(Undo::NewRoot { idx: i1 });
                self.alias_new_node(n1, n2);
            }
            (true, false) => self.alias_new_node(n1, n2),
            (false, true) => self.alias_new_node(n2, n1),
            (true, true) => {
                if i1 == i2 {
                    return true;
                }

                if self.is_non_eq(i1, i2) {
                    return false;
                }

                // n1 <= n2 plus n1 == n2 collapses everything in between
                if self.reaches(i1, i2, false) {
                    return self.collapse_path(n1, n2);
                }

                if self.reaches(i2, i1, false) {
                    return self.collapse_path(n2, n1);
                }

                let r1 = self.find_root(i1);
                let r2 = self.find_root(i2);

                if r1 != r2 {
                    self.merge_root(r1, r2);
                }

                let mut i2s = bitset(self.lastidx as usize + 1);

                i2s.set(i2 as usize, true);
                self.alias_nodes(n1, &i2s);
            }
        }

        true
    }

    /// Records `n1 != n2`. Returns `false` if that contradicts what's known.
    pub fn set_non_equal(&mut self, n1: PosetValue, n2: PosetValue) -> bool {
        assert_ne!(n1.id, n2.id, "set_non_equal called with n1 == n2");
        trace!("poset: {} != {}", n1.id, n2.id);

        self.transact(|po| po.set_non_equal_impl(n1, n2))
    }

    fn set_non_equal_impl(&mut self, n1: PosetValue, n2: PosetValue) -> bool {
        if self.equal(n1, n2) {
            return false;
        }

        let (i1, _, _, f1) = self.lookup(n1, true);
        let (i2, _, _, f2) = self.lookup(n2, true);

        if !f1 || !f2 {
            self.set_non_eq(n1, n2);

            return true;
        }

        if self.is_non_eq(i1, i2) {
            return true;
        }

        self.set_non_eq(n1, n2);

        // a known i1 <= i2 becomes i1 < i2, and the same the other way
        if self.reaches(i1, i2, false) && !self.reaches(i1, i2, true) {
            self.add_child(i1, i2, true);
        }

        if self.reaches(i2, i1, false) && !self.reaches(i2, i1, true) {
            self.add_child(i2, i1, true);
        }

        true
    }

    /// The known signed bounds of `n`, `(min, max)` such that `min <= n <= max`.
    ///
    /// Panics on an unsigned poset.
    pub fn signed_bounds(&mut self, n: PosetValue) -> (i64, i64) {
        assert!(self.signed, "signed_bounds called on an unsigned poset");

        let (_, min, max, _) = self.lookup(n, false);

        (min, max)
    }

    /// The known unsigned bounds of `n`, `(min, max)` such that `min <= n <= max`.
    ///
    /// Panics on a signed poset.
    pub fn unsigned_bounds(&mut self, n: PosetValue) -> (u64, u64) {
        assert!(!self.signed, "unsigned_bounds called on a signed poset");

        let (_, min, max, _) = self.lookup(n, false);

        (min as u64, max as u64)
    }

    fn recalc_bounds(&mut self) {
        if !self.dirty {
            return;
        }

        self.dirty = false;

        if self.lastidx == 0 {
            return;
        }

        let (nomin, nomax) = self.no_bounds();

        for i in 1..=self.lastidx {
            self.set_bounds(i, nomin, nomax);
        }

        let constants: Vec<(i64, u32)> = self.constants.iter().map(|(&v, &i)| (v, i)).collect();

        for &(val, i) in constants.iter() {
            self.set_bounds(i, val, val);
        }

        let mut seen = bitset(self.nodes.len());
        let mut ins = vec![0i16; self.nodes.len()];

        // non-constant DAGs can still get bounds, e.g. A<B<C in an
        // unsigned poset gives B >= 1 and C >= 2
        for ri in 0..self.roots.len() {
            let r = self.roots[ri];

            self.recalc_max(r, &mut seen);
            self.recalc_min(r, &mut ins);

            seen = bitset(self.nodes.len());
            ins.iter_mut().for_each(|x| *x = 0);
        }
    }

    // a node's maximum is the lowest maximum of its children, one less
    // through a strict edge
    fn recalc_max(&mut self, root: u32, seen: &mut SmallBitVec) {
        // node 0 stands in for null edges
        let (nomin, nomax) = self.no_bounds();

        self.set_bounds(0, nomin, nomax);
        seen.set(0, true);
        self.recalc_max1(root, seen);
    }

    fn recalc_max1(&mut self, i: u32, seen: &mut SmallBitVec) {
        let signed = self.signed;
        let (l, r) = self.children(i);

        if !test(seen, l.target()) {
            seen.set(l.target() as usize, true);
            self.recalc_max1(l.target(), seen);
        }

        if !test(seen, r.target()) {
            seen.set(r.target() as usize, true);
            self.recalc_max1(r.target(), seen);
        }

        // constants already have exact bounds
        if self.nodes[i as usize].min == self.nodes[i as usize].max {
            return;
        }

        let mut maxl = self.nodes[l.target() as usize].max;
        let mut maxr = self.nodes[r.target() as usize].max;

        if l.strict() && !bound_dec(&mut maxl, signed) {
            panic!("impossible maximum bound");
        }

        if r.strict() && !bound_dec(&mut maxr, signed) {
            panic!("impossible maximum bound");
        }

        let mut max = if bound_lt(maxr, maxl, signed) { maxr } else { maxl };

        // skip over constants this node is known to differ from
        while let Some(&maxidx) = self.constants.get(&max) {
            if !self.is_non_eq(i, maxidx) {
                break;
            }

            if !bound_dec(&mut max, signed) {
                panic!("impossible maximum bound");
            }
        }

        self.nodes[i as usize].max = max;
    }

    // a node's minimum is the highest minimum of its parents, one more
    // through a strict edge. parents have to be finished first, so this
    // walks in topological order by counting incoming edges
    fn recalc_min(&mut self, root: u32, ins: &mut [i16]) {
        for i in 1..=self.lastidx {
            let (l, r) = self.children(i);

            for t in [l.target(), r.target()] {
                ins[t as usize] = match ins[t as usize].checked_add(1) {
                    Some(n) => n,
                    None => panic!("recalc_min overflow"),
                };
            }
        }

        // the walk starts at the root, which counts as one incoming edge
        ins[root as usize] = match ins[root as usize].checked_add(1) {
            Some(n) => n,
            None => panic!("recalc_min overflow"),
        };

        let (nomin, _) = self.no_bounds();

        self.recalc_min1(root, false, nomin, ins);
    }

    fn recalc_min1(&mut self, i: u32, strict: bool, mut min: i64, ins: &mut [i16]) {
        let signed = self.signed;
        let iu = i as usize;

        assert!(ins[iu] > 0, "no incoming edges left for node {i}");

        if self.nodes[iu].min != self.nodes[iu].max {
            if strict && !bound_inc(&mut min, signed) {
                panic!("impossible minimum bound");
            }

            if bound_lt(self.nodes[iu].min, min, signed) {
                self.nodes[iu].min = min;
            }
        }

        ins[iu] -= 1;

        // not every path into this node has been seen yet
        if ins[iu] != 0 {
            return;
        }

        let mut min = self.nodes[iu].min;

        while let Some(&minidx) = self.constants.get(&min) {
            if !self.is_non_eq(i, minidx) {
                break;
            }

            if !bound_inc(&mut min, signed) {
                panic!("impossible minimum bound");
            }

            self.nodes[iu].min = min;
        }

        let (l, r) = self.children(i);

        if !l.is_none() {
            self.recalc_min1(l.target(), l.strict(), min, ins);
        }

        if !r.is_none() {
            self.recalc_min1(r.target(), r.strict(), min, ins);
        }
    }

    /// Saves the current state so that [`Self::undo`] can go back to it.
    pub fn checkpoint(&mut self) {
        self.undo_log.push(Undo::Checkpoint);
    }

    /// Rolls back every change made since the last [`Self::checkpoint`].
    ///
    /// Panics if there is nothing to undo.
    pub fn undo(&mut self) {
        assert!(!self.undo_log.is_empty(), "empty undo stack");

        self.dirty = true;

        while let Some(pass) = self.undo_log.pop() {
            if let Undo::Checkpoint = pass {
                return;
            }

            self.revert(pass);
        }
    }

    fn revert(&mut self, pass: Undo) {
        match pass {
            Undo::Checkpoint => {}
            Undo::SetChl { idx, edge } => self.set_chl(idx, edge),
            Undo::SetChr { idx, edge } => self.set_chr(idx, edge),
            Undo::NonEqual { hi, lo } => {
                if let Some(bs) = self.noneq.get_mut(&hi) {
                    bs.set(lo as usize, false);
                }
            }
            Undo::NewNode { id, idx } => {
                assert_eq!(idx, self.lastidx, "invalid new node index");

                if let Some(id) = id {
                    assert_eq!(
                        self.values.get(&id),
                        Some(&idx),
                        "invalid new node undo pass"
                    );

                    self.values.remove(&id);
                }

                self.nodes.truncate(idx as usize);
                self.lastidx -= 1;
            }
            Undo::NewConstant { idx, old } => {
                let node = self.nodes[idx as usize];

                assert_eq!(node.min, node.max, "constant with non-constant bounds");

                if old == 0 {
                    self.constants.remove(&node.min);
                } else {
                    self.constants.insert(node.min, old);
                    self.set_bounds(old, node.min, node.max);
                }
            }
            Undo::AliasNode { id, prev } => {
                if prev == 0 {
                    self.values.remove(&id);
                } else {
                    assert_ne!(
                        self.values.get(&id),
                        Some(&prev),
                        "invalid alias node undo pass"
                    );

                    self.values.insert(id, prev);
                }
            }
            Undo::NewRoot { idx } => {
                let (l, r) = self.children(idx);

                assert!(l.is_none() && r.is_none(), "non-empty root in undo new root");

                self.remove_root(idx);
            }
            Undo::ChangeRoot { idx, old } => {
                let (l, r) = self.children(idx);

                assert!(l.is_none() && r.is_none(), "non-empty root in undo change root");

                self.change_root(idx, old);
            }
            Undo::MergeRoot { idx } => {
                let (l, r) = self.children(idx);

                self.change_root(idx, l.target());
                self.roots.push(r.target());
            }
        }
    }
}

impl fmt::Debug for Poset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Poset")
            .field("signed", &self.signed)
            .field("roots", &self.roots)
            .field("nodes", &self.nodes)
            .field("values", &self.values)
            .field("constants", &self.constants)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arena::ArenaKey;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    #[derive(Copy, Clone, Debug, PartialEq, Eq)]
    enum Op {
        SetOrder,
        SetOrderFail,
        SetOrderOrEqual,
        SetOrderOrEqualFail,
        Ordered,
        OrderedFail,
        OrderedOrEqual,
        OrderedOrEqualFail,
        SetEqual,
        SetEqualFail,
        Equal,
        EqualFail,
        SetNonEqual,
        SetNonEqualFail,
        NonEqual,
        NonEqualFail,
        BoundedMin,
        BoundedMax,
        BoundedMinFail,
        BoundedMaxFail,
        Checkpoint,
        Undo,
    }

    use Op::*;

    // ids [1000, 1256) and [1256, 1512) are two distinct sets of constants
    // covering [-128, 128), so the same constant can appear as two values
    fn vconst(i: i64) -> i64 {
        assert!((-128..128).contains(&i), "invalid const");

        1000 + 128 + i
    }

    fn vconst2(i: i64) -> i64 {
        assert!((-128..128).contains(&i), "invalid const");

        1000 + 256 + i
    }

    fn val(i: i64) -> PosetValue {
        let id = Value::new(i as usize);

        match i {
            1000..=1255 => PosetValue::const64(id, i - 1000 - 128),
            1256..=1511 => PosetValue::const64(id, i - 1000 - 256),
            _ => PosetValue::value(id),
        }
    }

    fn run(unsigned: bool, ops: &[(Op, i64, i64)]) {
        let mut po = Poset::new(unsigned);

        for (idx, &(op, a, b)) in ops.iter().enumerate() {
            let undo_len = po.undo_log.len();
            let (va, vb) = (val(a), val(b));
            let what = format!("op{idx} {op:?}({a}, {b})");
            let mutation = matches!(
                op,
                SetOrder | SetOrderOrEqual | SetEqual | SetNonEqual | Checkpoint | Undo
            );

            match op {
                SetOrder => assert!(po.set_order(va, vb), "{what} failed"),
                SetOrderFail => assert!(!po.set_order(va, vb), "{what} passed"),
                SetOrderOrEqual => assert!(po.set_order_or_equal(va, vb), "{what} failed"),
                SetOrderOrEqualFail => assert!(!po.set_order_or_equal(va, vb), "{what} passed"),
                Ordered => assert!(po.ordered(va, vb), "{what} failed"),
                OrderedFail => assert!(!po.ordered(va, vb), "{what} passed"),
                OrderedOrEqual => assert!(po.ordered_or_equal(va, vb), "{what} failed"),
                OrderedOrEqualFail => assert!(!po.ordered_or_equal(va, vb), "{what} passed"),
                SetEqual => assert!(po.set_equal(va, vb), "{what} failed"),
                SetEqualFail => assert!(!po.set_equal(va, vb), "{what} passed"),
                Equal => assert!(po.equal(va, vb), "{what} failed"),
                EqualFail => assert!(!po.equal(va, vb), "{what} passed"),
                SetNonEqual => assert!(po.set_non_equal(va, vb), "{what} failed"),
                SetNonEqualFail => assert!(!po.set_non_equal(va, vb), "{what} passed"),
                NonEqual => assert!(po.non_equal(va, vb), "{what} failed"),
                NonEqualFail => assert!(!po.non_equal(va, vb), "{what} passed"),
                BoundedMin if unsigned => assert_eq!(po.unsigned_bounds(va).0, b as u64, "{what}"),
                BoundedMin => assert_eq!(po.signed_bounds(va).0, b, "{what}"),
                BoundedMax if unsigned => assert_eq!(po.unsigned_bounds(va).1, b as u64, "{what}"),
                BoundedMax => assert_eq!(po.signed_bounds(va).1, b, "{what}"),
                BoundedMinFail if unsigned => assert_eq!(po.unsigned_bounds(va).0, 0, "{what}"),
                BoundedMinFail => assert_eq!(po.signed_bounds(va).0, i64::MIN, "{what}"),
                BoundedMaxFail if unsigned => {
                    assert_eq!(po.unsigned_bounds(va).1, u64::MAX, "{what}")
                }
                BoundedMaxFail => assert_eq!(po.signed_bounds(va).1, i64::MAX, "{what}"),
                Checkpoint => po.checkpoint(),
                Undo => po.undo(),
            }

            let rejected = matches!(
                op,
                SetOrderFail | SetOrderOrEqualFail | SetEqualFail | SetNonEqualFail
            );

            if !mutation || rejected {
                assert_eq!(po.undo_log.len(), undo_len, "{what} changed the poset");
            }

            po.check_integrity();
        }

        po.check_empty();
    }

    #[test]
    fn basic_dags_and_undo() {
        run(
            false,
            &[
                (OrderedFail, 123, 124),
                // dag #0: 100<101
                (Checkpoint, 0, 0),
                (SetOrder, 100, 101),
                (Ordered, 100, 101),
                (OrderedFail, 101, 100),
                (SetOrderFail, 101, 100),
                (SetOrder, 100, 101),
                (NonEqual, 100, 101),
                (NonEqual, 101, 100),
                (SetEqualFail, 100, 101),
                // dag #1: 4<=7<12
                (Checkpoint, 0, 0),
                (SetOrderOrEqual, 4, 7),
                (OrderedOrEqual, 4, 7),
                (SetOrder, 7, 12),
                (Ordered, 7, 12),
                (Ordered, 4, 12),
                (OrderedFail, 12, 4),
                (NonEqual, 4, 12),
                (NonEqual, 12, 4),
                (NonEqualFail, 4, 100),
                (OrderedOrEqual, 4, 12),
                (OrderedOrEqualFail, 12, 4),
                (OrderedOrEqual, 4, 7),
                (OrderedOrEqualFail, 7, 4),
                // dag #1: 1<4<=7<12
                (Checkpoint, 0, 0),
                (SetOrder, 1, 4),
                (Ordered, 1, 4),
                (Ordered, 1, 12),
                (OrderedFail, 12, 1),
                // dag #1: 1<4<=7<12, 6<7
                (Checkpoint, 0, 0),
                (SetOrder, 6, 7),
                (Ordered, 6, 7),
                (Ordered, 6, 12),
                (SetOrderFail, 7, 4),
                (SetOrderFail, 7, 6),
                (SetOrderFail, 7, 1),
                // dag #1: 1<4<=7<12, 1<6<7
                (Checkpoint, 0, 0),
                (OrderedFail, 1, 6),
                (SetOrder, 1, 6),
                (Ordered, 1, 6),
                (SetOrderFail, 6, 1),
                // dag #1: 1<4<=7<12, 1<4<6<7
                (Checkpoint, 0, 0),
                (OrderedFail, 4, 6),
                (OrderedFail, 4, 7),
                (SetOrder, 4, 6),
                (Ordered, 4, 6),
                (OrderedOrEqual, 4, 6),
                (Ordered, 4, 7),
                (OrderedOrEqual, 4, 7),
                (SetOrderFail, 6, 4),
                (OrderedFail, 7, 6),
                (OrderedFail, 7, 4),
                (OrderedOrEqualFail, 7, 6),
                (OrderedOrEqualFail, 7, 4),
                // merge: 1<4<6, 4<=7<12, 6<101
                (Checkpoint, 0, 0),
                (OrderedFail, 6, 101),
                (SetOrder, 6, 101),
                (Ordered, 6, 101),
                (Ordered, 1, 101),
                // merge: 1<4<6, 4<=7<12, 6<100<101
                (Checkpoint, 0, 0),
                (OrderedFail, 6, 100),
                (SetOrder, 6, 100),
                (Ordered, 1, 100),
                // undo: 1<4<6<7<12, 6<101
                (Ordered, 100, 101),
                (Undo, 0, 0),
                (Ordered, 100, 101),
                (OrderedFail, 6, 100),
                (Ordered, 6, 101),
                (Ordered, 1, 101),
                // undo: 1<4<6<7<12, 100<101
                (Undo, 0, 0),
                (OrderedFail, 1, 100),
                (OrderedFail, 1, 101),
                (OrderedFail, 6, 100),
                (OrderedFail, 6, 101),
                // merge: 1<4<6<7<12, 6<100<101
                (Checkpoint, 0, 0),
                (Ordered, 100, 101),
                (SetOrder, 6, 100),
                (Ordered, 6, 100),
                (Ordered, 6, 101),
                (Ordered, 1, 101),
                // undo twice: 1<4<7<12, 1<6<7
                (Undo, 0, 0),
                (Undo, 0, 0),
                (Ordered, 1, 6),
                (Ordered, 4, 12),
                (OrderedFail, 4, 6),
                (SetOrderFail, 6, 1),
                // undo twice: 1<4<7<12
                (Undo, 0, 0),
                (Undo, 0, 0),
                (Ordered, 1, 12),
                (Ordered, 7, 12),
                (OrderedFail, 1, 6),
                (OrderedFail, 6, 7),
                (Ordered, 100, 101),
                (OrderedFail, 1, 101),
                // undo: 4<7<12
                (Undo, 0, 0),
                (OrderedFail, 1, 12),
                (OrderedFail, 1, 4),
                (Ordered, 4, 12),
                (Ordered, 100, 101),
                // undo: 100<101
                (Undo, 0, 0),
                (OrderedFail, 4, 7),
                (OrderedFail, 7, 12),
                (Ordered, 100, 101),
                // rebuild dag #1 reusing the same nodes:
                // 1<2<(5|6), 101<102<(105|106<107)
                (Checkpoint, 0, 0),
                (SetOrder, 101, 102),
                (SetOrder, 102, 105),
                (SetOrder, 102, 106),
                (SetOrder, 106, 107),
                (SetOrder, 1, 2),
                (SetOrder, 2, 5),
                (SetOrder, 2, 6),
                (SetEqualFail, 1, 6),
                (SetEqualFail, 107, 102),
                // 2 == 102: (1|101)<2==102<(5|6|105|106<107)
                (Checkpoint, 0, 0),
                (SetEqual, 2, 102),
                (Equal, 2, 102),
                (SetEqual, 2, 102),
                (SetNonEqualFail, 2, 102),
                (Ordered, 1, 107),
                (Ordered, 101, 6),
                (Ordered, 101, 105),
                (Ordered, 2, 106),
                (Ordered, 102, 6),
                // undo the equality
                (Undo, 0, 0),
                (EqualFail, 2, 102),
                (OrderedFail, 2, 102),
                (OrderedFail, 1, 107),
                (OrderedFail, 101, 6),
                (Checkpoint, 0, 0),
                (SetEqual, 2, 100),
                (Ordered, 1, 107),
                (Ordered, 100, 6),
                // equality with new nodes
                (Undo, 0, 0),
                (Checkpoint, 0, 0),
                (SetEqual, 2, 400),
                (SetEqual, 401, 2),
                (Equal, 400, 401),
                (Ordered, 1, 400),
                (Ordered, 400, 6),
                (Ordered, 1, 401),
                (Ordered, 401, 6),
                (OrderedFail, 2, 401),
                // equality between unseen nodes, then connected
                (Checkpoint, 0, 0),
                (SetEqual, 500, 501),
                (SetEqual, 102, 501),
                (Equal, 500, 102),
                (Ordered, 501, 106),
                (Ordered, 100, 500),
                (SetEqual, 500, 501),
                (OrderedFail, 500, 501),
                (OrderedFail, 102, 501),
                // non-equality
                (Undo, 0, 0),
                (Checkpoint, 0, 0),
                (SetNonEqual, 600, 601),
                (NonEqual, 600, 601),
                (SetNonEqual, 601, 602),
                (NonEqual, 601, 602),
                (NonEqualFail, 600, 602),
                (SetEqualFail, 601, 602),
                // back to empty
                (Undo, 0, 0),
                (Undo, 0, 0),
                (Undo, 0, 0),
                (Undo, 0, 0),
            ],
        );
    }

    #[test]
    fn strict_edges() {
        run(
            false,
            &[
                (Checkpoint, 0, 0),
                // 20!=30 and 10<20<=30<40, the 20<=30 becomes 20<30
                (SetNonEqual, 20, 30),
                (SetOrder, 10, 20),
                (SetOrderOrEqual, 20, 30),
                (SetOrder, 30, 40),
                (Ordered, 10, 30),
                (Ordered, 20, 30),
                (Ordered, 10, 40),
                (OrderedOrEqual, 10, 30),
                (OrderedOrEqual, 20, 30),
                (OrderedOrEqual, 10, 40),
                (Undo, 0, 0),
                // same, but the non-equality is learned last
                (Checkpoint, 0, 0),
                (SetOrder, 10, 20),
                (SetOrderOrEqual, 20, 30),
                (SetOrder, 30, 40),
                (Ordered, 10, 30),
                (OrderedFail, 20, 30),
                (Ordered, 10, 40),
                (OrderedOrEqual, 10, 30),
                (OrderedOrEqual, 20, 30),
                (OrderedOrEqual, 10, 40),
                (Checkpoint, 0, 0),
                (SetNonEqual, 20, 30),
                (Ordered, 10, 30),
                (Ordered, 20, 30),
                (Ordered, 10, 40),
                (OrderedOrEqual, 10, 30),
                (OrderedOrEqual, 20, 30),
                (OrderedOrEqual, 10, 40),
                (Undo, 0, 0),
                (Checkpoint, 0, 0),
                (SetOrderOrEqual, 30, 35),
                (OrderedOrEqual, 20, 35),
                (OrderedFail, 20, 35),
                (SetNonEqual, 20, 35),
                (Ordered, 20, 35),
                (Undo, 0, 0),
                // <= both ways is ==
                (Checkpoint, 0, 0),
                (SetOrderOrEqual, 50, 60),
                (SetOrderOrEqual, 60, 50),
                (OrderedOrEqual, 50, 60),
                (OrderedOrEqual, 60, 50),
                (OrderedFail, 50, 60),
                (OrderedFail, 60, 50),
                (Equal, 50, 60),
                (Equal, 60, 50),
                (NonEqualFail, 50, 60),
                (NonEqualFail, 60, 50),
                (Undo, 0, 0),
                (Undo, 0, 0),
            ],
        );
    }

    #[test]
    fn collapse_paths() {
        let mut ops = vec![
            (Checkpoint, 0, 0),
            // a web of <= between 10 and 25
            (SetOrderOrEqual, 10, 15),
            (SetOrderOrEqual, 15, 20),
            (SetOrderOrEqual, 20, vconst(20)),
            (SetOrderOrEqual, vconst(20), 25),
            (SetOrderOrEqual, 10, 12),
            (SetOrderOrEqual, 12, 16),
            (SetOrderOrEqual, 16, vconst(20)),
            (SetOrderOrEqual, 10, 17),
            (SetOrderOrEqual, 17, 25),
            (SetOrderOrEqual, 15, 18),
            (SetOrderOrEqual, 18, vconst(20)),
            (SetOrderOrEqual, 15, 19),
            (SetOrderOrEqual, 19, 25),
            // paths that aren't part of the collapse
            (SetOrderOrEqual, 10, 11),
            (SetOrderOrEqual, 11, 26),
            (SetOrderOrEqual, 13, 25),
            (SetOrderOrEqual, 100, 25),
            (SetOrderOrEqual, 101, 15),
            (SetOrderOrEqual, 102, 10),
            (SetOrderOrEqual, 25, 103),
            (SetOrderOrEqual, 20, 104),
            (Checkpoint, 0, 0),
            // 25 <= 10 makes everything on the way equal
            (SetOrderOrEqual, 25, 10),
        ];

        let equal = [10, 12, 15, 16, 17, 18, 19, vconst(20), vconst2(20), 25];

        for (i, &a) in equal.iter().enumerate() {
            for &b in equal[i + 1..].iter() {
                ops.push((Equal, a, b));
            }
        }

        ops.extend_from_slice(&[
            // but not the nodes on other paths
            (EqualFail, 10, 11),
            (EqualFail, 10, 26),
            (EqualFail, 10, 100),
            (EqualFail, 10, 101),
            (EqualFail, 10, 102),
            (OrderedOrEqual, 10, 26),
            (OrderedOrEqual, 25, 26),
            (OrderedOrEqual, 13, 25),
            (OrderedOrEqual, 13, 10),
            (Undo, 0, 0),
            (OrderedOrEqual, 10, 25),
            (EqualFail, 10, 12),
            (EqualFail, 10, 15),
            (EqualFail, 10, 25),
            (Undo, 0, 0),
        ]);

        run(false, &ops);

        // the strict 10<16 blocks the collapse
        run(
            false,
            &[
                (Checkpoint, 0, 0),
                (SetOrderOrEqual, 10, 15),
                (SetOrderOrEqual, 15, 20),
                (SetOrderOrEqual, 20, 25),
                (SetOrder, 10, 16),
                (SetOrderOrEqual, 16, 20),
                (SetOrderOrEqualFail, 20, 10),
                (Undo, 0, 0),
            ],
        );
    }

    #[test]
    fn set_equal() {
        run(
            false,
            &[
                // 10<=20<=30<40, 20<=100<110
                (Checkpoint, 0, 0),
                (SetOrderOrEqual, 10, 20),
                (SetOrderOrEqual, 20, 30),
                (SetOrder, 30, 40),
                (SetOrderOrEqual, 20, 100),
                (SetOrder, 100, 110),
                (OrderedOrEqual, 10, 30),
                (OrderedOrEqualFail, 30, 10),
                (OrderedFail, 10, 30),
                (OrderedFail, 30, 10),
                (Ordered, 10, 40),
                (OrderedFail, 40, 10),
                // 10 == 20
                (Checkpoint, 0, 0),
                (SetEqual, 10, 20),
                (OrderedOrEqual, 10, 20),
                (OrderedFail, 10, 20),
                (Equal, 10, 20),
                (SetOrderOrEqual, 10, 20),
                (SetOrderOrEqual, 20, 10),
                (SetOrderFail, 10, 20),
                (SetOrderFail, 20, 10),
                (Undo, 0, 0),
                // 20 == 10
                (Checkpoint, 0, 0),
                (SetEqual, 20, 10),
                (OrderedOrEqual, 10, 20),
                (OrderedFail, 10, 20),
                (Equal, 10, 20),
                (Undo, 0, 0),
                // 10 == 40, 30 == 40 and 10 == 110 all contradict
                (Checkpoint, 0, 0),
                (SetEqualFail, 10, 40),
                (SetEqualFail, 40, 10),
                (SetEqualFail, 30, 40),
                (SetEqualFail, 40, 30),
                (SetEqualFail, 10, 110),
                (SetEqualFail, 110, 10),
                (Undo, 0, 0),
                // 40 == 110, then 10 == 40 or 10 == 110
                (Checkpoint, 0, 0),
                (SetEqual, 40, 110),
                (SetEqualFail, 10, 40),
                (SetEqualFail, 40, 10),
                (SetEqualFail, 10, 110),
                (SetEqualFail, 110, 10),
                (Undo, 0, 0),
                // 40 < 20, 30 < 20 and 110 < 10 all contradict
                (Checkpoint, 0, 0),
                (SetOrderFail, 40, 20),
                (SetOrderFail, 30, 20),
                (SetOrderFail, 110, 10),
                (Undo, 0, 0),
                // 30 <= 20
                (Checkpoint, 0, 0),
                (SetOrderOrEqual, 30, 20),
                (Equal, 30, 20),
                (OrderedOrEqual, 30, 100),
                (Ordered, 30, 110),
                (Undo, 0, 0),
                (Undo, 0, 0),
            ],
        );
    }

    #[test]
    fn constants() {
        run(
            false,
            &[
                (Checkpoint, 0, 0),
                (SetOrder, 1, vconst(15)),
                (SetOrderOrEqual, 100, vconst(120)),
                (Ordered, 1, vconst(15)),
                (Ordered, 1, vconst(120)),
                (OrderedOrEqual, 1, vconst(120)),
                (OrderedOrEqual, 100, vconst(120)),
                (OrderedFail, 100, vconst(15)),
                (OrderedFail, vconst(15), 100),
                (Checkpoint, 0, 0),
                (SetOrderOrEqual, 1, 5),
                (SetOrderOrEqual, 5, 25),
                (SetEqual, 20, vconst(20)),
                (SetEqual, 25, vconst(25)),
                (Ordered, 1, 20),
                (Ordered, 1, vconst(30)),
                (Undo, 0, 0),
                (Checkpoint, 0, 0),
                (SetOrderOrEqual, 1, 5),
                (SetOrderOrEqual, 5, 25),
                (SetEqual, 5, vconst(-20)),
                (SetEqual, vconst(-25), 1),
                (Ordered, 1, 5),
                (Ordered, vconst(-30), 1),
                (BoundedMin, 1, -25),
                (BoundedMax, 1, -25),
                (BoundedMin, 5, -20),
                (BoundedMax, 5, -20),
                (Undo, 0, 0),
                (Checkpoint, 0, 0),
                (SetNonEqual, 1, vconst(4)),
                (SetNonEqual, 1, vconst(6)),
                (NonEqual, 1, vconst(4)),
                (NonEqualFail, 1, vconst(5)),
                (NonEqual, 1, vconst(6)),
                (EqualFail, 1, vconst(4)),
                (EqualFail, 1, vconst(5)),
                (EqualFail, 1, vconst(6)),
                (EqualFail, 1, vconst(7)),
                (Undo, 0, 0),
                (Undo, 0, 0),
            ],
        );

        run(
            true,
            &[
                (Checkpoint, 0, 0),
                (SetOrder, 1, vconst(15)),
                // -5 is a very big number when unsigned
                (SetOrderOrEqual, 100, vconst(-5)),
                (Ordered, 1, vconst(15)),
                (Ordered, 1, vconst(-5)),
                (OrderedOrEqual, 1, vconst(-5)),
                (OrderedOrEqual, 100, vconst(-5)),
                (OrderedFail, 100, vconst(15)),
                (OrderedFail, vconst(15), 100),
                (Undo, 0, 0),
            ],
        );

        run(
            false,
            &[
                (Checkpoint, 0, 0),
                (SetOrderOrEqual, 1, vconst(3)),
                (SetNonEqual, 1, vconst(0)),
                (OrderedFail, 1, vconst(0)),
                (Undo, 0, 0),
            ],
        );

        run(
            false,
            &[
                // a constant against another instance of itself
                (Checkpoint, 0, 0),
                (SetOrderOrEqual, vconst(3), vconst2(3)),
                (Undo, 0, 0),
                (Checkpoint, 0, 0),
                (SetEqual, vconst(3), vconst2(3)),
                (Undo, 0, 0),
                (Checkpoint, 0, 0),
                (SetNonEqualFail, vconst(3), vconst2(3)),
                (Undo, 0, 0),
                (Checkpoint, 0, 0),
                (SetOrderFail, vconst(3), vconst2(3)),
                (Undo, 0, 0),
                // two constants, through different instances
                (Checkpoint, 0, 0),
                (SetOrderOrEqual, vconst(3), vconst(4)),
                (OrderedOrEqual, vconst(3), vconst2(4)),
                (Undo, 0, 0),
                (Checkpoint, 0, 0),
                (SetOrder, vconst(3), vconst(4)),
                (Ordered, vconst(3), vconst2(4)),
                (Undo, 0, 0),
                (Checkpoint, 0, 0),
                (SetEqualFail, vconst(3), vconst(4)),
                (SetEqualFail, vconst(3), vconst2(4)),
                (Undo, 0, 0),
                (Checkpoint, 0, 0),
                (NonEqual, vconst(3), vconst(4)),
                (NonEqual, vconst(3), vconst2(4)),
                (Undo, 0, 0),
                (Checkpoint, 0, 0),
                (EqualFail, vconst(3), vconst(4)),
                (EqualFail, vconst(3), vconst2(4)),
                (Undo, 0, 0),
                (Checkpoint, 0, 0),
                (SetNonEqual, vconst(3), vconst(4)),
                (SetNonEqual, vconst(3), vconst2(4)),
                (Undo, 0, 0),
            ],
        );
    }

    #[test]
    fn non_equal() {
        run(
            false,
            &[
                (EqualFail, 10, 20),
                (NonEqualFail, 10, 20),
                // 10 != 20
                (Checkpoint, 0, 0),
                (SetNonEqual, 10, 20),
                (EqualFail, 10, 20),
                (NonEqual, 10, 20),
                (SetEqualFail, 10, 20),
                // again
                (Checkpoint, 0, 0),
                (SetNonEqual, 10, 20),
                (EqualFail, 10, 20),
                (NonEqual, 10, 20),
                // the first one still holds
                (Undo, 0, 0),
                (EqualFail, 10, 20),
                (NonEqual, 10, 20),
                (SetEqualFail, 10, 20),
                (Undo, 0, 0),
                (EqualFail, 10, 20),
                (NonEqualFail, 10, 20),
                // 10 == 20
                (Checkpoint, 0, 0),
                (SetEqual, 10, 20),
                (Equal, 10, 20),
                (NonEqualFail, 10, 20),
                (SetNonEqualFail, 10, 20),
                (Checkpoint, 0, 0),
                (SetEqual, 10, 20),
                (Equal, 10, 20),
                (NonEqualFail, 10, 20),
                (SetNonEqualFail, 10, 20),
                (Undo, 0, 0),
                (Equal, 10, 20),
                (NonEqualFail, 10, 20),
                (SetNonEqualFail, 10, 20),
                (Undo, 0, 0),
                (EqualFail, 10, 20),
                (NonEqualFail, 10, 20),
            ],
        );
    }

    #[test]
    fn bounds() {
        run(
            false,
            &[
                (Checkpoint, 0, 0),
                (SetOrderOrEqual, vconst(5), 10),
                (SetOrder, 10, 11),
                (SetOrderOrEqual, 11, 12),
                (SetOrder, 12, 13),
                (SetOrder, 13, 14),
                (SetOrderOrEqual, 14, vconst(100)),
                (BoundedMin, 10, 5),
                (BoundedMin, 11, 6),
                (BoundedMin, 12, 6),
                (BoundedMin, 13, 7),
                (BoundedMin, 14, 8),
                (BoundedMax, 14, 100),
                (BoundedMax, 13, 99),
                (BoundedMax, 12, 98),
                (BoundedMax, 11, 98),
                (BoundedMax, 10, 97),
                (SetOrderOrEqual, vconst(5), 20),
                (BoundedMin, 20, 5),
                (BoundedMaxFail, 20, 0),
                (SetOrderOrEqual, 30, vconst(100)),
                (BoundedMinFail, 30, 0),
                (BoundedMax, 30, 100),
                (Checkpoint, 0, 0),
                (SetOrder, 11, 12),
                (Ordered, 11, 12),
                (BoundedMin, 14, 9),
                (SetOrder, vconst(11), 13),
                (BoundedMin, 14, 13),
                (Undo, 0, 0),
                (OrderedOrEqual, 11, 12),
                (BoundedMin, 14, 8),
                (Undo, 0, 0),
            ],
        );

        run(
            false,
            &[
                (Checkpoint, 0, 0),
                (SetOrderOrEqual, vconst(5), 50),
                (SetOrderOrEqual, vconst(10), 50),
                (SetOrderOrEqual, vconst(20), 50),
                (SetOrderOrEqual, vconst(21), 51),
                (SetOrderOrEqual, vconst(11), 51),
                (SetOrderOrEqual, vconst(6), 51),
                (Checkpoint, 0, 0),
                (SetOrderOrEqual, 50, 51),
                (SetOrderOrEqual, 51, 52),
                (SetOrder, 50, 52),
                (BoundedMin, 50, 20),
                (BoundedMin, 51, 21),
                (BoundedMin, 52, 21),
                (Undo, 0, 0),
                (Checkpoint, 0, 0),
                (SetOrderOrEqual, 51, 50),
                (SetOrderOrEqual, 50, 52),
                (SetOrder, 51, 52),
                (BoundedMin, 50, 21),
                (BoundedMin, 51, 21),
                (BoundedMin, 52, 22),
                (Checkpoint, 0, 0),
                (SetNonEqual, 50, vconst2(21)),
                (SetNonEqual, 51, vconst2(21)),
                (SetNonEqual, 52, vconst2(22)),
                (BoundedMin, 50, 22),
                (BoundedMin, 51, 22),
                (BoundedMin, 52, 23),
                (SetNonEqual, 50, vconst(22)),
                (SetNonEqual, 51, vconst(22)),
                (SetNonEqual, 52, vconst(23)),
                (BoundedMin, 50, 23),
                (BoundedMin, 51, 23),
                (BoundedMin, 52, 24),
                (Undo, 0, 0),
                (BoundedMin, 50, 21),
                (BoundedMin, 51, 21),
                (BoundedMin, 52, 22),
                (Undo, 0, 0),
                (Undo, 0, 0),
            ],
        );

        run(
            false,
            &[
                (Checkpoint, 0, 0),
                (SetOrderOrEqual, 50, vconst(10)),
                (SetOrder, 49, 50),
                (BoundedMax, 50, 10),
                (BoundedMax, 49, 9),
                (SetNonEqual, 50, vconst(10)),
                (BoundedMax, 50, 9),
                (BoundedMax, 49, 8),
                (SetNonEqual, 49, vconst(8)),
                (BoundedMax, 50, 9),
                (BoundedMax, 49, 7),
                (Undo, 0, 0),
            ],
        );
    }

    #[test]
    fn learn_from_bounds() {
        run(
            true,
            &[
                (Checkpoint, 0, 0),
                (BoundedMin, 50, 0),
                (BoundedMin, 51, 0),
                // 0 < v50 means min(v50) == 1
                (SetOrder, vconst(0), 50),
                (BoundedMin, 50, 1),
                (BoundedMin, 51, 0),
                // and v50 != 0
                (NonEqual, vconst(0), 50),
                (BoundedMin, 50, 1),
                (BoundedMin, 51, 0),
                // 0 < v50 < v51 means min(v51) == 2
                (SetOrder, 50, 51),
                (BoundedMin, 50, 1),
                (BoundedMin, 51, 2),
                (Ordered, vconst2(0), 50),
                (OrderedOrEqual, vconst2(1), 50),
                (Ordered, vconst2(1), 51),
                (OrderedOrEqual, vconst2(2), 51),
                (SetOrderFail, 50, vconst2(0)),
                (SetOrderFail, 51, vconst2(0)),
                (SetOrderFail, 51, vconst2(1)),
                (SetOrderOrEqualFail, 50, vconst2(0)),
                (SetOrderOrEqualFail, 51, vconst2(0)),
                (SetOrderOrEqualFail, 51, vconst2(1)),
                // v50 <= 1 means v50 == 1
                (Checkpoint, 0, 0),
                (SetOrderOrEqual, 50, vconst2(1)),
                (SetOrderOrEqual, 51, vconst2(2)),
                (Equal, 50, vconst(1)),
                (Equal, 51, vconst(2)),
                (Undo, 0, 0),
                // v50 < 2 means v50 == 1
                (Checkpoint, 0, 0),
                (SetOrder, 50, vconst2(2)),
                (SetOrder, 51, vconst2(3)),
                (Equal, 50, vconst(1)),
                (Equal, 51, vconst(2)),
                (Undo, 0, 0),
                (Undo, 0, 0),
                // same facts learned in another order
                (Checkpoint, 0, 0),
                (BoundedMin, 50, 0),
                (BoundedMin, 51, 0),
                (SetOrder, 50, 51),
                (BoundedMin, 50, 0),
                (BoundedMin, 51, 1),
                (SetNonEqual, vconst(0), 50),
                (BoundedMin, 50, 1),
                (BoundedMin, 51, 2),
                (Ordered, vconst2(0), 50),
                (OrderedOrEqual, vconst2(1), 50),
                (SetOrderFail, 50, vconst2(0)),
                (Ordered, vconst2(1), 51),
                (OrderedOrEqual, vconst2(2), 51),
                (SetOrderFail, 51, vconst2(1)),
                (Undo, 0, 0),
            ],
        );

        run(
            true,
            &[
                (Checkpoint, 0, 0),
                // v10 < v11 < v12 < v13
                (SetOrder, 10, 11),
                (SetOrder, 11, 12),
                (SetOrder, 12, 13),
                // v10 == 0 puts v13 at 3 or more
                (Checkpoint, 0, 0),
                (SetEqual, 10, vconst(0)),
                (SetEqualFail, 13, vconst(2)),
                (BoundedMin, 13, 3),
                (Undo, 0, 0),
                // v13 < 4 pins every value
                (Checkpoint, 0, 0),
                (SetOrder, 13, vconst(4)),
                (SetNonEqualFail, 13, vconst(3)),
                (SetNonEqualFail, 12, vconst(2)),
                (SetNonEqualFail, 11, vconst(1)),
                (SetNonEqualFail, 10, vconst(0)),
                (Undo, 0, 0),
                (Checkpoint, 0, 0),
                (SetNonEqual, 10, vconst(0)),
                (SetOrderFail, 13, vconst(4)),
                (Undo, 0, 0),
                (Checkpoint, 0, 0),
                (SetNonEqual, 11, vconst(1)),
                (SetOrderFail, 13, vconst(4)),
                (Undo, 0, 0),
                (Checkpoint, 0, 0),
                (SetNonEqual, 12, vconst(2)),
                (SetOrderFail, 13, vconst(4)),
                (Undo, 0, 0),
                (Checkpoint, 0, 0),
                (SetNonEqual, 13, vconst(3)),
                (SetOrderFail, 13, vconst(4)),
                (Undo, 0, 0),
                (Undo, 0, 0),
            ],
        );

        run(
            true,
            &[
                (Checkpoint, 0, 0),
                (SetOrder, vconst(10), 20),
                (SetOrderOrEqual, vconst(10), 10),
                (NonEqual, 20, vconst2(10)),
                (NonEqual, 20, vconst2(5)),
                (NonEqual, 20, vconst2(0)),
                (NonEqualFail, 10, vconst2(10)),
                (NonEqual, 10, vconst2(5)),
                (NonEqual, 10, vconst2(0)),
                (Undo, 0, 0),
                (Checkpoint, 0, 0),
                (SetOrder, vconst(19), 20),
                (SetOrder, 20, vconst(21)),
                (SetOrder, vconst2(19), 30),
                (SetOrder, 30, vconst2(21)),
                (Equal, 20, 30),
                (SetOrder, vconst(10), 40),
                (EqualFail, 20, 40),
                (NonEqualFail, 20, 40),
                (SetOrder, 40, vconst(12)),
                (EqualFail, 20, 40),
                (NonEqual, 20, 40),
                (Undo, 0, 0),
            ],
        );

        run(
            true,
            &[
                (Checkpoint, 0, 0),
                (SetOrder, 1, 2),
                (SetOrder, 2, 3),
                (SetOrder, 3, 4),
                (SetEqualFail, 4, vconst(1)),
                (SetEqualFail, vconst(1), 4),
                (SetEqual, 4, vconst2(4)),
                (EqualFail, 3, vconst(3)),
                (EqualFail, 2, vconst(2)),
                (EqualFail, 1, vconst(1)),
                (SetNonEqual, 1, vconst(0)),
                (Equal, 3, vconst(3)),
                (Equal, 2, vconst(2)),
                (Equal, 1, vconst(1)),
                (Undo, 0, 0),
            ],
        );

        run(
            false,
            &[
                (Checkpoint, 0, 0),
                (SetOrder, vconst(0), vconst(8)),
                (SetOrder, vconst(7), vconst(8)),
                (SetOrderOrEqual, vconst(0), 16),
                (SetOrder, 16, vconst(8)),
                (SetNonEqual, 16, vconst(7)),
                (SetOrderFail, vconst2(7), 16),
                (SetOrderFail, vconst2(6), 16),
                (Undo, 0, 0),
            ],
        );
    }

    #[test]
    #[should_panic(expected = "signed_bounds called on an unsigned poset")]
    fn signed_bounds_on_unsigned_poset_panics() {
        let mut po = Poset::new(true);

        po.signed_bounds(val(1));
    }

    #[test]
    #[should_panic(expected = "empty undo stack")]
    fn undo_without_checkpoint_panics() {
        Poset::new(false).undo();
    }

    #[test]
    fn transactions_leave_only_their_own_entries() {
        let mut po = Poset::new(false);
        let checkpoints = |po: &Poset| {
            po.undo_log
                .iter()
                .filter(|u| matches!(u, super::Undo::Checkpoint))
                .count()
        };

        po.checkpoint();
        assert!(po.set_order(val(1), val(2)));
        assert!(po.set_order(val(2), val(3)));
        assert_eq!(checkpoints(&po), 1);

        // a rejected fact is rolled back in place
        let len = po.undo_log.len();

        assert!(!po.set_order(val(3), val(1)));
        assert_eq!(po.undo_log.len(), len);
        assert_eq!(checkpoints(&po), 1);
        assert!(po.ordered(val(1), val(3)));
        po.check_integrity();

        po.undo();
        assert!(!po.ordered(val(1), val(3)));
        po.check_empty();
    }

    //
    // randomized check against a brute-force model: every answer the poset
    // gives must hold in every assignment that satisfies the facts it has
    // accepted, and every contradiction it reports must have no such
    // assignment
    //

    const VARS: usize = 4;
    const DOMAIN: std::ops::RangeInclusive<i64> = -3..=3;
    const CONSTS: [i64; 3] = [-1, 0, 2];

    #[derive(Copy, Clone, Debug)]
    enum Fact {
        Lt(usize, usize),
        Le(usize, usize),
        Eq(usize, usize),
        Ne(usize, usize),
    }

    // operands 0..VARS are variables, the rest are the constants
    fn operand(i: usize) -> PosetValue {
        let id = Value::new(i);

        if i < VARS {
            PosetValue::value(id)
        } else {
            PosetValue::const64(id, CONSTS[i - VARS])
        }
    }

    fn assignments() -> Vec<[i64; VARS]> {
        let mut out = vec![[0; VARS]];

        for var in 0..VARS {
            out = out
                .into_iter()
                .flat_map(|a| {
                    DOMAIN.map(move |x| {
                        let mut a = a;

                        a[var] = x;
                        a
                    })
                })
                .collect();
        }

        out
    }

    fn eval(a: &[i64; VARS], i: usize) -> i64 {
        if i < VARS {
            a[i]
        } else {
            CONSTS[i - VARS]
        }
    }

    fn holds(a: &[i64; VARS], fact: Fact) -> bool {
        match fact {
            Fact::Lt(x, y) => eval(a, x) < eval(a, y),
            Fact::Le(x, y) => eval(a, x) <= eval(a, y),
            Fact::Eq(x, y) => eval(a, x) == eval(a, y),
            Fact::Ne(x, y) => eval(a, x) != eval(a, y),
        }
    }

    fn models<'a>(
        all: &'a [[i64; VARS]],
        facts: &'a [Option<Fact>],
    ) -> impl Iterator<Item = &'a [i64; VARS]> + 'a {
        all.iter()
            .filter(move |a| facts.iter().flatten().all(|&f| holds(a, f)))
    }

    #[test]
    fn random_ops_agree_with_brute_force() {
        let all = assignments();
        let mut rng = StdRng::seed_from_u64(0x5eed);

        for _ in 0..40 {
            let mut po = Poset::new(false);
            let mut facts: Vec<Option<Fact>> = Vec::new();
            let mut marks: Vec<usize> = Vec::new();

            for _ in 0..60 {
                let x = rng.gen_range(0..VARS + CONSTS.len());
                let mut y = rng.gen_range(0..VARS + CONSTS.len());

                while y == x {
                    y = rng.gen_range(0..VARS + CONSTS.len());
                }

                let (vx, vy) = (operand(x), operand(y));

                match rng.gen_range(0..12) {
                    0..=3 => {
                        let fact = match rng.gen_range(0..4) {
                            0 => Fact::Lt(x, y),
                            1 => Fact::Le(x, y),
                            2 => Fact::Eq(x, y),
                            _ => Fact::Ne(x, y),
                        };

                        let ok = match fact {
                            Fact::Lt(..) => po.set_order(vx, vy),
                            Fact::Le(..) => po.set_order_or_equal(vx, vy),
                            Fact::Eq(..) => po.set_equal(vx, vy),
                            Fact::Ne(..) => po.set_non_equal(vx, vy),
                        };

                        if ok {
                            facts.push(Some(fact));
                        } else {
                            // a contradiction is only sound if nothing satisfies both
                            let mut with = facts.clone();

                            with.push(Some(fact));

                            assert!(
                                models(&all, &with).next().is_none(),
                                "{fact:?} rejected but satisfiable"
                            );
                        }
                    }
                    4 => {
                        po.checkpoint();
                        marks.push(facts.len());
                    }
                    5 => {
                        if let Some(len) = marks.pop() {
                            po.undo();
                            facts.truncate(len);
                        }
                    }
                    6 => {
                        if po.ordered(vx, vy) {
                            assert!(models(&all, &facts).all(|a| eval(a, x) < eval(a, y)));
                        }
                    }
                    7 => {
                        if po.ordered_or_equal(vx, vy) {
                            assert!(models(&all, &facts).all(|a| eval(a, x) <= eval(a, y)));
                        }
                    }
                    8 => {
                        if po.equal(vx, vy) {
                            assert!(models(&all, &facts).all(|a| eval(a, x) == eval(a, y)));
                        }
                    }
                    9 => {
                        if po.non_equal(vx, vy) {
                            assert!(models(&all, &facts).all(|a| eval(a, x) != eval(a, y)));
                        }
                    }
                    _ => {
                        let (lo, hi) = po.signed_bounds(vx);

                        assert!(models(&all, &facts).all(|a| {
                            let v = eval(a, x);

                            lo <= v && v <= hi
                        }));
                    }
                }

                po.check_integrity();
            }

            while marks.pop().is_some() {
                po.undo();
            }
        }
    }
}
