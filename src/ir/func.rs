//======---------------------------------------------------------------======//
//                                                                           //
// Copyright 2022-2023 Evan Cox <evanacox00@gmail.com>. All rights reserved. //
//                                                                           //
// Use of this source code is governed by a BSD-style license that can be    //
// found in the LICENSE.txt file at the root of this project, or at the      //
// following link: https://opensource.org/licenses/BSD-3-Clause              //
//                                                                           //
//======---------------------------------------------------------------======//

use crate::analysis::{compute_idoms, compute_postorder, LoopNest, SparseTree};
use crate::arena::{ArenaMap, SecondaryMap};
use crate::ir::*;
use crate::pass::{
    DominatorTreeAnalysis, LoopNestAnalysis, PostorderAnalysis, PreservedAnalyses,
    SparseTreeAnalysis,
};
use crate::utility::{PackedOption, SaHashMap, SparseMap, SparseSet};
use smallvec::SmallVec;
use std::any::TypeId;
use std::fmt;
use std::mem;
use std::ops::Index;
use std::rc::Rc;
use std::sync::Arc;

/// The pass that is currently running over a function, and how much it
/// should say about what it's doing.
#[derive(Copy, Clone, Debug, Default)]
struct PassInfo {
    name: &'static str,
    debug: u32,
}

/// Derived structures that are computed on demand and kept until a pass
/// reports that it didn't preserve them.
#[derive(Default)]
struct CachedAnalyses {
    postorder: Option<Rc<Vec<Block>>>,
    idom: Option<Rc<SecondaryMap<Block, Block>>>,
    sdom: Option<Rc<SparseTree>>,
    loopnest: Option<Rc<LoopNest>>,
}

/// A single function in SSA form.
///
/// This owns every value and block in the function. Values and blocks are
/// referred to by [`Value`] and [`Block`] keys, and their data can be read
/// by indexing the function (`f[v].op()`, `f[b].succs()`). All mutation goes
/// through methods on `Func`, which keep the following in sync:
///
/// - the use count of every value, where both argument slots and block
///   control slots count as uses
/// - the back indices of every CFG edge
/// - the arguments of every phi, which stay in the same order as `preds`
///
/// Cached analyses (postorder, dominators, the loop nest) are *not*
/// recomputed when the CFG changes. Passes report what they preserved and
/// the pass driver throws away the rest, or [`Self::invalidate_cfg`] can be
/// called directly.
pub struct Func {
    name: String,
    symbol: Symbol,
    config: Arc<Config>,
    values: ArenaMap<Value, ValueData>,
    blocks: ArenaMap<Block, BlockData>,
    entry: PackedOption<Block>,
    layout: Vec<Block>,
    symbols: ArenaMap<Symbol, String>,
    symbol_ids: SaHashMap<String, Symbol>,
    constants: SaHashMap<(Opcode, Type, i64), Value>,
    cache: Cache,
    pass: PassInfo,
    analyses: CachedAnalyses,
}

impl Func {
    /// Creates an empty function with a fresh [`Cache`].
    pub fn new(name: &str, config: Arc<Config>) -> Self {
        Self::with_cache(name, config, Cache::new())
    }

    /// Creates an empty function that reuses the storage held by `cache`.
    pub fn with_cache(name: &str, config: Arc<Config>, mut cache: Cache) -> Self {
        let values = ArenaMap::from_storage(mem::take(&mut cache.values));
        let blocks = ArenaMap::from_storage(mem::take(&mut cache.blocks));
        let mut symbols = ArenaMap::new();
        let mut symbol_ids = SaHashMap::default();
        let symbol = symbols.insert(name.to_owned());

        symbol_ids.insert(name.to_owned(), symbol);

        Self {
            name: name.to_owned(),
            symbol,
            config,
            values,
            blocks,
            entry: PackedOption::none(),
            layout: Vec::new(),
            symbols,
            symbol_ids,
            constants: SaHashMap::default(),
            cache,
            pass: PassInfo::default(),
            analyses: CachedAnalyses::default(),
        }
    }

    /// Destroys the function and gives its storage back to a [`Cache`]. No
    /// key from this function is meaningful afterwards.
    pub fn into_cache(self) -> Cache {
        let mut cache = self.cache;

        cache.values = self.values.into_storage();
        cache.blocks = self.blocks.into_storage();
        cache.reset();

        cache
    }

    /// The name of the function.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The symbol of the function itself, what a self-recursive call refers to.
    pub fn symbol(&self) -> Symbol {
        self.symbol
    }

    /// The target configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Interns a symbol name.
    pub fn intern(&mut self, name: &str) -> Symbol {
        if let Some(sym) = self.symbol_ids.get(name) {
            return *sym;
        }

        let sym = self.symbols.insert(name.to_owned());

        self.symbol_ids.insert(name.to_owned(), sym);

        sym
    }

    /// Gets the name of an interned symbol.
    pub fn symbol_name(&self, sym: Symbol) -> &str {
        &self.symbols[sym]
    }

    /// The entry block. The first block ever created is the entry unless
    /// [`Self::set_entry`] says otherwise.
    ///
    /// Panics if no blocks have been created yet.
    pub fn entry(&self) -> Block {
        match self.entry.expand() {
            Some(b) => b,
            None => panic!("function `{}` has no entry block", self.name),
        }
    }

    /// Changes the entry block.
    pub fn set_entry(&mut self, b: Block) {
        self.entry = PackedOption::some(b);
    }

    /// The live blocks in their current order. After the layout pass this
    /// is the final emission order.
    pub fn layout(&self) -> &[Block] {
        &self.layout
    }

    /// Replaces the block order. `order` must be a permutation of the
    /// current layout.
    pub fn set_layout(&mut self, order: Vec<Block>) {
        debug_assert_eq!(order.len(), self.layout.len());

        self.layout = order;
    }

    /// One past the highest value ID ever handed out.
    pub fn num_values(&self) -> usize {
        self.values.len()
    }

    /// One past the highest block ID ever handed out.
    pub fn num_blocks(&self) -> usize {
        self.blocks.len()
    }

    //
    // blocks
    //

    /// Creates a new block at the end of the layout.
    pub fn new_block(&mut self, kind: BlockKind) -> Block {
        let b = self.blocks.insert(BlockData::new(kind));

        self.layout.push(b);

        if self.entry.is_none() {
            self.entry = PackedOption::some(b);
        }

        b
    }

    /// Changes the kind of a block. Controls and edges are left alone.
    pub fn set_kind(&mut self, b: Block, kind: BlockKind) {
        self.blocks[b].kind = kind;
    }

    /// Sets the static branch prediction of a block.
    pub fn set_likely(&mut self, b: Block, likely: BranchPrediction) {
        self.blocks[b].likely = likely;
    }

    /// Sets the source position of a block.
    pub fn set_block_pos(&mut self, b: Block, pos: Pos) {
        self.blocks[b].pos = pos;
    }

    /// Replaces every control of `b` with `v`.
    pub fn set_control(&mut self, b: Block, v: Value) {
        self.reset_controls(b);
        self.add_control(b, v);
    }

    /// Adds a control to `b`.
    pub fn add_control(&mut self, b: Block, v: Value) {
        self.blocks[b].controls.push(v);
        self.values[v].uses += 1;
    }

    /// Replaces the `i`th control of `b` with `v`.
    pub fn replace_control(&mut self, b: Block, i: usize, v: Value) {
        let old = mem::replace(&mut self.blocks[b].controls[i], v);

        self.values[old].uses -= 1;
        self.values[v].uses += 1;
    }

    /// Removes every control of `b`.
    pub fn reset_controls(&mut self, b: Block) {
        let controls = mem::take(&mut self.blocks[b].controls);

        for v in controls {
            self.values[v].uses -= 1;
        }
    }

    /// Adds an edge `b -> c`. The new edge is the last successor of `b` and
    /// the last predecessor of `c`, so any phis in `c` need a new argument.
    pub fn add_edge_to(&mut self, b: Block, c: Block) {
        let i = self.blocks[b].succs.len();
        let j = self.blocks[c].preds.len();

        self.blocks[b].succs.push(Edge { block: c, index: j });
        self.blocks[c].preds.push(Edge { block: b, index: i });
    }

    /// Removes the `i`th predecessor edge of `b`, without touching the other
    /// end of the edge. The last predecessor moves into slot `i` and the
    /// back index that refers to it is fixed up.
    ///
    /// Phi arguments are *not* updated, see [`Self::remove_phi_arg`].
    pub fn remove_pred(&mut self, b: Block, i: usize) {
        let n = self.blocks[b].preds.len() - 1;

        if i != n {
            let e = self.blocks[b].preds[n];

            self.blocks[b].preds[i] = e;
            self.blocks[e.block].succs[e.index].index = i;
        }

        self.blocks[b].preds.truncate(n);
        self.analyses.postorder = None;
    }

    /// Removes the `i`th successor edge of `b`, without touching the other
    /// end of the edge. Mirrors [`Self::remove_pred`].
    pub fn remove_succ(&mut self, b: Block, i: usize) {
        let n = self.blocks[b].succs.len() - 1;

        if i != n {
            let e = self.blocks[b].succs[n];

            self.blocks[b].succs[i] = e;
            self.blocks[e.block].preds[e.index].index = i;
        }

        self.blocks[b].succs.truncate(n);
        self.analyses.postorder = None;
    }

    /// Removes the edge `b.succs[i]` entirely: both ends of it, and the
    /// matching argument of every phi in the target.
    pub fn remove_edge(&mut self, b: Block, i: usize) {
        let Edge { block: c, index: j } = self.blocks[b].succs[i];

        self.remove_succ(b, i);
        self.remove_pred(c, j);

        for phi in self.phis(c) {
            self.remove_phi_arg(phi, j);
        }
    }

    /// Removes argument `i` of a phi whose block has already had predecessor
    /// `i` removed with [`Self::remove_pred`]. The last argument moves into
    /// slot `i` to mirror what happened to the predecessors. If that leaves
    /// the phi with a single distinct argument it becomes a copy.
    pub fn remove_phi_arg(&mut self, phi: Value, i: usize) {
        let block = self.values[phi].block;
        let n = self.blocks[block].preds.len();

        assert_eq!(
            self.values[phi].args.len() - 1,
            n,
            "phi {phi} has the wrong number of arguments for {block}"
        );

        let old = self.values[phi].args.swap_remove(i);

        self.values[old].uses -= 1;
        self.phielim_value(phi);
    }

    /// Swaps the two successors of `b` and flips its branch prediction.
    pub fn swap_successors(&mut self, b: Block) {
        let data = &mut self.blocks[b];

        assert_eq!(data.succs.len(), 2, "{b} does not have two successors");

        data.succs.swap(0, 1);
        data.likely = data.likely.flipped();

        let e0 = data.succs[0];
        let e1 = data.succs[1];

        self.blocks[e0.block].preds[e0.index].index = 0;
        self.blocks[e1.block].preds[e1.index].index = 1;
    }

    /// Points the existing outgoing edge `b.succs[i]` at `to`, adding a new
    /// last predecessor to `to`. The old target must already have had its
    /// end of the edge removed.
    pub fn redirect_succ(&mut self, b: Block, i: usize, to: Block) {
        let j = self.blocks[to].preds.len();

        self.blocks[b].succs[i] = Edge { block: to, index: j };
        self.blocks[to].preds.push(Edge { block: b, index: i });
        self.analyses.postorder = None;
    }

    /// Moves every outgoing edge of `from` over to `to`, which must not have
    /// any successors yet. The targets keep their predecessor order, so
    /// their phis are unaffected.
    pub fn move_succs(&mut self, from: Block, to: Block) {
        assert!(self.blocks[to].succs.is_empty(), "{to} already has successors");

        let succs = mem::take(&mut self.blocks[from].succs);

        for (i, e) in succs.iter().enumerate() {
            self.blocks[e.block].preds[e.index] = Edge { block: to, index: i };
        }

        self.blocks[to].succs = succs;
        self.analyses.postorder = None;
    }

    /// Removes a block from the function: its outgoing edges are removed
    /// (fixing phis in the successors), every value in it is invalidated,
    /// and it's taken out of the layout.
    ///
    /// Any remaining predecessors must be removed by the caller.
    pub fn remove_block(&mut self, b: Block) {
        while !self.blocks[b].succs.is_empty() {
            let last = self.blocks[b].succs.len() - 1;

            self.remove_edge(b, last);
        }

        self.reset_controls(b);

        let values = mem::take(&mut self.blocks[b].values);

        // args first, so that values in a cycle drop each other's uses
        for &v in values.iter() {
            self.reset_args(v);
        }

        for &v in values.iter() {
            self.values[v].op = Opcode::Invalid;
            self.values[v].aux = Aux::None;
        }

        self.blocks[b].kind = BlockKind::Invalid;
        self.layout.retain(|&x| x != b);
        self.invalidate_cfg();
    }

    /// Gets every phi in a block.
    pub fn phis(&self, b: Block) -> SmallVec<[Value; 4]> {
        self.blocks[b]
            .values
            .iter()
            .copied()
            .filter(|&v| self.values[v].op == Opcode::Phi)
            .collect()
    }

    //
    // values
    //

    /// Creates a new value at the end of block `b`.
    pub fn new_value(
        &mut self,
        b: Block,
        op: Opcode,
        ty: Type,
        aux: Aux,
        args: &[Value],
    ) -> Value {
        debug_assert!(
            op.arity().map_or(true, |n| n == args.len()),
            "{op} expects {:?} arguments, got {}",
            op.arity(),
            args.len()
        );

        for &arg in args {
            self.values[arg].uses += 1;
        }

        let v = self.values.insert(ValueData {
            op,
            ty,
            aux,
            args: args.into(),
            block: b,
            uses: 0,
            pos: Pos::default(),
        });

        self.blocks[b].values.push(v);

        v
    }

    /// Gets a constant, creating it in the entry block if no live copy of it
    /// exists yet.
    pub fn constant(&mut self, op: Opcode, ty: Type, aux: i64) -> Value {
        let key = (op, ty, aux);

        if let Some(&v) = self.constants.get(&key) {
            let data = &self.values[v];

            if data.op == op && data.ty == ty && data.aux == Aux::Int(aux) {
                return v;
            }
        }

        let entry = self.entry();
        let v = self.new_value(entry, op, ty, Aux::Int(aux), &[]);

        self.constants.insert(key, v);

        v
    }

    /// Gets an integer constant of type `ty`. `c` is truncated to the width
    /// of `ty` and sign-extended back, the canonical form of constants.
    pub fn const_int(&mut self, ty: Type, c: i64) -> Value {
        let bits = ty.bits().unwrap_or(64);
        let op = Opcode::const_for_width(bits).unwrap_or(Opcode::Const64);
        let shift = 64 - bits;

        self.constant(op, ty, (c << shift) >> shift)
    }

    /// Gets a `bool` constant.
    pub fn const_bool(&mut self, b: bool) -> Value {
        self.constant(Opcode::ConstBool, Type::Bool, b as i64)
    }

    /// Gets the nil pointer.
    pub fn const_nil(&mut self) -> Value {
        let key = (Opcode::ConstNil, Type::Ptr, 0);

        if let Some(&v) = self.constants.get(&key) {
            if self.values[v].op == Opcode::ConstNil {
                return v;
            }
        }

        let entry = self.entry();
        let v = self.new_value(entry, Opcode::ConstNil, Type::Ptr, Aux::None, &[]);

        self.constants.insert(key, v);

        v
    }

    /// Sets the source position of a value.
    pub fn set_pos(&mut self, v: Value, pos: Pos) {
        self.values[v].pos = pos;
    }

    /// Changes the type of a value.
    pub fn set_type(&mut self, v: Value, ty: Type) {
        self.values[v].ty = ty;
    }

    /// Changes the aux data of a value.
    pub fn set_aux(&mut self, v: Value, aux: Aux) {
        self.values[v].aux = aux;
    }

    /// Changes only the opcode of a value, keeping its arguments.
    pub fn set_op(&mut self, v: Value, op: Opcode) {
        self.values[v].op = op;
    }

    /// Turns `v` into a fresh `op` with no arguments and no aux. The type
    /// is kept. Resetting to [`Opcode::Invalid`] is how values are deleted.
    pub fn reset_value(&mut self, v: Value, op: Opcode) {
        self.reset_args(v);

        let data = &mut self.values[v];

        data.op = op;
        data.aux = Aux::None;
    }

    /// Turns `v` into `Copy w`.
    pub fn copy_of(&mut self, v: Value, w: Value) {
        if v == w {
            return;
        }

        let data = &self.values[v];

        if data.op == Opcode::Copy && data.args.first() == Some(&w) {
            return;
        }

        self.reset_value(v, Opcode::Copy);
        self.add_arg(v, w);
    }

    /// Appends `w` to the arguments of `v`.
    pub fn add_arg(&mut self, v: Value, w: Value) {
        self.values[w].uses += 1;
        self.values[v].args.push(w);
    }

    /// Replaces argument `i` of `v` with `w`.
    pub fn set_arg(&mut self, v: Value, i: usize, w: Value) {
        let old = mem::replace(&mut self.values[v].args[i], w);

        self.values[old].uses -= 1;
        self.values[w].uses += 1;
    }

    /// Replaces every argument of `v`.
    pub fn set_args(&mut self, v: Value, args: &[Value]) {
        self.reset_args(v);

        for &w in args {
            self.add_arg(v, w);
        }
    }

    /// Removes argument `i` of `v`, shifting the rest down.
    pub fn remove_arg(&mut self, v: Value, i: usize) {
        let old = self.values[v].args.remove(i);

        self.values[old].uses -= 1;
    }

    /// Removes every argument of `v`.
    pub fn reset_args(&mut self, v: Value) {
        let args = mem::take(&mut self.values[v].args);

        for w in args {
            self.values[w].uses -= 1;
        }
    }

    /// Rewrites every argument and control slot that refers to `old` to
    /// refer to `new` instead.
    pub fn replace_uses(&mut self, old: Value, new: Value) {
        if old == new {
            return;
        }

        for bi in 0..self.layout.len() {
            let b = self.layout[bi];

            for vi in 0..self.blocks[b].values.len() {
                let v = self.blocks[b].values[vi];

                for ai in 0..self.values[v].args.len() {
                    if self.values[v].args[ai] == old {
                        self.set_arg(v, ai, new);
                    }
                }
            }

            for ci in 0..self.blocks[b].controls.len() {
                if self.blocks[b].controls[ci] == old {
                    self.replace_control(b, ci, new);
                }
            }
        }
    }

    /// Moves `v` to the end of block `to`.
    pub fn move_value(&mut self, v: Value, to: Block) {
        let from = self.values[v].block;

        if from == to {
            return;
        }

        self.blocks[from].values.retain(|&x| x != v);
        self.blocks[to].values.push(v);
        self.values[v].block = to;
    }

    /// Follows a chain of copies to the value at the bottom of it.
    ///
    /// Panics on a copy cycle, which can only exist in unreachable code and
    /// should have been removed by then.
    pub fn copy_source(&self, v: Value) -> Value {
        let mut slow = v;
        let mut fast = v;
        let mut advance_slow = false;

        while self.values[fast].op == Opcode::Copy {
            fast = self.values[fast].args[0];

            if advance_slow {
                slow = self.values[slow].args[0];

                assert_ne!(slow, fast, "copy cycle through {v}");
            }

            advance_slow = !advance_slow;
        }

        fast
    }

    /// If every argument of the phi `v` besides `v` itself is the same
    /// value, turns `v` into a copy of it. Returns whether `v` changed.
    pub fn phielim_value(&mut self, v: Value) -> bool {
        if self.values[v].op != Opcode::Phi {
            return false;
        }

        let mut only: Option<Value> = None;

        for &x in self.values[v].args.iter() {
            if x == v || Some(x) == only {
                continue;
            }

            if only.is_some() {
                return false;
            }

            only = Some(x);
        }

        match only {
            Some(w) => {
                self.copy_of(v, w);
                self.warnl(self.values[v].pos, format_args!("eliminated phi"));

                true
            }
            // only refers to itself, must be in a dead loop
            None => false,
        }
    }

    /// Removes every invalid value from its block's value list. Their slots
    /// stay allocated until the function goes back into its cache.
    pub fn compact_values(&mut self) {
        for bi in 0..self.layout.len() {
            let b = self.layout[bi];
            let values = &self.values;

            self.blocks[b]
                .values
                .retain(|&v| values[v].op != Opcode::Invalid);
        }
    }

    /// Iterates over every live value in layout order.
    pub fn all_values(&self) -> impl Iterator<Item = Value> + '_ {
        self.layout
            .iter()
            .flat_map(move |&b| self.blocks[b].values.iter().copied())
            .filter(move |&v| self.values[v].op != Opcode::Invalid)
    }

    //
    // analyses
    //

    /// The reachable blocks in postorder.
    pub fn postorder(&mut self) -> Rc<Vec<Block>> {
        if let Some(po) = &self.analyses.postorder {
            return Rc::clone(po);
        }

        let po = Rc::new(compute_postorder(self));

        self.analyses.postorder = Some(Rc::clone(&po));

        po
    }

    /// The immediate dominator of every reachable block besides the entry.
    pub fn idom(&mut self) -> Rc<SecondaryMap<Block, Block>> {
        if let Some(idom) = &self.analyses.idom {
            return Rc::clone(idom);
        }

        let po = self.postorder();
        let idom = Rc::new(compute_idoms(self, &po));

        self.analyses.idom = Some(Rc::clone(&idom));

        idom
    }

    /// The dominator tree, as a [`SparseTree`].
    pub fn sdom(&mut self) -> Rc<SparseTree> {
        if let Some(sdom) = &self.analyses.sdom {
            return Rc::clone(sdom);
        }

        let idom = self.idom();
        let sdom = Rc::new(SparseTree::new(self, &idom));

        self.analyses.sdom = Some(Rc::clone(&sdom));

        sdom
    }

    /// The loop nest.
    pub fn loopnest(&mut self) -> Rc<LoopNest> {
        if let Some(ln) = &self.analyses.loopnest {
            return Rc::clone(ln);
        }

        let sdom = self.sdom();
        let ln = Rc::new(LoopNest::new(self, &sdom));

        self.analyses.loopnest = Some(Rc::clone(&ln));

        ln
    }

    /// Throws away every cached analysis.
    pub fn invalidate_cfg(&mut self) {
        self.analyses = CachedAnalyses::default();
    }

    /// Throws away every cached analysis that isn't in `preserved`.
    pub fn invalidate(&mut self, preserved: &PreservedAnalyses) {
        if preserved.preserves_all() {
            return;
        }

        let cached = &mut self.analyses;

        if !preserved.is_preserved(TypeId::of::<PostorderAnalysis>()) {
            cached.postorder = None;
        }

        if !preserved.is_preserved(TypeId::of::<DominatorTreeAnalysis>()) {
            cached.idom = None;
        }

        if !preserved.is_preserved(TypeId::of::<SparseTreeAnalysis>()) {
            cached.sdom = None;
        }

        if !preserved.is_preserved(TypeId::of::<LoopNestAnalysis>()) {
            cached.loopnest = None;
        }
    }

    //
    // scratch space
    //

    /// Borrows a cleared sparse set for keys in `[0, n)` from the cache.
    pub fn new_sparse_set<K>(&mut self, n: usize) -> SparseSet<K>
    where
        K: crate::arena::ArenaKey,
        SparseSet<K>: Pooled,
    {
        SparseSet::<K>::take(&mut self.cache, n)
    }

    /// Returns a sparse set to the cache.
    pub fn ret_sparse_set<K>(&mut self, set: SparseSet<K>)
    where
        K: crate::arena::ArenaKey,
        SparseSet<K>: Pooled,
    {
        set.give(&mut self.cache);
    }

    /// Borrows a cleared sparse map for keys in `[0, n)` from the cache.
    pub fn new_sparse_map<K>(&mut self, n: usize) -> SparseMap<K, i32>
    where
        K: crate::arena::ArenaKey,
        SparseMap<K, i32>: Pooled,
    {
        SparseMap::<K, i32>::take(&mut self.cache, n)
    }

    /// Returns a sparse map to the cache.
    pub fn ret_sparse_map<K>(&mut self, map: SparseMap<K, i32>)
    where
        K: crate::arena::ArenaKey,
        SparseMap<K, i32>: Pooled,
    {
        map.give(&mut self.cache);
    }

    //
    // diagnostics
    //

    /// Records which pass is running and its debug level.
    pub fn set_pass(&mut self, name: &'static str, debug: u32) {
        self.pass = PassInfo { name, debug };
    }

    /// The name of the running pass.
    pub fn pass_name(&self) -> &'static str {
        self.pass.name
    }

    /// The debug level of the running pass.
    pub fn debug_level(&self) -> u32 {
        self.pass.debug
    }

    /// Logs a message through the configured [`Logger`].
    pub fn logf(&self, args: fmt::Arguments<'_>) {
        self.config.logger().logf(args);
    }

    /// Emits a warning about `pos` if the running pass has a debug level
    /// above zero.
    pub fn warnl(&self, pos: Pos, args: fmt::Arguments<'_>) {
        if self.pass.debug > 0 {
            self.config.logger().warnl(pos, args);
        }
    }

    /// Formats a single value as `v3 = Add64 <i64> v1 v2`.
    pub fn value_string(&self, v: Value) -> String {
        let data = &self.values[v];
        let mut out = format!("{v} = {} <{}>", data.op, data.ty);

        match data.aux {
            Aux::None => {}
            Aux::Int(i) => out += &format!(" [{i}]"),
            Aux::Sym(s) => out += &format!(" {{{}}}", self.symbol_name(s)),
        }

        for arg in data.args.iter() {
            out += &format!(" {arg}");
        }

        out
    }
}

impl Index<Value> for Func {
    type Output = ValueData;

    #[inline]
    fn index(&self, v: Value) -> &ValueData {
        &self.values[v]
    }
}

impl Index<Block> for Func {
    type Output = BlockData;

    #[inline]
    fn index(&self, b: Block) -> &BlockData {
        &self.blocks[b]
    }
}

impl fmt::Display for Func {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}:", self.name)?;

        for &b in self.layout.iter() {
            let data = &self.blocks[b];

            writeln!(f, "  {b}: {:?}", data.kind)?;

            for &v in data.values.iter() {
                writeln!(f, "    {}", self.value_string(v))?;
            }

            let controls: Vec<String> = data.controls.iter().map(|c| c.to_string()).collect();
            let succs: Vec<String> = data.succs.iter().map(|e| e.block.to_string()).collect();

            writeln!(f, "    {} -> {}", controls.join(" "), succs.join(" "))?;
        }

        Ok(())
    }
}

impl fmt::Debug for Func {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}
