//======---------------------------------------------------------------======//
//                                                                           //
// Copyright 2022-2023 Evan Cox <evanacox00@gmail.com>. All rights reserved. //
//                                                                           //
// Use of this source code is governed by a BSD-style license that can be    //
// found in the LICENSE.txt file at the root of this project, or at the      //
// following link: https://opensource.org/licenses/BSD-3-Clause              //
//                                                                           //
//======---------------------------------------------------------------======//

use crate::ir::*;
use std::sync::Arc;

/// Helper type for building a [`Func`] one block at a time.
///
/// Values are appended to the "current" block, which is changed with
/// [`Self::switch_to`]. Terminators (`jump`, `branch`, `ret`, ...) set the
/// kind and controls of the current block and add its outgoing edges, in
/// the order the block kind expects them.
///
/// ```
/// # use opal::ir::*;
/// # use std::sync::Arc;
/// let mut b = FuncBuilder::new("max", Arc::new(Config::default()));
/// let entry = b.create_block();
/// let left = b.create_block();
/// let right = b.create_block();
/// let exit = b.create_block();
///
/// b.switch_to(entry);
/// let mem = b.init_mem();
/// let x = b.arg(0, Type::I64);
/// let y = b.arg(1, Type::I64);
/// let cond = b.binary(Opcode::Less64, x, y);
/// b.branch(cond, left, right);
///
/// b.switch_to(left);
/// b.jump(exit);
///
/// b.switch_to(right);
/// b.jump(exit);
///
/// b.switch_to(exit);
/// let phi = b.phi(Type::I64, &[y, x]);
/// b.ret(Some(phi), mem);
///
/// let f = b.define();
///
/// assert_eq!(f.layout().len(), 4);
/// ```
pub struct FuncBuilder {
    func: Func,
    current: Option<Block>,
}

impl FuncBuilder {
    /// Starts building an empty function.
    pub fn new(name: &str, config: Arc<Config>) -> Self {
        Self::with_func(Func::new(name, config))
    }

    /// Continues building an existing function.
    pub fn with_func(func: Func) -> Self {
        Self {
            func,
            current: None,
        }
    }

    /// Finishes building and returns the function.
    pub fn define(self) -> Func {
        self.func
    }

    /// The function being built.
    pub fn func(&self) -> &Func {
        &self.func
    }

    /// The function being built, for edits the builder has no helper for.
    pub fn func_mut(&mut self) -> &mut Func {
        &mut self.func
    }

    /// Creates a new block. Its kind is decided by whichever terminator
    /// ends up being used on it.
    pub fn create_block(&mut self) -> Block {
        self.func.new_block(BlockKind::Invalid)
    }

    /// Makes `block` the block that new values are appended to.
    pub fn switch_to(&mut self, block: Block) {
        self.current = Some(block);
    }

    /// The current block.
    ///
    /// Panics if [`Self::switch_to`] has never been called.
    pub fn current(&self) -> Block {
        match self.current {
            Some(b) => b,
            None => panic!("no current block, call `switch_to` first"),
        }
    }

    /// The type of a value.
    pub fn ty(&self, v: Value) -> Type {
        self.func[v].ty()
    }

    /// Appends an arbitrary value to the current block.
    pub fn value(&mut self, op: Opcode, ty: Type, aux: Aux, args: &[Value]) -> Value {
        let b = self.current();

        self.func.new_value(b, op, ty, aux, args)
    }

    /// Gets the `idx`th argument of the function. Arguments live in the entry block.
    pub fn arg(&mut self, idx: i64, ty: Type) -> Value {
        let entry = self.func.entry();

        self.func.new_value(entry, Opcode::Arg, ty, Aux::Int(idx), &[])
    }

    /// Gets the initial memory state of the function.
    pub fn init_mem(&mut self) -> Value {
        let entry = self.func.entry();

        self.func
            .new_value(entry, Opcode::InitMem, Type::Mem, Aux::None, &[])
    }

    /// Gets an integer constant.
    pub fn iconst(&mut self, ty: Type, c: i64) -> Value {
        self.func.const_int(ty, c)
    }

    /// Gets a `bool` constant.
    pub fn bconst(&mut self, b: bool) -> Value {
        self.func.const_bool(b)
    }

    /// Gets the nil pointer.
    pub fn nil(&mut self) -> Value {
        self.func.const_nil()
    }

    /// Appends a one-argument operation. The result has the type of `x`,
    /// or `bool` for compares and boolean ops.
    pub fn unary(&mut self, op: Opcode, x: Value) -> Value {
        let ty = self.result_type(op, x);

        self.value(op, ty, Aux::None, &[x])
    }

    /// Appends a two-argument operation. The result has the type of `x`,
    /// or `bool` for compares and boolean ops.
    pub fn binary(&mut self, op: Opcode, x: Value, y: Value) -> Value {
        let ty = self.result_type(op, x);

        self.value(op, ty, Aux::None, &[x, y])
    }

    /// Appends a phi to the current block. Arguments are in predecessor order.
    pub fn phi(&mut self, ty: Type, args: &[Value]) -> Value {
        self.value(Opcode::Phi, ty, Aux::None, args)
    }

    /// Appends a load of a `ty` from `ptr`.
    pub fn load(&mut self, ty: Type, ptr: Value, mem: Value) -> Value {
        self.value(Opcode::Load, ty, Aux::None, &[ptr, mem])
    }

    /// Appends a store, returning the new memory state.
    pub fn store(&mut self, ptr: Value, val: Value, mem: Value) -> Value {
        self.value(Opcode::Store, Type::Mem, Aux::None, &[ptr, val, mem])
    }

    /// Appends a nil check of `ptr`.
    pub fn nil_check(&mut self, ptr: Value, mem: Value) -> Value {
        self.value(Opcode::NilCheck, Type::Void, Aux::None, &[ptr, mem])
    }

    /// Appends a call to `callee`, returning the `(result, memory)` pair
    /// taken apart with `Select0`/`Select1`.
    pub fn call(&mut self, callee: &str, ret: Type, args: &[Value], mem: Value) -> (Value, Value) {
        let sym = self.func.intern(callee);
        let mut all: Vec<Value> = args.to_vec();

        all.push(mem);

        let call = self.value(Opcode::StaticCall, Type::Tuple, Aux::Sym(sym), &all);
        let res = self.value(Opcode::Select0, ret, Aux::None, &[call]);
        let mem = self.value(Opcode::Select1, Type::Mem, Aux::None, &[call]);

        (res, mem)
    }

    /// Ends the current block with an unconditional jump.
    pub fn jump(&mut self, to: Block) {
        let b = self.current();

        self.func.set_kind(b, BlockKind::Plain);
        self.func.add_edge_to(b, to);
    }

    /// Ends the current block with a two-way branch on `cond`.
    pub fn branch(&mut self, cond: Value, then: Block, otherwise: Block) {
        let b = self.current();

        self.func.set_kind(b, BlockKind::If);
        self.func.set_control(b, cond);
        self.func.add_edge_to(b, then);
        self.func.add_edge_to(b, otherwise);
    }

    /// Ends the current block with a multi-way branch on `idx`. `idx` is
    /// expected to already be an offset into `targets`.
    pub fn jump_table(&mut self, idx: Value, targets: &[Block]) {
        let b = self.current();

        self.func.set_kind(b, BlockKind::JumpTable);
        self.func.set_control(b, idx);

        for &t in targets {
            self.func.add_edge_to(b, t);
        }
    }

    /// Ends the current block with a return of `val` (if any) and `mem`.
    pub fn ret(&mut self, val: Option<Value>, mem: Value) {
        let b = self.current();
        let mut args: Vec<Value> = val.into_iter().collect();

        args.push(mem);

        let ty = match val {
            Some(v) => self.ty(v),
            None => Type::Void,
        };

        let result = self.value(Opcode::MakeResult, ty, Aux::None, &args);

        self.func.set_kind(b, BlockKind::Ret);
        self.func.set_control(b, result);
    }

    /// Ends the current block with a control flow exit that never returns
    /// (a panic or similar).
    pub fn exit(&mut self, mem: Value) {
        let b = self.current();

        self.func.set_kind(b, BlockKind::Exit);
        self.func.set_control(b, mem);
    }

    fn result_type(&self, op: Opcode, x: Value) -> Type {
        use Opcode::*;

        if op.is_compare() {
            return Type::Bool;
        }

        match op {
            Not | AndB | OrB | IsNonNil | IsInBounds | IsSliceInBounds => Type::Bool,
            SliceLen | SliceCap | StringLen => Type::I64,
            SlicePtr | StringPtr => Type::Ptr,
            CvtBoolToUint8 => Type::I8,
            ZeroExt8to16 => Type::I16,
            ZeroExt8to32 | Trunc64to32 => Type::I32,
            ZeroExt8to64 | SignExt32to64 => Type::I64,
            _ => self.ty(x),
        }
    }
}
