//======---------------------------------------------------------------======//
//                                                                           //
// Copyright 2022-2023 Evan Cox <evanacox00@gmail.com>. All rights reserved. //
//                                                                           //
// Use of this source code is governed by a BSD-style license that can be    //
// found in the LICENSE.txt file at the root of this project, or at the      //
// following link: https://opensource.org/licenses/BSD-3-Clause              //
//                                                                           //
//======---------------------------------------------------------------======//

use crate::dense_arena_key;
use crate::ir::{Block, Opcode, Type};
use smallvec::SmallVec;
use std::fmt;

#[cfg(feature = "enable-serde")]
use serde::{Deserialize, Serialize};

dense_arena_key! {
    /// A reference to a single SSA value inside of a [`Func`](crate::ir::Func).
    ///
    /// Values are numbered densely in creation order and are never reused
    /// while the function is alive. Printed as `v{n}`.
    pub struct Value: "v";

    /// An interned symbol name, e.g. the target of a call or the name of
    /// the function itself. Printed as `s{n}`.
    pub struct Symbol: "s";
}

/// The auxiliary data attached to a value. Which variant is valid is
/// decided by the opcode's [`AuxKind`](crate::ir::AuxKind).
#[derive(Copy, Clone, Debug, Default, Hash, PartialEq, Eq)]
#[cfg_attr(feature = "enable-serde", derive(Serialize, Deserialize))]
pub enum Aux {
    /// No aux data.
    #[default]
    None,
    /// An immediate integer, e.g. the value of a constant or an offset.
    Int(i64),
    /// A symbol.
    Sym(Symbol),
}

impl Aux {
    /// Gets the immediate integer, if there is one.
    #[inline]
    pub fn int(self) -> Option<i64> {
        match self {
            Aux::Int(i) => Some(i),
            _ => None,
        }
    }

    /// Gets the symbol, if there is one.
    #[inline]
    pub fn sym(self) -> Option<Symbol> {
        match self {
            Aux::Sym(s) => Some(s),
            _ => None,
        }
    }
}

/// A source position. Only used for diagnostics.
#[derive(Copy, Clone, Debug, Default, Hash, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "enable-serde", derive(Serialize, Deserialize))]
pub struct Pos {
    /// 1-based line, 0 if unknown
    pub line: u32,
    /// 1-based column, 0 if unknown
    pub col: u32,
}

impl Pos {
    /// Creates a position.
    pub fn new(line: u32, col: u32) -> Self {
        Self { line, col }
    }
}

impl fmt::Display for Pos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.col)
    }
}

/// The data for a single value. This can only be modified through the
/// [`Func`](crate::ir::Func) that owns it, since almost every change needs
/// to keep use counts up to date.
#[derive(Clone, Debug)]
pub struct ValueData {
    pub(super) op: Opcode,
    pub(super) ty: Type,
    pub(super) aux: Aux,
    pub(super) args: SmallVec<[Value; 3]>,
    pub(super) block: Block,
    pub(super) uses: u32,
    pub(super) pos: Pos,
}

impl ValueData {
    /// The operation the value performs.
    #[inline]
    pub fn op(&self) -> Opcode {
        self.op
    }

    /// The type of the value.
    #[inline]
    pub fn ty(&self) -> Type {
        self.ty
    }

    /// The aux data of the value.
    #[inline]
    pub fn aux(&self) -> Aux {
        self.aux
    }

    /// The immediate integer in the aux data, `0` if there isn't one.
    #[inline]
    pub fn aux_int(&self) -> i64 {
        self.aux.int().unwrap_or(0)
    }

    /// The arguments of the value.
    #[inline]
    pub fn args(&self) -> &[Value] {
        &self.args
    }

    /// Gets the `i`th argument.
    #[inline]
    pub fn arg(&self, i: usize) -> Value {
        self.args[i]
    }

    /// The block the value is defined in.
    #[inline]
    pub fn block(&self) -> Block {
        self.block
    }

    /// The number of argument and control slots that refer to this value.
    #[inline]
    pub fn uses(&self) -> u32 {
        self.uses
    }

    /// The source position of the value.
    #[inline]
    pub fn pos(&self) -> Pos {
        self.pos
    }

    /// Whether the value may be deleted once it has no uses.
    ///
    /// Void values, memory states, side effects and nil checks must stay
    /// even when nothing refers to them.
    pub fn removeable(&self) -> bool {
        !(self.ty.is_void()
            || self.ty.is_memory()
            || self.op.has_side_effects()
            || self.op.is_nil_check())
    }
}
