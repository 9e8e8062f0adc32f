//======---------------------------------------------------------------======//
//                                                                           //
// Copyright 2022-2023 Evan Cox <evanacox00@gmail.com>. All rights reserved. //
//                                                                           //
// Use of this source code is governed by a BSD-style license that can be    //
// found in the LICENSE.txt file at the root of this project, or at the      //
// following link: https://opensource.org/licenses/BSD-3-Clause              //
//                                                                           //
//======---------------------------------------------------------------======//

use bitflags::bitflags;
use paste::paste;
use std::fmt;

#[cfg(feature = "enable-serde")]
use serde::{Deserialize, Serialize};

bitflags! {
    /// Static properties of an opcode. These drive which values the passes
    /// are allowed to move, merge or delete.
    #[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
    #[cfg_attr(feature = "enable-serde", derive(Serialize, Deserialize))]
    pub struct OpFlags: u32 {
        /// `op(a, b) == op(b, a)`.
        const COMMUTATIVE = 1;
        /// The operation has an effect besides producing its result, it can
        /// never be deleted or merged even when unused.
        const SIDE_EFFECTS = 1 << 1;
        /// The operation panics when its (pointer) argument is nil.
        const NIL_CHECK = 1 << 2;
        /// The operation can fault (e.g. a load through a bad pointer).
        const FAULTS = 1 << 3;
        /// Recomputing the value is at least as cheap as keeping it live.
        const REMATERIALIZABLE = 1 << 4;
        /// The operation is significantly more expensive than simple ALU ops.
        const EXPENSIVE = 1 << 5;
        /// The operation is a call.
        const CALL = 1 << 6;
        /// The operation reads or produces a memory state.
        const MEMORY = 1 << 7;
        /// The operation is a compare that produces a `bool`.
        const COMPARE = 1 << 8;
    }
}

/// What kind of data an opcode keeps in a value's [`Aux`](crate::ir::Aux).
#[derive(Copy, Clone, Debug, Hash, PartialEq, Eq)]
pub enum AuxKind {
    /// Nothing, the aux must be [`Aux::None`](crate::ir::Aux::None).
    None,
    /// An immediate integer.
    Int,
    /// A symbol reference.
    Sym,
}

/// Everything the optimizer knows about an opcode without looking at a value.
#[derive(Copy, Clone, Debug)]
pub struct OpInfo {
    /// The name of the opcode, used when printing values.
    pub name: &'static str,
    /// The number of arguments, `-1` if the opcode is variadic.
    pub arity: i8,
    /// The kind of aux data the opcode carries.
    pub aux: AuxKind,
    /// The static properties of the opcode.
    pub flags: OpFlags,
}

macro_rules! opcodes {
    ( $( $(#[$doc:meta])* $name:ident => ($arity:literal, $aux:ident $(, $flag:ident)*); )* ) => {
        /// The closed set of operations a [`Value`](crate::ir::Value) can perform.
        ///
        /// These are the machine-independent ("generic") operations. Integer
        /// operations come in one variant per width, signedness lives in the
        /// opcode and not in the type (e.g. `Less64` vs `Less64U`).
        #[repr(u8)]
        #[derive(Copy, Clone, Debug, Hash, PartialEq, Eq, PartialOrd, Ord)]
        #[cfg_attr(feature = "enable-serde", derive(Serialize, Deserialize))]
        pub enum Opcode {
            $( $(#[$doc])* $name, )*
        }

        static OP_TABLE: &[OpInfo] = &[
            $(
                OpInfo {
                    name: stringify!($name),
                    arity: $arity,
                    aux: AuxKind::$aux,
                    flags: OpFlags::from_bits_truncate(0 $(| OpFlags::$flag.bits())*),
                },
            )*
        ];

        impl Opcode {
            /// Every opcode, in declaration order.
            pub const ALL: &'static [Opcode] = &[ $( Opcode::$name, )* ];
        }
    };
}

opcodes! {
    /// A deleted value. Its slot stays allocated until the function is recycled.
    Invalid => (0, None);
    /// `Copy x` is just `x`, these are left behind by rewrites and cleaned up by copyelim.
    Copy => (1, None);
    /// Selects one argument per predecessor edge, in `preds` order.
    Phi => (-1, None);
    /// The `n`th function argument. Lives in the entry block.
    Arg => (0, Int);
    /// The memory state on function entry. Lives in the entry block.
    InitMem => (0, None, MEMORY);

    /// A `bool` constant, `aux` is 0 or 1.
    ConstBool => (0, Int, REMATERIALIZABLE);
    /// An 8-bit integer constant, sign-extended into `aux`.
    Const8 => (0, Int, REMATERIALIZABLE);
    /// A 16-bit integer constant, sign-extended into `aux`.
    Const16 => (0, Int, REMATERIALIZABLE);
    /// A 32-bit integer constant, sign-extended into `aux`.
    Const32 => (0, Int, REMATERIALIZABLE);
    /// A 64-bit integer constant.
    Const64 => (0, Int, REMATERIALIZABLE);
    /// The nil pointer.
    ConstNil => (0, None, REMATERIALIZABLE);

    /// Integer addition.
    Add8 => (2, None, COMMUTATIVE);
    /// Integer addition.
    Add16 => (2, None, COMMUTATIVE);
    /// Integer addition.
    Add32 => (2, None, COMMUTATIVE);
    /// Integer addition.
    Add64 => (2, None, COMMUTATIVE);
    /// `ptr + int`, byte-wise.
    AddPtr => (2, None);
    /// Integer subtraction.
    Sub8 => (2, None);
    /// Integer subtraction.
    Sub16 => (2, None);
    /// Integer subtraction.
    Sub32 => (2, None);
    /// Integer subtraction.
    Sub64 => (2, None);
    /// Integer multiplication.
    Mul32 => (2, None, COMMUTATIVE);
    /// Integer multiplication.
    Mul64 => (2, None, COMMUTATIVE);
    /// Signed division.
    Div64 => (2, None, EXPENSIVE);
    /// Unsigned division.
    Div64u => (2, None, EXPENSIVE);
    /// Signed remainder.
    Mod64 => (2, None, EXPENSIVE);
    /// Unsigned remainder.
    Mod64u => (2, None, EXPENSIVE);
    /// Bitwise and.
    And64 => (2, None, COMMUTATIVE);
    /// Bitwise or.
    Or64 => (2, None, COMMUTATIVE);
    /// Bitwise xor.
    Xor64 => (2, None, COMMUTATIVE);
    /// Two's complement negation.
    Neg64 => (1, None);
    /// Logical shift left, shift amount is a 64-bit value.
    Lsh64x64 => (2, None);
    /// Arithmetic shift right, shift amount is a 64-bit value.
    Rsh64x64 => (2, None);

    /// Boolean negation.
    Not => (1, None);
    /// Boolean and, both sides are always evaluated.
    AndB => (2, None, COMMUTATIVE);
    /// Boolean or, both sides are always evaluated.
    OrB => (2, None, COMMUTATIVE);
    /// `bool == bool`.
    EqB => (2, None, COMMUTATIVE, COMPARE);
    /// `bool != bool`.
    NeqB => (2, None, COMMUTATIVE, COMPARE);

    /// Integer equality.
    Eq8 => (2, None, COMMUTATIVE, COMPARE);
    /// Integer equality.
    Eq16 => (2, None, COMMUTATIVE, COMPARE);
    /// Integer equality.
    Eq32 => (2, None, COMMUTATIVE, COMPARE);
    /// Integer equality.
    Eq64 => (2, None, COMMUTATIVE, COMPARE);
    /// Integer inequality.
    Neq8 => (2, None, COMMUTATIVE, COMPARE);
    /// Integer inequality.
    Neq16 => (2, None, COMMUTATIVE, COMPARE);
    /// Integer inequality.
    Neq32 => (2, None, COMMUTATIVE, COMPARE);
    /// Integer inequality.
    Neq64 => (2, None, COMMUTATIVE, COMPARE);
    /// Signed `<`.
    Less8 => (2, None, COMPARE);
    /// Signed `<`.
    Less16 => (2, None, COMPARE);
    /// Signed `<`.
    Less32 => (2, None, COMPARE);
    /// Signed `<`.
    Less64 => (2, None, COMPARE);
    /// Unsigned `<`.
    Less8U => (2, None, COMPARE);
    /// Unsigned `<`.
    Less16U => (2, None, COMPARE);
    /// Unsigned `<`.
    Less32U => (2, None, COMPARE);
    /// Unsigned `<`.
    Less64U => (2, None, COMPARE);
    /// Signed `<=`.
    Leq8 => (2, None, COMPARE);
    /// Signed `<=`.
    Leq16 => (2, None, COMPARE);
    /// Signed `<=`.
    Leq32 => (2, None, COMPARE);
    /// Signed `<=`.
    Leq64 => (2, None, COMPARE);
    /// Unsigned `<=`.
    Leq8U => (2, None, COMPARE);
    /// Unsigned `<=`.
    Leq16U => (2, None, COMPARE);
    /// Unsigned `<=`.
    Leq32U => (2, None, COMPARE);
    /// Unsigned `<=`.
    Leq64U => (2, None, COMPARE);
    /// Signed `>`.
    Greater64 => (2, None, COMPARE);
    /// Unsigned `>`.
    Greater64U => (2, None, COMPARE);
    /// Signed `>=`.
    Geq64 => (2, None, COMPARE);
    /// Unsigned `>=`.
    Geq64U => (2, None, COMPARE);
    /// Pointer equality.
    EqPtr => (2, None, COMMUTATIVE, COMPARE);
    /// Pointer inequality.
    NeqPtr => (2, None, COMMUTATIVE, COMPARE);

    /// `bool` to `u8`, 0 or 1.
    CvtBoolToUint8 => (1, None);
    /// Zero extension.
    ZeroExt8to16 => (1, None);
    /// Zero extension.
    ZeroExt8to32 => (1, None);
    /// Zero extension.
    ZeroExt8to64 => (1, None);
    /// Sign extension.
    SignExt32to64 => (1, None);
    /// Truncation.
    Trunc64to32 => (1, None);

    /// The address of a symbol, never nil.
    Addr => (0, Sym, REMATERIALIZABLE);
    /// `ptr + aux`, never nil if `ptr` isn't.
    OffPtr => (1, Int);
    /// `ptr + idx * size`, where `aux` is the element size.
    PtrIndex => (2, Int);
    /// `Load ptr mem`.
    Load => (2, None, FAULTS, MEMORY);
    /// `Store ptr val mem`, produces a new memory state.
    Store => (3, None, SIDE_EFFECTS, FAULTS, MEMORY);
    /// Panics if its pointer is nil. Takes and does not produce memory.
    NilCheck => (2, None, NIL_CHECK, FAULTS);
    /// `ptr != nil`.
    IsNonNil => (1, None);
    /// `0 <= idx < len`.
    IsInBounds => (2, None);
    /// `0 <= idx <= len`.
    IsSliceInBounds => (2, None);

    /// `{ptr, len, cap}`.
    SliceMake => (3, None);
    /// The pointer of a slice.
    SlicePtr => (1, None);
    /// The length of a slice, never negative.
    SliceLen => (1, None);
    /// The capacity of a slice, never negative.
    SliceCap => (1, None);
    /// `{ptr, len}`.
    StringMake => (2, None);
    /// The pointer of a string.
    StringPtr => (1, None);
    /// The length of a string, never negative.
    StringLen => (1, None);

    /// `StaticCall args... mem` to the symbol in `aux`. Produces a tuple of
    /// `(result, mem)`.
    StaticCall => (-1, Sym, SIDE_EFFECTS, CALL, MEMORY, EXPENSIVE);
    /// The first element of a tuple.
    Select0 => (1, None);
    /// The second element of a tuple.
    Select1 => (1, None);
    /// `MakeResult [val] mem`, the control of a `Ret` block.
    MakeResult => (-1, None);
}

macro_rules! flag_queries {
    ( $( $flag:ident ),* ) => {
        paste! {
            impl Opcode {
                $(
                    #[doc = concat!("Checks if the opcode has the `", stringify!($flag), "` flag.")]
                    #[inline]
                    pub fn [<is_ $flag:lower>](self) -> bool {
                        self.flags().contains(OpFlags::$flag)
                    }
                )*
            }
        }
    };
}

flag_queries!(COMMUTATIVE, NIL_CHECK, FAULTS, REMATERIALIZABLE, EXPENSIVE, CALL, MEMORY, COMPARE);

impl Opcode {
    /// Gets the static information about this opcode.
    #[inline]
    pub fn info(self) -> &'static OpInfo {
        &OP_TABLE[self as usize]
    }

    /// The name of the opcode.
    #[inline]
    pub fn name(self) -> &'static str {
        self.info().name
    }

    /// The static properties of the opcode.
    #[inline]
    pub fn flags(self) -> OpFlags {
        self.info().flags
    }

    /// The number of arguments, or `None` for variadic opcodes.
    #[inline]
    pub fn arity(self) -> Option<usize> {
        match self.info().arity {
            n if n < 0 => None,
            n => Some(n as usize),
        }
    }

    /// The kind of aux data the opcode carries.
    #[inline]
    pub fn aux_kind(self) -> AuxKind {
        self.info().aux
    }

    /// Checks if the opcode has side effects.
    #[inline]
    pub fn has_side_effects(self) -> bool {
        self.flags().contains(OpFlags::SIDE_EFFECTS)
    }

    /// Checks if the opcode materializes an integer or `bool` constant.
    #[inline]
    pub fn is_const_int(self) -> bool {
        matches!(
            self,
            Opcode::ConstBool | Opcode::Const8 | Opcode::Const16 | Opcode::Const32 | Opcode::Const64
        )
    }

    /// Checks if the opcode is a division or remainder.
    #[inline]
    pub fn is_div_or_mod(self) -> bool {
        matches!(
            self,
            Opcode::Div64 | Opcode::Div64u | Opcode::Mod64 | Opcode::Mod64u
        )
    }

    /// The integer constant opcode for a given width in bits.
    pub fn const_for_width(bits: u32) -> Option<Opcode> {
        match bits {
            8 => Some(Opcode::Const8),
            16 => Some(Opcode::Const16),
            32 => Some(Opcode::Const32),
            64 => Some(Opcode::Const64),
            _ => None,
        }
    }

    /// For a compare, the opcode that computes the same comparison with the
    /// operands swapped (`a < b` becomes `b > a`). Only defined where the
    /// swapped form exists as an opcode.
    pub fn swapped_compare(self) -> Option<Opcode> {
        use Opcode::*;

        Some(match self {
            Less64 => Greater64,
            Greater64 => Less64,
            Leq64 => Geq64,
            Geq64 => Leq64,
            Less64U => Greater64U,
            Greater64U => Less64U,
            Leq64U => Geq64U,
            Geq64U => Leq64U,
            op if op.is_commutative() && op.is_compare() => op,
            _ => return None,
        })
    }
}

/// The relation a compare tests between its two arguments.
#[derive(Copy, Clone, Debug, Hash, PartialEq, Eq)]
pub enum Relation {
    /// `a == b`
    Eq,
    /// `a != b`
    Neq,
    /// `a < b`
    Lt,
    /// `a <= b`
    Leq,
    /// `a > b`
    Gt,
    /// `a >= b`
    Geq,
}

/// Bit set over the three possible outcomes of comparing two integers.
pub const REL_LT: u8 = 1;
/// See [`REL_LT`].
pub const REL_EQ: u8 = 2;
/// See [`REL_LT`].
pub const REL_GT: u8 = 4;

impl Relation {
    /// The relation that holds exactly when `self` doesn't.
    pub fn negated(self) -> Self {
        match self {
            Relation::Eq => Relation::Neq,
            Relation::Neq => Relation::Eq,
            Relation::Lt => Relation::Geq,
            Relation::Leq => Relation::Gt,
            Relation::Gt => Relation::Leq,
            Relation::Geq => Relation::Lt,
        }
    }

    /// The same relation with the operands swapped, `a < b` becomes `b > a`.
    pub fn swapped(self) -> Self {
        match self {
            Relation::Lt => Relation::Gt,
            Relation::Leq => Relation::Geq,
            Relation::Gt => Relation::Lt,
            Relation::Geq => Relation::Leq,
            rel => rel,
        }
    }

    /// The outcomes (`REL_LT | REL_EQ | REL_GT`) the relation accepts.
    pub fn mask(self) -> u8 {
        match self {
            Relation::Eq => REL_EQ,
            Relation::Neq => REL_LT | REL_GT,
            Relation::Lt => REL_LT,
            Relation::Leq => REL_LT | REL_EQ,
            Relation::Gt => REL_GT,
            Relation::Geq => REL_GT | REL_EQ,
        }
    }

    /// Checks whether the relation holds for an outcome.
    pub fn holds(self, ord: std::cmp::Ordering) -> bool {
        let bit = match ord {
            std::cmp::Ordering::Less => REL_LT,
            std::cmp::Ordering::Equal => REL_EQ,
            std::cmp::Ordering::Greater => REL_GT,
        };

        self.mask() & bit != 0
    }
}

/// What a compare opcode computes: `a rel b`, on `bits`-wide integers.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Comparison {
    /// The relation being tested.
    pub rel: Relation,
    /// The width of the operands. Booleans are 1 bit wide.
    pub bits: u32,
    /// Whether the operands are compared as unsigned integers.
    pub unsigned: bool,
}

impl Opcode {
    /// Describes a compare opcode, `None` for everything else.
    pub fn comparison(self) -> Option<Comparison> {
        use Opcode::*;
        use Relation::*;

        let (rel, bits, unsigned) = match self {
            EqB => (Eq, 1, true),
            NeqB => (Neq, 1, true),
            Eq8 => (Eq, 8, false),
            Eq16 => (Eq, 16, false),
            Eq32 => (Eq, 32, false),
            Eq64 => (Eq, 64, false),
            Neq8 => (Neq, 8, false),
            Neq16 => (Neq, 16, false),
            Neq32 => (Neq, 32, false),
            Neq64 => (Neq, 64, false),
            Less8 => (Lt, 8, false),
            Less16 => (Lt, 16, false),
            Less32 => (Lt, 32, false),
            Less64 => (Lt, 64, false),
            Less8U => (Lt, 8, true),
            Less16U => (Lt, 16, true),
            Less32U => (Lt, 32, true),
            Less64U => (Lt, 64, true),
            Leq8 => (Leq, 8, false),
            Leq16 => (Leq, 16, false),
            Leq32 => (Leq, 32, false),
            Leq64 => (Leq, 64, false),
            Leq8U => (Leq, 8, true),
            Leq16U => (Leq, 16, true),
            Leq32U => (Leq, 32, true),
            Leq64U => (Leq, 64, true),
            Greater64 => (Gt, 64, false),
            Greater64U => (Gt, 64, true),
            Geq64 => (Geq, 64, false),
            Geq64U => (Geq, 64, true),
            EqPtr => (Eq, 64, true),
            NeqPtr => (Neq, 64, true),
            _ => return None,
        };

        Some(Comparison {
            rel,
            bits,
            unsigned,
        })
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use static_assertions::assert_eq_size;

    #[test]
    fn table_matches_enum() {
        assert_eq!(OP_TABLE.len(), Opcode::ALL.len());

        for (i, op) in Opcode::ALL.iter().enumerate() {
            assert_eq!(*op as usize, i);
            assert_eq!(format!("{op:?}"), op.name());
        }
    }

    #[test]
    fn opcode_is_one_byte() {
        assert_eq_size!(Opcode, u8);
    }

    #[test]
    fn flags_and_arity() {
        assert!(Opcode::Add64.is_commutative());
        assert!(!Opcode::Sub64.is_commutative());
        assert!(Opcode::Store.has_side_effects());
        assert!(Opcode::NilCheck.is_nil_check());
        assert!(Opcode::Const64.is_rematerializable());
        assert!(Opcode::Less64U.is_compare());
        assert_eq!(Opcode::Phi.arity(), None);
        assert_eq!(Opcode::Store.arity(), Some(3));
        assert_eq!(Opcode::Arg.aux_kind(), AuxKind::Int);
        assert_eq!(Opcode::StaticCall.aux_kind(), AuxKind::Sym);
    }

    #[test]
    fn comparisons() {
        let c = Opcode::Less32U.comparison().unwrap();

        assert_eq!((c.rel, c.bits, c.unsigned), (Relation::Lt, 32, true));
        assert_eq!(Opcode::Add64.comparison(), None);

        for &op in Opcode::ALL {
            assert_eq!(op.comparison().is_some(), op.is_compare(), "{op}");
        }

        assert_eq!(Relation::Leq.negated(), Relation::Gt);
        assert_eq!(Relation::Leq.swapped(), Relation::Geq);
        assert!(Relation::Geq.holds(std::cmp::Ordering::Equal));
        assert!(!Relation::Neq.holds(std::cmp::Ordering::Equal));
    }

    #[test]
    fn swapped_compares() {
        assert_eq!(Opcode::Less64.swapped_compare(), Some(Opcode::Greater64));
        assert_eq!(Opcode::Eq32.swapped_compare(), Some(Opcode::Eq32));
        assert_eq!(Opcode::Less8.swapped_compare(), None);
    }
}
