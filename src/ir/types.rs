//======---------------------------------------------------------------======//
//                                                                           //
// Copyright 2022 Evan Cox <evanacox00@gmail.com>. All rights reserved.      //
//                                                                           //
// Use of this source code is governed by a BSD-style license that can be    //
// found in the LICENSE.txt file at the root of this project, or at the      //
// following link: https://opensource.org/licenses/BSD-3-Clause              //
//                                                                           //
//======---------------------------------------------------------------======//

use std::fmt;

#[cfg(feature = "enable-serde")]
use serde::{Deserialize, Serialize};

/// The static type of a [`Value`](crate::ir::Value).
///
/// Only the shape of a value matters to the optimizer, so this is a flat
/// enum instead of a full type system. Signedness is not part of the type,
/// it is encoded in the opcodes that interpret a value.
#[derive(Copy, Clone, Debug, Hash, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "enable-serde", derive(Serialize, Deserialize))]
pub enum Type {
    /// No value at all, e.g. the result of a `NilCheck`.
    Void,
    /// `true` or `false`.
    Bool,
    /// An 8-bit integer.
    I8,
    /// A 16-bit integer.
    I16,
    /// A 32-bit integer.
    I32,
    /// A 64-bit integer.
    I64,
    /// A pointer, as wide as the target's pointer size.
    Ptr,
    /// A `{ptr, len, cap}` triple.
    Slice,
    /// A `{ptr, len}` pair.
    Str,
    /// The abstract memory state.
    Mem,
    /// Machine flags, produced by lowered compares.
    Flags,
    /// The result of a call, `(value, mem)`.
    Tuple,
}

impl Type {
    /// Gets the integer type with a given width in bits.
    pub fn int(bits: u32) -> Option<Type> {
        match bits {
            8 => Some(Type::I8),
            16 => Some(Type::I16),
            32 => Some(Type::I32),
            64 => Some(Type::I64),
            _ => None,
        }
    }

    /// The size of a value of this type in bytes, given the target's
    /// pointer size.
    pub fn size(self, ptr_size: u64) -> u64 {
        match self {
            Type::Void | Type::Mem | Type::Flags | Type::Tuple => 0,
            Type::Bool | Type::I8 => 1,
            Type::I16 => 2,
            Type::I32 => 4,
            Type::I64 => 8,
            Type::Ptr => ptr_size,
            Type::Str => ptr_size * 2,
            Type::Slice => ptr_size * 3,
        }
    }

    /// The width of an integer type in bits.
    pub fn bits(self) -> Option<u32> {
        match self {
            Type::I8 => Some(8),
            Type::I16 => Some(16),
            Type::I32 => Some(32),
            Type::I64 => Some(64),
            _ => None,
        }
    }

    /// Checks if the type is one of the integer types.
    #[inline]
    pub fn is_integer(self) -> bool {
        self.bits().is_some()
    }

    /// Checks if the type is `bool`.
    #[inline]
    pub fn is_bool(self) -> bool {
        self == Type::Bool
    }

    /// Checks if the type is the memory state.
    #[inline]
    pub fn is_memory(self) -> bool {
        self == Type::Mem
    }

    /// Checks if the type is `void`.
    #[inline]
    pub fn is_void(self) -> bool {
        self == Type::Void
    }

    /// Checks if the type is machine flags.
    #[inline]
    pub fn is_flags(self) -> bool {
        self == Type::Flags
    }

    /// Checks if the type is a call result tuple.
    #[inline]
    pub fn is_tuple(self) -> bool {
        self == Type::Tuple
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Type::Void => "void",
            Type::Bool => "bool",
            Type::I8 => "i8",
            Type::I16 => "i16",
            Type::I32 => "i32",
            Type::I64 => "i64",
            Type::Ptr => "ptr",
            Type::Slice => "slice",
            Type::Str => "str",
            Type::Mem => "mem",
            Type::Flags => "flags",
            Type::Tuple => "tuple",
        };

        f.write_str(name)
    }
}
