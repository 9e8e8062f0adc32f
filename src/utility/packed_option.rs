//======---------------------------------------------------------------======//
//                                                                           //
// Copyright 2022 Evan Cox <evanacox00@gmail.com>. All rights reserved.      //
//                                                                           //
// Use of this source code is governed by a BSD-style license that can be    //
// found in the LICENSE.txt file at the root of this project, or at the      //
// following link: https://opensource.org/licenses/BSD-3-Clause              //
//                                                                           //
//======---------------------------------------------------------------======//

use std::fmt::{Debug, Formatter, Result};
use std::mem;

#[cfg(feature = "enable-serde")]
use serde::{Deserialize, Serialize};

/// Helper trait for a type that can be packed into a `PackedOption`.
///
/// These types need to have some null-ish value that they can reserve,
/// that value will be used to distinguish between `None` and `Some`. Every
/// key made with [`dense_arena_key`](crate::dense_arena_key) implements this.
///
/// ```
/// # use opal::utility::*;
/// struct NonZero(i32);
///
/// impl Packable for NonZero {
///     fn reserved_null() -> Self {
///         NonZero(0)
///     }
///
///     fn is_reserved_null(&self) -> bool {
///         self.0 == 0
///     }
/// }
///
/// let opt = PackedOption::some(NonZero(15));
///
/// assert_eq!(opt.is_some(), true);
/// ```
pub trait Packable {
    /// Returns the value that is used to represent `None`.
    fn reserved_null() -> Self;

    /// Checks if `self` is the reserved `None` value.
    fn is_reserved_null(&self) -> bool;
}

/// Provides an [`Option`]-like type for keys without paying any extra cost
/// to store the flag. It takes up exactly as much space as the key would on
/// its own. Used for links like "the block a value lives in" or "the parent
/// in the dominator tree", which are absent only briefly or only at a root.
#[derive(Clone, Copy, PartialEq, PartialOrd, Eq, Ord, Hash)]
#[cfg_attr(feature = "enable-serde", derive(Serialize, Deserialize))]
pub struct PackedOption<T: Packable>(T);

impl<T: Packable> PackedOption<T> {
    /// Creates a `None` instance of `PackedOption`.
    #[inline]
    pub fn none() -> Self {
        Self(T::reserved_null())
    }

    /// Creates a `Some` instance of `PackedOption`.
    ///
    /// Panics if `value` is the reserved null value.
    #[inline]
    pub fn some(value: T) -> Self {
        assert!(!value.is_reserved_null());

        Self(value)
    }

    /// Returns `true` if the packed option is a `None` value.
    #[inline]
    pub fn is_none(&self) -> bool {
        self.0.is_reserved_null()
    }

    /// Returns `true` if the packed option is a `Some` value.
    #[inline]
    pub fn is_some(&self) -> bool {
        !self.is_none()
    }

    /// Expand the packed option into a normal `Option` that can
    /// be pattern-matched on as expected.
    #[inline]
    pub fn expand(self) -> Option<T> {
        if self.is_none() {
            None
        } else {
            Some(self.0)
        }
    }

    /// Unwrap a packed `Some` value or panic.
    #[inline]
    pub fn unwrap(self) -> T {
        match self.expand() {
            Some(value) => value,
            None => panic!("called `PackedOption::unwrap()` on a `None` value"),
        }
    }

    /// Takes the value out of the packed option, leaving a `None` in its place.
    ///
    /// ```
    /// # use opal::dense_arena_key;
    /// # use opal::arena::ArenaKey;
    /// # use opal::utility::*;
    /// dense_arena_key! { struct Key; }
    ///
    /// let mut opt = PackedOption::some(Key::new(3));
    /// assert_eq!(opt.take(), Some(Key::new(3)));
    /// assert_eq!(opt.is_none(), true);
    /// ```
    #[inline]
    pub fn take(&mut self) -> Option<T> {
        mem::replace(self, Self::none()).expand()
    }
}

impl<T: Packable> Default for PackedOption<T> {
    fn default() -> Self {
        Self::none()
    }
}

impl<T: Packable> From<Option<T>> for PackedOption<T> {
    fn from(opt: Option<T>) -> Self {
        match opt {
            None => Self::none(),
            Some(t) => Self::some(t),
        }
    }
}

impl<T: Packable> From<PackedOption<T>> for Option<T> {
    fn from(packed: PackedOption<T>) -> Self {
        packed.expand()
    }
}

impl<T> Debug for PackedOption<T>
where
    T: Packable + Debug,
{
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        match self.0.is_reserved_null() {
            true => f.write_str("None"),
            false => f.debug_tuple("Some").field(&self.0).finish(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arena::{ArenaKey, ArenaMap};
    use crate::dense_arena_key;
    use static_assertions::assert_eq_size;

    dense_arena_key! { struct KeyTy; }

    #[test]
    fn observer_methods() {
        let mut map = ArenaMap::default();
        let key: KeyTy = map.insert("Hello!");

        let none = PackedOption::<KeyTy>::default();
        let mut some = PackedOption::some(key);

        assert!(none.is_none());
        assert!(!none.is_some());
        assert!(!some.is_none());
        assert!(some.is_some());
        assert_eq!(some.expand(), Some(key));

        some = none;

        assert!(some.is_none());
        assert_eq!(Option::<KeyTy>::from(some), None);
    }

    #[test]
    fn packed_is_same_size_as_key() {
        assert_eq_size!(PackedOption<KeyTy>, KeyTy);
    }

    #[test]
    fn debug_matches_option() {
        let some = PackedOption::some(KeyTy::new(2));

        assert_eq!(format!("{some:?}"), "Some(KeyTy(2))");
        assert_eq!(format!("{:?}", PackedOption::<KeyTy>::none()), "None");
    }

    #[test]
    #[should_panic]
    fn some_rejects_null() {
        let _ = PackedOption::some(KeyTy::reserved_null());
    }
}
