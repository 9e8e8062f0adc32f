//======---------------------------------------------------------------======//
//                                                                           //
// Copyright 2022-2023 Evan Cox <evanacox00@gmail.com>. All rights reserved. //
//                                                                           //
// Use of this source code is governed by a BSD-style license that can be    //
// found in the LICENSE.txt file at the root of this project, or at the      //
// following link: https://opensource.org/licenses/BSD-3-Clause              //
//                                                                           //
//======---------------------------------------------------------------======//

use smallvec::{smallvec, SmallVec};
use std::any::{Any, TypeId};

/// Marker for [`Func::postorder`](crate::ir::Func::postorder).
pub struct PostorderAnalysis;

/// Marker for [`Func::idom`](crate::ir::Func::idom).
pub struct DominatorTreeAnalysis;

/// Marker for [`Func::sdom`](crate::ir::Func::sdom).
pub struct SparseTreeAnalysis;

/// Marker for [`Func::loopnest`](crate::ir::Func::loopnest).
pub struct LoopNestAnalysis;

struct All;

/// Models the set of analyses that a given transformation pass
/// preserves.
///
/// This is not a contract that is checked, it is expected the the transform knows what
/// analyses it can preserve. If it reports incorrectly, later passes will see stale
/// dominators or loops and can miscompile or panic.
#[derive(Debug, Clone)]
pub struct PreservedAnalyses {
    // sorted so we can binary_search for `contains`
    preserved: SmallVec<[TypeId; 4]>,
}

impl PreservedAnalyses {
    /// Returns a [`PreservedAnalyses`] that marks every analysis as preserved.
    pub fn all() -> Self {
        Self {
            preserved: smallvec![TypeId::of::<All>()],
        }
    }

    /// Returns a [`PreservedAnalyses`] that marks every analysis as invalidated.
    pub fn none() -> Self {
        Self {
            preserved: smallvec![],
        }
    }

    /// Preserves everything derived from the shape of the CFG. This is what a
    /// pass that only rewrites values (and never touches an edge) returns.
    pub fn cfg() -> Self {
        let mut preserved = Self::none();

        preserved.preserve::<PostorderAnalysis>();
        preserved.preserve::<DominatorTreeAnalysis>();
        preserved.preserve::<SparseTreeAnalysis>();
        preserved.preserve::<LoopNestAnalysis>();

        preserved
    }

    /// Checks if *all* analyses are preserved by a given transformation. If this
    /// is true, the transformation effectively reports to have not changed
    /// *anything* in the IR.
    ///
    /// This cannot be obtained in any way except [`Self::all`].
    pub fn preserves_all(&self) -> bool {
        self.preserved.len() == 1 && self.preserved[0] == TypeId::of::<All>()
    }

    /// Reports that an analysis is preserved by the current transformation.
    pub fn preserve<T: Any>(&mut self) {
        if !self.preserves_all() {
            self.insert(TypeId::of::<T>())
        }
    }

    /// Gets the intersection of two sets of preserved analyses, returning
    /// the analyses that are preserved both by `self` and by `other`.
    pub fn intersect(self, other: PreservedAnalyses) -> PreservedAnalyses {
        if self.preserves_all() {
            return other;
        }

        if other.preserves_all() {
            return self;
        }

        let mut new = PreservedAnalyses::none();
        let intersection = self.preserved.into_iter().filter(|id| other.contains(*id));

        for id in intersection {
            new.insert(id)
        }

        new
    }

    /// Checks if an analysis is preserved. If all are preserved
    /// or an analysis with an equivalent [`TypeId`] has been preserved
    /// with [`Self::preserve`], this returns `true`.
    pub fn is_preserved(&self, id: TypeId) -> bool {
        self.preserves_all() || self.contains(id)
    }

    fn contains(&self, id: TypeId) -> bool {
        self.preserved.binary_search(&id).is_ok()
    }

    fn insert(&mut self, id: TypeId) {
        if let Err(pos) = self.preserved.binary_search(&id) {
            self.preserved.insert(pos, id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn is<T: Any>(p: &PreservedAnalyses) -> bool {
        p.is_preserved(TypeId::of::<T>())
    }

    #[test]
    fn all_and_none() {
        let all = PreservedAnalyses::all();
        let none = PreservedAnalyses::none();

        assert!(all.preserves_all());
        assert!(is::<LoopNestAnalysis>(&all));
        assert!(!none.preserves_all());
        assert!(!is::<PostorderAnalysis>(&none));
    }

    #[test]
    fn intersection() {
        let mut dom = PreservedAnalyses::none();

        dom.preserve::<DominatorTreeAnalysis>();
        dom.preserve::<SparseTreeAnalysis>();

        let both = PreservedAnalyses::cfg().intersect(dom.clone());

        assert!(is::<DominatorTreeAnalysis>(&both));
        assert!(is::<SparseTreeAnalysis>(&both));
        assert!(!is::<LoopNestAnalysis>(&both));

        let same = PreservedAnalyses::all().intersect(dom);

        assert!(!same.preserves_all());
        assert!(is::<SparseTreeAnalysis>(&same));
        assert!(!is::<PostorderAnalysis>(&same));
    }
}
