//======---------------------------------------------------------------======//
//                                                                           //
// Copyright 2022-2023 Evan Cox <evanacox00@gmail.com>. All rights reserved. //
//                                                                           //
// Use of this source code is governed by a BSD-style license that can be    //
// found in the LICENSE.txt file at the root of this project, or at the      //
// following link: https://opensource.org/licenses/BSD-3-Clause              //
//                                                                           //
//======---------------------------------------------------------------======//

use std::collections::{HashMap, HashSet};

/// Alias for `std::collections::HashMap<K, V, ahash::RandomState>`. Nearly
/// every key the optimizer hashes is a small integer ID or a tuple of them,
/// which `ahash` handles much faster than SipHash.
///
/// Iteration order of these maps is not stable between runs. Anything that
/// feeds iteration order into the output has to collect and sort first.
pub type SaHashMap<K, V> = HashMap<K, V, ahash::RandomState>;

/// Alias for `std::collections::HashSet<V, ahash::RandomState>`. See [`SaHashMap`].
pub type SaHashSet<V> = HashSet<V, ahash::RandomState>;

/// Collects the keys of a map into a sorted `Vec`, for passes that need to
/// act on hash-map contents in a deterministic order.
pub fn sorted_keys<K: Ord + Copy, V>(map: &SaHashMap<K, V>) -> Vec<K> {
    let mut keys: Vec<K> = map.keys().copied().collect();

    keys.sort_unstable();

    keys
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sorted_keys_ignores_insertion_order() {
        let mut map = SaHashMap::default();

        for k in [9u32, 3, 7, 1] {
            map.insert(k, ());
        }

        assert_eq!(sorted_keys(&map), [1, 3, 7, 9]);
    }
}
