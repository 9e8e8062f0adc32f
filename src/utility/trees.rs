//======---------------------------------------------------------------======//
//                                                                           //
// Copyright 2022-2023 Evan Cox <evanacox00@gmail.com>. All rights reserved. //
//                                                                           //
// Use of this source code is governed by a BSD-style license that can be    //
// found in the LICENSE.txt file at the root of this project, or at the      //
// following link: https://opensource.org/licenses/BSD-3-Clause              //
//                                                                           //
//======---------------------------------------------------------------======//

/// Models a type that can be traversed in a tree-like fashion, e.g. the
/// dominator tree. This only exists for debug output.
///
/// Nothing in the hot path of a pass should go through this, `children`
/// is allowed to allocate.
pub trait IntoTree {
    /// The node type of the tree
    type Node: Copy;

    /// Returns the root tree node
    fn root(&self) -> Self::Node;

    /// Returns the list of children that a given node has, in display order
    fn children(&self, node: Self::Node) -> Vec<Self::Node>;
}

/// Renders a tree with box-drawing guides, one node per line:
///
/// ```none
/// b0
/// ├── b1
/// │   ├── b2
/// │   └── b3
/// └── b4
///     └── b5
/// ```
pub fn stringify_tree<T, F>(tree: &T, mut stringify: F) -> String
where
    T: IntoTree,
    F: FnMut(T::Node) -> String,
{
    let mut out = String::new();

    // (node, prefix for its children, guide drawn before the node itself)
    let mut stack = vec![(tree.root(), String::new(), String::new())];

    while let Some((node, prefix, guide)) = stack.pop() {
        out += &guide;
        out += &stringify(node);
        out.push('\n');

        let children = tree.children(node);
        let last = children.len().wrapping_sub(1);

        // pushed in reverse so the first child is printed first
        for (i, child) in children.into_iter().enumerate().rev() {
            let (branch, extend) = if i == last {
                ("└── ", "    ")
            } else {
                ("├── ", "│   ")
            };

            stack.push((child, format!("{prefix}{extend}"), format!("{prefix}{branch}")));
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Parents(Vec<Option<usize>>);

    impl IntoTree for Parents {
        type Node = usize;

        fn root(&self) -> usize {
            0
        }

        fn children(&self, node: usize) -> Vec<usize> {
            (0..self.0.len())
                .filter(|&i| self.0[i] == Some(node))
                .collect()
        }
    }

    #[test]
    fn renders_nested_children() {
        //     0
        //   1   4
        //  2 3 5 8
        //     6 7
        let tree = Parents(vec![
            None,
            Some(0),
            Some(1),
            Some(1),
            Some(0),
            Some(4),
            Some(5),
            Some(5),
            Some(4),
        ]);

        let expected = "\
b0
├── b1
│   ├── b2
│   └── b3
└── b4
    ├── b5
    │   ├── b6
    │   └── b7
    └── b8
";

        assert_eq!(stringify_tree(&tree, |n| format!("b{n}")), expected);
    }

    #[test]
    fn single_node() {
        let tree = Parents(vec![None]);

        assert_eq!(stringify_tree(&tree, |n| n.to_string()), "0\n");
    }
}
