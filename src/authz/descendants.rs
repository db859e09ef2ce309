use std::collections::{BTreeSet, HashMap};

use crate::tree::TreeNode;

/// Descendant closure of `root`: the root itself plus every row reachable by
/// following child links downward.
///
/// An unknown root yields `{root}`, so a caller always keeps at least their
/// own company in scope. Traversal tracks visited ids and terminates on
/// corrupt input that contains a parent cycle.
pub fn descendants<N: TreeNode>(nodes: &[N], root: N::Id) -> BTreeSet<N::Id> {
    let mut children: HashMap<N::Id, Vec<N::Id>> = HashMap::new();
    for node in nodes {
        if let Some(parent) = node.parent_id() {
            children.entry(parent).or_default().push(node.node_id());
        }
    }

    let mut visited = BTreeSet::new();
    visited.insert(root);
    let mut pending = vec![root];

    while let Some(current) = pending.pop() {
        if let Some(kids) = children.get(&current) {
            for &kid in kids {
                if visited.insert(kid) {
                    pending.push(kid);
                }
            }
        }
    }

    visited
}
