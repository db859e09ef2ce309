//! Flat parent-referencing rows → ordered forest.
//!
//! Companies and menus are both stored as adjacency lists (`parent_id`
//! columns). [`assemble`] turns either into the nested shape the UI renders,
//! and the output depends only on the set of rows, never on the order the
//! store happened to return them in.

use serde::Serialize;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::hash::Hash;

/// Accessors the assembler needs from a row
pub trait TreeNode {
    type Id: Copy + Eq + Hash + Ord;
    type Key: Ord;

    fn node_id(&self) -> Self::Id;
    fn parent_id(&self) -> Option<Self::Id>;

    /// Sibling ordering key; ties are broken by id ascending
    fn sort_key(&self) -> Self::Key;
}

/// A node together with its ordered children.
///
/// Serializes as the node's own fields plus a `children` array.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TreeItem<N> {
    #[serde(flatten)]
    pub node: N,
    pub children: Vec<TreeItem<N>>,
}

impl<N> TreeItem<N> {
    pub fn leaf(node: N) -> Self {
        Self {
            node,
            children: Vec::new(),
        }
    }

    /// Number of nodes in this subtree, including itself
    pub fn size(&self) -> usize {
        1 + self.children.iter().map(TreeItem::size).sum::<usize>()
    }

    /// Pre-order walk yielding each node with its depth
    pub fn walk<'a>(&'a self, depth: usize, visit: &mut dyn FnMut(&'a N, usize)) {
        visit(&self.node, depth);
        for child in &self.children {
            child.walk(depth + 1, visit);
        }
    }
}

fn compare<N: TreeNode>(a: &N, b: &N) -> Ordering {
    a.sort_key()
        .cmp(&b.sort_key())
        .then_with(|| a.node_id().cmp(&b.node_id()))
}

/// Build an ordered forest from flat rows.
///
/// - A row whose parent is present becomes that parent's child.
/// - A row with no parent, or whose parent is missing from the input, is a root.
/// - Siblings and roots are ordered by [`TreeNode::sort_key`], then id.
/// - Each distinct id appears exactly once; for duplicate ids the first row in
///   sorted order is kept.
/// - Rows caught in a parent cycle are never lost: the smallest unplaced row
///   is promoted to a root and the cycle is cut where it closes.
pub fn assemble<N: TreeNode>(nodes: impl IntoIterator<Item = N>) -> Vec<TreeItem<N>> {
    let mut rows: Vec<N> = nodes.into_iter().collect();
    rows.sort_by(compare);

    let mut index: HashMap<N::Id, usize> = HashMap::with_capacity(rows.len());
    rows.retain(|row| {
        let next = index.len();
        match index.entry(row.node_id()) {
            std::collections::hash_map::Entry::Occupied(_) => false,
            std::collections::hash_map::Entry::Vacant(slot) => {
                slot.insert(next);
                true
            }
        }
    });

    // Rows are already in final order, so pushing indices keeps every
    // child list sorted without a second pass.
    let mut children: Vec<Vec<usize>> = vec![Vec::new(); rows.len()];
    let mut root_slots = Vec::new();
    for (i, row) in rows.iter().enumerate() {
        match row.parent_id().and_then(|p| index.get(&p).copied()) {
            Some(parent) if parent != i => children[parent].push(i),
            _ => root_slots.push(i),
        }
    }

    let mut slots: Vec<Option<N>> = rows.into_iter().map(Some).collect();
    let mut placed = vec![false; slots.len()];
    let mut roots: Vec<(usize, TreeItem<N>)> = Vec::with_capacity(root_slots.len());

    for i in root_slots {
        if let Some(item) = build(i, &mut slots, &children, &mut placed) {
            roots.push((i, item));
        }
    }

    for i in 0..slots.len() {
        if !placed[i] {
            tracing::warn!("tree input contains a parent cycle; promoting row {} to root", i);
            if let Some(item) = build(i, &mut slots, &children, &mut placed) {
                roots.push((i, item));
            }
        }
    }

    roots.sort_by_key(|(i, _)| *i);
    roots.into_iter().map(|(_, item)| item).collect()
}

/// Materialize the subtree under row `i` from rows not yet placed.
///
/// Iterative so that long parent chains cannot exhaust the stack: a
/// pre-order pass claims rows, then items are built leaves first.
fn build<N>(
    i: usize,
    slots: &mut [Option<N>],
    children: &[Vec<usize>],
    placed: &mut [bool],
) -> Option<TreeItem<N>> {
    if placed[i] {
        return None;
    }
    placed[i] = true;

    let mut pending = vec![i];
    let mut order = Vec::new();
    let mut claimed: HashMap<usize, Vec<usize>> = HashMap::new();
    while let Some(row) = pending.pop() {
        order.push(row);
        let mine: Vec<usize> = children[row]
            .iter()
            .copied()
            .filter(|&child| !std::mem::replace(&mut placed[child], true))
            .collect();
        pending.extend(mine.iter().copied());
        claimed.insert(row, mine);
    }

    // Every row comes after its parent in `order`
    let mut built: HashMap<usize, TreeItem<N>> = HashMap::with_capacity(order.len());
    for &row in order.iter().rev() {
        let Some(node) = slots[row].take() else {
            continue;
        };
        let mut item = TreeItem::leaf(node);
        for child in claimed.remove(&row).unwrap_or_default() {
            if let Some(sub) = built.remove(&child) {
                item.children.push(sub);
            }
        }
        built.insert(row, item);
    }
    built.remove(&i)
}
