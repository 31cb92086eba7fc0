//! Ordering changes between two versions of a layer tree.

use foundation::{DiffEntry, array_diff};

use crate::store::LayerTree;

/// Diff of the child ids of `group_id` between `old` and `new`.
///
/// A group missing from either tree contributes an empty child list, so a
/// group that appeared reports all its children as added.
pub fn children_order_diff<'a>(
    old: &'a LayerTree,
    new: &'a LayerTree,
    group_id: &str,
) -> Vec<DiffEntry<&'a str>> {
    let child_ids = |tree: &'a LayerTree| {
        tree.find_by_id(group_id)
            .map(|group| group.child_ids())
            .unwrap_or_default()
    };
    array_diff(&child_ids(old), &child_ids(new))
}

/// Diff of every layer id in pre-order.
pub fn layer_order_diff<'a>(old: &'a LayerTree, new: &'a LayerTree) -> Vec<DiffEntry<&'a str>> {
    let ids = |tree: &'a LayerTree| tree.iter().map(|l| l.id()).collect::<Vec<_>>();
    array_diff(&ids(old), &ids(new))
}
