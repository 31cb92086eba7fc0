//! Read-only, identity-stable view over a layer tree.
//!
//! [`LayerTree::new`] copies a [`RawLayer`] once into an arena (pre-order)
//! and indexes every id. Lookups hand out [`LayerRef`]s into that arena, so
//! the same id always resolves to the same [`LayerRecord`] and consumers can
//! detect changes by identity.
//!
//! Nothing in the view can be written. Records have no setters and private
//! fields:
//!
//! ```compile_fail
//! use layers::{LayerTree, RawLayer};
//!
//! let tree = LayerTree::new(RawLayer::new("root"));
//! tree.root().record().id = String::from("other");
//! ```
//!
//! ```compile_fail
//! use layers::{LayerTree, RawLayer};
//!
//! let tree = LayerTree::new(RawLayer::new("root").with_title("Scene"));
//! let title: &mut Option<String> = &mut tree.root().title;
//! ```
//!
//! To change the tree, build a new one, e.g. with [`LayerTree::with_patch`].

use foundation::{Arena, ArenaIndex};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::fmt;
use std::ops::Deref;
use thiserror::Error;
use tracing::debug;

use crate::layer::RawLayer;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TreeError {
    #[error("layer not found: {0}")]
    NotFound(String),
}

/// One wrapped layer. Only reachable through a [`LayerTree`].
#[derive(Debug)]
pub struct LayerRecord {
    id: String,
    title: Option<String>,
    is_visible: Option<bool>,
    extra: Map<String, Value>,
    group: bool,
    depth: usize,
    parent: Option<ArenaIndex>,
    children: Vec<ArenaIndex>,
}

impl LayerRecord {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    /// Explicit visibility flag, if the input carried one.
    pub fn visibility(&self) -> Option<bool> {
        self.is_visible
    }

    /// Layers are visible unless flagged otherwise.
    pub fn is_visible(&self) -> bool {
        self.is_visible.unwrap_or(true)
    }

    /// Any other input field (`extensionId`, `property`, ...).
    pub fn field(&self, key: &str) -> Option<&Value> {
        self.extra.get(key)
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.extra
    }

    pub fn is_group(&self) -> bool {
        self.group
    }

    /// Root is at depth 0.
    pub fn depth(&self) -> usize {
        self.depth
    }
}

/// Handle to a layer inside a [`LayerTree`].
///
/// Equality is identity: two refs are equal when they point at the same
/// record of the same tree.
#[derive(Copy, Clone)]
pub struct LayerRef<'a> {
    tree: &'a LayerTree,
    index: ArenaIndex,
}

impl<'a> LayerRef<'a> {
    pub fn record(&self) -> &'a LayerRecord {
        &self.tree.nodes[self.index]
    }

    pub fn index(&self) -> ArenaIndex {
        self.index
    }

    pub fn id(&self) -> &'a str {
        &self.record().id
    }

    pub fn title(&self) -> Option<&'a str> {
        self.record().title.as_deref()
    }

    pub fn parent(self) -> Option<LayerRef<'a>> {
        self.record().parent.map(|index| self.tree.at(index))
    }

    pub fn children(self) -> impl Iterator<Item = LayerRef<'a>> {
        let tree = self.tree;
        self.record().children.iter().map(move |&index| tree.at(index))
    }

    pub fn child_ids(&self) -> Vec<&'a str> {
        self.children().map(|c| c.id()).collect()
    }

    /// Parent first, root last.
    pub fn ancestors(self) -> impl Iterator<Item = LayerRef<'a>> {
        std::iter::successors(self.parent(), |layer| layer.parent())
    }

    /// Visible itself and through every ancestor.
    pub fn is_effectively_visible(&self) -> bool {
        self.is_visible() && self.ancestors().all(|a| a.is_visible())
    }

    /// Rebuilds the input form of this subtree.
    pub fn to_raw(&self) -> RawLayer {
        // Pre-order indices of the subtree; built in reverse so every child
        // exists before its parent.
        let mut order: Vec<ArenaIndex> = Vec::new();
        let mut stack = vec![self.index];
        while let Some(index) = stack.pop() {
            order.push(index);
            stack.extend(self.tree.nodes[index].children.iter().rev());
        }

        let mut built: HashMap<ArenaIndex, RawLayer> = HashMap::with_capacity(order.len());
        for &index in order.iter().rev() {
            let record = &self.tree.nodes[index];
            let children = record.group.then(|| {
                record
                    .children
                    .iter()
                    .filter_map(|child| built.remove(child))
                    .collect()
            });
            built.insert(
                index,
                RawLayer {
                    id: record.id.clone(),
                    title: record.title.clone(),
                    is_visible: record.is_visible,
                    children,
                    extra: record.extra.clone(),
                },
            );
        }
        built.remove(&self.index).unwrap_or_default()
    }
}

impl<'a> Deref for LayerRef<'a> {
    type Target = LayerRecord;

    fn deref(&self) -> &LayerRecord {
        self.record()
    }
}

impl PartialEq for LayerRef<'_> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.record(), other.record())
    }
}

impl Eq for LayerRef<'_> {}

impl fmt::Debug for LayerRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LayerRef")
            .field("id", &self.record().id)
            .field("index", &self.index.index())
            .finish()
    }
}

/// Immutable layer tree with id lookup.
#[derive(Debug)]
pub struct LayerTree {
    nodes: Arena<LayerRecord>,
    by_id: HashMap<String, ArenaIndex>,
    root: ArenaIndex,
}

impl LayerTree {
    pub fn new(root: RawLayer) -> Self {
        let mut nodes: Arena<LayerRecord> = Arena::new();
        let mut by_id: HashMap<String, ArenaIndex> = HashMap::new();

        // Explicit stack so deep trees cannot overflow; children are pushed
        // reversed to allocate in pre-order.
        let mut stack: Vec<(RawLayer, ArenaIndex, usize)> = Vec::new();
        let root = alloc_layer(&mut nodes, &mut by_id, &mut stack, root, None, 0);
        while let Some((raw, parent, depth)) = stack.pop() {
            alloc_layer(&mut nodes, &mut by_id, &mut stack, raw, Some(parent), depth);
        }

        debug!(layers = nodes.len(), "built layer tree");
        Self { nodes, by_id, root }
    }

    fn at(&self, index: ArenaIndex) -> LayerRef<'_> {
        LayerRef { tree: self, index }
    }

    pub fn root(&self) -> LayerRef<'_> {
        self.at(self.root)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn find_by_id(&self, id: &str) -> Option<LayerRef<'_>> {
        self.by_id.get(id).map(|&index| self.at(index))
    }

    /// One result per requested id, in request order.
    pub fn find_by_ids<I>(&self, ids: I) -> Vec<Option<LayerRef<'_>>>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        ids.into_iter()
            .map(|id| self.find_by_id(id.as_ref()))
            .collect()
    }

    /// Every layer in pre-order.
    pub fn iter(&self) -> impl Iterator<Item = LayerRef<'_>> + '_ {
        self.nodes.iter().map(|(index, _)| self.at(index))
    }

    /// First layer in pre-order matching `predicate`.
    pub fn find(&self, predicate: impl Fn(&LayerRecord) -> bool) -> Option<LayerRef<'_>> {
        self.iter().find(|layer| predicate(layer.record()))
    }

    pub fn find_all(&self, predicate: impl Fn(&LayerRecord) -> bool) -> Vec<LayerRef<'_>> {
        self.iter().filter(|layer| predicate(layer.record())).collect()
    }

    /// Data layers (non-groups) that are visible through their whole
    /// ancestor chain, in pre-order.
    pub fn visible_leaves(&self) -> Vec<LayerRef<'_>> {
        self.iter()
            .filter(|layer| !layer.is_group() && layer.is_effectively_visible())
            .collect()
    }

    pub fn to_raw(&self) -> RawLayer {
        self.root().to_raw()
    }

    /// Returns a new tree with `patch` applied to the first layer with `id`.
    /// `self` is left untouched.
    pub fn with_patch(
        &self,
        id: &str,
        patch: impl FnOnce(&mut RawLayer),
    ) -> Result<LayerTree, TreeError> {
        if self.find_by_id(id).is_none() {
            return Err(TreeError::NotFound(id.to_string()));
        }
        let mut raw = self.to_raw();
        let target = raw
            .find_mut(id)
            .ok_or_else(|| TreeError::NotFound(id.to_string()))?;
        patch(target);
        Ok(LayerTree::new(raw))
    }
}

impl From<RawLayer> for LayerTree {
    fn from(root: RawLayer) -> Self {
        LayerTree::new(root)
    }
}

fn alloc_layer(
    nodes: &mut Arena<LayerRecord>,
    by_id: &mut HashMap<String, ArenaIndex>,
    stack: &mut Vec<(RawLayer, ArenaIndex, usize)>,
    raw: RawLayer,
    parent: Option<ArenaIndex>,
    depth: usize,
) -> ArenaIndex {
    let RawLayer {
        id,
        title,
        is_visible,
        children,
        extra,
    } = raw;

    let index = nodes.alloc(LayerRecord {
        id: id.clone(),
        title,
        is_visible,
        extra,
        group: children.is_some(),
        depth,
        parent,
        children: Vec::new(),
    });

    match by_id.entry(id) {
        Entry::Vacant(slot) => {
            slot.insert(index);
        }
        Entry::Occupied(slot) => {
            debug!(id = slot.key().as_str(), "duplicate layer id, keeping first");
        }
    }

    if let Some(parent) = parent.and_then(|p| nodes.get_mut(p)) {
        parent.children.push(index);
    }

    for child in children.into_iter().flatten().rev() {
        stack.push((child, index, depth + 1));
    }
    index
}

#[cfg(test)]
mod tests {
    use super::{LayerTree, TreeError};
    use crate::layer::RawLayer;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;
    use serde_json::json;

    fn scenario() -> LayerTree {
        let raw: RawLayer = serde_json::from_value(json!({
            "id": "",
            "children": [{ "id": "a", "children": [{ "id": "b" }] }]
        }))
        .unwrap();
        LayerTree::new(raw)
    }

    fn scene() -> LayerTree {
        LayerTree::new(RawLayer::new("root").with_children(vec![
            RawLayer::new("g1").with_title("Buildings").with_children(vec![
                RawLayer::new("l1").with_field("extensionId", "marker"),
                RawLayer::new("l2").with_visible(false),
            ]),
            RawLayer::new("g2").with_visible(false).with_children(vec![RawLayer::new("l3")]),
            RawLayer::new("l4"),
            RawLayer::new("g3").with_children(Vec::new()),
        ]))
    }

    #[test]
    fn finds_layers_by_id() {
        let tree = scenario();
        assert_eq!(tree.find_by_id("a").map(|l| l.id()), Some("a"));
        assert_eq!(tree.find_by_id("b").map(|l| l.id()), Some("b"));
        assert!(tree.find_by_id("c").is_none());
        assert_eq!(tree.root().id(), "");
    }

    #[test]
    fn find_by_ids_keeps_request_order() {
        let tree = scenario();
        let a = tree.find_by_id("a").unwrap();
        let b = tree.find_by_id("b").unwrap();
        assert_eq!(tree.find_by_ids(["a", "c", "b"]), vec![Some(a), None, Some(b)]);
        assert_eq!(tree.find_by_ids(["b", "a"]), vec![Some(b), Some(a)]);
        assert_eq!(tree.find_by_ids(Vec::<String>::new()), Vec::new());
    }

    #[test]
    fn lookups_are_identity_stable() {
        let tree = scene();
        for id in ["root", "g1", "l1", "l2", "g2", "l3", "l4", "g3"] {
            let first = tree.find_by_id(id).unwrap();
            let second = tree.find_by_id(id).unwrap();
            assert!(std::ptr::eq(first.record(), second.record()), "{id}");
        }
        assert!(std::ptr::eq(tree.root().record(), tree.root().record()));

        let via_children = tree.root().children().next().unwrap();
        assert_eq!(via_children, tree.find_by_id("g1").unwrap());
    }

    #[test]
    fn refs_from_different_trees_are_not_equal() {
        let a = scenario();
        let b = scenario();
        assert_ne!(a.root(), b.root());
    }

    #[test]
    fn exposes_fields_read_only() {
        let tree = scene();
        let l1 = tree.find_by_id("l1").unwrap();
        assert_eq!(l1.field("extensionId"), Some(&json!("marker")));
        assert_eq!(l1.depth(), 2);
        assert_eq!(l1.parent().map(|p| p.id()), Some("g1"));
        let g1 = tree.find_by_id("g1").unwrap();
        assert_eq!(g1.title(), Some("Buildings"));
        assert!(g1.is_group());
        assert!(tree.find_by_id("g3").unwrap().is_group());
        assert!(!l1.is_group());
        assert_eq!(g1.child_ids(), vec!["l1", "l2"]);
    }

    #[test]
    fn iterates_in_pre_order() {
        let tree = scene();
        let ids: Vec<&str> = tree.iter().map(|l| l.id()).collect();
        assert_eq!(ids, vec!["root", "g1", "l1", "l2", "g2", "l3", "l4", "g3"]);
        assert_eq!(tree.node_count(), 8);
    }

    #[test]
    fn duplicate_ids_resolve_to_first_in_pre_order() {
        let tree = LayerTree::new(RawLayer::new("root").with_children(vec![
            RawLayer::new("g").with_children(vec![RawLayer::new("x").with_title("deep")]),
            RawLayer::new("x").with_title("shallow"),
        ]));
        assert_eq!(tree.find_by_id("x").and_then(|l| l.title()), Some("deep"));
    }

    #[test]
    fn childless_root() {
        let tree = LayerTree::new(RawLayer::new("only"));
        assert_eq!(tree.node_count(), 1);
        assert_eq!(tree.root().children().count(), 0);
        assert!(tree.root().parent().is_none());
    }

    #[test]
    fn find_and_find_all_use_pre_order() {
        let tree = scene();
        assert_eq!(tree.find(|l| l.id().starts_with('l')).map(|l| l.id()), Some("l1"));
        let hidden: Vec<&str> = tree.find_all(|l| !l.is_visible()).iter().map(|l| l.id()).collect();
        assert_eq!(hidden, vec!["l2", "g2"]);
    }

    #[test]
    fn visible_leaves_respect_ancestors() {
        let tree = scene();
        let ids: Vec<&str> = tree.visible_leaves().iter().map(|l| l.id()).collect();
        assert_eq!(ids, vec!["l1", "l4"]);
        let l3 = tree.find_by_id("l3").unwrap();
        let chain: Vec<&str> = l3.ancestors().map(|a| a.id()).collect();
        assert_eq!(chain, vec!["g2", "root"]);
    }

    #[test]
    fn to_raw_round_trips_the_input() {
        let raw = RawLayer::new("root").with_children(vec![
            RawLayer::new("g").with_children(Vec::new()),
            RawLayer::new("l").with_visible(false).with_field("opacity", 0.5),
        ]);
        assert_eq!(LayerTree::new(raw.clone()).to_raw(), raw);
    }

    #[test]
    fn patching_builds_a_new_tree() {
        let tree = scene();
        let before = tree.find_by_id("l2").unwrap();

        let patched = tree
            .with_patch("l2", |layer| layer.is_visible = Some(true))
            .unwrap();
        assert!(patched.find_by_id("l2").unwrap().is_visible());
        assert!(!before.is_visible());
        assert!(!tree.find_by_id("l2").unwrap().is_visible());

        assert_eq!(
            tree.with_patch("nope", |_| {}).unwrap_err(),
            TreeError::NotFound("nope".to_string())
        );
    }

    #[test]
    fn patching_a_deep_chain_does_not_recurse() {
        let mut raw = RawLayer::new("leaf").with_visible(false);
        for depth in (0..100_000).rev() {
            raw = RawLayer::new(format!("g{depth}")).with_children(vec![raw]);
        }
        let tree = LayerTree::from(raw);
        assert_eq!(tree.node_count(), 100_001);

        let patched = tree
            .with_patch("leaf", |layer| layer.is_visible = Some(true))
            .unwrap();
        let leaf = patched.find_by_id("leaf").unwrap();
        assert_eq!(leaf.depth(), 100_000);
        assert!(leaf.is_effectively_visible());
        assert_eq!(patched.visible_leaves(), vec![leaf]);
        assert_eq!(
            tree.with_patch("missing", |_| {}).unwrap_err(),
            TreeError::NotFound("missing".to_string())
        );
    }

    #[test]
    fn raw_flags_and_fields_stay_as_given() {
        let tree = scene();
        assert_eq!(tree.find_by_id("l2").unwrap().visibility(), Some(false));
        assert_eq!(tree.find_by_id("l4").unwrap().visibility(), None);
        let l1 = tree.find_by_id("l1").unwrap();
        assert_eq!(l1.fields().len(), 1);
        assert_eq!(l1.fields().get("extensionId"), Some(&json!("marker")));
    }

    #[test]
    fn tree_is_shareable_across_threads() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<LayerTree>();
    }

    fn arb_layer() -> impl Strategy<Value = RawLayer> {
        let leaf = any::<u16>().prop_map(|n| RawLayer::new(format!("l{n}")));
        leaf.prop_recursive(4, 48, 6, |inner| {
            (any::<u16>(), prop::collection::vec(inner, 0..6))
                .prop_map(|(n, children)| RawLayer::new(format!("g{n}")).with_children(children))
        })
    }

    proptest! {
        #[test]
        fn every_id_resolves_stably(raw in arb_layer()) {
            let tree = LayerTree::new(raw);
            let ids: Vec<String> = tree.iter().map(|l| l.id().to_string()).collect();
            for id in &ids {
                let a = tree.find_by_id(id).unwrap();
                let b = tree.find_by_id(id).unwrap();
                prop_assert!(std::ptr::eq(a.record(), b.record()));
                prop_assert_eq!(a.id(), id.as_str());
            }

            let mut requested = ids.clone();
            requested.reverse();
            requested.push("missing".to_string());
            let got = tree.find_by_ids(&requested);
            prop_assert_eq!(got.len(), requested.len());
            for (id, layer) in requested.iter().zip(&got) {
                prop_assert_eq!(layer.map(|l| l.id()), tree.find_by_id(id).map(|l| l.id()));
            }
        }
    }
}
