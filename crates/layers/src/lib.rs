//! Immutable layer trees: the raw input form, the read-only arena view
//! with id lookup, and ordering diffs between tree versions.

pub mod layer;
pub mod reorder;
pub mod store;

pub use layer::RawLayer;
pub use reorder::{children_order_diff, layer_order_diff};
pub use store::{LayerRecord, LayerRef, LayerTree, TreeError};
