pub mod arena;
pub mod diff;

// Foundation crate: small, well-tested primitives only.
pub use arena::*;
pub use diff::*;
