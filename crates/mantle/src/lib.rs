//! Style evaluation for map features: expression values, operators, the
//! evaluator and per-feature layer style application.

pub mod error;
pub mod evaluator;
pub mod expression;
pub mod feature;
pub mod ops;
pub mod style;
pub mod value;

pub use error::*;
pub use evaluator::{evaluate, evaluate_all};
pub use expression::*;
pub use feature::*;
pub use ops::{BinaryOp, TernaryOp, UnaryOp, lift_binary, lift_ternary, lift_unary};
pub use style::{LayerStyle, StyleRule, StyledFeature};
pub use value::*;
