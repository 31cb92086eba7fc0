//! Style expression AST.
//!
//! Expressions arrive already parsed, either built in code or deserialized
//! from their JSON form:
//!
//! ```json
//! { "kind": "binary", "op": "*",
//!   "left":  { "kind": "unary", "op": "abs", "operand": { "kind": "property", "name": "height" } },
//!   "right": { "kind": "literal", "value": 2 } }
//! ```

use serde::Deserialize;

use crate::error::Result;
use crate::evaluator;
use crate::feature::Feature;
use crate::ops::{BinaryOp, TernaryOp, UnaryOp};
use crate::value::Value;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Expression {
    Literal {
        value: Value,
    },
    /// Feature property lookup; missing properties evaluate to `Undefined`.
    Property {
        name: String,
    },
    /// CSS color text, parsed on evaluation.
    Color {
        css: String,
    },
    /// Builds a vector from numbers and smaller vectors (`vec3(vec2, z)`).
    Vector {
        components: Vec<Expression>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expression>,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expression>,
        right: Box<Expression>,
    },
    Ternary {
        op: TernaryOp,
        args: Box<[Expression; 3]>,
    },
    /// `condition ? then : else`; only the selected branch is evaluated.
    Conditional {
        condition: Box<Expression>,
        then: Box<Expression>,
        #[serde(rename = "else")]
        otherwise: Box<Expression>,
    },
}

impl Expression {
    pub fn literal(value: impl Into<Value>) -> Self {
        Expression::Literal {
            value: value.into(),
        }
    }

    pub fn number(n: f64) -> Self {
        Self::literal(n)
    }

    pub fn property(name: impl Into<String>) -> Self {
        Expression::Property { name: name.into() }
    }

    pub fn color(css: impl Into<String>) -> Self {
        Expression::Color { css: css.into() }
    }

    pub fn vector(components: Vec<Expression>) -> Self {
        Expression::Vector { components }
    }

    pub fn unary(op: UnaryOp, operand: Expression) -> Self {
        Expression::Unary {
            op,
            operand: Box::new(operand),
        }
    }

    pub fn binary(op: BinaryOp, left: Expression, right: Expression) -> Self {
        Expression::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn ternary(op: TernaryOp, a: Expression, b: Expression, c: Expression) -> Self {
        Expression::Ternary {
            op,
            args: Box::new([a, b, c]),
        }
    }

    pub fn conditional(condition: Expression, then: Expression, otherwise: Expression) -> Self {
        Expression::Conditional {
            condition: Box::new(condition),
            then: Box::new(then),
            otherwise: Box::new(otherwise),
        }
    }

    pub fn evaluate(&self, feature: &Feature) -> Result<Value> {
        evaluator::evaluate(self, feature)
    }
}

#[cfg(test)]
mod tests {
    use super::Expression;
    use crate::ops::{BinaryOp, TernaryOp, UnaryOp};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn deserializes_nested_json_form() {
        let expr: Expression = serde_json::from_value(json!({
            "kind": "binary",
            "op": "*",
            "left": {
                "kind": "unary",
                "op": "abs",
                "operand": { "kind": "property", "name": "height" }
            },
            "right": { "kind": "literal", "value": 2 }
        }))
        .unwrap();
        assert_eq!(
            expr,
            Expression::binary(
                BinaryOp::Mul,
                Expression::unary(UnaryOp::Abs, Expression::property("height")),
                Expression::number(2.0),
            )
        );
    }

    #[test]
    fn deserializes_conditional_and_ternary() {
        let expr: Expression = serde_json::from_value(json!({
            "kind": "conditional",
            "condition": { "kind": "property", "name": "visible" },
            "then": {
                "kind": "ternary",
                "op": "clamp",
                "args": [
                    { "kind": "property", "name": "size" },
                    { "kind": "literal", "value": 1 },
                    { "kind": "literal", "value": 10 }
                ]
            },
            "else": { "kind": "color", "css": "#fff" }
        }))
        .unwrap();
        assert_eq!(
            expr,
            Expression::conditional(
                Expression::property("visible"),
                Expression::ternary(
                    TernaryOp::Clamp,
                    Expression::property("size"),
                    Expression::number(1.0),
                    Expression::number(10.0),
                ),
                Expression::color("#fff"),
            )
        );
    }

    #[test]
    fn rejects_unknown_operator_names() {
        let err = serde_json::from_value::<Expression>(json!({
            "kind": "unary",
            "op": "hypot",
            "operand": { "kind": "literal", "value": 1 }
        }))
        .unwrap_err();
        assert!(err.to_string().contains("hypot"), "{err}");
    }
}
