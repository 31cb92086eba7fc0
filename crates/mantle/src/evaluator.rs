//! Recursive-descent evaluation of [`Expression`] trees.
//!
//! Evaluation is depth-first and left to right, holds no state between
//! calls and never mutates the feature, so one expression can be evaluated
//! against many features (also from several threads).

use crate::error::{EvalError, Result};
use crate::expression::Expression;
use crate::feature::Feature;
use crate::value::{Color, Value, VecN};

pub fn evaluate(expression: &Expression, feature: &Feature) -> Result<Value> {
    match expression {
        Expression::Literal { value } => Ok(value.clone()),
        Expression::Property { name } => Ok(feature.property(name)),
        Expression::Color { css } => Color::from_css(css)
            .map(Value::Color)
            .ok_or_else(|| EvalError::type_mismatch("color", &Value::String(css.clone()))),
        Expression::Vector { components } => build_vector(components, feature),
        Expression::Unary { op, operand } => {
            let value = evaluate(operand, feature)?;
            op.apply(&value)
        }
        Expression::Binary { op, left, right } => {
            let left = evaluate(left, feature)?;
            if let Some(decided) = op.short_circuit(&left) {
                return Ok(decided);
            }
            let right = evaluate(right, feature)?;
            op.apply(&left, &right)
        }
        Expression::Ternary { op, args } => {
            let [a, b, c] = &**args;
            let a = evaluate(a, feature)?;
            let b = evaluate(b, feature)?;
            let c = evaluate(c, feature)?;
            op.apply(&a, &b, &c)
        }
        Expression::Conditional {
            condition,
            then,
            otherwise,
        } => {
            let condition = evaluate(condition, feature)?;
            match condition.as_bool() {
                Some(true) => evaluate(then, feature),
                Some(false) => evaluate(otherwise, feature),
                None => Err(EvalError::type_mismatch("?:", &condition)),
            }
        }
    }
}

/// Evaluates one expression against every feature, in order.
pub fn evaluate_all(expression: &Expression, features: &[Feature]) -> Vec<Result<Value>> {
    features.iter().map(|f| evaluate(expression, f)).collect()
}

fn build_vector(components: &[Expression], feature: &Feature) -> Result<Value> {
    let mut flat: Vec<f64> = Vec::with_capacity(4);
    for component in components {
        match evaluate(component, feature)? {
            Value::Number(n) => flat.push(n),
            Value::Vector(v) => flat.extend_from_slice(v.components()),
            other => return Err(EvalError::type_mismatch("vec", &other)),
        }
    }
    VecN::from_slice(&flat)
        .map(Value::Vector)
        .ok_or(EvalError::VectorArity {
            components: flat.len(),
        })
}
