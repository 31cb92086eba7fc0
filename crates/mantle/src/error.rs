use thiserror::Error;

use crate::value::Value;

/// Failure while evaluating a style expression against a feature.
///
/// The evaluator never substitutes defaults; callers that render (see
/// [`crate::style::LayerStyle`]) catch this and fall back.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    #[error("type mismatch: `{operator}` cannot operate on {} {value}", .value.type_name())]
    TypeMismatch { operator: &'static str, value: Value },
    #[error("length mismatch: `{operator}` got operands with {left} and {right} components")]
    LengthMismatch {
        operator: &'static str,
        left: usize,
        right: usize,
    },
    #[error("vector constructor needs 2 to 4 components, got {components}")]
    VectorArity { components: usize },
}

impl EvalError {
    pub fn type_mismatch(operator: &'static str, value: &Value) -> Self {
        EvalError::TypeMismatch {
            operator,
            value: value.clone(),
        }
    }

    /// Name of the operator that rejected its operands, if any.
    pub fn operator(&self) -> Option<&'static str> {
        match self {
            EvalError::TypeMismatch { operator, .. } | EvalError::LengthMismatch { operator, .. } => {
                Some(*operator)
            }
            EvalError::VectorArity { .. } => None,
        }
    }
}

/// Operator name that is not part of the expression language.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown operator `{0}`")]
pub struct UnknownOperator(pub String);

pub type Result<T> = std::result::Result<T, EvalError>;
