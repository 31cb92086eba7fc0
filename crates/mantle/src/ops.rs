//! Operator kinds and their dispatch tables.
//!
//! Each operator enum indexes a static table of `(kind, name, impl)` rows.
//! Scalar functions are lifted componentwise over vectors by
//! [`lift_unary`], [`lift_binary`] and [`lift_ternary`].

use serde::Deserialize;
use std::fmt;
use std::str::FromStr;

use crate::error::{EvalError, Result, UnknownOperator};
use crate::value::{Value, VecN};

/// Applies `f` to a number, or to every component of a vector.
pub fn lift_unary(operator: &'static str, f: impl Fn(f64) -> f64, value: &Value) -> Result<Value> {
    match value {
        Value::Number(n) => Ok(Value::Number(f(*n))),
        Value::Vector(v) => Ok(Value::Vector(v.map(f))),
        other => Err(EvalError::type_mismatch(operator, other)),
    }
}

/// Applies `f` componentwise. A scalar operand is broadcast over a vector
/// operand; two vectors must have the same length.
pub fn lift_binary(
    operator: &'static str,
    f: impl Fn(f64, f64) -> f64,
    left: &Value,
    right: &Value,
) -> Result<Value> {
    let a = Numeric::new(operator, left)?;
    let b = Numeric::new(operator, right)?;
    match (a, b) {
        (Numeric::Scalar(x), Numeric::Scalar(y)) => Ok(Value::Number(f(x, y))),
        (Numeric::Vector(v), Numeric::Scalar(y)) => Ok(Value::Vector(v.map(|x| f(x, y)))),
        (Numeric::Scalar(x), Numeric::Vector(v)) => Ok(Value::Vector(v.map(|y| f(x, y)))),
        (Numeric::Vector(v), Numeric::Vector(w)) => {
            check_len(operator, v, w)?;
            let w = w.components();
            Ok(Value::Vector(v.map_indexed(|i, x| f(x, w[i]))))
        }
    }
}

/// Three-operand form of [`lift_binary`].
pub fn lift_ternary(
    operator: &'static str,
    f: impl Fn(f64, f64, f64) -> f64,
    a: &Value,
    b: &Value,
    c: &Value,
) -> Result<Value> {
    let operands = [
        Numeric::new(operator, a)?,
        Numeric::new(operator, b)?,
        Numeric::new(operator, c)?,
    ];
    let template = operands.iter().find_map(|o| match o {
        Numeric::Vector(v) => Some(*v),
        Numeric::Scalar(_) => None,
    });
    let Some(template) = template else {
        let [x, y, z] = operands.map(|o| o.at(0));
        return Ok(Value::Number(f(x, y, z)));
    };
    for o in &operands {
        if let Numeric::Vector(v) = o {
            check_len(operator, template, v)?;
        }
    }
    Ok(Value::Vector(template.map_indexed(|i, _| {
        f(operands[0].at(i), operands[1].at(i), operands[2].at(i))
    })))
}

#[derive(Copy, Clone)]
enum Numeric<'a> {
    Scalar(f64),
    Vector(&'a VecN),
}

impl<'a> Numeric<'a> {
    fn new(operator: &'static str, value: &'a Value) -> Result<Self> {
        match value {
            Value::Number(n) => Ok(Numeric::Scalar(*n)),
            Value::Vector(v) => Ok(Numeric::Vector(v)),
            other => Err(EvalError::type_mismatch(operator, other)),
        }
    }

    fn at(&self, i: usize) -> f64 {
        match self {
            Numeric::Scalar(x) => *x,
            Numeric::Vector(v) => v.components()[i],
        }
    }
}

fn check_len(operator: &'static str, a: &VecN, b: &VecN) -> Result<()> {
    if a.len() != b.len() {
        return Err(EvalError::LengthMismatch {
            operator,
            left: a.len(),
            right: b.len(),
        });
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Unary
// ---------------------------------------------------------------------------

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Deserialize)]
#[serde(try_from = "String")]
pub enum UnaryOp {
    Abs,
    Sqrt,
    Sin,
    Cos,
    Tan,
    Asin,
    Acos,
    Atan,
    Radians,
    Degrees,
    Sign,
    Floor,
    Ceil,
    Round,
    Exp,
    Exp2,
    Log,
    Log2,
    Fract,
    Negate,
    Not,
    Length,
    Normalize,
}

#[derive(Copy, Clone)]
enum UnaryImpl {
    Componentwise(fn(f64) -> f64),
    Custom(fn(&'static str, &Value) -> Result<Value>),
}

static UNARY_TABLE: [(UnaryOp, &str, UnaryImpl); 23] = [
    (UnaryOp::Abs, "abs", UnaryImpl::Componentwise(f64::abs)),
    (UnaryOp::Sqrt, "sqrt", UnaryImpl::Componentwise(f64::sqrt)),
    (UnaryOp::Sin, "sin", UnaryImpl::Componentwise(f64::sin)),
    (UnaryOp::Cos, "cos", UnaryImpl::Componentwise(f64::cos)),
    (UnaryOp::Tan, "tan", UnaryImpl::Componentwise(f64::tan)),
    (UnaryOp::Asin, "asin", UnaryImpl::Componentwise(f64::asin)),
    (UnaryOp::Acos, "acos", UnaryImpl::Componentwise(f64::acos)),
    (UnaryOp::Atan, "atan", UnaryImpl::Componentwise(f64::atan)),
    (UnaryOp::Radians, "radians", UnaryImpl::Componentwise(f64::to_radians)),
    (UnaryOp::Degrees, "degrees", UnaryImpl::Componentwise(f64::to_degrees)),
    (UnaryOp::Sign, "sign", UnaryImpl::Componentwise(sign)),
    (UnaryOp::Floor, "floor", UnaryImpl::Componentwise(f64::floor)),
    (UnaryOp::Ceil, "ceil", UnaryImpl::Componentwise(f64::ceil)),
    (UnaryOp::Round, "round", UnaryImpl::Componentwise(round_half_up)),
    (UnaryOp::Exp, "exp", UnaryImpl::Componentwise(f64::exp)),
    (UnaryOp::Exp2, "exp2", UnaryImpl::Componentwise(f64::exp2)),
    (UnaryOp::Log, "log", UnaryImpl::Componentwise(f64::ln)),
    (UnaryOp::Log2, "log2", UnaryImpl::Componentwise(f64::log2)),
    (UnaryOp::Fract, "fract", UnaryImpl::Componentwise(fract)),
    (UnaryOp::Negate, "-", UnaryImpl::Componentwise(negate)),
    (UnaryOp::Not, "!", UnaryImpl::Custom(not)),
    (UnaryOp::Length, "length", UnaryImpl::Custom(length)),
    (UnaryOp::Normalize, "normalize", UnaryImpl::Custom(normalize)),
];

impl UnaryOp {
    pub fn name(self) -> &'static str {
        UNARY_TABLE[self as usize].1
    }

    pub fn apply(self, value: &Value) -> Result<Value> {
        let (_, name, imp) = UNARY_TABLE[self as usize];
        match imp {
            UnaryImpl::Componentwise(f) => lift_unary(name, f, value),
            UnaryImpl::Custom(f) => f(name, value),
        }
    }
}

/// Zero keeps its sign; NaN stays NaN.
fn sign(x: f64) -> f64 {
    if x > 0.0 {
        1.0
    } else if x < 0.0 {
        -1.0
    } else {
        x
    }
}

/// Halves round towards positive infinity. Adding 0.5 before flooring would
/// round up just below one half and above 2^52.
fn round_half_up(x: f64) -> f64 {
    let floor = x.floor();
    if x - floor >= 0.5 { floor + 1.0 } else { floor }
}

// `f64::min`/`max` ignore a NaN operand; script min/max return NaN.
fn nan_min(a: f64, b: f64) -> f64 {
    if a.is_nan() || b.is_nan() { f64::NAN } else { a.min(b) }
}

fn nan_max(a: f64, b: f64) -> f64 {
    if a.is_nan() || b.is_nan() { f64::NAN } else { a.max(b) }
}

fn fract(x: f64) -> f64 {
    x - x.floor()
}

fn negate(x: f64) -> f64 {
    -x
}

fn not(operator: &'static str, value: &Value) -> Result<Value> {
    match value {
        Value::Boolean(b) => Ok(Value::Boolean(!b)),
        other => Err(EvalError::type_mismatch(operator, other)),
    }
}

fn length(operator: &'static str, value: &Value) -> Result<Value> {
    match value {
        Value::Number(n) => Ok(Value::Number(n.abs())),
        Value::Vector(v) => Ok(Value::Number(norm(v))),
        other => Err(EvalError::type_mismatch(operator, other)),
    }
}

fn normalize(operator: &'static str, value: &Value) -> Result<Value> {
    match value {
        Value::Number(n) => Ok(Value::Number(n / n.abs())),
        Value::Vector(v) => {
            let len = norm(v);
            Ok(Value::Vector(v.map(|c| c / len)))
        }
        other => Err(EvalError::type_mismatch(operator, other)),
    }
}

fn norm(v: &VecN) -> f64 {
    v.components().iter().map(|c| c * c).sum::<f64>().sqrt()
}

// ---------------------------------------------------------------------------
// Binary
// ---------------------------------------------------------------------------

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Deserialize)]
#[serde(try_from = "String")]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Pow,
    Min,
    Max,
    Atan2,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
    Distance,
    Dot,
    Cross,
}

#[derive(Copy, Clone)]
enum BinaryImpl {
    /// Componentwise over numbers, vectors and colors.
    Arithmetic(fn(f64, f64) -> f64),
    /// Componentwise over numbers and vectors.
    Componentwise(fn(f64, f64) -> f64),
    /// Number comparison.
    Compare(fn(f64, f64) -> bool),
    Custom(fn(&'static str, &Value, &Value) -> Result<Value>),
}

static BINARY_TABLE: [(BinaryOp, &str, BinaryImpl); 20] = [
    (BinaryOp::Add, "+", BinaryImpl::Custom(add)),
    (BinaryOp::Sub, "-", BinaryImpl::Arithmetic(sub)),
    (BinaryOp::Mul, "*", BinaryImpl::Arithmetic(mul)),
    (BinaryOp::Div, "/", BinaryImpl::Arithmetic(div)),
    (BinaryOp::Rem, "%", BinaryImpl::Componentwise(rem)),
    (BinaryOp::Pow, "pow", BinaryImpl::Componentwise(f64::powf)),
    (BinaryOp::Min, "min", BinaryImpl::Componentwise(nan_min)),
    (BinaryOp::Max, "max", BinaryImpl::Componentwise(nan_max)),
    (BinaryOp::Atan2, "atan2", BinaryImpl::Componentwise(f64::atan2)),
    (BinaryOp::Eq, "===", BinaryImpl::Custom(strict_eq)),
    (BinaryOp::Ne, "!==", BinaryImpl::Custom(strict_ne)),
    (BinaryOp::Lt, "<", BinaryImpl::Compare(lt)),
    (BinaryOp::Le, "<=", BinaryImpl::Compare(le)),
    (BinaryOp::Gt, ">", BinaryImpl::Compare(gt)),
    (BinaryOp::Ge, ">=", BinaryImpl::Compare(ge)),
    (BinaryOp::And, "&&", BinaryImpl::Custom(and)),
    (BinaryOp::Or, "||", BinaryImpl::Custom(or)),
    (BinaryOp::Distance, "distance", BinaryImpl::Custom(distance)),
    (BinaryOp::Dot, "dot", BinaryImpl::Custom(dot)),
    (BinaryOp::Cross, "cross", BinaryImpl::Custom(cross)),
];

impl BinaryOp {
    pub fn name(self) -> &'static str {
        BINARY_TABLE[self as usize].1
    }

    /// `&&` and `||` may decide their result from the left operand alone.
    pub fn short_circuit(self, left: &Value) -> Option<Value> {
        match (self, left) {
            (BinaryOp::And, Value::Boolean(false)) => Some(Value::Boolean(false)),
            (BinaryOp::Or, Value::Boolean(true)) => Some(Value::Boolean(true)),
            _ => None,
        }
    }

    pub fn apply(self, left: &Value, right: &Value) -> Result<Value> {
        let (_, name, imp) = BINARY_TABLE[self as usize];
        match imp {
            BinaryImpl::Arithmetic(f) => arithmetic(name, f, left, right),
            BinaryImpl::Componentwise(f) => lift_binary(name, f, left, right),
            BinaryImpl::Compare(f) => match (left, right) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Boolean(f(*a, *b))),
                (Value::Number(_), other) | (other, _) => Err(EvalError::type_mismatch(name, other)),
            },
            BinaryImpl::Custom(f) => f(name, left, right),
        }
    }
}

fn arithmetic(operator: &'static str, f: fn(f64, f64) -> f64, left: &Value, right: &Value) -> Result<Value> {
    match (left, right) {
        (Value::Color(a), Value::Color(b)) => Ok(Value::Color(a.zip_with(*b, f))),
        (Value::Color(a), Value::Number(y)) => Ok(Value::Color(a.map(|x| f(x, *y)))),
        (Value::Number(x), Value::Color(b)) => Ok(Value::Color(b.map(|y| f(*x, y)))),
        (Value::Color(_), other) | (other, Value::Color(_)) => {
            Err(EvalError::type_mismatch(operator, other))
        }
        _ => lift_binary(operator, f, left, right),
    }
}

/// `+` concatenates as soon as either side is a string.
fn add(operator: &'static str, left: &Value, right: &Value) -> Result<Value> {
    if matches!(left, Value::String(_)) || matches!(right, Value::String(_)) {
        return Ok(Value::String(format!(
            "{}{}",
            left.to_plain_string(),
            right.to_plain_string()
        )));
    }
    arithmetic(operator, |a, b| a + b, left, right)
}

fn sub(a: f64, b: f64) -> f64 {
    a - b
}

fn mul(a: f64, b: f64) -> f64 {
    a * b
}

fn div(a: f64, b: f64) -> f64 {
    a / b
}

fn rem(a: f64, b: f64) -> f64 {
    a % b
}

fn lt(a: f64, b: f64) -> bool {
    a < b
}

fn le(a: f64, b: f64) -> bool {
    a <= b
}

fn gt(a: f64, b: f64) -> bool {
    a > b
}

fn ge(a: f64, b: f64) -> bool {
    a >= b
}

fn strict_eq(_: &'static str, left: &Value, right: &Value) -> Result<Value> {
    Ok(Value::Boolean(left == right))
}

fn strict_ne(_: &'static str, left: &Value, right: &Value) -> Result<Value> {
    Ok(Value::Boolean(left != right))
}

fn and(operator: &'static str, left: &Value, right: &Value) -> Result<Value> {
    match (left, right) {
        (Value::Boolean(a), Value::Boolean(b)) => Ok(Value::Boolean(*a && *b)),
        (Value::Boolean(_), other) | (other, _) => Err(EvalError::type_mismatch(operator, other)),
    }
}

fn or(operator: &'static str, left: &Value, right: &Value) -> Result<Value> {
    match (left, right) {
        (Value::Boolean(a), Value::Boolean(b)) => Ok(Value::Boolean(*a || *b)),
        (Value::Boolean(_), other) | (other, _) => Err(EvalError::type_mismatch(operator, other)),
    }
}

fn distance(operator: &'static str, left: &Value, right: &Value) -> Result<Value> {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => Ok(Value::Number((a - b).abs())),
        (Value::Vector(a), Value::Vector(b)) => {
            check_len(operator, a, b)?;
            let d = a.map_indexed(|i, x| x - b.components()[i]);
            Ok(Value::Number(norm(&d)))
        }
        (Value::Number(_) | Value::Vector(_), other) | (other, _) => {
            Err(EvalError::type_mismatch(operator, other))
        }
    }
}

fn dot(operator: &'static str, left: &Value, right: &Value) -> Result<Value> {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a * b)),
        (Value::Vector(a), Value::Vector(b)) => {
            check_len(operator, a, b)?;
            let sum = a
                .components()
                .iter()
                .zip(b.components())
                .map(|(x, y)| x * y)
                .sum();
            Ok(Value::Number(sum))
        }
        (Value::Number(_) | Value::Vector(_), other) | (other, _) => {
            Err(EvalError::type_mismatch(operator, other))
        }
    }
}

fn cross(operator: &'static str, left: &Value, right: &Value) -> Result<Value> {
    match (left, right) {
        (Value::Vector(VecN::Vec3(a)), Value::Vector(VecN::Vec3(b))) => Ok(Value::Vector(VecN::Vec3([
            a[1] * b[2] - a[2] * b[1],
            a[2] * b[0] - a[0] * b[2],
            a[0] * b[1] - a[1] * b[0],
        ]))),
        (Value::Vector(VecN::Vec3(_)), other) | (other, _) => {
            Err(EvalError::type_mismatch(operator, other))
        }
    }
}

// ---------------------------------------------------------------------------
// Ternary
// ---------------------------------------------------------------------------

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Deserialize)]
#[serde(try_from = "String")]
pub enum TernaryOp {
    Clamp,
    Mix,
}

static TERNARY_TABLE: [(TernaryOp, &str, fn(f64, f64, f64) -> f64); 2] = [
    (TernaryOp::Clamp, "clamp", clamp),
    (TernaryOp::Mix, "mix", mix),
];

impl TernaryOp {
    pub fn name(self) -> &'static str {
        TERNARY_TABLE[self as usize].1
    }

    pub fn apply(self, a: &Value, b: &Value, c: &Value) -> Result<Value> {
        let (_, name, f) = TERNARY_TABLE[self as usize];
        lift_ternary(name, f, a, b, c)
    }
}

fn clamp(x: f64, min: f64, max: f64) -> f64 {
    x.max(min).min(max)
}

fn mix(x: f64, y: f64, a: f64) -> f64 {
    x * (1.0 - a) + y * a
}

// ---------------------------------------------------------------------------
// Names
// ---------------------------------------------------------------------------

macro_rules! operator_names {
    ($op:ty, $table:ident) => {
        impl FromStr for $op {
            type Err = UnknownOperator;

            fn from_str(name: &str) -> std::result::Result<Self, Self::Err> {
                $table
                    .iter()
                    .find(|row| row.1 == name)
                    .map(|row| row.0)
                    .ok_or_else(|| UnknownOperator(name.to_string()))
            }
        }

        impl TryFrom<String> for $op {
            type Error = UnknownOperator;

            fn try_from(name: String) -> std::result::Result<Self, Self::Error> {
                name.parse()
            }
        }

        impl fmt::Display for $op {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.name())
            }
        }
    };
}

operator_names!(UnaryOp, UNARY_TABLE);
operator_names!(BinaryOp, BINARY_TABLE);
operator_names!(TernaryOp, TERNARY_TABLE);
