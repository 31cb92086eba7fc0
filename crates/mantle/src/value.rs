//! Operand model of the style expression language.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Fixed-length numeric vector (2, 3 or 4 components).
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum VecN {
    Vec2([f64; 2]),
    Vec3([f64; 3]),
    Vec4([f64; 4]),
}

impl VecN {
    pub fn from_slice(components: &[f64]) -> Option<Self> {
        match *components {
            [x, y] => Some(VecN::Vec2([x, y])),
            [x, y, z] => Some(VecN::Vec3([x, y, z])),
            [x, y, z, w] => Some(VecN::Vec4([x, y, z, w])),
            _ => None,
        }
    }

    pub fn components(&self) -> &[f64] {
        match self {
            VecN::Vec2(c) => c,
            VecN::Vec3(c) => c,
            VecN::Vec4(c) => c,
        }
    }

    pub fn len(&self) -> usize {
        self.components().len()
    }

    /// Applies `f` to every component, keeping the vector length.
    pub fn map(&self, f: impl Fn(f64) -> f64) -> Self {
        self.map_indexed(|_, x| f(x))
    }

    pub fn map_indexed(&self, f: impl Fn(usize, f64) -> f64) -> Self {
        match self {
            VecN::Vec2(c) => VecN::Vec2([f(0, c[0]), f(1, c[1])]),
            VecN::Vec3(c) => VecN::Vec3([f(0, c[0]), f(1, c[1]), f(2, c[2])]),
            VecN::Vec4(c) => VecN::Vec4([f(0, c[0]), f(1, c[1]), f(2, c[2]), f(3, c[3])]),
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            VecN::Vec2(_) => "vec2",
            VecN::Vec3(_) => "vec3",
            VecN::Vec4(_) => "vec4",
        }
    }
}

impl fmt::Display for VecN {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.type_name())?;
        for (i, c) in self.components().iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{c}")?;
        }
        write!(f, ")")
    }
}

/// RGBA color with components in `0.0..=1.0`.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Color {
    pub red: f64,
    pub green: f64,
    pub blue: f64,
    pub alpha: f64,
}

impl Color {
    pub const WHITE: Color = Color::new(1.0, 1.0, 1.0, 1.0);

    pub const fn new(red: f64, green: f64, blue: f64, alpha: f64) -> Self {
        Self {
            red,
            green,
            blue,
            alpha,
        }
    }

    pub fn to_array(self) -> [f64; 4] {
        [self.red, self.green, self.blue, self.alpha]
    }

    pub fn from_array(c: [f64; 4]) -> Self {
        Self::new(c[0], c[1], c[2], c[3])
    }

    pub fn map(self, f: impl Fn(f64) -> f64) -> Self {
        Self::from_array(self.to_array().map(f))
    }

    pub fn zip_with(self, other: Color, f: impl Fn(f64, f64) -> f64) -> Self {
        let a = self.to_array();
        let b = other.to_array();
        Self::from_array([f(a[0], b[0]), f(a[1], b[1]), f(a[2], b[2]), f(a[3], b[3])])
    }

    /// Parses `#rgb`, `#rgba`, `#rrggbb`, `#rrggbbaa`, `rgb(..)`, `rgba(..)`
    /// and a handful of named colors.
    pub fn from_css(text: &str) -> Option<Self> {
        let text = text.trim();
        if let Some(hex) = text.strip_prefix('#') {
            return parse_hex(hex);
        }
        let lower = text.to_ascii_lowercase();
        if let Some(args) = lower
            .strip_prefix("rgba(")
            .or_else(|| lower.strip_prefix("rgb("))
            .and_then(|rest| rest.strip_suffix(')'))
        {
            return parse_rgb_args(args);
        }
        named_color(&lower)
    }

    pub fn to_css(self) -> String {
        let channel = |c: f64| (c.clamp(0.0, 1.0) * 255.0).round() as u8;
        format!(
            "rgba({}, {}, {}, {})",
            channel(self.red),
            channel(self.green),
            channel(self.blue),
            self.alpha.clamp(0.0, 1.0)
        )
    }
}

fn parse_hex(hex: &str) -> Option<Color> {
    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    let short = |i: usize| -> Option<f64> {
        let d = u8::from_str_radix(hex.get(i..i + 1)?, 16).ok()?;
        Some(f64::from(d * 17) / 255.0)
    };
    let long = |i: usize| -> Option<f64> {
        let d = u8::from_str_radix(hex.get(i..i + 2)?, 16).ok()?;
        Some(f64::from(d) / 255.0)
    };
    match hex.len() {
        3 => Some(Color::new(short(0)?, short(1)?, short(2)?, 1.0)),
        4 => Some(Color::new(short(0)?, short(1)?, short(2)?, short(3)?)),
        6 => Some(Color::new(long(0)?, long(2)?, long(4)?, 1.0)),
        8 => Some(Color::new(long(0)?, long(2)?, long(4)?, long(6)?)),
        _ => None,
    }
}

fn parse_rgb_args(args: &str) -> Option<Color> {
    let parts: Vec<f64> = args
        .split(',')
        .map(|p| p.trim().parse::<f64>())
        .collect::<Result<_, _>>()
        .ok()?;
    match parts.as_slice() {
        [r, g, b] => Some(Color::new(r / 255.0, g / 255.0, b / 255.0, 1.0)),
        [r, g, b, a] => Some(Color::new(r / 255.0, g / 255.0, b / 255.0, *a)),
        _ => None,
    }
}

fn named_color(name: &str) -> Option<Color> {
    let c = match name {
        "white" => Color::WHITE,
        "black" => Color::new(0.0, 0.0, 0.0, 1.0),
        "red" => Color::new(1.0, 0.0, 0.0, 1.0),
        "lime" => Color::new(0.0, 1.0, 0.0, 1.0),
        "green" => Color::new(0.0, 128.0 / 255.0, 0.0, 1.0),
        "blue" => Color::new(0.0, 0.0, 1.0, 1.0),
        "yellow" => Color::new(1.0, 1.0, 0.0, 1.0),
        "cyan" => Color::new(0.0, 1.0, 1.0, 1.0),
        "magenta" => Color::new(1.0, 0.0, 1.0, 1.0),
        "gray" | "grey" => Color::new(128.0 / 255.0, 128.0 / 255.0, 128.0 / 255.0, 1.0),
        "transparent" => Color::new(0.0, 0.0, 0.0, 0.0),
        _ => return None,
    };
    Some(c)
}

/// Result of evaluating an expression, and the operand type of every
/// operator.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    /// Missing property or unset result.
    #[default]
    Undefined,
    Null,
    Boolean(bool),
    Number(f64),
    Vector(VecN),
    String(String),
    Color(Color),
    Array(Vec<Value>),
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Undefined => "undefined",
            Value::Null => "null",
            Value::Boolean(_) => "boolean",
            Value::Number(_) => "number",
            Value::Vector(v) => v.type_name(),
            Value::String(_) => "string",
            Value::Color(_) => "color",
            Value::Array(_) => "array",
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self, Value::Undefined)
    }

    /// Converts a JSON property into an operand.
    ///
    /// Numeric arrays of length 2 to 4 become vectors. Objects have no
    /// operand form and map to `Undefined`.
    pub fn from_json(json: &serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Boolean(*b),
            serde_json::Value::Number(n) => n.as_f64().map_or(Value::Undefined, Value::Number),
            serde_json::Value::String(s) => Value::String(s.clone()),
            serde_json::Value::Array(items) => {
                let numbers: Option<Vec<f64>> = items.iter().map(serde_json::Value::as_f64).collect();
                match numbers.as_deref().and_then(VecN::from_slice) {
                    Some(v) => Value::Vector(v),
                    None => Value::Array(items.iter().map(Value::from_json).collect()),
                }
            }
            serde_json::Value::Object(_) => Value::Undefined,
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Undefined | Value::Null => serde_json::Value::Null,
            Value::Boolean(b) => serde_json::Value::Bool(*b),
            Value::Number(n) => number_json(*n),
            Value::Vector(v) => v.components().iter().copied().map(number_json).collect(),
            Value::String(s) => serde_json::Value::String(s.clone()),
            Value::Color(c) => serde_json::Value::String(c.to_css()),
            Value::Array(items) => items.iter().map(Value::to_json).collect(),
        }
    }

    /// Text form used by string concatenation.
    pub fn to_plain_string(&self) -> String {
        match self {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

fn number_json(n: f64) -> serde_json::Value {
    serde_json::Number::from_f64(n).map_or(serde_json::Value::Null, serde_json::Value::Number)
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<VecN> for Value {
    fn from(v: VecN) -> Self {
        Value::Vector(v)
    }
}

impl From<Color> for Value {
    fn from(c: Color) -> Self {
        Value::Color(c)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undefined => write!(f, "undefined"),
            Value::Null => write!(f, "null"),
            Value::Boolean(b) => write!(f, "{b}"),
            Value::Number(n) => write!(f, "{n}"),
            Value::Vector(v) => write!(f, "{v}"),
            Value::String(s) => write!(f, "{s:?}"),
            Value::Color(c) => write!(f, "{}", c.to_css()),
            Value::Array(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let json = serde_json::Value::deserialize(deserializer)?;
        Ok(Value::from_json(&json))
    }
}
