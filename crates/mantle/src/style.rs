//! Per-feature layer style application.
//!
//! A [`LayerStyle`] maps style keys (`color`, `show`, `pointSize`, ...) to
//! expressions. Evaluation failures do not propagate from here: the failing
//! key falls back to the rule's default and is reported in
//! [`StyledFeature::fallbacks`].

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, warn};

use crate::expression::Expression;
use crate::feature::Feature;
use crate::value::{Color, Value};

pub const SHOW: &str = "show";
pub const COLOR: &str = "color";
pub const POINT_SIZE: &str = "pointSize";

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StyleRule {
    pub expression: Expression,
    /// Used when the expression fails or yields `Undefined`. Without a
    /// default the key is left out of the result.
    #[serde(default)]
    pub default: Option<Value>,
}

impl StyleRule {
    pub fn new(expression: Expression) -> Self {
        Self {
            expression,
            default: None,
        }
    }

    pub fn with_default(mut self, default: impl Into<Value>) -> Self {
        self.default = Some(default.into());
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct LayerStyle {
    rules: BTreeMap<String, StyleRule>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StyledFeature {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<serde_json::Value>,
    pub values: BTreeMap<String, Value>,
    /// Keys whose expression failed, in key order.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub fallbacks: Vec<String>,
}

impl StyledFeature {
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// Features are shown unless `show` is exactly `false`.
    pub fn show(&self) -> bool {
        !matches!(self.values.get(SHOW), Some(Value::Boolean(false)))
    }

    pub fn color(&self) -> Color {
        match self.values.get(COLOR) {
            Some(Value::Color(c)) => *c,
            _ => Color::WHITE,
        }
    }

    pub fn point_size(&self) -> Option<f64> {
        self.values.get(POINT_SIZE).and_then(Value::as_number)
    }
}

impl LayerStyle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rule(mut self, key: impl Into<String>, rule: StyleRule) -> Self {
        self.rules.insert(key.into(), rule);
        self
    }

    pub fn rule(&self, key: &str) -> Option<&StyleRule> {
        self.rules.get(key)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn apply(&self, feature: &Feature) -> StyledFeature {
        let mut out = StyledFeature {
            id: feature.id.clone(),
            ..StyledFeature::default()
        };

        for (key, rule) in &self.rules {
            let value = match rule.expression.evaluate(feature) {
                Ok(value) if value.is_undefined() => {
                    debug!(key = key.as_str(), "style expression is undefined, using default");
                    rule.default.clone()
                }
                Ok(value) => Some(value),
                Err(err) => {
                    warn!(
                        key = key.as_str(),
                        feature = ?feature.id,
                        error = %err,
                        "style expression failed, using default"
                    );
                    out.fallbacks.push(key.clone());
                    rule.default.clone()
                }
            };
            if let Some(value) = value {
                out.values.insert(key.clone(), value);
            }
        }

        out
    }

    pub fn apply_all(&self, features: &[Feature]) -> Vec<StyledFeature> {
        features.iter().map(|f| self.apply(f)).collect()
    }
}
