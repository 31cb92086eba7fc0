use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value as Json};

use crate::value::Value;

/// A renderable map entity. Only `properties` takes part in evaluation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Json>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geometry: Option<Json>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub properties: Map<String, Json>,
}

impl Feature {
    pub fn new(properties: Map<String, Json>) -> Self {
        Self {
            properties,
            ..Self::default()
        }
    }

    /// Builds a feature from a JSON object; anything else yields no properties.
    pub fn from_properties(properties: Json) -> Self {
        match properties {
            Json::Object(map) => Self::new(map),
            _ => Self::default(),
        }
    }

    /// Looks up a property as an operand.
    ///
    /// A name that is not a direct key is read as a dotted path into nested
    /// objects (`address.city`). Missing properties are `Undefined`.
    pub fn property(&self, name: &str) -> Value {
        if let Some(v) = self.properties.get(name) {
            return Value::from_json(v);
        }
        let mut segments = name.split('.');
        let Some(first) = segments.next() else {
            return Value::Undefined;
        };
        let mut current = self.properties.get(first);
        for segment in segments {
            current = current.and_then(|v| v.get(segment));
        }
        current.map_or(Value::Undefined, Value::from_json)
    }
}

fn null_as_empty<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Map<String, Json>, D::Error> {
    Ok(Option::<Map<String, Json>>::deserialize(deserializer)?.unwrap_or_default())
}
