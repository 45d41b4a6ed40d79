// # Update payload values
//
// Clients send partial updates as flat JSON objects. Each top-level key is a
// field name; its value is kept as an [`UpdateValue`] so validators can
// match on the shape they expect instead of poking at an untyped object.
//
// Nested objects (a coordinate pair, for instance) stay one value. They are
// never flattened into dotted field names.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::error::{Error, Result};

/// A dynamically-typed field value taken from an update payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UpdateValue {
    /// JSON `null`
    Null,
    /// JSON `true` / `false`
    Bool(bool),
    /// Any JSON number
    Number(f64),
    /// JSON string
    String(String),
    /// JSON array
    Array(Vec<UpdateValue>),
    /// JSON object
    Object(BTreeMap<String, UpdateValue>),
}

impl UpdateValue {
    /// Build a string value
    pub fn string(s: impl Into<String>) -> Self {
        Self::String(s.into())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&BTreeMap<String, UpdateValue>> {
        match self {
            Self::Object(map) => Some(map),
            _ => None,
        }
    }

    /// Look up a key when this value is an object
    pub fn get(&self, key: &str) -> Option<&UpdateValue> {
        self.as_object().and_then(|map| map.get(key))
    }

    /// Short name of the variant, for log output
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Number(_) => "number",
            Self::String(_) => "string",
            Self::Array(_) => "array",
            Self::Object(_) => "object",
        }
    }
}

impl From<serde_json::Value> for UpdateValue {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(b) => Self::Bool(b),
            // Numbers outside f64 range do not occur in serde_json without
            // arbitrary_precision, so the fallback is never hit in practice.
            serde_json::Value::Number(n) => n.as_f64().map_or(Self::Null, Self::Number),
            serde_json::Value::String(s) => Self::String(s),
            serde_json::Value::Array(items) => {
                Self::Array(items.into_iter().map(Self::from).collect())
            }
            serde_json::Value::Object(map) => {
                Self::Object(map.into_iter().map(|(k, v)| (k, Self::from(v))).collect())
            }
        }
    }
}

impl From<&UpdateValue> for serde_json::Value {
    fn from(value: &UpdateValue) -> Self {
        match value {
            UpdateValue::Null => serde_json::Value::Null,
            UpdateValue::Bool(b) => serde_json::Value::Bool(*b),
            UpdateValue::Number(n) => serde_json::Number::from_f64(*n)
                .map_or(serde_json::Value::Null, serde_json::Value::Number),
            UpdateValue::String(s) => serde_json::Value::String(s.clone()),
            UpdateValue::Array(items) => {
                serde_json::Value::Array(items.iter().map(serde_json::Value::from).collect())
            }
            UpdateValue::Object(map) => serde_json::Value::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), serde_json::Value::from(v)))
                    .collect(),
            ),
        }
    }
}

impl From<&str> for UpdateValue {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for UpdateValue {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<bool> for UpdateValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<f64> for UpdateValue {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl<T: Into<UpdateValue>> From<Option<T>> for UpdateValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

impl fmt::Display for UpdateValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", serde_json::Value::from(self))
    }
}

/// A partial update: field name to raw value
///
/// Keys are unique. When a JSON document repeats a key the last occurrence
/// wins, which is what the JSON parser already does while building the map.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UpdateRequest {
    fields: BTreeMap<String, UpdateValue>,
}

impl UpdateRequest {
    /// Create an empty request
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a request from a JSON object
    ///
    /// # Errors
    ///
    /// - `Error::InvalidInput` if the document is not a JSON object
    /// - `Error::Json` if the document is not valid JSON
    pub fn from_json(json: &str) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_str(json)?;
        Self::try_from(value)
    }

    /// Add a field, replacing any earlier value for the same name
    pub fn with(mut self, field: impl Into<String>, value: impl Into<UpdateValue>) -> Self {
        self.fields.insert(field.into(), value.into());
        self
    }

    pub fn get(&self, field: &str) -> Option<&UpdateValue> {
        self.fields.get(field)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &UpdateValue)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl TryFrom<serde_json::Value> for UpdateRequest {
    type Error = Error;

    fn try_from(value: serde_json::Value) -> Result<Self> {
        match value {
            serde_json::Value::Object(map) => Ok(Self {
                fields: map
                    .into_iter()
                    .map(|(k, v)| (k, UpdateValue::from(v)))
                    .collect(),
            }),
            other => Err(Error::invalid_input(format!(
                "update payload must be a JSON object, got {}",
                UpdateValue::from(other).kind()
            ))),
        }
    }
}

impl<K: Into<String>, V: Into<UpdateValue>> FromIterator<(K, V)> for UpdateRequest {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            fields: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}
