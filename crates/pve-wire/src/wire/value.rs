//! Dynamically typed values as they arrive from a decoded response.

use std::fmt;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Deserializer};

/// One top-level field of a decoded response object.
///
/// Booleans arrive as the numbers `1`/`0`; nested structure always arrives as
/// a [`String`](WireValue::String) in the token-list grammar.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum WireValue {
    String(String),
    Number(f64),
    Sequence(Vec<WireValue>),
    #[default]
    Absent,
}

/// Field name to raw value, as produced by the response decoder.
pub type WireMap = FxHashMap<String, WireValue>;

impl WireValue {
    /// Short name of the variant, used in type-mismatch errors.
    pub fn type_name(&self) -> &'static str {
        match self {
            WireValue::String(_) => "string",
            WireValue::Number(_) => "number",
            WireValue::Sequence(_) => "sequence",
            WireValue::Absent => "nothing",
        }
    }

    /// Returns true for [`Absent`](WireValue::Absent).
    pub fn is_absent(&self) -> bool {
        matches!(self, WireValue::Absent)
    }

    /// Returns the string payload, if this is a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            WireValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the numeric payload, if this is a number.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            WireValue::Number(n) => Some(*n),
            _ => None,
        }
    }
}

impl fmt::Display for WireValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WireValue::String(s) => write!(f, "{s:?}"),
            WireValue::Number(n) => write!(f, "{n}"),
            WireValue::Sequence(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
            WireValue::Absent => f.write_str("<absent>"),
        }
    }
}

impl From<&str> for WireValue {
    fn from(s: &str) -> Self {
        WireValue::String(s.to_string())
    }
}

impl From<String> for WireValue {
    fn from(s: String) -> Self {
        WireValue::String(s)
    }
}

impl From<f64> for WireValue {
    fn from(n: f64) -> Self {
        WireValue::Number(n)
    }
}

impl From<serde_json::Value> for WireValue {
    fn from(value: serde_json::Value) -> Self {
        use serde_json::Value;

        match value {
            Value::String(s) => WireValue::String(s),
            Value::Number(n) => n.as_f64().map_or(WireValue::Absent, WireValue::Number),
            Value::Bool(b) => WireValue::Number(if b { 1.0 } else { 0.0 }),
            Value::Array(items) => {
                WireValue::Sequence(items.into_iter().map(WireValue::from).collect())
            }
            // top-level fields never carry nested objects
            Value::Null | Value::Object(_) => WireValue::Absent,
        }
    }
}

impl<'de> Deserialize<'de> for WireValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        serde_json::Value::deserialize(deserializer).map(WireValue::from)
    }
}

/// Builds a [`WireMap`] from the top-level fields of a JSON object.
///
/// Returns `None` if `value` is not an object.
pub fn wire_map_from_json(value: serde_json::Value) -> Option<WireMap> {
    match value {
        serde_json::Value::Object(fields) => Some(
            fields
                .into_iter()
                .map(|(k, v)| (k, WireValue::from(v)))
                .collect(),
        ),
        _ => None,
    }
}

/// Builds a [`WireMap`] of string values from form pairs.
pub fn wire_map_from_pairs<K, V, I>(pairs: I) -> WireMap
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<String>,
{
    pairs
        .into_iter()
        .map(|(k, v)| (k.into(), WireValue::String(v.into())))
        .collect()
}
