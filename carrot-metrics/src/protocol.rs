use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};

/// Returns the name of a JSON value's type for diagnostics.
pub(crate) fn json_type_name(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

/// The scalar value of a [`Metric`].
///
/// Values carry whatever scalar type the source JSON contained and are never
/// coerced. JSON numbers always map to [`MetricValue::Float`]; objects and
/// arrays are rejected at the extraction boundary.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(untagged)]
pub enum MetricValue {
    /// A JSON string value.
    String(String),
    /// A JSON number, widened to a 64-bit float.
    Float(f64),
    /// A JSON boolean value.
    Bool(bool),
    /// An explicit JSON `null`, or an absent `value` field.
    #[default]
    Null,
}

impl MetricValue {
    /// Converts a JSON value into a scalar metric value.
    ///
    /// Returns `None` for objects and arrays, which have no scalar
    /// representation.
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::Null => Some(Self::Null),
            serde_json::Value::Bool(b) => Some(Self::Bool(*b)),
            serde_json::Value::Number(n) => n.as_f64().map(Self::Float),
            serde_json::Value::String(s) => Some(Self::String(s.clone())),
            serde_json::Value::Array(_) | serde_json::Value::Object(_) => None,
        }
    }
}

impl fmt::Display for MetricValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetricValue::String(value) => value.fmt(f),
            MetricValue::Float(value) => value.fmt(f),
            MetricValue::Bool(value) => value.fmt(f),
            MetricValue::Null => f.write_str("null"),
        }
    }
}

impl<'de> Deserialize<'de> for MetricValue {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = serde_json::Value::deserialize(deserializer)?;
        Self::from_json(&value).ok_or_else(|| {
            de::Error::custom(format!(
                "expected a scalar metric value, found {}",
                json_type_name(&value)
            ))
        })
    }
}

/// A single named measurement extracted from a message.
///
/// Metrics are the canonical output of [`extract`](crate::extract): a
/// measurement name, a scalar value, a UTC timestamp, and the tag set shared
/// by all metrics of the originating message. Each metric owns an independent
/// copy of the tags.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Metric {
    /// The name of the measurement.
    pub name: String,
    /// The scalar value of the measurement.
    pub value: MetricValue,
    /// The instant the measurement was taken, normalized to UTC.
    pub timestamp: DateTime<Utc>,
    /// String-valued dimensions used for filtering and grouping in the store.
    ///
    /// Never contains keys starting with `_` nor the reserved `metrics` key.
    pub tags: BTreeMap<String, String>,
}

#[cfg(test)]
mod tests {
    use similar_asserts::assert_eq;

    use super::*;

    #[test]
    fn test_value_from_json_scalars() {
        let cases = [
            (serde_json::json!("up"), MetricValue::String("up".into())),
            (serde_json::json!(1), MetricValue::Float(1.0)),
            (serde_json::json!(0.25), MetricValue::Float(0.25)),
            (serde_json::json!(true), MetricValue::Bool(true)),
            (serde_json::json!(null), MetricValue::Null),
        ];

        for (json, expected) in cases {
            assert_eq!(MetricValue::from_json(&json), Some(expected));
        }
    }

    #[test]
    fn test_value_from_json_rejects_compounds() {
        assert_eq!(MetricValue::from_json(&serde_json::json!([1, 2])), None);
        assert_eq!(MetricValue::from_json(&serde_json::json!({"a": 1})), None);
    }

    #[test]
    fn test_value_deserialize_rejects_object() {
        let result = serde_json::from_str::<MetricValue>(r#"{"nested": true}"#);
        assert!(result.unwrap_err().to_string().contains("object"));
    }
}
