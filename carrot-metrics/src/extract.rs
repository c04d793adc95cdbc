use std::collections::BTreeMap;

use serde::Deserialize;
use thiserror::Error;

use crate::protocol::{Metric, MetricValue};
use crate::timestamp::{parse_timestamp, ParseTimestampError};

/// The reserved top-level key carrying the embedded metrics array.
const METRICS_KEY: &str = "metrics";

/// The reserved prefix for transport metadata keys, dropped silently.
const RESERVED_PREFIX: char = '_';

/// An error extracting metrics from a message body.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// The payload is not valid JSON or the top level is not an object.
    #[error("malformed json payload")]
    MalformedJson(#[source] serde_json::Error),

    /// A non-reserved top-level value is not a string.
    ///
    /// Tag values are restricted to strings because the store's tag model is
    /// string-only; numbers and booleans are rejected instead of coerced.
    #[error("invalid tag value for key {key:?}")]
    InvalidTagValue {
        /// The offending top-level key.
        key: String,
    },

    /// The `metrics` field is missing, not an array, or contains a malformed
    /// element.
    #[error("invalid metrics array")]
    InvalidMetricsArray(#[source] Option<serde_json::Error>),

    /// An embedded metric carries an unparseable `time` field.
    #[error("invalid timestamp in metric {index}")]
    InvalidTimestamp {
        /// The position of the failing metric within the `metrics` array.
        index: usize,
        /// The underlying timestamp error.
        #[source]
        source: ParseTimestampError,
    },
}

/// An embedded metric as it appears on the wire.
///
/// All fields are optional in the input: a missing name is the empty string
/// and a missing value is null, mirroring upstream emitters that omit them.
/// A missing `time` defaults to JSON null and is rejected downstream by the
/// timestamp parser.
#[derive(Debug, Deserialize)]
struct RawMetric {
    #[serde(default)]
    name: String,
    #[serde(default)]
    value: MetricValue,
    #[serde(default)]
    time: serde_json::Value,
}

/// Extracts canonical metrics from a raw message body.
///
/// The payload must be a JSON object. Its top-level keys are partitioned in
/// three groups: keys starting with `_` are reserved for transport metadata
/// and dropped, the `metrics` key must hold an array of embedded
/// `{name, value, time}` objects, and every remaining key must hold a string
/// and becomes a tag shared by all extracted metrics.
///
/// Returns one [`Metric`] per array element, in array order, each owning its
/// own copy of the tag set. An empty `metrics` array yields an empty vector,
/// which is not an error.
pub fn extract(payload: &[u8]) -> Result<Vec<Metric>, ExtractError> {
    let mut raw: serde_json::Map<String, serde_json::Value> =
        serde_json::from_slice(payload).map_err(ExtractError::MalformedJson)?;

    let embedded = raw.remove(METRICS_KEY);

    let mut tags = BTreeMap::new();
    for (key, value) in raw {
        if key.starts_with(RESERVED_PREFIX) {
            continue;
        }

        match value {
            serde_json::Value::String(value) => {
                tags.insert(key, value);
            }
            _ => return Err(ExtractError::InvalidTagValue { key }),
        }
    }

    let raw_metrics: Vec<RawMetric> = match embedded {
        Some(value) => serde_json::from_value(value)
            .map_err(|e| ExtractError::InvalidMetricsArray(Some(e)))?,
        None => return Err(ExtractError::InvalidMetricsArray(None)),
    };

    let mut metrics = Vec::with_capacity(raw_metrics.len());
    for (index, raw_metric) in raw_metrics.into_iter().enumerate() {
        let timestamp = parse_timestamp(&raw_metric.time)
            .map_err(|source| ExtractError::InvalidTimestamp { index, source })?;

        metrics.push(Metric {
            name: raw_metric.name,
            value: raw_metric.value,
            timestamp,
            tags: tags.clone(),
        });
    }

    Ok(metrics)
}
