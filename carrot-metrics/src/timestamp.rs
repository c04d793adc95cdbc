use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::protocol::json_type_name;

/// An error parsing the `time` field of an embedded metric.
#[derive(Debug, Error)]
pub enum ParseTimestampError {
    /// A string timestamp that does not conform to RFC 3339.
    #[error("invalid RFC 3339 timestamp")]
    InvalidFormat(#[source] chrono::ParseError),

    /// A numeric timestamp outside of the representable range.
    #[error("timestamp out of range")]
    OutOfRange,

    /// A JSON type that cannot encode a timestamp.
    #[error("unsupported timestamp type: {0}")]
    UnsupportedType(&'static str),
}

/// Parses a dynamically typed timestamp into an absolute UTC instant.
///
/// Three encodings are accepted:
///
///  - Strings must be RFC 3339 with an explicit offset or `Z`. The offset is
///    applied and the result normalized to UTC, so `"...Z"` and `"...+00:00"`
///    denote the same instant.
///  - Integers are whole seconds since the Unix epoch.
///  - Floats are seconds since the Unix epoch, with the fractional part
///    carried at nanosecond precision.
///
/// Every other JSON type fails with [`ParseTimestampError::UnsupportedType`]
/// naming the offending type. No timezone is ever inferred beyond what the
/// input encodes.
pub fn parse_timestamp(value: &serde_json::Value) -> Result<DateTime<Utc>, ParseTimestampError> {
    match value {
        serde_json::Value::String(s) => DateTime::parse_from_rfc3339(s)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(ParseTimestampError::InvalidFormat),
        serde_json::Value::Number(n) => {
            if let Some(secs) = n.as_i64() {
                DateTime::from_timestamp(secs, 0).ok_or(ParseTimestampError::OutOfRange)
            } else if let Some(float) = n.as_f64() {
                let mut secs = float.trunc() as i64;
                let mut nanos = ((float - float.trunc()) * 1e9).round() as i64;

                // Normalize into [0, 1e9): the fraction is negative for
                // pre-epoch instants and can round up to a full second.
                if nanos < 0 {
                    secs -= 1;
                    nanos += 1_000_000_000;
                } else if nanos >= 1_000_000_000 {
                    secs += 1;
                    nanos -= 1_000_000_000;
                }

                DateTime::from_timestamp(secs, nanos as u32)
                    .ok_or(ParseTimestampError::OutOfRange)
            } else {
                Err(ParseTimestampError::OutOfRange)
            }
        }
        other => Err(ParseTimestampError::UnsupportedType(json_type_name(other))),
    }
}

#[cfg(test)]
mod tests {
    use similar_asserts::assert_eq;

    use super::*;

    fn parse(value: serde_json::Value) -> Result<DateTime<Utc>, ParseTimestampError> {
        parse_timestamp(&value)
    }

    #[test]
    fn test_rfc3339_offsets_normalize_to_the_same_instant() {
        let zulu = parse(serde_json::json!("2023-10-15T14:30:45Z")).unwrap();
        let utc_offset = parse(serde_json::json!("2023-10-15T14:30:45+00:00")).unwrap();
        let shifted = parse(serde_json::json!("2023-10-15T16:30:45+02:00")).unwrap();

        assert_eq!(zulu, utc_offset);
        assert_eq!(zulu, shifted);
        assert_eq!(zulu.timestamp(), 1697380245);
    }

    #[test]
    fn test_string_without_offset_is_invalid() {
        let result = parse(serde_json::json!("2023-10-15T14:30:45"));
        assert!(matches!(result, Err(ParseTimestampError::InvalidFormat(_))));
    }

    #[test]
    fn test_integer_seconds() {
        let parsed = parse(serde_json::json!(1697380245)).unwrap();
        assert_eq!(parsed.timestamp(), 1697380245);
        assert_eq!(parsed.timestamp_subsec_nanos(), 0);
    }

    #[test]
    fn test_float_seconds_with_nanosecond_fraction() {
        let parsed = parse(serde_json::json!(1697380245.5)).unwrap();
        assert_eq!(parsed.timestamp(), 1697380245);
        assert_eq!(parsed.timestamp_subsec_nanos(), 500_000_000);
    }

    #[test]
    fn test_pre_epoch_float_keeps_its_fraction() {
        let parsed = parse(serde_json::json!(-0.5)).unwrap();
        assert_eq!(parsed.timestamp_millis(), -500);
        assert_eq!(
            parsed,
            parse(serde_json::json!("1969-12-31T23:59:59.5Z")).unwrap()
        );
    }

    #[test]
    fn test_fraction_rounding_up_carries_into_seconds() {
        let parsed = parse(serde_json::json!(0.9999999996)).unwrap();
        assert_eq!(parsed.timestamp(), 1);
        assert_eq!(parsed.timestamp_subsec_nanos(), 0);
    }

    #[test]
    fn test_unsupported_types() {
        let cases = [
            (serde_json::json!(null), "null"),
            (serde_json::json!(true), "boolean"),
            (serde_json::json!([1697380245]), "array"),
            (serde_json::json!({"seconds": 1697380245}), "object"),
        ];

        for (value, name) in cases {
            match parse(value) {
                Err(ParseTimestampError::UnsupportedType(ty)) => assert_eq!(ty, name),
                other => panic!("expected unsupported type error, got {other:?}"),
            }
        }
    }
}
