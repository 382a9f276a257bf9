//! Payload Validator

use crate::error::ValidationError;
use serde_json::{Map, Value};
use tracing::debug;

/// Keys every ingestion payload must carry, in reporting order
pub const REQUIRED_FIELDS: [&str; 3] = ["temperature", "humidity", "pressure"];

/// A reading that passed validation and is ready to store
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValidatedReading {
    pub temperature: f64,
    pub humidity: f64,
    pub pressure: f64,
}

/// Parse a raw request body and validate it.
///
/// A body that is not JSON, or is JSON but not an object, is reported as
/// `InvalidFormat` against the pseudo-field `body`.
pub fn validate_body(body: &[u8]) -> Result<ValidatedReading, ValidationError> {
    let payload: Value = serde_json::from_slice(body).map_err(|e| ValidationError::InvalidFormat {
        field: "body",
        reason: e.to_string(),
    })?;
    validate_payload(&payload)
}

/// Validate a decoded JSON payload.
///
/// Presence of all fields is checked before any value is converted, so a
/// payload that is both incomplete and malformed reports `MissingFields`.
/// Unknown keys are ignored.
pub fn validate_payload(payload: &Value) -> Result<ValidatedReading, ValidationError> {
    let object = payload.as_object().ok_or_else(|| ValidationError::InvalidFormat {
        field: "body",
        reason: format!("expected a JSON object, got {}", kind_of(payload)),
    })?;

    let missing: Vec<&'static str> = REQUIRED_FIELDS
        .iter()
        .copied()
        .filter(|field| !object.contains_key(*field))
        .collect();
    if !missing.is_empty() {
        return Err(ValidationError::MissingFields(missing));
    }

    Ok(ValidatedReading {
        temperature: field_as_f64(object, "temperature")?,
        humidity: field_as_f64(object, "humidity")?,
        pressure: field_as_f64(object, "pressure")?,
    })
}

fn field_as_f64(object: &Map<String, Value>, field: &'static str) -> Result<f64, ValidationError> {
    let invalid = |reason: String| {
        debug!(field = field, %reason, "Rejected field value");
        ValidationError::InvalidFormat { field, reason }
    };

    let value = match &object[field] {
        Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| invalid(format!("{} is not representable as f64", n)))?,
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| invalid(format!("{:?} is not a number", s)))?,
        other => return Err(invalid(format!("expected a number, got {}", kind_of(other)))),
    };

    if value.is_finite() {
        Ok(value)
    } else {
        Err(invalid(format!("{} is not finite", value)))
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    #[test]
    fn test_valid_payload() {
        let reading =
            validate_payload(&json!({"temperature": 21.5, "humidity": 40.2, "pressure": 1013.1}))
                .unwrap();
        assert_eq!(reading.temperature, 21.5);
        assert_eq!(reading.humidity, 40.2);
        assert_eq!(reading.pressure, 1013.1);
    }

    #[test]
    fn test_integers_and_numeric_strings_are_coerced() {
        let reading =
            validate_payload(&json!({"temperature": 20, "humidity": " 40.5 ", "pressure": "1e3"}))
                .unwrap();
        assert_eq!(reading.temperature, 20.0);
        assert_eq!(reading.humidity, 40.5);
        assert_eq!(reading.pressure, 1000.0);
    }

    #[test]
    fn test_extra_keys_are_ignored() {
        let reading = validate_payload(
            &json!({"temperature": 1, "humidity": 2, "pressure": 3, "battery": 3.7}),
        )
        .unwrap();
        assert_eq!(reading.pressure, 3.0);
    }

    #[test]
    fn test_missing_fields() {
        let err = validate_payload(&json!({"temperature": 20})).unwrap_err();
        assert_eq!(
            err,
            ValidationError::MissingFields(vec!["humidity", "pressure"])
        );
        assert_eq!(err.reason(), "Missing required fields");
        assert_eq!(err.kind(), "missing_fields");
    }

    #[test]
    fn test_missing_reported_before_invalid() {
        let err = validate_payload(&json!({"temperature": "hot"})).unwrap_err();
        assert!(matches!(err, ValidationError::MissingFields(_)));
    }

    #[test]
    fn test_invalid_format() {
        let err = validate_payload(&json!({"temperature": "hot", "humidity": 40, "pressure": 1000}))
            .unwrap_err();
        assert!(matches!(
            err,
            ValidationError::InvalidFormat { field: "temperature", .. }
        ));
        assert_eq!(err.reason(), "Invalid data format");
        assert_eq!(err.kind(), "invalid_format");
    }

    #[test]
    fn test_non_numeric_json_types_rejected() {
        for bad in [json!(null), json!(true), json!([1.0]), json!({"v": 1.0})] {
            let payload = json!({"temperature": 1, "humidity": bad, "pressure": 3});
            assert!(matches!(
                validate_payload(&payload),
                Err(ValidationError::InvalidFormat { field: "humidity", .. })
            ));
        }
    }

    #[test]
    fn test_non_finite_strings_rejected() {
        for bad in ["nan", "inf", "-infinity", "1e999"] {
            let payload = json!({"temperature": 1, "humidity": 2, "pressure": bad});
            assert!(matches!(
                validate_payload(&payload),
                Err(ValidationError::InvalidFormat { field: "pressure", .. })
            ));
        }
    }

    #[test]
    fn test_non_object_body() {
        assert!(matches!(
            validate_payload(&json!([21.5, 40.2, 1013.1])),
            Err(ValidationError::InvalidFormat { field: "body", .. })
        ));
        assert!(matches!(
            validate_body(b"temperature=21.5"),
            Err(ValidationError::InvalidFormat { field: "body", .. })
        ));
        assert!(matches!(
            validate_body(b""),
            Err(ValidationError::InvalidFormat { field: "body", .. })
        ));
    }

    #[test]
    fn test_validate_body() {
        let reading =
            validate_body(br#"{"temperature": -5.25, "humidity": 99.9, "pressure": 870}"#).unwrap();
        assert_eq!(
            reading,
            ValidatedReading {
                temperature: -5.25,
                humidity: 99.9,
                pressure: 870.0
            }
        );
    }

    proptest! {
        #[test]
        fn prop_finite_numbers_preserved(
            t in any::<f64>().prop_filter("finite", |v| v.is_finite()),
            h in any::<f64>().prop_filter("finite", |v| v.is_finite()),
            p in any::<f64>().prop_filter("finite", |v| v.is_finite()),
        ) {
            let reading = validate_payload(&json!({"temperature": t, "humidity": h, "pressure": p})).unwrap();
            prop_assert_eq!(reading, ValidatedReading { temperature: t, humidity: h, pressure: p });
        }

        #[test]
        fn prop_numeric_strings_preserved(t in -1.0e6f64..1.0e6) {
            let payload = json!({"temperature": t.to_string(), "humidity": 0, "pressure": 0});
            let reading = validate_payload(&payload).unwrap();
            prop_assert_eq!(reading.temperature, t);
        }

        #[test]
        fn prop_missing_fields_listed(mask in 0u8..7) {
            let mut object = Map::new();
            for (i, field) in REQUIRED_FIELDS.iter().enumerate() {
                if mask & (1 << i) != 0 {
                    object.insert(field.to_string(), json!(1.0));
                }
            }
            let expected: Vec<&'static str> = REQUIRED_FIELDS
                .iter()
                .enumerate()
                .filter(|(i, _)| mask & (1 << i) == 0)
                .map(|(_, f)| *f)
                .collect();
            prop_assert_eq!(
                validate_payload(&Value::Object(object)),
                Err(ValidationError::MissingFields(expected))
            );
        }
    }
}
