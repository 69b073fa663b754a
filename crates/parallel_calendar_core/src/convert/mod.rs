//! Conversion layer between domain values and persisted representations.
//!
//! # Responsibility
//! - Map identifiers, instants and optional fields to SQLite column values
//!   and back, losslessly.
//! - Fail closed on persisted data that cannot be decoded.
//!
//! # Invariants
//! - `None` maps to SQL NULL and back to `None`; `Some("")` and `Some({})`
//!   survive as themselves.
//! - Instants are stored as epoch milliseconds; sub-millisecond precision is
//!   dropped before storage, never after.
//! - Malformed `ext_data` surfaces as `MalformedMetadata`, never as `None`.

mod rows;

pub use rows::{TaskRow, TimeSlotRow, UserRow};

use crate::model::{normalize_instant, ExtData, TimeSlotId};
use chrono::{DateTime, Utc};
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConversionError {
    /// Persisted or outgoing extension metadata is not a JSON object.
    #[error("malformed ext_data for time slot {time_slot_id}: {reason}")]
    MalformedMetadata {
        time_slot_id: TimeSlotId,
        reason: String,
    },
    /// Any other column value that does not map to a valid domain value.
    #[error("invalid persisted data: {0}")]
    InvalidData(String),
}

pub type ConversionResult<T> = Result<T, ConversionError>;

pub fn instant_to_millis(value: DateTime<Utc>) -> i64 {
    normalize_instant(value).timestamp_millis()
}

pub fn millis_to_instant(value: i64, column: &'static str) -> ConversionResult<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp_millis(value).ok_or_else(|| {
        ConversionError::InvalidData(format!("instant `{value}` out of range in {column}"))
    })
}

pub fn uuid_to_db(value: Uuid) -> String {
    value.hyphenated().to_string()
}

pub fn parse_uuid(value: &str, column: &'static str) -> ConversionResult<Uuid> {
    Uuid::parse_str(value)
        .map_err(|_| ConversionError::InvalidData(format!("invalid uuid `{value}` in {column}")))
}

/// Encodes extension metadata as JSON object text; `None` stays NULL.
pub fn encode_ext_data(
    ext_data: Option<&ExtData>,
    time_slot_id: TimeSlotId,
) -> ConversionResult<Option<String>> {
    ext_data
        .map(|map| {
            serde_json::to_string(map).map_err(|err| ConversionError::MalformedMetadata {
                time_slot_id,
                reason: err.to_string(),
            })
        })
        .transpose()
}

/// Decodes persisted extension metadata. Anything but a JSON object fails.
pub fn decode_ext_data(
    raw: Option<&str>,
    time_slot_id: TimeSlotId,
) -> ConversionResult<Option<ExtData>> {
    let Some(raw) = raw else {
        return Ok(None);
    };
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(map)) => Ok(Some(map)),
        Ok(other) => Err(ConversionError::MalformedMetadata {
            time_slot_id,
            reason: format!("expected a JSON object, found {}", json_kind(&other)),
        }),
        Err(err) => Err(ConversionError::MalformedMetadata {
            time_slot_id,
            reason: err.to_string(),
        }),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::{decode_ext_data, encode_ext_data, millis_to_instant, ConversionError};
    use serde_json::json;
    use uuid::Uuid;

    #[test]
    fn absent_and_empty_ext_data_stay_distinct() {
        let id = Uuid::now_v7();
        assert_eq!(encode_ext_data(None, id).unwrap(), None);

        let empty = serde_json::Map::new();
        let encoded = encode_ext_data(Some(&empty), id).unwrap();
        assert_eq!(encoded.as_deref(), Some("{}"));
        assert_eq!(decode_ext_data(encoded.as_deref(), id).unwrap(), Some(empty));
        assert_eq!(decode_ext_data(None, id).unwrap(), None);
    }

    #[test]
    fn non_object_ext_data_is_malformed() {
        let id = Uuid::now_v7();
        for raw in ["[1, 2]", "null", "\"text\"", "{broken"] {
            let err = decode_ext_data(Some(raw), id).unwrap_err();
            assert!(
                matches!(err, ConversionError::MalformedMetadata { time_slot_id, .. } if time_slot_id == id),
                "`{raw}` should be rejected"
            );
        }
        let nested = json!({"color": "teal", "tags": ["deep"]});
        assert!(decode_ext_data(Some(&nested.to_string()), id).is_ok());
    }

    #[test]
    fn out_of_range_millis_are_rejected() {
        let err = millis_to_instant(i64::MAX, "time_slots.start_at").unwrap_err();
        assert!(matches!(err, ConversionError::InvalidData(_)));
    }
}
