//! Conversion between model values and SQLite cells
//!
//! Each stored cell is a `(kind, value)` pair. The kind tag keeps `Int` and
//! `Long` apart and tells the decoder how to read the untyped value column.

use chrono::{DateTime, SecondsFormat, Utc};
use mvdb_core::{Value, ValueKind};
use rusqlite::types::Value as SqlValue;
use uuid::Uuid;

use crate::errors::{corrupt_row, Result};

/// Encode a value into its kind tag and SQLite representation
pub fn encode(value: &Value) -> (Option<&'static str>, SqlValue) {
    let tag = value.kind().map(|k| k.as_str());
    let cell = match value {
        Value::Null => SqlValue::Null,
        Value::String(s) => SqlValue::Text(s.clone()),
        Value::Int(i) => SqlValue::Integer(i64::from(*i)),
        Value::Long(l) => SqlValue::Integer(*l),
        // Fixed nanosecond precision keeps equality queries textual
        Value::Timestamp(t) => SqlValue::Text(t.to_rfc3339_opts(SecondsFormat::Nanos, true)),
        Value::Bool(b) => SqlValue::Integer(i64::from(*b)),
        Value::Blob(b) => SqlValue::Blob(b.clone()),
        Value::Uuid(u) => SqlValue::Text(u.to_string()),
    };
    (tag, cell)
}

/// Decode a stored `(kind, value)` pair
pub fn decode(table: &str, tag: Option<&str>, cell: SqlValue) -> Result<Value> {
    let Some(tag) = tag else {
        return Ok(Value::Null);
    };
    let kind =
        ValueKind::from_tag(tag).ok_or_else(|| corrupt_row(table, format!("kind {}", tag)))?;

    match (kind, cell) {
        (ValueKind::String, SqlValue::Text(s)) => Ok(Value::String(s)),
        (ValueKind::Int, SqlValue::Integer(i)) => i32::try_from(i)
            .map(Value::Int)
            .map_err(|_| corrupt_row(table, format!("int out of range: {}", i))),
        (ValueKind::Long, SqlValue::Integer(l)) => Ok(Value::Long(l)),
        (ValueKind::Timestamp, SqlValue::Text(s)) => DateTime::parse_from_rfc3339(&s)
            .map(|t| Value::Timestamp(t.with_timezone(&Utc)))
            .map_err(|e| corrupt_row(table, e)),
        (ValueKind::Bool, SqlValue::Integer(b)) => Ok(Value::Bool(b != 0)),
        (ValueKind::Blob, SqlValue::Blob(b)) => Ok(Value::Blob(b)),
        (ValueKind::Uuid, SqlValue::Text(s)) => Uuid::parse_str(&s)
            .map(Value::Uuid)
            .map_err(|e| corrupt_row(table, e)),
        (kind, cell) => Err(corrupt_row(
            table,
            format!("{} cell holds {:?}", kind, cell.data_type()),
        )),
    }
}

/// Parse a UUID stored as text
pub fn parse_id(table: &str, text: &str) -> Result<Uuid> {
    Uuid::parse_str(text).map_err(|e| corrupt_row(table, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn roundtrip(value: Value) -> Value {
        let (tag, cell) = encode(&value);
        decode("test", tag, cell).unwrap()
    }

    #[test]
    fn test_timestamp_keeps_nanoseconds() {
        let t = Utc.timestamp_opt(1_700_000_000, 123_456_789).unwrap();
        assert_eq!(roundtrip(Value::Timestamp(t)), Value::Timestamp(t));
    }

    #[test]
    fn test_int_and_long_decode_to_their_own_kind() {
        assert_eq!(roundtrip(Value::Int(-7)), Value::Int(-7));
        assert_eq!(roundtrip(Value::Long(-7)), Value::Long(-7));
        assert_eq!(encode(&Value::Int(1)).0, Some("int"));
        assert_eq!(encode(&Value::Long(1)).0, Some("long"));
    }

    #[test]
    fn test_null_has_no_tag() {
        let (tag, cell) = encode(&Value::Null);
        assert_eq!(tag, None);
        assert_eq!(cell, SqlValue::Null);
        assert_eq!(decode("test", None, SqlValue::Null).unwrap(), Value::Null);
    }

    #[test]
    fn test_mismatched_cell_is_corrupt() {
        let err = decode("revision_values", Some("int"), SqlValue::Text("x".into())).unwrap_err();
        assert_eq!(err.kind(), mvdb_core::ExErrorKind::Internal);
        assert!(decode("revision_values", Some("float"), SqlValue::Null).is_err());
    }
}
