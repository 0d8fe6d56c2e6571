// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Value coercion between wire JSON and the typed getter surface.
//!
//! The remote function has no declared schema, so getters coerce whatever
//! runtime kind arrived: numbers render as strings, numeric strings parse,
//! bytes travel as base64 text. Errors are plain messages; callers attach
//! the parameter index or column name.

use base64::{Engine as _, engine::general_purpose};
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde_json::Value;

/// Render a value as text. Nulls yield `None`.
pub(crate) fn as_string(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        other => Some(other.to_string()),
    }
}

/// Coerce to a signed integer. Nulls read as 0.
pub(crate) fn as_i64(value: &Value) -> Result<i64, String> {
    match value {
        Value::Null => Ok(0),
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .ok_or_else(|| "value cannot be read as an integer".to_string()),
        Value::String(s) => s
            .trim()
            .parse::<i64>()
            .map_err(|_| format!("value '{s}' cannot be read as an integer")),
        Value::Bool(b) => Ok(i64::from(*b)),
        _ => Err("value cannot be read as an integer".to_string()),
    }
}

/// Coerce to a double. Nulls read as 0.0.
pub(crate) fn as_f64(value: &Value) -> Result<f64, String> {
    match value {
        Value::Null => Ok(0.0),
        Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| "value cannot be read as a double".to_string()),
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| format!("value '{s}' cannot be read as a double")),
        _ => Err("value cannot be read as a double".to_string()),
    }
}

/// Coerce to a boolean. Nulls read as false; `"true"`, `"1"` and `"yes"`
/// strings and non-zero numbers read as true.
pub(crate) fn as_bool(value: &Value) -> Result<bool, String> {
    match value {
        Value::Null => Ok(false),
        Value::Bool(b) => Ok(*b),
        Value::Number(n) => Ok(n
            .as_i64()
            .map(|i| i != 0)
            .unwrap_or_else(|| n.as_f64().map(|f| f != 0.0).unwrap_or(false))),
        Value::String(s) => {
            let s = s.trim().to_lowercase();
            Ok(s == "true" || s == "1" || s == "yes")
        }
        _ => Err("value cannot be read as a boolean".to_string()),
    }
}

/// Decode bytes from base64 text or a JSON byte array. Nulls yield `None`.
pub(crate) fn as_bytes(value: &Value) -> Result<Option<Vec<u8>>, String> {
    match value {
        Value::Null => Ok(None),
        Value::String(s) => general_purpose::STANDARD
            .decode(s)
            .map(Some)
            .map_err(|e| format!("value cannot be decoded as base64 bytes: {e}")),
        Value::Array(items) => {
            let mut bytes = Vec::with_capacity(items.len());
            for item in items {
                let byte = item
                    .as_u64()
                    .and_then(|b| u8::try_from(b).ok())
                    .ok_or_else(|| "value is not a byte array".to_string())?;
                bytes.push(byte);
            }
            Ok(Some(bytes))
        }
        _ => Err("value cannot be read as bytes".to_string()),
    }
}

/// Parse a `YYYY-MM-DD` date. Nulls yield `None`.
pub(crate) fn as_date(value: &Value) -> Result<Option<NaiveDate>, String> {
    match as_string(value) {
        None => Ok(None),
        Some(s) => NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
            .map(Some)
            .map_err(|_| format!("value '{s}' cannot be read as a date")),
    }
}

/// Parse an `HH:MM:SS` time. Nulls yield `None`.
pub(crate) fn as_time(value: &Value) -> Result<Option<NaiveTime>, String> {
    match as_string(value) {
        None => Ok(None),
        Some(s) => NaiveTime::parse_from_str(s.trim(), "%H:%M:%S")
            .map(Some)
            .map_err(|_| format!("value '{s}' cannot be read as a time")),
    }
}

/// Parse a timestamp from RFC 3339 or `YYYY-MM-DD HH:MM:SS`. Nulls yield
/// `None`.
pub(crate) fn as_timestamp(value: &Value) -> Result<Option<NaiveDateTime>, String> {
    match as_string(value) {
        None => Ok(None),
        Some(s) => {
            let trimmed = s.trim();
            if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
                return Ok(Some(dt.with_timezone(&Utc).naive_utc()));
            }
            NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%d %H:%M:%S")
                .map(Some)
                .map_err(|_| format!("value '{s}' cannot be read as a timestamp"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_string_coercions() {
        assert_eq!(as_string(&json!(42)).as_deref(), Some("42"));
        assert_eq!(as_string(&json!(true)).as_deref(), Some("true"));
        assert_eq!(as_string(&Value::Null), None);
    }

    #[test]
    fn test_numeric_coercions() {
        assert_eq!(as_i64(&json!("42")).unwrap(), 42);
        assert_eq!(as_i64(&json!(2.9)).unwrap(), 2);
        assert_eq!(as_f64(&json!(" 1.5 ")).unwrap(), 1.5);
        assert!(as_i64(&json!("x")).is_err());
    }

    #[test]
    fn test_bool_coercions() {
        assert!(as_bool(&json!("YES")).unwrap());
        assert!(as_bool(&json!(1)).unwrap());
        assert!(!as_bool(&json!("no")).unwrap());
        assert!(!as_bool(&json!(0.0)).unwrap());
    }

    #[test]
    fn test_byte_array_forms() {
        assert_eq!(as_bytes(&json!("aGk=")).unwrap().unwrap(), b"hi");
        assert_eq!(as_bytes(&json!([104, 105])).unwrap().unwrap(), b"hi");
        assert!(as_bytes(&json!([300])).is_err());
    }
}
