//! Row ↔ record conversion helpers.
//!
//! Records are column-name → JSON maps, so every repo-independent operation
//! goes through these conversions. They also handle the dual datetime format
//! issue (`SQLite`'s `datetime('now')` vs Rust's `to_rfc3339()`).

use base64::Engine;
use chrono::{DateTime, Utc};
use serde_json::{Number, Value};
use vestige_core::record::Record;

use crate::error::DatabaseError;

/// Convert a JSON value into a bindable SQL value.
///
/// Booleans become 0/1 and nested arrays/objects are stored as JSON text,
/// matching how `SQLite` itself has no boolean or document type.
#[must_use]
pub fn json_to_sql(value: &Value) -> libsql::Value {
    match value {
        Value::Null => libsql::Value::Null,
        Value::Bool(b) => libsql::Value::Integer(i64::from(*b)),
        Value::Number(n) => n.as_i64().map_or_else(
            || libsql::Value::Real(n.as_f64().unwrap_or_default()),
            libsql::Value::Integer,
        ),
        Value::String(s) => libsql::Value::Text(s.clone()),
        Value::Array(_) | Value::Object(_) => libsql::Value::Text(value.to_string()),
    }
}

/// Convert a SQL value read from a row into JSON.
///
/// Non-finite reals become null; blobs become standard base64 text.
#[must_use]
pub fn sql_to_json(value: libsql::Value) -> Value {
    match value {
        libsql::Value::Null => Value::Null,
        libsql::Value::Integer(i) => Value::from(i),
        libsql::Value::Real(f) => Number::from_f64(f).map_or(Value::Null, Value::Number),
        libsql::Value::Text(s) => Value::String(s),
        libsql::Value::Blob(bytes) => {
            Value::String(base64::engine::general_purpose::STANDARD.encode(bytes))
        }
    }
}

/// Read every column of `row` into a record keyed by column name.
///
/// # Errors
///
/// Returns `DatabaseError` if a column value cannot be read.
pub fn row_to_record(row: &libsql::Row) -> Result<Record, DatabaseError> {
    let mut record = Record::new();
    for idx in 0..row.column_count() {
        let name = row
            .column_name(idx)
            .ok_or_else(|| DatabaseError::Query(format!("Unnamed result column {idx}")))?
            .to_string();
        record.insert(name, sql_to_json(row.get_value(idx)?));
    }
    Ok(record)
}

/// Drain a result set into records.
///
/// # Errors
///
/// Returns `DatabaseError` if fetching or converting a row fails.
pub async fn collect_records(mut rows: libsql::Rows) -> Result<Vec<Record>, DatabaseError> {
    let mut records = Vec::new();
    while let Some(row) = rows.next().await? {
        records.push(row_to_record(&row)?);
    }
    Ok(records)
}

/// Parse a required TEXT column as `DateTime<Utc>`.
///
/// Handles both RFC 3339 (`"2026-02-09T14:30:00+00:00"`) and `SQLite`'s default
/// format (`"2026-02-09 14:30:00"`).
///
/// # Errors
///
/// Returns `DatabaseError::Query` if the string cannot be parsed as either format.
pub fn parse_datetime(s: &str) -> Result<DateTime<Utc>, DatabaseError> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
        .map(|naive| naive.and_utc())
        .map_err(|e| DatabaseError::Query(format!("Failed to parse datetime '{s}': {e}")))
}
