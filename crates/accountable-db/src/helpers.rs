//! Row and value conversion helpers.
//!
//! Records carry raw `libsql::Value`s. These helpers convert between those
//! values, actor ids, and JSON, and read untyped rows by column name.

use std::collections::BTreeMap;

use accountable_core::ActorId;
use chrono::{DateTime, Utc};

use crate::error::DatabaseError;

/// Quote an identifier for interpolation into SQL.
#[must_use]
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Storage value for an actor id.
#[must_use]
pub fn actor_to_value(id: &ActorId) -> libsql::Value {
    match id {
        ActorId::Int(id) => libsql::Value::Integer(*id),
        ActorId::Text(id) => libsql::Value::Text(id.clone()),
    }
}

/// Actor id stored in a column. `None` for NULL, reals and blobs.
#[must_use]
pub fn value_to_actor(value: &libsql::Value) -> Option<ActorId> {
    match value {
        libsql::Value::Integer(id) => Some(ActorId::Int(*id)),
        libsql::Value::Text(id) => Some(ActorId::Text(id.clone())),
        libsql::Value::Null | libsql::Value::Real(_) | libsql::Value::Blob(_) => None,
    }
}

/// Structural equality for stored values.
///
/// Reals compare bitwise so a NaN written back unchanged is not dirty.
#[must_use]
pub fn same_value(a: &libsql::Value, b: &libsql::Value) -> bool {
    use libsql::Value::{Blob, Integer, Null, Real, Text};
    match (a, b) {
        (Null, Null) => true,
        (Integer(a), Integer(b)) => a == b,
        (Real(a), Real(b)) => a.to_bits() == b.to_bits(),
        (Text(a), Text(b)) => a == b,
        (Blob(a), Blob(b)) => a == b,
        _ => false,
    }
}

/// JSON rendering of a stored value. Blobs become byte arrays.
#[must_use]
pub fn value_to_json(value: &libsql::Value) -> serde_json::Value {
    match value {
        libsql::Value::Null => serde_json::Value::Null,
        libsql::Value::Integer(i) => serde_json::Value::from(*i),
        libsql::Value::Real(f) => serde_json::Number::from_f64(*f)
            .map_or(serde_json::Value::Null, serde_json::Value::Number),
        libsql::Value::Text(s) => serde_json::Value::String(s.clone()),
        libsql::Value::Blob(b) => serde_json::Value::from(b.clone()),
    }
}

/// Read every column of a row into a name-keyed map.
///
/// # Errors
///
/// Returns `DatabaseError::Query` if a column has no name, or
/// `DatabaseError::LibSql` if a value cannot be read.
pub fn row_to_attributes(
    row: &libsql::Row,
) -> Result<BTreeMap<String, libsql::Value>, DatabaseError> {
    let mut attributes = BTreeMap::new();
    for idx in 0..row.column_count() {
        let name = row
            .column_name(idx)
            .ok_or_else(|| DatabaseError::Query(format!("column {idx} has no name")))?
            .to_string();
        attributes.insert(name, row.get_value(idx)?);
    }
    Ok(attributes)
}

/// Parse a TEXT timestamp as `DateTime<Utc>`.
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

/// Current time as stored in timestamp columns.
pub(crate) fn now_value() -> libsql::Value {
    libsql::Value::Text(Utc::now().to_rfc3339())
}
