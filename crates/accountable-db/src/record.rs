//! Active-record style row representation with dirty tracking.

use std::collections::BTreeMap;
use std::sync::Arc;

use accountable_core::{ActorId, StampRole};
use chrono::{DateTime, Utc};

use crate::error::DatabaseError;
use crate::helpers::{parse_datetime, row_to_attributes, same_value, value_to_actor, value_to_json};
use crate::schema::ModelSchema;

/// One row of a registered record type.
///
/// `attributes` holds the current values, `original` the values last read
/// from or written to storage. The difference between them is what an
/// update writes.
#[derive(Debug, Clone)]
pub struct Record {
    schema: Arc<ModelSchema>,
    attributes: BTreeMap<String, libsql::Value>,
    original: BTreeMap<String, libsql::Value>,
    exists: bool,
}

impl Record {
    /// New, unsaved record.
    #[must_use]
    pub fn new(schema: &Arc<ModelSchema>) -> Self {
        Self {
            schema: Arc::clone(schema),
            attributes: BTreeMap::new(),
            original: BTreeMap::new(),
            exists: false,
        }
    }

    /// Record loaded from a row of `schema`'s table.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if a column cannot be read.
    pub fn from_row(schema: &Arc<ModelSchema>, row: &libsql::Row) -> Result<Self, DatabaseError> {
        let attributes = row_to_attributes(row)?;
        Ok(Self {
            schema: Arc::clone(schema),
            original: attributes.clone(),
            attributes,
            exists: true,
        })
    }

    #[must_use]
    pub fn schema(&self) -> &Arc<ModelSchema> {
        &self.schema
    }

    /// Whether the record has been persisted and not hard-deleted.
    #[must_use]
    pub const fn exists(&self) -> bool {
        self.exists
    }

    #[must_use]
    pub fn get(&self, column: &str) -> Option<&libsql::Value> {
        self.attributes.get(column)
    }

    pub fn set(&mut self, column: impl Into<String>, value: impl Into<libsql::Value>) -> &mut Self {
        self.attributes.insert(column.into(), value.into());
        self
    }

    /// Builder-style [`Self::set`].
    #[must_use]
    pub fn with(mut self, column: impl Into<String>, value: impl Into<libsql::Value>) -> Self {
        self.set(column, value);
        self
    }

    /// Absent or NULL.
    #[must_use]
    pub fn is_blank(&self, column: &str) -> bool {
        matches!(self.get(column), None | Some(libsql::Value::Null))
    }

    #[must_use]
    pub fn get_i64(&self, column: &str) -> Option<i64> {
        match self.get(column)? {
            libsql::Value::Integer(i) => Some(*i),
            _ => None,
        }
    }

    #[must_use]
    pub fn get_text(&self, column: &str) -> Option<&str> {
        match self.get(column)? {
            libsql::Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Actor id stored in `column`.
    #[must_use]
    pub fn get_actor(&self, column: &str) -> Option<ActorId> {
        self.get(column).and_then(value_to_actor)
    }

    /// Actor stored for `role`, read through the configured column.
    #[must_use]
    pub fn stamp(&self, role: StampRole) -> Option<ActorId> {
        self.get_actor(self.schema.filter_column(role))
    }

    /// Primary key value, if assigned.
    #[must_use]
    pub fn key(&self) -> Option<&libsql::Value> {
        self.get(self.schema.key_column())
            .filter(|v| !matches!(v, libsql::Value::Null))
    }

    /// Primary key as storage last saw it.
    pub(crate) fn original_key(&self) -> Option<&libsql::Value> {
        self.original
            .get(self.schema.key_column())
            .filter(|v| !matches!(v, libsql::Value::Null))
    }

    /// Whether the soft-delete column is set.
    #[must_use]
    pub fn is_trashed(&self) -> bool {
        self.schema
            .soft_delete_column()
            .is_some_and(|column| !self.is_blank(column))
    }

    /// When the record was soft-deleted.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError::Query` if the column holds an unparseable timestamp.
    pub fn deleted_at(&self) -> Result<Option<DateTime<Utc>>, DatabaseError> {
        let Some(column) = self.schema.soft_delete_column() else {
            return Ok(None);
        };
        match self.get(column) {
            Some(libsql::Value::Text(s)) => parse_datetime(s).map(Some),
            _ => Ok(None),
        }
    }

    /// Columns whose value differs from what storage last saw.
    #[must_use]
    pub fn dirty(&self) -> Vec<(&str, &libsql::Value)> {
        self.attributes
            .iter()
            .filter(|(column, value)| {
                self.original
                    .get(column.as_str())
                    .is_none_or(|old| !same_value(old, value))
            })
            .map(|(column, value)| (column.as_str(), value))
            .collect()
    }

    #[must_use]
    pub fn is_dirty(&self) -> bool {
        !self.dirty().is_empty()
    }

    #[must_use]
    pub fn is_column_dirty(&self, column: &str) -> bool {
        self.dirty().iter().any(|(c, _)| *c == column)
    }

    /// All attributes, in column order.
    pub fn attributes(&self) -> impl Iterator<Item = (&str, &libsql::Value)> {
        self.attributes.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// JSON object of the current attributes.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::Value::Object(
            self.attributes
                .iter()
                .map(|(k, v)| (k.clone(), value_to_json(v)))
                .collect(),
        )
    }

    pub(crate) fn sync_original(&mut self) {
        self.original.clone_from(&self.attributes);
    }

    pub(crate) const fn set_exists(&mut self, exists: bool) {
        self.exists = exists;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn schema() -> Arc<ModelSchema> {
        Arc::new(
            ModelSchema::new("posts")
                .columns(["title", "created_by"])
                .soft_deletes(),
        )
    }

    #[test]
    fn new_record_is_dirty_once_set() {
        let schema = schema();
        let mut record = Record::new(&schema);
        assert!(!record.exists());
        assert!(!record.is_dirty());

        record.set("title", "hello");
        assert!(record.is_dirty());
        assert!(record.is_column_dirty("title"));
        assert_eq!(record.get_text("title"), Some("hello"));
    }

    #[test]
    fn sync_original_clears_dirty() {
        let schema = schema();
        let mut record = Record::new(&schema).with("title", "a").with("id", 1_i64);
        record.sync_original();
        assert!(!record.is_dirty());

        record.set("title", "a");
        assert!(!record.is_dirty(), "same value is not a change");

        record.set("title", "b");
        assert_eq!(record.dirty().len(), 1);
        assert_eq!(record.dirty()[0].0, "title");
    }

    #[test]
    fn blank_covers_absent_and_null() {
        let schema = schema();
        let mut record = Record::new(&schema);
        assert!(record.is_blank("created_by"));
        record.set("created_by", libsql::Value::Null);
        assert!(record.is_blank("created_by"));
        record.set("created_by", 7_i64);
        assert!(!record.is_blank("created_by"));
        assert_eq!(record.get_actor("created_by"), Some(ActorId::Int(7)));
        assert_eq!(record.stamp(StampRole::CreatedBy), Some(ActorId::Int(7)));
    }

    #[test]
    fn key_ignores_null() {
        let schema = schema();
        let mut record = Record::new(&schema);
        assert!(record.key().is_none());
        record.set("id", libsql::Value::Null);
        assert!(record.key().is_none());
        record.set("id", 5_i64);
        assert!(matches!(record.key(), Some(libsql::Value::Integer(5))));
    }

    #[test]
    fn trashed_reads_soft_delete_column() {
        let schema = schema();
        let mut record = Record::new(&schema);
        assert!(!record.is_trashed());
        assert!(record.deleted_at().unwrap().is_none());

        record.set("deleted_at", "2026-02-09T14:30:00+00:00");
        assert!(record.is_trashed());
        assert!(record.deleted_at().unwrap().is_some());
    }

    #[test]
    fn to_json_renders_attributes() {
        let schema = schema();
        let record = Record::new(&schema).with("title", "t").with("created_by", 3_i64);
        assert_eq!(
            record.to_json(),
            serde_json::json!({ "created_by": 3, "title": "t" })
        );
    }
}
