//! Database error types for accountable-db.

use accountable_config::ConfigError;
use thiserror::Error;

/// Errors from record persistence and querying.
///
/// Missing stamp columns and a missing actor are never errors; the observer
/// skips them. Everything here comes from storage or from misuse of the
/// service API.
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// A SQL query failed or returned malformed data.
    #[error("Query failed: {0}")]
    Query(String),

    /// Expected a result row but none was returned.
    #[error("No result returned")]
    NoResult,

    /// A model schema is inconsistent with its declared capabilities.
    #[error("Invalid schema for '{table}': {reason}")]
    InvalidSchema { table: String, reason: String },

    /// A record's table was never registered with the service.
    #[error("Model '{0}' is not registered")]
    UnknownModel(String),

    /// Invalid state encountered (e.g., updating a record that was never saved).
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Configuration handed to the service failed validation.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Underlying libSQL error.
    #[error("libSQL error: {0}")]
    LibSql(#[from] libsql::Error),
}

impl DatabaseError {
    pub(crate) fn invalid_schema(table: &str, reason: impl Into<String>) -> Self {
        Self::InvalidSchema {
            table: table.to_string(),
            reason: reason.into(),
        }
    }
}
