//! # accountable-db
//!
//! libSQL record persistence with actor stamping.
//!
//! Record types are described by a [`schema::ModelSchema`] and registered
//! with a [`service::RecordService`]. Types registered as accountable get an
//! [`observer::AccountableObserver`] that writes the acting user into their
//! `created_by`, `updated_by` and `deleted_by` columns on create, update and
//! soft delete. The [`accountable`] module adds relations to those users and
//! query filters over those columns.
//!
//! The actor is passed explicitly into every write; configuration is passed
//! once into the service. Schema management is left to the host application.

pub mod accountable;
pub mod error;
pub mod helpers;
pub mod observer;
pub mod query;
pub mod record;
pub mod schema;
pub mod service;

#[cfg(test)]
mod test_support;

use error::DatabaseError;
use libsql::Builder;

/// Tracing target for lifecycle observer decisions.
pub const TRACING_TARGET_OBSERVER: &str = "accountable_db::observer";

/// Tracing target for generated SQL.
pub const TRACING_TARGET_QUERY: &str = "accountable_db::query";

/// Tracing target for record service writes and registration.
pub const TRACING_TARGET_SERVICE: &str = "accountable_db::service";

/// Database handle shared by the record service, queries and relations.
pub struct AccountableDb {
    #[allow(dead_code)]
    db: libsql::Database,
    conn: libsql::Connection,
}

impl AccountableDb {
    /// Open a local database at the given path, or `":memory:"`.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the database cannot be opened.
    pub async fn open_local(path: &str) -> Result<Self, DatabaseError> {
        let db = Builder::new_local(path).build().await?;
        let conn = db.connect()?;

        // Enable foreign keys (must be per-connection in SQLite)
        conn.execute("PRAGMA foreign_keys = ON", ()).await?;

        Ok(Self { db, conn })
    }

    /// Access the underlying libSQL connection for direct queries.
    #[must_use]
    pub const fn conn(&self) -> &libsql::Connection {
        &self.conn
    }

    /// Run a batch of statements, e.g. the host application's table setup.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError::LibSql` if any statement fails.
    pub async fn execute_batch(&self, sql: &str) -> Result<(), DatabaseError> {
        self.conn.execute_batch(sql).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn open_local_in_memory() {
        let db = AccountableDb::open_local(":memory:").await.unwrap();
        db.execute_batch("CREATE TABLE t (id INTEGER PRIMARY KEY);")
            .await
            .unwrap();

        let mut rows = db
            .conn()
            .query(
                "SELECT name FROM sqlite_master WHERE type='table' AND name=?1",
                ["t"],
            )
            .await
            .unwrap();
        assert!(rows.next().await.unwrap().is_some());
    }

    #[tokio::test]
    async fn foreign_keys_enabled() {
        let db = AccountableDb::open_local(":memory:").await.unwrap();
        let mut rows = db.conn().query("PRAGMA foreign_keys", ()).await.unwrap();
        let row = rows.next().await.unwrap().unwrap();
        assert_eq!(row.get::<i64>(0).unwrap(), 1);
    }

    #[tokio::test]
    async fn bad_batch_is_an_error() {
        let db = AccountableDb::open_local(":memory:").await.unwrap();
        let result = db.execute_batch("CREATE TABLE (").await;
        assert!(matches!(result, Err(DatabaseError::LibSql(_))));
    }
}
