//! Record service: registration, lifecycle hooks and writes.
//!
//! `RecordService` owns the database handle, the injected configuration, and
//! one entry per registered table holding its schema and observers. Every
//! write follows the same protocol:
//! 1. Fire the before-write hook (`creating`, `updating`, `deleting`, `restoring`)
//! 2. Touch timestamps
//! 3. Execute a single INSERT / UPDATE / DELETE
//! 4. Fire the after-write hook
//!
//! Soft deletes persist through a quiet update, so `updating` never fires as
//! part of a delete.

use std::collections::HashMap;
use std::sync::Arc;

use accountable_config::AccountableConfig;
use accountable_core::{Actor, DeleteMode, LifecycleEvent};

use crate::error::DatabaseError;
use crate::helpers::{now_value, quote_ident};
use crate::observer::{AccountableObserver, HookContext, Observer, dispatch};
use crate::query::Query;
use crate::record::Record;
use crate::schema::{Accountability, ModelSchema};
use crate::{AccountableDb, TRACING_TARGET_SERVICE};

struct ModelEntry {
    schema: Arc<ModelSchema>,
    observers: Vec<Arc<dyn Observer>>,
}

/// Persistence entry point for registered record types.
pub struct RecordService {
    db: AccountableDb,
    config: Arc<AccountableConfig>,
    models: HashMap<String, ModelEntry>,
}

impl RecordService {
    /// Wrap an open database with the given configuration.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError::Config` if the configuration fails validation.
    pub fn new(db: AccountableDb, config: AccountableConfig) -> Result<Self, DatabaseError> {
        config.validate()?;
        Ok(Self {
            db,
            config: Arc::new(config),
            models: HashMap::new(),
        })
    }

    /// Open a local database and wrap it.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the database cannot be opened or the
    /// configuration is invalid.
    pub async fn new_local(path: &str, config: AccountableConfig) -> Result<Self, DatabaseError> {
        let db = AccountableDb::open_local(path).await?;
        Self::new(db, config)
    }

    #[must_use]
    pub const fn db(&self) -> &AccountableDb {
        &self.db
    }

    #[must_use]
    pub fn config(&self) -> &AccountableConfig {
        &self.config
    }

    /// Registered schema for `table`.
    #[must_use]
    pub fn schema(&self, table: &str) -> Option<Arc<ModelSchema>> {
        self.models.get(table).map(|entry| Arc::clone(&entry.schema))
    }

    // -----------------------------------------------------------------------
    // Registration
    // -----------------------------------------------------------------------

    /// Register a record type without actor stamping.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError::InvalidSchema` if the schema is malformed,
    /// declares stamps, or its table is already registered.
    pub fn register(&mut self, schema: ModelSchema) -> Result<Arc<ModelSchema>, DatabaseError> {
        self.insert_model(schema, Vec::new())
    }

    /// Register a record type that opts into actor stamping.
    ///
    /// Resolves the configured stamp columns into the schema, checks that
    /// every declared stamp role has its column, and attaches an
    /// [`AccountableObserver`].
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError::InvalidSchema` if a declared stamp column is
    /// missing, `deleted_by` is declared without soft deletes, or the table
    /// is already registered.
    pub fn register_accountable(
        &mut self,
        schema: ModelSchema,
    ) -> Result<Arc<ModelSchema>, DatabaseError> {
        let schema = schema.with_accountability(Accountability::from_config(&self.config));
        let observer: Arc<dyn Observer> = Arc::new(AccountableObserver::new());
        self.insert_model(schema, vec![observer])
    }

    fn insert_model(
        &mut self,
        schema: ModelSchema,
        observers: Vec<Arc<dyn Observer>>,
    ) -> Result<Arc<ModelSchema>, DatabaseError> {
        schema.validate()?;
        if self.models.contains_key(schema.table()) {
            return Err(DatabaseError::invalid_schema(
                schema.table(),
                "table is already registered",
            ));
        }

        let schema = Arc::new(schema);
        tracing::debug!(
            target: TRACING_TARGET_SERVICE,
            table = schema.table(),
            stamps = ?schema.declared_stamps(),
            accountable = schema.accountability().is_some(),
            "registered model"
        );
        self.models.insert(
            schema.table().to_string(),
            ModelEntry {
                schema: Arc::clone(&schema),
                observers,
            },
        );
        Ok(schema)
    }

    /// Attach an additional observer to a registered table.
    ///
    /// Observers run in registration order; the accountable observer, when
    /// present, runs first.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError::UnknownModel` if `table` is not registered.
    pub fn observe(&mut self, table: &str, observer: Arc<dyn Observer>) -> Result<(), DatabaseError> {
        let entry = self
            .models
            .get_mut(table)
            .ok_or_else(|| DatabaseError::UnknownModel(table.to_string()))?;
        entry.observers.push(observer);
        Ok(())
    }

    fn entry(&self, record: &Record) -> Result<&ModelEntry, DatabaseError> {
        let table = record.schema().table();
        self.models
            .get(table)
            .ok_or_else(|| DatabaseError::UnknownModel(table.to_string()))
    }

    fn fire(
        entry: &ModelEntry,
        event: LifecycleEvent,
        actor: Option<&Actor>,
        delete_mode: Option<DeleteMode>,
        record: &mut Record,
    ) {
        let ctx = HookContext {
            actor,
            event,
            delete_mode,
        };
        for observer in &entry.observers {
            dispatch(observer.as_ref(), &ctx, record);
        }
    }

    // -----------------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------------

    /// Fresh, unsaved record of a registered type.
    #[must_use]
    pub fn new_record(&self, schema: &Arc<ModelSchema>) -> Record {
        Record::new(schema)
    }

    /// Query over a registered type. Soft-deleted rows are excluded by default.
    #[must_use]
    pub fn query(&self, schema: &Arc<ModelSchema>) -> Query {
        Query::new(schema)
    }

    /// Fetch all records matching `query`.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the query fails.
    pub async fn get(&self, query: &Query) -> Result<Vec<Record>, DatabaseError> {
        query.get(&self.db).await
    }

    /// Find a record by primary key, ignoring soft-deleted rows.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the query fails.
    pub async fn find(
        &self,
        schema: &Arc<ModelSchema>,
        key: impl Into<libsql::Value>,
    ) -> Result<Option<Record>, DatabaseError> {
        Query::new(schema)
            .filter_eq(schema.key_column(), key)
            .first(&self.db)
            .await
    }

    /// Find a record by primary key, including soft-deleted rows.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the query fails.
    pub async fn find_with_trashed(
        &self,
        schema: &Arc<ModelSchema>,
        key: impl Into<libsql::Value>,
    ) -> Result<Option<Record>, DatabaseError> {
        Query::new(schema)
            .with_trashed()
            .filter_eq(schema.key_column(), key)
            .first(&self.db)
            .await
    }

    // -----------------------------------------------------------------------
    // Writes
    // -----------------------------------------------------------------------

    /// Insert a new record.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError::InvalidState` if the record already exists,
    /// `DatabaseError::UnknownModel` if its type is not registered, or the
    /// storage error from the INSERT.
    pub async fn create(&self, actor: Option<&Actor>, record: &mut Record) -> Result<(), DatabaseError> {
        let entry = self.entry(record)?;
        if record.exists() {
            return Err(DatabaseError::InvalidState(format!(
                "{} record already exists",
                record.schema().table()
            )));
        }

        Self::fire(entry, LifecycleEvent::Creating, actor, None, record);
        touch_timestamps(record, true);
        self.insert(record).await?;
        Self::fire(entry, LifecycleEvent::Created, actor, None, record);
        Ok(())
    }

    /// Write a persisted record's changes.
    ///
    /// Returns `false` without firing any hook when nothing is dirty.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError::InvalidState` if the record was never saved,
    /// `DatabaseError::NoResult` if its row no longer exists, or the storage
    /// error from the UPDATE.
    pub async fn update(&self, actor: Option<&Actor>, record: &mut Record) -> Result<bool, DatabaseError> {
        let entry = self.entry(record)?;
        if !record.exists() {
            return Err(DatabaseError::InvalidState(format!(
                "cannot update unsaved {} record",
                record.schema().table()
            )));
        }
        if !record.is_dirty() {
            return Ok(false);
        }

        Self::fire(entry, LifecycleEvent::Updating, actor, None, record);
        touch_timestamps(record, false);
        self.write_dirty(record).await?;
        Self::fire(entry, LifecycleEvent::Updated, actor, None, record);
        Ok(true)
    }

    /// Create or update depending on whether the record exists.
    ///
    /// # Errors
    ///
    /// Same as [`Self::create`] and [`Self::update`].
    pub async fn save(&self, actor: Option<&Actor>, record: &mut Record) -> Result<(), DatabaseError> {
        if record.exists() {
            self.update(actor, record).await.map(|_| ())
        } else {
            self.create(actor, record).await
        }
    }

    /// Persist without firing any hook. Timestamps are still maintained.
    ///
    /// # Errors
    ///
    /// Returns the storage error from the write.
    pub async fn save_quietly(&self, record: &mut Record) -> Result<(), DatabaseError> {
        self.entry(record)?;
        if record.exists() {
            if record.is_dirty() {
                touch_timestamps(record, false);
                self.write_dirty(record).await?;
            }
        } else {
            touch_timestamps(record, true);
            self.insert(record).await?;
        }
        Ok(())
    }

    /// Delete a record: soft when its type uses soft deletes, hard otherwise.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError::InvalidState` if the record was never saved,
    /// or the storage error from the write.
    pub async fn delete(&self, actor: Option<&Actor>, record: &mut Record) -> Result<(), DatabaseError> {
        let mode = if record.schema().uses_soft_deletes() {
            DeleteMode::Soft
        } else {
            DeleteMode::Force
        };
        self.run_delete(actor, record, mode).await
    }

    /// Remove the row regardless of soft deletes. `deleted_by` is never written.
    ///
    /// # Errors
    ///
    /// Same as [`Self::delete`].
    pub async fn force_delete(&self, actor: Option<&Actor>, record: &mut Record) -> Result<(), DatabaseError> {
        self.run_delete(actor, record, DeleteMode::Force).await
    }

    async fn run_delete(
        &self,
        actor: Option<&Actor>,
        record: &mut Record,
        mode: DeleteMode,
    ) -> Result<(), DatabaseError> {
        let entry = self.entry(record)?;
        if !record.exists() {
            return Err(DatabaseError::InvalidState(format!(
                "cannot delete unsaved {} record",
                record.schema().table()
            )));
        }

        Self::fire(entry, LifecycleEvent::Deleting, actor, Some(mode), record);
        match mode {
            DeleteMode::Soft => {
                let schema = Arc::clone(record.schema());
                if let Some(column) = schema.soft_delete_column() {
                    record.set(column, now_value());
                }
                touch_timestamps(record, false);
                self.write_dirty(record).await?;
            }
            DeleteMode::Force => {
                self.remove(record).await?;
            }
        }
        Self::fire(entry, LifecycleEvent::Deleted, actor, Some(mode), record);
        Ok(())
    }

    /// Undo a soft delete. The restore is written through [`Self::update`],
    /// so `updating` observers see it.
    ///
    /// Returns `false` without firing any hook when the record is not trashed.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError::InvalidState` if the type does not use soft
    /// deletes, or the storage error from the UPDATE.
    pub async fn restore(&self, actor: Option<&Actor>, record: &mut Record) -> Result<bool, DatabaseError> {
        let entry = self.entry(record)?;
        let schema = Arc::clone(record.schema());
        let Some(column) = schema.soft_delete_column() else {
            return Err(DatabaseError::InvalidState(format!(
                "{} does not use soft deletes",
                schema.table()
            )));
        };
        if !record.is_trashed() {
            return Ok(false);
        }

        Self::fire(entry, LifecycleEvent::Restoring, actor, None, record);
        record.set(column, libsql::Value::Null);
        self.update(actor, record).await?;
        Self::fire(entry, LifecycleEvent::Restored, actor, None, record);
        Ok(true)
    }

    // -----------------------------------------------------------------------
    // Schema verification
    // -----------------------------------------------------------------------

    /// Declared columns that the live table lacks.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError::InvalidSchema` if the table does not exist.
    pub async fn verify_schema(&self, schema: &ModelSchema) -> Result<Vec<String>, DatabaseError> {
        let mut rows = self
            .db
            .conn()
            .query(
                &format!("PRAGMA table_info({})", quote_ident(schema.table())),
                (),
            )
            .await?;

        let mut live = Vec::new();
        while let Some(row) = rows.next().await? {
            live.push(row.get::<String>(1)?);
        }
        if live.is_empty() {
            return Err(DatabaseError::invalid_schema(
                schema.table(),
                "table does not exist",
            ));
        }

        let missing: Vec<String> = schema
            .declared_columns()
            .iter()
            .filter(|column| !live.contains(column))
            .cloned()
            .collect();
        for column in &missing {
            tracing::warn!(
                target: TRACING_TARGET_SERVICE,
                table = schema.table(),
                %column,
                "declared column missing from table"
            );
        }
        Ok(missing)
    }

    // -----------------------------------------------------------------------
    // Statements
    // -----------------------------------------------------------------------

    async fn insert(&self, record: &mut Record) -> Result<(), DatabaseError> {
        let schema = Arc::clone(record.schema());
        let (columns, params): (Vec<String>, Vec<libsql::Value>) = record
            .attributes()
            .map(|(column, value)| (quote_ident(column), value.clone()))
            .unzip();

        let sql = if columns.is_empty() {
            format!("INSERT INTO {} DEFAULT VALUES", quote_ident(schema.table()))
        } else {
            let placeholders: Vec<String> = (1..=columns.len()).map(|i| format!("?{i}")).collect();
            format!(
                "INSERT INTO {} ({}) VALUES ({})",
                quote_ident(schema.table()),
                columns.join(", "),
                placeholders.join(", ")
            )
        };

        self.db
            .conn()
            .execute(&sql, libsql::params_from_iter(params))
            .await?;

        if record.key().is_none() {
            let rowid = self.db.conn().last_insert_rowid();
            record.set(schema.key_column(), libsql::Value::Integer(rowid));
        }
        record.set_exists(true);
        record.sync_original();

        tracing::debug!(target: TRACING_TARGET_SERVICE, table = schema.table(), key = ?record.key(), "inserted");
        Ok(())
    }

    async fn write_dirty(&self, record: &mut Record) -> Result<(), DatabaseError> {
        let schema = Arc::clone(record.schema());
        let key = record.original_key().cloned().ok_or_else(|| {
            DatabaseError::InvalidState(format!("{} record has no primary key", schema.table()))
        })?;

        let mut sets = Vec::new();
        let mut params: Vec<libsql::Value> = Vec::new();
        for (column, value) in record.dirty() {
            params.push(value.clone());
            sets.push(format!("{} = ?{}", quote_ident(column), params.len()));
        }
        if sets.is_empty() {
            return Ok(());
        }

        params.push(key);
        let sql = format!(
            "UPDATE {} SET {} WHERE {} = ?{}",
            quote_ident(schema.table()),
            sets.join(", "),
            quote_ident(schema.key_column()),
            params.len()
        );
        let affected = self
            .db
            .conn()
            .execute(&sql, libsql::params_from_iter(params))
            .await?;
        if affected == 0 {
            return Err(DatabaseError::NoResult);
        }

        record.sync_original();
        tracing::debug!(target: TRACING_TARGET_SERVICE, table = schema.table(), key = ?record.key(), columns = sets.len(), "updated");
        Ok(())
    }

    async fn remove(&self, record: &mut Record) -> Result<(), DatabaseError> {
        let schema = Arc::clone(record.schema());
        let key = record.original_key().cloned().ok_or_else(|| {
            DatabaseError::InvalidState(format!("{} record has no primary key", schema.table()))
        })?;

        let sql = format!(
            "DELETE FROM {} WHERE {} = ?1",
            quote_ident(schema.table()),
            quote_ident(schema.key_column())
        );
        self.db.conn().execute(&sql, [key]).await?;
        record.set_exists(false);

        tracing::debug!(target: TRACING_TARGET_SERVICE, table = schema.table(), key = ?record.key(), "deleted");
        Ok(())
    }
}

fn touch_timestamps(record: &mut Record, creating: bool) {
    let schema = Arc::clone(record.schema());
    let now = now_value();
    if creating {
        if let Some(column) = schema.created_at_column() {
            if record.is_blank(column) {
                record.set(column, now.clone());
            }
        }
    }
    if let Some(column) = schema.updated_at_column() {
        record.set(column, now);
    }
}
