//! Static record type descriptors.
//!
//! A `ModelSchema` names a table, its columns, and the capabilities the type
//! opts into (timestamps, soft deletes, actor stamps). It is validated once
//! when registered with [`crate::service::RecordService`] and shared behind an
//! `Arc` by every record and query of that type afterwards.

use accountable_config::{AccountableConfig, ColumnNames, UserModelConfig, is_sql_identifier};
use accountable_core::{StampRole, StampSet};

use crate::error::DatabaseError;
use crate::helpers::quote_ident;

const CREATED_AT: &str = "created_at";
const UPDATED_AT: &str = "updated_at";
const DELETED_AT: &str = "deleted_at";

/// Stamp columns and user model resolved from configuration at registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Accountability {
    pub columns: ColumnNames,
    pub user_model: UserModelConfig,
}

impl Accountability {
    #[must_use]
    pub fn from_config(config: &AccountableConfig) -> Self {
        Self {
            columns: config.column_names.clone(),
            user_model: config.user_model.clone(),
        }
    }
}

/// Descriptor of a persisted record type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelSchema {
    table: String,
    primary_key: String,
    columns: Vec<String>,
    timestamps: bool,
    soft_delete_column: Option<String>,
    stamps: StampSet,
    accountability: Option<Accountability>,
}

impl ModelSchema {
    /// Start a descriptor for `table` with an `id` primary key.
    #[must_use]
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            primary_key: "id".to_string(),
            columns: vec!["id".to_string()],
            timestamps: false,
            soft_delete_column: None,
            stamps: StampSet::NONE,
            accountability: None,
        }
    }

    #[must_use]
    pub fn primary_key(mut self, column: impl Into<String>) -> Self {
        let column = column.into();
        let old = std::mem::replace(&mut self.primary_key, column.clone());
        self.columns.retain(|c| *c != old);
        self.push_column(column);
        self
    }

    #[must_use]
    pub fn column(mut self, column: impl Into<String>) -> Self {
        self.push_column(column.into());
        self
    }

    #[must_use]
    pub fn columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for column in columns {
            self.push_column(column.into());
        }
        self
    }

    /// Maintain `created_at` / `updated_at` on every write.
    #[must_use]
    pub fn timestamps(mut self) -> Self {
        self.timestamps = true;
        self.push_column(CREATED_AT.to_string());
        self.push_column(UPDATED_AT.to_string());
        self
    }

    /// Soft-delete through a `deleted_at` column.
    #[must_use]
    pub fn soft_deletes(self) -> Self {
        self.soft_deletes_with(DELETED_AT)
    }

    /// Soft-delete through a custom timestamp column.
    #[must_use]
    pub fn soft_deletes_with(mut self, column: impl Into<String>) -> Self {
        let column = column.into();
        self.push_column(column.clone());
        self.soft_delete_column = Some(column);
        self
    }

    /// Declare which actor stamps this type supports.
    ///
    /// The stamp columns themselves must also be listed via [`Self::column`];
    /// registration rejects a declared role whose configured column is missing.
    #[must_use]
    pub const fn stamps(mut self, stamps: StampSet) -> Self {
        self.stamps = stamps;
        self
    }

    fn push_column(&mut self, column: String) {
        if !self.columns.contains(&column) {
            self.columns.push(column);
        }
    }

    #[must_use]
    pub fn table(&self) -> &str {
        &self.table
    }

    #[must_use]
    pub fn key_column(&self) -> &str {
        &self.primary_key
    }

    #[must_use]
    pub fn declared_columns(&self) -> &[String] {
        &self.columns
    }

    #[must_use]
    pub fn declares(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c == column)
    }

    #[must_use]
    pub const fn uses_timestamps(&self) -> bool {
        self.timestamps
    }

    #[must_use]
    pub const fn created_at_column(&self) -> Option<&'static str> {
        if self.timestamps { Some(CREATED_AT) } else { None }
    }

    #[must_use]
    pub const fn updated_at_column(&self) -> Option<&'static str> {
        if self.timestamps { Some(UPDATED_AT) } else { None }
    }

    #[must_use]
    pub fn soft_delete_column(&self) -> Option<&str> {
        self.soft_delete_column.as_deref()
    }

    #[must_use]
    pub const fn uses_soft_deletes(&self) -> bool {
        self.soft_delete_column.is_some()
    }

    #[must_use]
    pub const fn declared_stamps(&self) -> StampSet {
        self.stamps
    }

    /// Stamp configuration, present once registered as accountable.
    #[must_use]
    pub const fn accountability(&self) -> Option<&Accountability> {
        self.accountability.as_ref()
    }

    /// Whether the observer may write `role` on this type.
    #[must_use]
    pub const fn supports(&self, role: StampRole) -> bool {
        self.accountability.is_some() && self.stamps.contains(role)
    }

    /// Column that stores `role`, if this type supports it.
    #[must_use]
    pub fn stamp_column(&self, role: StampRole) -> Option<&str> {
        if !self.stamps.contains(role) {
            return None;
        }
        self.accountability
            .as_ref()
            .map(|a| a.columns.column_for(role))
    }

    /// Column that query filters and relations use for `role`.
    ///
    /// Falls back to the default column name for types that were never
    /// registered as accountable.
    #[must_use]
    pub fn filter_column(&self, role: StampRole) -> &str {
        self.accountability
            .as_ref()
            .map_or(role.default_column(), |a| a.columns.column_for(role))
    }

    /// User model that relations load from.
    #[must_use]
    pub fn user_model(&self) -> UserModelConfig {
        self.accountability
            .as_ref()
            .map_or_else(UserModelConfig::default, |a| a.user_model.clone())
    }

    /// Comma-separated, quoted column list for SELECT statements.
    #[must_use]
    pub fn select_list(&self) -> String {
        self.columns
            .iter()
            .map(|c| quote_ident(c))
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Validate identifiers and capability declarations.
    ///
    /// Without `accountability`, declaring any stamp is an error: the type
    /// would advertise stamps no observer writes.
    pub(crate) fn validate(&self) -> Result<(), DatabaseError> {
        if !is_sql_identifier(&self.table) {
            return Err(DatabaseError::invalid_schema(
                &self.table,
                "table name is not a valid identifier",
            ));
        }
        if let Some(bad) = self.columns.iter().find(|c| !is_sql_identifier(c)) {
            return Err(DatabaseError::invalid_schema(
                &self.table,
                format!("column '{bad}' is not a valid identifier"),
            ));
        }

        let Some(accountability) = &self.accountability else {
            if !self.stamps.is_empty() {
                return Err(DatabaseError::invalid_schema(
                    &self.table,
                    "declares actor stamps but was not registered as accountable",
                ));
            }
            return Ok(());
        };

        for role in self.stamps.iter() {
            let column = accountability.columns.column_for(role);
            if !self.declares(column) {
                return Err(DatabaseError::invalid_schema(
                    &self.table,
                    format!("supports {role} but does not declare column '{column}'"),
                ));
            }
            if column == self.primary_key
                || self.soft_delete_column.as_deref() == Some(column)
                || (self.timestamps && (column == CREATED_AT || column == UPDATED_AT))
            {
                return Err(DatabaseError::invalid_schema(
                    &self.table,
                    format!("{role} column '{column}' collides with a managed column"),
                ));
            }
        }

        if self.stamps.contains(StampRole::DeletedBy) && !self.uses_soft_deletes() {
            return Err(DatabaseError::invalid_schema(
                &self.table,
                "supports deleted_by but does not use soft deletes",
            ));
        }

        Ok(())
    }

    pub(crate) fn with_accountability(mut self, accountability: Accountability) -> Self {
        self.accountability = Some(accountability);
        self
    }
}
