//! The `Accountable` mixin: relations from a record to the users in its
//! stamp columns, and query filters over those columns.
//!
//! Both sides are pure builders. Nothing here touches storage until
//! [`BelongsTo::get`] or a query's `get` is awaited.

use std::collections::BTreeMap;

use accountable_config::UserModelConfig;
use accountable_core::{Actor, ActorId, AsActorId, StampRole};

use crate::error::DatabaseError;
use crate::helpers::{actor_to_value, quote_ident, row_to_attributes, value_to_actor};
use crate::query::Query;
use crate::record::Record;
use crate::{AccountableDb, TRACING_TARGET_QUERY};

/// A row of the configured user table.
#[derive(Debug, Clone)]
pub struct UserRow {
    pub id: ActorId,
    pub attributes: BTreeMap<String, libsql::Value>,
}

impl UserRow {
    #[must_use]
    pub fn get(&self, column: &str) -> Option<&libsql::Value> {
        self.attributes.get(column)
    }

    #[must_use]
    pub fn get_text(&self, column: &str) -> Option<&str> {
        match self.get(column)? {
            libsql::Value::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl AsActorId for UserRow {
    fn actor_id(&self) -> ActorId {
        self.id.clone()
    }
}

/// To-one relation from a record's stamp column to the user model.
#[derive(Debug, Clone)]
pub struct BelongsTo {
    role: StampRole,
    foreign_key: String,
    user_model: UserModelConfig,
    value: Option<ActorId>,
}

impl BelongsTo {
    fn for_role(record: &Record, role: StampRole) -> Self {
        let schema = record.schema();
        let foreign_key = schema.filter_column(role).to_string();
        Self {
            role,
            value: record.get_actor(&foreign_key),
            foreign_key,
            user_model: schema.user_model(),
        }
    }

    #[must_use]
    pub const fn role(&self) -> StampRole {
        self.role
    }

    /// Column on the record side of the join.
    #[must_use]
    pub fn foreign_key(&self) -> &str {
        &self.foreign_key
    }

    /// Table on the user side of the join.
    #[must_use]
    pub fn related_table(&self) -> &str {
        &self.user_model.table
    }

    /// Key column on the user side of the join.
    #[must_use]
    pub fn owner_key(&self) -> &str {
        &self.user_model.primary_key
    }

    /// Stored user key, `None` when the column is blank.
    #[must_use]
    pub const fn foreign_value(&self) -> Option<&ActorId> {
        self.value.as_ref()
    }

    /// Load the related user.
    ///
    /// Returns `None` without querying when the stamp is blank, and `None`
    /// when no user row has the stored key.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the lookup fails or the user row's key is
    /// neither an integer nor text.
    pub async fn get(&self, db: &AccountableDb) -> Result<Option<UserRow>, DatabaseError> {
        let Some(value) = &self.value else {
            return Ok(None);
        };

        let sql = format!(
            "SELECT * FROM {} WHERE {} = ?1 LIMIT 1",
            quote_ident(&self.user_model.table),
            quote_ident(&self.user_model.primary_key),
        );
        tracing::trace!(target: TRACING_TARGET_QUERY, %sql, role = %self.role, "load related user");

        let mut rows = db.conn().query(&sql, [actor_to_value(value)]).await?;
        let Some(row) = rows.next().await? else {
            return Ok(None);
        };

        let attributes = row_to_attributes(&row)?;
        let id = attributes
            .get(&self.user_model.primary_key)
            .and_then(value_to_actor)
            .ok_or_else(|| {
                DatabaseError::InvalidState(format!(
                    "{}.{} is not an integer or text key",
                    self.user_model.table, self.user_model.primary_key
                ))
            })?;
        Ok(Some(UserRow { id, attributes }))
    }
}

/// Relations from a record to the users in its stamp columns.
pub trait Accountable {
    /// User who created the record.
    fn creator(&self) -> BelongsTo;
    /// User who last updated the record.
    fn updater(&self) -> BelongsTo;
    /// User who soft-deleted the record.
    fn deleter(&self) -> BelongsTo;
}

impl Accountable for Record {
    fn creator(&self) -> BelongsTo {
        BelongsTo::for_role(self, StampRole::CreatedBy)
    }

    fn updater(&self) -> BelongsTo {
        BelongsTo::for_role(self, StampRole::UpdatedBy)
    }

    fn deleter(&self) -> BelongsTo {
        BelongsTo::for_role(self, StampRole::DeletedBy)
    }
}

/// Query filters on stamp columns.
pub trait AccountableQuery: Sized {
    /// Only records created by `user`.
    #[must_use]
    fn created_by(self, user: impl AsActorId) -> Self;

    /// Only records last updated by `user`.
    #[must_use]
    fn updated_by(self, user: impl AsActorId) -> Self;

    /// Only records deleted by `user`. Soft-deleted rows are hidden unless
    /// the query also asks for trashed rows.
    #[must_use]
    fn deleted_by(self, user: impl AsActorId) -> Self;

    /// Only records created by `actor`. Matches nothing when `actor` is `None`.
    #[must_use]
    fn mine(self, actor: Option<&Actor>) -> Self;
}

impl AccountableQuery for Query {
    fn created_by(self, user: impl AsActorId) -> Self {
        filter_role(self, StampRole::CreatedBy, &user.actor_id())
    }

    fn updated_by(self, user: impl AsActorId) -> Self {
        filter_role(self, StampRole::UpdatedBy, &user.actor_id())
    }

    fn deleted_by(self, user: impl AsActorId) -> Self {
        filter_role(self, StampRole::DeletedBy, &user.actor_id())
    }

    fn mine(self, actor: Option<&Actor>) -> Self {
        match actor {
            Some(actor) => self.created_by(actor),
            None => self.never(),
        }
    }
}

fn filter_role(query: Query, role: StampRole, id: &ActorId) -> Query {
    let column = query.schema().filter_column(role).to_string();
    query.filter_eq(column, actor_to_value(id))
}
