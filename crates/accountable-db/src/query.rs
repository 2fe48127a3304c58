//! Query builder over a registered record type.
//!
//! Predicates are ANDed together. Values are bound as positional `?N`
//! parameters; column names are quoted identifiers.

use std::sync::Arc;

use crate::error::DatabaseError;
use crate::helpers::quote_ident;
use crate::record::Record;
use crate::schema::ModelSchema;
use crate::{AccountableDb, TRACING_TARGET_QUERY};

/// A single WHERE condition.
#[derive(Debug, Clone)]
pub enum Predicate {
    Eq { column: String, value: libsql::Value },
    IsNull(String),
    NotNull(String),
    /// Matches no rows.
    Never,
}

/// Which soft-deleted rows a query sees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TrashedScope {
    #[default]
    Exclude,
    Include,
    Only,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Order {
    Asc,
    Desc,
}

impl Order {
    const fn as_sql(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Query {
    schema: Arc<ModelSchema>,
    predicates: Vec<Predicate>,
    trashed: TrashedScope,
    order: Option<(String, Order)>,
    limit: Option<u32>,
}

impl Query {
    #[must_use]
    pub fn new(schema: &Arc<ModelSchema>) -> Self {
        Self {
            schema: Arc::clone(schema),
            predicates: Vec::new(),
            trashed: TrashedScope::default(),
            order: None,
            limit: None,
        }
    }

    #[must_use]
    pub fn schema(&self) -> &Arc<ModelSchema> {
        &self.schema
    }

    #[must_use]
    pub fn predicates(&self) -> &[Predicate] {
        &self.predicates
    }

    #[must_use]
    pub fn filter_eq(mut self, column: impl Into<String>, value: impl Into<libsql::Value>) -> Self {
        self.predicates.push(Predicate::Eq {
            column: column.into(),
            value: value.into(),
        });
        self
    }

    #[must_use]
    pub fn where_null(mut self, column: impl Into<String>) -> Self {
        self.predicates.push(Predicate::IsNull(column.into()));
        self
    }

    #[must_use]
    pub fn where_not_null(mut self, column: impl Into<String>) -> Self {
        self.predicates.push(Predicate::NotNull(column.into()));
        self
    }

    /// Make the query match nothing.
    #[must_use]
    pub fn never(mut self) -> Self {
        self.predicates.push(Predicate::Never);
        self
    }

    #[must_use]
    pub const fn with_trashed(mut self) -> Self {
        self.trashed = TrashedScope::Include;
        self
    }

    #[must_use]
    pub const fn only_trashed(mut self) -> Self {
        self.trashed = TrashedScope::Only;
        self
    }

    #[must_use]
    pub fn order_by(mut self, column: impl Into<String>, order: Order) -> Self {
        self.order = Some((column.into(), order));
        self
    }

    #[must_use]
    pub const fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Columns referenced by predicates and ordering, in that order.
    fn referenced_columns(&self) -> impl Iterator<Item = &str> {
        self.predicates
            .iter()
            .filter_map(|predicate| match predicate {
                Predicate::Eq { column, .. } | Predicate::IsNull(column) | Predicate::NotNull(column) => {
                    Some(column.as_str())
                }
                Predicate::Never => None,
            })
            .chain(self.order.as_ref().map(|(column, _)| column.as_str()))
    }

    /// Reject columns the schema does not declare.
    ///
    /// SQLite reads a double-quoted name that matches no column as a string
    /// literal, so an unchecked filter would silently match nothing (or
    /// everything) instead of failing.
    fn check_columns(&self) -> Result<(), DatabaseError> {
        self.referenced_columns()
            .find(|column| !self.schema.declares(column))
            .map_or(Ok(()), |column| {
                Err(DatabaseError::invalid_schema(
                    self.schema.table(),
                    format!("query references undeclared column '{column}'"),
                ))
            })
    }

    /// Render the WHERE clause (including the leading keyword) and its params.
    fn where_clause(&self) -> (String, Vec<libsql::Value>) {
        let mut conditions = Vec::new();
        let mut params: Vec<libsql::Value> = Vec::new();

        if let Some(column) = self.schema.soft_delete_column() {
            match self.trashed {
                TrashedScope::Exclude => conditions.push(format!("{} IS NULL", quote_ident(column))),
                TrashedScope::Only => conditions.push(format!("{} IS NOT NULL", quote_ident(column))),
                TrashedScope::Include => {}
            }
        }

        for predicate in &self.predicates {
            match predicate {
                Predicate::Eq { column, value } => {
                    params.push(value.clone());
                    conditions.push(format!("{} = ?{}", quote_ident(column), params.len()));
                }
                Predicate::IsNull(column) => conditions.push(format!("{} IS NULL", quote_ident(column))),
                Predicate::NotNull(column) => {
                    conditions.push(format!("{} IS NOT NULL", quote_ident(column)));
                }
                Predicate::Never => conditions.push("1 = 0".to_string()),
            }
        }

        if conditions.is_empty() {
            (String::new(), params)
        } else {
            (format!(" WHERE {}", conditions.join(" AND ")), params)
        }
    }

    /// Render the SELECT statement and its bound parameters.
    #[must_use]
    pub fn to_sql(&self) -> (String, Vec<libsql::Value>) {
        let (where_clause, params) = self.where_clause();
        let (order_column, order) = self
            .order
            .as_ref()
            .map_or((self.schema.key_column(), Order::Asc), |(c, o)| (c.as_str(), *o));

        let mut sql = format!(
            "SELECT {} FROM {}{where_clause} ORDER BY {} {}",
            self.schema.select_list(),
            quote_ident(self.schema.table()),
            quote_ident(order_column),
            order.as_sql(),
        );
        if let Some(limit) = self.limit {
            sql.push_str(&format!(" LIMIT {limit}"));
        }
        (sql, params)
    }

    /// Fetch all matching records.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError::InvalidSchema` if a filter or the ordering
    /// names a column the schema does not declare, or `DatabaseError::LibSql`
    /// if the statement fails.
    pub async fn get(&self, db: &AccountableDb) -> Result<Vec<Record>, DatabaseError> {
        self.check_columns()?;
        let (sql, params) = self.to_sql();
        tracing::trace!(target: TRACING_TARGET_QUERY, %sql, params = params.len(), "select");

        let mut rows = db
            .conn()
            .query(&sql, libsql::params_from_iter(params))
            .await?;
        let mut records = Vec::new();
        while let Some(row) = rows.next().await? {
            records.push(Record::from_row(&self.schema, &row)?);
        }
        Ok(records)
    }

    /// Fetch the first matching record.
    ///
    /// # Errors
    ///
    /// Same as [`Self::get`].
    pub async fn first(&self, db: &AccountableDb) -> Result<Option<Record>, DatabaseError> {
        let mut records = self.clone().limit(1).get(db).await?;
        Ok(records.pop())
    }

    /// Count matching records.
    ///
    /// # Errors
    ///
    /// Same as [`Self::get`].
    pub async fn count(&self, db: &AccountableDb) -> Result<u64, DatabaseError> {
        self.check_columns()?;
        let (where_clause, params) = self.where_clause();
        let sql = format!(
            "SELECT COUNT(*) FROM {}{where_clause}",
            quote_ident(self.schema.table())
        );
        tracing::trace!(target: TRACING_TARGET_QUERY, %sql, params = params.len(), "count");

        let mut rows = db
            .conn()
            .query(&sql, libsql::params_from_iter(params))
            .await?;
        let row = rows.next().await?.ok_or(DatabaseError::NoResult)?;
        let count = row.get::<i64>(0)?;
        u64::try_from(count).map_err(|e| DatabaseError::Query(format!("negative count: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn posts() -> Arc<ModelSchema> {
        Arc::new(
            ModelSchema::new("posts")
                .columns(["title", "created_by"])
                .soft_deletes(),
        )
    }

    #[test]
    fn default_query_excludes_trashed() {
        let (sql, params) = Query::new(&posts()).to_sql();
        assert_eq!(
            sql,
            "SELECT \"id\", \"title\", \"created_by\", \"deleted_at\" FROM \"posts\" \
             WHERE \"deleted_at\" IS NULL ORDER BY \"id\" ASC"
        );
        assert!(params.is_empty());
    }

    #[test]
    fn predicates_bind_in_order() {
        let (sql, params) = Query::new(&posts())
            .with_trashed()
            .filter_eq("created_by", 7_i64)
            .filter_eq("title", "x")
            .where_not_null("title")
            .order_by("title", Order::Desc)
            .limit(5)
            .to_sql();
        assert!(
            sql.ends_with(
                "FROM \"posts\" WHERE \"created_by\" = ?1 AND \"title\" = ?2 \
                 AND \"title\" IS NOT NULL ORDER BY \"title\" DESC LIMIT 5"
            ),
            "{sql}"
        );
        assert_eq!(params.len(), 2);
        assert!(matches!(params[0], libsql::Value::Integer(7)));
    }

    #[test]
    fn only_trashed_flips_scope() {
        let (sql, _) = Query::new(&posts()).only_trashed().to_sql();
        assert!(sql.contains("WHERE \"deleted_at\" IS NOT NULL"), "{sql}");
    }

    #[test]
    fn never_renders_false_condition() {
        let (sql, params) = Query::new(&posts()).never().to_sql();
        assert!(sql.contains("AND 1 = 0"), "{sql}");
        assert!(params.is_empty());
    }

    #[test]
    fn no_soft_deletes_no_scope() {
        let tags = Arc::new(ModelSchema::new("tags").column("name"));
        let (sql, _) = Query::new(&tags).with_trashed().to_sql();
        assert_eq!(sql, "SELECT \"id\", \"name\" FROM \"tags\" ORDER BY \"id\" ASC");
    }

    #[test]
    fn declared_columns_pass_the_check() {
        let query = Query::new(&posts())
            .filter_eq("created_by", 7_i64)
            .where_null("title")
            .order_by("deleted_at", Order::Desc)
            .never();
        assert!(query.check_columns().is_ok());
    }

    #[rstest::rstest]
    #[case::eq(Query::new(&posts()).filter_eq("deleted_by", 7_i64))]
    #[case::is_null(Query::new(&posts()).where_null("deleted_by"))]
    #[case::not_null(Query::new(&posts()).where_not_null("deleted_by"))]
    #[case::order(Query::new(&posts()).order_by("deleted_by", Order::Asc))]
    fn undeclared_columns_are_rejected(#[case] query: Query) {
        let err = query.check_columns().unwrap_err();
        assert!(
            matches!(err, DatabaseError::InvalidSchema { ref table, ref reason }
                if table == "posts" && reason.contains("'deleted_by'")),
            "unexpected error: {err}"
        );
    }
}
