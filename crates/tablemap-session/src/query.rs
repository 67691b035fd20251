//! Pending query state and the fetch pipeline.

use tablemap_core::{Error, FieldValue, Result, RowError, RowErrors, Value};
use tablemap_query::{Order, Predicate, SelectBuilder};

use crate::db::Db;
use crate::materialize::materialize;
use crate::model::Model;
use crate::relationship::LoadPlan;

/// Outcome of [`Query::fetch`]: the rows that materialized and the rows
/// that did not.
#[derive(Debug)]
pub struct Fetched<M> {
    /// Successfully materialized records, in row order.
    pub records: Vec<M>,
    /// Per-row failures, in row order.
    pub failures: Vec<RowError>,
}

impl<M> Fetched<M> {
    /// Whether every row materialized.
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    /// All records, or the accumulated row failures.
    pub fn into_result(self) -> Result<Vec<M>> {
        match RowErrors(self.failures).into_error() {
            None => Ok(self.records),
            Some(err) => Err(err),
        }
    }
}

/// A pending query against one [`Db`].
///
/// Built with chained calls and consumed by one of the fetch methods. Hooks
/// receive it by `&mut` and adjust it through the in-place methods.
#[derive(Debug, Clone)]
pub struct Query<'db> {
    db: &'db Db,
    select: SelectBuilder,
    raw: Option<(String, Vec<Value>)>,
    with_deleted: bool,
    withs: Vec<String>,
}

impl<'db> Query<'db> {
    pub(crate) fn new(db: &'db Db) -> Self {
        Self {
            db,
            select: SelectBuilder::new(),
            raw: None,
            with_deleted: false,
            withs: Vec::new(),
        }
    }

    /// The database this query runs against.
    pub fn db(&self) -> &'db Db {
        self.db
    }

    /// Set the target table.
    #[must_use]
    pub fn table(mut self, table: impl Into<String>) -> Self {
        self.select.set_table(table);
        self
    }

    /// Select explicit columns.
    #[must_use]
    pub fn select<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.select.set_columns(columns);
        self
    }

    /// Add a WHERE condition.
    #[must_use]
    pub fn filter(mut self, predicate: Predicate) -> Self {
        self.select.push_filter(predicate);
        self
    }

    /// `column = value`
    #[must_use]
    pub fn where_eq(self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filter(Predicate::eq(column, value))
    }

    /// `column IN (values...)`
    #[must_use]
    pub fn where_in<I, V>(self, column: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.filter(Predicate::in_list(column, values))
    }

    /// `column IS NULL`
    #[must_use]
    pub fn where_null(self, column: impl Into<String>) -> Self {
        self.filter(Predicate::is_null(column))
    }

    /// `column IS NOT NULL`
    #[must_use]
    pub fn where_not_null(self, column: impl Into<String>) -> Self {
        self.filter(Predicate::is_not_null(column))
    }

    /// Append an ORDER BY term.
    #[must_use]
    pub fn order_by(mut self, column: impl Into<String>, order: Order) -> Self {
        self.select.push_order(column, order);
        self
    }

    /// Cap the number of rows.
    #[must_use]
    pub fn limit(mut self, limit: u64) -> Self {
        self.select.set_limit(limit);
        self
    }

    /// Skip the first `offset` rows.
    #[must_use]
    pub fn offset(mut self, offset: u64) -> Self {
        self.select.set_offset(offset);
        self
    }

    /// Eager-load a relationship. Dotted paths load nested relationships.
    #[must_use]
    pub fn with(mut self, path: impl Into<String>) -> Self {
        self.add_with(path);
        self
    }

    /// Include soft-deleted rows.
    #[must_use]
    pub fn with_deleted(mut self) -> Self {
        self.with_deleted = true;
        self
    }

    /// Run `sql` verbatim instead of the built statement.
    ///
    /// The pre-query hook, default columns and soft-delete filter are
    /// skipped. Relationships requested with [`Query::with`] still load.
    #[must_use]
    pub fn raw(mut self, sql: impl Into<String>, params: Vec<Value>) -> Self {
        self.raw = Some((sql.into(), params));
        self
    }

    /// The underlying SELECT builder.
    pub fn builder(&self) -> &SelectBuilder {
        &self.select
    }

    /// The underlying SELECT builder, for hooks.
    pub fn builder_mut(&mut self) -> &mut SelectBuilder {
        &mut self.select
    }

    /// Add an eager-load path in place.
    pub fn add_with(&mut self, path: impl Into<String>) {
        let path = path.into();
        if !self.withs.contains(&path) {
            self.withs.push(path);
        }
    }

    /// Requested eager-load paths.
    pub fn withs(&self) -> &[String] {
        &self.withs
    }

    /// Toggle inclusion of soft-deleted rows in place.
    pub fn set_with_deleted(&mut self, value: bool) {
        self.with_deleted = value;
    }

    /// Whether soft-deleted rows are included.
    pub fn includes_deleted(&self) -> bool {
        self.with_deleted
    }

    /// Whether raw SQL replaces the built statement.
    pub fn is_raw(&self) -> bool {
        self.raw.is_some()
    }

    /// Run the pipeline and keep both the records and the row failures.
    ///
    /// Dispatch and cursor failures, hook aborts and relationship errors
    /// fail the whole call.
    #[tracing::instrument(level = "debug", skip(self), fields(model = M::type_name()))]
    pub fn fetch<M: Model>(mut self) -> Result<Fetched<M>> {
        let db = self.db;
        let schema = db.schema::<M>()?;

        let (sql, params) = match self.raw.take() {
            Some(raw) => raw,
            None => {
                if let Some(hook) = schema.before_query_hook() {
                    hook(&mut self)?;
                }
                if self.select.get_columns().is_empty() {
                    self.select.set_columns(schema.select_columns());
                }
                if self.select.get_table().is_none() {
                    self.select.set_table(schema.table_name());
                }
                if !self.with_deleted {
                    if let Some(field) = schema.deleted_at() {
                        let column = format!("{}.{}", schema.table_name(), field.column());
                        self.select.push_filter(Predicate::is_null(column));
                    }
                }
                self.select.build_with_dialect(db.dialect())?
            }
        };

        let plan = LoadPlan::new(&schema, &self.withs)?;

        tracing::debug!(sql = %sql, params = params.len(), "Executing query");
        let rows = db.connection().query(&sql, &params).map_err(|e| {
            tracing::warn!(sql = %sql, error = %e, "Query failed");
            e
        })?;

        let mut records = Vec::new();
        let mut failures = Vec::new();
        for (index, row) in rows.enumerate() {
            match materialize(&schema, row?, index, db) {
                Ok(record) => records.push(record),
                Err(err) => {
                    tracing::warn!(
                        row = err.index,
                        kind = %err.kind,
                        column = err.column.as_deref().unwrap_or(""),
                        "Row failed to materialize: {}",
                        err.message
                    );
                    failures.push(err);
                }
            }
        }
        tracing::debug!(
            records = records.len(),
            failures = failures.len(),
            "Rows materialized"
        );

        if !plan.is_empty() {
            plan.load(db, &schema, &mut records)?;
        }
        Ok(Fetched { records, failures })
    }

    /// All matching records. Any row failure fails the call.
    pub fn get<M: Model>(self) -> Result<Vec<M>> {
        self.fetch::<M>()?.into_result()
    }

    /// The first matching record.
    pub fn first<M: Model>(self) -> Result<M> {
        let table = self.target_table::<M>()?;
        self.limit(1)
            .get::<M>()?
            .into_iter()
            .next()
            .ok_or(Error::NotFound { table })
    }

    /// The record whose primary key equals `id`.
    #[tracing::instrument(level = "debug", skip(self, id), fields(model = M::type_name()))]
    pub fn find<M: Model>(self, id: impl Into<Value>) -> Result<M> {
        let schema = self.db.schema::<M>()?;
        let pk = schema.primary_key().ok_or_else(|| {
            Error::Schema(format!("`{}` has no primary key", schema.type_name()))
        })?;
        self.where_eq(pk.column(), id).first()
    }

    /// A single column of the first matching row.
    ///
    /// Needs an explicit [`Query::table`] unless raw text is used.
    pub fn value<T: FieldValue>(mut self, column: &str) -> Result<T> {
        let db = self.db;
        let table = self.select.get_table().unwrap_or_default().to_string();
        let (sql, params) = match self.raw.take() {
            Some(raw) => raw,
            None => {
                self.select.set_columns([column]);
                self.select.set_limit(1);
                self.select.build_with_dialect(db.dialect())?
            }
        };

        tracing::debug!(sql = %sql, params = params.len(), "Executing value lookup");
        let mut rows = db.connection().query(&sql, &params)?;
        let row = rows.next().ok_or(Error::NotFound { table })??;
        let value = row
            .get_named(column)
            .or_else(|| row.get(0))
            .cloned()
            .unwrap_or_default();
        T::from_value(value).map_err(|e| Error::Row(RowError::scan(0, column, e)))
    }

    fn target_table<M: Model>(&self) -> Result<String> {
        match self.select.get_table() {
            Some(table) => Ok(table.to_string()),
            None => Ok(self.db.schema::<M>()?.table_name().to_string()),
        }
    }
}
