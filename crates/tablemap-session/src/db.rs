//! Database handle: connection, configuration and schema cache.

use std::sync::{Arc, Mutex, PoisonError};

use chrono::Utc;
use tablemap_core::{Connection, Dialect, Error, Result, Value};
use tablemap_query::{DeleteBuilder, InsertBuilder, Predicate, UpdateBuilder};

use crate::changeset::TimestampRepr;
use crate::config::DbConfig;
use crate::load_tracker::{LoadStats, LoadTracker};
use crate::model::Model;
use crate::query::Query;
use crate::registry::Registry;
use crate::schema::Schema;

/// Entry point for queries and writes.
pub struct Db {
    conn: Arc<dyn Connection>,
    config: DbConfig,
    registry: Arc<Registry>,
    tracker: Mutex<LoadTracker>,
}

impl std::fmt::Debug for Db {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Db")
            .field("dialect", &self.conn.dialect())
            .field("dsn", &self.conn.dsn())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Db {
    /// Wrap a connection with default configuration.
    pub fn new(conn: impl Connection + 'static) -> Self {
        Self::with_config(conn, DbConfig::default())
    }

    /// Wrap a connection with explicit configuration.
    pub fn with_config(conn: impl Connection + 'static, config: DbConfig) -> Self {
        Self::from_shared(Arc::new(conn), config)
    }

    /// Wrap a shared connection.
    pub fn from_shared(conn: Arc<dyn Connection>, config: DbConfig) -> Self {
        let tracker = LoadTracker::from_threshold(config.n1_threshold);
        Self {
            conn,
            config,
            registry: Registry::global(),
            tracker: Mutex::new(tracker),
        }
    }

    /// Use a private schema cache instead of the process-wide one.
    #[must_use]
    pub fn with_registry(mut self, registry: Arc<Registry>) -> Self {
        self.registry = registry;
        self
    }

    /// The underlying connection.
    pub fn connection(&self) -> &dyn Connection {
        self.conn.as_ref()
    }

    /// Dialect statements are rendered for.
    pub fn dialect(&self) -> Dialect {
        self.conn.dialect()
    }

    /// Active configuration.
    pub fn config(&self) -> &DbConfig {
        &self.config
    }

    /// Schema cache used by this handle.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Resolved schema for `M` on this connection.
    pub fn schema<M: Model>(&self) -> Result<Arc<Schema<M>>> {
        self.registry
            .resolve::<M>(self.dialect(), self.conn.dsn(), &self.config.table_prefix)
    }

    /// Start a query.
    pub fn query(&self) -> Query<'_> {
        Query::new(self)
    }

    /// Start a query against an explicit table.
    pub fn table(&self, table: impl Into<String>) -> Query<'_> {
        self.query().table(table)
    }

    /// Start a query with raw statement text.
    pub fn raw(&self, sql: impl Into<String>, params: Vec<Value>) -> Query<'_> {
        self.query().raw(sql, params)
    }

    /// Every live record of `M`.
    pub fn get<M: Model>(&self) -> Result<Vec<M>> {
        self.query().get()
    }

    /// First live record of `M`.
    pub fn first<M: Model>(&self) -> Result<M> {
        self.query().first()
    }

    /// Record of `M` by primary key.
    pub fn find<M: Model>(&self, id: impl Into<Value>) -> Result<M> {
        self.query().find(id)
    }

    /// Insert `model`. An auto-increment primary key is never sent; the
    /// generated id is written back into the model.
    #[tracing::instrument(level = "debug", skip(self, model), fields(model = M::type_name()))]
    pub fn insert<M: Model>(&self, model: &mut M) -> Result<i64> {
        let schema = self.schema::<M>()?;
        let values = schema.record_values(model, false, false)?;
        let (sql, params) = InsertBuilder::new(schema.table_name())
            .values(values.into_pairs())
            .build_with_dialect(self.dialect());

        tracing::debug!(sql = %sql, params = params.len(), "Executing insert");
        let id = self.conn.insert(&sql, &params)?;

        if let Some(pk) = schema.primary_key() {
            if pk.descriptor().auto_increment {
                pk.write(model, Value::Int(id))
                    .map_err(|e| Error::Row(e.into_row_error(0, pk.column())))?;
            }
        }
        Ok(id)
    }

    /// Write the non-zero fields of `model` to its row.
    pub fn update<M: Model>(&self, model: &M) -> Result<u64> {
        self.update_with(model, true)
    }

    /// Write every field of `model` to its row, substituting defaults for
    /// zero values.
    pub fn update_all<M: Model>(&self, model: &M) -> Result<u64> {
        self.update_with(model, false)
    }

    #[tracing::instrument(level = "debug", skip(self, model), fields(model = M::type_name()))]
    fn update_with<M: Model>(&self, model: &M, omit_empty: bool) -> Result<u64> {
        let schema = self.schema::<M>()?;
        let (pk_column, pk_value) = primary_key_of(&schema, model)?;
        let mut values = schema.record_values(model, omit_empty, true)?;
        values.remove(&pk_column);

        let (sql, params) = UpdateBuilder::new(schema.table_name())
            .set_all(values.into_pairs())
            .filter(Predicate::eq(pk_column, pk_value))
            .build_with_dialect(self.dialect());
        if sql.is_empty() {
            tracing::debug!("Nothing to update");
            return Ok(0);
        }

        tracing::debug!(sql = %sql, params = params.len(), "Executing update");
        self.conn.execute(&sql, &params)
    }

    /// Delete `model`'s row. Models with a deletion timestamp are marked
    /// instead of removed.
    #[tracing::instrument(level = "debug", skip(self, model), fields(model = M::type_name()))]
    pub fn delete<M: Model>(&self, model: &M) -> Result<u64> {
        let schema = self.schema::<M>()?;
        let Some(deleted_at) = schema.deleted_at() else {
            return self.force_delete(model);
        };
        let (pk_column, pk_value) = primary_key_of(&schema, model)?;

        let now = Utc::now();
        let desc = deleted_at.descriptor();
        let stamp = TimestampRepr::for_field(desc.kind, desc.size)
            .map_or_else(|| Value::Timestamp(now.naive_utc()), |repr| repr.render(now));
        let (sql, params) = UpdateBuilder::new(schema.table_name())
            .set(deleted_at.column(), stamp)
            .filter(Predicate::eq(pk_column, pk_value))
            .build_with_dialect(self.dialect());

        tracing::debug!(sql = %sql, "Executing soft delete");
        self.conn.execute(&sql, &params)
    }

    /// Remove `model`'s row even when it has a deletion timestamp.
    #[tracing::instrument(level = "debug", skip(self, model), fields(model = M::type_name()))]
    pub fn force_delete<M: Model>(&self, model: &M) -> Result<u64> {
        let schema = self.schema::<M>()?;
        let (pk_column, pk_value) = primary_key_of(&schema, model)?;
        let (sql, params) = DeleteBuilder::new(schema.table_name())
            .filter(Predicate::eq(pk_column, pk_value))
            .build_with_dialect(self.dialect());

        tracing::debug!(sql = %sql, "Executing delete");
        self.conn.execute(&sql, &params)
    }

    /// Run a statement that returns no rows.
    pub fn execute(&self, sql: &str, params: &[Value]) -> Result<u64> {
        tracing::debug!(sql = %sql, params = params.len(), "Executing statement");
        self.conn.execute(sql, params)
    }

    /// Counters of single-owner relationship loads.
    pub fn load_stats(&self) -> LoadStats {
        self.tracker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .stats()
    }

    /// Forget relationship load counts.
    pub fn reset_load_tracking(&self) {
        self.tracker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .reset();
    }

    pub(crate) fn record_relation_load(&self, owner_type: &'static str, relationship: &str) {
        self.tracker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .record_load(owner_type, relationship);
    }
}

fn primary_key_of<M>(schema: &Schema<M>, model: &M) -> Result<(String, Value)> {
    let pk = schema.primary_key().ok_or_else(|| {
        Error::Schema(format!("`{}` has no primary key", schema.type_name()))
    })?;
    let value = pk.read(model).map_err(|source| Error::Encode {
        field: pk.column().to_string(),
        source,
    })?;
    Ok((pk.column().to_string(), value))
}
