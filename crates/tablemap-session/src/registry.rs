//! Process-wide schema cache.
//!
//! Schemas are keyed by dialect, connection identity and table name, built
//! on first use and shared as `Arc<Schema<M>>` afterwards. Builds run outside
//! the lock; when two threads miss at once both build and the last insert
//! wins, which is harmless since builds are deterministic.

use std::any::Any;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock, PoisonError, RwLock};

use tablemap_core::{Dialect, Result};

use crate::model::Model;
use crate::schema::{Schema, resolve_table_name};

/// Cache key for one resolved schema.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SchemaKey {
    /// Dialect of the connection.
    pub dialect: Dialect,
    /// Connection identity.
    pub dsn: String,
    /// Resolved table name.
    pub table: String,
}

type Entry = Arc<dyn Any + Send + Sync>;

/// Schema cache.
#[derive(Default)]
pub struct Registry {
    entries: RwLock<HashMap<SchemaKey, Entry>>,
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("len", &self.len())
            .finish()
    }
}

static GLOBAL: OnceLock<Arc<Registry>> = OnceLock::new();

impl Registry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide registry.
    pub fn global() -> Arc<Registry> {
        Arc::clone(GLOBAL.get_or_init(|| Arc::new(Registry::new())))
    }

    /// Schema for `M` on the given connection, building it on a miss.
    pub fn resolve<M: Model>(
        &self,
        dialect: Dialect,
        dsn: &str,
        prefix: &str,
    ) -> Result<Arc<Schema<M>>> {
        let key = SchemaKey {
            dialect,
            dsn: dsn.to_string(),
            table: resolve_table_name::<M>(prefix),
        };

        let cached = self
            .entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
            .cloned();

        if let Some(entry) = cached {
            match entry.downcast::<Schema<M>>() {
                Ok(schema) => {
                    tracing::trace!(table = %key.table, "Schema cache hit");
                    return Ok(schema);
                }
                Err(_) => {
                    tracing::warn!(
                        table = %key.table,
                        model = M::type_name(),
                        "Schema cache entry belongs to another model type; rebuilding"
                    );
                }
            }
        }

        tracing::debug!(
            table = %key.table,
            model = M::type_name(),
            dialect = dialect.name(),
            "Schema cache miss"
        );
        let schema = Arc::new(Schema::<M>::build(prefix)?);
        let entry: Entry = Arc::clone(&schema) as Entry;
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key, entry);
        Ok(schema)
    }

    /// Drop the cached schema for `M`, if any. Returns whether one was removed.
    pub fn invalidate<M: Model>(&self, dialect: Dialect, dsn: &str, prefix: &str) -> bool {
        let key = SchemaKey {
            dialect,
            dsn: dsn.to_string(),
            table: resolve_table_name::<M>(prefix),
        };
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&key)
            .is_some()
    }

    /// Drop every cached schema.
    pub fn clear(&self) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    /// Number of cached schemas.
    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
