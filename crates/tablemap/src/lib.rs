//! tablemap: declarative table mapping for Rust.
//!
//! Models describe their columns once through [`Model::describe`]. The
//! resulting schema is cached per connection and drives three things:
//!
//! - **Queries**: [`Db::query`] builds a SELECT with the model's columns,
//!   table and soft-delete filter, then materializes each row into a model.
//!   Row failures are collected instead of aborting the scan.
//! - **Eager loading**: [`Query::with`] loads a relationship for every
//!   fetched record with a single extra query.
//! - **Writes**: [`Schema::record_values`] turns a model into the
//!   column/value set for INSERT or UPDATE, stamping convention timestamps.
//!
//! # Crates
//!
//! - `tablemap-core`: values, rows, field metadata, the `Connection` trait
//!   and errors.
//! - `tablemap-query`: statement builders.
//! - `tablemap-session`: schemas, registry, query pipeline and loaders.
//! - `tablemap-sqlite` (feature `sqlite`): a `Connection` over rusqlite.
//!
//! # Example
//!
//! ```ignore
//! use tablemap::prelude::*;
//!
//! let users: Vec<User> = db.query().where_eq("name", "kwin").with("posts").get()?;
//! let user: User = db.find(1_i64)?;
//! ```

pub use chrono;

pub use tablemap_core::{
    Cardinality, Connection, ConversionError, DataKind, DefaultValue, Dialect, Error,
    ExecutionError, FieldDescriptor, FieldRole, FieldValue, HookError, IndexKind, IndexSpec,
    RelationKey, RelationshipInfo, RelationshipKind, Result, Row, RowError, RowErrorKind,
    RowErrors, Rows, Value,
};
pub use tablemap_query::{
    DeleteBuilder, InsertBuilder, Operator, Order, Predicate, SelectBuilder, UpdateBuilder,
};
pub use tablemap_session::{
    AfterQueryHook, BeforeQueryHook, ChangeSet, Db, DbConfig, DeriveHook, Fetched, IndexList,
    IndexMember, LoadStats, LoadTracker, MappedField, Model, ModelDef, Query, Registry,
    Relationship, Schema, SchemaKey, TimestampRepr,
};

#[cfg(feature = "sqlite")]
pub use tablemap_sqlite::SqliteConnection;

/// Common imports.
pub mod prelude {
    pub use tablemap_core::{Connection, Error, FieldValue, HookError, Result, Value};
    pub use tablemap_query::{Order, Predicate};
    pub use tablemap_session::{Db, DbConfig, Model, ModelDef, Query};

    #[cfg(feature = "sqlite")]
    pub use tablemap_sqlite::SqliteConnection;
}
