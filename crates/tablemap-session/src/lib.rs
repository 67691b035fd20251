//! Schema cache, query pipeline and eager loading for tablemap.
//!
//! [`Db`] is the entry point. It owns a connection, resolves [`Schema`]s
//! through a process-wide [`Registry`] and runs the fetch pipeline:
//!
//! 1. resolve the schema for the destination model,
//! 2. run the model's pre-query hook and fill in the default select list,
//!    table and soft-delete filter,
//! 3. render and execute,
//! 4. materialize every row into a fresh model, accumulating row failures,
//! 5. eager-load requested relationships with one query per relationship.
//!
//! # Example
//!
//! ```ignore
//! #[derive(Debug, Clone, Default, PartialEq)]
//! struct User {
//!     id: i64,
//!     name: String,
//!     posts: Vec<Post>,
//! }
//!
//! impl Model for User {
//!     fn describe(def: &mut ModelDef<Self>) {
//!         def.field("id", |u| &u.id, |u| &mut u.id).primary_key().auto_increment();
//!         def.field("name", |u| &u.name, |u| &mut u.name);
//!         def.has_many("posts", |u: &mut User| &mut u.posts);
//!     }
//! }
//!
//! let db = Db::new(connection);
//! let users: Vec<User> = db.query().with("posts").where_eq("name", "kwin").get()?;
//! ```

pub mod changeset;
pub mod config;
pub mod db;
pub mod load_tracker;
mod materialize;
pub mod model;
pub mod query;
pub mod registry;
pub mod relationship;
pub mod schema;

#[cfg(test)]
mod test_support;

pub use changeset::{ChangeSet, TimestampRepr};
pub use config::DbConfig;
pub use db::Db;
pub use load_tracker::{LoadStats, LoadTracker};
pub use model::{
    AfterQueryHook, BeforeQueryHook, DeriveHook, FieldBuilder, MappedField, Model, ModelDef,
    RelationshipBuilder, short_type_name,
};
pub use query::{Fetched, Query};
pub use registry::{Registry, SchemaKey};
pub use relationship::Relationship;
pub use schema::{IndexList, IndexMember, Schema};
