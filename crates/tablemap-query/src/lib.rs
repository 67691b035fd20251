//! Statement builders for tablemap.
//!
//! Builders accumulate table, columns, predicates, ordering and limits and
//! render them into statement text plus an ordered parameter list for a
//! [`Dialect`]. Raw predicates written with `?` markers are renumbered for
//! dialects with positional placeholders.
//!
//! ```ignore
//! let (sql, params) = SelectBuilder::new()
//!     .table("users")
//!     .columns(["id", "name"])
//!     .filter(Predicate::eq("name", "kwin"))
//!     .limit(1)
//!     .build_with_dialect(Dialect::Sqlite)?;
//! assert_eq!(sql, "SELECT id, name FROM users WHERE name = ?1 LIMIT 1");
//! ```

pub mod builder;
pub mod clause;

pub use builder::{DeleteBuilder, InsertBuilder, SelectBuilder, UpdateBuilder};
pub use clause::{Operator, Order, Predicate};
pub use tablemap_core::Dialect;
