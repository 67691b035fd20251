//! Core types and traits for tablemap.
//!
//! `tablemap-core` is the **foundation layer** of the workspace. It defines the
//! value model, the per-field metadata and the driver contract that every other
//! crate builds on.
//!
//! # Role In The Architecture
//!
//! - **Contract layer**: `Connection` is implemented by database drivers and
//!   consumed by the session pipeline.
//! - **Data model**: `Row`, `Value` and `DataKind` describe query inputs and
//!   outputs; `FieldValue` converts between them and Rust field types.
//! - **Field metadata**: `FieldDescriptor` records everything the mapper knows
//!   about one column (kind, width, flags, default, index membership).
//!
//! # Who Uses This Crate
//!
//! - `tablemap-query` renders statements over `Value` parameters.
//! - `tablemap-session` builds schemas from `FieldDescriptor`s and drives
//!   `Connection`s.
//! - `tablemap-sqlite` implements `Connection`.
//!
//! Most applications should use the `tablemap` facade.

pub mod connection;
pub mod error;
pub mod field;
pub mod identifiers;
pub mod relationship;
pub mod row;
pub mod types;
pub mod value;

pub use connection::{Connection, Rows};
pub use error::{
    ConversionError, Error, ExecutionError, HookError, Result, RowError, RowErrorKind, RowErrors,
};
pub use field::{DefaultValue, FieldDescriptor, FieldRole, IndexKind, IndexSpec};
pub use identifiers::{is_valid_identifier, is_valid_table_name, quote_ident};
pub use relationship::{Cardinality, RelationshipInfo, RelationshipKind};
pub use row::Row;
pub use types::{DataKind, Dialect};
pub use value::{FieldValue, RelationKey, Value};
