//! Data-kind categories and SQL dialects.

use serde::{Deserialize, Serialize};

/// Category of a mapped field's Rust type.
///
/// The kind and declared width together decide how convention timestamps are
/// represented in a change-set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum DataKind {
    /// Signed integers.
    Int,
    /// Unsigned integers.
    Uint,
    /// Floating point numbers.
    Float,
    /// Booleans.
    Bool,
    /// Text.
    String,
    /// Raw byte strings.
    Bytes,
    /// Dates and timestamps.
    Time,
    /// A structured value stored as JSON text.
    Json,
    /// Anything else.
    #[default]
    Other,
}

impl DataKind {
    /// Short lowercase name used in diagnostics.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            DataKind::Int => "int",
            DataKind::Uint => "uint",
            DataKind::Float => "float",
            DataKind::Bool => "bool",
            DataKind::String => "string",
            DataKind::Bytes => "bytes",
            DataKind::Time => "time",
            DataKind::Json => "json",
            DataKind::Other => "other",
        }
    }

    /// Whether this kind is an integer (signed or unsigned).
    #[must_use]
    pub const fn is_integer(&self) -> bool {
        matches!(self, DataKind::Int | DataKind::Uint)
    }
}

/// SQL dialect spoken by a connection.
///
/// The dialect is part of the schema cache key and decides placeholder syntax.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Dialect {
    /// PostgreSQL (`$1`, `$2`, ...).
    #[default]
    Postgres,
    /// MySQL (`?`).
    MySql,
    /// SQLite (`?1`, `?2`, ...).
    Sqlite,
}

impl Dialect {
    /// Stable dialect name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Dialect::Postgres => "postgres",
            Dialect::MySql => "mysql",
            Dialect::Sqlite => "sqlite",
        }
    }

    /// Placeholder for the 1-based parameter `index`.
    #[must_use]
    pub fn placeholder(&self, index: usize) -> String {
        match self {
            Dialect::Postgres => format!("${index}"),
            Dialect::MySql => "?".to_string(),
            Dialect::Sqlite => format!("?{index}"),
        }
    }

    /// Identifier quote character.
    #[must_use]
    pub const fn quote_char(&self) -> char {
        match self {
            Dialect::MySql => '`',
            Dialect::Postgres | Dialect::Sqlite => '"',
        }
    }
}
