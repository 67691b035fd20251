//! Field and column definitions.

use heck::ToSnakeCase;

use crate::types::DataKind;
use crate::value::Value;

/// Declared default of a field.
///
/// `Unset` and `Null` are different: a zero-valued field with an unset
/// default is written as its zero value, while an explicit NULL default
/// leaves the column out of the change-set so the database default applies.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum DefaultValue {
    /// No default declared.
    #[default]
    Unset,
    /// Explicit NULL default.
    Null,
    /// Literal default used in place of a zero value.
    Value(Value),
}

impl DefaultValue {
    /// Whether a default was declared at all.
    #[must_use]
    pub const fn is_set(&self) -> bool {
        !matches!(self, DefaultValue::Unset)
    }
}

/// Index classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum IndexKind {
    /// UNIQUE KEY.
    Unique,
    /// FULLTEXT KEY.
    FullText,
    /// Plain KEY.
    Plain,
}

impl IndexKind {
    /// DDL keyword for this index kind.
    #[must_use]
    pub const fn as_sql(&self) -> &'static str {
        match self {
            IndexKind::Unique => "UNIQUE KEY",
            IndexKind::FullText => "FULLTEXT KEY",
            IndexKind::Plain => "KEY",
        }
    }
}

/// Membership of a field in a named index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexSpec {
    /// Classification.
    pub kind: IndexKind,
    /// Index name; fields sharing a name form a composite index.
    pub name: String,
    /// Position inside a composite index (lower sorts first).
    pub priority: i32,
}

/// Convention role of a field, derived from its column name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FieldRole {
    /// No convention applies.
    #[default]
    Plain,
    /// `created_at`: stamped on insert, never written on update.
    CreatedAt,
    /// `updated_at`: stamped on every write.
    UpdatedAt,
    /// `deleted_at`: soft-delete marker.
    DeletedAt,
}

impl FieldRole {
    /// Role implied by a column name.
    #[must_use]
    pub fn for_column(column: &str) -> Self {
        match column {
            "created_at" => FieldRole::CreatedAt,
            "updated_at" => FieldRole::UpdatedAt,
            "deleted_at" => FieldRole::DeletedAt,
            _ => FieldRole::Plain,
        }
    }

    /// Whether the change-set stamps the current time into this field.
    #[must_use]
    pub const fn is_write_timestamp(&self) -> bool {
        matches!(self, FieldRole::CreatedAt | FieldRole::UpdatedAt)
    }
}

/// Metadata about a mapped field/column.
///
/// Built once when a schema is resolved and never modified afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDescriptor {
    /// Rust field name
    pub name: String,
    /// Database column name (defaults to the snake-cased field name)
    pub column_name: String,
    /// Category of the field type
    pub kind: DataKind,
    /// Declared bit width (zero when meaningless)
    pub size: u16,
    /// Whether this is the primary key
    pub primary_key: bool,
    /// Whether the database assigns this value
    pub auto_increment: bool,
    /// Unmanaged column: never selected by default and never written
    pub raw: bool,
    /// Stored as JSON text
    pub json: bool,
    /// Declared default
    pub default: DefaultValue,
    /// Index memberships
    pub indexes: Vec<IndexSpec>,
    /// Convention role
    pub role: FieldRole,
}

impl FieldDescriptor {
    /// Create a descriptor; the column name and role follow from `name`.
    pub fn new(name: impl Into<String>, kind: DataKind, size: u16) -> Self {
        let name = name.into();
        let column_name = name.to_snake_case();
        let role = FieldRole::for_column(&column_name);
        Self {
            name,
            column_name,
            kind,
            size,
            primary_key: false,
            auto_increment: false,
            raw: false,
            json: false,
            default: DefaultValue::Unset,
            indexes: Vec::new(),
            role,
        }
    }

    /// Set the database column name. The convention role follows the new name.
    #[must_use]
    pub fn column(mut self, name: impl Into<String>) -> Self {
        self.column_name = name.into();
        self.role = FieldRole::for_column(&self.column_name);
        self
    }

    /// Set primary key flag.
    #[must_use]
    pub fn primary_key(mut self, value: bool) -> Self {
        self.primary_key = value;
        self
    }

    /// Set auto-increment flag.
    #[must_use]
    pub fn auto_increment(mut self, value: bool) -> Self {
        self.auto_increment = value;
        self
    }

    /// Set raw (unmanaged) flag.
    #[must_use]
    pub fn raw(mut self, value: bool) -> Self {
        self.raw = value;
        self
    }

    /// Set JSON flag. JSON fields report `DataKind::Json`.
    #[must_use]
    pub fn json(mut self, value: bool) -> Self {
        self.json = value;
        if value {
            self.kind = DataKind::Json;
        }
        self
    }

    /// Override the declared width.
    #[must_use]
    pub fn size(mut self, bits: u16) -> Self {
        self.size = bits;
        self
    }

    /// Set the declared default.
    #[must_use]
    pub fn default_value(mut self, default: DefaultValue) -> Self {
        self.default = default;
        self
    }

    /// Add an index membership.
    #[must_use]
    pub fn index(mut self, kind: IndexKind, name: impl Into<String>, priority: i32) -> Self {
        self.indexes.push(IndexSpec {
            kind,
            name: name.into(),
            priority,
        });
        self
    }

    /// Override the convention role.
    #[must_use]
    pub fn role(mut self, role: FieldRole) -> Self {
        self.role = role;
        self
    }

    /// Whether the field is part of the default select list.
    #[must_use]
    pub const fn is_selectable(&self) -> bool {
        !self.raw
    }
}
