//! Error types shared by every tablemap crate.
//!
//! The pipeline distinguishes failures by where they happen:
//!
//! - before any I/O (`Hook`, `Schema`, `InvalidQuery`),
//! - in the transport (`Execution`, always fail-fast),
//! - while materializing a single row (`Row`/`Rows`, accumulated across the
//!   whole result set),
//! - after the fact (`NotFound` for single-result fetches).

use std::fmt;

/// Result alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The query could not be dispatched or the cursor failed.
    #[error(transparent)]
    Execution(#[from] ExecutionError),

    /// Exactly one row failed to materialize.
    #[error(transparent)]
    Row(#[from] RowError),

    /// Several rows failed to materialize.
    #[error(transparent)]
    Rows(#[from] RowErrors),

    /// A single-result fetch matched nothing.
    #[error("no matching record found in `{table}`")]
    NotFound {
        /// Table that was queried.
        table: String,
    },

    /// A pre-query hook aborted the call.
    #[error(transparent)]
    Hook(#[from] HookError),

    /// The model description is invalid or a relationship is unknown.
    #[error("schema error: {0}")]
    Schema(String),

    /// A JSON field could not be encoded for a write.
    #[error("failed to encode field `{field}` as JSON: {source}")]
    Encode {
        /// Column being encoded.
        field: String,
        /// Underlying serializer error.
        #[source]
        source: serde_json::Error,
    },

    /// The pending query cannot be rendered.
    #[error("invalid query: {0}")]
    InvalidQuery(String),

    /// Configuration could not be loaded.
    #[error("configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Whether this is a `NotFound` error.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound { .. })
    }

    /// The row-level failures carried by this error, if any.
    #[must_use]
    pub fn row_errors(&self) -> &[RowError] {
        match self {
            Error::Row(err) => std::slice::from_ref(err),
            Error::Rows(errs) => &errs.0,
            _ => &[],
        }
    }
}

/// Transport failure reported by a `Connection`.
#[derive(Debug, thiserror::Error)]
#[error("query execution failed: {message}")]
pub struct ExecutionError {
    /// Human readable description.
    pub message: String,
    /// Statement text, when known.
    pub sql: Option<String>,
    /// Driver error.
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl ExecutionError {
    /// Create an execution error with a message only.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            sql: None,
            source: None,
        }
    }

    /// Attach the statement text.
    #[must_use]
    pub fn with_sql(mut self, sql: impl Into<String>) -> Self {
        self.sql = Some(sql.into());
        self
    }

    /// Attach the driver error.
    #[must_use]
    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }
}

/// Phase of row materialization that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowErrorKind {
    /// A column value could not be converted into its field.
    Scan,
    /// A JSON column could not be decoded.
    Decode,
    /// The post-row hook rejected the row.
    Hook,
}

impl fmt::Display for RowErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RowErrorKind::Scan => "scan",
            RowErrorKind::Decode => "decode",
            RowErrorKind::Hook => "hook",
        })
    }
}

/// A single row failed to materialize.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("row {index}: {kind} failed{}: {message}", column_suffix(.column.as_deref()))]
pub struct RowError {
    /// Zero-based position of the row in the result set.
    pub index: usize,
    /// Which phase failed.
    pub kind: RowErrorKind,
    /// Offending column, when the failure is tied to one.
    pub column: Option<String>,
    /// Description of the failure.
    pub message: String,
}

fn column_suffix(column: Option<&str>) -> String {
    column.map(|c| format!(" for column `{c}`")).unwrap_or_default()
}

impl RowError {
    /// A column value did not convert into its field.
    pub fn scan(index: usize, column: impl Into<String>, message: impl fmt::Display) -> Self {
        Self {
            index,
            kind: RowErrorKind::Scan,
            column: Some(column.into()),
            message: message.to_string(),
        }
    }

    /// A JSON column did not decode.
    pub fn decode(index: usize, column: impl Into<String>, message: impl fmt::Display) -> Self {
        Self {
            index,
            kind: RowErrorKind::Decode,
            column: Some(column.into()),
            message: message.to_string(),
        }
    }

    /// The post-row hook failed.
    pub fn hook(index: usize, err: &HookError) -> Self {
        Self {
            index,
            kind: RowErrorKind::Hook,
            column: None,
            message: err.message.clone(),
        }
    }
}

/// Several row failures from one call, in row order.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{} rows failed to materialize; first: {}", .0.len(), first_message(.0.as_slice()))]
pub struct RowErrors(pub Vec<RowError>);

fn first_message(errors: &[RowError]) -> String {
    errors.first().map(ToString::to_string).unwrap_or_default()
}

impl RowErrors {
    /// Collapse accumulated failures into a single error, if there are any.
    #[must_use]
    pub fn into_error(mut self) -> Option<Error> {
        match self.0.len() {
            0 => None,
            1 => self.0.pop().map(Error::Row),
            _ => Some(Error::Rows(self)),
        }
    }
}

/// Error raised by a lifecycle hook.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("hook failed: {message}")]
pub struct HookError {
    /// Reason given by the hook.
    pub message: String,
}

impl HookError {
    /// Create a hook error.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<&str> for HookError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

impl From<String> for HookError {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}

/// A `Value` could not be converted into a field type.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("cannot convert {found} into {expected}{}", detail_suffix(.detail.as_deref()))]
pub struct ConversionError {
    /// Target Rust type.
    pub expected: &'static str,
    /// Variant of the source value.
    pub found: &'static str,
    /// Extra context (parse failure, overflow).
    pub detail: Option<String>,
}

fn detail_suffix(detail: Option<&str>) -> String {
    detail.map(|d| format!(" ({d})")).unwrap_or_default()
}

impl ConversionError {
    /// Create a conversion error.
    pub fn new(expected: &'static str, found: &'static str) -> Self {
        Self {
            expected,
            found,
            detail: None,
        }
    }

    /// Attach extra context.
    #[must_use]
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_error_display_includes_column() {
        let err = RowError::scan(2, "age", "cannot convert text into i32");
        assert_eq!(
            err.to_string(),
            "row 2: scan failed for column `age`: cannot convert text into i32"
        );
    }

    #[test]
    fn test_hook_row_error_has_no_column() {
        let err = RowError::hook(0, &HookError::new("banned"));
        assert_eq!(err.kind, RowErrorKind::Hook);
        assert_eq!(err.to_string(), "row 0: hook failed: banned");
    }

    #[test]
    fn test_row_errors_collapse() {
        assert!(RowErrors(Vec::new()).into_error().is_none());

        let single = RowErrors(vec![RowError::scan(1, "a", "x")]).into_error();
        assert!(matches!(single, Some(Error::Row(ref e)) if e.index == 1));

        let many = RowErrors(vec![RowError::scan(1, "a", "x"), RowError::scan(3, "b", "y")])
            .into_error()
            .unwrap();
        assert_eq!(many.row_errors().len(), 2);
        assert!(many.to_string().starts_with("2 rows failed"));
    }

    #[test]
    fn test_not_found_predicate() {
        let err = Error::NotFound {
            table: "users".to_string(),
        };
        assert!(err.is_not_found());
        assert!(err.row_errors().is_empty());
    }

    #[test]
    fn test_execution_error_builder() {
        let err = ExecutionError::new("boom").with_sql("SELECT 1");
        assert_eq!(err.sql.as_deref(), Some("SELECT 1"));
        assert_eq!(err.to_string(), "query execution failed: boom");
    }

    #[test]
    fn test_conversion_error_detail() {
        let err = ConversionError::new("i32", "text").with_detail("invalid digit");
        assert_eq!(err.to_string(), "cannot convert text into i32 (invalid digit)");
    }
}
