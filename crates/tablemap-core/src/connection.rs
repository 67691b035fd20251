//! Driver contract.

use crate::error::Result;
use crate::row::Row;
use crate::types::Dialect;
use crate::value::Value;

/// Row cursor returned by [`Connection::query`].
///
/// Each item is one row or a cursor failure; consumers stop at the first
/// failure.
pub type Rows<'c> = Box<dyn Iterator<Item = Result<Row>> + 'c>;

/// A live database connection.
///
/// Every call blocks the caller until the database answers. Implementations
/// report transport failures as [`crate::Error::Execution`].
pub trait Connection: Send + Sync {
    /// Dialect used to render statements for this connection.
    fn dialect(&self) -> Dialect;

    /// Identity of the database behind this connection.
    ///
    /// Part of the schema cache key, so two connections to the same database
    /// share metadata.
    fn dsn(&self) -> &str;

    /// Run a statement that returns rows.
    fn query(&self, sql: &str, params: &[Value]) -> Result<Rows<'_>>;

    /// Run a statement and return the number of affected rows.
    fn execute(&self, sql: &str, params: &[Value]) -> Result<u64>;

    /// Run an INSERT and return the generated row id.
    fn insert(&self, sql: &str, params: &[Value]) -> Result<i64>;
}
