//! SQLite connection for tablemap, backed by `rusqlite`.
//!
//! ```ignore
//! let conn = SqliteConnection::open_memory()?;
//! conn.execute_batch("CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT NOT NULL)")?;
//! let db = Db::new(conn);
//! ```

use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};

use rusqlite::types::{Value as SqliteValue, ValueRef};
use tablemap_core::value::TIMESTAMP_TEXT_FORMAT;
use tablemap_core::{Connection, Dialect, Error, ExecutionError, Result, Row, Rows, Value};

/// A single SQLite database handle.
///
/// Calls are serialized through a mutex. Result sets are read fully before
/// the lock is released.
pub struct SqliteConnection {
    conn: Mutex<rusqlite::Connection>,
    dsn: String,
}

impl std::fmt::Debug for SqliteConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteConnection")
            .field("dsn", &self.dsn)
            .finish_non_exhaustive()
    }
}

fn driver_error(message: &str, sql: Option<&str>, source: rusqlite::Error) -> Error {
    let mut err = ExecutionError::new(format!("{message}: {source}"));
    if let Some(sql) = sql {
        err = err.with_sql(sql);
    }
    err.with_source(source).into()
}

impl SqliteConnection {
    /// Open (or create) a database file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let conn = rusqlite::Connection::open(path)
            .map_err(|e| driver_error("failed to open database", None, e))?;
        tracing::debug!(path = %path.display(), "Opened SQLite database");
        Ok(Self {
            conn: Mutex::new(conn),
            dsn: format!("sqlite://{}", path.display()),
        })
    }

    /// Open a private in-memory database.
    pub fn open_memory() -> Result<Self> {
        let conn = rusqlite::Connection::open_in_memory()
            .map_err(|e| driver_error("failed to open in-memory database", None, e))?;
        Ok(Self {
            conn: Mutex::new(conn),
            dsn: ":memory:".to_string(),
        })
    }

    /// Run several `;`-separated statements without parameters.
    pub fn execute_batch(&self, sql: &str) -> Result<()> {
        self.lock()
            .execute_batch(sql)
            .map_err(|e| driver_error("batch failed", Some(sql), e))
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, rusqlite::Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Bind value for one parameter.
fn to_sqlite(value: &Value) -> Result<SqliteValue> {
    Ok(match value {
        Value::Null => SqliteValue::Null,
        Value::Bool(b) => SqliteValue::Integer(i64::from(*b)),
        Value::Int(i) => SqliteValue::Integer(*i),
        Value::Uint(u) => SqliteValue::Integer(i64::try_from(*u).map_err(|_| {
            ExecutionError::new(format!("unsigned value {u} does not fit an SQLite integer"))
        })?),
        Value::Float(f) => SqliteValue::Real(*f),
        Value::Text(s) => SqliteValue::Text(s.clone()),
        Value::Bytes(b) => SqliteValue::Blob(b.clone()),
        Value::Timestamp(ts) => SqliteValue::Text(ts.format(TIMESTAMP_TEXT_FORMAT).to_string()),
    })
}

fn bind(params: &[Value]) -> Result<Vec<SqliteValue>> {
    params.iter().map(to_sqlite).collect()
}

fn from_sqlite(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::Int(i),
        ValueRef::Real(f) => Value::Float(f),
        ValueRef::Text(bytes) => Value::Text(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Blob(bytes) => Value::Bytes(bytes.to_vec()),
    }
}

impl Connection for SqliteConnection {
    fn dialect(&self) -> Dialect {
        Dialect::Sqlite
    }

    fn dsn(&self) -> &str {
        &self.dsn
    }

    fn query(&self, sql: &str, params: &[Value]) -> Result<Rows<'_>> {
        let values = bind(params)?;
        let conn = self.lock();
        let mut stmt = conn
            .prepare(sql)
            .map_err(|e| driver_error("prepare failed", Some(sql), e))?;

        let columns: Arc<[String]> = stmt
            .column_names()
            .into_iter()
            .map(str::to_string)
            .collect();
        let width = columns.len();

        let mut cursor = stmt
            .query(rusqlite::params_from_iter(values.iter()))
            .map_err(|e| driver_error("query failed", Some(sql), e))?;

        let mut rows = Vec::new();
        loop {
            let next = match cursor.next() {
                Ok(Some(row)) => (0..width)
                    .map(|i| row.get_ref(i).map(from_sqlite))
                    .collect::<rusqlite::Result<Vec<_>>>()
                    .map(|values| Row::new(Arc::clone(&columns), values))
                    .map_err(|e| driver_error("failed to read row", Some(sql), e)),
                Ok(None) => break,
                Err(e) => Err(driver_error("cursor failed", Some(sql), e)),
            };
            let failed = next.is_err();
            rows.push(next);
            if failed {
                break;
            }
        }

        tracing::trace!(rows = rows.len(), "SQLite query complete");
        Ok(Box::new(rows.into_iter()))
    }

    fn execute(&self, sql: &str, params: &[Value]) -> Result<u64> {
        let values = bind(params)?;
        let affected = self
            .lock()
            .execute(sql, rusqlite::params_from_iter(values.iter()))
            .map_err(|e| driver_error("execute failed", Some(sql), e))?;
        Ok(affected as u64)
    }

    fn insert(&self, sql: &str, params: &[Value]) -> Result<i64> {
        let values = bind(params)?;
        let conn = self.lock();
        conn.execute(sql, rusqlite::params_from_iter(values.iter()))
            .map_err(|e| driver_error("insert failed", Some(sql), e))?;
        Ok(conn.last_insert_rowid())
    }
}
