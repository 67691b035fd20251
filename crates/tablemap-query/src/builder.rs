//! Query builders for SELECT, INSERT, UPDATE and DELETE statements.
//!
//! Every builder renders with `build_with_dialect` into statement text and
//! the parameter list, numbered for the dialect. `build` uses the default
//! dialect (Postgres).

use crate::clause::{Order, Predicate};
use tablemap_core::{Dialect, Error, Result, Value};

/// Render a predicate list joined by AND, appending to `sql`.
fn push_where(
    sql: &mut String,
    predicates: &[Predicate],
    dialect: Dialect,
    params: &mut Vec<Value>,
) {
    if predicates.is_empty() {
        return;
    }
    let parts: Vec<_> = predicates
        .iter()
        .map(|p| {
            let rendered = p.render(dialect, params);
            if predicates.len() > 1 && matches!(p, Predicate::Or(_)) {
                format!("({rendered})")
            } else {
                rendered
            }
        })
        .collect();
    sql.push_str(" WHERE ");
    sql.push_str(&parts.join(" AND "));
}

/// SELECT query builder.
///
/// # Example
///
/// ```ignore
/// let (sql, params) = SelectBuilder::new()
///     .table("posts")
///     .filter(Predicate::in_list("user_id", [1_i64, 2]))
///     .order_by("id", Order::Asc)
///     .build_with_dialect(Dialect::Sqlite)?;
/// ```
#[derive(Debug, Clone, Default)]
pub struct SelectBuilder {
    table: Option<String>,
    columns: Vec<String>,
    predicates: Vec<Predicate>,
    order: Vec<(String, Order)>,
    limit: Option<u64>,
    offset: Option<u64>,
}

impl SelectBuilder {
    /// Create an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the target table.
    pub fn table(mut self, table: impl Into<String>) -> Self {
        self.table = Some(table.into());
        self
    }

    /// Set the target table in place.
    pub fn set_table(&mut self, table: impl Into<String>) {
        self.table = Some(table.into());
    }

    /// Current target table.
    pub fn get_table(&self) -> Option<&str> {
        self.table.as_deref()
    }

    /// Replace the selected columns.
    pub fn columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.set_columns(columns);
        self
    }

    /// Replace the selected columns in place.
    pub fn set_columns<I, S>(&mut self, columns: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.columns = columns.into_iter().map(Into::into).collect();
    }

    /// Currently selected columns; empty means none were chosen.
    pub fn get_columns(&self) -> &[String] {
        &self.columns
    }

    /// Add a WHERE condition (AND-ed with the existing ones).
    pub fn filter(mut self, predicate: Predicate) -> Self {
        self.predicates.push(predicate);
        self
    }

    /// Add a WHERE condition in place.
    pub fn push_filter(&mut self, predicate: Predicate) {
        self.predicates.push(predicate);
    }

    /// Current WHERE conditions.
    pub fn predicates(&self) -> &[Predicate] {
        &self.predicates
    }

    /// Add an ORDER BY term.
    pub fn order_by(mut self, column: impl Into<String>, order: Order) -> Self {
        self.order.push((column.into(), order));
        self
    }

    /// Add an ORDER BY term in place.
    pub fn push_order(&mut self, column: impl Into<String>, order: Order) {
        self.order.push((column.into(), order));
    }

    /// Current ORDER BY terms.
    pub fn get_order(&self) -> &[(String, Order)] {
        &self.order
    }

    /// Set LIMIT.
    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Set LIMIT in place.
    pub fn set_limit(&mut self, limit: u64) {
        self.limit = Some(limit);
    }

    /// Current LIMIT.
    pub fn get_limit(&self) -> Option<u64> {
        self.limit
    }

    /// Set OFFSET.
    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Set OFFSET in place.
    pub fn set_offset(&mut self, offset: u64) {
        self.offset = Some(offset);
    }

    /// Build the SELECT SQL and parameters with default dialect (Postgres).
    pub fn build(&self) -> Result<(String, Vec<Value>)> {
        self.build_with_dialect(Dialect::default())
    }

    /// Build the SELECT SQL and parameters with specific dialect.
    pub fn build_with_dialect(&self, dialect: Dialect) -> Result<(String, Vec<Value>)> {
        let table = self
            .table
            .as_deref()
            .ok_or_else(|| Error::InvalidQuery("no table selected".to_string()))?;

        let columns = if self.columns.is_empty() {
            "*".to_string()
        } else {
            self.columns.join(", ")
        };

        let mut params = Vec::new();
        let mut sql = format!("SELECT {columns} FROM {table}");
        push_where(&mut sql, &self.predicates, dialect, &mut params);

        if !self.order.is_empty() {
            let terms: Vec<_> = self
                .order
                .iter()
                .map(|(c, o)| format!("{} {}", c, o.as_sql()))
                .collect();
            sql.push_str(" ORDER BY ");
            sql.push_str(&terms.join(", "));
        }

        match (self.limit, self.offset) {
            (Some(limit), Some(offset)) => sql.push_str(&format!(" LIMIT {limit} OFFSET {offset}")),
            (Some(limit), None) => sql.push_str(&format!(" LIMIT {limit}")),
            // SQLite and MySQL need a LIMIT before OFFSET.
            (None, Some(offset)) => match dialect {
                Dialect::Postgres => sql.push_str(&format!(" OFFSET {offset}")),
                Dialect::Sqlite => sql.push_str(&format!(" LIMIT -1 OFFSET {offset}")),
                Dialect::MySql => {
                    sql.push_str(&format!(" LIMIT 18446744073709551615 OFFSET {offset}"));
                }
            },
            (None, None) => {}
        }

        Ok((sql, params))
    }
}

/// INSERT query builder.
///
/// # Example
///
/// ```ignore
/// let (sql, params) = InsertBuilder::new("users")
///     .value("name", "kwin")
///     .value("status", 1_i64)
///     .build_with_dialect(Dialect::Sqlite);
/// ```
#[derive(Debug, Clone)]
pub struct InsertBuilder {
    table: String,
    values: Vec<(String, Value)>,
}

impl InsertBuilder {
    /// Create a new INSERT builder for `table`.
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            values: Vec::new(),
        }
    }

    /// Add one column value.
    pub fn value(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.values.push((column.into(), value.into()));
        self
    }

    /// Add many column values.
    pub fn values<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = (S, Value)>,
        S: Into<String>,
    {
        self.values
            .extend(values.into_iter().map(|(c, v)| (c.into(), v)));
        self
    }

    /// Build the INSERT SQL and parameters with default dialect (Postgres).
    pub fn build(&self) -> (String, Vec<Value>) {
        self.build_with_dialect(Dialect::default())
    }

    /// Build the INSERT SQL and parameters with specific dialect.
    pub fn build_with_dialect(&self, dialect: Dialect) -> (String, Vec<Value>) {
        if self.values.is_empty() {
            let sql = match dialect {
                Dialect::MySql => format!("INSERT INTO {} () VALUES ()", self.table),
                Dialect::Postgres | Dialect::Sqlite => {
                    format!("INSERT INTO {} DEFAULT VALUES", self.table)
                }
            };
            return (sql, Vec::new());
        }

        let columns: Vec<_> = self.values.iter().map(|(c, _)| c.as_str()).collect();
        let params: Vec<_> = self.values.iter().map(|(_, v)| v.clone()).collect();
        let placeholders: Vec<_> = (1..=params.len()).map(|i| dialect.placeholder(i)).collect();

        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            self.table,
            columns.join(", "),
            placeholders.join(", ")
        );
        (sql, params)
    }
}

/// UPDATE query builder.
///
/// Renders an empty statement when there is nothing to set; callers treat
/// that as "zero rows affected".
#[derive(Debug, Clone)]
pub struct UpdateBuilder {
    table: String,
    sets: Vec<(String, Value)>,
    predicates: Vec<Predicate>,
}

impl UpdateBuilder {
    /// Create a new UPDATE builder for `table`.
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            sets: Vec::new(),
            predicates: Vec::new(),
        }
    }

    /// Set a column to a value.
    pub fn set(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.sets.push((column.into(), value.into()));
        self
    }

    /// Set many columns.
    pub fn set_all<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = (S, Value)>,
        S: Into<String>,
    {
        self.sets.extend(values.into_iter().map(|(c, v)| (c.into(), v)));
        self
    }

    /// Add a WHERE condition.
    pub fn filter(mut self, predicate: Predicate) -> Self {
        self.predicates.push(predicate);
        self
    }

    /// Build the UPDATE SQL and parameters with default dialect (Postgres).
    pub fn build(&self) -> (String, Vec<Value>) {
        self.build_with_dialect(Dialect::default())
    }

    /// Build the UPDATE SQL and parameters with specific dialect.
    pub fn build_with_dialect(&self, dialect: Dialect) -> (String, Vec<Value>) {
        if self.sets.is_empty() {
            return (String::new(), Vec::new());
        }

        let mut params = Vec::with_capacity(self.sets.len());
        let set_clauses: Vec<_> = self
            .sets
            .iter()
            .map(|(column, value)| {
                params.push(value.clone());
                format!("{} = {}", column, dialect.placeholder(params.len()))
            })
            .collect();

        let mut sql = format!("UPDATE {} SET {}", self.table, set_clauses.join(", "));
        push_where(&mut sql, &self.predicates, dialect, &mut params);
        (sql, params)
    }
}

/// DELETE query builder.
#[derive(Debug, Clone)]
pub struct DeleteBuilder {
    table: String,
    predicates: Vec<Predicate>,
}

impl DeleteBuilder {
    /// Create a new DELETE builder for `table`.
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            predicates: Vec::new(),
        }
    }

    /// Add a WHERE condition.
    pub fn filter(mut self, predicate: Predicate) -> Self {
        self.predicates.push(predicate);
        self
    }

    /// Build the DELETE SQL and parameters with default dialect (Postgres).
    pub fn build(&self) -> (String, Vec<Value>) {
        self.build_with_dialect(Dialect::default())
    }

    /// Build the DELETE SQL and parameters with specific dialect.
    pub fn build_with_dialect(&self, dialect: Dialect) -> (String, Vec<Value>) {
        let mut params = Vec::new();
        let mut sql = format!("DELETE FROM {}", self.table);
        push_where(&mut sql, &self.predicates, dialect, &mut params);
        (sql, params)
    }
}
