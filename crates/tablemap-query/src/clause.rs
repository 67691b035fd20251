//! WHERE predicates and ORDER BY directions.

use tablemap_core::{Dialect, Value};

/// Comparison operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    /// `=`
    Eq,
    /// `<>`
    Ne,
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `>`
    Gt,
    /// `>=`
    Ge,
    /// `LIKE`
    Like,
}

impl Operator {
    /// SQL spelling.
    #[must_use]
    pub const fn as_sql(&self) -> &'static str {
        match self {
            Operator::Eq => "=",
            Operator::Ne => "<>",
            Operator::Lt => "<",
            Operator::Le => "<=",
            Operator::Gt => ">",
            Operator::Ge => ">=",
            Operator::Like => "LIKE",
        }
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Order {
    /// Ascending.
    #[default]
    Asc,
    /// Descending.
    Desc,
}

impl Order {
    /// SQL keyword.
    #[must_use]
    pub const fn as_sql(&self) -> &'static str {
        match self {
            Order::Asc => "ASC",
            Order::Desc => "DESC",
        }
    }
}

/// A boolean condition.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// `column <op> value`
    Compare {
        /// Column or qualified column.
        column: String,
        /// Operator.
        op: Operator,
        /// Right-hand side, bound as a parameter.
        value: Value,
    },
    /// `column IN (values...)`; an empty list never matches.
    In {
        /// Column or qualified column.
        column: String,
        /// Candidate values.
        values: Vec<Value>,
    },
    /// `column IS NULL`
    IsNull(String),
    /// `column IS NOT NULL`
    IsNotNull(String),
    /// Raw SQL with `?` markers bound to `params` in order.
    Raw {
        /// Fragment text.
        sql: String,
        /// Parameters for the `?` markers.
        params: Vec<Value>,
    },
    /// All of the inner predicates.
    And(Vec<Predicate>),
    /// Any of the inner predicates.
    Or(Vec<Predicate>),
}

impl Predicate {
    /// `column <op> value`
    pub fn compare(column: impl Into<String>, op: Operator, value: impl Into<Value>) -> Self {
        Predicate::Compare {
            column: column.into(),
            op,
            value: value.into(),
        }
    }

    /// `column = value`
    pub fn eq(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(column, Operator::Eq, value)
    }

    /// `column <> value`
    pub fn ne(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(column, Operator::Ne, value)
    }

    /// `column < value`
    pub fn lt(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(column, Operator::Lt, value)
    }

    /// `column <= value`
    pub fn le(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(column, Operator::Le, value)
    }

    /// `column > value`
    pub fn gt(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(column, Operator::Gt, value)
    }

    /// `column >= value`
    pub fn ge(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(column, Operator::Ge, value)
    }

    /// `column LIKE pattern`
    pub fn like(column: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self::compare(column, Operator::Like, Value::Text(pattern.into()))
    }

    /// `column IN (values...)`
    pub fn in_list<I, V>(column: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Predicate::In {
            column: column.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    /// `column IS NULL`
    pub fn is_null(column: impl Into<String>) -> Self {
        Predicate::IsNull(column.into())
    }

    /// `column IS NOT NULL`
    pub fn is_not_null(column: impl Into<String>) -> Self {
        Predicate::IsNotNull(column.into())
    }

    /// Raw fragment with `?` markers.
    pub fn raw(sql: impl Into<String>, params: Vec<Value>) -> Self {
        Predicate::Raw {
            sql: sql.into(),
            params,
        }
    }

    /// Combine with another predicate using AND.
    #[must_use]
    pub fn and(self, other: Predicate) -> Self {
        match self {
            Predicate::And(mut items) => {
                items.push(other);
                Predicate::And(items)
            }
            first => Predicate::And(vec![first, other]),
        }
    }

    /// Combine with another predicate using OR.
    #[must_use]
    pub fn or(self, other: Predicate) -> Self {
        match self {
            Predicate::Or(mut items) => {
                items.push(other);
                Predicate::Or(items)
            }
            first => Predicate::Or(vec![first, other]),
        }
    }

    /// Render into `params`, numbering placeholders after what is already
    /// bound.
    pub fn render(&self, dialect: Dialect, params: &mut Vec<Value>) -> String {
        match self {
            Predicate::Compare { column, op, value } => {
                params.push(value.clone());
                format!(
                    "{} {} {}",
                    column,
                    op.as_sql(),
                    dialect.placeholder(params.len())
                )
            }
            Predicate::In { column, values } => {
                if values.is_empty() {
                    return "1 = 0".to_string();
                }
                let placeholders: Vec<_> = values
                    .iter()
                    .map(|v| {
                        params.push(v.clone());
                        dialect.placeholder(params.len())
                    })
                    .collect();
                format!("{} IN ({})", column, placeholders.join(", "))
            }
            Predicate::IsNull(column) => format!("{column} IS NULL"),
            Predicate::IsNotNull(column) => format!("{column} IS NOT NULL"),
            Predicate::Raw { sql, params: raw } => renumber(sql, raw, dialect, params),
            Predicate::And(items) => join(items, " AND ", dialect, params),
            Predicate::Or(items) => join(items, " OR ", dialect, params),
        }
    }
}

fn join(items: &[Predicate], sep: &str, dialect: Dialect, params: &mut Vec<Value>) -> String {
    match items {
        [] => "1 = 1".to_string(),
        [single] => single.render(dialect, params),
        _ => {
            let parts: Vec<_> = items
                .iter()
                .map(|p| format!("({})", p.render(dialect, params)))
                .collect();
            parts.join(sep)
        }
    }
}

/// Replace `?` markers outside string literals with dialect placeholders.
fn renumber(sql: &str, raw: &[Value], dialect: Dialect, params: &mut Vec<Value>) -> String {
    let mut out = String::with_capacity(sql.len() + raw.len() * 2);
    let mut pending = raw.iter();
    let mut in_literal = false;
    for ch in sql.chars() {
        match ch {
            '\'' => {
                in_literal = !in_literal;
                out.push(ch);
            }
            '?' if !in_literal => match pending.next() {
                Some(value) => {
                    params.push(value.clone());
                    out.push_str(&dialect.placeholder(params.len()));
                }
                None => out.push(ch),
            },
            _ => out.push(ch),
        }
    }
    if pending.len() > 0 {
        tracing::warn!(
            fragment = sql,
            unused = pending.len(),
            "Raw predicate has more parameters than `?` markers"
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compare_numbers_after_existing_params() {
        let mut params = vec![Value::Int(1)];
        let sql = Predicate::eq("name", "kwin").render(Dialect::Postgres, &mut params);
        assert_eq!(sql, "name = $2");
        assert_eq!(params.len(), 2);
    }

    #[test]
    fn test_in_list() {
        let mut params = Vec::new();
        let sql = Predicate::in_list("user_id", [1_i64, 2, 3]).render(Dialect::Sqlite, &mut params);
        assert_eq!(sql, "user_id IN (?1, ?2, ?3)");
        assert_eq!(params, vec![Value::Int(1), Value::Int(2), Value::Int(3)]);
    }

    #[test]
    fn test_empty_in_list_never_matches() {
        let mut params = Vec::new();
        let sql = Predicate::in_list("id", Vec::<i64>::new()).render(Dialect::Sqlite, &mut params);
        assert_eq!(sql, "1 = 0");
        assert!(params.is_empty());
    }

    #[test]
    fn test_null_checks() {
        let mut params = Vec::new();
        assert_eq!(
            Predicate::is_null("users.deleted_at").render(Dialect::MySql, &mut params),
            "users.deleted_at IS NULL"
        );
        assert_eq!(
            Predicate::is_not_null("x").render(Dialect::MySql, &mut params),
            "x IS NOT NULL"
        );
    }

    #[test]
    fn test_raw_renumbers_markers() {
        let mut params = vec![Value::Int(9)];
        let sql = Predicate::raw(
            "age > ? AND note <> '?' AND id < ?",
            vec![Value::Int(18), Value::Int(50)],
        )
        .render(Dialect::Postgres, &mut params);
        assert_eq!(sql, "age > $2 AND note <> '?' AND id < $3");
        assert_eq!(params.len(), 3);
    }

    #[test]
    fn test_and_or_grouping() {
        let mut params = Vec::new();
        let sql = Predicate::eq("a", 1_i64)
            .or(Predicate::eq("b", 2_i64))
            .render(Dialect::MySql, &mut params);
        assert_eq!(sql, "(a = ?) OR (b = ?)");

        let nested = Predicate::eq("a", 1_i64).and(Predicate::is_null("c"));
        assert!(matches!(nested, Predicate::And(ref items) if items.len() == 2));
    }
}
