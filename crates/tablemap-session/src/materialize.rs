//! Row to model conversion.

use tablemap_core::{Row, RowError, Value};

use crate::db::Db;
use crate::model::Model;
use crate::schema::Schema;

/// Build one `M` from `row`.
///
/// Columns are matched by name. Scalar fields are written first, JSON
/// buffers are decoded afterwards, then the derived-attribute and post-row
/// hooks run in that order.
pub(crate) fn materialize<M: Model>(
    schema: &Schema<M>,
    row: Row,
    index: usize,
    db: &Db,
) -> Result<M, RowError> {
    let mut model = M::default();
    let mut deferred: Vec<(usize, Value)> = Vec::new();

    let columns = row.columns().to_vec();
    for (column, value) in columns.iter().zip(row.into_values()) {
        let Some(pos) = lookup(schema, column) else {
            continue;
        };
        let field = &schema.fields()[pos];
        if field.descriptor().json {
            deferred.push((pos, value));
            continue;
        }
        field
            .write(&mut model, value)
            .map_err(|e| e.into_row_error(index, field.column()))?;
    }

    for (pos, buffer) in deferred {
        let field = &schema.fields()[pos];
        field
            .write(&mut model, buffer)
            .map_err(|e| e.into_row_error(index, field.column()))?;
    }

    if let Some(derive) = schema.derive_hook() {
        derive(&mut model);
    }
    if let Some(after) = schema.after_query_hook() {
        after(&mut model, db).map_err(|e| RowError::hook(index, &e))?;
    }
    Ok(model)
}

fn lookup<M>(schema: &Schema<M>, column: &str) -> Option<usize> {
    schema.column_index(column).or_else(|| {
        // Drivers may report qualified or differently cased names.
        let bare = column.rsplit('.').next().unwrap_or(column);
        schema.column_index(bare).or_else(|| {
            schema
                .fields()
                .iter()
                .position(|f| f.column().eq_ignore_ascii_case(bare))
        })
    })
}
