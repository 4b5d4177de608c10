//! First/last name combination for person tables.

use crate::{
    error::EnrichResult,
    schema::{FIRST_NAME, FULL_NAME, LAST_NAME},
    table::{Table, Value},
};

/// Merge `primeiro_nome` + `ultimo_nome` into `nome_completo`, placed as the
/// second column, and drop the sources. Returns whether anything changed;
/// a table without both sources is left untouched, so calling twice is safe.
pub fn combine_names(table: &mut Table) -> EnrichResult<bool> {
    let (Some(first), Some(last)) = (table.column(FIRST_NAME), table.column(LAST_NAME)) else {
        return Ok(false);
    };

    let full: Vec<Value> = first
        .iter()
        .zip(last)
        .map(|(f, l)| {
            if f.is_null() || l.is_null() {
                Value::Null
            } else {
                Value::Text(format!("{} {}", f.render(), l.render()))
            }
        })
        .collect();

    table.drop_columns(&[FIRST_NAME, LAST_NAME]);
    table.insert_column(1, FULL_NAME, full)?;
    Ok(true)
}
