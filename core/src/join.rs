//! Left joins on one or more shared key columns.
//!
//! Every left row survives, in order. A key that appears k times on the
//! right duplicates its left row k times (fan-out). Rows whose key is null
//! or has no match get nulls for every right-hand column.

use crate::{
    error::{EnrichError, EnrichResult},
    table::{Key, Table},
};
use std::collections::HashMap;

/// Row keys of `table` over `on`; `None` when any key cell is null.
pub(crate) fn row_keys(table: &Table, name: &str, on: &[&str]) -> EnrichResult<Vec<Option<Vec<Key>>>> {
    let columns = on
        .iter()
        .map(|col| {
            table
                .column(col)
                .ok_or_else(|| EnrichError::missing_column(name, col))
        })
        .collect::<EnrichResult<Vec<_>>>()?;

    Ok((0..table.height())
        .map(|row| {
            columns
                .iter()
                .map(|values| values.get(row).and_then(|v| v.key()))
                .collect::<Option<Vec<Key>>>()
        })
        .collect())
}

/// Left-join `right` onto `left` on the `on` columns. Right-hand non-key
/// columns whose name already exists on the left get `suffix` appended.
pub fn left_join(left: &Table, right: &Table, on: &[&str], suffix: &str) -> EnrichResult<Table> {
    let left_keys = row_keys(left, "left", on)?;
    let right_keys = row_keys(right, "right", on)?;

    let mut index: HashMap<Vec<Key>, Vec<usize>> = HashMap::new();
    for (row, key) in right_keys.into_iter().enumerate() {
        if let Some(key) = key {
            index.entry(key).or_default().push(row);
        }
    }

    let mut left_rows = Vec::with_capacity(left.height());
    let mut right_rows = Vec::with_capacity(left.height());
    for (row, key) in left_keys.iter().enumerate() {
        match key.as_ref().and_then(|k| index.get(k)) {
            Some(matches) => {
                for m in matches {
                    left_rows.push(Some(row));
                    right_rows.push(Some(*m));
                }
            }
            None => {
                left_rows.push(Some(row));
                right_rows.push(None);
            }
        }
    }

    let fanned = left_rows.len() - left.height();
    if fanned > 0 {
        log::debug!("left join on {on:?} fanned out {fanned} extra row(s)");
    }

    let mut joined = left.take_rows(&left_rows);
    let gathered = right.take_rows(&right_rows);
    for column in gathered.columns() {
        if on.contains(&column.name.as_str()) {
            continue;
        }
        let name = if joined.has_column(&column.name) {
            format!("{}{suffix}", column.name)
        } else {
            column.name.clone()
        };
        joined.set_column(&name, column.values.clone())?;
    }
    Ok(joined)
}
