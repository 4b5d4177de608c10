//! Group-by aggregates and their broadcast back onto a dimension table.
//!
//! Groups are keyed by the non-null values of the key columns and kept in
//! key order. Rows with a null key belong to no group.

use crate::{
    error::{EnrichError, EnrichResult},
    join::row_keys,
    table::{Column, Key, Table, Value},
};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Aggregation {
    /// Mean of non-null cells; null when there are none.
    Mean,
    /// Sum of non-null cells; 0 when there are none.
    Sum,
    /// Number of non-null cells.
    Count,
    /// Number of rows.
    Size,
}

impl Aggregation {
    pub fn apply<'a>(self, values: impl Iterator<Item = &'a Value>) -> Value {
        match self {
            Self::Size => Value::Int(values.count() as i64),
            Self::Count => Value::Int(values.filter(|v| !v.is_null()).count() as i64),
            Self::Mean => {
                let (sum, n) = values
                    .filter_map(Value::as_f64)
                    .fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
                if n == 0 {
                    Value::Null
                } else {
                    Value::float(sum / n as f64)
                }
            }
            Self::Sum => {
                let mut int_sum: i64 = 0;
                let mut float_sum = 0.0;
                let mut all_int = true;
                let mut seen = false;
                for value in values {
                    match value {
                        Value::Int(i) => {
                            int_sum = int_sum.saturating_add(*i);
                            float_sum += *i as f64;
                            seen = true;
                        }
                        other => {
                            if let Some(f) = other.as_f64() {
                                float_sum += f;
                                all_int = false;
                                seen = true;
                            }
                        }
                    }
                }
                if seen && all_int {
                    Value::Int(int_sum)
                } else {
                    Value::float(float_sum)
                }
            }
        }
    }
}

/// One aggregate value per group key.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupedValues {
    key_columns: Vec<String>,
    values: BTreeMap<Vec<Key>, Value>,
}

impl GroupedValues {
    pub fn new(key_columns: &[&str], values: BTreeMap<Vec<Key>, Value>) -> Self {
        Self {
            key_columns: key_columns.iter().map(|k| k.to_string()).collect(),
            values,
        }
    }

    pub fn get(&self, key: &[Key]) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Materialize as a table of key columns plus `value_column`, ready to join.
    pub fn to_table(&self, value_column: &str) -> EnrichResult<Table> {
        let mut columns: Vec<Column> = self
            .key_columns
            .iter()
            .map(|k| Column::new(k.clone(), Vec::with_capacity(self.values.len())))
            .collect();
        let mut aggregated = Vec::with_capacity(self.values.len());
        for (key, value) in &self.values {
            for (column, part) in columns.iter_mut().zip(key) {
                column.values.push(part.to_value());
            }
            aggregated.push(value.clone());
        }
        columns.push(Column::new(value_column, aggregated));
        Table::from_columns(columns)
    }
}

/// Row indices per group, in key order.
pub fn group_rows(
    table: &Table,
    name: &str,
    keys: &[&str],
) -> EnrichResult<BTreeMap<Vec<Key>, Vec<usize>>> {
    let mut groups: BTreeMap<Vec<Key>, Vec<usize>> = BTreeMap::new();
    for (row, key) in row_keys(table, name, keys)?.into_iter().enumerate() {
        if let Some(key) = key {
            groups.entry(key).or_default().push(row);
        }
    }
    Ok(groups)
}

/// Aggregate `value_column` per group of `keys`. `Size` ignores the value column.
pub fn group_by(
    table: &Table,
    name: &str,
    keys: &[&str],
    value_column: &str,
    aggregation: Aggregation,
) -> EnrichResult<GroupedValues> {
    let groups = group_rows(table, name, keys)?;
    let values = match aggregation {
        Aggregation::Size => None,
        _ => Some(table.require(name, value_column)?),
    };

    let aggregated = groups
        .into_iter()
        .map(|(key, rows)| {
            let value = match values {
                Some(values) => aggregation.apply(rows.iter().filter_map(|r| values.get(*r))),
                None => Value::Int(rows.len() as i64),
            };
            (key, value)
        })
        .collect();
    Ok(GroupedValues::new(keys, aggregated))
}

/// Write the aggregate of each row's group into `column` of `target`;
/// rows without a group (or with a null key) get `missing`.
pub fn broadcast(
    target: &mut Table,
    name: &str,
    keys: &[&str],
    grouped: &GroupedValues,
    column: &str,
    missing: Value,
) -> EnrichResult<()> {
    if keys.len() != grouped.key_columns.len() {
        return Err(EnrichError::Other(anyhow::anyhow!(
            "broadcast onto '{name}' uses {} key(s), aggregate has {}",
            keys.len(),
            grouped.key_columns.len()
        )));
    }
    let values = row_keys(target, name, keys)?
        .into_iter()
        .map(|key| {
            key.and_then(|k| grouped.get(&k).cloned())
                .unwrap_or_else(|| missing.clone())
        })
        .collect();
    target.set_column(column, values)
}
