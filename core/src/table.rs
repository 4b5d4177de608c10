//! In-memory table model — named columns of typed cells.
//!
//! Every table is homogeneous: all columns share the same height and
//! rows are positional. Tables are serde-serializable so they can be
//! stored as artifacts between pipeline steps.

use crate::error::{EnrichError, EnrichResult};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A single cell.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub enum Value {
    #[default]
    Null,
    Int(i64),
    Float(f64),
    Text(String),
    Timestamp(NaiveDateTime),
}

impl Value {
    pub fn text(s: impl Into<String>) -> Self {
        Self::Text(s.into())
    }

    /// Non-finite floats become null so they never leak into aggregates.
    pub fn float(v: f64) -> Self {
        if v.is_finite() {
            Self::Float(v)
        } else {
            Self::Null
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(i) => Some(*i as f64),
            Self::Float(f) if f.is_finite() => Some(*f),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_timestamp(&self) -> Option<NaiveDateTime> {
        match self {
            Self::Timestamp(ts) => Some(*ts),
            _ => None,
        }
    }

    /// Join/group key for this cell. Null (and NaN) has no key.
    pub fn key(&self) -> Option<Key> {
        match self {
            Self::Null => None,
            Self::Int(i) => Some(Key::Int(*i)),
            Self::Float(f) => {
                if !f.is_finite() {
                    None
                } else if f.fract() == 0.0 && f.abs() < i64::MAX as f64 {
                    Some(Key::Int(*f as i64))
                } else {
                    Some(Key::Float(f.to_bits()))
                }
            }
            Self::Text(s) => Some(Key::Text(s.clone())),
            Self::Timestamp(ts) => Some(Key::Timestamp(*ts)),
        }
    }

    /// Textual form used for CSV export. Null renders as an empty cell.
    pub fn render(&self) -> String {
        match self {
            Self::Null => String::new(),
            Self::Int(i) => i.to_string(),
            Self::Float(f) => f.to_string(),
            Self::Text(s) => s.clone(),
            Self::Timestamp(ts) => ts.format("%Y-%m-%d %H:%M:%S").to_string(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Null, Into::into)
    }
}

/// Hashable, ordered form of a non-null cell.
/// Integral floats collapse onto `Int` so `101` and `101.0` join.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Key {
    Int(i64),
    Float(u64),
    Text(String),
    Timestamp(NaiveDateTime),
}

impl Key {
    pub fn to_value(&self) -> Value {
        match self {
            Self::Int(i) => Value::Int(*i),
            Self::Float(bits) => Value::Float(f64::from_bits(*bits)),
            Self::Text(s) => Value::Text(s.clone()),
            Self::Timestamp(ts) => Value::Timestamp(*ts),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub values: Vec<Value>,
}

impl Column {
    pub fn new(name: impl Into<String>, values: Vec<Value>) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Table {
    columns: Vec<Column>,
}

impl Table {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_columns(columns: Vec<Column>) -> EnrichResult<Self> {
        let mut table = Self::new();
        for column in columns {
            table.set_column(&column.name, column.values)?;
        }
        Ok(table)
    }

    /// Build a table from a header and row-major cells. Ragged rows are an error.
    pub fn from_rows(headers: Vec<String>, rows: Vec<Vec<Value>>) -> EnrichResult<Self> {
        let mut columns: Vec<Column> = headers
            .into_iter()
            .map(|name| Column::new(name, Vec::with_capacity(rows.len())))
            .collect();
        for row in rows {
            if row.len() != columns.len() {
                return Err(EnrichError::ColumnLength {
                    column: "<row>".into(),
                    expected: columns.len(),
                    actual: row.len(),
                });
            }
            for (column, value) in columns.iter_mut().zip(row) {
                column.values.push(value);
            }
        }
        Ok(Self { columns })
    }

    /// A zero-row table with the given columns.
    pub fn empty_with(names: &[&str]) -> Self {
        Self {
            columns: names.iter().map(|n| Column::new(*n, Vec::new())).collect(),
        }
    }

    pub fn height(&self) -> usize {
        self.columns.first().map_or(0, |c| c.values.len())
    }

    pub fn width(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.height() == 0
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    pub fn column(&self, name: &str) -> Option<&[Value]> {
        self.columns
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.values.as_slice())
    }

    /// Column-presence check; `table` only labels the error.
    pub fn require(&self, table: &str, name: &str) -> EnrichResult<&[Value]> {
        self.column(name)
            .ok_or_else(|| EnrichError::missing_column(table, name))
    }

    pub fn value(&self, column: &str, row: usize) -> Option<&Value> {
        self.column(column).and_then(|values| values.get(row))
    }

    fn check_height(&self, name: &str, len: usize) -> EnrichResult<()> {
        if !self.columns.is_empty() && len != self.height() {
            return Err(EnrichError::ColumnLength {
                column: name.to_string(),
                expected: self.height(),
                actual: len,
            });
        }
        Ok(())
    }

    /// Replace an existing column in place, or append a new one.
    pub fn set_column(&mut self, name: &str, values: Vec<Value>) -> EnrichResult<()> {
        if let Some(idx) = self.position(name) {
            if self.columns.len() > 1 {
                self.check_height(name, values.len())?;
            }
            self.columns[idx].values = values;
        } else {
            self.check_height(name, values.len())?;
            self.columns.push(Column::new(name, values));
        }
        Ok(())
    }

    /// Insert at `index` (clamped to the width). A same-named column is removed first.
    pub fn insert_column(
        &mut self,
        index: usize,
        name: &str,
        values: Vec<Value>,
    ) -> EnrichResult<()> {
        let mut index = index;
        if let Some(existing) = self.position(name) {
            self.columns.remove(existing);
            if existing < index {
                index -= 1;
            }
        }
        self.check_height(name, values.len())?;
        let index = index.min(self.columns.len());
        self.columns.insert(index, Column::new(name, values));
        Ok(())
    }

    pub fn drop_columns(&mut self, names: &[&str]) {
        self.columns.retain(|c| !names.contains(&c.name.as_str()));
    }

    pub fn rename_column(&mut self, from: &str, to: &str) -> bool {
        match self.columns.iter_mut().find(|c| c.name == from) {
            Some(column) => {
                column.name = to.to_string();
                true
            }
            None => false,
        }
    }

    /// Projection onto `names`, in that order.
    pub fn select(&self, names: &[&str]) -> EnrichResult<Table> {
        let mut columns = Vec::with_capacity(names.len());
        for name in names {
            let values = self.require("<selection>", name)?;
            columns.push(Column::new(*name, values.to_vec()));
        }
        Ok(Table { columns })
    }

    /// Gather rows by index. `None` produces an all-null row.
    pub fn take_rows(&self, indices: &[Option<usize>]) -> Table {
        let columns = self
            .columns
            .iter()
            .map(|c| {
                let values = indices
                    .iter()
                    .map(|idx| idx.and_then(|i| c.values.get(i).cloned()).unwrap_or_default())
                    .collect();
                Column::new(c.name.clone(), values)
            })
            .collect();
        Table { columns }
    }

    pub fn row(&self, index: usize) -> Vec<&Value> {
        self.columns
            .iter()
            .filter_map(|c| c.values.get(index))
            .collect()
    }

    pub fn rows(&self) -> impl Iterator<Item = Vec<&Value>> + '_ {
        (0..self.height()).map(move |i| self.row(i))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Table {
        Table::from_rows(
            vec!["id".into(), "name".into()],
            vec![
                vec![Value::Int(1), Value::text("a")],
                vec![Value::Int(2), Value::text("b")],
            ],
        )
        .unwrap()
    }

    #[test]
    fn ragged_rows_are_rejected() {
        let result = Table::from_rows(
            vec!["id".into(), "name".into()],
            vec![vec![Value::Int(1)]],
        );
        assert!(matches!(result, Err(EnrichError::ColumnLength { .. })));
    }

    #[test]
    fn set_column_replaces_in_place() {
        let mut t = sample();
        t.set_column("id", vec![Value::Int(10), Value::Int(20)]).unwrap();
        assert_eq!(t.column_names(), vec!["id", "name"]);
        assert_eq!(t.value("id", 1), Some(&Value::Int(20)));
    }

    #[test]
    fn set_column_rejects_wrong_height() {
        let mut t = sample();
        let result = t.set_column("extra", vec![Value::Null]);
        assert!(result.is_err(), "height mismatch must be an error");
    }

    #[test]
    fn take_rows_fills_missing_with_null() {
        let t = sample();
        let taken = t.take_rows(&[Some(1), None, Some(1)]);
        assert_eq!(taken.height(), 3);
        assert_eq!(taken.value("name", 0), Some(&Value::text("b")));
        assert_eq!(taken.value("name", 1), Some(&Value::Null));
    }

    #[test]
    fn integral_float_keys_match_int_keys() {
        assert_eq!(Value::Float(101.0).key(), Value::Int(101).key());
        assert_ne!(Value::Float(101.5).key(), Value::Int(101).key());
        assert_eq!(Value::Null.key(), None);
    }

    #[test]
    fn insert_column_moves_existing_name() {
        let mut t = sample();
        t.insert_column(0, "name", vec![Value::text("x"), Value::text("y")])
            .unwrap();
        assert_eq!(t.column_names(), vec!["name", "id"]);
    }
}
