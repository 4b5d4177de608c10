//! Source ingestion for the extract step: delimited text, plus `.xlsx`
//! workbooks (first worksheet) for sources exported from spreadsheets.
//!
//! RULE: a bad source never aborts the batch. Missing or unreadable files
//! are reported and skipped; only the files that parse become tables.

use crate::{
    error::EnrichResult,
    table::{Column, Table, Value},
    types::{TableKey, TableSet},
};
use calamine::{open_workbook, Data, DataType, Reader, Xlsx};
use csv::ReaderBuilder;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Encoding {
    Utf8,
    Latin1,
    Workbook,
}

impl Encoding {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Utf8 => "utf-8",
            Self::Latin1 => "latin-1",
            Self::Workbook => "workbook",
        }
    }
}

/// What happened to one configured source file.
#[derive(Debug, Clone, PartialEq)]
pub enum SourceOutcome {
    Loaded {
        key: TableKey,
        encoding: Encoding,
        rows: usize,
        columns: usize,
    },
    Missing {
        file: String,
    },
    Unreadable {
        file: String,
        reason: String,
    },
}

/// Table key for a source file: its stem, e.g. `contas.csv` → `contas`.
pub fn table_key(file: &str) -> TableKey {
    Path::new(file)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| file.to_string())
}

/// Decode as UTF-8, falling back to Latin-1 (every byte is a code point).
pub fn decode(bytes: &[u8]) -> (String, Encoding) {
    match std::str::from_utf8(bytes) {
        Ok(s) => (s.trim_start_matches('\u{feff}').to_string(), Encoding::Utf8),
        Err(_) => (bytes.iter().map(|b| *b as char).collect(), Encoding::Latin1),
    }
}

/// Parse delimited text with a header row into a typed table.
pub fn parse_csv(content: &str, delimiter: u8) -> EnrichResult<Table> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .delimiter(delimiter)
        .from_reader(content.as_bytes());

    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();
    let mut cells: Vec<Vec<Option<String>>> = vec![Vec::new(); headers.len()];
    for record in reader.records() {
        let record = record?;
        for (i, column) in cells.iter_mut().enumerate() {
            let cell = record.get(i).map(str::trim).filter(|c| !c.is_empty());
            column.push(cell.map(str::to_string));
        }
    }

    let columns = headers
        .into_iter()
        .zip(cells)
        .map(|(name, raw)| Column::new(name, infer_column(raw)))
        .collect();
    Table::from_columns(columns)
}

/// Int when every present cell is an integer, Float when every present
/// cell is numeric, Text otherwise. Absent cells are null.
pub fn infer_column(raw: Vec<Option<String>>) -> Vec<Value> {
    let present = || raw.iter().flatten();
    if present().all(|c| c.parse::<i64>().is_ok()) {
        return raw
            .iter()
            .map(|c| c.as_deref().and_then(|c| c.parse().ok()).map_or(Value::Null, Value::Int))
            .collect();
    }
    let is_number = |c: &String| c.parse::<f64>().map(f64::is_finite).unwrap_or(false);
    if present().all(is_number) {
        return raw
            .iter()
            .map(|c| {
                c.as_deref()
                    .and_then(|c| c.parse::<f64>().ok())
                    .map_or(Value::Null, Value::float)
            })
            .collect();
    }
    raw.into_iter().map(|c| c.map_or(Value::Null, Value::Text)).collect()
}

pub fn read_csv_table(path: &Path, delimiter: u8) -> EnrichResult<(Table, Encoding)> {
    let bytes = std::fs::read(path)?;
    let (content, encoding) = decode(&bytes);
    if encoding == Encoding::Latin1 {
        log::warn!("{} is not valid UTF-8; read as Latin-1", path.display());
    }
    Ok((parse_csv(&content, delimiter)?, encoding))
}

fn is_workbook(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("xlsx"))
}

/// One workbook cell. Blank text and error cells are null.
fn workbook_cell(cell: &Data) -> Value {
    match cell {
        Data::Empty | Data::Error(_) => Value::Null,
        Data::Int(i) => Value::Int(*i),
        Data::Float(f) => Value::float(*f),
        Data::Bool(b) => Value::text(b.to_string()),
        Data::String(s) => match s.trim() {
            "" => Value::Null,
            trimmed => Value::text(trimmed),
        },
        other => other
            .as_datetime()
            .map_or_else(|| Value::text(other.to_string()), Value::Timestamp),
    }
}

/// Numeric columns whose values are all integral become Int, matching
/// what the CSV reader infers for the same data.
fn narrow_integral(values: Vec<Value>) -> Vec<Value> {
    let integral = values.iter().all(|v| match v {
        Value::Null | Value::Int(_) => true,
        Value::Float(f) => f.fract() == 0.0 && f.abs() < i64::MAX as f64,
        _ => false,
    });
    if !integral {
        return values;
    }
    values
        .into_iter()
        .map(|v| match v {
            Value::Float(f) => Value::Int(f as i64),
            other => other,
        })
        .collect()
}

/// First worksheet of an `.xlsx` workbook; its first row is the header.
pub fn read_xlsx_table(path: &Path) -> EnrichResult<Table> {
    let mut workbook: Xlsx<_> = open_workbook(path)?;
    let range = match workbook.worksheet_range_at(0) {
        Some(range) => range?,
        None => return Ok(Table::new()),
    };

    let mut rows = range.rows();
    let headers: Vec<String> = match rows.next() {
        Some(header) => header.iter().map(|h| h.to_string().trim().to_string()).collect(),
        None => return Ok(Table::new()),
    };
    let mut cells: Vec<Vec<Value>> = vec![Vec::new(); headers.len()];
    for row in rows {
        for (i, column) in cells.iter_mut().enumerate() {
            column.push(row.get(i).map_or(Value::Null, workbook_cell));
        }
    }

    let columns = headers
        .into_iter()
        .zip(cells)
        .map(|(name, values)| Column::new(name, narrow_integral(values)))
        .collect();
    Table::from_columns(columns)
}

fn read_source(path: &Path, delimiter: u8) -> EnrichResult<(Table, Encoding)> {
    if is_workbook(path) {
        Ok((read_xlsx_table(path)?, Encoding::Workbook))
    } else {
        read_csv_table(path, delimiter)
    }
}

/// Read every configured source from `dir`.
pub fn extract_sources(dir: &Path, files: &[String], delimiter: u8) -> (TableSet, Vec<SourceOutcome>) {
    let mut tables = TableSet::new();
    let mut outcomes = Vec::with_capacity(files.len());

    for file in files {
        let path = dir.join(file);
        if !path.exists() {
            log::warn!("Source file not found, skipping: {}", path.display());
            outcomes.push(SourceOutcome::Missing { file: file.clone() });
            continue;
        }
        match read_source(&path, delimiter) {
            Ok((table, encoding)) => {
                let key = table_key(file);
                log::info!("{key}: {} rows × {} columns", table.height(), table.width());
                outcomes.push(SourceOutcome::Loaded {
                    key: key.clone(),
                    encoding,
                    rows: table.height(),
                    columns: table.width(),
                });
                tables.insert(key, table);
            }
            Err(e) => {
                log::warn!("Unreadable source {}, skipping: {e}", path.display());
                outcomes.push(SourceOutcome::Unreadable {
                    file: file.clone(),
                    reason: e.to_string(),
                });
            }
        }
    }

    log::info!("Extracted {} of {} source table(s)", tables.len(), files.len());
    (tables, outcomes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn columns_are_typed_by_content() {
        let table = parse_csv("id,saldo,nome\n1,10.5,Ana\n2,,Bia\n", b',').unwrap();
        assert_eq!(table.value("id", 1), Some(&Value::Int(2)));
        assert_eq!(table.value("saldo", 0), Some(&Value::Float(10.5)));
        assert_eq!(table.value("saldo", 1), Some(&Value::Null));
        assert_eq!(table.value("nome", 0), Some(&Value::text("Ana")));
    }

    #[test]
    fn mixed_column_stays_text() {
        let column = infer_column(vec![Some("1".into()), Some("x".into()), None]);
        assert_eq!(column, vec![Value::text("1"), Value::text("x"), Value::Null]);
    }

    #[test]
    fn latin1_bytes_are_decoded() {
        let (text, encoding) = decode(&[b'S', 0xE3, b'o']);
        assert_eq!(encoding, Encoding::Latin1);
        assert_eq!(text, "São");
    }

    #[test]
    fn key_is_file_stem() {
        assert_eq!(table_key("propostas_credito.csv"), "propostas_credito");
        assert_eq!(table_key("clientes.xlsx"), "clientes");
    }

    #[test]
    fn integral_workbook_numbers_become_ints() {
        let narrowed = narrow_integral(vec![Value::Float(1.0), Value::Null, Value::Float(3.0)]);
        assert_eq!(narrowed, vec![Value::Int(1), Value::Null, Value::Int(3)]);
        let kept = narrow_integral(vec![Value::Float(1.0), Value::Float(2.5)]);
        assert_eq!(kept, vec![Value::Float(1.0), Value::Float(2.5)]);
    }

    #[test]
    fn workbook_cells_map_to_values() {
        assert_eq!(workbook_cell(&Data::String("  Ana ".into())), Value::text("Ana"));
        assert_eq!(workbook_cell(&Data::String("   ".into())), Value::Null);
        assert_eq!(workbook_cell(&Data::Empty), Value::Null);
        assert_eq!(workbook_cell(&Data::Int(7)), Value::Int(7));
    }
}
