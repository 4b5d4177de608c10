//! CSV export for the load step.

use crate::{error::EnrichResult, table::Table, types::TableSet};
use csv::WriterBuilder;
use std::path::{Path, PathBuf};

/// `<dir>/<key><suffix>.csv`
pub fn export_path(dir: &Path, key: &str, suffix: &str) -> PathBuf {
    dir.join(format!("{key}{suffix}.csv"))
}

/// Exports in `dir` named `*<suffix>.csv` whose key is not in `tables`.
/// An empty suffix matches every CSV, so nothing is reported then.
pub fn stale_exports(dir: &Path, tables: &TableSet, suffix: &str) -> EnrichResult<Vec<PathBuf>> {
    if suffix.is_empty() {
        log::warn!("Empty export suffix; stale exports in {} are left in place", dir.display());
        return Ok(Vec::new());
    }
    let ending = format!("{suffix}.csv");
    let mut stale = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if let Some(key) = name.strip_suffix(ending.as_str()) {
            if !key.is_empty() && !tables.contains_key(key) {
                stale.push(path);
            }
        }
    }
    stale.sort();
    Ok(stale)
}

/// Write `table` with a header row. Nulls become empty cells.
/// Returns whether an existing file was overwritten.
pub fn write_csv(table: &Table, path: &Path, delimiter: u8) -> EnrichResult<bool> {
    let overwritten = path.exists();
    if overwritten {
        log::info!("Overwriting {}", path.display());
    }

    let mut writer = WriterBuilder::new().delimiter(delimiter).from_path(path)?;
    writer.write_record(table.column_names())?;
    for row in table.rows() {
        writer.write_record(row.iter().map(|v| v.render()))?;
    }
    writer.flush()?;

    log::info!("Exported {} rows to {}", table.height(), path.display());
    Ok(overwritten)
}
