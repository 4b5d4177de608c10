//! Shared primitive types used across the pipeline.

use crate::table::Table;
use std::collections::BTreeMap;

/// Name of a table inside a batch, e.g. `contas`. Equals the source file stem.
pub type TableKey = String;

/// The canonical run identifier.
pub type RunId = String;

/// A keyed set of tables, ordered by key so every step iterates deterministically.
pub type TableSet = BTreeMap<TableKey, Table>;
