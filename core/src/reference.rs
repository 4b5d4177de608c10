//! Static code→label reference tables and the mapping applier.
//!
//! RULE: the canonical tables are `'static` slices. Accessors hand out
//! read-only `CodeTable` views; there is no way to mutate them.

use crate::{
    error::{EnrichError, EnrichResult},
    table::{Table, Value},
};
use std::collections::{BTreeMap, HashMap, HashSet};

const STATE_NAMES: &[(&str, &str)] = &[
    ("AC", "Acre"),
    ("AL", "Alagoas"),
    ("AP", "Amapá"),
    ("AM", "Amazonas"),
    ("BA", "Bahia"),
    ("CE", "Ceará"),
    ("DF", "Distrito Federal"),
    ("ES", "Espírito Santo"),
    ("GO", "Goiás"),
    ("MA", "Maranhão"),
    ("MT", "Mato Grosso"),
    ("MS", "Mato Grosso do Sul"),
    ("MG", "Minas Gerais"),
    ("PA", "Pará"),
    ("PB", "Paraíba"),
    ("PR", "Paraná"),
    ("PE", "Pernambuco"),
    ("PI", "Piauí"),
    ("RJ", "Rio de Janeiro"),
    ("RN", "Rio Grande do Norte"),
    ("RS", "Rio Grande do Sul"),
    ("RO", "Rondônia"),
    ("RR", "Roraima"),
    ("SC", "Santa Catarina"),
    ("SP", "São Paulo"),
    ("SE", "Sergipe"),
    ("TO", "Tocantins"),
];

const ACCOUNT_TYPES: &[(&str, &str)] = &[("PF", "Pessoa Física"), ("PJ", "Pessoa Jurídica")];

const CLIENT_TYPES: &[(&str, &str)] = &[("PF", "Pessoa Física"), ("PJ", "Pessoa Jurídica")];

/// Anything that resolves a code to a label.
pub trait CodeLookup {
    fn lookup(&self, code: &str) -> Option<&str>;

    /// Whether the mapping is usable. A malformed mapping is replaced by
    /// the identity fallback instead of being applied.
    fn is_well_formed(&self) -> bool;
}

/// Read-only view over one of the static reference tables.
#[derive(Debug, Clone, Copy)]
pub struct CodeTable {
    name: &'static str,
    entries: &'static [(&'static str, &'static str)],
}

impl CodeTable {
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn get(&self, code: &str) -> Option<&'static str> {
        self.entries
            .iter()
            .find(|(k, _)| *k == code)
            .map(|(_, label)| *label)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &'static str)> {
        self.entries.iter().copied()
    }
}

impl CodeLookup for CodeTable {
    fn lookup(&self, code: &str) -> Option<&str> {
        self.get(code)
    }

    fn is_well_formed(&self) -> bool {
        let mut seen = HashSet::new();
        !self.entries.is_empty()
            && self
                .entries
                .iter()
                .all(|(k, v)| !k.is_empty() && !v.is_empty() && seen.insert(*k))
    }
}

impl CodeLookup for HashMap<String, String> {
    fn lookup(&self, code: &str) -> Option<&str> {
        self.get(code).map(String::as_str)
    }

    fn is_well_formed(&self) -> bool {
        !self.is_empty() && self.iter().all(|(k, v)| !k.is_empty() && !v.is_empty())
    }
}

impl CodeLookup for BTreeMap<String, String> {
    fn lookup(&self, code: &str) -> Option<&str> {
        self.get(code).map(String::as_str)
    }

    fn is_well_formed(&self) -> bool {
        !self.is_empty() && self.iter().all(|(k, v)| !k.is_empty() && !v.is_empty())
    }
}

/// UF code → state name.
pub fn state_names() -> CodeTable {
    CodeTable {
        name: "state_names",
        entries: STATE_NAMES,
    }
}

/// Account type code (PF/PJ) → label.
pub fn account_types() -> CodeTable {
    CodeTable {
        name: "account_types",
        entries: ACCOUNT_TYPES,
    }
}

/// Client type code (PF/PJ) → label.
pub fn client_types() -> CodeTable {
    CodeTable {
        name: "client_types",
        entries: CLIENT_TYPES,
    }
}

/// Replace every code in `column` by its label. Unmapped codes and nulls
/// pass through unchanged; an absent column is a no-op.
///
/// Never fails: a malformed mapping, or a cell that cannot act as a code,
/// degrades to the identity fallback with a warning.
pub fn apply_mapping<M>(table: &mut Table, column: &str, mapping: &M)
where
    M: CodeLookup + ?Sized,
{
    let Some(values) = table.column(column) else {
        return;
    };
    let fallback = identity_fallback(values);

    let mapped = if mapping.is_well_formed() {
        map_values(column, values, mapping)
    } else {
        log::warn!("Invalid mapping for column '{column}', using identity fallback");
        map_values(column, values, &fallback)
    };

    let mapped = match mapped {
        Ok(v) => v,
        Err(e) => {
            log::warn!("Mapping column '{column}' failed: {e}; applying fallback");
            match map_values(column, values, &fallback) {
                Ok(v) => v,
                Err(_) => values.to_vec(),
            }
        }
    };

    if let Err(e) = table.set_column(column, mapped) {
        log::warn!("Could not store mapped column '{column}': {e}");
    }
}

/// Copy `source` into a new `target` column placed right after it, then
/// map `target`. Keeps both the code and its label.
pub fn derive_label<M>(table: &mut Table, source: &str, target: &str, mapping: &M) -> EnrichResult<()>
where
    M: CodeLookup + ?Sized,
{
    let Some(idx) = table.position(source) else {
        return Ok(());
    };
    let values = table.columns()[idx].values.clone();
    table.insert_column(idx + 1, target, values)?;
    apply_mapping(table, target, mapping);
    Ok(())
}

fn code_of(value: &Value) -> Option<String> {
    match value {
        Value::Text(s) => Some(s.clone()),
        Value::Int(i) => Some(i.to_string()),
        Value::Float(f) => Some(f.to_string()),
        Value::Null | Value::Timestamp(_) => None,
    }
}

fn identity_fallback(values: &[Value]) -> HashMap<String, String> {
    values
        .iter()
        .filter_map(code_of)
        .map(|code| (code.clone(), code))
        .collect()
}

fn map_values<M>(column: &str, values: &[Value], mapping: &M) -> EnrichResult<Vec<Value>>
where
    M: CodeLookup + ?Sized,
{
    values
        .iter()
        .map(|value| match value {
            Value::Null => Ok(Value::Null),
            Value::Timestamp(_) => Err(EnrichError::UnmappableValue {
                column: column.to_string(),
                value: value.render(),
            }),
            other => {
                let code = code_of(other).unwrap_or_default();
                Ok(match mapping.lookup(&code) {
                    Some(label) if label != code => Value::text(label),
                    _ => other.clone(),
                })
            }
        })
        .collect()
}
