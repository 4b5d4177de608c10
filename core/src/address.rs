//! State (UF) extraction from free-text addresses.

use crate::{
    error::EnrichResult,
    table::{Table, Value},
};
use once_cell::sync::Lazy;
use regex::Regex;

/// Tried in this order; the first match wins.
static STATE_PATTERNS: Lazy<[Regex; 3]> = Lazy::new(|| {
    [
        // "... / RS"
        Regex::new(r"/\s*([A-Z]{2})\b").expect("valid slash pattern"),
        // "... RS 90000-000"
        Regex::new(r"\b([A-Z]{2})\s*\d{5}-?\d{3}$").expect("valid postal code pattern"),
        // "... RS"
        Regex::new(r"\b([A-Z]{2})\s*$").expect("valid trailing pattern"),
    ]
});

/// Extract a two-letter state code from an address, or `None`.
pub fn extract_state(address: Option<&str>) -> Option<String> {
    let address = address?;
    STATE_PATTERNS.iter().find_map(|pattern| {
        pattern
            .captures(address)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_uppercase())
    })
}

/// Write the state code extracted from `address_column` into `target`.
/// Non-text addresses yield null. No-op when the address column is absent.
pub fn locate_states(table: &mut Table, address_column: &str, target: &str) -> EnrichResult<()> {
    let Some(addresses) = table.column(address_column) else {
        return Ok(());
    };
    let states = addresses
        .iter()
        .map(|value| extract_state(value.as_str()).map_or(Value::Null, Value::Text))
        .collect();
    table.set_column(target, states)
}
