//! Code → label mapping: reference tables, fallback, derived labels.

use enrich_core::{
    reference::{
        account_types, apply_mapping, client_types, derive_label, state_names, CodeLookup,
    },
    table::{Table, Value},
};
use std::collections::HashMap;

fn single(name: &str, values: Vec<Value>) -> Table {
    Table::from_rows(vec![name.into()], values.into_iter().map(|v| vec![v]).collect()).unwrap()
}

/// Every closed reference table maps its own codes to non-empty labels.
#[test]
fn reference_tables_are_well_formed() {
    for table in [state_names(), account_types(), client_types()] {
        assert!(table.is_well_formed(), "{} is malformed", table.name());
    }
    assert_eq!(state_names().len(), 27);
    assert_eq!(state_names().get("SP"), Some("São Paulo"));
    assert_eq!(account_types().get("PJ"), Some("Pessoa Jurídica"));
}

/// Known codes become labels; unknown codes and nulls pass through.
#[test]
fn known_codes_map_unknown_pass_through() {
    let mut t = single("uf", vec![Value::text("RJ"), Value::text("XX"), Value::Null]);
    apply_mapping(&mut t, "uf", &state_names());
    assert_eq!(t.column("uf").unwrap(), &[
        Value::text("Rio de Janeiro"),
        Value::text("XX"),
        Value::Null,
    ]);
}

/// A malformed mapping is never applied; the column is left as it was.
#[test]
fn malformed_mapping_falls_back_to_identity() {
    let mut broken: HashMap<String, String> = HashMap::new();
    broken.insert("PF".into(), String::new());
    assert!(!broken.is_well_formed());

    let mut t = single("tipo_conta", vec![Value::text("PF"), Value::Int(7)]);
    apply_mapping(&mut t, "tipo_conta", &broken);
    assert_eq!(t.column("tipo_conta").unwrap(), &[Value::text("PF"), Value::Int(7)]);
}

/// Numeric codes that have no label keep their numeric type.
#[test]
fn unmapped_numeric_codes_keep_their_type() {
    let mut t = single("tipo_cliente", vec![Value::Int(1), Value::text("PF")]);
    apply_mapping(&mut t, "tipo_cliente", &client_types());
    assert_eq!(t.value("tipo_cliente", 0), Some(&Value::Int(1)));
    assert_eq!(t.value("tipo_cliente", 1), Some(&Value::text("Pessoa Física")));
}

/// Cells that cannot act as codes leave the column untouched.
#[test]
fn timestamp_cells_are_not_mapped() {
    let ts = chrono::NaiveDate::from_ymd_opt(2024, 1, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap();
    let mut t = single("uf", vec![Value::Timestamp(ts), Value::text("SP")]);
    apply_mapping(&mut t, "uf", &state_names());
    assert_eq!(t.value("uf", 0), Some(&Value::Timestamp(ts)));
    assert_eq!(t.value("uf", 1), Some(&Value::text("SP")));
}

/// Mapping an absent column is a no-op.
#[test]
fn absent_column_is_a_no_op() {
    let mut t = single("other", vec![Value::text("SP")]);
    apply_mapping(&mut t, "uf", &state_names());
    assert_eq!(t.column_names(), vec!["other"]);
}

/// derive_label keeps the code and places the label right after it.
#[test]
fn derive_label_keeps_code_next_to_label() {
    let mut t = Table::from_rows(
        vec!["cod_agencia".into(), "uf".into(), "cidade".into()],
        vec![vec![Value::Int(1), Value::text("BA"), Value::text("Salvador")]],
    )
    .unwrap();
    derive_label(&mut t, "uf", "nome_estado", &state_names()).unwrap();
    derive_label(&mut t, "uf", "nome_estado", &state_names()).unwrap();

    assert_eq!(t.column_names(), vec!["cod_agencia", "uf", "nome_estado", "cidade"]);
    assert_eq!(t.value("uf", 0), Some(&Value::text("BA")));
    assert_eq!(t.value("nome_estado", 0), Some(&Value::text("Bahia")));
}
