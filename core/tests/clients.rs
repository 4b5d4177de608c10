//! Client enrichment and the transform orchestration.

use chrono::NaiveDate;
use enrich_core::{
    clock::ReferenceClock,
    config::PipelineConfig,
    enrich::{enrich_clients, enrich_tables, EnrichSettings},
    ingest::{extract_sources, Encoding, SourceOutcome},
    table::{Table, Value},
    types::TableSet,
};

fn as_of() -> ReferenceClock {
    ReferenceClock::on(NaiveDate::from_ymd_opt(2024, 6, 30).unwrap())
}

fn clients() -> Table {
    let text = |s: &str| Value::text(s);
    Table::from_rows(
        [
            "cod_cliente",
            "primeiro_nome",
            "ultimo_nome",
            "endereco",
            "tipo_cliente",
            "data_inclusao",
            "data_nascimento",
        ]
        .iter()
        .map(|h| h.to_string())
        .collect(),
        vec![
            vec![
                Value::Int(1),
                text("Ana"),
                text("Silva"),
                text("Av. Paulista, 1000 / SP"),
                text("PF"),
                text("2020-01-01 00:00:00"),
                text("15/06/1990"),
            ],
            vec![
                Value::Int(2),
                text("Bruno"),
                Value::Null,
                text("Rua A 01310-100 RS"),
                text("PJ"),
                text("invalid"),
                text("bad"),
            ],
        ],
    )
    .unwrap()
}

#[test]
fn client_fields_are_derived() {
    let out = enrich_clients(clients(), as_of().as_of()).unwrap();

    assert_eq!(out.column_names()[1], "nome_completo");
    assert_eq!(out.value("nome_completo", 0), Some(&Value::text("Ana Silva")));
    assert_eq!(out.value("uf", 0), Some(&Value::text("SP")));
    assert_eq!(out.value("nome_estado", 0), Some(&Value::text("São Paulo")));
    assert_eq!(out.value("nome_estado", 1), Some(&Value::text("Rio Grande do Sul")));
    assert_eq!(out.value("tipo_cliente", 1), Some(&Value::text("PJ")));
    assert_eq!(out.value("tipo_cliente_descricao", 1), Some(&Value::text("Pessoa Jurídica")));
    assert_eq!(out.value("tempo_como_cliente_meses", 0), Some(&Value::Int(55)));
    assert_eq!(out.value("idade", 0), Some(&Value::Int(34)));
}

/// Unparsable dates and missing name parts produce nulls, not failures.
#[test]
fn bad_rows_become_nulls() {
    let out = enrich_clients(clients(), as_of().as_of()).unwrap();
    assert_eq!(out.value("nome_completo", 1), Some(&Value::Null));
    assert_eq!(out.value("tempo_como_cliente_meses", 1), Some(&Value::Null));
    assert_eq!(out.value("idade", 1), Some(&Value::Null));
}

#[test]
fn client_without_address_is_an_error() {
    let mut t = clients();
    t.drop_columns(&["endereco"]);
    assert!(enrich_clients(t, as_of().as_of()).is_err());
}

/// `clientes.xlsx` is read from its first worksheet and enriches like a CSV.
#[test]
fn client_workbook_is_extracted_and_enriched() {
    let dir = tempfile::tempdir().unwrap();
    let mut workbook = rust_xlsxwriter::Workbook::new();
    let sheet = workbook.add_worksheet();
    let headers = [
        "cod_cliente",
        "primeiro_nome",
        "ultimo_nome",
        "endereco",
        "tipo_cliente",
        "data_inclusao",
        "data_nascimento",
    ];
    for (col, header) in headers.iter().enumerate() {
        sheet.write_string(0, col as u16, *header).unwrap();
    }
    sheet.write_number(1, 0, 1.0).unwrap();
    sheet.write_string(1, 1, "Ana").unwrap();
    sheet.write_string(1, 2, "Silva").unwrap();
    sheet.write_string(1, 3, "Av. Paulista, 1000 / SP").unwrap();
    sheet.write_string(1, 4, "PF").unwrap();
    sheet.write_string(1, 5, "2020-01-01 00:00:00").unwrap();
    sheet.write_string(1, 6, "15/06/1990").unwrap();
    workbook.save(dir.path().join("clientes.xlsx")).unwrap();

    let (tables, outcomes) = extract_sources(dir.path(), &["clientes.xlsx".to_string()], b',');
    assert!(matches!(
        &outcomes[0],
        SourceOutcome::Loaded { key, encoding: Encoding::Workbook, rows: 1, columns: 7 } if key == "clientes"
    ));
    let raw = &tables["clientes"];
    assert_eq!(raw.value("cod_cliente", 0), Some(&Value::Int(1)));

    let out = enrich_clients(raw.clone(), as_of().as_of()).unwrap();
    assert_eq!(out.value("nome_completo", 0), Some(&Value::text("Ana Silva")));
    assert_eq!(out.value("nome_estado", 0), Some(&Value::text("São Paulo")));
    assert_eq!(out.value("idade", 0), Some(&Value::Int(34)));
}

/// A file with the workbook extension that is not a workbook is skipped.
#[test]
fn corrupt_workbook_is_reported_unreadable() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("clientes.xlsx"), "cod_cliente\n1\n").unwrap();
    let (tables, outcomes) = extract_sources(dir.path(), &["clientes.xlsx".to_string()], b',');
    assert!(tables.is_empty());
    assert!(matches!(&outcomes[0], SourceOutcome::Unreadable { file, .. } if file == "clientes.xlsx"));
}

/// Missing tables are skipped; unknown ones pass through.
#[test]
fn orchestration_skips_missing_tables() {
    let settings = EnrichSettings::from_config(&PipelineConfig::default(), &as_of());
    let mut raw = TableSet::new();
    raw.insert("clientes".into(), clients());
    raw.insert(
        "colaborador_agencia".into(),
        Table::from_rows(
            vec!["cod_colaborador".into(), "cod_agencia".into()],
            vec![vec![Value::Int(1), Value::Int(7)]],
        )
        .unwrap(),
    );
    raw.insert(
        "colaboradores".into(),
        Table::from_rows(
            vec!["cod_colaborador".into(), "primeiro_nome".into(), "ultimo_nome".into()],
            vec![vec![Value::Int(1), Value::text("Caio"), Value::text("Reis")]],
        )
        .unwrap(),
    );

    let out = enrich_tables(raw, &settings).unwrap();
    let keys: Vec<&str> = out.keys().map(String::as_str).collect();
    assert_eq!(keys, vec!["clientes", "colaborador_agencia", "colaboradores"]);
    assert_eq!(
        out["colaboradores"].value("nome_completo", 0),
        Some(&Value::text("Caio Reis"))
    );
    assert_eq!(out["colaborador_agencia"].height(), 1);
}

/// A structural error in one table fails the whole transform.
#[test]
fn orchestration_fails_on_structural_error() {
    let settings = EnrichSettings::from_config(&PipelineConfig::default(), &as_of());
    let mut raw = TableSet::new();
    raw.insert(
        "transacoes".into(),
        Table::from_rows(vec!["num_conta".into()], vec![vec![Value::Int(1)]]).unwrap(),
    );
    assert!(enrich_tables(raw, &settings).is_err());
}
