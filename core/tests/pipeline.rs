//! End-to-end runs over a temporary data directory.

use chrono::NaiveDate;
use enrich_core::{
    clock::ReferenceClock,
    config::PipelineConfig,
    error::EnrichError,
    event::PipelineEvent,
    pipeline::{ExecutionContext, Pipeline, Workspace},
};
use std::{fs, path::Path};
use tempfile::TempDir;

fn clock() -> ReferenceClock {
    ReferenceClock::on(NaiveDate::from_ymd_opt(2024, 6, 30).unwrap())
}

/// Sources for every table except `clientes` and `colaborador_agencia`.
/// `colaboradores.csv` is Latin-1 encoded.
fn seed_sources(dir: &Path) {
    fs::write(dir.join("agencias.csv"), "cod_agencia,nome,uf\n1,Centro,SP\n2,Praia,RJ\n").unwrap();
    fs::write(
        dir.join("contas.csv"),
        "num_conta,cod_agencia,tipo_conta,saldo_disponivel\n10,1,PF,500\n11,1,PJ,0\n",
    )
    .unwrap();
    fs::write(
        dir.join("transacoes.csv"),
        "cod_transacao,num_conta,data_transacao,valor_transacao\n\
         1,10,2024-01-05 10:00:00,100\n\
         2,10,2024-01-20 12:00:00,-2500000\n\
         3,11,2024-02-01 09:00:00,5\n",
    )
    .unwrap();
    fs::write(
        dir.join("propostas_credito.csv"),
        "cod_proposta,cod_cliente,cod_colaborador,status_proposta,valor_proposta\n\
         1,100,7,Aprovada,1000\n\
         2,100,7,Reprovada,3000\n",
    )
    .unwrap();
    let mut latin1 = b"cod_colaborador,primeiro_nome,ultimo_nome\n7,Jo".to_vec();
    latin1.push(0xE3);
    latin1.extend_from_slice(b"o,Souza\n");
    fs::write(dir.join("colaboradores.csv"), latin1).unwrap();
}

fn read_export(path: &Path) -> (Vec<String>, Vec<Vec<String>>) {
    let mut reader = csv::Reader::from_path(path).unwrap();
    let headers = reader.headers().unwrap().iter().map(str::to_string).collect();
    let rows = reader
        .records()
        .map(|r| r.unwrap().iter().map(str::to_string).collect())
        .collect();
    (headers, rows)
}

#[test]
fn full_run_exports_enriched_tables() {
    let _ = env_logger::builder().is_test(true).try_init();
    let dir = TempDir::new().unwrap();
    seed_sources(dir.path());

    let workspace = Workspace::new(dir.path());
    let context = ExecutionContext::for_workspace(&workspace);
    let mut pipeline = Pipeline::build(workspace.clone(), &PipelineConfig::default(), clock()).unwrap();
    assert_eq!(pipeline.step_names(), vec!["extract", "transform", "load"]);

    let summary = pipeline.run(&context).unwrap();

    let skipped: Vec<&str> = summary
        .events
        .iter()
        .filter_map(|e| match e {
            PipelineEvent::SourceSkipped { file, .. } => Some(file.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(skipped, vec!["colaborador_agencia.csv", "clientes.xlsx"]);
    assert!(summary.events.iter().any(|e| matches!(
        e,
        PipelineEvent::TableExtracted { table, encoding, .. }
            if table == "colaboradores" && encoding == "latin-1"
    )));

    let exports = workspace.exports_dir();
    assert!(!exports.join("clientes_tratado.csv").exists());

    let (headers, rows) = read_export(&exports.join("agencias_tratado.csv"));
    assert_eq!(
        headers,
        vec!["cod_agencia", "nome", "uf", "nome_estado", "saldo_medio", "num_contas", "volume_transacoes"]
    );
    // Branch volume sums the raw, unclipped amounts.
    assert_eq!(rows[0], vec!["1", "Centro", "SP", "São Paulo", "250", "2", "-2499895"]);
    assert_eq!(rows[1], vec!["2", "Praia", "RJ", "Rio de Janeiro", "", "0", ""]);

    let (headers, rows) = read_export(&exports.join("transacoes_tratado.csv"));
    let col = |name: &str| headers.iter().position(|h| h == name).unwrap();
    assert_eq!(rows[1][col("valor_transacao")], "-1000000");
    assert_eq!(rows[1][col("valor_vs_saldo")], "2000");
    assert_eq!(rows[0][col("data_transacao")], "2024-01-05 10:00:00");

    let (_, rows) = read_export(&exports.join("colaboradores_tratado.csv"));
    assert_eq!(rows[0], vec!["7", "João Souza"]);

    let completed: Vec<String> = pipeline
        .journal()
        .events_for_run(&summary.run_id)
        .unwrap()
        .into_iter()
        .filter(|e| e.event_type == "step_completed")
        .map(|e| e.step)
        .collect();
    assert_eq!(completed, vec!["extract", "transform", "load"]);
    assert!(!workspace.lock_path().exists(), "lock marker must be cleared");
    assert!(!context.is_active());
}

/// A second run overwrites previous artifacts and exports.
#[test]
fn rerun_overwrites_exports() {
    let dir = TempDir::new().unwrap();
    seed_sources(dir.path());
    let workspace = Workspace::new(dir.path());
    let context = ExecutionContext::for_workspace(&workspace);

    Pipeline::build(workspace.clone(), &PipelineConfig::default(), clock())
        .unwrap()
        .run(&context)
        .unwrap();
    let second = Pipeline::build(workspace, &PipelineConfig::default(), clock())
        .unwrap()
        .run(&context)
        .unwrap();

    let exported: Vec<bool> = second
        .events
        .iter()
        .filter_map(|e| match e {
            PipelineEvent::FileExported { overwritten, .. } => Some(*overwritten),
            _ => None,
        })
        .collect();
    assert_eq!(exported.len(), 5);
    assert!(exported.iter().all(|o| *o), "every export should overwrite");
}

/// A source dropped between runs takes its artifacts and export with it.
#[test]
fn rerun_without_a_source_drops_its_outputs() {
    let dir = TempDir::new().unwrap();
    seed_sources(dir.path());
    let workspace = Workspace::new(dir.path());
    let context = ExecutionContext::for_workspace(&workspace);
    let exports = workspace.exports_dir();

    Pipeline::build(workspace.clone(), &PipelineConfig::default(), clock())
        .unwrap()
        .run(&context)
        .unwrap();
    assert!(exports.join("contas_tratado.csv").exists());

    fs::remove_file(dir.path().join("contas.csv")).unwrap();
    let second = Pipeline::build(workspace.clone(), &PipelineConfig::default(), clock())
        .unwrap()
        .run(&context)
        .unwrap();

    assert!(!second.events.iter().any(|e| matches!(
        e,
        PipelineEvent::TableEnriched { table, .. } if table == "contas"
    )));
    for stage in ["raw", "enriched"] {
        assert!(
            second.events.iter().any(|e| matches!(
                e,
                PipelineEvent::ArtifactRemoved { stage: s, table } if s == stage && table == "contas"
            )),
            "no removal of 'contas' from stage {stage}"
        );
    }
    assert!(second.events.iter().any(|e| matches!(
        e,
        PipelineEvent::StaleExportRemoved { path } if path.ends_with("contas_tratado.csv")
    )));
    assert!(!exports.join("contas_tratado.csv").exists());

    // Branches no longer see any account.
    let (_, rows) = read_export(&exports.join("agencias_tratado.csv"));
    assert_eq!(rows[0], vec!["1", "Centro", "SP", "São Paulo", "", "0", ""]);
}

/// A held context or a leftover marker rejects the run.
#[test]
fn reentrant_run_is_rejected() {
    let dir = TempDir::new().unwrap();
    seed_sources(dir.path());
    let workspace = Workspace::new(dir.path());
    let context = ExecutionContext::for_workspace(&workspace);
    let mut pipeline = Pipeline::build(workspace.clone(), &PipelineConfig::default(), clock()).unwrap();

    {
        let _held = context.enter().unwrap();
        assert!(workspace.lock_path().exists());
        let err = pipeline.run(&context).unwrap_err();
        assert!(matches!(err, EnrichError::Reentrancy { .. }), "got {err}");
    }
    assert!(!workspace.lock_path().exists());

    // Another process holding the workspace.
    fs::write(workspace.lock_path(), "4242\n").unwrap();
    let fresh = ExecutionContext::for_workspace(&workspace);
    assert!(matches!(fresh.enter(), Err(EnrichError::Reentrancy { .. })));
    assert!(!fresh.is_active(), "a rejected enter must not leave the flag set");
    fs::remove_file(workspace.lock_path()).unwrap();

    assert!(pipeline.run(&context).is_ok());
}

/// A marker left by a killed run names itself in the error and can be cleared.
#[test]
fn leftover_marker_can_be_cleared() {
    let dir = TempDir::new().unwrap();
    let workspace = Workspace::new(dir.path());
    let context = ExecutionContext::for_workspace(&workspace);
    fs::write(workspace.lock_path(), "4242\n").unwrap();

    let err = context.enter().unwrap_err();
    let message = err.to_string();
    assert!(message.contains(&workspace.lock_path().display().to_string()), "got {message}");
    assert!(message.contains("etl-runner unlock"), "got {message}");

    assert!(context.clear_marker().unwrap());
    assert!(!context.clear_marker().unwrap(), "second clear finds nothing");
    {
        let _held = context.enter().unwrap();
        assert!(matches!(context.clear_marker(), Err(EnrichError::Reentrancy { .. })));
        assert!(workspace.lock_path().exists(), "a held marker is never removed");
    }
    assert!(!workspace.lock_path().exists());
}

/// A failing step names itself and still releases the marker.
#[test]
fn failed_step_is_named_and_releases_marker() {
    let dir = TempDir::new().unwrap();
    let workspace = Workspace::new(dir.path());
    let context = ExecutionContext::for_workspace(&workspace);
    let mut pipeline = Pipeline::build(workspace.clone(), &PipelineConfig::default(), clock()).unwrap();

    let err = pipeline.run(&context).unwrap_err();
    match &err {
        EnrichError::StepFailed { step, source } => {
            assert_eq!(step, "transform");
            assert!(matches!(**source, EnrichError::ArtifactNotFound { .. }));
        }
        other => panic!("expected StepFailed, got {other}"),
    }
    assert!(!workspace.lock_path().exists());
    assert!(!context.is_active());
    let journaled: Vec<(String, String)> = pipeline
        .journal()
        .events_for_run(&pipeline.run_id)
        .unwrap()
        .into_iter()
        .map(|e| (e.step, e.event_type))
        .collect();
    assert!(journaled.contains(&("transform".into(), "step_started".into())));
    assert!(!journaled.contains(&("transform".into(), "step_completed".into())));
    assert!(!journaled.iter().any(|(step, _)| step == "load"));
}

/// Working directories exist before any step runs.
#[test]
fn build_prepares_working_directories() {
    let dir = TempDir::new().unwrap();
    let workspace = Workspace::new(dir.path().join("nested"));
    Pipeline::build(workspace.clone(), &PipelineConfig::default(), clock()).unwrap();
    for sub in [workspace.raw_dir(), workspace.processed_dir(), workspace.exports_dir()] {
        assert!(sub.is_dir(), "{} missing", sub.display());
    }
}
