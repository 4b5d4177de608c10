//! etl-runner: batch enrichment of raw banking tables.
//!
//! Usage:
//!   etl-runner run --data-dir ./data
//!   etl-runner extract --input-dir ./data --output raw.db
//!   etl-runner transform --input raw.db --output enriched.db --as-of 2024-06-30
//!   etl-runner load --input enriched.db --output-dir ./exports
//!   etl-runner unlock --data-dir ./data

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use enrich_core::{
    clock::ReferenceClock,
    config::PipelineConfig,
    enrich::EnrichSettings,
    event::PipelineEvent,
    extract_step::ExtractStep,
    load_step::LoadStep,
    pipeline::{run_step, ExecutionContext, Pipeline, RunSummary, Workspace},
    step::PipelineStep,
    store::ArtifactStore,
    transform_step::TransformStep,
};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "etl-runner")]
#[command(about = "Enrich raw banking tables: extract, transform, load")]
#[command(version)]
struct Cli {
    /// JSON config file. Defaults to <data-dir>/pipeline.json when present.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Reference date for ages and tenures (YYYY-MM-DD). Defaults to today.
    #[arg(long, global = true, value_parser = parse_date)]
    as_of: Option<NaiveDate>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Read the source CSVs into an artifact database
    Extract {
        #[arg(long)]
        input_dir: PathBuf,
        #[arg(long)]
        output: PathBuf,
    },
    /// Enrich the raw tables of one artifact database into another
    Transform {
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        output: PathBuf,
    },
    /// Export the enriched tables as CSV files
    Load {
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        output_dir: PathBuf,
    },
    /// Run extract, transform and load over a data directory
    Run {
        #[arg(long, default_value = "./data")]
        data_dir: PathBuf,
    },
    /// Remove the lock marker left by a run that was killed
    Unlock {
        #[arg(long, default_value = "./data")]
        data_dir: PathBuf,
    },
}

fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|e| format!("expected YYYY-MM-DD: {e}"))
}

fn load_config(explicit: Option<&Path>, data_dir: Option<&Path>) -> Result<PipelineConfig> {
    match (explicit, data_dir) {
        (Some(path), _) => PipelineConfig::load(path),
        (None, Some(dir)) => PipelineConfig::load_or_default(dir),
        (None, None) => Ok(PipelineConfig::default()),
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    if let Commands::Unlock { data_dir } = &cli.command {
        return unlock(data_dir);
    }

    let data_dir = match &cli.command {
        Commands::Run { data_dir } => Some(data_dir.as_path()),
        Commands::Extract { input_dir, .. } => Some(input_dir.as_path()),
        _ => None,
    };
    let config = load_config(cli.config.as_deref(), data_dir)?;

    // --as-of wins over the config's pinned date.
    let clock = match cli.as_of {
        Some(date) => ReferenceClock::on(date),
        None => ReferenceClock::from_option(config.as_of),
    };
    log::info!(
        "Reference date {} ({})",
        clock.as_of(),
        if clock.is_pinned() { "pinned" } else { "system clock" }
    );

    let delimiter = config.delimiter_byte();
    let summary = match cli.command {
        Commands::Extract { input_dir, output } => {
            let step = ExtractStep::new(input_dir, output.clone(), config.source_files.clone(), delimiter);
            single_step(step, &output, &clock)?
        }
        Commands::Transform { input, output } => {
            let settings = EnrichSettings::from_config(&config, &clock);
            let step = TransformStep::new(input, output.clone(), settings);
            single_step(step, &output, &clock)?
        }
        Commands::Load { input, output_dir } => {
            let step = LoadStep::new(input.clone(), output_dir, config.export_suffix.clone(), delimiter);
            single_step(step, &input, &clock)?
        }
        Commands::Run { data_dir } => {
            let workspace = Workspace::new(&data_dir);
            let context = ExecutionContext::for_workspace(&workspace);
            let mut pipeline = Pipeline::build(workspace, &config, clock)
                .with_context(|| format!("Cannot prepare workspace {}", data_dir.display()))?;
            pipeline.run(&context)?
        }
        Commands::Unlock { .. } => return Ok(()),
    };

    print_summary(&summary);
    Ok(())
}

fn unlock(data_dir: &Path) -> Result<()> {
    let context = ExecutionContext::for_workspace(&Workspace::new(data_dir));
    if context.clear_marker()? {
        println!("Removed {}", context.lock_path().display());
    } else {
        println!("No lock marker at {}", context.lock_path().display());
    }
    Ok(())
}

/// Run one step, journaling into the artifact database it works on.
fn single_step(mut step: impl PipelineStep, journal: &Path, clock: &ReferenceClock) -> Result<RunSummary> {
    let journal = ArtifactStore::open_migrated(journal)
        .with_context(|| format!("Cannot open artifact database {}", journal.display()))?;
    Ok(run_step(&mut step, &journal, clock)?)
}

fn print_summary(summary: &RunSummary) {
    println!("=== etl-runner summary ===");
    println!("Run ID:   {}", summary.run_id);
    for event in &summary.events {
        match event {
            PipelineEvent::TableExtracted { table, rows, columns, encoding } => {
                println!("  extracted  {table:<22} {rows:>8} rows × {columns} cols ({encoding})");
            }
            PipelineEvent::SourceSkipped { file, reason } => {
                println!("  skipped    {file:<22} {reason}");
            }
            PipelineEvent::TableEnriched { table, rows, columns } => {
                println!("  enriched   {table:<22} {rows:>8} rows × {columns} cols");
            }
            PipelineEvent::FileExported { path, rows, overwritten, .. } => {
                let note = if *overwritten { " (overwritten)" } else { "" };
                println!("  exported   {path} {rows} rows{note}");
            }
            PipelineEvent::StaleExportRemoved { path } => {
                println!("  removed    {path}");
            }
            _ => {}
        }
    }
    println!("Elapsed:  {:.2?}", summary.elapsed);
}
