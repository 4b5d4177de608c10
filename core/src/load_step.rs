//! Load step: `enriched` artifacts → one CSV per table.

use crate::{
    error::EnrichResult,
    event::PipelineEvent,
    export::{export_path, stale_exports, write_csv},
    step::PipelineStep,
    store::{ArtifactStore, STAGE_ENRICHED},
};
use std::path::PathBuf;

pub struct LoadStep {
    input: PathBuf,
    output_dir: PathBuf,
    suffix: String,
    delimiter: u8,
}

impl LoadStep {
    pub fn new(input: PathBuf, output_dir: PathBuf, suffix: String, delimiter: u8) -> Self {
        Self {
            input,
            output_dir,
            suffix,
            delimiter,
        }
    }
}

impl PipelineStep for LoadStep {
    fn name(&self) -> &'static str {
        "load"
    }

    fn execute(&mut self) -> EnrichResult<Vec<PipelineEvent>> {
        let tables = ArtifactStore::open_migrated(&self.input)?.require_tables(STAGE_ENRICHED)?;
        std::fs::create_dir_all(&self.output_dir)?;

        let mut events = Vec::with_capacity(tables.len());
        for (key, table) in &tables {
            let path = export_path(&self.output_dir, key, &self.suffix);
            let overwritten = write_csv(table, &path, self.delimiter)?;
            events.push(PipelineEvent::FileExported {
                table: key.clone(),
                path: path.display().to_string(),
                rows: table.height(),
                overwritten,
            });
        }

        for path in stale_exports(&self.output_dir, &tables, &self.suffix)? {
            std::fs::remove_file(&path)?;
            log::info!("Removed stale export {}", path.display());
            events.push(PipelineEvent::StaleExportRemoved {
                path: path.display().to_string(),
            });
        }
        Ok(events)
    }
}
