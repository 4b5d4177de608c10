//! Extract step: source CSVs → `raw` artifacts.

use crate::{
    error::EnrichResult,
    event::PipelineEvent,
    ingest::{extract_sources, SourceOutcome},
    step::{stage_events, PipelineStep},
    store::{ArtifactStore, STAGE_RAW},
};
use std::path::PathBuf;

pub struct ExtractStep {
    input_dir: PathBuf,
    output: PathBuf,
    source_files: Vec<String>,
    delimiter: u8,
}

impl ExtractStep {
    pub fn new(input_dir: PathBuf, output: PathBuf, source_files: Vec<String>, delimiter: u8) -> Self {
        Self {
            input_dir,
            output,
            source_files,
            delimiter,
        }
    }
}

impl PipelineStep for ExtractStep {
    fn name(&self) -> &'static str {
        "extract"
    }

    fn execute(&mut self) -> EnrichResult<Vec<PipelineEvent>> {
        let (tables, outcomes) = extract_sources(&self.input_dir, &self.source_files, self.delimiter);

        let mut events: Vec<PipelineEvent> = outcomes
            .into_iter()
            .map(|outcome| match outcome {
                SourceOutcome::Loaded { key, encoding, rows, columns } => {
                    PipelineEvent::TableExtracted {
                        table: key,
                        rows,
                        columns,
                        encoding: encoding.as_str().to_string(),
                    }
                }
                SourceOutcome::Missing { file } => PipelineEvent::SourceSkipped {
                    file,
                    reason: "missing".into(),
                },
                SourceOutcome::Unreadable { file, reason } => PipelineEvent::SourceSkipped {
                    file,
                    reason: format!("unreadable: {reason}"),
                },
            })
            .collect();

        let store = ArtifactStore::open_migrated(&self.output)?;
        let write = store.save_stage(STAGE_RAW, &tables)?;
        events.extend(stage_events(STAGE_RAW, &tables, write));
        Ok(events)
    }
}
