//! Transform step: `raw` artifacts → `enriched` artifacts.

use crate::{
    enrich::{enrich_tables, EnrichSettings},
    error::EnrichResult,
    event::PipelineEvent,
    step::{stage_events, PipelineStep},
    store::{ArtifactStore, STAGE_ENRICHED, STAGE_RAW},
};
use std::path::PathBuf;

pub struct TransformStep {
    input: PathBuf,
    output: PathBuf,
    settings: EnrichSettings,
}

impl TransformStep {
    pub fn new(input: PathBuf, output: PathBuf, settings: EnrichSettings) -> Self {
        Self {
            input,
            output,
            settings,
        }
    }
}

impl PipelineStep for TransformStep {
    fn name(&self) -> &'static str {
        "transform"
    }

    fn execute(&mut self) -> EnrichResult<Vec<PipelineEvent>> {
        let raw = ArtifactStore::open_migrated(&self.input)?.require_tables(STAGE_RAW)?;
        log::info!("Transforming {} table(s) as of {}", raw.len(), self.settings.as_of);

        let enriched = enrich_tables(raw, &self.settings)?;

        let mut events: Vec<PipelineEvent> = enriched
            .iter()
            .map(|(key, table)| PipelineEvent::TableEnriched {
                table: key.clone(),
                rows: table.height(),
                columns: table.width(),
            })
            .collect();

        let store = ArtifactStore::open_migrated(&self.output)?;
        let write = store.save_stage(STAGE_ENRICHED, &enriched)?;
        events.extend(stage_events(STAGE_ENRICHED, &enriched, write));
        Ok(events)
    }
}
