//! Step trait.
//!
//! RULE: Every stage of the batch implements PipelineStep.
//! The pipeline calls execute() on each step in registration order.
//! Execution order is fixed and documented in pipeline.rs.
//! Steps hand data to each other only through artifact files.

use crate::{error::EnrichResult, event::PipelineEvent, store::StageWrite, types::TableSet};

/// The contract every step must fulfill.
pub trait PipelineStep {
    /// Unique stable name for this step.
    fn name(&self) -> &'static str;

    /// Run the step once. Returns the events describing what it did.
    fn execute(&mut self) -> EnrichResult<Vec<PipelineEvent>>;
}

/// Events describing one stage replacement.
pub(crate) fn stage_events(stage: &str, tables: &TableSet, write: StageWrite) -> Vec<PipelineEvent> {
    let written = write.written.into_iter().map(|(table, replaced)| PipelineEvent::ArtifactWritten {
        stage: stage.to_string(),
        rows: tables.get(&table).map_or(0, |t| t.height()),
        table,
        replaced,
    });
    let removed = write.removed.into_iter().map(|table| PipelineEvent::ArtifactRemoved {
        stage: stage.to_string(),
        table,
    });
    written.chain(removed).collect()
}
