//! Pipeline events — the run journal's vocabulary.
//!
//! RULE: steps report what they did ONLY through events.
//! The pipeline persists every event to the journal in emission order.

use crate::types::{RunId, TableKey};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Every event emitted during a run.
/// Variants may be added; existing ones are never renamed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PipelineEvent {
    // ── Pipeline events ─────────────────────────────
    RunInitialized {
        run_id: RunId,
        as_of: NaiveDateTime,
    },
    StepStarted {
        step: String,
    },
    StepCompleted {
        step: String,
        elapsed_ms: u64,
    },

    // ── Extract events ──────────────────────────────
    TableExtracted {
        table: TableKey,
        rows: usize,
        columns: usize,
        encoding: String,
    },
    SourceSkipped {
        file: String,
        reason: String,
    },

    // ── Transform events ────────────────────────────
    TableEnriched {
        table: TableKey,
        rows: usize,
        columns: usize,
    },

    // ── Artifact and export events ──────────────────
    ArtifactWritten {
        stage: String,
        table: TableKey,
        rows: usize,
        replaced: bool,
    },
    ArtifactRemoved {
        stage: String,
        table: TableKey,
    },
    FileExported {
        table: TableKey,
        path: String,
        rows: usize,
        overwritten: bool,
    },
    StaleExportRemoved {
        path: String,
    },
}

impl PipelineEvent {
    /// Stable name for the `event_type` journal column.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::RunInitialized { .. } => "run_initialized",
            Self::StepStarted { .. } => "step_started",
            Self::StepCompleted { .. } => "step_completed",
            Self::TableExtracted { .. } => "table_extracted",
            Self::SourceSkipped { .. } => "source_skipped",
            Self::TableEnriched { .. } => "table_enriched",
            Self::ArtifactWritten { .. } => "artifact_written",
            Self::ArtifactRemoved { .. } => "artifact_removed",
            Self::FileExported { .. } => "file_exported",
            Self::StaleExportRemoved { .. } => "stale_export_removed",
        }
    }
}

/// The event log entry as persisted to SQLite.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventLogEntry {
    pub id: Option<i64>,
    pub run_id: RunId,
    pub step: String,
    pub event_type: String,
    pub payload: String, // JSON-serialized PipelineEvent
}
