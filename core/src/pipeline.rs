//! The batch pipeline: extract → transform → load over one workspace.
//!
//! EXECUTION ORDER (fixed, documented, never reordered):
//!   1. Extract    source CSVs        → raw/extracted.db
//!   2. Transform  raw/extracted.db   → processed/enriched.db
//!   3. Load       processed/enriched.db → exports/<key>_tratado.csv
//!
//! RULES:
//!   - Steps execute in registration order, once per run.
//!   - A run holds the ExecutionContext for its whole duration; a second
//!     run against the same context or workspace is rejected.
//!   - Every step event is recorded in the run journal.
//!   - Any step error aborts the run and names the failing step.

use crate::{
    clock::ReferenceClock,
    config::PipelineConfig,
    enrich::EnrichSettings,
    error::{EnrichError, EnrichResult},
    event::{EventLogEntry, PipelineEvent},
    extract_step::ExtractStep,
    load_step::LoadStep,
    step::PipelineStep,
    store::ArtifactStore,
    transform_step::TransformStep,
    types::RunId,
};
use std::{
    fs::OpenOptions,
    io::{ErrorKind, Write},
    path::{Path, PathBuf},
    sync::atomic::{AtomicBool, Ordering},
    time::{Duration, Instant},
};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Marker file present while a run holds the workspace.
pub const LOCK_FILE: &str = ".etl.lock";

// ── Workspace ──────────────────────────────────────────────────

/// Directory layout of one data directory. Source CSVs sit at its root.
#[derive(Debug, Clone)]
pub struct Workspace {
    data_dir: PathBuf,
}

impl Workspace {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn raw_dir(&self) -> PathBuf {
        self.data_dir.join("raw")
    }

    pub fn processed_dir(&self) -> PathBuf {
        self.data_dir.join("processed")
    }

    pub fn exports_dir(&self) -> PathBuf {
        self.data_dir.join("exports")
    }

    pub fn extracted_db(&self) -> PathBuf {
        self.raw_dir().join("extracted.db")
    }

    pub fn enriched_db(&self) -> PathBuf {
        self.processed_dir().join("enriched.db")
    }

    pub fn journal_db(&self) -> PathBuf {
        self.processed_dir().join("journal.db")
    }

    pub fn lock_path(&self) -> PathBuf {
        self.data_dir.join(LOCK_FILE)
    }

    /// Create the working directories.
    pub fn prepare(&self) -> EnrichResult<()> {
        for dir in [self.raw_dir(), self.processed_dir(), self.exports_dir()] {
            std::fs::create_dir_all(&dir)?;
        }
        Ok(())
    }
}

// ── Execution context ──────────────────────────────────────────

/// Reentrancy token. Only one run may hold it at a time, and the lock
/// marker keeps a second process off the same workspace.
#[derive(Debug)]
pub struct ExecutionContext {
    active: AtomicBool,
    lock_path: PathBuf,
}

impl ExecutionContext {
    pub fn new(lock_path: impl Into<PathBuf>) -> Self {
        Self {
            active: AtomicBool::new(false),
            lock_path: lock_path.into(),
        }
    }

    pub fn for_workspace(workspace: &Workspace) -> Self {
        Self::new(workspace.lock_path())
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    pub fn lock_path(&self) -> &Path {
        &self.lock_path
    }

    /// Claim the context. The returned guard releases it on drop.
    pub fn enter(&self) -> EnrichResult<RunGuard<'_>> {
        let reentrant = || EnrichError::Reentrancy {
            marker: self.lock_path.display().to_string(),
        };
        if self
            .active
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(reentrant());
        }

        let marker = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&self.lock_path);
        match marker {
            Ok(mut file) => {
                // The pid is informational only.
                let _ = writeln!(file, "{}", std::process::id());
                Ok(RunGuard { context: self })
            }
            Err(e) => {
                self.active.store(false, Ordering::SeqCst);
                if e.kind() == ErrorKind::AlreadyExists {
                    Err(reentrant())
                } else {
                    Err(e.into())
                }
            }
        }
    }
}

impl ExecutionContext {
    /// Remove a marker left behind by a run that never released it
    /// (killed process, power loss). Refuses while this context is held.
    /// Returns whether a marker was present.
    pub fn clear_marker(&self) -> EnrichResult<bool> {
        if self.is_active() {
            return Err(EnrichError::Reentrancy {
                marker: self.lock_path.display().to_string(),
            });
        }
        match std::fs::remove_file(&self.lock_path) {
            Ok(()) => {
                log::warn!("Removed lock marker {}", self.lock_path.display());
                Ok(true)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

/// Held for the duration of a run; clears the flag and the marker on drop.
#[derive(Debug)]
pub struct RunGuard<'a> {
    context: &'a ExecutionContext,
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.context.lock_path) {
            if e.kind() != ErrorKind::NotFound {
                log::warn!(
                    "Could not remove lock marker {}: {e}",
                    self.context.lock_path.display()
                );
            }
        }
        self.context.active.store(false, Ordering::SeqCst);
    }
}

// ── Running steps ──────────────────────────────────────────────

/// Outcome of a completed run.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub run_id: RunId,
    pub events: Vec<PipelineEvent>,
    pub elapsed: Duration,
}

fn record(
    journal: &ArtifactStore,
    run_id: &str,
    step: &str,
    event: &PipelineEvent,
) -> EnrichResult<()> {
    let entry = EventLogEntry {
        id:         None,
        run_id:     run_id.to_string(),
        step:       step.to_string(),
        event_type: event.type_name().to_string(),
        payload:    serde_json::to_string(event)?,
    };
    journal.append_event(&entry)
}

/// Execute one step, journaling its start, its events and its completion.
/// Any failure is reported as a `StepFailed` naming the step.
pub fn execute_step(
    step: &mut dyn PipelineStep,
    journal: &ArtifactStore,
    run_id: &str,
) -> EnrichResult<Vec<PipelineEvent>> {
    let name = step.name();
    let failed = |e: EnrichError| EnrichError::StepFailed {
        step: name.to_string(),
        source: Box::new(e),
    };

    log::info!("Step '{name}' started");
    let started = Instant::now();
    let start_event = PipelineEvent::StepStarted { step: name.into() };
    record(journal, run_id, name, &start_event)?;

    let mut events = step.execute().map_err(failed)?;
    let elapsed = started.elapsed();
    events.push(PipelineEvent::StepCompleted {
        step: name.into(),
        elapsed_ms: elapsed.as_millis() as u64,
    });
    for event in &events {
        record(journal, run_id, name, event)?;
    }
    events.insert(0, start_event);
    log::info!("Step '{name}' completed in {:.2?}", elapsed);
    Ok(events)
}

/// Run a single step as its own journaled run. Used by the per-step CLI commands.
pub fn run_step(
    step: &mut dyn PipelineStep,
    journal: &ArtifactStore,
    clock: &ReferenceClock,
) -> EnrichResult<RunSummary> {
    let run_id = new_run_id();
    let started = Instant::now();
    journal.insert_run(&run_id, VERSION, clock.as_of())?;

    match execute_step(step, journal, &run_id) {
        Ok(events) => {
            journal.finish_run(&run_id, "completed")?;
            Ok(RunSummary {
                run_id,
                events,
                elapsed: started.elapsed(),
            })
        }
        Err(e) => {
            journal.finish_run(&run_id, "failed")?;
            Err(e)
        }
    }
}

fn new_run_id() -> RunId {
    uuid::Uuid::new_v4().to_string()
}

// ── Pipeline ───────────────────────────────────────────────────

pub struct Pipeline {
    pub run_id: RunId,
    workspace: Workspace,
    clock: ReferenceClock,
    steps: Vec<Box<dyn PipelineStep>>,
    journal: ArtifactStore,
}

impl Pipeline {
    pub fn new(workspace: Workspace, clock: ReferenceClock, journal: ArtifactStore) -> Self {
        Self {
            run_id: new_run_id(),
            workspace,
            clock,
            steps: Vec::new(),
            journal,
        }
    }

    /// Build a fully wired pipeline with all steps registered.
    /// Creates the working directories and the journal.
    pub fn build(
        workspace: Workspace,
        config: &PipelineConfig,
        clock: ReferenceClock,
    ) -> EnrichResult<Self> {
        workspace.prepare()?;
        let journal = ArtifactStore::open_migrated(&workspace.journal_db())?;
        let delimiter = config.delimiter_byte();

        let extract = ExtractStep::new(
            workspace.data_dir().to_path_buf(),
            workspace.extracted_db(),
            config.source_files.clone(),
            delimiter,
        );
        let transform = TransformStep::new(
            workspace.extracted_db(),
            workspace.enriched_db(),
            EnrichSettings::from_config(config, &clock),
        );
        let load = LoadStep::new(
            workspace.enriched_db(),
            workspace.exports_dir(),
            config.export_suffix.clone(),
            delimiter,
        );

        let mut pipeline = Pipeline::new(workspace, clock, journal);
        // EXECUTION ORDER — fixed, documented, never reordered.
        pipeline.register(Box::new(extract));
        pipeline.register(Box::new(transform));
        pipeline.register(Box::new(load));
        Ok(pipeline)
    }

    /// Register a step. Call in the documented execution order.
    pub fn register(&mut self, step: Box<dyn PipelineStep>) {
        self.steps.push(step);
    }

    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    pub fn journal(&self) -> &ArtifactStore {
        &self.journal
    }

    pub fn step_names(&self) -> Vec<&'static str> {
        self.steps.iter().map(|s| s.name()).collect()
    }

    /// Run every registered step once, holding `context` throughout.
    pub fn run(&mut self, context: &ExecutionContext) -> EnrichResult<RunSummary> {
        let _guard = context.enter()?;
        let started = Instant::now();
        log::info!("Run {} started (as of {})", self.run_id, self.clock.as_of());

        self.journal
            .insert_run(&self.run_id, VERSION, self.clock.as_of())?;
        let init = PipelineEvent::RunInitialized {
            run_id: self.run_id.clone(),
            as_of: self.clock.as_of(),
        };
        record(&self.journal, &self.run_id, "pipeline", &init)?;

        let mut events = vec![init];
        for step in &mut self.steps {
            match execute_step(step.as_mut(), &self.journal, &self.run_id) {
                Ok(step_events) => events.extend(step_events),
                Err(e) => {
                    log::error!("Run {} failed: {e}", self.run_id);
                    self.journal.finish_run(&self.run_id, "failed")?;
                    return Err(e);
                }
            }
        }

        self.journal.finish_run(&self.run_id, "completed")?;
        let elapsed = started.elapsed();
        log::info!("Run {} completed in {:.2?}", self.run_id, elapsed);
        Ok(RunSummary {
            run_id: self.run_id.clone(),
            events,
            elapsed,
        })
    }
}
