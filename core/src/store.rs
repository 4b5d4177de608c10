//! SQLite persistence layer: run journal and stage artifacts.
//!
//! RULE: Only store.rs talks to the database.
//! Steps call store methods — they never execute SQL directly.

use crate::{
    error::{EnrichError, EnrichResult},
    event::EventLogEntry,
    types::{TableKey, TableSet},
};
use chrono::{Local, NaiveDateTime};
use rusqlite::{params, Connection};
use std::{collections::BTreeSet, path::Path};

/// Artifact stage written by the extract step.
pub const STAGE_RAW: &str = "raw";
/// Artifact stage written by the transform step.
pub const STAGE_ENRICHED: &str = "enriched";

fn now() -> String {
    Local::now().naive_local().format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Outcome of replacing one stage.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StageWrite {
    /// Every key written, with whether the previous run also had it.
    pub written: Vec<(TableKey, bool)>,
    /// Keys of the previous run that no longer exist.
    pub removed: Vec<TableKey>,
}

pub struct ArtifactStore {
    conn: Connection,
    location: String,
}

impl ArtifactStore {
    /// Open (or create) the artifact database at `path`.
    pub fn open(path: &Path) -> EnrichResult<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        // WAL mode: better concurrent read performance.
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        Ok(Self {
            conn,
            location: path.display().to_string(),
        })
    }

    /// Open an in-memory database (used in tests).
    pub fn in_memory() -> EnrichResult<Self> {
        Ok(Self {
            conn: Connection::open_in_memory()?,
            location: ":memory:".into(),
        })
    }

    /// Apply all schema migrations in order.
    pub fn migrate(&self) -> EnrichResult<()> {
        self.conn
            .execute_batch(include_str!("../../migrations/001_artifacts.sql"))?;
        Ok(())
    }

    /// Open and migrate in one go.
    pub fn open_migrated(path: &Path) -> EnrichResult<Self> {
        let store = Self::open(path)?;
        store.migrate()?;
        Ok(store)
    }

    // ── Run ────────────────────────────────────────────────────

    pub fn insert_run(&self, run_id: &str, version: &str, as_of: NaiveDateTime) -> EnrichResult<()> {
        self.conn.execute(
            "INSERT INTO run (run_id, version, as_of, started_at) VALUES (?1, ?2, ?3, ?4)",
            params![run_id, version, as_of.to_string(), now()],
        )?;
        Ok(())
    }

    pub fn finish_run(&self, run_id: &str, status: &str) -> EnrichResult<()> {
        self.conn.execute(
            "UPDATE run SET finished_at = ?2, status = ?3 WHERE run_id = ?1",
            params![run_id, now(), status],
        )?;
        Ok(())
    }

    // ── Event log ──────────────────────────────────────────────

    pub fn append_event(&self, entry: &EventLogEntry) -> EnrichResult<()> {
        self.conn.execute(
            "INSERT INTO event_log (run_id, step, event_type, payload, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![entry.run_id, entry.step, entry.event_type, entry.payload, now()],
        )?;
        Ok(())
    }

    pub fn events_for_run(&self, run_id: &str) -> EnrichResult<Vec<EventLogEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, run_id, step, event_type, payload
             FROM event_log WHERE run_id = ?1
             ORDER BY id ASC",
        )?;
        let entries = stmt
            .query_map(params![run_id], |row| {
                Ok(EventLogEntry {
                    id:         Some(row.get(0)?),
                    run_id:     row.get(1)?,
                    step:       row.get(2)?,
                    event_type: row.get(3)?,
                    payload:    row.get(4)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    // ── Artifacts ──────────────────────────────────────────────

    /// Replace every artifact of `stage` with `tables`, in one transaction.
    /// Keys of the previous run that are not in `tables` are removed.
    pub fn save_stage(&self, stage: &str, tables: &TableSet) -> EnrichResult<StageWrite> {
        let previous = {
            let mut stmt = self
                .conn
                .prepare("SELECT table_key FROM artifact WHERE stage = ?1")?;
            let keys: BTreeSet<TableKey> = stmt
                .query_map(params![stage], |row| row.get(0))?
                .collect::<Result<_, _>>()?;
            keys
        };

        let tx = self.conn.unchecked_transaction()?;
        tx.execute("DELETE FROM artifact WHERE stage = ?1", params![stage])?;
        for (key, table) in tables {
            let payload = serde_json::to_string(table)?;
            tx.execute(
                "INSERT INTO artifact
                     (stage, table_key, payload, row_count, column_count, written_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    stage,
                    key,
                    payload,
                    table.height() as i64,
                    table.width() as i64,
                    now(),
                ],
            )?;
        }
        tx.commit()?;

        let written = tables
            .iter()
            .map(|(key, table)| {
                log::info!(
                    "Saved '{stage}' artifact '{key}' ({} rows × {} columns)",
                    table.height(),
                    table.width()
                );
                (key.clone(), previous.contains(key))
            })
            .collect();
        let removed: Vec<TableKey> = previous
            .into_iter()
            .filter(|key| !tables.contains_key(key))
            .collect();
        for key in &removed {
            log::warn!("Removed stale '{stage}' artifact '{key}' from {}", self.location);
        }
        Ok(StageWrite { written, removed })
    }

    /// All tables of `stage`, keyed by table key. Empty when nothing was stored.
    pub fn load_tables(&self, stage: &str) -> EnrichResult<TableSet> {
        let mut stmt = self.conn.prepare(
            "SELECT table_key, payload FROM artifact WHERE stage = ?1 ORDER BY table_key ASC",
        )?;
        let rows = stmt
            .query_map(params![stage], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut tables = TableSet::new();
        for (key, payload) in rows {
            tables.insert(key, serde_json::from_str(&payload)?);
        }
        Ok(tables)
    }

    /// Like `load_tables`, but an empty stage is an error.
    pub fn require_tables(&self, stage: &str) -> EnrichResult<TableSet> {
        let tables = self.load_tables(stage)?;
        if tables.is_empty() {
            return Err(EnrichError::ArtifactNotFound {
                stage: stage.to_string(),
                path: self.location.clone(),
            });
        }
        Ok(tables)
    }
}
