//! SQLite persistence layer.
//!
//! RULE: Only the store talks to the database.
//! Engine components call store methods — they never execute SQL directly.
//! Multi-statement mutations go through `transaction()`, which opens a
//! `BEGIN IMMEDIATE` write transaction (or a savepoint when already inside
//! one) so check-then-act sequences are serialized against other writers.

use crate::{
    error::ProgressionResult,
    event::{EventLogEntry, ProgressionEvent},
    types::{from_epoch, to_epoch, Timestamp},
};
use rusqlite::{params, Connection};

mod achievement;
mod card;
mod release;
mod user;

pub struct ProgressStore {
    conn: Connection,
}

impl ProgressStore {
    pub fn open(path: &str) -> ProgressionResult<Self> {
        let conn = Connection::open_with_flags(
            path,
            rusqlite::OpenFlags::SQLITE_OPEN_READ_WRITE
                | rusqlite::OpenFlags::SQLITE_OPEN_CREATE
                | rusqlite::OpenFlags::SQLITE_OPEN_URI,
        )?;
        // WAL mode only for real files (shared-memory and :memory: ignore it).
        let _ = conn.execute_batch("PRAGMA journal_mode=WAL;");
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        conn.busy_timeout(std::time::Duration::from_secs(5))?;
        Ok(Self { conn })
    }

    /// Open an in-memory database (used in tests).
    pub fn in_memory() -> ProgressionResult<Self> {
        let conn = Connection::open(":memory:")?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn })
    }

    /// Apply all schema migrations in order.
    pub fn migrate(&self) -> ProgressionResult<()> {
        self.conn
            .execute_batch(include_str!("../../../migrations/001_progression.sql"))?;
        Ok(())
    }

    /// Run `f` atomically. Any error rolls back every write made by `f`.
    pub fn transaction<T>(
        &self,
        f: impl FnOnce(&Self) -> ProgressionResult<T>,
    ) -> ProgressionResult<T> {
        let (begin, commit, rollback) = if self.conn.is_autocommit() {
            ("BEGIN IMMEDIATE", "COMMIT", "ROLLBACK")
        } else {
            ("SAVEPOINT nested", "RELEASE nested", "ROLLBACK TO nested; RELEASE nested")
        };

        self.conn.execute_batch(begin)?;
        let outcome = f(self).and_then(|value| {
            self.conn.execute_batch(commit)?;
            Ok(value)
        });
        if outcome.is_err() {
            if let Err(e) = self.conn.execute_batch(rollback) {
                log::error!("store: rollback failed: {e}");
            }
        }
        outcome
    }

    // ── Event log ──────────────────────────────────────────────

    pub fn append_event(&self, event: &ProgressionEvent, at: Timestamp) -> ProgressionResult<()> {
        self.conn.execute(
            "INSERT INTO event_log (subject_id, event_type, payload, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                event.subject_id(),
                event.type_name(),
                serde_json::to_string(event)?,
                to_epoch(at),
            ],
        )?;
        Ok(())
    }

    pub fn events_for_subject(&self, subject_id: &str) -> ProgressionResult<Vec<EventLogEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, subject_id, event_type, payload, created_at
             FROM event_log WHERE subject_id = ?1
             ORDER BY id ASC",
        )?;
        let entries = stmt
            .query_map(params![subject_id], |row| {
                Ok(EventLogEntry {
                    id: Some(row.get(0)?),
                    subject_id: row.get(1)?,
                    event_type: row.get(2)?,
                    payload: row.get(3)?,
                    created_at: from_epoch(row.get(4)?),
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    /// Number of logged events of one type (for tests and summaries).
    pub fn event_count(&self, event_type: &str) -> ProgressionResult<i64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM event_log WHERE event_type = ?1",
            params![event_type],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}

/// Optional epoch column → optional timestamp.
fn opt_ts(secs: Option<i64>) -> Option<Timestamp> {
    secs.map(from_epoch)
}
