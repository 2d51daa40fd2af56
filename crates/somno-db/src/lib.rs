//! Storage layer for the sleep tracker.
//!
//! Provides persistence for sleep records using `rusqlite`.
//!
//! # Thread Safety
//!
//! The [`Database`] type wraps a `rusqlite::Connection`, which is `Send` but
//! not `Sync`. For shared access (e.g. an HTTP server), put the `Database`
//! behind a mutex; serializing writers also keeps the overlap check and the
//! subsequent insert from racing each other.
//!
//! # Schema
//!
//! Interval timestamps are stored as RFC 3339 TEXT with their original
//! offset preserved (e.g. `2024-01-01T23:00:00+09:00`), because statistics
//! group by the sleeper's local calendar. Audit timestamps (`created_at`,
//! `updated_at`) are always UTC. Because stored offsets may vary,
//! lexicographic ordering of the interval columns is not chronological;
//! ordering happens in memory after parsing.

use std::path::Path;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use somno_core::{SleepDraft, SleepRecord};
use thiserror::Error;

/// Database errors.
#[derive(Debug, Error)]
pub enum StoreError {
    /// An error from the underlying database.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    /// No record exists with the given id.
    #[error("sleep record {0} not found")]
    NotFound(i64),
    /// A stored timestamp failed to parse back.
    #[error("invalid stored timestamp for record {id}: {value}")]
    TimestampParse {
        id: i64,
        value: String,
        #[source]
        source: chrono::ParseError,
    },
}

/// Database connection wrapper.
///
/// See the [module documentation](self) for thread safety considerations.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Opens a database at the given path, creating it if necessary.
    ///
    /// The schema is automatically initialized on first open.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Opens an in-memory database.
    ///
    /// Useful for testing. The database is destroyed when the connection closes.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Initializes the database schema.
    ///
    /// Idempotent - safe to call on an already-initialized database.
    fn init(&self) -> Result<(), StoreError> {
        self.conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS sleep_records (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                start_time TEXT NOT NULL,
                end_time TEXT NOT NULL,
                note TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_sleep_records_start ON sleep_records(start_time);
            ",
        )?;
        Ok(())
    }

    /// Inserts a validated interval, assigning the id and audit timestamps.
    pub fn create(&self, draft: &SleepDraft) -> Result<SleepRecord, StoreError> {
        let now = Utc::now();
        let stamp = format_audit_timestamp(now);
        self.conn.execute(
            "
            INSERT INTO sleep_records (start_time, end_time, note, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?)
            ",
            params![
                draft.start_time.to_rfc3339(),
                draft.end_time.to_rfc3339(),
                draft.note,
                stamp,
                stamp,
            ],
        )?;
        let id = self.conn.last_insert_rowid();
        tracing::debug!(id, "sleep record created");
        Ok(SleepRecord {
            id,
            start_time: draft.start_time,
            end_time: draft.end_time,
            note: draft.note.clone(),
            created_at: now,
            updated_at: now,
        })
    }

    /// Lists all records, most recent `start_time` first.
    pub fn list(&self) -> Result<Vec<SleepRecord>, StoreError> {
        let mut stmt = self.conn.prepare(
            "
            SELECT id, start_time, end_time, note, created_at, updated_at
            FROM sleep_records
            ",
        )?;
        let rows = stmt.query_map([], read_row)?;
        let mut records = Vec::new();
        for row in rows {
            records.push(parse_row(row?)?);
        }
        // Stored offsets vary, so order by instant rather than by TEXT.
        records.sort_by(|a, b| b.start_time.cmp(&a.start_time));
        Ok(records)
    }

    /// Fetches a single record by id.
    pub fn get(&self, id: i64) -> Result<SleepRecord, StoreError> {
        let row = self
            .conn
            .query_row(
                "
                SELECT id, start_time, end_time, note, created_at, updated_at
                FROM sleep_records
                WHERE id = ?
                ",
                [id],
                read_row,
            )
            .optional()?
            .ok_or(StoreError::NotFound(id))?;
        parse_row(row)
    }

    /// Replaces a record's interval and note, refreshing `updated_at`.
    pub fn update(&self, id: i64, draft: &SleepDraft) -> Result<SleepRecord, StoreError> {
        let changed = self.conn.execute(
            "
            UPDATE sleep_records
            SET start_time = ?, end_time = ?, note = ?, updated_at = ?
            WHERE id = ?
            ",
            params![
                draft.start_time.to_rfc3339(),
                draft.end_time.to_rfc3339(),
                draft.note,
                format_audit_timestamp(Utc::now()),
                id,
            ],
        )?;
        if changed == 0 {
            return Err(StoreError::NotFound(id));
        }
        tracing::debug!(id, "sleep record updated");
        self.get(id)
    }

    /// Hard-deletes a record by id.
    pub fn delete(&self, id: i64) -> Result<(), StoreError> {
        let changed = self
            .conn
            .execute("DELETE FROM sleep_records WHERE id = ?", [id])?;
        if changed == 0 {
            return Err(StoreError::NotFound(id));
        }
        tracing::debug!(id, "sleep record deleted");
        Ok(())
    }
}

/// A row as stored, before timestamp parsing.
struct RawRow {
    id: i64,
    start_time: String,
    end_time: String,
    note: Option<String>,
    created_at: String,
    updated_at: String,
}

fn read_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawRow> {
    Ok(RawRow {
        id: row.get(0)?,
        start_time: row.get(1)?,
        end_time: row.get(2)?,
        note: row.get(3)?,
        created_at: row.get(4)?,
        updated_at: row.get(5)?,
    })
}

fn parse_row(raw: RawRow) -> Result<SleepRecord, StoreError> {
    let start_time = parse_offset_timestamp(&raw.start_time, raw.id)?;
    let end_time = parse_offset_timestamp(&raw.end_time, raw.id)?;
    let created_at = parse_offset_timestamp(&raw.created_at, raw.id)?.with_timezone(&Utc);
    let updated_at = parse_offset_timestamp(&raw.updated_at, raw.id)?.with_timezone(&Utc);
    Ok(SleepRecord {
        id: raw.id,
        start_time,
        end_time,
        note: raw.note,
        created_at,
        updated_at,
    })
}

fn parse_offset_timestamp(
    value: &str,
    id: i64,
) -> Result<DateTime<chrono::FixedOffset>, StoreError> {
    DateTime::parse_from_rfc3339(value).map_err(|source| StoreError::TimestampParse {
        id,
        value: value.to_string(),
        source,
    })
}

fn format_audit_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)
}
