//! SQLite-based run record storage.
//!
//! One row per engine invocation in the `pomodoro_sessions` table. Rows are
//! inserted when a run starts and updated as it progresses and finishes.

use std::path::Path;

use chrono::{DateTime, Local, NaiveDate, SecondsFormat, TimeZone, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, Row};

use super::data_dir;
use super::migrations;
use super::record::{RecordStore, RunRecord};
use crate::error::{CoreError, DatabaseError};

const DB_FILE: &str = "pomodoro.db";

const SELECT_COLUMNS: &str = "SELECT id, started, ended, number_of_sessions, rounds_per_session,
        minutes_per_session, total_completed_sessions, total_completed_rounds, done
     FROM pomodoro_sessions";

/// SQLite database for run records.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open the database at `<data_dir>/pomodoro.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the data directory is unavailable or the database
    /// cannot be opened or migrated.
    pub fn open() -> Result<Self, CoreError> {
        let path = data_dir()?.join(DB_FILE);
        Ok(Self::open_at(&path)?)
    }

    /// Open (or create) a database file at an explicit path.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open_at(path: &Path) -> Result<Self, DatabaseError> {
        let conn = Connection::open(path).map_err(|source| DatabaseError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_connection(conn)
    }

    /// Open an in-memory database (for tests and dry runs).
    ///
    /// # Errors
    /// Returns an error if the schema cannot be created.
    pub fn open_memory() -> Result<Self, DatabaseError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self, DatabaseError> {
        migrations::migrate(&conn).map_err(|e| DatabaseError::MigrationFailed(e.to_string()))?;
        Ok(Self { conn })
    }

    /// Fetch a single record by id.
    pub fn get(&self, id: i64) -> Result<Option<RunRecord>, DatabaseError> {
        let mut stmt = self.conn.prepare(&format!("{SELECT_COLUMNS} WHERE id = ?1"))?;
        let result = stmt.query_row(params![id], row_to_record);
        match result {
            Ok(record) => Ok(Some(record)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn query_records(
        &self,
        sql: &str,
        params: impl rusqlite::Params,
    ) -> Result<Vec<RunRecord>, DatabaseError> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt.query_map(params, row_to_record)?;
        let mut records = Vec::new();
        for row in rows {
            records.push(row?);
        }
        Ok(records)
    }
}

impl RecordStore for Database {
    fn insert(&self, record: &RunRecord) -> Result<i64, DatabaseError> {
        self.conn.execute(
            "INSERT INTO pomodoro_sessions (
                started, ended, number_of_sessions, rounds_per_session, minutes_per_session,
                total_completed_sessions, total_completed_rounds, done
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                format_ts(&record.started),
                record.ended.as_ref().map(format_ts),
                record.number_of_sessions,
                record.rounds_per_session,
                record.minutes_per_session,
                record.total_completed_sessions,
                record.total_completed_rounds,
                record.done,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn update(&self, id: i64, record: &RunRecord) -> Result<(), DatabaseError> {
        let changed = self.conn.execute(
            "UPDATE pomodoro_sessions SET
                started = ?2, ended = ?3, number_of_sessions = ?4, rounds_per_session = ?5,
                minutes_per_session = ?6, total_completed_sessions = ?7,
                total_completed_rounds = ?8, done = ?9
             WHERE id = ?1",
            params![
                id,
                format_ts(&record.started),
                record.ended.as_ref().map(format_ts),
                record.number_of_sessions,
                record.rounds_per_session,
                record.minutes_per_session,
                record.total_completed_sessions,
                record.total_completed_rounds,
                record.done,
            ],
        )?;
        if changed == 0 {
            return Err(DatabaseError::NotFound(id));
        }
        Ok(())
    }

    fn list_all(&self) -> Result<Vec<RunRecord>, DatabaseError> {
        self.query_records(&format!("{SELECT_COLUMNS} ORDER BY started, id"), [])
    }

    fn list_for_date(&self, date: NaiveDate) -> Result<Vec<RunRecord>, DatabaseError> {
        let (from, to) = local_day_bounds(date);
        self.query_records(
            &format!("{SELECT_COLUMNS} WHERE started >= ?1 AND started < ?2 ORDER BY started, id"),
            params![format_ts(&from), format_ts(&to)],
        )
    }
}

/// Fixed-width UTC form, so text order matches time order.
fn format_ts(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

fn parse_ts(idx: usize, raw: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn row_to_record(row: &Row<'_>) -> rusqlite::Result<RunRecord> {
    let started: String = row.get(1)?;
    let ended: Option<String> = row.get(2)?;
    Ok(RunRecord {
        id: Some(row.get(0)?),
        started: parse_ts(1, &started)?,
        ended: ended.as_deref().map(|raw| parse_ts(2, raw)).transpose()?,
        number_of_sessions: row.get(3)?,
        rounds_per_session: row.get(4)?,
        minutes_per_session: row.get(5)?,
        total_completed_sessions: row.get(6)?,
        total_completed_rounds: row.get(7)?,
        done: row.get(8)?,
    })
}

/// UTC instants bounding the local calendar day `date`.
fn local_day_bounds(date: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
    let next = date.succ_opt().unwrap_or(date);
    (local_midnight(date), local_midnight(next))
}

fn local_midnight(date: NaiveDate) -> DateTime<Utc> {
    let midnight = date.and_hms_opt(0, 0, 0).unwrap_or_default();
    // A DST gap can swallow midnight; fall back to reading it as UTC.
    Local
        .from_local_datetime(&midnight)
        .earliest()
        .map(|ts| ts.with_timezone(&Utc))
        .unwrap_or_else(|| Utc.from_utc_datetime(&midnight))
}
