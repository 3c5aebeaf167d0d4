//! The persisted record of one run and the store contract the engine writes to.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::DatabaseError;
use crate::timer::RunConfig;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunRecord {
    /// Row id, assigned on insert.
    #[serde(default)]
    pub id: Option<i64>,
    pub started: DateTime<Utc>,
    /// Absent while the run is in progress.
    pub ended: Option<DateTime<Utc>>,
    pub number_of_sessions: u32,
    pub rounds_per_session: u32,
    /// Focus-round length in minutes.
    pub minutes_per_session: u32,
    pub total_completed_sessions: u32,
    pub total_completed_rounds: u32,
    pub done: bool,
}

impl RunRecord {
    /// A fresh record for a run beginning at `started`.
    pub fn begin(config: &RunConfig, started: DateTime<Utc>) -> Self {
        Self {
            id: None,
            started,
            ended: None,
            number_of_sessions: config.number_of_sessions,
            rounds_per_session: config.rounds_per_session,
            minutes_per_session: config.focus_minutes,
            total_completed_sessions: 0,
            total_completed_rounds: 0,
            done: false,
        }
    }

    /// Focus minutes actually worked during this run.
    pub fn minutes_worked(&self) -> u64 {
        u64::from(self.total_completed_rounds) * u64::from(self.minutes_per_session)
    }

    pub fn is_finished(&self) -> bool {
        self.ended.is_some()
    }
}

/// Create/read interface over the run record table.
pub trait RecordStore {
    /// Persist a new record and return its id.
    fn insert(&self, record: &RunRecord) -> Result<i64, DatabaseError>;

    /// Overwrite the record stored under `id`.
    fn update(&self, id: i64, record: &RunRecord) -> Result<(), DatabaseError>;

    /// Every record, oldest first.
    fn list_all(&self) -> Result<Vec<RunRecord>, DatabaseError>;

    /// Records whose start falls on `date` in local time, oldest first.
    fn list_for_date(&self, date: NaiveDate) -> Result<Vec<RunRecord>, DatabaseError>;
}
