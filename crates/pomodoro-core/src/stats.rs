//! Summaries over stored run records.

use chrono::{Local, NaiveDate};
use serde::Serialize;

use crate::error::DatabaseError;
use crate::storage::{RecordStore, RunRecord};

/// One row of a statistics listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordStats {
    #[serde(flatten)]
    pub record: RunRecord,
    pub minutes_worked: u64,
}

impl From<RunRecord> for RecordStats {
    fn from(record: RunRecord) -> Self {
        let minutes_worked = record.minutes_worked();
        Self {
            record,
            minutes_worked,
        }
    }
}

/// Every run started on one local calendar day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailySummary {
    pub date: NaiveDate,
    pub records: Vec<RecordStats>,
    pub total_minutes_worked: u64,
    pub total_completed_rounds: u64,
    pub finished_runs: usize,
}

impl DailySummary {
    pub fn from_records(date: NaiveDate, records: Vec<RunRecord>) -> Self {
        let records: Vec<RecordStats> = records.into_iter().map(RecordStats::from).collect();
        Self {
            date,
            total_minutes_worked: records.iter().map(|r| r.minutes_worked).sum(),
            total_completed_rounds: records
                .iter()
                .map(|r| u64::from(r.record.total_completed_rounds))
                .sum(),
            finished_runs: records.iter().filter(|r| r.record.done).count(),
            records,
        }
    }
}

/// Summary for `date`.
pub fn daily_summary(
    store: &impl RecordStore,
    date: NaiveDate,
) -> Result<DailySummary, DatabaseError> {
    Ok(DailySummary::from_records(date, store.list_for_date(date)?))
}

/// Summary for today in local time.
pub fn today_summary(store: &impl RecordStore) -> Result<DailySummary, DatabaseError> {
    daily_summary(store, Local::now().date_naive())
}

/// Every stored record with its worked minutes.
pub fn all_records(store: &impl RecordStore) -> Result<Vec<RecordStats>, DatabaseError> {
    Ok(store
        .list_all()?
        .into_iter()
        .map(RecordStats::from)
        .collect())
}
