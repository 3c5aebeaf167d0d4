//! Run coordinator.
//!
//! Sequences sessions, owns the run record and writes it to the record store
//! when the run starts, after each completed session and when it ends.
//!
//! ## State Transitions
//!
//! ```text
//! Idle -> Running -> (Finished | Aborted)
//! ```
//!
//! ## Usage
//!
//! ```ignore
//! let mut engine = PomodoroEngine::new(Database::open()?);
//! let cancel = engine.cancellation_token();
//! tokio::spawn(async move { tokio::signal::ctrl_c().await.ok(); cancel.cancel(); });
//! let record = engine.start(&config).await?;
//! ```

use std::time::Duration;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use super::clock::Clock;
use super::run_config::RunConfig;
use super::session::{run_session, SessionPlan};
use crate::error::{CoreError, DatabaseError};
use crate::events::{Event, EventSink};
use crate::storage::{RecordStore, RunRecord};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineState {
    Idle,
    Running,
    /// Every session completed.
    Finished,
    /// Cancelled or stopped by a store failure.
    Aborted,
}

/// The pomodoro engine.
///
/// `start` takes `&mut self`, so one engine drives at most one run at a time.
pub struct PomodoroEngine<S> {
    store: S,
    clock: Clock,
    state: EngineState,
}

impl<S: RecordStore> PomodoroEngine<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            clock: Clock::new(CancellationToken::new()),
            state: EngineState::Idle,
        }
    }

    pub fn with_events(mut self, events: EventSink) -> Self {
        self.clock = self.clock.with_events(events);
        self
    }

    pub fn with_minute(mut self, minute: Duration) -> Self {
        self.clock = self.clock.with_minute(minute);
        self
    }

    pub fn with_tick(mut self, tick: Duration) -> Self {
        self.clock = self.clock.with_tick(tick);
        self
    }

    /// Use an externally owned cancellation token.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.clock = self.clock.with_cancellation(cancel);
        self
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn state(&self) -> EngineState {
        self.state
    }

    /// Handle that cancels the current (or next) run when fired.
    ///
    /// A fired token is used up by the run it stops; the engine arms a fresh
    /// one for the following run, so fetch a new handle per run.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.clock.cancellation_token().clone()
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Run every session of `config` and return the finalized record.
    ///
    /// # Errors
    ///
    /// - `CoreError::Validation` if a count or duration is zero. Nothing is
    ///   persisted and no timer starts.
    /// - `CoreError::Database` if the store rejects the insert or any update.
    ///   The run stops at that point.
    pub async fn start(&mut self, config: &RunConfig) -> Result<RunRecord, CoreError> {
        config.validate()?;

        let mut record = RunRecord::begin(config, Utc::now());
        let id = self.persist(|store| store.insert(&record))?;
        record.id = Some(id);
        self.state = EngineState::Running;

        info!(
            record_id = id,
            sessions = config.number_of_sessions,
            rounds = config.rounds_per_session,
            focus_minutes = config.focus_minutes,
            "run started"
        );
        self.clock.events().emit(Event::RunStarted {
            record_id: id,
            number_of_sessions: config.number_of_sessions,
            rounds_per_session: config.rounds_per_session,
            at: record.started,
        });

        let mut cancelled = false;
        for session in 1..=config.number_of_sessions {
            let plan = SessionPlan {
                session,
                rounds: config.rounds_per_session,
                focus_minutes: config.focus_minutes,
                short_break_minutes: config.short_break_minutes,
                long_break_minutes: config.long_break_minutes,
                break_cancel_policy: config.break_cancel_policy,
            };
            let outcome = run_session(&self.clock, &plan).await;

            record.total_completed_rounds += outcome.completed_rounds;
            if outcome.completed {
                record.total_completed_sessions += 1;
            }
            if outcome.aborted || !outcome.completed {
                info!(record_id = id, session, "run cancelled");
                cancelled = true;
                break;
            }
            if session < config.number_of_sessions {
                self.persist(|store| store.update(id, &record))?;
            }
        }

        if self.clock.cancellation_token().is_cancelled() {
            self.clock = self.clock.clone().with_cancellation(CancellationToken::new());
        }

        record.ended = Some(Utc::now().max(record.started));
        record.done =
            !cancelled && record.total_completed_sessions == config.number_of_sessions;
        self.persist(|store| store.update(id, &record))?;
        self.state = if record.done {
            EngineState::Finished
        } else {
            EngineState::Aborted
        };

        info!(
            record_id = id,
            completed_sessions = record.total_completed_sessions,
            completed_rounds = record.total_completed_rounds,
            done = record.done,
            "run finished"
        );
        self.clock.events().emit(Event::RunFinished {
            record_id: id,
            total_completed_sessions: record.total_completed_sessions,
            total_completed_rounds: record.total_completed_rounds,
            done: record.done,
            at: Utc::now(),
        });

        Ok(record)
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn persist<T>(
        &mut self,
        op: impl FnOnce(&S) -> Result<T, DatabaseError>,
    ) -> Result<T, CoreError> {
        op(&self.store).map_err(|e| {
            error!(error = %e, "failed to persist run record");
            if self.state == EngineState::Running {
                self.state = EngineState::Aborted;
            }
            CoreError::Database(e)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ValidationError;
    use crate::storage::Database;
    use crate::timer::{BreakCancelPolicy, Phase};
    use chrono::NaiveDate;
    use std::cell::{Cell, RefCell};
    use tokio::sync::mpsc;

    /// Store that records every call and can be told to fail.
    #[derive(Default)]
    struct ScriptedStore {
        inserts: RefCell<Vec<RunRecord>>,
        updates: RefCell<Vec<RunRecord>>,
        fail_insert: bool,
        fail_update_after: Option<usize>,
        update_calls: Cell<usize>,
    }

    impl RecordStore for ScriptedStore {
        fn insert(&self, record: &RunRecord) -> Result<i64, DatabaseError> {
            if self.fail_insert {
                return Err(DatabaseError::Locked);
            }
            self.inserts.borrow_mut().push(record.clone());
            Ok(7)
        }

        fn update(&self, _id: i64, record: &RunRecord) -> Result<(), DatabaseError> {
            let n = self.update_calls.get();
            self.update_calls.set(n + 1);
            if self.fail_update_after.is_some_and(|limit| n >= limit) {
                return Err(DatabaseError::QueryFailed("disk full".into()));
            }
            self.updates.borrow_mut().push(record.clone());
            Ok(())
        }

        fn list_all(&self) -> Result<Vec<RunRecord>, DatabaseError> {
            Ok(self.updates.borrow().clone())
        }

        fn list_for_date(&self, _date: NaiveDate) -> Result<Vec<RunRecord>, DatabaseError> {
            Ok(Vec::new())
        }
    }

    fn cancel_after(engine: &PomodoroEngine<impl RecordStore>, after: Duration) {
        let token = engine.cancellation_token();
        tokio::spawn(async move {
            tokio::time::sleep(after).await;
            token.cancel();
        });
    }

    const MINUTE_MS: u64 = 60_000;

    #[tokio::test(start_paused = true)]
    async fn full_run_is_done() {
        let mut engine = PomodoroEngine::new(Database::open_memory().unwrap());
        assert_eq!(engine.state(), EngineState::Idle);

        let record = engine.start(&RunConfig::new(2, 2, 25, 5, 10)).await.unwrap();
        assert_eq!(record.total_completed_sessions, 2);
        assert_eq!(record.total_completed_rounds, 4);
        assert!(record.done);
        assert!(record.ended.unwrap() >= record.started);
        assert_eq!(engine.state(), EngineState::Finished);

        let stored = engine.store().list_all().unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0], record);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_in_first_focus_persists_empty_record() {
        let mut engine = PomodoroEngine::new(Database::open_memory().unwrap());
        cancel_after(&engine, Duration::from_millis(3 * MINUTE_MS + 500));

        let record = engine.start(&RunConfig::new(2, 2, 25, 5, 10)).await.unwrap();
        assert_eq!(record.total_completed_rounds, 0);
        assert_eq!(record.total_completed_sessions, 0);
        assert!(!record.done);
        assert!(record.ended.is_some());
        assert_eq!(engine.state(), EngineState::Aborted);

        let stored = engine.store().list_all().unwrap();
        assert_eq!(stored, vec![record]);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_in_break_of_last_round_keeps_credit() {
        let mut engine = PomodoroEngine::new(Database::open_memory().unwrap());
        // Session 1: round 1 0..30, round 2 focus 30..55, long break 55..65.
        cancel_after(&engine, Duration::from_millis(58 * MINUTE_MS + 500));

        let record = engine.start(&RunConfig::new(2, 2, 25, 5, 10)).await.unwrap();
        assert_eq!(record.total_completed_rounds, 2);
        assert_eq!(record.total_completed_sessions, 1);
        assert!(!record.done);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_in_final_long_break_is_not_done() {
        let mut engine = PomodoroEngine::new(Database::open_memory().unwrap());
        // Focus 0..25, long break 25..35.
        cancel_after(&engine, Duration::from_millis(30 * MINUTE_MS + 500));

        let record = engine.start(&RunConfig::new(1, 1, 25, 5, 10)).await.unwrap();
        assert_eq!(record.total_completed_rounds, 1);
        assert_eq!(record.total_completed_sessions, 1);
        assert!(!record.done);
        assert_eq!(engine.state(), EngineState::Aborted);
        assert_eq!(engine.store().list_all().unwrap(), vec![record]);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_in_break_with_discard_policy_drops_round() {
        let mut engine = PomodoroEngine::new(Database::open_memory().unwrap());
        cancel_after(&engine, Duration::from_millis(58 * MINUTE_MS + 500));

        let config = RunConfig::new(2, 2, 25, 5, 10)
            .with_break_cancel_policy(BreakCancelPolicy::DiscardRound);
        let record = engine.start(&config).await.unwrap();
        assert_eq!(record.total_completed_rounds, 1);
        assert_eq!(record.total_completed_sessions, 0);
        assert!(!record.done);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_in_round_k_of_session_s() {
        // 3 rounds of 10 focus + 2 short / 4 long: a session lasts 38 minutes.
        // Session 2 round 2 focus runs 50..60; cancel at 55.
        let mut engine = PomodoroEngine::new(Database::open_memory().unwrap());
        cancel_after(&engine, Duration::from_millis(55 * MINUTE_MS + 500));

        let record = engine.start(&RunConfig::new(3, 3, 10, 2, 4)).await.unwrap();
        assert_eq!(record.total_completed_rounds, 3 + 1);
        assert_eq!(record.total_completed_sessions, 1);
        assert!(!record.done);
    }

    #[tokio::test(start_paused = true)]
    async fn invalid_config_creates_no_record() {
        let mut engine = PomodoroEngine::new(Database::open_memory().unwrap());
        let err = engine.start(&RunConfig::new(2, 0, 25, 5, 10)).await.unwrap_err();
        assert!(matches!(
            err,
            CoreError::Validation(ValidationError::NotPositive { field: "rounds_per_session" })
        ));
        assert!(engine.store().list_all().unwrap().is_empty());
        assert_eq!(engine.state(), EngineState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn insert_failure_is_fatal_before_any_timer() {
        let store = ScriptedStore {
            fail_insert: true,
            ..Default::default()
        };
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut engine = PomodoroEngine::new(store).with_events(EventSink::new(tx));
        let begin = tokio::time::Instant::now();

        let err = engine.start(&RunConfig::new(1, 1, 25, 5, 10)).await.unwrap_err();
        assert!(matches!(err, CoreError::Database(DatabaseError::Locked)));
        assert_eq!(begin.elapsed(), Duration::ZERO);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn checkpoint_failure_stops_the_run() {
        let store = ScriptedStore {
            fail_update_after: Some(0),
            ..Default::default()
        };
        let mut engine = PomodoroEngine::new(store);
        let begin = tokio::time::Instant::now();

        let err = engine.start(&RunConfig::new(3, 1, 25, 5, 10)).await.unwrap_err();
        assert!(matches!(err, CoreError::Database(DatabaseError::QueryFailed(_))));
        // Stopped after the first session's checkpoint instead of timing the rest.
        assert_eq!(begin.elapsed(), Duration::from_secs(35 * 60));
        assert_eq!(engine.state(), EngineState::Aborted);
    }

    #[tokio::test(start_paused = true)]
    async fn final_update_failure_is_returned() {
        let store = ScriptedStore {
            fail_update_after: Some(0),
            ..Default::default()
        };
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut engine = PomodoroEngine::new(store).with_events(EventSink::new(tx));

        let err = engine.start(&RunConfig::new(1, 1, 25, 5, 10)).await.unwrap_err();
        assert!(matches!(err, CoreError::Database(DatabaseError::QueryFailed(_))));
        assert_eq!(engine.state(), EngineState::Aborted);

        let store = engine.into_store();
        assert_eq!(store.update_calls.get(), 1);
        assert!(store.updates.borrow().is_empty());
        while let Ok(event) = rx.try_recv() {
            assert!(!matches!(event, Event::RunFinished { .. }));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn persists_insert_checkpoints_and_final_update() {
        let mut engine = PomodoroEngine::new(ScriptedStore::default());
        let record = engine.start(&RunConfig::new(3, 1, 1, 1, 1)).await.unwrap();

        let store = engine.into_store();
        let inserts = store.inserts.borrow();
        assert_eq!(inserts.len(), 1);
        assert_eq!(inserts[0].ended, None);
        assert_eq!(inserts[0].total_completed_rounds, 0);

        let updates = store.updates.borrow();
        let progress: Vec<_> = updates
            .iter()
            .map(|r| (r.total_completed_sessions, r.ended.is_some()))
            .collect();
        assert_eq!(progress, vec![(1, false), (2, false), (3, true)]);
        assert_eq!(updates.last().unwrap(), &record);
        assert_eq!(record.id, Some(7));
    }

    #[tokio::test(start_paused = true)]
    async fn events_bracket_the_run() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut engine =
            PomodoroEngine::new(Database::open_memory().unwrap()).with_events(EventSink::new(tx));
        engine.start(&RunConfig::new(1, 2, 1, 1, 2)).await.unwrap();

        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            if !matches!(event, Event::Tick { .. }) {
                events.push(event);
            }
        }
        assert!(matches!(events.first(), Some(Event::RunStarted { rounds_per_session: 2, .. })));
        assert!(matches!(events.last(), Some(Event::RunFinished { done: true, total_completed_rounds: 2, .. })));
        let long_breaks = events
            .iter()
            .filter(|e| matches!(e, Event::PhaseStarted { phase: Phase::LongBreak, .. }))
            .count();
        assert_eq!(long_breaks, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn accelerated_minute_shortens_run() {
        let mut engine = PomodoroEngine::new(Database::open_memory().unwrap())
            .with_minute(Duration::from_secs(1));
        let begin = tokio::time::Instant::now();
        let record = engine.start(&RunConfig::new(1, 2, 25, 5, 10)).await.unwrap();
        assert!(record.done);
        assert_eq!(begin.elapsed(), Duration::from_secs(25 + 5 + 25 + 10));
    }

    #[tokio::test(start_paused = true)]
    async fn external_token_cancels_run() {
        let token = CancellationToken::new();
        let mut engine =
            PomodoroEngine::new(Database::open_memory().unwrap()).with_cancellation(token.clone());
        token.cancel();
        let record = engine.start(&RunConfig::new(1, 1, 25, 5, 10)).await.unwrap();
        assert!(!record.done);
        assert_eq!(record.total_completed_rounds, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn run_after_cancelled_run_completes() {
        let mut engine = PomodoroEngine::new(Database::open_memory().unwrap());
        cancel_after(&engine, Duration::from_millis(2 * MINUTE_MS + 500));
        let first = engine.start(&RunConfig::new(1, 1, 25, 5, 10)).await.unwrap();
        assert!(!first.done);
        assert!(!engine.cancellation_token().is_cancelled());

        let second = engine.start(&RunConfig::new(1, 1, 25, 5, 10)).await.unwrap();
        assert!(second.done);
        assert_eq!(second.total_completed_rounds, 1);
        assert_eq!(engine.state(), EngineState::Finished);
        assert_ne!(first.id, second.id);
    }

    #[tokio::test(start_paused = true)]
    async fn fresh_token_cancels_the_next_run() {
        let mut engine = PomodoroEngine::new(Database::open_memory().unwrap());
        engine.cancellation_token().cancel();
        let first = engine.start(&RunConfig::new(1, 1, 25, 5, 10)).await.unwrap();
        assert!(!first.done);

        cancel_after(&engine, Duration::from_millis(MINUTE_MS + 500));
        let second = engine.start(&RunConfig::new(1, 1, 25, 5, 10)).await.unwrap();
        assert!(!second.done);
        assert_eq!(second.total_completed_rounds, 0);
    }
}
