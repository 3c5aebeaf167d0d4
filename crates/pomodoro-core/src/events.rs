use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::UnboundedSender;

use crate::timer::Phase;

/// Every state change of a run produces an Event.
/// The terminal front end renders them; the engine never prints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    RunStarted {
        record_id: i64,
        number_of_sessions: u32,
        rounds_per_session: u32,
        at: DateTime<Utc>,
    },
    SessionStarted {
        session: u32,
        at: DateTime<Utc>,
    },
    PhaseStarted {
        round: u32,
        phase: Phase,
        duration_secs: u64,
        at: DateTime<Utc>,
    },
    /// Emitted once per clock wake with the time left in the current phase.
    Tick {
        phase: Phase,
        remaining_secs: u64,
    },
    PhaseCompleted {
        phase: Phase,
        at: DateTime<Utc>,
    },
    PhaseCancelled {
        phase: Phase,
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
    RoundFinished {
        session: u32,
        round: u32,
        completed: bool,
        at: DateTime<Utc>,
    },
    SessionFinished {
        session: u32,
        completed_rounds: u32,
        completed: bool,
        at: DateTime<Utc>,
    },
    RunFinished {
        record_id: i64,
        total_completed_sessions: u32,
        total_completed_rounds: u32,
        done: bool,
        at: DateTime<Utc>,
    },
}

/// Optional outbound event channel shared by every layer of a run.
///
/// Sending never fails from the caller's point of view: once the receiver is
/// gone, events are dropped.
#[derive(Debug, Clone, Default)]
pub struct EventSink {
    tx: Option<UnboundedSender<Event>>,
}

impl EventSink {
    pub fn new(tx: UnboundedSender<Event>) -> Self {
        Self { tx: Some(tx) }
    }

    /// A sink that discards everything.
    pub fn none() -> Self {
        Self { tx: None }
    }

    pub fn emit(&self, event: Event) {
        if let Some(tx) = &self.tx {
            let _ = tx.send(event);
        }
    }
}
