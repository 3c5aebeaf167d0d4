//! One focus interval followed by its break.
//!
//! ## Phases
//!
//! ```text
//! Focus --expired--> Break --expired--> Completed
//!   |                  |
//!   +--cancelled-------+--cancelled--> Aborted
//! ```

use chrono::Utc;
use tracing::debug;

use super::clock::{Clock, CountdownOutcome};
use super::phase::{BreakKind, Phase};
use crate::events::Event;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundOutcome {
    Completed,
    /// Cancelled before the break finished. `focus_completed` is true when the
    /// cancellation landed in the break phase.
    Aborted { focus_completed: bool },
}

impl RoundOutcome {
    pub fn focus_completed(&self) -> bool {
        match self {
            RoundOutcome::Completed => true,
            RoundOutcome::Aborted { focus_completed } => *focus_completed,
        }
    }
}

/// Run one round. `round` is the 1-based position inside the session, used
/// only for event labelling.
pub async fn run_round(
    clock: &Clock,
    round: u32,
    focus_minutes: u32,
    break_minutes: u32,
    break_kind: BreakKind,
) -> RoundOutcome {
    if !run_phase(clock, round, Phase::Focus, focus_minutes).await {
        return RoundOutcome::Aborted {
            focus_completed: false,
        };
    }

    if run_phase(clock, round, break_kind.into(), break_minutes).await {
        RoundOutcome::Completed
    } else {
        RoundOutcome::Aborted {
            focus_completed: true,
        }
    }
}

/// Returns true when the phase ran to expiry.
async fn run_phase(clock: &Clock, round: u32, phase: Phase, minutes: u32) -> bool {
    let duration = clock.minutes(minutes);
    debug!(round, ?phase, minutes, "phase started");
    clock.events().emit(Event::PhaseStarted {
        round,
        phase,
        duration_secs: duration.as_secs(),
        at: Utc::now(),
    });

    match clock.countdown(phase, duration).await {
        CountdownOutcome::Expired => {
            clock.events().emit(Event::PhaseCompleted {
                phase,
                at: Utc::now(),
            });
            true
        }
        CountdownOutcome::Cancelled { remaining_secs } => {
            debug!(round, ?phase, remaining_secs, "phase cancelled");
            clock.events().emit(Event::PhaseCancelled {
                phase,
                remaining_secs,
                at: Utc::now(),
            });
            false
        }
    }
}
