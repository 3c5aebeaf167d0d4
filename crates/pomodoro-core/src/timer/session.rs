use chrono::Utc;
use tracing::debug;

use super::clock::Clock;
use super::phase::BreakKind;
use super::round::{run_round, RoundOutcome};
use super::run_config::BreakCancelPolicy;
use crate::events::Event;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionOutcome {
    pub completed_rounds: u32,
    /// Every round of the session was credited.
    pub completed: bool,
    /// A round was cancelled; the caller must not start another session.
    pub aborted: bool,
}

/// Break used after the 1-based `round` of a session with `rounds` rounds.
pub fn break_kind_for(round: u32, rounds: u32) -> BreakKind {
    if round >= rounds {
        BreakKind::Long
    } else {
        BreakKind::Short
    }
}

/// Per-session timing parameters.
#[derive(Debug, Clone, Copy)]
pub struct SessionPlan {
    pub session: u32,
    pub rounds: u32,
    pub focus_minutes: u32,
    pub short_break_minutes: u32,
    pub long_break_minutes: u32,
    pub break_cancel_policy: BreakCancelPolicy,
}

/// Run the rounds of one session in order, stopping at the first aborted one.
pub async fn run_session(clock: &Clock, plan: &SessionPlan) -> SessionOutcome {
    clock.events().emit(Event::SessionStarted {
        session: plan.session,
        at: Utc::now(),
    });

    let mut completed_rounds = 0;
    let mut aborted = false;

    for round in 1..=plan.rounds {
        let kind = break_kind_for(round, plan.rounds);
        let break_minutes = match kind {
            BreakKind::Short => plan.short_break_minutes,
            BreakKind::Long => plan.long_break_minutes,
        };

        let outcome = run_round(clock, round, plan.focus_minutes, break_minutes, kind).await;
        let credited = match outcome {
            RoundOutcome::Completed => true,
            RoundOutcome::Aborted { focus_completed } => {
                focus_completed && plan.break_cancel_policy == BreakCancelPolicy::KeepFocusCredit
            }
        };
        if credited {
            completed_rounds += 1;
        }

        clock.events().emit(Event::RoundFinished {
            session: plan.session,
            round,
            completed: credited,
            at: Utc::now(),
        });

        if let RoundOutcome::Aborted { .. } = outcome {
            debug!(session = plan.session, round, credited, "round aborted, ending session");
            aborted = true;
            break;
        }
    }

    let completed = completed_rounds == plan.rounds;
    clock.events().emit(Event::SessionFinished {
        session: plan.session,
        completed_rounds,
        completed,
        at: Utc::now(),
    });

    SessionOutcome {
        completed_rounds,
        completed,
        aborted,
    }
}
