//! Cancellable countdown primitive.
//!
//! A countdown suspends the caller on tokio's monotonic clock, waking once
//! per tick to publish the remaining time, until the deadline passes or the
//! cancellation token fires. There is no retry: a cancelled countdown is
//! finished and the caller must start a fresh one.

use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use super::phase::Phase;
use crate::events::{Event, EventSink};

const DEFAULT_TICK: Duration = Duration::from_secs(1);
const DEFAULT_MINUTE: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountdownOutcome {
    Expired,
    Cancelled { remaining_secs: u64 },
}

#[derive(Debug, Clone)]
pub struct Clock {
    tick: Duration,
    /// Wall length of one configured "minute".
    minute: Duration,
    cancel: CancellationToken,
    events: EventSink,
}

impl Clock {
    pub fn new(cancel: CancellationToken) -> Self {
        Self {
            tick: DEFAULT_TICK,
            minute: DEFAULT_MINUTE,
            cancel,
            events: EventSink::none(),
        }
    }

    /// Shorten or lengthen a "minute". Used by the demo mode of the front end.
    pub fn with_minute(mut self, minute: Duration) -> Self {
        self.minute = minute;
        self
    }

    /// A zero tick would spin; it is clamped to one millisecond.
    pub fn with_tick(mut self, tick: Duration) -> Self {
        self.tick = tick.max(Duration::from_millis(1));
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn with_events(mut self, events: EventSink) -> Self {
        self.events = events;
        self
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn events(&self) -> &EventSink {
        &self.events
    }

    pub fn minutes(&self, minutes: u32) -> Duration {
        self.minute.saturating_mul(minutes)
    }

    /// Count `duration` down to zero, emitting a [`Event::Tick`] on every wake.
    ///
    /// A zero duration expires immediately without suspending.
    pub async fn countdown(&self, phase: Phase, duration: Duration) -> CountdownOutcome {
        if duration.is_zero() {
            return CountdownOutcome::Expired;
        }

        let deadline = Instant::now() + duration;
        loop {
            let now = Instant::now();
            let remaining = deadline.saturating_duration_since(now);
            let remaining_secs = whole_secs(remaining);
            self.events.emit(Event::Tick {
                phase,
                remaining_secs,
            });
            if remaining.is_zero() {
                return CountdownOutcome::Expired;
            }

            let wake = now + remaining.min(self.tick);
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    return CountdownOutcome::Cancelled { remaining_secs };
                }
                _ = tokio::time::sleep_until(wake) => {}
            }
        }
    }
}

/// Remaining time rounded up, so a phase shows its full length first and
/// reaches 0 only at expiry.
fn whole_secs(d: Duration) -> u64 {
    let secs = d.as_secs();
    if d.subsec_nanos() > 0 {
        secs + 1
    } else {
        secs
    }
}

/// Format seconds as `mm:ss` (minutes are not wrapped at 60).
pub fn format_mm_ss(secs: u64) -> String {
    format!("{:02}:{:02}", secs / 60, secs % 60)
}
