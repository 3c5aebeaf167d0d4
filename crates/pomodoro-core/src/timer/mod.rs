mod clock;
mod engine;
mod phase;
pub mod presets;
mod round;
mod run_config;
mod session;

pub use clock::{format_mm_ss, Clock, CountdownOutcome};
pub use engine::{EngineState, PomodoroEngine};
pub use phase::{BreakKind, Phase};
pub use presets::{describe_minutes, preset, DurationPreset, PRESETS};
pub use round::{run_round, RoundOutcome};
pub use run_config::{BreakCancelPolicy, RunConfig};
pub use session::{break_kind_for, run_session, SessionOutcome, SessionPlan};
