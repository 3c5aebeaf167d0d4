//! # Pomodoro Core Library
//!
//! Core logic for a terminal pomodoro timer: the session engine that
//! sequences focus rounds and breaks, and the store that keeps one record
//! per run for later review. The `pomodoro` CLI is a thin layer over it.
//!
//! ## Architecture
//!
//! - **Clock**: cancellable per-second countdown on tokio's monotonic clock
//! - **Round / Session**: focus + break, repeated with a long break at the
//!   session boundary
//! - **Engine**: runs the sessions and persists the run record at start,
//!   after each completed session and at the end
//! - **Storage**: SQLite run records and TOML configuration
//!
//! ## Key Components
//!
//! - [`PomodoroEngine`]: Run coordinator state machine
//! - [`Database`]: Run record persistence
//! - [`Config`]: Application configuration management
//! - [`Event`]: Tick and progress notifications for the front end

pub mod error;
pub mod events;
pub mod stats;
pub mod storage;
pub mod timer;

pub use error::{ConfigError, CoreError, DatabaseError, ValidationError};
pub use events::{Event, EventSink};
pub use stats::{DailySummary, RecordStats};
pub use storage::{Config, Database, RecordStore, RunRecord};
pub use timer::{
    BreakCancelPolicy, BreakKind, Clock, DurationPreset, EngineState, Phase, PomodoroEngine,
    RunConfig,
};
