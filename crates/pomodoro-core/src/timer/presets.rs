//! Fixed menu of {round, short break, long break} duration triples.
//!
//! Options are numbered from 1 in the order they are listed.

use serde::Serialize;

use crate::error::ValidationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DurationPreset {
    pub round_minutes: u32,
    pub short_break_minutes: u32,
    pub long_break_minutes: u32,
}

impl DurationPreset {
    const fn new(round_minutes: u32, short_break_minutes: u32, long_break_minutes: u32) -> Self {
        Self {
            round_minutes,
            short_break_minutes,
            long_break_minutes,
        }
    }
}

pub const PRESETS: [DurationPreset; 8] = [
    DurationPreset::new(15, 3, 10),
    DurationPreset::new(15, 5, 10),
    DurationPreset::new(25, 5, 10),
    DurationPreset::new(30, 5, 10),
    DurationPreset::new(30, 10, 15),
    DurationPreset::new(45, 10, 15),
    DurationPreset::new(45, 10, 20),
    DurationPreset::new(60, 10, 30),
];

/// Look up a preset by its 1-based menu number.
///
/// # Errors
/// Returns `OutOfBounds` for 0 or any number past the end of the menu.
pub fn preset(option: usize) -> Result<&'static DurationPreset, ValidationError> {
    option
        .checked_sub(1)
        .and_then(|index| PRESETS.get(index))
        .ok_or_else(|| ValidationError::OutOfBounds {
            collection: "duration presets".into(),
            index: option,
            len: PRESETS.len(),
        })
}

/// Human-readable duration as shown in the menu ("25 minutes", "1 hour").
pub fn describe_minutes(minutes: u32) -> String {
    match minutes {
        60 => "1 hour".to_string(),
        m if m % 60 == 0 => format!("{} hours", m / 60),
        1 => "1 minute".to_string(),
        m => format!("{m} minutes"),
    }
}
