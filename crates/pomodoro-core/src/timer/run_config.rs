use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

use super::presets::DurationPreset;

/// What happens to a round whose break is cancelled after the focus phase
/// already ran to completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BreakCancelPolicy {
    /// The finished focus phase still counts as a completed round.
    #[default]
    KeepFocusCredit,
    /// The whole round is discarded.
    DiscardRound,
}

/// Immutable parameters of one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunConfig {
    pub number_of_sessions: u32,
    pub rounds_per_session: u32,
    /// Focus-round duration in minutes.
    pub focus_minutes: u32,
    pub short_break_minutes: u32,
    pub long_break_minutes: u32,
    #[serde(default)]
    pub break_cancel_policy: BreakCancelPolicy,
}

impl RunConfig {
    pub fn new(
        number_of_sessions: u32,
        rounds_per_session: u32,
        focus_minutes: u32,
        short_break_minutes: u32,
        long_break_minutes: u32,
    ) -> Self {
        Self {
            number_of_sessions,
            rounds_per_session,
            focus_minutes,
            short_break_minutes,
            long_break_minutes,
            break_cancel_policy: BreakCancelPolicy::default(),
        }
    }

    /// Build a config from one of the fixed duration presets.
    pub fn from_preset(number_of_sessions: u32, rounds_per_session: u32, preset: &DurationPreset) -> Self {
        Self::new(
            number_of_sessions,
            rounds_per_session,
            preset.round_minutes,
            preset.short_break_minutes,
            preset.long_break_minutes,
        )
    }

    pub fn with_break_cancel_policy(mut self, policy: BreakCancelPolicy) -> Self {
        self.break_cancel_policy = policy;
        self
    }

    /// Reject zero counts and durations.
    ///
    /// # Errors
    /// Returns the first field found to be non-positive.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let fields = [
            ("number_of_sessions", self.number_of_sessions),
            ("rounds_per_session", self.rounds_per_session),
            ("focus_minutes", self.focus_minutes),
            ("short_break_minutes", self.short_break_minutes),
            ("long_break_minutes", self.long_break_minutes),
        ];
        match fields.iter().find(|(_, value)| *value == 0) {
            Some((field, _)) => Err(ValidationError::NotPositive { field: *field }),
            None => Ok(()),
        }
    }

    /// Upper bound on completed rounds for a run with this config.
    pub fn total_rounds(&self) -> u64 {
        u64::from(self.number_of_sessions) * u64::from(self.rounds_per_session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_config_passes() {
        assert!(RunConfig::new(2, 2, 25, 5, 10).validate().is_ok());
    }

    #[test]
    fn zero_fields_are_rejected_by_name() {
        assert_eq!(
            RunConfig::new(0, 2, 25, 5, 10).validate(),
            Err(ValidationError::NotPositive { field: "number_of_sessions" })
        );
        assert_eq!(
            RunConfig::new(2, 2, 25, 0, 10).validate(),
            Err(ValidationError::NotPositive { field: "short_break_minutes" })
        );
        assert_eq!(
            RunConfig::new(2, 2, 25, 5, 0).validate(),
            Err(ValidationError::NotPositive { field: "long_break_minutes" })
        );
    }

    #[test]
    fn total_rounds_does_not_overflow() {
        let config = RunConfig::new(u32::MAX, u32::MAX, 1, 1, 1);
        assert_eq!(config.total_rounds(), u64::from(u32::MAX) * u64::from(u32::MAX));
    }

    #[test]
    fn policy_defaults_when_missing_from_toml() {
        let config: RunConfig = toml::from_str(
            "number_of_sessions = 1\nrounds_per_session = 4\nfocus_minutes = 25\nshort_break_minutes = 5\nlong_break_minutes = 10\n",
        )
        .unwrap();
        assert_eq!(config.break_cancel_policy, BreakCancelPolicy::KeepFocusCredit);
    }
}
