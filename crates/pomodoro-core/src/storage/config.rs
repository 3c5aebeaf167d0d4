//! TOML-based application configuration.
//!
//! Stores user preferences including:
//! - Default session and round counts
//! - The default duration preset
//! - What a cancelled break does to its round
//! - Clock speed (minute length and tick interval)
//!
//! Configuration is stored at `<data_dir>/config.toml`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::data_dir;
use crate::error::{ConfigError, ValidationError};
use crate::timer::{preset, BreakCancelPolicy, RunConfig};

const CONFIG_FILE: &str = "config.toml";

/// Defaults used by `pomodoro run` when flags are omitted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunDefaults {
    #[serde(default = "default_sessions")]
    pub sessions: u32,
    #[serde(default = "default_rounds_per_session")]
    pub rounds_per_session: u32,
    /// 1-based option from the preset menu.
    #[serde(default = "default_preset")]
    pub preset: usize,
    #[serde(default)]
    pub break_cancel_policy: BreakCancelPolicy,
}

/// Clock speed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClockConfig {
    /// Milliseconds in one configured minute.
    #[serde(default = "default_minute_ms")]
    pub minute_ms: u64,
    #[serde(default = "default_tick_ms")]
    pub tick_ms: u64,
}

/// Application configuration.
///
/// Serialized to/from TOML at `<data_dir>/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub run: RunDefaults,
    #[serde(default)]
    pub clock: ClockConfig,
}

fn default_sessions() -> u32 {
    2
}
fn default_rounds_per_session() -> u32 {
    4
}
fn default_preset() -> usize {
    3
}
fn default_minute_ms() -> u64 {
    60_000
}
fn default_tick_ms() -> u64 {
    1000
}

impl Default for RunDefaults {
    fn default() -> Self {
        Self {
            sessions: default_sessions(),
            rounds_per_session: default_rounds_per_session(),
            preset: default_preset(),
            break_cancel_policy: BreakCancelPolicy::default(),
        }
    }
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self {
            minute_ms: default_minute_ms(),
            tick_ms: default_tick_ms(),
        }
    }
}

impl ClockConfig {
    pub fn minute(&self) -> Duration {
        Duration::from_millis(self.minute_ms)
    }

    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }
}

impl Config {
    fn get_json_value_by_path<'a>(
        root: &'a serde_json::Value,
        key: &str,
    ) -> Option<&'a serde_json::Value> {
        if key.is_empty() {
            return None;
        }

        let mut current = root;
        for part in key.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    fn set_json_value_by_path(
        root: &mut serde_json::Value,
        key: &str,
        value: &str,
    ) -> Result<(), ConfigError> {
        let unknown = || ConfigError::UnknownKey(key.to_string());
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };

        let mut parts = key.split('.').peekable();
        if parts.peek().is_none() {
            return Err(unknown());
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            let is_leaf = parts.peek().is_none();
            if is_leaf {
                let obj = current.as_object_mut().ok_or_else(unknown)?;
                let existing = obj.get(part).ok_or_else(unknown)?;

                let new_value = match existing {
                    serde_json::Value::Bool(_) => serde_json::Value::Bool(
                        value.parse::<bool>().map_err(|e| invalid(e.to_string()))?,
                    ),
                    serde_json::Value::Number(_) => serde_json::Value::Number(
                        value
                            .parse::<u64>()
                            .map_err(|_| invalid(format!("cannot parse '{value}' as a whole number")))?
                            .into(),
                    ),
                    serde_json::Value::Object(_) => return Err(unknown()),
                    _ => serde_json::Value::String(value.into()),
                };

                obj.insert(part.to_string(), new_value);
                return Ok(());
            }

            current = current.get_mut(part).ok_or_else(unknown)?;
        }

        Err(unknown())
    }

    /// Path of the config file inside the data directory.
    pub fn path() -> Result<PathBuf, ConfigError> {
        Ok(data_dir()?.join(CONFIG_FILE))
    }

    /// Load from disk, writing the defaults first if the file is missing.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed,
    /// or if the default config cannot be written to disk.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(|e| ConfigError::LoadFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let cfg = Self::default();
                cfg.save_to(path)?;
                Ok(cfg)
            }
            Err(e) => Err(ConfigError::LoadFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            }),
        }
    }

    /// Persist to disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the config cannot be serialized or written to disk.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let save_failed = |message: String| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| save_failed(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| save_failed(e.to_string()))
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Change a value by dot-separated key without saving.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown or the value does not fit the field.
    pub fn apply(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let mut json = serde_json::to_value(&*self).map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        *self = serde_json::from_value(json).map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        Ok(())
    }

    /// Set a value by key and save.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown, the value cannot be parsed,
    /// or the config cannot be saved.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        self.apply(key, value)?;
        self.save()
    }

    /// The run described by the configured defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the configured preset number is not on the menu.
    pub fn run_config(&self) -> Result<RunConfig, ValidationError> {
        let preset = preset(self.run.preset)?;
        Ok(
            RunConfig::from_preset(self.run.sessions, self.run.rounds_per_session, preset)
                .with_break_cancel_policy(self.run.break_cancel_policy),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_roundtrip() {
        let cfg = Config::default();
        let toml_str = toml::to_string_pretty(&cfg).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.run.sessions, 2);
        assert_eq!(parsed.run.preset, 3);
        assert_eq!(parsed.clock.minute_ms, 60_000);
    }

    #[test]
    fn partial_file_fills_defaults() {
        let parsed: Config = toml::from_str("[run]\nsessions = 5\n").unwrap();
        assert_eq!(parsed.run.sessions, 5);
        assert_eq!(parsed.run.rounds_per_session, 4);
        assert_eq!(parsed.clock.tick_ms, 1000);
    }

    #[test]
    fn get_supports_dot_path_keys() {
        let cfg = Config::default();
        assert_eq!(cfg.get("run.sessions").as_deref(), Some("2"));
        assert_eq!(
            cfg.get("run.break_cancel_policy").as_deref(),
            Some("keep_focus_credit")
        );
        assert!(cfg.get("run.missing_key").is_none());
        assert!(cfg.get("").is_none());
    }

    #[test]
    fn apply_updates_number_and_enum() {
        let mut cfg = Config::default();
        cfg.apply("clock.minute_ms", "1000").unwrap();
        cfg.apply("run.break_cancel_policy", "discard_round").unwrap();
        assert_eq!(cfg.clock.minute(), Duration::from_secs(1));
        assert_eq!(cfg.run.break_cancel_policy, BreakCancelPolicy::DiscardRound);
    }

    #[test]
    fn apply_rejects_unknown_key_and_bad_values() {
        let mut cfg = Config::default();
        assert!(matches!(
            cfg.apply("run.nonexistent", "1"),
            Err(ConfigError::UnknownKey(_))
        ));
        assert!(matches!(cfg.apply("run", "1"), Err(ConfigError::UnknownKey(_))));
        assert!(matches!(
            cfg.apply("run.sessions", "many"),
            Err(ConfigError::InvalidValue { .. })
        ));
        assert!(matches!(
            cfg.apply("run.break_cancel_policy", "sometimes"),
            Err(ConfigError::InvalidValue { .. })
        ));
        assert_eq!(cfg.run.sessions, 2);
    }

    #[test]
    fn run_config_uses_preset() {
        let cfg = Config::default();
        let run = cfg.run_config().unwrap();
        assert_eq!(run, RunConfig::new(2, 4, 25, 5, 10));
    }

    #[test]
    fn run_config_rejects_unknown_preset() {
        let mut cfg = Config::default();
        cfg.run.preset = 99;
        assert!(cfg.run_config().is_err());
    }

    #[test]
    fn load_from_missing_file_writes_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let cfg = Config::load_from(&path).unwrap();
        assert_eq!(cfg.run.sessions, 2);
        assert!(path.exists());

        let mut cfg = cfg;
        cfg.apply("run.sessions", "3").unwrap();
        cfg.save_to(&path).unwrap();
        assert_eq!(Config::load_from(&path).unwrap().run.sessions, 3);
    }

    #[test]
    fn load_from_garbage_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "run = [").unwrap();
        assert!(matches!(
            Config::load_from(&path),
            Err(ConfigError::LoadFailed { .. })
        ));
    }
}
