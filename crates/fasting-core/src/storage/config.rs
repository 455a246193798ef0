//! TOML-based application configuration.
//!
//! Stores user preferences including:
//! - Notifier poll cadence
//! - Display refresh rate and history length
//! - Notification channels (console, bell/sound, external command)
//!
//! Configuration is stored at `<data_dir>/config.toml`. The fasting
//! thresholds themselves are fixed and not configurable.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use super::data_dir;
use crate::error::ConfigError;

/// Threshold notifier configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifierConfig {
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
}

/// Display adapter configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisplayConfig {
    #[serde(default = "default_refresh_interval_ms")]
    pub refresh_interval_ms: u64,
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
}

/// Notification configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationsConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Print the notification text on the terminal.
    #[serde(default = "default_true")]
    pub console: bool,
    /// Ring the terminal bell, or play `sound_file` when one is set.
    #[serde(default = "default_true")]
    pub bell: bool,
    /// Path to a sound file played on threshold crossings (optional).
    #[serde(default)]
    pub sound_file: Option<String>,
    /// Program used to play `sound_file`, e.g. `paplay` or `afplay`.
    #[serde(default)]
    pub sound_player: Option<String>,
    /// External command receiving title and body, e.g. `notify-send`.
    #[serde(default)]
    pub command: Option<String>,
}

impl NotificationsConfig {
    /// An empty optional string means "not set".
    fn clear_blank(&mut self) {
        for value in [&mut self.sound_file, &mut self.sound_player, &mut self.command] {
            if value.as_deref().is_some_and(|v| v.trim().is_empty()) {
                *value = None;
            }
        }
    }
}

/// Application configuration.
///
/// Serialized to/from TOML at `<data_dir>/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Meal log location. Empty means `<data_dir>/fasting.db`.
    #[serde(default)]
    pub database: String,
    #[serde(default)]
    pub notifier: NotifierConfig,
    #[serde(default)]
    pub display: DisplayConfig,
    #[serde(default)]
    pub notifications: NotificationsConfig,
}

// Default functions
fn default_poll_interval_secs() -> u64 {
    60
}
fn default_refresh_interval_ms() -> u64 {
    1000
}
fn default_history_limit() -> usize {
    7
}
fn default_true() -> bool {
    true
}

impl Default for NotifierConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval_secs(),
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            refresh_interval_ms: default_refresh_interval_ms(),
            history_limit: default_history_limit(),
        }
    }
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            console: true,
            bell: true,
            sound_file: None,
            sound_player: None,
            command: None,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: String::new(),
            notifier: NotifierConfig::default(),
            display: DisplayConfig::default(),
            notifications: NotificationsConfig::default(),
        }
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
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };

        let mut parts = key.split('.').peekable();
        if key.is_empty() {
            return Err(ConfigError::UnknownKey(String::new()));
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            let is_leaf = parts.peek().is_none();
            if is_leaf {
                let obj = current
                    .as_object_mut()
                    .ok_or_else(|| ConfigError::UnknownKey(key.to_string()))?;
                let existing = obj
                    .get(part)
                    .ok_or_else(|| ConfigError::UnknownKey(key.to_string()))?;

                let new_value = match existing {
                    serde_json::Value::Bool(_) => serde_json::Value::Bool(
                        value
                            .parse::<bool>()
                            .map_err(|e| invalid(e.to_string()))?,
                    ),
                    serde_json::Value::Number(_) => {
                        let n = value
                            .parse::<u64>()
                            .map_err(|_| invalid(format!("cannot parse '{value}' as number")))?;
                        serde_json::Value::Number(n.into())
                    }
                    serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
                        return Err(invalid("cannot replace a whole section".to_string()));
                    }
                    // Unset optional strings stay unset; `apply` clears set ones.
                    serde_json::Value::Null if value.is_empty() => serde_json::Value::Null,
                    _ => serde_json::Value::String(value.into()),
                };

                obj.insert(part.to_string(), new_value);
                return Ok(());
            }

            current = current
                .get_mut(part)
                .ok_or_else(|| ConfigError::UnknownKey(key.to_string()))?;
        }

        Err(ConfigError::UnknownKey(key.to_string()))
    }

    /// Location of the config file.
    ///
    /// # Errors
    /// Returns an error if the data directory cannot be created.
    pub fn path() -> Result<PathBuf, ConfigError> {
        data_dir()
            .map(|dir| dir.join("config.toml"))
            .map_err(|e| ConfigError::LoadFailed {
                path: PathBuf::from("config.toml"),
                message: e.to_string(),
            })
    }

    /// Load from disk or return default.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed,
    /// or if the default config cannot be written to disk.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::path()?;
        match std::fs::read_to_string(&path) {
            Ok(content) => Self::from_toml(&content),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let cfg = Self::default();
                cfg.save()?;
                Ok(cfg)
            }
            Err(e) => Err(ConfigError::LoadFailed {
                path,
                message: e.to_string(),
            }),
        }
    }

    /// Parse a TOML document, filling missing fields with defaults.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::ParseFailed(e.to_string()))
    }

    /// Persist to disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the config cannot be serialized or written to disk.
    pub fn save(&self) -> Result<(), ConfigError> {
        let path = Self::path()?;
        let content = toml::to_string_pretty(self).map_err(|e| ConfigError::SaveFailed {
            path: path.clone(),
            message: e.to_string(),
        })?;
        std::fs::write(&path, content).map_err(|e| ConfigError::SaveFailed {
            path,
            message: e.to_string(),
        })
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            serde_json::Value::Null => Some(String::new()),
            other => Some(other.to_string()),
        }
    }

    /// Set a config value by key without saving. An empty value clears the
    /// optional `notifications` strings.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown or the value cannot be parsed.
    pub fn apply(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let mut json = serde_json::to_value(&*self)
            .map_err(|e| ConfigError::ParseFailed(e.to_string()))?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        let mut updated: Config =
            serde_json::from_value(json).map_err(|e| ConfigError::InvalidValue {
                key: key.to_string(),
                message: e.to_string(),
            })?;
        updated.notifications.clear_blank();
        updated.validate()?;
        *self = updated;
        Ok(())
    }

    /// Set a config value by key and save. Returns error if key is unknown.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown, the value cannot be parsed,
    /// or the config cannot be saved.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        self.apply(key, value)?;
        self.save()
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.notifier.poll_interval_secs == 0 {
            return Err(ConfigError::InvalidValue {
                key: "notifier.poll_interval_secs".into(),
                message: "must be at least 1".into(),
            });
        }
        if self.display.refresh_interval_ms == 0 {
            return Err(ConfigError::InvalidValue {
                key: "display.refresh_interval_ms".into(),
                message: "must be at least 1".into(),
            });
        }
        Ok(())
    }

    /// Meal log path, resolving the empty default against the data directory.
    pub fn database_path(&self) -> Result<PathBuf, ConfigError> {
        if self.database.trim().is_empty() {
            data_dir()
                .map(|dir| dir.join(super::database::DATABASE_FILE))
                .map_err(|e| ConfigError::LoadFailed {
                    path: PathBuf::from(super::database::DATABASE_FILE),
                    message: e.to_string(),
                })
        } else {
            Ok(PathBuf::from(self.database.trim()))
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.notifier.poll_interval_secs.max(1))
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_millis(self.display.refresh_interval_ms.max(1))
    }

    /// Load from disk, returning default on error.
    /// This is a convenience method that never fails.
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_roundtrip() {
        let cfg = Config::default();
        let toml_str = toml::to_string_pretty(&cfg).unwrap();
        let parsed = Config::from_toml(&toml_str).unwrap();
        assert_eq!(parsed.notifier.poll_interval_secs, 60);
        assert_eq!(parsed.display.history_limit, 7);
    }

    #[test]
    fn partial_file_fills_defaults() {
        let cfg = Config::from_toml("[notifier]\npoll_interval_secs = 5\n").unwrap();
        assert_eq!(cfg.notifier.poll_interval_secs, 5);
        assert_eq!(cfg.display.refresh_interval_ms, 1000);
        assert!(cfg.notifications.enabled);
        assert!(cfg.database.is_empty());
    }

    #[test]
    fn malformed_file_is_a_parse_error() {
        assert!(matches!(
            Config::from_toml("notifier = 3"),
            Err(ConfigError::ParseFailed(_))
        ));
    }

    #[test]
    fn get_supports_dot_path_keys() {
        let cfg = Config::default();
        assert_eq!(cfg.get("notifier.poll_interval_secs").as_deref(), Some("60"));
        assert_eq!(cfg.get("notifications.bell").as_deref(), Some("true"));
        assert_eq!(cfg.get("notifications.command").as_deref(), Some(""));
        assert!(cfg.get("display.missing_key").is_none());
    }

    #[test]
    fn apply_updates_nested_number() {
        let mut cfg = Config::default();
        cfg.apply("display.history_limit", "14").unwrap();
        assert_eq!(cfg.display.history_limit, 14);
    }

    #[test]
    fn apply_sets_and_clears_optional_string() {
        let mut cfg = Config::default();
        cfg.apply("notifications.command", "notify-send").unwrap();
        assert_eq!(cfg.notifications.command.as_deref(), Some("notify-send"));
        cfg.apply("notifications.command", "").unwrap();
        assert_eq!(cfg.notifications.command, None);
        assert_eq!(cfg.get("notifications.command").as_deref(), Some(""));
    }

    #[test]
    fn clearing_one_optional_string_keeps_the_others() {
        let mut cfg = Config::default();
        cfg.apply("notifications.sound_player", "paplay").unwrap();
        cfg.apply("notifications.sound_file", "/tmp/beep.wav").unwrap();
        cfg.apply("notifications.sound_file", "").unwrap();
        assert_eq!(cfg.notifications.sound_file, None);
        assert_eq!(cfg.notifications.sound_player.as_deref(), Some("paplay"));
    }

    #[test]
    fn apply_rejects_unknown_key() {
        let mut cfg = Config::default();
        assert!(matches!(
            cfg.apply("notifier.nonexistent", "1"),
            Err(ConfigError::UnknownKey(_))
        ));
        assert!(matches!(cfg.apply("", "1"), Err(ConfigError::UnknownKey(_))));
    }

    #[test]
    fn apply_rejects_invalid_type() {
        let mut cfg = Config::default();
        assert!(cfg.apply("notifications.enabled", "not_a_bool").is_err());
        assert!(cfg.apply("notifier.poll_interval_secs", "-3").is_err());
        assert!(cfg.apply("notifier", "{}").is_err());
    }

    #[test]
    fn apply_rejects_zero_poll_interval_and_keeps_old_value() {
        let mut cfg = Config::default();
        assert!(cfg.apply("notifier.poll_interval_secs", "0").is_err());
        assert_eq!(cfg.notifier.poll_interval_secs, 60);
    }

    #[test]
    fn explicit_database_path_wins() {
        let cfg = Config {
            database: "/tmp/meals.db".into(),
            ..Config::default()
        };
        assert_eq!(cfg.database_path().unwrap(), PathBuf::from("/tmp/meals.db"));
    }

    #[test]
    fn intervals_convert_to_durations() {
        let cfg = Config::default();
        assert_eq!(cfg.poll_interval(), Duration::from_secs(60));
        assert_eq!(cfg.refresh_interval(), Duration::from_millis(1000));
    }
}
