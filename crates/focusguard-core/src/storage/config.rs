//! TOML-based application configuration.
//!
//! Stores user preferences including:
//! - Session durations, their allowed ranges and hard mode
//! - The night window
//! - Watchdog scan interval and blocked tool list
//! - Overlay messages
//!
//! Configuration is stored at `~/.config/focusguard/config.toml`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::data_dir;
use crate::error::{ConfigError, CoreError, Result};
use crate::guard::{tool_stem, NightWindow};
use crate::runtime::RuntimeConfig;
use crate::session::{
    default_break_activities, default_night_message, DurationBounds, SessionPolicy,
};

/// Session durations and hard mode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(default = "default_work_minutes")]
    pub work_minutes: u32,
    #[serde(default = "default_rest_minutes")]
    pub rest_minutes: u32,
    #[serde(default = "default_min_work_minutes")]
    pub min_work_minutes: u32,
    #[serde(default = "default_max_work_minutes")]
    pub max_work_minutes: u32,
    #[serde(default = "default_min_rest_minutes")]
    pub min_rest_minutes: u32,
    #[serde(default = "default_max_rest_minutes")]
    pub max_rest_minutes: u32,
    /// Keep input blocked and tools terminated during rests too.
    #[serde(default)]
    pub hard_mode: bool,
}

/// Forced-rest window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NightConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub start_hour: u32,
    #[serde(default = "default_end_hour")]
    pub end_hour: u32,
    #[serde(default = "default_night_check_interval")]
    pub check_interval_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchdogConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_one")]
    pub scan_interval_secs: u64,
    /// Executable names, matched case-insensitively.
    #[serde(default = "default_blocked_tools")]
    pub blocked_tools: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessagesConfig {
    #[serde(default = "default_break_activities")]
    pub break_activities: Vec<String>,
    #[serde(default = "default_night_message")]
    pub night_message: String,
}

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/focusguard/config.toml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_one")]
    pub tick_interval_secs: u64,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub night: NightConfig,
    #[serde(default)]
    pub watchdog: WatchdogConfig,
    #[serde(default)]
    pub messages: MessagesConfig,
}

// Default functions
fn default_work_minutes() -> u32 {
    50
}
fn default_rest_minutes() -> u32 {
    5
}
fn default_min_work_minutes() -> u32 {
    20
}
fn default_max_work_minutes() -> u32 {
    120
}
fn default_min_rest_minutes() -> u32 {
    1
}
fn default_max_rest_minutes() -> u32 {
    10
}
fn default_true() -> bool {
    true
}
fn default_one() -> u64 {
    1
}
fn default_end_hour() -> u32 {
    6
}
fn default_night_check_interval() -> u64 {
    30
}
fn default_blocked_tools() -> Vec<String> {
    [
        "taskmgr.exe",
        "procexp.exe",
        "procexp64.exe",
        "processhacker.exe",
        "systeminformer.exe",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            work_minutes: default_work_minutes(),
            rest_minutes: default_rest_minutes(),
            min_work_minutes: default_min_work_minutes(),
            max_work_minutes: default_max_work_minutes(),
            min_rest_minutes: default_min_rest_minutes(),
            max_rest_minutes: default_max_rest_minutes(),
            hard_mode: false,
        }
    }
}

impl Default for NightConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            start_hour: 0,
            end_hour: default_end_hour(),
            check_interval_secs: default_night_check_interval(),
        }
    }
}

impl Default for WatchdogConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            scan_interval_secs: 1,
            blocked_tools: default_blocked_tools(),
        }
    }
}

impl Default for MessagesConfig {
    fn default() -> Self {
        Self {
            break_activities: default_break_activities(),
            night_message: default_night_message(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tick_interval_secs: 1,
            session: SessionConfig::default(),
            night: NightConfig::default(),
            watchdog: WatchdogConfig::default(),
            messages: MessagesConfig::default(),
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
    ) -> std::result::Result<(), ConfigError> {
        let unknown = || ConfigError::UnknownKey(key.to_string());
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };

        let mut parts = key.split('.').peekable();
        if key.is_empty() {
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
                        value
                            .parse::<bool>()
                            .map_err(|_| invalid(format!("'{value}' is not true or false")))?,
                    ),
                    serde_json::Value::Number(_) => value
                        .trim()
                        .parse::<u64>()
                        .map(|n| serde_json::Value::Number(n.into()))
                        .map_err(|_| invalid(format!("'{value}' is not a whole number")))?,
                    // Lists take JSON or a comma-separated string.
                    serde_json::Value::Array(_) => match serde_json::from_str(value) {
                        Ok(serde_json::Value::Array(items)) => serde_json::Value::Array(items),
                        _ => serde_json::Value::Array(
                            value
                                .split(',')
                                .map(str::trim)
                                .filter(|s| !s.is_empty())
                                .map(|s| serde_json::Value::String(s.to_string()))
                                .collect(),
                        ),
                    },
                    serde_json::Value::Object(_) => {
                        return Err(invalid("cannot replace a whole section".into()))
                    }
                    _ => serde_json::Value::String(value.into()),
                };

                obj.insert(part.to_string(), new_value);
                return Ok(());
            }

            current = current.get_mut(part).ok_or_else(unknown)?;
        }

        Err(unknown())
    }

    /// `<data_dir>/config.toml`.
    ///
    /// # Errors
    ///
    /// Returns an error if the data directory cannot be created.
    pub fn path() -> Result<PathBuf> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Load from the default location, writing defaults when missing.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed or
    /// fails validation, or if the default config cannot be written.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(content) => {
                let cfg: Config = toml::from_str(&content).map_err(|e| ConfigError::LoadFailed {
                    path: path.to_path_buf(),
                    message: e.to_string(),
                })?;
                cfg.validate()?;
                Ok(cfg)
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = %path.display(), "no config file, writing defaults");
                let cfg = Self::default();
                cfg.save_to(path)?;
                Ok(cfg)
            }
            Err(err) => Err(ConfigError::LoadFailed {
                path: path.to_path_buf(),
                message: err.to_string(),
            }
            .into()),
        }
    }

    /// Persist to the default location.
    ///
    /// # Errors
    ///
    /// Returns an error if the config cannot be serialized or written to disk.
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        let save_failed = |message: String| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| save_failed(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| save_failed(e.to_string()))?;
        Ok(())
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

    /// Set a config value by dot-separated key. The change is only kept if
    /// the resulting config validates; call [`save`](Self::save) to persist.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown, the value cannot be parsed,
    /// or the resulting config is invalid.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let mut json = serde_json::to_value(&*self).map_err(ConfigError::from)?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        let updated: Config = serde_json::from_value(json).map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        updated.validate()?;
        *self = updated;
        Ok(())
    }

    /// Reject inverted bounds, bad night hours and zero intervals.
    pub fn validate(&self) -> Result<()> {
        self.session_policy().validate()?;
        self.night_window()?;
        for (field, secs) in [
            ("tick_interval_secs", self.tick_interval_secs),
            ("night.check_interval_secs", self.night.check_interval_secs),
            ("watchdog.scan_interval_secs", self.watchdog.scan_interval_secs),
        ] {
            if secs == 0 {
                return Err(CoreError::invalid_config(field, "interval must be at least one second"));
            }
        }
        if let Some(tool) = self
            .watchdog
            .blocked_tools
            .iter()
            .find(|t| tool_stem(t).is_none())
        {
            return Err(CoreError::invalid_config(
                "watchdog.blocked_tools",
                format!("{tool:?} is not a tool name"),
            ));
        }
        Ok(())
    }

    pub fn session_policy(&self) -> SessionPolicy {
        SessionPolicy {
            work_bounds: DurationBounds::new(
                self.session.min_work_minutes,
                self.session.max_work_minutes,
            ),
            rest_bounds: DurationBounds::new(
                self.session.min_rest_minutes,
                self.session.max_rest_minutes,
            ),
            hard_mode: self.session.hard_mode,
            break_activities: self.messages.break_activities.clone(),
            night_message: self.messages.night_message.clone(),
        }
    }

    pub fn night_window(&self) -> Result<NightWindow> {
        NightWindow::new(self.night.start_hour, self.night.end_hour)
    }

    pub fn runtime_config(&self) -> RuntimeConfig {
        RuntimeConfig {
            tick_interval: Duration::from_secs(self.tick_interval_secs),
            night_check_interval: Duration::from_secs(self.night.check_interval_secs),
            scan_interval: Duration::from_secs(self.watchdog.scan_interval_secs),
        }
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
        assert_eq!(parsed, cfg);
    }

    #[test]
    fn partial_file_fills_defaults() {
        let parsed: Config = toml::from_str("[night]\nstart_hour = 22\n").unwrap();
        assert_eq!(parsed.night.start_hour, 22);
        assert_eq!(parsed.night.end_hour, 6);
        assert_eq!(parsed.session.work_minutes, 50);
        assert_eq!(parsed.watchdog.blocked_tools.len(), 5);
    }

    #[test]
    fn get_supports_dot_path_keys() {
        let cfg = Config::default();
        assert_eq!(cfg.get("session.hard_mode").as_deref(), Some("false"));
        assert_eq!(cfg.get("session.work_minutes").as_deref(), Some("50"));
        assert_eq!(
            cfg.get("messages.night_message").as_deref(),
            Some("It's late night hours. Please get some rest.")
        );
        assert!(cfg.get("session.missing_key").is_none());
    }

    #[test]
    fn set_updates_nested_values() {
        let mut cfg = Config::default();
        cfg.set("session.hard_mode", "true").unwrap();
        cfg.set("night.start_hour", "22").unwrap();
        cfg.set("watchdog.blocked_tools", "taskmgr.exe, procexp.exe").unwrap();
        assert!(cfg.session.hard_mode);
        assert_eq!(cfg.night.start_hour, 22);
        assert_eq!(cfg.watchdog.blocked_tools, vec!["taskmgr.exe", "procexp.exe"]);
    }

    #[test]
    fn set_accepts_json_lists() {
        let mut cfg = Config::default();
        cfg.set("messages.break_activities", r#"["Stretch", "Drink water"]"#)
            .unwrap();
        assert_eq!(cfg.messages.break_activities, vec!["Stretch", "Drink water"]);
    }

    #[test]
    fn set_rejects_unknown_key() {
        let mut cfg = Config::default();
        assert!(matches!(
            cfg.set("session.nonexistent_key", "1"),
            Err(CoreError::Config(ConfigError::UnknownKey(_)))
        ));
        assert!(matches!(
            cfg.set("", "1"),
            Err(CoreError::Config(ConfigError::UnknownKey(_)))
        ));
    }

    #[test]
    fn set_rejects_invalid_type() {
        let mut cfg = Config::default();
        assert!(cfg.set("session.hard_mode", "not_a_bool").is_err());
        assert!(cfg.set("session.work_minutes", "abc").is_err());
        assert!(cfg.set("session", "1").is_err());
        assert_eq!(cfg, Config::default());
    }

    #[test]
    fn set_keeps_previous_value_when_result_is_invalid() {
        let mut cfg = Config::default();
        let err = cfg.set("session.min_work_minutes", "200").unwrap_err();
        assert!(matches!(err, CoreError::InvalidConfig { .. }));
        assert_eq!(cfg.session.min_work_minutes, 20);
    }

    #[test]
    fn validate_rejects_bad_values() {
        let mut cfg = Config::default();
        cfg.night.start_hour = 25;
        assert!(cfg.validate().is_err());

        let mut cfg = Config::default();
        cfg.tick_interval_secs = 0;
        assert!(cfg.validate().is_err());

        let mut cfg = Config::default();
        cfg.session.min_rest_minutes = 0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn extension_only_tool_names_are_rejected() {
        let mut cfg = Config::default();
        assert!(cfg.set("watchdog.blocked_tools", ".exe").is_err());
        assert!(cfg.set("watchdog.blocked_tools", r#"["taskmgr.exe", "  "]"#).is_err());
        assert_eq!(cfg.watchdog.blocked_tools, Config::default().watchdog.blocked_tools);
    }

    #[test]
    fn session_policy_reflects_config() {
        let mut cfg = Config::default();
        cfg.session.hard_mode = true;
        cfg.session.max_work_minutes = 90;
        let policy = cfg.session_policy();
        assert!(policy.hard_mode);
        assert_eq!(policy.work_bounds, DurationBounds::new(20, 90));
        assert_eq!(policy.break_activities, default_break_activities());
    }

    #[test]
    fn runtime_config_uses_intervals() {
        let cfg = Config::default();
        let rt = cfg.runtime_config();
        assert_eq!(rt.tick_interval, Duration::from_secs(1));
        assert_eq!(rt.night_check_interval, Duration::from_secs(30));
    }

    #[test]
    fn load_from_writes_defaults_when_missing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let cfg = Config::load_from(&path).unwrap();
        assert_eq!(cfg, Config::default());
        assert!(path.exists());
    }

    #[test]
    fn save_and_load_preserve_changes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let mut cfg = Config::default();
        cfg.set("night.end_hour", "7").unwrap();
        cfg.save_to(&path).unwrap();
        assert_eq!(Config::load_from(&path).unwrap().night.end_hour, 7);
    }

    #[test]
    fn load_from_rejects_malformed_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "tick_interval_secs = \"soon\"").unwrap();
        assert!(matches!(
            Config::load_from(&path),
            Err(CoreError::Config(ConfigError::LoadFailed { .. }))
        ));
    }
}
