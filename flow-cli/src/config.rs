//! Configuration loading for flow.
//!
//! Configuration is loaded from a TOML file (default: `flow.toml` in the
//! platform config directory). Every section is optional.

use flow_core::{ScheduleEvaluator, ScheduleRule};
use flow_types::TimerSettings;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Root configuration for flow.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Starting timer settings.
    #[serde(default)]
    pub timer: TimerSettings,
    /// Session store and polling.
    #[serde(default)]
    pub sync: SyncConfig,
    /// Automatic start rules.
    #[serde(default)]
    pub schedules: Vec<ScheduleRule>,
}

/// Session store and polling configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Interval between polls of the shared record (default: 2000).
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Interval between local timer ticks (default: 200).
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
    /// Shared session directory (default: platform data dir).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub store_dir: Option<PathBuf>,
}

// Default value functions
fn default_poll_interval_ms() -> u64 {
    2000
}

fn default_tick_interval_ms() -> u64 {
    200
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            tick_interval_ms: default_tick_interval_ms(),
            store_dir: None,
        }
    }
}

impl SyncConfig {
    /// Poll interval as a duration.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    /// Tick interval as a duration.
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms.max(1))
    }
}

impl Config {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or validated.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load `path` if given, else the default file if it exists, else defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = path {
            return Self::from_file(path);
        }
        match default_config_path() {
            Some(path) if path.exists() => Self::from_file(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Check timer settings and schedule rules.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.timer
            .validate()
            .map_err(|e| ConfigError::Invalid(format!("[timer]: {}", e)))?;
        self.schedule_evaluator()?;
        Ok(())
    }

    /// Build an evaluator over the configured rules.
    pub fn schedule_evaluator(&self) -> Result<ScheduleEvaluator, ConfigError> {
        ScheduleEvaluator::new(self.schedules.clone())
            .map_err(|e| ConfigError::Invalid(format!("[[schedules]]: {}", e)))
    }

    /// A starter configuration with one disabled example rule.
    pub fn starter() -> Self {
        Self {
            schedules: vec![ScheduleRule {
                id: "weekday-morning".into(),
                time: "09:00".into(),
                days: vec![1, 2, 3, 4, 5],
                enabled: false,
                settings: TimerSettings::default(),
                sound: "default".into(),
            }],
            ..Self::default()
        }
    }

    /// Write this configuration as TOML.
    pub fn write(&self, path: &Path) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::WriteError {
                path: path.to_path_buf(),
                source: e,
            })?;
        }
        std::fs::write(path, content).map_err(|e| ConfigError::WriteError {
            path: path.to_path_buf(),
            source: e,
        })
    }
}

/// Platform default location of `flow.toml`.
pub fn default_config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("io", "flowsync", "flow")
        .map(|dirs| dirs.config_dir().join("flow.toml"))
}

/// Platform default session directory.
pub fn default_store_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("io", "flowsync", "flow")
        .map(|dirs| dirs.data_dir().join("sessions"))
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[error("failed to read config file {path}: {source}")]
    ReadError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// Failed to parse configuration file.
    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying TOML parse error.
        source: toml::de::Error,
    },
    /// Failed to write configuration file.
    #[error("failed to write config file {path}: {source}")]
    WriteError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// Failed to encode configuration.
    #[error("failed to encode config: {0}")]
    Encode(#[from] toml::ser::Error),
    /// A value is out of range.
    #[error("invalid config {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn default_config_is_valid() {
        let config = Config::default();
        assert_eq!(config.timer, TimerSettings::default());
        assert_eq!(config.sync.poll_interval(), Duration::from_secs(2));
        assert_eq!(config.sync.tick_interval(), Duration::from_millis(200));
        assert!(config.schedules.is_empty());
        config.validate().unwrap();
    }

    #[test]
    fn config_from_toml_string() {
        let toml = r#"
[timer]
focus_minutes = 50
break_minutes = 10
sessions_per_cycle = 2
long_break_minutes = 30

[sync]
poll_interval_ms = 500
store_dir = "/tmp/flow-sessions"

[[schedules]]
id = "standup"
time = "10:30"
days = [1, 3, 5]

[schedules.settings]
focus_minutes = 15
break_minutes = 3
sessions_per_cycle = 1
"#;

        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.timer.focus_minutes, 50);
        assert_eq!(config.timer.long_break_minutes, Some(30));
        assert_eq!(config.sync.poll_interval_ms, 500);
        assert_eq!(config.sync.tick_interval_ms, 200);
        assert_eq!(
            config.sync.store_dir,
            Some(PathBuf::from("/tmp/flow-sessions"))
        );
        assert_eq!(config.schedules.len(), 1);
        assert!(config.schedules[0].enabled);
        assert_eq!(config.schedules[0].sound, "default");
        config.validate().unwrap();
    }

    #[test]
    fn empty_file_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn starter_round_trips_through_a_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("flow.toml");

        Config::starter().write(&path).unwrap();
        let loaded = Config::from_file(&path).unwrap();

        assert_eq!(loaded, Config::starter());
    }

    #[test]
    fn invalid_schedule_time_is_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("flow.toml");
        std::fs::write(
            &path,
            r#"
[[schedules]]
id = "bad"
time = "25:00"
days = [1]

[schedules.settings]
focus_minutes = 25
break_minutes = 5
sessions_per_cycle = 4
"#,
        )
        .unwrap();

        let result = Config::from_file(&path);
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn zero_focus_is_rejected() {
        let config: Config = toml::from_str(
            r#"
[timer]
focus_minutes = 0
break_minutes = 5
sessions_per_cycle = 4
"#,
        )
        .unwrap();

        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let dir = tempdir().unwrap();
        let result = Config::from_file(&dir.path().join("absent.toml"));
        assert!(matches!(result, Err(ConfigError::ReadError { .. })));
    }

    #[test]
    fn explicit_path_wins_over_default() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("flow.toml");
        std::fs::write(&path, "[sync]\ntick_interval_ms = 1000\n").unwrap();

        let config = Config::load(Some(&path)).unwrap();

        assert_eq!(config.sync.tick_interval_ms, 1000);
    }
}
