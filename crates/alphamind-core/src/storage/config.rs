//! TOML-based application configuration.
//!
//! Stores:
//! - Store backend selection and remote connection settings
//! - The default habit set seeded into every day
//! - Progress tuning (hours per focus cycle, streak threshold, history window)
//! - Focus/break durations for whatever drives the countdown
//!
//! Configuration is stored at `~/.config/alphamind/config.toml`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::data_dir;
use super::rest::RestConfig;
use crate::error::ConfigError;

/// Upper bound on the progress history window.
pub const MAX_HISTORY_DAYS: usize = 30;

/// Which [`Store`](super::Store) implementation to open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Sqlite,
    Rest,
}

/// Store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_backend")]
    pub backend: StoreBackend,
    /// SQLite file name, relative to the data directory.
    #[serde(default = "default_sqlite_file")]
    pub sqlite_file: String,
    /// PostgREST project URL. `ALPHAMIND_SUPABASE_URL` overrides it.
    #[serde(default)]
    pub rest_url: String,
    /// Anon key. `ALPHAMIND_SUPABASE_ANON_KEY` overrides it.
    #[serde(default)]
    pub rest_anon_key: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

/// Habit configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HabitsConfig {
    #[serde(default = "default_habits")]
    pub defaults: Vec<String>,
}

/// Progress configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressConfig {
    /// Hours credited per completed focus cycle (25 min ≈ 0.42 h).
    #[serde(default = "default_hours_per_cycle")]
    pub hours_per_cycle: f64,
    /// Minimum discipline score for a day to count toward the streak.
    #[serde(default = "default_streak_threshold")]
    pub streak_threshold: u32,
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
}

/// Focus countdown configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FocusConfig {
    #[serde(default = "default_focus_minutes")]
    pub focus_minutes: u32,
    #[serde(default = "default_break_minutes")]
    pub break_minutes: u32,
}

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/alphamind/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub habits: HabitsConfig,
    #[serde(default)]
    pub progress: ProgressConfig,
    #[serde(default)]
    pub focus: FocusConfig,
}

// Default functions
fn default_backend() -> StoreBackend {
    StoreBackend::Sqlite
}
fn default_sqlite_file() -> String {
    "alphamind.db".into()
}
fn default_timeout_secs() -> u64 {
    15
}
fn default_hours_per_cycle() -> f64 {
    0.42
}
fn default_streak_threshold() -> u32 {
    50
}
fn default_history_limit() -> usize {
    MAX_HISTORY_DAYS
}
fn default_focus_minutes() -> u32 {
    25
}
fn default_break_minutes() -> u32 {
    5
}

/// The eight habits every user starts with: three to eliminate, five to adopt.
pub fn default_habits() -> Vec<String> {
    [
        "Eliminate alcohol",
        "Avoid parties",
        "Reduce social media",
        "Exercise daily",
        "Read 30min/day",
        "Meditate 10min",
        "Wake up at 6am",
        "Plan the day",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            sqlite_file: default_sqlite_file(),
            rest_url: String::new(),
            rest_anon_key: String::new(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for HabitsConfig {
    fn default() -> Self {
        Self {
            defaults: default_habits(),
        }
    }
}

impl Default for ProgressConfig {
    fn default() -> Self {
        Self {
            hours_per_cycle: default_hours_per_cycle(),
            streak_threshold: default_streak_threshold(),
            history_limit: default_history_limit(),
        }
    }
}

impl Default for FocusConfig {
    fn default() -> Self {
        Self {
            focus_minutes: default_focus_minutes(),
            break_minutes: default_break_minutes(),
        }
    }
}

impl StoreConfig {
    /// Remote connection settings with environment overrides applied.
    pub fn rest_config(&self) -> RestConfig {
        let url = std::env::var("ALPHAMIND_SUPABASE_URL").unwrap_or_else(|_| self.rest_url.clone());
        let anon_key = std::env::var("ALPHAMIND_SUPABASE_ANON_KEY")
            .unwrap_or_else(|_| self.rest_anon_key.clone());
        RestConfig {
            url,
            anon_key,
            timeout: Duration::from_secs(self.timeout_secs),
        }
    }

    /// Absolute path of the SQLite file inside `dir`.
    pub fn sqlite_path(&self, dir: &Path) -> PathBuf {
        dir.join(&self.sqlite_file)
    }
}

impl ProgressConfig {
    /// History window, never more than [`MAX_HISTORY_DAYS`].
    pub fn history_window(&self) -> usize {
        self.history_limit.clamp(1, MAX_HISTORY_DAYS)
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
        if parts.peek().map_or(true, |p| p.is_empty()) {
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
                    serde_json::Value::Number(_) => {
                        if let Ok(n) = value.parse::<u64>() {
                            serde_json::Value::Number(n.into())
                        } else if let Ok(n) = value.parse::<f64>() {
                            serde_json::Number::from_f64(n)
                                .map(serde_json::Value::Number)
                                .ok_or_else(|| invalid(format!("cannot parse '{value}' as number")))?
                        } else {
                            return Err(invalid(format!("cannot parse '{value}' as number")));
                        }
                    }
                    serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
                        serde_json::from_str(value).map_err(|e| invalid(e.to_string()))?
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

    fn path() -> Result<PathBuf, ConfigError> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Load from the data directory or return (and persist) the default.
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
            Err(_) => {
                let cfg = Self::default();
                cfg.save_to(path)?;
                Ok(cfg)
            }
        }
    }

    /// Persist to the data directory.
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

    /// Set a config value by key without persisting. Returns error if the
    /// key is unknown or the value does not fit the field's type.
    pub fn apply(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let invalid = |e: serde_json::Error| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        };
        let mut json = serde_json::to_value(&*self).map_err(invalid)?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        *self = serde_json::from_value(json).map_err(invalid)?;
        Ok(())
    }

    /// Set a config value by key and persist.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown, the value cannot be parsed,
    /// or the config cannot be saved.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        self.apply(key, value)?;
        self.save()
    }

    /// Load from disk, returning default on error.
    /// This is a convenience method that never fails.
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_else(|e| {
            tracing::warn!("falling back to default config: {}", e);
            Self::default()
        })
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
        assert_eq!(parsed.store.backend, StoreBackend::Sqlite);
        assert_eq!(parsed.habits.defaults.len(), 8);
        assert_eq!(parsed.progress.hours_per_cycle, 0.42);
    }

    #[test]
    fn partial_file_fills_defaults() {
        let parsed: Config = toml::from_str(
            "[store]\nbackend = \"rest\"\nrest_url = \"https://example.supabase.co\"\n",
        )
        .unwrap();
        assert_eq!(parsed.store.backend, StoreBackend::Rest);
        assert_eq!(parsed.store.sqlite_file, "alphamind.db");
        assert_eq!(parsed.progress.streak_threshold, 50);
        assert_eq!(parsed.focus.focus_minutes, 25);
    }

    #[test]
    fn get_supports_dot_path_keys() {
        let cfg = Config::default();
        assert_eq!(cfg.get("store.backend").as_deref(), Some("sqlite"));
        assert_eq!(cfg.get("progress.streak_threshold").as_deref(), Some("50"));
        assert!(cfg.get("store.missing_key").is_none());
    }

    #[test]
    fn apply_updates_nested_values() {
        let mut cfg = Config::default();
        cfg.apply("progress.streak_threshold", "75").unwrap();
        cfg.apply("store.backend", "rest").unwrap();
        cfg.apply("progress.hours_per_cycle", "0.5").unwrap();
        cfg.apply("habits.defaults", r#"["Drink water"]"#).unwrap();
        assert_eq!(cfg.progress.streak_threshold, 75);
        assert_eq!(cfg.store.backend, StoreBackend::Rest);
        assert_eq!(cfg.progress.hours_per_cycle, 0.5);
        assert_eq!(cfg.habits.defaults, vec!["Drink water".to_string()]);
    }

    #[test]
    fn apply_rejects_unknown_key() {
        let mut cfg = Config::default();
        let err = cfg.apply("store.nonexistent_key", "value").unwrap_err();
        assert!(matches!(err, ConfigError::UnknownKey(_)));
    }

    #[test]
    fn apply_rejects_invalid_type() {
        let mut cfg = Config::default();
        assert!(cfg.apply("focus.focus_minutes", "soon").is_err());
        assert!(cfg.apply("store.backend", "postgres").is_err());
        assert_eq!(cfg.store.backend, StoreBackend::Sqlite);
    }

    #[test]
    fn history_window_is_capped() {
        let mut cfg = Config::default();
        cfg.progress.history_limit = 365;
        assert_eq!(cfg.progress.history_window(), MAX_HISTORY_DAYS);
        cfg.progress.history_limit = 0;
        assert_eq!(cfg.progress.history_window(), 1);
    }

    #[test]
    fn load_from_missing_file_writes_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let cfg = Config::load_from(&path).unwrap();
        assert!(path.exists());
        assert_eq!(cfg.habits.defaults, default_habits());
    }

    #[test]
    fn load_from_rejects_malformed_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "store = [").unwrap();
        assert!(matches!(
            Config::load_from(&path),
            Err(ConfigError::LoadFailed { .. })
        ));
    }
}
