mod config;
pub mod migrations;
pub mod rest;
pub mod sqlite;
pub mod store;

pub use config::{
    default_habits, Config, FocusConfig, HabitsConfig, ProgressConfig, StoreBackend, StoreConfig,
    MAX_HISTORY_DAYS,
};
pub use rest::{RestConfig, RestStore};
pub use sqlite::SqliteStore;
pub use store::Store;

use std::path::PathBuf;

use crate::error::ConfigError;

/// Returns `~/.config/alphamind[-dev]/` based on ALPHAMIND_ENV.
///
/// Set ALPHAMIND_ENV=dev to use the development data directory, or
/// ALPHAMIND_DATA_DIR to point somewhere else entirely.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> Result<PathBuf, ConfigError> {
    let dir = match std::env::var_os("ALPHAMIND_DATA_DIR") {
        Some(dir) if !dir.is_empty() => PathBuf::from(dir),
        _ => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");

            let env = std::env::var("ALPHAMIND_ENV").unwrap_or_else(|_| "production".to_string());

            if env == "dev" {
                base_dir.join("alphamind-dev")
            } else {
                base_dir.join("alphamind")
            }
        }
    };

    std::fs::create_dir_all(&dir)
        .map_err(|e| ConfigError::DataDir(format!("{}: {e}", dir.display())))?;
    Ok(dir)
}
