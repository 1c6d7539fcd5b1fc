mod config;
pub mod database;
pub mod migrations;

pub use config::{Config, GroupConfig, QuoteConfig, RolloverConfig, ScheduleConfig};
pub use database::GoalStore;

use std::path::PathBuf;

use crate::error::ConfigError;

/// Returns `~/.config/streakbot[-dev]/` based on STREAKBOT_ENV.
///
/// Set STREAKBOT_ENV=dev to use the development data directory, or
/// STREAKBOT_DATA_DIR to point somewhere else entirely.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> Result<PathBuf, ConfigError> {
    let dir = match std::env::var_os("STREAKBOT_DATA_DIR") {
        Some(explicit) => PathBuf::from(explicit),
        None => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");

            let env =
                std::env::var("STREAKBOT_ENV").unwrap_or_else(|_| "production".to_string());

            if env == "dev" {
                base_dir.join("streakbot-dev")
            } else {
                base_dir.join("streakbot")
            }
        }
    };

    std::fs::create_dir_all(&dir)
        .map_err(|e| ConfigError::DataDir(format!("{}: {e}", dir.display())))?;
    Ok(dir)
}
