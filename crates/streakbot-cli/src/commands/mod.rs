use std::sync::Arc;

use chrono::{DateTime, FixedOffset, Utc};
use streakbot_core::{Config, GoalStore};

pub mod config;
pub mod query;
pub mod records;
pub mod rollover;
pub mod serve;

pub type CliResult = Result<(), Box<dyn std::error::Error>>;

/// Config with env overrides applied.
pub fn load_config() -> Result<Config, Box<dyn std::error::Error>> {
    Ok(Config::load()?.with_env_overrides()?)
}

/// `--group` if given, else the configured group.
pub fn resolve_group(config: &Config, group: Option<i64>) -> i64 {
    group.unwrap_or(config.group.allowed_id)
}

pub fn open_store() -> Result<Arc<GoalStore>, Box<dyn std::error::Error>> {
    Ok(Arc::new(GoalStore::open()?))
}

/// Current time in the configured offset.
pub fn local_now(config: &Config) -> Result<DateTime<FixedOffset>, Box<dyn std::error::Error>> {
    let offset = config.schedule.offset()?;
    Ok(Utc::now().with_timezone(&offset))
}

pub fn print_json<T: serde::Serialize>(value: &T) -> CliResult {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
