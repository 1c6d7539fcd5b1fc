use chrono::Weekday;
use clap::Args;
use streakbot_core::scheduler::ending_day;
use streakbot_core::RolloverEngine;

use super::{load_config, local_now, open_store, print_json, CliResult};

#[derive(Args)]
pub struct RolloverArgs {
    /// Weekday being closed (defaults to the day the scheduled rollover
    /// would close at this moment)
    #[arg(long)]
    day: Option<Weekday>,
}

/// Rolls over every group in the store, like the scheduled job.
pub fn run(args: RolloverArgs) -> CliResult {
    let config = load_config()?;
    let day = match args.day {
        Some(day) => day,
        None => ending_day(local_now(&config)?),
    };

    let engine = RolloverEngine::new(open_store()?).with_policy(config.rollover.retry_policy());
    let summary = engine.run(day)?;
    print_json(&summary)
}
