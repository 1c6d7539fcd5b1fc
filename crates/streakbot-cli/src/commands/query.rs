use chrono::{Datelike, Weekday};
use clap::Subcommand;
use serde::Serialize;
use streakbot_core::QueryFacade;

use super::{load_config, local_now, open_store, print_json, resolve_group, CliResult};

#[derive(Subcommand)]
pub enum QueryAction {
    /// Goals of every active member for a day
    Goals {
        /// Weekday, e.g. "mon" (defaults to today in the configured offset)
        #[arg(long)]
        day: Option<Weekday>,
    },
    /// Members ordered by current streak
    Leaderboard,
    /// Members who missed their last goal
    Punished,
    /// Clear every punishment flag in the group
    ResetPunishments,
}

#[derive(Serialize)]
struct ResetReport {
    group_id: i64,
    cleared: usize,
}

pub fn run(action: QueryAction, group: Option<i64>) -> CliResult {
    let config = load_config()?;
    let group_id = resolve_group(&config, group);
    let queries = QueryFacade::new(open_store()?);

    match action {
        QueryAction::Goals { day } => {
            let day = match day {
                Some(day) => day,
                None => local_now(&config)?.weekday(),
            };
            print_json(&queries.todays_goals(group_id, day)?)
        }
        QueryAction::Leaderboard => print_json(&queries.leaderboard(group_id)?),
        QueryAction::Punished => print_json(&queries.punished_users(group_id)?),
        QueryAction::ResetPunishments => {
            let cleared = queries.reset_punishments(group_id)?;
            print_json(&ResetReport { group_id, cleared })
        }
    }
}
