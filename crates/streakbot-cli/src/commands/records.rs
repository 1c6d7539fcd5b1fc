use clap::Subcommand;
use streakbot_core::{CoreError, WeeklyGoals};

use super::{load_config, open_store, print_json, resolve_group, CliResult};

#[derive(Subcommand)]
pub enum RecordAction {
    /// Register (or re-register) a member with goals for Monday..Sunday
    Register {
        username: String,
        /// Seven whole numbers, Monday first
        #[arg(num_args = 1.., allow_hyphen_values = true)]
        goals: Vec<String>,
    },
    /// Replace a member's weekly goals, keeping streak and progress
    Modify {
        username: String,
        #[arg(num_args = 1.., allow_hyphen_values = true)]
        goals: Vec<String>,
    },
    /// Log one completed task for today
    Checkin { username: String },
    /// Pause tracking for a number of days
    Optout {
        username: String,
        #[arg(allow_hyphen_values = true)]
        days: i64,
    },
    /// Resume tracking immediately
    Optin { username: String },
    /// Show a member's record
    Show { username: String },
}

pub fn run(action: RecordAction, group: Option<i64>) -> CliResult {
    let config = load_config()?;
    let group_id = resolve_group(&config, group);
    let store = open_store()?;

    let username = match action {
        RecordAction::Register { username, goals } => {
            let goals = WeeklyGoals::parse_args(&goals)?;
            store.register(&username, group_id, &goals)?;
            username
        }
        RecordAction::Modify { username, goals } => {
            let goals = WeeklyGoals::parse_args(&goals)?;
            if !store.modify_goals(&username, group_id, &goals)? {
                return Err(not_registered(username, group_id));
            }
            username
        }
        RecordAction::Checkin { username } => {
            store.require(&username, group_id)?;
            store.check_in(&username, group_id)?;
            username
        }
        RecordAction::Optout { username, days } => {
            if !store.opt_out(&username, group_id, days)? {
                return Err(not_registered(username, group_id));
            }
            username
        }
        RecordAction::Optin { username } => {
            if !store.opt_in(&username, group_id)? {
                return Err(not_registered(username, group_id));
            }
            username
        }
        RecordAction::Show { username } => username,
    };

    print_json(&store.require(&username, group_id)?)
}

fn not_registered(username: String, group_id: i64) -> Box<dyn std::error::Error> {
    CoreError::NotRegistered { username, group_id }.into()
}
