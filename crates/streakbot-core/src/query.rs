//! Read-side projections for the scheduled announcements.
//!
//! The weekday is always passed in by the caller so a query and the rollover
//! that precedes it can never disagree about which day it is.

use chrono::Weekday;
use rusqlite::params;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::Result;
use crate::storage::GoalStore;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub username: String,
    pub current_streak: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyGoal {
    pub username: String,
    pub goal: u32,
}

/// Column holding the goal for `day`.
fn goal_column(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "monday_goal",
        Weekday::Tue => "tuesday_goal",
        Weekday::Wed => "wednesday_goal",
        Weekday::Thu => "thursday_goal",
        Weekday::Fri => "friday_goal",
        Weekday::Sat => "saturday_goal",
        Weekday::Sun => "sunday_goal",
    }
}

pub struct QueryFacade {
    store: Arc<GoalStore>,
}

impl QueryFacade {
    pub fn new(store: Arc<GoalStore>) -> Self {
        Self { store }
    }

    /// Users of a group by streak, longest first.
    ///
    /// Equal streaks come back in whatever order SQLite yields them.
    pub fn leaderboard(&self, group_id: i64) -> Result<Vec<LeaderboardEntry>> {
        let conn = self.store.lock();
        let mut stmt = conn.prepare(
            "SELECT username, current_streak FROM goal_records
             WHERE group_id = ?1
             ORDER BY current_streak DESC",
        )?;
        let entries = stmt
            .query_map(params![group_id], |row| {
                Ok(LeaderboardEntry {
                    username: row.get(0)?,
                    current_streak: row.get(1)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(entries)
    }

    /// Users who missed their last evaluated goal and have not been
    /// announced yet.
    pub fn punished_users(&self, group_id: i64) -> Result<Vec<String>> {
        let conn = self.store.lock();
        let mut stmt = conn.prepare(
            "SELECT username FROM goal_records
             WHERE group_id = ?1 AND punishment = 1
             ORDER BY username",
        )?;
        let users = stmt
            .query_map(params![group_id], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(users)
    }

    /// Goal for `day` of every user in the group who is not opted out.
    pub fn todays_goals(&self, group_id: i64, day: Weekday) -> Result<Vec<DailyGoal>> {
        let conn = self.store.lock();
        let mut stmt = conn.prepare(&format!(
            "SELECT username, {} FROM goal_records
             WHERE group_id = ?1 AND opt_out_days = 0
             ORDER BY username",
            goal_column(day)
        ))?;
        let goals = stmt
            .query_map(params![group_id], |row| {
                Ok(DailyGoal {
                    username: row.get(0)?,
                    goal: row.get(1)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(goals)
    }

    /// Clear every punishment flag of the group. Returns how many were set.
    pub fn reset_punishments(&self, group_id: i64) -> Result<usize> {
        let cleared = self.store.lock().execute(
            "UPDATE goal_records SET punishment = 0 WHERE group_id = ?1 AND punishment = 1",
            params![group_id],
        )?;
        tracing::debug!(group_id, cleared, "punishments reset");
        Ok(cleared)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::goals::WeeklyGoals;
    use crate::rollover::RolloverEngine;

    fn setup() -> (Arc<GoalStore>, QueryFacade) {
        let store = Arc::new(GoalStore::open_in_memory().unwrap());
        (Arc::clone(&store), QueryFacade::new(store))
    }

    #[test]
    fn leaderboard_orders_by_streak() {
        let (store, queries) = setup();
        for name in ["low", "high", "mid"] {
            store.register(name, 1, &WeeklyGoals::uniform(0)).unwrap();
        }
        store
            .lock()
            .execute_batch(
                "UPDATE goal_records SET current_streak = 10 WHERE username = 'high';
                 UPDATE goal_records SET current_streak = 4 WHERE username = 'mid';",
            )
            .unwrap();

        let board: Vec<_> = queries
            .leaderboard(1)
            .unwrap()
            .into_iter()
            .map(|e| (e.username, e.current_streak))
            .collect();
        assert_eq!(
            board,
            vec![
                ("high".to_string(), 10),
                ("mid".to_string(), 4),
                ("low".to_string(), 0)
            ]
        );
    }

    #[test]
    fn todays_goals_skips_opted_out_users() {
        let (store, queries) = setup();
        store
            .register("alice", 1, &WeeklyGoals::new([1, 2, 3, 4, 5, 6, 7]))
            .unwrap();
        store.register("bob", 1, &WeeklyGoals::uniform(9)).unwrap();
        store.opt_out("bob", 1, 1).unwrap();

        let goals = queries.todays_goals(1, Weekday::Fri).unwrap();
        assert_eq!(
            goals,
            vec![DailyGoal {
                username: "alice".to_string(),
                goal: 5
            }]
        );
    }

    #[test]
    fn punishments_are_read_once() {
        let (store, queries) = setup();
        store.register("bob", 1, &WeeklyGoals::uniform(3)).unwrap();
        store.register("eve", 2, &WeeklyGoals::uniform(3)).unwrap();
        RolloverEngine::new(Arc::clone(&store))
            .run(Weekday::Mon)
            .unwrap();

        assert_eq!(queries.punished_users(1).unwrap(), vec!["bob".to_string()]);
        assert_eq!(queries.reset_punishments(1).unwrap(), 1);
        assert!(queries.punished_users(1).unwrap().is_empty());
        // other groups keep their flags
        assert_eq!(queries.punished_users(2).unwrap(), vec!["eve".to_string()]);
    }
}
