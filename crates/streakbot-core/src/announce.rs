//! Scheduled announcements.
//!
//! Message composition for the morning and midnight posts, and the
//! [`Announcer`] seam through which they leave the process.

use chrono::Weekday;
use std::sync::{Arc, Mutex, PoisonError};

use crate::error::Result;
use crate::query::{DailyGoal, LeaderboardEntry, QueryFacade};

/// Delivers a message to a chat group.
pub trait Announcer: Send + Sync {
    /// # Errors
    /// Returns [`crate::CoreError::Announce`] when the message could not be
    /// delivered.
    fn announce(&self, group_id: i64, text: &str) -> Result<()>;
}

/// Writes announcements to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogAnnouncer;

impl Announcer for LogAnnouncer {
    fn announce(&self, group_id: i64, text: &str) -> Result<()> {
        tracing::info!(group_id, "announcement:\n{text}");
        Ok(())
    }
}

/// Prints announcements on stdout.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdoutAnnouncer;

impl Announcer for StdoutAnnouncer {
    fn announce(&self, group_id: i64, text: &str) -> Result<()> {
        println!("[group {group_id}]\n{text}\n");
        Ok(())
    }
}

/// Keeps every announcement in memory.
#[derive(Debug, Default)]
pub struct RecordingAnnouncer {
    sent: Mutex<Vec<(i64, String)>>,
}

impl RecordingAnnouncer {
    pub fn sent(&self) -> Vec<(i64, String)> {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Announcer for RecordingAnnouncer {
    fn announce(&self, group_id: i64, text: &str) -> Result<()> {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((group_id, text.to_string()));
        Ok(())
    }
}

pub fn morning_message(goals: &[DailyGoal], punished: &[String], quote: &str) -> String {
    let goal_lines = goals
        .iter()
        .map(|g| format!("@{}: {} tasks today", g.username, g.goal))
        .collect::<Vec<_>>()
        .join("\n");
    let punishment_lines = punished
        .iter()
        .map(|user| {
            format!("@{user} has to add 2K steps today since they didn't complete their goals.")
        })
        .collect::<Vec<_>>()
        .join("\n");

    format!("🌞 Good Morning!\n\nToday's Goals:\n{goal_lines}\n\n{punishment_lines}\n\n💪 {quote}")
}

pub fn leaderboard_message(entries: &[LeaderboardEntry]) -> String {
    let lines = entries
        .iter()
        .map(|e| format!("@{}: {} day streak", e.username, e.current_streak))
        .collect::<Vec<_>>()
        .join("\n");
    format!("🌙 End of Day Leaderboard:\n\n{lines}")
}

/// Builds and sends the two daily posts for one group.
pub struct Announcements {
    queries: QueryFacade,
    announcer: Arc<dyn Announcer>,
}

impl Announcements {
    pub fn new(queries: QueryFacade, announcer: Arc<dyn Announcer>) -> Self {
        Self { queries, announcer }
    }

    /// Post today's goals and yesterday's misses.
    ///
    /// Punishment flags are cleared only once the message went out, so a
    /// failed delivery leaves them for the next attempt.
    pub fn morning(&self, group_id: i64, today: Weekday, quote: &str) -> Result<()> {
        let goals = self.queries.todays_goals(group_id, today)?;
        let punished = self.queries.punished_users(group_id)?;
        let text = morning_message(&goals, &punished, quote);

        self.announcer.announce(group_id, &text)?;
        if !punished.is_empty() {
            self.queries.reset_punishments(group_id)?;
        }
        tracing::info!(
            group_id,
            day = %today,
            users = goals.len(),
            punished = punished.len(),
            "morning announcement sent"
        );
        Ok(())
    }

    /// Post the current leaderboard.
    pub fn leaderboard(&self, group_id: i64) -> Result<()> {
        let entries = self.queries.leaderboard(group_id)?;
        self.announcer
            .announce(group_id, &leaderboard_message(&entries))?;
        tracing::info!(group_id, users = entries.len(), "leaderboard sent");
        Ok(())
    }
}
