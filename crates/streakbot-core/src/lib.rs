//! # Streakbot Core Library
//!
//! Daily goal tracking for the members of one chat group: everybody registers
//! a check-in target per weekday, logs tasks with `+1`, and once a day the
//! rollover turns the day's progress into streaks and punishments.
//!
//! ## Architecture
//!
//! - **Goal store**: SQLite-backed [`GoalRecord`] per (username, group)
//! - **Rollover engine**: the once-a-day transaction over every record, with
//!   bounded retry on lock contention
//! - **Query façade**: leaderboard, punished users and today's goals for the
//!   announcements
//! - **Chat / scheduler / announcements**: the glue the CLI host wires up
//!
//! ## Key Components
//!
//! - [`GoalStore`]: Record persistence
//! - [`RolloverEngine`]: Daily state transition
//! - [`QueryFacade`]: Read-side projections
//! - [`Scheduler`]: Morning and midnight jobs
//! - [`Config`]: Application configuration management

pub mod announce;
pub mod chat;
pub mod error;
pub mod goals;
pub mod query;
pub mod quote;
pub mod rollover;
pub mod scheduler;
pub mod storage;

pub use announce::{Announcements, Announcer, LogAnnouncer, RecordingAnnouncer, StdoutAnnouncer};
pub use chat::{ChatCommand, ChatMessage, CommandHandler};
pub use error::{ConfigError, CoreError, DatabaseError, ValidationError};
pub use goals::{DayOutcome, GoalRecord, WeeklyGoals};
pub use query::{DailyGoal, LeaderboardEntry, QueryFacade};
pub use quote::QuoteClient;
pub use rollover::{RetryPolicy, RolloverEngine, RolloverSummary};
pub use scheduler::{DailyTrigger, Job, Scheduler};
pub use storage::{Config, GoalStore};
