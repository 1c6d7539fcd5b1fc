//! SQLite-backed goal record store.
//!
//! Provides persistent storage for one [`GoalRecord`] per (username, group).
//! Every operation goes through a single connection guarded by a mutex, so
//! command handlers and the scheduler never interleave inside a statement
//! sequence. The rollover engine holds the same lock for its whole
//! transaction.

use rusqlite::{params, Connection, OptionalExtension};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use super::{data_dir, migrations};
use crate::error::{CoreError, DatabaseError, Result, ValidationError};
use crate::goals::{GoalRecord, WeeklyGoals};

/// Database file name inside the data directory.
pub const DB_FILE: &str = "streakbot.db";

/// How long a statement waits on another writer before reporting `Locked`.
const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_millis(250);

pub(crate) const RECORD_COLUMNS: &str = "username, group_id, monday_goal, tuesday_goal,
    wednesday_goal, thursday_goal, friday_goal, saturday_goal, sunday_goal,
    current_streak, today_tasks, opt_out_days, punishment";

/// Build a GoalRecord from a row selected with [`RECORD_COLUMNS`].
pub(crate) fn row_to_record(row: &rusqlite::Row) -> rusqlite::Result<GoalRecord> {
    let mut goals = [0u32; 7];
    for (i, slot) in goals.iter_mut().enumerate() {
        *slot = row.get(2 + i)?;
    }
    Ok(GoalRecord {
        username: row.get(0)?,
        group_id: row.get(1)?,
        weekly_goals: WeeklyGoals::new(goals),
        current_streak: row.get(9)?,
        today_tasks: row.get(10)?,
        opt_out_days: row.get(11)?,
        punishment: row.get(12)?,
    })
}

/// Persistent store of goal records.
pub struct GoalStore {
    conn: Mutex<Connection>,
    path: Option<PathBuf>,
}

impl GoalStore {
    /// Open the store at `<data_dir>/streakbot.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the data directory cannot be resolved or the
    /// database cannot be opened or migrated.
    pub fn open() -> Result<Self> {
        let path = data_dir()?.join(DB_FILE);
        Self::open_at(path)
    }

    /// Open the store at an explicit path.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open_at(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let conn = Connection::open(&path).map_err(|source| DatabaseError::OpenFailed {
            path: path.clone(),
            source,
        })?;
        let store = Self::from_connection(conn, Some(path))?;
        tracing::debug!(path = ?store.path, "goal store opened");
        Ok(store)
    }

    /// Open an in-memory store (tests and dry runs).
    ///
    /// # Errors
    /// Returns an error if the schema cannot be created.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::from_connection(conn, None)
    }

    fn from_connection(conn: Connection, path: Option<PathBuf>) -> Result<Self> {
        conn.busy_timeout(DEFAULT_BUSY_TIMEOUT)?;
        migrations::migrate(&conn)
            .map_err(|e| DatabaseError::MigrationFailed(e.to_string()))?;
        Ok(Self {
            conn: Mutex::new(conn),
            path,
        })
    }

    /// Change how long statements wait for a competing writer.
    ///
    /// # Errors
    /// Returns an error if SQLite rejects the setting.
    pub fn set_busy_timeout(&self, timeout: Duration) -> Result<()> {
        self.lock().busy_timeout(timeout)?;
        Ok(())
    }

    /// Location of the database file, `None` when in memory.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Exclusive access to the connection.
    ///
    /// A panic while holding the lock cannot leave a transaction open
    /// (rusqlite rolls back on drop), so a poisoned lock is still usable.
    pub(crate) fn lock(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Create or replace the record for (username, group).
    ///
    /// Registration is destructive: streak, today's tasks, opt-out and
    /// punishment all start from zero again.
    pub fn register(&self, username: &str, group_id: i64, goals: &WeeklyGoals) -> Result<()> {
        let g = goals.as_array();
        self.lock().execute(
            "INSERT OR REPLACE INTO goal_records (
                username, group_id, monday_goal, tuesday_goal, wednesday_goal,
                thursday_goal, friday_goal, saturday_goal, sunday_goal,
                current_streak, today_tasks, opt_out_days, punishment
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, 0, 0, 0, 0)",
            params![username, group_id, g[0], g[1], g[2], g[3], g[4], g[5], g[6]],
        )?;
        tracing::info!(username, group_id, goals = %goals, "registered goals");
        Ok(())
    }

    /// Replace the weekly goals of an existing record.
    ///
    /// Streak, progress, opt-out and punishment are left alone. Returns
    /// `false` (and changes nothing) when the record does not exist.
    pub fn modify_goals(&self, username: &str, group_id: i64, goals: &WeeklyGoals) -> Result<bool> {
        let g = goals.as_array();
        let changed = self.lock().execute(
            "UPDATE goal_records
             SET monday_goal = ?3, tuesday_goal = ?4, wednesday_goal = ?5,
                 thursday_goal = ?6, friday_goal = ?7, saturday_goal = ?8, sunday_goal = ?9
             WHERE username = ?1 AND group_id = ?2",
            params![username, group_id, g[0], g[1], g[2], g[3], g[4], g[5], g[6]],
        )?;
        if changed > 0 {
            tracing::info!(username, group_id, goals = %goals, "modified goals");
        }
        Ok(changed > 0)
    }

    pub fn exists(&self, username: &str, group_id: i64) -> Result<bool> {
        let found = self
            .lock()
            .query_row(
                "SELECT 1 FROM goal_records WHERE username = ?1 AND group_id = ?2",
                params![username, group_id],
                |_| Ok(()),
            )
            .optional()?;
        Ok(found.is_some())
    }

    /// Log one completed task for today.
    ///
    /// While the user is opted out this is a no-op that still returns
    /// `Ok(())`; callers cannot tell the two cases apart from the result.
    pub fn check_in(&self, username: &str, group_id: i64) -> Result<()> {
        let changed = self.lock().execute(
            "UPDATE goal_records
             SET today_tasks = today_tasks + 1
             WHERE username = ?1 AND group_id = ?2 AND opt_out_days = 0",
            params![username, group_id],
        )?;
        tracing::debug!(username, group_id, counted = changed > 0, "check-in");
        Ok(())
    }

    /// Suspend tracking for `days` rollovers. Overwrites any running window.
    ///
    /// Returns `false` when the record does not exist.
    ///
    /// # Errors
    /// Returns [`ValidationError::NonPositiveOptOut`] when `days < 1`.
    pub fn opt_out(&self, username: &str, group_id: i64, days: i64) -> Result<bool> {
        let days = u32::try_from(days)
            .ok()
            .filter(|d| *d > 0)
            .ok_or(ValidationError::NonPositiveOptOut { days })?;
        let changed = self.lock().execute(
            "UPDATE goal_records SET opt_out_days = ?3 WHERE username = ?1 AND group_id = ?2",
            params![username, group_id, days],
        )?;
        if changed > 0 {
            tracing::info!(username, group_id, days, "opted out");
        }
        Ok(changed > 0)
    }

    /// End any opt-out window immediately.
    ///
    /// Returns `false` when the record does not exist.
    pub fn opt_in(&self, username: &str, group_id: i64) -> Result<bool> {
        let changed = self.lock().execute(
            "UPDATE goal_records SET opt_out_days = 0 WHERE username = ?1 AND group_id = ?2",
            params![username, group_id],
        )?;
        if changed > 0 {
            tracing::info!(username, group_id, "opted in");
        }
        Ok(changed > 0)
    }

    pub fn get(&self, username: &str, group_id: i64) -> Result<Option<GoalRecord>> {
        let conn = self.lock();
        let record = conn
            .query_row(
                &format!(
                    "SELECT {RECORD_COLUMNS} FROM goal_records
                     WHERE username = ?1 AND group_id = ?2"
                ),
                params![username, group_id],
                row_to_record,
            )
            .optional()?;
        Ok(record)
    }

    /// Same as [`GoalStore::get`] but a missing record is an error.
    pub fn require(&self, username: &str, group_id: i64) -> Result<GoalRecord> {
        self.get(username, group_id)?
            .ok_or_else(|| CoreError::NotRegistered {
                username: username.to_string(),
                group_id,
            })
    }

    /// All records of a group, ordered by username.
    pub fn list(&self, group_id: i64) -> Result<Vec<GoalRecord>> {
        let conn = self.lock();
        let mut stmt = conn.prepare(&format!(
            "SELECT {RECORD_COLUMNS} FROM goal_records WHERE group_id = ?1 ORDER BY username"
        ))?;
        let records = stmt
            .query_map(params![group_id], row_to_record)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(records)
    }
}
