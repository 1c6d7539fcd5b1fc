//! Daily rollover engine.
//!
//! Once per day every goal record is evaluated against the goal of the day
//! that just ended, then today's counter and the opt-out window roll over.
//! All of that happens in one `BEGIN IMMEDIATE` transaction while holding
//! the store lock, so nobody observes a half-rolled day. Lock contention is
//! retried a bounded number of times; any other failure ends the run.

use chrono::Weekday;
use rusqlite::{params, TransactionBehavior};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use crate::error::{CoreError, DatabaseError, Result};
use crate::goals::DayOutcome;
use crate::storage::database::{row_to_record, RECORD_COLUMNS};
use crate::storage::GoalStore;

/// Bounded retry for the rollover transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::from_millis(500),
        }
    }
}

/// What one rollover did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RolloverSummary {
    pub ending_day: Weekday,
    pub records: usize,
    pub met: usize,
    pub missed: usize,
    pub frozen: usize,
    /// Attempt that committed, starting at 1.
    pub attempt: u32,
}

/// Applies the daily transition to the whole store.
pub struct RolloverEngine {
    store: Arc<GoalStore>,
    policy: RetryPolicy,
}

impl RolloverEngine {
    pub fn new(store: Arc<GoalStore>) -> Self {
        Self {
            store,
            policy: RetryPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = RetryPolicy {
            max_attempts: policy.max_attempts.max(1),
            ..policy
        };
        self
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Close `ending_day` for every record in the store.
    ///
    /// Blocks the calling thread while waiting between attempts; async
    /// callers should use `spawn_blocking`.
    ///
    /// # Errors
    /// Returns [`CoreError::RolloverFailed`] when contention outlasts the
    /// retry budget or the database fails in any other way. In both cases
    /// nothing has been written.
    pub fn run(&self, ending_day: Weekday) -> Result<RolloverSummary> {
        let mut attempt = 1;
        loop {
            match self.apply(ending_day, attempt) {
                Ok(summary) => {
                    tracing::info!(
                        day = %ending_day,
                        records = summary.records,
                        met = summary.met,
                        missed = summary.missed,
                        frozen = summary.frozen,
                        attempt,
                        "daily rollover committed"
                    );
                    return Ok(summary);
                }
                Err(err) if err.is_contention() && attempt < self.policy.max_attempts => {
                    tracing::warn!(
                        day = %ending_day,
                        attempt,
                        max_attempts = self.policy.max_attempts,
                        "store busy during rollover, retrying in {:?}",
                        self.policy.delay
                    );
                    std::thread::sleep(self.policy.delay);
                    attempt += 1;
                }
                Err(source) => {
                    tracing::error!(day = %ending_day, attempt, "daily rollover abandoned: {source}");
                    return Err(CoreError::RolloverFailed {
                        attempts: attempt,
                        source,
                    });
                }
            }
        }
    }

    fn apply(&self, ending_day: Weekday, attempt: u32) -> Result<RolloverSummary, DatabaseError> {
        let mut conn = self.store.lock();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let records = {
            let mut stmt = tx.prepare(&format!("SELECT {RECORD_COLUMNS} FROM goal_records"))?;
            let rows = stmt.query_map([], row_to_record)?;
            rows.collect::<rusqlite::Result<Vec<_>>>()?
        };

        let mut summary = RolloverSummary {
            ending_day,
            records: records.len(),
            met: 0,
            missed: 0,
            frozen: 0,
            attempt,
        };

        {
            let mut update = tx.prepare(
                "UPDATE goal_records
                 SET current_streak = ?3, today_tasks = ?4, opt_out_days = ?5, punishment = ?6
                 WHERE username = ?1 AND group_id = ?2",
            )?;
            for record in &records {
                let (next, outcome) = record.rolled_over(ending_day);
                match outcome {
                    DayOutcome::Met => summary.met += 1,
                    DayOutcome::Missed => summary.missed += 1,
                    DayOutcome::Frozen => summary.frozen += 1,
                }
                update.execute(params![
                    next.username,
                    next.group_id,
                    next.current_streak,
                    next.today_tasks,
                    next.opt_out_days,
                    next.punishment,
                ])?;
            }
        }

        tx.commit()?;
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::goals::WeeklyGoals;

    fn engine() -> (Arc<GoalStore>, RolloverEngine) {
        let store = Arc::new(GoalStore::open_in_memory().unwrap());
        let engine = RolloverEngine::new(Arc::clone(&store));
        (store, engine)
    }

    #[test]
    fn empty_store_rolls_over() {
        let (_, engine) = engine();
        let summary = engine.run(Weekday::Mon).unwrap();
        assert_eq!(summary.records, 0);
        assert_eq!(summary.attempt, 1);
    }

    #[test]
    fn counts_outcomes_across_groups() {
        let (store, engine) = engine();
        store.register("alice", 1, &WeeklyGoals::uniform(1)).unwrap();
        store.register("bob", 1, &WeeklyGoals::uniform(5)).unwrap();
        store.register("carol", 2, &WeeklyGoals::uniform(1)).unwrap();
        store.check_in("alice", 1).unwrap();
        store.opt_out("carol", 2, 1).unwrap();

        let summary = engine.run(Weekday::Tue).unwrap();
        assert_eq!(summary.records, 3);
        assert_eq!((summary.met, summary.missed, summary.frozen), (1, 1, 1));

        let carol = store.get("carol", 2).unwrap().unwrap();
        assert_eq!(carol.opt_out_days, 0);
        assert!(!carol.punishment);
    }

    #[test]
    fn policy_never_drops_below_one_attempt() {
        let (_, engine) = engine();
        let engine = engine.with_policy(RetryPolicy {
            max_attempts: 0,
            delay: Duration::ZERO,
        });
        assert_eq!(engine.policy().max_attempts, 1);
    }
}
