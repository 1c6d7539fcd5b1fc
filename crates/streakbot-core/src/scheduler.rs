//! Daily wall-clock scheduler.
//!
//! Two jobs per day, both in one fixed UTC offset: the morning announcement
//! and the rollover (immediately followed by the leaderboard). The logical
//! day each job works on is derived from the instant it was scheduled for,
//! not read from the clock inside the job.

use chrono::{DateTime, Datelike, Duration, FixedOffset, NaiveTime, TimeZone, Utc, Weekday};
use std::fmt;
use std::sync::Arc;

use crate::announce::{Announcements, Announcer};
use crate::error::{ConfigError, Result};
use crate::query::QueryFacade;
use crate::quote::QuoteClient;
use crate::rollover::RolloverEngine;
use crate::storage::{Config, GoalStore};

/// Fires once a day at a local wall-clock time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DailyTrigger {
    pub time: NaiveTime,
}

impl DailyTrigger {
    pub fn new(time: NaiveTime) -> Self {
        Self { time }
    }

    /// First firing strictly after `now`, in `now`'s offset.
    pub fn next_after(&self, now: DateTime<FixedOffset>) -> DateTime<FixedOffset> {
        let offset = *now.offset();
        let today = offset
            .from_local_datetime(&now.date_naive().and_time(self.time))
            .single()
            .unwrap_or(now);
        if today > now {
            today
        } else {
            today + Duration::days(1)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Job {
    Morning,
    Rollover,
}

impl fmt::Display for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Job::Morning => write!(f, "morning announcement"),
            Job::Rollover => write!(f, "daily rollover"),
        }
    }
}

/// The weekday a rollover scheduled at `fired_at` closes.
///
/// A rollover in the first half of the local day closes the previous day
/// (the usual 00:00 case); one in the second half closes the current day.
pub fn ending_day(fired_at: DateTime<FixedOffset>) -> Weekday {
    (fired_at - Duration::hours(12)).weekday()
}

pub struct Scheduler {
    group_id: i64,
    offset: FixedOffset,
    morning: DailyTrigger,
    rollover: DailyTrigger,
    engine: Arc<RolloverEngine>,
    announcements: Announcements,
    quotes: QuoteClient,
}

impl Scheduler {
    /// Wire the scheduler for the configured group.
    ///
    /// # Errors
    /// Returns a config error if no group is configured, if the offset or
    /// times are invalid, or if the two jobs are set to the same time.
    pub fn from_config(
        config: &Config,
        store: Arc<GoalStore>,
        announcer: Arc<dyn Announcer>,
    ) -> Result<Self> {
        if config.group.allowed_id == 0 {
            return Err(ConfigError::InvalidValue {
                key: "group.allowed_id".into(),
                message: "no chat group configured".into(),
            }
            .into());
        }
        let offset = config.schedule.offset()?;
        let morning = DailyTrigger::new(config.schedule.morning_time()?);
        let rollover = DailyTrigger::new(config.schedule.rollover_time()?);
        if morning == rollover {
            return Err(ConfigError::InvalidValue {
                key: "schedule.morning".into(),
                message: "must differ from schedule.rollover".into(),
            }
            .into());
        }

        let engine = RolloverEngine::new(Arc::clone(&store))
            .with_policy(config.rollover.retry_policy());
        Ok(Self {
            group_id: config.group.allowed_id,
            offset,
            morning,
            rollover,
            engine: Arc::new(engine),
            announcements: Announcements::new(QueryFacade::new(store), announcer),
            quotes: QuoteClient::new(&config.quotes),
        })
    }

    /// Which job comes next after `now`, and when.
    ///
    /// `last_fired` is the trigger instant of the previous job. The result is
    /// always strictly later, even if the wall clock has stepped back.
    pub fn next_job(
        &self,
        now: DateTime<FixedOffset>,
        last_fired: Option<DateTime<FixedOffset>>,
    ) -> (Job, DateTime<FixedOffset>) {
        let from = last_fired.map_or(now, |fired| now.max(fired));
        let morning_at = self.morning.next_after(from);
        let rollover_at = self.rollover.next_after(from);
        if rollover_at <= morning_at {
            (Job::Rollover, rollover_at)
        } else {
            (Job::Morning, morning_at)
        }
    }

    /// Run one job as if it fired at `fired_at`.
    ///
    /// # Errors
    /// A failed rollover is returned before the leaderboard is posted, so a
    /// day that was not rolled over is never announced as if it had been.
    pub async fn run_job(&self, job: Job, fired_at: DateTime<FixedOffset>) -> Result<()> {
        match job {
            Job::Morning => {
                let quote = self.quotes.fetch().await;
                self.announcements
                    .morning(self.group_id, fired_at.weekday(), &quote)
            }
            Job::Rollover => {
                let day = ending_day(fired_at);
                let engine = Arc::clone(&self.engine);
                tokio::task::spawn_blocking(move || engine.run(day)).await??;
                self.announcements.leaderboard(self.group_id)
            }
        }
    }

    /// Start the background loop. Job failures are logged and the loop
    /// carries on with the next trigger.
    pub fn spawn(self) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            tracing::info!(
                group_id = self.group_id,
                offset = %self.offset,
                morning = %self.morning.time,
                rollover = %self.rollover.time,
                "scheduler started"
            );
            let mut last_fired = None;
            loop {
                let now = Utc::now().with_timezone(&self.offset);
                let (job, at) = self.next_job(now, last_fired);
                let wait = (at - now).to_std().unwrap_or_default();
                tracing::debug!(%job, at = %at, "next job in {}s", wait.as_secs());
                tokio::time::sleep(wait).await;
                last_fired = Some(at);

                match self.run_job(job, at).await {
                    Ok(()) => tracing::info!(%job, "job finished"),
                    Err(e) => tracing::error!(%job, "job failed for this run: {e}"),
                }
            }
        })
    }
}
