//! Weekly goals and the per-user goal record.
//!
//! A [`GoalRecord`] is the unit of state the whole bot revolves around. The
//! daily transition of a single record lives here as a pure function
//! ([`GoalRecord::rolled_over`]) so the rollover engine only has to apply it
//! to every row inside one transaction.

use chrono::Weekday;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::ValidationError;

/// Days in the order goals are given: Monday first.
pub const WEEK: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

/// Target check-in counts for Monday through Sunday.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeeklyGoals([u32; 7]);

impl WeeklyGoals {
    pub fn new(goals: [u32; 7]) -> Self {
        Self(goals)
    }

    /// Same goal every day of the week.
    pub fn uniform(goal: u32) -> Self {
        Self([goal; 7])
    }

    /// Parse the seven whitespace-separated arguments of `/register`.
    ///
    /// Each value must be a whole number. Negative numbers parse but are
    /// rejected, so the caller can tell "typo" from "nonsense goal".
    ///
    /// # Errors
    /// Returns a [`ValidationError`] if the count is not 7, a value is not an
    /// integer, or a value is negative.
    pub fn parse_args<S: AsRef<str>>(args: &[S]) -> Result<Self, ValidationError> {
        let mut parsed = Vec::with_capacity(args.len());
        for arg in args {
            let raw = arg.as_ref().trim();
            let value: i64 = raw.parse().map_err(|_| ValidationError::NotAnInteger {
                value: raw.to_string(),
            })?;
            parsed.push(value);
        }
        Self::try_from(parsed.as_slice())
    }

    pub fn for_day(&self, day: Weekday) -> u32 {
        self.0[day.num_days_from_monday() as usize]
    }

    pub fn as_array(&self) -> [u32; 7] {
        self.0
    }
}

impl TryFrom<&[i64]> for WeeklyGoals {
    type Error = ValidationError;

    fn try_from(values: &[i64]) -> Result<Self, Self::Error> {
        if values.len() != 7 {
            return Err(ValidationError::WrongGoalCount { got: values.len() });
        }
        let mut goals = [0u32; 7];
        for (slot, (&value, day)) in goals.iter_mut().zip(values.iter().zip(WEEK)) {
            *slot = u32::try_from(value).map_err(|_| ValidationError::NegativeGoal {
                day: day.to_string(),
                value,
            })?;
        }
        Ok(Self(goals))
    }
}

impl fmt::Display for WeeklyGoals {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(u32::to_string).collect();
        write!(f, "{}", parts.join(" "))
    }
}

/// Everything tracked for one user in one group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GoalRecord {
    pub username: String,
    pub group_id: i64,
    pub weekly_goals: WeeklyGoals,
    pub current_streak: u32,
    pub today_tasks: u32,
    pub opt_out_days: u32,
    pub punishment: bool,
}

/// How a record fared in one rollover.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DayOutcome {
    Met,
    Missed,
    /// Opted out: streak and punishment untouched.
    Frozen,
}

impl GoalRecord {
    /// A freshly registered record: all counters zero.
    pub fn new(username: impl Into<String>, group_id: i64, weekly_goals: WeeklyGoals) -> Self {
        Self {
            username: username.into(),
            group_id,
            weekly_goals,
            current_streak: 0,
            today_tasks: 0,
            opt_out_days: 0,
            punishment: false,
        }
    }

    pub fn is_opted_out(&self) -> bool {
        self.opt_out_days > 0
    }

    /// Evaluate the day that just ended without touching counters.
    pub fn outcome(&self, ending_day: Weekday) -> DayOutcome {
        if self.is_opted_out() {
            DayOutcome::Frozen
        } else if self.today_tasks >= self.weekly_goals.for_day(ending_day) {
            DayOutcome::Met
        } else {
            DayOutcome::Missed
        }
    }

    /// The record as it looks after the rollover that closes `ending_day`.
    ///
    /// Goal evaluation is gated on the opt-out window; the counter resets
    /// below it are not.
    pub fn rolled_over(&self, ending_day: Weekday) -> (Self, DayOutcome) {
        let outcome = self.outcome(ending_day);
        let mut next = self.clone();
        match outcome {
            DayOutcome::Met => {
                next.current_streak = self.current_streak.saturating_add(1);
                next.punishment = false;
            }
            DayOutcome::Missed => {
                next.current_streak = 0;
                next.punishment = true;
            }
            DayOutcome::Frozen => {}
        }
        next.today_tasks = 0;
        next.opt_out_days = self.opt_out_days.saturating_sub(1);
        (next, outcome)
    }
}
