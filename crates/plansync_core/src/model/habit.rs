//! Habit and habit log model.
//!
//! # Invariants
//! - Habits share one global `order_index` sequence (not per day).
//! - At most one `HabitLog` exists per `(habit_id, date)`; a toggle replaces
//!   the whole record for that key instead of editing it in place.

use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type HabitId = Uuid;
pub type HabitLogId = Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HabitCadence {
    Daily,
    Weekdays,
    Weekly,
}

impl HabitCadence {
    /// Returns whether the habit is expected on `date`.
    ///
    /// Weekly habits are shown every day until checked off for the week; the
    /// view layer decides how to present that, so they count as due daily.
    pub fn is_due_on(self, date: NaiveDate) -> bool {
        match self {
            Self::Daily | Self::Weekly => true,
            Self::Weekdays => !matches!(date.weekday(), Weekday::Sat | Weekday::Sun),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Habit {
    pub id: HabitId,
    pub name: String,
    pub cadence: HabitCadence,
    pub active: bool,
    pub order_index: i64,
}

impl Habit {
    pub fn new(name: impl Into<String>, cadence: HabitCadence) -> Self {
        Self::with_id(Uuid::new_v4(), name, cadence)
    }

    pub fn with_id(id: HabitId, name: impl Into<String>, cadence: HabitCadence) -> Self {
        Self {
            id,
            name: name.into(),
            cadence,
            active: true,
            order_index: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HabitLog {
    pub id: HabitLogId,
    pub habit_id: HabitId,
    pub date: NaiveDate,
    pub completed: bool,
}

impl HabitLog {
    pub fn new(habit_id: HabitId, date: NaiveDate, completed: bool) -> Self {
        Self {
            id: Uuid::new_v4(),
            habit_id,
            date,
            completed,
        }
    }

    /// Builds the record that supersedes `self` for the same `(habit, date)`.
    ///
    /// The id is kept so the remote row is overwritten rather than duplicated.
    pub fn superseded_by(&self, completed: bool) -> Self {
        Self {
            id: self.id,
            habit_id: self.habit_id,
            date: self.date,
            completed,
        }
    }
}
