//! Item (task) domain model.
//!
//! # Responsibility
//! - Define the canonical task record shared by day, week and backlog views.
//! - Provide bucket and completion helpers used by ordering code.
//!
//! # Invariants
//! - `id` is assigned once by the writer and never reused for another item.
//! - Recurrence fields (`recurrence_group_id`, `recurrence_cadence`,
//!   `recurrence_start_date`) are either all set or all unset.
//! - `due_date` should not be earlier than `scheduled_date` when both are set.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Stable identifier for every item.
pub type ItemId = Uuid;

/// Identifier shared by every item materialized from one recurrence expansion.
pub type RecurrenceGroupId = Uuid;

/// Task lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    /// Created but not started.
    Pending,
    /// Work is in progress.
    InProgress,
    /// Completed successfully.
    Done,
    /// No longer actionable.
    Cancelled,
}

impl ItemStatus {
    /// Returns whether this status belongs to the completed partition.
    ///
    /// Only `Done` sinks below pending work; cancelled items keep their
    /// manual position.
    pub fn is_completed(self) -> bool {
        matches!(self, Self::Done)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    Medium,
    High,
}

/// Repeat cadence for a materialized series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Cadence {
    /// One-off item; expansion yields only the start date.
    None,
    Weekly,
    Monthly,
}

impl Cadence {
    /// Parses the lowercase wire value (`none|weekly|monthly`).
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "none" | "" => Some(Self::None),
            "weekly" => Some(Self::Weekly),
            "monthly" => Some(Self::Monthly),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
        }
    }
}

/// Grouping key inside which `order_index` defines a total order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Bucket {
    /// Items without a scheduled date.
    Unscheduled,
    /// Items scheduled on one calendar day.
    Day(NaiveDate),
}

impl From<Option<NaiveDate>> for Bucket {
    fn from(value: Option<NaiveDate>) -> Self {
        match value {
            Some(date) => Self::Day(date),
            None => Self::Unscheduled,
        }
    }
}

impl Bucket {
    pub fn date(self) -> Option<NaiveDate> {
        match self {
            Self::Day(date) => Some(date),
            Self::Unscheduled => None,
        }
    }
}

impl Display for Bucket {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unscheduled => write!(f, "unscheduled"),
            Self::Day(date) => write!(f, "{date}"),
        }
    }
}

/// Validation failures for item write paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemValidationError {
    /// Title is blank after trim.
    BlankTitle,
    /// Due date is earlier than the scheduled date.
    DueBeforeScheduled {
        scheduled: NaiveDate,
        due: NaiveDate,
    },
    /// Only part of the recurrence metadata is present.
    PartialRecurrence(ItemId),
}

impl Display for ItemValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BlankTitle => write!(f, "item title must not be blank"),
            Self::DueBeforeScheduled { scheduled, due } => {
                write!(f, "due date {due} is earlier than scheduled date {scheduled}")
            }
            Self::PartialRecurrence(id) => {
                write!(f, "item {id} has incomplete recurrence metadata")
            }
        }
    }
}

impl Error for ItemValidationError {}

/// Canonical task record.
///
/// The serialized form doubles as the remote row shape, so field names are
/// kept flat and snake_case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    pub title: String,
    #[serde(default)]
    pub notes: Option<String>,
    pub status: ItemStatus,
    pub priority: Priority,
    /// `None` means the item lives in the unscheduled bucket.
    pub scheduled_date: Option<NaiveDate>,
    pub due_date: Option<NaiveDate>,
    pub goal_id: Option<Uuid>,
    pub recurrence_group_id: Option<RecurrenceGroupId>,
    /// Never `Cadence::None`; one-off items keep this unset.
    pub recurrence_cadence: Option<Cadence>,
    pub recurrence_start_date: Option<NaiveDate>,
    pub order_index: i64,
}

impl Item {
    /// Creates a pending, medium-priority, unscheduled item with a fresh id.
    pub fn new(title: impl Into<String>) -> Self {
        Self::with_id(Uuid::new_v4(), title)
    }

    /// Creates an item with a caller-provided stable id.
    ///
    /// Used by seed content and remote hydration where identity already exists.
    pub fn with_id(id: ItemId, title: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            notes: None,
            status: ItemStatus::Pending,
            priority: Priority::Medium,
            scheduled_date: None,
            due_date: None,
            goal_id: None,
            recurrence_group_id: None,
            recurrence_cadence: None,
            recurrence_start_date: None,
            order_index: 0,
        }
    }

    pub fn bucket(&self) -> Bucket {
        Bucket::from(self.scheduled_date)
    }

    pub fn is_completed(&self) -> bool {
        self.status.is_completed()
    }

    pub fn is_recurring(&self) -> bool {
        self.recurrence_group_id.is_some()
    }

    /// Validates write-path invariants.
    ///
    /// Dates are not compared here: a task may be moved past its due date.
    pub fn validate(&self) -> Result<(), ItemValidationError> {
        if self.title.trim().is_empty() {
            return Err(ItemValidationError::BlankTitle);
        }

        let recurrence_fields = [
            self.recurrence_group_id.is_some(),
            matches!(self.recurrence_cadence, Some(c) if c != Cadence::None),
            self.recurrence_start_date.is_some(),
        ];
        let set = recurrence_fields.iter().filter(|value| **value).count();
        if set != 0 && set != recurrence_fields.len() {
            return Err(ItemValidationError::PartialRecurrence(self.id));
        }
        Ok(())
    }

    /// Rejects a due date earlier than the scheduled date. Checked when an
    /// item is created, not when it is moved.
    pub fn validate_due_date(&self) -> Result<(), ItemValidationError> {
        match (self.scheduled_date, self.due_date) {
            (Some(scheduled), Some(due)) if due < scheduled => {
                Err(ItemValidationError::DueBeforeScheduled { scheduled, due })
            }
            _ => Ok(()),
        }
    }
}
