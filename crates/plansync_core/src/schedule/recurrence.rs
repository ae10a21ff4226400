//! Recurrence expansion.
//!
//! # Responsibility
//! - Expand a start date and cadence into the concrete dates of a series.
//! - Reject unparseable input before any item is materialized.
//!
//! # Invariants
//! - Output is strictly increasing, starts with the start date and stays
//!   strictly before `start + 1 year`.
//! - Monthly steps are computed from the start date each time, so a series
//!   starting on the 31st returns to the 31st after short months.
//! - Expansion is pure: no clock, no randomness except the group id minted by
//!   `plan_series`.

use crate::model::item::{Cadence, RecurrenceGroupId};
use chrono::{Days, Months, NaiveDate};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Wire format accepted for start dates.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

const WEEK: Days = Days::new(7);
const HORIZON_MONTHS: u32 = 12;

/// Validation errors raised before a series is created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecurrenceError {
    /// Start date could not be parsed as `YYYY-MM-DD`.
    InvalidStartDate(String),
    /// Cadence name is not one of `none|weekly|monthly`.
    UnknownCadence(String),
}

impl Display for RecurrenceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidStartDate(value) => {
                write!(f, "invalid recurrence start date `{value}`; expected YYYY-MM-DD")
            }
            Self::UnknownCadence(value) => {
                write!(f, "unknown cadence `{value}`; expected none|weekly|monthly")
            }
        }
    }
}

impl Error for RecurrenceError {}

/// Dates and shared identity for one series materialization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeriesPlan {
    /// `None` for one-off items (`Cadence::None`).
    pub group_id: Option<RecurrenceGroupId>,
    pub cadence: Cadence,
    pub start: NaiveDate,
    pub dates: Vec<NaiveDate>,
}

/// Expands `start` by `cadence` over a one-year horizon.
pub fn expand(start: NaiveDate, cadence: Cadence) -> Vec<NaiveDate> {
    let Some(end) = start.checked_add_months(Months::new(HORIZON_MONTHS)) else {
        return vec![start];
    };

    match cadence {
        Cadence::None => vec![start],
        Cadence::Weekly => {
            let mut dates = Vec::with_capacity(53);
            let mut cursor = Some(start);
            while let Some(date) = cursor.filter(|date| *date < end) {
                dates.push(date);
                cursor = date.checked_add_days(WEEK);
            }
            dates
        }
        Cadence::Monthly => (0..HORIZON_MONTHS)
            .filter_map(|step| start.checked_add_months(Months::new(step)))
            .filter(|date| *date < end)
            .collect(),
    }
}

/// Parses `start` and expands it, failing before any work on bad input.
pub fn expand_str(start: &str, cadence: Cadence) -> Result<Vec<NaiveDate>, RecurrenceError> {
    let start = parse_start_date(start)?;
    Ok(expand(start, cadence))
}

pub fn parse_start_date(value: &str) -> Result<NaiveDate, RecurrenceError> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT)
        .map_err(|_| RecurrenceError::InvalidStartDate(value.to_string()))
}

pub fn parse_cadence(value: &str) -> Result<Cadence, RecurrenceError> {
    Cadence::parse(value).ok_or_else(|| RecurrenceError::UnknownCadence(value.to_string()))
}

/// Expands a series and mints its group id.
///
/// One-off cadences get no group id.
pub fn plan_series(start: NaiveDate, cadence: Cadence) -> SeriesPlan {
    let group_id = match cadence {
        Cadence::None => None,
        Cadence::Weekly | Cadence::Monthly => Some(Uuid::new_v4()),
    };
    SeriesPlan {
        group_id,
        cadence,
        start,
        dates: expand(start, cadence),
    }
}
