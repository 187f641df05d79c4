//! Recurrence rules — how often and until when a template produces work.

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::{Result, UpkeepError};

/// Unit of a recurrence interval.
///
/// Months are 30-day blocks, not calendar months. The original system was
/// shipped with that approximation and downstream maintenance plans depend
/// on it, so it is kept and locked in by tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecurrenceUnit {
    Days,
    Weeks,
    Months,
}

impl RecurrenceUnit {
    /// Length of one unit in days.
    pub fn days(&self) -> i64 {
        match self {
            RecurrenceUnit::Days => 1,
            RecurrenceUnit::Weeks => 7,
            RecurrenceUnit::Months => 30,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RecurrenceUnit::Days => "days",
            RecurrenceUnit::Weeks => "weeks",
            RecurrenceUnit::Months => "months",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "days" => Some(RecurrenceUnit::Days),
            "weeks" => Some(RecurrenceUnit::Weeks),
            "months" => Some(RecurrenceUnit::Months),
            _ => None,
        }
    }
}

/// How often and until when a maintenance template recurs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecurrenceRule {
    pub schedule_id: i64,
    /// Count of units between occurrences. Must be >= 1.
    pub interval: u32,
    pub unit: RecurrenceUnit,
    /// Date the rule becomes active.
    pub start_date: NaiveDate,
    /// Rule is inactive after this date, when present.
    pub end_date: Option<NaiveDate>,
    /// Date of the most recent instantiation; `None` means never generated.
    pub last_generated: Option<NaiveDate>,
}

impl RecurrenceRule {
    /// Offset between two consecutive occurrences.
    pub fn step(&self) -> Duration {
        Duration::days(self.interval as i64 * self.unit.days())
    }

    /// When the next work order is due: the start date if nothing has been
    /// generated yet, otherwise one step past the last generation.
    pub fn next_due_date(&self) -> NaiveDate {
        match self.last_generated {
            None => self.start_date,
            Some(last) => last + self.step(),
        }
    }

    /// Whether a new work order is due as of the given date. False once the
    /// next due date falls beyond the rule's end date.
    pub fn is_due(&self, as_of: NaiveDate) -> bool {
        let next = self.next_due_date();
        if next > as_of {
            return false;
        }
        match self.end_date {
            Some(end) => next <= end,
            None => true,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.interval < 1 {
            return Err(UpkeepError::Config(format!(
                "Schedule #{}: interval must be at least 1",
                self.schedule_id
            )));
        }
        if let Some(end) = self.end_date
            && end < self.start_date
        {
            return Err(UpkeepError::Config(format!(
                "Schedule #{}: end date {end} is before start date {}",
                self.schedule_id, self.start_date
            )));
        }
        Ok(())
    }
}
