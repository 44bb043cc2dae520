//! Storage models for the global operating calendar: business hours and
//! closed-date overrides.

use crate::types::ClosedDateId;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Global operating window for one day of the week (0=Sunday..6=Saturday).
/// Exactly one entry per day is meaningful; the store keys them by day.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BusinessHoursEntry {
    pub day_of_week: u8,
    pub start_time: String,
    pub end_time: String,
    pub is_closed: bool,
}

/// A calendar date on which the operation is closed regardless of schedules.
/// Deactivated rather than deleted so the override history survives.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClosedDate {
    pub id: ClosedDateId,
    pub date: NaiveDate,
    pub reason: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}
