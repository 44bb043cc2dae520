use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::db::models::calendar::{BusinessHoursEntry, ClosedDate};
use crate::types::ClosedDateId;

// Request models

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BusinessHoursUpsertRequest {
    /// Civil wall-clock "HH:MM"
    pub start_time: String,
    pub end_time: String,
    /// Closed days keep their entry but reject all bookings
    #[serde(default)]
    pub is_closed: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ClosedDateCreateRequest {
    /// "YYYY-MM-DD" in the operating region's zone
    pub date: NaiveDate,
    pub reason: String,
}

// Response models

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BusinessHoursResponse {
    pub day_of_week: u8,
    pub start_time: String,
    pub end_time: String,
    pub is_closed: bool,
}

impl From<BusinessHoursEntry> for BusinessHoursResponse {
    fn from(entry: BusinessHoursEntry) -> Self {
        Self {
            day_of_week: entry.day_of_week,
            start_time: entry.start_time,
            end_time: entry.end_time,
            is_closed: entry.is_closed,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ClosedDateResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: ClosedDateId,
    pub date: NaiveDate,
    pub reason: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl From<ClosedDate> for ClosedDateResponse {
    fn from(closed: ClosedDate) -> Self {
        Self {
            id: closed.id,
            date: closed.date,
            reason: closed.reason,
            is_active: closed.is_active,
            created_at: closed.created_at,
        }
    }
}

/// "HH:MM" with a 24-hour clock; the policy compares these lexically, so the
/// format must be exact.
pub(crate) fn valid_hhmm(value: &str) -> bool {
    let bytes = value.as_bytes();
    if bytes.len() != 5 || bytes[2] != b':' {
        return false;
    }
    if ![0, 1, 3, 4].iter().all(|&i| bytes[i].is_ascii_digit()) {
        return false;
    }
    let hours = (bytes[0] - b'0') * 10 + (bytes[1] - b'0');
    let minutes = (bytes[3] - b'0') * 10 + (bytes[4] - b'0');
    hours < 24 && minutes < 60
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hhmm_validation_accepts_exact_format_only() {
        assert!(valid_hhmm("09:00"));
        assert!(valid_hhmm("23:59"));
        assert!(!valid_hhmm("9:00"));
        assert!(!valid_hhmm("24:00"));
        assert!(!valid_hhmm("09:60"));
        assert!(!valid_hhmm("09-00"));
        assert!(!valid_hhmm("09:000"));
    }
}
