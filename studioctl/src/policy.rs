//! Availability policy: decides whether a requested slot is in-policy
//! (auto-confirmable) or an exception booking that needs admin approval.
//!
//! Business hours and schedule windows are stored as civil "HH:MM" strings in
//! the operating region's zone, so every comparison here first converts the
//! UTC instants to local wall-clock time. Comparing the raw UTC timestamps
//! against those strings silently shifts every decision by the UTC offset;
//! the conversion is the load-bearing step, not a formality.
//!
//! The checks run in a fixed order and short-circuit on the first violation:
//! closed date, business hours, schedule existence, schedule containment.

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use chrono_tz::Tz;
use tracing::debug;

use crate::db::models::calendar::{BusinessHoursEntry, ClosedDate};
use crate::db::models::spaces::ScheduleEntry;

/// Read-only calendar snapshot the policy evaluates against, fetched by the
/// caller inside its transaction. Passing it in keeps the policy free of
/// ambient state and testable in isolation.
#[derive(Debug, Clone, Default)]
pub struct PolicyCalendar {
    /// Business-hours entries; at most one per day-of-week is consulted.
    pub business_hours: Vec<BusinessHoursEntry>,
    /// Active closed-date overrides.
    pub closed_dates: Vec<ClosedDate>,
    /// The candidate space's schedule entries (all days).
    pub schedules: Vec<ScheduleEntry>,
}

#[derive(Debug, Clone)]
pub struct ApprovalPolicy {
    tz: Tz,
}

impl ApprovalPolicy {
    pub fn new(tz: Tz) -> Self {
        Self { tz }
    }

    /// True when the requested interval is an exception booking.
    pub fn requires_approval(&self, calendar: &PolicyCalendar, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        let local_start = start.with_timezone(&self.tz);
        let local_end = end.with_timezone(&self.tz);
        let date = local_start.date_naive();
        let day_of_week = local_start.weekday().num_days_from_sunday() as u8;

        if self.is_closed_date(calendar, date) {
            debug!(%date, "closed date, approval required");
            return true;
        }

        // Civil "HH:MM" comparisons are only meaningful within one local day;
        // an interval crossing local midnight is always an exception.
        if local_end.date_naive() != date {
            debug!(%date, "interval crosses local midnight, approval required");
            return true;
        }

        let start_str = local_start.format("%H:%M").to_string();
        let end_str = local_end.format("%H:%M").to_string();

        if !self.within_business_hours(calendar, day_of_week, &start_str, &end_str) {
            debug!(day_of_week, %start_str, %end_str, "outside business hours, approval required");
            return true;
        }

        let day_windows: Vec<&ScheduleEntry> = calendar
            .schedules
            .iter()
            .filter(|entry| entry.is_active && entry.day_of_week == day_of_week)
            .collect();

        if day_windows.is_empty() {
            debug!(day_of_week, "no schedule windows for space, approval required");
            return true;
        }

        // Any single window fully containing the interval suffices.
        let contained = day_windows
            .iter()
            .any(|window| start_str.as_str() >= window.start_time.as_str() && end_str.as_str() <= window.end_time.as_str());
        if !contained {
            debug!(day_of_week, %start_str, %end_str, "outside schedule windows, approval required");
        }
        !contained
    }

    fn is_closed_date(&self, calendar: &PolicyCalendar, date: NaiveDate) -> bool {
        calendar.closed_dates.iter().any(|closed| closed.is_active && closed.date == date)
    }

    fn within_business_hours(&self, calendar: &PolicyCalendar, day_of_week: u8, start_str: &str, end_str: &str) -> bool {
        let Some(hours) = calendar.business_hours.iter().find(|entry| entry.day_of_week == day_of_week) else {
            return false;
        };
        if hours.is_closed {
            return false;
        }
        start_str >= hours.start_time.as_str() && end_str <= hours.end_time.as_str()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use chrono_tz::America::Mexico_City;
    use uuid::Uuid;

    fn policy() -> ApprovalPolicy {
        ApprovalPolicy::new(Mexico_City)
    }

    /// Local wall-clock instant on Monday 2025-03-10.
    fn local(hour: u32, min: u32) -> DateTime<Utc> {
        Mexico_City
            .with_ymd_and_hms(2025, 3, 10, hour, min, 0)
            .unwrap()
            .with_timezone(&Utc)
    }

    fn hours(day: u8, start: &str, end: &str) -> BusinessHoursEntry {
        BusinessHoursEntry {
            day_of_week: day,
            start_time: start.to_string(),
            end_time: end.to_string(),
            is_closed: false,
        }
    }

    fn window(day: u8, start: &str, end: &str) -> ScheduleEntry {
        ScheduleEntry {
            id: Uuid::new_v4(),
            space_id: Uuid::new_v4(),
            day_of_week: day,
            start_time: start.to_string(),
            end_time: end.to_string(),
            is_active: true,
            created_at: Utc::now(),
        }
    }

    /// Monday open 09:00-18:00 with a matching schedule window.
    fn open_monday() -> PolicyCalendar {
        PolicyCalendar {
            business_hours: vec![hours(1, "09:00", "18:00")],
            closed_dates: vec![],
            schedules: vec![window(1, "09:00", "18:00")],
        }
    }

    #[test]
    fn in_policy_booking_is_auto_confirmable() {
        assert!(!policy().requires_approval(&open_monday(), local(10, 0), local(11, 0)));
    }

    #[test]
    fn interval_ending_at_close_is_still_in_policy() {
        assert!(!policy().requires_approval(&open_monday(), local(17, 0), local(18, 0)));
    }

    #[test]
    fn active_closed_date_forces_approval() {
        let mut calendar = open_monday();
        calendar.closed_dates.push(ClosedDate {
            id: Uuid::new_v4(),
            date: NaiveDate::from_ymd_opt(2025, 3, 10).unwrap(),
            reason: "maintenance".to_string(),
            is_active: true,
            created_at: Utc::now(),
        });
        assert!(policy().requires_approval(&calendar, local(10, 0), local(11, 0)));
    }

    #[test]
    fn deactivated_closed_date_is_ignored() {
        let mut calendar = open_monday();
        calendar.closed_dates.push(ClosedDate {
            id: Uuid::new_v4(),
            date: NaiveDate::from_ymd_opt(2025, 3, 10).unwrap(),
            reason: "maintenance".to_string(),
            is_active: false,
            created_at: Utc::now(),
        });
        assert!(!policy().requires_approval(&calendar, local(10, 0), local(11, 0)));
    }

    #[test]
    fn missing_business_hours_forces_approval() {
        let mut calendar = open_monday();
        calendar.business_hours.clear();
        assert!(policy().requires_approval(&calendar, local(10, 0), local(11, 0)));
    }

    #[test]
    fn closed_day_forces_approval() {
        let mut calendar = open_monday();
        calendar.business_hours[0].is_closed = true;
        assert!(policy().requires_approval(&calendar, local(10, 0), local(11, 0)));
    }

    #[test]
    fn interval_outside_business_hours_forces_approval() {
        assert!(policy().requires_approval(&open_monday(), local(8, 0), local(10, 0)));
        assert!(policy().requires_approval(&open_monday(), local(17, 30), local(18, 30)));
    }

    #[test]
    fn space_without_schedule_for_day_forces_approval() {
        let mut calendar = open_monday();
        calendar.schedules = vec![window(2, "09:00", "18:00")]; // Tuesday only
        assert!(policy().requires_approval(&calendar, local(10, 0), local(11, 0)));
    }

    #[test]
    fn any_single_window_containing_the_interval_suffices() {
        let mut calendar = open_monday();
        calendar.schedules = vec![window(1, "09:00", "12:00"), window(1, "14:00", "18:00")];
        assert!(!policy().requires_approval(&calendar, local(14, 30), local(16, 0)));
        // Spanning the gap fits neither window.
        assert!(policy().requires_approval(&calendar, local(11, 0), local(15, 0)));
    }

    #[test]
    fn comparisons_happen_in_local_time_not_utc() {
        // 10:00-11:00 in Mexico City is 16:00-17:00 UTC; comparing the raw
        // UTC clock against the 09:00-18:00 strings would still pass here, so
        // pin the inverse: 04:00 local is 10:00 UTC, which a UTC comparison
        // would wrongly accept.
        let calendar = open_monday();
        assert!(policy().requires_approval(&calendar, local(4, 0), local(5, 0)));
        assert!(!policy().requires_approval(&calendar, local(10, 0), local(11, 0)));
    }

    #[test]
    fn interval_crossing_local_midnight_forces_approval() {
        let mut calendar = open_monday();
        calendar.business_hours = vec![hours(1, "00:00", "23:59"), hours(2, "00:00", "23:59")];
        calendar.schedules = vec![window(1, "00:00", "23:59")];
        let start = Mexico_City.with_ymd_and_hms(2025, 3, 10, 23, 0, 0).unwrap().with_timezone(&Utc);
        let end = Mexico_City.with_ymd_and_hms(2025, 3, 11, 1, 0, 0).unwrap().with_timezone(&Utc);
        assert!(policy().requires_approval(&calendar, start, end));
    }
}
