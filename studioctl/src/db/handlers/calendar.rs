use chrono::{NaiveDate, Utc};
use uuid::Uuid;

use crate::db::StoreState;
use crate::db::errors::{DbError, Result};
use crate::db::models::calendar::{BusinessHoursEntry, ClosedDate};
use crate::types::ClosedDateId;

/// Repository for the global operating calendar: per-weekday business hours
/// and closed-date overrides.
pub struct Calendar<'c> {
    state: &'c mut StoreState,
}

impl<'c> Calendar<'c> {
    pub fn new(state: &'c mut StoreState) -> Self {
        Self { state }
    }

    /// Insert or replace the business-hours entry for its day-of-week.
    pub fn upsert_business_hours(&mut self, entry: BusinessHoursEntry) -> BusinessHoursEntry {
        self.state.business_hours.insert(entry.day_of_week, entry.clone());
        entry
    }

    pub fn business_hours_for_day(&mut self, day_of_week: u8) -> Option<BusinessHoursEntry> {
        self.state.business_hours.get(&day_of_week).cloned()
    }

    pub fn list_business_hours(&mut self) -> Vec<BusinessHoursEntry> {
        let mut entries: Vec<BusinessHoursEntry> = self.state.business_hours.values().cloned().collect();
        entries.sort_by_key(|entry| entry.day_of_week);
        entries
    }

    pub fn has_business_hours(&mut self) -> bool {
        !self.state.business_hours.is_empty()
    }

    pub fn create_closed_date(&mut self, date: NaiveDate, reason: String) -> ClosedDate {
        let closed = ClosedDate {
            id: Uuid::new_v4(),
            date,
            reason,
            is_active: true,
            created_at: Utc::now(),
        };
        self.state.closed_dates.insert(closed.id, closed.clone());
        closed
    }

    pub fn deactivate_closed_date(&mut self, id: ClosedDateId) -> Result<ClosedDate> {
        let closed = self.state.closed_dates.get_mut(&id).ok_or(DbError::NotFound)?;
        closed.is_active = false;
        Ok(closed.clone())
    }

    pub fn list_closed_dates(&mut self) -> Vec<ClosedDate> {
        let mut dates: Vec<ClosedDate> = self.state.closed_dates.values().cloned().collect();
        dates.sort_by_key(|closed| closed.date);
        dates
    }

    /// Active overrides only, for the availability policy snapshot.
    pub fn active_closed_dates(&mut self) -> Vec<ClosedDate> {
        self.state.closed_dates.values().filter(|closed| closed.is_active).cloned().collect()
    }
}
