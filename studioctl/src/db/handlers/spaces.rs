use chrono::Utc;
use uuid::Uuid;

use crate::db::StoreState;
use crate::db::errors::{DbError, Result};
use crate::db::models::spaces::{ScheduleCreateDBRequest, ScheduleEntry, Space, SpaceCreateDBRequest, SpaceUpdateDBRequest};
use crate::types::{ScheduleId, SpaceId};

/// Repository for bookable spaces.
pub struct Spaces<'c> {
    state: &'c mut StoreState,
}

impl<'c> Spaces<'c> {
    pub fn new(state: &'c mut StoreState) -> Self {
        Self { state }
    }

    pub fn create(&mut self, request: &SpaceCreateDBRequest) -> Space {
        let space = Space {
            id: Uuid::new_v4(),
            name: request.name.clone(),
            description: request.description.clone(),
            capacity: request.capacity,
            cost_credits: request.cost_credits,
            is_active: true,
            created_at: Utc::now(),
        };
        self.state.spaces.insert(space.id, space.clone());
        space
    }

    pub fn get(&mut self, id: SpaceId) -> Result<Space> {
        self.state.spaces.get(&id).cloned().ok_or(DbError::NotFound)
    }

    pub fn update(&mut self, id: SpaceId, request: &SpaceUpdateDBRequest) -> Result<Space> {
        let space = self.state.spaces.get_mut(&id).ok_or(DbError::NotFound)?;
        if let Some(name) = &request.name {
            space.name = name.clone();
        }
        if let Some(description) = &request.description {
            space.description = Some(description.clone());
        }
        if let Some(capacity) = request.capacity {
            space.capacity = capacity;
        }
        if let Some(cost_credits) = request.cost_credits {
            space.cost_credits = cost_credits;
        }
        if let Some(is_active) = request.is_active {
            space.is_active = is_active;
        }
        Ok(space.clone())
    }

    /// All spaces, name-ordered. Inactive ones are included; the API layer
    /// filters for non-admin listings.
    pub fn list(&mut self) -> Vec<Space> {
        let mut spaces: Vec<Space> = self.state.spaces.values().cloned().collect();
        spaces.sort_by(|a, b| a.name.cmp(&b.name));
        spaces
    }
}

/// Repository for per-space weekly schedule entries.
pub struct Schedules<'c> {
    state: &'c mut StoreState,
}

impl<'c> Schedules<'c> {
    pub fn new(state: &'c mut StoreState) -> Self {
        Self { state }
    }

    pub fn create(&mut self, request: &ScheduleCreateDBRequest) -> ScheduleEntry {
        let entry = ScheduleEntry {
            id: Uuid::new_v4(),
            space_id: request.space_id,
            day_of_week: request.day_of_week,
            start_time: request.start_time.clone(),
            end_time: request.end_time.clone(),
            is_active: true,
            created_at: Utc::now(),
        };
        self.state.schedules.insert(entry.id, entry.clone());
        entry
    }

    /// Every schedule entry for one space, day then start-time ordered.
    pub fn list_for_space(&mut self, space_id: SpaceId) -> Vec<ScheduleEntry> {
        let mut entries: Vec<ScheduleEntry> = self
            .state
            .schedules
            .values()
            .filter(|entry| entry.space_id == space_id)
            .cloned()
            .collect();
        entries.sort_by(|a, b| a.day_of_week.cmp(&b.day_of_week).then(a.start_time.cmp(&b.start_time)));
        entries
    }

    pub fn deactivate(&mut self, id: ScheduleId) -> Result<ScheduleEntry> {
        let entry = self.state.schedules.get_mut(&id).ok_or(DbError::NotFound)?;
        entry.is_active = false;
        Ok(entry.clone())
    }
}
