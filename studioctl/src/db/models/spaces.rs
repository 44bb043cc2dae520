//! Storage models for spaces and their weekly schedules.

use crate::types::{ScheduleId, SpaceId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A bookable space. Read-mostly from the engine's perspective.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Space {
    pub id: SpaceId,
    pub name: String,
    pub description: Option<String>,
    pub capacity: i32,
    /// Flat cost in credits per booking; exception bookings pay a surcharge on top.
    pub cost_credits: i64,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct SpaceCreateDBRequest {
    pub name: String,
    pub description: Option<String>,
    pub capacity: i32,
    pub cost_credits: i64,
}

/// Partial update; `None` fields are left untouched.
#[derive(Debug, Clone, Default)]
pub struct SpaceUpdateDBRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub capacity: Option<i32>,
    pub cost_credits: Option<i64>,
    pub is_active: Option<bool>,
}

/// One standing availability window for a space.
///
/// `day_of_week` is 0=Sunday..6=Saturday; `start_time`/`end_time` are civil
/// wall-clock strings ("09:00") in the operating region's zone. Multiple
/// entries per day form a set of allowed windows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleEntry {
    pub id: ScheduleId,
    pub space_id: SpaceId,
    pub day_of_week: u8,
    pub start_time: String,
    pub end_time: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct ScheduleCreateDBRequest {
    pub space_id: SpaceId,
    pub day_of_week: u8,
    pub start_time: String,
    pub end_time: String,
}
