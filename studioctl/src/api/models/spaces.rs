use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::db::models::spaces::{ScheduleEntry, Space};
use crate::types::{ScheduleId, SpaceId};

// Request models

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SpaceCreateRequest {
    pub name: String,
    pub description: Option<String>,
    pub capacity: i32,
    /// Flat booking cost in credits
    pub cost_credits: i64,
}

/// Partial update; omitted fields are left untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct SpaceUpdateRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub capacity: Option<i32>,
    pub cost_credits: Option<i64>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ScheduleCreateRequest {
    /// 0=Sunday .. 6=Saturday
    pub day_of_week: u8,
    /// Civil wall-clock "HH:MM"
    pub start_time: String,
    pub end_time: String,
}

// Response models

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SpaceResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: SpaceId,
    pub name: String,
    pub description: Option<String>,
    pub capacity: i32,
    pub cost_credits: i64,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl From<Space> for SpaceResponse {
    fn from(space: Space) -> Self {
        Self {
            id: space.id,
            name: space.name,
            description: space.description,
            capacity: space.capacity,
            cost_credits: space.cost_credits,
            is_active: space.is_active,
            created_at: space.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ScheduleResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: ScheduleId,
    #[schema(value_type = String, format = "uuid")]
    pub space_id: SpaceId,
    pub day_of_week: u8,
    pub start_time: String,
    pub end_time: String,
    pub is_active: bool,
}

impl From<ScheduleEntry> for ScheduleResponse {
    fn from(entry: ScheduleEntry) -> Self {
        Self {
            id: entry.id,
            space_id: entry.space_id,
            day_of_week: entry.day_of_week,
            start_time: entry.start_time,
            end_time: entry.end_time,
            is_active: entry.is_active,
        }
    }
}
