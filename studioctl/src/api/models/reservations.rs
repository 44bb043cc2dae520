use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::db::models::reservations::{Reservation, ReservationStatus};
use crate::types::{AccountId, AdminId, ExternalClientId, ReservationId, SpaceId};

// Request models

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ReservationCreateRequest {
    #[schema(value_type = String, format = "uuid")]
    pub space_id: SpaceId,
    /// ISO-8601 start instant
    pub start_time: DateTime<Utc>,
    /// ISO-8601 end instant (exclusive)
    pub end_time: DateTime<Utc>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct ReservationCancelRequest {
    /// Explicit refund override; omitted applies the cutoff rule
    pub credits_to_refund: Option<i64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct AdminCancelRequest {
    pub reason: Option<String>,
    /// Credits charged to the account as a penalty (0 for none)
    #[serde(default)]
    pub penalty_credits: i64,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ExternalReservationCreateRequest {
    #[schema(value_type = String, format = "uuid")]
    pub space_id: SpaceId,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub client_name: String,
    /// Phone number identifying the walk-in client across bookings
    pub client_phone: String,
    pub client_email: Option<String>,
    pub notes: Option<String>,
}

// Response models

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ReservationResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: ReservationId,
    #[schema(value_type = Option<String>, format = "uuid")]
    pub account_id: Option<AccountId>,
    #[schema(value_type = Option<String>, format = "uuid")]
    pub external_client_id: Option<ExternalClientId>,
    #[schema(value_type = String, format = "uuid")]
    pub space_id: SpaceId,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub status: ReservationStatus,
    pub credits_used: i64,
    pub requires_approval: bool,
    #[schema(value_type = Option<String>, format = "uuid")]
    pub approved_by: Option<AdminId>,
    pub approved_at: Option<DateTime<Utc>>,
    /// Admin who booked on the client's behalf, if staff-created
    #[schema(value_type = Option<String>, format = "uuid")]
    pub created_by: Option<AdminId>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<Reservation> for ReservationResponse {
    fn from(r: Reservation) -> Self {
        Self {
            id: r.id,
            account_id: r.account_id,
            external_client_id: r.external_client_id,
            space_id: r.space_id,
            start_time: r.start_time,
            end_time: r.end_time,
            status: r.status,
            credits_used: r.credits_used,
            requires_approval: r.requires_approval,
            approved_by: r.approved_by,
            approved_at: r.approved_at,
            created_by: r.created_by,
            notes: r.notes,
            created_at: r.created_at,
        }
    }
}
