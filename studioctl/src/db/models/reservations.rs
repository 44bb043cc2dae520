//! Storage models for reservations, cancellations and penalties.

use crate::types::{AccountId, AdminId, ExternalClientId, ReservationId, SpaceId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Reservation lifecycle. Transitions only move forward:
/// `pending -> confirmed -> completed`, with `cancelled` reachable from
/// `pending` or `confirmed`. `completed` is set by an external process and
/// blocks cancellation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ReservationStatus {
    Pending,
    Confirmed,
    Cancelled,
    Completed,
}

impl ReservationStatus {
    /// Pending and confirmed reservations hold their slot; cancelled and
    /// completed ones never conflict.
    pub fn holds_slot(self) -> bool {
        matches!(self, ReservationStatus::Pending | ReservationStatus::Confirmed)
    }
}

/// A booking of one space for one half-open interval `[start_time, end_time)`.
///
/// Exactly one of `account_id` / `external_client_id` is set: account-held
/// reservations are paid in credits, external-client ones are staff-created
/// and charge nothing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reservation {
    pub id: ReservationId,
    pub account_id: Option<AccountId>,
    pub external_client_id: Option<ExternalClientId>,
    pub space_id: SpaceId,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub status: ReservationStatus,
    pub credits_used: i64,
    pub requires_approval: bool,
    pub approved_by: Option<AdminId>,
    pub approved_at: Option<DateTime<Utc>>,
    /// Set when staff created the reservation on someone's behalf.
    pub created_by: Option<AdminId>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct ReservationCreateDBRequest {
    pub account_id: Option<AccountId>,
    pub external_client_id: Option<ExternalClientId>,
    pub space_id: SpaceId,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub status: ReservationStatus,
    pub credits_used: i64,
    pub requires_approval: bool,
    pub created_by: Option<AdminId>,
    pub notes: Option<String>,
}

/// Outcome recorded on a cancellation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum CancellationStatus {
    Processed,
    Refunded,
    Penalized,
}

/// Append-only audit record, produced exactly once per cancellation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cancellation {
    pub id: Uuid,
    pub account_id: Option<AccountId>,
    pub reservation_id: ReservationId,
    pub cancelled_at: DateTime<Utc>,
    pub hours_before_start: f64,
    pub status: CancellationStatus,
    pub refunded_credits: i64,
    pub penalty_credits: i64,
    pub reason: Option<String>,
    pub notes: Option<String>,
    /// Admin who forced the cancellation; `None` for self-service.
    pub cancelled_by: Option<AdminId>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum PenaltyStatus {
    Pending,
    Paid,
}

/// Penalty assessed by an admin cancellation, tracked until settled.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Penalty {
    pub id: Uuid,
    pub account_id: AccountId,
    pub reservation_id: ReservationId,
    pub amount: i64,
    pub status: PenaltyStatus,
    pub reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Walk-in client without an account; staff book on their behalf.
/// Looked up by phone number and updated in place on repeat bookings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExternalClient {
    pub id: ExternalClientId,
    pub name: String,
    pub phone: String,
    pub email: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}
