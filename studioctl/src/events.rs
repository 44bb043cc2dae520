//! Best-effort reservation event fan-out.
//!
//! The workflow publishes an event after each committed state change;
//! subscribers (the SSE endpoint) receive them over a tokio broadcast
//! channel. Delivery is fire-and-forget: no subscribers, or a subscriber
//! that lags past the channel capacity, never affects the workflow.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::debug;
use utoipa::ToSchema;

use crate::db::models::reservations::ReservationStatus;
use crate::types::{ReservationId, SpaceId};

const CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum EventAction {
    Created,
    Approved,
    Cancelled,
}

/// What changed, denormalized enough for a display board: the space and
/// holder names ride along so subscribers need no follow-up lookups.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ReservationEvent {
    #[schema(value_type = String, format = "uuid")]
    pub reservation_id: ReservationId,
    #[schema(value_type = String, format = "uuid")]
    pub space_id: SpaceId,
    pub space_name: String,
    /// Account id rendering or external-client name, whichever holds the slot.
    pub display_name: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub status: ReservationStatus,
    pub action: EventAction,
}

#[derive(Debug, Clone)]
pub struct NotificationCenter {
    sender: broadcast::Sender<ReservationEvent>,
}

impl NotificationCenter {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { sender }
    }

    /// Publish an event. Returns nothing; a send error only means nobody is
    /// listening right now.
    pub fn emit(&self, event: ReservationEvent) {
        let receivers = self.sender.receiver_count();
        debug!(
            reservation = %event.reservation_id,
            action = ?event.action,
            receivers,
            "emitting reservation event"
        );
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ReservationEvent> {
        self.sender.subscribe()
    }
}

impl Default for NotificationCenter {
    fn default() -> Self {
        Self::new()
    }
}
