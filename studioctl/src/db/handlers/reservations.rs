use chrono::Utc;
use uuid::Uuid;

use crate::db::StoreState;
use crate::db::errors::{DbError, Result};
use crate::db::models::reservations::{
    Cancellation, ExternalClient, Penalty, Reservation, ReservationCreateDBRequest, ReservationStatus,
};
use crate::types::{AccountId, ExternalClientId, ReservationId, SpaceId};

/// Repository for reservations and their cancellation/penalty audit records.
pub struct Reservations<'c> {
    state: &'c mut StoreState,
}

impl<'c> Reservations<'c> {
    pub fn new(state: &'c mut StoreState) -> Self {
        Self { state }
    }

    pub fn create(&mut self, request: &ReservationCreateDBRequest) -> Reservation {
        let reservation = Reservation {
            id: Uuid::new_v4(),
            account_id: request.account_id,
            external_client_id: request.external_client_id,
            space_id: request.space_id,
            start_time: request.start_time,
            end_time: request.end_time,
            status: request.status,
            credits_used: request.credits_used,
            requires_approval: request.requires_approval,
            approved_by: None,
            approved_at: None,
            created_by: request.created_by,
            notes: request.notes.clone(),
            created_at: Utc::now(),
        };
        self.state.reservations.insert(reservation.id, reservation.clone());
        reservation
    }

    pub fn get(&mut self, id: ReservationId) -> Result<Reservation> {
        self.state.reservations.get(&id).cloned().ok_or(DbError::NotFound)
    }

    pub fn update(&mut self, reservation: &Reservation) -> Result<()> {
        match self.state.reservations.get_mut(&reservation.id) {
            Some(existing) => {
                *existing = reservation.clone();
                Ok(())
            }
            None => Err(DbError::NotFound),
        }
    }

    /// Reservations that currently hold a slot on this space (pending or
    /// confirmed), the input set for conflict detection.
    pub fn holding_slot_for_space(&mut self, space_id: SpaceId) -> Vec<Reservation> {
        self.state
            .reservations
            .values()
            .filter(|r| r.space_id == space_id && r.status.holds_slot())
            .cloned()
            .collect()
    }

    /// All pending reservations, soonest start first (the approval queue).
    pub fn list_pending(&mut self) -> Vec<Reservation> {
        let mut pending: Vec<Reservation> = self
            .state
            .reservations
            .values()
            .filter(|r| r.status == ReservationStatus::Pending)
            .cloned()
            .collect();
        pending.sort_by_key(|r| r.start_time);
        pending
    }

    pub fn list_for_account(&mut self, account_id: AccountId) -> Vec<Reservation> {
        let mut reservations: Vec<Reservation> = self
            .state
            .reservations
            .values()
            .filter(|r| r.account_id == Some(account_id))
            .cloned()
            .collect();
        reservations.sort_by_key(|r| r.start_time);
        reservations
    }

    pub fn record_cancellation(&mut self, cancellation: Cancellation) {
        self.state.cancellations.push(cancellation);
    }

    pub fn record_penalty(&mut self, penalty: Penalty) {
        self.state.penalties.push(penalty);
    }

    #[cfg(test)]
    pub fn cancellations_for(&mut self, reservation_id: ReservationId) -> Vec<Cancellation> {
        self.state
            .cancellations
            .iter()
            .filter(|c| c.reservation_id == reservation_id)
            .cloned()
            .collect()
    }

    #[cfg(test)]
    pub fn penalties_for(&mut self, reservation_id: ReservationId) -> Vec<Penalty> {
        self.state
            .penalties
            .iter()
            .filter(|p| p.reservation_id == reservation_id)
            .cloned()
            .collect()
    }
}

/// Repository for walk-in clients booked by staff, keyed by phone number.
pub struct ExternalClients<'c> {
    state: &'c mut StoreState,
}

impl<'c> ExternalClients<'c> {
    pub fn new(state: &'c mut StoreState) -> Self {
        Self { state }
    }

    pub fn get(&mut self, id: ExternalClientId) -> Result<ExternalClient> {
        self.state.external_clients.get(&id).cloned().ok_or(DbError::NotFound)
    }

    pub fn find_by_phone(&mut self, phone: &str) -> Option<ExternalClient> {
        self.state.external_clients.values().find(|c| c.phone == phone).cloned()
    }

    /// Find-or-create by phone; repeat bookings refresh the contact details.
    pub fn upsert_by_phone(&mut self, name: &str, phone: &str, email: Option<&str>, notes: Option<&str>) -> ExternalClient {
        if let Some(mut existing) = self.find_by_phone(phone) {
            existing.name = name.to_string();
            if email.is_some() {
                existing.email = email.map(str::to_string);
            }
            if notes.is_some() {
                existing.notes = notes.map(str::to_string);
            }
            self.state.external_clients.insert(existing.id, existing.clone());
            return existing;
        }
        let client = ExternalClient {
            id: Uuid::new_v4(),
            name: name.to_string(),
            phone: phone.to_string(),
            email: email.map(str::to_string),
            notes: notes.map(str::to_string),
            created_at: Utc::now(),
        };
        self.state.external_clients.insert(client.id, client.clone());
        client
    }
}
