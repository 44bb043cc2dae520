//! Reservation workflow: the state machine tying spaces, the availability
//! policy, the conflict detector and the credit ledger together.
//!
//! Transitions only move forward: `pending -> confirmed` via approval,
//! `pending | confirmed -> cancelled` via the cancellation paths, and
//! `completed` is a terminal state set elsewhere. Every operation runs its
//! check-then-act sequence inside one store transaction, so two concurrent
//! creates for the same slot cannot both pass the conflict check and both
//! commit. Events are emitted after the commit, best-effort.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::conflict::has_conflict;
use crate::db::errors::DbError;
use crate::db::handlers::{Calendar, ExternalClients, Lots, Reservations, Schedules, Spaces};
use crate::db::models::credits::LedgerAction;
use crate::db::models::reservations::{
    Cancellation, CancellationStatus, Penalty, PenaltyStatus, Reservation, ReservationCreateDBRequest, ReservationStatus,
};
use crate::db::{Store, StoreState};
use crate::errors::{Error, Result};
use crate::events::{EventAction, NotificationCenter, ReservationEvent};
use crate::ledger::{deduct_tx, grant_tx};
use crate::policy::{ApprovalPolicy, PolicyCalendar};
use crate::types::{AccountId, AdminId, ReservationId, SpaceId, abbrev_uuid};

/// Tunables the workflow needs from configuration.
#[derive(Debug, Clone)]
pub struct WorkflowSettings {
    pub timezone: Tz,
    /// Extra credits charged on exception bookings.
    pub exception_surcharge: i64,
    /// Self-service cancellations at least this many hours before start get a
    /// full refund; later ones forfeit everything.
    pub refund_cutoff_hours: i64,
    /// Expiry horizon for refund lots.
    pub refund_expiry_days: i64,
}

/// Details for a staff-created walk-in booking.
#[derive(Debug, Clone)]
pub struct ExternalBooking {
    pub space_id: SpaceId,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub client_name: String,
    pub client_phone: String,
    pub client_email: Option<String>,
    pub notes: Option<String>,
}

#[derive(Clone)]
pub struct ReservationWorkflow {
    store: Store,
    policy: ApprovalPolicy,
    events: NotificationCenter,
    settings: WorkflowSettings,
}

/// Map a repository miss to a resource-specific not-found.
fn found<T>(result: crate::db::errors::Result<T>, resource: &'static str, id: Uuid) -> Result<T> {
    result.map_err(|err| match err {
        DbError::NotFound => Error::NotFound {
            resource,
            id: id.to_string(),
        },
        other => Error::Database(other),
    })
}

impl ReservationWorkflow {
    pub fn new(store: Store, events: NotificationCenter, settings: WorkflowSettings) -> Self {
        Self {
            store,
            policy: ApprovalPolicy::new(settings.timezone),
            events,
            settings,
        }
    }

    /// Book a space for an account. In-policy bookings confirm and charge
    /// immediately; exception bookings go pending at cost + surcharge and
    /// charge nothing until approved.
    #[instrument(skip(self), fields(account = %abbrev_uuid(&account_id), space = %abbrev_uuid(&space_id)))]
    pub async fn create(
        &self,
        account_id: AccountId,
        space_id: SpaceId,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
        notes: Option<String>,
    ) -> Result<Reservation> {
        if start_time >= end_time {
            return Err(Error::BadRequest {
                message: "Reservation must end after it starts".to_string(),
            });
        }
        let now = Utc::now();
        let policy = self.policy.clone();
        let surcharge = self.settings.exception_surcharge;

        let (reservation, space_name) = self
            .store
            .transaction(|state| {
                let space = found(Spaces::new(state).get(space_id), "space", space_id)?;
                if !space.is_active {
                    return Err(Error::NotFound {
                        resource: "space",
                        id: space_id.to_string(),
                    });
                }

                let available = Lots::new(state).active_balance(account_id, now);
                if available < space.cost_credits {
                    return Err(Error::InsufficientCredits {
                        required: space.cost_credits,
                        available,
                    });
                }

                let holding = Reservations::new(state).holding_slot_for_space(space_id);
                if has_conflict(&holding, space_id, start_time, end_time, None) {
                    return Err(Error::SlotConflict);
                }

                let calendar = snapshot_calendar(state, space_id);
                let requires_approval = policy.requires_approval(&calendar, start_time, end_time);
                let cost = if requires_approval {
                    space.cost_credits + surcharge
                } else {
                    space.cost_credits
                };

                let status = if requires_approval {
                    ReservationStatus::Pending
                } else {
                    ReservationStatus::Confirmed
                };
                let reservation = Reservations::new(state).create(&ReservationCreateDBRequest {
                    account_id: Some(account_id),
                    external_client_id: None,
                    space_id,
                    start_time,
                    end_time,
                    status,
                    credits_used: cost,
                    requires_approval,
                    created_by: None,
                    notes: notes.clone(),
                });

                // Auto-confirmed bookings charge in the same transaction as
                // the insert; pending ones defer the charge to approval.
                if !requires_approval {
                    deduct_tx(
                        state,
                        account_id,
                        cost,
                        now,
                        LedgerAction::Deducted,
                        Some(format!("Reservation of {}", space.name)),
                        Some(reservation.id),
                    )?;
                }

                Ok((reservation, space.name))
            })
            .await?;

        info!(
            reservation = %abbrev_uuid(&reservation.id),
            status = ?reservation.status,
            credits = reservation.credits_used,
            "created reservation"
        );
        self.emit(&reservation, &space_name, EventAction::Created).await;
        Ok(reservation)
    }

    /// Confirm a pending reservation. The slot and (for account holders) the
    /// balance are re-validated: both may have changed since creation.
    #[instrument(skip(self), fields(reservation = %abbrev_uuid(&reservation_id), admin = %abbrev_uuid(&admin_id)))]
    pub async fn approve(&self, reservation_id: ReservationId, admin_id: AdminId) -> Result<Reservation> {
        let now = Utc::now();
        let (reservation, space_name) = self
            .store
            .transaction(|state| {
                let mut reservation =
                    found(Reservations::new(state).get(reservation_id), "reservation", reservation_id)?;
                if reservation.status != ReservationStatus::Pending {
                    return Err(Error::NotPending);
                }

                let holding = Reservations::new(state).holding_slot_for_space(reservation.space_id);
                if has_conflict(
                    &holding,
                    reservation.space_id,
                    reservation.start_time,
                    reservation.end_time,
                    Some(reservation.id),
                ) {
                    return Err(Error::SlotConflict);
                }

                let space = found(Spaces::new(state).get(reservation.space_id), "space", reservation.space_id)?;

                // External-client bookings hold no credits to charge.
                if let Some(account_id) = reservation.account_id {
                    deduct_tx(
                        state,
                        account_id,
                        reservation.credits_used,
                        now,
                        LedgerAction::Deducted,
                        Some(format!("Approved reservation of {}", space.name)),
                        Some(reservation.id),
                    )?;
                }

                reservation.status = ReservationStatus::Confirmed;
                reservation.approved_by = Some(admin_id);
                reservation.approved_at = Some(now);
                Reservations::new(state).update(&reservation)?;
                Ok((reservation, space.name))
            })
            .await?;

        info!(credits = reservation.credits_used, "approved reservation");
        self.emit(&reservation, &space_name, EventAction::Approved).await;
        Ok(reservation)
    }

    /// Self-service cancellation. A reservation the actor does not own looks
    /// exactly like one that does not exist. Confirmed bookings refund the
    /// explicit override if given, otherwise the full charge when cancelled
    /// at least the cutoff ahead of start and nothing after that; pending
    /// bookings were never charged and touch no ledger.
    #[instrument(skip(self), fields(reservation = %abbrev_uuid(&reservation_id), account = %abbrev_uuid(&account_id)))]
    pub async fn cancel(
        &self,
        reservation_id: ReservationId,
        account_id: AccountId,
        refund_override: Option<i64>,
    ) -> Result<Reservation> {
        if refund_override.is_some_and(|amount| amount < 0) {
            return Err(Error::InvalidAmount {
                message: "Refund override must not be negative".to_string(),
            });
        }
        let now = Utc::now();
        let cutoff_hours = self.settings.refund_cutoff_hours;
        let refund_expiry_days = self.settings.refund_expiry_days;

        let (reservation, space_name) = self
            .store
            .transaction(|state| {
                let mut reservation =
                    found(Reservations::new(state).get(reservation_id), "reservation", reservation_id)?;
                if reservation.account_id != Some(account_id) {
                    return Err(Error::NotFound {
                        resource: "reservation",
                        id: reservation_id.to_string(),
                    });
                }
                ensure_cancellable(&reservation)?;

                let hours_before_start = hours_until(now, reservation.start_time);
                let refund = if reservation.status == ReservationStatus::Confirmed {
                    match refund_override {
                        Some(amount) => amount,
                        None if hours_before_start >= cutoff_hours as f64 => reservation.credits_used,
                        None => 0,
                    }
                } else {
                    0
                };

                let space = found(Spaces::new(state).get(reservation.space_id), "space", reservation.space_id)?;
                if refund > 0 {
                    grant_tx(
                        state,
                        account_id,
                        refund,
                        refund_expiry_days,
                        LedgerAction::Refunded,
                        Some(format!("Refund for cancelled reservation of {}", space.name)),
                        Some(reservation.id),
                    );
                }

                reservation.status = ReservationStatus::Cancelled;
                let mut reservations = Reservations::new(state);
                reservations.update(&reservation)?;
                reservations.record_cancellation(Cancellation {
                    id: Uuid::new_v4(),
                    account_id: Some(account_id),
                    reservation_id: reservation.id,
                    cancelled_at: now,
                    hours_before_start,
                    status: if refund > 0 {
                        CancellationStatus::Refunded
                    } else {
                        CancellationStatus::Processed
                    },
                    refunded_credits: refund,
                    penalty_credits: 0,
                    reason: None,
                    notes: None,
                    cancelled_by: None,
                });
                Ok((reservation, space.name))
            })
            .await?;

        info!("cancelled reservation");
        self.emit(&reservation, &space_name, EventAction::Cancelled).await;
        Ok(reservation)
    }

    /// Staff cancellation with an explicit penalty. Confirmed bookings refund
    /// whatever the charge exceeds the penalty by; pending ones were never
    /// charged, so any penalty is collected from the account's balance
    /// instead.
    #[instrument(skip(self, reason, notes), fields(reservation = %abbrev_uuid(&reservation_id), admin = %abbrev_uuid(&admin_id)))]
    pub async fn admin_cancel(
        &self,
        reservation_id: ReservationId,
        admin_id: AdminId,
        reason: Option<String>,
        penalty: i64,
        notes: Option<String>,
    ) -> Result<Reservation> {
        if penalty < 0 {
            return Err(Error::InvalidAmount {
                message: "Penalty must not be negative".to_string(),
            });
        }
        let now = Utc::now();
        let refund_expiry_days = self.settings.refund_expiry_days;

        let (reservation, space_name) = self
            .store
            .transaction(|state| {
                let mut reservation =
                    found(Reservations::new(state).get(reservation_id), "reservation", reservation_id)?;
                ensure_cancellable(&reservation)?;

                if penalty > 0 && reservation.account_id.is_none() {
                    return Err(Error::BadRequest {
                        message: "Cannot assess a penalty on an external-client reservation".to_string(),
                    });
                }

                let space = found(Spaces::new(state).get(reservation.space_id), "space", reservation.space_id)?;
                let was_confirmed = reservation.status == ReservationStatus::Confirmed;
                let refund = if was_confirmed {
                    (reservation.credits_used - penalty).max(0)
                } else {
                    0
                };

                if let Some(account_id) = reservation.account_id {
                    if refund > 0 {
                        grant_tx(
                            state,
                            account_id,
                            refund,
                            refund_expiry_days,
                            LedgerAction::Refunded,
                            Some(format!("Refund for cancelled reservation of {}", space.name)),
                            Some(reservation.id),
                        );
                    }
                    // Nothing was charged on a pending booking, so the
                    // penalty comes out of the live balance.
                    if !was_confirmed && penalty > 0 {
                        deduct_tx(
                            state,
                            account_id,
                            penalty,
                            now,
                            LedgerAction::Deducted,
                            Some(format!("Cancellation penalty for {}", space.name)),
                            Some(reservation.id),
                        )?;
                    }
                }

                reservation.status = ReservationStatus::Cancelled;
                let mut reservations = Reservations::new(state);
                reservations.update(&reservation)?;
                reservations.record_cancellation(Cancellation {
                    id: Uuid::new_v4(),
                    account_id: reservation.account_id,
                    reservation_id: reservation.id,
                    cancelled_at: now,
                    hours_before_start: hours_until(now, reservation.start_time),
                    status: if refund > 0 {
                        CancellationStatus::Refunded
                    } else if penalty > 0 {
                        CancellationStatus::Penalized
                    } else {
                        CancellationStatus::Processed
                    },
                    refunded_credits: refund,
                    penalty_credits: penalty,
                    reason: reason.clone(),
                    notes: notes.clone(),
                    cancelled_by: Some(admin_id),
                });
                if penalty > 0 {
                    if let Some(account_id) = reservation.account_id {
                        reservations.record_penalty(Penalty {
                            id: Uuid::new_v4(),
                            account_id,
                            reservation_id: reservation.id,
                            amount: penalty,
                            status: PenaltyStatus::Pending,
                            reason: reason.clone(),
                            created_at: now,
                        });
                    }
                }
                Ok((reservation, space.name))
            })
            .await?;

        info!(penalty, "admin-cancelled reservation");
        self.emit(&reservation, &space_name, EventAction::Cancelled).await;
        Ok(reservation)
    }

    /// Book a space for a walk-in client without an account. The client is
    /// found or created by phone number, nothing is charged, and the booking
    /// confirms immediately.
    #[instrument(skip(self, booking), fields(admin = %abbrev_uuid(&admin_id), space = %abbrev_uuid(&booking.space_id)))]
    pub async fn create_external(&self, admin_id: AdminId, booking: ExternalBooking) -> Result<Reservation> {
        if booking.start_time >= booking.end_time {
            return Err(Error::BadRequest {
                message: "Reservation must end after it starts".to_string(),
            });
        }
        if booking.client_name.trim().is_empty() || booking.client_phone.trim().is_empty() {
            return Err(Error::BadRequest {
                message: "External client name and phone are required".to_string(),
            });
        }

        let (reservation, space_name) = self
            .store
            .transaction(|state| {
                let space = found(Spaces::new(state).get(booking.space_id), "space", booking.space_id)?;

                let holding = Reservations::new(state).holding_slot_for_space(booking.space_id);
                if has_conflict(&holding, booking.space_id, booking.start_time, booking.end_time, None) {
                    return Err(Error::SlotConflict);
                }

                let client = ExternalClients::new(state).upsert_by_phone(
                    &booking.client_name,
                    &booking.client_phone,
                    booking.client_email.as_deref(),
                    booking.notes.as_deref(),
                );

                let reservation = Reservations::new(state).create(&ReservationCreateDBRequest {
                    account_id: None,
                    external_client_id: Some(client.id),
                    space_id: booking.space_id,
                    start_time: booking.start_time,
                    end_time: booking.end_time,
                    status: ReservationStatus::Confirmed,
                    credits_used: 0,
                    requires_approval: false,
                    created_by: Some(admin_id),
                    notes: booking.notes.clone(),
                });
                Ok((reservation, space.name))
            })
            .await?;

        info!(reservation = %abbrev_uuid(&reservation.id), "created external reservation");
        self.emit(&reservation, &space_name, EventAction::Created).await;
        Ok(reservation)
    }

    pub async fn get(&self, reservation_id: ReservationId) -> Result<Reservation> {
        self.store
            .view(|state| state.reservations.get(&reservation_id).cloned())
            .await
            .ok_or(Error::NotFound {
                resource: "reservation",
                id: reservation_id.to_string(),
            })
    }

    /// Approval queue: pending reservations, soonest start first.
    pub async fn list_pending(&self) -> Vec<Reservation> {
        self.store
            .transaction(|state| Ok::<_, Error>(Reservations::new(state).list_pending()))
            .await
            .unwrap_or_default()
    }

    pub async fn list_for_account(&self, account_id: AccountId) -> Vec<Reservation> {
        self.store
            .transaction(|state| Ok::<_, Error>(Reservations::new(state).list_for_account(account_id)))
            .await
            .unwrap_or_default()
    }

    /// Build and publish the event for a committed state change. Display
    /// names for walk-in clients require one extra read; failures degrade to
    /// an anonymous label rather than blocking.
    async fn emit(&self, reservation: &Reservation, space_name: &str, action: EventAction) {
        let display_name = match (reservation.account_id, reservation.external_client_id) {
            (Some(account_id), _) => abbrev_uuid(&account_id),
            (None, Some(client_id)) => self
                .store
                .view(|state| state.external_clients.get(&client_id).map(|c| c.name.clone()))
                .await
                .unwrap_or_else(|| "Walk-in".to_string()),
            (None, None) => "Walk-in".to_string(),
        };
        self.events.emit(ReservationEvent {
            reservation_id: reservation.id,
            space_id: reservation.space_id,
            space_name: space_name.to_string(),
            display_name,
            start_time: reservation.start_time,
            end_time: reservation.end_time,
            status: reservation.status,
            action,
        });
    }
}

fn ensure_cancellable(reservation: &Reservation) -> Result<()> {
    match reservation.status {
        ReservationStatus::Cancelled => Err(Error::AlreadyCancelled),
        ReservationStatus::Completed => Err(Error::AlreadyCompleted),
        ReservationStatus::Pending | ReservationStatus::Confirmed => Ok(()),
    }
}

fn hours_until(now: DateTime<Utc>, start: DateTime<Utc>) -> f64 {
    (start - now).num_seconds() as f64 / 3600.0
}

/// Snapshot the calendar inputs the availability policy needs, inside the
/// caller's transaction.
fn snapshot_calendar(state: &mut StoreState, space_id: SpaceId) -> PolicyCalendar {
    let business_hours = Calendar::new(state).list_business_hours();
    let closed_dates = Calendar::new(state).active_closed_dates();
    let schedules = Schedules::new(state).list_for_space(space_id);
    PolicyCalendar {
        business_hours,
        closed_dates,
        schedules,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate, TimeZone};
    use chrono_tz::America::Mexico_City;
    use crate::db::models::calendar::BusinessHoursEntry;
    use crate::db::models::spaces::{ScheduleCreateDBRequest, SpaceCreateDBRequest};
    use crate::ledger::CreditLedger;

    fn settings() -> WorkflowSettings {
        WorkflowSettings {
            timezone: Mexico_City,
            exception_surcharge: 1,
            refund_cutoff_hours: 24,
            refund_expiry_days: 30,
        }
    }

    struct Harness {
        store: Store,
        workflow: ReservationWorkflow,
        ledger: CreditLedger,
        space_id: SpaceId,
    }

    /// One space costing 6 credits, open all week around the clock so policy
    /// only bites where a test arranges it to.
    async fn harness() -> Harness {
        let store = Store::new();
        let space_id = store
            .transaction(|state| {
                let space = Spaces::new(state).create(&SpaceCreateDBRequest {
                    name: "Studio A".to_string(),
                    description: None,
                    capacity: 4,
                    cost_credits: 6,
                });
                for day in 0..7u8 {
                    Calendar::new(state).upsert_business_hours(BusinessHoursEntry {
                        day_of_week: day,
                        start_time: "00:00".to_string(),
                        end_time: "23:59".to_string(),
                        is_closed: false,
                    });
                    Schedules::new(state).create(&ScheduleCreateDBRequest {
                        space_id: space.id,
                        day_of_week: day,
                        start_time: "00:00".to_string(),
                        end_time: "23:59".to_string(),
                    });
                }
                Ok::<_, Error>(space.id)
            })
            .await
            .unwrap();
        let workflow = ReservationWorkflow::new(store.clone(), NotificationCenter::new(), settings());
        let ledger = CreditLedger::new(store.clone(), 30);
        Harness {
            store,
            workflow,
            ledger,
            space_id,
        }
    }

    /// A one-hour slot at 10:00 local, `days_ahead` days out. Staying inside
    /// a single local calendar day keeps the booking in-policy.
    fn slot(days_ahead: i64) -> (DateTime<Utc>, DateTime<Utc>) {
        let date = Utc::now().with_timezone(&Mexico_City).date_naive() + Duration::days(days_ahead);
        let start = Mexico_City
            .from_local_datetime(&date.and_hms_opt(10, 0, 0).unwrap())
            .unwrap()
            .to_utc();
        (start, start + Duration::hours(1))
    }

    /// Insert a confirmed, already-charged reservation directly, for tests
    /// exercising the cancellation rules at short notice.
    async fn confirmed_reservation(
        store: &Store,
        account: AccountId,
        space_id: SpaceId,
        start: DateTime<Utc>,
        credits_used: i64,
    ) -> Reservation {
        store
            .transaction(|state| {
                Ok::<_, Error>(Reservations::new(state).create(&ReservationCreateDBRequest {
                    account_id: Some(account),
                    external_client_id: None,
                    space_id,
                    start_time: start,
                    end_time: start + Duration::hours(1),
                    status: ReservationStatus::Confirmed,
                    credits_used,
                    requires_approval: false,
                    created_by: None,
                    notes: None,
                }))
            })
            .await
            .unwrap()
    }

    #[test_log::test(tokio::test)]
    async fn in_policy_booking_confirms_and_charges() {
        let h = harness().await;
        let account = Uuid::new_v4();
        h.ledger.grant(account, 6, None, None).await.unwrap();

        let (start, end) = slot(3);
        let reservation = h.workflow.create(account, h.space_id, start, end, None).await.unwrap();

        assert_eq!(reservation.status, ReservationStatus::Confirmed);
        assert!(!reservation.requires_approval);
        assert_eq!(reservation.credits_used, 6);
        assert_eq!(h.ledger.active_balance(account).await, 0);
    }

    #[test_log::test(tokio::test)]
    async fn closed_date_booking_goes_pending_with_surcharge() {
        let h = harness().await;
        let account = Uuid::new_v4();
        h.ledger.grant(account, 6, None, None).await.unwrap();

        let (start, end) = slot(3);
        let closed: NaiveDate = start.with_timezone(&Mexico_City).date_naive();
        h.store
            .transaction(|state| {
                Calendar::new(state).create_closed_date(closed, "Maintenance".to_string());
                Ok::<_, Error>(())
            })
            .await
            .unwrap();

        let reservation = h.workflow.create(account, h.space_id, start, end, None).await.unwrap();
        assert_eq!(reservation.status, ReservationStatus::Pending);
        assert!(reservation.requires_approval);
        assert_eq!(reservation.credits_used, 7);
        // Nothing charged until approval.
        assert_eq!(h.ledger.active_balance(account).await, 6);
    }

    #[test_log::test(tokio::test)]
    async fn create_requires_balance_covering_the_space_cost() {
        let h = harness().await;
        let account = Uuid::new_v4();
        h.ledger.grant(account, 5, None, None).await.unwrap();

        let (start, end) = slot(3);
        let err = h.workflow.create(account, h.space_id, start, end, None).await.unwrap_err();
        assert!(matches!(err, Error::InsufficientCredits { required: 6, available: 5 }));
    }

    #[test_log::test(tokio::test)]
    async fn unknown_space_is_not_found() {
        let h = harness().await;
        let account = Uuid::new_v4();
        h.ledger.grant(account, 10, None, None).await.unwrap();
        let (start, end) = slot(3);
        let err = h.workflow.create(account, Uuid::new_v4(), start, end, None).await.unwrap_err();
        assert!(matches!(err, Error::NotFound { resource: "space", .. }));
    }

    #[test_log::test(tokio::test)]
    async fn overlapping_bookings_conflict_but_back_to_back_do_not() {
        let h = harness().await;
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        h.ledger.grant(a, 20, None, None).await.unwrap();
        h.ledger.grant(b, 20, None, None).await.unwrap();

        let (start, end) = slot(3);
        h.workflow.create(a, h.space_id, start, end, None).await.unwrap();

        let err = h
            .workflow
            .create(b, h.space_id, start + Duration::minutes(30), end + Duration::minutes(30), None)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::SlotConflict));

        // [end, end+1h) shares only the boundary instant.
        h.workflow
            .create(b, h.space_id, end, end + Duration::hours(1), None)
            .await
            .unwrap();
    }

    #[test_log::test(tokio::test)]
    async fn concurrent_creates_for_one_slot_admit_exactly_one() {
        let h = harness().await;
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        h.ledger.grant(a, 10, None, None).await.unwrap();
        h.ledger.grant(b, 10, None, None).await.unwrap();

        let (start, end) = slot(3);
        let (first, second) = tokio::join!(
            h.workflow.create(a, h.space_id, start, end, None),
            h.workflow.create(b, h.space_id, start, end, None),
        );
        let outcomes = [first.is_ok(), second.is_ok()];
        assert_eq!(outcomes.iter().filter(|ok| **ok).count(), 1, "exactly one booking wins");
        assert!(matches!(
            [first, second].into_iter().find(|r| r.is_err()).unwrap().unwrap_err(),
            Error::SlotConflict
        ));
    }

    #[test_log::test(tokio::test)]
    async fn approval_charges_and_stamps_the_approver() {
        let h = harness().await;
        let account = Uuid::new_v4();
        let admin = Uuid::new_v4();
        h.ledger.grant(account, 10, None, None).await.unwrap();

        let (start, end) = slot(3);
        h.store
            .transaction(|state| {
                Calendar::new(state)
                    .create_closed_date(start.with_timezone(&Mexico_City).date_naive(), "Holiday".to_string());
                Ok::<_, Error>(())
            })
            .await
            .unwrap();

        let pending = h.workflow.create(account, h.space_id, start, end, None).await.unwrap();
        let approved = h.workflow.approve(pending.id, admin).await.unwrap();

        assert_eq!(approved.status, ReservationStatus::Confirmed);
        assert_eq!(approved.approved_by, Some(admin));
        assert!(approved.approved_at.is_some());
        assert_eq!(h.ledger.active_balance(account).await, 3);

        assert!(matches!(h.workflow.approve(pending.id, admin).await.unwrap_err(), Error::NotPending));
    }

    #[test_log::test(tokio::test)]
    async fn approval_fails_when_the_slot_was_taken_meanwhile() {
        let h = harness().await;
        let account = Uuid::new_v4();
        let rival = Uuid::new_v4();
        let admin = Uuid::new_v4();
        h.ledger.grant(account, 10, None, None).await.unwrap();
        h.ledger.grant(rival, 10, None, None).await.unwrap();

        let (start, end) = slot(3);
        h.store
            .transaction(|state| {
                Calendar::new(state)
                    .create_closed_date(start.with_timezone(&Mexico_City).date_naive(), "Holiday".to_string());
                Ok::<_, Error>(())
            })
            .await
            .unwrap();
        let pending = h.workflow.create(account, h.space_id, start, end, None).await.unwrap();

        // A rival books the same slot directly as confirmed.
        confirmed_reservation(&h.store, rival, h.space_id, start, 6).await;

        let err = h.workflow.approve(pending.id, admin).await.unwrap_err();
        assert!(matches!(err, Error::SlotConflict));
        assert_eq!(h.workflow.get(pending.id).await.unwrap().status, ReservationStatus::Pending);
        assert_eq!(h.ledger.active_balance(account).await, 10, "no ledger mutation on failed approval");
    }

    #[test_log::test(tokio::test)]
    async fn early_cancellation_refunds_in_full_late_forfeits() {
        let h = harness().await;
        let account = Uuid::new_v4();

        let early = confirmed_reservation(&h.store, account, h.space_id, Utc::now() + Duration::hours(48), 6).await;
        h.workflow.cancel(early.id, account, None).await.unwrap();
        assert_eq!(h.ledger.active_balance(account).await, 6, "full refund at >=24h notice");

        let late = confirmed_reservation(&h.store, account, h.space_id, Utc::now() + Duration::hours(2), 6).await;
        h.workflow.cancel(late.id, account, None).await.unwrap();
        assert_eq!(h.ledger.active_balance(account).await, 6, "late cancellation forfeits the charge");
    }

    #[test_log::test(tokio::test)]
    async fn explicit_refund_override_wins_over_the_cutoff_rule() {
        let h = harness().await;
        let account = Uuid::new_v4();
        let late = confirmed_reservation(&h.store, account, h.space_id, Utc::now() + Duration::hours(2), 6).await;
        h.workflow.cancel(late.id, account, Some(4)).await.unwrap();
        assert_eq!(h.ledger.active_balance(account).await, 4);
    }

    #[test_log::test(tokio::test)]
    async fn cancellation_guards_ownership_and_terminal_states() {
        let h = harness().await;
        let owner = Uuid::new_v4();
        let stranger = Uuid::new_v4();
        let reservation = confirmed_reservation(&h.store, owner, h.space_id, Utc::now() + Duration::hours(48), 6).await;

        assert!(matches!(
            h.workflow.cancel(reservation.id, stranger, None).await.unwrap_err(),
            Error::NotFound { resource: "reservation", .. }
        ));

        h.workflow.cancel(reservation.id, owner, None).await.unwrap();
        assert!(matches!(
            h.workflow.cancel(reservation.id, owner, None).await.unwrap_err(),
            Error::AlreadyCancelled
        ));

        let done = confirmed_reservation(&h.store, owner, h.space_id, Utc::now() + Duration::hours(72), 6).await;
        h.store
            .transaction(|state| {
                let mut r = Reservations::new(state).get(done.id)?;
                r.status = ReservationStatus::Completed;
                Reservations::new(state).update(&r)
            })
            .await
            .unwrap();
        assert!(matches!(
            h.workflow.cancel(done.id, owner, None).await.unwrap_err(),
            Error::AlreadyCompleted
        ));
    }

    #[test_log::test(tokio::test)]
    async fn admin_cancel_splits_refund_and_penalty() {
        let h = harness().await;
        let account = Uuid::new_v4();
        let admin = Uuid::new_v4();
        let reservation = confirmed_reservation(&h.store, account, h.space_id, Utc::now() + Duration::hours(48), 7).await;

        h.workflow
            .admin_cancel(reservation.id, admin, Some("No-show history".to_string()), 2, None)
            .await
            .unwrap();

        assert_eq!(h.ledger.active_balance(account).await, 5, "refund = credits_used - penalty");
        let (cancellations, penalties) = h
            .store
            .transaction(|state| {
                let mut repo = Reservations::new(state);
                Ok::<_, Error>((repo.cancellations_for(reservation.id), repo.penalties_for(reservation.id)))
            })
            .await
            .unwrap();
        assert_eq!(cancellations.len(), 1);
        assert_eq!(cancellations[0].status, CancellationStatus::Refunded);
        assert_eq!(cancellations[0].refunded_credits, 5);
        assert_eq!(cancellations[0].penalty_credits, 2);
        assert_eq!(cancellations[0].cancelled_by, Some(admin));
        assert_eq!(penalties.len(), 1);
        assert_eq!(penalties[0].amount, 2);
        assert_eq!(penalties[0].status, PenaltyStatus::Pending);
    }

    #[test_log::test(tokio::test)]
    async fn admin_cancel_of_pending_booking_collects_penalty_from_balance() {
        let h = harness().await;
        let account = Uuid::new_v4();
        let admin = Uuid::new_v4();
        h.ledger.grant(account, 6, None, None).await.unwrap();

        let (start, end) = slot(3);
        h.store
            .transaction(|state| {
                Calendar::new(state)
                    .create_closed_date(start.with_timezone(&Mexico_City).date_naive(), "Holiday".to_string());
                Ok::<_, Error>(())
            })
            .await
            .unwrap();
        let pending = h.workflow.create(account, h.space_id, start, end, None).await.unwrap();

        h.workflow.admin_cancel(pending.id, admin, None, 2, None).await.unwrap();
        assert_eq!(h.ledger.active_balance(account).await, 4, "penalty deducted, nothing to refund");

        // With the balance drained, a penalty larger than it fails whole.
        let second = confirmed_reservation(&h.store, account, h.space_id, start + Duration::days(1), 0).await;
        h.store
            .transaction(|state| {
                let mut r = Reservations::new(state).get(second.id)?;
                r.status = ReservationStatus::Pending;
                Reservations::new(state).update(&r)
            })
            .await
            .unwrap();
        let err = h.workflow.admin_cancel(second.id, admin, None, 10, None).await.unwrap_err();
        assert!(matches!(err, Error::InsufficientCredits { .. }));
        assert_eq!(h.workflow.get(second.id).await.unwrap().status, ReservationStatus::Pending);
        assert_eq!(h.ledger.active_balance(account).await, 4);
    }

    #[test_log::test(tokio::test)]
    async fn external_bookings_charge_nothing_and_reuse_clients_by_phone() {
        let h = harness().await;
        let admin = Uuid::new_v4();
        let (start, end) = slot(3);

        let booking = |start: DateTime<Utc>, end: DateTime<Utc>| ExternalBooking {
            space_id: h.space_id,
            start_time: start,
            end_time: end,
            client_name: "Dana Reyes".to_string(),
            client_phone: "+52 55 1234 5678".to_string(),
            client_email: None,
            notes: None,
        };

        let first = h.workflow.create_external(admin, booking(start, end)).await.unwrap();
        assert_eq!(first.status, ReservationStatus::Confirmed);
        assert_eq!(first.credits_used, 0);
        assert_eq!(first.created_by, Some(admin));
        assert!(first.external_client_id.is_some());

        let second = h
            .workflow
            .create_external(admin, booking(end, end + Duration::hours(1)))
            .await
            .unwrap();
        assert_eq!(second.external_client_id, first.external_client_id);

        // Penalties need an account to charge.
        let err = h.workflow.admin_cancel(first.id, admin, None, 3, None).await.unwrap_err();
        assert!(matches!(err, Error::BadRequest { .. }));
        h.workflow.admin_cancel(first.id, admin, None, 0, None).await.unwrap();
    }

    #[test_log::test(tokio::test)]
    async fn committed_transitions_emit_events() {
        let h = harness().await;
        let account = Uuid::new_v4();
        h.ledger.grant(account, 10, None, None).await.unwrap();
        let mut rx = h.workflow.events.subscribe();

        let (start, end) = slot(3);
        let reservation = h.workflow.create(account, h.space_id, start, end, None).await.unwrap();
        let created = rx.recv().await.unwrap();
        assert_eq!(created.action, EventAction::Created);
        assert_eq!(created.reservation_id, reservation.id);
        assert_eq!(created.space_name, "Studio A");

        h.workflow.cancel(reservation.id, account, None).await.unwrap();
        let cancelled = rx.recv().await.unwrap();
        assert_eq!(cancelled.action, EventAction::Cancelled);
        assert_eq!(cancelled.status, ReservationStatus::Cancelled);
    }

    #[test_log::test(tokio::test)]
    async fn pending_reservations_list_soonest_first() {
        let h = harness().await;
        let account = Uuid::new_v4();
        let admin = Uuid::new_v4();
        h.ledger.grant(account, 20, None, None).await.unwrap();

        let (s1, e1) = slot(3);
        let (s2, e2) = slot(2);
        h.store
            .transaction(|state| {
                let mut cal = Calendar::new(state);
                cal.create_closed_date(s1.with_timezone(&Mexico_City).date_naive(), "A".to_string());
                cal.create_closed_date(s2.with_timezone(&Mexico_City).date_naive(), "B".to_string());
                Ok::<_, Error>(())
            })
            .await
            .unwrap();

        h.workflow.create(account, h.space_id, s1, e1, None).await.unwrap();
        let earlier = h.workflow.create(account, h.space_id, s2, e2, None).await.unwrap();

        let pending = h.workflow.list_pending().await;
        assert_eq!(pending.len(), 2);
        assert_eq!(pending[0].id, earlier.id);

        h.workflow.approve(earlier.id, admin).await.unwrap();
        assert_eq!(h.workflow.list_pending().await.len(), 1);
    }
}
