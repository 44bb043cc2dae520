//! Storage layer for the reservation and credit-ledger engine.
//!
//! The engine runs against an embedded, in-process store. Persistence-engine
//! details are deliberately out of scope; everything above this module talks
//! to repositories, so swapping in a relational backend is a storage-layer
//! change only.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐
//! │  Handlers   │  (API request handlers)
//! └──────┬──────┘
//!        │
//!        ↓
//! ┌─────────────┐
//! │  Services   │  (ledger / policy / conflict / workflow)
//! └──────┬──────┘
//!        │
//!        ↓
//! ┌─────────────┐
//! │ Repositories│  (db::handlers - queries & mutations)
//! └──────┬──────┘
//!        │
//!        ↓
//! ┌─────────────┐
//! │    Store    │  (snapshot transactions over StoreState)
//! └─────────────┘
//! ```
//!
//! # Transactions
//!
//! All multi-step mutations go through [`Store::transaction`]: the write lock
//! is taken, the committed state is cloned, the closure mutates the clone, and
//! only a successful return swaps the clone in. A failed operation therefore
//! leaves the committed state untouched, and the single writer lock serializes
//! every check-then-act sequence (conflict check + insert, balance check +
//! deduction), which is what keeps the no-overlap and no-overspend invariants
//! under concurrency.
//!
//! Repositories are created from a transaction's state, never held across one:
//!
//! ```ignore
//! store
//!     .transaction(|state| {
//!         let mut lots = Lots::new(state);
//!         let lot = lots.create(&request);
//!         Ok(lot)
//!     })
//!     .await
//! ```

pub mod errors;
pub mod handlers;
pub mod models;

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use uuid::Uuid;

use crate::types::{ClosedDateId, LotId, ReservationId, ScheduleId, SpaceId};
use models::{
    calendar::{BusinessHoursEntry, ClosedDate},
    credits::{CreditLot, LedgerEntry},
    reservations::{Cancellation, ExternalClient, Penalty, Reservation},
    spaces::{ScheduleEntry, Space},
};

/// The committed state of the embedded store. Cloned wholesale per
/// transaction; cheap at the scale this engine serves.
#[derive(Debug, Clone, Default)]
pub struct StoreState {
    pub lots: HashMap<LotId, CreditLot>,
    pub ledger_history: Vec<LedgerEntry>,
    pub spaces: HashMap<SpaceId, Space>,
    pub schedules: HashMap<ScheduleId, ScheduleEntry>,
    /// Keyed by day-of-week (0=Sunday..6=Saturday); one entry per day.
    pub business_hours: HashMap<u8, BusinessHoursEntry>,
    pub closed_dates: HashMap<ClosedDateId, ClosedDate>,
    pub reservations: HashMap<ReservationId, Reservation>,
    pub external_clients: HashMap<Uuid, ExternalClient>,
    pub cancellations: Vec<Cancellation>,
    pub penalties: Vec<Penalty>,
}

/// Handle to the embedded store. Cloning is cheap and shares the state.
#[derive(Debug, Clone, Default)]
pub struct Store {
    inner: Arc<RwLock<StoreState>>,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `f` against a snapshot of the committed state. Commit on `Ok`,
    /// discard on `Err`. See the module docs for the isolation argument.
    pub async fn transaction<T, E>(&self, f: impl FnOnce(&mut StoreState) -> Result<T, E>) -> Result<T, E> {
        let mut guard = self.inner.write().await;
        let mut draft = guard.clone();
        let out = f(&mut draft)?;
        *guard = draft;
        Ok(out)
    }

    /// Read-only access to the latest committed state. Reads never see a
    /// half-applied transaction because commits swap the state atomically
    /// under the write lock.
    pub async fn view<T>(&self, f: impl FnOnce(&StoreState) -> T) -> T {
        let guard = self.inner.read().await;
        f(&guard)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::spaces::SpaceCreateDBRequest;

    fn space_request(name: &str) -> SpaceCreateDBRequest {
        SpaceCreateDBRequest {
            name: name.to_string(),
            description: None,
            capacity: 1,
            cost_credits: 6,
        }
    }

    #[tokio::test]
    async fn failed_transaction_leaves_state_untouched() {
        let store = Store::new();

        store
            .transaction(|state| {
                let mut spaces = handlers::Spaces::new(state);
                spaces.create(&space_request("cabin-a"));
                Ok::<_, crate::errors::Error>(())
            })
            .await
            .unwrap();

        let result: Result<(), crate::errors::Error> = store
            .transaction(|state| {
                let mut spaces = handlers::Spaces::new(state);
                spaces.create(&space_request("cabin-b"));
                Err(crate::errors::Error::SlotConflict)
            })
            .await;
        assert!(result.is_err());

        let count = store.view(|state| state.spaces.len()).await;
        assert_eq!(count, 1, "rolled-back insert must not be visible");
    }
}
