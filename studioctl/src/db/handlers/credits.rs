use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use crate::db::StoreState;
use crate::db::errors::{DbError, Result};
use crate::db::models::credits::{AccountBalanceDBResponse, CreditLot, LedgerAction, LedgerEntry, LotCreateDBRequest};
use crate::types::{AccountId, LotId, ReservationId};

/// Repository for credit lots and the append-only ledger history.
pub struct Lots<'c> {
    state: &'c mut StoreState,
}

impl<'c> Lots<'c> {
    pub fn new(state: &'c mut StoreState) -> Self {
        Self { state }
    }

    /// Insert a new lot. Amount validation happens in the ledger service;
    /// the repository only persists.
    pub fn create(&mut self, request: &LotCreateDBRequest) -> CreditLot {
        let now = Utc::now();
        let lot = CreditLot {
            id: Uuid::new_v4(),
            account_id: request.account_id,
            amount: request.amount,
            purchase_date: now,
            expiry_date: request.expiry_date,
            is_active: true,
            created_at: now,
        };
        self.state.lots.insert(lot.id, lot.clone());
        lot
    }

    pub fn get(&mut self, id: LotId) -> Result<CreditLot> {
        self.state.lots.get(&id).cloned().ok_or(DbError::NotFound)
    }

    /// Write back a mutated lot.
    pub fn update(&mut self, lot: &CreditLot) -> Result<()> {
        match self.state.lots.get_mut(&lot.id) {
            Some(existing) => {
                *existing = lot.clone();
                Ok(())
            }
            None => Err(DbError::NotFound),
        }
    }

    /// Sum of `amount` over spendable lots at `now`.
    pub fn active_balance(&mut self, account_id: AccountId, now: DateTime<Utc>) -> i64 {
        self.state
            .lots
            .values()
            .filter(|lot| lot.account_id == account_id && lot.is_spendable(now))
            .map(|lot| lot.amount)
            .sum()
    }

    /// Spendable lots ordered by expiry ascending (soonest-to-expire first),
    /// ties broken by purchase date. This is the FIFO-by-expiry order the
    /// deduction plan consumes.
    pub fn active_lots_by_expiry(&mut self, account_id: AccountId, now: DateTime<Utc>) -> Vec<CreditLot> {
        let mut lots: Vec<CreditLot> = self
            .state
            .lots
            .values()
            .filter(|lot| lot.account_id == account_id && lot.is_spendable(now))
            .cloned()
            .collect();
        lots.sort_by(|a, b| a.expiry_date.cmp(&b.expiry_date).then(a.purchase_date.cmp(&b.purchase_date)));
        lots
    }

    /// All lots for an account, newest first (admin/detail view).
    pub fn list_for_account(&mut self, account_id: AccountId) -> Vec<CreditLot> {
        let mut lots: Vec<CreditLot> = self
            .state
            .lots
            .values()
            .filter(|lot| lot.account_id == account_id)
            .cloned()
            .collect();
        lots.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        lots
    }

    /// Deactivate every active lot whose expiry has passed. Idempotent.
    /// Returns the number of lots deactivated.
    pub fn expire_stale(&mut self, now: DateTime<Utc>) -> usize {
        let mut expired = 0;
        for lot in self.state.lots.values_mut() {
            if lot.is_active && lot.expiry_date <= now {
                lot.is_active = false;
                expired += 1;
            }
        }
        expired
    }

    /// Push the expiry of every active, funded lot of one account forward by
    /// `days`. Returns the number of lots touched.
    pub fn extend_active(&mut self, account_id: AccountId, days: i64) -> usize {
        let mut updated = 0;
        for lot in self.state.lots.values_mut() {
            if lot.account_id == account_id && lot.is_active && lot.amount > 0 {
                lot.expiry_date += Duration::days(days);
                updated += 1;
            }
        }
        updated
    }

    /// Reactivate every inactive, funded lot of one account with a fresh
    /// expiry. Drained lots stay dead.
    pub fn reactivate_inactive(&mut self, account_id: AccountId, new_expiry: DateTime<Utc>) -> usize {
        let mut updated = 0;
        for lot in self.state.lots.values_mut() {
            if lot.account_id == account_id && !lot.is_active && lot.amount > 0 {
                lot.is_active = true;
                lot.expiry_date = new_expiry;
                updated += 1;
            }
        }
        updated
    }

    /// Active balance per account, for the admin balances listing.
    pub fn all_balances(&mut self, now: DateTime<Utc>) -> Vec<AccountBalanceDBResponse> {
        let mut balances: std::collections::HashMap<AccountId, i64> = std::collections::HashMap::new();
        for lot in self.state.lots.values() {
            if lot.is_spendable(now) {
                *balances.entry(lot.account_id).or_default() += lot.amount;
            }
        }
        let mut rows: Vec<AccountBalanceDBResponse> = balances
            .into_iter()
            .map(|(account_id, active_balance)| AccountBalanceDBResponse { account_id, active_balance })
            .collect();
        rows.sort_by_key(|row| row.account_id);
        rows
    }

    /// Append one audit entry to the ledger history.
    pub fn record(
        &mut self,
        account_id: AccountId,
        amount: i64,
        action: LedgerAction,
        description: Option<String>,
        reservation_id: Option<ReservationId>,
    ) -> LedgerEntry {
        let entry = LedgerEntry {
            id: Uuid::new_v4(),
            account_id,
            amount,
            action,
            description,
            reservation_id,
            created_at: Utc::now(),
        };
        self.state.ledger_history.push(entry.clone());
        entry
    }

    /// Ledger history for one account, newest first.
    pub fn history_for_account(&mut self, account_id: AccountId) -> Vec<LedgerEntry> {
        let mut entries: Vec<LedgerEntry> = self
            .state
            .ledger_history
            .iter()
            .filter(|entry| entry.account_id == account_id)
            .cloned()
            .collect();
        entries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        entries
    }
}
