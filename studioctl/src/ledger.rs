//! Credit ledger: expiring lots per account, spent FIFO-by-expiry.
//!
//! Deductions always consume the soonest-to-expire lot first, which minimizes
//! wastage: credit that is about to expire is spent before credit with time
//! left. Deduction is split into a pure planning step and an apply step, both
//! inside one transaction: snapshot the spendable lots in expiry order, build
//! a [`DeductionPlan`] in memory, then write every lot update. Nothing
//! partial is ever committed.

use chrono::{DateTime, Duration, Utc};
use tracing::{info, instrument};

use crate::db::handlers::Lots;
use crate::db::models::credits::{AccountBalanceDBResponse, CreditLot, LedgerAction, LedgerEntry, LotCreateDBRequest};
use crate::db::{Store, StoreState};
use crate::errors::{Error, Result};
use crate::types::{AccountId, LotId, ReservationId, abbrev_uuid};

/// One lot's contribution to a deduction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LotDraw {
    pub lot_id: LotId,
    pub draw: i64,
    pub remaining_after: i64,
}

/// In-memory deduction plan over a snapshot of spendable lots.
#[derive(Debug, Clone)]
pub struct DeductionPlan {
    pub draws: Vec<LotDraw>,
}

impl DeductionPlan {
    /// Build a plan against `lots`, which must already be filtered to
    /// spendable lots and ordered by expiry ascending.
    pub fn build(lots: &[CreditLot], amount: i64) -> Result<Self> {
        if amount <= 0 {
            return Err(Error::InvalidAmount {
                message: "Deduction amount must be positive".to_string(),
            });
        }

        let available: i64 = lots.iter().map(|lot| lot.amount).sum();
        if available < amount {
            return Err(Error::InsufficientCredits {
                required: amount,
                available,
            });
        }

        let mut draws = Vec::new();
        let mut remaining = amount;
        for lot in lots {
            if remaining == 0 {
                break;
            }
            let draw = lot.amount.min(remaining);
            remaining -= draw;
            draws.push(LotDraw {
                lot_id: lot.id,
                draw,
                remaining_after: lot.amount - draw,
            });
        }
        Ok(Self { draws })
    }

    /// Write the planned updates back through the repository. A lot drained
    /// to zero is deactivated and never reused.
    pub fn apply(&self, lots: &mut Lots<'_>) -> crate::db::errors::Result<()> {
        for draw in &self.draws {
            let mut lot = lots.get(draw.lot_id)?;
            lot.amount = draw.remaining_after;
            if lot.amount == 0 {
                lot.is_active = false;
            }
            lots.update(&lot)?;
        }
        Ok(())
    }
}

/// Grant a lot inside an existing transaction. Used by the ledger operations
/// below and by the reservation workflow's refund path.
pub(crate) fn grant_tx(
    state: &mut StoreState,
    account_id: AccountId,
    amount: i64,
    expiry_days: i64,
    action: LedgerAction,
    description: Option<String>,
    reservation_id: Option<ReservationId>,
) -> CreditLot {
    let mut lots = Lots::new(state);
    let lot = lots.create(&LotCreateDBRequest {
        account_id,
        amount,
        expiry_date: Utc::now() + Duration::days(expiry_days),
        reason: description.clone(),
    });
    lots.record(account_id, amount, action, description, reservation_id);
    lot
}

/// Deduct inside an existing transaction: snapshot, plan, apply, audit.
pub(crate) fn deduct_tx(
    state: &mut StoreState,
    account_id: AccountId,
    amount: i64,
    now: DateTime<Utc>,
    action: LedgerAction,
    description: Option<String>,
    reservation_id: Option<ReservationId>,
) -> Result<()> {
    let mut lots = Lots::new(state);
    let snapshot = lots.active_lots_by_expiry(account_id, now);
    let plan = DeductionPlan::build(&snapshot, amount)?;
    plan.apply(&mut lots).map_err(Error::from)?;
    lots.record(account_id, amount, action, description, reservation_id);
    Ok(())
}

/// The credit-ledger service surface exposed to the API layer and the
/// reservation workflow.
#[derive(Debug, Clone)]
pub struct CreditLedger {
    store: Store,
    default_expiry_days: i64,
}

impl CreditLedger {
    pub fn new(store: Store, default_expiry_days: i64) -> Self {
        Self { store, default_expiry_days }
    }

    #[instrument(skip(self), fields(account = %abbrev_uuid(&account_id)))]
    pub async fn grant(&self, account_id: AccountId, amount: i64, expiry_days: Option<i64>, reason: Option<String>) -> Result<CreditLot> {
        if amount <= 0 {
            return Err(Error::InvalidAmount {
                message: "Granted amount must be positive".to_string(),
            });
        }
        let days = expiry_days.unwrap_or(self.default_expiry_days);
        let lot = self
            .store
            .transaction(|state| Ok::<_, Error>(grant_tx(state, account_id, amount, days, LedgerAction::Granted, reason.clone(), None)))
            .await?;
        info!(lot = %abbrev_uuid(&lot.id), amount, days, "granted credit lot");
        Ok(lot)
    }

    pub async fn active_balance(&self, account_id: AccountId) -> i64 {
        let now = Utc::now();
        self.store
            .view(|state| {
                state
                    .lots
                    .values()
                    .filter(|lot| lot.account_id == account_id && lot.is_spendable(now))
                    .map(|lot| lot.amount)
                    .sum()
            })
            .await
    }

    #[instrument(skip(self), fields(account = %abbrev_uuid(&account_id)))]
    pub async fn deduct(&self, account_id: AccountId, amount: i64, reason: Option<String>) -> Result<()> {
        let now = Utc::now();
        self.store
            .transaction(|state| deduct_tx(state, account_id, amount, now, LedgerAction::Deducted, reason.clone(), None))
            .await?;
        info!(amount, "deducted credits");
        Ok(())
    }

    /// Deactivate all lots whose expiry has passed. Idempotent; run by the
    /// background sweeper and exposed to admins.
    pub async fn expire_stale(&self) -> usize {
        let now = Utc::now();
        let expired = self
            .store
            .transaction(|state| Ok::<_, Error>(Lots::new(state).expire_stale(now)))
            .await
            .unwrap_or(0);
        if expired > 0 {
            info!(expired, "deactivated stale credit lots");
        }
        expired
    }

    pub async fn extend_lot_expiry(&self, lot_id: LotId, days: i64) -> Result<CreditLot> {
        if days <= 0 {
            return Err(Error::InvalidAmount {
                message: "Days to extend must be positive".to_string(),
            });
        }
        self.store
            .transaction(|state| {
                let mut lots = Lots::new(state);
                let mut lot = lots.get(lot_id)?;
                if !lot.is_active || lot.amount <= 0 {
                    return Err(Error::LotInactiveOrExpired);
                }
                lot.expiry_date += Duration::days(days);
                lots.update(&lot)?;
                Ok(lot)
            })
            .await
    }

    pub async fn reactivate_lot(&self, lot_id: LotId, new_expiry: DateTime<Utc>) -> Result<CreditLot> {
        self.store
            .transaction(|state| {
                let mut lots = Lots::new(state);
                let mut lot = lots.get(lot_id)?;
                if lot.is_active {
                    return Err(Error::BadRequest {
                        message: "Lot is already active".to_string(),
                    });
                }
                if lot.amount <= 0 {
                    return Err(Error::BadRequest {
                        message: "Lot has no credits left to reactivate".to_string(),
                    });
                }
                lot.is_active = true;
                lot.expiry_date = new_expiry;
                lots.update(&lot)?;
                Ok(lot)
            })
            .await
    }

    /// Push the expiry of every active, funded lot of one account forward.
    /// Returns the number of lots extended.
    #[instrument(skip(self), fields(account = %abbrev_uuid(&account_id)))]
    pub async fn extend_account_expiry(&self, account_id: AccountId, days: i64) -> Result<usize> {
        if days <= 0 {
            return Err(Error::InvalidAmount {
                message: "Days to extend must be positive".to_string(),
            });
        }
        let updated = self
            .store
            .transaction(|state| Ok::<_, Error>(Lots::new(state).extend_active(account_id, days)))
            .await?;
        info!(updated, days, "extended account lot expiries");
        Ok(updated)
    }

    /// Bring every expired-and-swept lot of one account back with a fresh
    /// expiry. Drained lots stay dead. Returns the number reactivated.
    #[instrument(skip(self), fields(account = %abbrev_uuid(&account_id)))]
    pub async fn reactivate_account_lots(&self, account_id: AccountId, new_expiry: DateTime<Utc>) -> Result<usize> {
        let updated = self
            .store
            .transaction(|state| Ok::<_, Error>(Lots::new(state).reactivate_inactive(account_id, new_expiry)))
            .await?;
        info!(updated, "reactivated account lots");
        Ok(updated)
    }

    pub async fn deduct_from_lot(&self, lot_id: LotId, amount: i64) -> Result<CreditLot> {
        let now = Utc::now();
        self.store
            .transaction(|state| {
                let mut lots = Lots::new(state);
                let lot = deduct_from_lot_tx(&mut lots, lot_id, amount, now)?;
                lots.record(lot.account_id, amount, LedgerAction::Deducted, Some("Admin lot deduction".to_string()), None);
                Ok(lot)
            })
            .await
    }

    /// Atomically deduct from one lot and grant a fresh default-expiry lot to
    /// the destination account. The destination may be the source account
    /// itself; that re-lots the credits with a fresh expiry.
    pub async fn transfer_from_lot(&self, lot_id: LotId, to_account: AccountId, amount: i64) -> Result<CreditLot> {
        let now = Utc::now();
        let days = self.default_expiry_days;
        self.store
            .transaction(|state| {
                {
                    let mut lots = Lots::new(state);
                    let source = deduct_from_lot_tx(&mut lots, lot_id, amount, now)?;
                    lots.record(
                        source.account_id,
                        amount,
                        LedgerAction::TransferredOut,
                        Some("Lot transfer".to_string()),
                        None,
                    );
                }
                let dest = grant_tx(state, to_account, amount, days, LedgerAction::TransferredIn, Some("Lot transfer".to_string()), None);
                Ok::<_, Error>(dest)
            })
            .await
    }

    /// Account-level transfer: FIFO deduction from the source, one new
    /// default-expiry lot for the destination, one transaction.
    #[instrument(skip(self), fields(from = %abbrev_uuid(&from), to = %abbrev_uuid(&to)))]
    pub async fn transfer(&self, from: AccountId, to: AccountId, amount: i64) -> Result<()> {
        if from == to {
            return Err(Error::SameAccount);
        }
        if amount <= 0 {
            return Err(Error::InvalidAmount {
                message: "Transfer amount must be positive".to_string(),
            });
        }
        let now = Utc::now();
        let days = self.default_expiry_days;
        self.store
            .transaction(|state| {
                deduct_tx(state, from, amount, now, LedgerAction::TransferredOut, Some("Transfer out".to_string()), None)?;
                grant_tx(state, to, amount, days, LedgerAction::TransferredIn, Some("Transfer in".to_string()), None);
                Ok::<_, Error>(())
            })
            .await?;
        info!(amount, "transferred credits");
        Ok(())
    }

    pub async fn lots_for_account(&self, account_id: AccountId) -> Vec<CreditLot> {
        self.store
            .transaction(|state| Ok::<_, Error>(Lots::new(state).list_for_account(account_id)))
            .await
            .unwrap_or_default()
    }

    pub async fn history_for_account(&self, account_id: AccountId) -> Vec<LedgerEntry> {
        self.store
            .transaction(|state| Ok::<_, Error>(Lots::new(state).history_for_account(account_id)))
            .await
            .unwrap_or_default()
    }

    pub async fn all_balances(&self) -> Vec<AccountBalanceDBResponse> {
        let now = Utc::now();
        self.store
            .transaction(|state| Ok::<_, Error>(Lots::new(state).all_balances(now)))
            .await
            .unwrap_or_default()
    }
}

/// Shared body for the lot-scoped deduction ops. Validates the lot, drains
/// `amount` from it, deactivates it at zero, and returns the updated lot.
fn deduct_from_lot_tx(lots: &mut Lots<'_>, lot_id: LotId, amount: i64, now: DateTime<Utc>) -> Result<CreditLot> {
    if amount <= 0 {
        return Err(Error::InvalidAmount {
            message: "Deduction amount must be positive".to_string(),
        });
    }
    let mut lot = lots.get(lot_id)?;
    if !lot.is_spendable(now) {
        return Err(Error::LotInactiveOrExpired);
    }
    if lot.amount < amount {
        return Err(Error::InsufficientCredits {
            required: amount,
            available: lot.amount,
        });
    }
    lot.amount -= amount;
    if lot.amount == 0 {
        lot.is_active = false;
    }
    lots.update(&lot)?;
    Ok(lot)
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn ledger() -> CreditLedger {
        CreditLedger::new(Store::new(), 30)
    }

    #[tokio::test]
    async fn grant_rejects_non_positive_amounts() {
        let ledger = ledger();
        let account = Uuid::new_v4();
        assert!(matches!(ledger.grant(account, 0, None, None).await, Err(Error::InvalidAmount { .. })));
        assert!(matches!(ledger.grant(account, -5, None, None).await, Err(Error::InvalidAmount { .. })));
    }

    #[tokio::test]
    async fn deduction_is_fifo_by_expiry() {
        let ledger = ledger();
        let account = Uuid::new_v4();

        // B granted first but expires later; A must be drained first.
        let b = ledger.grant(account, 5, Some(20), None).await.unwrap();
        let a = ledger.grant(account, 3, Some(10), None).await.unwrap();

        ledger.deduct(account, 4, None).await.unwrap();

        let lots = ledger.lots_for_account(account).await;
        let a_after = lots.iter().find(|l| l.id == a.id).unwrap();
        let b_after = lots.iter().find(|l| l.id == b.id).unwrap();
        assert_eq!(a_after.amount, 0);
        assert!(!a_after.is_active, "drained lot is deactivated");
        assert_eq!(b_after.amount, 4);
        assert!(b_after.is_active);
        assert_eq!(ledger.active_balance(account).await, 4);
    }

    #[tokio::test]
    async fn failed_deduction_mutates_nothing() {
        let ledger = ledger();
        let account = Uuid::new_v4();
        ledger.grant(account, 3, None, None).await.unwrap();
        ledger.grant(account, 2, None, None).await.unwrap();

        let err = ledger.deduct(account, 6, None).await.unwrap_err();
        assert!(matches!(err, Error::InsufficientCredits { required: 6, available: 5 }));

        let lots = ledger.lots_for_account(account).await;
        assert!(lots.iter().all(|l| l.is_active));
        assert_eq!(ledger.active_balance(account).await, 5);
    }

    #[tokio::test]
    async fn balance_tracks_grant_deduct_transfer_sequences() {
        let ledger = ledger();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();

        ledger.grant(a, 10, None, None).await.unwrap();
        ledger.deduct(a, 4, None).await.unwrap();
        ledger.transfer(a, b, 3).await.unwrap();

        assert_eq!(ledger.active_balance(a).await, 3);
        assert_eq!(ledger.active_balance(b).await, 3);
    }

    #[tokio::test]
    async fn transfer_to_self_is_rejected() {
        let ledger = ledger();
        let account = Uuid::new_v4();
        ledger.grant(account, 10, None, None).await.unwrap();
        assert!(matches!(ledger.transfer(account, account, 1).await, Err(Error::SameAccount)));
        assert_eq!(ledger.active_balance(account).await, 10);
    }

    #[tokio::test]
    async fn transfer_without_funds_leaves_both_accounts_untouched() {
        let ledger = ledger();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        ledger.grant(a, 2, None, None).await.unwrap();

        assert!(matches!(
            ledger.transfer(a, b, 5).await,
            Err(Error::InsufficientCredits { .. })
        ));
        assert_eq!(ledger.active_balance(a).await, 2);
        assert_eq!(ledger.active_balance(b).await, 0);
    }

    #[tokio::test]
    async fn expired_lots_never_contribute_to_balance() {
        let ledger = ledger();
        let account = Uuid::new_v4();
        ledger.grant(account, 7, Some(-1), None).await.unwrap();
        ledger.grant(account, 6, None, None).await.unwrap();

        assert_eq!(ledger.active_balance(account).await, 6);

        // Sweeping twice produces the same final state as once.
        assert_eq!(ledger.expire_stale().await, 1);
        assert_eq!(ledger.expire_stale().await, 0);
        assert_eq!(ledger.active_balance(account).await, 6);
    }

    #[tokio::test]
    async fn lot_scoped_operations_validate_the_lot() {
        let ledger = ledger();
        let account = Uuid::new_v4();
        let other = Uuid::new_v4();

        let stale = ledger.grant(account, 5, Some(-1), None).await.unwrap();
        assert!(matches!(
            ledger.deduct_from_lot(stale.id, 2).await,
            Err(Error::LotInactiveOrExpired)
        ));
        assert!(matches!(
            ledger.extend_lot_expiry(stale.id, 0).await,
            Err(Error::InvalidAmount { .. })
        ));

        let live = ledger.grant(account, 5, Some(10), None).await.unwrap();
        assert!(matches!(
            ledger.deduct_from_lot(live.id, 9).await,
            Err(Error::InsufficientCredits { required: 9, available: 5 })
        ));

        let after = ledger.deduct_from_lot(live.id, 5).await.unwrap();
        assert_eq!(after.amount, 0);
        assert!(!after.is_active);

        // Reactivation requires an inactive lot with credits left; the
        // drained lot fails, the expired-but-funded one succeeds after the
        // sweeper deactivates it.
        assert!(ledger.reactivate_lot(after.id, Utc::now() + Duration::days(5)).await.is_err());
        ledger.expire_stale().await;
        let revived = ledger.reactivate_lot(stale.id, Utc::now() + Duration::days(5)).await.unwrap();
        assert!(revived.is_active);
        assert_eq!(ledger.active_balance(account).await, 5);

        let dest = ledger.transfer_from_lot(revived.id, other, 2).await.unwrap();
        assert_eq!(dest.account_id, other);
        assert_eq!(dest.amount, 2);
        assert_eq!(ledger.active_balance(account).await, 3);
        assert_eq!(ledger.active_balance(other).await, 2);
    }

    #[tokio::test]
    async fn same_account_lot_transfer_resets_the_expiry() {
        let ledger = ledger();
        let account = Uuid::new_v4();

        let short = ledger.grant(account, 4, Some(2), None).await.unwrap();
        let dest = ledger.transfer_from_lot(short.id, account, 4).await.unwrap();

        assert_eq!(dest.account_id, account);
        assert_eq!(dest.amount, 4);
        assert!(dest.expiry_date > short.expiry_date, "re-lotted credits get the default horizon");
        assert!(!ledger.lots_for_account(account).await.iter().find(|l| l.id == short.id).unwrap().is_active);
        assert_eq!(ledger.active_balance(account).await, 4);
    }

    #[tokio::test]
    async fn account_wide_extension_moves_every_funded_active_lot() {
        let ledger = ledger();
        let account = Uuid::new_v4();

        let a = ledger.grant(account, 3, Some(5), None).await.unwrap();
        let b = ledger.grant(account, 2, Some(9), None).await.unwrap();
        ledger.grant(account, 8, Some(-1), None).await.unwrap();
        ledger.expire_stale().await;

        assert!(matches!(
            ledger.extend_account_expiry(account, 0).await,
            Err(Error::InvalidAmount { .. })
        ));
        assert_eq!(ledger.extend_account_expiry(account, 10).await.unwrap(), 2);

        let lots = ledger.lots_for_account(account).await;
        let find = |id| lots.iter().find(|l| l.id == id).unwrap();
        assert_eq!(find(a.id).expiry_date, a.expiry_date + Duration::days(10));
        assert_eq!(find(b.id).expiry_date, b.expiry_date + Duration::days(10));
    }

    #[tokio::test]
    async fn account_wide_reactivation_revives_only_funded_expired_lots() {
        let ledger = ledger();
        let account = Uuid::new_v4();

        ledger.grant(account, 5, Some(-1), None).await.unwrap();
        ledger.grant(account, 3, Some(-1), None).await.unwrap();
        let live = ledger.grant(account, 2, Some(10), None).await.unwrap();
        ledger.deduct_from_lot(live.id, 2).await.unwrap();
        ledger.expire_stale().await;

        let new_expiry = Utc::now() + Duration::days(15);
        assert_eq!(ledger.reactivate_account_lots(account, new_expiry).await.unwrap(), 2);
        assert_eq!(ledger.active_balance(account).await, 8);
        // Nothing left to revive on a second pass.
        assert_eq!(ledger.reactivate_account_lots(account, new_expiry).await.unwrap(), 0);
    }

    #[test]
    fn plan_draws_in_order_and_marks_drained_lots() {
        let account = Uuid::new_v4();
        let now = Utc::now();
        let lot = |amount: i64, days: i64| CreditLot {
            id: Uuid::new_v4(),
            account_id: account,
            amount,
            purchase_date: now,
            expiry_date: now + Duration::days(days),
            is_active: true,
            created_at: now,
        };

        let lots = vec![lot(3, 1), lot(5, 2)];
        let plan = DeductionPlan::build(&lots, 4).unwrap();
        assert_eq!(plan.draws.len(), 2);
        assert_eq!(plan.draws[0].draw, 3);
        assert_eq!(plan.draws[0].remaining_after, 0);
        assert_eq!(plan.draws[1].draw, 1);
        assert_eq!(plan.draws[1].remaining_after, 4);
    }
}
