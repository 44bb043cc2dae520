//! Storage models for credit lots and the ledger audit history.

use crate::types::{AccountId, LotId, ReservationId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// A batch of credits sharing one grant event and one expiry date.
///
/// Invariant: `amount >= 0`; a lot drained to zero is deactivated and never
/// reused. Lots are never deleted, only deactivated.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CreditLot {
    pub id: LotId,
    pub account_id: AccountId,
    pub amount: i64,
    pub purchase_date: DateTime<Utc>,
    pub expiry_date: DateTime<Utc>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl CreditLot {
    /// Active and not yet expired at `now`.
    pub fn is_spendable(&self, now: DateTime<Utc>) -> bool {
        self.is_active && self.expiry_date > now
    }
}

/// Storage request for creating a new credit lot
#[derive(Debug, Clone)]
pub struct LotCreateDBRequest {
    pub account_id: AccountId,
    pub amount: i64,
    pub expiry_date: DateTime<Utc>,
    pub reason: Option<String>,
}

/// Ledger audit action stored with each history entry
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum LedgerAction {
    Granted,
    Deducted,
    TransferredIn,
    TransferredOut,
    Refunded,
}

/// Append-only audit record of a ledger mutation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: uuid::Uuid,
    pub account_id: AccountId,
    pub amount: i64,
    pub action: LedgerAction,
    pub description: Option<String>,
    pub reservation_id: Option<ReservationId>,
    pub created_at: DateTime<Utc>,
}

/// Per-account balance row for the admin balances listing
#[derive(Debug, Clone)]
pub struct AccountBalanceDBResponse {
    pub account_id: AccountId,
    pub active_balance: i64,
}
