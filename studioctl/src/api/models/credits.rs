use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::db::models::credits::{AccountBalanceDBResponse, CreditLot, LedgerAction, LedgerEntry};
use crate::types::{AccountId, LotId, ReservationId};

// Request models

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreditGrantRequest {
    /// Credits to grant (must be positive)
    pub amount: i64,
    /// Days until the lot expires; defaults to the configured horizon
    pub expiry_days: Option<i64>,
    /// Optional reason recorded in the ledger history
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreditDeductRequest {
    /// Credits to deduct (must be positive)
    pub amount: i64,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreditTransferRequest {
    #[schema(value_type = String, format = "uuid")]
    pub from_account_id: AccountId,
    #[schema(value_type = String, format = "uuid")]
    pub to_account_id: AccountId,
    pub amount: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LotExtendRequest {
    /// Days to add to the lot's expiry (must be positive)
    pub days: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LotReactivateRequest {
    /// New expiry instant for the revived lot
    pub new_expiry_date: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LotDeductRequest {
    pub amount: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LotTransferRequest {
    #[schema(value_type = String, format = "uuid")]
    pub to_account_id: AccountId,
    pub amount: i64,
}

// Response models

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LotResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: LotId,
    #[schema(value_type = String, format = "uuid")]
    pub account_id: AccountId,
    pub amount: i64,
    pub purchase_date: DateTime<Utc>,
    pub expiry_date: DateTime<Utc>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl From<CreditLot> for LotResponse {
    fn from(lot: CreditLot) -> Self {
        Self {
            id: lot.id,
            account_id: lot.account_id,
            amount: lot.amount,
            purchase_date: lot.purchase_date,
            expiry_date: lot.expiry_date,
            is_active: lot.is_active,
            created_at: lot.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BalanceResponse {
    #[schema(value_type = String, format = "uuid")]
    pub account_id: AccountId,
    /// Sum over active, unexpired lots
    pub active_balance: i64,
}

impl From<AccountBalanceDBResponse> for BalanceResponse {
    fn from(row: AccountBalanceDBResponse) -> Self {
        Self {
            account_id: row.account_id,
            active_balance: row.active_balance,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LedgerEntryResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: uuid::Uuid,
    #[schema(value_type = String, format = "uuid")]
    pub account_id: AccountId,
    pub amount: i64,
    pub action: LedgerAction,
    pub description: Option<String>,
    #[schema(value_type = Option<String>, format = "uuid")]
    pub reservation_id: Option<ReservationId>,
    pub created_at: DateTime<Utc>,
}

impl From<LedgerEntry> for LedgerEntryResponse {
    fn from(entry: LedgerEntry) -> Self {
        Self {
            id: entry.id,
            account_id: entry.account_id,
            amount: entry.amount,
            action: entry.action,
            description: entry.description,
            reservation_id: entry.reservation_id,
            created_at: entry.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ExpireStaleResponse {
    /// Lots deactivated by this sweep
    pub expired: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BulkLotUpdateResponse {
    /// Lots touched by the account-wide operation
    pub updated: usize,
}
