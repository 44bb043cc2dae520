use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};

use crate::{
    AppState,
    api::models::credits::{
        BalanceResponse, BulkLotUpdateResponse, CreditDeductRequest, CreditGrantRequest, CreditTransferRequest,
        ExpireStaleResponse, LedgerEntryResponse, LotDeductRequest, LotExtendRequest, LotReactivateRequest, LotResponse,
        LotTransferRequest,
    },
    auth::{CurrentActor, RequireAdmin},
    errors::Result,
    types::{AccountId, LotId},
};

/// Get the acting account's credit balance
#[utoipa::path(
    get,
    path = "/credits/balance",
    tag = "credits",
    summary = "Get own active balance",
    description = "Sum of credits over the caller's active, unexpired lots",
    responses(
        (status = 200, description = "Current balance", body = BalanceResponse),
        (status = 401, description = "Unauthorized"),
    )
)]
pub async fn get_own_balance(State(state): State<AppState>, actor: CurrentActor) -> Result<Json<BalanceResponse>> {
    let active_balance = state.ledger.active_balance(actor.id).await;
    Ok(Json(BalanceResponse {
        account_id: actor.id,
        active_balance,
    }))
}

/// List the acting account's credit lots
#[utoipa::path(
    get,
    path = "/credits/lots",
    tag = "credits",
    summary = "List own credit lots",
    responses(
        (status = 200, description = "Lots, newest first", body = [LotResponse]),
        (status = 401, description = "Unauthorized"),
    )
)]
pub async fn list_own_lots(State(state): State<AppState>, actor: CurrentActor) -> Result<Json<Vec<LotResponse>>> {
    let lots = state.ledger.lots_for_account(actor.id).await;
    Ok(Json(lots.into_iter().map(Into::into).collect()))
}

/// List the acting account's ledger history
#[utoipa::path(
    get,
    path = "/credits/history",
    tag = "credits",
    summary = "List own ledger history",
    responses(
        (status = 200, description = "Ledger entries, newest first", body = [LedgerEntryResponse]),
        (status = 401, description = "Unauthorized"),
    )
)]
pub async fn list_own_history(State(state): State<AppState>, actor: CurrentActor) -> Result<Json<Vec<LedgerEntryResponse>>> {
    let history = state.ledger.history_for_account(actor.id).await;
    Ok(Json(history.into_iter().map(Into::into).collect()))
}

/// Grant credits to an account
#[utoipa::path(
    post,
    path = "/admin/accounts/{account_id}/credits",
    tag = "credits",
    summary = "Grant a credit lot",
    params(("account_id" = String, Path, description = "Account to credit")),
    request_body = CreditGrantRequest,
    responses(
        (status = 201, description = "Created lot", body = LotResponse),
        (status = 400, description = "Non-positive amount"),
        (status = 403, description = "Admin role required"),
    )
)]
pub async fn grant_credits(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Path(account_id): Path<AccountId>,
    Json(request): Json<CreditGrantRequest>,
) -> Result<(StatusCode, Json<LotResponse>)> {
    let lot = state
        .ledger
        .grant(account_id, request.amount, request.expiry_days, request.reason)
        .await?;
    Ok((StatusCode::CREATED, Json(lot.into())))
}

/// Deduct credits from an account's balance (FIFO by expiry)
#[utoipa::path(
    post,
    path = "/admin/accounts/{account_id}/credits/deduct",
    tag = "credits",
    summary = "Deduct credits from an account",
    params(("account_id" = String, Path, description = "Account to charge")),
    request_body = CreditDeductRequest,
    responses(
        (status = 200, description = "Resulting balance", body = BalanceResponse),
        (status = 402, description = "Insufficient credits"),
        (status = 403, description = "Admin role required"),
    )
)]
pub async fn deduct_credits(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Path(account_id): Path<AccountId>,
    Json(request): Json<CreditDeductRequest>,
) -> Result<Json<BalanceResponse>> {
    state.ledger.deduct(account_id, request.amount, request.reason).await?;
    let active_balance = state.ledger.active_balance(account_id).await;
    Ok(Json(BalanceResponse {
        account_id,
        active_balance,
    }))
}

/// List an account's lots
#[utoipa::path(
    get,
    path = "/admin/accounts/{account_id}/lots",
    tag = "credits",
    summary = "List an account's credit lots",
    params(("account_id" = String, Path, description = "Account")),
    responses(
        (status = 200, description = "Lots, newest first", body = [LotResponse]),
        (status = 403, description = "Admin role required"),
    )
)]
pub async fn list_account_lots(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Path(account_id): Path<AccountId>,
) -> Result<Json<Vec<LotResponse>>> {
    let lots = state.ledger.lots_for_account(account_id).await;
    Ok(Json(lots.into_iter().map(Into::into).collect()))
}

/// List an account's ledger history
#[utoipa::path(
    get,
    path = "/admin/accounts/{account_id}/history",
    tag = "credits",
    summary = "List an account's ledger history",
    params(("account_id" = String, Path, description = "Account")),
    responses(
        (status = 200, description = "Ledger entries, newest first", body = [LedgerEntryResponse]),
        (status = 403, description = "Admin role required"),
    )
)]
pub async fn list_account_history(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Path(account_id): Path<AccountId>,
) -> Result<Json<Vec<LedgerEntryResponse>>> {
    let history = state.ledger.history_for_account(account_id).await;
    Ok(Json(history.into_iter().map(Into::into).collect()))
}

/// Active balances for every account with spendable credits
#[utoipa::path(
    get,
    path = "/admin/credits/balances",
    tag = "credits",
    summary = "List all account balances",
    responses(
        (status = 200, description = "Balances", body = [BalanceResponse]),
        (status = 403, description = "Admin role required"),
    )
)]
pub async fn list_balances(State(state): State<AppState>, _admin: RequireAdmin) -> Result<Json<Vec<BalanceResponse>>> {
    let balances = state.ledger.all_balances().await;
    Ok(Json(balances.into_iter().map(Into::into).collect()))
}

/// Transfer credits between accounts
#[utoipa::path(
    post,
    path = "/admin/credits/transfer",
    tag = "credits",
    summary = "Transfer credits between accounts",
    request_body = CreditTransferRequest,
    responses(
        (status = 204, description = "Transferred"),
        (status = 400, description = "Same account or invalid amount"),
        (status = 402, description = "Insufficient credits"),
        (status = 403, description = "Admin role required"),
    )
)]
pub async fn transfer_credits(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Json(request): Json<CreditTransferRequest>,
) -> Result<StatusCode> {
    state
        .ledger
        .transfer(request.from_account_id, request.to_account_id, request.amount)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Deactivate expired lots now instead of waiting for the sweeper
#[utoipa::path(
    post,
    path = "/admin/credits/expire",
    tag = "credits",
    summary = "Expire stale lots",
    responses(
        (status = 200, description = "Sweep result", body = ExpireStaleResponse),
        (status = 403, description = "Admin role required"),
    )
)]
pub async fn expire_stale(State(state): State<AppState>, _admin: RequireAdmin) -> Result<Json<ExpireStaleResponse>> {
    let expired = state.ledger.expire_stale().await;
    Ok(Json(ExpireStaleResponse { expired }))
}

/// Push every active lot of an account out by the same number of days
#[utoipa::path(
    post,
    path = "/admin/accounts/{account_id}/credits/extend",
    tag = "credits",
    summary = "Extend an account's lot expiries",
    params(("account_id" = String, Path, description = "Account")),
    request_body = LotExtendRequest,
    responses(
        (status = 200, description = "Lots extended", body = BulkLotUpdateResponse),
        (status = 400, description = "Non-positive days"),
        (status = 403, description = "Admin role required"),
    )
)]
pub async fn extend_account_credits(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Path(account_id): Path<AccountId>,
    Json(request): Json<LotExtendRequest>,
) -> Result<Json<BulkLotUpdateResponse>> {
    let updated = state.ledger.extend_account_expiry(account_id, request.days).await?;
    Ok(Json(BulkLotUpdateResponse { updated }))
}

/// Revive every expired lot of an account with a new expiry
#[utoipa::path(
    post,
    path = "/admin/accounts/{account_id}/credits/reactivate",
    tag = "credits",
    summary = "Reactivate an account's expired lots",
    params(("account_id" = String, Path, description = "Account")),
    request_body = LotReactivateRequest,
    responses(
        (status = 200, description = "Lots reactivated", body = BulkLotUpdateResponse),
        (status = 403, description = "Admin role required"),
    )
)]
pub async fn reactivate_account_credits(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Path(account_id): Path<AccountId>,
    Json(request): Json<LotReactivateRequest>,
) -> Result<Json<BulkLotUpdateResponse>> {
    let updated = state.ledger.reactivate_account_lots(account_id, request.new_expiry_date).await?;
    Ok(Json(BulkLotUpdateResponse { updated }))
}

/// Push a lot's expiry out
#[utoipa::path(
    post,
    path = "/admin/lots/{lot_id}/extend",
    tag = "credits",
    summary = "Extend a lot's expiry",
    params(("lot_id" = String, Path, description = "Lot")),
    request_body = LotExtendRequest,
    responses(
        (status = 200, description = "Updated lot", body = LotResponse),
        (status = 400, description = "Non-positive days"),
        (status = 409, description = "Lot inactive or drained"),
        (status = 403, description = "Admin role required"),
        (status = 404, description = "Lot not found"),
    )
)]
pub async fn extend_lot(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Path(lot_id): Path<LotId>,
    Json(request): Json<LotExtendRequest>,
) -> Result<Json<LotResponse>> {
    let lot = state.ledger.extend_lot_expiry(lot_id, request.days).await?;
    Ok(Json(lot.into()))
}

/// Revive an expired or deactivated lot with a new expiry
#[utoipa::path(
    post,
    path = "/admin/lots/{lot_id}/reactivate",
    tag = "credits",
    summary = "Reactivate a lot",
    params(("lot_id" = String, Path, description = "Lot")),
    request_body = LotReactivateRequest,
    responses(
        (status = 200, description = "Updated lot", body = LotResponse),
        (status = 400, description = "Lot already active or drained"),
        (status = 403, description = "Admin role required"),
        (status = 404, description = "Lot not found"),
    )
)]
pub async fn reactivate_lot(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Path(lot_id): Path<LotId>,
    Json(request): Json<LotReactivateRequest>,
) -> Result<Json<LotResponse>> {
    let lot = state.ledger.reactivate_lot(lot_id, request.new_expiry_date).await?;
    Ok(Json(lot.into()))
}

/// Deduct from one specific lot
#[utoipa::path(
    post,
    path = "/admin/lots/{lot_id}/deduct",
    tag = "credits",
    summary = "Deduct credits from one lot",
    params(("lot_id" = String, Path, description = "Lot")),
    request_body = LotDeductRequest,
    responses(
        (status = 200, description = "Updated lot", body = LotResponse),
        (status = 400, description = "Non-positive amount"),
        (status = 402, description = "Lot balance too small"),
        (status = 409, description = "Lot inactive or expired"),
        (status = 403, description = "Admin role required"),
        (status = 404, description = "Lot not found"),
    )
)]
pub async fn deduct_from_lot(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Path(lot_id): Path<LotId>,
    Json(request): Json<LotDeductRequest>,
) -> Result<Json<LotResponse>> {
    let lot = state.ledger.deduct_from_lot(lot_id, request.amount).await?;
    Ok(Json(lot.into()))
}

/// Move credits from one lot to another account
#[utoipa::path(
    post,
    path = "/admin/lots/{lot_id}/transfer",
    tag = "credits",
    summary = "Transfer credits out of one lot",
    params(("lot_id" = String, Path, description = "Source lot")),
    request_body = LotTransferRequest,
    responses(
        (status = 201, description = "New lot on the destination account", body = LotResponse),
        (status = 400, description = "Non-positive amount"),
        (status = 409, description = "Lot inactive or expired"),
        (status = 402, description = "Lot balance too small"),
        (status = 403, description = "Admin role required"),
        (status = 404, description = "Lot not found"),
    )
)]
pub async fn transfer_from_lot(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Path(lot_id): Path<LotId>,
    Json(request): Json<LotTransferRequest>,
) -> Result<(StatusCode, Json<LotResponse>)> {
    let lot = state
        .ledger
        .transfer_from_lot(lot_id, request.to_account_id, request.amount)
        .await?;
    Ok((StatusCode::CREATED, Json(lot.into())))
}
