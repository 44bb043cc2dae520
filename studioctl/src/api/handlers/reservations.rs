use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};

use crate::{
    AppState,
    api::models::reservations::{
        AdminCancelRequest, ExternalReservationCreateRequest, ReservationCancelRequest, ReservationCreateRequest,
        ReservationResponse,
    },
    auth::{CurrentActor, RequireAdmin},
    errors::{Error, Result},
    types::ReservationId,
    workflow::ExternalBooking,
};

/// Book a space for the acting account
#[utoipa::path(
    post,
    path = "/reservations",
    tag = "reservations",
    summary = "Create a reservation",
    description = "In-policy bookings confirm and charge immediately; exception bookings go \
                   pending with a surcharge and charge on approval",
    request_body = ReservationCreateRequest,
    responses(
        (status = 201, description = "Created reservation", body = ReservationResponse),
        (status = 402, description = "Insufficient credits"),
        (status = 404, description = "Space not found"),
        (status = 409, description = "Slot already reserved"),
    )
)]
pub async fn create_reservation(
    State(state): State<AppState>,
    actor: CurrentActor,
    Json(request): Json<ReservationCreateRequest>,
) -> Result<(StatusCode, Json<ReservationResponse>)> {
    let reservation = state
        .workflow
        .create(actor.id, request.space_id, request.start_time, request.end_time, request.notes)
        .await?;
    Ok((StatusCode::CREATED, Json(reservation.into())))
}

/// List the acting account's reservations
#[utoipa::path(
    get,
    path = "/reservations",
    tag = "reservations",
    summary = "List own reservations",
    responses(
        (status = 200, description = "Reservations, soonest start first", body = [ReservationResponse]),
        (status = 401, description = "Unauthorized"),
    )
)]
pub async fn list_own_reservations(
    State(state): State<AppState>,
    actor: CurrentActor,
) -> Result<Json<Vec<ReservationResponse>>> {
    let reservations = state.workflow.list_for_account(actor.id).await;
    Ok(Json(reservations.into_iter().map(Into::into).collect()))
}

/// Fetch one reservation
#[utoipa::path(
    get,
    path = "/reservations/{id}",
    tag = "reservations",
    summary = "Get a reservation",
    params(("id" = String, Path, description = "Reservation")),
    responses(
        (status = 200, description = "Reservation", body = ReservationResponse),
        (status = 404, description = "Not found or not owned by the caller"),
    )
)]
pub async fn get_reservation(
    State(state): State<AppState>,
    actor: CurrentActor,
    Path(id): Path<ReservationId>,
) -> Result<Json<ReservationResponse>> {
    let reservation = state.workflow.get(id).await?;
    // Admins see everything; everyone else only their own.
    if !actor.is_admin() && reservation.account_id != Some(actor.id) {
        return Err(Error::NotFound {
            resource: "reservation",
            id: id.to_string(),
        });
    }
    Ok(Json(reservation.into()))
}

/// Cancel the acting account's reservation
#[utoipa::path(
    post,
    path = "/reservations/{id}/cancel",
    tag = "reservations",
    summary = "Cancel own reservation",
    description = "Confirmed bookings refund in full when cancelled early enough, nothing \
                   otherwise; pending bookings were never charged",
    params(("id" = String, Path, description = "Reservation")),
    request_body = ReservationCancelRequest,
    responses(
        (status = 200, description = "Cancelled reservation", body = ReservationResponse),
        (status = 404, description = "Not found or not owned by the caller"),
        (status = 409, description = "Already cancelled or completed"),
    )
)]
pub async fn cancel_reservation(
    State(state): State<AppState>,
    actor: CurrentActor,
    Path(id): Path<ReservationId>,
    Json(request): Json<ReservationCancelRequest>,
) -> Result<Json<ReservationResponse>> {
    let reservation = state.workflow.cancel(id, actor.id, request.credits_to_refund).await?;
    Ok(Json(reservation.into()))
}

/// The approval queue
#[utoipa::path(
    get,
    path = "/admin/reservations/pending",
    tag = "reservations",
    summary = "List pending reservations",
    responses(
        (status = 200, description = "Pending reservations, soonest start first", body = [ReservationResponse]),
        (status = 403, description = "Admin role required"),
    )
)]
pub async fn list_pending_reservations(
    State(state): State<AppState>,
    _admin: RequireAdmin,
) -> Result<Json<Vec<ReservationResponse>>> {
    let pending = state.workflow.list_pending().await;
    Ok(Json(pending.into_iter().map(Into::into).collect()))
}

/// Approve a pending reservation
#[utoipa::path(
    post,
    path = "/admin/reservations/{id}/approve",
    tag = "reservations",
    summary = "Approve a pending reservation",
    description = "Re-validates the slot and charges the held credits before confirming",
    params(("id" = String, Path, description = "Reservation")),
    responses(
        (status = 200, description = "Confirmed reservation", body = ReservationResponse),
        (status = 402, description = "Account can no longer cover the charge"),
        (status = 403, description = "Admin role required"),
        (status = 404, description = "Not found"),
        (status = 409, description = "Not pending, or slot taken in the interim"),
    )
)]
pub async fn approve_reservation(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<ReservationId>,
) -> Result<Json<ReservationResponse>> {
    let reservation = state.workflow.approve(id, admin.id).await?;
    Ok(Json(reservation.into()))
}

/// Cancel any reservation, optionally assessing a penalty
#[utoipa::path(
    post,
    path = "/admin/reservations/{id}/cancel",
    tag = "reservations",
    summary = "Cancel a reservation as staff",
    params(("id" = String, Path, description = "Reservation")),
    request_body = AdminCancelRequest,
    responses(
        (status = 200, description = "Cancelled reservation", body = ReservationResponse),
        (status = 402, description = "Pending-booking penalty exceeds the balance"),
        (status = 403, description = "Admin role required"),
        (status = 404, description = "Not found"),
        (status = 409, description = "Already cancelled or completed"),
    )
)]
pub async fn admin_cancel_reservation(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<ReservationId>,
    Json(request): Json<AdminCancelRequest>,
) -> Result<Json<ReservationResponse>> {
    let reservation = state
        .workflow
        .admin_cancel(id, admin.id, request.reason, request.penalty_credits, request.notes)
        .await?;
    Ok(Json(reservation.into()))
}

/// Book a space for a walk-in client
#[utoipa::path(
    post,
    path = "/admin/reservations/external",
    tag = "reservations",
    summary = "Create an external-client reservation",
    description = "Finds or creates the client by phone; nothing is charged",
    request_body = ExternalReservationCreateRequest,
    responses(
        (status = 201, description = "Created reservation", body = ReservationResponse),
        (status = 403, description = "Admin role required"),
        (status = 404, description = "Space not found"),
        (status = 409, description = "Slot already reserved"),
    )
)]
pub async fn create_external_reservation(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Json(request): Json<ExternalReservationCreateRequest>,
) -> Result<(StatusCode, Json<ReservationResponse>)> {
    let reservation = state
        .workflow
        .create_external(
            admin.id,
            ExternalBooking {
                space_id: request.space_id,
                start_time: request.start_time,
                end_time: request.end_time,
                client_name: request.client_name,
                client_phone: request.client_phone,
                client_email: request.client_email,
                notes: request.notes,
            },
        )
        .await?;
    Ok((StatusCode::CREATED, Json(reservation.into())))
}
