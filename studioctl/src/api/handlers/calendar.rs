use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};

use crate::{
    AppState,
    api::models::calendar::{
        BusinessHoursResponse, BusinessHoursUpsertRequest, ClosedDateCreateRequest, ClosedDateResponse, valid_hhmm,
    },
    auth::{CurrentActor, RequireAdmin},
    db::errors::DbError,
    db::handlers::Calendar,
    db::models::calendar::BusinessHoursEntry,
    errors::{Error, Result},
    types::ClosedDateId,
};

/// Weekly operating hours
#[utoipa::path(
    get,
    path = "/calendar/business-hours",
    tag = "calendar",
    summary = "List business hours",
    responses(
        (status = 200, description = "One entry per day of the week", body = [BusinessHoursResponse]),
        (status = 401, description = "Unauthorized"),
    )
)]
pub async fn list_business_hours(
    State(state): State<AppState>,
    _actor: CurrentActor,
) -> Result<Json<Vec<BusinessHoursResponse>>> {
    let hours = state
        .store
        .transaction(|db| Ok::<_, Error>(Calendar::new(db).list_business_hours()))
        .await?;
    Ok(Json(hours.into_iter().map(Into::into).collect()))
}

/// Dates the operation is closed
#[utoipa::path(
    get,
    path = "/calendar/closed-dates",
    tag = "calendar",
    summary = "List closed dates",
    responses(
        (status = 200, description = "Closed dates, including deactivated ones", body = [ClosedDateResponse]),
        (status = 401, description = "Unauthorized"),
    )
)]
pub async fn list_closed_dates(
    State(state): State<AppState>,
    _actor: CurrentActor,
) -> Result<Json<Vec<ClosedDateResponse>>> {
    let dates = state
        .store
        .transaction(|db| Ok::<_, Error>(Calendar::new(db).list_closed_dates()))
        .await?;
    Ok(Json(dates.into_iter().map(Into::into).collect()))
}

/// Set one day's operating hours
#[utoipa::path(
    put,
    path = "/admin/calendar/business-hours/{day_of_week}",
    tag = "calendar",
    summary = "Upsert business hours for a day",
    params(("day_of_week" = u8, Path, description = "0=Sunday .. 6=Saturday")),
    request_body = BusinessHoursUpsertRequest,
    responses(
        (status = 200, description = "Stored entry", body = BusinessHoursResponse),
        (status = 400, description = "Invalid day or time window"),
        (status = 403, description = "Admin role required"),
    )
)]
pub async fn upsert_business_hours(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Path(day_of_week): Path<u8>,
    Json(request): Json<BusinessHoursUpsertRequest>,
) -> Result<Json<BusinessHoursResponse>> {
    if day_of_week > 6 {
        return Err(Error::BadRequest {
            message: "day_of_week must be 0 (Sunday) through 6 (Saturday)".to_string(),
        });
    }
    if !valid_hhmm(&request.start_time) || !valid_hhmm(&request.end_time) {
        return Err(Error::BadRequest {
            message: "start_time and end_time must be \"HH:MM\"".to_string(),
        });
    }
    if !request.is_closed && request.start_time >= request.end_time {
        return Err(Error::BadRequest {
            message: "start_time must be before end_time".to_string(),
        });
    }
    let entry = state
        .store
        .transaction(|db| {
            Ok::<_, Error>(Calendar::new(db).upsert_business_hours(BusinessHoursEntry {
                day_of_week,
                start_time: request.start_time.clone(),
                end_time: request.end_time.clone(),
                is_closed: request.is_closed,
            }))
        })
        .await?;
    Ok(Json(entry.into()))
}

/// Close the operation on one date
#[utoipa::path(
    post,
    path = "/admin/calendar/closed-dates",
    tag = "calendar",
    summary = "Create a closed date",
    request_body = ClosedDateCreateRequest,
    responses(
        (status = 201, description = "Created closed date", body = ClosedDateResponse),
        (status = 400, description = "Missing reason"),
        (status = 403, description = "Admin role required"),
    )
)]
pub async fn create_closed_date(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Json(request): Json<ClosedDateCreateRequest>,
) -> Result<(StatusCode, Json<ClosedDateResponse>)> {
    if request.reason.trim().is_empty() {
        return Err(Error::BadRequest {
            message: "A reason is required for closed dates".to_string(),
        });
    }
    let closed = state
        .store
        .transaction(|db| Ok::<_, Error>(Calendar::new(db).create_closed_date(request.date, request.reason.clone())))
        .await?;
    Ok((StatusCode::CREATED, Json(closed.into())))
}

/// Reopen a date by deactivating its override
#[utoipa::path(
    delete,
    path = "/admin/calendar/closed-dates/{id}",
    tag = "calendar",
    summary = "Deactivate a closed date",
    params(("id" = String, Path, description = "Closed date")),
    responses(
        (status = 204, description = "Deactivated"),
        (status = 403, description = "Admin role required"),
        (status = 404, description = "Not found"),
    )
)]
pub async fn deactivate_closed_date(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Path(id): Path<ClosedDateId>,
) -> Result<StatusCode> {
    state
        .store
        .transaction(|db| {
            Calendar::new(db).deactivate_closed_date(id).map_err(|e| match e {
                DbError::NotFound => Error::NotFound {
                    resource: "closed date",
                    id: id.to_string(),
                },
                other => Error::Database(other),
            })
        })
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
