use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};

use crate::{
    AppState,
    api::models::{
        calendar::valid_hhmm,
        spaces::{ScheduleCreateRequest, ScheduleResponse, SpaceCreateRequest, SpaceResponse, SpaceUpdateRequest},
    },
    auth::{CurrentActor, RequireAdmin},
    db::errors::DbError,
    db::handlers::{Schedules, Spaces},
    db::models::spaces::{ScheduleCreateDBRequest, SpaceCreateDBRequest, SpaceUpdateDBRequest},
    errors::{Error, Result},
    types::{ScheduleId, SpaceId},
};

fn space_not_found(err: DbError, id: SpaceId) -> Error {
    match err {
        DbError::NotFound => Error::NotFound {
            resource: "space",
            id: id.to_string(),
        },
        other => Error::Database(other),
    }
}

fn validate_window(day_of_week: u8, start_time: &str, end_time: &str) -> Result<()> {
    if day_of_week > 6 {
        return Err(Error::BadRequest {
            message: "day_of_week must be 0 (Sunday) through 6 (Saturday)".to_string(),
        });
    }
    if !valid_hhmm(start_time) || !valid_hhmm(end_time) {
        return Err(Error::BadRequest {
            message: "start_time and end_time must be \"HH:MM\"".to_string(),
        });
    }
    if start_time >= end_time {
        return Err(Error::BadRequest {
            message: "start_time must be before end_time".to_string(),
        });
    }
    Ok(())
}

/// List all spaces
#[utoipa::path(
    get,
    path = "/spaces",
    tag = "spaces",
    summary = "List spaces",
    responses(
        (status = 200, description = "Spaces ordered by name", body = [SpaceResponse]),
        (status = 401, description = "Unauthorized"),
    )
)]
pub async fn list_spaces(State(state): State<AppState>, _actor: CurrentActor) -> Result<Json<Vec<SpaceResponse>>> {
    let spaces = state
        .store
        .transaction(|db| Ok::<_, Error>(Spaces::new(db).list()))
        .await?;
    Ok(Json(spaces.into_iter().map(Into::into).collect()))
}

/// Fetch one space
#[utoipa::path(
    get,
    path = "/spaces/{id}",
    tag = "spaces",
    summary = "Get a space",
    params(("id" = String, Path, description = "Space")),
    responses(
        (status = 200, description = "Space", body = SpaceResponse),
        (status = 404, description = "Not found"),
    )
)]
pub async fn get_space(
    State(state): State<AppState>,
    _actor: CurrentActor,
    Path(id): Path<SpaceId>,
) -> Result<Json<SpaceResponse>> {
    let space = state
        .store
        .transaction(|db| Spaces::new(db).get(id).map_err(|e| space_not_found(e, id)))
        .await?;
    Ok(Json(space.into()))
}

/// List a space's weekly schedule windows
#[utoipa::path(
    get,
    path = "/spaces/{id}/schedules",
    tag = "spaces",
    summary = "List a space's schedule entries",
    params(("id" = String, Path, description = "Space")),
    responses(
        (status = 200, description = "Schedule entries", body = [ScheduleResponse]),
        (status = 404, description = "Space not found"),
    )
)]
pub async fn list_space_schedules(
    State(state): State<AppState>,
    _actor: CurrentActor,
    Path(id): Path<SpaceId>,
) -> Result<Json<Vec<ScheduleResponse>>> {
    let entries = state
        .store
        .transaction(|db| {
            Spaces::new(db).get(id).map_err(|e| space_not_found(e, id))?;
            Ok::<_, Error>(Schedules::new(db).list_for_space(id))
        })
        .await?;
    Ok(Json(entries.into_iter().map(Into::into).collect()))
}

/// Create a space
#[utoipa::path(
    post,
    path = "/admin/spaces",
    tag = "spaces",
    summary = "Create a space",
    request_body = SpaceCreateRequest,
    responses(
        (status = 201, description = "Created space", body = SpaceResponse),
        (status = 400, description = "Invalid space data"),
        (status = 403, description = "Admin role required"),
    )
)]
pub async fn create_space(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Json(request): Json<SpaceCreateRequest>,
) -> Result<(StatusCode, Json<SpaceResponse>)> {
    if request.name.trim().is_empty() {
        return Err(Error::BadRequest {
            message: "Space name is required".to_string(),
        });
    }
    if request.capacity <= 0 || request.cost_credits < 0 {
        return Err(Error::BadRequest {
            message: "Capacity must be positive and cost must not be negative".to_string(),
        });
    }
    let space = state
        .store
        .transaction(|db| {
            Ok::<_, Error>(Spaces::new(db).create(&SpaceCreateDBRequest {
                name: request.name.clone(),
                description: request.description.clone(),
                capacity: request.capacity,
                cost_credits: request.cost_credits,
            }))
        })
        .await?;
    Ok((StatusCode::CREATED, Json(space.into())))
}

/// Partially update a space
#[utoipa::path(
    patch,
    path = "/admin/spaces/{id}",
    tag = "spaces",
    summary = "Update a space",
    params(("id" = String, Path, description = "Space")),
    request_body = SpaceUpdateRequest,
    responses(
        (status = 200, description = "Updated space", body = SpaceResponse),
        (status = 403, description = "Admin role required"),
        (status = 404, description = "Not found"),
    )
)]
pub async fn update_space(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Path(id): Path<SpaceId>,
    Json(request): Json<SpaceUpdateRequest>,
) -> Result<Json<SpaceResponse>> {
    let space = state
        .store
        .transaction(|db| {
            Spaces::new(db)
                .update(
                    id,
                    &SpaceUpdateDBRequest {
                        name: request.name.clone(),
                        description: request.description.clone(),
                        capacity: request.capacity,
                        cost_credits: request.cost_credits,
                        is_active: request.is_active,
                    },
                )
                .map_err(|e| space_not_found(e, id))
        })
        .await?;
    Ok(Json(space.into()))
}

/// Add a weekly schedule window to a space
#[utoipa::path(
    post,
    path = "/admin/spaces/{id}/schedules",
    tag = "spaces",
    summary = "Create a schedule entry",
    params(("id" = String, Path, description = "Space")),
    request_body = ScheduleCreateRequest,
    responses(
        (status = 201, description = "Created entry", body = ScheduleResponse),
        (status = 400, description = "Invalid day or time window"),
        (status = 403, description = "Admin role required"),
        (status = 404, description = "Space not found"),
    )
)]
pub async fn create_schedule(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Path(id): Path<SpaceId>,
    Json(request): Json<ScheduleCreateRequest>,
) -> Result<(StatusCode, Json<ScheduleResponse>)> {
    validate_window(request.day_of_week, &request.start_time, &request.end_time)?;
    let entry = state
        .store
        .transaction(|db| {
            Spaces::new(db).get(id).map_err(|e| space_not_found(e, id))?;
            Ok::<_, Error>(Schedules::new(db).create(&ScheduleCreateDBRequest {
                space_id: id,
                day_of_week: request.day_of_week,
                start_time: request.start_time.clone(),
                end_time: request.end_time.clone(),
            }))
        })
        .await?;
    Ok((StatusCode::CREATED, Json(entry.into())))
}

/// Retire a schedule window
#[utoipa::path(
    delete,
    path = "/admin/schedules/{id}",
    tag = "spaces",
    summary = "Deactivate a schedule entry",
    params(("id" = String, Path, description = "Schedule entry")),
    responses(
        (status = 204, description = "Deactivated"),
        (status = 403, description = "Admin role required"),
        (status = 404, description = "Not found"),
    )
)]
pub async fn deactivate_schedule(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Path(id): Path<ScheduleId>,
) -> Result<StatusCode> {
    state
        .store
        .transaction(|db| {
            Schedules::new(db).deactivate(id).map_err(|e| match e {
                DbError::NotFound => Error::NotFound {
                    resource: "schedule entry",
                    id: id.to_string(),
                },
                other => Error::Database(other),
            })
        })
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
