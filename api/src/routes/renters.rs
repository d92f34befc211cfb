//! Renter endpoints

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use rentflow_core::services::{CreateRenter, RenterDetail, UpdateRenter};
use rentflow_core::Renter;
use uuid::Uuid;

use super::{guarded, ApiResult, Created};
use crate::extract::{Path, ValidatedJson};
use crate::middleware::Permission;
use crate::models::{ApiResponse, Deleted, ErrorResponse};
use crate::AppState;

pub fn router() -> Router<AppState> {
    let routes = Router::new()
        .route("/renters", get(list_renters).post(create_renter))
        .route("/renters/:id", get(get_renter).put(update_renter).delete(delete_renter));
    guarded(routes, Permission::RentersManage)
}

/// Register a renter
#[utoipa::path(
    post,
    path = "/renters",
    request_body = CreateRenter,
    responses(
        (status = 201, description = "Renter created", body = Renter),
        (status = 400, description = "Invalid phone or national ID", body = ErrorResponse),
        (status = 409, description = "RENTER_PHONE_ALREADY_EXISTS", body = ErrorResponse)
    ),
    tag = "renters",
    security(("bearer" = []))
)]
pub async fn create_renter(
    State(state): State<AppState>,
    ValidatedJson(input): ValidatedJson<CreateRenter>,
) -> Created<Renter> {
    let renter = state.renters.create(input).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(renter))))
}

/// List live renters
#[utoipa::path(
    get,
    path = "/renters",
    responses((status = 200, description = "Renters, newest first", body = [Renter])),
    tag = "renters",
    security(("bearer" = []))
)]
pub async fn list_renters(State(state): State<AppState>) -> ApiResult<Vec<Renter>> {
    Ok(Json(ApiResponse::success(state.renters.list().await?)))
}

/// Get a renter with their agreements
#[utoipa::path(
    get,
    path = "/renters/{id}",
    params(("id" = Uuid, Path, description = "Renter ID")),
    responses(
        (status = 200, description = "Renter details", body = RenterDetail),
        (status = 404, description = "RENTER_NOT_FOUND", body = ErrorResponse)
    ),
    tag = "renters",
    security(("bearer" = []))
)]
pub async fn get_renter(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<RenterDetail> {
    Ok(Json(ApiResponse::success(state.renters.get(id).await?)))
}

/// Update a renter
#[utoipa::path(
    put,
    path = "/renters/{id}",
    params(("id" = Uuid, Path, description = "Renter ID")),
    request_body = UpdateRenter,
    responses(
        (status = 200, description = "Renter updated", body = Renter),
        (status = 404, description = "RENTER_NOT_FOUND", body = ErrorResponse),
        (status = 409, description = "RENTER_PHONE_ALREADY_EXISTS", body = ErrorResponse)
    ),
    tag = "renters",
    security(("bearer" = []))
)]
pub async fn update_renter(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    ValidatedJson(input): ValidatedJson<UpdateRenter>,
) -> ApiResult<Renter> {
    Ok(Json(ApiResponse::success(state.renters.update(id, input).await?)))
}

/// Soft-delete a renter
#[utoipa::path(
    delete,
    path = "/renters/{id}",
    params(("id" = Uuid, Path, description = "Renter ID")),
    responses(
        (status = 200, description = "Renter deleted", body = Deleted),
        (status = 404, description = "RENTER_NOT_FOUND", body = ErrorResponse)
    ),
    tag = "renters",
    security(("bearer" = []))
)]
pub async fn delete_renter(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Deleted> {
    let renter = state.renters.remove(id).await?;
    Ok(Json(ApiResponse::with_message(Deleted { id: renter.id }, "Renter deleted successfully")))
}
