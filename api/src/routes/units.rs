//! Unit endpoints

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use rentflow_core::services::{CreateUnit, OccupancySummary, UpdateUnit};
use rentflow_core::Unit;
use serde::Deserialize;
use utoipa::IntoParams;
use uuid::Uuid;

use super::{guarded, ApiResult, Created};
use crate::extract::{Path, Query, ValidatedJson};
use crate::middleware::Permission;
use crate::models::{ApiResponse, Deleted, ErrorResponse};
use crate::AppState;

pub fn router() -> Router<AppState> {
    let routes = Router::new()
        .route("/units", post(create_unit))
        .route("/units/summary", get(occupancy_summary))
        .route("/units/property/:property_id", get(list_units_by_property))
        .route("/units/:id", get(get_unit).put(update_unit).delete(delete_unit));
    guarded(routes, Permission::UnitsManage)
}

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct SummaryParams {
    /// Restrict to one property
    property_id: Option<Uuid>,
}

/// Create a unit under a property
#[utoipa::path(
    post,
    path = "/units",
    request_body = CreateUnit,
    responses(
        (status = 201, description = "Unit created, VACANT", body = Unit),
        (status = 404, description = "PROPERTY_NOT_FOUND", body = ErrorResponse)
    ),
    tag = "units",
    security(("bearer" = []))
)]
pub async fn create_unit(
    State(state): State<AppState>,
    ValidatedJson(input): ValidatedJson<CreateUnit>,
) -> Created<Unit> {
    let unit = state.units.create(input).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(unit))))
}

/// List live units of a property
#[utoipa::path(
    get,
    path = "/units/property/{property_id}",
    params(("property_id" = Uuid, Path, description = "Property ID")),
    responses((status = 200, description = "Units by name", body = [Unit])),
    tag = "units",
    security(("bearer" = []))
)]
pub async fn list_units_by_property(
    State(state): State<AppState>,
    Path(property_id): Path<Uuid>,
) -> ApiResult<Vec<Unit>> {
    Ok(Json(ApiResponse::success(state.units.list_by_property(property_id).await?)))
}

/// Unit counts by status
#[utoipa::path(
    get,
    path = "/units/summary",
    params(SummaryParams),
    responses((status = 200, description = "Occupancy summary", body = OccupancySummary)),
    tag = "units",
    security(("bearer" = []))
)]
pub async fn occupancy_summary(
    State(state): State<AppState>,
    Query(params): Query<SummaryParams>,
) -> ApiResult<OccupancySummary> {
    Ok(Json(ApiResponse::success(state.units.occupancy(params.property_id).await?)))
}

/// Get a unit
#[utoipa::path(
    get,
    path = "/units/{id}",
    params(("id" = Uuid, Path, description = "Unit ID")),
    responses(
        (status = 200, description = "Unit", body = Unit),
        (status = 404, description = "UNIT_NOT_FOUND", body = ErrorResponse)
    ),
    tag = "units",
    security(("bearer" = []))
)]
pub async fn get_unit(State(state): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<Unit> {
    Ok(Json(ApiResponse::success(state.units.get(id).await?)))
}

/// Update name, rent or an externally managed status
#[utoipa::path(
    put,
    path = "/units/{id}",
    params(("id" = Uuid, Path, description = "Unit ID")),
    request_body = UpdateUnit,
    responses(
        (status = 200, description = "Unit updated", body = Unit),
        (status = 400, description = "OCCUPIED is only set by agreements", body = ErrorResponse),
        (status = 404, description = "UNIT_NOT_FOUND", body = ErrorResponse)
    ),
    tag = "units",
    security(("bearer" = []))
)]
pub async fn update_unit(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    ValidatedJson(input): ValidatedJson<UpdateUnit>,
) -> ApiResult<Unit> {
    Ok(Json(ApiResponse::success(state.units.update(id, input).await?)))
}

/// Soft-delete a unit
#[utoipa::path(
    delete,
    path = "/units/{id}",
    params(("id" = Uuid, Path, description = "Unit ID")),
    responses(
        (status = 200, description = "Unit deleted", body = Deleted),
        (status = 404, description = "UNIT_NOT_FOUND", body = ErrorResponse)
    ),
    tag = "units",
    security(("bearer" = []))
)]
pub async fn delete_unit(State(state): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<Deleted> {
    let unit = state.units.remove(id).await?;
    Ok(Json(ApiResponse::with_message(Deleted { id: unit.id }, "Unit deleted successfully")))
}
