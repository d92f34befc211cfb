//! Property endpoints

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use rentflow_core::services::{CreateProperty, PropertyDetail, PropertySummary, UpdateProperty};
use rentflow_core::Property;
use uuid::Uuid;

use super::{guarded, ApiResult, Created};
use crate::extract::{Path, ValidatedJson};
use crate::middleware::Permission;
use crate::models::{ApiResponse, Deleted, ErrorResponse};
use crate::AppState;

pub fn router() -> Router<AppState> {
    let routes = Router::new()
        .route("/properties", get(list_properties).post(create_property))
        .route(
            "/properties/:id",
            get(get_property).put(update_property).delete(delete_property),
        );
    guarded(routes, Permission::PropertiesManage)
}

/// Create a property
#[utoipa::path(
    post,
    path = "/properties",
    request_body = CreateProperty,
    responses(
        (status = 201, description = "Property created", body = Property),
        (status = 400, description = "Invalid input", body = ErrorResponse)
    ),
    tag = "properties",
    security(("bearer" = []))
)]
pub async fn create_property(
    State(state): State<AppState>,
    ValidatedJson(input): ValidatedJson<CreateProperty>,
) -> Created<Property> {
    let property = state.properties.create(input).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(property))))
}

/// List live properties with unit counts
#[utoipa::path(
    get,
    path = "/properties",
    responses((status = 200, description = "Properties, newest first", body = [PropertySummary])),
    tag = "properties",
    security(("bearer" = []))
)]
pub async fn list_properties(State(state): State<AppState>) -> ApiResult<Vec<PropertySummary>> {
    Ok(Json(ApiResponse::success(state.properties.list().await?)))
}

/// Get a property with its units
#[utoipa::path(
    get,
    path = "/properties/{id}",
    params(("id" = Uuid, Path, description = "Property ID")),
    responses(
        (status = 200, description = "Property details", body = PropertyDetail),
        (status = 404, description = "PROPERTY_NOT_FOUND", body = ErrorResponse)
    ),
    tag = "properties",
    security(("bearer" = []))
)]
pub async fn get_property(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<PropertyDetail> {
    Ok(Json(ApiResponse::success(state.properties.get(id).await?)))
}

/// Update a property
#[utoipa::path(
    put,
    path = "/properties/{id}",
    params(("id" = Uuid, Path, description = "Property ID")),
    request_body = UpdateProperty,
    responses(
        (status = 200, description = "Property updated", body = Property),
        (status = 404, description = "PROPERTY_NOT_FOUND", body = ErrorResponse)
    ),
    tag = "properties",
    security(("bearer" = []))
)]
pub async fn update_property(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    ValidatedJson(input): ValidatedJson<UpdateProperty>,
) -> ApiResult<Property> {
    Ok(Json(ApiResponse::success(state.properties.update(id, input).await?)))
}

/// Soft-delete a property
#[utoipa::path(
    delete,
    path = "/properties/{id}",
    params(("id" = Uuid, Path, description = "Property ID")),
    responses(
        (status = 200, description = "Property deleted", body = Deleted),
        (status = 404, description = "PROPERTY_NOT_FOUND", body = ErrorResponse)
    ),
    tag = "properties",
    security(("bearer" = []))
)]
pub async fn delete_property(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Deleted> {
    let property = state.properties.remove(id).await?;
    Ok(Json(ApiResponse::with_message(
        Deleted { id: property.id },
        "Property deleted successfully",
    )))
}
