//! Health check endpoint

use axum::extract::State;
use axum::Json;
use rentflow_core::{DataClientExt, Filter, Tenant};
use serde::Serialize;
use utoipa::ToSchema;

use crate::AppState;

#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: String,
    /// Registered tenants; proves the store answers
    pub tenants: u64,
}

/// Health check
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse)
    ),
    tag = "health"
)]
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let tenants = state.store.count(Filter::<Tenant>::all()).await;
    Json(HealthResponse {
        status: if tenants.is_ok() { "healthy" } else { "degraded" }.into(),
        version: env!("CARGO_PKG_VERSION").into(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        tenants: tenants.unwrap_or_default(),
    })
}
