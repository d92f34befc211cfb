//! API Routes

pub mod agreements;
pub mod auth;
pub mod health;
pub mod invoices;
pub mod mpesa;
pub mod properties;
pub mod renters;
pub mod units;

use axum::extract::Request;
use axum::http::StatusCode;
use axum::middleware::{from_fn, Next};
use axum::{Json, Router};

use crate::error::ApiError;
use crate::middleware::{self, Permission};
use crate::models::ApiResponse;
use crate::AppState;

/// Handler result wrapped in the success envelope
pub type ApiResult<T> = Result<Json<ApiResponse<T>>, ApiError>;

/// As [`ApiResult`], answered with `201 Created`
pub type Created<T> = Result<(StatusCode, Json<ApiResponse<T>>), ApiError>;

/// Require `permission` on every route of `router`
pub(crate) fn guarded(router: Router<AppState>, permission: Permission) -> Router<AppState> {
    router.route_layer(from_fn(move |req: Request, next: Next| {
        middleware::require(permission, req, next)
    }))
}
