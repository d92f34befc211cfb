//! Tenant context middleware
//!
//! Runs after [`super::auth::require_auth`]. The rest of the request,
//! handler included, executes inside the caller's [`TenantContext`].

use axum::extract::Request;
use axum::middleware::Next;
use axum::response::Response;
use rentflow_core::TenantContext;

use super::auth::AuthUser;
use crate::error::ApiError;

pub async fn tenant_context(req: Request, next: Next) -> Result<Response, ApiError> {
    let user = req
        .extensions()
        .get::<AuthUser>()
        .ok_or(ApiError::Unauthorized)?;
    let tenant_id = user.tenant_id.ok_or(ApiError::MissingTenant)?;
    let ctx = TenantContext::for_user(tenant_id, user.user_id);

    tracing::debug!(tenant_id = %tenant_id, user_id = %user.user_id, "Tenant context bound");
    Ok(ctx.scope(next.run(req)).await)
}
