//! Role-based permissions

use std::collections::HashSet;

use axum::extract::Request;
use axum::middleware::Next;
use axum::response::Response;
use rentflow_core::UserRole;
use serde::{Deserialize, Serialize};

use super::auth::AuthUser;
use crate::error::ApiError;

/// Permission checked by a route group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Permission {
    PropertiesManage,
    UnitsManage,
    RentersManage,
    AgreementsManage,
    InvoicesManage,
    PaymentsInitiate,
}

impl Permission {
    /// Get all permissions for a role
    pub fn for_role(role: UserRole) -> HashSet<Permission> {
        match role {
            UserRole::SuperAdmin | UserRole::PropertyManager | UserRole::Landlord => Self::all(),
            UserRole::Accountant => [Permission::InvoicesManage].into_iter().collect(),
            UserRole::Tenant => [Permission::PaymentsInitiate].into_iter().collect(),
        }
    }

    fn all() -> HashSet<Permission> {
        use Permission::*;
        [
            PropertiesManage,
            UnitsManage,
            RentersManage,
            AgreementsManage,
            InvoicesManage,
            PaymentsInitiate,
        ]
        .into_iter()
        .collect()
    }
}

/// Check if a role allows an action
pub fn has_permission(role: UserRole, required: Permission) -> bool {
    Permission::for_role(role).contains(&required)
}

/// Route-layer guard; use through `axum::middleware::from_fn`
pub async fn require(required: Permission, req: Request, next: Next) -> Result<Response, ApiError> {
    let user = req
        .extensions()
        .get::<AuthUser>()
        .ok_or(ApiError::Unauthorized)?;
    if !has_permission(user.role, required) {
        tracing::warn!(user_id = %user.user_id, role = %user.role, ?required, "Permission denied");
        return Err(ApiError::Forbidden);
    }
    Ok(next.run(req).await)
}
