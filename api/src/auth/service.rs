//! Registration and login

use std::sync::Arc;

use rentflow_core::{
    DataClientExt, DomainError, Filter, MemoryStore, StoreError, Tenant, User, UserRole,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use utoipa::ToSchema;
use validator::Validate;

use super::jwt::{JwtKeys, TokenType};
use super::password::{hash_password, verify_password};
use crate::error::ApiError;
use crate::models::UserProfile;

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    /// Becomes the tenant name
    #[validate(length(min = 1, message = "Company name is required"))]
    pub company_name: String,

    #[validate(email(message = "Email must be a valid address"))]
    pub email: String,

    #[validate(length(min = 8, message = "Password must be at least 8 characters long"))]
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct LoginRequest {
    #[validate(email(message = "Email must be a valid address"))]
    pub email: String,

    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

/// Tokens for one signed-in user
#[derive(Debug, Clone)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: String,
    pub user: UserProfile,
}

/// Identity service. Works on the unscoped store: callers have no tenant yet.
#[derive(Clone)]
pub struct AuthService {
    store: Arc<MemoryStore>,
    keys: Arc<JwtKeys>,
}

impl AuthService {
    pub fn new(store: Arc<MemoryStore>, keys: Arc<JwtKeys>) -> Self {
        Self { store, keys }
    }

    pub fn keys(&self) -> &JwtKeys {
        &self.keys
    }

    /// Create a tenant and its first user (LANDLORD) together
    pub async fn register(&self, input: RegisterRequest) -> Result<Session, ApiError> {
        let email = input.email.trim().to_lowercase();
        if self.find_by_email(&email).await?.is_some() {
            return Err(DomainError::UserExists.into());
        }

        let password_hash =
            hash_password(&input.password).map_err(|e| ApiError::Internal(e.to_string()))?;
        let tenant = Tenant::new(input.company_name.trim(), email.clone());
        let mut user = User::new(email, password_hash, UserRole::Landlord);
        user.tenant_id = Some(tenant.id);

        let user = self
            .store
            .transaction(move |tx| {
                Box::pin(async move {
                    tx.create(tenant).await?;
                    Ok::<_, StoreError>(tx.create(user).await?)
                })
            })
            .await
            .map_err(|e| match e {
                // Lost a race with a concurrent registration
                StoreError::UniqueViolation { .. } => ApiError::from(DomainError::UserExists),
                other => ApiError::from(DomainError::from(other)),
            })?;

        info!(user_id = %user.id, tenant_id = ?user.tenant_id, "Tenant registered");
        self.session(&user)
    }

    pub async fn login(&self, input: LoginRequest) -> Result<Session, ApiError> {
        let email = input.email.trim().to_lowercase();
        let user = self
            .find_by_email(&email)
            .await?
            .ok_or(ApiError::InvalidCredentials)?;

        let matches = verify_password(&input.password, &user.password_hash).map_err(|e| {
            warn!(user_id = %user.id, error = %e, "Stored password hash is unreadable");
            ApiError::InvalidCredentials
        })?;
        if !matches {
            return Err(ApiError::InvalidCredentials);
        }

        info!(user_id = %user.id, "User logged in");
        self.session(&user)
    }

    /// Exchange a refresh token for a fresh session
    pub async fn refresh(&self, refresh_token: &str) -> Result<Session, ApiError> {
        let claims = self
            .keys
            .verify(refresh_token, TokenType::Refresh)
            .ok_or(ApiError::InvalidToken)?;
        let user = self
            .store
            .find_unique(Filter::<User>::id(claims.sub))
            .await
            .map_err(DomainError::from)?
            .ok_or(ApiError::InvalidToken)?;
        self.session(&user)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, ApiError> {
        let email = email.to_string();
        Ok(self
            .store
            .find_first(Filter::<User>::all().and(move |u| u.email.eq_ignore_ascii_case(&email)))
            .await
            .map_err(DomainError::from)?)
    }

    fn session(&self, user: &User) -> Result<Session, ApiError> {
        let issue = |typ| {
            self.keys
                .issue(user, typ)
                .map_err(|e| ApiError::Internal(format!("token signing failed: {e}")))
        };
        Ok(Session {
            access_token: issue(TokenType::Access)?,
            refresh_token: issue(TokenType::Refresh)?,
            user: UserProfile::from(user),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::JwtConfig;

    fn service() -> AuthService {
        AuthService::new(
            Arc::new(MemoryStore::new()),
            Arc::new(JwtKeys::new(&JwtConfig {
                secret: "auth-service-test-secret-0123456789".into(),
                ..JwtConfig::default()
            })),
        )
    }

    fn register(email: &str) -> RegisterRequest {
        RegisterRequest {
            company_name: "Acme Properties".into(),
            email: email.into(),
            password: "correct-horse".into(),
        }
    }

    #[tokio::test]
    async fn test_register_creates_tenant_and_landlord() {
        let auth = service();
        let session = auth.register(register("Owner@Acme.co.ke")).await.unwrap();

        assert_eq!(session.user.role, UserRole::Landlord);
        assert_eq!(session.user.email, "owner@acme.co.ke");
        let tenant_id = session.user.tenant_id.unwrap();
        let tenant = auth.store.find_unique(Filter::<Tenant>::id(tenant_id)).await.unwrap().unwrap();
        assert_eq!(tenant.name, "Acme Properties");

        let claims = auth.keys.verify(&session.access_token, TokenType::Access).unwrap();
        assert_eq!(claims.tenant_id, Some(tenant_id));
    }

    #[tokio::test]
    async fn test_duplicate_email_rejected_without_writes() {
        let auth = service();
        auth.register(register("owner@acme.co.ke")).await.unwrap();

        let err = auth.register(register("OWNER@acme.co.ke")).await.unwrap_err();
        assert_eq!(err.code(), "USER_ALREADY_EXISTS");
        assert_eq!(auth.store.count(Filter::<Tenant>::all()).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_login() {
        let auth = service();
        auth.register(register("owner@acme.co.ke")).await.unwrap();

        let ok = auth
            .login(LoginRequest { email: "owner@acme.co.ke".into(), password: "correct-horse".into() })
            .await;
        assert!(ok.is_ok());

        for (email, password) in [("owner@acme.co.ke", "wrong-horse"), ("nobody@acme.co.ke", "correct-horse")] {
            let err = auth
                .login(LoginRequest { email: email.into(), password: password.into() })
                .await
                .unwrap_err();
            assert_eq!(err.code(), "INVALID_CREDENTIALS");
        }
    }

    #[tokio::test]
    async fn test_refresh_requires_refresh_token() {
        let auth = service();
        let session = auth.register(register("owner@acme.co.ke")).await.unwrap();

        let refreshed = auth.refresh(&session.refresh_token).await.unwrap();
        assert_eq!(refreshed.user.id, session.user.id);

        let err = auth.refresh(&session.access_token).await.unwrap_err();
        assert_eq!(err.code(), "INVALID_TOKEN");
    }
}
