//! Authentication endpoints

use axum::extract::State;
use axum::http::header::{COOKIE, SET_COOKIE};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::{AppendHeaders, IntoResponse};
use axum::routing::{get, post};
use axum::{Json, Router};

use crate::auth::{LoginRequest, RegisterRequest, Session};
use crate::error::ApiError;
use crate::extract::ValidatedJson;
use crate::middleware::AuthUser;
use crate::models::{ApiResponse, AuthPayload, ErrorResponse};
use crate::AppState;

/// Refresh-token cookie
pub const REFRESH_COOKIE: &str = "refresh_token";

/// Routes reachable without a token
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/refresh", post(refresh))
        .route("/auth/logout", post(logout))
}

/// Routes that need a verified caller
pub fn protected_router() -> Router<AppState> {
    Router::new().route("/auth/me", get(me))
}

/// Create a tenant and its owner account
#[utoipa::path(
    post,
    path = "/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Registered; refresh cookie set", body = AuthPayload),
        (status = 409, description = "USER_ALREADY_EXISTS", body = ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn register(
    State(state): State<AppState>,
    ValidatedJson(input): ValidatedJson<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let session = state.auth.register(input).await?;
    let cookie = refresh_cookie(&state, &session.refresh_token)?;
    Ok((
        StatusCode::CREATED,
        AppendHeaders([(SET_COOKIE, cookie)]),
        Json(ApiResponse::with_message(payload(session), "Registration successful")),
    ))
}

/// Exchange credentials for tokens
#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in; refresh cookie set", body = AuthPayload),
        (status = 401, description = "INVALID_CREDENTIALS", body = ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn login(
    State(state): State<AppState>,
    ValidatedJson(input): ValidatedJson<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let session = state.auth.login(input).await?;
    let cookie = refresh_cookie(&state, &session.refresh_token)?;
    Ok((
        AppendHeaders([(SET_COOKIE, cookie)]),
        Json(ApiResponse::success(payload(session))),
    ))
}

/// New access token from the refresh cookie
#[utoipa::path(
    post,
    path = "/auth/refresh",
    responses(
        (status = 200, description = "Tokens rotated", body = AuthPayload),
        (status = 401, description = "UNAUTHORIZED or INVALID_TOKEN", body = ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn refresh(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let token = cookie_value(&headers, REFRESH_COOKIE).ok_or(ApiError::Unauthorized)?;
    let session = state.auth.refresh(&token).await?;
    let cookie = refresh_cookie(&state, &session.refresh_token)?;
    Ok((
        AppendHeaders([(SET_COOKIE, cookie)]),
        Json(ApiResponse::success(payload(session))),
    ))
}

/// Clear the refresh cookie
#[utoipa::path(
    post,
    path = "/auth/logout",
    responses((status = 200, description = "Logged out")),
    tag = "auth"
)]
pub async fn logout() -> impl IntoResponse {
    (
        AppendHeaders([(
            SET_COOKIE,
            HeaderValue::from_static("refresh_token=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0"),
        )]),
        Json(ApiResponse::message("Logged out successfully")),
    )
}

/// Current principal
#[utoipa::path(
    get,
    path = "/auth/me",
    responses(
        (status = 200, description = "Token claims", body = AuthUser),
        (status = 401, description = "UNAUTHORIZED", body = ErrorResponse)
    ),
    tag = "auth",
    security(("bearer" = []))
)]
pub async fn me(user: AuthUser) -> Json<ApiResponse<AuthUser>> {
    Json(ApiResponse::success(user))
}

fn payload(session: Session) -> AuthPayload {
    AuthPayload {
        access_token: session.access_token,
        user: session.user,
    }
}

fn refresh_cookie(state: &AppState, token: &str) -> Result<HeaderValue, ApiError> {
    let max_age = state.auth.keys().refresh_ttl().num_seconds();
    let secure = if state.config.server.secure_cookies { "; Secure" } else { "" };
    HeaderValue::from_str(&format!(
        "{REFRESH_COOKIE}={token}; Path=/; HttpOnly; SameSite=Lax; Max-Age={max_age}{secure}"
    ))
    .map_err(|e| ApiError::Internal(format!("invalid cookie header: {e}")))
}

/// Value of cookie `name` from the `Cookie` headers
pub fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.to_string())
}
