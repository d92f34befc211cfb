//! HTTP error mapping

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use rentflow_core::{DomainError, ErrorKind};
use rentflow_mpesa::PaymentError;
use thiserror::Error;

use crate::models::ErrorResponse;

/// Any failure a handler can return
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),

    #[error("Authentication required")]
    Unauthorized,

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Invalid or expired token")]
    InvalidToken,

    #[error("Missing tenant context")]
    MissingTenant,

    #[error("Insufficient permissions")]
    Forbidden,

    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Payment(#[from] PaymentError),

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized
            | Self::InvalidCredentials
            | Self::InvalidToken
            | Self::MissingTenant => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::Domain(e) => match e.kind() {
                ErrorKind::NotFound => StatusCode::NOT_FOUND,
                ErrorKind::Conflict => StatusCode::CONFLICT,
                ErrorKind::Validation => StatusCode::BAD_REQUEST,
                ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Payment(e) => match e {
                PaymentError::InvoiceNotFound => StatusCode::NOT_FOUND,
                PaymentError::GatewayUnavailable => StatusCode::SERVICE_UNAVAILABLE,
                PaymentError::InitiationFailed => StatusCode::BAD_GATEWAY,
                PaymentError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::Unauthorized => "UNAUTHORIZED",
            Self::InvalidCredentials => "INVALID_CREDENTIALS",
            Self::InvalidToken => "INVALID_TOKEN",
            Self::MissingTenant => "MISSING_TENANT_CONTEXT",
            Self::Forbidden => "INSUFFICIENT_PERMISSIONS",
            Self::Domain(e) => e.code(),
            Self::Payment(e) => e.code(),
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        // Internal details stay in the log
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = %self, "Request failed");
            "Internal server error".to_string()
        } else {
            self.to_string()
        };
        (status, Json(ErrorResponse::new(self.code(), message))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rentflow_core::{Resource, StoreError};

    #[test]
    fn test_status_and_code_mapping() {
        let cases = [
            (ApiError::Validation("bad".into()), 400, "VALIDATION_ERROR"),
            (ApiError::MissingTenant, 401, "MISSING_TENANT_CONTEXT"),
            (ApiError::Forbidden, 403, "INSUFFICIENT_PERMISSIONS"),
            (DomainError::NotFound(Resource::Unit).into(), 404, "UNIT_NOT_FOUND"),
            (DomainError::UnitNotVacant.into(), 409, "UNIT_NOT_VACANT"),
            (DomainError::AgreementTerminated.into(), 409, "AGREEMENT_ALREADY_TERMINATED"),
            (PaymentError::GatewayUnavailable.into(), 503, "PAYMENT_GATEWAY_UNAVAILABLE"),
            (
                DomainError::Store(StoreError::UnexpectedOutcome("create")).into(),
                500,
                "INTERNAL_ERROR",
            ),
        ];
        for (error, status, code) in cases {
            assert_eq!(error.status().as_u16(), status, "{code}");
            assert_eq!(error.code(), code);
        }
    }

    #[test]
    fn test_internal_message_hidden() {
        let response = ApiError::Internal("argon2 exploded".into()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
