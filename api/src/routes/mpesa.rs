//! M-Pesa endpoints

use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use rentflow_core::Payment;
use rentflow_mpesa::{CallbackAck, InitiateStkPush, StkCallbackEnvelope};
use tracing::warn;

use super::{guarded, Created};
use crate::extract::ValidatedJson;
use crate::middleware::Permission;
use crate::models::{ApiResponse, ErrorResponse};
use crate::AppState;

/// Authenticated payment initiation
pub fn router() -> Router<AppState> {
    guarded(
        Router::new().route("/mpesa/stk-push", post(stk_push)),
        Permission::PaymentsInitiate,
    )
}

/// Provider callback; no authentication
pub fn callback_router() -> Router<AppState> {
    Router::new().route("/mpesa/callback", post(callback))
}

/// Prompt the payer's phone for an invoice payment
#[utoipa::path(
    post,
    path = "/mpesa/stk-push",
    request_body = InitiateStkPush,
    responses(
        (status = 201, description = "Prompt sent; payment PENDING", body = Payment),
        (status = 404, description = "INVOICE_NOT_FOUND", body = ErrorResponse),
        (status = 502, description = "PAYMENT_INITIATION_FAILED", body = ErrorResponse),
        (status = 503, description = "PAYMENT_GATEWAY_UNAVAILABLE", body = ErrorResponse)
    ),
    tag = "mpesa",
    security(("bearer" = []))
)]
pub async fn stk_push(
    State(state): State<AppState>,
    ValidatedJson(input): ValidatedJson<InitiateStkPush>,
) -> Created<Payment> {
    let payment = state.mpesa.initiate_stk_push(input).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_message(payment, "STK Push sent to user phone")),
    ))
}

/// Hand the result to the reconciliation worker and acknowledge at once.
/// The acknowledgement is the same whatever the payload holds.
#[utoipa::path(
    post,
    path = "/mpesa/callback",
    request_body = StkCallbackEnvelope,
    responses((status = 200, description = "Always accepted", body = CallbackAck)),
    tag = "mpesa"
)]
pub async fn callback(State(state): State<AppState>, body: Bytes) -> Json<CallbackAck> {
    match serde_json::from_slice::<StkCallbackEnvelope>(&body) {
        Ok(envelope) => {
            state.reconciliation.enqueue(envelope);
        }
        Err(e) => warn!(error = %e, "Unreadable M-Pesa callback ignored"),
    }
    Json(CallbackAck::accepted())
}
