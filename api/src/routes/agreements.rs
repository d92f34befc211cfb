//! Rental agreement endpoints

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, patch};
use axum::{Json, Router};
use rentflow_core::services::{AgreementDetail, AgreementView, CreateAgreement};
use rentflow_core::RentalAgreement;
use uuid::Uuid;

use super::{guarded, ApiResult, Created};
use crate::extract::{Path, ValidatedJson};
use crate::middleware::Permission;
use crate::models::{ApiResponse, ErrorResponse};
use crate::AppState;

pub fn router() -> Router<AppState> {
    let routes = Router::new()
        .route("/rental-agreements", get(list_agreements).post(create_agreement))
        .route("/rental-agreements/:id", get(get_agreement))
        .route("/rental-agreements/:id/terminate", patch(terminate_agreement));
    guarded(routes, Permission::AgreementsManage)
}

/// Lease a vacant unit to a renter
#[utoipa::path(
    post,
    path = "/rental-agreements",
    request_body = CreateAgreement,
    responses(
        (status = 201, description = "Agreement created, unit OCCUPIED", body = RentalAgreement),
        (status = 404, description = "UNIT_NOT_FOUND or RENTER_NOT_FOUND", body = ErrorResponse),
        (status = 409, description = "UNIT_NOT_VACANT", body = ErrorResponse)
    ),
    tag = "rental-agreements",
    security(("bearer" = []))
)]
pub async fn create_agreement(
    State(state): State<AppState>,
    ValidatedJson(input): ValidatedJson<CreateAgreement>,
) -> Created<RentalAgreement> {
    let agreement = state.agreements.create(input).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_message(agreement, "Rental Agreement created and Unit occupied")),
    ))
}

/// Active agreements with unit, property and renter
#[utoipa::path(
    get,
    path = "/rental-agreements",
    responses((status = 200, description = "Active agreements, newest start first", body = [AgreementView])),
    tag = "rental-agreements",
    security(("bearer" = []))
)]
pub async fn list_agreements(State(state): State<AppState>) -> ApiResult<Vec<AgreementView>> {
    Ok(Json(ApiResponse::success(state.agreements.list_active().await?)))
}

/// Get an agreement with its invoices
#[utoipa::path(
    get,
    path = "/rental-agreements/{id}",
    params(("id" = Uuid, Path, description = "Agreement ID")),
    responses(
        (status = 200, description = "Agreement details", body = AgreementDetail),
        (status = 404, description = "RENTAL_AGREEMENT_NOT_FOUND", body = ErrorResponse)
    ),
    tag = "rental-agreements",
    security(("bearer" = []))
)]
pub async fn get_agreement(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<AgreementDetail> {
    Ok(Json(ApiResponse::success(state.agreements.get(id).await?)))
}

/// End an active agreement and vacate its unit
#[utoipa::path(
    patch,
    path = "/rental-agreements/{id}/terminate",
    params(("id" = Uuid, Path, description = "Agreement ID")),
    responses(
        (status = 200, description = "Agreement terminated, unit VACANT", body = RentalAgreement),
        (status = 404, description = "RENTAL_AGREEMENT_NOT_FOUND", body = ErrorResponse),
        (status = 409, description = "AGREEMENT_ALREADY_TERMINATED", body = ErrorResponse)
    ),
    tag = "rental-agreements",
    security(("bearer" = []))
)]
pub async fn terminate_agreement(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<RentalAgreement> {
    let agreement = state.agreements.terminate(id).await?;
    Ok(Json(ApiResponse::with_message(agreement, "Agreement terminated and Unit vacated")))
}
