//! Rent invoice endpoints

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use rentflow_core::services::{
    CreateInvoice, InvoiceDetail, InvoiceView, OutstandingSummary, UpdateInvoice,
};
use rentflow_core::RentInvoice;
use uuid::Uuid;

use super::{guarded, ApiResult, Created};
use crate::extract::{Path, ValidatedJson};
use crate::middleware::Permission;
use crate::models::{ApiResponse, ErrorResponse};
use crate::AppState;

pub fn router() -> Router<AppState> {
    let routes = Router::new()
        .route("/rent-invoices", get(list_invoices).post(create_invoice))
        .route("/rent-invoices/summary", get(outstanding_summary))
        .route("/rent-invoices/:id", get(get_invoice).put(update_invoice));
    guarded(routes, Permission::InvoicesManage)
}

/// Bill an active agreement
#[utoipa::path(
    post,
    path = "/rent-invoices",
    request_body = CreateInvoice,
    responses(
        (status = 201, description = "Invoice generated", body = RentInvoice),
        (status = 404, description = "ACTIVE_RENTAL_AGREEMENT_NOT_FOUND", body = ErrorResponse)
    ),
    tag = "rent-invoices",
    security(("bearer" = []))
)]
pub async fn create_invoice(
    State(state): State<AppState>,
    ValidatedJson(input): ValidatedJson<CreateInvoice>,
) -> Created<RentInvoice> {
    let invoice = state.invoices.create(input).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_message(invoice, "Invoice generated successfully")),
    ))
}

/// Invoices with agreement context
#[utoipa::path(
    get,
    path = "/rent-invoices",
    responses((status = 200, description = "Invoices, latest due date first", body = [InvoiceView])),
    tag = "rent-invoices",
    security(("bearer" = []))
)]
pub async fn list_invoices(State(state): State<AppState>) -> ApiResult<Vec<InvoiceView>> {
    Ok(Json(ApiResponse::success(state.invoices.list().await?)))
}

/// Unpaid invoice count and amount due
#[utoipa::path(
    get,
    path = "/rent-invoices/summary",
    responses((status = 200, description = "Outstanding balance", body = OutstandingSummary)),
    tag = "rent-invoices",
    security(("bearer" = []))
)]
pub async fn outstanding_summary(State(state): State<AppState>) -> ApiResult<OutstandingSummary> {
    Ok(Json(ApiResponse::success(state.invoices.outstanding().await?)))
}

/// Get an invoice with its payments
#[utoipa::path(
    get,
    path = "/rent-invoices/{id}",
    params(("id" = Uuid, Path, description = "Invoice ID")),
    responses(
        (status = 200, description = "Invoice details", body = InvoiceDetail),
        (status = 404, description = "INVOICE_NOT_FOUND", body = ErrorResponse)
    ),
    tag = "rent-invoices",
    security(("bearer" = []))
)]
pub async fn get_invoice(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<InvoiceDetail> {
    Ok(Json(ApiResponse::success(state.invoices.get(id).await?)))
}

/// Mark paid or apply a late fee
#[utoipa::path(
    put,
    path = "/rent-invoices/{id}",
    params(("id" = Uuid, Path, description = "Invoice ID")),
    request_body = UpdateInvoice,
    responses(
        (status = 200, description = "Invoice updated", body = RentInvoice),
        (status = 404, description = "INVOICE_NOT_FOUND", body = ErrorResponse)
    ),
    tag = "rent-invoices",
    security(("bearer" = []))
)]
pub async fn update_invoice(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    ValidatedJson(input): ValidatedJson<UpdateInvoice>,
) -> ApiResult<RentInvoice> {
    Ok(Json(ApiResponse::success(state.invoices.update(id, input).await?)))
}
