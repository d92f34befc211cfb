//! STK push initiation

use std::sync::Arc;

use chrono::Utc;
use rentflow_core::validation::KENYAN_PHONE;
use rentflow_core::{
    DataClientExt, Filter, Payment, PaymentMethod, PaymentStatus, RentInvoice, ScopedStore,
};
use serde::{Deserialize, Serialize};
use tracing::{error, info};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::config::MpesaConfig;
use crate::error::PaymentError;
use crate::gateway::{PaymentGateway, StkPushRequest};

/// Request to charge an invoice through the payer's phone
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InitiateStkPush {
    pub rent_invoice_id: Uuid,

    #[validate(regex(path = *KENYAN_PHONE, message = "Phone number must be in format +2547XXXXXXXX"))]
    pub phone: String,

    /// Whole KES
    #[validate(range(min = 1, message = "Amount must be at least 1"))]
    pub amount: i64,
}

/// M-Pesa application service
#[derive(Clone)]
pub struct MpesaService {
    db: ScopedStore,
    gateway: Arc<dyn PaymentGateway>,
    config: MpesaConfig,
}

impl MpesaService {
    pub fn new(db: ScopedStore, gateway: Arc<dyn PaymentGateway>, config: MpesaConfig) -> Self {
        Self { db, gateway, config }
    }

    /// Push a payment prompt to the payer and record a PENDING payment.
    ///
    /// Returns as soon as the provider accepts the request; the outcome
    /// arrives later on the callback.
    pub async fn initiate_stk_push(&self, request: InitiateStkPush) -> Result<Payment, PaymentError> {
        let invoice = self
            .db
            .find_unique(Filter::<RentInvoice>::id(request.rent_invoice_id))
            .await?
            .ok_or(PaymentError::InvoiceNotFound)?;

        let token = self.gateway.access_token().await.map_err(|e| {
            error!(provider = self.gateway.provider(), error = %e, "Failed to get M-Pesa access token");
            PaymentError::GatewayUnavailable
        })?;

        let push = StkPushRequest::paybill(
            &self.config,
            &invoice.id.to_string(),
            &request.phone,
            request.amount,
            Utc::now(),
        );
        let ack = self.gateway.stk_push(&token, &push).await.map_err(|e| {
            error!(invoice_id = %invoice.id, error = %e, "STK push failed");
            PaymentError::InitiationFailed
        })?;

        let now = Utc::now();
        let payment = Payment {
            id: Uuid::new_v4(),
            tenant_id: None,
            rental_agreement_id: invoice.rental_agreement_id,
            rent_invoice_id: Some(invoice.id),
            amount: request.amount,
            method: PaymentMethod::Mpesa,
            checkout_request_id: Some(ack.checkout_request_id.clone()),
            mpesa_receipt: None,
            status: PaymentStatus::Pending,
            raw_response: None,
            created_at: now,
            updated_at: now,
        };
        let payment = self.db.create(payment).await.map_err(|e| {
            error!(
                checkout_request_id = %ack.checkout_request_id,
                error = %e,
                "Failed to record pending payment"
            );
            PaymentError::InitiationFailed
        })?;

        info!(
            payment_id = %payment.id,
            invoice_id = %invoice.id,
            checkout_request_id = %ack.checkout_request_id,
            "STK push sent"
        );
        Ok(payment)
    }
}
