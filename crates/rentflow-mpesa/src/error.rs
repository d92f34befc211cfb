//! Payment errors

use rentflow_core::StoreError;
use thiserror::Error;

/// Provider call failure
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("provider returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("provider rejected request: {0}")]
    Rejected(String),
}

/// Initiation failure, as reported to the caller
#[derive(Debug, Error)]
pub enum PaymentError {
    #[error("Invoice not found")]
    InvoiceNotFound,

    #[error("Payment gateway unavailable")]
    GatewayUnavailable,

    #[error("Failed to initiate M-Pesa payment")]
    InitiationFailed,

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl PaymentError {
    /// Stable machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvoiceNotFound => "INVOICE_NOT_FOUND",
            Self::GatewayUnavailable => "PAYMENT_GATEWAY_UNAVAILABLE",
            Self::InitiationFailed => "PAYMENT_INITIATION_FAILED",
            Self::Store(_) => "INTERNAL_ERROR",
        }
    }
}

/// Reconciliation failure; logged by the worker and never surfaced
#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("no payment for CheckoutRequestID {0}")]
    UnknownCheckout(String),

    #[error("callback payload could not be encoded: {0}")]
    Payload(#[from] serde_json::Error),

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}
