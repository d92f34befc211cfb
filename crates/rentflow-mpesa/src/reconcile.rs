//! Callback reconciliation
//!
//! The callback endpoint hands payloads to a bounded queue and returns. A
//! single worker drains the queue and applies each result to the store.
//! Callbacks carry no tenant identity, so the worker uses the unscoped store
//! and finds the payment by its globally unique CheckoutRequestID.

use std::sync::Arc;

use rentflow_core::{DataClientExt, Filter, MemoryStore, Payment, PaymentStatus, RentInvoice};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::callback::StkCallbackEnvelope;
use crate::error::ReconcileError;

/// Applies callback results to payments and invoices
#[derive(Clone)]
pub struct Reconciler {
    store: Arc<MemoryStore>,
}

impl Reconciler {
    pub fn new(store: Arc<MemoryStore>) -> Self {
        Self { store }
    }

    /// Success marks the payment COMPLETED with its receipt and the invoice
    /// paid, in one transaction. Anything else marks the payment FAILED and
    /// leaves the invoice alone. Payments already settled are left as they
    /// are, so redelivered callbacks are harmless.
    pub async fn reconcile(
        &self,
        envelope: &StkCallbackEnvelope,
    ) -> Result<PaymentStatus, ReconcileError> {
        let callback = envelope.callback().clone();
        let checkout_id = callback.checkout_request_id.clone();
        let raw = serde_json::to_value(envelope)?;

        self.store
            .transaction(move |tx| {
                Box::pin(async move {
                    let by_checkout = || {
                        let id = checkout_id.clone();
                        Filter::<Payment>::all()
                            .and(move |p| p.checkout_request_id.as_deref() == Some(id.as_str()))
                    };

                    let payment = tx
                        .find_unique(by_checkout())
                        .await?
                        .ok_or_else(|| ReconcileError::UnknownCheckout(checkout_id.clone()))?;
                    if payment.status != PaymentStatus::Pending {
                        warn!(
                            checkout_request_id = %checkout_id,
                            status = ?payment.status,
                            "Callback for settled payment ignored"
                        );
                        return Ok(payment.status);
                    }

                    if callback.is_success() {
                        let receipt = callback.receipt();
                        let payment = tx
                            .update(by_checkout(), move |p| {
                                p.status = PaymentStatus::Completed;
                                p.mpesa_receipt = receipt.clone();
                                p.raw_response = Some(raw.clone());
                            })
                            .await?;
                        if let Some(invoice_id) = payment.rent_invoice_id {
                            tx.update(Filter::<RentInvoice>::id(invoice_id), |i| i.is_paid = true)
                                .await?;
                        }
                        Ok(PaymentStatus::Completed)
                    } else {
                        tx.update(by_checkout(), move |p| {
                            p.status = PaymentStatus::Failed;
                            p.raw_response = Some(raw.clone());
                        })
                        .await?;
                        Ok::<_, ReconcileError>(PaymentStatus::Failed)
                    }
                })
            })
            .await
    }

    /// Reconcile and log the outcome; errors stop here
    pub async fn handle(&self, envelope: StkCallbackEnvelope) {
        let checkout_id = envelope.callback().checkout_request_id.clone();
        match self.reconcile(&envelope).await {
            Ok(status) => info!(
                checkout_request_id = %checkout_id,
                status = ?status,
                result_code = envelope.callback().result_code,
                "Payment reconciled"
            ),
            Err(e) => error!(
                checkout_request_id = %checkout_id,
                error = %e,
                "Failed to reconcile M-Pesa callback"
            ),
        }
    }
}

/// Hand-off from the callback endpoint to the reconciliation worker
#[derive(Clone)]
pub struct ReconciliationQueue {
    sender: mpsc::Sender<StkCallbackEnvelope>,
}

impl ReconciliationQueue {
    /// Start the worker; it runs until every queue handle is dropped
    pub fn spawn(reconciler: Reconciler, capacity: usize) -> (Self, JoinHandle<()>) {
        let (sender, mut receiver) = mpsc::channel::<StkCallbackEnvelope>(capacity.max(1));
        let worker = tokio::spawn(async move {
            info!("M-Pesa reconciliation worker started");
            while let Some(envelope) = receiver.recv().await {
                reconciler.handle(envelope).await;
            }
            info!("M-Pesa reconciliation worker stopped");
        });
        (Self { sender }, worker)
    }

    /// Queue a callback without waiting. When the queue is full the send
    /// moves to a background task that waits for room. Returns `false` only
    /// if the worker has stopped and the callback was dropped.
    pub fn enqueue(&self, envelope: StkCallbackEnvelope) -> bool {
        match self.sender.try_send(envelope) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(envelope)) => {
                let checkout_id = envelope.callback().checkout_request_id.clone();
                warn!(checkout_request_id = %checkout_id, "Reconciliation queue full, deferring callback");
                // The task holds a sender, so shutdown waits for it to land
                let sender = self.sender.clone();
                tokio::spawn(async move {
                    if sender.send(envelope).await.is_err() {
                        error!(checkout_request_id = %checkout_id, "Reconciliation worker stopped, callback dropped");
                    }
                });
                true
            }
            Err(mpsc::error::TrySendError::Closed(envelope)) => {
                error!(
                    checkout_request_id = %envelope.callback().checkout_request_id,
                    "Reconciliation worker stopped, callback dropped"
                );
                false
            }
        }
    }
}
