//! RentFlow M-Pesa
//!
//! STK-push payments through Safaricom Daraja.
//!
//! ## Flow
//!
//! ```text
//! POST /mpesa/stk-push ─► MpesaService ─► PaymentGateway (OAuth, push) ─► Payment PENDING
//!
//! POST /mpesa/callback ─► ReconciliationQueue ──mpsc──► Reconciler ─► Payment COMPLETED/FAILED
//!        │                                                             (+ invoice paid)
//!        └─► {"ResultCode":0,"ResultDesc":"Accepted"}
//! ```
//!
//! The callback handler never waits on reconciliation, and reconciliation
//! failures are logged, never reported to the provider.

pub mod callback;
pub mod config;
pub mod daraja;
pub mod error;
pub mod gateway;
pub mod reconcile;
pub mod service;

pub use callback::{CallbackAck, CallbackItem, CallbackMetadata, StkCallback, StkCallbackEnvelope};
pub use config::MpesaConfig;
pub use daraja::DarajaClient;
pub use error::{GatewayError, PaymentError, ReconcileError};
pub use gateway::{PaymentGateway, StkPushRequest, StkPushResponse};
pub use reconcile::{ReconciliationQueue, Reconciler};
pub use service::{InitiateStkPush, MpesaService};
