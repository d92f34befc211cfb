//! Payment gateway port
//!
//! Wire types follow Daraja's PascalCase field names.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::MpesaConfig;
use crate::error::GatewayError;

/// STK push request body
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct StkPushRequest {
    pub business_short_code: String,
    pub password: String,
    pub timestamp: String,
    pub transaction_type: String,
    pub amount: i64,
    pub party_a: String,
    pub party_b: String,
    pub phone_number: String,
    #[serde(rename = "CallBackURL")]
    pub callback_url: String,
    pub account_reference: String,
    pub transaction_desc: String,
}

impl StkPushRequest {
    /// Paybill request for `amount` KES from `phone` (E.164), referencing
    /// `reference` (truncated to 12 characters)
    pub fn paybill(
        config: &MpesaConfig,
        reference: &str,
        phone: &str,
        amount: i64,
        now: DateTime<Utc>,
    ) -> Self {
        let timestamp = timestamp(now);
        let msisdn = phone.trim_start_matches('+').to_string();
        Self {
            business_short_code: config.shortcode.clone(),
            password: password(&config.shortcode, &config.passkey, &timestamp),
            timestamp,
            transaction_type: "CustomerPayBillOnline".to_string(),
            amount,
            party_a: msisdn.clone(),
            party_b: config.shortcode.clone(),
            phone_number: msisdn,
            callback_url: config.callback_url.clone(),
            account_reference: reference.chars().take(12).collect(),
            transaction_desc: "Rent Payment".to_string(),
        }
    }
}

/// STK push acknowledgement
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StkPushResponse {
    #[serde(rename = "MerchantRequestID")]
    pub merchant_request_id: String,
    #[serde(rename = "CheckoutRequestID")]
    pub checkout_request_id: String,
    #[serde(rename = "ResponseCode")]
    pub response_code: String,
    #[serde(rename = "ResponseDescription", default)]
    pub response_description: String,
    #[serde(rename = "CustomerMessage", default)]
    pub customer_message: String,
}

/// Payment provider
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Provider name for logs
    fn provider(&self) -> &'static str;

    /// OAuth access token
    async fn access_token(&self) -> Result<String, GatewayError>;

    /// Submit an STK push
    async fn stk_push(
        &self,
        token: &str,
        request: &StkPushRequest,
    ) -> Result<StkPushResponse, GatewayError>;
}

/// `YYYYMMDDHHmmss` in UTC
pub fn timestamp(now: DateTime<Utc>) -> String {
    now.format("%Y%m%d%H%M%S").to_string()
}

/// base64(shortcode + passkey + timestamp)
pub fn password(shortcode: &str, passkey: &str, timestamp: &str) -> String {
    STANDARD.encode(format!("{shortcode}{passkey}{timestamp}"))
}
