//! Daraja settings

use serde::{Deserialize, Serialize};

/// Safaricom sandbox
pub const SANDBOX_BASE_URL: &str = "https://sandbox.safaricom.co.ke";

/// Daraja credentials and endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MpesaConfig {
    pub base_url: String,
    pub consumer_key: String,
    pub consumer_secret: String,
    /// Paybill / till number, also used as PartyB
    pub shortcode: String,
    pub passkey: String,
    /// Public URL Safaricom posts results to
    pub callback_url: String,
    pub timeout_secs: u64,
}

impl Default for MpesaConfig {
    fn default() -> Self {
        Self {
            base_url: SANDBOX_BASE_URL.to_string(),
            consumer_key: String::new(),
            consumer_secret: String::new(),
            shortcode: "174379".to_string(),
            passkey: String::new(),
            callback_url: "http://localhost:3000/mpesa/callback".to_string(),
            timeout_secs: 30,
        }
    }
}

impl MpesaConfig {
    /// OAuth client-credentials endpoint
    pub fn token_url(&self) -> String {
        format!(
            "{}/oauth/v1/generate?grant_type=client_credentials",
            self.base_url.trim_end_matches('/')
        )
    }

    /// STK push endpoint
    pub fn stk_push_url(&self) -> String {
        format!("{}/mpesa/stkpush/v1/processrequest", self.base_url.trim_end_matches('/'))
    }
}
