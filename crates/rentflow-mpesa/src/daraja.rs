//! Safaricom Daraja Connector

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use crate::config::MpesaConfig;
use crate::error::GatewayError;
use crate::gateway::{PaymentGateway, StkPushRequest, StkPushResponse};

/// Tokens are refreshed this long before Daraja expires them
const TOKEN_EXPIRY_MARGIN: Duration = Duration::from_secs(60);

/// Daraja HTTP client
pub struct DarajaClient {
    client: Client,
    config: MpesaConfig,
    access_token: tokio::sync::RwLock<Option<CachedToken>>,
}

struct CachedToken {
    value: String,
    expires_at: Instant,
}

impl DarajaClient {
    pub fn new(config: MpesaConfig) -> Result<Self, GatewayError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            config,
            access_token: tokio::sync::RwLock::new(None),
        })
    }

    pub fn config(&self) -> &MpesaConfig {
        &self.config
    }

    async fn fetch_token(&self) -> Result<TokenResponse, GatewayError> {
        let response = self
            .client
            .get(self.config.token_url())
            .basic_auth(&self.config.consumer_key, Some(&self.config.consumer_secret))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GatewayError::Status { status: status.as_u16(), body });
        }
        Ok(response.json().await?)
    }
}

#[async_trait]
impl PaymentGateway for DarajaClient {
    fn provider(&self) -> &'static str {
        "mpesa-daraja"
    }

    async fn access_token(&self) -> Result<String, GatewayError> {
        // Check cached token
        {
            let token = self.access_token.read().await;
            if let Some(cached) = token.as_ref() {
                if Instant::now() < cached.expires_at {
                    return Ok(cached.value.clone());
                }
            }
        }

        let response = self.fetch_token().await?;
        let lifetime = response
            .expires_in
            .as_deref()
            .and_then(|s| s.parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or(Duration::ZERO)
            .saturating_sub(TOKEN_EXPIRY_MARGIN);
        debug!(lifetime_secs = lifetime.as_secs(), "Fetched Daraja access token");

        {
            let mut token = self.access_token.write().await;
            *token = Some(CachedToken {
                value: response.access_token.clone(),
                expires_at: Instant::now() + lifetime,
            });
        }

        Ok(response.access_token)
    }

    async fn stk_push(
        &self,
        token: &str,
        request: &StkPushRequest,
    ) -> Result<StkPushResponse, GatewayError> {
        let response = self
            .client
            .post(self.config.stk_push_url())
            .bearer_auth(token)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GatewayError::Status { status: status.as_u16(), body });
        }

        let ack: StkPushResponse = response.json().await?;
        if ack.response_code != "0" || ack.checkout_request_id.is_empty() {
            return Err(GatewayError::Rejected(format!(
                "{}: {}",
                ack.response_code, ack.response_description
            )));
        }
        Ok(ack)
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    /// Seconds, sent as a string
    expires_in: Option<String>,
}
