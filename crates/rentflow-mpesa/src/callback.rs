//! STK callback payload

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// `{"Body": {"stkCallback": {...}}}`
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct StkCallbackEnvelope {
    #[serde(rename = "Body")]
    pub body: StkCallbackBody,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct StkCallbackBody {
    #[serde(rename = "stkCallback")]
    pub stk_callback: StkCallback,
}

/// Result of one STK push
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "PascalCase")]
pub struct StkCallback {
    #[serde(rename = "MerchantRequestID")]
    pub merchant_request_id: String,
    #[serde(rename = "CheckoutRequestID")]
    pub checkout_request_id: String,
    /// 0 on success
    pub result_code: i64,
    pub result_desc: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub callback_metadata: Option<CallbackMetadata>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "PascalCase")]
pub struct CallbackMetadata {
    pub item: Vec<CallbackItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "PascalCase")]
pub struct CallbackItem {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub value: Option<serde_json::Value>,
}

impl StkCallbackEnvelope {
    pub fn callback(&self) -> &StkCallback {
        &self.body.stk_callback
    }
}

impl StkCallback {
    /// Successful payment with metadata attached
    pub fn is_success(&self) -> bool {
        self.result_code == 0 && self.callback_metadata.is_some()
    }

    /// Metadata item by name
    pub fn item(&self, name: &str) -> Option<&serde_json::Value> {
        self.callback_metadata
            .as_ref()?
            .item
            .iter()
            .find(|item| item.name == name)?
            .value
            .as_ref()
    }

    /// `MpesaReceiptNumber`, if present
    pub fn receipt(&self) -> Option<String> {
        match self.item("MpesaReceiptNumber")? {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }
}

/// Acknowledgement returned to Safaricom for every callback
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "PascalCase")]
pub struct CallbackAck {
    pub result_code: i64,
    pub result_desc: String,
}

impl CallbackAck {
    pub fn accepted() -> Self {
        Self {
            result_code: 0,
            result_desc: "Accepted".to_string(),
        }
    }
}
