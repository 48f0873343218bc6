use anyhow::Result;
use serde::{Deserialize, Serialize};

pub mod http;
pub mod mock;

/// Purchase registered with the upstream gateway. Ownership of the full
/// record stays upstream; we carry only the id and the S2S charge endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct PurchaseIntent {
    pub id: String,
    #[serde(rename = "direct_post_url")]
    pub direct_charge_url: String,
}

#[derive(Debug, Clone)]
pub struct RegisterPurchaseRequest {
    pub client_email: String,
    pub currency: String,
    pub product_name: String,
    pub price_minor: i64,
    pub success_redirect: String,
    pub failure_redirect: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChargeRequest {
    pub cardholder_name: String,
    pub card_number: String,
    pub expires: String,
    pub cvc: String,
    pub remote_ip: String,
}

/// Normalized S2S charge outcome. A `3DS_required` descriptor carries
/// everything needed to build the browser challenge and to correlate the
/// completion callback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status")]
pub enum ChargeResult {
    #[serde(rename = "executed")]
    Executed,
    #[serde(rename = "authorized")]
    Authorized,
    #[serde(rename = "pending")]
    Pending,
    #[serde(rename = "error")]
    Error,
    #[serde(rename = "3DS_required")]
    ThreeDSecureRequired {
        #[serde(rename = "Method")]
        method: String,
        #[serde(rename = "PaReq")]
        pa_req: String,
        #[serde(rename = "MD", default, skip_serializing_if = "Option::is_none")]
        md: Option<String>,
        #[serde(rename = "URL")]
        url: String,
        callback_url: String,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookInfo {
    pub id: String,
    pub title: String,
    pub callback: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateWebhookRequest {
    pub title: String,
    pub all_events: bool,
    pub events: Vec<String>,
    pub callback: String,
}

#[async_trait::async_trait]
pub trait GatewayClient: Send + Sync {
    fn name(&self) -> &'static str;

    async fn register_purchase(&self, request: RegisterPurchaseRequest) -> Result<PurchaseIntent>;

    /// Server-to-server charge against the purchase's direct charge URL.
    /// A 4xx response carrying a well-formed `error` body is a normal
    /// business result, not an error.
    async fn charge(&self, direct_charge_url: &str, request: &ChargeRequest) -> Result<ChargeResult>;

    async fn complete_challenge(
        &self,
        callback_url: &str,
        md: Option<&str>,
        pa_res: &str,
    ) -> Result<ChargeResult>;

    async fn list_webhooks(&self) -> Result<Vec<WebhookInfo>>;

    async fn create_webhook(&self, request: CreateWebhookRequest) -> Result<WebhookInfo>;

    async fn delete_webhook(&self, id: &str) -> Result<()>;

    async fn fetch_public_key(&self) -> Result<String>;
}
