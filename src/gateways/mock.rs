use crate::gateways::{
    ChargeRequest, ChargeResult, CreateWebhookRequest, GatewayClient, PurchaseIntent,
    RegisterPurchaseRequest, WebhookInfo,
};
use anyhow::Result;

/// Scriptable stand-in for the upstream gateway. The behavior knob decides
/// what every charge attempt returns.
pub struct MockGatewayClient {
    pub behavior: String,
}

impl MockGatewayClient {
    pub fn new(behavior: &str) -> Self {
        Self {
            behavior: behavior.to_string(),
        }
    }
}

#[async_trait::async_trait]
impl GatewayClient for MockGatewayClient {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn register_purchase(&self, _request: RegisterPurchaseRequest) -> Result<PurchaseIntent> {
        let id = uuid::Uuid::new_v4().to_string();
        Ok(PurchaseIntent {
            direct_charge_url: format!("https://gate.mock/p/{id}/"),
            id,
        })
    }

    async fn charge(&self, _direct_charge_url: &str, _request: &ChargeRequest) -> Result<ChargeResult> {
        match self.behavior.as_str() {
            "ALWAYS_ERROR" => Ok(ChargeResult::Error),
            "ALWAYS_PENDING" => Ok(ChargeResult::Pending),
            "THREE_D_SECURE_GET" => Ok(ChargeResult::ThreeDSecureRequired {
                method: "GET".to_string(),
                pa_req: "mock-pa-req".to_string(),
                md: Some("mock-md".to_string()),
                url: "https://bank.mock/challenge".to_string(),
                callback_url: "https://gate.mock/cb".to_string(),
            }),
            "THREE_D_SECURE_POST" => Ok(ChargeResult::ThreeDSecureRequired {
                method: "POST".to_string(),
                pa_req: "mock-pa-req".to_string(),
                md: Some("mock-md".to_string()),
                url: "https://bank.mock/challenge".to_string(),
                callback_url: "https://gate.mock/cb".to_string(),
            }),
            "TRANSPORT_ERROR" => anyhow::bail!("mock transport failure"),
            _ => Ok(ChargeResult::Executed),
        }
    }

    async fn complete_challenge(
        &self,
        _callback_url: &str,
        _md: Option<&str>,
        _pa_res: &str,
    ) -> Result<ChargeResult> {
        if self.behavior == "TRANSPORT_ERROR" {
            anyhow::bail!("mock transport failure");
        }
        Ok(ChargeResult::Executed)
    }

    async fn list_webhooks(&self) -> Result<Vec<WebhookInfo>> {
        Ok(Vec::new())
    }

    async fn create_webhook(&self, request: CreateWebhookRequest) -> Result<WebhookInfo> {
        Ok(WebhookInfo {
            id: uuid::Uuid::new_v4().to_string(),
            title: request.title,
            callback: request.callback,
        })
    }

    async fn delete_webhook(&self, _id: &str) -> Result<()> {
        Ok(())
    }

    async fn fetch_public_key(&self) -> Result<String> {
        Ok(String::new())
    }
}
