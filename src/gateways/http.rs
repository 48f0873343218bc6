use crate::gateways::{
    ChargeRequest, ChargeResult, CreateWebhookRequest, GatewayClient, PurchaseIntent,
    RegisterPurchaseRequest, WebhookInfo,
};
use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::json;

pub struct HttpGatewayClient {
    pub base_url: String,
    pub api_key: String,
    pub s2s_token: String,
    pub brand_id: String,
    pub timeout_ms: u64,
    pub client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct WebhookListResponse {
    results: Vec<WebhookInfo>,
}

impl HttpGatewayClient {
    fn timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.timeout_ms)
    }

    async fn read_charge_result(resp: reqwest::Response) -> Result<ChargeResult> {
        let status = resp.status().as_u16();
        let body = resp.bytes().await.unwrap_or_default();
        fold_charge_response(status, &body)
    }
}

/// The gateway transports a business decline as an HTTP 400 whose body is
/// still a well-formed charge result with `status == "error"`. Only that one
/// case is folded back into a normal result; every other non-2xx is a
/// transport failure left to the caller (and the bus's retry policy).
pub fn fold_charge_response(status: u16, body: &[u8]) -> Result<ChargeResult> {
    if (200..300).contains(&status) {
        return serde_json::from_slice(body).context("malformed charge response body");
    }

    if status == 400 {
        if let Ok(result) = serde_json::from_slice::<ChargeResult>(body) {
            if matches!(result, ChargeResult::Error) {
                return Ok(result);
            }
        }
    }

    anyhow::bail!(
        "charge request failed with HTTP {status}: {}",
        String::from_utf8_lossy(body).chars().take(200).collect::<String>()
    )
}

#[async_trait::async_trait]
impl GatewayClient for HttpGatewayClient {
    fn name(&self) -> &'static str {
        "http"
    }

    async fn register_purchase(&self, request: RegisterPurchaseRequest) -> Result<PurchaseIntent> {
        // The upstream API has broken routing and requires a trailing slash.
        let url = format!("{}/purchases/", self.base_url);
        let body = json!({
            "client": { "email": request.client_email },
            "purchase": {
                "currency": request.currency,
                "products": [{ "name": request.product_name, "price": request.price_minor }],
            },
            "brand_id": self.brand_id,
            "success_redirect": request.success_redirect,
            "failure_redirect": request.failure_redirect,
        });

        let resp = self
            .client
            .post(url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .timeout(self.timeout())
            .send()
            .await?
            .error_for_status()?;

        resp.json::<PurchaseIntent>()
            .await
            .context("malformed purchase response body")
    }

    async fn charge(&self, direct_charge_url: &str, request: &ChargeRequest) -> Result<ChargeResult> {
        let resp = self
            .client
            .post(format!("{direct_charge_url}?s2s=true"))
            .bearer_auth(&self.s2s_token)
            .json(request)
            .timeout(self.timeout())
            .send()
            .await?;

        Self::read_charge_result(resp).await
    }

    async fn complete_challenge(
        &self,
        callback_url: &str,
        md: Option<&str>,
        pa_res: &str,
    ) -> Result<ChargeResult> {
        let mut form: Vec<(&str, &str)> = Vec::with_capacity(2);
        if let Some(md) = md {
            form.push(("MD", md));
        }
        form.push(("PaRes", pa_res));

        let resp = self
            .client
            .post(callback_url)
            .form(&form)
            .timeout(self.timeout())
            .send()
            .await?;

        Self::read_charge_result(resp).await
    }

    async fn list_webhooks(&self) -> Result<Vec<WebhookInfo>> {
        let url = format!("{}/webhooks/", self.base_url);
        let resp = self
            .client
            .get(url)
            .bearer_auth(&self.api_key)
            .timeout(self.timeout())
            .send()
            .await?
            .error_for_status()?;

        Ok(resp.json::<WebhookListResponse>().await?.results)
    }

    async fn create_webhook(&self, request: CreateWebhookRequest) -> Result<WebhookInfo> {
        let url = format!("{}/webhooks/", self.base_url);
        let resp = self
            .client
            .post(url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .timeout(self.timeout())
            .send()
            .await?
            .error_for_status()?;

        resp.json::<WebhookInfo>()
            .await
            .context("malformed webhook response body")
    }

    async fn delete_webhook(&self, id: &str) -> Result<()> {
        let url = format!("{}/webhooks/{id}/", self.base_url);
        self.client
            .delete(url)
            .bearer_auth(&self.api_key)
            .timeout(self.timeout())
            .send()
            .await?
            .error_for_status()?;

        Ok(())
    }

    async fn fetch_public_key(&self) -> Result<String> {
        let url = format!("{}/public_key/", self.base_url);
        let resp = self
            .client
            .get(url)
            .bearer_auth(&self.api_key)
            .timeout(self.timeout())
            .send()
            .await?
            .error_for_status()?;

        // Some deployments return the PEM as a JSON-encoded string.
        let text = resp.text().await?;
        Ok(serde_json::from_str::<String>(&text).unwrap_or(text))
    }
}
