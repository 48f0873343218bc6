use crate::gateways::{CreateWebhookRequest, GatewayClient};
use crate::inbox::signature::SignatureVerifier;
use anyhow::Result;
use std::sync::Arc;

const PURCHASE_PAID_TITLE: &str = "purchase-paid";
const PURCHASE_FAILED_TITLE: &str = "purchase-failed";
const PURCHASE_PAID_EVENT: &str = "purchase.paid";
const PURCHASE_FAILED_EVENT: &str = "purchase.failed";

/// Boot-time reconciliation with the gateway: fetch the webhook signing key
/// and make sure exactly two webhooks point at this deployment. Both steps
/// log and continue on failure; with no key installed the verifier rejects
/// every webhook until a later deploy fixes it.
pub struct WebhookBootstrap {
    pub gateway: Arc<dyn GatewayClient>,
    pub verifier: Arc<SignatureVerifier>,
    pub self_url: String,
}

impl WebhookBootstrap {
    pub async fn run(&self) {
        let (webhooks, key) = tokio::join!(self.setup_webhooks(), self.setup_public_key());
        if let Err(err) = webhooks {
            tracing::error!("error setting up webhooks: {err:#}");
        }
        if let Err(err) = key {
            tracing::error!("error setting up public key: {err:#}");
        }
    }

    async fn setup_public_key(&self) -> Result<()> {
        let pem = self.gateway.fetch_public_key().await?;
        self.verifier.install_key(pem);
        tracing::info!("webhook public key installed");
        Ok(())
    }

    async fn setup_webhooks(&self) -> Result<()> {
        let existing = self.gateway.list_webhooks().await?;

        self.ensure_webhook(&existing, PURCHASE_PAID_TITLE, PURCHASE_PAID_EVENT)
            .await?;
        self.ensure_webhook(&existing, PURCHASE_FAILED_TITLE, PURCHASE_FAILED_EVENT)
            .await?;
        Ok(())
    }

    async fn ensure_webhook(
        &self,
        existing: &[crate::gateways::WebhookInfo],
        title: &str,
        event: &str,
    ) -> Result<()> {
        let callback = format!("{}/inbox/{title}", self.self_url);

        match existing.iter().find(|hook| hook.title == title) {
            Some(hook) if hook.callback.contains(&self.self_url) => Ok(()),
            Some(stale) => {
                // Callback points at a previous deployment; recreate it.
                self.gateway.delete_webhook(&stale.id).await?;
                self.create(title, event, callback).await
            }
            None => self.create(title, event, callback).await,
        }
    }

    async fn create(&self, title: &str, event: &str, callback: String) -> Result<()> {
        self.gateway
            .create_webhook(CreateWebhookRequest {
                title: title.to_string(),
                all_events: false,
                events: vec![event.to_string()],
                callback,
            })
            .await?;
        tracing::info!("webhook {title} registered");
        Ok(())
    }
}
