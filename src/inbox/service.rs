use crate::bus::{MessageBus, PaymentEvent};
use crate::domain::payment::{PaymentStatus, StatusEvent};
use anyhow::Result;
use serde::Deserialize;
use std::sync::Arc;

/// Webhook body sent by the gateway for both notification kinds.
#[derive(Debug, Clone, Deserialize)]
pub struct PurchaseWebhook {
    pub id: String,
    #[serde(rename = "direct_post_url")]
    pub direct_charge_url: String,
}

/// Translates verified gateway webhooks into the same terminal status events
/// the S2S path publishes. Downstream idempotence handles the case where
/// both paths report the outcome for one purchase.
#[derive(Clone)]
pub struct InboxService {
    pub bus: Arc<dyn MessageBus>,
}

impl InboxService {
    pub async fn purchase_paid(&self, webhook: PurchaseWebhook) -> Result<()> {
        tracing::info!("purchase {} reported paid by webhook", webhook.id);
        self.publish(webhook.id, PaymentStatus::Executed).await
    }

    pub async fn purchase_failed(&self, webhook: PurchaseWebhook) -> Result<()> {
        tracing::warn!("purchase {} reported failed by webhook", webhook.id);
        self.publish(webhook.id, PaymentStatus::Failed).await
    }

    async fn publish(&self, purchase_id: String, status: PaymentStatus) -> Result<()> {
        self.bus
            .publish(PaymentEvent::UpdatePaymentStatus(StatusEvent {
                purchase_id,
                status,
                three_d_secure_request: None,
            }))
            .await
    }
}
