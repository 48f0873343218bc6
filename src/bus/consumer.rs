use crate::bus::{Delivery, InMemoryBus, PaymentEvent};
use crate::service::orchestrator::PaymentOrchestrator;
use crate::service::status_broadcaster::StatusBroadcaster;
use anyhow::Result;
use std::sync::Arc;
use tokio::sync::mpsc;

const MAX_DELIVERY_ATTEMPTS: u32 = 5;

/// Single sequential worker: one in-flight delivery at a time, so charge
/// attempts cannot stampede the gateway.
pub struct EventConsumer {
    pub orchestrator: Arc<PaymentOrchestrator>,
    pub broadcaster: Arc<StatusBroadcaster>,
    pub bus: InMemoryBus,
}

impl EventConsumer {
    pub async fn run(self, mut rx: mpsc::UnboundedReceiver<Delivery>) {
        while let Some(delivery) = rx.recv().await {
            if let Err(err) = self.dispatch(&delivery.event).await {
                tracing::error!(attempt = delivery.attempt, "event handling failed: {err:#}");
                self.schedule_redelivery(delivery);
            }
        }
    }

    async fn dispatch(&self, event: &PaymentEvent) -> Result<()> {
        match event {
            PaymentEvent::ProcessPayment(data) => self.orchestrator.process(data.clone()).await,
            PaymentEvent::UpdatePaymentStatus(status) => {
                self.broadcaster.emit(status.clone()).await;
                Ok(())
            }
        }
    }

    fn schedule_redelivery(&self, delivery: Delivery) {
        if delivery.attempt >= MAX_DELIVERY_ATTEMPTS {
            tracing::warn!("dropping event after {} attempts", delivery.attempt);
            return;
        }

        let next = Delivery {
            event: delivery.event,
            attempt: delivery.attempt + 1,
        };
        let bus = self.bus.clone();
        tokio::spawn(async move {
            tokio::time::sleep(backoff(next.attempt)).await;
            if let Err(err) = bus.redeliver(next) {
                tracing::warn!("redelivery failed: {err}");
            }
        });
    }
}

fn backoff(attempt: u32) -> std::time::Duration {
    let secs = u64::min(60, 2_u64.pow(attempt.min(8)));
    std::time::Duration::from_secs(secs)
}
