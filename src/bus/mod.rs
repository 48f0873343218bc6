use crate::domain::payment::StatusEvent;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

pub mod consumer;

/// Everything the queue consumer needs to drive one charge attempt. Card
/// data lives only in this single in-flight event, never at rest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessPaymentData {
    pub purchase_id: String,
    pub direct_charge_url: String,
    pub cardholder_name: String,
    pub card_number: String,
    pub expires: String,
    pub cvc: String,
    pub remote_ip: String,
}

/// The two event kinds carried by the bus, as an explicit tagged union
/// matched exhaustively at the consumer boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PaymentEvent {
    ProcessPayment(ProcessPaymentData),
    UpdatePaymentStatus(StatusEvent),
}

#[derive(Debug, Clone)]
pub struct Delivery {
    pub event: PaymentEvent,
    pub attempt: u32,
}

#[async_trait::async_trait]
pub trait MessageBus: Send + Sync {
    async fn publish(&self, event: PaymentEvent) -> Result<()>;
}

/// Point-to-point in-process queue with at-least-once semantics: the
/// consumer requeues a delivery whose handling failed (see `consumer`).
#[derive(Clone)]
pub struct InMemoryBus {
    tx: mpsc::UnboundedSender<Delivery>,
}

impl InMemoryBus {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<Delivery>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    pub fn redeliver(&self, delivery: Delivery) -> Result<()> {
        self.tx
            .send(delivery)
            .map_err(|_| anyhow::anyhow!("message bus is closed"))
    }
}

#[async_trait::async_trait]
impl MessageBus for InMemoryBus {
    async fn publish(&self, event: PaymentEvent) -> Result<()> {
        self.redeliver(Delivery { event, attempt: 1 })
    }
}
