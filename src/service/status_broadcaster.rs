use crate::domain::payment::StatusEvent;
use std::collections::HashMap;
use tokio::sync::{broadcast, RwLock};

const CHANNEL_CAPACITY: usize = 16;

struct Channel {
    tx: broadcast::Sender<StatusEvent>,
    terminal: bool,
}

/// In-process pub/sub keyed by purchase id, bridging bus-delivered status
/// events to live SSE streams. No buffering or replay: an event published
/// before any subscriber attaches is dropped, by contract.
#[derive(Default)]
pub struct StatusBroadcaster {
    channels: RwLock<HashMap<String, Channel>>,
}

impl StatusBroadcaster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Joins (or creates) the channel for a purchase. The stream ends only
    /// when the caller drops the receiver.
    pub async fn subscribe(&self, purchase_id: &str) -> broadcast::Receiver<StatusEvent> {
        let mut channels = self.channels.write().await;
        let channel = channels.entry(purchase_id.to_string()).or_insert_with(|| {
            let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
            Channel { tx, terminal: false }
        });
        channel.tx.subscribe()
    }

    /// Publishes to the purchase's channel, if anyone ever subscribed.
    /// Repeated terminal events for an already-terminal purchase are a no-op:
    /// the S2S path and the webhook path can both report the same outcome.
    pub async fn emit(&self, event: StatusEvent) {
        let mut channels = self.channels.write().await;
        match channels.get_mut(&event.purchase_id) {
            None => {
                tracing::debug!("no subscriber for purchase {}, status dropped", event.purchase_id);
            }
            // Every receiver already disconnected: prune the channel.
            Some(channel) if channel.tx.receiver_count() == 0 => {
                channels.remove(&event.purchase_id);
            }
            Some(channel) => {
                if channel.terminal && event.status.is_terminal() {
                    tracing::debug!(
                        "purchase {} already terminal, ignoring duplicate",
                        event.purchase_id
                    );
                    return;
                }
                if event.status.is_terminal() {
                    channel.terminal = true;
                }
                let _ = channel.tx.send(event);
            }
        }
    }
}
