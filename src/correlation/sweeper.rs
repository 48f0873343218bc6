use crate::correlation::store::CorrelationStore;
use chrono::Utc;
use std::sync::Arc;

/// Background expiry of unconsumed 3-D Secure correlations. Expired records
/// get no notification to the gateway; a late browser callback simply finds
/// nothing.
pub struct CorrelationSweeper {
    pub store: Arc<dyn CorrelationStore>,
    pub ttl: chrono::Duration,
    pub interval: std::time::Duration,
}

impl CorrelationSweeper {
    pub async fn run(self) {
        loop {
            tokio::time::sleep(self.interval).await;
            match self.store.sweep_expired(self.ttl, Utc::now()).await {
                Ok(count) => {
                    if count > 0 {
                        tracing::info!("swept {count} expired 3-D Secure correlations");
                    }
                }
                Err(err) => tracing::error!("correlation sweep error: {err:#}"),
            }
        }
    }
}
