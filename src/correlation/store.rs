use crate::domain::payment::ThreeDSecureCorrelation;
use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use tokio::sync::Mutex;

/// Pending 3-D Secure correlations, keyed by purchase id. The completion
/// path and the expiry sweep both delete; deleting an absent record is a
/// no-op, which is what makes the two paths safe to race.
#[async_trait::async_trait]
pub trait CorrelationStore: Send + Sync {
    async fn put(
        &self,
        purchase_id: &str,
        callback_url: &str,
        created_at: DateTime<Utc>,
    ) -> Result<()>;

    async fn get(&self, purchase_id: &str) -> Result<Option<ThreeDSecureCorrelation>>;

    /// Returns whether a record was actually removed, so racing consumers
    /// can tell which one of them won.
    async fn delete(&self, purchase_id: &str) -> Result<bool>;

    /// Removes every record past TTL, consumed or not, and returns the count.
    async fn sweep_expired(&self, ttl: Duration, now: DateTime<Utc>) -> Result<usize>;
}

#[derive(Default)]
pub struct InMemoryCorrelationStore {
    records: Mutex<HashMap<String, ThreeDSecureCorrelation>>,
}

impl InMemoryCorrelationStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl CorrelationStore for InMemoryCorrelationStore {
    async fn put(
        &self,
        purchase_id: &str,
        callback_url: &str,
        created_at: DateTime<Utc>,
    ) -> Result<()> {
        let mut records = self.records.lock().await;
        // At most one live correlation per purchase: a new challenge replaces
        // the previous record.
        records.insert(
            purchase_id.to_string(),
            ThreeDSecureCorrelation {
                purchase_id: purchase_id.to_string(),
                callback_url: callback_url.to_string(),
                created_at,
            },
        );
        Ok(())
    }

    async fn get(&self, purchase_id: &str) -> Result<Option<ThreeDSecureCorrelation>> {
        let records = self.records.lock().await;
        Ok(records.get(purchase_id).cloned())
    }

    async fn delete(&self, purchase_id: &str) -> Result<bool> {
        let mut records = self.records.lock().await;
        Ok(records.remove(purchase_id).is_some())
    }

    async fn sweep_expired(&self, ttl: Duration, now: DateTime<Utc>) -> Result<usize> {
        let mut records = self.records.lock().await;
        let before = records.len();
        records.retain(|_, record| record.created_at + ttl >= now);
        Ok(before - records.len())
    }
}
