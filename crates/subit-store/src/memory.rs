//! In-memory billing store.
//!
//! Holds subscriptions and usage rows in maps behind a `RwLock`. Nothing is
//! persisted. Use it in tests and for local runs without a database; the
//! seeding methods are the only way rows get in, since the
//! [`BillingStore`] trait itself is read-only.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::{BillingStore, StoreError, SubscriptionRecord, UsageRecord};

#[derive(Debug, Default)]
struct Inner {
    subscriptions: HashMap<String, SubscriptionRecord>,
    usage: Vec<UsageRecord>,
}

/// An in-memory billing store.
///
/// Clones share state.
///
/// # Examples
///
/// ```
/// # use subit_store::{BillingStore, MemoryStore, UsageRecord};
/// # #[tokio::main]
/// # async fn main() {
/// let store = MemoryStore::new();
/// store.record_usage(UsageRecord::new("p1", 5)).await;
/// let rows = store.get_usage_records("p1").await.unwrap();
/// assert_eq!(rows.len(), 1);
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<Inner>>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set (or replace) a user's subscription.
    pub async fn set_subscription(&self, user_id: &str, record: SubscriptionRecord) {
        let mut inner = self.inner.write().await;
        inner.subscriptions.insert(user_id.to_owned(), record);
    }

    /// Append a usage row.
    pub async fn record_usage(&self, record: UsageRecord) {
        let mut inner = self.inner.write().await;
        inner.usage.push(record);
    }
}

#[async_trait::async_trait]
impl BillingStore for MemoryStore {
    async fn get_subscription(
        &self,
        user_id: &str,
    ) -> Result<Option<SubscriptionRecord>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner.subscriptions.get(user_id).cloned())
    }

    async fn get_usage_records(&self, project_id: &str) -> Result<Vec<UsageRecord>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner
            .usage
            .iter()
            .filter(|r| r.project_id == project_id)
            .cloned()
            .collect())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
