//! Energy usage aggregation and per-user entitlement resolution.
//!
//! The resolver wraps an optional store. `None` means the store's connection
//! parameters were missing at startup; every call then fails with
//! [`EntitlementError::NotConfigured`] instead of pretending usage is zero.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use subit_store::{BillingStore, UsageRecord};

use crate::error::EntitlementError;
use crate::plan::{Entitlement, PlanTier};

/// Sum of strictly positive energy costs.
///
/// Zero and negative rows (credits, corrections) contribute nothing, and so
/// do non-finite values. Fractional costs are summed as stored; nothing is
/// rounded.
#[must_use]
pub fn total_energy(records: &[UsageRecord]) -> f64 {
    records
        .iter()
        .map(|r| r.energy_cost)
        .filter(|cost| cost.is_finite() && *cost > 0.0)
        .sum()
}

/// A user's resolved plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserEntitlement {
    pub plan: PlanTier,
    #[serde(flatten)]
    pub entitlement: Entitlement,
    pub daily_energy: Option<u32>,
    pub ends_at: Option<DateTime<Utc>>,
}

/// Read-only resolver over the billing store.
#[derive(Clone)]
pub struct EntitlementResolver {
    store: Option<Arc<dyn BillingStore>>,
}

impl std::fmt::Debug for EntitlementResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntitlementResolver")
            .field("store", &self.store.as_ref().map(|s| s.backend_name()))
            .finish()
    }
}

impl EntitlementResolver {
    #[must_use]
    pub fn new(store: Option<Arc<dyn BillingStore>>) -> Self {
        Self { store }
    }

    #[must_use]
    pub fn is_configured(&self) -> bool {
        self.store.is_some()
    }

    /// Name of the backing store, if one is configured.
    #[must_use]
    pub fn backend_name(&self) -> Option<&'static str> {
        self.store.as_ref().map(|s| s.backend_name())
    }

    fn store(&self) -> Result<&Arc<dyn BillingStore>, EntitlementError> {
        self.store.as_ref().ok_or(EntitlementError::NotConfigured)
    }

    /// Total energy spent on a project.
    ///
    /// # Errors
    ///
    /// Returns [`EntitlementError::NotConfigured`] without a store and
    /// [`EntitlementError::Fetch`] if the query fails.
    pub async fn project_energy(&self, project_id: &str) -> Result<f64, EntitlementError> {
        let store = self.store()?;
        let records = store.get_usage_records(project_id).await?;
        let total = total_energy(&records);
        tracing::debug!(project_id, rows = records.len(), total, "aggregated project energy");
        Ok(total)
    }

    /// Plan and entitlement for a user. No subscription row means free.
    ///
    /// # Errors
    ///
    /// Returns [`EntitlementError::NotConfigured`] without a store and
    /// [`EntitlementError::Fetch`] if the query fails.
    pub async fn user_entitlement(&self, user_id: &str) -> Result<UserEntitlement, EntitlementError> {
        let store = self.store()?;
        let record = store.get_subscription(user_id).await?;

        let (plan, ends_at) = match record {
            Some(r) => (PlanTier::parse(r.plan.as_deref()), r.ends_at),
            None => (PlanTier::Free, None),
        };

        Ok(UserEntitlement {
            plan,
            entitlement: plan.entitlement(),
            daily_energy: plan.daily_energy_limit(),
            ends_at,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use subit_store::{MemoryStore, StoreError, SubscriptionRecord};

    struct FailingStore;

    #[async_trait::async_trait]
    impl BillingStore for FailingStore {
        async fn get_subscription(
            &self,
            _user_id: &str,
        ) -> Result<Option<SubscriptionRecord>, StoreError> {
            Err(StoreError::Query {
                table: subit_store::BILLING_TABLE,
                reason: "connection reset".to_owned(),
            })
        }

        async fn get_usage_records(&self, _project_id: &str) -> Result<Vec<UsageRecord>, StoreError> {
            Err(StoreError::Query {
                table: subit_store::USAGE_TABLE,
                reason: "connection reset".to_owned(),
            })
        }

        fn backend_name(&self) -> &'static str {
            "failing"
        }
    }

    fn rows(costs: &[f64]) -> Vec<UsageRecord> {
        costs.iter().map(|c| UsageRecord::new("p1", *c)).collect()
    }

    #[test]
    fn only_positive_costs_accumulate() {
        assert_eq!(total_energy(&rows(&[10.0, -5.0, 0.0, 3.0])), 13.0);
    }

    #[test]
    fn empty_usage_is_zero() {
        assert_eq!(total_energy(&[]), 0.0);
    }

    #[test]
    fn all_credits_is_zero() {
        assert_eq!(total_energy(&rows(&[-1.0, -100.0])), 0.0);
    }

    #[test]
    fn fractional_costs_are_not_rounded_per_row() {
        let total = total_energy(&rows(&[0.4, 0.4, 0.4, 2.5]));
        assert!((total - 3.7).abs() < 1e-9, "total was {total}");
    }

    #[test]
    fn fractional_rows_from_the_wire_sum_exactly() {
        let records: Vec<UsageRecord> = serde_json::from_str(
            r#"[{"project_id":"p1","energy_cost":0.4},{"project_id":"p1","energy_cost":0.4},
                {"project_id":"p1","energy_cost":0.4},{"project_id":"p1","energy_cost":2.5}]"#,
        )
        .unwrap();
        assert!((total_energy(&records) - 3.7).abs() < 1e-9);
    }

    #[test]
    fn non_finite_costs_are_ignored() {
        assert_eq!(total_energy(&rows(&[f64::NAN, f64::INFINITY, 2.0])), 2.0);
    }

    #[tokio::test]
    async fn project_energy_sums_store_rows() {
        let store = MemoryStore::new();
        store.record_usage(UsageRecord::new("p1", 5)).await;
        store.record_usage(UsageRecord::new("p1", -2)).await;
        store.record_usage(UsageRecord::new("p2", 40)).await;

        let resolver = EntitlementResolver::new(Some(Arc::new(store)));
        assert_eq!(resolver.project_energy("p1").await.unwrap(), 5.0);
        assert_eq!(resolver.project_energy("unknown").await.unwrap(), 0.0);
    }

    #[tokio::test]
    async fn missing_store_is_not_zero() {
        let resolver = EntitlementResolver::new(None);
        assert!(!resolver.is_configured());
        assert!(matches!(
            resolver.project_energy("p1").await,
            Err(EntitlementError::NotConfigured)
        ));
        assert!(matches!(
            resolver.user_entitlement("u1").await,
            Err(EntitlementError::NotConfigured)
        ));
    }

    #[tokio::test]
    async fn failing_store_is_fetch_error() {
        let resolver = EntitlementResolver::new(Some(Arc::new(FailingStore)));
        assert!(matches!(
            resolver.project_energy("p1").await,
            Err(EntitlementError::Fetch(_))
        ));
        assert!(matches!(
            resolver.user_entitlement("u1").await,
            Err(EntitlementError::Fetch(_))
        ));
    }

    #[tokio::test]
    async fn user_without_subscription_is_free() {
        let resolver = EntitlementResolver::new(Some(Arc::new(MemoryStore::new())));
        let ent = resolver.user_entitlement("u1").await.unwrap();
        assert_eq!(ent.plan, PlanTier::Free);
        assert_eq!(ent.entitlement.daily_allowance, "30 energy/day");
        assert_eq!(ent.ends_at, None);
    }

    #[tokio::test]
    async fn user_subscription_resolves_plan() {
        let store = MemoryStore::new();
        let ends_at = DateTime::parse_from_rfc3339("2026-12-01T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        store
            .set_subscription(
                "u1",
                SubscriptionRecord {
                    plan: Some("premium".to_owned()),
                    ends_at: Some(ends_at),
                },
            )
            .await;
        store.set_subscription("u2", SubscriptionRecord::new("enterprise")).await;

        let resolver = EntitlementResolver::new(Some(Arc::new(store)));

        let u1 = resolver.user_entitlement("u1").await.unwrap();
        assert_eq!(u1.plan, PlanTier::Premium);
        assert_eq!(u1.daily_energy, None);
        assert_eq!(u1.ends_at, Some(ends_at));

        let u2 = resolver.user_entitlement("u2").await.unwrap();
        assert_eq!(u2.plan, PlanTier::Free);
    }
}
