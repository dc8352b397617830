//! Billing and usage store abstraction for `SubIt`.
//!
//! This crate defines the [`BillingStore`] trait, a read-only view over the
//! billing subsystem's subscription table and the metering table that records
//! one row per AI operation. It knows nothing about plans, prices or HTTP;
//! `subit-core` interprets the rows.
//!
//! Three implementations are provided:
//!
//! - [`SupabaseStore`]: production default, queries Supabase's PostgREST API (feature `supabase-backend`)
//! - [`PostgresStore`]: direct `PostgreSQL` access via sqlx (feature `postgres-backend`)
//! - [`MemoryStore`]: in-memory, for testing and local development

mod error;
mod memory;
mod models;
#[cfg(feature = "postgres-backend")]
mod postgres_backend;
#[cfg(feature = "supabase-backend")]
mod supabase_backend;

pub use error::StoreError;
pub use memory::MemoryStore;
pub use models::{SubscriptionRecord, UsageRecord};
#[cfg(feature = "postgres-backend")]
pub use postgres_backend::PostgresStore;
#[cfg(feature = "supabase-backend")]
pub use supabase_backend::SupabaseStore;

/// Table holding one row per metered operation.
pub const USAGE_TABLE: &str = "usage_tracking";

/// Table holding subscription rows synced from the payment provider.
pub const BILLING_TABLE: &str = "billing";

/// A read-only billing/usage store.
///
/// Implementations never write. Every call is a single round-trip to the
/// backing store with no retries; callers decide whether to try again.
///
/// Implementations must be safe to share across async tasks (`Send + Sync`).
#[async_trait::async_trait]
pub trait BillingStore: Send + Sync + 'static {
    /// Fetch the active subscription for a user.
    ///
    /// Returns `Ok(None)` when the user has no active subscription row.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Query`] or [`StoreError::Decode`] if the backend
    /// fails or returns rows that cannot be read.
    async fn get_subscription(
        &self,
        user_id: &str,
    ) -> Result<Option<SubscriptionRecord>, StoreError>;

    /// Fetch every usage record for a project.
    ///
    /// An unknown project yields an empty list, not an error.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Query`] or [`StoreError::Decode`] if the backend
    /// fails or returns rows that cannot be read.
    async fn get_usage_records(&self, project_id: &str) -> Result<Vec<UsageRecord>, StoreError>;

    /// Short backend name for logs.
    fn backend_name(&self) -> &'static str;
}
