//! `PostgreSQL` billing store.
//!
//! Queries the same `usage_tracking` and `billing` tables Supabase exposes,
//! but over a direct connection. Identifier columns are compared as text so
//! the store works whether they are `uuid` or `text` in the schema.
//!
//! Feature-gated behind `postgres-backend`.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

use crate::{BILLING_TABLE, BillingStore, StoreError, SubscriptionRecord, USAGE_TABLE, UsageRecord};

/// A billing store backed by a `PostgreSQL` pool.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl std::fmt::Debug for PostgresStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PostgresStore")
            .field("pool", &"[PgPool]")
            .finish_non_exhaustive()
    }
}

impl PostgresStore {
    /// Connect a small pool. No migrations are run; the tables belong to the
    /// billing subsystem.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Connect`] if the connection fails.
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await
            .map_err(|e| StoreError::Connect {
                reason: e.to_string(),
            })?;

        Ok(Self { pool })
    }

    /// Wrap an existing pool.
    #[must_use]
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl BillingStore for PostgresStore {
    async fn get_subscription(
        &self,
        user_id: &str,
    ) -> Result<Option<SubscriptionRecord>, StoreError> {
        let row: Option<(Option<String>, Option<DateTime<Utc>>)> = sqlx::query_as(
            r"SELECT plan, current_period_end
              FROM billing
              WHERE user_id::text = $1 AND status = 'active'
              ORDER BY current_period_end DESC NULLS LAST
              LIMIT 1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StoreError::Query {
            table: BILLING_TABLE,
            reason: e.to_string(),
        })?;

        Ok(row.map(|(plan, ends_at)| SubscriptionRecord { plan, ends_at }))
    }

    async fn get_usage_records(&self, project_id: &str) -> Result<Vec<UsageRecord>, StoreError> {
        let rows: Vec<(String, Option<f64>)> = sqlx::query_as(
            r"SELECT project_id::text, energy_cost::FLOAT8
              FROM usage_tracking
              WHERE project_id::text = $1",
        )
        .bind(project_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StoreError::Query {
            table: USAGE_TABLE,
            reason: e.to_string(),
        })?;

        Ok(rows
            .into_iter()
            .map(|(project_id, cost)| UsageRecord {
                project_id,
                energy_cost: cost.unwrap_or(0.0),
            })
            .collect())
    }

    fn backend_name(&self) -> &'static str {
        "postgres"
    }
}
