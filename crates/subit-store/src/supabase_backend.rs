//! Supabase (PostgREST) billing store.
//!
//! Reads rows through the project's REST endpoint at `<url>/rest/v1/<table>`
//! using the service-role key, which bypasses row-level security. The key is
//! sent both as `apikey` and as a bearer token, as PostgREST expects.
//!
//! Feature-gated behind `supabase-backend`.

use reqwest::Client;
use serde::de::DeserializeOwned;

use crate::{BILLING_TABLE, BillingStore, StoreError, SubscriptionRecord, USAGE_TABLE, UsageRecord};

/// A billing store backed by Supabase's REST API.
#[derive(Clone)]
pub struct SupabaseStore {
    client: Client,
    rest_url: String,
    service_key: String,
}

impl std::fmt::Debug for SupabaseStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SupabaseStore")
            .field("rest_url", &self.rest_url)
            .field("service_key", &"[redacted]")
            .finish_non_exhaustive()
    }
}

impl SupabaseStore {
    /// Create a store for the Supabase project at `url`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Config`] if either parameter is blank or the
    /// HTTP client cannot be built.
    pub fn new(url: &str, service_key: &str) -> Result<Self, StoreError> {
        let url = url.trim().trim_end_matches('/');
        if url.is_empty() {
            return Err(StoreError::Config {
                reason: "Supabase URL is empty".to_owned(),
            });
        }
        if service_key.trim().is_empty() {
            return Err(StoreError::Config {
                reason: "Supabase service role key is empty".to_owned(),
            });
        }

        let client = Client::builder().build().map_err(|e| StoreError::Config {
            reason: format!("failed to build HTTP client: {e}"),
        })?;

        Ok(Self {
            client,
            rest_url: format!("{url}/rest/v1"),
            service_key: service_key.trim().to_owned(),
        })
    }

    fn usage_url(&self, project_id: &str) -> String {
        format!(
            "{}/{USAGE_TABLE}?select=project_id,energy_cost&project_id=eq.{}",
            self.rest_url,
            urlencoding::encode(project_id)
        )
    }

    fn subscription_url(&self, user_id: &str) -> String {
        format!(
            "{}/{BILLING_TABLE}?select=plan,ends_at:current_period_end&user_id=eq.{}&status=eq.active&order=current_period_end.desc.nullslast&limit=1",
            self.rest_url,
            urlencoding::encode(user_id)
        )
    }

    async fn fetch_rows<T: DeserializeOwned>(
        &self,
        table: &'static str,
        url: &str,
    ) -> Result<Vec<T>, StoreError> {
        let resp = self
            .client
            .get(url)
            .header("apikey", &self.service_key)
            .bearer_auth(&self.service_key)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| StoreError::Query {
                table,
                reason: e.to_string(),
            })?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(StoreError::Query {
                table,
                reason: format!("HTTP {status}: {body}"),
            });
        }

        resp.json::<Vec<T>>().await.map_err(|e| StoreError::Decode {
            table,
            reason: e.to_string(),
        })
    }
}

#[async_trait::async_trait]
impl BillingStore for SupabaseStore {
    async fn get_subscription(
        &self,
        user_id: &str,
    ) -> Result<Option<SubscriptionRecord>, StoreError> {
        let url = self.subscription_url(user_id);
        let rows: Vec<SubscriptionRecord> = self.fetch_rows(BILLING_TABLE, &url).await?;
        Ok(rows.into_iter().next())
    }

    async fn get_usage_records(&self, project_id: &str) -> Result<Vec<UsageRecord>, StoreError> {
        let url = self.usage_url(project_id);
        let rows: Vec<UsageRecord> = self.fetch_rows(USAGE_TABLE, &url).await?;
        tracing::debug!(project_id, rows = rows.len(), "fetched usage rows");
        Ok(rows)
    }

    fn backend_name(&self) -> &'static str {
        "supabase"
    }
}
