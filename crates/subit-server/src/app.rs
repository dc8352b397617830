//! Router and collaborator assembly.
//!
//! `main` and the integration tests build the server the same way: resolve
//! the store and identity provider from [`ServerConfig`], wrap them in
//! [`AppState`], then hand the state to [`build_router`].

use std::sync::Arc;

use anyhow::Context;
use axum::http::{header, HeaderValue, Method};
use axum::middleware as axum_mw;
use axum::Router;
use subit_store::{BillingStore, MemoryStore};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::config::{AuthMode, StoreConfig};
use crate::identity::{ClerkProvider, IdentityProvider};
use crate::middleware::admission_middleware;
use crate::routes;
use crate::state::AppState;

/// Build the Axum router with all routes and middleware.
///
/// The admission gate wraps everything, the static-site fallback included,
/// so legacy-host redirects and session checks apply to every path.
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = cors_layer(&state.config.allowed_origins);
    let static_site = ServeDir::new(&state.config.static_dir);

    Router::new()
        .nest("/api", routes::api_router().layer(cors))
        .merge(routes::seo::router())
        .fallback_service(static_site)
        .layer(axum_mw::from_fn_with_state(
            Arc::clone(&state),
            admission_middleware,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(SetResponseHeaderLayer::overriding(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::REFERRER_POLICY,
            HeaderValue::from_static("strict-origin-when-cross-origin"),
        ))
        .with_state(state)
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origin_values(allowed_origins)))
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_credentials(true)
}

/// Configured origins as header values. `*` and values that are not valid
/// header values are skipped: credentialed CORS needs explicit origins.
fn origin_values(allowed_origins: &[String]) -> Vec<HeaderValue> {
    allowed_origins
        .iter()
        .filter_map(|origin| {
            if origin == "*" {
                warn!("ignoring wildcard CORS origin; list origins explicitly");
                return None;
            }
            match HeaderValue::from_str(origin) {
                Ok(value) => Some(value),
                Err(_) => {
                    warn!(origin = %origin, "ignoring unusable CORS origin");
                    None
                }
            }
        })
        .collect()
}

/// Open the configured billing store.
///
/// # Errors
///
/// Fails if the backend cannot be constructed, or if it was requested but
/// compiled out.
pub async fn build_store(config: &StoreConfig) -> anyhow::Result<Option<Arc<dyn BillingStore>>> {
    let store: Arc<dyn BillingStore> = match config {
        StoreConfig::Unconfigured => {
            warn!("no billing store configured; usage endpoints will report a configuration error");
            return Ok(None);
        }
        StoreConfig::Memory => {
            info!("using in-memory billing store (always empty)");
            Arc::new(MemoryStore::new())
        }
        #[cfg(feature = "supabase-backend")]
        StoreConfig::Supabase { url, service_key } => {
            info!(url = %url, "using Supabase billing store");
            Arc::new(
                subit_store::SupabaseStore::new(url, service_key)
                    .context("failed to configure Supabase store")?,
            )
        }
        #[cfg(not(feature = "supabase-backend"))]
        StoreConfig::Supabase { .. } => {
            anyhow::bail!("Supabase store requested but feature 'supabase-backend' is not enabled");
        }
        #[cfg(feature = "postgres-backend")]
        StoreConfig::Postgres { url } => {
            info!(url = %"[redacted]", "using PostgreSQL billing store");
            Arc::new(
                subit_store::PostgresStore::connect(url)
                    .await
                    .context("failed to connect to PostgreSQL store")?,
            )
        }
        #[cfg(not(feature = "postgres-backend"))]
        StoreConfig::Postgres { .. } => {
            anyhow::bail!("PostgreSQL store requested but feature 'postgres-backend' is not enabled");
        }
    };

    Ok(Some(store))
}

/// Build the identity provider for the resolved auth mode.
///
/// # Errors
///
/// Fails if Clerk is configured but its verification keys cannot be loaded.
/// Misconfigured credentials are not an error: they resolve to
/// [`AuthMode::Disabled`] before this point.
pub async fn build_identity(auth: &AuthMode) -> anyhow::Result<Option<Arc<dyn IdentityProvider>>> {
    match auth {
        AuthMode::Enforced(clerk) => {
            let provider = ClerkProvider::from_config(clerk)
                .await
                .context("failed to load Clerk verification keys")?;
            Ok(Some(Arc::new(provider)))
        }
        AuthMode::Disabled { .. } => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn origins(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| (*v).to_owned()).collect()
    }

    #[test]
    fn wildcard_origin_is_dropped() {
        let values = origin_values(&origins(&["*", "https://www.subitai.com"]));
        assert_eq!(values, vec![HeaderValue::from_static("https://www.subitai.com")]);
    }

    #[test]
    fn wildcard_only_leaves_no_origins() {
        assert!(origin_values(&origins(&["*"])).is_empty());
        let _layer = cors_layer(&origins(&["*"]));
    }

    #[test]
    fn invalid_header_values_are_dropped() {
        assert!(origin_values(&origins(&["https://bad\norigin"])).is_empty());
    }
}
