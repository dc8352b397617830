//! Shared application state for the `SubIt` edge server.
//!
//! A single [`AppState`] is built at startup and shared across middleware
//! and handlers via `Arc`. It is immutable after construction: the gate, the
//! identity provider and the resolver are all stateless per request.

use std::sync::Arc;

use subit_core::error::RouteError;
use subit_core::gate::{self, AdmissionGate};
use subit_core::routes::RouteTable;
use subit_core::usage::EntitlementResolver;
use subit_store::BillingStore;

use crate::config::ServerConfig;
use crate::identity::IdentityProvider;

/// Shared application state passed to all HTTP handlers.
pub struct AppState {
    pub config: ServerConfig,
    /// Admission decisions for every request.
    pub gate: AdmissionGate,
    /// Session verifier. `None` when authentication is disabled.
    pub identity: Option<Arc<dyn IdentityProvider>>,
    /// Plan and usage lookups.
    pub resolver: EntitlementResolver,
}

impl AppState {
    /// Assemble state from resolved configuration and collaborators.
    ///
    /// Sessions are enforced exactly when an identity provider is supplied.
    ///
    /// # Errors
    ///
    /// Returns [`RouteError`] if the canonical URL or an extra public-route
    /// pattern is invalid.
    pub fn new(
        config: ServerConfig,
        identity: Option<Arc<dyn IdentityProvider>>,
        store: Option<Arc<dyn BillingStore>>,
    ) -> Result<Self, RouteError> {
        let canonical =
            gate::resolve_canonical(config.site_url.as_deref(), config.environment.is_production())?;
        let public_routes = RouteTable::with_defaults(&config.extra_public_routes)?;
        let gate = AdmissionGate::new(&config.legacy_host, canonical, public_routes, identity.is_some());

        Ok(Self {
            config,
            gate,
            identity,
            resolver: EntitlementResolver::new(store),
        })
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState").finish_non_exhaustive()
    }
}
