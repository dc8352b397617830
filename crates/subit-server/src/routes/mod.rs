//! HTTP route handlers.
//!
//! Everything under `/api` is a public route as far as the admission gate is
//! concerned; handlers that need an identity check for the
//! [`Session`](crate::identity::Session) extension themselves.

pub mod client_errors;
pub mod energy;
pub mod health;
pub mod plans;
pub mod seo;

use std::sync::Arc;

use axum::Router;

use crate::state::AppState;

/// Build the `/api` router.
pub fn api_router() -> Router<Arc<AppState>> {
    Router::new()
        .merge(energy::router())
        .merge(plans::router())
        .merge(client_errors::router())
        .merge(health::router())
}
