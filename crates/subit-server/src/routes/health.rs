//! Liveness endpoint.

use std::sync::Arc;

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;

use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    /// `enforced` or `disabled`.
    pub auth: &'static str,
    /// Billing store backend, `null` when unconfigured.
    pub store: Option<&'static str>,
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/health", get(health))
}

/// `GET /api/health`
async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        auth: if state.gate.enforces_sessions() {
            "enforced"
        } else {
            "disabled"
        },
        store: state.resolver.backend_name(),
    })
}
