//! Admission middleware.
//!
//! Runs in front of every route, including the static-site fallback. The
//! decision comes from [`AdmissionGate`](subit_core::gate::AdmissionGate);
//! this layer only translates it into HTTP:
//!
//! - `Redirect` → `308 Permanent Redirect` to the canonical host.
//! - `Authenticate` → the identity provider's verdict: the request proceeds
//!   with a [`Session`](crate::identity::Session) extension, or gets the
//!   provider's sign-in challenge.
//! - `Allow` → the request proceeds. If it carries a token anyway, a valid
//!   session is still attached so public API routes can tell who is calling.

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::header;
use axum::middleware::Next;
use axum::response::{IntoResponse, Redirect, Response};
use subit_core::gate::Admission;

use crate::identity::{AuthError, session_token};
use crate::state::AppState;

/// Middleware that applies the admission gate to every request.
pub async fn admission_middleware(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Response {
    let path_and_query = req
        .uri()
        .path_and_query()
        .map_or_else(|| req.uri().path().to_owned(), ToString::to_string);

    // A host header that is not valid UTF-8 is treated as absent.
    let host = req
        .headers()
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned)
        .or_else(|| req.uri().host().map(str::to_owned));

    match state.gate.admit(host.as_deref(), &path_and_query) {
        Admission::Redirect { location } => {
            tracing::debug!(host = ?host, location = %location, "redirecting legacy host");
            Redirect::permanent(&location).into_response()
        }
        Admission::Allow => {
            if let Some(provider) = &state.identity {
                if session_token(req.headers()).is_some() {
                    if let Ok(session) = provider.protect(req.headers()).await {
                        req.extensions_mut().insert(session);
                    }
                }
            }
            next.run(req).await
        }
        Admission::Authenticate => {
            let Some(provider) = &state.identity else {
                // The gate only asks for a session when a provider exists.
                return next.run(req).await;
            };

            match provider.protect(req.headers()).await {
                Ok(session) => {
                    req.extensions_mut().insert(session);
                    next.run(req).await
                }
                Err(AuthError::Keys(reason)) => {
                    tracing::error!(reason = %reason, path = %path_and_query, "session verification unavailable");
                    provider.challenge(&path_and_query)
                }
                Err(err) => {
                    tracing::debug!(error = %err, path = %path_and_query, "session required");
                    provider.challenge(&path_and_query)
                }
            }
        }
    }
}
