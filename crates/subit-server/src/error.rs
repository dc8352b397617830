//! HTTP error types for the `SubIt` API.
//!
//! Every API failure renders as `{"success": false, "error": "<message>"}`.
//! Messages are generic; the underlying cause is logged, and
//! only outside production does the log line include the full detail.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use subit_core::error::EntitlementError;

use crate::config::Environment;

/// Application-level error returned from API handlers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// Client sent invalid input.
    BadRequest(&'static str),
    /// No session on an endpoint that needs one.
    Unauthorized,
    /// Store connection parameters were absent at startup.
    NotConfigured,
    /// The store failed the query.
    FetchFailed(&'static str),
}

/// JSON error response body.
#[derive(Serialize)]
struct ErrorBody {
    success: bool,
    error: &'static str,
}

impl ApiError {
    /// Map an entitlement failure and log it.
    ///
    /// `public_message` is what the caller sees when the query itself failed.
    #[must_use]
    pub fn entitlement(
        err: &EntitlementError,
        environment: Environment,
        public_message: &'static str,
    ) -> Self {
        match err {
            EntitlementError::NotConfigured => {
                tracing::error!("billing store not configured");
                Self::NotConfigured
            }
            EntitlementError::Fetch(source) => {
                if environment.is_production() {
                    tracing::error!(failure = public_message, "billing store query failed");
                } else {
                    tracing::error!(failure = public_message, error = %source, "billing store query failed");
                }
                Self::FetchFailed(public_message)
            }
        }
    }

    fn status_and_message(&self) -> (StatusCode, &'static str) {
        match self {
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, *msg),
            Self::Unauthorized => (StatusCode::UNAUTHORIZED, "Unauthorized"),
            Self::NotConfigured => (StatusCode::INTERNAL_SERVER_ERROR, "Server not configured"),
            Self::FetchFailed(msg) => (StatusCode::INTERNAL_SERVER_ERROR, *msg),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error) = self.status_and_message();
        let body = ErrorBody {
            success: false,
            error,
        };
        (status, axum::Json(body)).into_response()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use subit_store::StoreError;

    use super::*;

    async fn body_json(resp: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn not_configured_renders_generic_500() {
        let resp = ApiError::NotConfigured.into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            body_json(resp).await,
            serde_json::json!({"success": false, "error": "Server not configured"})
        );
    }

    #[tokio::test]
    async fn bad_request_carries_message() {
        let resp = ApiError::BadRequest("Invalid project ID").into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(resp).await["error"], "Invalid project ID");
    }

    #[test]
    fn entitlement_errors_map_to_api_errors() {
        let fetch = EntitlementError::Fetch(StoreError::Query {
            table: "usage_tracking",
            reason: "timeout".to_owned(),
        });
        assert_eq!(
            ApiError::entitlement(&fetch, Environment::Production, "Failed to fetch energy usage"),
            ApiError::FetchFailed("Failed to fetch energy usage")
        );
        assert_eq!(
            ApiError::entitlement(
                &EntitlementError::NotConfigured,
                Environment::Development,
                "Failed to fetch energy usage"
            ),
            ApiError::NotConfigured
        );
    }
}
