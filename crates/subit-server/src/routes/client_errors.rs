//! Browser error reports.
//!
//! The web app posts uncaught errors here so they land in server logs. The
//! endpoint never fails from the client's point of view: malformed, empty or
//! oversized bodies are logged and still answered with `204 No Content`.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::rejection::BytesRejection;
use axum::extract::DefaultBodyLimit;
use axum::http::StatusCode;
use axum::routing::post;
use axum::Router;
use serde::Deserialize;

use crate::state::AppState;

/// Largest report that is read; bigger ones are dropped unread.
const MAX_REPORT_BYTES: usize = 64 * 1024;

/// Longest string field kept in a log line.
const MAX_FIELD_CHARS: usize = 4_096;

/// Error report sent by the browser. Every field is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientErrorReport {
    pub name: Option<String>,
    pub message: Option<String>,
    pub stack: Option<String>,
    pub context: Option<serde_json::Value>,
    pub url: Option<String>,
    pub user_agent: Option<String>,
    pub timestamp: Option<String>,
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route(
        "/log-client-error",
        post(log_client_error).layer(DefaultBodyLimit::max(MAX_REPORT_BYTES)),
    )
}

/// `POST /api/log-client-error`
async fn log_client_error(body: Result<Bytes, BytesRejection>) -> StatusCode {
    let body = match body {
        Ok(body) => body,
        Err(rejection) => {
            tracing::warn!(
                target: "client_error",
                status = %rejection.status(),
                reason = %rejection.body_text(),
                "client error report dropped"
            );
            return StatusCode::NO_CONTENT;
        }
    };

    if body.is_empty() {
        tracing::warn!(target: "client_error", "client error reported with empty body");
        return StatusCode::NO_CONTENT;
    }

    match serde_json::from_slice::<ClientErrorReport>(&body) {
        Ok(report) => {
            let context = report.context.as_ref().map(ToString::to_string);
            tracing::warn!(
                target: "client_error",
                name = report.name.as_deref().map(clip),
                message = report.message.as_deref().map(clip),
                stack = report.stack.as_deref().map(clip),
                context = context.as_deref().map(clip),
                url = report.url.as_deref().map(clip),
                user_agent = report.user_agent.as_deref().map(clip),
                timestamp = report.timestamp.as_deref(),
                "client error reported"
            );
        }
        Err(e) => {
            tracing::warn!(target: "client_error", error = %e, "unreadable client error report");
        }
    }

    StatusCode::NO_CONTENT
}

/// Truncate to [`MAX_FIELD_CHARS`] characters on a char boundary.
fn clip(s: &str) -> &str {
    match s.char_indices().nth(MAX_FIELD_CHARS) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
