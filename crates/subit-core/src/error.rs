//! Error types for `subit-core`.
//!
//! Store failures keep their source so the server can log the cause while
//! showing callers only a generic message.

use subit_store::StoreError;

/// Errors from building the admission gate's configuration.
#[derive(Debug, thiserror::Error)]
pub enum RouteError {
    /// A route pattern could not be compiled.
    #[error("invalid route pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    /// The canonical site URL is not an absolute http(s) URL.
    #[error("invalid canonical site URL '{url}': {reason}")]
    InvalidCanonicalUrl { url: String, reason: String },
}

/// Errors from the entitlement resolver.
#[derive(Debug, thiserror::Error)]
pub enum EntitlementError {
    /// No store is configured: the connection parameters were absent at startup.
    #[error("billing store is not configured")]
    NotConfigured,

    /// The store rejected or failed the query.
    #[error("billing store query failed: {0}")]
    Fetch(#[from] StoreError),
}
