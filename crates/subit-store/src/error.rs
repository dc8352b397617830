//! Store error types.
//!
//! Every variant names the table or setting involved so a log line is enough
//! to diagnose the failure. Credentials never appear in messages.

/// Errors that can occur while talking to the billing/usage store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The store was constructed with unusable connection parameters.
    #[error("invalid store configuration: {reason}")]
    Config { reason: String },

    /// Failed to establish a connection to the backing database.
    #[error("failed to connect to store: {reason}")]
    Connect { reason: String },

    /// The backend rejected or failed the query.
    #[error("query on '{table}' failed: {reason}")]
    Query { table: &'static str, reason: String },

    /// The backend answered, but the rows could not be decoded.
    #[error("failed to decode rows from '{table}': {reason}")]
    Decode { table: &'static str, reason: String },
}
