//! Error types for the analytics client and the report cache.

use thiserror::Error;

/// A failed attempt to fetch the latest analytics for a product.
///
/// Every variant is a transport-level failure from the poller's point of view:
/// the tick is retried after the normal interval and nothing is shown to the user.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Network or TLS failure from the underlying HTTP client.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The analytics API answered with a non-success status.
    #[error("analytics API returned {status}: {body}")]
    Status { status: u16, body: String },

    /// The body was not valid JSON for an analytics response.
    #[error("failed to decode analytics response: {source}")]
    Deserialize {
        #[source]
        source: serde_json::Error,
    },

    /// The body decoded but carried no `analytics` array.
    #[error("analytics response is missing the `analytics` array")]
    MissingAnalytics,
}

/// Failure reading or writing the local report cache.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("cache is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Rejected attempt to start a polling session.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("product id must not be empty")]
    EmptyProductId,
}
