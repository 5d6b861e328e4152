//! Error taxonomy for the sync run.
//!
//! Transient transport failures are retried by [`crate::retry::RetryPolicy`]
//! before they surface here. Configuration and schema errors are fatal at
//! startup; malformed source records never become errors at all, the
//! reconciler logs and skips them.

#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// Transport-level failure (connect, timeout, body read).
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The remote service answered with a non-success status.
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// A response body that did not match the expected shape.
    #[error("Unexpected response payload: {0}")]
    Json(#[from] serde_json::Error),

    /// Missing or unusable environment configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The Notion root URL does not contain a recognizable page id.
    #[error("Could not extract a page id from Notion URL: {0}")]
    InvalidRootUrl(String),

    /// A managed database was not found under the root page.
    #[error("Database '{0}' not found under the configured root page")]
    MissingDatabase(String),
}

pub type Result<T> = std::result::Result<T, SyncError>;
