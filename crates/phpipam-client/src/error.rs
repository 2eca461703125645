//! phpIPAM client errors

use thiserror::Error;

/// Errors that can occur when interacting with the phpIPAM API
#[derive(Debug, Error)]
pub enum PhpIpamError {
    /// HTTP request/response error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// phpIPAM API returned an error
    #[error("phpIPAM API error: {0}")]
    Api(String),

    /// JSON serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Authentication failed (bad credentials, expired token, app not configured)
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid request (e.g., missing required fields)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl PhpIpamError {
    /// Whether this error is phpIPAM reporting that the object does not exist
    pub fn is_not_found(&self) -> bool {
        matches!(self, PhpIpamError::NotFound(_))
    }
}
