//! HTTP implementation of the remote feed, entry and settings collections.

mod client;

pub use client::{build_http_client, ApiClient, ApiOptions};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Request timed out after {0}s")]
    Timeout(u64),
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("HTTP error: status {0}")]
    HttpStatus(u16),
    /// The server answered with an `{"error": ...}` body.
    #[error("{0}")]
    Rejected(String),
    #[error("Response too large (exceeds {0} bytes)")]
    ResponseTooLarge(usize),
    #[error("Malformed response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
    #[error("Insecure API URL: HTTPS required (except localhost)")]
    InsecureBaseUrl,
    #[error("Settings URL is not configured")]
    NoSettingsUrl,
}

impl ApiError {
    /// True for failures where the request may not have reached the server.
    pub fn is_transport(&self) -> bool {
        matches!(self, ApiError::Timeout(_) | ApiError::Network(_))
    }
}
