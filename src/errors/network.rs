//! Ingestion fetch errors
//!
//! A failed fetch only ever skips the table it was meant to populate.

use thiserror::Error;

/// Errors raised while fetching remote GeoJSON files
#[derive(Error, Debug)]
pub enum NetworkError {
    /// Transport-level failure (DNS, TLS, connection reset)
    #[error("Request to {url} failed: {reason}")]
    Http { url: String, reason: String },

    /// The server answered with a non-success status
    #[error("Request to {url} returned status {status}")]
    Status { url: String, status: u16 },

    /// The body was not a GeoJSON feature collection
    #[error("Could not decode {url}: {reason}")]
    Decode { url: String, reason: String },
}

impl NetworkError {
    pub fn url(&self) -> &str {
        match self {
            NetworkError::Http { url, .. }
            | NetworkError::Status { url, .. }
            | NetworkError::Decode { url, .. } => url,
        }
    }
}
