//! Error types for store clients

use thiserror::Error;

/// Store client error
#[derive(Debug, Error)]
pub enum StoreError {
    /// A path segment cannot be used as a store key
    #[error("Invalid path segment {segment:?}: {reason}")]
    InvalidPath {
        segment: String,
        reason: &'static str,
    },

    /// Security rules rejected the read or write
    #[error("Permission denied at {0}")]
    PermissionDenied(String),

    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Server returned an error
    #[error("Server error {status}: {message}")]
    Server { status: u16, message: String },

    /// Invalid response from server
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl StoreError {
    /// Whether the store refused the operation on access grounds
    pub fn is_permission_denied(&self) -> bool {
        matches!(self, StoreError::PermissionDenied(_))
    }
}

/// Result type for store operations
pub type Result<T> = std::result::Result<T, StoreError>;
