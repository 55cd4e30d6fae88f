//! Storage error types.

use stowage_shared::TokenError;
use thiserror::Error;

/// Storage operation errors.
///
/// Backend failures are normalized to a small set of kinds with the
/// underlying message preserved for diagnostics.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Key absent in the backend.
    #[error("key not found: {key}")]
    NotFound {
        /// Storage key that was not found.
        key: String,
    },

    /// The backend refused access.
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// Backend-level I/O failure.
    #[error("storage operation failed: {0}")]
    Io(String),

    /// Backend configuration error.
    #[error("storage configuration error: {0}")]
    Configuration(String),

    /// Capability token signing failed while building a URL.
    #[error(transparent)]
    Token(#[from] TokenError),
}

impl StorageError {
    /// Create a not found error.
    #[must_use]
    pub fn not_found(key: impl Into<String>) -> Self {
        Self::NotFound { key: key.into() }
    }

    /// Create an I/O error.
    #[must_use]
    pub fn io(msg: impl Into<String>) -> Self {
        Self::Io(msg.into())
    }

    /// Create a configuration error.
    #[must_use]
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Normalize an OpenDAL error for an operation on `key`.
    #[must_use]
    pub fn from_opendal(key: &str, err: &opendal::Error) -> Self {
        match err.kind() {
            opendal::ErrorKind::NotFound => Self::not_found(key),
            opendal::ErrorKind::PermissionDenied => Self::PermissionDenied(err.to_string()),
            _ => Self::Io(err.to_string()),
        }
    }
}

impl From<std::io::Error> for StorageError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied(err.to_string()),
            _ => Self::Io(err.to_string()),
        }
    }
}
