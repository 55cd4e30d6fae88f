//! Variant error types.

use stowage_shared::TokenError;
use thiserror::Error;

use crate::storage::StorageError;

/// Errors raised while deriving or generating variants.
#[derive(Debug, Error)]
pub enum VariantError {
    /// A storage operation failed.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Encoding or decoding a transformation token failed.
    #[error(transparent)]
    Token(#[from] TokenError),

    /// The external image tool failed mid-pipeline. The whole pipeline is
    /// aborted; no partial result is uploaded.
    #[error("image transformation failed: {0}")]
    TransformFailure(String),

    /// Local scratch-file I/O failed.
    #[error("variant I/O failed: {0}")]
    Io(#[from] std::io::Error),
}
