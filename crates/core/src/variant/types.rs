//! Caller-facing variant types.

use serde::{Deserialize, Serialize};

use super::variation::Transformation;

/// Caller-owned identity of one stored binary object.
///
/// The key is assigned by the caller, is unique per distinct binary
/// content, and is never persisted here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Blob {
    /// Opaque storage key.
    pub key: String,
    /// Original filename, used for extension hints and dispositions.
    pub filename: String,
    /// MIME type of the content.
    pub content_type: String,
}

impl Blob {
    /// Creates a blob record.
    #[must_use]
    pub fn new(
        key: impl Into<String>,
        filename: impl Into<String>,
        content_type: impl Into<String>,
    ) -> Self {
        Self {
            key: key.into(),
            filename: filename.into(),
            content_type: content_type.into(),
        }
    }
}

/// A record that already bundles blob fields with a transformation
/// pipeline, as a caller's database row typically would.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantRecord {
    /// The root blob's key.
    pub key: String,
    /// The root blob's filename.
    pub filename: String,
    /// The root blob's MIME type.
    pub content_type: String,
    /// Ordered transformation pipeline.
    pub transformations: Vec<Transformation>,
}

impl VariantRecord {
    /// The blob fields of this record.
    #[must_use]
    pub fn blob(&self) -> Blob {
        Blob::new(&self.key, &self.filename, &self.content_type)
    }
}

/// A resolved variant: the root blob, its pipeline, and the derived key
/// the generated image lives under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariantDescriptor {
    /// The root blob.
    pub blob: Blob,
    /// Ordered transformation pipeline.
    pub transformations: Vec<Transformation>,
    /// Derived storage key (`variants/{blob.key}/{sha256(pipeline)}`).
    pub key: String,
}
