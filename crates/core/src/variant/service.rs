//! Variant key derivation and on-demand generation.

use std::path::{Path, PathBuf};

use bytes::Bytes;
use sha2::{Digest, Sha256};
use tracing::debug;

use stowage_shared::Verifier;

use super::error::VariantError;
use super::types::{Blob, VariantDescriptor, VariantRecord};
use super::variation::{self, Transformation};
use crate::storage::BlobService;

/// Content types served as-is. Anything else is normalized to PNG after
/// transformation so browsers can always render the variant.
pub const WEB_IMAGE_CONTENT_TYPES: [&str; 4] =
    ["image/png", "image/jpeg", "image/jpg", "image/gif"];

/// Derives the storage key for a blob and pipeline:
/// `variants/{blob.key}/{sha256(encoded pipeline)}`.
///
/// Deterministic for identical inputs; distinct pipelines (including
/// reorderings) derive distinct keys with overwhelming probability.
///
/// # Errors
///
/// Returns an error if the pipeline cannot be encoded.
pub fn key(
    verifier: &Verifier,
    blob: &Blob,
    transformations: &[Transformation],
) -> Result<String, VariantError> {
    let encoded = variation::encode(verifier, transformations)?;
    Ok(format!("variants/{}/{}", blob.key, sha256_hex(&encoded)))
}

/// Derives the storage key from a record bundling blob fields and
/// transformations.
///
/// # Errors
///
/// Returns an error if the pipeline cannot be encoded.
pub fn key_from_variant(verifier: &Verifier, record: &VariantRecord) -> Result<String, VariantError> {
    key(verifier, &record.blob(), &record.transformations)
}

/// Returns the variant for `blob` and `transformations`, generating and
/// uploading it first if it does not exist yet.
///
/// The check-then-generate sequence is unsynchronized: two concurrent
/// callers may both generate. That is wasteful but safe, since generation
/// is deterministic and upload idempotently overwrites with equivalent
/// bytes.
///
/// # Errors
///
/// Returns an error if storage access, transformation, or the final upload
/// fails.
pub async fn processed<S: BlobService>(
    service: &S,
    blob: &Blob,
    transformations: Vec<Transformation>,
) -> Result<VariantDescriptor, VariantError> {
    let variant_key = key(service.verifier(), blob, &transformations)?;

    if service.exists(&variant_key).await? {
        debug!(key = %variant_key, "variant already processed");
        return Ok(VariantDescriptor {
            blob: blob.clone(),
            transformations,
            key: variant_key,
        });
    }

    debug!(key = %variant_key, "generating variant");
    let scratch = tempfile::tempdir()?;
    let working = scratch.path().join(working_filename(&blob.filename));

    service.stream_download(&blob.key, &working).await?;
    let image = variation::transform(&transformations, &working).await?;
    let final_path = normalize_format(&image.path, &blob.content_type).await?;

    let data = tokio::fs::read(&final_path).await?;
    service.upload(Bytes::from(data), &variant_key).await?;

    Ok(VariantDescriptor {
        blob: blob.clone(),
        transformations,
        key: variant_key,
    })
}

/// Names the scratch working file, keeping the source extension so the
/// image tool can detect the input format.
fn working_filename(blob_filename: &str) -> String {
    Path::new(blob_filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .map_or_else(|| "source".to_string(), |ext| format!("source.{ext}"))
}

/// Re-encodes the transformed image as PNG unless the blob's declared
/// content type is already web-safe.
async fn normalize_format(path: &Path, content_type: &str) -> Result<PathBuf, VariantError> {
    if WEB_IMAGE_CONTENT_TYPES.contains(&content_type) {
        return Ok(path.to_path_buf());
    }

    let png_path = path.with_extension("png");
    variation::convert_to(path, &png_path).await?;
    Ok(png_path)
}

fn sha256_hex(content: &str) -> String {
    hex::encode(Sha256::digest(content.as_bytes()))
}
