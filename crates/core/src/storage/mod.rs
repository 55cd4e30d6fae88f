//! Pluggable blob-storage backends built on Apache OpenDAL.
//!
//! Every backend implements the same [`BlobService`] contract: byte-level
//! download/upload, streaming download to a local path, idempotent delete,
//! existence checks, and signed capability URL generation. The active
//! backend is selected from configuration at construction time and holds an
//! immutable snapshot of it; nothing here re-reads process state per call.

mod disk;
mod error;
mod s3;

pub use disk::DiskService;
pub use error::StorageError;
pub use s3::ObjectStoreService;

use std::future::Future;
use std::path::{Path, PathBuf};

use bytes::Bytes;
use opendal::Operator;
use tokio::io::AsyncWriteExt;
use url::Url;

use stowage_shared::config::ServiceKind;
use stowage_shared::{CapabilityClaims, StowageConfig, Verifier};

use crate::sanitize::{SanitizeOptions, content_disposition_with, sanitize};

/// Chunk size for streaming downloads.
const STREAM_CHUNK_SIZE: u64 = 4 * 1024 * 1024;

/// Options for building a signed capability URL.
#[derive(Debug, Clone)]
pub struct UrlOptions {
    /// Disposition type, `inline` or `attachment`. Anything else is treated
    /// as `inline`.
    pub disposition: String,
    /// Filename presented to the client.
    pub filename: String,
    /// MIME type signed into the token.
    pub content_type: String,
    /// Token lifetime in seconds. `None` falls back to the service's
    /// configured default; with no default either, the URL never expires.
    pub token_duration: Option<u64>,
}

impl UrlOptions {
    /// Creates options with an `inline` disposition and no expiry.
    #[must_use]
    pub fn new(filename: impl Into<String>, content_type: impl Into<String>) -> Self {
        Self {
            disposition: "inline".to_string(),
            filename: filename.into(),
            content_type: content_type.into(),
            token_duration: None,
        }
    }

    /// Sets the disposition type.
    #[must_use]
    pub fn with_disposition(mut self, disposition: impl Into<String>) -> Self {
        self.disposition = disposition.into();
        self
    }

    /// Sets the token lifetime in seconds.
    #[must_use]
    pub fn with_token_duration(mut self, secs: u64) -> Self {
        self.token_duration = Some(secs);
        self
    }
}

/// The storage backend contract.
///
/// All backends behave identically: `delete` succeeds on absent keys,
/// `exists` reports a missing key as `false`, and `upload` overwrites.
pub trait BlobService: Send + Sync {
    /// Returns the full content stored under `key`.
    fn download(&self, key: &str) -> impl Future<Output = Result<Bytes, StorageError>> + Send;

    /// Copies the content stored under `key` to a local path without
    /// buffering the whole object, creating intermediate directories.
    fn stream_download(
        &self,
        key: &str,
        dest: &Path,
    ) -> impl Future<Output = Result<PathBuf, StorageError>> + Send;

    /// Stores `data` under `key`, overwriting any previous content.
    fn upload(
        &self,
        data: Bytes,
        key: &str,
    ) -> impl Future<Output = Result<(), StorageError>> + Send;

    /// Removes the content stored under `key`. Succeeds if absent.
    fn delete(&self, key: &str) -> impl Future<Output = Result<(), StorageError>> + Send;

    /// Reports whether `key` holds content. A missing key is `Ok(false)`,
    /// never an error.
    fn exists(&self, key: &str) -> impl Future<Output = Result<bool, StorageError>> + Send;

    /// Builds a signed capability URL granting access to `key`.
    fn url(&self, key: &str, opts: &UrlOptions) -> Result<String, StorageError>;

    /// The signing context shared with the variant pipeline and the
    /// caller's HTTP layer.
    fn verifier(&self) -> &Verifier;
}

/// The configured storage backend.
///
/// Dispatches the [`BlobService`] contract to whichever backend the
/// process configuration selected.
#[derive(Debug)]
pub enum Service {
    /// Local filesystem backend.
    Disk(DiskService),
    /// S3-compatible object store backend.
    S3(ObjectStoreService),
}

impl Service {
    /// Builds the backend named by `config.service`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be initialized from the
    /// configuration.
    pub fn from_config(config: &StowageConfig) -> Result<Self, StorageError> {
        match config.service {
            ServiceKind::Disk => DiskService::from_config(config).map(Self::Disk),
            ServiceKind::S3 => ObjectStoreService::from_config(config).map(Self::S3),
        }
    }
}

impl BlobService for Service {
    async fn download(&self, key: &str) -> Result<Bytes, StorageError> {
        match self {
            Self::Disk(s) => s.download(key).await,
            Self::S3(s) => s.download(key).await,
        }
    }

    async fn stream_download(&self, key: &str, dest: &Path) -> Result<PathBuf, StorageError> {
        match self {
            Self::Disk(s) => s.stream_download(key, dest).await,
            Self::S3(s) => s.stream_download(key, dest).await,
        }
    }

    async fn upload(&self, data: Bytes, key: &str) -> Result<(), StorageError> {
        match self {
            Self::Disk(s) => s.upload(data, key).await,
            Self::S3(s) => s.upload(data, key).await,
        }
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        match self {
            Self::Disk(s) => s.delete(key).await,
            Self::S3(s) => s.delete(key).await,
        }
    }

    async fn exists(&self, key: &str) -> Result<bool, StorageError> {
        match self {
            Self::Disk(s) => s.exists(key).await,
            Self::S3(s) => s.exists(key).await,
        }
    }

    fn url(&self, key: &str, opts: &UrlOptions) -> Result<String, StorageError> {
        match self {
            Self::Disk(s) => s.url(key, opts),
            Self::S3(s) => s.url(key, opts),
        }
    }

    fn verifier(&self) -> &Verifier {
        match self {
            Self::Disk(s) => s.verifier(),
            Self::S3(s) => s.verifier(),
        }
    }
}

/// Builds the capability URL shared by all backends:
/// `{asset_host}/storage/{route}/{token}/{filename}?content_type=…&disposition=…`.
///
/// The query parameters are informational; on verification the token is the
/// sole source of truth for key, disposition, and content type.
fn capability_url(
    verifier: &Verifier,
    asset_host: &str,
    route: &str,
    key: &str,
    opts: &UrlOptions,
    token_duration: Option<u64>,
) -> Result<String, StorageError> {
    let sanitize_opts = SanitizeOptions::default();
    let disposition = content_disposition_with(&opts.disposition, &opts.filename, &sanitize_opts);

    let claims = CapabilityClaims {
        key: key.to_string(),
        disposition: disposition.clone(),
        content_type: opts.content_type.clone(),
        exp: token_duration.map(Verifier::expiry_in),
    };
    let token = verifier.sign(&claims)?;

    let filename = sanitize(&opts.filename, &sanitize_opts);
    let mut url = Url::parse(asset_host)
        .map_err(|e| StorageError::configuration(format!("invalid asset host: {e}")))?;
    url.set_path(&format!("storage/{route}/{token}/{filename}"));
    url.query_pairs_mut()
        .append_pair("content_type", &opts.content_type)
        .append_pair("disposition", &disposition);
    Ok(url.to_string())
}

/// Streams an object to `dest` in fixed-size chunks.
async fn copy_object_to_path(
    op: &Operator,
    object_path: &str,
    key: &str,
    dest: &Path,
) -> Result<PathBuf, StorageError> {
    if let Some(parent) = dest.parent()
        && !parent.as_os_str().is_empty()
    {
        tokio::fs::create_dir_all(parent).await?;
    }

    let meta = op
        .stat(object_path)
        .await
        .map_err(|e| StorageError::from_opendal(key, &e))?;
    let len = meta.content_length();

    let mut file = tokio::fs::File::create(dest).await?;
    let mut offset = 0u64;
    while offset < len {
        let end = (offset + STREAM_CHUNK_SIZE).min(len);
        let chunk = op
            .read_with(object_path)
            .range(offset..end)
            .await
            .map_err(|e| StorageError::from_opendal(key, &e))?;
        file.write_all(&chunk.to_bytes()).await?;
        offset = end;
    }
    file.flush().await?;

    Ok(dest.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use stowage_shared::config::{DiskConfig, S3Config};

    fn test_config(kind: ServiceKind) -> StowageConfig {
        StowageConfig {
            service: kind,
            secret: "test-secret-key-for-testing".to_string(),
            asset_host: "http://localhost.test".to_string(),
            link_duration_secs: None,
            disk: DiskConfig {
                root_path: std::env::temp_dir(),
            },
            s3: S3Config {
                endpoint: "http://localhost:4566".to_string(),
                bucket: "assets".to_string(),
                region: "us-west-2".to_string(),
                access_key_id: "test".to_string(),
                secret_access_key: "test".to_string(),
            },
        }
    }

    #[test]
    fn test_from_config_selects_disk() {
        let service = Service::from_config(&test_config(ServiceKind::Disk)).unwrap();
        assert!(matches!(service, Service::Disk(_)));
    }

    #[test]
    fn test_from_config_selects_s3() {
        let service = Service::from_config(&test_config(ServiceKind::S3)).unwrap();
        assert!(matches!(service, Service::S3(_)));
    }

    #[test]
    fn test_url_options_defaults() {
        let opts = UrlOptions::new("t.png", "image/png");
        assert_eq!(opts.disposition, "inline");
        assert_eq!(opts.token_duration, None);
    }

    #[tokio::test]
    async fn test_service_dispatches_to_the_disk_backend() {
        let root = tempfile::tempdir().unwrap();
        let mut config = test_config(ServiceKind::Disk);
        config.disk.root_path = root.path().to_path_buf();
        let service = Service::from_config(&config).unwrap();
        let content = Bytes::from_static(b"dispatched");

        service.upload(content.clone(), "abcd").await.unwrap();
        assert!(service.exists("abcd").await.unwrap());
        assert_eq!(service.download("abcd").await.unwrap(), content);

        let url = service
            .url("abcd", &UrlOptions::new("t.png", "image/png"))
            .unwrap();
        assert!(url.contains("/storage/disk/"));

        service.delete("abcd").await.unwrap();
        assert!(!service.exists("abcd").await.unwrap());
    }

    #[test]
    fn test_capability_url_shape() {
        let verifier = Verifier::new("test-secret-key-for-testing");
        let opts = UrlOptions::new("t.png", "image/png");
        let url =
            capability_url(&verifier, "http://localhost.test", "disk", "abcd", &opts, None).unwrap();

        assert!(url.starts_with("http://localhost.test/storage/disk/"));
        assert!(url.contains("/t.png?"));
        assert!(url.contains("content_type=image%2Fpng"));
        assert!(url.contains("disposition=inline"));
    }

    #[test]
    fn test_capability_url_token_is_authoritative() {
        let verifier = Verifier::new("test-secret-key-for-testing");
        let opts = UrlOptions::new("t.png", "image/png");
        let url =
            capability_url(&verifier, "http://localhost.test", "disk", "abcd", &opts, None).unwrap();

        let token = url
            .strip_prefix("http://localhost.test/storage/disk/")
            .and_then(|rest| rest.split('/').next())
            .unwrap();
        let claims: CapabilityClaims = verifier.verify(token).unwrap();

        assert_eq!(claims.key, "abcd");
        assert_eq!(claims.disposition, "inline; filename=\"t.png\"");
        assert_eq!(claims.content_type, "image/png");
        assert_eq!(claims.exp, None);
    }

    #[test]
    fn test_capability_url_with_duration_sets_expiry() {
        let verifier = Verifier::new("test-secret-key-for-testing");
        let opts = UrlOptions::new("t.png", "image/png").with_token_duration(600);
        let url = capability_url(
            &verifier,
            "http://localhost.test",
            "s3",
            "abcd",
            &opts,
            opts.token_duration,
        )
        .unwrap();

        let token = url
            .strip_prefix("http://localhost.test/storage/s3/")
            .and_then(|rest| rest.split('/').next())
            .unwrap();
        let claims: CapabilityClaims = verifier.verify(token).unwrap();
        assert!(claims.exp.is_some());
    }
}
