//! Local filesystem backend.
//!
//! Wraps a directory on disk behind the [`BlobService`] contract. Keys are
//! fanned out across two levels of two-character directories so one
//! directory never has to hold the whole key space:
//! `{root}/{key[0..2]}/{key[2..4]}/{key}`.

use std::path::{Path, PathBuf};

use bytes::Bytes;
use opendal::{Operator, services};
use tracing::debug;

use stowage_shared::{StowageConfig, Verifier};

use super::error::StorageError;
use super::{BlobService, UrlOptions, capability_url, copy_object_to_path};

/// Storage backend writing blobs under a configured root path.
#[derive(Debug)]
pub struct DiskService {
    op: Operator,
    root: PathBuf,
    asset_host: String,
    default_link_duration: Option<u64>,
    verifier: Verifier,
}

impl DiskService {
    /// Creates a disk service rooted at `config.disk.root_path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the root path is not valid UTF-8 or the
    /// operator cannot be built.
    pub fn from_config(config: &StowageConfig) -> Result<Self, StorageError> {
        let root = config.disk.root_path.clone();
        let builder = services::Fs::default().root(
            root.to_str()
                .ok_or_else(|| StorageError::configuration("root path is not valid UTF-8"))?,
        );
        let op = Operator::new(builder)
            .map_err(|e| StorageError::configuration(e.to_string()))?
            .finish();

        Ok(Self {
            op,
            root,
            asset_host: config.asset_host.clone(),
            default_link_duration: config.link_duration_secs,
            verifier: Verifier::new(&config.secret),
        })
    }

    /// Returns the on-disk path for a key, including the fan-out folders.
    #[must_use]
    pub fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(Self::relative_path(key))
    }

    /// Fan-out folders derived from the first four characters of the key.
    fn folder_for(key: &str) -> String {
        let first = key.get(0..2).unwrap_or(key);
        let second = key.get(2..4).unwrap_or("");
        format!("{first}/{second}")
    }

    /// Path relative to the storage root, used for operator calls.
    fn relative_path(key: &str) -> String {
        format!("{}/{}", Self::folder_for(key), key)
    }
}

impl BlobService for DiskService {
    async fn download(&self, key: &str) -> Result<Bytes, StorageError> {
        let buffer = self
            .op
            .read(&Self::relative_path(key))
            .await
            .map_err(|e| StorageError::from_opendal(key, &e))?;
        Ok(buffer.to_bytes())
    }

    async fn stream_download(&self, key: &str, dest: &Path) -> Result<PathBuf, StorageError> {
        copy_object_to_path(&self.op, &Self::relative_path(key), key, dest).await
    }

    async fn upload(&self, data: Bytes, key: &str) -> Result<(), StorageError> {
        debug!(key, size = data.len(), "writing blob to disk");
        self.op
            .write(&Self::relative_path(key), data)
            .await
            .map_err(|e| StorageError::from_opendal(key, &e))?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        debug!(key, "deleting blob from disk");
        self.op
            .delete(&Self::relative_path(key))
            .await
            .map_err(|e| StorageError::from_opendal(key, &e))
    }

    async fn exists(&self, key: &str) -> Result<bool, StorageError> {
        match self.op.stat(&Self::relative_path(key)).await {
            Ok(_) => Ok(true),
            Err(e) if e.kind() == opendal::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(StorageError::from_opendal(key, &e)),
        }
    }

    fn url(&self, key: &str, opts: &UrlOptions) -> Result<String, StorageError> {
        let duration = opts.token_duration.or(self.default_link_duration);
        capability_url(&self.verifier, &self.asset_host, "disk", key, opts, duration)
    }

    fn verifier(&self) -> &Verifier {
        &self.verifier
    }
}
