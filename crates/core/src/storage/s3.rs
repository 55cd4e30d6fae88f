//! S3-compatible object store backend.
//!
//! Same contract as [`DiskService`](super::DiskService), backed by a remote
//! bucket. Keys map directly to object names; the store handles arbitrary
//! key cardinality, so no fan-out folders are needed.

use std::path::{Path, PathBuf};

use bytes::Bytes;
use opendal::{Operator, services};
use tracing::debug;

use stowage_shared::{StowageConfig, Verifier};

use super::error::StorageError;
use super::{BlobService, UrlOptions, capability_url, copy_object_to_path};

/// Storage backend writing blobs to an S3-compatible bucket.
#[derive(Debug)]
pub struct ObjectStoreService {
    op: Operator,
    asset_host: String,
    default_link_duration: Option<u64>,
    verifier: Verifier,
}

impl ObjectStoreService {
    /// Creates an object store service from the `s3` configuration section.
    ///
    /// # Errors
    ///
    /// Returns an error if the operator cannot be built from the
    /// configuration.
    pub fn from_config(config: &StowageConfig) -> Result<Self, StorageError> {
        let s3 = &config.s3;
        let mut builder = services::S3::default()
            .bucket(&s3.bucket)
            .region(&s3.region)
            .access_key_id(&s3.access_key_id)
            .secret_access_key(&s3.secret_access_key);
        // Custom endpoints are only needed for non-AWS stores.
        if !s3.endpoint.is_empty() {
            builder = builder.endpoint(&s3.endpoint);
        }

        let op = Operator::new(builder)
            .map_err(|e| StorageError::configuration(e.to_string()))?
            .finish();

        Ok(Self {
            op,
            asset_host: config.asset_host.clone(),
            default_link_duration: config.link_duration_secs,
            verifier: Verifier::new(&config.secret),
        })
    }
}

impl BlobService for ObjectStoreService {
    async fn download(&self, key: &str) -> Result<Bytes, StorageError> {
        let buffer = self
            .op
            .read(key)
            .await
            .map_err(|e| StorageError::from_opendal(key, &e))?;
        Ok(buffer.to_bytes())
    }

    async fn stream_download(&self, key: &str, dest: &Path) -> Result<PathBuf, StorageError> {
        copy_object_to_path(&self.op, key, key, dest).await
    }

    async fn upload(&self, data: Bytes, key: &str) -> Result<(), StorageError> {
        debug!(key, size = data.len(), "putting object");
        self.op
            .write(key, data)
            .await
            .map_err(|e| StorageError::from_opendal(key, &e))?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        debug!(key, "deleting object");
        self.op
            .delete(key)
            .await
            .map_err(|e| StorageError::from_opendal(key, &e))
    }

    async fn exists(&self, key: &str) -> Result<bool, StorageError> {
        // A missing object is an answer, not an error; anything else
        // (auth, network) is surfaced.
        match self.op.stat(key).await {
            Ok(_) => Ok(true),
            Err(e) if e.kind() == opendal::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(StorageError::from_opendal(key, &e)),
        }
    }

    fn url(&self, key: &str, opts: &UrlOptions) -> Result<String, StorageError> {
        let duration = opts.token_duration.or(self.default_link_duration);
        capability_url(&self.verifier, &self.asset_host, "s3", key, opts, duration)
    }

    fn verifier(&self) -> &Verifier {
        &self.verifier
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stowage_shared::CapabilityClaims;
    use stowage_shared::config::{DiskConfig, S3Config, ServiceKind};

    fn test_service() -> ObjectStoreService {
        let config = StowageConfig {
            service: ServiceKind::S3,
            secret: "test-secret-key-for-testing".to_string(),
            asset_host: "http://localhost.test".to_string(),
            link_duration_secs: None,
            disk: DiskConfig::default(),
            s3: S3Config {
                endpoint: "http://localhost:4566".to_string(),
                bucket: "private-assets".to_string(),
                region: "us-west-2".to_string(),
                access_key_id: "test".to_string(),
                secret_access_key: "test".to_string(),
            },
        };
        ObjectStoreService::from_config(&config).unwrap()
    }

    #[test]
    fn test_url_uses_the_s3_route() {
        let service = test_service();
        let url = service
            .url("abcd", &UrlOptions::new("t.png", "image/png"))
            .unwrap();
        assert!(url.starts_with("http://localhost.test/storage/s3/"));
    }

    #[test]
    fn test_url_embeds_verifiable_claims() {
        let service = test_service();
        let url = service
            .url(
                "abcd",
                &UrlOptions::new("t.png", "image/png").with_disposition("attachment"),
            )
            .unwrap();

        let token = url
            .strip_prefix("http://localhost.test/storage/s3/")
            .and_then(|rest| rest.split('/').next())
            .unwrap();
        let claims: CapabilityClaims = service.verifier().verify(token).unwrap();

        assert_eq!(claims.key, "abcd");
        assert_eq!(claims.disposition, "attachment; filename=\"t.png\"");
        assert_eq!(claims.content_type, "image/png");
    }

    #[test]
    fn test_unknown_disposition_signs_as_inline() {
        let service = test_service();
        let url = service
            .url(
                "abcd",
                &UrlOptions::new("t.png", "image/png").with_disposition("attachments"),
            )
            .unwrap();

        let token = url
            .strip_prefix("http://localhost.test/storage/s3/")
            .and_then(|rest| rest.split('/').next())
            .unwrap();
        let claims: CapabilityClaims = service.verifier().verify(token).unwrap();
        assert!(claims.disposition.starts_with("inline"));
    }
}
