//! Application configuration management.

use serde::Deserialize;
use std::path::PathBuf;

/// Which storage backend serves blobs for this process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceKind {
    /// Local filesystem backend.
    Disk,
    /// S3-compatible object store backend.
    S3,
}

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct StowageConfig {
    /// Active storage backend.
    #[serde(default = "default_service")]
    pub service: ServiceKind,
    /// Secret used to sign capability tokens.
    pub secret: String,
    /// Host prepended to generated capability URLs.
    #[serde(default = "default_asset_host")]
    pub asset_host: String,
    /// Default lifetime for signed URLs in seconds. `None` issues
    /// non-expiring URLs.
    #[serde(default)]
    pub link_duration_secs: Option<u64>,
    /// Disk backend configuration.
    #[serde(default)]
    pub disk: DiskConfig,
    /// Object store backend configuration.
    #[serde(default)]
    pub s3: S3Config,
}

/// Disk backend configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DiskConfig {
    /// Root directory under which blobs and variants are stored.
    #[serde(default = "default_root_path")]
    pub root_path: PathBuf,
}

impl Default for DiskConfig {
    fn default() -> Self {
        Self {
            root_path: default_root_path(),
        }
    }
}

/// S3-compatible object store configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct S3Config {
    /// Endpoint URL. Only needed for non-AWS stores (MinIO, LocalStack).
    #[serde(default)]
    pub endpoint: String,
    /// Bucket name.
    #[serde(default)]
    pub bucket: String,
    /// Region.
    #[serde(default = "default_region")]
    pub region: String,
    /// Access key ID.
    #[serde(default)]
    pub access_key_id: String,
    /// Secret access key.
    #[serde(default)]
    pub secret_access_key: String,
}

fn default_service() -> ServiceKind {
    ServiceKind::Disk
}

fn default_asset_host() -> String {
    "http://localhost:3000".to_string()
}

fn default_root_path() -> PathBuf {
    PathBuf::from("./storage")
}

fn default_region() -> String {
    "us-east-1".to_string()
}

impl StowageConfig {
    /// Loads configuration from environment and config files.
    ///
    /// Sources, in increasing precedence: `config/default`,
    /// `config/{RUN_MODE}`, then `STOWAGE__`-prefixed environment variables
    /// (e.g. `STOWAGE__DISK__ROOT_PATH`).
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded or is missing the
    /// signing secret.
    pub fn load() -> Result<Self, config::ConfigError> {
        dotenvy::dotenv().ok();
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(config::Environment::with_prefix("STOWAGE").separator("__"))
            .build()?;

        config.try_deserialize()
    }
}
