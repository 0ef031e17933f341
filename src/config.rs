/// Configuration management for vidshare
use crate::blob_store::BlobReference;
use crate::error::{VidError, VidResult};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

/// Main server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub service: ServiceConfig,
    pub storage: StorageConfig,
    pub media: MediaConfig,
    pub maintenance: MaintenanceConfig,
    pub logging: LoggingConfig,
}

/// Service-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub hostname: String,
    pub port: u16,
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub data_directory: PathBuf,
    pub database: PathBuf,
    pub blobstore: BlobstoreConfig,
}

/// Blob storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum BlobstoreConfig {
    Disk {
        location: PathBuf,
        tmp_location: PathBuf,
    },
    Memory,
}

/// Upload limits and shared media defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaConfig {
    /// Maximum accepted payload in bytes
    pub max_upload_size: u64,
    /// Shared thumbnail used when an upload has none; never deleted
    pub default_thumbnail: String,
    /// Shared avatar for users and channels; never deleted
    pub default_avatar: String,
    pub recommend_limit: i64,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            max_upload_size: 100 * 1024 * 1024, // 100 MiB
            default_thumbnail: "thumbnails/default.jpg".to_string(),
            default_avatar: "avatars/default.jpg".to_string(),
            recommend_limit: 20,
        }
    }
}

/// Orphan reconciliation sweep configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaintenanceConfig {
    pub reconcile_enabled: bool,
    pub reconcile_interval_secs: u64,
    /// Unreferenced blobs younger than this are left alone (upload in flight)
    pub orphan_grace_secs: u64,
}

impl MaintenanceConfig {
    /// Grace period as a `chrono::Duration`; rejects values it cannot represent
    pub fn orphan_grace(&self) -> VidResult<chrono::Duration> {
        i64::try_from(self.orphan_grace_secs)
            .ok()
            .and_then(chrono::Duration::try_seconds)
            .ok_or_else(|| {
                VidError::Validation(format!(
                    "Orphan grace period of {} seconds is out of range",
                    self.orphan_grace_secs
                ))
            })
    }
}

/// Default `tracing` filter when RUST_LOG is unset
pub const DEFAULT_LOG_FILTER: &str = "vidshare=debug,tower_http=debug";

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

impl ServerConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> VidResult<Self> {
        dotenv::dotenv().ok();

        let hostname = env::var("VIDSHARE_HOSTNAME").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("VIDSHARE_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse()
            .map_err(|_| VidError::Validation("Invalid port number".to_string()))?;

        let data_directory: PathBuf = env::var("VIDSHARE_DATA_DIRECTORY")
            .unwrap_or_else(|_| "./data".to_string())
            .into();
        let database = env::var("VIDSHARE_DB_LOCATION")
            .map(PathBuf::from)
            .unwrap_or_else(|_| data_directory.join("vidshare.sqlite"));

        let blobstore = match env::var("VIDSHARE_BLOB_BACKEND")
            .unwrap_or_else(|_| "disk".to_string())
            .as_str()
        {
            "disk" => BlobstoreConfig::Disk {
                location: env::var("VIDSHARE_BLOB_LOCATION")
                    .map(PathBuf::from)
                    .unwrap_or_else(|_| data_directory.join("media")),
                tmp_location: env::var("VIDSHARE_TMP_LOCATION")
                    .map(PathBuf::from)
                    .unwrap_or_else(|_| data_directory.join("tmp")),
            },
            "memory" => BlobstoreConfig::Memory,
            other => {
                return Err(VidError::Validation(format!(
                    "Unknown blob backend: {}",
                    other
                )))
            }
        };

        let defaults = MediaConfig::default();
        let max_upload_size = env::var("VIDSHARE_MAX_UPLOAD_SIZE")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.max_upload_size);
        let default_thumbnail =
            env::var("VIDSHARE_DEFAULT_THUMBNAIL").unwrap_or(defaults.default_thumbnail);
        let default_avatar = env::var("VIDSHARE_DEFAULT_AVATAR").unwrap_or(defaults.default_avatar);
        let recommend_limit = env::var("VIDSHARE_RECOMMEND_LIMIT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.recommend_limit);

        let reconcile_enabled = env::var("VIDSHARE_RECONCILE_ENABLED")
            .unwrap_or_else(|_| "true".to_string())
            .parse()
            .unwrap_or(true);
        let reconcile_interval_secs = env::var("VIDSHARE_RECONCILE_INTERVAL")
            .unwrap_or_else(|_| "3600".to_string())
            .parse()
            .unwrap_or(3600);
        let orphan_grace_secs = env::var("VIDSHARE_ORPHAN_GRACE")
            .unwrap_or_else(|_| "3600".to_string())
            .parse()
            .unwrap_or(3600);

        let log_level = env::var("RUST_LOG").unwrap_or_else(|_| DEFAULT_LOG_FILTER.to_string());

        Ok(ServerConfig {
            service: ServiceConfig { hostname, port },
            storage: StorageConfig {
                data_directory,
                database,
                blobstore,
            },
            media: MediaConfig {
                max_upload_size,
                default_thumbnail,
                default_avatar,
                recommend_limit,
            },
            maintenance: MaintenanceConfig {
                reconcile_enabled,
                reconcile_interval_secs,
                orphan_grace_secs,
            },
            logging: LoggingConfig { level: log_level },
        })
    }

    /// Validate configuration
    pub fn validate(&self) -> VidResult<()> {
        if self.service.hostname.is_empty() {
            return Err(VidError::Validation("Hostname cannot be empty".to_string()));
        }

        if self.media.max_upload_size == 0 {
            return Err(VidError::Validation(
                "Upload size limit must be greater than zero".to_string(),
            ));
        }

        if !(1..=100).contains(&self.media.recommend_limit) {
            return Err(VidError::Validation(
                "Recommendation limit must be between 1 and 100".to_string(),
            ));
        }

        BlobReference::parse(&self.media.default_thumbnail)?;
        BlobReference::parse(&self.media.default_avatar)?;

        if self.maintenance.reconcile_enabled && self.maintenance.reconcile_interval_secs == 0 {
            return Err(VidError::Validation(
                "Reconcile interval must be greater than zero".to_string(),
            ));
        }

        self.maintenance.orphan_grace()?;

        Ok(())
    }
}
