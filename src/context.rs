/// Application context and dependency injection
use crate::{
    blob_store::{BlobBackendType, BlobStore, BlobStoreConfig},
    catalog::{ChannelManager, SocialManager, UserManager, VideoRepository},
    config::{BlobstoreConfig, ServerConfig},
    db,
    error::{VidError, VidResult},
    media::{DeletionEngine, UploadPipeline, VideoQueries},
};
use sqlx::SqlitePool;
use std::sync::Arc;

/// Application context holding all shared services
///
/// Store handles are created once here and passed into each service.
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<ServerConfig>,
    pub db: SqlitePool,
    pub blob_store: Arc<BlobStore>,
    pub users: Arc<UserManager>,
    pub channels: Arc<ChannelManager>,
    pub social: Arc<SocialManager>,
    pub videos: VideoRepository,
    // Media consistency
    pub uploads: Arc<UploadPipeline>,
    pub deletions: Arc<DeletionEngine>,
    pub queries: Arc<VideoQueries>,
}

impl AppContext {
    /// Create a new application context from configuration
    pub async fn new(config: ServerConfig) -> VidResult<Self> {
        // Validate configuration
        config.validate()?;

        // Create data directories if they don't exist
        Self::ensure_directories(&config).await?;

        // Initialize metadata database
        let db = match &config.storage.blobstore {
            BlobstoreConfig::Memory => db::create_memory_pool().await?,
            BlobstoreConfig::Disk { .. } => {
                db::create_pool(&config.storage.database, db::DatabaseOptions::default()).await?
            }
        };

        // Run migrations
        db::run_migrations(&db).await?;

        // Test connection
        db::test_connection(&db).await?;

        // Initialize blob store
        let backend = match &config.storage.blobstore {
            BlobstoreConfig::Disk { location, .. } => BlobBackendType::Disk {
                location: location.clone(),
            },
            BlobstoreConfig::Memory => BlobBackendType::Memory,
        };
        let blob_store = Arc::new(BlobStore::new(BlobStoreConfig {
            backend,
            max_blob_size: config.media.max_upload_size,
        })?);

        Ok(Self::from_parts(config, db, blob_store))
    }

    /// Wire services around already-open stores
    pub fn from_parts(config: ServerConfig, db: SqlitePool, blob_store: Arc<BlobStore>) -> Self {
        let media = config.media.clone();

        let videos = VideoRepository::new(db.clone());
        let channels = ChannelManager::new(db.clone());
        let social = SocialManager::new(db.clone());
        let users = UserManager::new(db.clone(), media.default_avatar.clone());

        let uploads = UploadPipeline::new(
            videos.clone(),
            channels.clone(),
            Arc::clone(&blob_store),
            media.clone(),
        );
        let deletions = DeletionEngine::new(
            videos.clone(),
            channels.clone(),
            Arc::clone(&blob_store),
            media.clone(),
        );
        let queries = VideoQueries::new(videos.clone(), social.clone(), media.recommend_limit);

        Self {
            config: Arc::new(config),
            db,
            blob_store,
            users: Arc::new(users),
            channels: Arc::new(channels),
            social: Arc::new(social),
            videos,
            uploads: Arc::new(uploads),
            deletions: Arc::new(deletions),
            queries: Arc::new(queries),
        }
    }

    /// Ensure required directories exist
    async fn ensure_directories(config: &ServerConfig) -> VidResult<()> {
        let data_dir = &config.storage.data_directory;
        if !data_dir.exists() {
            tokio::fs::create_dir_all(data_dir).await.map_err(|e| {
                VidError::Internal(format!("Failed to create directory {:?}: {}", data_dir, e))
            })?;
        }

        // Create blob storage directories if using disk storage
        if let BlobstoreConfig::Disk {
            location,
            tmp_location,
        } = &config.storage.blobstore
        {
            tokio::fs::create_dir_all(location).await?;
            tokio::fs::create_dir_all(tmp_location).await?;
        }

        Ok(())
    }

    /// Directory for spooling multipart uploads
    pub fn tmp_dir(&self) -> std::path::PathBuf {
        match &self.config.storage.blobstore {
            BlobstoreConfig::Disk { tmp_location, .. } => tmp_location.clone(),
            BlobstoreConfig::Memory => std::env::temp_dir(),
        }
    }

    /// Get service URL
    pub fn service_url(&self) -> String {
        format!(
            "http://{}:{}",
            self.config.service.hostname, self.config.service.port
        )
    }
}
