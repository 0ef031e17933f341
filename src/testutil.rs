//! Shared test fixtures: in-memory metadata store, in-memory blobs, seed rows.

use crate::{
    blob_store::{memory::MemoryBlobBackend, BlobStore},
    catalog::{SocialManager, VideoRepository},
    config::{
        BlobstoreConfig, LoggingConfig, MaintenanceConfig, MediaConfig, ServerConfig,
        ServiceConfig, StorageConfig,
    },
    context::AppContext,
    db,
    media::{DeletionEngine, UploadPipeline, VideoQueries},
};
use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use chrono::Utc;
use serde_json::Value;
use sqlx::SqlitePool;
use std::path::PathBuf;
use std::sync::Arc;
use tower::ServiceExt;

pub const TEST_UPLOAD_LIMIT: u64 = 1024 * 1024;

pub async fn test_pool() -> SqlitePool {
    let pool = db::create_memory_pool().await.unwrap();
    db::run_migrations(&pool).await.unwrap();
    pool
}

/// File-backed pool with the production options (WAL, several connections)
///
/// Keep the returned directory alive for as long as the pool is used.
pub async fn file_pool() -> (tempfile::TempDir, SqlitePool) {
    let dir = tempfile::tempdir().unwrap();
    let pool = db::create_pool(&dir.path().join("meta.sqlite"), db::DatabaseOptions::default())
        .await
        .unwrap();
    db::run_migrations(&pool).await.unwrap();
    (dir, pool)
}

pub async fn seed_user(pool: &SqlitePool, username: &str) -> i64 {
    sqlx::query(
        "INSERT INTO users (username, email, password_hash, avatar, created_at) VALUES (?1, ?2, 'x', 'avatars/default.jpg', ?3)",
    )
    .bind(username)
    .bind(format!("{}@example.com", username))
    .bind(Utc::now())
    .execute(pool)
    .await
    .unwrap()
    .last_insert_rowid()
}

pub async fn seed_channel(pool: &SqlitePool, user_id: i64, name: &str) -> i64 {
    sqlx::query("INSERT INTO channels (user_id, name, created_at) VALUES (?1, ?2, ?3)")
        .bind(user_id)
        .bind(name)
        .bind(Utc::now())
        .execute(pool)
        .await
        .unwrap()
        .last_insert_rowid()
}

/// User `username` owning a channel named `"{username}'s channel"`
pub async fn seed_user_and_channel(pool: &SqlitePool, username: &str) -> (i64, i64) {
    let user_id = seed_user(pool, username).await;
    let channel_id = seed_channel(pool, user_id, &format!("{}'s channel", username)).await;
    (user_id, channel_id)
}

pub async fn seed_ready_video(pool: &SqlitePool, channel_id: i64, title: &str, reference: &str) -> i64 {
    sqlx::query(
        "INSERT INTO videos (channel_id, title, video_url, thumbnail, status, created_at) VALUES (?1, ?2, ?3, 'thumbnails/default.jpg', 'ready', ?4)",
    )
    .bind(channel_id)
    .bind(title)
    .bind(reference)
    .bind(Utc::now())
    .execute(pool)
    .await
    .unwrap()
    .last_insert_rowid()
}

pub async fn seed_pending_video(pool: &SqlitePool, channel_id: i64, title: &str) -> i64 {
    sqlx::query(
        "INSERT INTO videos (channel_id, title, video_url, thumbnail, status, created_at) VALUES (?1, ?2, NULL, 'thumbnails/default.jpg', 'pending', ?3)",
    )
    .bind(channel_id)
    .bind(title)
    .bind(Utc::now())
    .execute(pool)
    .await
    .unwrap()
    .last_insert_rowid()
}

pub async fn count_videos(pool: &SqlitePool) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM videos")
        .fetch_one(pool)
        .await
        .unwrap()
}

pub fn test_config(max_upload_size: u64) -> ServerConfig {
    ServerConfig {
        service: ServiceConfig {
            hostname: "127.0.0.1".to_string(),
            port: 0,
        },
        storage: StorageConfig {
            data_directory: PathBuf::from("./target/test-data"),
            database: PathBuf::from(":memory:"),
            blobstore: BlobstoreConfig::Memory,
        },
        media: MediaConfig {
            max_upload_size,
            ..MediaConfig::default()
        },
        maintenance: MaintenanceConfig {
            reconcile_enabled: false,
            reconcile_interval_secs: 3600,
            orphan_grace_secs: 0,
        },
        logging: LoggingConfig {
            level: "debug".to_string(),
        },
    }
}

/// Media services over in-memory stores with one seeded user and channel
pub struct TestMedia {
    pub pool: SqlitePool,
    pub user_id: i64,
    pub channel_id: i64,
    pub backend: Arc<MemoryBlobBackend>,
    pub blobs: Arc<BlobStore>,
    pub videos: VideoRepository,
    pub social: SocialManager,
    pub uploads: UploadPipeline,
    pub deletions: DeletionEngine,
    pub queries: Arc<VideoQueries>,
}

impl TestMedia {
    pub async fn new() -> Self {
        Self::with_limit(TEST_UPLOAD_LIMIT).await
    }

    pub async fn with_limit(max_upload_size: u64) -> Self {
        let ctx = TestContext::with_limit(max_upload_size).await;
        let (user_id, channel_id) = seed_user_and_channel(&ctx.ctx.db, "tester").await;

        let media = ctx.ctx.config.media.clone();
        let pool = ctx.ctx.db.clone();
        let videos = VideoRepository::new(pool.clone());
        let channels = crate::catalog::ChannelManager::new(pool.clone());
        let social = SocialManager::new(pool.clone());

        Self {
            uploads: UploadPipeline::new(
                videos.clone(),
                channels.clone(),
                Arc::clone(&ctx.ctx.blob_store),
                media.clone(),
            ),
            deletions: DeletionEngine::new(
                videos.clone(),
                channels,
                Arc::clone(&ctx.ctx.blob_store),
                media.clone(),
            ),
            queries: Arc::new(VideoQueries::new(videos.clone(), social.clone(), media.recommend_limit)),
            pool,
            user_id,
            channel_id,
            backend: ctx.backend,
            blobs: Arc::clone(&ctx.ctx.blob_store),
            videos,
            social,
        }
    }
}

/// Full application context over in-memory stores
pub struct TestContext {
    pub ctx: AppContext,
    pub backend: Arc<MemoryBlobBackend>,
}

impl TestContext {
    pub async fn new() -> Self {
        Self::with_limit(TEST_UPLOAD_LIMIT).await
    }

    pub async fn with_limit(max_upload_size: u64) -> Self {
        let pool = test_pool().await;
        let backend = Arc::new(MemoryBlobBackend::new());
        let blob_store = Arc::new(BlobStore::with_backend(backend.clone(), max_upload_size));
        let ctx = AppContext::from_parts(test_config(max_upload_size), pool, blob_store);
        Self { ctx, backend }
    }
}

/// One part of a multipart form body
pub struct FormPart {
    name: String,
    file_name: Option<String>,
    data: Vec<u8>,
}

pub fn text_part(name: &str, value: &str) -> FormPart {
    FormPart {
        name: name.to_string(),
        file_name: None,
        data: value.as_bytes().to_vec(),
    }
}

pub fn file_part(name: &str, file_name: &str, data: &[u8]) -> FormPart {
    FormPart {
        name: name.to_string(),
        file_name: Some(file_name.to_string()),
        data: data.to_vec(),
    }
}

/// Encode parts as `multipart/form-data`, returning the content type and body
pub fn multipart_body(parts: &[FormPart]) -> (String, Vec<u8>) {
    let boundary = "vidshare-test-boundary";
    let mut body = Vec::new();

    for part in parts {
        body.extend_from_slice(format!("--{}\r\n", boundary).as_bytes());
        match &part.file_name {
            Some(file_name) => body.extend_from_slice(
                format!(
                    "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: application/octet-stream\r\n\r\n",
                    part.name, file_name
                )
                .as_bytes(),
            ),
            None => body.extend_from_slice(
                format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", part.name).as_bytes(),
            ),
        }
        body.extend_from_slice(&part.data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", boundary).as_bytes());

    (format!("multipart/form-data; boundary={}", boundary), body)
}

/// Run one request through the full router, returning status and JSON body
pub async fn send(ctx: &AppContext, request: Request<Body>) -> (StatusCode, Value) {
    let (status, bytes) = send_raw(ctx, request).await;
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, body)
}

pub async fn send_raw(ctx: &AppContext, request: Request<Body>) -> (StatusCode, Vec<u8>) {
    let response = crate::server::build_router(ctx.clone())
        .oneshot(request)
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, bytes.to_vec())
}

pub fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}
