/// Blob Storage System
///
/// Holds video files, thumbnails and avatars outside the metadata store.
/// Supports multiple backend implementations (disk, memory).

pub mod disk;
pub mod memory;
pub mod models;
pub mod store;

pub use models::*;
pub use store::{BlobStore, BlobStoreConfig};

use crate::error::VidResult;
use async_trait::async_trait;
use std::path::PathBuf;
use tokio::io::AsyncRead;

/// Owned async reader handed to the store
pub type BoxReader = Box<dyn AsyncRead + Send + Unpin>;

/// Blob storage backend trait
///
/// Keys are validated `BlobReference` strings (`<category>/<name>`).
#[async_trait]
pub trait BlobBackend: Send + Sync {
    /// Stream a payload into storage, failing with `PayloadTooLarge` past `limit` bytes.
    /// Nothing is visible under `key` unless the whole payload was accepted.
    async fn put(&self, key: &str, reader: &mut BoxReader, limit: u64) -> VidResult<u64>;

    /// Open a blob for streaming
    async fn open(&self, key: &str) -> VidResult<Option<(BoxReader, u64)>>;

    /// Delete a blob; returns false if it was already absent
    async fn delete(&self, key: &str) -> VidResult<bool>;

    /// Check if a blob exists
    async fn exists(&self, key: &str) -> VidResult<bool>;

    /// List every committed blob in a category
    async fn list(&self, category: BlobCategory) -> VidResult<Vec<BlobEntry>>;
}

/// Backend types for blob storage
#[derive(Debug, Clone)]
pub enum BlobBackendType {
    /// Store blobs on local disk
    Disk { location: PathBuf },

    /// Keep blobs in process memory
    Memory,
}
