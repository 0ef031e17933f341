/// In-memory blob storage backend, used by tests and throwaway deployments
use crate::{
    blob_store::{BlobBackend, BlobCategory, BlobEntry, BlobReference, BoxReader},
    error::{VidError, VidResult},
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::io::AsyncReadExt;
use tokio::sync::RwLock;

#[derive(Debug, Clone)]
struct MemoryBlob {
    data: Vec<u8>,
    modified: DateTime<Utc>,
}

#[derive(Default)]
pub struct MemoryBlobBackend {
    blobs: RwLock<HashMap<String, MemoryBlob>>,
}

impl MemoryBlobBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored blobs
    #[cfg(test)]
    pub async fn len(&self) -> usize {
        self.blobs.read().await.len()
    }

    /// Insert a blob with an explicit modification time
    #[cfg(test)]
    pub async fn insert_at(&self, key: &str, data: Vec<u8>, modified: DateTime<Utc>) -> VidResult<()> {
        BlobReference::parse(key)?;
        self.blobs
            .write()
            .await
            .insert(key.to_string(), MemoryBlob { data, modified });
        Ok(())
    }
}

#[async_trait]
impl BlobBackend for MemoryBlobBackend {
    async fn put(&self, key: &str, reader: &mut BoxReader, limit: u64) -> VidResult<u64> {
        BlobReference::parse(key)?;

        // Read one byte past the limit to detect overflow without buffering the rest
        let mut data = Vec::new();
        let mut limited = reader.take(limit.saturating_add(1));
        limited
            .read_to_end(&mut data)
            .await
            .map_err(|e| VidError::BlobStorage(format!("Upload read error: {}", e)))?;

        if data.len() as u64 > limit {
            return Err(VidError::PayloadTooLarge { limit });
        }

        let size = data.len() as u64;
        self.blobs.write().await.insert(
            key.to_string(),
            MemoryBlob {
                data,
                modified: Utc::now(),
            },
        );
        Ok(size)
    }

    async fn open(&self, key: &str) -> VidResult<Option<(BoxReader, u64)>> {
        Ok(self.blobs.read().await.get(key).map(|b| {
            let size = b.data.len() as u64;
            let reader: BoxReader = Box::new(std::io::Cursor::new(b.data.clone()));
            (reader, size)
        }))
    }

    async fn delete(&self, key: &str) -> VidResult<bool> {
        BlobReference::parse(key)?;
        Ok(self.blobs.write().await.remove(key).is_some())
    }

    async fn exists(&self, key: &str) -> VidResult<bool> {
        Ok(self.blobs.read().await.contains_key(key))
    }

    async fn list(&self, category: BlobCategory) -> VidResult<Vec<BlobEntry>> {
        let prefix = format!("{}/", category);
        Ok(self
            .blobs
            .read()
            .await
            .iter()
            .filter(|(key, _)| key.starts_with(&prefix))
            .map(|(key, blob)| BlobEntry {
                reference: key.clone(),
                size: blob.data.len() as u64,
                modified: blob.modified,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_put_respects_limit() {
        let backend = MemoryBlobBackend::new();
        let mut ok: BoxReader = Box::new(std::io::Cursor::new(vec![1u8; 10]));
        assert_eq!(backend.put("videos/a.mp4", &mut ok, 10).await.unwrap(), 10);

        let mut big: BoxReader = Box::new(std::io::Cursor::new(vec![1u8; 11]));
        let err = backend.put("videos/b.mp4", &mut big, 10).await.unwrap_err();
        assert!(matches!(err, VidError::PayloadTooLarge { .. }));
        assert!(!backend.exists("videos/b.mp4").await.unwrap());
        assert_eq!(backend.len().await, 1);
    }

    #[tokio::test]
    async fn test_list_filters_by_category() {
        let backend = MemoryBlobBackend::new();
        backend.insert_at("videos/a.mp4", vec![1], Utc::now()).await.unwrap();
        backend.insert_at("avatars/b.png", vec![2], Utc::now()).await.unwrap();

        let videos = backend.list(BlobCategory::Videos).await.unwrap();
        assert_eq!(videos.len(), 1);
        assert_eq!(videos[0].reference, "videos/a.mp4");
    }
}
