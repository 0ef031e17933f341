/// Disk-based blob storage backend
use crate::{
    blob_store::{BlobBackend, BlobCategory, BlobEntry, BlobReference, BoxReader},
    error::{VidError, VidResult},
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::path::PathBuf;
use tokio::fs;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

const PARTIAL_DIR: &str = ".partial";
const CHUNK_SIZE: usize = 64 * 1024;

/// Disk storage backend
///
/// Stores blobs at `{base}/{category}/{name}`. Writes land in
/// `{base}/.partial/` first and are renamed into place once complete.
#[derive(Clone)]
pub struct DiskBlobBackend {
    base_path: PathBuf,
}

impl DiskBlobBackend {
    /// Create a new disk storage backend
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    /// Get the file path for a reference
    fn get_blob_path(&self, key: &str) -> VidResult<PathBuf> {
        let reference = BlobReference::parse(key)?;
        Ok(self
            .base_path
            .join(reference.category().as_str())
            .join(reference.name()))
    }

    fn partial_path(&self) -> PathBuf {
        self.base_path
            .join(PARTIAL_DIR)
            .join(uuid::Uuid::new_v4().simple().to_string())
    }

    async fn ensure_dir(path: &std::path::Path) -> VidResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await.map_err(|e| {
                VidError::BlobStorage(format!("Failed to create blob directory: {}", e))
            })?;
        }
        Ok(())
    }

    /// Copy the reader into `partial`, enforcing the limit
    async fn spool(partial: &PathBuf, reader: &mut BoxReader, limit: u64) -> VidResult<u64> {
        let mut file = fs::File::create(partial)
            .await
            .map_err(|e| VidError::BlobStorage(format!("Failed to create partial blob: {}", e)))?;

        let mut buf = vec![0u8; CHUNK_SIZE];
        let mut total: u64 = 0;

        loop {
            let n = reader
                .read(&mut buf)
                .await
                .map_err(|e| VidError::BlobStorage(format!("Upload read error: {}", e)))?;
            if n == 0 {
                break;
            }
            total += n as u64;
            if total > limit {
                return Err(VidError::PayloadTooLarge { limit });
            }
            file.write_all(&buf[..n])
                .await
                .map_err(|e| VidError::BlobStorage(format!("Blob write failed: {}", e)))?;
        }

        file.sync_all()
            .await
            .map_err(|e| VidError::BlobStorage(format!("Blob flush failed: {}", e)))?;

        Ok(total)
    }
}

#[async_trait]
impl BlobBackend for DiskBlobBackend {
    async fn put(&self, key: &str, reader: &mut BoxReader, limit: u64) -> VidResult<u64> {
        let blob_path = self.get_blob_path(key)?;
        let partial = self.partial_path();
        Self::ensure_dir(&blob_path).await?;
        Self::ensure_dir(&partial).await?;

        let result = async {
            let written = Self::spool(&partial, reader, limit).await?;
            fs::rename(&partial, &blob_path).await.map_err(|e| {
                VidError::BlobStorage(format!("Failed to commit blob {}: {}", key, e))
            })?;
            Ok(written)
        }
        .await;

        if result.is_err() {
            // Best effort.
            let _ = fs::remove_file(&partial).await;
        }

        result
    }


    async fn open(&self, key: &str) -> VidResult<Option<(BoxReader, u64)>> {
        let blob_path = self.get_blob_path(key)?;

        match fs::File::open(&blob_path).await {
            Ok(file) => {
                let size = file
                    .metadata()
                    .await
                    .map_err(|e| VidError::BlobStorage(format!("Failed to stat blob {}: {}", key, e)))?
                    .len();
                Ok(Some((Box::new(file), size)))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(VidError::BlobStorage(format!(
                "Failed to open blob {}: {}",
                key, e
            ))),
        }
    }

    async fn delete(&self, key: &str) -> VidResult<bool> {
        let blob_path = self.get_blob_path(key)?;

        match fs::remove_file(&blob_path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(VidError::BlobStorage(format!(
                "Failed to delete blob {}: {}",
                key, e
            ))),
        }
    }

    async fn exists(&self, key: &str) -> VidResult<bool> {
        let blob_path = self.get_blob_path(key)?;
        fs::try_exists(&blob_path)
            .await
            .map_err(|e| VidError::BlobStorage(format!("Failed to stat blob {}: {}", key, e)))
    }

    async fn list(&self, category: BlobCategory) -> VidResult<Vec<BlobEntry>> {
        let dir = self.base_path.join(category.as_str());

        let mut entries = match fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(VidError::BlobStorage(format!(
                    "Failed to list {}: {}",
                    category, e
                )))
            }
        };

        let mut blobs = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let metadata = entry.metadata().await?;
            if !metadata.is_file() {
                continue;
            }
            let Some(name) = entry.file_name().to_str().map(String::from) else {
                continue;
            };
            let Ok(reference) = BlobReference::new(category, name) else {
                continue;
            };
            let modified: DateTime<Utc> = metadata
                .modified()
                .map(DateTime::from)
                .unwrap_or_else(|_| Utc::now());

            blobs.push(BlobEntry {
                reference: reference.to_string(),
                size: metadata.len(),
                modified,
            });
        }

        Ok(blobs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn reader(data: &[u8]) -> BoxReader {
        Box::new(std::io::Cursor::new(data.to_vec()))
    }

    async fn read_all(backend: &DiskBlobBackend, key: &str) -> Option<Vec<u8>> {
        use tokio::io::AsyncReadExt;

        let (mut reader, _) = backend.open(key).await.unwrap()?;
        let mut data = Vec::new();
        reader.read_to_end(&mut data).await.unwrap();
        Some(data)
    }

    #[tokio::test]
    async fn test_put_and_open_blob() {
        let dir = tempdir().unwrap();
        let backend = DiskBlobBackend::new(dir.path().to_path_buf());

        let key = "videos/clip.mp4";
        let data = b"test blob data".to_vec();

        let written = backend.put(key, &mut reader(&data), 1024).await.unwrap();
        assert_eq!(written, data.len() as u64);

        let retrieved = read_all(&backend, key).await;
        assert_eq!(retrieved, Some(data));
        assert!(dir.path().join("videos").join("clip.mp4").exists());
    }

    #[tokio::test]
    async fn test_open_nonexistent_blob() {
        let dir = tempdir().unwrap();
        let backend = DiskBlobBackend::new(dir.path().to_path_buf());

        let result = read_all(&backend, "videos/nonexistent.mp4").await;
        assert_eq!(result, None);
    }

    #[tokio::test]
    async fn test_delete_blob_is_idempotent() {
        let dir = tempdir().unwrap();
        let backend = DiskBlobBackend::new(dir.path().to_path_buf());

        let key = "avatars/face.png";
        backend.put(key, &mut reader(b"to be deleted"), 1024).await.unwrap();
        assert!(backend.exists(key).await.unwrap());

        assert!(backend.delete(key).await.unwrap());
        assert!(!backend.exists(key).await.unwrap());
        assert!(!backend.delete(key).await.unwrap());
    }

    #[tokio::test]
    async fn test_oversized_put_leaves_nothing() {
        let dir = tempdir().unwrap();
        let backend = DiskBlobBackend::new(dir.path().to_path_buf());

        let key = "videos/big.mp4";
        let data = vec![7u8; 200 * 1024];
        let err = backend.put(key, &mut reader(&data), 100 * 1024).await.unwrap_err();

        assert!(matches!(err, VidError::PayloadTooLarge { limit } if limit == 100 * 1024));
        assert!(!backend.exists(key).await.unwrap());

        let mut partials = fs::read_dir(dir.path().join(PARTIAL_DIR)).await.unwrap();
        assert!(partials.next_entry().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_blob_open() {
        let dir = tempdir().unwrap();
        let backend = DiskBlobBackend::new(dir.path().to_path_buf());

        let key = "thumbnails/t.jpg";
        backend.put(key, &mut reader(b"12345"), 1024).await.unwrap();

        let (mut file, size) = backend.open(key).await.unwrap().unwrap();
        let mut contents = Vec::new();
        file.read_to_end(&mut contents).await.unwrap();
        assert_eq!(size, 5);
        assert_eq!(contents, b"12345");
    }

    #[tokio::test]
    async fn test_list_category() {
        let dir = tempdir().unwrap();
        let backend = DiskBlobBackend::new(dir.path().to_path_buf());

        backend.put("videos/a.mp4", &mut reader(b"a"), 10).await.unwrap();
        backend.put("videos/b.mp4", &mut reader(b"bb"), 10).await.unwrap();
        backend.put("avatars/c.png", &mut reader(b"c"), 10).await.unwrap();

        let mut videos: Vec<String> = backend
            .list(BlobCategory::Videos)
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.reference)
            .collect();
        videos.sort();
        assert_eq!(videos, vec!["videos/a.mp4", "videos/b.mp4"]);

        assert!(backend.list(BlobCategory::Thumbnails).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_rejects_escaping_key() {
        let dir = tempdir().unwrap();
        let backend = DiskBlobBackend::new(dir.path().to_path_buf());

        assert!(backend.open("videos/../../etc/passwd").await.is_err());
        assert!(backend.delete("../outside").await.is_err());
    }
}
