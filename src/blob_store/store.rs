/// Blob Store Manager
///
/// Names, size-checks and routes payloads to the configured backend
use crate::{
    blob_store::{
        disk::DiskBlobBackend, memory::MemoryBlobBackend, BlobBackend, BlobBackendType,
        BlobCategory, BlobEntry, BlobReference, BoxReader, DeleteOutcome, StoredBlob,
    },
    error::{VidError, VidResult},
};
use std::sync::Arc;

/// Blob store configuration
#[derive(Debug, Clone)]
pub struct BlobStoreConfig {
    pub backend: BlobBackendType,

    /// Maximum blob size in bytes (default: 100 MiB)
    pub max_blob_size: u64,
}

/// Main blob store manager
#[derive(Clone)]
pub struct BlobStore {
    max_blob_size: u64,
    backend: Arc<dyn BlobBackend>,
}

impl BlobStore {
    /// Create a new blob store
    pub fn new(config: BlobStoreConfig) -> VidResult<Self> {
        let backend: Arc<dyn BlobBackend> = match &config.backend {
            BlobBackendType::Disk { location } => Arc::new(DiskBlobBackend::new(location.clone())),
            BlobBackendType::Memory => Arc::new(MemoryBlobBackend::new()),
        };

        Ok(Self::with_backend(backend, config.max_blob_size))
    }

    /// Build a store around an existing backend
    pub fn with_backend(backend: Arc<dyn BlobBackend>, max_blob_size: u64) -> Self {
        Self {
            max_blob_size,
            backend,
        }
    }

    /// Commit a payload under a freshly generated name in `category`
    ///
    /// `size_hint` (e.g. a declared length) is checked before any byte is read;
    /// the limit is enforced again while streaming.
    pub async fn write(
        &self,
        category: BlobCategory,
        original_name: &str,
        mut reader: BoxReader,
        size_hint: Option<u64>,
    ) -> VidResult<StoredBlob> {
        if let Some(hint) = size_hint {
            if hint > self.max_blob_size {
                return Err(VidError::PayloadTooLarge {
                    limit: self.max_blob_size,
                });
            }
        }

        let reference = BlobReference::generate(category, original_name);
        let key = reference.to_string();

        let size = self.backend.put(&key, &mut reader, self.max_blob_size).await?;

        tracing::info!(reference = %key, size, "Stored blob");

        Ok(StoredBlob {
            mime_type: mime_for(&key),
            reference: key,
            size,
        })
    }

    /// Commit an in-memory payload
    #[cfg(test)]
    pub async fn write_bytes(
        &self,
        category: BlobCategory,
        original_name: &str,
        data: Vec<u8>,
    ) -> VidResult<StoredBlob> {
        let size = data.len() as u64;
        self.write(category, original_name, Box::new(std::io::Cursor::new(data)), Some(size))
            .await
    }

    /// Read a blob fully
    #[cfg(test)]
    pub async fn read(&self, reference: &str) -> VidResult<Option<Vec<u8>>> {
        use tokio::io::AsyncReadExt;

        BlobReference::parse(reference)?;
        let Some((mut reader, size)) = self.backend.open(reference).await? else {
            return Ok(None);
        };
        let mut data = Vec::with_capacity(size as usize);
        reader.read_to_end(&mut data).await?;
        Ok(Some(data))
    }

    /// Open a blob for streaming, with its size and guessed MIME type
    pub async fn open(&self, reference: &str) -> VidResult<Option<(BoxReader, u64, String)>> {
        BlobReference::parse(reference)?;
        Ok(self
            .backend
            .open(reference)
            .await?
            .map(|(reader, size)| (reader, size, mime_for(reference))))
    }

    /// Delete a blob
    ///
    /// An already-absent blob is reported as `NotFound`, never as an error.
    pub async fn delete(&self, reference: &str) -> VidResult<DeleteOutcome> {
        BlobReference::parse(reference)?;

        if self.backend.delete(reference).await? {
            tracing::info!(reference, "Deleted blob");
            Ok(DeleteOutcome::Deleted)
        } else {
            tracing::debug!(reference, "Blob already absent");
            Ok(DeleteOutcome::NotFound)
        }
    }

    /// Check if a blob exists
    pub async fn exists(&self, reference: &str) -> VidResult<bool> {
        BlobReference::parse(reference)?;
        self.backend.exists(reference).await
    }

    /// List all blobs in a category
    pub async fn list(&self, category: BlobCategory) -> VidResult<Vec<BlobEntry>> {
        self.backend.list(category).await
    }
}

fn mime_for(reference: &str) -> String {
    mime_guess::from_path(reference)
        .first_or_octet_stream()
        .essence_str()
        .to_string()
}
