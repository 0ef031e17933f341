/// Multipart spooling shared by the upload endpoints
///
/// File parts are streamed to temp files under the size limit before the
/// pipeline runs, since multipart fields arrive in arbitrary order.
use crate::{
    error::{VidError, VidResult},
    media::UploadPayload,
};
use axum::extract::{
    multipart::{Field, MultipartError},
    DefaultBodyLimit,
};
use axum::http::StatusCode;
use std::path::PathBuf;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

/// Room for multipart framing and text fields on top of the file limit
const MULTIPART_OVERHEAD: u64 = 1024 * 1024;

pub fn upload_body_limit(max_upload_size: u64) -> DefaultBodyLimit {
    let limit = max_upload_size.saturating_add(MULTIPART_OVERHEAD);
    DefaultBodyLimit::max(usize::try_from(limit).unwrap_or(usize::MAX))
}

/// Map a multipart read error, keeping body-limit rejections distinct
pub fn multipart_error(err: MultipartError, max_upload_size: u64) -> VidError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        VidError::PayloadTooLarge {
            limit: max_upload_size,
        }
    } else {
        VidError::Validation(format!("Multipart error: {}", err))
    }
}

/// A file part written to disk
#[derive(Debug)]
pub struct SpooledFile {
    pub original_name: String,
    pub path: PathBuf,
    pub size: u64,
}

impl SpooledFile {
    pub async fn into_payload(self) -> VidResult<UploadPayload> {
        let file = tokio::fs::File::open(&self.path).await.map_err(|e| {
            VidError::Internal(format!("Failed to reopen spooled upload: {}", e))
        })?;
        Ok(UploadPayload::new(
            self.original_name,
            Box::new(file),
            Some(self.size),
        ))
    }
}

/// Temp files owned by one request
pub struct Spool {
    dir: PathBuf,
    max_size: u64,
    paths: Vec<PathBuf>,
}

impl Spool {
    pub fn new(dir: PathBuf, max_size: u64) -> Self {
        Self {
            dir,
            max_size,
            paths: Vec::new(),
        }
    }

    /// Stream one file part to disk; an empty part counts as no file
    pub async fn spool_field(&mut self, mut field: Field<'_>) -> VidResult<Option<SpooledFile>> {
        let original_name = field
            .file_name()
            .map(str::to_string)
            .unwrap_or_default();

        let path = self.dir.join(format!("vidshare-upload-{}", Uuid::new_v4()));
        self.paths.push(path.clone());

        let mut temp_file = tokio::fs::File::create(&path)
            .await
            .map_err(|e| VidError::Internal(format!("Failed to create temp file: {}", e)))?;

        let mut size: u64 = 0;
        while let Some(chunk) = field
            .chunk()
            .await
            .map_err(|e| multipart_error(e, self.max_size))?
        {
            size += chunk.len() as u64;
            if size > self.max_size {
                return Err(VidError::PayloadTooLarge {
                    limit: self.max_size,
                });
            }
            temp_file
                .write_all(&chunk)
                .await
                .map_err(|e| VidError::Internal(format!("Temp file write failed: {}", e)))?;
        }

        temp_file
            .flush()
            .await
            .map_err(|e| VidError::Internal(format!("Temp file flush failed: {}", e)))?;

        if size == 0 && original_name.is_empty() {
            return Ok(None);
        }

        Ok(Some(SpooledFile {
            original_name,
            path,
            size,
        }))
    }

    /// Remove every temp file; best effort
    pub async fn cleanup(self) {
        for path in self.paths {
            let _ = tokio::fs::remove_file(&path).await;
        }
    }
}

/// Read a text part
pub async fn field_text(field: Field<'_>, max_upload_size: u64) -> VidResult<String> {
    field
        .text()
        .await
        .map_err(|e| multipart_error(e, max_upload_size))
}
