/// Upload pipeline: blob first, then the metadata row
///
/// Nothing is written before the request is validated. The row insert only
/// happens after the blob is committed, so a row never points at a blob that
/// was never stored. A failed insert leaves the blob behind for the
/// reconciliation sweep; it is not retried or compensated here.
use crate::{
    blob_store::{BlobCategory, BlobStore, BoxReader, DeleteOutcome},
    catalog::{ChannelManager, NewVideo, VideoRepository},
    config::MediaConfig,
    error::{VidError, VidResult},
};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

/// A payload as received from the request layer
pub struct UploadPayload {
    pub original_name: String,
    pub reader: BoxReader,
    pub size_hint: Option<u64>,
}

impl UploadPayload {
    pub fn new(original_name: impl Into<String>, reader: BoxReader, size_hint: Option<u64>) -> Self {
        Self {
            original_name: original_name.into(),
            reader,
            size_hint,
        }
    }

    pub fn from_bytes(original_name: impl Into<String>, data: Vec<u8>) -> Self {
        let size = data.len() as u64;
        Self::new(original_name, Box::new(std::io::Cursor::new(data)), Some(size))
    }
}

/// Video upload request
pub struct VideoUpload {
    pub channel_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub duration: Option<i64>,
    pub video: Option<UploadPayload>,
    pub thumbnail: Option<UploadPayload>,
}

/// Durable result tying the blob to its row
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadedVideo {
    pub video_id: i64,
    pub blob_reference: String,
    pub thumbnail_reference: String,
}

pub struct UploadPipeline {
    videos: VideoRepository,
    channels: ChannelManager,
    blobs: Arc<BlobStore>,
    media: MediaConfig,
}

impl UploadPipeline {
    pub fn new(
        videos: VideoRepository,
        channels: ChannelManager,
        blobs: Arc<BlobStore>,
        media: MediaConfig,
    ) -> Self {
        Self {
            videos,
            channels,
            blobs,
            media,
        }
    }

    /// Store the video payload and insert its row
    pub async fn upload_video(&self, upload: VideoUpload) -> VidResult<UploadedVideo> {
        let VideoUpload {
            channel_id,
            title,
            description,
            duration,
            video,
            thumbnail,
        } = upload;

        let video = video.ok_or(VidError::NoFileProvided)?;

        let title = title.trim().to_string();
        if title.is_empty() {
            return Err(VidError::Validation("Title is required".to_string()));
        }
        if matches!(duration, Some(d) if d < 0) {
            return Err(VidError::Validation("Duration cannot be negative".to_string()));
        }
        if let Some(thumb) = &thumbnail {
            require_image(&thumb.original_name)?;
        }
        if !self.channels.exists(channel_id).await? {
            return Err(VidError::NotFound(format!("Channel {} not found", channel_id)));
        }

        let stored = self
            .blobs
            .write(BlobCategory::Videos, &video.original_name, video.reader, video.size_hint)
            .await?;

        let thumbnail_reference = match thumbnail {
            Some(thumb) => {
                self.blobs
                    .write(BlobCategory::Thumbnails, &thumb.original_name, thumb.reader, thumb.size_hint)
                    .await
                    .inspect_err(|_| {
                        warn!(reference = %stored.reference, "Thumbnail failed; video blob left for reconciliation")
                    })?
                    .reference
            }
            None => self.media.default_thumbnail.clone(),
        };

        let row = NewVideo {
            channel_id,
            title,
            description: description.filter(|d| !d.trim().is_empty()),
            video_url: stored.reference.clone(),
            thumbnail: thumbnail_reference.clone(),
            duration,
        };

        let outcome = self.videos.insert(&row).await.inspect_err(|e| {
            warn!(
                reference = %stored.reference,
                thumbnail = %thumbnail_reference,
                error = %e,
                "Video row insert failed; blob left for reconciliation"
            )
        })?;

        info!(
            video_id = outcome.inserted_id,
            channel_id,
            reference = %stored.reference,
            size = stored.size,
            "Video uploaded"
        );

        Ok(UploadedVideo {
            video_id: outcome.inserted_id,
            blob_reference: stored.reference,
            thumbnail_reference,
        })
    }

    /// Replace a channel's avatar, returning the new reference
    ///
    /// The previous avatar is deleted only after the row points at the new one.
    pub async fn replace_channel_avatar(
        &self,
        channel_id: i64,
        payload: Option<UploadPayload>,
    ) -> VidResult<String> {
        let payload = payload.ok_or(VidError::NoFileProvided)?;
        require_image(&payload.original_name)?;

        let channel = self
            .channels
            .get(channel_id)
            .await?
            .ok_or_else(|| VidError::NotFound(format!("Channel {} not found", channel_id)))?;

        let stored = self
            .blobs
            .write(BlobCategory::Avatars, &payload.original_name, payload.reader, payload.size_hint)
            .await?;

        let outcome = self.channels.set_avatar(channel_id, &stored.reference).await?;
        if outcome.rows_affected == 0 {
            // Channel deleted meanwhile; nothing references the new blob
            self.blobs.delete(&stored.reference).await?;
            return Err(VidError::NotFound(format!("Channel {} not found", channel_id)));
        }

        if let Some(previous) = channel.avatar.filter(|a| *a != self.media.default_avatar) {
            match self.blobs.delete(&previous).await {
                Ok(DeleteOutcome::Deleted | DeleteOutcome::NotFound) => {}
                Err(e) => warn!(reference = %previous, error = %e, "Old avatar left for reconciliation"),
            }
        }

        info!(channel_id, reference = %stored.reference, "Channel avatar replaced");
        Ok(stored.reference)
    }
}

fn require_image(original_name: &str) -> VidResult<()> {
    let mime = mime_guess::from_path(original_name).first_or_octet_stream();
    if mime.type_() == mime_guess::mime::IMAGE {
        Ok(())
    } else {
        Err(VidError::Validation(format!(
            "Expected an image file, got {}",
            original_name
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{self, TestMedia};

    fn upload(channel_id: i64, video: Option<UploadPayload>) -> VideoUpload {
        VideoUpload {
            channel_id,
            title: "T".to_string(),
            description: Some("D".to_string()),
            duration: None,
            video,
            thumbnail: None,
        }
    }

    #[tokio::test]
    async fn test_upload_round_trip() {
        let media = TestMedia::new().await;
        let channel_id = media.channel_id;
        let payload = vec![9u8; 1024];

        let uploaded = media
            .uploads
            .upload_video(upload(channel_id, Some(UploadPayload::from_bytes("movie.mp4", payload.clone()))))
            .await
            .unwrap();

        assert!(uploaded.blob_reference.starts_with("videos/"));
        assert_eq!(uploaded.thumbnail_reference, "thumbnails/default.jpg");
        assert_eq!(
            media.blobs.read(&uploaded.blob_reference).await.unwrap(),
            Some(payload)
        );

        let view = media.queries.get_video(uploaded.video_id, None).await.unwrap().unwrap();
        assert_eq!(view.title, "T");
        assert_eq!(view.blob_reference, uploaded.blob_reference);
    }

    #[tokio::test]
    async fn test_missing_file_creates_nothing() {
        let media = TestMedia::new().await;

        let err = media
            .uploads
            .upload_video(upload(media.channel_id, None))
            .await
            .unwrap_err();

        assert!(matches!(err, VidError::NoFileProvided));
        assert_eq!(media.backend.len().await, 0);
        assert_eq!(testutil::count_videos(&media.pool).await, 0);
    }

    #[tokio::test]
    async fn test_oversized_upload_rejected() {
        let media = TestMedia::with_limit(512).await;

        let err = media
            .uploads
            .upload_video(upload(media.channel_id, Some(UploadPayload::from_bytes("big.mp4", vec![0u8; 513]))))
            .await
            .unwrap_err();

        assert!(err.is_storage_error());
        assert_eq!(media.backend.len().await, 0);
        assert_eq!(testutil::count_videos(&media.pool).await, 0);
    }

    #[tokio::test]
    async fn test_unknown_channel_rejected_before_write() {
        let media = TestMedia::new().await;

        let err = media
            .uploads
            .upload_video(upload(999, Some(UploadPayload::from_bytes("a.mp4", vec![1, 2, 3]))))
            .await
            .unwrap_err();

        assert!(matches!(err, VidError::NotFound(_)));
        assert_eq!(media.backend.len().await, 0);
    }

    #[tokio::test]
    async fn test_blank_title_rejected() {
        let media = TestMedia::new().await;
        let mut request = upload(media.channel_id, Some(UploadPayload::from_bytes("a.mp4", vec![1])));
        request.title = "   ".to_string();

        assert!(matches!(
            media.uploads.upload_video(request).await,
            Err(VidError::Validation(_))
        ));
        assert_eq!(media.backend.len().await, 0);
    }

    #[tokio::test]
    async fn test_failed_insert_leaves_blob_and_surfaces_error() {
        let media = TestMedia::new().await;
        sqlx::query(
            "CREATE TRIGGER reject_videos BEFORE INSERT ON videos BEGIN SELECT RAISE(ABORT, 'store unavailable'); END",
        )
        .execute(&media.pool)
        .await
        .unwrap();

        let err = media
            .uploads
            .upload_video(upload(media.channel_id, Some(UploadPayload::from_bytes("a.mp4", vec![1, 2]))))
            .await
            .unwrap_err();

        assert!(matches!(err, VidError::Database(_)));
        assert_eq!(media.backend.len().await, 1);
        assert_eq!(testutil::count_videos(&media.pool).await, 0);
    }

    #[tokio::test]
    async fn test_custom_thumbnail_stored() {
        let media = TestMedia::new().await;
        let mut request = upload(media.channel_id, Some(UploadPayload::from_bytes("a.mp4", vec![1])));
        request.thumbnail = Some(UploadPayload::from_bytes("cover.png", vec![2]));

        let uploaded = media.uploads.upload_video(request).await.unwrap();
        assert!(uploaded.thumbnail_reference.starts_with("thumbnails/"));
        assert_ne!(uploaded.thumbnail_reference, "thumbnails/default.jpg");
        assert!(media.blobs.exists(&uploaded.thumbnail_reference).await.unwrap());
    }

    #[tokio::test]
    async fn test_avatar_replacement_deletes_previous() {
        let media = TestMedia::new().await;

        let first = media
            .uploads
            .replace_channel_avatar(media.channel_id, Some(UploadPayload::from_bytes("a.png", vec![1])))
            .await
            .unwrap();
        let second = media
            .uploads
            .replace_channel_avatar(media.channel_id, Some(UploadPayload::from_bytes("b.png", vec![2])))
            .await
            .unwrap();

        assert!(!media.blobs.exists(&first).await.unwrap());
        assert!(media.blobs.exists(&second).await.unwrap());

        assert!(matches!(
            media
                .uploads
                .replace_channel_avatar(media.channel_id, Some(UploadPayload::from_bytes("c.exe", vec![3])))
                .await,
            Err(VidError::Validation(_))
        ));
    }
}
