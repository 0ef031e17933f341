/// Deletion/consistency engine
///
/// Blobs are always removed before the rows that reference them. An
/// interruption between the two steps leaves a row whose blob is gone, which
/// read paths tolerate and the sweep detaches; it never leaves an
/// unreachable blob behind.
use crate::{
    blob_store::{BlobReference, BlobStore, DeleteOutcome},
    catalog::{ChannelManager, VideoRepository},
    config::MediaConfig,
    db::models::Video,
    error::{VidError, VidResult},
};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

const MAX_CHANNEL_PURGE_ROUNDS: usize = 5;

/// What a deletion actually removed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeletionReport {
    pub videos_removed: u64,
    pub blobs_removed: u64,
}

pub struct DeletionEngine {
    videos: VideoRepository,
    channels: ChannelManager,
    blobs: Arc<BlobStore>,
    media: MediaConfig,
}

impl DeletionEngine {
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

    /// Delete one video and the blobs it owns; a missing id is a no-op
    pub async fn delete_video(&self, video_id: i64) -> VidResult<DeletionReport> {
        let Some(video) = self.videos.get(video_id).await? else {
            return Ok(DeletionReport::default());
        };

        let blobs_removed = self.purge_video_blobs(&video).await?;
        let outcome = self.videos.delete(video_id).await?;

        info!(video_id, blobs_removed, "Video deleted");

        Ok(DeletionReport {
            videos_removed: outcome.rows_affected,
            blobs_removed,
        })
    }

    /// Delete a channel, every video it owns, and all their blobs
    pub async fn delete_channel(&self, channel_id: i64) -> VidResult<DeletionReport> {
        let Some(channel) = self.channels.get(channel_id).await? else {
            return Ok(DeletionReport::default());
        };

        let mut report = DeletionReport::default();

        if let Some(avatar) = channel.avatar.as_deref() {
            if self.is_owned(avatar, &self.media.default_avatar) {
                report.blobs_removed += self.remove_blob(avatar).await?;
            }
        }

        // Uploads may land while we purge; only rows whose blobs were removed
        // are deleted, and the channel row goes once none remain
        for _ in 0..MAX_CHANNEL_PURGE_ROUNDS {
            for video in self.videos.all_for_channel(channel_id).await? {
                report.blobs_removed += self.purge_video_blobs(&video).await?;
                report.videos_removed += self.videos.delete(video.id).await?.rows_affected;
            }

            if self.channels.delete_if_empty(channel_id).await?.rows_affected > 0
                || !self.channels.exists(channel_id).await?
            {
                info!(
                    channel_id,
                    videos_removed = report.videos_removed,
                    blobs_removed = report.blobs_removed,
                    "Channel deleted"
                );
                return Ok(report);
            }
        }

        Err(VidError::Conflict(format!(
            "Channel {} is still receiving uploads",
            channel_id
        )))
    }

    async fn purge_video_blobs(&self, video: &Video) -> VidResult<u64> {
        let mut removed = 0;

        if let Some(reference) = video.video_url.as_deref() {
            removed += self.remove_blob(reference).await?;
        }

        if self.is_owned(&video.thumbnail, &self.media.default_thumbnail) {
            removed += self.remove_blob(&video.thumbnail).await?;
        }

        Ok(removed)
    }

    async fn remove_blob(&self, reference: &str) -> VidResult<u64> {
        match self.blobs.delete(reference).await? {
            DeleteOutcome::Deleted => Ok(1),
            DeleteOutcome::NotFound => Ok(0),
        }
    }

    /// Shared defaults and foreign strings are never deleted
    fn is_owned(&self, reference: &str, shared_default: &str) -> bool {
        if reference == shared_default {
            return false;
        }
        if BlobReference::parse(reference).is_err() {
            warn!(reference, "Skipping unrecognised blob reference");
            return false;
        }
        true
    }
}
