/// Read paths: listing, search, recommendations and single fetch
///
/// Only ready rows are ever returned.
use crate::{
    catalog::{SocialManager, VideoRepository},
    db::models::VideoView,
    error::VidResult,
};
use tracing::warn;

pub const MAX_RECOMMEND_LIMIT: i64 = 100;

pub struct VideoQueries {
    videos: VideoRepository,
    social: SocialManager,
    recommend_limit: i64,
}

impl VideoQueries {
    pub fn new(videos: VideoRepository, social: SocialManager, recommend_limit: i64) -> Self {
        Self {
            videos,
            social,
            recommend_limit,
        }
    }

    /// Newest first
    pub async fn list(&self) -> VidResult<Vec<VideoView>> {
        self.videos.list_ready().await
    }

    pub async fn list_for_channel(&self, channel_id: i64) -> VidResult<Vec<VideoView>> {
        self.videos.list_ready_for_channel(channel_id).await
    }

    /// Case-insensitive substring match on title, description or channel name
    pub async fn search(&self, term: &str) -> VidResult<Vec<VideoView>> {
        let term = term.trim();
        if term.is_empty() {
            return self.list().await;
        }

        self.videos.search(&format!("%{}%", escape_like(term))).await
    }

    /// Ranked by views then likes, truncated to `limit` (default from config)
    pub async fn recommend(&self, limit: Option<i64>) -> VidResult<Vec<VideoView>> {
        let limit = limit
            .unwrap_or(self.recommend_limit)
            .clamp(1, MAX_RECOMMEND_LIMIT);

        self.videos.most_popular(limit).await
    }

    /// Fetch one video, counting the fetch as a view
    ///
    /// Every call increments `views` by exactly one; repeat viewers are not deduplicated.
    pub async fn get_video(&self, video_id: i64, viewer: Option<i64>) -> VidResult<Option<VideoView>> {
        if self.videos.increment_views(video_id).await?.rows_affected == 0 {
            return Ok(None);
        }

        if let Some(user_id) = viewer {
            if let Err(e) = self.social.record_view(user_id, video_id).await {
                warn!(user_id, video_id, error = %e, "Failed to record watch history");
            }
        }

        self.videos.view(video_id).await
    }
}

/// Escape LIKE wildcards so the term matches literally (escape char `\`)
fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
