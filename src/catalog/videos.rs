/// Video rows in the metadata store
use crate::{
    db::{
        models::{Video, VideoView},
        ExecOutcome,
    },
    error::VidResult,
};
use chrono::Utc;
use sqlx::SqlitePool;

/// Joined projection for read paths; only rows with playable content
const VIEW_SELECT: &str = r#"
    SELECT v.id, v.title, v.description,
           v.video_url AS blob_reference, v.thumbnail AS thumbnail_reference,
           v.views, v.likes, v.duration,
           c.id AS channel_id, c.name AS channel_name, c.avatar AS channel_avatar_reference,
           v.created_at
    FROM videos v
    JOIN channels c ON v.channel_id = c.id
    WHERE v.status = 'ready' AND v.video_url IS NOT NULL
"#;

const VIDEO_COLUMNS: &str = "id, channel_id, title, description, video_url, thumbnail, status, views, likes, duration, created_at";

/// Fields of a freshly uploaded video
#[derive(Debug, Clone)]
pub struct NewVideo {
    pub channel_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub video_url: String,
    pub thumbnail: String,
    pub duration: Option<i64>,
}

#[derive(Clone)]
pub struct VideoRepository {
    db: SqlitePool,
}

impl VideoRepository {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Insert a ready row with zeroed counters
    pub async fn insert(&self, video: &NewVideo) -> VidResult<ExecOutcome> {
        let result = sqlx::query(
            r#"
            INSERT INTO videos (channel_id, title, description, video_url, thumbnail, status, views, likes, duration, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, 'ready', 0, 0, ?6, ?7)
            "#,
        )
        .bind(video.channel_id)
        .bind(&video.title)
        .bind(&video.description)
        .bind(&video.video_url)
        .bind(&video.thumbnail)
        .bind(video.duration)
        .bind(Utc::now())
        .execute(&self.db)
        .await?;

        Ok(result.into())
    }

    pub async fn get(&self, id: i64) -> VidResult<Option<Video>> {
        let video = sqlx::query_as::<_, Video>(&format!(
            "SELECT {} FROM videos WHERE id = ?1",
            VIDEO_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await?;

        Ok(video)
    }

    /// All rows of a channel regardless of status
    pub async fn all_for_channel(&self, channel_id: i64) -> VidResult<Vec<Video>> {
        let videos = sqlx::query_as::<_, Video>(&format!(
            "SELECT {} FROM videos WHERE channel_id = ?1 ORDER BY id",
            VIDEO_COLUMNS
        ))
        .bind(channel_id)
        .fetch_all(&self.db)
        .await?;

        Ok(videos)
    }

    pub async fn delete(&self, id: i64) -> VidResult<ExecOutcome> {
        let result = sqlx::query("DELETE FROM videos WHERE id = ?1")
            .bind(id)
            .execute(&self.db)
            .await?;

        Ok(result.into())
    }

    /// Single-statement increment; concurrent viewers never lose an update
    pub async fn increment_views(&self, id: i64) -> VidResult<ExecOutcome> {
        let result = sqlx::query(
            "UPDATE videos SET views = views + 1 WHERE id = ?1 AND status = 'ready'",
        )
        .bind(id)
        .execute(&self.db)
        .await?;

        Ok(result.into())
    }

    pub async fn view(&self, id: i64) -> VidResult<Option<VideoView>> {
        let video = sqlx::query_as::<_, VideoView>(&format!("{} AND v.id = ?1", VIEW_SELECT))
            .bind(id)
            .fetch_optional(&self.db)
            .await?;

        Ok(video)
    }

    /// Newest first
    pub async fn list_ready(&self) -> VidResult<Vec<VideoView>> {
        let videos = sqlx::query_as::<_, VideoView>(&format!(
            "{} ORDER BY v.created_at DESC, v.id DESC",
            VIEW_SELECT
        ))
        .fetch_all(&self.db)
        .await?;

        Ok(videos)
    }

    pub async fn list_ready_for_channel(&self, channel_id: i64) -> VidResult<Vec<VideoView>> {
        let videos = sqlx::query_as::<_, VideoView>(&format!(
            "{} AND v.channel_id = ?1 ORDER BY v.created_at DESC, v.id DESC",
            VIEW_SELECT
        ))
        .bind(channel_id)
        .fetch_all(&self.db)
        .await?;

        Ok(videos)
    }

    /// Substring match on title, description or channel name
    ///
    /// `pattern` must already be a LIKE pattern escaped with `\`.
    pub async fn search(&self, pattern: &str) -> VidResult<Vec<VideoView>> {
        let videos = sqlx::query_as::<_, VideoView>(&format!(
            r#"{} AND (v.title LIKE ?1 ESCAPE '\' OR v.description LIKE ?1 ESCAPE '\' OR c.name LIKE ?1 ESCAPE '\')
            ORDER BY v.id"#,
            VIEW_SELECT
        ))
        .bind(pattern)
        .fetch_all(&self.db)
        .await?;

        Ok(videos)
    }

    /// Most viewed, then most liked; remaining ties in insertion order
    pub async fn most_popular(&self, limit: i64) -> VidResult<Vec<VideoView>> {
        let videos = sqlx::query_as::<_, VideoView>(&format!(
            "{} ORDER BY v.views DESC, v.likes DESC, v.id ASC LIMIT ?1",
            VIEW_SELECT
        ))
        .bind(limit)
        .fetch_all(&self.db)
        .await?;

        Ok(videos)
    }

    /// Every blob reference held by a video row
    pub async fn referenced_blobs(&self) -> VidResult<Vec<String>> {
        let refs = sqlx::query_scalar::<_, String>(
            r#"
            SELECT video_url FROM videos WHERE video_url IS NOT NULL
            UNION
            SELECT thumbnail FROM videos
            "#,
        )
        .fetch_all(&self.db)
        .await?;

        Ok(refs)
    }

    /// `(id, reference)` of every ready row
    pub async fn ready_references(&self) -> VidResult<Vec<(i64, String)>> {
        let rows = sqlx::query_as::<_, (i64, String)>(
            "SELECT id, video_url FROM videos WHERE status = 'ready' AND video_url IS NOT NULL ORDER BY id",
        )
        .fetch_all(&self.db)
        .await?;

        Ok(rows)
    }

    /// Mark a row pending and drop its reference, if it still points at `reference`
    pub async fn detach(&self, id: i64, reference: &str) -> VidResult<ExecOutcome> {
        let result = sqlx::query(
            "UPDATE videos SET status = 'pending', video_url = NULL WHERE id = ?1 AND video_url = ?2",
        )
        .bind(id)
        .bind(reference)
        .execute(&self.db)
        .await?;

        Ok(result.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::VideoStatus;
    use crate::testutil;

    fn new_video(channel_id: i64, title: &str) -> NewVideo {
        NewVideo {
            channel_id,
            title: title.to_string(),
            description: Some("desc".to_string()),
            video_url: format!("videos/{}.mp4", title),
            thumbnail: "thumbnails/default.jpg".to_string(),
            duration: Some(30),
        }
    }

    #[tokio::test]
    async fn test_insert_and_get() {
        let pool = testutil::test_pool().await;
        let (_, channel_id) = testutil::seed_user_and_channel(&pool, "alice").await;
        let repo = VideoRepository::new(pool);

        let outcome = repo.insert(&new_video(channel_id, "first")).await.unwrap();
        assert_eq!(outcome.rows_affected, 1);

        let video = repo.get(outcome.inserted_id).await.unwrap().unwrap();
        assert_eq!(video.title, "first");
        assert_eq!(video.status, VideoStatus::Ready);
        assert_eq!(video.views, 0);
        assert_eq!(video.likes, 0);
        assert_eq!(video.video_url.as_deref(), Some("videos/first.mp4"));
    }

    #[tokio::test]
    async fn test_ready_requires_reference() {
        let pool = testutil::test_pool().await;
        let (_, channel_id) = testutil::seed_user_and_channel(&pool, "alice").await;

        let result = sqlx::query(
            "INSERT INTO videos (channel_id, title, thumbnail, status, created_at) VALUES (?1, 'x', 't', 'ready', ?2)",
        )
        .bind(channel_id)
        .bind(Utc::now())
        .execute(&pool)
        .await;

        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_detach_hides_row_from_reads() {
        let pool = testutil::test_pool().await;
        let (_, channel_id) = testutil::seed_user_and_channel(&pool, "alice").await;
        let repo = VideoRepository::new(pool);

        let id = repo.insert(&new_video(channel_id, "gone")).await.unwrap().inserted_id;
        assert_eq!(repo.list_ready().await.unwrap().len(), 1);

        assert_eq!(repo.detach(id, "videos/other.mp4").await.unwrap().rows_affected, 0);
        assert_eq!(repo.detach(id, "videos/gone.mp4").await.unwrap().rows_affected, 1);

        assert!(repo.list_ready().await.unwrap().is_empty());
        assert!(repo.view(id).await.unwrap().is_none());
        let raw = repo.get(id).await.unwrap().unwrap();
        assert_eq!(raw.status, VideoStatus::Pending);
        assert!(raw.video_url.is_none());
    }

    #[tokio::test]
    async fn test_referenced_blobs() {
        let pool = testutil::test_pool().await;
        let (_, channel_id) = testutil::seed_user_and_channel(&pool, "alice").await;
        let repo = VideoRepository::new(pool);

        repo.insert(&new_video(channel_id, "a")).await.unwrap();
        repo.insert(&new_video(channel_id, "b")).await.unwrap();

        let mut refs = repo.referenced_blobs().await.unwrap();
        refs.sort();
        assert_eq!(
            refs,
            vec!["thumbnails/default.jpg", "videos/a.mp4", "videos/b.mp4"]
        );
    }
}
