/// Metadata store row models
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Registered user
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub avatar: String,
    pub created_at: DateTime<Utc>,
}

/// Channel owned by a user
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Channel {
    pub id: i64,
    pub user_id: i64,
    pub name: String,
    pub description: Option<String>,
    pub avatar: Option<String>,
    pub subscribers: i64,
    pub created_at: DateTime<Utc>,
}

/// Whether a video row has playable content behind it
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type, Serialize, Deserialize)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum VideoStatus {
    /// Metadata exists but no blob backs it
    Pending,
    /// Blob committed and referenced
    Ready,
}

/// Raw video row
#[derive(Debug, Clone, FromRow)]
pub struct Video {
    pub id: i64,
    pub channel_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub video_url: Option<String>,
    pub thumbnail: String,
    pub status: VideoStatus,
    pub views: i64,
    pub likes: i64,
    pub duration: Option<i64>,
    pub created_at: DateTime<Utc>,
}

/// Reader-facing video joined with its channel
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoView {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub blob_reference: String,
    pub thumbnail_reference: String,
    pub views: i64,
    pub likes: i64,
    pub duration: Option<i64>,
    pub channel_id: i64,
    pub channel_name: String,
    pub channel_avatar_reference: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Direct message with both usernames resolved
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageView {
    pub id: i64,
    pub from_user: i64,
    pub to_user: i64,
    pub text: String,
    pub created_at: DateTime<Utc>,
    pub from_username: String,
    pub to_username: String,
}

/// Watch history entry
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub video_id: i64,
    pub title: String,
    pub watched_at: DateTime<Utc>,
}
