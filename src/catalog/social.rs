/// Subscriptions, likes, messages and watch history
///
/// Membership rows and their denormalized counters are written in one
/// transaction so `channels.subscribers` and `videos.likes` always equal the
/// row counts.
use crate::{
    db::models::{HistoryEntry, MessageView},
    error::{VidError, VidResult},
};
use chrono::Utc;
use sqlx::SqlitePool;

const MAX_MESSAGE_LEN: usize = 4000;

#[derive(Clone)]
pub struct SocialManager {
    db: SqlitePool,
}

impl SocialManager {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    async fn user_exists(&self, user_id: i64) -> VidResult<bool> {
        let exists = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE id = ?1)")
            .bind(user_id)
            .fetch_one(&self.db)
            .await?;
        Ok(exists)
    }

    /// Subscribe a user to a channel, returning the new subscriber count
    pub async fn subscribe(&self, user_id: i64, channel_id: i64) -> VidResult<i64> {
        if !self.user_exists(user_id).await? {
            return Err(VidError::NotFound(format!("User {} not found", user_id)));
        }

        let mut tx = self.db.begin().await?;

        // Write first so the transaction takes the write lock up front
        let inserted = sqlx::query(
            r#"
            INSERT OR IGNORE INTO subscriptions (user_id, channel_id, created_at)
            SELECT ?1, ?2, ?3 WHERE EXISTS (SELECT 1 FROM channels WHERE id = ?2)
            "#,
        )
        .bind(user_id)
        .bind(channel_id)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        if inserted.rows_affected() == 0 {
            let channel_exists: bool =
                sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM channels WHERE id = ?1)")
                    .bind(channel_id)
                    .fetch_one(&mut *tx)
                    .await?;
            return Err(if channel_exists {
                VidError::Conflict("Already subscribed".to_string())
            } else {
                VidError::NotFound(format!("Channel {} not found", channel_id))
            });
        }

        let count: i64 = sqlx::query_scalar(
            "UPDATE channels SET subscribers = subscribers + 1 WHERE id = ?1 RETURNING subscribers",
        )
        .bind(channel_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::debug!(user_id, channel_id, subscribers = count, "Subscribed");
        Ok(count)
    }

    /// Remove a subscription; a non-member is a no-op. Returns whether a row was removed.
    pub async fn unsubscribe(&self, user_id: i64, channel_id: i64) -> VidResult<bool> {
        let mut tx = self.db.begin().await?;

        let removed = sqlx::query("DELETE FROM subscriptions WHERE user_id = ?1 AND channel_id = ?2")
            .bind(user_id)
            .bind(channel_id)
            .execute(&mut *tx)
            .await?
            .rows_affected()
            > 0;

        if removed {
            sqlx::query(
                "UPDATE channels SET subscribers = subscribers - 1 WHERE id = ?1 AND subscribers > 0",
            )
            .bind(channel_id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(removed)
    }

    /// Like a ready video, returning the new like count
    pub async fn like(&self, user_id: i64, video_id: i64) -> VidResult<i64> {
        if !self.user_exists(user_id).await? {
            return Err(VidError::NotFound(format!("User {} not found", user_id)));
        }

        let mut tx = self.db.begin().await?;

        let inserted = sqlx::query(
            r#"
            INSERT OR IGNORE INTO likes (user_id, video_id, created_at)
            SELECT ?1, ?2, ?3 WHERE EXISTS (SELECT 1 FROM videos WHERE id = ?2 AND status = 'ready')
            "#,
        )
        .bind(user_id)
        .bind(video_id)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        if inserted.rows_affected() == 0 {
            let video_ready: bool = sqlx::query_scalar(
                "SELECT EXISTS(SELECT 1 FROM videos WHERE id = ?1 AND status = 'ready')",
            )
            .bind(video_id)
            .fetch_one(&mut *tx)
            .await?;
            return Err(if video_ready {
                VidError::Conflict("Already liked".to_string())
            } else {
                VidError::NotFound(format!("Video {} not found", video_id))
            });
        }

        let count: i64 =
            sqlx::query_scalar("UPDATE videos SET likes = likes + 1 WHERE id = ?1 RETURNING likes")
                .bind(video_id)
                .fetch_one(&mut *tx)
                .await?;

        tx.commit().await?;
        Ok(count)
    }

    /// Withdraw a like; no-op if absent
    pub async fn unlike(&self, user_id: i64, video_id: i64) -> VidResult<bool> {
        let mut tx = self.db.begin().await?;

        let removed = sqlx::query("DELETE FROM likes WHERE user_id = ?1 AND video_id = ?2")
            .bind(user_id)
            .bind(video_id)
            .execute(&mut *tx)
            .await?
            .rows_affected()
            > 0;

        if removed {
            sqlx::query("UPDATE videos SET likes = likes - 1 WHERE id = ?1 AND likes > 0")
                .bind(video_id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(removed)
    }

    /// Send a direct message, returning its id
    pub async fn send_message(&self, from_user: i64, to_user: i64, text: &str) -> VidResult<i64> {
        let text = text.trim();
        if text.is_empty() {
            return Err(VidError::Validation("Message text is required".to_string()));
        }
        if text.chars().count() > MAX_MESSAGE_LEN {
            return Err(VidError::Validation(format!(
                "Message exceeds {} characters",
                MAX_MESSAGE_LEN
            )));
        }

        for user_id in [from_user, to_user] {
            if !self.user_exists(user_id).await? {
                return Err(VidError::NotFound(format!("User {} not found", user_id)));
            }
        }

        let result = sqlx::query(
            "INSERT INTO messages (from_user, to_user, text, created_at) VALUES (?1, ?2, ?3, ?4)",
        )
        .bind(from_user)
        .bind(to_user)
        .bind(text)
        .bind(Utc::now())
        .execute(&self.db)
        .await?;

        Ok(result.last_insert_rowid())
    }

    /// Messages sent or received by a user, newest first
    pub async fn messages_for_user(&self, user_id: i64) -> VidResult<Vec<MessageView>> {
        let messages = sqlx::query_as::<_, MessageView>(
            r#"
            SELECT m.id, m.from_user, m.to_user, m.text, m.created_at,
                   u1.username AS from_username, u2.username AS to_username
            FROM messages m
            JOIN users u1 ON m.from_user = u1.id
            JOIN users u2 ON m.to_user = u2.id
            WHERE m.from_user = ?1 OR m.to_user = ?1
            ORDER BY m.created_at DESC, m.id DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.db)
        .await?;

        Ok(messages)
    }

    pub async fn record_view(&self, user_id: i64, video_id: i64) -> VidResult<()> {
        sqlx::query("INSERT INTO history (user_id, video_id, watched_at) VALUES (?1, ?2, ?3)")
            .bind(user_id)
            .bind(video_id)
            .bind(Utc::now())
            .execute(&self.db)
            .await?;

        Ok(())
    }

    /// Watch history, newest first
    pub async fn history_for_user(&self, user_id: i64, limit: i64) -> VidResult<Vec<HistoryEntry>> {
        let entries = sqlx::query_as::<_, HistoryEntry>(
            r#"
            SELECT h.video_id, v.title, h.watched_at
            FROM history h
            JOIN videos v ON h.video_id = v.id
            WHERE h.user_id = ?1
            ORDER BY h.watched_at DESC, h.id DESC
            LIMIT ?2
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.db)
        .await?;

        Ok(entries)
    }
}
