/// Channel management
use crate::{
    db::{models::Channel, ExecOutcome},
    error::{VidError, VidResult},
};
use chrono::Utc;
use sqlx::SqlitePool;

const CHANNEL_COLUMNS: &str = "id, user_id, name, description, avatar, subscribers, created_at";

#[derive(Clone)]
pub struct ChannelManager {
    db: SqlitePool,
}

impl ChannelManager {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Create a channel owned by `user_id`
    pub async fn create(
        &self,
        user_id: i64,
        name: &str,
        description: Option<&str>,
    ) -> VidResult<Channel> {
        let name = name.trim();
        if name.is_empty() {
            return Err(VidError::Validation("Channel name is required".to_string()));
        }

        let owner_exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE id = ?1)")
            .bind(user_id)
            .fetch_one(&self.db)
            .await?;
        if !owner_exists {
            return Err(VidError::NotFound(format!("User {} not found", user_id)));
        }

        let result = sqlx::query(
            r#"
            INSERT INTO channels (user_id, name, description, avatar, subscribers, created_at)
            VALUES (?1, ?2, ?3, NULL, 0, ?4)
            "#,
        )
        .bind(user_id)
        .bind(name)
        .bind(description)
        .bind(Utc::now())
        .execute(&self.db)
        .await?;

        tracing::info!(channel_id = result.last_insert_rowid(), user_id, "Created channel");

        self.get(result.last_insert_rowid())
            .await?
            .ok_or_else(|| VidError::Internal("Channel vanished after insert".to_string()))
    }

    pub async fn get(&self, id: i64) -> VidResult<Option<Channel>> {
        let channel = sqlx::query_as::<_, Channel>(&format!(
            "SELECT {} FROM channels WHERE id = ?1",
            CHANNEL_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await?;

        Ok(channel)
    }

    pub async fn exists(&self, id: i64) -> VidResult<bool> {
        let exists = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM channels WHERE id = ?1)")
            .bind(id)
            .fetch_one(&self.db)
            .await?;

        Ok(exists)
    }

    pub async fn list_for_user(&self, user_id: i64) -> VidResult<Vec<Channel>> {
        let channels = sqlx::query_as::<_, Channel>(&format!(
            "SELECT {} FROM channels WHERE user_id = ?1 ORDER BY id",
            CHANNEL_COLUMNS
        ))
        .bind(user_id)
        .fetch_all(&self.db)
        .await?;

        Ok(channels)
    }

    pub async fn set_avatar(&self, id: i64, reference: &str) -> VidResult<ExecOutcome> {
        let result = sqlx::query("UPDATE channels SET avatar = ?1 WHERE id = ?2")
            .bind(reference)
            .bind(id)
            .execute(&self.db)
            .await?;

        Ok(result.into())
    }

    /// Delete the channel row; dependent rows go with it by cascade
    /// Delete the channel only if it owns no video rows
    pub async fn delete_if_empty(&self, id: i64) -> VidResult<ExecOutcome> {
        let result = sqlx::query(
            "DELETE FROM channels WHERE id = ?1 AND NOT EXISTS (SELECT 1 FROM videos WHERE channel_id = ?1)",
        )
        .bind(id)
            .execute(&self.db)
            .await?;

        Ok(result.into())
    }

    pub async fn referenced_avatars(&self) -> VidResult<Vec<String>> {
        let refs = sqlx::query_scalar::<_, String>(
            "SELECT DISTINCT avatar FROM channels WHERE avatar IS NOT NULL",
        )
        .fetch_all(&self.db)
        .await?;

        Ok(refs)
    }
}
