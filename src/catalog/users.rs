/// User registration and credential checks
use crate::{
    db::models::User,
    error::{conflict_on_unique, VidError, VidResult},
};
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::Utc;
use serde::Deserialize;
use sqlx::SqlitePool;
use validator::Validate;

const USER_COLUMNS: &str = "id, username, email, password_hash, avatar, created_at";

/// Registration payload
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct Registration {
    #[validate(length(min = 3, max = 32, message = "username must be 3-32 characters"))]
    pub username: String,
    #[validate(email(message = "email is not valid"))]
    pub email: String,
    #[validate(length(min = 8, max = 128, message = "password must be 8-128 characters"))]
    pub password: String,
}

pub struct UserManager {
    db: SqlitePool,
    default_avatar: String,
}

impl UserManager {
    pub fn new(db: SqlitePool, default_avatar: String) -> Self {
        Self { db, default_avatar }
    }

    /// Register a new user; duplicate username or email is a conflict
    pub async fn register(&self, registration: &Registration) -> VidResult<User> {
        registration
            .validate()
            .map_err(|e| VidError::Validation(e.to_string()))?;

        let password_hash = hash_password(&registration.password)?;

        let result = sqlx::query(
            r#"
            INSERT INTO users (username, email, password_hash, avatar, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(&registration.username)
        .bind(registration.email.to_lowercase())
        .bind(&password_hash)
        .bind(&self.default_avatar)
        .bind(Utc::now())
        .execute(&self.db)
        .await
        .map_err(|e| conflict_on_unique(e, "User already exists"))?;

        tracing::info!(user_id = result.last_insert_rowid(), username = %registration.username, "Registered user");

        self.get(result.last_insert_rowid())
            .await?
            .ok_or_else(|| VidError::Internal("User vanished after insert".to_string()))
    }

    /// Check credentials by email
    pub async fn login(&self, email: &str, password: &str) -> VidResult<User> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users WHERE email = ?1",
            USER_COLUMNS
        ))
        .bind(email.to_lowercase())
        .fetch_optional(&self.db)
        .await?;

        match user {
            Some(user) if verify_password(password, &user.password_hash)? => Ok(user),
            _ => Err(VidError::Authentication("Invalid credentials".to_string())),
        }
    }

    pub async fn get(&self, id: i64) -> VidResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users WHERE id = ?1",
            USER_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await?;

        Ok(user)
    }

    pub async fn referenced_avatars(&self) -> VidResult<Vec<String>> {
        let refs = sqlx::query_scalar::<_, String>("SELECT DISTINCT avatar FROM users")
            .fetch_all(&self.db)
            .await?;

        Ok(refs)
    }
}

fn hash_password(password: &str) -> VidResult<String> {
    let salt = SaltString::generate(&mut OsRng);

    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| VidError::Internal(format!("Password hashing failed: {}", e)))?
        .to_string();

    Ok(hash)
}

fn verify_password(password: &str, hash: &str) -> VidResult<bool> {
    let parsed = PasswordHash::new(hash)
        .map_err(|e| VidError::Internal(format!("Invalid password hash format: {}", e)))?;

    match Argon2::default().verify_password(password.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(VidError::Internal(format!(
            "Password verification failed: {}",
            e
        ))),
    }
}
