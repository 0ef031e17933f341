/// Registration, login and watch history
use crate::{
    api::{success, Success},
    catalog::Registration,
    context::AppContext,
    db::models::{HistoryEntry, User},
    error::{VidError, VidResult},
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

const DEFAULT_HISTORY_LIMIT: i64 = 50;
const MAX_HISTORY_LIMIT: i64 = 500;

/// Build user routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/api/register", post(register))
        .route("/api/login", post(login))
        .route("/api/users/:id/history", get(history))
}

#[derive(Debug, Deserialize)]
struct LoginRequest {
    email: String,
    password: String,
}

#[derive(Debug, Deserialize)]
struct HistoryQuery {
    limit: Option<i64>,
}

#[derive(Debug, Serialize)]
struct UserBody {
    user: User,
}

async fn register(
    State(ctx): State<AppContext>,
    Json(req): Json<Registration>,
) -> VidResult<(StatusCode, Json<Success<UserBody>>)> {
    let user = ctx.users.register(&req).await?;
    Ok((StatusCode::CREATED, success(UserBody { user })))
}

async fn login(
    State(ctx): State<AppContext>,
    Json(req): Json<LoginRequest>,
) -> VidResult<Json<Success<UserBody>>> {
    let user = ctx.users.login(&req.email, &req.password).await.map_err(|e| {
        tracing::debug!("login rejected: {}", e);
        e
    })?;

    Ok(success(UserBody { user }))
}

async fn history(
    State(ctx): State<AppContext>,
    Path(user_id): Path<i64>,
    Query(query): Query<HistoryQuery>,
) -> VidResult<Json<Vec<HistoryEntry>>> {
    if ctx.users.get(user_id).await?.is_none() {
        return Err(VidError::NotFound(format!("User {} not found", user_id)));
    }

    let limit = query
        .limit
        .unwrap_or(DEFAULT_HISTORY_LIMIT)
        .clamp(1, MAX_HISTORY_LIMIT);

    Ok(Json(ctx.social.history_for_user(user_id, limit).await?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{self, json_request, send, TestContext};
    use axum::{body::Body, http::Request};
    use serde_json::json;

    #[tokio::test]
    async fn test_register_login_flow() {
        let test = TestContext::new().await;
        let registration = json!({
            "username": "alice",
            "email": "Alice@Example.com",
            "password": "correct horse",
        });

        let (status, body) = send(&test.ctx, json_request("POST", "/api/register", registration.clone())).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["user"]["username"], "alice");
        assert!(body["user"].get("passwordHash").is_none());

        let (status, body) = send(&test.ctx, json_request("POST", "/api/register", registration)).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"], "Conflict");

        let (status, _) = send(
            &test.ctx,
            json_request("POST", "/api/login", json!({ "email": "alice@example.com", "password": "correct horse" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = send(
            &test.ctx,
            json_request("POST", "/api/login", json!({ "email": "alice@example.com", "password": "wrong" })),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "AuthenticationFailed");
    }

    #[tokio::test]
    async fn test_register_rejects_invalid_email() {
        let test = TestContext::new().await;

        let (status, body) = send(
            &test.ctx,
            json_request(
                "POST",
                "/api/register",
                json!({ "username": "bob", "email": "not-an-email", "password": "long enough" }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "ValidationError");
    }

    #[tokio::test]
    async fn test_history_follows_viewer_fetches() {
        let test = TestContext::new().await;
        let (user_id, channel_id) = testutil::seed_user_and_channel(&test.ctx.db, "viewer").await;
        let video_id = testutil::seed_ready_video(&test.ctx.db, channel_id, "Watched", "videos/w.mp4").await;

        send(
            &test.ctx,
            Request::get(format!("/api/videos/{}?viewer={}", video_id, user_id)).body(Body::empty()).unwrap(),
        )
        .await;

        let (status, body) = send(
            &test.ctx,
            Request::get(format!("/api/users/{}/history", user_id)).body(Body::empty()).unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body[0]["videoId"], video_id);
        assert_eq!(body[0]["title"], "Watched");

        let (status, _) = send(
            &test.ctx,
            Request::get("/api/users/999/history").body(Body::empty()).unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
