/// Subscriptions, likes and direct messages
use crate::{
    api::{ok, success, Empty, Success},
    context::AppContext,
    db::models::MessageView,
    error::VidResult,
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

/// Build social routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/api/subscribe", post(subscribe))
        .route("/api/unsubscribe", post(unsubscribe))
        .route("/api/like", post(like))
        .route("/api/unlike", post(unlike))
        .route("/api/messages", post(send_message))
        .route("/api/messages/:user_id", get(list_messages))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SubscriptionRequest {
    user_id: i64,
    channel_id: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LikeRequest {
    user_id: i64,
    video_id: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MessageRequest {
    from_user: i64,
    to_user: i64,
    text: String,
}

#[derive(Debug, Serialize)]
struct SubscriberCount {
    subscribers: i64,
}

#[derive(Debug, Serialize)]
struct LikeCount {
    likes: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct MessageSent {
    message_id: i64,
}

async fn subscribe(
    State(ctx): State<AppContext>,
    Json(req): Json<SubscriptionRequest>,
) -> VidResult<Json<Success<SubscriberCount>>> {
    let subscribers = ctx.social.subscribe(req.user_id, req.channel_id).await?;
    Ok(success(SubscriberCount { subscribers }))
}

async fn unsubscribe(
    State(ctx): State<AppContext>,
    Json(req): Json<SubscriptionRequest>,
) -> VidResult<Json<Success<Empty>>> {
    ctx.social.unsubscribe(req.user_id, req.channel_id).await?;
    Ok(ok())
}

async fn like(
    State(ctx): State<AppContext>,
    Json(req): Json<LikeRequest>,
) -> VidResult<Json<Success<LikeCount>>> {
    let likes = ctx.social.like(req.user_id, req.video_id).await?;
    Ok(success(LikeCount { likes }))
}

async fn unlike(
    State(ctx): State<AppContext>,
    Json(req): Json<LikeRequest>,
) -> VidResult<Json<Success<Empty>>> {
    ctx.social.unlike(req.user_id, req.video_id).await?;
    Ok(ok())
}

async fn send_message(
    State(ctx): State<AppContext>,
    Json(req): Json<MessageRequest>,
) -> VidResult<(StatusCode, Json<Success<MessageSent>>)> {
    let message_id = ctx
        .social
        .send_message(req.from_user, req.to_user, &req.text)
        .await?;

    Ok((StatusCode::CREATED, success(MessageSent { message_id })))
}

async fn list_messages(
    State(ctx): State<AppContext>,
    Path(user_id): Path<i64>,
) -> VidResult<Json<Vec<MessageView>>> {
    Ok(Json(ctx.social.messages_for_user(user_id).await?))
}
