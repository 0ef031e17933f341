/// Channel endpoints
use crate::{
    api::{
        success,
        upload::{multipart_error, upload_body_limit, Spool},
        Success,
    },
    context::AppContext,
    db::models::{Channel, VideoView},
    error::{VidError, VidResult},
    media::DeletionReport,
};
use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

/// Build channel routes
pub fn routes(max_upload_size: u64) -> Router<AppContext> {
    Router::new()
        .route("/api/channels", get(list_channels).post(create_channel))
        .route("/api/channels/:id", get(get_channel).delete(delete_channel))
        .route("/api/channels/:id/videos", get(channel_videos))
        .route(
            "/api/channels/:id/avatar",
            post(upload_avatar).layer(upload_body_limit(max_upload_size)),
        )
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateChannelRequest {
    user_id: i64,
    name: String,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OwnerQuery {
    user_id: i64,
}

#[derive(Debug, Serialize)]
struct ChannelBody {
    channel: Channel,
}

#[derive(Debug, Serialize)]
struct AvatarBody {
    avatar: String,
}

async fn create_channel(
    State(ctx): State<AppContext>,
    Json(req): Json<CreateChannelRequest>,
) -> VidResult<(StatusCode, Json<Success<ChannelBody>>)> {
    let channel = ctx
        .channels
        .create(req.user_id, &req.name, req.description.as_deref())
        .await?;

    Ok((StatusCode::CREATED, success(ChannelBody { channel })))
}

async fn list_channels(
    State(ctx): State<AppContext>,
    Query(query): Query<OwnerQuery>,
) -> VidResult<Json<Vec<Channel>>> {
    Ok(Json(ctx.channels.list_for_user(query.user_id).await?))
}

async fn get_channel(
    State(ctx): State<AppContext>,
    Path(id): Path<i64>,
) -> VidResult<Json<Channel>> {
    let channel = ctx
        .channels
        .get(id)
        .await?
        .ok_or_else(|| VidError::NotFound(format!("Channel {} not found", id)))?;

    Ok(Json(channel))
}

/// Remove the channel, its videos and every blob they own
async fn delete_channel(
    State(ctx): State<AppContext>,
    Path(id): Path<i64>,
) -> VidResult<Json<Success<DeletionReport>>> {
    Ok(success(ctx.deletions.delete_channel(id).await?))
}

async fn channel_videos(
    State(ctx): State<AppContext>,
    Path(id): Path<i64>,
) -> VidResult<Json<Vec<VideoView>>> {
    if !ctx.channels.exists(id).await? {
        return Err(VidError::NotFound(format!("Channel {} not found", id)));
    }

    Ok(Json(ctx.queries.list_for_channel(id).await?))
}

/// Replace the avatar from the `avatar` multipart part
async fn upload_avatar(
    State(ctx): State<AppContext>,
    Path(id): Path<i64>,
    mut multipart: Multipart,
) -> VidResult<Json<Success<AvatarBody>>> {
    let limit = ctx.config.media.max_upload_size;
    let mut spool = Spool::new(ctx.tmp_dir(), limit);

    let result = async {
        let mut avatar = None;
        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| multipart_error(e, limit))?
        {
            if field.name() == Some("avatar") {
                avatar = spool.spool_field(field).await?;
            }
        }

        let payload = match avatar {
            Some(file) => Some(file.into_payload().await?),
            None => None,
        };
        ctx.uploads.replace_channel_avatar(id, payload).await
    }
    .await;
    spool.cleanup().await;

    let avatar = result.map_err(VidError::into_upload_failure)?;
    Ok(success(AvatarBody { avatar }))
}
