/// Video endpoints: upload, fetch, delete, listing and ranking
use crate::{
    api::{
        success,
        upload::{field_text, multipart_error, upload_body_limit, Spool, SpooledFile},
        Success,
    },
    context::AppContext,
    db::models::VideoView,
    error::{VidError, VidResult},
    media::{DeletionReport, UploadedVideo, VideoUpload},
};
use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use tracing::debug;

/// Build video routes
pub fn routes(max_upload_size: u64) -> Router<AppContext> {
    Router::new()
        .route(
            "/api/videos",
            get(list_videos)
                .post(upload_video)
                .layer(upload_body_limit(max_upload_size)),
        )
        .route("/api/videos/:id", get(get_video).delete(delete_video))
        .route("/api/search", get(search_videos))
        .route("/api/recommendations", get(recommend_videos))
}

#[derive(Debug, Deserialize)]
struct ViewerQuery {
    viewer: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct SearchQuery {
    #[serde(default)]
    q: String,
}

#[derive(Debug, Deserialize)]
struct RecommendQuery {
    limit: Option<i64>,
}

/// Text and file parts of an upload form
#[derive(Default)]
struct VideoForm {
    channel_id: Option<String>,
    title: Option<String>,
    description: Option<String>,
    duration: Option<String>,
    video: Option<SpooledFile>,
    thumbnail: Option<SpooledFile>,
}

async fn list_videos(State(ctx): State<AppContext>) -> VidResult<Json<Vec<VideoView>>> {
    Ok(Json(ctx.queries.list().await?))
}

/// Multipart upload; temp files are removed whatever the outcome
async fn upload_video(
    State(ctx): State<AppContext>,
    mut multipart: Multipart,
) -> VidResult<(StatusCode, Json<Success<UploadedVideo>>)> {
    let mut spool = Spool::new(ctx.tmp_dir(), ctx.config.media.max_upload_size);
    let result = receive_video(&ctx, &mut spool, &mut multipart).await;
    spool.cleanup().await;

    let uploaded = result.map_err(VidError::into_upload_failure)?;
    Ok((StatusCode::CREATED, success(uploaded)))
}

async fn receive_video(
    ctx: &AppContext,
    spool: &mut Spool,
    multipart: &mut Multipart,
) -> VidResult<UploadedVideo> {
    let limit = ctx.config.media.max_upload_size;
    let mut form = VideoForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(e, limit))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "channelId" => form.channel_id = Some(field_text(field, limit).await?),
            "title" => form.title = Some(field_text(field, limit).await?),
            "description" => form.description = Some(field_text(field, limit).await?),
            "duration" => form.duration = Some(field_text(field, limit).await?),
            "video" => form.video = spool.spool_field(field).await?,
            "thumbnail" => form.thumbnail = spool.spool_field(field).await?,
            other => debug!(field = other, "Ignoring unknown upload field"),
        }
    }

    let video = form.video.ok_or(VidError::NoFileProvided)?;
    let channel_id = parse_required_id(form.channel_id.as_deref(), "channelId")?;
    let duration = match form.duration.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(raw) => Some(
            raw.parse::<i64>()
                .map_err(|_| VidError::Validation("duration must be a whole number of seconds".to_string()))?,
        ),
    };

    let thumbnail = match form.thumbnail {
        Some(file) => Some(file.into_payload().await?),
        None => None,
    };

    ctx.uploads
        .upload_video(VideoUpload {
            channel_id,
            title: form.title.unwrap_or_default(),
            description: form.description,
            duration,
            video: Some(video.into_payload().await?),
            thumbnail,
        })
        .await
}

fn parse_required_id(raw: Option<&str>, field: &str) -> VidResult<i64> {
    raw.map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| VidError::Validation(format!("{} is required", field)))?
        .parse::<i64>()
        .map_err(|_| VidError::Validation(format!("{} must be an integer", field)))
}

/// Fetch one video; counts as a view
async fn get_video(
    State(ctx): State<AppContext>,
    Path(id): Path<i64>,
    Query(query): Query<ViewerQuery>,
) -> VidResult<Json<VideoView>> {
    let video = ctx
        .queries
        .get_video(id, query.viewer)
        .await?
        .ok_or_else(|| VidError::NotFound(format!("Video {} not found", id)))?;

    Ok(Json(video))
}

async fn delete_video(
    State(ctx): State<AppContext>,
    Path(id): Path<i64>,
) -> VidResult<Json<Success<DeletionReport>>> {
    let report = ctx.deletions.delete_video(id).await?;
    Ok(success(report))
}

async fn search_videos(
    State(ctx): State<AppContext>,
    Query(query): Query<SearchQuery>,
) -> VidResult<Json<Vec<VideoView>>> {
    Ok(Json(ctx.queries.search(&query.q).await?))
}

async fn recommend_videos(
    State(ctx): State<AppContext>,
    Query(query): Query<RecommendQuery>,
) -> VidResult<Json<Vec<VideoView>>> {
    Ok(Json(ctx.queries.recommend(query.limit).await?))
}
