/// API routes and handlers
pub mod channels;
pub mod media;
pub mod social;
pub mod upload;
pub mod users;
pub mod videos;

use crate::{config::ServerConfig, context::AppContext};
use axum::{Json, Router};
use serde::Serialize;

/// Build API routes
pub fn routes(config: &ServerConfig) -> Router<AppContext> {
    let max_upload_size = config.media.max_upload_size;

    Router::new()
        .merge(users::routes())
        .merge(channels::routes(max_upload_size))
        .merge(videos::routes(max_upload_size))
        .merge(social::routes())
        .merge(media::routes())
}

/// `{ "success": true, ...body }`
#[derive(Debug, Serialize)]
pub struct Success<T: Serialize> {
    success: bool,
    #[serde(flatten)]
    body: T,
}

pub fn success<T: Serialize>(body: T) -> Json<Success<T>> {
    Json(Success {
        success: true,
        body,
    })
}

/// Body for mutations that return nothing else
#[derive(Debug, Serialize)]
pub struct Empty {}

pub fn ok() -> Json<Success<Empty>> {
    success(Empty {})
}
