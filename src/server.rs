/// HTTP server setup and routing
use crate::{
    context::AppContext,
    error::{VidError, VidResult},
};
use axum::{
    http::{header, Extensions, HeaderMap, Method, StatusCode, Version},
    response::Json,
    routing::get,
    Router,
};
use serde_json::json;
use tower_http::{
    compression::{
        predicate::{NotForContentType, Predicate},
        CompressionLayer, DefaultPredicate,
    },
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::info;

/// Build the main application router
/// Returns Router<()> because state is already provided
pub fn build_router(ctx: AppContext) -> Router {
    // Create CORS layer
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, header::RANGE, header::IF_NONE_MATCH]);

    let api = crate::api::routes(&ctx.config);

    Router::new()
        // Health check endpoint
        .route("/health", get(health_check))
        .merge(api)
        // Provide state - converts Router<AppContext> to Router<()>
        .with_state(ctx)
        .layer(cors)
        .layer(CompressionLayer::new().compress_when(compress_predicate()))
        .layer(TraceLayer::new_for_http())
        .fallback(not_found)
}

/// Compress API payloads only; media bodies are already compressed and
/// `Content-Range` must describe the bytes actually sent
fn compress_predicate() -> impl Predicate {
    DefaultPredicate::new()
        .and(NotForContentType::new("video/"))
        .and(NotForContentType::new("audio/"))
        .and(not_partial_content)
}

fn not_partial_content(status: StatusCode, _: Version, _: &HeaderMap, _: &Extensions) -> bool {
    status != StatusCode::PARTIAL_CONTENT
}

/// Health check handler
async fn health_check() -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// 404 handler
async fn not_found() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "error": "NotFound",
            "message": "Endpoint not found"
        })),
    )
}

/// Start the HTTP server
pub async fn serve(ctx: AppContext) -> VidResult<()> {
    let addr = format!("{}:{}", ctx.config.service.hostname, ctx.config.service.port);

    info!("vidshare listening on {}", addr);
    info!("   Service URL: {}", ctx.service_url());
    info!("   Upload limit: {} bytes", ctx.config.media.max_upload_size);

    let app = build_router(ctx);

    // Create TCP listener
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| VidError::Internal(format!("Failed to bind to {}: {}", addr, e)))?;

    axum::serve(listener, app)
        .await
        .map_err(|e| VidError::Internal(format!("Server error: {}", e)))?;

    Ok(())
}
