/// Blob serving at `/media/<category>/<name>`
use crate::{
    blob_store::BlobReference,
    context::AppContext,
    error::{VidError, VidResult},
};
use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use tokio::io::AsyncReadExt;
use tokio_util::io::ReaderStream;

/// Build media routes
pub fn routes() -> Router<AppContext> {
    Router::new().route("/media/*reference", get(get_media))
}

/// Stream a blob
///
/// Supports If-None-Match and single `bytes=` ranges. Blob names are never
/// reused, so the reference doubles as the ETag.
async fn get_media(
    State(ctx): State<AppContext>,
    Path(reference): Path<String>,
    headers: HeaderMap,
) -> VidResult<Response> {
    let reference = BlobReference::parse(&reference)
        .map_err(|_| VidError::NotFound(format!("Media not found: {}", reference)))?
        .to_string();

    let etag = header_value(&format!("\"{}\"", reference))?;

    let mut response_headers = HeaderMap::new();
    response_headers.insert(header::ETAG, etag.clone());
    response_headers.insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static("public, max-age=31536000, immutable"),
    );

    // Check If-None-Match header for 304 Not Modified
    if headers.get(header::IF_NONE_MATCH) == Some(&etag) {
        if !ctx.blob_store.exists(&reference).await? {
            return Err(VidError::NotFound(format!("Media not found: {}", reference)));
        }
        return Ok((StatusCode::NOT_MODIFIED, response_headers).into_response());
    }

    let (mut reader, total_size, mime_type) = ctx
        .blob_store
        .open(&reference)
        .await?
        .ok_or_else(|| VidError::NotFound(format!("Media not found: {}", reference)))?;

    response_headers.insert(header::CONTENT_TYPE, header_value(&mime_type)?);
    response_headers.insert(header::ACCEPT_RANGES, HeaderValue::from_static("bytes"));

    let range = headers
        .get(header::RANGE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| parse_range(v, total_size));

    if let Some((start, end)) = range {
        let length = end - start + 1;

        // Skip to the start of the range
        tokio::io::copy(&mut (&mut reader).take(start), &mut tokio::io::sink()).await?;

        response_headers.insert(header::CONTENT_LENGTH, HeaderValue::from(length));
        response_headers.insert(
            header::CONTENT_RANGE,
            header_value(&format!("bytes {}-{}/{}", start, end, total_size))?,
        );

        let body = Body::from_stream(ReaderStream::new(reader.take(length)));
        return Ok((StatusCode::PARTIAL_CONTENT, response_headers, body).into_response());
    }

    response_headers.insert(header::CONTENT_LENGTH, HeaderValue::from(total_size));
    let body = Body::from_stream(ReaderStream::new(reader));
    Ok((StatusCode::OK, response_headers, body).into_response())
}

fn header_value(value: &str) -> VidResult<HeaderValue> {
    HeaderValue::from_str(value)
        .map_err(|e| VidError::Internal(format!("Invalid header value {:?}: {}", value, e)))
}

/// Parse HTTP Range header
///
/// Returns (start, end) inclusive byte positions, or None if invalid
fn parse_range(range_header: &str, total_size: u64) -> Option<(u64, u64)> {
    // Expected format: "bytes=start-end" or "bytes=start-" or "bytes=-suffix"
    let range_spec = range_header.trim().strip_prefix("bytes=")?;
    if total_size == 0 {
        return None;
    }

    let (start_str, end_str) = range_spec.split_once('-')?;
    let last = total_size - 1;

    match (start_str.trim(), end_str.trim()) {
        // Suffix range: "bytes=-500" (last 500 bytes)
        ("", suffix) => {
            let suffix = suffix.parse::<u64>().ok().filter(|s| *s > 0)?;
            Some((total_size.saturating_sub(suffix), last))
        }
        // Open-ended range: "bytes=500-"
        (start, "") => {
            let start = start.parse::<u64>().ok()?;
            (start < total_size).then_some((start, last))
        }
        (start, end) => {
            let start = start.parse::<u64>().ok()?;
            let end = end.parse::<u64>().ok()?.min(last);
            (start < total_size && start <= end).then_some((start, end))
        }
    }
}
