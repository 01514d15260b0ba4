//! Streaming download handler with conditional-GET support.
//!
//! Per-request lifecycle: parse the `If-Modified-Since` condition, ask
//! the store for a conditional fetch, then branch on the verdict —
//! 404 for a missing object, 304 with `Last-Modified` for a cache hit,
//! or pipeline output streamed out under a 200. All freshness headers are
//! set while building the response value, before any body byte moves.

use crate::{
    conditional::{ConditionalPredicate, format_http_date},
    errors::AppError,
    handlers::AppState,
    models::object::ObjectRecord,
    pipeline::PipelineOutput,
    services::store::FetchVerdict,
};
use axum::{
    body::Body,
    extract::{Path, State},
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::Response,
};
use tracing::debug;

/// Download an object from `/download/{*key}` as a streaming response.
///
/// The backend payload handle is scoped to the response: it is only
/// opened on the fresh path and is dropped when the response body
/// finishes or the client disconnects mid-stream.
pub async fn download_object(
    State(state): State<AppState>,
    Path(key): Path<String>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let predicate = ConditionalPredicate::parse(
        headers
            .get(header::IF_MODIFIED_SINCE)
            .and_then(|v| v.to_str().ok()),
    );

    let verdict = state
        .store
        .fetch_conditional(&state.container, &key, &predicate)
        .await?;

    match verdict {
        FetchVerdict::Missing => {
            // No Last-Modified header on this path.
            Err(AppError::not_found(format!("object `{}` not found", key)))
        }
        FetchVerdict::NotModified(meta) => {
            debug!(key, "serving 304, client copy is current");
            let mut response = Response::new(Body::empty());
            *response.status_mut() = StatusCode::NOT_MODIFIED;
            set_last_modified(response.headers_mut(), &meta);
            Ok(response)
        }
        FetchVerdict::Fresh(file, meta) => {
            let output = state.pipeline.apply(file, &meta).await?;
            let (body, content_type_override) = match output {
                PipelineOutput::Stream(stream) => (Body::from_stream(stream), None),
                PipelineOutput::Buffered { body, content_type } => {
                    (Body::from(body), Some(content_type))
                }
            };

            let mut response = Response::new(body);
            *response.status_mut() = StatusCode::OK;
            set_last_modified(response.headers_mut(), &meta);
            set_content_type(response.headers_mut(), &meta, content_type_override);
            Ok(response)
        }
    }
}

/// Set `Last-Modified` from the metadata snapshot. This header is what
/// prompts the client to send `If-Modified-Since` on its next request.
fn set_last_modified(headers: &mut HeaderMap, meta: &ObjectRecord) {
    if let Ok(value) = HeaderValue::from_str(&format_http_date(meta.last_modified)) {
        headers.insert(header::LAST_MODIFIED, value);
    }
}

/// Set `Content-Type`, preferring a pipeline override, then backend
/// metadata, then a generic binary fallback.
fn set_content_type(headers: &mut HeaderMap, meta: &ObjectRecord, over: Option<&'static str>) {
    let content_type = match over {
        Some(ct) => ct.to_string(),
        None => meta
            .content_type
            .clone()
            .unwrap_or_else(|| "application/octet-stream".into()),
    };
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_str(&content_type)
            .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream")),
    );
}
