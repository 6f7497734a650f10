//! Capture and replay route handlers.

use std::time::Instant;

use axum::body::Body;
use axum::extract::{Path, Request, State};
use axum::http::header::{CONTENT_DISPOSITION, CONTENT_LENGTH, CONTENT_TYPE};
use axum::http::request::Parts;
use axum::http::HeaderValue;
use axum::response::Response;
use axum::Json;
use futures_util::TryStreamExt;
use serde::Serialize;

use crate::drop::{DownloadName, DropId};
use crate::http::error::DropError;
use crate::http::server::AppState;
use crate::observability::metrics;
use crate::storage::DropStore;
use crate::wire::{parse_request, serialize_request, Framing};

/// Body of a successful capture.
#[derive(Debug, Serialize)]
pub struct CaptureResponse {
    pub id: DropId,
}

/// `POST /deaddrop`: store the whole request, return its ID.
pub async fn capture_drop(
    State(state): State<AppState>,
    request: Request,
) -> Result<Json<CaptureResponse>, DropError> {
    let start = Instant::now();
    let id = DropId::generate();
    let (parts, body) = request.into_parts();

    tracing::debug!(drop_id = %id, method = %parts.method, "Capturing drop");

    match capture(state.store.as_ref(), &id, &parts, body).await {
        Ok(body_bytes) => {
            metrics::record_capture("ok", body_bytes, start);
            Ok(Json(CaptureResponse { id }))
        }
        Err(e) => {
            tracing::warn!(drop_id = %id, error = %e, "Capture failed");
            metrics::record_capture(e.outcome(), 0, start);
            Err(e)
        }
    }
}

async fn capture(
    store: &dyn DropStore,
    id: &DropId,
    parts: &Parts,
    body: Body,
) -> Result<u64, DropError> {
    let mut sink = store.create(id).await?;
    let body_bytes = serialize_request(parts, body, &mut sink).await?;
    let stored_bytes = sink.publish().await?;

    tracing::info!(drop_id = %id, body_bytes, stored_bytes, "Drop captured");
    Ok(body_bytes)
}

/// `GET /deaddrop/{id}`: stream a drop's body back as a download.
pub async fn replay_drop(
    State(state): State<AppState>,
    Path(segment): Path<String>,
) -> Result<Response, DropError> {
    let start = Instant::now();
    let result = replay(state.store.as_ref(), &segment).await;

    match &result {
        Ok(_) => metrics::record_replay("ok", start),
        Err(e) => metrics::record_replay(e.outcome(), start),
    }
    result
}

async fn replay(store: &dyn DropStore, segment: &str) -> Result<Response, DropError> {
    let id = DropId::from_path_segment(segment).map_err(|e| {
        tracing::debug!(error = %e, "Rejecting drop lookup");
        DropError::NotFound
    })?;

    let reader = store.open(&id).await?;
    let request = parse_request(reader).await?;

    let name = DownloadName::derive(&id, request.headers());
    let content_type = request.headers().get(CONTENT_TYPE).cloned();
    let content_length = match Framing::from_headers(request.headers()) {
        Ok(Framing::Length(n)) => Some(HeaderValue::from(n)),
        _ => None,
    };

    tracing::info!(
        drop_id = %id,
        filename = name.filename(),
        content_type = ?content_type,
        "Replaying drop"
    );

    let stream_id = id.clone();
    let body = request.into_body().inspect_err(move |e| {
        tracing::error!(drop_id = %stream_id, error = %e, "Replay stream aborted");
    });

    let mut response = Response::new(Body::from_stream(body));
    let headers = response.headers_mut();
    if let Some(content_type) = content_type {
        headers.insert(CONTENT_TYPE, content_type);
    }
    if let Some(content_length) = content_length {
        headers.insert(CONTENT_LENGTH, content_length);
    }
    headers.insert(CONTENT_DISPOSITION, name.content_disposition());

    Ok(response)
}
