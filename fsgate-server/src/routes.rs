// SPDX-License-Identifier: AGPL-3.0-or-later
//! HTTP routes and handlers

use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Query, State},
    http::{header, HeaderMap, StatusCode},
    middleware::from_fn,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use fsgate_core::{FileEntry, OpContext, Storage, StorageError};
use futures::TryStreamExt;
use http_body_util::{LengthLimitError, Limited};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::middleware::{log_requests, path_guard, request_id};
use crate::response::{ApiError, MessageBody};

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    storage: Arc<dyn Storage>,
    max_upload_size: u64,
}

impl AppState {
    pub fn new(storage: Arc<dyn Storage>, max_upload_size: u64) -> Self {
        Self { storage, max_upload_size }
    }

    pub fn storage(&self) -> &Arc<dyn Storage> {
        &self.storage
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct PathQuery {
    #[serde(default)]
    pub path: String,
}

impl PathQuery {
    fn required(&self) -> Result<&str, ApiError> {
        if self.path.is_empty() {
            Err(ApiError::BadRequest("path is required".into()))
        } else {
            Ok(&self.path)
        }
    }
}

/// Build the application router.
///
/// Layers run outermost first: request ID, request logging, path guard.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/files", get(list_files).delete(delete_file))
        .route("/api/files/stat", get(stat_file))
        .route("/api/files/content", get(read_file).put(write_file))
        .layer(from_fn(path_guard))
        .layer(from_fn(log_requests))
        .layer(from_fn(request_id))
        .with_state(state)
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn list_files(
    State(state): State<AppState>,
    Query(q): Query<PathQuery>,
) -> Result<Json<Vec<FileEntry>>, ApiError> {
    let entries = state.storage.list(&OpContext::new(), &q.path).await?;
    Ok(Json(entries))
}

async fn stat_file(
    State(state): State<AppState>,
    Query(q): Query<PathQuery>,
) -> Result<Json<FileEntry>, ApiError> {
    let entry = state.storage.stat(&OpContext::new(), &q.path).await?;
    Ok(Json(entry))
}

async fn read_file(
    State(state): State<AppState>,
    Query(q): Query<PathQuery>,
) -> Result<Response, ApiError> {
    let path = q.required()?;
    let stream = state.storage.read(&OpContext::new(), path).await?;
    Ok((
        [(header::CONTENT_TYPE, "application/octet-stream")],
        Body::from_stream(stream),
    )
        .into_response())
}

async fn write_file(
    State(state): State<AppState>,
    Query(q): Query<PathQuery>,
    headers: HeaderMap,
    body: Body,
) -> Result<(StatusCode, Json<MessageBody>), ApiError> {
    let path = q.required()?;

    let declared = headers
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok());
    if declared.is_some_and(|len| len > state.max_upload_size) {
        return Err(ApiError::PayloadTooLarge);
    }

    let limit = usize::try_from(state.max_upload_size).unwrap_or(usize::MAX);
    let data = Body::new(Limited::new(body, limit))
        .into_data_stream()
        .map_err(StorageError::unknown);

    match state.storage.write(&OpContext::new(), path, Box::pin(data)).await {
        Ok(()) => Ok((StatusCode::CREATED, MessageBody::new("file written"))),
        Err(e) if exceeded_body_limit(&e) => Err(ApiError::PayloadTooLarge),
        Err(e) => Err(e.into()),
    }
}

async fn delete_file(
    State(state): State<AppState>,
    Query(q): Query<PathQuery>,
) -> Result<Json<MessageBody>, ApiError> {
    let path = q.required()?;
    state.storage.delete(&OpContext::new(), path).await?;
    Ok(MessageBody::new("file deleted"))
}

fn exceeded_body_limit(err: &StorageError) -> bool {
    let mut source = std::error::Error::source(err);
    while let Some(e) = source {
        if e.is::<LengthLimitError>() {
            return true;
        }
        source = e.source();
    }
    false
}
