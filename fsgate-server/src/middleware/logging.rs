// SPDX-License-Identifier: AGPL-3.0-or-later
//! Structured request logging

use std::time::Instant;

use axum::{extract::Request, middleware::Next, response::Response};

use super::request_id::RequestId;

/// Emit one event per request with method, path, status, duration and ID.
pub async fn log_requests(req: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = req.method().clone();
    let path = req.uri().path().to_owned();
    let request_id = req
        .extensions()
        .get::<RequestId>()
        .map(|id| id.as_str().to_owned())
        .unwrap_or_default();

    let res = next.run(req).await;

    tracing::info!(
        method = %method,
        path = %path,
        status = res.status().as_u16(),
        duration_ms = start.elapsed().as_millis() as u64,
        request_id = %request_id,
        "request"
    );
    res
}
