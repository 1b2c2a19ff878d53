// SPDX-License-Identifier: AGPL-3.0-or-later
//! Request-pipeline stage guarding the `path` query parameter
//!
//! Rejected values never reach a handler. Accepted values are written back
//! into the query string in normalized form.

use axum::{
    extract::{Query, Request},
    http::{uri::PathAndQuery, Uri},
    middleware::Next,
    response::{IntoResponse, Response},
};
use fsgate_core::guard;

use crate::response::ApiError;

const PATH_PARAM: &str = "path";

pub async fn path_guard(mut req: Request, next: Next) -> Response {
    if req.uri().query().is_none() {
        return next.run(req).await;
    }

    let pairs: Vec<(String, String)> = match Query::try_from_uri(req.uri()) {
        Ok(Query(pairs)) => pairs,
        Err(_) => return ApiError::BadRequest("invalid query string".into()).into_response(),
    };

    let mut values = pairs.iter().filter(|(k, _)| k == PATH_PARAM).map(|(_, v)| v);
    let raw = match (values.next(), values.next()) {
        (Some(_), Some(_)) => {
            tracing::warn!(query = req.uri().query().unwrap_or_default(), "rejected repeated path parameter");
            return ApiError::BadRequest("duplicate path parameter".into()).into_response();
        }
        (Some(v), None) if !v.is_empty() => v.clone(),
        _ => return next.run(req).await,
    };

    let cleaned = match guard::sanitize(&raw) {
        Ok(cleaned) => cleaned,
        Err(e) => {
            tracing::warn!(path = %raw.escape_debug(), reason = ?e, "rejected request path");
            return ApiError::BadRequest(e.to_string()).into_response();
        }
    };

    match rewrite_query(req.uri(), &pairs, &cleaned) {
        Some(uri) => *req.uri_mut() = uri,
        None => return ApiError::Internal.into_response(),
    }
    next.run(req).await
}

/// Rebuild `uri` with every `path` pair replaced by a single normalized one.
fn rewrite_query(uri: &Uri, pairs: &[(String, String)], cleaned: &str) -> Option<Uri> {
    let mut query: Vec<String> = pairs
        .iter()
        .filter(|(k, _)| k != PATH_PARAM)
        .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
        .collect();
    query.push(format!("{}={}", PATH_PARAM, urlencoding::encode(cleaned)));

    let path_and_query = format!("{}?{}", uri.path(), query.join("&"));
    let mut parts = uri.clone().into_parts();
    parts.path_and_query = Some(PathAndQuery::try_from(path_and_query).ok()?);
    Uri::from_parts(parts).ok()
}
