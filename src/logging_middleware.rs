// src/logging_middleware.rs
//! Middleware for logging request and response bodies in debug mode

use axum::body::to_bytes;
use axum::{
    body::Body,
    extract::Request,
    http::{header::CONTENT_LENGTH, HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
};
use serde_json::Value;
use tracing::{debug, enabled, Level};

const MAX_LOGGED_BODY: usize = 1024 * 1024;
const REDACTED: &str = "[REDACTED]";

/// Keys whose values never reach the log
fn is_sensitive_key(key: &str) -> bool {
    let key = key.to_ascii_lowercase();
    key.contains("password") || key.contains("token") || key.contains("secret")
}

/// Replace sensitive values anywhere in a JSON document.
pub fn redact(value: &mut Value) {
    match value {
        Value::Object(map) => {
            for (key, inner) in map.iter_mut() {
                if is_sensitive_key(key) {
                    *inner = Value::String(REDACTED.to_string());
                } else {
                    redact(inner);
                }
            }
        }
        Value::Array(items) => items.iter_mut().for_each(redact),
        _ => {}
    }
}

fn loggable_body(bytes: &[u8]) -> Option<String> {
    if bytes.is_empty() {
        return None;
    }
    let body_str = std::str::from_utf8(bytes).ok()?;
    // Non-JSON bodies are not logged: they may carry form-encoded credentials.
    let mut json = serde_json::from_str::<Value>(body_str).ok()?;
    redact(&mut json);
    serde_json::to_string_pretty(&json).ok()
}

/// Bodies without a `Content-Length` within the cap are passed through unread.
fn request_body_loggable(headers: &HeaderMap) -> bool {
    headers
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<usize>().ok())
        .is_some_and(|len| len <= MAX_LOGGED_BODY)
}

/// Middleware to log request and response bodies in debug mode
pub async fn log_request_response(request: Request, next: Next) -> Result<Response, StatusCode> {
    if !enabled!(Level::DEBUG) {
        return Ok(next.run(request).await);
    }

    if !request_body_loggable(request.headers()) {
        debug!(
            method = %request.method(),
            uri = %request.uri().path(),
            "Request body not logged"
        );
        return Ok(next.run(request).await);
    }

    let (parts, body) = request.into_parts();
    let bytes = to_bytes(body, MAX_LOGGED_BODY)
        .await
        .map_err(|_| StatusCode::PAYLOAD_TOO_LARGE)?;

    if let Some(request_body) = loggable_body(&bytes) {
        debug!(
            method = %parts.method,
            uri = %parts.uri.path(),
            request_body = %request_body,
            "Request"
        );
    }

    let request = Request::from_parts(parts, Body::from(bytes));
    let response = next.run(request).await;

    let (parts, body) = response.into_parts();
    let bytes = to_bytes(body, usize::MAX)
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    if let Some(response_body) = loggable_body(&bytes) {
        debug!(
            status = %parts.status,
            response_body = %response_body,
            "Response"
        );
    }

    Ok(Response::from_parts(parts, Body::from(bytes)))
}
