//! Middleware for logging requests and responses.

use axum::{
    body::{Body, Bytes},
    extract::Request,
    http::{
        HeaderMap,
        header::{CONTENT_LENGTH, CONTENT_TYPE},
    },
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde_json::Value;
use tracing::Level;

use crate::Error;

/// The number of characters of a body that are logged before it is truncated.
pub const LOG_BODY_LENGTH_LIMIT: usize = 256;

/// Fields whose values are replaced before a JSON body is logged.
const REDACTED_FIELDS: [&str; 2] = ["password", "token"];

/// The largest request body, in bytes, the server accepts.
pub const MAX_REQUEST_BODY_SIZE: usize = 2 * 1024 * 1024;

/// Log the request and response for each request.
///
/// The method, URI and status are logged at the `info` level. Bodies are only
/// logged at the `debug` level, truncated to [LOG_BODY_LENGTH_LIMIT]
/// characters and with passwords and tokens redacted.
///
/// Request bodies larger than [MAX_REQUEST_BODY_SIZE] are rejected with a 413
/// before the rest of the stack sees them.
pub async fn logging_middleware(request: Request, next: Next) -> Response {
    let (parts, body) = request.into_parts();

    if declared_length(&parts.headers).is_some_and(|length| length > MAX_REQUEST_BODY_SIZE) {
        tracing::info!("Rejected oversized request: {} {}", parts.method, parts.uri);
        return Error::PayloadTooLarge.into_response();
    }

    let body_bytes = match axum::body::to_bytes(body, MAX_REQUEST_BODY_SIZE).await {
        Ok(bytes) => bytes,
        Err(error) => {
            tracing::info!("Could not read request body for {}: {error}", parts.uri);
            return Error::PayloadTooLarge.into_response();
        }
    };

    tracing::info!("Received request: {} {}", parts.method, parts.uri);
    if is_json(parts.headers.get(CONTENT_TYPE)) {
        log_body("request", &redact(&body_bytes));
    } else if !body_bytes.is_empty() {
        log_body("request", &String::from_utf8_lossy(&body_bytes));
    }

    let request = Request::from_parts(parts, Body::from(body_bytes));
    let response = next.run(request).await;

    tracing::info!("Sending response: {}", response.status());
    if !tracing::enabled!(Level::DEBUG) || !is_json(response.headers().get(CONTENT_TYPE)) {
        return response;
    }

    let (parts, body) = response.into_parts();
    let body_bytes = match axum::body::to_bytes(body, usize::MAX).await {
        Ok(bytes) => bytes,
        Err(error) => {
            return Error::Internal(format!("could not read response body: {error}"))
                .into_response();
        }
    };
    log_body("response", &redact(&body_bytes));

    Response::from_parts(parts, Body::from(body_bytes))
}

fn declared_length(headers: &HeaderMap) -> Option<usize> {
    headers
        .get(CONTENT_LENGTH)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.parse().ok())
}

fn is_json(content_type: Option<&axum::http::HeaderValue>) -> bool {
    content_type
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.starts_with("application/json"))
}

/// Render a JSON body with the values of [REDACTED_FIELDS] hidden.
fn redact(body: &Bytes) -> String {
    match serde_json::from_slice::<Value>(body) {
        Ok(mut value) => {
            redact_value(&mut value);
            value.to_string()
        }
        Err(_) => String::from_utf8_lossy(body).into_owned(),
    }
}

fn redact_value(value: &mut Value) {
    match value {
        Value::Object(map) => {
            for (key, field) in map.iter_mut() {
                if REDACTED_FIELDS.contains(&key.as_str()) {
                    *field = Value::String("********".to_owned());
                } else {
                    redact_value(field);
                }
            }
        }
        Value::Array(items) => items.iter_mut().for_each(redact_value),
        _ => {}
    }
}

fn log_body(direction: &str, body: &str) {
    match body.char_indices().nth(LOG_BODY_LENGTH_LIMIT) {
        Some((end, _)) => tracing::debug!("{direction} body: {}...", &body[..end]),
        None => tracing::debug!("{direction} body: {body}"),
    }
}
