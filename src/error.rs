//! Defines the app level error type and how errors are normalized into JSON responses.
//!
//! Every error that reaches the top of the request pipeline is mapped by [normalize]
//! to exactly one status code and message. The diagnostic detail of an error is kept
//! out of the response body unless [expose_error_detail] is installed, which the
//! router only does outside of production.

use std::any::Any;

use axum::{
    Json,
    extract::{
        Request,
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
    http::{StatusCode, header::CONTENT_LENGTH},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::auth::{AccessDenied, AuthFailure, TokenError};

/// The errors that may occur in the application.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    /// The request did not carry a usable bearer token.
    #[error("authentication failed: {0}")]
    Authentication(#[from] AuthFailure),

    /// The requester is not allowed to perform the request.
    #[error("access denied: {0}")]
    Authorization(#[from] AccessDenied),

    /// The user provided an unknown email or the wrong password.
    #[error("invalid email or password")]
    InvalidCredentials,

    /// A unique constraint was violated, e.g. an account name already exists.
    ///
    /// Holds the database's description of the constraint.
    #[error("duplicate entry: {0}")]
    Duplicate(String),

    /// The requested resource was not found.
    ///
    /// Internally, this error may occur when a query returns no rows.
    #[error("the requested resource could not be found")]
    NotFound,

    /// A foreign key constraint failed, e.g. a transaction referenced a
    /// missing account or a transaction type still in use was deleted.
    #[error("foreign key constraint failed: {0}")]
    InvalidReference(String),

    /// The request body, path or query failed validation.
    #[error("{0}")]
    Validation(String),

    /// The user provided a password that is too easy to guess.
    #[error("password is too weak: {0}")]
    TooWeak(String),

    /// The request body is larger than the server accepts.
    #[error("the request body is too large")]
    PayloadTooLarge,

    /// The client sent too many requests within the rate limit window.
    #[error("rate limit exceeded")]
    RateLimited,

    /// A session token could not be signed.
    #[error("could not create token: {0}")]
    TokenCreation(String),

    /// An unexpected error occurred with the underlying hashing library.
    ///
    /// The error string should only be logged for debugging on the server.
    #[error("hashing failed: {0}")]
    HashingError(String),

    /// Could not acquire the database lock.
    #[error("could not acquire the database lock")]
    DatabaseLockError,

    /// An unhandled/unexpected SQL error.
    #[error("an unexpected SQL error occurred: {0}")]
    SqlError(rusqlite::Error),

    /// Any other failure, e.g. a panic caught in a route handler.
    #[error("{0}")]
    Internal(String),
}

impl From<rusqlite::Error> for Error {
    fn from(value: rusqlite::Error) -> Self {
        match value {
            // Code 2067 occurs when a UNIQUE constraint failed, 1555 for a PRIMARY KEY.
            rusqlite::Error::SqliteFailure(sql_error, description)
                if sql_error.extended_code == 2067 || sql_error.extended_code == 1555 =>
            {
                Error::Duplicate(description.unwrap_or_default())
            }
            // Code 787 occurs when a FOREIGN KEY constraint failed, 1811 when an
            // ON DELETE RESTRICT action refused to delete a referenced row.
            rusqlite::Error::SqliteFailure(sql_error, description)
                if sql_error.extended_code == 787 || sql_error.extended_code == 1811 =>
            {
                Error::InvalidReference(description.unwrap_or_default())
            }
            rusqlite::Error::QueryReturnedNoRows => Error::NotFound,
            error => {
                tracing::error!("an unhandled SQL error occurred: {}", error);
                Error::SqlError(error)
            }
        }
    }
}

impl From<TokenError> for Error {
    fn from(value: TokenError) -> Self {
        Error::Authentication(value.into())
    }
}

impl From<JsonRejection> for Error {
    fn from(rejection: JsonRejection) -> Self {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            return Error::PayloadTooLarge;
        }

        Error::Validation(rejection.body_text())
    }
}

impl From<PathRejection> for Error {
    fn from(rejection: PathRejection) -> Self {
        Error::Validation(rejection.body_text())
    }
}

impl From<QueryRejection> for Error {
    fn from(rejection: QueryRejection) -> Self {
        Error::Validation(rejection.body_text())
    }
}

/// The normalized form of an [Error]: what the client is told about it.
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorResponse {
    /// The HTTP status code of the response.
    pub status: StatusCode,
    /// A stable, machine readable name for the kind of error.
    pub kind: &'static str,
    /// A message that is safe to show to the client.
    pub message: String,
    /// The full error text, only echoed to the client outside of production.
    pub detail: String,
}

impl ErrorResponse {
    fn new(status: StatusCode, kind: &'static str, message: impl Into<String>, error: &Error) -> Self {
        Self {
            status,
            kind,
            message: message.into(),
            detail: error.to_string(),
        }
    }

    /// Render the JSON error envelope, optionally including the diagnostic detail.
    pub fn render(&self, include_detail: bool) -> Response {
        let body = ErrorEnvelope {
            error: ErrorBody {
                kind: self.kind,
                message: &self.message,
                detail: include_detail.then_some(self.detail.as_str()),
            },
        };

        let mut response = (self.status, Json(body)).into_response();
        response.extensions_mut().insert(self.clone());

        response
    }
}

#[derive(Serialize)]
struct ErrorEnvelope<'a> {
    error: ErrorBody<'a>,
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    kind: &'a str,
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    detail: Option<&'a str>,
}

/// Map an error to the status code and message the client receives.
///
/// This function is total: errors without a dedicated mapping become a 500
/// with a generic message.
pub fn normalize(error: &Error) -> ErrorResponse {
    match error {
        Error::Authentication(failure) => {
            let (kind, message) = match failure {
                AuthFailure::MissingToken => ("missing_token", "authentication token missing"),
                AuthFailure::Malformed | AuthFailure::SignatureInvalid => {
                    ("invalid_token", "invalid token")
                }
                AuthFailure::Expired => ("token_expired", "token expired"),
                AuthFailure::SubjectMissing => ("user_not_found", "user no longer exists"),
            };
            ErrorResponse::new(StatusCode::UNAUTHORIZED, kind, message, error)
        }
        Error::Authorization(AccessDenied::AuthenticationRequired) => ErrorResponse::new(
            StatusCode::UNAUTHORIZED,
            "authentication_required",
            "authentication required",
            error,
        ),
        Error::Authorization(AccessDenied::Forbidden) => ErrorResponse::new(
            StatusCode::FORBIDDEN,
            "forbidden",
            "admin access required",
            error,
        ),
        Error::InvalidCredentials => ErrorResponse::new(
            StatusCode::UNAUTHORIZED,
            "invalid_credentials",
            "invalid email or password",
            error,
        ),
        Error::Duplicate(_) => ErrorResponse::new(
            StatusCode::BAD_REQUEST,
            "duplicate_entry",
            "duplicate entry",
            error,
        ),
        Error::NotFound => ErrorResponse::new(
            StatusCode::NOT_FOUND,
            "not_found",
            "record not found",
            error,
        ),
        Error::InvalidReference(_) => ErrorResponse::new(
            StatusCode::BAD_REQUEST,
            "invalid_reference",
            "invalid reference to a related record",
            error,
        ),
        Error::Validation(message) => ErrorResponse::new(
            StatusCode::BAD_REQUEST,
            "validation_failed",
            message.as_str(),
            error,
        ),
        Error::TooWeak(feedback) => ErrorResponse::new(
            StatusCode::BAD_REQUEST,
            "validation_failed",
            format!("password is too weak: {feedback}"),
            error,
        ),
        Error::PayloadTooLarge => ErrorResponse::new(
            StatusCode::PAYLOAD_TOO_LARGE,
            "payload_too_large",
            "request body too large",
            error,
        ),
        Error::RateLimited => ErrorResponse::new(
            StatusCode::TOO_MANY_REQUESTS,
            "rate_limited",
            "too many requests, try again later",
            error,
        ),
        Error::TokenCreation(_)
        | Error::HashingError(_)
        | Error::DatabaseLockError
        | Error::SqlError(_)
        | Error::Internal(_) => ErrorResponse::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "internal_error",
            "internal server error",
            error,
        ),
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let normalized = normalize(&self);

        if normalized.status.is_server_error() {
            tracing::error!("An unexpected error occurred: {}", self);
        } else {
            tracing::debug!("Responding with {}: {}", normalized.status, self);
        }

        normalized.render(false)
    }
}

/// Middleware that re-renders error responses with their diagnostic detail.
///
/// Only install this outside of production, the detail may contain SQL
/// errors and other internals.
pub async fn expose_error_detail(request: Request, next: Next) -> Response {
    let response = next.run(request).await;

    match response.extensions().get::<ErrorResponse>().cloned() {
        Some(error) => {
            let (parts, _) = response.into_parts();
            let mut rendered = error.render(true);
            for (name, value) in parts.headers.iter() {
                if name != CONTENT_LENGTH && !rendered.headers().contains_key(name) {
                    rendered.headers_mut().insert(name, value.clone());
                }
            }
            rendered
        }
        None => response,
    }
}

/// Convert a panic caught in a route handler into a normalized 500 response.
pub fn handle_panic(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else {
        "unknown panic payload".to_owned()
    };

    Error::Internal(format!("a route handler panicked: {detail}")).into_response()
}
