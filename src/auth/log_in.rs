//! The log-in endpoint and the endpoints that describe the current session.

use std::sync::{Arc, LazyLock, Mutex};

use axum::{
    Json,
    extract::{FromRef, State},
};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{
    AppState, Error,
    auth::{CurrentUser, Identity, PasswordHash, RequestContext, TokenCodec, get_user_by_email},
    db::lock_connection,
    error::normalize,
    extract::ApiJson,
};

/// The state needed to perform a log-in.
#[derive(Debug, Clone)]
pub struct LogInState {
    /// The database connection for looking up users.
    pub db_connection: Arc<Mutex<Connection>>,
    /// Signs the tokens handed out on a successful log-in.
    pub token_codec: Arc<TokenCodec>,
}

impl FromRef<AppState> for LogInState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            token_codec: state.token_codec.clone(),
        }
    }
}

/// The credentials a user logs in with.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogInData {
    /// The email the user registered with.
    pub email: String,
    /// The user's password in plain text.
    pub password: String,
}

/// The body of a successful log-in response.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LogInResponse {
    /// The bearer token to send in the `Authorization` header.
    pub token: String,
    /// When the token expires.
    #[serde(with = "time::serde::rfc3339")]
    pub expires_at: OffsetDateTime,
    /// The user the token was issued to.
    pub user: Identity,
}

/// Checked against on the unknown email path so it costs as much as a wrong password.
static DUMMY_PASSWORD_HASH: LazyLock<Option<PasswordHash>> = LazyLock::new(|| {
    bcrypt::hash("no user has this password", PasswordHash::DEFAULT_COST)
        .ok()
        .map(|hash| PasswordHash::new_unchecked(&hash))
});

fn verify_dummy_password(raw_password: &str) {
    if let Some(hash) = DUMMY_PASSWORD_HASH.as_ref() {
        let _ = hash.verify(raw_password);
    }
}

/// Handler for log-in requests via the POST method.
///
/// # Errors
///
/// Returns [Error::InvalidCredentials] if the email is unknown or the password
/// is wrong, the two cases are indistinguishable to the client.
pub async fn post_log_in(
    State(state): State<LogInState>,
    ApiJson(credentials): ApiJson<LogInData>,
) -> Result<Json<LogInResponse>, Error> {
    let lookup = {
        let connection = lock_connection(&state.db_connection)?;
        get_user_by_email(&credentials.email, &connection)
    };

    let user = match lookup {
        Ok(user) => user,
        Err(Error::NotFound) => {
            tracing::debug!("Log-in attempt for unknown email {}", credentials.email);
            verify_dummy_password(&credentials.password);
            return Err(Error::InvalidCredentials);
        }
        Err(error) => return Err(error),
    };

    if !user.password_hash.verify(&credentials.password)? {
        tracing::debug!("Log-in attempt with wrong password for user {}", user.id);
        return Err(Error::InvalidCredentials);
    }

    let identity = user.identity();
    let issued = state.token_codec.issue(&identity)?;
    tracing::info!("User {} logged in", user.id);

    Ok(Json(LogInResponse {
        token: issued.token,
        expires_at: issued.expires_at,
        user: identity,
    }))
}

/// Get the identity of the authenticated requester.
pub async fn get_me(CurrentUser(identity): CurrentUser) -> Json<Identity> {
    Json(identity)
}

/// What the server made of the bearer token on a request, if any.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SessionStatus {
    /// No token was supplied.
    None,
    /// The token verified.
    Valid {
        /// The user the token belongs to.
        user: Identity,
        /// When the token expires.
        #[serde(with = "time::serde::rfc3339")]
        expires_at: OffsetDateTime,
    },
    /// The token was rejected.
    Invalid {
        /// The error kind the token would be rejected with on a protected route.
        reason: String,
    },
    /// The token could not be checked.
    Unverified,
}

impl From<RequestContext> for SessionStatus {
    fn from(context: RequestContext) -> Self {
        match context {
            RequestContext::Anonymous => SessionStatus::None,
            RequestContext::Authenticated(verified) => SessionStatus::Valid {
                user: verified.identity,
                expires_at: verified.expires_at,
            },
            RequestContext::Rejected(failure) => SessionStatus::Invalid {
                reason: normalize(&Error::Authentication(failure)).kind.to_owned(),
            },
            RequestContext::Unverified => SessionStatus::Unverified,
        }
    }
}

/// Report on the bearer token of the request without rejecting it.
///
/// Must be routed behind the optional authentication stage.
pub async fn get_session(context: RequestContext) -> Json<SessionStatus> {
    Json(context.into())
}
