#![allow(missing_docs)]

use std::sync::Arc;

use axum_test::TestServer;
use rusqlite::Connection;
use time::Duration;

use crate::{
    AppState, Environment, build_router,
    auth::{PasswordHash, SingleAdminEmail, create_user},
    rate_limit::RateLimitConfig,
};

pub(crate) const TEST_ADMIN_EMAIL: &str = "admin@example.com";
pub(crate) const TEST_USER_EMAIL: &str = "user@example.com";

/// An app state backed by an in-memory database, with a rate limit high
/// enough that tests never hit it.
pub(crate) fn get_test_app_state() -> AppState {
    AppState::new(
        Connection::open_in_memory().expect("Could not open in-memory database."),
        "test-secret",
        Duration::hours(1),
        Arc::new(SingleAdminEmail::new(TEST_ADMIN_EMAIL)),
    )
    .expect("Could not create app state.")
    .with_rate_limit(RateLimitConfig {
        max_requests: 10_000,
        window_secs: 1,
    })
    .with_environment(Environment::Test)
}

/// Insert a user with `email` and return a bearer token for them.
pub(crate) fn create_user_with_token(state: &AppState, email: &str) -> String {
    let user = create_user(
        email,
        PasswordHash::new_unchecked("hunter2"),
        &state.db_connection.lock().unwrap(),
    )
    .expect("Could not create test user.");

    state
        .token_codec
        .issue(&user.identity())
        .expect("Could not issue token.")
        .token
}

/// A test server running the full router over `state`.
pub(crate) fn get_test_server(state: AppState) -> TestServer {
    TestServer::try_new(build_router(state)).expect("Could not create test server.")
}
