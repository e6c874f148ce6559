//! Implements a struct that holds the state of the REST server.

use std::{
    fmt::Debug,
    sync::{Arc, Mutex},
};

use rusqlite::Connection;
use time::Duration;

use crate::{
    Config, Environment, Error,
    auth::{AdminPolicy, Authenticator, SingleAdminEmail, SqliteIdentityStore, TokenCodec},
    db::initialize,
    rate_limit::{ClientRateLimiter, RateLimitConfig},
};

/// The state of the REST server.
#[derive(Clone)]
pub struct AppState {
    /// The database connection.
    pub db_connection: Arc<Mutex<Connection>>,

    /// Issues and verifies the bearer tokens.
    pub token_codec: Arc<TokenCodec>,

    /// Decides who may modify transaction types and categories.
    pub admin_policy: Arc<dyn AdminPolicy>,

    /// Limits how many API requests each client may make.
    pub rate_limiter: Arc<ClientRateLimiter>,

    /// The origins browsers may call the API from.
    pub allowed_origins: Vec<String>,

    /// The environment the server runs in.
    pub environment: Environment,
}

impl AppState {
    /// Create a new [AppState] with a SQLite database connection.
    ///
    /// This function will initialize the database by adding the tables for the domain models.
    /// The rate limit, allowed origins and environment start at their defaults, use the
    /// `with_*` methods to change them.
    ///
    /// # Errors
    /// Returns an error if `jwt_secret` is empty or the database cannot be initialized.
    pub fn new(
        db_connection: Connection,
        jwt_secret: &str,
        token_time_to_live: Duration,
        admin_policy: Arc<dyn AdminPolicy>,
    ) -> Result<Self, Error> {
        if jwt_secret.trim().is_empty() {
            return Err(Error::Internal(
                "the JWT secret must not be empty".to_owned(),
            ));
        }

        initialize(&db_connection)?;

        Ok(Self {
            db_connection: Arc::new(Mutex::new(db_connection)),
            token_codec: Arc::new(TokenCodec::new(jwt_secret.as_bytes(), token_time_to_live)),
            admin_policy,
            rate_limiter: Arc::new(ClientRateLimiter::new(RateLimitConfig::default())),
            allowed_origins: Vec::new(),
            environment: Environment::default(),
        })
    }

    /// Create the state described by `config`.
    ///
    /// # Errors
    /// Returns an error if the secret is empty or the database cannot be initialized.
    pub fn from_config(db_connection: Connection, config: &Config) -> Result<Self, Error> {
        let state = Self::new(
            db_connection,
            &config.jwt_secret,
            config.token_time_to_live(),
            Arc::new(SingleAdminEmail::new(&config.admin_email)),
        )?
        .with_rate_limit(config.rate_limit())
        .with_allowed_origins(config.allowed_origins())
        .with_environment(config.environment);

        Ok(state)
    }

    /// Replace the rate limiter with one using `config`.
    pub fn with_rate_limit(mut self, config: RateLimitConfig) -> Self {
        self.rate_limiter = Arc::new(ClientRateLimiter::new(config));
        self
    }

    /// Set the origins browsers may call the API from.
    pub fn with_allowed_origins(mut self, allowed_origins: Vec<String>) -> Self {
        self.allowed_origins = allowed_origins;
        self
    }

    /// Set the environment the server runs in.
    pub fn with_environment(mut self, environment: Environment) -> Self {
        self.environment = environment;
        self
    }

    /// An authenticator that checks tokens against this state's codec and user table.
    pub fn authenticator(&self) -> Authenticator {
        Authenticator::new(
            self.token_codec.clone(),
            Arc::new(SqliteIdentityStore::new(self.db_connection.clone())),
        )
    }
}

impl Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("token_codec", &self.token_codec)
            .field("rate_limiter", &self.rate_limiter)
            .field("allowed_origins", &self.allowed_origins)
            .field("environment", &self.environment)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use rusqlite::Connection;
    use time::Duration;

    use crate::{Error, auth::SingleAdminEmail};

    use super::AppState;

    #[test]
    fn empty_secret_is_rejected() {
        let result = AppState::new(
            Connection::open_in_memory().unwrap(),
            "  ",
            Duration::hours(1),
            Arc::new(SingleAdminEmail::new("admin@example.com")),
        );

        assert!(matches!(result, Err(Error::Internal(_))));
    }

    #[test]
    fn new_initializes_database() {
        let state = AppState::new(
            Connection::open_in_memory().unwrap(),
            "secret",
            Duration::hours(1),
            Arc::new(SingleAdminEmail::new("admin@example.com")),
        )
        .unwrap();

        let connection = state.db_connection.lock().unwrap();
        let table_count: i64 = connection
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name IN \
                 ('user', 'account', 'transaction_type', 'category', 'transaction')",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(table_count, 5);
    }
}
