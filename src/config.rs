//! Command line and environment configuration for the server.

use std::{fmt::Display, path::PathBuf};

use clap::{Parser, ValueEnum};
use time::Duration;

use crate::rate_limit::RateLimitConfig;

/// The environment the server runs in.
///
/// Outside of production, error responses include diagnostic detail and
/// logging is more verbose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Environment {
    /// Local development.
    #[default]
    Development,
    /// A deployed server.
    Production,
    /// Automated tests.
    Test,
}

impl Environment {
    /// Whether this is the production environment.
    pub fn is_production(&self) -> bool {
        matches!(self, Environment::Production)
    }
}

impl Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Environment::Development => "development",
            Environment::Production => "production",
            Environment::Test => "test",
        };

        f.write_str(name)
    }
}

/// The REST API server for fintrack.
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None)]
pub struct Config {
    /// The port to serve the API from.
    #[arg(short, long, env = "PORT", default_value_t = 3000)]
    pub port: u16,

    /// File path to the application SQLite database.
    #[arg(long, env = "DATABASE_PATH")]
    pub db_path: PathBuf,

    /// The secret used to sign session tokens.
    #[arg(long, env = "JWT_SECRET", hide_env_values = true)]
    pub jwt_secret: String,

    /// How long session tokens stay valid, in minutes. At most one year.
    #[arg(
        long,
        env = "TOKEN_TTL_MINUTES",
        default_value_t = 1440,
        value_parser = clap::value_parser!(u32).range(1..=MAX_TOKEN_TTL_MINUTES),
    )]
    pub token_ttl_minutes: u32,

    /// The email of the user allowed to edit transaction types and categories.
    #[arg(long, env = "ADMIN_EMAIL")]
    pub admin_email: String,

    /// Comma separated list of origins allowed to make cross-origin requests.
    #[arg(
        long,
        env = "ALLOWED_ORIGINS",
        value_delimiter = ',',
        default_value = "http://localhost:3000"
    )]
    pub allowed_origins: Vec<String>,

    /// The length of the rate limit window, in seconds.
    #[arg(long, env = "RATE_LIMIT_WINDOW_SECS", default_value_t = 900)]
    pub rate_limit_window_secs: u64,

    /// The number of API requests a client may make per rate limit window.
    #[arg(long, env = "RATE_LIMIT_MAX", default_value_t = 100)]
    pub rate_limit_max: u32,

    /// The environment the server runs in.
    #[arg(long, env = "APP_ENV", value_enum, default_value_t = Environment::Development)]
    pub environment: Environment,
}

/// The longest a session token may stay valid, one year in minutes.
pub const MAX_TOKEN_TTL_MINUTES: i64 = 365 * 24 * 60;

impl Config {
    /// How long session tokens stay valid.
    pub fn token_time_to_live(&self) -> Duration {
        Duration::minutes(i64::from(self.token_ttl_minutes))
    }

    /// The rate limit settings for the API routes.
    pub fn rate_limit(&self) -> RateLimitConfig {
        RateLimitConfig {
            max_requests: self.rate_limit_max,
            window_secs: self.rate_limit_window_secs,
        }
    }

    /// The allowed origins with surrounding whitespace and empty entries removed.
    pub fn allowed_origins(&self) -> Vec<String> {
        self.allowed_origins
            .iter()
            .map(|origin| origin.trim().to_owned())
            .filter(|origin| !origin.is_empty())
            .collect()
    }
}
