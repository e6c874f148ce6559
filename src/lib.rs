//! Fintrack is a personal finance service for keeping track of accounts,
//! categories, transaction types and transactions.
//!
//! This library provides a JSON REST API secured with bearer tokens.
//! Requests flow through a [pipeline](auth::Pipeline) of authentication and
//! authorization stages before reaching the route handlers, and every error
//! is [normalized](error::normalize) into the same JSON envelope.

#![warn(missing_docs)]

use std::{net::SocketAddr, time::Duration};

use axum_server::Handle;
use tokio::signal;

mod account;
mod app_state;
pub mod auth;
mod category;
pub mod config;
mod cors;
mod database_id;
mod db;
pub mod endpoints;
pub mod error;
mod extract;
mod health;
mod logging;
mod name;
pub mod rate_limit;
mod routing;
mod transaction;
mod transaction_type;

pub use app_state::AppState;
pub use config::{Config, Environment};
pub use db::{initialize as initialize_db, seed_reference_data};
pub use error::Error;
pub use logging::{LOG_BODY_LENGTH_LIMIT, logging_middleware};
pub use routing::build_router;

/// An async task that waits for either the ctrl+c or terminate signal, whichever comes first, and
/// then signals the server to shut down gracefully.
///
/// `handle` is a handle to an Axum `Server`.
pub async fn graceful_shutdown(handle: Handle<SocketAddr>) {
    let ctrl_c = async {
        if let Err(error) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {error}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(error) => {
                tracing::error!("Failed to install terminate signal handler: {error}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::debug!("Received ctrl+c signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
        _ = terminate => {
            tracing::debug!("Received terminate signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
    }
}

#[cfg(test)]
mod test_utils;
