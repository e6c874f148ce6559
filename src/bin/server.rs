use std::{net::SocketAddr, time::Duration};

use axum::{
    Router,
    extract::{MatchedPath, Request},
};
use axum_server::Handle;
use clap::Parser;
use rusqlite::Connection;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{EnvFilter, filter::LevelFilter};

use fintrack::{AppState, Config, Environment, build_router, graceful_shutdown};

/// How often clients with a fully restored allowance are dropped from the rate limiter.
const RATE_LIMITER_CLEANUP_INTERVAL: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() {
    let config = Config::parse();
    setup_logging(config.environment);

    let connection = Connection::open(&config.db_path).unwrap_or_else(|error| {
        panic!(
            "Could not open the database at {}: {error}",
            config.db_path.display()
        )
    });
    let state = AppState::from_config(connection, &config).expect("Could not create app state.");

    let rate_limiter = state.rate_limiter.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(RATE_LIMITER_CLEANUP_INTERVAL);
        loop {
            interval.tick().await;
            rate_limiter.retain_recent();
            tracing::debug!(
                "Rate limiter is tracking {} clients",
                rate_limiter.tracked_clients()
            );
        }
    });

    let handle = Handle::new();
    tokio::spawn(graceful_shutdown(handle.clone()));

    let router = add_tracing_layer(build_router(state));
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));

    tracing::info!(
        "HTTP server listening on {addr} in {} mode",
        config.environment
    );
    axum_server::bind(addr)
        .handle(handle)
        .serve(router.into_make_service_with_connect_info::<SocketAddr>())
        .await
        .expect("Server stopped unexpectedly.");
}

fn setup_logging(environment: Environment) {
    let default_level = if environment.is_production() {
        LevelFilter::INFO
    } else {
        LevelFilter::DEBUG
    };

    let filter = EnvFilter::builder()
        .with_default_directive(default_level.into())
        .from_env_lossy();

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .init();
}

fn add_tracing_layer(router: Router) -> Router {
    let tracing_layer = TraceLayer::new_for_http()
        .make_span_with(|req: &Request| {
            let method = req.method();
            let uri = req.uri();

            let matched_path = req
                .extensions()
                .get::<MatchedPath>()
                .map(|matched_path| matched_path.as_str());

            tracing::debug_span!("request", %method, %uri, matched_path)
        })
        // Errors are already logged when they are converted into responses.
        .on_failure(());

    router.layer(tracing_layer)
}
