//! The liveness endpoint.

use axum::Json;
use serde::Serialize;

/// The body of a health check response.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Health {
    /// Always "ok" if the server could answer.
    pub status: &'static str,
    /// The version of the running server.
    pub version: &'static str,
}

/// Report that the server is up. Does not touch the database.
pub async fn get_health() -> Json<Health> {
    Json(Health {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

#[cfg(test)]
mod tests {
    use axum::{Router, routing::get};
    use axum_test::TestServer;
    use serde_json::Value;

    use super::get_health;

    #[tokio::test]
    async fn health_reports_ok() {
        let app = Router::new().route("/health", get(get_health));
        let server = TestServer::try_new(app).expect("Could not create test server.");

        let response = server.get("/health").await;

        response.assert_status_ok();
        assert_eq!(response.json::<Value>()["status"], "ok");
    }
}
