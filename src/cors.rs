//! The CORS allow-list for browser clients.

use axum::http::{
    HeaderValue, Method,
    header::{AUTHORIZATION, CONTENT_TYPE},
};
use tower_http::cors::{AllowOrigin, CorsLayer};

/// Build a CORS layer that only answers requests from `allowed_origins`.
///
/// Origins that are not valid header values are skipped with a warning.
pub fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(origin) => Some(origin),
            Err(error) => {
                tracing::warn!("Ignoring invalid CORS origin {origin:?}: {error}");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE])
}

#[cfg(test)]
mod tests {
    use axum::{
        Router,
        http::header::{
            ACCESS_CONTROL_ALLOW_ORIGIN, ACCESS_CONTROL_REQUEST_METHOD, ORIGIN,
        },
        routing::get,
    };
    use axum_test::TestServer;

    use super::cors_layer;

    fn get_test_server() -> TestServer {
        let app = Router::new()
            .route("/api/accounts", get(|| async { "[]" }))
            .layer(cors_layer(&["https://app.example.com".to_owned()]));

        TestServer::try_new(app).expect("Could not create test server.")
    }

    #[tokio::test]
    async fn preflight_from_allowed_origin_is_answered() {
        let server = get_test_server();

        let response = server
            .method(axum::http::Method::OPTIONS, "/api/accounts")
            .add_header(ORIGIN, "https://app.example.com")
            .add_header(ACCESS_CONTROL_REQUEST_METHOD, "GET")
            .await;

        response.assert_status_ok();
        assert_eq!(
            response.header(ACCESS_CONTROL_ALLOW_ORIGIN),
            "https://app.example.com"
        );
    }

    #[tokio::test]
    async fn other_origins_get_no_allow_origin_header() {
        let server = get_test_server();

        let response = server
            .get("/api/accounts")
            .add_header(ORIGIN, "https://evil.example.com")
            .await;

        response.assert_status_ok();
        assert!(!response.headers().contains_key(ACCESS_CONTROL_ALLOW_ORIGIN));
    }
}
