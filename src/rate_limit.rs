//! Per-client rate limiting for the API routes.

use std::{
    net::{IpAddr, Ipv4Addr, SocketAddr},
    num::NonZeroU32,
    sync::Arc,
    time::Duration,
};

use axum::{
    extract::{ConnectInfo, Request, State},
    http::{HeaderValue, header::RETRY_AFTER},
    middleware::Next,
    response::{IntoResponse, Response},
};
use governor::{
    DefaultKeyedRateLimiter, Quota, RateLimiter,
    clock::{Clock, DefaultClock},
};

use crate::Error;

/// Configuration for rate limiting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitConfig {
    /// Maximum requests per window.
    pub max_requests: u32,
    /// Window duration in seconds.
    pub window_secs: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 100,
            window_secs: 900,
        }
    }
}

impl RateLimitConfig {
    fn quota(&self) -> Quota {
        let max_requests = NonZeroU32::new(self.max_requests).unwrap_or(NonZeroU32::MIN);
        let window = Duration::from_secs(self.window_secs.max(1));
        let period = window / max_requests.get();

        // A client may spend the whole window's allowance at once, after which
        // one request is restored every `period`.
        Quota::with_period(period)
            .unwrap_or_else(|| Quota::per_second(max_requests))
            .allow_burst(max_requests)
    }
}

/// A process wide rate limiter keyed by client IP address.
pub struct ClientRateLimiter {
    limiter: DefaultKeyedRateLimiter<IpAddr>,
    clock: DefaultClock,
    config: RateLimitConfig,
}

impl ClientRateLimiter {
    /// Create a rate limiter that lets each client make `config.max_requests`
    /// requests per `config.window_secs`.
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            limiter: RateLimiter::keyed(config.quota()),
            clock: DefaultClock::default(),
            config,
        }
    }

    /// Count a request from `client`.
    ///
    /// # Errors
    /// Returns how long the client must wait if it has used up its allowance.
    pub fn check(&self, client: IpAddr) -> Result<(), Duration> {
        self.limiter
            .check_key(&client)
            .map_err(|not_until| not_until.wait_time_from(self.clock.now()))
    }

    /// Forget clients whose allowance has been fully restored.
    pub fn retain_recent(&self) {
        self.limiter.retain_recent();
        self.limiter.shrink_to_fit();
    }

    /// The number of clients currently tracked.
    pub fn tracked_clients(&self) -> usize {
        self.limiter.len()
    }
}

impl std::fmt::Debug for ClientRateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientRateLimiter")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Middleware that rejects clients that exceed their rate limit with a 429.
///
/// Clients are identified by their IP address, which requires the server to
/// be started with `into_make_service_with_connect_info::<SocketAddr>()`.
/// Without it all requests share one allowance.
pub async fn rate_limit(
    State(limiter): State<Arc<ClientRateLimiter>>,
    request: Request,
    next: Next,
) -> Response {
    let client = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(address)| address.ip())
        .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED));

    match limiter.check(client) {
        Ok(()) => next.run(request).await,
        Err(wait_time) => {
            tracing::warn!("Rate limit exceeded for {client}");

            let mut response = Error::RateLimited.into_response();
            let retry_after_secs = wait_time.as_secs() + u64::from(wait_time.subsec_nanos() > 0);
            response
                .headers_mut()
                .insert(RETRY_AFTER, HeaderValue::from(retry_after_secs));
            response
        }
    }
}

#[cfg(test)]
mod limiter_tests {
    use std::net::{IpAddr, Ipv4Addr};

    use super::{ClientRateLimiter, RateLimitConfig};

    const ALICE: IpAddr = IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1));
    const BOB: IpAddr = IpAddr::V4(Ipv4Addr::new(10, 0, 0, 2));

    #[test]
    fn allows_up_to_max_requests_per_window() {
        let limiter = ClientRateLimiter::new(RateLimitConfig {
            max_requests: 3,
            window_secs: 60,
        });

        for _ in 0..3 {
            assert!(limiter.check(ALICE).is_ok());
        }

        let wait_time = limiter.check(ALICE).unwrap_err();
        assert!(wait_time.as_secs() <= 20, "got wait time {wait_time:?}");
    }

    #[test]
    fn clients_have_separate_allowances() {
        let limiter = ClientRateLimiter::new(RateLimitConfig {
            max_requests: 1,
            window_secs: 60,
        });

        assert!(limiter.check(ALICE).is_ok());
        assert!(limiter.check(ALICE).is_err());
        assert!(limiter.check(BOB).is_ok());
        assert_eq!(limiter.tracked_clients(), 2);
    }

    #[test]
    fn zero_max_requests_still_allows_one() {
        let limiter = ClientRateLimiter::new(RateLimitConfig {
            max_requests: 0,
            window_secs: 0,
        });

        assert!(limiter.check(ALICE).is_ok());
    }
}

#[cfg(test)]
mod middleware_tests {
    use std::sync::Arc;

    use axum::{
        Router,
        http::{StatusCode, header::RETRY_AFTER},
        middleware,
        routing::get,
    };
    use axum_test::TestServer;
    use serde_json::Value;

    use super::{ClientRateLimiter, RateLimitConfig, rate_limit};

    async fn ok() -> &'static str {
        "ok"
    }

    #[tokio::test]
    async fn rejects_requests_over_the_cap() {
        let limiter = Arc::new(ClientRateLimiter::new(RateLimitConfig {
            max_requests: 2,
            window_secs: 60,
        }));
        let app = Router::new()
            .route("/api/thing", get(ok))
            .layer(middleware::from_fn_with_state(limiter, rate_limit));
        let server = TestServer::try_new(app).expect("Could not create test server.");

        server.get("/api/thing").await.assert_status_ok();
        server.get("/api/thing").await.assert_status_ok();
        let response = server.get("/api/thing").await;

        response.assert_status(StatusCode::TOO_MANY_REQUESTS);
        assert!(response.headers().contains_key(RETRY_AFTER));
        let body = response.json::<Value>();
        assert_eq!(body["error"]["kind"], "rate_limited");
    }
}
