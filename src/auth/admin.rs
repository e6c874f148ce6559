//! The admin authorization stage and the policies it consults.

use std::sync::Arc;

use axum::http::request::Parts;

use crate::{
    Error,
    auth::{Flow, Identity, RequestContext, Stage},
};

/// Why an authorization check failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum AccessDenied {
    /// The route needs an authenticated requester and there was none.
    #[error("authentication is required")]
    AuthenticationRequired,
    /// The requester is authenticated but not allowed to perform the request.
    #[error("the requester is not an admin")]
    Forbidden,
}

/// Decides which identities may modify shared reference data.
pub trait AdminPolicy: Send + Sync {
    /// Whether `identity` has admin rights.
    fn is_admin(&self, identity: &Identity) -> bool;
}

impl<F> AdminPolicy for F
where
    F: Fn(&Identity) -> bool + Send + Sync,
{
    fn is_admin(&self, identity: &Identity) -> bool {
        self(identity)
    }
}

/// The single-tenant policy: one configured email address is the admin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SingleAdminEmail(String);

impl SingleAdminEmail {
    /// Create a policy that grants admin rights to `email`, ignoring case.
    pub fn new(email: &str) -> Self {
        Self(email.trim().to_owned())
    }
}

impl AdminPolicy for SingleAdminEmail {
    fn is_admin(&self, identity: &Identity) -> bool {
        !self.0.is_empty() && identity.email.trim().eq_ignore_ascii_case(&self.0)
    }
}

/// A stage that only lets admins through. Must run after an authentication stage.
#[derive(Clone)]
pub struct RequireAdmin(pub Arc<dyn AdminPolicy>);

impl Stage for RequireAdmin {
    fn run(&self, _parts: &Parts, context: RequestContext) -> Flow {
        let Some(identity) = context.identity() else {
            return Flow::Halt(Error::Authorization(AccessDenied::AuthenticationRequired));
        };

        if !self.0.is_admin(identity) {
            tracing::info!(
                "Denied admin access to user {} ({})",
                identity.user_id,
                identity.email
            );
            return Flow::Halt(Error::Authorization(AccessDenied::Forbidden));
        }

        Flow::Continue(context)
    }
}


#[cfg(test)]
mod stage_tests {
    use std::sync::Arc;

    use axum::{Router, http::StatusCode, http::request::Parts, middleware, routing::post};
    use axum_test::TestServer;
    use serde_json::Value;
    use time::{OffsetDateTime, macros::datetime};

    use crate::auth::{
        Claims, Flow, Identity, Pipeline, RequestContext, Stage, UserID, VerifiedToken,
        run_pipeline,
    };

    use super::{RequireAdmin, SingleAdminEmail};

    /// Stands in for the authentication stage.
    struct AuthenticateAs(Option<&'static str>);

    impl Stage for AuthenticateAs {
        fn run(&self, _parts: &Parts, _context: RequestContext) -> Flow {
            let Some(email) = self.0 else {
                return Flow::Continue(RequestContext::Anonymous);
            };

            let issued_at: OffsetDateTime = datetime!(2025-01-01 00:00:00 UTC);
            Flow::Continue(RequestContext::Authenticated(VerifiedToken {
                identity: Identity {
                    user_id: UserID::new(2),
                    email: email.to_owned(),
                },
                claims: Claims {
                    sub: "2".to_owned(),
                    email: email.to_owned(),
                    iat: issued_at.unix_timestamp(),
                    exp: issued_at.unix_timestamp() + 60,
                },
                issued_at,
                expires_at: issued_at + time::Duration::minutes(1),
            }))
        }
    }

    async fn admin_only() -> &'static str {
        "created"
    }

    fn get_test_server(email: Option<&'static str>) -> TestServer {
        let pipeline = Pipeline::new()
            .then(AuthenticateAs(email))
            .then(RequireAdmin(Arc::new(SingleAdminEmail::new(
                "admin@example.com",
            ))));
        let app = Router::new()
            .route("/types", post(admin_only))
            .route_layer(middleware::from_fn_with_state(pipeline, run_pipeline));

        TestServer::try_new(app).expect("Could not create test server.")
    }

    #[tokio::test]
    async fn admin_is_let_through() {
        let server = get_test_server(Some("admin@example.com"));

        let response = server.post("/types").await;

        response.assert_status_ok();
        assert_eq!(response.text(), "created");
    }

    #[tokio::test]
    async fn non_admin_is_forbidden() {
        let server = get_test_server(Some("user@example.com"));

        let response = server.post("/types").await;

        response.assert_status(StatusCode::FORBIDDEN);
        let body = response.json::<Value>();
        assert_eq!(body["error"]["kind"], "forbidden");
    }

    #[tokio::test]
    async fn missing_identity_requires_authentication() {
        let server = get_test_server(None);

        let response = server.post("/types").await;

        response.assert_status(StatusCode::UNAUTHORIZED);
        let body = response.json::<Value>();
        assert_eq!(body["error"]["kind"], "authentication_required");
    }
}
