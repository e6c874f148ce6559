//! Pipeline stages that turn a bearer token into a [RequestContext].

use std::sync::Arc;

use axum::http::{HeaderMap, request::Parts};
use axum_extra::headers::{Authorization, HeaderMapExt, authorization::Bearer};

use crate::{
    Error,
    auth::{AuthFailure, Flow, IdentityStore, RequestContext, Stage, TokenCodec, VerifiedToken},
};

/// Get the token from an `Authorization: Bearer <token>` header.
///
/// Returns `None` if the header is missing, uses another scheme or the token is empty.
pub fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .typed_get::<Authorization<Bearer>>()
        .map(|Authorization(bearer)| bearer.token().trim().to_owned())
        .filter(|token| !token.is_empty())
}

/// Verifies bearer tokens against the token codec and the user table.
#[derive(Clone)]
pub struct Authenticator {
    codec: Arc<TokenCodec>,
    identities: Arc<dyn IdentityStore>,
}

impl Authenticator {
    /// Create an authenticator that verifies tokens with `codec` and resolves
    /// their subjects through `identities`.
    pub fn new(codec: Arc<TokenCodec>, identities: Arc<dyn IdentityStore>) -> Self {
        Self { codec, identities }
    }

    /// Extract and verify the bearer token in `headers`.
    ///
    /// # Errors
    /// Returns [Error::Authentication] if the token is missing or rejected, or
    /// another error if the identity could not be looked up.
    pub fn authenticate(&self, headers: &HeaderMap) -> Result<VerifiedToken, Error> {
        let token = extract_bearer_token(headers).ok_or(AuthFailure::MissingToken)?;

        self.codec.verify(&token, self.identities.as_ref())
    }
}

/// A stage that requires a valid bearer token.
///
/// Requests without a token or with a rejected token are halted with a 401.
#[derive(Clone)]
pub struct Authenticate(pub Authenticator);

impl Stage for Authenticate {
    fn run(&self, parts: &Parts, _context: RequestContext) -> Flow {
        match self.0.authenticate(&parts.headers) {
            Ok(verified) => Flow::Continue(RequestContext::Authenticated(verified)),
            Err(error) => Flow::Halt(error),
        }
    }
}

/// A stage that verifies a bearer token if one is supplied, but never halts.
///
/// The resulting context only carries an identity if the token verified.
#[derive(Clone)]
pub struct OptionalAuthenticate(pub Authenticator);

impl Stage for OptionalAuthenticate {
    fn run(&self, parts: &Parts, _context: RequestContext) -> Flow {
        let context = match self.0.authenticate(&parts.headers) {
            Ok(verified) => RequestContext::Authenticated(verified),
            Err(Error::Authentication(AuthFailure::MissingToken)) => RequestContext::Anonymous,
            Err(Error::Authentication(failure)) => {
                tracing::debug!("Ignoring rejected bearer token: {failure}");
                RequestContext::Rejected(failure)
            }
            Err(error) => {
                tracing::debug!("Could not verify bearer token: {error}");
                RequestContext::Unverified
            }
        };

        Flow::Continue(context)
    }
}
