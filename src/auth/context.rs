//! Per-request authentication state handed from the pipeline to route handlers.

use axum::{extract::FromRequestParts, http::request::Parts};

use crate::{
    Error,
    auth::{AccessDenied, Claims, Identity, TokenError, VerifiedToken},
};

/// Why a request failed authentication.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum AuthFailure {
    /// There was no `Authorization: Bearer <token>` header.
    #[error("no bearer token was supplied")]
    MissingToken,
    /// The token could not be parsed.
    #[error("the token is malformed")]
    Malformed,
    /// The token was not signed by this server.
    #[error("the token signature is invalid")]
    SignatureInvalid,
    /// The token has expired.
    #[error("the token has expired")]
    Expired,
    /// The token was issued to a user that no longer exists.
    #[error("the user the token was issued to no longer exists")]
    SubjectMissing,
}

impl From<TokenError> for AuthFailure {
    fn from(value: TokenError) -> Self {
        match value {
            TokenError::Malformed => AuthFailure::Malformed,
            TokenError::Expired => AuthFailure::Expired,
            TokenError::SignatureInvalid => AuthFailure::SignatureInvalid,
            TokenError::SubjectMissing => AuthFailure::SubjectMissing,
        }
    }
}

/// What the authentication stages found out about a request.
///
/// Only [RequestContext::Authenticated] carries an identity, and it is only
/// constructed from a token that parsed and verified during this request.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum RequestContext {
    /// No bearer token was supplied.
    #[default]
    Anonymous,
    /// A token was supplied and rejected.
    Rejected(AuthFailure),
    /// A token was supplied but could not be checked, e.g. the user table
    /// could not be read.
    Unverified,
    /// A token was supplied and verified.
    Authenticated(VerifiedToken),
}

impl RequestContext {
    /// The verified identity of the requester, if any.
    pub fn identity(&self) -> Option<&Identity> {
        match self {
            RequestContext::Authenticated(verified) => Some(&verified.identity),
            _ => None,
        }
    }

    /// The raw claims of the verified token, if any.
    pub fn claims(&self) -> Option<&Claims> {
        match self {
            RequestContext::Authenticated(verified) => Some(&verified.claims),
            _ => None,
        }
    }
}

impl<S> FromRequestParts<S> for RequestContext
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts
            .extensions
            .get::<RequestContext>()
            .cloned()
            .unwrap_or_default())
    }
}

/// Extractor for the identity of an authenticated requester.
///
/// Rejects with [AccessDenied::AuthenticationRequired] if the route was not
/// behind an authentication stage or the token did not verify.
#[derive(Debug, Clone, PartialEq)]
pub struct CurrentUser(pub Identity);

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<RequestContext>()
            .and_then(RequestContext::identity)
            .cloned()
            .map(CurrentUser)
            .ok_or(Error::Authorization(AccessDenied::AuthenticationRequired))
    }
}
