//! Request extractors that reject with the app's [Error] type.
//!
//! The axum extractors reject with plain text bodies, these wrappers route the
//! rejections through [Error] so clients always get the JSON error envelope.

use axum::extract::{FromRequest, FromRequestParts};

use crate::Error;

/// Like [axum::Json], but rejects malformed bodies with [Error::Validation].
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(Error))]
pub struct ApiJson<T>(pub T);

/// Like [axum::extract::Path], but rejects bad path parameters with [Error::Validation].
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(Error))]
pub struct ApiPath<T>(pub T);

/// Like [axum::extract::Query], but rejects bad query strings with [Error::Validation].
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(Error))]
pub struct ApiQuery<T>(pub T);
