//! Bearer token authentication and authorization.
//!
//! Requests pass through a [Pipeline] of [Stage]s. The authentication stages
//! resolve the bearer token into a [RequestContext] and the admin stage checks
//! the resolved [Identity] against an [AdminPolicy].

mod admin;
mod context;
mod identity;
mod log_in;
mod middleware;
mod password;
mod pipeline;
mod token;
mod user;

pub use admin::{AccessDenied, AdminPolicy, RequireAdmin, SingleAdminEmail};
pub use context::{AuthFailure, CurrentUser, RequestContext};
pub use identity::{Identity, IdentityStore, SqliteIdentityStore};
pub use log_in::{LogInState, get_me, get_session, post_log_in};
pub use middleware::{Authenticate, Authenticator, OptionalAuthenticate, extract_bearer_token};
pub use password::{PasswordHash, ValidatedPassword};
pub use pipeline::{Flow, Pipeline, Stage, run_pipeline};
pub use token::{Claims, IssuedToken, TokenCodec, TokenError, VerifiedToken};
pub use user::{User, UserID, create_user, create_user_table, get_user_by_email, get_user_by_id};
