//! The JSON endpoints for managing accounts.

use std::sync::{Arc, Mutex};

use axum::{
    Json,
    extract::{FromRef, State},
    http::StatusCode,
};
use rusqlite::Connection;

use crate::{
    AppState, Error,
    account::{
        Account, AccountData, create_account, delete_account, get_account, get_all_accounts,
        update_account,
    },
    auth::CurrentUser,
    database_id::AccountId,
    db::lock_connection,
    extract::{ApiJson, ApiPath},
};

/// The state needed to manage accounts.
#[derive(Debug, Clone)]
pub struct AccountState {
    /// The database connection for managing accounts.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for AccountState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// List every account.
pub async fn list_accounts_endpoint(
    State(state): State<AccountState>,
) -> Result<Json<Vec<Account>>, Error> {
    let connection = lock_connection(&state.db_connection)?;

    get_all_accounts(&connection).map(Json)
}

/// Get a single account.
pub async fn get_account_endpoint(
    State(state): State<AccountState>,
    ApiPath(account_id): ApiPath<AccountId>,
) -> Result<Json<Account>, Error> {
    let connection = lock_connection(&state.db_connection)?;

    get_account(account_id, &connection).map(Json)
}

/// Create an account, responds with the new account and status 201.
pub async fn create_account_endpoint(
    State(state): State<AccountState>,
    CurrentUser(user): CurrentUser,
    ApiJson(data): ApiJson<AccountData>,
) -> Result<(StatusCode, Json<Account>), Error> {
    let connection = lock_connection(&state.db_connection)?;
    let account = create_account(&data, &connection)?;
    tracing::info!("User {} created account {}", user.user_id, account.id);

    Ok((StatusCode::CREATED, Json(account)))
}

/// Replace an account.
pub async fn update_account_endpoint(
    State(state): State<AccountState>,
    CurrentUser(user): CurrentUser,
    ApiPath(account_id): ApiPath<AccountId>,
    ApiJson(data): ApiJson<AccountData>,
) -> Result<Json<Account>, Error> {
    let connection = lock_connection(&state.db_connection)?;
    let account = update_account(account_id, &data, &connection)?;
    tracing::info!("User {} updated account {account_id}", user.user_id);

    Ok(Json(account))
}

/// Delete an account and its transactions, responds with status 204.
pub async fn delete_account_endpoint(
    State(state): State<AccountState>,
    CurrentUser(user): CurrentUser,
    ApiPath(account_id): ApiPath<AccountId>,
) -> Result<StatusCode, Error> {
    let connection = lock_connection(&state.db_connection)?;
    delete_account(account_id, &connection)?;
    tracing::info!("User {} deleted account {account_id}", user.user_id);

    Ok(StatusCode::NO_CONTENT)
}
