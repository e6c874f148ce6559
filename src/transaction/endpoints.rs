//! The JSON endpoints for managing transactions.

use std::sync::{Arc, Mutex};

use axum::{
    Json,
    extract::{FromRef, State},
    http::StatusCode,
};
use rusqlite::Connection;

use crate::{
    AppState, Error,
    auth::CurrentUser,
    database_id::TransactionId,
    db::lock_connection,
    extract::{ApiJson, ApiPath, ApiQuery},
    transaction::{
        Transaction, TransactionData, TransactionFilter, create_transaction, delete_transaction,
        get_transaction, get_transactions, update_transaction,
    },
};

/// The state needed to manage transactions.
#[derive(Debug, Clone)]
pub struct TransactionState {
    /// The database connection for managing transactions.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for TransactionState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// List the transactions matching the `account_id`, `category_id` and
/// `type_id` query parameters, newest first.
pub async fn list_transactions_endpoint(
    State(state): State<TransactionState>,
    ApiQuery(filter): ApiQuery<TransactionFilter>,
) -> Result<Json<Vec<Transaction>>, Error> {
    let connection = lock_connection(&state.db_connection)?;

    get_transactions(&filter, &connection).map(Json)
}

/// Get a single transaction.
pub async fn get_transaction_endpoint(
    State(state): State<TransactionState>,
    ApiPath(transaction_id): ApiPath<TransactionId>,
) -> Result<Json<Transaction>, Error> {
    let connection = lock_connection(&state.db_connection)?;

    get_transaction(transaction_id, &connection).map(Json)
}

/// Record a transaction, responds with status 201.
pub async fn create_transaction_endpoint(
    State(state): State<TransactionState>,
    CurrentUser(user): CurrentUser,
    ApiJson(data): ApiJson<TransactionData>,
) -> Result<(StatusCode, Json<Transaction>), Error> {
    let connection = lock_connection(&state.db_connection)?;
    let transaction = create_transaction(&data, &connection)?;
    tracing::info!(
        "User {} created transaction {} for account {}",
        user.user_id,
        transaction.id,
        transaction.account_id
    );

    Ok((StatusCode::CREATED, Json(transaction)))
}

/// Replace a transaction.
pub async fn update_transaction_endpoint(
    State(state): State<TransactionState>,
    CurrentUser(user): CurrentUser,
    ApiPath(transaction_id): ApiPath<TransactionId>,
    ApiJson(data): ApiJson<TransactionData>,
) -> Result<Json<Transaction>, Error> {
    let connection = lock_connection(&state.db_connection)?;
    let transaction = update_transaction(transaction_id, &data, &connection)?;
    tracing::info!("User {} updated transaction {transaction_id}", user.user_id);

    Ok(Json(transaction))
}

/// Delete a transaction, responds with status 204.
pub async fn delete_transaction_endpoint(
    State(state): State<TransactionState>,
    CurrentUser(user): CurrentUser,
    ApiPath(transaction_id): ApiPath<TransactionId>,
) -> Result<StatusCode, Error> {
    let connection = lock_connection(&state.db_connection)?;
    delete_transaction(transaction_id, &connection)?;
    tracing::info!("User {} deleted transaction {transaction_id}", user.user_id);

    Ok(StatusCode::NO_CONTENT)
}
