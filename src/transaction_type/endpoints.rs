//! The JSON endpoints for managing transaction types.
//!
//! Reading is open to every authenticated user, changes are routed behind the
//! admin stage.

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
    database_id::TransactionTypeId,
    db::lock_connection,
    extract::{ApiJson, ApiPath},
    transaction_type::{
        TransactionType, TransactionTypeData, create_transaction_type, delete_transaction_type,
        get_all_transaction_types, get_transaction_type, update_transaction_type,
    },
};

/// The state needed to manage transaction types.
#[derive(Debug, Clone)]
pub struct TransactionTypeState {
    /// The database connection for managing transaction types.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for TransactionTypeState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// List every transaction type.
pub async fn list_transaction_types_endpoint(
    State(state): State<TransactionTypeState>,
) -> Result<Json<Vec<TransactionType>>, Error> {
    let connection = lock_connection(&state.db_connection)?;

    get_all_transaction_types(&connection).map(Json)
}

/// Get a single transaction type.
pub async fn get_transaction_type_endpoint(
    State(state): State<TransactionTypeState>,
    ApiPath(type_id): ApiPath<TransactionTypeId>,
) -> Result<Json<TransactionType>, Error> {
    let connection = lock_connection(&state.db_connection)?;

    get_transaction_type(type_id, &connection).map(Json)
}

/// Create a transaction type, responds with status 201.
pub async fn create_transaction_type_endpoint(
    State(state): State<TransactionTypeState>,
    CurrentUser(admin): CurrentUser,
    ApiJson(data): ApiJson<TransactionTypeData>,
) -> Result<(StatusCode, Json<TransactionType>), Error> {
    let connection = lock_connection(&state.db_connection)?;
    let transaction_type = create_transaction_type(&data, &connection)?;
    tracing::info!(
        "Admin {} created transaction type {} ({})",
        admin.email,
        transaction_type.id,
        transaction_type.name
    );

    Ok((StatusCode::CREATED, Json(transaction_type)))
}

/// Rename a transaction type.
pub async fn update_transaction_type_endpoint(
    State(state): State<TransactionTypeState>,
    CurrentUser(admin): CurrentUser,
    ApiPath(type_id): ApiPath<TransactionTypeId>,
    ApiJson(data): ApiJson<TransactionTypeData>,
) -> Result<Json<TransactionType>, Error> {
    let connection = lock_connection(&state.db_connection)?;
    let transaction_type = update_transaction_type(type_id, &data, &connection)?;
    tracing::info!("Admin {} renamed transaction type {type_id}", admin.email);

    Ok(Json(transaction_type))
}

/// Delete a transaction type that no transaction uses, responds with status 204.
pub async fn delete_transaction_type_endpoint(
    State(state): State<TransactionTypeState>,
    CurrentUser(admin): CurrentUser,
    ApiPath(type_id): ApiPath<TransactionTypeId>,
) -> Result<StatusCode, Error> {
    let connection = lock_connection(&state.db_connection)?;
    delete_transaction_type(type_id, &connection)?;
    tracing::info!("Admin {} deleted transaction type {type_id}", admin.email);

    Ok(StatusCode::NO_CONTENT)
}
