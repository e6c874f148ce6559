//! Defines the transaction type model and its database queries.

use rusqlite::{Connection, Row};
use serde::{Deserialize, Serialize};

use crate::{Error, database_id::TransactionTypeId, name::Name};

/// A kind of transaction, e.g. "Income", "Expense" or "Transfer".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionType {
    /// The ID of the transaction type.
    pub id: TransactionTypeId,
    /// The name of the transaction type. Unique across all types.
    pub name: Name,
}

/// The data for creating or renaming a transaction type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionTypeData {
    /// The name of the transaction type.
    pub name: Name,
}

/// Create the transaction type table.
///
/// # Errors
/// Returns an error if the table cannot be created.
pub fn create_transaction_type_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS transaction_type (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL UNIQUE COLLATE NOCASE
        )",
        (),
    )?;

    Ok(())
}

fn map_row(row: &Row) -> Result<TransactionType, rusqlite::Error> {
    Ok(TransactionType {
        id: row.get(0)?,
        name: row.get(1)?,
    })
}

/// Insert a new transaction type.
///
/// # Errors
/// Returns a [Error::Duplicate] if the name is taken, ignoring case.
pub fn create_transaction_type(
    data: &TransactionTypeData,
    connection: &Connection,
) -> Result<TransactionType, Error> {
    connection
        .prepare("INSERT INTO transaction_type (name) VALUES (?1) RETURNING id, name")?
        .query_row([&data.name], map_row)
        .map_err(Error::from)
}

/// Get the transaction type with `id`.
///
/// # Errors
/// Returns [Error::NotFound] if there is no such transaction type.
pub fn get_transaction_type(
    id: TransactionTypeId,
    connection: &Connection,
) -> Result<TransactionType, Error> {
    connection
        .prepare("SELECT id, name FROM transaction_type WHERE id = :id")?
        .query_row(&[(":id", &id)], map_row)
        .map_err(Error::from)
}

/// Get every transaction type, ordered by name.
///
/// # Errors
/// Returns an error if there is an SQL error.
pub fn get_all_transaction_types(connection: &Connection) -> Result<Vec<TransactionType>, Error> {
    connection
        .prepare("SELECT id, name FROM transaction_type ORDER BY name ASC")?
        .query_map([], map_row)?
        .map(|maybe_type| maybe_type.map_err(Error::from))
        .collect()
}

/// Rename the transaction type with `id`.
///
/// # Errors
/// Returns [Error::NotFound] if there is no such transaction type, or
/// [Error::Duplicate] if the new name is taken.
pub fn update_transaction_type(
    id: TransactionTypeId,
    data: &TransactionTypeData,
    connection: &Connection,
) -> Result<TransactionType, Error> {
    connection
        .prepare("UPDATE transaction_type SET name = ?1 WHERE id = ?2 RETURNING id, name")?
        .query_row((&data.name, id), map_row)
        .map_err(Error::from)
}

/// Delete the transaction type with `id`.
///
/// # Errors
/// Returns [Error::NotFound] if there is no such transaction type, or
/// [Error::InvalidReference] if transactions still use it.
pub fn delete_transaction_type(
    id: TransactionTypeId,
    connection: &Connection,
) -> Result<(), Error> {
    let rows_affected =
        connection.execute("DELETE FROM transaction_type WHERE id = :id", &[(":id", &id)])?;

    if rows_affected == 0 {
        return Err(Error::NotFound);
    }

    Ok(())
}
