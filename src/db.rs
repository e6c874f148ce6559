//! Creates the application's tables and guards access to the shared connection.

use std::sync::{Arc, Mutex, MutexGuard};

use rusqlite::{Connection, Transaction as SqlTransaction, TransactionBehavior};

use crate::{
    Error,
    account::create_account_table,
    auth::create_user_table,
    category::{CategoryData, create_category, create_category_table},
    name::Name,
    transaction::create_transaction_table,
    transaction_type::{
        TransactionTypeData, create_transaction_type, create_transaction_type_table,
    },
};

/// The transaction types a new database starts with.
pub const DEFAULT_TRANSACTION_TYPES: [&str; 3] = ["Income", "Expense", "Transfer"];

/// The categories, and their descriptions, a new database starts with.
pub const DEFAULT_CATEGORIES: [(&str, &str); 6] = [
    ("Salary", "Wages and other employment income"),
    ("Groceries", "Food and household supplies"),
    ("Rent", "Rent or mortgage payments"),
    ("Utilities", "Power, water, internet and phone bills"),
    ("Transport", "Fuel, public transport and parking"),
    ("Entertainment", "Eating out, streaming and hobbies"),
];

/// Create all of the application's tables if they do not exist.
///
/// Foreign key enforcement is switched on for `connection`, SQLite leaves it
/// off by default.
///
/// # Errors
/// Returns an error if a table could not be created.
pub fn initialize(connection: &Connection) -> Result<(), Error> {
    connection.pragma_update(None, "foreign_keys", "ON")?;

    let transaction = SqlTransaction::new_unchecked(connection, TransactionBehavior::Exclusive)?;

    create_user_table(&transaction)?;
    create_account_table(&transaction)?;
    create_transaction_type_table(&transaction)?;
    create_category_table(&transaction)?;
    create_transaction_table(&transaction)?;

    transaction.commit()?;

    Ok(())
}

/// Insert the default transaction types and categories.
///
/// Names that already exist are skipped, so seeding twice is harmless.
/// Returns the number of rows inserted.
///
/// # Errors
/// Returns an error if a row could not be inserted for any other reason.
pub fn seed_reference_data(connection: &Connection) -> Result<usize, Error> {
    let mut inserted = 0;

    for name in DEFAULT_TRANSACTION_TYPES {
        let data = TransactionTypeData {
            name: Name::new_unchecked(name),
        };

        match create_transaction_type(&data, connection) {
            Ok(_) => inserted += 1,
            Err(Error::Duplicate(_)) => tracing::debug!("Transaction type {name} already exists"),
            Err(error) => return Err(error),
        }
    }

    for (name, description) in DEFAULT_CATEGORIES {
        let data = CategoryData {
            name: Name::new_unchecked(name),
            description: Some(description.to_owned()),
        };

        match create_category(&data, connection) {
            Ok(_) => inserted += 1,
            Err(Error::Duplicate(_)) => tracing::debug!("Category {name} already exists"),
            Err(error) => return Err(error),
        }
    }

    Ok(inserted)
}

/// Lock the shared database connection.
///
/// # Errors
/// Returns [Error::DatabaseLockError] if the mutex was poisoned.
pub fn lock_connection(
    db_connection: &Arc<Mutex<Connection>>,
) -> Result<MutexGuard<'_, Connection>, Error> {
    db_connection.lock().map_err(|error| {
        tracing::error!("Could not acquire database lock: {error}");
        Error::DatabaseLockError
    })
}
