//! Defines the account model and its database queries.

use rusqlite::{Connection, Row};
use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};

use crate::{Error, database_id::AccountId, name::Name};

/// The amount of money available for a bank account or credit card.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    /// The id for the account.
    pub id: AccountId,
    /// The name of the account. Unique across all accounts.
    pub name: Name,
    /// The balance.
    pub balance: f64,
    /// When the balance was updated.
    pub date: Date,
}

/// The data for creating or replacing an account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountData {
    /// The name of the account.
    pub name: Name,
    /// The balance in dollars.
    pub balance: f64,
    /// When the balance was checked, defaults to today.
    #[serde(default)]
    pub date: Option<Date>,
}

impl AccountData {
    fn validate(&self) -> Result<Date, Error> {
        if !self.balance.is_finite() {
            return Err(Error::Validation("balance must be a finite number".to_owned()));
        }

        Ok(self
            .date
            .unwrap_or_else(|| OffsetDateTime::now_utc().date()))
    }
}

/// Create the account table.
///
/// # Errors
/// Returns an error if the table cannot be created.
pub fn create_account_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS account (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL UNIQUE,
            balance REAL NOT NULL,
            date TEXT NOT NULL
        )",
        (),
    )?;

    Ok(())
}

fn map_row_to_account(row: &Row) -> Result<Account, rusqlite::Error> {
    let id = row.get(0)?;
    let name = row.get(1)?;
    let balance = row.get(2)?;
    let date = row.get(3)?;

    Ok(Account {
        id,
        name,
        balance,
        date,
    })
}

/// Insert a new account.
///
/// # Errors
/// Returns a [Error::Duplicate] if the name is taken, [Error::Validation] if
/// the balance is not a finite number, or [Error::SqlError] on other SQL errors.
pub fn create_account(data: &AccountData, connection: &Connection) -> Result<Account, Error> {
    let date = data.validate()?;

    connection
        .prepare(
            "INSERT INTO account (name, balance, date) VALUES (?1, ?2, ?3)
             RETURNING id, name, balance, date",
        )?
        .query_row((&data.name, data.balance, date), map_row_to_account)
        .map_err(Error::from)
}

/// Get the account with `id`.
///
/// # Errors
/// Returns [Error::NotFound] if there is no such account.
pub fn get_account(id: AccountId, connection: &Connection) -> Result<Account, Error> {
    connection
        .prepare("SELECT id, name, balance, date FROM account WHERE id = :id")?
        .query_row(&[(":id", &id)], map_row_to_account)
        .map_err(Error::from)
}

/// Get every account, ordered by name.
///
/// # Errors
/// Returns an error if there is an SQL error.
pub fn get_all_accounts(connection: &Connection) -> Result<Vec<Account>, Error> {
    connection
        .prepare("SELECT id, name, balance, date FROM account ORDER BY name ASC")?
        .query_map([], map_row_to_account)?
        .map(|maybe_account| maybe_account.map_err(Error::from))
        .collect()
}

/// Replace the name, balance and date of the account with `id`.
///
/// # Errors
/// Returns [Error::NotFound] if there is no such account, or [Error::Duplicate]
/// if the new name belongs to another account.
pub fn update_account(
    id: AccountId,
    data: &AccountData,
    connection: &Connection,
) -> Result<Account, Error> {
    let date = data.validate()?;

    connection
        .prepare(
            "UPDATE account SET name = ?1, balance = ?2, date = ?3 WHERE id = ?4
             RETURNING id, name, balance, date",
        )?
        .query_row((&data.name, data.balance, date, id), map_row_to_account)
        .map_err(Error::from)
}

/// Delete the account with `id` along with its transactions.
///
/// # Errors
/// Returns [Error::NotFound] if there is no such account.
pub fn delete_account(id: AccountId, connection: &Connection) -> Result<(), Error> {
    let rows_affected = connection.execute("DELETE FROM account WHERE id = :id", &[(":id", &id)])?;

    if rows_affected == 0 {
        return Err(Error::NotFound);
    }

    Ok(())
}
