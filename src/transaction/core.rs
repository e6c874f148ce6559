//! Defines the core data models and database queries for transactions.

use rusqlite::{Connection, Row, named_params};
use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};

use crate::{
    Error,
    database_id::{AccountId, CategoryId, TransactionId, TransactionTypeId},
};

/// The longest description, in characters, a transaction may have.
pub const MAX_DESCRIPTION_LENGTH: usize = 500;

// ============================================================================
// MODELS
// ============================================================================

/// An expense or income, i.e. an event where money was either spent or earned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// The ID of the transaction.
    pub id: TransactionId,
    /// The account the money moved in or out of.
    pub account_id: AccountId,
    /// The kind of transaction, e.g. income or expense.
    pub type_id: TransactionTypeId,
    /// The category the transaction belongs to, if any.
    pub category_id: Option<CategoryId>,
    /// The amount of money spent or earned in this transaction.
    pub amount: f64,
    /// When the transaction happened.
    pub date: Date,
    /// A text description of what the transaction was for.
    pub description: String,
}

/// The data for creating or replacing a transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionData {
    /// The account the money moved in or out of.
    pub account_id: AccountId,
    /// The kind of transaction.
    pub type_id: TransactionTypeId,
    /// The category the transaction belongs to, if any.
    #[serde(default)]
    pub category_id: Option<CategoryId>,
    /// The monetary amount of the transaction.
    ///
    /// Positive values represent income/credits, negative values represent
    /// expenses/debits.
    pub amount: f64,
    /// When the transaction happened, defaults to today. Must not be in the future.
    #[serde(default)]
    pub date: Option<Date>,
    /// A text description of what the transaction was for.
    #[serde(default)]
    pub description: String,
}

/// A transaction that passed validation and is ready to be written.
struct ValidTransaction<'a> {
    data: &'a TransactionData,
    date: Date,
    description: &'a str,
}

impl TransactionData {
    fn validate(&self) -> Result<ValidTransaction<'_>, Error> {
        if !self.amount.is_finite() {
            return Err(Error::Validation("amount must be a finite number".to_owned()));
        }

        let today = OffsetDateTime::now_utc().date();
        let date = self.date.unwrap_or(today);
        if date > today {
            return Err(Error::Validation(format!(
                "date {date} is in the future, transactions must be dated no later than today"
            )));
        }

        let description = self.description.trim();
        if description.chars().count() > MAX_DESCRIPTION_LENGTH {
            return Err(Error::Validation(format!(
                "description must be at most {MAX_DESCRIPTION_LENGTH} characters"
            )));
        }

        Ok(ValidTransaction {
            data: self,
            date,
            description,
        })
    }
}

/// Narrows down the transactions returned by [get_transactions].
///
/// Every field that is set must match.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransactionFilter {
    /// Only include transactions for this account.
    pub account_id: Option<AccountId>,
    /// Only include transactions in this category.
    pub category_id: Option<CategoryId>,
    /// Only include transactions of this type.
    pub type_id: Option<TransactionTypeId>,
}

// ============================================================================
// DATABASE FUNCTIONS
// ============================================================================

/// Create the transaction table in the database.
///
/// Deleting an account deletes its transactions, deleting a category leaves
/// its transactions uncategorized and a transaction type cannot be deleted
/// while transactions use it.
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL error.
pub fn create_transaction_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS \"transaction\" (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                account_id INTEGER NOT NULL,
                type_id INTEGER NOT NULL,
                category_id INTEGER,
                amount REAL NOT NULL,
                date TEXT NOT NULL,
                description TEXT NOT NULL,
                FOREIGN KEY(account_id) REFERENCES account(id) ON UPDATE CASCADE ON DELETE CASCADE,
                FOREIGN KEY(type_id) REFERENCES transaction_type(id) ON UPDATE CASCADE ON DELETE RESTRICT,
                FOREIGN KEY(category_id) REFERENCES category(id) ON UPDATE CASCADE ON DELETE SET NULL
                )",
        (),
    )?;

    connection.execute(
        "CREATE INDEX IF NOT EXISTS idx_transaction_account_date ON \"transaction\"(account_id, date);",
        (),
    )?;

    Ok(())
}

/// Map a database row to a Transaction.
fn map_transaction_row(row: &Row) -> Result<Transaction, rusqlite::Error> {
    let id = row.get(0)?;
    let account_id = row.get(1)?;
    let type_id = row.get(2)?;
    let category_id = row.get(3)?;
    let amount = row.get(4)?;
    let date = row.get(5)?;
    let description = row.get(6)?;

    Ok(Transaction {
        id,
        account_id,
        type_id,
        category_id,
        amount,
        date,
        description,
    })
}

/// Create a new transaction in the database.
///
/// # Errors
/// This function will return a:
/// - [Error::Validation] if the amount is not finite, the date is in the future or the description is too long,
/// - [Error::InvalidReference] if the account, type or category does not exist,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn create_transaction(
    data: &TransactionData,
    connection: &Connection,
) -> Result<Transaction, Error> {
    let valid = data.validate()?;

    connection
        .prepare(
            "INSERT INTO \"transaction\" (account_id, type_id, category_id, amount, date, description)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             RETURNING id, account_id, type_id, category_id, amount, date, description",
        )?
        .query_row(
            (
                valid.data.account_id,
                valid.data.type_id,
                valid.data.category_id,
                valid.data.amount,
                valid.date,
                valid.description,
            ),
            map_transaction_row,
        )
        .map_err(Error::from)
}

/// Retrieve a transaction from the database by its `id`.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if `id` does not refer to a valid transaction,
/// - or [Error::SqlError] there is some other SQL error.
pub fn get_transaction(id: TransactionId, connection: &Connection) -> Result<Transaction, Error> {
    connection
        .prepare(
            "SELECT id, account_id, type_id, category_id, amount, date, description
             FROM \"transaction\" WHERE id = :id",
        )?
        .query_row(&[(":id", &id)], map_transaction_row)
        .map_err(Error::from)
}

/// Retrieve the transactions matching `filter`, newest first.
///
/// # Errors
/// This function will return a [Error::SqlError] there is some SQL error.
pub fn get_transactions(
    filter: &TransactionFilter,
    connection: &Connection,
) -> Result<Vec<Transaction>, Error> {
    connection
        .prepare(
            "SELECT id, account_id, type_id, category_id, amount, date, description
             FROM \"transaction\"
             WHERE (:account_id IS NULL OR account_id = :account_id)
               AND (:category_id IS NULL OR category_id = :category_id)
               AND (:type_id IS NULL OR type_id = :type_id)
             ORDER BY date DESC, id DESC",
        )?
        .query_map(
            named_params! {
                ":account_id": filter.account_id,
                ":category_id": filter.category_id,
                ":type_id": filter.type_id,
            },
            map_transaction_row,
        )?
        .map(|maybe_transaction| maybe_transaction.map_err(Error::from))
        .collect()
}

/// Replace the transaction with `id`.
///
/// # Errors
/// Returns [Error::NotFound] if there is no such transaction, and otherwise
/// the same errors as [create_transaction].
pub fn update_transaction(
    id: TransactionId,
    data: &TransactionData,
    connection: &Connection,
) -> Result<Transaction, Error> {
    let valid = data.validate()?;

    connection
        .prepare(
            "UPDATE \"transaction\"
             SET account_id = ?1, type_id = ?2, category_id = ?3, amount = ?4, date = ?5, description = ?6
             WHERE id = ?7
             RETURNING id, account_id, type_id, category_id, amount, date, description",
        )?
        .query_row(
            (
                valid.data.account_id,
                valid.data.type_id,
                valid.data.category_id,
                valid.data.amount,
                valid.date,
                valid.description,
                id,
            ),
            map_transaction_row,
        )
        .map_err(Error::from)
}

/// Delete the transaction with `id`.
///
/// # Errors
/// Returns [Error::NotFound] if there is no such transaction.
pub fn delete_transaction(id: TransactionId, connection: &Connection) -> Result<(), Error> {
    let rows_affected =
        connection.execute("DELETE FROM \"transaction\" WHERE id = :id", &[(":id", &id)])?;

    if rows_affected == 0 {
        return Err(Error::NotFound);
    }

    Ok(())
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod database_tests {
    use rusqlite::Connection;
    use time::{Duration, OffsetDateTime, macros::date};

    use crate::{
        Error,
        account::{AccountData, create_account, delete_account},
        category::{CategoryData, create_category, delete_category},
        db::initialize,
        name::Name,
        transaction_type::{TransactionTypeData, create_transaction_type, delete_transaction_type},
    };

    use super::{
        TransactionData, TransactionFilter, create_transaction, delete_transaction,
        get_transaction, get_transactions, update_transaction,
    };

    struct Fixture {
        connection: Connection,
        account_id: i64,
        type_id: i64,
        category_id: i64,
    }

    fn get_fixture() -> Fixture {
        let connection = Connection::open_in_memory().unwrap();
        initialize(&connection).unwrap();
        let account = create_account(
            &AccountData {
                name: Name::new_unchecked("Everyday"),
                balance: 0.0,
                date: None,
            },
            &connection,
        )
        .unwrap();
        let transaction_type = create_transaction_type(
            &TransactionTypeData {
                name: Name::new_unchecked("Expense"),
            },
            &connection,
        )
        .unwrap();
        let category = create_category(
            &CategoryData {
                name: Name::new_unchecked("Groceries"),
                description: None,
            },
            &connection,
        )
        .unwrap();

        Fixture {
            connection,
            account_id: account.id,
            type_id: transaction_type.id,
            category_id: category.id,
        }
    }

    fn data(fixture: &Fixture, amount: f64) -> TransactionData {
        TransactionData {
            account_id: fixture.account_id,
            type_id: fixture.type_id,
            category_id: Some(fixture.category_id),
            amount,
            date: Some(date!(2025 - 03 - 14)),
            description: "  Supermarket ".to_owned(),
        }
    }

    #[test]
    fn create_then_get() {
        let fixture = get_fixture();

        let transaction = create_transaction(&data(&fixture, -42.5), &fixture.connection).unwrap();

        assert_eq!(transaction.description, "Supermarket");
        assert_eq!(transaction.category_id, Some(fixture.category_id));
        assert_eq!(
            get_transaction(transaction.id, &fixture.connection),
            Ok(transaction)
        );
    }

    #[test]
    fn create_fails_on_missing_account() {
        let fixture = get_fixture();
        let mut data = data(&fixture, 1.0);
        data.account_id = 999;

        let result = create_transaction(&data, &fixture.connection);

        assert!(matches!(result, Err(Error::InvalidReference(_))), "got {result:?}");
    }

    #[test]
    fn create_fails_on_future_date() {
        let fixture = get_fixture();
        let mut data = data(&fixture, 1.0);
        data.date = Some(OffsetDateTime::now_utc().date() + Duration::days(2));

        let result = create_transaction(&data, &fixture.connection);

        assert!(matches!(result, Err(Error::Validation(_))), "got {result:?}");
    }

    #[test]
    fn create_fails_on_nan_amount() {
        let fixture = get_fixture();

        let result = create_transaction(&data(&fixture, f64::NAN), &fixture.connection);

        assert!(matches!(result, Err(Error::Validation(_))), "got {result:?}");
    }

    #[test]
    fn get_transactions_applies_filter() {
        let fixture = get_fixture();
        let categorized = create_transaction(&data(&fixture, 1.0), &fixture.connection).unwrap();
        let mut uncategorized = data(&fixture, 2.0);
        uncategorized.category_id = None;
        let uncategorized = create_transaction(&uncategorized, &fixture.connection).unwrap();

        let all = get_transactions(&TransactionFilter::default(), &fixture.connection).unwrap();
        let in_category = get_transactions(
            &TransactionFilter {
                category_id: Some(fixture.category_id),
                ..Default::default()
            },
            &fixture.connection,
        )
        .unwrap();

        assert_eq!(all, vec![uncategorized, categorized.clone()]);
        assert_eq!(in_category, vec![categorized]);
    }

    #[test]
    fn update_replaces_fields() {
        let fixture = get_fixture();
        let transaction = create_transaction(&data(&fixture, 1.0), &fixture.connection).unwrap();
        let mut new_data = data(&fixture, 99.0);
        new_data.category_id = None;

        let updated = update_transaction(transaction.id, &new_data, &fixture.connection).unwrap();

        assert_eq!(updated.amount, 99.0);
        assert_eq!(updated.category_id, None);
        assert_eq!(
            update_transaction(999, &new_data, &fixture.connection),
            Err(Error::NotFound)
        );
    }

    #[test]
    fn deleting_category_uncategorizes_transactions() {
        let fixture = get_fixture();
        let transaction = create_transaction(&data(&fixture, 1.0), &fixture.connection).unwrap();

        delete_category(fixture.category_id, &fixture.connection).unwrap();

        let transaction = get_transaction(transaction.id, &fixture.connection).unwrap();
        assert_eq!(transaction.category_id, None);
    }

    #[test]
    fn deleting_account_deletes_transactions() {
        let fixture = get_fixture();
        let transaction = create_transaction(&data(&fixture, 1.0), &fixture.connection).unwrap();

        delete_account(fixture.account_id, &fixture.connection).unwrap();

        assert_eq!(
            get_transaction(transaction.id, &fixture.connection),
            Err(Error::NotFound)
        );
    }

    #[test]
    fn deleting_type_in_use_fails() {
        let fixture = get_fixture();
        create_transaction(&data(&fixture, 1.0), &fixture.connection).unwrap();

        let result = delete_transaction_type(fixture.type_id, &fixture.connection);

        assert!(matches!(result, Err(Error::InvalidReference(_))), "got {result:?}");
    }

    #[test]
    fn delete_removes_transaction() {
        let fixture = get_fixture();
        let transaction = create_transaction(&data(&fixture, 1.0), &fixture.connection).unwrap();

        delete_transaction(transaction.id, &fixture.connection).unwrap();

        assert_eq!(
            delete_transaction(transaction.id, &fixture.connection),
            Err(Error::NotFound)
        );
    }
}
