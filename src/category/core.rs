//! Defines the category model and its database queries.

use rusqlite::{Connection, Row};
use serde::{Deserialize, Serialize};

use crate::{Error, database_id::CategoryId, name::Name};

/// The longest description, in characters, a category may have.
pub const MAX_DESCRIPTION_LENGTH: usize = 500;

/// A category for expenses and income, e.g., 'Groceries', 'Eating Out', 'Wages'.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    /// The ID of the category.
    pub id: CategoryId,
    /// The name of the category. Unique across all categories.
    pub name: Name,
    /// An optional note on what belongs in the category.
    pub description: Option<String>,
}

/// The data for creating or replacing a category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryData {
    /// The name of the category.
    pub name: Name,
    /// An optional note on what belongs in the category.
    #[serde(default)]
    pub description: Option<String>,
}

impl CategoryData {
    /// The description with blank descriptions treated as missing.
    fn description(&self) -> Result<Option<&str>, Error> {
        let description = self
            .description
            .as_deref()
            .map(str::trim)
            .filter(|description| !description.is_empty());

        if description.is_some_and(|description| description.chars().count() > MAX_DESCRIPTION_LENGTH)
        {
            return Err(Error::Validation(format!(
                "description must be at most {MAX_DESCRIPTION_LENGTH} characters"
            )));
        }

        Ok(description)
    }
}

/// Create the category table.
///
/// # Errors
/// Returns an error if the table cannot be created.
pub fn create_category_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS category (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL UNIQUE COLLATE NOCASE,
            description TEXT
        )",
        (),
    )?;

    Ok(())
}

fn map_category_row(row: &Row) -> Result<Category, rusqlite::Error> {
    let id = row.get(0)?;
    let name = row.get(1)?;
    let description = row.get(2)?;

    Ok(Category {
        id,
        name,
        description,
    })
}

/// Insert a new category.
///
/// # Errors
/// Returns a [Error::Duplicate] if the name is taken, ignoring case, or
/// [Error::Validation] if the description is too long.
pub fn create_category(data: &CategoryData, connection: &Connection) -> Result<Category, Error> {
    let description = data.description()?;

    connection
        .prepare(
            "INSERT INTO category (name, description) VALUES (?1, ?2)
             RETURNING id, name, description",
        )?
        .query_row((&data.name, description), map_category_row)
        .map_err(Error::from)
}

/// Get the category with `id`.
///
/// # Errors
/// Returns [Error::NotFound] if there is no such category.
pub fn get_category(id: CategoryId, connection: &Connection) -> Result<Category, Error> {
    connection
        .prepare("SELECT id, name, description FROM category WHERE id = :id")?
        .query_row(&[(":id", &id)], map_category_row)
        .map_err(Error::from)
}

/// Get every category, ordered by name.
///
/// # Errors
/// Returns an error if there is an SQL error.
pub fn get_all_categories(connection: &Connection) -> Result<Vec<Category>, Error> {
    connection
        .prepare("SELECT id, name, description FROM category ORDER BY name ASC")?
        .query_map([], map_category_row)?
        .map(|maybe_category| maybe_category.map_err(Error::from))
        .collect()
}

/// Replace the name and description of the category with `id`.
///
/// # Errors
/// Returns [Error::NotFound] if there is no such category, or
/// [Error::Duplicate] if the new name is taken.
pub fn update_category(
    id: CategoryId,
    data: &CategoryData,
    connection: &Connection,
) -> Result<Category, Error> {
    let description = data.description()?;

    connection
        .prepare(
            "UPDATE category SET name = ?1, description = ?2 WHERE id = ?3
             RETURNING id, name, description",
        )?
        .query_row((&data.name, description, id), map_category_row)
        .map_err(Error::from)
}

/// Delete the category with `id`. Transactions in the category become uncategorized.
///
/// # Errors
/// Returns [Error::NotFound] if there is no such category.
pub fn delete_category(id: CategoryId, connection: &Connection) -> Result<(), Error> {
    let rows_affected =
        connection.execute("DELETE FROM category WHERE id = :id", &[(":id", &id)])?;

    if rows_affected == 0 {
        return Err(Error::NotFound);
    }

    Ok(())
}
