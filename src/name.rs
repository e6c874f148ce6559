//! A validated display name shared by accounts, categories and transaction types.

use std::fmt::Display;

use rusqlite::{
    ToSql,
    types::{FromSql, FromSqlResult, ToSqlOutput, ValueRef},
};
use serde::{Deserialize, Serialize};

use crate::Error;

/// The longest name, in characters, that may be stored.
pub const MAX_NAME_LENGTH: usize = 100;

/// A name with surrounding whitespace removed that is neither empty nor longer
/// than [MAX_NAME_LENGTH] characters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Name(String);

impl Name {
    /// Create and validate a name.
    ///
    /// # Errors
    ///
    /// This function will return an [Error::Validation] if `name` is empty or
    /// only whitespace, or if it is too long.
    pub fn new(name: &str) -> Result<Self, Error> {
        let name = name.trim();

        if name.is_empty() {
            return Err(Error::Validation("name must not be empty".to_owned()));
        }

        if name.chars().count() > MAX_NAME_LENGTH {
            return Err(Error::Validation(format!(
                "name must be at most {MAX_NAME_LENGTH} characters"
            )));
        }

        Ok(Self(name.to_owned()))
    }

    /// Create a name without validation.
    ///
    /// The caller should ensure that the string is trimmed and not empty.
    pub fn new_unchecked(name: &str) -> Self {
        Self(name.to_owned())
    }
}

impl AsRef<str> for Name {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Display for Name {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Name {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Name::new(&value)
    }
}

impl From<Name> for String {
    fn from(name: Name) -> Self {
        name.0
    }
}

impl ToSql for Name {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        self.0.to_sql()
    }
}

impl FromSql for Name {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        String::column_result(value).map(Self)
    }
}
