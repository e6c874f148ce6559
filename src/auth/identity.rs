//! The identity a verified token resolves to, and where identities are looked up.

use std::sync::{Arc, Mutex};

use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::{
    Error,
    auth::{UserID, get_user_by_id},
    db::lock_connection,
};

/// The claims the server trusts about a requester once their token verifies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// The user's ID in the application database.
    #[serde(rename = "id")]
    pub user_id: UserID,
    /// The user's email address.
    pub email: String,
}

/// Resolves user IDs to identities.
///
/// Token verification uses this to reject tokens issued to users that have
/// since been deleted.
pub trait IdentityStore: Send + Sync {
    /// Get the identity for `user_id`, or `None` if there is no such user.
    ///
    /// # Errors
    /// Returns an error if the store could not be queried.
    fn find_identity(&self, user_id: UserID) -> Result<Option<Identity>, Error>;
}

/// An [IdentityStore] backed by the user table.
#[derive(Debug, Clone)]
pub struct SqliteIdentityStore {
    db_connection: Arc<Mutex<Connection>>,
}

impl SqliteIdentityStore {
    /// Create an identity store that reads from `db_connection`.
    pub fn new(db_connection: Arc<Mutex<Connection>>) -> Self {
        Self { db_connection }
    }
}

impl IdentityStore for SqliteIdentityStore {
    fn find_identity(&self, user_id: UserID) -> Result<Option<Identity>, Error> {
        let connection = lock_connection(&self.db_connection)?;

        match get_user_by_id(user_id, &connection) {
            Ok(user) => Ok(Some(user.identity())),
            Err(Error::NotFound) => Ok(None),
            Err(error) => Err(error),
        }
    }
}
