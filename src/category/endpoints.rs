//! The JSON endpoints for managing categories.
//!
//! Categories are shared by every user, so only the admin may change them.

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
    category::{
        Category, CategoryData, create_category, delete_category, get_all_categories,
        get_category, update_category,
    },
    database_id::CategoryId,
    db::lock_connection,
    extract::{ApiJson, ApiPath},
};

/// The state needed to manage categories.
#[derive(Debug, Clone)]
pub struct CategoryState {
    /// The database connection for managing categories.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for CategoryState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// List every category.
pub async fn list_categories_endpoint(
    State(state): State<CategoryState>,
) -> Result<Json<Vec<Category>>, Error> {
    let connection = lock_connection(&state.db_connection)?;

    get_all_categories(&connection).map(Json)
}

/// Get a single category.
pub async fn get_category_endpoint(
    State(state): State<CategoryState>,
    ApiPath(category_id): ApiPath<CategoryId>,
) -> Result<Json<Category>, Error> {
    let connection = lock_connection(&state.db_connection)?;

    get_category(category_id, &connection).map(Json)
}

/// Create a category, responds with status 201.
pub async fn create_category_endpoint(
    State(state): State<CategoryState>,
    CurrentUser(admin): CurrentUser,
    ApiJson(data): ApiJson<CategoryData>,
) -> Result<(StatusCode, Json<Category>), Error> {
    let connection = lock_connection(&state.db_connection)?;
    let category = create_category(&data, &connection)?;
    tracing::info!(
        "Admin {} created category {} ({})",
        admin.email,
        category.id,
        category.name
    );

    Ok((StatusCode::CREATED, Json(category)))
}

/// Replace a category.
pub async fn update_category_endpoint(
    State(state): State<CategoryState>,
    CurrentUser(admin): CurrentUser,
    ApiPath(category_id): ApiPath<CategoryId>,
    ApiJson(data): ApiJson<CategoryData>,
) -> Result<Json<Category>, Error> {
    let connection = lock_connection(&state.db_connection)?;
    let category = update_category(category_id, &data, &connection)?;
    tracing::info!("Admin {} updated category {category_id}", admin.email);

    Ok(Json(category))
}

/// Delete a category, responds with status 204.
///
/// Transactions in the category are kept and become uncategorized.
pub async fn delete_category_endpoint(
    State(state): State<CategoryState>,
    CurrentUser(admin): CurrentUser,
    ApiPath(category_id): ApiPath<CategoryId>,
) -> Result<StatusCode, Error> {
    let connection = lock_connection(&state.db_connection)?;
    delete_category(category_id, &connection)?;
    tracing::info!("Admin {} deleted category {category_id}", admin.email);

    Ok(StatusCode::NO_CONTENT)
}
