//! The shared category lookup table used to label transactions and budgets.

use axum::{extract::State, http::StatusCode, response::Response};
use rusqlite::Connection;
use serde::Serialize;

use crate::{AppState, Error, database_id::CategoryId, responses::ok};

/// A spending category, e.g. "Groceries", "Bills". Shared across all users.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Category {
    /// The ID of the category.
    pub id: CategoryId,
    /// The display name of the category.
    pub name: String,
}

/// List every category, ordered by name.
///
/// # Errors
/// Returns [Error::SqlError] if there is an SQL error.
pub fn list_categories(connection: &Connection) -> Result<Vec<Category>, Error> {
    connection
        .prepare("SELECT id, name FROM category ORDER BY name ASC")?
        .query_map([], |row| {
            Ok(Category {
                id: row.get(0)?,
                name: row.get(1)?,
            })
        })?
        .map(|result| result.map_err(Error::SqlError))
        .collect()
}

/// A route handler that lists the category options for transaction and budget
/// forms.
pub async fn list_categories_endpoint(State(state): State<AppState>) -> Result<Response, Error> {
    let connection = state
        .db_connection
        .lock()
        .map_err(|_| Error::DatabaseLockError)?;

    let categories = list_categories(&connection)?;

    Ok(ok(StatusCode::OK, categories))
}

#[cfg(test)]
mod tests {
    use rusqlite::Connection;

    use crate::initialize_db;

    use super::list_categories;

    #[test]
    fn lists_seeded_categories_in_name_order() {
        let connection = Connection::open_in_memory().unwrap();
        initialize_db(&connection).unwrap();

        let categories = list_categories(&connection).unwrap();

        assert_eq!(categories.len(), 10);
        let names: Vec<&str> = categories.iter().map(|c| c.name.as_str()).collect();
        let mut sorted = names.clone();
        sorted.sort();
        assert_eq!(names, sorted);
    }
}
