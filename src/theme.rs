//! The shared color theme lookup table used to tag pots and budgets.

use axum::{extract::State, http::StatusCode, response::Response};
use rusqlite::Connection;
use serde::Serialize;

use crate::{AppState, Error, database_id::ThemeId, responses::ok};

/// A color tag, e.g. "Navy" `#626070`. Shared across all users; each user may
/// use a given theme for at most one pot and one budget.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Theme {
    /// The ID of the theme.
    pub id: ThemeId,
    /// The display name of the theme.
    pub name: String,
    /// The hex color value, e.g. "#277C78".
    pub color: String,
}

/// List every theme in seed order.
///
/// # Errors
/// Returns [Error::SqlError] if there is an SQL error.
pub fn list_themes(connection: &Connection) -> Result<Vec<Theme>, Error> {
    connection
        .prepare("SELECT id, name, color FROM theme ORDER BY id ASC")?
        .query_map([], |row| {
            Ok(Theme {
                id: row.get(0)?,
                name: row.get(1)?,
                color: row.get(2)?,
            })
        })?
        .map(|result| result.map_err(Error::SqlError))
        .collect()
}

/// A route handler that lists the color tag options for pot and budget forms.
pub async fn list_themes_endpoint(State(state): State<AppState>) -> Result<Response, Error> {
    let connection = state
        .db_connection
        .lock()
        .map_err(|_| Error::DatabaseLockError)?;

    let themes = list_themes(&connection)?;

    Ok(ok(StatusCode::OK, themes))
}
