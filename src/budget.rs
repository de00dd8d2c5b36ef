//! This file defines the `Budget` type, its CRUD operations and the spending
//! rollup that reports how much of each budget the current month's expenses
//! have consumed, plus the API routes for the budget type.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::Response,
};
use rusqlite::{Connection, Row, Transaction as SqlTransaction, TransactionBehavior};
use serde::{Deserialize, Serialize};
use time::Date;

use crate::{
    AppState, Error, Principal,
    database_id::{BudgetId, CategoryId, ThemeId, UserId},
    responses::ok,
    timezone::today_in,
};

/// A monthly spending cap for one category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Budget {
    /// The ID of the budget.
    pub id: BudgetId,
    /// The ID of the user who owns the budget.
    pub owner_id: UserId,
    /// The category the budget covers, unique per owner.
    pub category_id: CategoryId,
    /// The name of the category, resolved at read time.
    pub category_name: String,
    /// The monthly cap in minor units (cents).
    pub maximum: i64,
    /// The ID of the budget's color tag, unique per owner.
    pub theme_id: ThemeId,
    /// The hex color of the tag, resolved at read time.
    pub theme_color: String,
}

/// A budget together with how much of it this month's expenses have used.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetWithSpending {
    /// The budget itself.
    #[serde(flatten)]
    pub budget: Budget,
    /// The sum of this month's expense transactions in the budget's category,
    /// in minor units (cents).
    pub total_spent: i64,
}

/// The fields a caller supplies to create or edit a budget.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetPayload {
    /// The category the budget covers.
    pub category_id: CategoryId,
    /// The monthly cap in minor units (cents); must be positive.
    pub maximum: i64,
    /// The color tag for the budget.
    pub theme_id: ThemeId,
}

impl BudgetPayload {
    fn validated(self) -> Result<Self, Error> {
        if self.maximum <= 0 {
            return Err(Error::InvalidAmount);
        }

        Ok(self)
    }
}

/// The first and last day of `today`'s month, for filtering this month's
/// transactions.
pub(crate) fn month_bounds(today: Date) -> (Date, Date) {
    let length = time::util::days_in_year_month(today.year(), today.month());

    // replace_day cannot fail for day 1 or the month's own length.
    let start = today.replace_day(1).unwrap_or(today);
    let end = today.replace_day(length).unwrap_or(today);

    (start, end)
}

// ============================================================================
// DATABASE FUNCTIONS
// ============================================================================

fn map_budget_row(row: &Row) -> Result<Budget, rusqlite::Error> {
    Ok(Budget {
        id: row.get(0)?,
        owner_id: row.get(1)?,
        category_id: row.get(2)?,
        category_name: row.get(3)?,
        maximum: row.get(4)?,
        theme_id: row.get(5)?,
        theme_color: row.get(6)?,
    })
}

const BUDGET_QUERY: &str = "SELECT budget.id, budget.owner_id, budget.category_id, category.name, \
     budget.maximum, budget.theme_id, theme.color \
     FROM budget \
     INNER JOIN category ON budget.category_id = category.id \
     INNER JOIN theme ON budget.theme_id = theme.id";

/// Retrieve one of `owner`'s budgets by its `id`.
///
/// # Errors
/// Returns [Error::NotFound] if the budget does not exist or belongs to
/// another user, or [Error::SqlError] if there is some other SQL error.
pub fn get_budget(owner: UserId, id: BudgetId, connection: &Connection) -> Result<Budget, Error> {
    connection
        .prepare(&format!(
            "{BUDGET_QUERY} WHERE budget.id = :id AND budget.owner_id = :owner"
        ))?
        .query_one(&[(":id", &id), (":owner", &owner)], map_budget_row)
        .map_err(|error| error.into())
}

fn check_budget_uniqueness(
    owner: UserId,
    payload: &BudgetPayload,
    exclude: Option<BudgetId>,
    connection: &Connection,
) -> Result<(), Error> {
    let exclude = exclude.unwrap_or(-1);

    let category_taken: bool = connection.query_row(
        "SELECT EXISTS(SELECT 1 FROM budget \
         WHERE owner_id = :owner AND category_id = :category AND id != :exclude)",
        rusqlite::named_params! {
            ":owner": owner,
            ":category": payload.category_id,
            ":exclude": exclude,
        },
        |row| row.get(0),
    )?;
    if category_taken {
        return Err(Error::DuplicateBudgetCategory);
    }

    let theme_taken: bool = connection.query_row(
        "SELECT EXISTS(SELECT 1 FROM budget \
         WHERE owner_id = :owner AND theme_id = :theme AND id != :exclude)",
        rusqlite::named_params! {
            ":owner": owner,
            ":theme": payload.theme_id,
            ":exclude": exclude,
        },
        |row| row.get(0),
    )?;
    if theme_taken {
        return Err(Error::DuplicateBudgetTheme);
    }

    Ok(())
}

/// Create a budget for `owner`.
///
/// # Errors
/// This function will return a:
/// - [Error::DuplicateBudgetCategory] if the owner already budgets this category,
/// - [Error::DuplicateBudgetTheme] if the owner already uses this theme for a budget,
/// - [Error::NotFound] if the category or theme does not exist,
/// - [Error::InvalidAmount] if `maximum` is not positive,
/// - or [Error::SqlError] otherwise.
pub fn create_budget(
    owner: UserId,
    payload: BudgetPayload,
    connection: &Connection,
) -> Result<Budget, Error> {
    let payload = payload.validated()?;

    let db_transaction = SqlTransaction::new_unchecked(connection, TransactionBehavior::Immediate)?;

    check_budget_uniqueness(owner, &payload, None, &db_transaction)?;

    let id: BudgetId = db_transaction.query_row(
        "INSERT INTO budget (owner_id, category_id, maximum, theme_id) \
         VALUES (?1, ?2, ?3, ?4) RETURNING id",
        (owner, payload.category_id, payload.maximum, payload.theme_id),
        |row| row.get(0),
    )?;

    let budget = get_budget(owner, id, &db_transaction)?;

    db_transaction.commit()?;

    Ok(budget)
}

/// Edit a budget's category, maximum and theme.
///
/// # Errors
/// Returns the same errors as [create_budget], or [Error::NotFound] if the
/// budget does not exist or belongs to another user.
pub fn update_budget(
    owner: UserId,
    id: BudgetId,
    payload: BudgetPayload,
    connection: &Connection,
) -> Result<Budget, Error> {
    let payload = payload.validated()?;

    let db_transaction = SqlTransaction::new_unchecked(connection, TransactionBehavior::Immediate)?;

    get_budget(owner, id, &db_transaction)?;
    check_budget_uniqueness(owner, &payload, Some(id), &db_transaction)?;

    db_transaction.execute(
        "UPDATE budget SET category_id = :category, maximum = :maximum, theme_id = :theme
         WHERE id = :id AND owner_id = :owner",
        rusqlite::named_params! {
            ":category": payload.category_id,
            ":maximum": payload.maximum,
            ":theme": payload.theme_id,
            ":id": id,
            ":owner": owner,
        },
    )?;

    let budget = get_budget(owner, id, &db_transaction)?;

    db_transaction.commit()?;

    Ok(budget)
}

/// Delete a budget. Transactions in the category are unaffected.
///
/// # Errors
/// Returns [Error::NotFound] if the budget does not exist or belongs to
/// another user, or [Error::SqlError] otherwise.
pub fn delete_budget(owner: UserId, id: BudgetId, connection: &Connection) -> Result<(), Error> {
    let rows_affected = connection.execute(
        "DELETE FROM budget WHERE id = :id AND owner_id = :owner",
        &[(":id", &id), (":owner", &owner)],
    )?;

    if rows_affected == 0 {
        return Err(Error::NotFound);
    }

    Ok(())
}

/// List `owner`'s budgets in creation order, each with the sum of this
/// month's expense transactions in its category.
///
/// `today` fixes which month counts as "this month"; the caller computes it
/// in the configured reference timezone.
///
/// # Errors
/// Returns [Error::SqlError] if there is an SQL error.
pub fn list_budgets_with_spending(
    owner: UserId,
    today: Date,
    connection: &Connection,
) -> Result<Vec<BudgetWithSpending>, Error> {
    let (month_start, month_end) = month_bounds(today);

    connection
        .prepare(
            "SELECT budget.id, budget.owner_id, budget.category_id, category.name, \
             budget.maximum, budget.theme_id, theme.color, \
             COALESCE(SUM(t.amount), 0) \
             FROM budget \
             INNER JOIN category ON budget.category_id = category.id \
             INNER JOIN theme ON budget.theme_id = theme.id \
             LEFT JOIN \"transaction\" t \
               ON t.owner_id = budget.owner_id \
               AND t.category_id = budget.category_id \
               AND t.kind = 'expense' \
               AND t.date BETWEEN :month_start AND :month_end \
             WHERE budget.owner_id = :owner \
             GROUP BY budget.id \
             ORDER BY budget.id ASC",
        )?
        .query_map(
            rusqlite::named_params! {
                ":month_start": month_start,
                ":month_end": month_end,
                ":owner": owner,
            },
            |row| {
                Ok(BudgetWithSpending {
                    budget: map_budget_row(row)?,
                    total_spent: row.get(7)?,
                })
            },
        )?
        .map(|result| result.map_err(Error::SqlError))
        .collect()
}

// ============================================================================
// ROUTE HANDLERS
// ============================================================================

/// A route handler that creates a new budget for the caller.
pub async fn create_budget_endpoint(
    State(state): State<AppState>,
    Principal(owner): Principal,
    Json(payload): Json<BudgetPayload>,
) -> Result<Response, Error> {
    let connection = state
        .db_connection
        .lock()
        .map_err(|_| Error::DatabaseLockError)?;

    let budget = create_budget(owner, payload, &connection)?;

    tracing::info!("created budget {} for user {owner}", budget.id);

    Ok(ok(StatusCode::CREATED, budget))
}

/// A route handler that lists the caller's budgets with this month's spending.
pub async fn list_budgets_endpoint(
    State(state): State<AppState>,
    Principal(owner): Principal,
) -> Result<Response, Error> {
    let today = today_in(&state.local_timezone)?;

    let connection = state
        .db_connection
        .lock()
        .map_err(|_| Error::DatabaseLockError)?;

    let budgets = list_budgets_with_spending(owner, today, &connection)?;

    Ok(ok(StatusCode::OK, budgets))
}

/// A route handler that edits a budget's category, maximum and theme.
pub async fn update_budget_endpoint(
    State(state): State<AppState>,
    Principal(owner): Principal,
    Path(budget_id): Path<BudgetId>,
    Json(payload): Json<BudgetPayload>,
) -> Result<Response, Error> {
    let connection = state
        .db_connection
        .lock()
        .map_err(|_| Error::DatabaseLockError)?;

    let budget = update_budget(owner, budget_id, payload, &connection)?;

    Ok(ok(StatusCode::OK, budget))
}

/// A route handler that deletes a budget.
pub async fn delete_budget_endpoint(
    State(state): State<AppState>,
    Principal(owner): Principal,
    Path(budget_id): Path<BudgetId>,
) -> Result<Response, Error> {
    let connection = state
        .db_connection
        .lock()
        .map_err(|_| Error::DatabaseLockError)?;

    delete_budget(owner, budget_id, &connection)?;

    tracing::info!("deleted budget {budget_id} for user {owner}");

    Ok(ok(StatusCode::OK, ()))
}
