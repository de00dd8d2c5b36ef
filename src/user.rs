//! The user's ledger record: the balance triple and the delta arithmetic
//! applied by every monetary operation.
//!
//! The running balance invariant: `balance.current` always equals the initial
//! balance plus total income, minus total expenses, minus the sum of all pot
//! totals. Transactions adjust `current` together with `income` or `expenses`;
//! pot transfers move money in and out of `current` only.

use axum::{extract::State, http::StatusCode, response::Response};
use rusqlite::{Connection, Row};
use serde::Serialize;

use crate::{AppState, Error, Principal, database_id::UserId, responses::ok};

/// The three balance figures tracked per user, in integer minor units (cents).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Balance {
    /// The money currently available, excluding anything set aside in pots.
    pub current: i64,
    /// The lifetime sum of income transactions.
    pub income: i64,
    /// The lifetime sum of expense transactions.
    pub expenses: i64,
}

/// A user's ledger record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
    /// The ID of the user, issued by the external identity provider.
    pub id: UserId,
    /// The user's balance figures.
    pub balance: Balance,
}

/// A signed adjustment to the balance triple, applied atomically within a
/// mutation's SQLite transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct BalanceDelta {
    /// The change to `balance.current`.
    pub current: i64,
    /// The change to `balance.income`.
    pub income: i64,
    /// The change to `balance.expenses`.
    pub expenses: i64,
}

impl BalanceDelta {
    /// The delta that exactly undoes this one.
    pub fn reversed(self) -> Self {
        Self {
            current: -self.current,
            income: -self.income,
            expenses: -self.expenses,
        }
    }
}

fn map_user_row(row: &Row) -> Result<User, rusqlite::Error> {
    Ok(User {
        id: row.get(0)?,
        balance: Balance {
            current: row.get(1)?,
            income: row.get(2)?,
            expenses: row.get(3)?,
        },
    })
}

/// Create the ledger record for `id` with a zeroed balance.
///
/// Enrollment is idempotent: if the record already exists it is returned
/// unchanged, since the ID is issued by the external identity provider and a
/// client may retry.
///
/// # Errors
/// Returns [Error::SqlError] if there is an SQL error.
pub fn create_user(id: UserId, connection: &Connection) -> Result<User, Error> {
    connection.execute("INSERT OR IGNORE INTO user (id) VALUES (?1)", (id,))?;

    get_user(id, connection)
}

/// Retrieve the ledger record for `id`.
///
/// # Errors
/// Returns [Error::NotFound] if no ledger record exists for `id`, or
/// [Error::SqlError] if there is some other SQL error.
pub fn get_user(id: UserId, connection: &Connection) -> Result<User, Error> {
    connection
        .prepare(
            "SELECT id, balance_current, balance_income, balance_expenses
             FROM user WHERE id = :id",
        )?
        .query_one(&[(":id", &id)], map_user_row)
        .map_err(|error| error.into())
}

/// Apply a [BalanceDelta] to the user's balance triple.
///
/// Callers must run this inside the same SQLite transaction as the rest of
/// the mutation so the balance and the record it accounts for commit together.
///
/// # Errors
/// Returns [Error::NotFound] if no ledger record exists for `owner`, or
/// [Error::SqlError] if there is some other SQL error.
pub(crate) fn apply_balance_delta(
    owner: UserId,
    delta: BalanceDelta,
    connection: &Connection,
) -> Result<(), Error> {
    let rows_affected = connection.execute(
        "UPDATE user SET
            balance_current = balance_current + :current,
            balance_income = balance_income + :income,
            balance_expenses = balance_expenses + :expenses
         WHERE id = :id",
        &[
            (":current", &delta.current),
            (":income", &delta.income),
            (":expenses", &delta.expenses),
            (":id", &owner),
        ],
    )?;

    if rows_affected == 0 {
        return Err(Error::NotFound);
    }

    Ok(())
}

/// A route handler that creates the caller's ledger record.
pub async fn create_user_endpoint(
    State(state): State<AppState>,
    Principal(owner): Principal,
) -> Result<Response, Error> {
    let connection = state
        .db_connection
        .lock()
        .map_err(|_| Error::DatabaseLockError)?;

    let user = create_user(owner, &connection)?;

    Ok(ok(StatusCode::CREATED, user))
}

/// A route handler that returns the caller's balance triple.
pub async fn get_balance_endpoint(
    State(state): State<AppState>,
    Principal(owner): Principal,
) -> Result<Response, Error> {
    let connection = state
        .db_connection
        .lock()
        .map_err(|_| Error::DatabaseLockError)?;

    let user = get_user(owner, &connection)?;

    Ok(ok(StatusCode::OK, user.balance))
}
