//! This file defines the `Pot` type, the operations that move money between a
//! user's balance and their pots, and the API routes for the pot type.
//!
//! A pot is a named, themed sub-allocation of the balance set aside for a
//! goal. Money in a pot is excluded from `balance.current`, so every transfer
//! in or out, and the refund on deletion, runs as one atomic unit with the
//! balance update.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::Response,
};
use rusqlite::{Connection, Row, Transaction as SqlTransaction, TransactionBehavior};
use serde::{Deserialize, Serialize};

use crate::{
    AppState, Error, MAX_NAME_LENGTH, Principal,
    database_id::{PotId, ThemeId, UserId},
    responses::ok,
    user::{BalanceDelta, apply_balance_delta, get_user},
};

/// A savings pot: money earmarked for a goal, held outside the current
/// balance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pot {
    /// The ID of the pot.
    pub id: PotId,
    /// The ID of the user who owns the pot.
    pub owner_id: UserId,
    /// The name of the pot, unique per owner.
    pub name: String,
    /// The savings goal in minor units (cents).
    pub target: i64,
    /// The amount currently set aside, in minor units (cents).
    pub total: i64,
    /// The ID of the pot's color tag, unique per owner.
    pub theme_id: ThemeId,
    /// The name of the color tag, resolved at read time.
    pub theme_name: String,
    /// The hex color of the tag, resolved at read time.
    pub theme_color: String,
}

/// The fields a caller supplies to create or edit a pot.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PotPayload {
    /// The name of the pot.
    pub name: String,
    /// The savings goal in minor units (cents); must be positive.
    pub target: i64,
    /// The color tag for the pot.
    pub theme_id: ThemeId,
}

impl PotPayload {
    fn validated(mut self) -> Result<Self, Error> {
        self.name = self.name.trim().to_owned();

        if self.name.is_empty() {
            return Err(Error::EmptyName);
        }

        if self.name.chars().count() > MAX_NAME_LENGTH {
            return Err(Error::NameTooLong);
        }

        if self.target <= 0 {
            return Err(Error::InvalidAmount);
        }

        Ok(self)
    }
}

/// The amount to move in a pot transfer.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct PotTransferPayload {
    /// The amount in minor units (cents); must be positive.
    pub amount: i64,
}

// ============================================================================
// DATABASE FUNCTIONS
// ============================================================================

fn map_pot_row(row: &Row) -> Result<Pot, rusqlite::Error> {
    Ok(Pot {
        id: row.get(0)?,
        owner_id: row.get(1)?,
        name: row.get(2)?,
        target: row.get(3)?,
        total: row.get(4)?,
        theme_id: row.get(5)?,
        theme_name: row.get(6)?,
        theme_color: row.get(7)?,
    })
}

const POT_QUERY: &str = "SELECT pot.id, pot.owner_id, pot.name, pot.target, pot.total, \
     pot.theme_id, theme.name, theme.color \
     FROM pot INNER JOIN theme ON pot.theme_id = theme.id";

/// Retrieve one of `owner`'s pots by its `id`.
///
/// # Errors
/// Returns [Error::NotFound] if the pot does not exist or belongs to another
/// user, or [Error::SqlError] if there is some other SQL error.
pub fn get_pot(owner: UserId, id: PotId, connection: &Connection) -> Result<Pot, Error> {
    connection
        .prepare(&format!(
            "{POT_QUERY} WHERE pot.id = :id AND pot.owner_id = :owner"
        ))?
        .query_one(&[(":id", &id), (":owner", &owner)], map_pot_row)
        .map_err(|error| error.into())
}

/// List all of `owner`'s pots in creation order.
///
/// # Errors
/// Returns [Error::SqlError] if there is an SQL error.
pub fn list_pots(owner: UserId, connection: &Connection) -> Result<Vec<Pot>, Error> {
    connection
        .prepare(&format!(
            "{POT_QUERY} WHERE pot.owner_id = :owner ORDER BY pot.id ASC"
        ))?
        .query_map(&[(":owner", &owner)], map_pot_row)?
        .map(|result| result.map_err(Error::SqlError))
        .collect()
}

/// Check that no other pot of `owner` already uses the requested name or
/// theme. `exclude` skips the pot being edited so it can keep its own values.
fn check_pot_uniqueness(
    owner: UserId,
    payload: &PotPayload,
    exclude: Option<PotId>,
    connection: &Connection,
) -> Result<(), Error> {
    let exclude = exclude.unwrap_or(-1);

    let name_taken: bool = connection.query_row(
        "SELECT EXISTS(SELECT 1 FROM pot WHERE owner_id = :owner AND name = :name AND id != :exclude)",
        rusqlite::named_params! { ":owner": owner, ":name": payload.name, ":exclude": exclude },
        |row| row.get(0),
    )?;
    if name_taken {
        return Err(Error::DuplicatePotName);
    }

    let theme_taken: bool = connection.query_row(
        "SELECT EXISTS(SELECT 1 FROM pot WHERE owner_id = :owner AND theme_id = :theme AND id != :exclude)",
        rusqlite::named_params! { ":owner": owner, ":theme": payload.theme_id, ":exclude": exclude },
        |row| row.get(0),
    )?;
    if theme_taken {
        return Err(Error::DuplicatePotTheme);
    }

    Ok(())
}

/// Create a pot for `owner` with a zero total.
///
/// The owner-scoped name and theme uniqueness guards run before the insert so
/// violations surface as friendly domain errors; the table's UNIQUE
/// constraints remain as the backstop for racing creates.
///
/// # Errors
/// This function will return a:
/// - [Error::DuplicatePotName] if the owner already has a pot with this name,
/// - [Error::DuplicatePotTheme] if the owner already uses this theme for a pot,
/// - [Error::NotFound] if the theme or the owner's ledger record does not exist,
/// - a validation error for bad fields, or [Error::SqlError] otherwise.
pub fn create_pot(
    owner: UserId,
    payload: PotPayload,
    connection: &Connection,
) -> Result<Pot, Error> {
    let payload = payload.validated()?;

    let db_transaction = SqlTransaction::new_unchecked(connection, TransactionBehavior::Immediate)?;

    check_pot_uniqueness(owner, &payload, None, &db_transaction)?;

    let id: PotId = db_transaction.query_row(
        "INSERT INTO pot (owner_id, name, target, theme_id) VALUES (?1, ?2, ?3, ?4) RETURNING id",
        (owner, &payload.name, payload.target, payload.theme_id),
        |row| row.get(0),
    )?;

    let pot = get_pot(owner, id, &db_transaction)?;

    db_transaction.commit()?;

    Ok(pot)
}

/// Edit a pot's name, target and theme. The pot's `total` is never changed
/// here; money only moves through [add_to_pot], [withdraw_from_pot] and
/// [delete_pot].
///
/// # Errors
/// Returns the same errors as [create_pot], or [Error::NotFound] if the pot
/// does not exist or belongs to another user.
pub fn update_pot(
    owner: UserId,
    id: PotId,
    payload: PotPayload,
    connection: &Connection,
) -> Result<Pot, Error> {
    let payload = payload.validated()?;

    let db_transaction = SqlTransaction::new_unchecked(connection, TransactionBehavior::Immediate)?;

    get_pot(owner, id, &db_transaction)?;
    check_pot_uniqueness(owner, &payload, Some(id), &db_transaction)?;

    db_transaction.execute(
        "UPDATE pot SET name = :name, target = :target, theme_id = :theme
         WHERE id = :id AND owner_id = :owner",
        rusqlite::named_params! {
            ":name": payload.name,
            ":target": payload.target,
            ":theme": payload.theme_id,
            ":id": id,
            ":owner": owner,
        },
    )?;

    let pot = get_pot(owner, id, &db_transaction)?;

    db_transaction.commit()?;

    Ok(pot)
}

/// Move `amount` from `owner`'s current balance into a pot, as one atomic
/// unit.
///
/// # Errors
/// This function will return a:
/// - [Error::InsufficientFunds] if the current balance is less than `amount`,
/// - [Error::NotFound] if the pot or ledger record does not exist,
/// - [Error::InvalidAmount] if `amount` is not positive,
/// - or [Error::SqlError] otherwise.
pub fn add_to_pot(
    owner: UserId,
    id: PotId,
    amount: i64,
    connection: &Connection,
) -> Result<Pot, Error> {
    if amount <= 0 {
        return Err(Error::InvalidAmount);
    }

    let db_transaction = SqlTransaction::new_unchecked(connection, TransactionBehavior::Immediate)?;

    let user = get_user(owner, &db_transaction)?;
    if user.balance.current < amount {
        return Err(Error::InsufficientFunds);
    }

    apply_balance_delta(
        owner,
        BalanceDelta {
            current: -amount,
            income: 0,
            expenses: 0,
        },
        &db_transaction,
    )?;

    let rows_affected = db_transaction.execute(
        "UPDATE pot SET total = total + :amount WHERE id = :id AND owner_id = :owner",
        rusqlite::named_params! { ":amount": amount, ":id": id, ":owner": owner },
    )?;
    if rows_affected == 0 {
        return Err(Error::NotFound);
    }

    let pot = get_pot(owner, id, &db_transaction)?;

    db_transaction.commit()?;

    Ok(pot)
}

/// Move `amount` out of a pot back into `owner`'s current balance, as one
/// atomic unit.
///
/// # Errors
/// This function will return a:
/// - [Error::InsufficientFunds] if the pot holds less than `amount`,
/// - [Error::NotFound] if the pot or ledger record does not exist,
/// - [Error::InvalidAmount] if `amount` is not positive,
/// - or [Error::SqlError] otherwise.
pub fn withdraw_from_pot(
    owner: UserId,
    id: PotId,
    amount: i64,
    connection: &Connection,
) -> Result<Pot, Error> {
    if amount <= 0 {
        return Err(Error::InvalidAmount);
    }

    let db_transaction = SqlTransaction::new_unchecked(connection, TransactionBehavior::Immediate)?;

    let pot = get_pot(owner, id, &db_transaction)?;
    if pot.total < amount {
        return Err(Error::InsufficientFunds);
    }

    db_transaction.execute(
        "UPDATE pot SET total = total - :amount WHERE id = :id AND owner_id = :owner",
        rusqlite::named_params! { ":amount": amount, ":id": id, ":owner": owner },
    )?;

    apply_balance_delta(
        owner,
        BalanceDelta {
            current: amount,
            income: 0,
            expenses: 0,
        },
        &db_transaction,
    )?;

    let pot = get_pot(owner, id, &db_transaction)?;

    db_transaction.commit()?;

    Ok(pot)
}

/// Delete a pot, refunding anything it holds to `owner`'s current balance, as
/// one atomic unit.
///
/// # Errors
/// Returns [Error::NotFound] if the pot does not exist or belongs to another
/// user, or [Error::SqlError] otherwise.
pub fn delete_pot(owner: UserId, id: PotId, connection: &Connection) -> Result<(), Error> {
    let db_transaction = SqlTransaction::new_unchecked(connection, TransactionBehavior::Immediate)?;

    let pot = get_pot(owner, id, &db_transaction)?;

    // No refund needed for an empty pot.
    if pot.total > 0 {
        apply_balance_delta(
            owner,
            BalanceDelta {
                current: pot.total,
                income: 0,
                expenses: 0,
            },
            &db_transaction,
        )?;
    }

    db_transaction.execute(
        "DELETE FROM pot WHERE id = :id AND owner_id = :owner",
        &[(":id", &id), (":owner", &owner)],
    )?;

    db_transaction.commit()?;

    Ok(())
}

// ============================================================================
// ROUTE HANDLERS
// ============================================================================

/// A route handler that creates a new pot for the caller.
pub async fn create_pot_endpoint(
    State(state): State<AppState>,
    Principal(owner): Principal,
    Json(payload): Json<PotPayload>,
) -> Result<Response, Error> {
    let connection = state
        .db_connection
        .lock()
        .map_err(|_| Error::DatabaseLockError)?;

    let pot = create_pot(owner, payload, &connection)?;

    tracing::info!("created pot {} for user {owner}", pot.id);

    Ok(ok(StatusCode::CREATED, pot))
}

/// A route handler that lists the caller's pots.
pub async fn list_pots_endpoint(
    State(state): State<AppState>,
    Principal(owner): Principal,
) -> Result<Response, Error> {
    let connection = state
        .db_connection
        .lock()
        .map_err(|_| Error::DatabaseLockError)?;

    let pots = list_pots(owner, &connection)?;

    Ok(ok(StatusCode::OK, pots))
}

/// A route handler that edits a pot's name, target and theme.
pub async fn update_pot_endpoint(
    State(state): State<AppState>,
    Principal(owner): Principal,
    Path(pot_id): Path<PotId>,
    Json(payload): Json<PotPayload>,
) -> Result<Response, Error> {
    let connection = state
        .db_connection
        .lock()
        .map_err(|_| Error::DatabaseLockError)?;

    let pot = update_pot(owner, pot_id, payload, &connection)?;

    Ok(ok(StatusCode::OK, pot))
}

/// A route handler that deletes a pot, refunding its total to the caller's
/// balance.
pub async fn delete_pot_endpoint(
    State(state): State<AppState>,
    Principal(owner): Principal,
    Path(pot_id): Path<PotId>,
) -> Result<Response, Error> {
    let connection = state
        .db_connection
        .lock()
        .map_err(|_| Error::DatabaseLockError)?;

    delete_pot(owner, pot_id, &connection)?;

    tracing::info!("deleted pot {pot_id} for user {owner}");

    Ok(ok(StatusCode::OK, ()))
}

/// A route handler that moves money from the caller's balance into a pot.
pub async fn add_to_pot_endpoint(
    State(state): State<AppState>,
    Principal(owner): Principal,
    Path(pot_id): Path<PotId>,
    Json(payload): Json<PotTransferPayload>,
) -> Result<Response, Error> {
    let connection = state
        .db_connection
        .lock()
        .map_err(|_| Error::DatabaseLockError)?;

    let pot = add_to_pot(owner, pot_id, payload.amount, &connection)?;

    Ok(ok(StatusCode::OK, pot))
}

/// A route handler that moves money from a pot back into the caller's balance.
pub async fn withdraw_from_pot_endpoint(
    State(state): State<AppState>,
    Principal(owner): Principal,
    Path(pot_id): Path<PotId>,
    Json(payload): Json<PotTransferPayload>,
) -> Result<Response, Error> {
    let connection = state
        .db_connection
        .lock()
        .map_err(|_| Error::DatabaseLockError)?;

    let pot = withdraw_from_pot(owner, pot_id, payload.amount, &connection)?;

    Ok(ok(StatusCode::OK, pot))
}
