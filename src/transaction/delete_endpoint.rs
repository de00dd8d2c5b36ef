//! The route handler for deleting a transaction.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Response,
};

use crate::{AppState, Error, Principal, database_id::TransactionId, responses::ok};

use super::core::delete_transaction;

/// A route handler that deletes a transaction and reverses its balance delta
/// as one atomic unit.
pub async fn delete_transaction_endpoint(
    State(state): State<AppState>,
    Principal(owner): Principal,
    Path(transaction_id): Path<TransactionId>,
) -> Result<Response, Error> {
    let connection = state
        .db_connection
        .lock()
        .map_err(|_| Error::DatabaseLockError)?;

    delete_transaction(owner, transaction_id, &connection)?;

    tracing::info!("deleted transaction {transaction_id} for user {owner}");

    Ok(ok(StatusCode::OK, ()))
}
