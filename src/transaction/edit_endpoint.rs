//! The route handler for editing a transaction.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::Response,
};

use crate::{AppState, Error, Principal, database_id::TransactionId, responses::ok};

use super::core::{TransactionPayload, update_transaction};

/// A route handler that overwrites a transaction's fields and applies the net
/// balance adjustment as one atomic unit.
pub async fn edit_transaction_endpoint(
    State(state): State<AppState>,
    Principal(owner): Principal,
    Path(transaction_id): Path<TransactionId>,
    Json(payload): Json<TransactionPayload>,
) -> Result<Response, Error> {
    let connection = state
        .db_connection
        .lock()
        .map_err(|_| Error::DatabaseLockError)?;

    let transaction = update_transaction(owner, transaction_id, payload, &connection)?;

    Ok(ok(StatusCode::OK, transaction))
}
