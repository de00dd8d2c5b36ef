//! The route handler for creating a transaction.

use axum::{Json, extract::State, http::StatusCode, response::Response};

use crate::{AppState, Error, Principal, responses::ok};

use super::core::{TransactionPayload, create_transaction};

/// A route handler that records a new transaction and applies its balance
/// delta as one atomic unit.
pub async fn create_transaction_endpoint(
    State(state): State<AppState>,
    Principal(owner): Principal,
    Json(payload): Json<TransactionPayload>,
) -> Result<Response, Error> {
    let connection = state
        .db_connection
        .lock()
        .map_err(|_| Error::DatabaseLockError)?;

    let transaction = create_transaction(owner, payload, &connection)?;

    tracing::info!(
        "created transaction {} for user {owner}",
        transaction.id
    );

    Ok(ok(StatusCode::CREATED, transaction))
}
