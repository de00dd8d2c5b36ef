//! Transaction management for the ledger.
//!
//! This module contains everything related to transactions:
//! - The `Transaction` model and the atomic create/update/delete operations
//!   that keep the balance and the transaction history consistent
//! - Filtered, sorted, paginated listing queries
//! - The JSON route handlers for the transaction endpoints

mod core;
mod create_endpoint;
mod delete_endpoint;
mod edit_endpoint;
mod list_endpoint;
mod query;

pub use core::Transaction;
pub use create_endpoint::create_transaction_endpoint;
pub use delete_endpoint::delete_transaction_endpoint;
pub use edit_endpoint::edit_transaction_endpoint;
pub use list_endpoint::{list_transactions_endpoint, recent_transactions_endpoint};

pub(crate) use query::recurring_transactions;

// Fixtures in other modules' tests record transactions through the real
// ledger operations.
#[cfg(test)]
pub(crate) use core::{TransactionKind, TransactionPayload, create_transaction};
