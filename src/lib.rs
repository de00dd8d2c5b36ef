//! Coinkeeper is a web app for tracking a personal ledger: a running balance,
//! savings pots, per-category budgets and recurring bills.
//!
//! This library provides a JSON API over a SQLite ledger. Every mutation that
//! touches money (creating, editing or deleting a transaction, moving money in
//! or out of a pot, deleting a pot) runs as a single SQLite transaction so the
//! balance, pot totals and transaction history can never drift apart.

#![warn(missing_docs)]

use std::{net::SocketAddr, time::Duration};

use axum::response::{IntoResponse, Response};
use axum_server::Handle;
use tokio::signal;

mod app_state;
mod auth;
mod budget;
mod category;
mod database_id;
mod db;
pub mod endpoints;
mod filters;
mod logging;
mod pagination;
mod pot;
mod recurring;
mod responses;
mod routing;
mod theme;
mod timezone;
mod transaction;
mod user;

pub use app_state::AppState;
pub use auth::{Principal, USER_ID_HEADER};
pub use db::initialize as initialize_db;
pub use filters::SortKey;
pub use logging::logging_middleware;
pub use pagination::PaginationConfig;
pub use routing::build_router;
pub use user::{Balance, User};

use crate::responses::error_response;

/// An async task that waits for either the ctrl+c or terminate signal, whichever comes first, and
/// then signals the server to shut down gracefully.
///
/// `handle` is a handle to an Axum `Server`.
pub async fn graceful_shutdown(handle: Handle<SocketAddr>) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::debug!("Received ctrl+c signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
        _ = terminate => {
            tracing::debug!("Received terminate signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
    }
}

/// The maximum length of pot and transaction names.
pub const MAX_NAME_LENGTH: usize = 30;

/// The errors that may occur in the application.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    /// The request did not carry an authenticated user ID.
    #[error("no authenticated user was attached to the request")]
    Unauthorized,

    /// The requested resource does not exist or is not owned by the caller.
    #[error("the requested resource could not be found")]
    NotFound,

    /// A balance or pot-total precondition failed, e.g. spending more than the
    /// current balance or withdrawing more than a pot holds.
    #[error("there are not enough funds to complete this operation")]
    InsufficientFunds,

    /// The caller already owns a pot with the requested name.
    #[error("you already have a pot with this name")]
    DuplicatePotName,

    /// The caller already uses the requested color theme for another pot.
    #[error("you already use this color tag for another pot")]
    DuplicatePotTheme,

    /// The caller already has a budget for the requested category.
    #[error("you already have a budget for this category")]
    DuplicateBudgetCategory,

    /// The caller already uses the requested color theme for another budget.
    #[error("you already use this color tag for another budget")]
    DuplicateBudgetTheme,

    /// An empty string was used where a name is required.
    #[error("name cannot be empty")]
    EmptyName,

    /// A name longer than [MAX_NAME_LENGTH] characters was given.
    #[error("name must be {MAX_NAME_LENGTH} characters or fewer")]
    NameTooLong,

    /// A zero or negative amount was given for a monetary field that must be
    /// positive (transaction amounts, pot targets, budget maximums).
    #[error("amount must be greater than zero")]
    InvalidAmount,

    /// An error occurred while getting the local timezone from a canonical timezone string.
    #[error("invalid timezone {0}")]
    InvalidTimezone(String),

    /// Could not acquire the database lock
    #[error("could not acquire the database lock")]
    DatabaseLockError,

    /// An unhandled/unexpected SQL error.
    #[error("an unexpected SQL error occurred: {0}")]
    SqlError(rusqlite::Error),
}

impl From<rusqlite::Error> for Error {
    fn from(value: rusqlite::Error) -> Self {
        match value {
            // Code 2067 occurs when a UNIQUE constraint failed. The pot and
            // budget tables carry owner-scoped UNIQUE constraints as a
            // backstop for two concurrent creates racing past the pre-checks.
            rusqlite::Error::SqliteFailure(sql_error, Some(ref desc))
                if sql_error.extended_code == 2067 && desc.contains("pot.name") =>
            {
                Error::DuplicatePotName
            }
            rusqlite::Error::SqliteFailure(sql_error, Some(ref desc))
                if sql_error.extended_code == 2067 && desc.contains("pot.theme_id") =>
            {
                Error::DuplicatePotTheme
            }
            rusqlite::Error::SqliteFailure(sql_error, Some(ref desc))
                if sql_error.extended_code == 2067 && desc.contains("budget.category_id") =>
            {
                Error::DuplicateBudgetCategory
            }
            rusqlite::Error::SqliteFailure(sql_error, Some(ref desc))
                if sql_error.extended_code == 2067 && desc.contains("budget.theme_id") =>
            {
                Error::DuplicateBudgetTheme
            }
            // Code 787 occurs when a FOREIGN KEY constraint failed, i.e. a
            // category, theme or user ID did not refer to an existing row.
            rusqlite::Error::SqliteFailure(sql_error, Some(_)) if sql_error.extended_code == 787 => {
                Error::NotFound
            }
            rusqlite::Error::QueryReturnedNoRows => Error::NotFound,
            error => {
                tracing::error!("an unhandled SQL error occurred: {}", error);
                Error::SqlError(error)
            }
        }
    }
}

impl Error {
    /// A stable machine-readable code for the error, included in JSON error
    /// responses so clients can branch without parsing messages.
    pub fn reason(&self) -> &'static str {
        match self {
            Error::Unauthorized => "unauthorized",
            Error::NotFound => "not_found",
            Error::InsufficientFunds => "insufficient_funds",
            Error::DuplicatePotName => "duplicate_pot_name",
            Error::DuplicatePotTheme => "duplicate_pot_theme",
            Error::DuplicateBudgetCategory => "duplicate_budget_category",
            Error::DuplicateBudgetTheme => "duplicate_budget_theme",
            Error::EmptyName | Error::NameTooLong | Error::InvalidAmount => "validation_error",
            _ => "server_error",
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        use axum::http::StatusCode;

        match self {
            Error::Unauthorized => {
                error_response(StatusCode::UNAUTHORIZED, self.reason(), &self.to_string())
            }
            Error::NotFound => {
                error_response(StatusCode::NOT_FOUND, self.reason(), &self.to_string())
            }
            Error::InsufficientFunds
            | Error::DuplicatePotName
            | Error::DuplicatePotTheme
            | Error::DuplicateBudgetCategory
            | Error::DuplicateBudgetTheme => {
                error_response(StatusCode::BAD_REQUEST, self.reason(), &self.to_string())
            }
            Error::EmptyName | Error::NameTooLong | Error::InvalidAmount => error_response(
                StatusCode::UNPROCESSABLE_ENTITY,
                self.reason(),
                &self.to_string(),
            ),
            // Any errors that are not handled above are not intended to be shown to the client.
            error => {
                tracing::error!("An unexpected error occurred: {}", error);
                error_response(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    error.reason(),
                    "Something went wrong. Try again later or check the server logs.",
                )
            }
        }
    }
}
