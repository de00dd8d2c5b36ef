//! The route handlers for listing transactions.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::Response,
};
use serde::Deserialize;

use crate::{AppState, Error, Principal, database_id::CategoryId, filters::SortKey, responses::ok};

use super::query::{TransactionQuery, list_transactions, recent_transactions};

/// The query string accepted by the transaction listing endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListTransactionsParams {
    /// A category ID, or "all" for no category filter.
    pub filter: Option<String>,
    /// Case-insensitive substring to match against transaction names.
    pub search: Option<String>,
    /// The order to return transactions in.
    pub sort: Option<SortKey>,
    /// The 1-based page number.
    pub page: Option<u64>,
    /// The number of transactions per page.
    pub page_size: Option<u64>,
}

fn parse_category_filter(filter: Option<&str>) -> Result<Option<CategoryId>, Error> {
    match filter {
        None | Some("all") | Some("") => Ok(None),
        Some(text) => text.parse().map(Some).map_err(|_| Error::NotFound),
    }
}

/// A route handler that lists a page of the caller's transactions, filtered
/// and sorted by the request's query string.
pub async fn list_transactions_endpoint(
    State(state): State<AppState>,
    Principal(owner): Principal,
    Query(params): Query<ListTransactionsParams>,
) -> Result<Response, Error> {
    let (page, page_size) = state
        .pagination_config
        .resolve(params.page, params.page_size);
    let query = TransactionQuery {
        category: parse_category_filter(params.filter.as_deref())?,
        search: params.search,
        sort: params.sort.unwrap_or_default(),
        page,
        page_size,
    };

    let connection = state
        .db_connection
        .lock()
        .map_err(|_| Error::DatabaseLockError)?;

    let listing = list_transactions(owner, &query, &connection)?;

    Ok(ok(StatusCode::OK, listing))
}

/// A route handler that returns the caller's five most recent transactions.
pub async fn recent_transactions_endpoint(
    State(state): State<AppState>,
    Principal(owner): Principal,
) -> Result<Response, Error> {
    let connection = state
        .db_connection
        .lock()
        .map_err(|_| Error::DatabaseLockError)?;

    let transactions = recent_transactions(owner, &connection)?;

    Ok(ok(StatusCode::OK, transactions))
}

#[cfg(test)]
mod tests {
    use crate::Error;

    use super::parse_category_filter;

    #[test]
    fn all_and_absent_filters_impose_no_constraint() {
        assert_eq!(parse_category_filter(None), Ok(None));
        assert_eq!(parse_category_filter(Some("all")), Ok(None));
        assert_eq!(parse_category_filter(Some("")), Ok(None));
    }

    #[test]
    fn numeric_filter_parses_to_category_id() {
        assert_eq!(parse_category_filter(Some("3")), Ok(Some(3)));
    }

    #[test]
    fn garbage_filter_is_not_found() {
        assert_eq!(parse_category_filter(Some("socks")), Err(Error::NotFound));
    }
}
