//! Filtered, sorted and paginated queries over a user's transactions.

use rusqlite::{Connection, ToSql};
use serde::Serialize;

use crate::{
    Error,
    database_id::{CategoryId, UserId},
    filters::SortKey,
    pagination::PageInfo,
};

use super::core::{TRANSACTION_COLUMNS, Transaction, map_transaction_row};

/// The criteria for listing a user's transactions. Absent filters impose no
/// constraint; present filters combine with AND.
#[derive(Debug, Clone, Default)]
pub struct TransactionQuery {
    /// Keep only transactions in this category.
    pub category: Option<CategoryId>,
    /// Keep only transactions whose name contains this text,
    /// case-insensitively.
    pub search: Option<String>,
    /// The order to return transactions in.
    pub sort: SortKey,
    /// The 1-based page number.
    pub page: u64,
    /// The number of transactions per page.
    pub page_size: u64,
}

/// One page of a user's transactions.
#[derive(Debug, Clone, Serialize)]
pub struct TransactionPage {
    /// The transactions on this page.
    pub transactions: Vec<Transaction>,
    /// Where this page sits in the full listing.
    pub pagination: PageInfo,
}

/// Escape LIKE wildcards in user-supplied search text.
fn escape_like(text: &str) -> String {
    text.replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

/// List a page of `owner`'s transactions matching `query`.
///
/// The ordering always ends with the transaction ID, so repeated calls with
/// the same criteria return identical pages regardless of storage order.
///
/// # Errors
/// Returns [Error::SqlError] if there is an SQL error.
pub fn list_transactions(
    owner: UserId,
    query: &TransactionQuery,
    connection: &Connection,
) -> Result<TransactionPage, Error> {
    let search_pattern = query
        .search
        .as_deref()
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(|text| format!("%{}%", escape_like(text)));

    let mut where_clauses = vec!["t.owner_id = :owner".to_owned()];
    let mut params: Vec<(&str, &dyn ToSql)> = vec![(":owner", &owner)];

    if let Some(ref category) = query.category {
        where_clauses.push("t.category_id = :category".to_owned());
        params.push((":category", category));
    }

    if let Some(ref pattern) = search_pattern {
        where_clauses.push("t.name LIKE :search ESCAPE '\\'".to_owned());
        params.push((":search", pattern));
    }

    let where_clause = where_clauses.join(" AND ");

    // SQLite counts are i64; rusqlite has no FromSql impl for u64.
    let total: i64 = connection
        .prepare(&format!(
            "SELECT COUNT(t.id) FROM \"transaction\" t WHERE {where_clause}"
        ))?
        .query_row(params.as_slice(), |row| row.get(0))?;

    let offset = (query.page - 1) * query.page_size;
    let listing_query = format!(
        "SELECT {TRANSACTION_COLUMNS} FROM \"transaction\" t \
         INNER JOIN category ON t.category_id = category.id \
         WHERE {where_clause} \
         ORDER BY {} \
         LIMIT {} OFFSET {}",
        query.sort.transaction_order_clause(),
        query.page_size,
        offset,
    );

    let transactions = connection
        .prepare(&listing_query)?
        .query_map(params.as_slice(), map_transaction_row)?
        .map(|result| result.map_err(Error::SqlError))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(TransactionPage {
        transactions,
        pagination: PageInfo::new(query.page, query.page_size, total as u64),
    })
}

/// The five most recent transactions for `owner`, for the overview page.
///
/// # Errors
/// Returns [Error::SqlError] if there is an SQL error.
pub fn recent_transactions(owner: UserId, connection: &Connection) -> Result<Vec<Transaction>, Error> {
    let query = format!(
        "SELECT {TRANSACTION_COLUMNS} FROM \"transaction\" t \
         INNER JOIN category ON t.category_id = category.id \
         WHERE t.owner_id = :owner \
         ORDER BY date DESC, t.id DESC \
         LIMIT 5"
    );

    connection
        .prepare(&query)?
        .query_map(&[(":owner", &owner)], map_transaction_row)?
        .map(|result| result.map_err(Error::SqlError))
        .collect()
}

/// Load all of `owner`'s recurring transactions, unpaginated, for the
/// recurring bills engine.
///
/// # Errors
/// Returns [Error::SqlError] if there is an SQL error.
pub(crate) fn recurring_transactions(
    owner: UserId,
    connection: &Connection,
) -> Result<Vec<Transaction>, Error> {
    let query = format!(
        "SELECT {TRANSACTION_COLUMNS} FROM \"transaction\" t \
         INNER JOIN category ON t.category_id = category.id \
         WHERE t.owner_id = :owner AND t.recurring = 1"
    );

    connection
        .prepare(&query)?
        .query_map(&[(":owner", &owner)], map_transaction_row)?
        .map(|result| result.map_err(Error::SqlError))
        .collect()
}
