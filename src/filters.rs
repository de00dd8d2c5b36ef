//! Sort keys shared by the transaction listing and recurring bills endpoints.

use serde::{Deserialize, Serialize};

/// The order to return listings in, chosen by the client.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortKey {
    /// Most recent transaction date first.
    #[default]
    Latest,
    /// Most recently recorded first.
    Newest,
    /// Oldest transaction date first.
    Oldest,
    /// Alphabetical by name, A to Z.
    Az,
    /// Alphabetical by name, Z to A.
    Za,
    /// Largest amount first.
    Highest,
    /// Smallest amount first.
    Lowest,
}

impl SortKey {
    /// The ORDER BY clause for the transaction listing.
    ///
    /// Every ordering ends with the row ID so that pagination stays stable
    /// across requests even when other sort fields tie.
    pub(crate) fn transaction_order_clause(self) -> &'static str {
        match self {
            SortKey::Latest => "date DESC, t.id DESC",
            SortKey::Newest => "t.id DESC",
            SortKey::Oldest => "date ASC, t.id ASC",
            SortKey::Az => "t.name COLLATE NOCASE ASC, date DESC, t.id DESC",
            SortKey::Za => "t.name COLLATE NOCASE DESC, date DESC, t.id DESC",
            SortKey::Highest => "amount DESC, date DESC, t.id DESC",
            SortKey::Lowest => "amount ASC, date DESC, t.id DESC",
        }
    }
}
