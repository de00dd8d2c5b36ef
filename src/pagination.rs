//! This module defines the common functionality for paging data.

use serde::Serialize;

/// The config for pagination
#[derive(Debug, Clone)]
pub struct PaginationConfig {
    /// The page number to default to when not specified in a request.
    pub default_page: u64,
    /// The number of items per page when not specified in a request.
    pub default_page_size: u64,
    /// The largest page size a request may ask for.
    pub max_page_size: u64,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            default_page: 1,
            default_page_size: 10,
            max_page_size: 100,
        }
    }
}

impl PaginationConfig {
    /// Resolve the requested page and page size against the defaults,
    /// clamping the page to at least 1 and the page size to
    /// `1..=max_page_size`.
    pub fn resolve(&self, page: Option<u64>, page_size: Option<u64>) -> (u64, u64) {
        let page = page.unwrap_or(self.default_page).max(1);
        let page_size = page_size
            .unwrap_or(self.default_page_size)
            .clamp(1, self.max_page_size);

        (page, page_size)
    }
}

/// The pagination block returned alongside every paginated listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    /// The 1-based page number of the returned page.
    pub page: u64,
    /// The number of items per page.
    pub page_size: u64,
    /// The total number of items across all pages.
    pub total: u64,
    /// The total number of pages.
    pub total_pages: u64,
}

impl PageInfo {
    /// Build the pagination block for a listing of `total` items.
    pub fn new(page: u64, page_size: u64, total: u64) -> Self {
        Self {
            page,
            page_size,
            total,
            total_pages: total.div_ceil(page_size),
        }
    }
}
