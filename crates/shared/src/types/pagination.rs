//! Pagination types for list endpoints.

use serde::{Deserialize, Serialize};

/// Upper bound for `limit`.
pub const MAX_LIMIT: u64 = 1000;

/// Offset-based request parameters (`?skip=0&limit=100`).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PageRequest {
    /// Number of items to skip.
    #[serde(default)]
    pub skip: u64,
    /// Maximum number of items to return.
    #[serde(default = "default_limit")]
    pub limit: u64,
}

const fn default_limit() -> u64 {
    100
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            skip: 0,
            limit: default_limit(),
        }
    }
}

impl PageRequest {
    /// Offset for database queries.
    #[must_use]
    pub const fn offset(&self) -> u64 {
        self.skip
    }

    /// Limit for database queries, clamped to `1..=MAX_LIMIT`.
    #[must_use]
    pub fn limit(&self) -> u64 {
        self.limit.clamp(1, MAX_LIMIT)
    }
}

/// Response wrapper for paginated data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageResponse<T> {
    /// The items in the current page.
    pub items: Vec<T>,
    /// Total number of items across all pages.
    pub total: u64,
    /// Current page number (1-indexed).
    pub page: u64,
    /// Page size.
    pub size: u64,
    /// Total number of pages.
    pub pages: u64,
}

impl<T> PageResponse<T> {
    /// Creates a paginated response for `request` over `total` rows.
    #[must_use]
    pub fn new(items: Vec<T>, request: &PageRequest, total: u64) -> Self {
        let size = request.limit();
        Self {
            items,
            total,
            page: request.offset() / size + 1,
            size,
            pages: total.div_ceil(size),
        }
    }

    /// Maps items while keeping the page metadata.
    #[must_use]
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> PageResponse<U> {
        PageResponse {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
            size: self.size,
            pages: self.pages,
        }
    }
}

#[cfg(test)]
#[path = "pagination_tests.rs"]
mod tests;
