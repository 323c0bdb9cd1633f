//! Page-number pagination shared by the list operations.

use serde::{Deserialize, Serialize};

pub const MAX_PAGE_SIZE: i64 = 100;

/// A 1-based page request. Out-of-range values are clamped, never rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: i64,
    pub page_size: i64,
}

impl PageRequest {
    /// Builds a request, falling back to `default_size` when `page_size` is not positive.
    pub fn new(page: Option<i64>, page_size: Option<i64>, default_size: i64) -> Self {
        let page = page.unwrap_or(1).max(1);
        let page_size = match page_size {
            Some(size) if size > 0 => size.min(MAX_PAGE_SIZE),
            _ => default_size.clamp(1, MAX_PAGE_SIZE),
        };
        Self { page, page_size }
    }

    pub fn limit(&self) -> i64 {
        self.page_size
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.page_size)
    }
}

/// One page of results plus the total number of matching rows.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub page: i64,
    pub page_size: i64,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total: i64, request: PageRequest) -> Self {
        Self {
            items,
            total,
            page: request.page,
            page_size: request.page_size,
        }
    }
}
