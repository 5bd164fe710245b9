//! Offset pagination shared by admin listings.

use serde::{Deserialize, Serialize};

pub const DEFAULT_PAGE_SIZE: i64 = 20;
pub const MAX_PAGE_SIZE: i64 = 100;

/// `?page=&size=` query parameters. Page numbers start at 1.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct PageParams {
    #[serde(default = "first_page")]
    pub page: i64,
    #[serde(default = "default_size")]
    pub size: i64,
}

fn first_page() -> i64 {
    1
}

fn default_size() -> i64 {
    DEFAULT_PAGE_SIZE
}

impl Default for PageParams {
    fn default() -> Self {
        Self { page: 1, size: DEFAULT_PAGE_SIZE }
    }
}

impl PageParams {
    /// `None` unless `page >= 1` and `1 <= size <= MAX_PAGE_SIZE`.
    #[must_use]
    pub fn validated(self) -> Option<Self> {
        (self.page >= 1 && (1..=MAX_PAGE_SIZE).contains(&self.size)).then_some(self)
    }

    #[must_use]
    pub fn offset(&self) -> i64 {
        (self.page - 1) * self.size
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub page: i64,
    pub size: i64,
    pub pages: i64,
}

impl<T> Page<T> {
    #[must_use]
    pub fn new(items: Vec<T>, total: i64, params: PageParams) -> Self {
        let pages = if params.size > 0 { (total + params.size - 1) / params.size } else { 0 };
        Self { items, total, page: params.page, size: params.size, pages }
    }
}

#[cfg(test)]
#[path = "page_test.rs"]
mod tests;
