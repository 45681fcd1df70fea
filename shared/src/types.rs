//! Common types used across the platform

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Body of the `obtener` endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdRequest {
    pub id: Uuid,
}

/// Body of the stock lookup by (product, warehouse)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductWarehouseRequest {
    pub id_producto: Uuid,
    pub id_bodega: Uuid,
}

/// Page selection as sent by the front end (1-based page number)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: i64,
    pub per_page: i64,
}

impl PageRequest {
    /// Replace a non-positive page size with `default_per_page`
    pub fn normalized(page: i64, per_page: i64, default_per_page: i64) -> Self {
        Self {
            page,
            per_page: if per_page <= 0 { default_per_page } else { per_page },
        }
    }

    /// Offset and limit for this page, or `None` when paging is disabled
    /// (a page number below 1 returns every row).
    pub fn window(&self) -> Option<(usize, usize)> {
        if self.page > 0 && self.per_page > 0 {
            let offset = (self.page - 1).saturating_mul(self.per_page);
            Some((offset as usize, self.per_page as usize))
        } else {
            None
        }
    }

    /// Number of pages needed for `total` rows
    pub fn total_pages(&self, total: u64) -> i64 {
        if self.per_page <= 0 {
            return 0;
        }
        let per_page = self.per_page as u64;
        total.div_ceil(per_page) as i64
    }

    /// Slice an already filtered and sorted collection to this page
    pub fn apply<T>(&self, items: Vec<T>) -> Vec<T> {
        match self.window() {
            Some((offset, limit)) => items.into_iter().skip(offset).take(limit).collect(),
            None => items,
        }
    }
}

/// Case-insensitive "contains" used by the free-text search filters
pub fn contains_ignore_case(haystack: &str, needle_lowercase: &str) -> bool {
    haystack.to_lowercase().contains(needle_lowercase)
}

/// Normalize a free-text search term: trimmed, lowercased, `None` when blank
pub fn normalize_search_term(term: Option<&str>) -> Option<String> {
    term.map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
}
