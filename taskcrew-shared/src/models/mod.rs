/// Database models for Taskcrew
///
/// This module contains all database models and their CRUD operations.
///
/// # Models
///
/// - `user`: User accounts
/// - `team`: Teams with settings, invite codes, and soft deletion
/// - `membership`: User-team relationships with roles
/// - `task`: Tasks with status/priority, filtering, and pagination
/// - `comment`: Task comments

pub mod comment;
pub mod membership;
pub mod task;
pub mod team;
pub mod user;

use serde::{Deserialize, Serialize};

/// 1-based pagination parameters supplied by API callers
#[derive(Debug, Clone, Copy)]
pub struct PageParams {
    /// Page number, starting at 1
    pub page: i64,

    /// Maximum rows per page
    pub limit: i64,
}

impl PageParams {
    /// Default page size when the caller does not supply one
    pub const DEFAULT_LIMIT: i64 = 20;

    /// Upper bound on page size to keep result sets reasonable
    pub const MAX_LIMIT: i64 = 100;

    /// Builds page parameters from optional query values, clamping to sane
    /// bounds (page >= 1, 1 <= limit <= MAX_LIMIT).
    pub fn from_query(page: Option<i64>, limit: Option<i64>) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            limit: limit
                .unwrap_or(Self::DEFAULT_LIMIT)
                .clamp(1, Self::MAX_LIMIT),
        }
    }

    /// Row offset for this page
    pub fn offset(&self) -> i64 {
        (self.page - 1) * self.limit
    }
}

/// One page of results plus the totals the API reports alongside it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Paginated<T> {
    /// The rows on this page (possibly empty when past the last page)
    pub items: Vec<T>,

    /// Total rows matching the query across all pages
    pub total: i64,

    /// The requested page number (1-based)
    pub page: i64,

    /// Total page count, ceil(total / limit)
    pub pages: i64,
}

impl<T> Paginated<T> {
    /// Assembles a page from a result slice and the total matching count
    pub fn new(items: Vec<T>, total: i64, params: PageParams) -> Self {
        Self {
            items,
            total,
            page: params.page,
            pages: page_count(total, params.limit),
        }
    }
}

/// Computes ceil(total / limit) without floating point
pub fn page_count(total: i64, limit: i64) -> i64 {
    if limit <= 0 {
        return 0;
    }
    (total + limit - 1) / limit
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_count_is_ceiling() {
        assert_eq!(page_count(0, 20), 0);
        assert_eq!(page_count(1, 20), 1);
        assert_eq!(page_count(20, 20), 1);
        assert_eq!(page_count(21, 20), 2);
        assert_eq!(page_count(40, 20), 2);
        assert_eq!(page_count(41, 20), 3);
    }

    #[test]
    fn test_page_params_defaults_and_clamping() {
        let params = PageParams::from_query(None, None);
        assert_eq!(params.page, 1);
        assert_eq!(params.limit, PageParams::DEFAULT_LIMIT);
        assert_eq!(params.offset(), 0);

        let params = PageParams::from_query(Some(0), Some(1000));
        assert_eq!(params.page, 1);
        assert_eq!(params.limit, PageParams::MAX_LIMIT);

        let params = PageParams::from_query(Some(3), Some(20));
        assert_eq!(params.offset(), 40);
    }

    #[test]
    fn test_paginated_past_the_end_keeps_total() {
        let params = PageParams::from_query(Some(9), Some(20));
        let page: Paginated<i32> = Paginated::new(vec![], 45, params);
        assert_eq!(page.total, 45);
        assert_eq!(page.pages, 3);
        assert!(page.items.is_empty());
    }
}
