//! Shared pagination types for API query parameters.
//!
//! List endpoints use page-based pagination with `page` and `limit` parameters and answer with
//! [`PaginatedResponse`].

use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DisplayFromStr};
use utoipa::{IntoParams, ToSchema};

/// Default number of items to return per page.
pub const DEFAULT_LIMIT: u64 = 10;

/// Maximum number of items that can be requested per page.
pub const MAX_LIMIT: u64 = 100;

/// Page-based pagination parameters.
///
/// - `page`: 1-based page number (default: 1)
/// - `limit`: Maximum items per page (default: 10, clamped to 1..=100)
#[serde_as]
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
pub struct Pagination {
    /// Page number, starting at 1
    #[param(default = 1, minimum = 1)]
    #[serde_as(as = "Option<DisplayFromStr>")]
    pub page: Option<u64>,

    /// Maximum number of items to return (default: 10, max: 100)
    #[param(default = 10, minimum = 1, maximum = 100)]
    #[serde_as(as = "Option<DisplayFromStr>")]
    pub limit: Option<u64>,
}

impl Pagination {
    #[inline]
    pub fn page(&self) -> u64 {
        self.page.unwrap_or(1).max(1)
    }

    #[inline]
    pub fn limit(&self) -> u64 {
        self.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT)
    }

    /// Number of items before the requested page.
    #[inline]
    pub fn skip(&self) -> u64 {
        (self.page() - 1).saturating_mul(self.limit())
    }
}

/// Paginated response wrapper for list endpoints.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaginatedResponse<T: ToSchema> {
    /// The items for the current page
    pub data: Vec<T>,
    /// Total number of items matching the query (before pagination)
    pub total: u64,
    pub page: u64,
    /// `ceil(total / limit)`; zero when there are no items
    pub last_page: u64,
}

impl<T: ToSchema> PaginatedResponse<T> {
    pub fn new(data: Vec<T>, total: u64, pagination: &Pagination) -> Self {
        Self {
            data,
            total,
            page: pagination.page(),
            last_page: total.div_ceil(pagination.limit()),
        }
    }
}
