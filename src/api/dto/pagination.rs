//! Pagination query parameters.

use serde::Deserialize;
use serde_with::{DisplayFromStr, serde_as};
use validator::Validate;

use crate::domain::pagination::DEFAULT_PAGE_SIZE;

/// Pagination query parameters.
///
/// Uses `serde_with` to parse numbers from query strings, which also keeps
/// them working when the struct is flattened into a larger query.
#[serde_as]
#[derive(Debug, Default, Deserialize, Validate)]
pub struct PaginationParams {
    #[serde_as(as = "Option<DisplayFromStr>")]
    #[serde(default)]
    #[validate(range(min = 1, message = "page must be at least 1"))]
    pub page: Option<u32>,

    #[serde_as(as = "Option<DisplayFromStr>")]
    #[serde(default)]
    #[validate(range(min = 1, max = 100, message = "limit must be between 1 and 100"))]
    pub limit: Option<u32>,
}

impl PaginationParams {
    /// Requested page, 1 when absent.
    pub fn page(&self) -> u32 {
        self.page.unwrap_or(1)
    }

    /// Requested page size, [`DEFAULT_PAGE_SIZE`] when absent.
    pub fn limit(&self) -> u32 {
        self.limit.unwrap_or(DEFAULT_PAGE_SIZE)
    }
}
