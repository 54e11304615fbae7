//! Page slicing and paging metadata.

use serde::Serialize;

/// Largest accepted page size.
pub const MAX_PAGE_SIZE: u32 = 100;

/// Page size used when the request does not specify one.
pub const DEFAULT_PAGE_SIZE: u32 = 50;

/// One page of an ordered result set.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PagedResult<T> {
    pub data: Vec<T>,
    pub page: u32,
    pub limit: u32,
    pub total: u64,
    pub total_pages: u64,
    pub has_next: bool,
    pub has_prev: bool,
}

impl<T> PagedResult<T> {
    /// Transforms every item on the page, keeping the metadata.
    pub fn try_map<U, E>(self, f: impl FnMut(T) -> Result<U, E>) -> Result<PagedResult<U>, E> {
        let data = self.data.into_iter().map(f).collect::<Result<Vec<_>, _>>()?;
        Ok(PagedResult {
            data,
            page: self.page,
            limit: self.limit,
            total: self.total,
            total_pages: self.total_pages,
            has_next: self.has_next,
            has_prev: self.has_prev,
        })
    }
}

/// Slices `items` into the requested page.
///
/// `page` is 1-indexed and `limit` must be at least 1; both are validated
/// before a query reaches this stage. A page past the end yields an empty
/// slice with accurate metadata.
pub fn paginate<T>(items: Vec<T>, page: u32, limit: u32) -> PagedResult<T> {
    let page = page.max(1);
    let limit = limit.max(1);

    let total = items.len() as u64;
    let offset = u64::from(page - 1) * u64::from(limit);
    let total_pages = total.div_ceil(u64::from(limit));

    let data = items
        .into_iter()
        .skip(usize::try_from(offset).unwrap_or(usize::MAX))
        .take(limit as usize)
        .collect();

    PagedResult {
        data,
        page,
        limit,
        total,
        total_pages,
        has_next: u64::from(page) * u64::from(limit) < total,
        has_prev: page > 1,
    }
}
