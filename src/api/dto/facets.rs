//! DTOs for therapeutic class and manufacturer listings.

use serde::Serialize;

use crate::domain::entities::FacetCount;

/// Distinct values of one categorical field.
#[derive(Debug, Serialize)]
pub struct FacetListResponse {
    pub data: Vec<FacetCount>,
    pub total: usize,
}

impl From<Vec<FacetCount>> for FacetListResponse {
    fn from(data: Vec<FacetCount>) -> Self {
        let total = data.len();
        Self { data, total }
    }
}
