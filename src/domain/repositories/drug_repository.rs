//! Repository trait for drug record data access.

use crate::domain::entities::{DrugRecord, FacetCount};
use async_trait::async_trait;
use thiserror::Error;

/// Failures surfaced by a record store.
///
/// Absent records, missing files and undecodable documents are not errors;
/// stores report them as empty results. Only backend failures reach callers.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("store operation timed out: {0}")]
    Timeout(String),

    #[error("store connection reset: {0}")]
    ConnectionReset(String),

    #[error("store unavailable: {0}")]
    Connectivity(String),

    #[error("store backend error: {0}")]
    Backend(String),
}

impl StoreError {
    /// Timeouts and dropped connections.
    pub fn is_timeout_or_reset(&self) -> bool {
        matches!(self, Self::Timeout(_) | Self::ConnectionReset(_))
    }

    /// Any failure to reach the database, including timeouts and resets.
    pub fn is_connectivity(&self) -> bool {
        matches!(
            self,
            Self::Timeout(_) | Self::ConnectionReset(_) | Self::Connectivity(_)
        )
    }
}

/// Read contract shared by every record store backend.
///
/// # Implementations
///
/// - [`crate::infrastructure::persistence::PgDrugRepository`] - JSONB documents in PostgreSQL
/// - [`crate::infrastructure::persistence::FileDrugRepository`] - static JSON file tree
/// - Test mocks available with `cfg(test)`
///
/// Which implementation serves requests is decided once at startup from
/// configuration.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DrugRepository: Send + Sync {
    /// Returns every record in store order.
    async fn get_all(&self) -> Result<Vec<DrugRecord>, StoreError>;

    /// Finds a record by slug.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(record))` if found; `record.slug` equals `slug`
    /// - `Ok(None)` if absent, malformed or undecodable
    async fn get_by_slug(&self, slug: &str) -> Result<Option<DrugRecord>, StoreError>;

    /// Records whose therapeutic class equals `name`, ignoring case.
    async fn find_by_therapeutic_class(&self, name: &str) -> Result<Vec<DrugRecord>, StoreError>;

    /// Records whose manufacturer (or labeler) equals `name`, ignoring case.
    async fn find_by_manufacturer(&self, name: &str) -> Result<Vec<DrugRecord>, StoreError>;

    /// Case-insensitive substring search over drug name, generic name,
    /// manufacturer, therapeutic class and plain-text indications.
    async fn search(&self, term: &str) -> Result<Vec<DrugRecord>, StoreError>;

    /// Native full-text search.
    ///
    /// Returns `Ok(None)` when the backend has no full-text capability.
    async fn text_search(&self, term: &str) -> Result<Option<Vec<DrugRecord>>, StoreError>;

    /// Distinct therapeutic classes with record counts, sorted by name.
    async fn therapeutic_classes(&self) -> Result<Vec<FacetCount>, StoreError>;

    /// Distinct manufacturers with record counts, sorted by name.
    async fn manufacturers(&self) -> Result<Vec<FacetCount>, StoreError>;

    /// Cheap liveness probe.
    async fn ping(&self) -> Result<(), StoreError>;
}
