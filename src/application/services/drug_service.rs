//! Drug listing and retrieval service.

use std::future::Future;
use std::sync::Arc;

use serde_json::json;
use tracing::{debug, warn};

use crate::domain::entities::{DrugRecord, FacetCount, MAX_SLUG_LENGTH, is_valid_slug};
use crate::domain::pagination::{PagedResult, paginate};
use crate::domain::repositories::{DrugRepository, StoreError};
use crate::domain::search::{SearchEngine, SearchMode, SearchQuery};
use crate::error::AppError;
use crate::infrastructure::resilience::{CircuitBreaker, CircuitStatus, RetryOptions, with_retry};

/// Service answering drug listing and lookup requests.
///
/// Every store call runs inside the circuit for `circuit_key`, and inside
/// that, the retry policy. An open circuit fails fast with
/// [`AppError::ServiceUnavailable`] without touching the store.
pub struct DrugService<R: DrugRepository + ?Sized> {
    repository: Arc<R>,
    breaker: Arc<CircuitBreaker>,
    circuit_key: String,
    retry: RetryOptions<StoreError>,
    engine: SearchEngine,
    default_mode: SearchMode,
}

impl<R: DrugRepository + ?Sized> DrugService<R> {
    /// Creates a new drug service.
    ///
    /// # Arguments
    ///
    /// - `repository` - Record store selected at startup
    /// - `breaker` - Shared circuit breaker
    /// - `circuit_key` - Key identifying the store in the breaker, e.g. `store:postgres`
    /// - `retry` - Retry policy applied to each store call
    pub fn new(
        repository: Arc<R>,
        breaker: Arc<CircuitBreaker>,
        circuit_key: impl Into<String>,
        retry: RetryOptions<StoreError>,
    ) -> Self {
        Self {
            repository,
            breaker,
            circuit_key: circuit_key.into(),
            retry,
            engine: SearchEngine::default(),
            default_mode: SearchMode::default(),
        }
    }

    pub fn with_engine(mut self, engine: SearchEngine) -> Self {
        self.engine = engine;
        self
    }

    pub fn with_default_mode(mut self, mode: SearchMode) -> Self {
        self.default_mode = mode;
        self
    }

    /// Mode applied when a request does not name one.
    pub fn default_mode(&self) -> SearchMode {
        self.default_mode
    }

    pub fn circuit_key(&self) -> &str {
        &self.circuit_key
    }

    /// Lists records matching `query`, one page at a time.
    ///
    /// Without a term, records are selected by the categorical filters alone
    /// (or all records when there are none). With a term, the mode decides
    /// how candidates are matched and ordered, and the filters then narrow
    /// them further. A query matching nothing yields an empty page.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::ServiceUnavailable`] when the store is unreachable
    /// after retries or the circuit is open.
    /// Returns [`AppError::Internal`] on unexpected store failures.
    pub async fn list_drugs(&self, query: &SearchQuery) -> Result<PagedResult<DrugRecord>, AppError> {
        let class = query.therapeutic_class.as_deref();
        let manufacturer = query.manufacturer.as_deref();

        let records = match query.term.as_deref() {
            None => self.fetch_by_filters(class, manufacturer).await?,
            Some(term) => {
                let candidates: Vec<DrugRecord> = self
                    .fetch_for_term(term, query.mode)
                    .await?
                    .into_iter()
                    .filter(|r| SearchEngine::matches_filters(r, class, manufacturer))
                    .collect();

                match query.mode {
                    SearchMode::Weighted => self.engine.rank(candidates, term),
                    SearchMode::Text | SearchMode::Standard => candidates,
                }
            }
        };

        debug!(
            term = query.term.as_deref(),
            mode = %query.mode,
            total = records.len(),
            "Listing drugs"
        );

        Ok(paginate(records, query.page, query.limit))
    }

    /// Retrieves a record by slug.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(record))` with `record.slug == slug`
    /// - `Ok(None)` if no such record exists
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Validation`] if `slug` is malformed; the store is
    /// not consulted. Store failures map as in [`Self::list_drugs`].
    pub async fn get_drug(&self, slug: &str) -> Result<Option<DrugRecord>, AppError> {
        if !is_valid_slug(slug) {
            return Err(AppError::bad_request(
                "Invalid drug slug",
                json!({
                    "slug": slug.chars().take(MAX_SLUG_LENGTH).collect::<String>(),
                    "reason": "expected lowercase letters, digits and single hyphens",
                }),
            ));
        }

        let record = self
            .guarded(|| self.repository.get_by_slug(slug))
            .await?;

        Ok(record.filter(|r| {
            let matches = r.slug == slug;
            if !matches {
                warn!(slug, stored = %r.slug, "Store returned a record for a different slug");
            }
            matches
        }))
    }

    /// Distinct therapeutic classes with record counts.
    pub async fn therapeutic_classes(&self) -> Result<Vec<FacetCount>, AppError> {
        self.guarded(|| self.repository.therapeutic_classes()).await
    }

    /// Distinct manufacturers with record counts.
    pub async fn manufacturers(&self) -> Result<Vec<FacetCount>, AppError> {
        self.guarded(|| self.repository.manufacturers()).await
    }

    /// Probes the store directly, bypassing breaker and retry.
    pub async fn check_store(&self) -> Result<(), StoreError> {
        self.repository.ping().await
    }

    pub async fn circuit_status(&self) -> CircuitStatus {
        self.breaker.status(&self.circuit_key).await
    }

    async fn fetch_by_filters(
        &self,
        class: Option<&str>,
        manufacturer: Option<&str>,
    ) -> Result<Vec<DrugRecord>, AppError> {
        match (class, manufacturer) {
            (None, None) => self.guarded(|| self.repository.get_all()).await,
            (Some(class), None) => {
                self.guarded(|| self.repository.find_by_therapeutic_class(class))
                    .await
            }
            (None, Some(name)) => {
                self.guarded(|| self.repository.find_by_manufacturer(name))
                    .await
            }
            (Some(class), Some(name)) => {
                let by_class = self
                    .guarded(|| self.repository.find_by_therapeutic_class(class))
                    .await?;
                Ok(by_class
                    .into_iter()
                    .filter(|r| SearchEngine::matches_filters(r, None, Some(name)))
                    .collect())
            }
        }
    }

    async fn fetch_for_term(&self, term: &str, mode: SearchMode) -> Result<Vec<DrugRecord>, AppError> {
        if mode == SearchMode::Text {
            if let Some(records) = self.guarded(|| self.repository.text_search(term)).await? {
                return Ok(records);
            }
            debug!("Store has no full-text search, falling back to standard matching");
        }

        self.guarded(|| self.repository.search(term)).await
    }

    /// Runs a store call through the circuit breaker and retry policy.
    async fn guarded<T, F, Fut>(&self, operation: F) -> Result<T, AppError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, StoreError>>,
    {
        self.breaker
            .call(&self.circuit_key, || with_retry(&self.retry, operation))
            .await
            .map_err(AppError::from)
    }
}
