use std::sync::Arc;

use crate::application::services::DrugService;
use crate::domain::repositories::DrugRepository;
use crate::infrastructure::cache::CacheService;

/// Shared state injected into every handler.
///
/// The record store behind `drug_service` is chosen once at startup.
#[derive(Clone)]
pub struct AppState {
    pub drug_service: Arc<DrugService<dyn DrugRepository>>,
    pub cache: Arc<dyn CacheService>,
}

impl AppState {
    pub fn new(
        drug_service: Arc<DrugService<dyn DrugRepository>>,
        cache: Arc<dyn CacheService>,
    ) -> Self {
        Self {
            drug_service,
            cache,
        }
    }
}
