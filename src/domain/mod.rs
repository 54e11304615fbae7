//! Domain layer containing business entities and logic.
//!
//! Nothing in this layer depends on infrastructure or presentation code.
//!
//! # Architecture
//!
//! - [`entities`] - Drug records and label text
//! - [`repositories`] - Record store contract
//! - [`search`] - Query object, matching and relevance ranking
//! - [`pagination`] - Page slicing and metadata
//!
//! # Listing Flow
//!
//! 1. Handler validates parameters into a [`search::SearchQuery`]
//! 2. [`crate::application::services::DrugService`] fetches candidates through a
//!    [`repositories::DrugRepository`] guarded by circuit breaker and retry
//! 3. [`search::SearchEngine`] narrows and orders the candidates
//! 4. [`pagination::paginate`] slices the requested page
//! 5. [`crate::utils::sanitize`] cleans each record on the way out

pub mod entities;
pub mod pagination;
pub mod repositories;
pub mod search;
