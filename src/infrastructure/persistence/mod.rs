//! Record store implementations.
//!
//! # Repositories
//!
//! - [`PgDrugRepository`] - JSONB documents in PostgreSQL with generated,
//!   indexed columns and native full-text search
//! - [`FileDrugRepository`] - Static JSON file tree, loaded once and memoised

pub mod file_drug_repository;
pub mod pg_drug_repository;

pub use file_drug_repository::FileDrugRepository;
pub use pg_drug_repository::PgDrugRepository;
