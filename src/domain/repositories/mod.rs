//! Repository trait definitions for the domain layer.
//!
//! [`DrugRepository`] is the read contract every record store implements.
//! Implementations live in `crate::infrastructure::persistence`; a mock is
//! generated with `mockall` for unit tests.

pub mod drug_repository;

pub use drug_repository::{DrugRepository, StoreError};

#[cfg(test)]
pub use drug_repository::MockDrugRepository;
