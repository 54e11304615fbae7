//! Business logic services for the application layer.

pub mod drug_service;

pub use drug_service::DrugService;
