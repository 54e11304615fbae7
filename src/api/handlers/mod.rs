//! HTTP request handlers for API endpoints.
//!
//! Each handler module corresponds to a logical grouping of endpoints.

pub mod drugs;
pub mod facets;
pub mod health;

pub use drugs::{get_drug_handler, list_drugs_handler};
pub use facets::{
    drugs_by_class_handler, drugs_by_manufacturer_handler, manufacturers_handler,
    therapeutic_classes_handler,
};
pub use health::health_handler;
