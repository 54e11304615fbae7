//! Data Transfer Objects for API requests and responses.
//!
//! Query DTOs use Serde for deserialization and validator for input
//! validation; validation failures become 400 responses listing each
//! offending field.

pub mod drugs;
pub mod facets;
pub mod health;
pub mod pagination;
