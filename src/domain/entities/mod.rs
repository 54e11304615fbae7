//! Core domain entities.
//!
//! - [`DrugRecord`] - one drug label, keyed by its slug
//! - [`LabelSections`] / [`LabelText`] - long-form label text, plain or HTML
//! - [`FacetCount`] - a distinct therapeutic class or manufacturer with its record count

pub mod drug;

pub use drug::{DrugRecord, FacetCount, LabelSections, LabelText, MAX_SLUG_LENGTH, is_valid_slug};
