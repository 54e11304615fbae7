//! Search/filter stage.
//!
//! [`SearchQuery`] carries the validated request; [`SearchEngine`] applies
//! standard substring matching, categorical filters and weighted ranking to
//! records fetched from a store.

pub mod engine;
pub mod query;

pub use engine::{SearchEngine, SearchWeights};
pub use query::{SearchMode, SearchQuery};
