//! Search query value object.

use crate::domain::pagination::DEFAULT_PAGE_SIZE;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Matching strategy for free-text terms.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchMode {
    /// Relevance-scored match across several fields, best first.
    Weighted,
    /// The store's native full-text search, or `Standard` where unsupported.
    Text,
    /// Case-insensitive substring match in store order.
    #[default]
    Standard,
}

impl SearchMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Weighted => "weighted",
            Self::Text => "text",
            Self::Standard => "standard",
        }
    }
}

impl fmt::Display for SearchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SearchMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "weighted" => Ok(Self::Weighted),
            "text" => Ok(Self::Text),
            "standard" => Ok(Self::Standard),
            other => Err(format!(
                "unknown search mode '{other}', expected weighted, text or standard"
            )),
        }
    }
}

/// A validated, per-request listing query.
///
/// Built from request parameters after validation; never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    pub term: Option<String>,
    pub therapeutic_class: Option<String>,
    pub manufacturer: Option<String>,
    pub page: u32,
    pub limit: u32,
    pub mode: SearchMode,
}

impl Default for SearchQuery {
    fn default() -> Self {
        Self {
            term: None,
            therapeutic_class: None,
            manufacturer: None,
            page: 1,
            limit: DEFAULT_PAGE_SIZE,
            mode: SearchMode::default(),
        }
    }
}

impl SearchQuery {
    /// Sets the free-text term. Blank terms are treated as absent.
    pub fn with_term(mut self, term: Option<impl AsRef<str>>) -> Self {
        self.term = non_blank(term);
        self
    }

    pub fn with_therapeutic_class(mut self, therapeutic_class: Option<impl AsRef<str>>) -> Self {
        self.therapeutic_class = non_blank(therapeutic_class);
        self
    }

    pub fn with_manufacturer(mut self, manufacturer: Option<impl AsRef<str>>) -> Self {
        self.manufacturer = non_blank(manufacturer);
        self
    }

    pub fn with_page(mut self, page: u32, limit: u32) -> Self {
        self.page = page;
        self.limit = limit;
        self
    }

    pub fn with_mode(mut self, mode: SearchMode) -> Self {
        self.mode = mode;
        self
    }

    /// True when the query narrows the record set in any way.
    pub fn has_criteria(&self) -> bool {
        self.term.is_some() || self.therapeutic_class.is_some() || self.manufacturer.is_some()
    }
}

fn non_blank(value: Option<impl AsRef<str>>) -> Option<String> {
    value
        .map(|v| v.as_ref().trim().to_string())
        .filter(|v| !v.is_empty())
}
