//! DTOs for drug listing endpoints.

use regex::Regex;
use serde::Deserialize;
use std::sync::LazyLock;
use validator::{Validate, ValidationError};

use crate::api::dto::pagination::PaginationParams;
use crate::domain::search::{SearchMode, SearchQuery};

/// Characters accepted in a search term.
static TERM_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[\p{L}\p{N}\s\-.,'()/+&]+$").unwrap());

/// Longest accepted search term, after trimming.
pub const MAX_TERM_LENGTH: usize = 100;

/// Query parameters for `GET /api/drugs`.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct DrugSearchParams {
    /// Free-text term; blank means no term.
    #[validate(custom(function = "validate_term"))]
    pub q: Option<String>,

    #[serde(rename = "therapeuticClass")]
    #[validate(length(max = 200, message = "therapeuticClass must be at most 200 characters"))]
    pub therapeutic_class: Option<String>,

    #[validate(length(max = 200, message = "manufacturer must be at most 200 characters"))]
    pub manufacturer: Option<String>,

    #[validate(custom(function = "validate_mode"))]
    pub mode: Option<String>,

    #[serde(flatten)]
    #[validate(nested)]
    pub pagination: PaginationParams,
}

impl DrugSearchParams {
    /// Builds the search query; call after successful validation.
    pub fn into_query(self, default_mode: SearchMode) -> SearchQuery {
        let mode = self
            .mode
            .as_deref()
            .and_then(|m| m.parse().ok())
            .unwrap_or(default_mode);

        SearchQuery::default()
            .with_term(self.q)
            .with_therapeutic_class(self.therapeutic_class)
            .with_manufacturer(self.manufacturer)
            .with_page(self.pagination.page(), self.pagination.limit())
            .with_mode(mode)
    }
}

fn validate_term(term: &str) -> Result<(), ValidationError> {
    let trimmed = term.trim();
    if trimmed.is_empty() {
        return Ok(());
    }

    if trimmed.chars().count() > MAX_TERM_LENGTH {
        return Err(ValidationError::new("length")
            .with_message("q must be at most 100 characters".into()));
    }

    if !TERM_REGEX.is_match(trimmed) {
        return Err(ValidationError::new("invalid_characters").with_message(
            "q may contain only letters, digits, spaces and - . , ' ( ) / + &".into(),
        ));
    }

    Ok(())
}

fn validate_mode(mode: &str) -> Result<(), ValidationError> {
    mode.parse::<SearchMode>()
        .map(|_| ())
        .map_err(|_| {
            ValidationError::new("unknown_mode")
                .with_message("mode must be one of weighted, text, standard".into())
        })
}
