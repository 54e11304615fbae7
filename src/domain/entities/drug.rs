//! Drug record entity representing one FDA-style drug label.

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::borrow::Cow;
use std::sync::LazyLock;

static SLUG_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9]+(?:-[a-z0-9]+)*$").unwrap());

static HTML_TAG_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").unwrap());

static WHITESPACE_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// Maximum accepted slug length.
pub const MAX_SLUG_LENGTH: usize = 200;

/// Returns true if `slug` is a well-formed, URL-safe record identifier.
///
/// Slugs are lowercase ASCII alphanumerics separated by single hyphens.
pub fn is_valid_slug(slug: &str) -> bool {
    !slug.is_empty() && slug.len() <= MAX_SLUG_LENGTH && SLUG_REGEX.is_match(slug)
}

/// A single drug label.
///
/// Records are produced by an offline ingestion process and are read-only
/// while the service runs. `slug` is the only key used for direct retrieval.
///
/// Unknown document keys (ingestion metadata, nested vendor blocks, store
/// identifiers) are preserved in [`DrugRecord::extra`] so that the
/// sanitization stage sees the record exactly as stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DrugRecord {
    pub slug: String,
    pub drug_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generic_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_ingredient: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manufacturer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub labeler: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub therapeutic_class: Option<String>,
    #[serde(default)]
    pub label: LabelSections,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl DrugRecord {
    /// Creates a record with only the required fields set.
    pub fn new(slug: impl Into<String>, drug_name: impl Into<String>) -> Self {
        Self {
            slug: slug.into(),
            drug_name: drug_name.into(),
            generic_name: None,
            active_ingredient: None,
            manufacturer: None,
            labeler: None,
            therapeutic_class: None,
            label: LabelSections::default(),
            extra: Map::new(),
        }
    }

    pub fn with_generic_name(mut self, generic_name: impl Into<String>) -> Self {
        self.generic_name = Some(generic_name.into());
        self
    }

    pub fn with_manufacturer(mut self, manufacturer: impl Into<String>) -> Self {
        self.manufacturer = Some(manufacturer.into());
        self
    }

    pub fn with_therapeutic_class(mut self, therapeutic_class: impl Into<String>) -> Self {
        self.therapeutic_class = Some(therapeutic_class.into());
        self
    }

    pub fn with_indications(mut self, indications: LabelText) -> Self {
        self.label.indications = Some(indications);
        self
    }

    /// Generic name, falling back to the active ingredient.
    pub fn generic_or_ingredient(&self) -> Option<&str> {
        self.generic_name
            .as_deref()
            .or(self.active_ingredient.as_deref())
    }

    /// Manufacturer, falling back to the labeler.
    pub fn manufacturer_or_labeler(&self) -> Option<&str> {
        self.manufacturer.as_deref().or(self.labeler.as_deref())
    }

    /// Plain-text indications, with markup removed.
    pub fn indications_text(&self) -> Option<Cow<'_, str>> {
        self.label.indications.as_ref().map(LabelText::plain_text)
    }
}

/// Long-form label sections.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LabelSections {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub boxed_warning: Option<LabelText>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub indications: Option<LabelText>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dosage: Option<LabelText>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contraindications: Option<LabelText>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warnings: Option<LabelText>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub adverse_reactions: Option<LabelText>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub drug_interactions: Option<LabelText>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clinical_pharmacology: Option<LabelText>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<LabelText>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub how_supplied: Option<LabelText>,
}

/// A label section body: either plain text or HTML-bearing text.
///
/// Serialized untagged, so a plain section is a JSON string and an HTML
/// section is `{"html": "..."}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LabelText {
    Plain(String),
    Html { html: String },
}

impl LabelText {
    /// Returns the section as plain text.
    ///
    /// HTML sections have their tags stripped, common entities decoded and
    /// whitespace collapsed.
    pub fn plain_text(&self) -> Cow<'_, str> {
        match self {
            Self::Plain(text) => Cow::Borrowed(text.as_str()),
            Self::Html { html } => Cow::Owned(strip_html(html)),
        }
    }
}

fn strip_html(html: &str) -> String {
    let without_tags = HTML_TAG_REGEX.replace_all(html, " ");
    let decoded = without_tags
        .replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&");
    WHITESPACE_REGEX
        .replace_all(decoded.trim(), " ")
        .into_owned()
}

/// A distinct categorical value with the number of records carrying it.
///
/// Used for therapeutic class and manufacturer listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FacetCount {
    pub name: String,
    pub count: i64,
}
