//! Outbound record sanitization.
//!
//! Every drug payload leaving the service passes through [`sanitize`]:
//! sensitive keys are removed, free-text identity fields are HTML-encoded and
//! HTML label sections are cleaned against a tag allowlist, at any depth of
//! nesting.

use serde_json::{Map, Value};

use crate::domain::entities::DrugRecord;
use crate::domain::pagination::PagedResult;

/// Keys never emitted, compared case-insensitively.
const DENYLIST: &[&str] = &[
    "_id",
    "__v",
    "internalid",
    "internal_id",
    "password",
    "passwordhash",
    "token",
    "apikey",
    "api_key",
    "secret",
    "accesstoken",
];

/// Free-text fields whose string values are HTML-encoded.
const ENCODED_FIELDS: &[&str] = &[
    "drugName",
    "genericName",
    "activeIngredient",
    "manufacturer",
    "labeler",
    "therapeuticClass",
    "title",
    "name",
];

/// Fields carrying stored markup; their string values are cleaned with
/// [`ammonia`], which drops scripts and event handler attributes.
const MARKUP_FIELDS: &[&str] = &["html"];

/// Removes denylisted keys, encodes allowlisted text and cleans markup,
/// recursively.
///
/// Null and scalar values outside allowlisted fields pass through unchanged.
pub fn sanitize(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(sanitize_object(map)),
        Value::Array(items) => Value::Array(items.into_iter().map(sanitize).collect()),
        other => other,
    }
}

/// Serializes a record and sanitizes the result.
pub fn sanitize_record(record: &DrugRecord) -> Result<Value, serde_json::Error> {
    serde_json::to_value(record).map(sanitize)
}

/// Sanitizes every record on a page, keeping the paging metadata.
pub fn sanitize_page(page: PagedResult<DrugRecord>) -> Result<PagedResult<Value>, serde_json::Error> {
    page.try_map(|record| sanitize_record(&record))
}

/// Encodes the five HTML-significant characters as entities.
pub fn encode_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn sanitize_object(map: Map<String, Value>) -> Map<String, Value> {
    map.into_iter()
        .filter(|(key, _)| !is_denied(key))
        .map(|(key, value)| {
            let value = if ENCODED_FIELDS.contains(&key.as_str()) {
                encode_value(value)
            } else if MARKUP_FIELDS.contains(&key.as_str()) {
                clean_markup(value)
            } else {
                sanitize(value)
            };
            (key, value)
        })
        .collect()
}

fn encode_value(value: Value) -> Value {
    match value {
        Value::String(s) => Value::String(encode_html(&s)),
        Value::Array(items) => Value::Array(items.into_iter().map(encode_value).collect()),
        other => sanitize(other),
    }
}

fn clean_markup(value: Value) -> Value {
    match value {
        Value::String(s) => Value::String(ammonia::clean(&s)),
        other => sanitize(other),
    }
}

fn is_denied(key: &str) -> bool {
    DENYLIST.iter().any(|denied| key.eq_ignore_ascii_case(denied))
}
