//! In-memory matching, filtering and relevance ranking.

use crate::domain::entities::DrugRecord;
use std::cmp::Reverse;

/// Per-field weights for relevance scoring.
///
/// Drug-name tiers are exclusive (the best matching tier counts), as are the
/// generic-name tiers. All other matched fields add their weight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchWeights {
    pub name_exact: u32,
    pub name_prefix: u32,
    pub name_partial: u32,
    pub generic_exact: u32,
    pub generic_partial: u32,
    pub therapeutic_class: u32,
    pub manufacturer: u32,
    pub indications: u32,
}

impl Default for SearchWeights {
    fn default() -> Self {
        Self {
            name_exact: 100,
            name_prefix: 75,
            name_partial: 50,
            generic_exact: 80,
            generic_partial: 40,
            therapeutic_class: 20,
            manufacturer: 15,
            indications: 10,
        }
    }
}

/// Stateless search stage applied to records already fetched from a store.
#[derive(Debug, Clone, Default)]
pub struct SearchEngine {
    weights: SearchWeights,
}

impl SearchEngine {
    pub fn new(weights: SearchWeights) -> Self {
        Self { weights }
    }

    pub fn weights(&self) -> &SearchWeights {
        &self.weights
    }

    /// Case-insensitive substring match over the standard field set.
    pub fn matches_standard(record: &DrugRecord, term: &str) -> bool {
        let needle = term.to_lowercase();
        contains_ci(Some(&record.drug_name), &needle)
            || contains_ci(record.generic_or_ingredient(), &needle)
            || contains_ci(record.manufacturer_or_labeler(), &needle)
            || contains_ci(record.therapeutic_class.as_deref(), &needle)
            || contains_ci(record.indications_text().as_deref(), &needle)
    }

    /// Keeps records matching `term` in standard mode, preserving order.
    pub fn filter_standard(records: Vec<DrugRecord>, term: &str) -> Vec<DrugRecord> {
        records
            .into_iter()
            .filter(|record| Self::matches_standard(record, term))
            .collect()
    }

    /// Case-insensitive equality against the categorical filters.
    ///
    /// An absent filter matches everything.
    pub fn matches_filters(
        record: &DrugRecord,
        therapeutic_class: Option<&str>,
        manufacturer: Option<&str>,
    ) -> bool {
        let class_ok = therapeutic_class
            .is_none_or(|class| eq_ci(record.therapeutic_class.as_deref(), class));
        let manufacturer_ok = manufacturer.is_none_or(|name| {
            eq_ci(record.manufacturer.as_deref(), name) || eq_ci(record.labeler.as_deref(), name)
        });
        class_ok && manufacturer_ok
    }

    /// Relevance score of `record` for `term`; zero means no match.
    pub fn score(&self, record: &DrugRecord, term: &str) -> u32 {
        let needle = term.to_lowercase();
        let w = &self.weights;
        let mut score = 0;

        let name = record.drug_name.to_lowercase();
        if name == needle {
            score += w.name_exact;
        } else if name.starts_with(&needle) {
            score += w.name_prefix;
        } else if name.contains(&needle) {
            score += w.name_partial;
        }

        if let Some(generic) = record.generic_or_ingredient() {
            let generic = generic.to_lowercase();
            if generic == needle {
                score += w.generic_exact;
            } else if generic.contains(&needle) {
                score += w.generic_partial;
            }
        }

        if contains_ci(record.therapeutic_class.as_deref(), &needle) {
            score += w.therapeutic_class;
        }
        if contains_ci(record.manufacturer_or_labeler(), &needle) {
            score += w.manufacturer;
        }
        if contains_ci(record.indications_text().as_deref(), &needle) {
            score += w.indications;
        }

        score
    }

    /// Scores every record, drops non-matches and orders by descending score.
    ///
    /// Records with equal scores keep their input order.
    pub fn rank(&self, records: Vec<DrugRecord>, term: &str) -> Vec<DrugRecord> {
        let mut scored: Vec<(u32, DrugRecord)> = records
            .into_iter()
            .map(|record| (self.score(&record, term), record))
            .filter(|(score, _)| *score > 0)
            .collect();

        scored.sort_by_key(|(score, _)| Reverse(*score));
        scored.into_iter().map(|(_, record)| record).collect()
    }
}

fn contains_ci(haystack: Option<&str>, needle_lower: &str) -> bool {
    haystack.is_some_and(|h| h.to_lowercase().contains(needle_lower))
}

fn eq_ci(value: Option<&str>, expected: &str) -> bool {
    value.is_some_and(|v| v.trim().to_lowercase() == expected.trim().to_lowercase())
}
