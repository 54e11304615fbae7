//! Flat-file implementation of the drug record store.
//!
//! Layout under the data directory:
//!
//! ```text
//! index.json          [{ "slug": ..., "drugName": ... }, ...]
//! drugs/<slug>.json   one full record per file
//! ```

use async_trait::async_trait;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

use crate::domain::entities::{DrugRecord, FacetCount, is_valid_slug};
use crate::domain::repositories::{DrugRepository, StoreError};
use crate::domain::search::SearchEngine;

const INDEX_FILE: &str = "index.json";
const RECORDS_DIR: &str = "drugs";

#[derive(Debug, Deserialize)]
struct IndexEntry {
    slug: String,
}

/// Read-only record store backed by a static JSON file tree.
///
/// The full record set is loaded on first use and kept for the life of the
/// process. A failed load is not memoised and is retried on the next call.
pub struct FileDrugRepository {
    root: PathBuf,
    records: OnceCell<Arc<Vec<DrugRecord>>>,
}

impl FileDrugRepository {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            records: OnceCell::new(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn record_path(&self, slug: &str) -> PathBuf {
        self.root.join(RECORDS_DIR).join(format!("{slug}.json"))
    }

    async fn records(&self) -> Result<Arc<Vec<DrugRecord>>, StoreError> {
        self.records
            .get_or_try_init(|| async { self.load_all().await.map(Arc::new) })
            .await
            .cloned()
    }

    async fn load_all(&self) -> Result<Vec<DrugRecord>, StoreError> {
        let index_path = self.root.join(INDEX_FILE);
        let Some(index) = read_json::<Vec<IndexEntry>>(&index_path).await? else {
            return Ok(Vec::new());
        };

        let mut records = Vec::with_capacity(index.len());
        for entry in index {
            if let Some(record) = self.read_record(&entry.slug).await? {
                records.push(record);
            }
        }

        info!(
            root = %self.root.display(),
            count = records.len(),
            "Loaded drug records from data directory"
        );
        Ok(records)
    }

    async fn read_record(&self, slug: &str) -> Result<Option<DrugRecord>, StoreError> {
        if !is_valid_slug(slug) {
            debug!(slug, "Ignoring invalid slug");
            return Ok(None);
        }

        let record = read_json::<DrugRecord>(&self.record_path(slug)).await?;
        Ok(record.filter(|r| {
            let matches = r.slug == slug;
            if !matches {
                warn!(slug, stored = %r.slug, "Record file slug does not match its name");
            }
            matches
        }))
    }

    async fn filtered(
        &self,
        predicate: impl Fn(&DrugRecord) -> bool,
    ) -> Result<Vec<DrugRecord>, StoreError> {
        let records = self.records().await?;
        Ok(records.iter().filter(|r| predicate(r)).cloned().collect())
    }

    async fn facets(
        &self,
        value: impl Fn(&DrugRecord) -> Option<&str>,
    ) -> Result<Vec<FacetCount>, StoreError> {
        let records = self.records().await?;
        let mut counts: BTreeMap<&str, i64> = BTreeMap::new();
        for name in records.iter().filter_map(|r| value(r)) {
            *counts.entry(name).or_default() += 1;
        }

        Ok(counts
            .into_iter()
            .map(|(name, count)| FacetCount {
                name: name.to_string(),
                count,
            })
            .collect())
    }
}

#[async_trait]
impl DrugRepository for FileDrugRepository {
    async fn get_all(&self) -> Result<Vec<DrugRecord>, StoreError> {
        Ok(self.records().await?.as_ref().clone())
    }

    async fn get_by_slug(&self, slug: &str) -> Result<Option<DrugRecord>, StoreError> {
        self.read_record(slug).await
    }

    async fn find_by_therapeutic_class(&self, name: &str) -> Result<Vec<DrugRecord>, StoreError> {
        self.filtered(|r| SearchEngine::matches_filters(r, Some(name), None))
            .await
    }

    async fn find_by_manufacturer(&self, name: &str) -> Result<Vec<DrugRecord>, StoreError> {
        self.filtered(|r| SearchEngine::matches_filters(r, None, Some(name)))
            .await
    }

    async fn search(&self, term: &str) -> Result<Vec<DrugRecord>, StoreError> {
        self.filtered(|r| SearchEngine::matches_standard(r, term))
            .await
    }

    async fn text_search(&self, _term: &str) -> Result<Option<Vec<DrugRecord>>, StoreError> {
        Ok(None)
    }

    async fn therapeutic_classes(&self) -> Result<Vec<FacetCount>, StoreError> {
        self.facets(|r| r.therapeutic_class.as_deref()).await
    }

    async fn manufacturers(&self) -> Result<Vec<FacetCount>, StoreError> {
        self.facets(|r| r.manufacturer_or_labeler()).await
    }

    async fn ping(&self) -> Result<(), StoreError> {
        fs::metadata(self.root.join(INDEX_FILE))
            .await
            .map(|_| ())
            .map_err(|e| classify_io(&self.root, e))
    }
}

/// Reads and decodes a JSON file.
///
/// Missing and undecodable files yield `Ok(None)` with a warning.
async fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, StoreError> {
    let bytes = match fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            warn!(path = %path.display(), "Data file not found");
            return Ok(None);
        }
        Err(e) => return Err(classify_io(path, e)),
    };

    match serde_json::from_slice(&bytes) {
        Ok(value) => Ok(Some(value)),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Skipping undecodable data file");
            Ok(None)
        }
    }
}

fn classify_io(path: &Path, err: io::Error) -> StoreError {
    let message = format!("{}: {}", path.display(), err);
    match err.kind() {
        ErrorKind::TimedOut => StoreError::Timeout(message),
        ErrorKind::ConnectionReset | ErrorKind::ConnectionAborted => {
            StoreError::ConnectionReset(message)
        }
        _ => StoreError::Backend(message),
    }
}
