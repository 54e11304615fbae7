//! PostgreSQL implementation of the drug record store.

use async_trait::async_trait;
use serde_json::Value;
use sqlx::PgPool;
use std::io::ErrorKind;
use std::sync::Arc;
use tracing::{error, warn};

use crate::domain::entities::{DrugRecord, FacetCount};
use crate::domain::repositories::{DrugRepository, StoreError};

const DEFAULT_ORDER: &str = "ORDER BY drug_name, slug";

/// PostgreSQL repository serving JSONB drug documents.
///
/// Each row of `drugs` holds one document keyed by slug. Indexed fields are
/// generated columns, so filters and substring search never touch the JSON
/// directly.
pub struct PgDrugRepository {
    pool: Arc<PgPool>,
}

impl PgDrugRepository {
    /// Creates a new repository with a database connection pool.
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }

    async fn fetch_documents(
        &self,
        sql: &str,
        bind: Option<&str>,
    ) -> Result<Vec<DrugRecord>, StoreError> {
        let mut query = sqlx::query_scalar::<_, Value>(sql);
        if let Some(value) = bind {
            query = query.bind(value);
        }

        let documents = query
            .fetch_all(self.pool.as_ref())
            .await
            .map_err(classify)?;

        Ok(documents.into_iter().filter_map(decode_document).collect())
    }

    async fn fetch_facets(&self, sql: &str) -> Result<Vec<FacetCount>, StoreError> {
        let rows = sqlx::query_as::<_, (String, i64)>(sql)
            .fetch_all(self.pool.as_ref())
            .await
            .map_err(classify)?;

        Ok(rows
            .into_iter()
            .map(|(name, count)| FacetCount { name, count })
            .collect())
    }
}

#[async_trait]
impl DrugRepository for PgDrugRepository {
    async fn get_all(&self) -> Result<Vec<DrugRecord>, StoreError> {
        self.fetch_documents(&format!("SELECT document FROM drugs {DEFAULT_ORDER}"), None)
            .await
    }

    async fn get_by_slug(&self, slug: &str) -> Result<Option<DrugRecord>, StoreError> {
        let document = sqlx::query_scalar::<_, Value>("SELECT document FROM drugs WHERE slug = $1")
            .bind(slug)
            .fetch_optional(self.pool.as_ref())
            .await
            .map_err(classify)?;

        Ok(document.and_then(decode_document))
    }

    async fn find_by_therapeutic_class(&self, name: &str) -> Result<Vec<DrugRecord>, StoreError> {
        let sql = format!(
            "SELECT document FROM drugs WHERE lower(therapeutic_class) = lower($1) {DEFAULT_ORDER}"
        );
        self.fetch_documents(&sql, Some(name)).await
    }

    async fn find_by_manufacturer(&self, name: &str) -> Result<Vec<DrugRecord>, StoreError> {
        let sql = format!(
            r#"
            SELECT document FROM drugs
            WHERE lower(document->>'manufacturer') = lower($1)
               OR lower(document->>'labeler') = lower($1)
            {DEFAULT_ORDER}
            "#
        );
        self.fetch_documents(&sql, Some(name)).await
    }

    async fn search(&self, term: &str) -> Result<Vec<DrugRecord>, StoreError> {
        let pattern = format!("%{}%", escape_like(term));
        let sql = format!(
            r#"
            SELECT document FROM drugs
            WHERE drug_name ILIKE $1
               OR generic_name ILIKE $1
               OR manufacturer ILIKE $1
               OR therapeutic_class ILIKE $1
               OR indications_text ILIKE $1
            {DEFAULT_ORDER}
            "#
        );
        self.fetch_documents(&sql, Some(&pattern)).await
    }

    async fn text_search(&self, term: &str) -> Result<Option<Vec<DrugRecord>>, StoreError> {
        let sql = r#"
            SELECT document FROM drugs
            WHERE search_vector @@ websearch_to_tsquery('english', $1)
            ORDER BY ts_rank(search_vector, websearch_to_tsquery('english', $1)) DESC,
                     drug_name, slug
            "#;
        self.fetch_documents(sql, Some(term)).await.map(Some)
    }

    async fn therapeutic_classes(&self) -> Result<Vec<FacetCount>, StoreError> {
        self.fetch_facets(
            r#"
            SELECT therapeutic_class, COUNT(*)
            FROM drugs
            WHERE therapeutic_class IS NOT NULL
            GROUP BY therapeutic_class
            ORDER BY therapeutic_class
            "#,
        )
        .await
    }

    async fn manufacturers(&self) -> Result<Vec<FacetCount>, StoreError> {
        self.fetch_facets(
            r#"
            SELECT manufacturer, COUNT(*)
            FROM drugs
            WHERE manufacturer IS NOT NULL
            GROUP BY manufacturer
            ORDER BY manufacturer
            "#,
        )
        .await
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query_scalar::<_, i32>("SELECT 1")
            .fetch_one(self.pool.as_ref())
            .await
            .map(|_| ())
            .map_err(classify)
    }
}

/// Decodes a stored document, skipping it when it does not form a record.
fn decode_document(document: Value) -> Option<DrugRecord> {
    let slug = document
        .get("slug")
        .and_then(Value::as_str)
        .unwrap_or("<unknown>")
        .to_string();

    match serde_json::from_value(document) {
        Ok(record) => Some(record),
        Err(e) => {
            warn!(slug = %slug, error = %e, "Skipping undecodable drug document");
            None
        }
    }
}

/// Escapes `LIKE` metacharacters so user input matches literally.
pub(crate) fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Maps a SQLx failure onto the store error classes the retry policy selects on.
pub(crate) fn classify(err: sqlx::Error) -> StoreError {
    let message = err.to_string();
    match &err {
        sqlx::Error::PoolTimedOut => StoreError::Timeout(message),
        sqlx::Error::Io(io) => match io.kind() {
            ErrorKind::TimedOut => StoreError::Timeout(message),
            ErrorKind::ConnectionReset | ErrorKind::ConnectionAborted | ErrorKind::BrokenPipe => {
                StoreError::ConnectionReset(message)
            }
            _ => StoreError::Connectivity(message),
        },
        sqlx::Error::Tls(_) | sqlx::Error::PoolClosed | sqlx::Error::WorkerCrashed => {
            StoreError::Connectivity(message)
        }
        _ => {
            error!("Database error: {}", message);
            StoreError::Backend(message)
        }
    }
}
