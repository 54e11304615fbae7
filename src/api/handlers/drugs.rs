//! Handlers for drug listing and lookup.

use axum::{
    Json,
    extract::{Path, Query, State, rejection::QueryRejection},
    http::header,
    response::{IntoResponse, Response},
};
use serde_json::{Value, json};
use tracing::{debug, warn};
use validator::Validate;

use crate::api::dto::drugs::DrugSearchParams;
use crate::domain::entities::is_valid_slug;
use crate::domain::pagination::PagedResult;
use crate::error::AppError;
use crate::state::AppState;
use crate::utils::sanitize::{sanitize_page, sanitize_record};

/// Lists drugs matching a search, one page at a time.
///
/// # Endpoint
///
/// `GET /api/drugs`
///
/// # Query Parameters
///
/// - `q` (optional): Free-text term, up to 100 characters
/// - `therapeuticClass` (optional): Exact class, case-insensitive
/// - `manufacturer` (optional): Exact manufacturer or labeler, case-insensitive
/// - `mode` (optional): `standard`, `weighted` or `text`
/// - `page` (optional): Page number (default: 1)
/// - `limit` (optional): Items per page (default: 50, max: 100)
///
/// # Response
///
/// ```json
/// {
///   "data": [{ "slug": "lisinopril", "drugName": "Lisinopril", ... }],
///   "page": 1,
///   "limit": 50,
///   "total": 1,
///   "totalPages": 1,
///   "hasNext": false,
///   "hasPrev": false
/// }
/// ```
///
/// # Errors
///
/// Returns 400 Bad Request with per-field details if parameters are invalid.
/// Returns 503 Service Unavailable if the store is down or its circuit is open.
pub async fn list_drugs_handler(
    State(state): State<AppState>,
    params: Result<Query<DrugSearchParams>, QueryRejection>,
) -> Result<Json<PagedResult<Value>>, AppError> {
    let Query(params) = params.map_err(query_rejection)?;
    params.validate()?;

    let query = params.into_query(state.drug_service.default_mode());
    let page = state.drug_service.list_drugs(&query).await?;

    Ok(Json(sanitize_page(page)?))
}

/// Retrieves a single drug by slug.
///
/// # Endpoint
///
/// `GET /api/drugs/{slug}`
///
/// # Cache Strategy
///
/// - **Cache hit**: Sanitized JSON served as stored
/// - **Cache miss**: Load through the service, spawn async cache write
/// - **Cache error**: Log and fall back to the service
///
/// # Errors
///
/// Returns 400 Bad Request if the slug is malformed.
/// Returns 404 Not Found if no record has this slug.
pub async fn get_drug_handler(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Response, AppError> {
    if is_valid_slug(&slug) {
        match state.cache.get_record(&slug).await {
            Ok(Some(cached)) => {
                debug!("Cache HIT for {}", slug);
                return Ok(json_response(cached));
            }
            Ok(None) => debug!("Cache MISS for {}", slug),
            Err(e) => warn!("Cache error for {}: {}", slug, e),
        }
    }

    let record = state
        .drug_service
        .get_drug(&slug)
        .await?
        .ok_or_else(|| AppError::not_found("Drug not found", json!({ "slug": slug })))?;

    let body = sanitize_record(&record)?.to_string();

    // Asynchronously update cache (fire-and-forget)
    let cache = state.cache.clone();
    let cached_body = body.clone();
    tokio::spawn(async move {
        if let Err(e) = cache.set_record(&slug, &cached_body, None).await {
            warn!("Failed to cache drug {}: {}", slug, e);
        }
    });

    Ok(json_response(body))
}

fn json_response(body: String) -> Response {
    ([(header::CONTENT_TYPE, "application/json")], body).into_response()
}

pub(crate) fn query_rejection(rejection: QueryRejection) -> AppError {
    AppError::bad_request(
        "Invalid query string",
        json!({ "reason": rejection.body_text() }),
    )
}
