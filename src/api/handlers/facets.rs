//! Handlers for therapeutic class and manufacturer listings.

use axum::{
    Json,
    extract::{Path, Query, State, rejection::QueryRejection},
};
use serde_json::{Value, json};
use validator::Validate;

use crate::api::dto::facets::FacetListResponse;
use crate::api::dto::pagination::PaginationParams;
use crate::api::handlers::drugs::query_rejection;
use crate::domain::pagination::PagedResult;
use crate::domain::search::SearchQuery;
use crate::error::AppError;
use crate::state::AppState;
use crate::utils::sanitize::{sanitize, sanitize_page};

const MAX_FACET_NAME_LENGTH: usize = 200;

/// Lists therapeutic classes with record counts.
///
/// # Endpoint
///
/// `GET /api/therapeutic-classes`
///
/// # Response
///
/// ```json
/// { "data": [{ "name": "ACE Inhibitor", "count": 3 }], "total": 1 }
/// ```
///
/// Names are HTML-encoded like the record fields they come from.
pub async fn therapeutic_classes_handler(
    State(state): State<AppState>,
) -> Result<Json<Value>, AppError> {
    let classes = state.drug_service.therapeutic_classes().await?;
    facet_list(classes.into())
}

/// Lists manufacturers with record counts.
///
/// # Endpoint
///
/// `GET /api/manufacturers`
pub async fn manufacturers_handler(
    State(state): State<AppState>,
) -> Result<Json<Value>, AppError> {
    let manufacturers = state.drug_service.manufacturers().await?;
    facet_list(manufacturers.into())
}

/// Lists drugs in one therapeutic class.
///
/// # Endpoint
///
/// `GET /api/therapeutic-classes/{name}?page&limit`
pub async fn drugs_by_class_handler(
    State(state): State<AppState>,
    Path(name): Path<String>,
    params: Result<Query<PaginationParams>, QueryRejection>,
) -> Result<Json<PagedResult<Value>>, AppError> {
    let Query(params) = params.map_err(query_rejection)?;
    params.validate()?;
    check_name("therapeuticClass", &name)?;

    let query = SearchQuery::default()
        .with_therapeutic_class(Some(name))
        .with_page(params.page(), params.limit());
    let page = state.drug_service.list_drugs(&query).await?;

    Ok(Json(sanitize_page(page)?))
}

/// Lists drugs from one manufacturer or labeler.
///
/// # Endpoint
///
/// `GET /api/manufacturers/{name}?page&limit`
pub async fn drugs_by_manufacturer_handler(
    State(state): State<AppState>,
    Path(name): Path<String>,
    params: Result<Query<PaginationParams>, QueryRejection>,
) -> Result<Json<PagedResult<Value>>, AppError> {
    let Query(params) = params.map_err(query_rejection)?;
    params.validate()?;
    check_name("manufacturer", &name)?;

    let query = SearchQuery::default()
        .with_manufacturer(Some(name))
        .with_page(params.page(), params.limit());
    let page = state.drug_service.list_drugs(&query).await?;

    Ok(Json(sanitize_page(page)?))
}

fn facet_list(list: FacetListResponse) -> Result<Json<Value>, AppError> {
    Ok(Json(sanitize(serde_json::to_value(list)?)))
}

fn check_name(field: &str, name: &str) -> Result<(), AppError> {
    if name.trim().is_empty() || name.chars().count() > MAX_FACET_NAME_LENGTH {
        return Err(AppError::bad_request(
            "Invalid request parameters",
            json!({
                "fields": {
                    field: [{
                        "code": "length",
                        "message": format!("{field} must be 1 to {MAX_FACET_NAME_LENGTH} characters"),
                    }]
                }
            }),
        ));
    }
    Ok(())
}
