//! API route configuration.

use crate::api::handlers::{
    drugs_by_class_handler, drugs_by_manufacturer_handler, get_drug_handler, list_drugs_handler,
    manufacturers_handler, therapeutic_classes_handler,
};
use crate::state::AppState;
use axum::{Router, routing::get};

/// Public, read-only API routes.
///
/// # Endpoints
///
/// - `GET /drugs`                        - Search and list drugs (paginated)
/// - `GET /drugs/{slug}`                 - Single drug by slug
/// - `GET /therapeutic-classes`          - Therapeutic classes with counts
/// - `GET /therapeutic-classes/{name}`   - Drugs in a class (paginated)
/// - `GET /manufacturers`                - Manufacturers with counts
/// - `GET /manufacturers/{name}`         - Drugs by manufacturer (paginated)
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/drugs", get(list_drugs_handler))
        .route("/drugs/{slug}", get(get_drug_handler))
        .route("/therapeutic-classes", get(therapeutic_classes_handler))
        .route("/therapeutic-classes/{name}", get(drugs_by_class_handler))
        .route("/manufacturers", get(manufacturers_handler))
        .route("/manufacturers/{name}", get(drugs_by_manufacturer_handler))
}
