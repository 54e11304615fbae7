#![allow(dead_code)]

use axum_test::TestServer;
use druginfo::application::services::DrugService;
use druginfo::domain::repositories::{DrugRepository, StoreError};
use druginfo::infrastructure::cache::NullCache;
use druginfo::infrastructure::persistence::FileDrugRepository;
use druginfo::infrastructure::resilience::{CircuitBreaker, CircuitBreakerOptions, RetryOptions};
use druginfo::routes::build_router;
use druginfo::state::AppState;
use serde_json::{Value, json};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

pub fn zestril() -> Value {
    json!({
        "slug": "zestril",
        "drugName": "Zestril",
        "genericName": "Lisinopril",
        "manufacturer": "AstraZeneca",
        "therapeuticClass": "ACE Inhibitor",
        "label": { "indications": "Hypertension and heart failure." }
    })
}

pub fn ibuprofen() -> Value {
    json!({
        "slug": "ibuprofen",
        "drugName": "Ibuprofen <Children's>",
        "activeIngredient": "Ibuprofen",
        "labeler": "Perrigo & Co",
        "therapeuticClass": "NSAID",
        "label": { "indications": { "html": "<p>Temporary relief of minor <b>aches</b></p><script>alert(1)</script><img src=x onerror=alert(2)>" } },
        "_id": "65a1f0c2e4",
        "internalId": 42
    })
}

pub fn lisinopril_hctz() -> Value {
    json!({
        "slug": "lisinopril-hctz",
        "drugName": "Lisinopril and Hydrochlorothiazide",
        "genericName": "Lisinopril and Hydrochlorothiazide",
        "manufacturer": "Lupin Pharmaceuticals",
        "therapeuticClass": "ACE Inhibitor"
    })
}

pub fn lisinopril() -> Value {
    json!({
        "slug": "lisinopril",
        "drugName": "Lisinopril",
        "genericName": "Lisinopril",
        "manufacturer": "Lupin Pharmaceuticals",
        "therapeuticClass": "ACE Inhibitor",
        "label": { "indications": "Treatment of hypertension." }
    })
}

/// Writes a data directory with four readable records.
///
/// The index also names a slug with no record file and a malformed slug;
/// both are skipped by the store.
pub fn create_fixture_tree() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    let records = [zestril(), ibuprofen(), lisinopril_hctz(), lisinopril()];

    let mut index: Vec<Value> = records
        .iter()
        .map(|r| json!({ "slug": r["slug"], "drugName": r["drugName"] }))
        .collect();
    index.push(json!({ "slug": "missing-drug" }));
    index.push(json!({ "slug": "../Secrets" }));

    write_json(&dir.path().join("index.json"), &Value::Array(index));
    std::fs::create_dir(dir.path().join("drugs")).unwrap();
    for record in &records {
        let slug = record["slug"].as_str().unwrap();
        write_json(&dir.path().join("drugs").join(format!("{slug}.json")), record);
    }

    dir
}

/// Writes `count` generated records, `bulk-000` onwards, all in class "Bulk".
pub fn create_bulk_tree(count: usize) -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir(dir.path().join("drugs")).unwrap();

    let mut index = Vec::with_capacity(count);
    for i in 0..count {
        let slug = format!("bulk-{i:03}");
        let record = json!({
            "slug": slug,
            "drugName": format!("Bulk Drug {i:03}"),
            "therapeuticClass": "Bulk"
        });
        write_json(&dir.path().join("drugs").join(format!("{slug}.json")), &record);
        index.push(json!({ "slug": slug }));
    }
    write_json(&dir.path().join("index.json"), &Value::Array(index));

    dir
}

pub fn write_json(path: &Path, value: &Value) {
    std::fs::write(path, serde_json::to_vec_pretty(value).unwrap()).unwrap();
}

pub fn no_retry() -> RetryOptions<StoreError> {
    RetryOptions::new(1, Duration::ZERO, Duration::ZERO, false).on_network_errors()
}

pub fn create_test_state(root: &Path) -> AppState {
    create_test_state_with(root, CircuitBreakerOptions::default())
}

pub fn create_test_state_with(root: &Path, circuit: CircuitBreakerOptions) -> AppState {
    let repository: Arc<dyn DrugRepository> = Arc::new(FileDrugRepository::new(root));
    let breaker = Arc::new(CircuitBreaker::new(circuit));
    let service = DrugService::new(repository, breaker, "store:files", no_retry());

    AppState::new(Arc::new(service), Arc::new(NullCache::new()))
}

pub fn create_test_server(state: AppState) -> TestServer {
    TestServer::new(build_router(state)).unwrap()
}
