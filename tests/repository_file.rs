mod common;

use druginfo::domain::entities::FacetCount;
use druginfo::domain::repositories::{DrugRepository, StoreError};
use druginfo::infrastructure::persistence::FileDrugRepository;
use serde_json::json;

#[tokio::test]
async fn test_get_all_skips_unreadable_entries() {
    let dir = common::create_fixture_tree();
    let repo = FileDrugRepository::new(dir.path());

    let records = repo.get_all().await.unwrap();

    let slugs: Vec<&str> = records.iter().map(|r| r.slug.as_str()).collect();
    assert_eq!(slugs, ["zestril", "ibuprofen", "lisinopril-hctz", "lisinopril"]);
}

#[tokio::test]
async fn test_get_by_slug() {
    let dir = common::create_fixture_tree();
    let repo = FileDrugRepository::new(dir.path());

    let record = repo.get_by_slug("zestril").await.unwrap().unwrap();

    assert_eq!(record.drug_name, "Zestril");
    assert_eq!(record.generic_name.as_deref(), Some("Lisinopril"));
    assert_eq!(record.therapeutic_class.as_deref(), Some("ACE Inhibitor"));
}

#[tokio::test]
async fn test_get_by_slug_not_found() {
    let dir = common::create_fixture_tree();
    let repo = FileDrugRepository::new(dir.path());

    assert!(repo.get_by_slug("missing-drug").await.unwrap().is_none());
}

#[tokio::test]
async fn test_get_by_slug_rejects_path_traversal() {
    let dir = common::create_fixture_tree();
    common::write_json(&dir.path().join("secret.json"), &json!({ "slug": "secret" }));
    let repo = FileDrugRepository::new(dir.path());

    assert!(repo.get_by_slug("../secret").await.unwrap().is_none());
}

#[tokio::test]
async fn test_record_with_mismatched_slug_is_ignored() {
    let dir = common::create_fixture_tree();
    common::write_json(
        &dir.path().join("drugs").join("alias.json"),
        &json!({ "slug": "lisinopril", "drugName": "Lisinopril" }),
    );
    let repo = FileDrugRepository::new(dir.path());

    assert!(repo.get_by_slug("alias").await.unwrap().is_none());
}

#[tokio::test]
async fn test_undecodable_record_is_skipped() {
    let dir = common::create_fixture_tree();
    std::fs::write(dir.path().join("drugs").join("broken.json"), "{ not json").unwrap();
    common::write_json(
        &dir.path().join("index.json"),
        &json!([{ "slug": "broken" }, { "slug": "zestril" }]),
    );
    let repo = FileDrugRepository::new(dir.path());

    let records = repo.get_all().await.unwrap();

    assert_eq!(records.len(), 1);
    assert_eq!(records[0].slug, "zestril");
    assert!(repo.get_by_slug("broken").await.unwrap().is_none());
}

#[tokio::test]
async fn test_missing_index_is_empty_store() {
    let dir = tempfile::tempdir().unwrap();
    let repo = FileDrugRepository::new(dir.path());

    assert!(repo.get_all().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_records_are_loaded_once() {
    let dir = common::create_fixture_tree();
    let repo = FileDrugRepository::new(dir.path());

    assert_eq!(repo.get_all().await.unwrap().len(), 4);
    std::fs::remove_file(dir.path().join("index.json")).unwrap();

    assert_eq!(repo.search("ibuprofen").await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_filters_are_case_insensitive() {
    let dir = common::create_fixture_tree();
    let repo = FileDrugRepository::new(dir.path());

    let by_class = repo.find_by_therapeutic_class("ace inhibitor").await.unwrap();
    let by_labeler = repo.find_by_manufacturer("perrigo & co").await.unwrap();

    assert_eq!(by_class.len(), 3);
    assert_eq!(by_labeler.len(), 1);
    assert_eq!(by_labeler[0].slug, "ibuprofen");
}

#[tokio::test]
async fn test_search_and_text_search() {
    let dir = common::create_fixture_tree();
    let repo = FileDrugRepository::new(dir.path());

    let found = repo.search("HYDROCHLOROTHIAZIDE").await.unwrap();

    assert_eq!(found.len(), 1);
    assert_eq!(found[0].slug, "lisinopril-hctz");
    assert!(repo.text_search("lisinopril").await.unwrap().is_none());
}

#[tokio::test]
async fn test_facets() {
    let dir = common::create_fixture_tree();
    let repo = FileDrugRepository::new(dir.path());

    let classes = repo.therapeutic_classes().await.unwrap();

    assert_eq!(
        classes,
        vec![
            FacetCount {
                name: "ACE Inhibitor".into(),
                count: 3
            },
            FacetCount {
                name: "NSAID".into(),
                count: 1
            },
        ]
    );
}

#[tokio::test]
async fn test_ping() {
    let dir = common::create_fixture_tree();
    let repo = FileDrugRepository::new(dir.path());
    assert!(repo.ping().await.is_ok());

    let missing = FileDrugRepository::new(dir.path().join("nope"));
    assert!(matches!(missing.ping().await, Err(StoreError::Backend(_))));
}
