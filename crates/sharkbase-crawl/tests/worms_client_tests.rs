//! WoRMS client and full crawls against a mocked registry

use serde_json::{json, Value};
use sharkbase_crawl::{
    config::CrawlConfig,
    crawl::Crawler,
    output,
    source::{
        worms::{MAX_PAGES, PAGE_SIZE},
        ChildSource, SourceError, WormsClient,
    },
    taxon::{Rank, TaxonId},
};
use tempfile::TempDir;
use wiremock::{
    matchers::{header, method, path, query_param},
    Mock, MockServer, ResponseTemplate,
};

/// Helper to build an AphiaRecord as the registry serializes it
fn record(id: u64, name: &str, rank: &str, status: &str) -> Value {
    json!({
        "AphiaID": id,
        "url": format!("https://www.marinespecies.org/aphia.php?p=taxdetails&id={}", id),
        "scientificname": name,
        "authority": "Müller & Henle, 1838",
        "status": status,
        "unacceptreason": null,
        "taxonRankID": 220,
        "rank": rank,
        "valid_AphiaID": id,
        "valid_name": name,
        "kingdom": "Animalia",
        "class": "Elasmobranchii",
        "isMarine": 1,
        "modified": "2023-01-12T10:24:11.157Z"
    })
}

fn config_for(server: &MockServer) -> CrawlConfig {
    CrawlConfig::new()
        .with_base_url(server.uri())
        .with_request_interval_ms(0)
}

async fn mount_children(server: &MockServer, parent: u64, children: Value) {
    Mock::given(method("GET"))
        .and(path(format!("/AphiaChildrenByAphiaID/{}", parent)))
        .respond_with(ResponseTemplate::new(200).set_body_json(children))
        .mount(server)
        .await;
}

async fn mount_no_children(server: &MockServer, parent: u64) {
    Mock::given(method("GET"))
        .and(path(format!("/AphiaChildrenByAphiaID/{}", parent)))
        .respond_with(ResponseTemplate::new(204))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_children_are_converted_in_order() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/AphiaChildrenByAphiaID/1517375"))
        .and(query_param("offset", "1"))
        .and(query_param("marine_only", "true"))
        .and(header("user-agent", "BioDataCollector_Peer_Project"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            record(10193, "Elasmobranchii", "Subclass", "accepted"),
            record(10192, "Holocephali", "Subclass", "accepted"),
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let client = WormsClient::new(&config_for(&server)).unwrap();
    let listing = client.children(TaxonId(1517375)).await.unwrap();

    assert_eq!(listing.nodes.len(), 2);
    assert_eq!(listing.nodes[0].name, "Elasmobranchii");
    assert_eq!(listing.nodes[0].rank, Rank::Other("Subclass".to_string()));
    assert_eq!(listing.nodes[1].id, TaxonId(10192));
    assert_eq!(listing.skipped, 0);
}

#[tokio::test]
async fn test_no_content_means_no_children() {
    let server = MockServer::start().await;
    mount_no_children(&server, 105820).await;

    let client = WormsClient::new(&config_for(&server)).unwrap();
    let listing = client.children(TaxonId(105820)).await.unwrap();

    assert!(listing.is_empty());
}

#[tokio::test]
async fn test_server_error_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/AphiaChildrenByAphiaID/42"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let client = WormsClient::new(&config_for(&server)).unwrap();
    let err = client.children(TaxonId(42)).await.unwrap_err();

    assert!(matches!(err, SourceError::Status { status: 503, .. }));
}

#[tokio::test]
async fn test_undecodable_body_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/AphiaChildrenByAphiaID/42"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
        .mount(&server)
        .await;

    let client = WormsClient::new(&config_for(&server)).unwrap();
    let err = client.children(TaxonId(42)).await.unwrap_err();

    assert!(matches!(err, SourceError::Decode { .. }));
}

#[tokio::test]
async fn test_unreachable_registry_is_a_transport_error() {
    // Nothing listens on port 1
    let config = CrawlConfig::new()
        .with_base_url("http://127.0.0.1:1/rest")
        .with_request_interval_ms(0);

    let client = WormsClient::new(&config).unwrap();
    let err = client.children(TaxonId(1)).await.unwrap_err();

    assert!(matches!(err, SourceError::Transport { .. }));
}

#[tokio::test]
async fn test_malformed_records_are_skipped() {
    let server = MockServer::start().await;
    mount_children(
        &server,
        7,
        json!([
            record(8, "Squalus acanthias", "Species", "accepted"),
            {"AphiaID": null, "scientificname": "Ghost", "rank": "Species"},
            {"AphiaID": 9, "scientificname": null, "rank": "Species"},
            {"AphiaID": 10, "scientificname": "Odd", "authority": 1838, "rank": "Species"},
            {"AphiaID": "105820", "scientificname": "Quoted id", "rank": "Species"},
            "not a record",
            record(11, "Squalus blainville", "Species", "accepted"),
        ]),
    )
    .await;

    let client = WormsClient::new(&config_for(&server)).unwrap();
    let listing = client.children(TaxonId(7)).await.unwrap();

    let names: Vec<_> = listing.nodes.iter().map(|n| n.name.as_str()).collect();
    assert_eq!(names, vec!["Squalus acanthias", "Squalus blainville"]);
    assert_eq!(listing.skipped, 5);
    assert!(!listing.truncated);
}

fn full_page(start: u64) -> Value {
    let records: Vec<Value> = (0..PAGE_SIZE as u64)
        .map(|i| record(start + i, &format!("Taxon {}", start + i), "Genus", "accepted"))
        .collect();
    Value::Array(records)
}

#[tokio::test]
async fn test_full_pages_are_followed() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/AphiaChildrenByAphiaID/5"))
        .and(query_param("offset", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(full_page(1000)))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/AphiaChildrenByAphiaID/5"))
        .and(query_param("offset", "51"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            record(2000, "Last one", "Genus", "accepted")
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let client = WormsClient::new(&config_for(&server)).unwrap();
    let listing = client.children(TaxonId(5)).await.unwrap();

    assert_eq!(listing.nodes.len(), PAGE_SIZE + 1);
    assert_eq!(listing.nodes[0].id, TaxonId(1000));
    assert_eq!(listing.nodes[PAGE_SIZE].name, "Last one");
}

#[tokio::test]
async fn test_exactly_full_last_page_ends_on_no_content() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/AphiaChildrenByAphiaID/5"))
        .and(query_param("offset", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(full_page(1000)))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/AphiaChildrenByAphiaID/5"))
        .and(query_param("offset", "51"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let client = WormsClient::new(&config_for(&server)).unwrap();
    let listing = client.children(TaxonId(5)).await.unwrap();

    assert_eq!(listing.nodes.len(), PAGE_SIZE);
}

#[tokio::test]
async fn test_endless_paging_is_cut_and_flagged() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/AphiaChildrenByAphiaID/5"))
        .respond_with(ResponseTemplate::new(200).set_body_json(full_page(1000)))
        .expect(MAX_PAGES as u64)
        .mount(&server)
        .await;

    let client = WormsClient::new(&config_for(&server)).unwrap();
    let listing = client.children(TaxonId(5)).await.unwrap();

    assert!(listing.truncated);
    assert_eq!(listing.nodes.len(), PAGE_SIZE * MAX_PAGES);
}

#[tokio::test]
async fn test_pagination_can_be_disabled() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/AphiaChildrenByAphiaID/5"))
        .respond_with(ResponseTemplate::new(200).set_body_json(full_page(1000)))
        .expect(1)
        .mount(&server)
        .await;

    let config = config_for(&server).with_paginate(false).with_marine_only(false);
    let client = WormsClient::new(&config).unwrap();
    let listing = client.children(TaxonId(5)).await.unwrap();

    assert_eq!(listing.nodes.len(), PAGE_SIZE);
}

#[tokio::test]
async fn test_crawl_against_registry_writes_expected_file() {
    let server = MockServer::start().await;

    mount_children(
        &server,
        1517375,
        json!([record(10193, "Elasmobranchii", "Subclass", "accepted")]),
    )
    .await;
    mount_children(
        &server,
        10193,
        json!([
            record(105688, "Lamnidae", "Family", "accepted"),
            record(105689, "Carcharhinidae", "Family", "accepted"),
        ]),
    )
    .await;
    mount_children(
        &server,
        105688,
        json!([record(105730, "Carcharodon", "Genus", "accepted")]),
    )
    .await;
    mount_children(
        &server,
        105730,
        json!([
            record(105838, "Carcharodon carcharias", "Species", "accepted"),
            record(999001, "Carcharias lamia", "Species", "unaccepted"),
        ]),
    )
    .await;
    mount_no_children(&server, 105689).await;

    let dir = TempDir::new().unwrap();
    let out = dir.path().join("chondrichthyens_complet.json");
    let config = config_for(&server).with_output_path(out.clone());

    let crawler = Crawler::new(WormsClient::new(&config).unwrap(), &config);
    let report = crawler.crawl().await;
    assert!(report.completed);
    assert_eq!(report.stats.fetch_failures, 0);
    assert_eq!(report.stats.species_not_accepted, 1);

    output::write_tree(&report.tree, &config.output_path).unwrap();
    let written: Value = serde_json::from_str(&std::fs::read_to_string(&out).unwrap()).unwrap();

    assert_eq!(
        written,
        json!({
            "Lamnidae": {
                "Carcharodon": [{
                    "nom_scientifique": "Carcharodon carcharias",
                    "auteur": "Müller & Henle, 1838",
                    "statut": "accepté",
                    "lien": "https://www.marinespecies.org/aphia.php?p=taxdetails&id=105838"
                }]
            },
            "Carcharhinidae": {}
        })
    );
}

#[tokio::test]
async fn test_crawl_survives_failing_subtree() {
    let server = MockServer::start().await;

    mount_children(
        &server,
        1,
        json!([
            record(2, "Broken", "Family", "accepted"),
            record(3, "Working", "Family", "accepted"),
        ]),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/AphiaChildrenByAphiaID/2"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    mount_children(&server, 3, json!([record(4, "Genus", "Genus", "accepted")])).await;
    mount_no_children(&server, 4).await;

    let config = config_for(&server).with_root_id(1);
    let report = Crawler::new(WormsClient::new(&config).unwrap(), &config)
        .crawl()
        .await;

    assert!(report.completed);
    assert_eq!(report.stats.fetch_failures, 1);
    assert_eq!(
        serde_json::to_value(&report.tree).unwrap(),
        json!({"Broken": {}, "Working": {"Genus": []}})
    );
}
