//! Integration tests for the crawl engine and lookup pool over HTTP
//!
//! These tests use wiremock to stand in for the product search API and drive
//! the real HTTP provider end to end.

use catalog_sweep::config::{ApiConfig, CrawlConfig, LookupConfig};
use catalog_sweep::crawler::NodeState;
use catalog_sweep::provider::{HttpSearchProvider, StaticCredentials};
use catalog_sweep::{crawl, CrawlOptions, LookupPool, MatchKind, SearchProvider, SearchRequest};
use catalog_sweep::{SweepError, TransportError};
use serde_json::{json, Value};
use std::sync::Arc;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Builds a provider pointed at the mock server, with fast retries
fn provider_for(server: &MockServer, credentials: StaticCredentials) -> HttpSearchProvider {
    let mut api = ApiConfig::new(server.uri());
    api.retry_delay_ms = 10;
    api.max_retries = 2;
    HttpSearchProvider::new(&api, Arc::new(credentials)).unwrap()
}

/// A search response body with `count` products keyed `{prefix}-{n}`
fn products_body(prefix: &str, count: usize, total: u64) -> Value {
    let data: Vec<Value> = (0..count)
        .map(|n| {
            json!({
                "productId": format!("{}-{}", prefix, n),
                "description": format!("Product {} {}", prefix, n),
                "items": [{"itemId": format!("{}-{}-1", prefix, n)}]
            })
        })
        .collect();
    json!({ "data": data, "meta": { "pagination": { "total": total } } })
}

async fn mount_page(server: &MockServer, term: &str, start: u32, body: Value) {
    Mock::given(method("GET"))
        .and(path("/v1/products"))
        .and(query_param("filter.term", term))
        .and(query_param("filter.start", start.to_string()))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

/// Every request not matched by an earlier mock gets an empty page
async fn mount_empty_fallback(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/v1/products"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": [] })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_search_sends_filters_and_parses_page() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/products"))
        .and(query_param("filter.term", "milk"))
        .and(query_param("filter.locationId", "01400943"))
        .and(query_param("filter.limit", "50"))
        .and(query_param("filter.start", "51"))
        .respond_with(ResponseTemplate::new(200).set_body_json(products_body("m", 3, 53)))
        .expect(1)
        .mount(&mock_server)
        .await;

    let provider = provider_for(&mock_server, StaticCredentials::none());
    let page = provider
        .search(&SearchRequest::new("milk", "01400943", 50, 51))
        .await
        .unwrap();

    assert_eq!(page.len(), 3);
    assert_eq!(page.reported_total, Some(53));
    assert_eq!(page.entities[0].primary_id().as_deref(), Some("m-0"));
}

#[tokio::test]
async fn test_bearer_token_is_sent() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(header("authorization", "Bearer secret-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(products_body("p", 1, 1)))
        .expect(1)
        .mount(&mock_server)
        .await;

    let provider = provider_for(&mock_server, StaticCredentials::new("secret-token"));
    let page = provider
        .search(&SearchRequest::new("eggs", "loc", 10, 1))
        .await
        .unwrap();

    assert_eq!(page.len(), 1);
}

#[tokio::test]
async fn test_retries_transient_failures() {
    let mock_server = MockServer::start().await;

    // First attempt hits a 503, the retry succeeds
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503).set_body_string("busy"))
        .up_to_n_times(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(products_body("p", 2, 2)))
        .mount(&mock_server)
        .await;

    let provider = provider_for(&mock_server, StaticCredentials::none());
    let page = provider
        .search(&SearchRequest::new("bread", "loc", 10, 1))
        .await
        .unwrap();

    assert_eq!(page.len(), 2);
    let requests = mock_server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 2);
}

#[tokio::test]
async fn test_client_errors_are_not_retried() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(400).set_body_string("bad filter"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let provider = provider_for(&mock_server, StaticCredentials::none());
    let err = provider
        .search(&SearchRequest::new("bread", "loc", 10, 1))
        .await
        .unwrap_err();

    assert_eq!(
        err,
        TransportError::Status {
            status: 400,
            body: "bad filter".to_string()
        }
    );
}

#[tokio::test]
async fn test_end_to_end_crawl() {
    let mock_server = MockServer::start().await;

    mount_page(&mock_server, "a", 1, products_body("a", 10, 13)).await;
    mount_page(&mock_server, "a", 11, products_body("a-p2", 3, 13)).await;
    mount_page(&mock_server, "b", 1, products_body("b", 2, 2)).await;
    // "a0" overlaps with "a"
    mount_page(&mock_server, "a0", 1, products_body("a", 4, 4)).await;
    mount_empty_fallback(&mock_server).await;

    let provider = provider_for(&mock_server, StaticCredentials::none());
    let config = CrawlConfig::new(vec!["a".into(), "b".into()], "loc-1", 10, 8, 2)
        .with_min_term_length(1)
        .with_alphabet("0123456789abcdefghijklmnopqrstuvwxyz");

    let report = crawl(&provider, &config, CrawlOptions::default())
        .await
        .unwrap();

    assert_eq!(report.total_nodes, 38);
    assert_eq!(report.total_api_calls, 39);
    assert_eq!(report.total_unique_entities, 15);
    assert_eq!(report.total_items, 19);
    assert_eq!(report.depth_reached, 1);

    let a = report.node("a").unwrap();
    assert!(a.expanded);
    assert_eq!(a.reported_total, Some(13));
    assert_eq!(a.outcome, NodeState::Exhausted);
    assert!(!report.node("b").unwrap().expanded);
    assert_eq!(report.node("a0").unwrap().unique_entities_at_node, 4);

    let requests = mock_server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 39);
}

#[tokio::test]
async fn test_crawl_aborts_on_server_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(query_param("filter.term", "milk"))
        .respond_with(ResponseTemplate::new(500).set_body_string("internal"))
        .mount(&mock_server)
        .await;

    let provider = provider_for(&mock_server, StaticCredentials::none());
    let config = CrawlConfig::new(vec!["milk".into()], "loc-1", 10, 8, 1);

    let err = crawl(&provider, &config, CrawlOptions::default())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        SweepError::Transport { ref query, page: 1, .. } if query == "milk"
    ));
    // One attempt plus two retries
    let requests = mock_server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 3);
}

#[tokio::test]
async fn test_resolve_all_over_http() {
    let mock_server = MockServer::start().await;

    mount_page(
        &mock_server,
        "0001",
        1,
        json!({ "data": [{"productId": "0001", "description": "Milk"}] }),
    )
    .await;
    mount_page(
        &mock_server,
        "0002",
        1,
        json!({ "data": [{"productId": "9999", "description": "Not quite"}] }),
    )
    .await;
    Mock::given(method("GET"))
        .and(query_param("filter.term", "0004"))
        .respond_with(ResponseTemplate::new(404).set_body_string("gone"))
        .mount(&mock_server)
        .await;
    mount_empty_fallback(&mock_server).await;

    let provider = Arc::new(provider_for(&mock_server, StaticCredentials::none()));
    let pool = LookupPool::new(provider, LookupConfig::default());
    let ids: Vec<String> = ["0001", "0002", "0003", "0004"]
        .iter()
        .map(|s| s.to_string())
        .collect();

    let outcomes = pool.resolve_all(&ids, "loc-1", 2).await;

    assert_eq!(outcomes.len(), 4);
    assert_eq!(outcomes["0001"].match_kind, MatchKind::Exact);
    assert_eq!(outcomes["0002"].match_kind, MatchKind::Fuzzy);
    assert_eq!(outcomes["0003"].match_kind, MatchKind::Missing);
    assert_eq!(outcomes["0004"].match_kind, MatchKind::Error);

    let requests = mock_server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 4);
    assert!(requests
        .iter()
        .all(|r| r.url.query().unwrap_or_default().contains("filter.limit=5")));
}
