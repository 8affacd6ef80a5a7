//! Integration tests for `ListingClient` and `ListingPageAdapter::list_offers`.
//!
//! Each test stands up a local `wiremock` server; no real network traffic.

use futures::StreamExt;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use cpdb_core::{ListingSelectors, SourceConfig, SourceKind};
use cpdb_scraper::{ListingClient, ListingPageAdapter, ScraperError, SourceAdapter};

fn test_client() -> ListingClient {
    ListingClient::new(5, "cpdb-test/0.1", 0, 0).expect("failed to build test ListingClient")
}

fn page(offers: &[(&str, &str)]) -> String {
    let items: String = offers
        .iter()
        .map(|(title, code)| {
            format!(r#"<div class="coupon"><h2>{title}</h2><code>{code}</code></div>"#)
        })
        .collect();
    format!("<html><body>{items}</body></html>")
}

fn source(urls: Vec<String>) -> SourceConfig {
    SourceConfig {
        name: "deals-a".to_string(),
        kind: SourceKind::ListingPage,
        enabled: true,
        brand_name: Some("Acme".to_string()),
        listing_urls: urls,
        selectors: ListingSelectors {
            item: ".coupon".to_string(),
            title: Some("h2".to_string()),
            code: Some("code".to_string()),
            code_attribute: None,
            brand: None,
            link: None,
            link_attribute: "href".to_string(),
            description: None,
            terms: None,
            expiry: None,
        },
        detail: None,
    }
}

// ---------------------------------------------------------------------------
// ListingClient
// ---------------------------------------------------------------------------

#[tokio::test]
async fn fetch_html_returns_body_on_success() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/coupons"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>ok</html>"))
        .mount(&server)
        .await;

    let body = test_client()
        .fetch_html(&format!("{}/coupons", server.uri()))
        .await
        .unwrap();
    assert_eq!(body, "<html>ok</html>");
}

#[tokio::test]
async fn fetch_html_maps_404_to_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let result = test_client().fetch_html(&server.uri()).await;
    assert!(matches!(result, Err(ScraperError::NotFound { .. })), "got {result:?}");
}

#[tokio::test]
async fn fetch_html_maps_429_with_retry_after() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "7"))
        .mount(&server)
        .await;

    let result = test_client().fetch_html(&server.uri()).await;
    assert!(
        matches!(result, Err(ScraperError::RateLimited { retry_after_secs: 7, .. })),
        "got {result:?}"
    );
}

#[tokio::test]
async fn fetch_html_maps_other_statuses() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let result = test_client().fetch_html(&server.uri()).await;
    assert!(
        matches!(result, Err(ScraperError::UnexpectedStatus { status: 503, .. })),
        "got {result:?}"
    );
}

#[tokio::test]
async fn fetch_html_retries_rate_limits() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "0"))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("second time lucky"))
        .mount(&server)
        .await;

    let client = ListingClient::new(5, "cpdb-test/0.1", 2, 0).unwrap();
    assert_eq!(client.fetch_html(&server.uri()).await.unwrap(), "second time lucky");
}

// ---------------------------------------------------------------------------
// ListingPageAdapter::list_offers
// ---------------------------------------------------------------------------

#[tokio::test]
async fn list_offers_streams_every_page_in_order() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/p1"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(page(&[("Ten off", "SAVE10"), ("Twenty off", "SAVE20")])),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/p2"))
        .respond_with(ResponseTemplate::new(200).set_body_string(page(&[("Free ship", "SHIP")])))
        .mount(&server)
        .await;

    let adapter = ListingPageAdapter::new(
        source(vec![
            format!("{}/p1", server.uri()),
            format!("{}/p2", server.uri()),
        ]),
        test_client(),
    )
    .unwrap();

    let codes: Vec<String> = adapter
        .list_offers()
        .await
        .unwrap()
        .filter_map(|offer| async move { offer.ok()?.code })
        .collect()
        .await;
    assert_eq!(codes, vec!["SAVE10", "SAVE20", "SHIP"]);
}

#[tokio::test]
async fn list_offers_reports_a_failing_page_and_continues() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/broken"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/ok"))
        .respond_with(ResponseTemplate::new(200).set_body_string(page(&[("Ten off", "SAVE10")])))
        .mount(&server)
        .await;

    let adapter = ListingPageAdapter::new(
        source(vec![
            format!("{}/broken", server.uri()),
            format!("{}/ok", server.uri()),
        ]),
        test_client(),
    )
    .unwrap();

    let items: Vec<_> = adapter.list_offers().await.unwrap().collect().await;
    assert_eq!(items.len(), 2);
    assert!(
        matches!(items[0], Err(ScraperError::UnexpectedStatus { status: 500, .. })),
        "got {:?}",
        items[0]
    );
    assert_eq!(items[1].as_ref().unwrap().title.as_deref(), Some("Ten off"));
}

#[tokio::test]
async fn list_offers_yields_one_error_per_blocked_page() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let adapter = ListingPageAdapter::new(
        source(vec![
            format!("{}/p1", server.uri()),
            format!("{}/p2", server.uri()),
        ]),
        test_client(),
    )
    .unwrap();

    let items: Vec<_> = adapter.list_offers().await.unwrap().collect().await;
    assert_eq!(items.len(), 2);
    assert!(items
        .iter()
        .all(|item| matches!(item, Err(ScraperError::UnexpectedStatus { status: 503, .. }))));
}

#[tokio::test]
async fn list_offers_is_empty_when_page_has_no_items() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html><body>blocked</body></html>"))
        .mount(&server)
        .await;

    let adapter = ListingPageAdapter::new(source(vec![server.uri()]), test_client()).unwrap();
    let offers: Vec<_> = adapter.list_offers().await.unwrap().collect().await;
    assert!(offers.is_empty());
}
