//! Integration tests for `OpenAiSegregator` against a mocked chat-completions API.

use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use cpdb_scraper::{FieldSegregator, OpenAiSegregator, SegregationError};

fn segregator(server: &MockServer) -> OpenAiSegregator {
    OpenAiSegregator::new(
        reqwest::Client::new(),
        "sk-test".to_string(),
        "gpt-4o-mini".to_string(),
        format!("{}/", server.uri()),
    )
}

fn completion(content: &str) -> serde_json::Value {
    json!({
        "id": "chatcmpl-1",
        "choices": [{
            "index": 0,
            "message": { "role": "assistant", "content": content },
            "finish_reason": "stop"
        }]
    })
}

#[tokio::test]
async fn segregate_parses_json_content() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", "Bearer sk-test"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion(
            r#"{"description":"10% off","terms":"Min $50","code":"save10","expiry":"2026-03-31"}"#,
        )))
        .expect(1)
        .mount(&server)
        .await;

    let fields = segregator(&server)
        .segregate("10% off with SAVE10. Min $50. Ends 2026-03-31")
        .await
        .unwrap();
    assert_eq!(fields.description.as_deref(), Some("10% off"));
    assert_eq!(fields.terms.as_deref(), Some("Min $50"));
    assert_eq!(fields.code.as_deref(), Some("save10"));
    assert_eq!(fields.expiry.as_deref(), Some("2026-03-31"));
}

#[tokio::test]
async fn segregate_reports_http_status() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let result = segregator(&server).segregate("text").await;
    assert!(matches!(result, Err(SegregationError::Status { status: 401 })), "got {result:?}");
}

#[tokio::test]
async fn segregate_rejects_missing_content() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "choices": [] })))
        .mount(&server)
        .await;

    let result = segregator(&server).segregate("text").await;
    assert!(matches!(result, Err(SegregationError::Malformed(_))), "got {result:?}");
}

#[tokio::test]
async fn segregate_gives_up_on_a_stalled_endpoint() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(completion(r#"{"description":"late"}"#))
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&server)
        .await;

    let client = OpenAiSegregator::client_with_timeout(Duration::from_millis(200)).unwrap();
    let segregator = OpenAiSegregator::new(
        client,
        "sk-test".to_string(),
        "gpt-4o-mini".to_string(),
        server.uri(),
    );

    let started = std::time::Instant::now();
    let result = segregator.segregate("text").await;
    assert!(
        matches!(&result, Err(SegregationError::Http(e)) if e.is_timeout()),
        "got {result:?}"
    );
    assert!(started.elapsed() < Duration::from_secs(4));
}
