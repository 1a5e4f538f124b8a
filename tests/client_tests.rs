//! Integration tests for request dispatch against a WireMock server.
//!
//! These exercise the full cycle: URL and parameter encoding, header
//! assembly, transport, and response classification.

use classclap_network::{HttpStatus, NetworkClient, NetworkError, Parameters};
use serde_json::{json, Value};
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client() -> NetworkClient {
    NetworkClient::with_defaults().expect("failed to build client")
}

#[tokio::test]
async fn get_success_resolves_with_response_bytes() {
    let server = MockServer::start().await;
    let body = json!([
        {"id": 1, "body": "first comment"},
        {"id": 2, "body": "second comment"}
    ]);
    Mock::given(method("GET"))
        .and(path("/posts/1/comments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&body))
        .mount(&server)
        .await;

    let url = format!("{}/posts/1/comments", server.uri());
    let bytes = client().get(&url).send().await.unwrap();
    let decoded: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(decoded, body);
}

#[tokio::test]
async fn get_decodes_into_typed_value() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/posts/1/comments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"id": 1}, {"id": 2}])))
        .mount(&server)
        .await;

    let url = format!("{}/posts/1/comments", server.uri());
    let comments: Vec<Value> = client().get(&url).object().await.unwrap();
    assert_eq!(comments.len(), 2);
}

#[tokio::test]
async fn post_sends_json_body_and_bearer_token() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/posts"))
        .and(header("Authorization", "Bearer test-token"))
        .and(header("Content-Type", "application/json"))
        .and(body_json(json!({"title": "a"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 101})))
        .expect(1)
        .mount(&server)
        .await;

    let mut params = Parameters::new();
    params.insert("title".into(), Some(json!("a")));

    let url = format!("{}/posts", server.uri());
    client()
        .post(&url)
        .bearer_token("test-token")
        .parameters(params)
        .send()
        .await
        .unwrap();
}

#[tokio::test]
async fn unauthenticated_request_carries_no_authorization_header() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/public"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let url = format!("{}/public", server.uri());
    client().get(&url).send().await.unwrap();

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    assert!(!requests[0].headers.contains_key("authorization"));
    assert_eq!(
        requests[0]
            .headers
            .get("cache-control")
            .and_then(|v| v.to_str().ok()),
        Some("no-cache")
    );
}

#[tokio::test]
async fn get_parameters_are_percent_encoded_on_the_wire() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("q", "a+b c"))
        .and(query_param("empty", ""))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let mut params = Parameters::new();
    params.insert("q".into(), Some(json!("a+b c")));
    params.insert("empty".into(), None);

    let url = format!("{}/search", server.uri());
    client().get(&url).parameters(params).send().await.unwrap();

    // Space must travel as %20 and the literal plus as %2B.
    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests[0].url.query(), Some("empty=&q=a%2Bb%20c"));
}

#[tokio::test]
async fn server_error_carries_raw_body_and_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/broken"))
        .respond_with(ResponseTemplate::new(500).set_body_string("database on fire"))
        .mount(&server)
        .await;

    let url = format!("{}/broken", server.uri());
    let error = client().get(&url).send().await.unwrap_err();
    match error {
        NetworkError::HttpServerSide { body, status } => {
            assert_eq!(&body[..], b"database on fire");
            assert_eq!(status, HttpStatus::InternalServerError);
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn no_content_success_is_not_a_success() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/posts/1"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    let url = format!("{}/posts/1", server.uri());
    let error = client().delete(&url).send().await.unwrap_err();
    assert_eq!(error.status(), Some(HttpStatus::Unknown));
}

#[tokio::test]
async fn not_found_maps_to_its_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"error": "not found"})))
        .mount(&server)
        .await;

    let url = format!("{}/missing", server.uri());
    let error = client().get(&url).send().await.unwrap_err();
    assert_eq!(error.status(), Some(HttpStatus::NotFound));
}

#[tokio::test]
async fn malformed_url_fails_without_touching_the_server() {
    let server = MockServer::start().await;

    let error = client().get("not a url").send().await.unwrap_err();
    assert!(matches!(error, NetworkError::BadUrl { .. }));

    let requests = server.received_requests().await.unwrap();
    assert!(requests.is_empty());
}

#[tokio::test]
async fn decode_failure_is_a_json_format_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/posts"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>not json</html>"))
        .mount(&server)
        .await;

    let url = format!("{}/posts", server.uri());
    let result: Result<Vec<Value>, _> = client().get(&url).object().await;
    assert!(matches!(result, Err(NetworkError::JsonFormat { .. })));
}
