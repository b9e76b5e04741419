//! Tests for the HTTP client module

use super::*;
use crate::auth::AuthConfig;
use crate::error::Error;
use crate::types::BackoffType;
use reqwest::Method;
use std::time::Duration;
use wiremock::matchers::{body_bytes, body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn fast_retries(max_retries: u32) -> RetryPolicy {
    RetryPolicy {
        max_retries,
        backoff: BackoffType::Constant,
        initial_delay: Duration::from_millis(10),
        max_delay: Duration::from_secs(1),
    }
}

fn client_for(server: &MockServer) -> HttpClient {
    let config = HttpClientConfig::builder()
        .base_url(server.uri())
        .retry(fast_retries(3))
        .no_rate_limit()
        .build();
    HttpClient::with_config(config).unwrap()
}

#[test]
fn test_http_client_config_default() {
    let config = HttpClientConfig::default();
    assert_eq!(config.timeout, Duration::from_secs(60));
    assert_eq!(config.retry, RetryPolicy::default());
    assert!(config.base_url.is_none());
    assert!(config.rate_limit.is_some());
    assert!(config.user_agent.starts_with("systemlink-clients/"));
}

#[test]
fn test_http_client_config_builder() {
    let config = HttpClientConfig::builder()
        .base_url("https://sle.example.com")
        .timeout(Duration::from_secs(10))
        .retry(RetryPolicy {
            backoff: BackoffType::Linear,
            ..RetryPolicy::default()
        })
        .max_retries(5)
        .header("X-Custom", "value")
        .user_agent("test-agent/1.0")
        .build();

    assert_eq!(config.base_url, Some("https://sle.example.com".to_string()));
    assert_eq!(config.timeout, Duration::from_secs(10));
    assert_eq!(config.retry.max_retries, 5);
    assert_eq!(config.retry.backoff, BackoffType::Linear);
    assert_eq!(
        config.default_headers.get("X-Custom"),
        Some(&"value".to_string())
    );
    assert_eq!(config.user_agent, "test-agent/1.0");
}

#[test]
fn test_request_config_builder() {
    let config = RequestConfig::new()
        .query("columns", "a")
        .query("columns", "b")
        .query_opt("take", Some(10))
        .query_opt("continuationToken", None::<String>)
        .header("X-Request-Id", "abc123")
        .json(serde_json::json!({"key": "value"}))
        .retries(2);

    assert_eq!(
        config.query,
        vec![
            ("columns".to_string(), "a".to_string()),
            ("columns".to_string(), "b".to_string()),
            ("take".to_string(), "10".to_string()),
        ]
    );
    assert!(matches!(config.body, Some(RequestBody::Json(_))));
    assert_eq!(config.max_retries, Some(2));
}

#[tokio::test]
async fn test_get_json() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/nidataframe"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "operations": {}
        })))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let data: serde_json::Value = client.get_json("/nidataframe").await.unwrap();
    assert!(data["operations"].is_object());
}

#[tokio::test]
async fn test_post_json_body() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/nidataframe/v1/tables"))
        .and(body_json(serde_json::json!({"name": "t"})))
        .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({"id": "abc"})))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let created: serde_json::Value = client
        .post_json("/nidataframe/v1/tables", &serde_json::json!({"name": "t"}))
        .await
        .unwrap();
    assert_eq!(created["id"], "abc");
}

#[tokio::test]
async fn test_raw_body_and_content_type() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/upload"))
        .and(header("content-type", "application/vnd.apache.arrow.stream"))
        .and(body_bytes(vec![1u8, 2, 3]))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    client
        .request_empty(
            Method::POST,
            "/upload",
            RequestConfig::new().raw(vec![1u8, 2, 3], "application/vnd.apache.arrow.stream"),
        )
        .await
        .unwrap();
}

#[tokio::test]
async fn test_query_params() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/nidataframe/v1/tables"))
        .and(query_param("take", "2"))
        .and(query_param("continuationToken", "next"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let response = client
        .request(
            Method::GET,
            "/nidataframe/v1/tables",
            RequestConfig::new()
                .query("take", "2")
                .query("continuationToken", "next"),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
}

#[tokio::test]
async fn test_api_key_is_sent() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/secure"))
        .and(header("x-ntc-api-key", "secret123"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let config = HttpClientConfig::builder()
        .base_url(server.uri())
        .no_rate_limit()
        .build();
    let client = HttpClient::with_auth(config, AuthConfig::api_key("secret123")).unwrap();
    client
        .request_empty(Method::GET, "/secure", RequestConfig::new())
        .await
        .unwrap();
}

#[tokio::test]
async fn test_400_is_not_retried_and_keeps_body() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/bad"))
        .respond_with(ResponseTemplate::new(400).set_body_string(
            r#"{"error":{"name":"Skyline.InvalidArgument","message":"bad frame"}}"#,
        ))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let err = client
        .request(
            Method::POST,
            "/bad",
            RequestConfig::new().json(serde_json::json!({})),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, Error::HttpStatus { status: 400, .. }));
    assert_eq!(
        err.api_error().unwrap().message.as_deref(),
        Some("bad frame")
    );
}

#[tokio::test]
async fn test_retry_on_503() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let response = client
        .request(Method::GET, "/flaky", RequestConfig::new())
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
}

#[tokio::test]
async fn test_rate_limit_retry() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/limited"))
        .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "1"))
        .up_to_n_times(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/limited"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let response = client
        .request(Method::GET, "/limited", RequestConfig::new())
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
}

#[tokio::test]
async fn test_rate_limited_until_retries_run_out() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/limited"))
        .respond_with(ResponseTemplate::new(429))
        .expect(2)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let err = client
        .request(Method::GET, "/limited", RequestConfig::new().retries(1))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::RateLimited { .. }));
}

#[tokio::test]
async fn test_max_retries_exceeded() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/always-fail"))
        .respond_with(ResponseTemplate::new(500).set_body_string("Server error"))
        .expect(3)
        .mount(&server)
        .await;

    let config = HttpClientConfig::builder()
        .base_url(server.uri())
        .retry(fast_retries(2))
        .no_rate_limit()
        .build();
    let client = HttpClient::with_config(config).unwrap();

    let err = client
        .request(Method::GET, "/always-fail", RequestConfig::new())
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(500));
    assert!(err.to_string().contains("Server error"));
}

#[tokio::test]
async fn test_request_json_decode_failure() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/html"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html></html>"))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let err = client
        .get_json::<serde_json::Value>("/html")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Decode { .. }));
}

#[test]
fn test_retry_policy_delay() {
    let policy = |backoff| RetryPolicy {
        max_retries: 3,
        backoff,
        initial_delay: Duration::from_millis(100),
        max_delay: Duration::from_millis(500),
    };

    let constant = policy(BackoffType::Constant);
    assert_eq!(constant.delay(0), Duration::from_millis(100));
    assert_eq!(constant.delay(5), Duration::from_millis(100));

    let linear = policy(BackoffType::Linear);
    assert_eq!(linear.delay(1), Duration::from_millis(200));
    assert_eq!(linear.delay(2), Duration::from_millis(300));

    let exponential = policy(BackoffType::Exponential);
    assert_eq!(exponential.delay(1), Duration::from_millis(200));
    assert_eq!(exponential.delay(2), Duration::from_millis(400));
    assert_eq!(exponential.delay(10), Duration::from_millis(500));
    assert_eq!(exponential.delay(u32::MAX), Duration::from_millis(500));
}

#[tokio::test]
async fn test_http_client_with_rate_limiter() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/data"))
        .respond_with(ResponseTemplate::new(200))
        .expect(3)
        .mount(&server)
        .await;

    let config = HttpClientConfig::builder()
        .base_url(server.uri())
        .rate_limit(RateLimiterConfig::per_second(100).with_burst(10))
        .build();
    let client = HttpClient::with_config(config).unwrap();
    assert!(client.has_rate_limiter());

    for _ in 0..3 {
        client
            .request_empty(Method::GET, "/data", RequestConfig::new())
            .await
            .unwrap();
    }
}

#[test]
fn test_http_client_debug() {
    let client = HttpClient::with_config(HttpClientConfig::default()).unwrap();
    let debug_str = format!("{client:?}");
    assert!(debug_str.contains("HttpClient"));
    assert!(debug_str.contains("has_authenticator: false"));
}
