//! End-to-end retry behavior of the channel adapter against a mock SRS.

use std::time::Duration;

use ingest_adapters::{ChannelAdapter, RetryPolicy};
use ingest_adapters::channel::ChannelConfig;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn adapter(server: &MockServer, attempts: u32) -> ChannelAdapter {
    ChannelAdapter::new(
        reqwest::Client::new(),
        ChannelConfig {
            base_url: server.uri().parse().unwrap(),
            token: "secret".into(),
            health_path: "/healthz".into(),
            timeout: Duration::from_secs(5),
            retry: RetryPolicy::new(attempts, Duration::from_millis(5)),
        },
    )
}

#[tokio::test]
async fn retries_429_until_success() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/channels"))
        .respond_with(ResponseTemplate::new(429))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/channels"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({"primaryIngest": "rtmp://p"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let adapter = adapter(&server, 3);
    let created = adapter
        .create("c1", "key", &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(created.primary_ingest, "rtmp://p");
}

#[tokio::test]
async fn does_not_retry_on_400() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/channels"))
        .respond_with(ResponseTemplate::new(400).set_body_string("bad request"))
        .expect(1)
        .mount(&server)
        .await;

    let adapter = adapter(&server, 3);
    let result = adapter.create("c1", "key", &CancellationToken::new()).await;
    assert!(matches!(result, Err(ingest_adapters::AdapterError::Permanent(_))));
}

#[tokio::test]
async fn surfaces_transient_error_after_exhausting_attempts() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/channels"))
        .respond_with(ResponseTemplate::new(500))
        .expect(2)
        .mount(&server)
        .await;

    let adapter = adapter(&server, 2);
    let result = adapter.create("c1", "key", &CancellationToken::new()).await;
    assert!(matches!(result, Err(ingest_adapters::AdapterError::Transient(_))));
}

#[tokio::test]
async fn health_reports_unknown_without_a_base_url() {
    let client = reqwest::Client::new();
    let status = ingest_adapters::health::probe(
        &client,
        "srs",
        None,
        "/healthz",
        None,
        Duration::from_secs(1),
    )
    .await;
    assert_eq!(status.status, ingest_adapters::HealthState::Unknown);
}
