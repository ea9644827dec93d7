//! End-to-end confirmation, through the full boot orchestration rather than
//! a single adapter call, that a 429 is retried until it succeeds while a
//! 400 fails the boot (and triggers rollback) on the first attempt.

use std::time::Duration;

use ingest_adapters::application::ApplicationConfig;
use ingest_adapters::channel::ChannelConfig;
use ingest_adapters::transcoder::TranscoderConfig;
use ingest_adapters::{AdapterError, Rendition, RetryPolicy};
use ingest_controller::config::ControllerConfig;
use ingest_controller::{Controller, ControllerError};
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config(srs: &MockServer, ome: &MockServer, transcoder: &MockServer, http_retry: RetryPolicy) -> ControllerConfig {
    ControllerConfig {
        channel: Some(ChannelConfig {
            base_url: srs.uri().parse().unwrap(),
            token: "srs-token".into(),
            health_path: "/healthz".into(),
            timeout: Duration::from_secs(5),
            retry: http_retry,
        }),
        application: Some(ApplicationConfig {
            base_url: ome.uri().parse().unwrap(),
            username: "admin".into(),
            password: "pw".into(),
            health_path: "/healthz".into(),
            timeout: Duration::from_secs(5),
            retry: http_retry,
        }),
        transcoder: Some(TranscoderConfig {
            base_url: transcoder.uri().parse().unwrap(),
            token: "tc-token".into(),
            health_path: "/healthz".into(),
            timeout: Duration::from_secs(5),
            retry: http_retry,
        }),
        ladder: vec![Rendition { name: "720p".into(), manifest_url: None, bitrate: None }],
        boot_retry: RetryPolicy::new(1, Duration::ZERO),
    }
}

#[tokio::test]
async fn boot_succeeds_after_the_channel_adapter_retries_past_a_429() {
    let srs = MockServer::start().await;
    let ome = MockServer::start().await;
    let transcoder = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/channels"))
        .respond_with(ResponseTemplate::new(429))
        .up_to_n_times(2)
        .expect(2)
        .mount(&srs)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/channels"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"primaryIngest": "rtmp://origin/c1"})))
        .expect(1)
        .mount(&srs)
        .await;

    Mock::given(method("POST"))
        .and(path("/v1/applications"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({"originUrl": "rtmp://origin/c1", "playbackUrl": "https://cdn/c1"})),
        )
        .mount(&ome)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/jobs"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"jobIds": ["job-1"]})))
        .mount(&transcoder)
        .await;

    let controller = Controller::new(
        reqwest::Client::new(),
        config(&srs, &ome, &transcoder, RetryPolicy::new(3, Duration::from_millis(5))),
    );
    let session = controller
        .boot_stream("c1", "session-1", "stream-key", &CancellationToken::new())
        .await
        .expect("boot should succeed once the 429s are exhausted");
    assert_eq!(session.primary_ingest, "rtmp://origin/c1");
    assert_eq!(session.job_ids, vec!["job-1".to_owned()]);
}

#[tokio::test]
async fn boot_fails_immediately_on_a_400_without_retrying() {
    let srs = MockServer::start().await;
    let ome = MockServer::start().await;
    let transcoder = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/channels"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"primaryIngest": "rtmp://origin/c1"})))
        .expect(1)
        .mount(&srs)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/v1/channels/c1"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&srs)
        .await;

    Mock::given(method("POST"))
        .and(path("/v1/applications"))
        .respond_with(ResponseTemplate::new(400).set_body_string("invalid rendition ladder"))
        .expect(1)
        .mount(&ome)
        .await;

    let controller = Controller::new(
        reqwest::Client::new(),
        config(&srs, &ome, &transcoder, RetryPolicy::new(3, Duration::from_millis(5))),
    );
    let result = controller
        .boot_stream("c1", "session-1", "stream-key", &CancellationToken::new())
        .await;

    match result {
        Err(ControllerError::Adapter(AdapterError::Permanent(_))) => {}
        other => panic!("expected an immediate permanent failure, got {other:?}"),
    }
    // `expect(1)` on the application mock (not 3) proves no retry happened;
    // the channel rollback delete confirms the partial boot was unwound.
}
