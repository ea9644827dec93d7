//! A transcoder failure during boot triggers exactly one compensating
//! delete of the application and one of the channel, in that order, and
//! the boot call itself surfaces the transcoder's error.

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

fn no_retry() -> RetryPolicy {
    RetryPolicy::new(1, Duration::from_millis(1))
}

fn config(srs: &MockServer, ome: &MockServer, transcoder: &MockServer) -> ControllerConfig {
    ControllerConfig {
        channel: Some(ChannelConfig {
            base_url: srs.uri().parse().unwrap(),
            token: "srs-token".into(),
            health_path: "/healthz".into(),
            timeout: Duration::from_secs(5),
            retry: no_retry(),
        }),
        application: Some(ApplicationConfig {
            base_url: ome.uri().parse().unwrap(),
            username: "admin".into(),
            password: "pw".into(),
            health_path: "/healthz".into(),
            timeout: Duration::from_secs(5),
            retry: no_retry(),
        }),
        transcoder: Some(TranscoderConfig {
            base_url: transcoder.uri().parse().unwrap(),
            token: "tc-token".into(),
            health_path: "/healthz".into(),
            timeout: Duration::from_secs(5),
            retry: no_retry(),
        }),
        ladder: vec![Rendition { name: "720p".into(), manifest_url: None, bitrate: Some(2_500_000) }],
        boot_retry: RetryPolicy::new(1, Duration::ZERO),
    }
}

#[tokio::test]
async fn boot_rolls_back_application_then_channel_on_transcoder_failure() {
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
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({"originUrl": "rtmp://origin/c1", "playbackUrl": "https://cdn/c1"})),
        )
        .expect(1)
        .mount(&ome)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/v1/applications/c1"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&ome)
        .await;

    Mock::given(method("POST"))
        .and(path("/v1/jobs"))
        .respond_with(ResponseTemplate::new(400).set_body_string("unsupported rendition"))
        .expect(1)
        .mount(&transcoder)
        .await;

    let controller = Controller::new(reqwest::Client::new(), config(&srs, &ome, &transcoder));
    let result = controller
        .boot_stream("c1", "session-1", "stream-key", &CancellationToken::new())
        .await;

    match result {
        Err(ControllerError::Adapter(AdapterError::Permanent(_))) => {}
        other => panic!("expected a permanent adapter error, got {other:?}"),
    }

    // `expect(1)` above on each delete/create mock is verified when the
    // MockServer drops at the end of the test; a second or missing call
    // would fail it.
}
