//! With no adapters configured, `GET /v1/health` still responds (never an
//! error) and reports every component as `unknown`, over a real bound
//! listener rather than calling the handler in-process.

use std::time::Duration;

use ingest_adapters::{HealthState, HealthStatus};
use ingest_controller::config::ControllerConfig;
use ingest_controller::Controller;
use std::sync::Arc;

fn empty_config() -> ControllerConfig {
    ControllerConfig {
        channel: None,
        application: None,
        transcoder: None,
        ladder: Vec::new(),
        boot_retry: ingest_adapters::RetryPolicy::new(1, Duration::ZERO),
    }
}

#[tokio::test]
async fn health_endpoint_reports_unknown_for_every_unconfigured_adapter() {
    let controller = Arc::new(Controller::new(reqwest::Client::new(), empty_config()));
    assert!(!controller.fully_configured());
    let state = Arc::new(ingest_controller::AppState { controller });
    let router = ingest_controller::build_router(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.expect("ingest controller test server error");
    });
    tokio::time::sleep(Duration::from_millis(20)).await;

    let response = reqwest::get(format!("http://{addr}/v1/health"))
        .await
        .expect("request to /v1/health failed");
    assert_eq!(response.status(), reqwest::StatusCode::OK);

    let statuses: Vec<HealthStatus> = response.json().await.unwrap();
    assert_eq!(statuses.len(), 3);
    for status in &statuses {
        assert_eq!(status.status, HealthState::Unknown, "{} was not unknown: {status:?}", status.component);
    }
}
