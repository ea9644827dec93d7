//! The REST surface the out-of-scope CRUD layer calls to drive the
//! controller: boot/shutdown a stream, submit a VOD upload, and read
//! aggregate health. Grounded in the chat gateway's `AppState` + `Router`
//! shape (`chat_gateway::acceptor`/`lib.rs`), swapping the WebSocket
//! upgrade for plain JSON request/response handlers.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use ingest_adapters::{AdapterError, HealthStatus, IngestSession, Rendition};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::controller::{Controller, ControllerError};

pub struct AppState {
    pub controller: Arc<Controller>,
}

/// Maps a [`ControllerError`] onto the HTTP status a REST caller sees,
/// per spec §7: permanent upstream and validation-shaped failures are
/// 4xx, transient-after-exhaustion and aggregate teardown failures are
/// 5xx, an unconfigured controller is 503, and cancellation is 499 (the
/// nginx-originated convention for "client closed request").
impl IntoResponse for ControllerError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ControllerError::Disabled => (StatusCode::SERVICE_UNAVAILABLE, self.to_string()),
            ControllerError::Adapter(AdapterError::Permanent(_)) => {
                (StatusCode::BAD_GATEWAY, self.to_string())
            }
            ControllerError::Adapter(AdapterError::Transient(_)) => {
                (StatusCode::GATEWAY_TIMEOUT, self.to_string())
            }
            ControllerError::Adapter(AdapterError::Cancelled) => {
                (StatusCode::from_u16(499).unwrap(), self.to_string())
            }
            ControllerError::Aggregate(_) => (StatusCode::INTERNAL_SERVER_ERROR, self.to_string()),
        };
        (status, Json(ErrorBody { error: message })).into_response()
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BootRequest {
    pub channel_id: String,
    pub session_id: String,
    pub stream_key: String,
}

/// `POST /v1/streams/boot` — provisions a live pipeline across all three
/// adapters, rolling back on partial failure (spec §4.5 `BootStream`).
pub async fn boot_stream(
    State(state): State<Arc<AppState>>,
    Json(request): Json<BootRequest>,
) -> Result<Json<IngestSession>, ControllerError> {
    let cancel = CancellationToken::new();
    let session = state
        .controller
        .boot_stream(&request.channel_id, &request.session_id, &request.stream_key, &cancel)
        .await?;
    Ok(Json(session))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShutdownRequest {
    pub channel_id: String,
    pub job_ids: Vec<String>,
}

#[derive(Debug, Serialize)]
struct ShutdownResponse {
    ok: bool,
}

/// `POST /v1/streams/shutdown` — tears down a live pipeline in reverse
/// order, attempting every step even if an earlier one fails (spec §4.5
/// `ShutdownStream`).
pub async fn shutdown_stream(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ShutdownRequest>,
) -> Result<Json<ShutdownResponse>, ControllerError> {
    let cancel = CancellationToken::new();
    state
        .controller
        .shutdown_stream(&request.channel_id, &request.job_ids, &cancel)
        .await?;
    Ok(Json(ShutdownResponse { ok: true }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadRequest {
    pub channel_id: String,
    pub upload_id: String,
    pub source_url: String,
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub renditions: Option<Vec<Rendition>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct UploadResponse {
    job_id: String,
    playback_url: String,
    renditions: Vec<Rendition>,
}

/// `POST /v1/uploads` — submits a VOD transcode job; no compensating
/// cleanup, since a single-step upload leaves no multi-service state to
/// unwind (spec §4.5 `TranscodeUpload`).
pub async fn transcode_upload(
    State(state): State<Arc<AppState>>,
    Json(request): Json<UploadRequest>,
) -> Result<Json<UploadResponse>, ControllerError> {
    let cancel = CancellationToken::new();
    let submitted = state
        .controller
        .transcode_upload(
            &request.channel_id,
            &request.upload_id,
            &request.source_url,
            request.filename.as_deref(),
            request.renditions.as_deref(),
            &cancel,
        )
        .await?;
    Ok(Json(UploadResponse {
        job_id: submitted.job_id,
        playback_url: submitted.playback_url,
        renditions: submitted.renditions,
    }))
}

/// `GET /v1/health` — per-adapter health (spec §4.5 `HealthChecks`); never
/// fails, since an unconfigured adapter reports `unknown` rather than
/// erroring.
pub async fn health_checks(State(state): State<Arc<AppState>>) -> Json<Vec<HealthStatus>> {
    Json(state.controller.health_checks().await)
}
