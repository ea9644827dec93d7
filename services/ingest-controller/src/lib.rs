//! The ingest orchestration controller: atomic multi-service provisioning,
//! teardown, rollback, and health across the channel/application/transcoder
//! adapters (spec §4.5).
//!
//! Orchestration is request-scoped — unlike the chat gateway this service
//! spawns no long-lived tasks of its own (spec §5): each REST call runs one
//! `Controller` operation to completion and returns.

pub mod config;
pub mod controller;
pub mod health;
pub mod rollback;
pub mod routes;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;

pub use controller::{Controller, ControllerError};
pub use routes::AppState;

/// Assembles the full router: the boot/shutdown/upload/health operations
/// plus the standard `/healthz`/`/readyz` operational surface.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/v1/streams/boot", post(routes::boot_stream))
        .route("/v1/streams/shutdown", post(routes::shutdown_stream))
        .route("/v1/uploads", post(routes::transcode_upload))
        .route("/v1/health", get(routes::health_checks))
        .route("/healthz", get(health::healthz))
        .route("/readyz", get(health::readyz))
        .with_state(state)
}
