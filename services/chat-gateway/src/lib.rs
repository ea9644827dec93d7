//! The chat gateway: WebSocket fan-out, per-channel rooms, moderation, and
//! durable event publishing (spec §4.2–§4.4).
//!
//! Built around a hand-rolled raw-upgrade acceptor (`acceptor`) instead of
//! axum's `ws` feature, so the handshake and frame codec already built and
//! tested in `ws-wire` are what the server actually speaks.

pub mod acceptor;
pub mod auth;
pub mod commands;
pub mod config;
pub mod connection;
pub mod connections;
pub mod gateway;
pub mod health;
pub mod metrics;
pub mod roles;

use std::sync::Arc;

use axum::routing::get;
use axum::Router;

pub use acceptor::AppState;
pub use gateway::Gateway;

/// Assembles the full router: the chat upgrade endpoint plus the standard
/// `/healthz`/`/readyz` operational surface.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/ws/v1/chat", get(acceptor::upgrade))
        .route("/healthz", get(health::healthz))
        .route("/readyz", get(health::readyz))
        .with_state(state)
}
