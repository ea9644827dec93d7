//! The WebSocket connection acceptor (spec §4.2): an axum handler that
//! performs the upgrade itself instead of delegating to axum's `ws`
//! extractor, so the already-built `ws-wire` handshake/frame codec is what
//! actually speaks the protocol.
//!
//! Grounded directly in axum's own `extract::ws::WebSocketUpgrade`
//! implementation: pull `hyper::upgrade::OnUpgrade` out of the request
//! extensions, respond `101 Switching Protocols` with the computed
//! `Sec-WebSocket-Accept`, then hand the upgraded connection to
//! [`crate::connection::run_connection`] via [`hyper_util::rt::TokioIo`].

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use axum::body::Body;
use axum::extract::{Request, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use hyper_util::rt::TokioIo;
use ws_wire::handshake::HandshakeRequest;

use crate::auth::{extract_bearer, TokenValidator};
use crate::connection::run_connection;
use crate::gateway::Gateway;

static NEXT_CLIENT_ID: AtomicU64 = AtomicU64::new(1);

pub struct AppState {
    pub gateway: Arc<Gateway>,
    pub tokens: Arc<dyn TokenValidator>,
}

/// `GET /ws/v1/chat` — the single upgrade endpoint named in spec §6.
pub async fn upgrade(State(state): State<Arc<AppState>>, headers: HeaderMap, request: Request) -> Response {
    let Some(user_id) = authenticate(&headers, &state).await else {
        return StatusCode::UNAUTHORIZED.into_response();
    };

    let handshake = HandshakeRequest {
        upgrade: header_str(&headers, header::UPGRADE),
        connection: header_str(&headers, header::CONNECTION),
        version: header_str(&headers, header::SEC_WEBSOCKET_VERSION),
        key: header_str(&headers, header::SEC_WEBSOCKET_KEY),
    };
    let accept = match handshake.validate() {
        Ok(accept) => accept,
        Err(e) => return (StatusCode::BAD_REQUEST, e.to_string()).into_response(),
    };

    let (mut parts, _body) = request.into_parts();
    let Some(on_upgrade) = parts.extensions.remove::<hyper::upgrade::OnUpgrade>() else {
        return (StatusCode::BAD_REQUEST, "connection is not upgradable").into_response();
    };

    let client = NEXT_CLIENT_ID.fetch_add(1, Ordering::Relaxed);
    let gateway = state.gateway.clone();
    let outbound = gateway.connections().register(client).await;
    gateway.metrics().record_connection_opened();

    tokio::spawn(async move {
        match on_upgrade.await {
            Ok(upgraded) => {
                let io = TokioIo::new(upgraded);
                run_connection(io, client, user_id, gateway, outbound).await;
            }
            Err(e) => {
                tracing::warn!(error = %e, client, "websocket upgrade failed after 101 response");
                gateway.connections().unregister(client).await;
            }
        }
    });

    Response::builder()
        .status(StatusCode::SWITCHING_PROTOCOLS)
        .header(header::CONNECTION, "upgrade")
        .header(header::UPGRADE, "websocket")
        .header(header::SEC_WEBSOCKET_ACCEPT, accept)
        .body(Body::empty())
        .expect("a static 101 response is always well-formed")
}

async fn authenticate(headers: &HeaderMap, state: &AppState) -> Option<String> {
    let raw = header_str(headers, header::AUTHORIZATION)?;
    let token = extract_bearer(raw)?;
    state.tokens.validate(token).await
}

fn header_str<'a>(headers: &'a HeaderMap, name: header::HeaderName) -> Option<&'a str> {
    headers.get(name)?.to_str().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::InMemoryTokenValidator;
    use crate::connections::ConnectionRegistry;
    use crate::roles::InMemoryRoleProvider;
    use event_queue::InProcessQueue;
    use room_registry::{InMemoryChannelDirectory, RoomRegistry};

    fn state(tokens: Arc<InMemoryTokenValidator>) -> Arc<AppState> {
        Arc::new(AppState {
            gateway: Arc::new(Gateway::new(
                Arc::new(RoomRegistry::new()),
                Arc::new(InMemoryChannelDirectory::new()),
                Arc::new(InMemoryRoleProvider::new()),
                Arc::new(InProcessQueue::new(16)),
                Arc::new(ConnectionRegistry::new()),
            )),
            tokens,
        })
    }

    #[tokio::test]
    async fn missing_authorization_header_is_unauthorized() {
        let response = upgrade(
            State(state(Arc::new(InMemoryTokenValidator::new()))),
            HeaderMap::new(),
            Request::builder().body(Body::empty()).unwrap(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn authenticated_request_missing_upgrade_headers_is_bad_request() {
        let tokens = Arc::new(InMemoryTokenValidator::new());
        tokens.issue("tok", "alice").await;
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, "Bearer tok".parse().unwrap());
        let response = upgrade(State(state(tokens)), headers, Request::builder().body(Body::empty()).unwrap()).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
