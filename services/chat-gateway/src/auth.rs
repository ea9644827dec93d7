//! Bearer-token authentication for the WebSocket upgrade (spec §6: "session
//! authenticated the same way the rest of the platform authenticates a
//! WebSocket session"). Grounded in the teacher's `auth.rs` token-table
//! lookup; the real token table is an external collaborator (out of scope),
//! so it is represented here as a narrow [`TokenValidator`] trait.

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

#[async_trait]
pub trait TokenValidator: Send + Sync {
    /// Resolves a raw bearer token to the user id it authenticates as, or
    /// `None` if the token is missing, malformed, or revoked.
    async fn validate(&self, raw_token: &str) -> Option<String>;
}

/// An in-memory token → user id table, for tests and single-process
/// deployments that provision tokens out of band.
#[derive(Default)]
pub struct InMemoryTokenValidator {
    tokens: RwLock<HashMap<String, String>>,
}

impl InMemoryTokenValidator {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn issue(&self, token: impl Into<String>, user_id: impl Into<String>) {
        self.tokens.write().await.insert(token.into(), user_id.into());
    }
}

#[async_trait]
impl TokenValidator for InMemoryTokenValidator {
    async fn validate(&self, raw_token: &str) -> Option<String> {
        self.tokens.read().await.get(raw_token).cloned()
    }
}

/// Strips the `Bearer ` prefix off an `Authorization` header value.
pub fn extract_bearer(authorization: &str) -> Option<&str> {
    authorization.strip_prefix("Bearer ")
}
