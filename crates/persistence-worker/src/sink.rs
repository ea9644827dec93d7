//! The narrow boundary between this worker and the actual datastore.
//!
//! The real datastore is out of scope (spec.md §1): a relational or
//! file-based store the REST CRUD layer also reads from. [`InMemorySink`]
//! is a reference implementation used by this crate's own tests and is not
//! meant for production use — a real deployment supplies its own
//! `PersistenceSink` backed by whatever store it runs.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use chat_domain::{ModerationAction, ModerationPayload, ModerationState, MessagePayload, ReportPayload};
use thiserror::Error;
use tokio::sync::Mutex;

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("datastore error: {0}")]
    Store(String),
}

/// Whether an insert created a new row or found one already present by
/// natural key, for a worker that dedups by event id rather than by
/// sequence number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted,
    Duplicate,
}

#[async_trait]
pub trait PersistenceSink: Send + Sync {
    /// Idempotent by `message.id`: redelivery of the same message must
    /// report [`UpsertOutcome::Duplicate`], not insert a second row.
    async fn insert_message(&self, message: MessagePayload) -> Result<UpsertOutcome, SinkError>;

    /// Applies a moderation action to the authoritative ban/timeout
    /// tables. Unlike messages and reports this has no natural id to dedup
    /// by; applying the same action twice (e.g. ban, replayed ban) must
    /// leave the tables in the same state as applying it once, which holds
    /// here because `ModerationState::ban`/`timeout` are themselves
    /// idempotent operations on a set/map.
    async fn apply_moderation(&self, moderation: ModerationPayload) -> Result<(), SinkError>;

    /// Idempotent by `report.id`: insert-or-ignore.
    async fn insert_report(&self, report: ReportPayload) -> Result<UpsertOutcome, SinkError>;
}

#[derive(Default)]
struct Inner {
    message_ids: HashSet<uuid::Uuid>,
    report_ids: HashSet<uuid::Uuid>,
    moderation: HashMap<String, ModerationState>,
}

/// An in-memory stand-in for the real datastore, used by this crate's
/// tests and suitable as a single-process fallback.
pub struct InMemorySink {
    inner: Mutex<Inner>,
}

impl InMemorySink {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
        }
    }

    pub async fn message_count(&self) -> usize {
        self.inner.lock().await.message_ids.len()
    }

    pub async fn is_banned(&self, channel_id: &str, user_id: &str) -> bool {
        self.inner
            .lock()
            .await
            .moderation
            .get(channel_id)
            .is_some_and(|state| state.is_banned(user_id))
    }
}

impl Default for InMemorySink {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PersistenceSink for InMemorySink {
    async fn insert_message(&self, message: MessagePayload) -> Result<UpsertOutcome, SinkError> {
        let mut inner = self.inner.lock().await;
        if !inner.message_ids.insert(message.id) {
            return Ok(UpsertOutcome::Duplicate);
        }
        Ok(UpsertOutcome::Inserted)
    }

    async fn apply_moderation(&self, moderation: ModerationPayload) -> Result<(), SinkError> {
        let mut inner = self.inner.lock().await;
        let state = inner.moderation.entry(moderation.channel_id.clone()).or_default();
        match moderation.action {
            ModerationAction::Ban => state.ban(&moderation.target_id),
            ModerationAction::Unban => state.unban(&moderation.target_id),
            ModerationAction::Timeout => {
                if let Some(expires_at) = moderation.expires_at {
                    state.timeout(&moderation.target_id, expires_at);
                }
            }
            ModerationAction::RemoveTimeout => state.remove_timeout(&moderation.target_id),
        }
        Ok(())
    }

    async fn insert_report(&self, report: ReportPayload) -> Result<UpsertOutcome, SinkError> {
        let mut inner = self.inner.lock().await;
        if !inner.report_ids.insert(report.id) {
            return Ok(UpsertOutcome::Duplicate);
        }
        Ok(UpsertOutcome::Inserted)
    }
}
