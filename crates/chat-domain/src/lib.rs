//! Core chat domain types: events, rooms, and moderation state.
//!
//! Shared by the gateway, the event queue, and the persistence worker so all
//! three agree on one wire/storage shape for an `Event`.

mod moderation;
mod room;
pub mod validation;

pub use moderation::{ModerationState, SpeechGate};
pub use room::{ClientId, Room};
pub use validation::ValidationError;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A chat message posted to a channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessagePayload {
    pub id: Uuid,
    pub channel_id: String,
    pub user_id: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// The moderation action applied by a `Moderation` event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModerationAction {
    Timeout,
    RemoveTimeout,
    Ban,
    Unban,
}

/// A moderation action taken by a channel owner or admin against a target user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModerationPayload {
    pub action: ModerationAction,
    pub channel_id: String,
    pub actor_id: String,
    pub target_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Lifecycle status of a user report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportStatus {
    Open,
    Reviewed,
    Dismissed,
}

/// A viewer-filed report against another user or message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportPayload {
    pub id: Uuid,
    pub channel_id: String,
    pub reporter_id: String,
    pub target_id: String,
    pub reason: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evidence_url: Option<String>,
    pub status: ReportStatus,
    pub created_at: DateTime<Utc>,
}

/// The unit transiting the event queue: one of a message, a moderation
/// action, or a report.
///
/// Serializes with a top-level `type` tag and the payload nested under a
/// field named after the variant, e.g. `{"type":"message","message":{...}}`,
/// so the same shape is used on the wire, in the queue, and in storage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    Message { message: MessagePayload },
    Moderation { moderation: ModerationPayload },
    Report { report: ReportPayload },
}

impl Event {
    pub fn channel_id(&self) -> &str {
        match self {
            Event::Message { message } => &message.channel_id,
            Event::Moderation { moderation } => &moderation.channel_id,
            Event::Report { report } => &report.channel_id,
        }
    }

    pub fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            Event::Message { message } => message.created_at,
            Event::Moderation { moderation } => moderation.occurred_at,
            Event::Report { report } => report.created_at,
        }
    }

    /// Natural key for idempotent persistence.
    ///
    /// `Message` and `Report` events carry their own id. `Moderation` events
    /// do not, so the key is derived from the fields that make one
    /// moderation action distinct from another.
    pub fn dedup_key(&self) -> String {
        match self {
            Event::Message { message } => format!("message:{}", message.id),
            Event::Report { report } => format!("report:{}", report.id),
            Event::Moderation { moderation } => format!(
                "moderation:{}:{}:{}:{:?}:{}",
                moderation.channel_id,
                moderation.actor_id,
                moderation.target_id,
                moderation.action,
                moderation.occurred_at.to_rfc3339(),
            ),
        }
    }
}
