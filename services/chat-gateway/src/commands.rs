//! The client → server command set and the server → client frame set,
//! both JSON on the wire (spec §4.3). Represented as tagged enums with
//! validation living one layer up in [`crate::gateway`], not here —
//! deserialization only rejects structurally malformed JSON; everything
//! else (empty content, non-existent channel, authorization) is a
//! [`crate::commands::ServerFrame::Error`] produced by the gateway.

use chat_domain::Event;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientCommand {
    Join {
        #[serde(rename = "channelId")]
        channel_id: String,
    },
    Leave {
        #[serde(rename = "channelId")]
        channel_id: String,
    },
    Message {
        #[serde(rename = "channelId")]
        channel_id: String,
        content: String,
    },
    Timeout {
        #[serde(rename = "channelId")]
        channel_id: String,
        #[serde(rename = "targetId")]
        target_id: String,
        #[serde(rename = "durationMs")]
        duration_ms: i64,
    },
    RemoveTimeout {
        #[serde(rename = "channelId")]
        channel_id: String,
        #[serde(rename = "targetId")]
        target_id: String,
    },
    Ban {
        #[serde(rename = "channelId")]
        channel_id: String,
        #[serde(rename = "targetId")]
        target_id: String,
    },
    Unban {
        #[serde(rename = "channelId")]
        channel_id: String,
        #[serde(rename = "targetId")]
        target_id: String,
    },
    Report {
        #[serde(rename = "channelId")]
        channel_id: String,
        #[serde(rename = "targetId")]
        target_id: String,
        reason: String,
        #[serde(rename = "messageId", default)]
        message_id: Option<Uuid>,
        #[serde(rename = "evidenceUrl", default)]
        evidence_url: Option<String>,
    },
}

/// One of the three frame kinds the server ever sends: `ack` (optionally
/// carrying the event it produced), `event` (a broadcast), or `error`
/// (validation/authorization failure — the connection stays open).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerFrame {
    Ack {
        #[serde(skip_serializing_if = "Option::is_none")]
        event: Option<Event>,
    },
    Event {
        event: Event,
    },
    Error {
        error: String,
    },
}

impl ServerFrame {
    pub fn ack(event: Option<Event>) -> Self {
        ServerFrame::Ack { event }
    }

    pub fn error(message: impl Into<String>) -> Self {
        ServerFrame::Error { error: message.into() }
    }
}
