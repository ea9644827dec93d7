//! Command handling: validates a [`ClientCommand`], applies it to the room
//! registry, persists the resulting event, and broadcasts it to the right
//! recipients. This is the testable core of the gateway — it has no
//! knowledge of WebSockets at all, only of [`ClientId`]s and frames.

use std::sync::Arc;

use chat_domain::{
    validation, Event, ModerationAction, ModerationPayload, MessagePayload, ReportPayload,
    ReportStatus, SpeechGate,
};
use chrono::{DateTime, Utc};
use event_queue::EventQueue;
use room_registry::{ChannelDirectory, RoomRegistry, SpeechDenied};
use uuid::Uuid;

use crate::commands::{ClientCommand, ServerFrame};
use crate::connections::ConnectionRegistry;
use crate::metrics::GatewayMetrics;
use crate::roles::RoleProvider;

pub struct Gateway {
    rooms: Arc<RoomRegistry>,
    channels: Arc<dyn ChannelDirectory>,
    roles: Arc<dyn RoleProvider>,
    queue: Arc<dyn EventQueue>,
    connections: Arc<ConnectionRegistry>,
    metrics: GatewayMetrics,
}

impl Gateway {
    pub fn new(
        rooms: Arc<RoomRegistry>,
        channels: Arc<dyn ChannelDirectory>,
        roles: Arc<dyn RoleProvider>,
        queue: Arc<dyn EventQueue>,
        connections: Arc<ConnectionRegistry>,
    ) -> Self {
        Self { rooms, channels, roles, queue, connections, metrics: GatewayMetrics::new() }
    }

    pub fn metrics(&self) -> &GatewayMetrics {
        &self.metrics
    }

    pub fn connections(&self) -> &Arc<ConnectionRegistry> {
        &self.connections
    }

    pub async fn leave(&self, channel_id: &str, client: chat_domain::ClientId) {
        self.rooms.leave(channel_id, client).await;
    }

    /// Handles one inbound command from `client` (authenticated as
    /// `user_id`) and returns the frame that connection's ack should carry.
    /// Side effects (broadcast, persistence) happen before this returns.
    pub async fn handle(
        &self,
        client: chat_domain::ClientId,
        user_id: &str,
        now: DateTime<Utc>,
        command: ClientCommand,
    ) -> ServerFrame {
        let frame = self.dispatch(client, user_id, now, command).await;
        if matches!(frame, ServerFrame::Error { .. }) {
            self.metrics.record_command_rejected();
        }
        frame
    }

    async fn dispatch(
        &self,
        client: chat_domain::ClientId,
        user_id: &str,
        now: DateTime<Utc>,
        command: ClientCommand,
    ) -> ServerFrame {
        match command {
            ClientCommand::Join { channel_id } => self.handle_join(client, user_id, &channel_id, now).await,
            ClientCommand::Leave { channel_id } => {
                self.rooms.leave(&channel_id, client).await;
                ServerFrame::ack(None)
            }
            ClientCommand::Message { channel_id, content } => {
                self.handle_message(client, user_id, &channel_id, content, now).await
            }
            ClientCommand::Timeout { channel_id, target_id, duration_ms } => {
                self.handle_timeout(user_id, &channel_id, &target_id, duration_ms, now).await
            }
            ClientCommand::RemoveTimeout { channel_id, target_id } => {
                self.handle_moderation(user_id, &channel_id, &target_id, ModerationAction::RemoveTimeout, None, None, now)
                    .await
            }
            ClientCommand::Ban { channel_id, target_id } => {
                self.handle_moderation(user_id, &channel_id, &target_id, ModerationAction::Ban, None, None, now).await
            }
            ClientCommand::Unban { channel_id, target_id } => {
                self.handle_moderation(user_id, &channel_id, &target_id, ModerationAction::Unban, None, None, now)
                    .await
            }
            ClientCommand::Report { channel_id, target_id, reason, message_id, evidence_url } => {
                self.handle_report(user_id, &channel_id, &target_id, reason, message_id, evidence_url, now).await
            }
        }
    }

    async fn handle_join(
        &self,
        client: chat_domain::ClientId,
        user_id: &str,
        channel_id: &str,
        now: DateTime<Utc>,
    ) -> ServerFrame {
        if !self.channels.exists(channel_id).await {
            return ServerFrame::error("channel not found");
        }
        match self.rooms.join(channel_id, client, user_id, now).await {
            Ok(()) => ServerFrame::ack(None),
            Err(SpeechDenied::Banned) => ServerFrame::error("user is banned"),
            Err(SpeechDenied::TimedOut { .. }) => ServerFrame::error("user is timed out"),
        }
    }

    async fn handle_message(
        &self,
        client: chat_domain::ClientId,
        user_id: &str,
        channel_id: &str,
        content: String,
        now: DateTime<Utc>,
    ) -> ServerFrame {
        if !self.channels.exists(channel_id).await {
            return ServerFrame::error("channel not found");
        }
        match self.rooms.check_speech_gate(channel_id, user_id, now).await {
            SpeechGate::Banned => return ServerFrame::error("user is banned"),
            SpeechGate::TimedOut { .. } => return ServerFrame::error("user is timed out"),
            SpeechGate::Allowed => {}
        }
        let content = match validation::validate_message_content(&content) {
            Ok(content) => content,
            Err(e) => return ServerFrame::error(e.to_string()),
        };

        let event = Event::Message {
            message: MessagePayload {
                id: Uuid::new_v4(),
                channel_id: channel_id.to_owned(),
                user_id: user_id.to_owned(),
                content,
                created_at: now,
            },
        };
        self.persist(&event).await;

        let recipients = self.rooms.recipients(channel_id).await;
        self.broadcast(&recipients, Some(client), &event).await;
        self.metrics.record_message_broadcast();
        ServerFrame::ack(Some(event))
    }

    async fn handle_timeout(
        &self,
        user_id: &str,
        channel_id: &str,
        target_id: &str,
        duration_ms: i64,
        now: DateTime<Utc>,
    ) -> ServerFrame {
        if let Err(e) = validation::validate_actor_differs_from_target(user_id, target_id) {
            return ServerFrame::error(e.to_string());
        }
        if let Err(e) = validation::validate_timeout_duration_ms(duration_ms) {
            return ServerFrame::error(e.to_string());
        }
        let Some(expires_at) = now.checked_add_signed(chrono::Duration::milliseconds(duration_ms)) else {
            return ServerFrame::error("timeout duration out of range");
        };
        if let Err(e) = validation::validate_expiry_in_future(expires_at, now) {
            return ServerFrame::error(e.to_string());
        }
        self.handle_moderation(user_id, channel_id, target_id, ModerationAction::Timeout, Some(expires_at), None, now)
            .await
    }

    async fn handle_moderation(
        &self,
        user_id: &str,
        channel_id: &str,
        target_id: &str,
        action: ModerationAction,
        expires_at: Option<DateTime<Utc>>,
        reason: Option<String>,
        now: DateTime<Utc>,
    ) -> ServerFrame {
        if !self.channels.exists(channel_id).await {
            return ServerFrame::error("channel not found");
        }
        if !self.is_authorized_moderator(user_id, channel_id).await {
            return ServerFrame::error("actor must own the channel or hold the admin role");
        }

        let moderation = ModerationPayload {
            action,
            channel_id: channel_id.to_owned(),
            actor_id: user_id.to_owned(),
            target_id: target_id.to_owned(),
            expires_at,
            reason,
            occurred_at: now,
        };
        let recipients = self.rooms.apply_moderation_and_recipients(&moderation).await;

        let event = Event::Moderation { moderation };
        self.persist(&event).await;
        self.broadcast(&recipients, None, &event).await;
        ServerFrame::ack(Some(event))
    }

    async fn handle_report(
        &self,
        user_id: &str,
        channel_id: &str,
        target_id: &str,
        reason: String,
        message_id: Option<Uuid>,
        evidence_url: Option<String>,
        now: DateTime<Utc>,
    ) -> ServerFrame {
        if !self.channels.exists(channel_id).await {
            return ServerFrame::error("channel not found");
        }
        let reason = match validation::validate_reason(&reason) {
            Ok(reason) => reason,
            Err(e) => return ServerFrame::error(e.to_string()),
        };

        let event = Event::Report {
            report: ReportPayload {
                id: Uuid::new_v4(),
                channel_id: channel_id.to_owned(),
                reporter_id: user_id.to_owned(),
                target_id: target_id.to_owned(),
                reason,
                message_id,
                evidence_url,
                status: ReportStatus::Open,
                created_at: now,
            },
        };
        self.persist(&event).await;
        ServerFrame::ack(Some(event))
    }

    async fn is_authorized_moderator(&self, user_id: &str, channel_id: &str) -> bool {
        if self.roles.is_admin(user_id).await {
            return true;
        }
        self.channels.owner_of(channel_id).await.as_deref() == Some(user_id)
    }

    async fn broadcast(&self, recipients: &[chat_domain::ClientId], exclude: Option<chat_domain::ClientId>, event: &Event) {
        for &recipient in recipients {
            if Some(recipient) == exclude {
                continue;
            }
            self.connections.send(recipient, ServerFrame::Event { event: event.clone() }).await;
        }
    }

    async fn persist(&self, event: &Event) {
        if let Err(e) = self.queue.publish(event.clone()).await {
            tracing::warn!(error = %e, dedup_key = %event.dedup_key(), "failed to publish event for persistence");
        }
    }
}
