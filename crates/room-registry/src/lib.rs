//! In-memory room membership and per-channel moderation state.
//!
//! Both maps live behind one [`tokio::sync::RwLock`] so that applying a
//! moderation action and reading off the current recipient list can happen
//! as one atomic step: a broadcast that races a ban sees either the
//! pre-ban or post-ban world, never a half-applied one.

mod directory;

pub use directory::{ChannelDirectory, InMemoryChannelDirectory};

use std::collections::HashMap;

use chat_domain::{ModerationAction, ModerationPayload, ModerationState, Room, SpeechGate};
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

pub use chat_domain::ClientId;

/// A channel's moderation tables at process start, read from whatever
/// durable record backs them (out of scope here — the caller assembles
/// this from the persistence layer before calling [`RoomRegistry::start`]).
#[derive(Debug, Clone, Default)]
pub struct ModerationSnapshot {
    pub channel_id: String,
    pub banned: Vec<String>,
    pub timed_out: Vec<(String, DateTime<Utc>)>,
}

struct Inner {
    rooms: HashMap<String, Room>,
    moderation: HashMap<String, ModerationState>,
}

/// Process-wide room membership and moderation state.
///
/// Follows a `start(snapshot) → serve → stop` lifecycle: [`RoomRegistry::start`]
/// seeds the moderation tables once at boot, after which the registry just
/// serves `join`/`leave`/moderation calls until the process exits (there is
/// no explicit `stop` — dropping the registry is sufficient, since all state
/// is in memory).
pub struct RoomRegistry {
    inner: RwLock<Inner>,
}

/// Why a `join` or speech attempt was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpeechDenied {
    Banned,
    TimedOut { until: DateTime<Utc> },
}

impl RoomRegistry {
    /// Starts a registry with empty rooms and moderation tables seeded from
    /// `snapshot`.
    pub fn start(snapshot: Vec<ModerationSnapshot>) -> Self {
        let mut moderation = HashMap::with_capacity(snapshot.len());
        for entry in snapshot {
            let mut state = ModerationState::new();
            for user_id in entry.banned {
                state.ban(&user_id);
            }
            for (user_id, expires_at) in entry.timed_out {
                state.timeout(&user_id, expires_at);
            }
            moderation.insert(entry.channel_id, state);
        }
        Self {
            inner: RwLock::new(Inner {
                rooms: HashMap::new(),
                moderation,
            }),
        }
    }

    /// A registry with no prior state, for tests and first-boot deployments.
    pub fn new() -> Self {
        Self::start(Vec::new())
    }

    /// Checks the speech gate and, if allowed, adds `client` to the room.
    /// Both the check and the membership mutation happen under one write
    /// lock so a concurrent ban cannot race a join.
    pub async fn join(
        &self,
        channel_id: &str,
        client: ClientId,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> Result<(), SpeechDenied> {
        let mut inner = self.inner.write().await;
        match inner.moderation.entry(channel_id.to_owned()).or_default().check(user_id, now) {
            SpeechGate::Banned => Err(SpeechDenied::Banned),
            SpeechGate::TimedOut { until } => Err(SpeechDenied::TimedOut { until }),
            SpeechGate::Allowed => {
                inner
                    .rooms
                    .entry(channel_id.to_owned())
                    .or_insert_with(|| Room::new(channel_id))
                    .insert(client);
                Ok(())
            }
        }
    }

    /// Removes `client` from `channel_id`'s room, dropping the room entry
    /// entirely once it is empty.
    pub async fn leave(&self, channel_id: &str, client: ClientId) {
        let mut inner = self.inner.write().await;
        if let Some(room) = inner.rooms.get_mut(channel_id) {
            if room.remove(client) {
                inner.rooms.remove(channel_id);
            }
        }
    }

    /// Evaluates whether `user_id` may currently speak in `channel_id`,
    /// lazily clearing an elapsed timeout as a side effect. Used to gate
    /// `message` commands from an already-joined connection.
    pub async fn check_speech_gate(
        &self,
        channel_id: &str,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> SpeechGate {
        let mut inner = self.inner.write().await;
        inner.moderation.entry(channel_id.to_owned()).or_default().check(user_id, now)
    }

    /// The clients currently subscribed to `channel_id`, for broadcast.
    pub async fn recipients(&self, channel_id: &str) -> Vec<ClientId> {
        let inner = self.inner.read().await;
        inner
            .rooms
            .get(channel_id)
            .map(|room| room.clients().collect())
            .unwrap_or_default()
    }

    /// Applies a moderation action and returns the channel's current
    /// recipient list, both under the same write-lock acquisition — the
    /// ordering guarantee broadcast relies on: every recipient returned
    /// here sees the post-moderation world.
    pub async fn apply_moderation_and_recipients(
        &self,
        moderation: &ModerationPayload,
    ) -> Vec<ClientId> {
        let mut inner = self.inner.write().await;
        let state = inner
            .moderation
            .entry(moderation.channel_id.clone())
            .or_default();
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
        inner
            .rooms
            .get(moderation.channel_id.as_str())
            .map(|room| room.clients().collect())
            .unwrap_or_default()
    }
}

impl Default for RoomRegistry {
    fn default() -> Self {
        Self::new()
    }
}
