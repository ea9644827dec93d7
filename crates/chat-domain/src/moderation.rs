use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};

/// Whether a user may currently post to a channel, and why not if they can't.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpeechGate {
    Allowed,
    Banned,
    TimedOut { until: DateTime<Utc> },
}

impl SpeechGate {
    pub fn is_allowed(self) -> bool {
        matches!(self, SpeechGate::Allowed)
    }
}

/// Per-channel ban/timeout tables.
///
/// A banned user is never permitted to speak regardless of timeout state.
/// Timeouts are cleared lazily: an expired entry is dropped the first time
/// it is checked after expiry, not on a background timer.
#[derive(Debug, Clone, Default)]
pub struct ModerationState {
    banned: HashSet<String>,
    timed_out: HashMap<String, DateTime<Utc>>,
}

impl ModerationState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_banned(&self, user_id: &str) -> bool {
        self.banned.contains(user_id)
    }

    pub fn ban(&mut self, user_id: &str) {
        self.banned.insert(user_id.to_owned());
        self.timed_out.remove(user_id);
    }

    pub fn unban(&mut self, user_id: &str) {
        self.banned.remove(user_id);
    }

    pub fn timeout(&mut self, user_id: &str, expires_at: DateTime<Utc>) {
        self.timed_out.insert(user_id.to_owned(), expires_at);
    }

    pub fn remove_timeout(&mut self, user_id: &str) {
        self.timed_out.remove(user_id);
    }

    /// Evaluates whether `user_id` may speak at `now`, lazily clearing an
    /// elapsed timeout as a side effect.
    pub fn check(&mut self, user_id: &str, now: DateTime<Utc>) -> SpeechGate {
        if self.banned.contains(user_id) {
            return SpeechGate::Banned;
        }
        match self.timed_out.get(user_id).copied() {
            Some(until) if until > now => SpeechGate::TimedOut { until },
            Some(_) => {
                self.timed_out.remove(user_id);
                SpeechGate::Allowed
            }
            None => SpeechGate::Allowed,
        }
    }
}
