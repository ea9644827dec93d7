//! In-process counters for the ambient metrics an external collaborator
//! (an exporter, a dashboard) would scrape; exporting them is out of scope
//! here.

use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Default)]
pub struct GatewayMetrics {
    messages_broadcast: AtomicU64,
    commands_rejected: AtomicU64,
    connections_opened: AtomicU64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MetricsSnapshot {
    pub messages_broadcast: u64,
    pub commands_rejected: u64,
    pub connections_opened: u64,
}

impl GatewayMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_message_broadcast(&self) {
        self.messages_broadcast.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_command_rejected(&self) {
        self.commands_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_connection_opened(&self) {
        self.connections_opened.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            messages_broadcast: self.messages_broadcast.load(Ordering::Relaxed),
            commands_rejected: self.commands_rejected.load(Ordering::Relaxed),
            connections_opened: self.connections_opened.load(Ordering::Relaxed),
        }
    }
}
