//! Per-connection outbound queues, addressed by [`ClientId`].
//!
//! Grounded in the teacher's `ws_forwarder.rs` fan-out registry: each
//! connection gets a bounded `mpsc` channel and a dedicated writer task;
//! [`ConnectionRegistry::send`] uses `try_send` so one slow reader can never
//! block a broadcast to the rest of the room (spec §5: "a slow consumer's
//! queue fills and frames are dropped for that connection, never the room").

use std::collections::HashMap;

use chat_domain::ClientId;
use tokio::sync::{mpsc, RwLock};

use crate::commands::ServerFrame;

/// Outbound frames queued per connection before the writer task drains them
/// onto the socket. Matches the teacher's per-recipient channel capacity.
pub const OUTBOUND_CAPACITY: usize = 16;

#[derive(Default)]
pub struct ConnectionRegistry {
    senders: RwLock<HashMap<ClientId, mpsc::Sender<ServerFrame>>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new connection and returns the receiving half its writer
    /// task should drain.
    pub async fn register(&self, client: ClientId) -> mpsc::Receiver<ServerFrame> {
        let (tx, rx) = mpsc::channel(OUTBOUND_CAPACITY);
        self.senders.write().await.insert(client, tx);
        rx
    }

    pub async fn unregister(&self, client: ClientId) {
        self.senders.write().await.remove(&client);
    }

    /// Enqueues `frame` for `client`. Returns `false` if the connection is
    /// unknown or its queue is full — in both cases the frame is dropped,
    /// never retried, per the back-pressure policy above.
    pub async fn send(&self, client: ClientId, frame: ServerFrame) -> bool {
        let senders = self.senders.read().await;
        match senders.get(&client) {
            Some(tx) => tx.try_send(frame).is_ok(),
            None => false,
        }
    }

    pub async fn connection_count(&self) -> usize {
        self.senders.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn send_to_unregistered_client_reports_failure() {
        let registry = ConnectionRegistry::new();
        assert!(!registry.send(1, ServerFrame::ack(None)).await);
    }

    #[tokio::test]
    async fn registered_client_receives_sent_frames() {
        let registry = ConnectionRegistry::new();
        let mut rx = registry.register(1).await;
        assert!(registry.send(1, ServerFrame::ack(None)).await);
        assert_eq!(rx.recv().await, Some(ServerFrame::ack(None)));
    }

    #[tokio::test]
    async fn full_queue_drops_the_frame_instead_of_blocking() {
        let registry = ConnectionRegistry::new();
        let _rx = registry.register(1).await;
        for _ in 0..OUTBOUND_CAPACITY {
            assert!(registry.send(1, ServerFrame::ack(None)).await);
        }
        assert!(!registry.send(1, ServerFrame::ack(None)).await);
    }

    #[tokio::test]
    async fn unregister_removes_the_connection() {
        let registry = ConnectionRegistry::new();
        let _rx = registry.register(1).await;
        registry.unregister(1).await;
        assert!(!registry.send(1, ServerFrame::ack(None)).await);
    }
}
