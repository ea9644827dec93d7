//! In-process fan-out backend. Suitable only for single-process
//! deployments: subscribers are plain bounded channels held in memory, lost
//! on process restart.

use async_trait::async_trait;
use chat_domain::Event;
use tokio::sync::{mpsc, oneshot, RwLock};

use crate::{EventQueue, QueueError, Subscription};

/// A registry of subscribers; `publish` attempts a non-blocking send to
/// each, dropping the event for any subscriber whose buffer is full.
/// Subscribers whose channel has been closed (the `Subscription` was
/// dropped) are pruned the next time `publish` runs.
pub struct InProcessQueue {
    subscribers: RwLock<Vec<mpsc::Sender<Event>>>,
    buffer: usize,
}

impl InProcessQueue {
    pub fn new(buffer: usize) -> Self {
        Self {
            subscribers: RwLock::new(Vec::new()),
            buffer,
        }
    }
}

#[async_trait]
impl EventQueue for InProcessQueue {
    async fn publish(&self, event: Event) -> Result<(), QueueError> {
        let mut subs = self.subscribers.write().await;
        subs.retain(|tx| match tx.try_send(event.clone()) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => true,
            Err(mpsc::error::TrySendError::Closed(_)) => false,
        });
        Ok(())
    }

    async fn subscribe(&self) -> Result<Subscription, QueueError> {
        let (tx, rx) = mpsc::channel(self.buffer);
        self.subscribers.write().await.push(tx);
        // The in-process backend has no undelivered-entry state to requeue
        // on cancellation, so the read loop is a no-op that only exists to
        // give `Subscription` a uniform shape across backends.
        let (cancel_tx, cancel_rx) = oneshot::channel();
        let task = tokio::spawn(async move {
            let _ = cancel_rx.await;
        });
        Ok(Subscription::new(rx, cancel_tx, task))
    }
}
