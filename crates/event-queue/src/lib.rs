//! Durable, consumer-group-based event stream with two interchangeable
//! backends: an in-process fan-out suitable for single-process deployments,
//! and a durable stream backend speaking a RESP-like protocol with
//! acknowledgment and requeue-on-cancellation semantics.
//!
//! Both backends implement the same [`EventQueue`] trait so the chat
//! gateway and the persistence worker never branch on which one is wired
//! in (selected at startup via `CHAT_QUEUE_BACKEND`).

mod durable;
mod memory;
mod tls;

pub use durable::{DurableConfig, DurableQueue};
pub use memory::InProcessQueue;
pub use tls::TlsConfig;

use async_trait::async_trait;
use chat_domain::Event;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("protocol error: {0}")]
    Protocol(String),
    #[error("upstream replied with an error: {0}")]
    Upstream(String),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// A durable or in-process event stream, publish/subscribe style.
///
/// `subscribe` returns a [`Subscription`] with implicit acknowledgment on
/// successful consumption: once an event is handed to the caller through
/// [`Subscription::recv`], the backend considers it delivered and will not
/// redeliver it to this subscription again. At-least-once, not
/// exactly-once: a cancelled subscription may cause its most recently read,
/// not-yet-delivered entry to be redelivered to a later subscriber.
#[async_trait]
pub trait EventQueue: Send + Sync {
    async fn publish(&self, event: Event) -> Result<(), QueueError>;
    async fn subscribe(&self) -> Result<Subscription, QueueError>;
}

/// The three states a subscription passes through: `creating` while the
/// backend is establishing its read loop, `running` while delivering
/// events, `closed` once the output channel has been closed for good.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionState {
    Creating,
    Running,
    Closed,
}

/// A live subscription to an [`EventQueue`].
///
/// Dropping a `Subscription` without calling [`Subscription::close`] still
/// signals the backend's read loop to stop (via the cancellation channel),
/// but does not wait for in-flight requeue to finish. Call `close` when the
/// caller needs a guarantee that any at-risk entry has been re-published
/// before moving on (e.g. in tests asserting requeue behavior).
pub struct Subscription {
    rx: mpsc::Receiver<Event>,
    cancel: Option<oneshot::Sender<()>>,
    task: Option<tokio::task::JoinHandle<()>>,
}

impl Subscription {
    pub(crate) fn new(
        rx: mpsc::Receiver<Event>,
        cancel: oneshot::Sender<()>,
        task: tokio::task::JoinHandle<()>,
    ) -> Self {
        Self {
            rx,
            cancel: Some(cancel),
            task: Some(task),
        }
    }

    /// Receives the next event, or `None` once the subscription is closed.
    pub async fn recv(&mut self) -> Option<Event> {
        self.rx.recv().await
    }

    /// Signals the backend to stop and waits for any at-risk entry to be
    /// requeued before returning.
    pub async fn close(mut self) {
        if let Some(cancel) = self.cancel.take() {
            let _ = cancel.send(());
        }
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            let _ = cancel.send(());
        }
    }
}
