//! Consumes events off an [`EventQueue`] subscription and writes them to
//! the datastore, asynchronously from the gateway's broadcast path.
//!
//! spec.md specifies this component by contract only ("Idempotent:
//! re-observing an event (id already present) must be a no-op"). This crate
//! carries a reference implementation of that contract, grounded in the
//! teacher's `repo/events.rs::upsert_event` dedup-by-natural-key pattern:
//! the datastore itself is an external collaborator (out of scope), so the
//! seam is a narrow [`PersistenceSink`] trait a real datastore adapter
//! implements and tests substitute with [`InMemorySink`].

mod sink;

pub use sink::{InMemorySink, PersistenceSink, SinkError, UpsertOutcome};

use std::sync::Arc;

use chat_domain::Event;
use event_queue::EventQueue;
use tokio_util::sync::CancellationToken;

/// Runs the persistence loop until `cancel` fires or the subscription
/// closes on its own. Each event is applied via `sink` and any failure is
/// logged rather than propagated — a write failure here must not take
/// down the worker, since the event remains available for a later replay
/// via the queue's at-least-once semantics.
pub async fn run(
    queue: Arc<dyn EventQueue>,
    sink: Arc<dyn PersistenceSink>,
    cancel: CancellationToken,
) {
    let mut subscription = match queue.subscribe().await {
        Ok(sub) => sub,
        Err(e) => {
            tracing::error!(error = %e, "persistence worker failed to subscribe");
            return;
        }
    };

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            event = subscription.recv() => {
                match event {
                    Some(event) => apply(&*sink, event).await,
                    None => break,
                }
            }
        }
    }
    subscription.close().await;
}

async fn apply(sink: &dyn PersistenceSink, event: Event) {
    let result = match &event {
        Event::Message { message } => sink.insert_message(message.clone()).await.map(|_| ()),
        Event::Moderation { moderation } => sink.apply_moderation(moderation.clone()).await,
        Event::Report { report } => sink.insert_report(report.clone()).await.map(|_| ()),
    };
    if let Err(e) = result {
        tracing::warn!(error = %e, dedup_key = %event.dedup_key(), "persistence worker failed to apply event");
    }
}
