//! Workspace root crate for the live-streaming control plane.
//!
//! This crate carries no logic of its own — it exists so that
//! `tests/integration/*.rs` (the end-to-end scenarios against the running
//! gateway and controller) have a home at the workspace root. All behavior
//! lives in the path-dependency crates under `crates/` and `services/`.

pub use chat_domain as domain;
pub use event_queue;
pub use ingest_adapters;
pub use persistence_worker;
pub use room_registry;
pub use ws_wire as wire;
