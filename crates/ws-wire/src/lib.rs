//! Hand-rolled WebSocket frame codec, opening handshake, and the RESP-like
//! command/reply protocol used to talk to the durable stream backend.
//!
//! Kept dependency-free of any actual transport (`axum`, `tokio`, raw
//! sockets) so the wire-level logic can be unit tested against plain byte
//! buffers.

pub mod frame;
pub mod handshake;
pub mod resp;

pub use frame::{Frame, FrameError, Opcode};
pub use handshake::{HandshakeError, HandshakeRequest};
pub use resp::{RespError, RespValue};
