//! Per-connection read/write/heartbeat loop, running over the hand-rolled
//! `ws-wire` frame codec instead of axum's built-in WebSocket support (the
//! acceptor hands this a raw, already-upgraded byte stream — see
//! [`crate::acceptor`]).
//!
//! One task per connection, structured the way the teacher's
//! `ws_forwarder.rs` connection loop is: a `tokio::select!` racing inbound
//! bytes, outbound queued frames, and a heartbeat tick.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use bytes::{Buf, BytesMut};
use chat_domain::ClientId;
use chrono::Utc;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use ws_wire::frame::{decode_frame, encode_frame, DecodeOutcome, Opcode};

use crate::commands::{ClientCommand, ServerFrame};
use crate::gateway::Gateway;

const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);
const READ_CHUNK: usize = 4096;

/// Drives one connection until the peer closes, a write fails, or its
/// outbound queue is torn down, then leaves every channel it had joined and
/// deregisters it from the gateway.
pub async fn run_connection<S>(
    socket: S,
    client: ClientId,
    user_id: String,
    gateway: Arc<Gateway>,
    mut outbound: mpsc::Receiver<ServerFrame>,
) where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    let (mut reader, mut writer) = tokio::io::split(socket);
    let mut buf = BytesMut::with_capacity(READ_CHUNK);
    let mut read_chunk = [0u8; READ_CHUNK];
    let mut joined_channels: HashSet<String> = HashSet::new();
    let mut heartbeat = tokio::time::interval(HEARTBEAT_INTERVAL);
    heartbeat.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    'outer: loop {
        tokio::select! {
            frame = outbound.recv() => {
                match frame {
                    Some(frame) => {
                        if send_frame(&mut writer, Opcode::Text, &server_frame_bytes(&frame)).await.is_err() {
                            break;
                        }
                    }
                    None => break,
                }
            }
            _ = heartbeat.tick() => {
                if send_frame(&mut writer, Opcode::Ping, &[]).await.is_err() {
                    break;
                }
            }
            read = reader.read(&mut read_chunk) => {
                let n = match read {
                    Ok(0) | Err(_) => break,
                    Ok(n) => n,
                };
                buf.extend_from_slice(&read_chunk[..n]);

                loop {
                    match decode_frame(&buf) {
                        DecodeOutcome::Incomplete => break,
                        DecodeOutcome::Ignored { consumed } => buf.advance(consumed),
                        DecodeOutcome::Frame { frame, consumed } => {
                            buf.advance(consumed);
                            match frame.opcode {
                                Opcode::Close => {
                                    let _ = send_frame(&mut writer, Opcode::Close, &[]).await;
                                    break 'outer;
                                }
                                Opcode::Ping => {
                                    if send_frame(&mut writer, Opcode::Pong, &frame.payload).await.is_err() {
                                        break 'outer;
                                    }
                                }
                                Opcode::Pong => {}
                                Opcode::Text => {
                                    let reply = handle_text(&frame.payload, client, &user_id, &gateway, &mut joined_channels).await;
                                    if let Some(reply) = reply {
                                        if send_frame(&mut writer, Opcode::Text, &server_frame_bytes(&reply)).await.is_err() {
                                            break 'outer;
                                        }
                                    }
                                }
                            }
                        }
                    }
                }
            }
        }
    }

    for channel_id in &joined_channels {
        gateway.leave(channel_id, client).await;
    }
    gateway.connections().unregister(client).await;
}

async fn handle_text(
    payload: &[u8],
    client: ClientId,
    user_id: &str,
    gateway: &Gateway,
    joined_channels: &mut HashSet<String>,
) -> Option<ServerFrame> {
    let command: ClientCommand = match serde_json::from_slice(payload) {
        Ok(command) => command,
        Err(e) => return Some(ServerFrame::error(format!("malformed command: {e}"))),
    };

    let joined_target = match &command {
        ClientCommand::Join { channel_id } => Some((channel_id.clone(), true)),
        ClientCommand::Leave { channel_id } => Some((channel_id.clone(), false)),
        _ => None,
    };

    let reply = gateway.handle(client, user_id, Utc::now(), command).await;

    if let Some((channel_id, joining)) = joined_target {
        let succeeded = !matches!(reply, ServerFrame::Error { .. });
        if joining && succeeded {
            joined_channels.insert(channel_id);
        } else if !joining {
            joined_channels.remove(&channel_id);
        }
    }

    Some(reply)
}

fn server_frame_bytes(frame: &ServerFrame) -> Vec<u8> {
    serde_json::to_vec(frame).unwrap_or_else(|_| br#"{"type":"error","error":"internal encode failure"}"#.to_vec())
}

async fn send_frame<W>(writer: &mut W, opcode: Opcode, payload: &[u8]) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    let encoded = encode_frame(opcode, payload, false)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string()))?;
    writer.write_all(&encoded).await
}
