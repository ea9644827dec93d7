//! Shared harness for the WebSocket end-to-end scenarios: spins up the chat
//! gateway on a loopback port and drives it from a hand-rolled client built
//! on the same `ws-wire` codec the server speaks, rather than pulling in a
//! third WebSocket client crate.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use bytes::{Buf, BytesMut};
use chat_gateway::auth::InMemoryTokenValidator;
use chat_gateway::commands::{ClientCommand, ServerFrame};
use chat_gateway::connections::ConnectionRegistry;
use chat_gateway::roles::InMemoryRoleProvider;
use chat_gateway::{AppState, Gateway};
use event_queue::InProcessQueue;
use room_registry::{ChannelDirectory, InMemoryChannelDirectory, RoomRegistry};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use ws_wire::frame::{decode_frame, encode_frame, DecodeOutcome, Opcode};
use ws_wire::handshake::compute_accept;

pub struct TestGateway {
    pub addr: SocketAddr,
    pub tokens: Arc<InMemoryTokenValidator>,
    pub channels: Arc<InMemoryChannelDirectory>,
}

/// Boots a real `chat-gateway` router bound to an ephemeral loopback port,
/// with an empty channel directory and token table the test fills in.
pub async fn start_gateway() -> TestGateway {
    let tokens = Arc::new(InMemoryTokenValidator::new());
    let channels = Arc::new(InMemoryChannelDirectory::new());
    let gateway = Arc::new(Gateway::new(
        Arc::new(RoomRegistry::new()),
        channels.clone() as Arc<dyn ChannelDirectory>,
        Arc::new(InMemoryRoleProvider::new()),
        Arc::new(InProcessQueue::new(16)),
        Arc::new(ConnectionRegistry::new()),
    ));
    let state = Arc::new(AppState { gateway, tokens: tokens.clone() });
    let router = chat_gateway::build_router(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("failed to bind chat gateway test listener");
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.expect("chat gateway test server error");
    });
    tokio::time::sleep(Duration::from_millis(20)).await;

    TestGateway { addr, tokens, channels }
}

/// A minimal WebSocket client speaking the exact frame codec and handshake
/// already built and tested in `ws-wire`, connected over a raw `TcpStream`.
pub struct WsTestClient {
    stream: TcpStream,
    buf: BytesMut,
}

impl WsTestClient {
    pub async fn connect(addr: SocketAddr, token: &str) -> Self {
        let mut stream = TcpStream::connect(addr).await.expect("failed to connect to test gateway");

        let key = BASE64.encode(b"0123456789012345");
        let request = format!(
            "GET /ws/v1/chat HTTP/1.1\r\n\
             Host: {addr}\r\n\
             Upgrade: websocket\r\n\
             Connection: Upgrade\r\n\
             Sec-WebSocket-Version: 13\r\n\
             Sec-WebSocket-Key: {key}\r\n\
             Authorization: Bearer {token}\r\n\
             \r\n"
        );
        stream.write_all(request.as_bytes()).await.unwrap();

        let mut buf = BytesMut::with_capacity(1024);
        let mut chunk = [0u8; 1024];
        let header_end = loop {
            let n = stream.read(&mut chunk).await.unwrap();
            assert!(n > 0, "connection closed during handshake");
            buf.extend_from_slice(&chunk[..n]);
            if let Some(pos) = find_header_end(&buf) {
                break pos;
            }
        };

        let header_text = std::str::from_utf8(&buf[..header_end]).unwrap().to_owned();
        assert!(
            header_text.starts_with("HTTP/1.1 101"),
            "expected a 101 Switching Protocols response, got: {header_text}"
        );
        assert!(
            header_text.contains(&compute_accept(&key)),
            "Sec-WebSocket-Accept did not match the computed value: {header_text}"
        );

        buf.advance(header_end + 4);
        Self { stream, buf }
    }

    pub async fn send_command(&mut self, command: &ClientCommand) {
        let payload = serde_json::to_vec(command).unwrap();
        let encoded = encode_frame(Opcode::Text, &payload, true).unwrap();
        self.stream.write_all(&encoded).await.unwrap();
    }

    /// Reads the next text frame as a [`ServerFrame`], transparently
    /// answering any ping the server sends while waiting.
    pub async fn recv_frame(&mut self) -> ServerFrame {
        let mut chunk = [0u8; 4096];
        loop {
            match decode_frame(&self.buf) {
                DecodeOutcome::Incomplete => {
                    let n = self.stream.read(&mut chunk).await.unwrap();
                    assert!(n > 0, "connection closed before a frame arrived");
                    self.buf.extend_from_slice(&chunk[..n]);
                }
                DecodeOutcome::Ignored { consumed } => self.buf.advance(consumed),
                DecodeOutcome::Frame { frame, consumed } => {
                    self.buf.advance(consumed);
                    match frame.opcode {
                        Opcode::Ping => {
                            let pong = encode_frame(Opcode::Pong, &frame.payload, true).unwrap();
                            self.stream.write_all(&pong).await.unwrap();
                        }
                        Opcode::Text => {
                            return serde_json::from_slice(&frame.payload).unwrap();
                        }
                        Opcode::Pong | Opcode::Close => {}
                    }
                }
            }
        }
    }

    /// `true` if a frame arrives within `timeout`, `false` on timeout —
    /// used to assert a connection does *not* receive a broadcast.
    pub async fn recv_frame_within(&mut self, timeout: Duration) -> Option<ServerFrame> {
        tokio::time::timeout(timeout, self.recv_frame()).await.ok()
    }
}

fn find_header_end(buf: &[u8]) -> Option<usize> {
    buf.windows(4).position(|w| w == b"\r\n\r\n")
}
