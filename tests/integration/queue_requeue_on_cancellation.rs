//! Cancelling a durable queue subscription while it is blocked handing an
//! already-read entry to a full output channel requeues that entry (a fresh
//! `XADD`) and only then acknowledges the original, instead of dropping it.
//!
//! There is no real stream backend available to test against, so this test
//! speaks the wire protocol itself: a small fake server accepts the
//! connections `DurableQueue` opens and replies the way a real one would for
//! the handful of commands this scenario touches.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use chat_domain::{Event, MessagePayload};
use chrono::Utc;
use event_queue::{DurableConfig, DurableQueue, EventQueue};
use tokio::net::{TcpListener, TcpStream};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::sync::{Mutex, Notify};
use uuid::Uuid;
use ws_wire::resp::{self, RespValue};

struct ServerState {
    next_id: u64,
    pending: VecDeque<(String, Vec<u8>)>,
    unacked: HashMap<String, Vec<u8>>,
    log: Vec<String>,
    entries_delivered: u64,
}

struct FakeStream {
    state: Arc<Mutex<ServerState>>,
    second_entry_delivered: Arc<Notify>,
}

impl FakeStream {
    fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(ServerState {
                next_id: 1,
                pending: VecDeque::new(),
                unacked: HashMap::new(),
                log: Vec::new(),
                entries_delivered: 0,
            })),
            second_entry_delivered: Arc::new(Notify::new()),
        }
    }

    async fn run(self: Arc<Self>, listener: TcpListener) {
        loop {
            let Ok((socket, _)) = listener.accept().await else { return };
            let me = Arc::clone(&self);
            tokio::spawn(me.serve_connection(socket));
        }
    }

    async fn serve_connection(self: Arc<Self>, mut socket: TcpStream) {
        let mut buf = Vec::new();
        loop {
            let command = loop {
                if let Some((value, consumed)) = resp::parse(&buf).expect("malformed test command") {
                    buf.drain(..consumed);
                    break value;
                }
                let mut chunk = [0u8; 4096];
                match socket.read(&mut chunk).await {
                    Ok(0) | Err(_) => return,
                    Ok(n) => buf.extend_from_slice(&chunk[..n]),
                }
            };
            let reply = self.handle(command).await;
            if socket.write_all(&encode_reply(&reply)).await.is_err() {
                return;
            }
        }
    }

    async fn handle(&self, command: RespValue) -> RespValue {
        let args = command.as_array().expect("command must be an array");
        let words: Vec<&str> = args.iter().map(|a| a.as_bulk_str().unwrap_or("")).collect();
        let mut state = self.state.lock().await;
        match words[0] {
            "XGROUP" => {
                state.log.push("XGROUP CREATE".into());
                RespValue::Simple("OK".into())
            }
            "XADD" => {
                let payload = args[4].clone();
                let RespValue::Bulk(Some(payload)) = payload else {
                    panic!("XADD payload must be a bulk string");
                };
                let id = format!("{}-0", state.next_id);
                state.next_id += 1;
                state.log.push(format!("XADD -> {id}"));
                state.pending.push_back((id.clone(), payload));
                RespValue::Bulk(Some(id.into_bytes()))
            }
            "XREADGROUP" => {
                let Some((id, payload)) = state.pending.pop_front() else {
                    state.log.push("XREADGROUP -> empty".into());
                    return RespValue::Array(None);
                };
                state.log.push(format!("XREADGROUP -> {id}"));
                state.unacked.insert(id.clone(), payload.clone());
                state.entries_delivered += 1;
                if state.entries_delivered == 2 {
                    self.second_entry_delivered.notify_one();
                }
                RespValue::Array(Some(vec![RespValue::Array(Some(vec![
                    RespValue::Bulk(Some(b"events".to_vec())),
                    RespValue::Array(Some(vec![RespValue::Array(Some(vec![
                        RespValue::Bulk(Some(id.into_bytes())),
                        RespValue::Array(Some(vec![
                            RespValue::Bulk(Some(b"payload".to_vec())),
                            RespValue::Bulk(Some(payload)),
                        ])),
                    ]))])),
                ]))]))
            }
            "XACK" => {
                let id = words[3].to_owned();
                state.unacked.remove(&id);
                state.log.push(format!("XACK {id}"));
                RespValue::Integer(1)
            }
            other => panic!("unexpected command: {other}"),
        }
    }
}

fn encode_reply(value: &RespValue) -> Vec<u8> {
    match value {
        RespValue::Simple(s) => format!("+{s}\r\n").into_bytes(),
        RespValue::Error(s) => format!("-{s}\r\n").into_bytes(),
        RespValue::Integer(n) => format!(":{n}\r\n").into_bytes(),
        RespValue::Bulk(None) => b"$-1\r\n".to_vec(),
        RespValue::Bulk(Some(bytes)) => {
            let mut out = format!("${}\r\n", bytes.len()).into_bytes();
            out.extend_from_slice(bytes);
            out.extend_from_slice(b"\r\n");
            out
        }
        RespValue::Array(None) => b"*-1\r\n".to_vec(),
        RespValue::Array(Some(items)) => {
            let mut out = format!("*{}\r\n", items.len()).into_bytes();
            for item in items {
                out.extend_from_slice(&encode_reply(item));
            }
            out
        }
    }
}

fn message(content: &str) -> Event {
    Event::Message {
        message: MessagePayload {
            id: Uuid::new_v4(),
            channel_id: "c1".into(),
            user_id: "viewer-a".into(),
            content: content.into(),
            created_at: Utc::now(),
        },
    }
}

#[tokio::test]
async fn cancelling_a_subscription_requeues_its_in_flight_entry_before_acking_it() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = Arc::new(FakeStream::new());
    let second_entry_delivered = Arc::clone(&server.second_entry_delivered);
    let state = Arc::clone(&server.state);
    tokio::spawn(Arc::clone(&server).run(listener));

    let config = DurableConfig {
        addrs: vec![addr.to_string()],
        username: None,
        password: None,
        stream_name: "events".into(),
        group_name: "gateway".into(),
        block_timeout: Duration::from_millis(200),
        buffer: 1,
        pool_size: 4,
        tls: None,
    };
    let queue = DurableQueue::new(config).await.expect("queue should connect");

    queue.publish(message("first")).await.expect("publish of first event failed");
    queue.publish(message("second")).await.expect("publish of second event failed");

    let subscription = queue.subscribe().await.expect("subscribe failed");

    second_entry_delivered.notified().await;
    tokio::time::sleep(Duration::from_millis(20)).await;
    subscription.close().await;

    let log = state.lock().await.log.clone();
    let xadd_count = log.iter().filter(|line| line.starts_with("XADD")).count();
    let xack_count = log.iter().filter(|line| line.starts_with("XACK")).count();
    assert_eq!(xadd_count, 3, "expected 2 original publishes plus 1 requeue, got {log:?}");
    assert_eq!(xack_count, 2, "expected both entries acknowledged, got {log:?}");
    assert!(log.iter().any(|l| l == "XGROUP CREATE"));

    // The requeued entry (the third XADD) must be acknowledged last, after
    // the original second entry — proof the requeue happened before the ack
    // that frees it from the consumer group's pending list.
    let third_xadd = log.iter().position(|l| l.starts_with("XADD") && l.contains("3-0"));
    let second_xack = log.iter().rposition(|l| l.starts_with("XACK"));
    assert!(third_xadd.is_some() && second_xack.is_some());
    assert!(third_xadd.unwrap() < second_xack.unwrap());
}
