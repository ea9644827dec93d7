//! Durable stream backend: a RESP-like wire protocol to an external
//! append-only stream with consumer groups (`XADD`/`XGROUP`/`XREADGROUP`/
//! `XACK`), per `ws_wire::resp`.
//!
//! Reads go one entry at a time (`COUNT 1`) so there is never more than one
//! undelivered-but-already-read entry in flight per subscriber — the "at
//! risk" entry the cancellation invariant is about.

use std::time::Duration;

use async_trait::async_trait;
use chat_domain::Event;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot, Mutex};
use uuid::Uuid;
use ws_wire::resp::{self, RespValue};

use crate::tls::{MaybeTlsStream, TlsConfig};
use crate::{EventQueue, QueueError, Subscription};

/// Configuration for the durable stream backend.
#[derive(Debug, Clone)]
pub struct DurableConfig {
    pub addrs: Vec<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub stream_name: String,
    pub group_name: String,
    pub block_timeout: Duration,
    pub buffer: usize,
    pub pool_size: usize,
    pub tls: Option<TlsConfig>,
}

pub struct DurableQueue {
    config: DurableConfig,
    pool: Mutex<Vec<StreamConn>>,
    group_ready: Mutex<bool>,
}

impl DurableQueue {
    /// Connects and idempotently creates the consumer group.
    ///
    /// If the group already exists the creation error is swallowed. Any
    /// other error at construction is not fatal — it is retried on the
    /// first `publish` or `subscribe` call.
    pub async fn new(config: DurableConfig) -> Result<Self, QueueError> {
        let queue = Self {
            config,
            pool: Mutex::new(Vec::new()),
            group_ready: Mutex::new(false),
        };
        let _ = queue.ensure_group().await;
        Ok(queue)
    }

    async fn ensure_group(&self) -> Result<(), QueueError> {
        {
            let ready = self.group_ready.lock().await;
            if *ready {
                return Ok(());
            }
        }
        let mut conn = self.acquire().await?;
        let cmd = resp::encode_command([
            "XGROUP",
            "CREATE",
            &self.config.stream_name,
            &self.config.group_name,
            "$",
            "MKSTREAM",
        ]);
        let outcome = async {
            conn.send_raw(&cmd).await?;
            conn.read_reply().await
        }
        .await;
        match outcome {
            Ok(RespValue::Simple(_)) => {
                self.release(conn).await;
                *self.group_ready.lock().await = true;
                Ok(())
            }
            Ok(RespValue::Error(msg)) if msg.contains("BUSYGROUP") => {
                self.release(conn).await;
                *self.group_ready.lock().await = true;
                Ok(())
            }
            Ok(RespValue::Error(msg)) => {
                self.release(conn).await;
                Err(QueueError::Upstream(msg))
            }
            Ok(_) => {
                self.release(conn).await;
                Err(QueueError::Protocol("unexpected XGROUP CREATE reply".into()))
            }
            Err(e) => Err(e),
        }
    }

    async fn acquire(&self) -> Result<StreamConn, QueueError> {
        {
            let mut pool = self.pool.lock().await;
            if let Some(conn) = pool.pop() {
                return Ok(conn);
            }
        }
        StreamConn::connect(&self.config).await
    }

    async fn release(&self, conn: StreamConn) {
        let mut pool = self.pool.lock().await;
        if pool.len() < self.config.pool_size {
            pool.push(conn);
        }
    }
}

#[async_trait]
impl EventQueue for DurableQueue {
    async fn publish(&self, event: Event) -> Result<(), QueueError> {
        self.ensure_group().await?;
        let payload = serde_json::to_string(&event)?;
        let mut conn = self.acquire().await?;
        let cmd = resp::encode_command(["XADD", &self.config.stream_name, "*", "payload", &payload]);
        let outcome = async {
            conn.send_raw(&cmd).await?;
            conn.read_reply().await
        }
        .await;
        match outcome {
            Ok(RespValue::Bulk(Some(_))) | Ok(RespValue::Simple(_)) => {
                self.release(conn).await;
                Ok(())
            }
            Ok(RespValue::Error(msg)) => {
                self.release(conn).await;
                Err(QueueError::Upstream(msg))
            }
            Ok(_) => {
                self.release(conn).await;
                Err(QueueError::Protocol("unexpected XADD reply".into()))
            }
            Err(e) => Err(e),
        }
    }

    async fn subscribe(&self) -> Result<Subscription, QueueError> {
        self.ensure_group().await?;
        let config = self.config.clone();
        let consumer_id = format!("consumer-{}", Uuid::new_v4());
        let (out_tx, out_rx) = mpsc::channel(config.buffer);
        let (cancel_tx, cancel_rx) = oneshot::channel();
        let task = tokio::spawn(run_subscriber(config, consumer_id, out_tx, cancel_rx));
        Ok(Subscription::new(out_rx, cancel_tx, task))
    }
}

async fn run_subscriber(
    config: DurableConfig,
    consumer_id: String,
    out_tx: mpsc::Sender<Event>,
    mut cancel_rx: oneshot::Receiver<()>,
) {
    let mut conn = match StreamConn::connect(&config).await {
        Ok(conn) => conn,
        Err(e) => {
            tracing::warn!(error = %e, "durable queue subscriber failed to connect");
            return;
        }
    };

    loop {
        tokio::select! {
            biased;
            _ = &mut cancel_rx => break,
            read_result = read_one_entry(&mut conn, &config, &consumer_id) => {
                match read_result {
                    Ok(Some((id, event))) => {
                        tokio::select! {
                            biased;
                            _ = &mut cancel_rx => {
                                requeue_and_ack(&mut conn, &config, &id, event).await;
                                break;
                            }
                            send_result = out_tx.send(event.clone()) => {
                                if send_result.is_ok() {
                                    let _ = ack(&mut conn, &config, &id).await;
                                } else {
                                    requeue_and_ack(&mut conn, &config, &id, event).await;
                                    break;
                                }
                            }
                        }
                    }
                    Ok(None) => continue,
                    Err(e) => {
                        tracing::warn!(error = %e, "durable queue read error, reconnecting");
                        match StreamConn::connect(&config).await {
                            Ok(new_conn) => conn = new_conn,
                            Err(e) => {
                                tracing::warn!(error = %e, "durable queue reconnect failed");
                                tokio::time::sleep(Duration::from_millis(500)).await;
                            }
                        }
                    }
                }
            }
        }
    }
    // Dropping `out_tx` here closes the subscriber's output channel,
    // transitioning it to the terminal `closed` state.
}

async fn read_one_entry(
    conn: &mut StreamConn,
    config: &DurableConfig,
    consumer_id: &str,
) -> Result<Option<(String, Event)>, QueueError> {
    let block_ms = config.block_timeout.as_millis().to_string();
    let cmd = resp::encode_command([
        "XREADGROUP",
        "GROUP",
        &config.group_name,
        consumer_id,
        "COUNT",
        "1",
        "BLOCK",
        &block_ms,
        "STREAMS",
        &config.stream_name,
        ">",
    ]);
    conn.send_raw(&cmd).await?;

    let client_timeout = config.block_timeout + Duration::from_secs(5);
    let reply = tokio::time::timeout(client_timeout, conn.read_reply())
        .await
        .map_err(|_| QueueError::Transport("timed out waiting for XREADGROUP reply".into()))??;

    match extract_single_entry(&reply) {
        None => Ok(None),
        Some((id, payload)) => match serde_json::from_slice::<Event>(&payload) {
            Ok(event) => Ok(Some((id, event))),
            Err(e) => {
                tracing::warn!(error = %e, entry_id = %id, "dropping undecodable queue entry");
                let _ = ack(conn, config, &id).await;
                Ok(None)
            }
        },
    }
}

/// Pulls the single `(id, payload bytes)` pair out of an
/// `XREADGROUP ... COUNT 1` reply shaped as
/// `[[stream_name, [[id, [field, value, ...]]]]]`, or `None` for the null
/// array the server sends when the block timeout elapses with no entries.
fn extract_single_entry(value: &RespValue) -> Option<(String, Vec<u8>)> {
    let streams = value.as_array()?;
    let stream_entry = streams.first()?.as_array()?;
    let entries = stream_entry.get(1)?.as_array()?;
    let entry = entries.first()?.as_array()?;
    let id = entry.first()?.as_bulk_str()?.to_owned();
    let fields = entry.get(1)?.as_array()?;

    let mut iter = fields.iter();
    while let (Some(name), Some(val)) = (iter.next(), iter.next()) {
        if name.as_bulk_str() == Some("payload") {
            if let RespValue::Bulk(Some(bytes)) = val {
                return Some((id, bytes.clone()));
            }
        }
    }
    None
}

async fn ack(conn: &mut StreamConn, config: &DurableConfig, id: &str) -> Result<(), QueueError> {
    let cmd = resp::encode_command(["XACK", &config.stream_name, &config.group_name, id]);
    conn.send_raw(&cmd).await?;
    conn.read_reply().await?;
    Ok(())
}

/// Re-publishes `event` and, only if that succeeds, acknowledges the
/// original entry so it leaves this consumer's pending list. If the
/// re-publish fails the entry is left unacknowledged — it remains pending
/// for the group and is available to a future consumer.
async fn requeue_and_ack(conn: &mut StreamConn, config: &DurableConfig, id: &str, event: Event) {
    let payload = match serde_json::to_string(&event) {
        Ok(p) => p,
        Err(e) => {
            tracing::warn!(error = %e, "failed to encode event for requeue");
            return;
        }
    };
    let cmd = resp::encode_command(["XADD", &config.stream_name, "*", "payload", &payload]);
    let republished = async {
        conn.send_raw(&cmd).await?;
        conn.read_reply().await
    }
    .await;

    match republished {
        Ok(RespValue::Bulk(Some(_))) | Ok(RespValue::Simple(_)) => {
            let _ = ack(conn, config, id).await;
        }
        _ => {
            tracing::warn!(entry_id = %id, "requeue failed; entry remains pending for the group");
        }
    }
}

/// One TCP (or TLS) connection to the stream backend plus its read buffer.
struct StreamConn {
    stream: MaybeTlsStream,
    buf: Vec<u8>,
}

impl StreamConn {
    async fn connect(config: &DurableConfig) -> Result<Self, QueueError> {
        let mut last_err = None;
        for addr in &config.addrs {
            match Self::connect_one(addr, config).await {
                Ok(conn) => return Ok(conn),
                Err(e) => last_err = Some(e),
            }
        }
        Err(last_err.unwrap_or_else(|| QueueError::Transport("no stream addresses configured".into())))
    }

    async fn connect_one(addr: &str, config: &DurableConfig) -> Result<Self, QueueError> {
        let tcp = TcpStream::connect(addr)
            .await
            .map_err(|e| QueueError::Transport(format!("connecting to {addr}: {e}")))?;
        let stream = match &config.tls {
            Some(tls) => {
                let host = addr.split(':').next().unwrap_or(addr);
                MaybeTlsStream::Tls(Box::new(tls.connect(host, tcp).await?))
            }
            None => MaybeTlsStream::Plain(tcp),
        };
        let mut conn = Self { stream, buf: Vec::new() };
        if let Some(password) = &config.password {
            conn.auth(config.username.as_deref(), password).await?;
        }
        Ok(conn)
    }

    async fn auth(&mut self, username: Option<&str>, password: &str) -> Result<(), QueueError> {
        let cmd = match username {
            Some(user) => resp::encode_command(["AUTH", user, password]),
            None => resp::encode_command(["AUTH", password]),
        };
        self.send_raw(&cmd).await?;
        match self.read_reply().await? {
            RespValue::Simple(_) => Ok(()),
            RespValue::Error(e) => Err(QueueError::Upstream(e)),
            _ => Err(QueueError::Protocol("unexpected AUTH reply".into())),
        }
    }

    async fn send_raw(&mut self, bytes: &[u8]) -> Result<(), QueueError> {
        self.stream
            .write_all(bytes)
            .await
            .map_err(|e| QueueError::Transport(e.to_string()))
    }

    async fn read_reply(&mut self) -> Result<RespValue, QueueError> {
        loop {
            if let Some((value, consumed)) =
                resp::parse(&self.buf).map_err(|e| QueueError::Protocol(e.to_string()))?
            {
                self.buf.drain(..consumed);
                return Ok(value);
            }
            let mut chunk = [0u8; 4096];
            let n = self
                .stream
                .read(&mut chunk)
                .await
                .map_err(|e| QueueError::Transport(e.to_string()))?;
            if n == 0 {
                return Err(QueueError::Transport("connection closed by peer".into()));
            }
            self.buf.extend_from_slice(&chunk[..n]);
        }
    }
}
