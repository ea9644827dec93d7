//! Environment-variable configuration for the gateway binary, following the
//! same `env_var`/leaked-literal-name shape as
//! `services/ingest-controller/src/config.rs` (itself adapted from the
//! teacher's TOML Raw→Validated split).

use std::time::Duration;

use event_queue::{DurableConfig, TlsConfig};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for {name}: {detail}")]
    InvalidValue { name: &'static str, detail: String },
}

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub bind_addr: String,
    /// `None` runs against the in-process queue only — fine for a
    /// single-instance deployment or tests, but events never reach a
    /// persistence worker running out-of-process.
    pub durable_queue: Option<DurableConfig>,
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

fn env_duration_ms(name: &str, default_ms: u64) -> Result<Duration, ConfigError> {
    match env_var(name) {
        None => Ok(Duration::from_millis(default_ms)),
        Some(raw) => {
            let ms: u64 = raw.parse().map_err(|_| ConfigError::InvalidValue {
                name: leak(name),
                detail: format!("'{raw}' is not a valid millisecond count"),
            })?;
            Ok(Duration::from_millis(ms))
        }
    }
}

fn env_usize(name: &str, default: usize) -> Result<usize, ConfigError> {
    match env_var(name) {
        None => Ok(default),
        Some(raw) => raw.parse().map_err(|_| ConfigError::InvalidValue {
            name: leak(name),
            detail: format!("'{raw}' is not a valid count"),
        }),
    }
}

fn env_bool(name: &'static str, default: bool) -> Result<bool, ConfigError> {
    match env_var(name) {
        None => Ok(default),
        Some(raw) => raw.parse().map_err(|_| ConfigError::InvalidValue {
            name,
            detail: format!("'{raw}' is not a valid bool"),
        }),
    }
}

fn leak(name: &str) -> &'static str {
    Box::leak(name.to_owned().into_boxed_str())
}

fn load_durable_queue() -> Result<Option<DurableConfig>, ConfigError> {
    let Some(raw_addrs) = env_var("QUEUE_ADDR") else {
        return Ok(None);
    };
    let addrs: Vec<String> = raw_addrs.split(',').map(|s| s.trim().to_owned()).collect();

    let tls = if env_bool("QUEUE_TLS", false)? {
        Some(TlsConfig {
            ca_path: env_var("QUEUE_TLS_CA"),
            cert_path: env_var("QUEUE_TLS_CERT"),
            key_path: env_var("QUEUE_TLS_KEY"),
            server_name: env_var("QUEUE_TLS_SERVER_NAME"),
            skip_verify: env_bool("QUEUE_TLS_SKIP_VERIFY", false)?,
        })
    } else {
        None
    };

    Ok(Some(DurableConfig {
        addrs,
        username: env_var("QUEUE_USERNAME"),
        password: env_var("QUEUE_PASSWORD"),
        stream_name: env_var("QUEUE_STREAM").unwrap_or_else(|| "chat-events".to_owned()),
        group_name: env_var("QUEUE_GROUP").unwrap_or_else(|| "chat-gateway".to_owned()),
        block_timeout: env_duration_ms("QUEUE_BLOCK_TIMEOUT_MS", 5_000)?,
        buffer: env_usize("QUEUE_BUFFER", 256)?,
        pool_size: env_usize("QUEUE_POOL_SIZE", 4)?,
        tls,
    }))
}

impl GatewayConfig {
    pub fn load_from_env() -> Result<Self, ConfigError> {
        let bind_addr = env_var("BIND_ADDR").unwrap_or_else(|| "0.0.0.0:8081".to_owned());
        let durable_queue = load_durable_queue()?;
        Ok(Self { bind_addr, durable_queue })
    }
}
