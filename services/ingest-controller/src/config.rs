//! Environment-variable configuration, split Raw (all-`Option`, one read
//! per variable) → Validated.
//!
//! Each adapter's variable group validates independently: all-present or
//! all-absent is fine (absent ⇒ that adapter reports `unknown` at health
//! time and the orchestration operations below refuse to run); any other
//! mix is a fatal startup error — partial configuration for one adapter is
//! treated as a typo, not an intentional disable.

use std::time::Duration;

use ingest_adapters::application::ApplicationConfig;
use ingest_adapters::channel::ChannelConfig;
use ingest_adapters::transcoder::TranscoderConfig;
use ingest_adapters::{Rendition, RetryPolicy};
use url::Url;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("partial configuration for {0}: set all of its variables or none")]
    Partial(&'static str),
    #[error("invalid value for {name}: {detail}")]
    InvalidValue { name: &'static str, detail: String },
    #[error("RENDITION_LADDER must name at least one rendition")]
    EmptyLadder,
}

#[derive(Debug, Clone)]
pub struct ControllerConfig {
    pub channel: Option<ChannelConfig>,
    pub application: Option<ApplicationConfig>,
    pub transcoder: Option<TranscoderConfig>,
    pub ladder: Vec<Rendition>,
    pub boot_retry: RetryPolicy,
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

fn env_u32(name: &str, default: u32) -> Result<u32, ConfigError> {
    match env_var(name) {
        None => Ok(default),
        Some(raw) => raw.parse().map_err(|_| ConfigError::InvalidValue {
            name: leak(name),
            detail: format!("'{raw}' is not a valid count"),
        }),
    }
}

/// Names passed to `ConfigError` need `'static` but are always one of a
/// small fixed set of literals from this module, so leaking is bounded
/// and happens at most a handful of times per process lifetime.
fn leak(name: &str) -> &'static str {
    Box::leak(name.to_owned().into_boxed_str())
}

fn parse_url(name: &'static str, raw: &str) -> Result<Url, ConfigError> {
    raw.parse().map_err(|e| ConfigError::InvalidValue {
        name,
        detail: format!("'{raw}' is not a valid URL: {e}"),
    })
}

/// Parses `RENDITION_LADDER` as a JSON array of `{name, bitrate}`,
/// matching the `Rendition` wire shape used with the adapters themselves.
fn parse_ladder(raw: &str) -> Result<Vec<Rendition>, ConfigError> {
    let ladder: Vec<Rendition> =
        serde_json::from_str(raw).map_err(|e| ConfigError::InvalidValue {
            name: "RENDITION_LADDER",
            detail: format!("invalid JSON: {e}"),
        })?;
    if ladder.is_empty() {
        return Err(ConfigError::EmptyLadder);
    }
    Ok(ladder)
}

fn load_channel(health_path: &str, timeout: Duration, retry: RetryPolicy) -> Result<Option<ChannelConfig>, ConfigError> {
    let base_url = env_var("SRS_BASE_URL");
    let token = env_var("SRS_TOKEN");
    match (base_url, token) {
        (None, None) => Ok(None),
        (Some(base_url), Some(token)) => Ok(Some(ChannelConfig {
            base_url: parse_url("SRS_BASE_URL", &base_url)?,
            token,
            health_path: health_path.to_owned(),
            timeout,
            retry,
        })),
        _ => Err(ConfigError::Partial("SRS")),
    }
}

fn load_application(
    health_path: &str,
    timeout: Duration,
    retry: RetryPolicy,
) -> Result<Option<ApplicationConfig>, ConfigError> {
    let base_url = env_var("OME_BASE_URL");
    let username = env_var("OME_USERNAME");
    let password = env_var("OME_PASSWORD");
    match (&base_url, &username, &password) {
        (None, None, None) => Ok(None),
        (Some(base_url), Some(username), Some(password)) => Ok(Some(ApplicationConfig {
            base_url: parse_url("OME_BASE_URL", base_url)?,
            username: username.clone(),
            password: password.clone(),
            health_path: health_path.to_owned(),
            timeout,
            retry,
        })),
        _ => Err(ConfigError::Partial("OME")),
    }
}

fn load_transcoder(
    health_path: &str,
    timeout: Duration,
    retry: RetryPolicy,
) -> Result<Option<TranscoderConfig>, ConfigError> {
    let base_url = env_var("TRANSCODER_BASE_URL");
    let token = env_var("TRANSCODER_TOKEN");
    match (base_url, token) {
        (None, None) => Ok(None),
        (Some(base_url), Some(token)) => Ok(Some(TranscoderConfig {
            base_url: parse_url("TRANSCODER_BASE_URL", &base_url)?,
            token,
            health_path: health_path.to_owned(),
            timeout,
            retry,
        })),
        _ => Err(ConfigError::Partial("transcoder")),
    }
}

impl ControllerConfig {
    pub fn load_from_env() -> Result<Self, ConfigError> {
        let health_path = env_var("HEALTH_PATH").unwrap_or_else(|| "/healthz".to_owned());
        let http_max_attempts = env_u32("HTTP_MAX_ATTEMPTS", 3)?;
        let http_retry_interval = env_duration_ms("HTTP_RETRY_INTERVAL", 200)?;
        let http_retry = RetryPolicy::new(http_max_attempts, http_retry_interval);
        let http_timeout = env_duration_ms("HTTP_TIMEOUT", 10_000)?;

        let channel = load_channel(&health_path, http_timeout, http_retry)?;
        let application = load_application(&health_path, http_timeout, http_retry)?;
        let transcoder = load_transcoder(&health_path, http_timeout, http_retry)?;

        let ladder = match env_var("RENDITION_LADDER") {
            Some(raw) => parse_ladder(&raw)?,
            None => Vec::new(),
        };

        let boot_max_attempts = env_u32("MAX_BOOT_ATTEMPTS", 1)?;
        let boot_retry_interval = env_duration_ms("RETRY_INTERVAL", 0)?;

        Ok(Self {
            channel,
            application,
            transcoder,
            ladder,
            boot_retry: RetryPolicy::new(boot_max_attempts, boot_retry_interval),
        })
    }

    /// All three adapters present and a non-empty ladder — the gate for
    /// orchestration operations. Health checks work regardless.
    pub fn fully_configured(&self) -> bool {
        self.channel.is_some()
            && self.application.is_some()
            && self.transcoder.is_some()
            && !self.ladder.is_empty()
    }
}
