//! HTTP clients for the three external control planes a live pipeline is
//! provisioned across (RTMP ingest, playback origin, transcoder job
//! runner), plus the retry/backoff and health-probe machinery shared by
//! all three.
//!
//! Orchestration (boot/shutdown/rollback) lives one layer up, in the
//! ingest-controller service — this crate only knows how to talk to one
//! adapter at a time.

pub mod application;
pub mod auth;
pub mod channel;
pub mod error;
pub mod health;
pub mod http;
pub mod retry;
pub mod transcoder;
pub mod types;

pub use application::{ApplicationAdapter, ApplicationConfig, CreatedApplication};
pub use auth::AuthMode;
pub use channel::{ChannelAdapter, ChannelConfig, CreatedChannel};
pub use error::AdapterError;
pub use retry::RetryPolicy;
pub use transcoder::{StartedJobs, SubmittedUpload, TranscoderAdapter, TranscoderConfig};
pub use types::{HealthState, HealthStatus, IngestSession, Rendition};
