//! Orchestrates the three adapters into boot/shutdown/upload operations,
//! with compensating rollback on a partial boot failure.

use ingest_adapters::application::ApplicationAdapter;
use ingest_adapters::channel::ChannelAdapter;
use ingest_adapters::transcoder::{SubmittedUpload, TranscoderAdapter};
use ingest_adapters::{AdapterError, HealthStatus, IngestSession, Rendition, RetryPolicy};
use tokio_util::sync::CancellationToken;

use crate::config::ControllerConfig;
use crate::rollback::BootState;

#[derive(Debug, thiserror::Error)]
pub enum ControllerError {
    /// The controller has no adapters configured — boot/shutdown/upload
    /// are no-ops in this state; only `health_checks` still runs (per
    /// adapter, reporting `unknown` for whichever ones are absent).
    #[error("ingest controller is not configured")]
    Disabled,

    #[error(transparent)]
    Adapter(#[from] AdapterError),

    /// One combined error from a shutdown that hit more than one failure;
    /// the first-seen root cause is logged separately so it isn't lost in
    /// the combined message.
    #[error("shutdown encountered {} error(s): {}", .0.len(), .0.join("; "))]
    Aggregate(Vec<String>),
}

pub struct Controller {
    channel: Option<ChannelAdapter>,
    application: Option<ApplicationAdapter>,
    transcoder: Option<TranscoderAdapter>,
    ladder: Vec<Rendition>,
    boot_retry: RetryPolicy,
}

impl Controller {
    pub fn new(http_client: reqwest::Client, config: ControllerConfig) -> Self {
        Self {
            channel: config.channel.map(|c| ChannelAdapter::new(http_client.clone(), c)),
            application: config
                .application
                .map(|c| ApplicationAdapter::new(http_client.clone(), c)),
            transcoder: config.transcoder.map(|c| TranscoderAdapter::new(http_client, c)),
            ladder: config.ladder,
            boot_retry: config.boot_retry,
        }
    }

    pub fn fully_configured(&self) -> bool {
        self.channel.is_some() && self.application.is_some() && self.transcoder.is_some()
    }

    pub async fn boot_stream(
        &self,
        channel_id: &str,
        session_id: &str,
        stream_key: &str,
        cancel: &CancellationToken,
    ) -> Result<IngestSession, ControllerError> {
        let (channel, application, transcoder) = match (&self.channel, &self.application, &self.transcoder) {
            (Some(c), Some(a), Some(t)) => (c, a, t),
            _ => return Err(ControllerError::Disabled),
        };

        let mut attempt = 0;
        loop {
            attempt += 1;
            match self
                .try_boot_once(channel, application, transcoder, channel_id, session_id, stream_key, cancel)
                .await
            {
                Ok(session) => return Ok(session),
                Err((err, state)) => {
                    self.rollback(channel, application, state, channel_id, cancel).await;
                    if attempt >= self.boot_retry.max_attempts || matches!(err, AdapterError::Cancelled) {
                        return Err(err.into());
                    }
                    tracing::warn!(attempt, channel_id, error = %err, "boot attempt failed, retrying after rollback");
                    if !self.boot_retry.interval.is_zero() {
                        tokio::select! {
                            biased;
                            () = cancel.cancelled() => return Err(AdapterError::Cancelled.into()),
                            () = tokio::time::sleep(self.boot_retry.interval) => {}
                        }
                    }
                }
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    async fn try_boot_once(
        &self,
        channel: &ChannelAdapter,
        application: &ApplicationAdapter,
        transcoder: &TranscoderAdapter,
        channel_id: &str,
        session_id: &str,
        stream_key: &str,
        cancel: &CancellationToken,
    ) -> Result<IngestSession, (AdapterError, BootState)> {
        let mut state = BootState::None;

        let created_channel = channel
            .create(channel_id, stream_key, cancel)
            .await
            .map_err(|e| (e, state))?;
        state = state.advance();

        let created_application = application
            .create(channel_id, &self.ladder, cancel)
            .await
            .map_err(|e| (e, state))?;
        state = state.advance();

        let started_jobs = transcoder
            .start_jobs(channel_id, session_id, &created_application.origin_url, &self.ladder, cancel)
            .await
            .map_err(|e| (e, state))?;

        let renditions = if started_jobs.renditions.is_empty() {
            self.ladder.clone()
        } else {
            started_jobs.renditions
        };

        Ok(IngestSession {
            channel_id: channel_id.to_owned(),
            session_id: session_id.to_owned(),
            primary_ingest: created_channel.primary_ingest,
            backup_ingest: created_channel.backup_ingest,
            origin_url: created_application.origin_url,
            playback_url: created_application.playback_url,
            renditions,
            job_ids: started_jobs.job_ids,
        })
    }

    /// Best-effort teardown of whatever was achieved before the failure;
    /// every applicable delete is attempted even if an earlier one fails.
    async fn rollback(
        &self,
        channel: &ChannelAdapter,
        application: &ApplicationAdapter,
        state: BootState,
        channel_id: &str,
        cancel: &CancellationToken,
    ) {
        if matches!(state, BootState::ApplicationCreated | BootState::JobsStarted) {
            if let Err(e) = application.delete(channel_id, cancel).await {
                tracing::error!(channel_id, error = %e, "rollback: deleting application failed");
            }
        }
        if matches!(
            state,
            BootState::ChannelCreated | BootState::ApplicationCreated | BootState::JobsStarted
        ) {
            if let Err(e) = channel.delete(channel_id, cancel).await {
                tracing::error!(channel_id, error = %e, "rollback: deleting channel failed");
            }
        }
    }

    /// Stops each job, deletes the application, deletes the channel — all
    /// attempted even if an earlier step fails; errors are aggregated.
    pub async fn shutdown_stream(
        &self,
        channel_id: &str,
        job_ids: &[String],
        cancel: &CancellationToken,
    ) -> Result<(), ControllerError> {
        let (channel, application, transcoder) = match (&self.channel, &self.application, &self.transcoder) {
            (Some(c), Some(a), Some(t)) => (c, a, t),
            _ => return Err(ControllerError::Disabled),
        };

        let mut errors = Vec::new();
        for job_id in job_ids {
            if let Err(e) = transcoder.stop_job(job_id, cancel).await {
                errors.push(format!("stopping job {job_id}: {e}"));
            }
        }
        if let Err(e) = application.delete(channel_id, cancel).await {
            errors.push(format!("deleting application {channel_id}: {e}"));
        }
        if let Err(e) = channel.delete(channel_id, cancel).await {
            errors.push(format!("deleting channel {channel_id}: {e}"));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ControllerError::Aggregate(errors))
        }
    }

    /// No compensating cleanup: an upload job is a single-step operation.
    pub async fn transcode_upload(
        &self,
        channel_id: &str,
        upload_id: &str,
        source_url: &str,
        filename: Option<&str>,
        renditions: Option<&[Rendition]>,
        cancel: &CancellationToken,
    ) -> Result<SubmittedUpload, ControllerError> {
        let transcoder = self.transcoder.as_ref().ok_or(ControllerError::Disabled)?;
        transcoder
            .submit_upload(channel_id, upload_id, source_url, filename, renditions, cancel)
            .await
            .map_err(Into::into)
    }

    /// Per-adapter health, independent of the boot/shutdown/upload gate:
    /// an adapter that was simply never configured reports `unknown`
    /// without issuing any HTTP call, regardless of its siblings.
    pub async fn health_checks(&self) -> Vec<HealthStatus> {
        let srs = match &self.channel {
            Some(adapter) => adapter.health().await,
            None => HealthStatus::unknown("srs", "base URL not configured"),
        };
        let ome = match &self.application {
            Some(adapter) => adapter.health().await,
            None => HealthStatus::unknown("ome", "base URL not configured"),
        };
        let transcoder = match &self.transcoder {
            Some(adapter) => adapter.health().await,
            None => HealthStatus::unknown("transcoder", "base URL not configured"),
        };
        vec![srs, ome, transcoder]
    }
}
