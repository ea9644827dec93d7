//! Transcoder adapter — job runner for live renditions and VOD uploads,
//! bearer auth.

use std::time::Duration;

use reqwest::Method;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::auth::AuthMode;
use crate::error::AdapterError;
use crate::health::probe;
use crate::http::{send_json, send_no_content, HttpTarget};
use crate::retry::{retry_with_backoff, RetryPolicy};
use crate::types::{
    HealthStatus, Rendition, StartJobsRequest, StartJobsResponse, SubmitUploadRequest,
    SubmitUploadResponse,
};

#[derive(Debug, Clone)]
pub struct TranscoderConfig {
    pub base_url: Url,
    pub token: String,
    pub health_path: String,
    pub timeout: Duration,
    pub retry: RetryPolicy,
}

pub struct TranscoderAdapter {
    client: reqwest::Client,
    target: HttpTarget,
    health_path: String,
    retry: RetryPolicy,
}

#[derive(Debug, Clone)]
pub struct StartedJobs {
    pub job_ids: Vec<String>,
    pub renditions: Vec<Rendition>,
}

#[derive(Debug, Clone)]
pub struct SubmittedUpload {
    pub job_id: String,
    pub playback_url: String,
    pub renditions: Vec<Rendition>,
}

impl TranscoderAdapter {
    pub fn new(client: reqwest::Client, config: TranscoderConfig) -> Self {
        Self {
            target: HttpTarget {
                base_url: config.base_url,
                auth: AuthMode::Bearer(config.token),
                timeout: config.timeout,
            },
            client,
            health_path: config.health_path,
            retry: config.retry,
        }
    }

    pub async fn start_jobs(
        &self,
        channel_id: &str,
        session_id: &str,
        origin_url: &str,
        ladder: &[Rendition],
        cancel: &CancellationToken,
    ) -> Result<StartedJobs, AdapterError> {
        let request = StartJobsRequest {
            channel_id,
            session_id,
            origin_url,
            renditions: ladder,
        };
        let response: StartJobsResponse = retry_with_backoff(self.retry, cancel, || {
            send_json(&self.client, &self.target, Method::POST, "/v1/jobs", Some(&request))
        })
        .await?;
        let job_ids = response.all_job_ids();
        Ok(StartedJobs {
            job_ids,
            renditions: response.renditions,
        })
    }

    pub async fn stop_job(
        &self,
        job_id: &str,
        cancel: &CancellationToken,
    ) -> Result<(), AdapterError> {
        let path = format!("/v1/jobs/{job_id}");
        retry_with_backoff(self.retry, cancel, || {
            send_no_content::<()>(&self.client, &self.target, Method::DELETE, &path, None)
        })
        .await
    }

    pub async fn submit_upload(
        &self,
        channel_id: &str,
        upload_id: &str,
        source_url: &str,
        filename: Option<&str>,
        renditions: Option<&[Rendition]>,
        cancel: &CancellationToken,
    ) -> Result<SubmittedUpload, AdapterError> {
        let request = SubmitUploadRequest {
            channel_id,
            upload_id,
            source_url,
            filename,
            renditions,
        };
        let response: SubmitUploadResponse = retry_with_backoff(self.retry, cancel, || {
            send_json(&self.client, &self.target, Method::POST, "/v1/uploads", Some(&request))
        })
        .await?;
        Ok(SubmittedUpload {
            job_id: response.job_id,
            playback_url: response.playback_url,
            renditions: response.renditions,
        })
    }

    pub async fn health(&self) -> HealthStatus {
        probe(
            &self.client,
            "transcoder",
            Some(&self.target.base_url),
            &self.health_path,
            Some(&self.target.auth),
            self.target.timeout,
        )
        .await
    }
}
