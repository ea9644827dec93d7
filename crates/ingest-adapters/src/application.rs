//! Application adapter — OME-shaped playback origin, HTTP Basic auth.

use std::time::Duration;

use reqwest::Method;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::auth::AuthMode;
use crate::error::AdapterError;
use crate::health::probe;
use crate::http::{send_json, send_no_content, HttpTarget};
use crate::retry::{retry_with_backoff, RetryPolicy};
use crate::types::{CreateApplicationRequest, CreateApplicationResponse, HealthStatus, Rendition};

#[derive(Debug, Clone)]
pub struct ApplicationConfig {
    pub base_url: Url,
    pub username: String,
    pub password: String,
    pub health_path: String,
    pub timeout: Duration,
    pub retry: RetryPolicy,
}

pub struct ApplicationAdapter {
    client: reqwest::Client,
    target: HttpTarget,
    health_path: String,
    retry: RetryPolicy,
}

#[derive(Debug, Clone)]
pub struct CreatedApplication {
    pub origin_url: String,
    pub playback_url: String,
}

impl ApplicationAdapter {
    pub fn new(client: reqwest::Client, config: ApplicationConfig) -> Self {
        Self {
            target: HttpTarget {
                base_url: config.base_url,
                auth: AuthMode::Basic {
                    username: config.username,
                    password: config.password,
                },
                timeout: config.timeout,
            },
            client,
            health_path: config.health_path,
            retry: config.retry,
        }
    }

    pub async fn create(
        &self,
        channel_id: &str,
        renditions: &[Rendition],
        cancel: &CancellationToken,
    ) -> Result<CreatedApplication, AdapterError> {
        let request = CreateApplicationRequest {
            channel_id,
            renditions,
        };
        let response: CreateApplicationResponse = retry_with_backoff(self.retry, cancel, || {
            send_json(
                &self.client,
                &self.target,
                Method::POST,
                "/v1/applications",
                Some(&request),
            )
        })
        .await?;
        Ok(CreatedApplication {
            origin_url: response.origin_url,
            playback_url: response.playback_url,
        })
    }

    pub async fn delete(
        &self,
        channel_id: &str,
        cancel: &CancellationToken,
    ) -> Result<(), AdapterError> {
        let path = format!("/v1/applications/{channel_id}");
        retry_with_backoff(self.retry, cancel, || {
            send_no_content::<()>(&self.client, &self.target, Method::DELETE, &path, None)
        })
        .await
    }

    pub async fn health(&self) -> HealthStatus {
        probe(
            &self.client,
            "ome",
            Some(&self.target.base_url),
            &self.health_path,
            Some(&self.target.auth),
            self.target.timeout,
        )
        .await
    }
}
