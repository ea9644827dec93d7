//! Channel adapter — SRS-shaped RTMP ingest control plane, bearer auth.

use std::time::Duration;

use reqwest::Method;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::auth::AuthMode;
use crate::error::AdapterError;
use crate::health::probe;
use crate::http::{send_json, send_no_content, HttpTarget};
use crate::retry::{retry_with_backoff, RetryPolicy};
use crate::types::{CreateChannelRequest, CreateChannelResponse, HealthStatus};

#[derive(Debug, Clone)]
pub struct ChannelConfig {
    pub base_url: Url,
    pub token: String,
    pub health_path: String,
    pub timeout: Duration,
    pub retry: RetryPolicy,
}

pub struct ChannelAdapter {
    client: reqwest::Client,
    target: HttpTarget,
    health_path: String,
    retry: RetryPolicy,
}

/// Created by a successful `create`; passed back unchanged to `delete`
/// during teardown or rollback.
#[derive(Debug, Clone)]
pub struct CreatedChannel {
    pub primary_ingest: String,
    pub backup_ingest: Option<String>,
}

impl ChannelAdapter {
    pub fn new(client: reqwest::Client, config: ChannelConfig) -> Self {
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

    pub async fn create(
        &self,
        channel_id: &str,
        stream_key: &str,
        cancel: &CancellationToken,
    ) -> Result<CreatedChannel, AdapterError> {
        let request = CreateChannelRequest {
            channel_id,
            stream_key,
        };
        let response: CreateChannelResponse =
            retry_with_backoff(self.retry, cancel, || {
                send_json(&self.client, &self.target, Method::POST, "/v1/channels", Some(&request))
            })
            .await?;
        Ok(CreatedChannel {
            primary_ingest: response.primary_ingest,
            backup_ingest: response.backup_ingest,
        })
    }

    pub async fn delete(
        &self,
        channel_id: &str,
        cancel: &CancellationToken,
    ) -> Result<(), AdapterError> {
        let path = format!("/v1/channels/{channel_id}");
        retry_with_backoff(self.retry, cancel, || {
            send_no_content::<()>(&self.client, &self.target, Method::DELETE, &path, None)
        })
        .await
    }

    pub async fn health(&self) -> HealthStatus {
        probe(
            &self.client,
            "srs",
            Some(&self.target.base_url),
            &self.health_path,
            Some(&self.target.auth),
            self.target.timeout,
        )
        .await
    }
}
