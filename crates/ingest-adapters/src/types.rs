//! Shared data shapes crossing the adapter boundary.

use serde::{Deserialize, Serialize};

/// An output profile the transcoder produces: `{name, bitrate?}`, plus an
/// optional manifest URL once a rendition is actually serving.
///
/// The ladder configured at startup is cloned into each boot request so a
/// caller who later holds only a shared reference to the configured
/// ladder cannot mutate a request already in flight.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rendition {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manifest_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bitrate: Option<u32>,
}

/// `{component, status, detail?}` — the result of one health probe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub component: String,
    pub status: HealthState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthState {
    Ok,
    Error,
    Unknown,
    Disabled,
}

impl HealthStatus {
    pub fn ok(component: impl Into<String>) -> Self {
        Self {
            component: component.into(),
            status: HealthState::Ok,
            detail: None,
        }
    }

    pub fn error(component: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            component: component.into(),
            status: HealthState::Error,
            detail: Some(detail.into()),
        }
    }

    pub fn unknown(component: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            component: component.into(),
            status: HealthState::Unknown,
            detail: Some(detail.into()),
        }
    }

    pub fn disabled(component: impl Into<String>) -> Self {
        Self {
            component: component.into(),
            status: HealthState::Disabled,
            detail: None,
        }
    }
}

/// The state a live pipeline settles into after a successful boot.
/// Dissolved by shutdown or rollback — there is no "paused" state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestSession {
    pub channel_id: String,
    pub session_id: String,
    pub primary_ingest: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backup_ingest: Option<String>,
    pub origin_url: String,
    pub playback_url: String,
    pub renditions: Vec<Rendition>,
    pub job_ids: Vec<String>,
}

// --- Channel adapter (SRS-shaped) wire shapes --------------------------

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateChannelRequest<'a> {
    pub channel_id: &'a str,
    pub stream_key: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateChannelResponse {
    pub primary_ingest: String,
    #[serde(default)]
    pub backup_ingest: Option<String>,
}

// --- Application adapter (OME-shaped) wire shapes ----------------------

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateApplicationRequest<'a> {
    pub channel_id: &'a str,
    pub renditions: &'a [Rendition],
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateApplicationResponse {
    pub origin_url: String,
    pub playback_url: String,
}

// --- Transcoder adapter wire shapes -------------------------------------

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StartJobsRequest<'a> {
    pub channel_id: &'a str,
    pub session_id: &'a str,
    pub origin_url: &'a str,
    pub renditions: &'a [Rendition],
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartJobsResponse {
    #[serde(default)]
    pub job_id: Option<String>,
    #[serde(default)]
    pub job_ids: Vec<String>,
    #[serde(default)]
    pub renditions: Vec<Rendition>,
}

impl StartJobsResponse {
    /// The union of the singular `jobId` (if present) and the `jobIds`
    /// array, per §6's "returned job ids are the union" wording.
    pub fn all_job_ids(&self) -> Vec<String> {
        let mut ids = self.job_ids.clone();
        if let Some(id) = &self.job_id {
            if !ids.contains(id) {
                ids.push(id.clone());
            }
        }
        ids
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitUploadRequest<'a> {
    pub channel_id: &'a str,
    pub upload_id: &'a str,
    pub source_url: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filename: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub renditions: Option<&'a [Rendition]>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitUploadResponse {
    pub job_id: String,
    pub playback_url: String,
    #[serde(default)]
    pub renditions: Vec<Rendition>,
}
