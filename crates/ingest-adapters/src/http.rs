//! A single classified HTTP round-trip, shared by all three adapters.
//!
//! Grounded in `chatty_platform`'s Helix client: build the request once,
//! send it, and turn the response into a retry-classified result before
//! anything downstream sees it — no adapter re-derives transient vs.
//! permanent from a raw status code.

use std::time::Duration;

use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;
use url::Url;

use crate::auth::AuthMode;
use crate::error::AdapterError;

#[derive(Debug, Clone)]
pub struct HttpTarget {
    pub base_url: Url,
    pub auth: AuthMode,
    pub timeout: Duration,
}

/// Sends `method base_url/path` with an optional JSON body, and decodes a
/// JSON response. A non-2xx status or transport failure becomes a
/// classified [`AdapterError`]; a 2xx with an undecodable body is
/// permanent (retrying cannot fix a schema mismatch).
pub async fn send_json<Req, Resp>(
    client: &reqwest::Client,
    target: &HttpTarget,
    method: Method,
    path: &str,
    body: Option<&Req>,
) -> Result<Resp, AdapterError>
where
    Req: Serialize + ?Sized,
    Resp: DeserializeOwned,
{
    let url = target
        .base_url
        .join(path)
        .map_err(|e| AdapterError::permanent(format!("invalid request path '{path}': {e}")))?;

    let mut builder = client.request(method, url).timeout(target.timeout);
    builder = target.auth.apply(builder);
    if let Some(body) = body {
        builder = builder.json(body);
    }

    let response = builder
        .send()
        .await
        .map_err(|e| AdapterError::from_transport(&e))?;

    let status = response.status();
    let text = response
        .text()
        .await
        .map_err(|e| AdapterError::from_transport(&e))?;

    if !status.is_success() {
        return Err(AdapterError::from_status(status, &text));
    }

    serde_json::from_str(&text)
        .map_err(|e| AdapterError::permanent(format!("decoding response body: {e}")))
}

/// Like [`send_json`] but for calls with no response body worth decoding
/// (the `DELETE` endpoints) — only the status is checked.
pub async fn send_no_content<Req>(
    client: &reqwest::Client,
    target: &HttpTarget,
    method: Method,
    path: &str,
    body: Option<&Req>,
) -> Result<(), AdapterError>
where
    Req: Serialize + ?Sized,
{
    let url = target
        .base_url
        .join(path)
        .map_err(|e| AdapterError::permanent(format!("invalid request path '{path}': {e}")))?;

    let mut builder = client.request(method, url).timeout(target.timeout);
    builder = target.auth.apply(builder);
    if let Some(body) = body {
        builder = builder.json(body);
    }

    let response = builder
        .send()
        .await
        .map_err(|e| AdapterError::from_transport(&e))?;

    let status = response.status();
    if status.is_success() {
        return Ok(());
    }
    let text = response.text().await.unwrap_or_default();
    Err(AdapterError::from_status(status, &text))
}
