//! The shared health-probe: `GET <baseUrl><healthPath>`, 2xx required.

use std::time::Duration;

use url::Url;

use crate::auth::AuthMode;
use crate::types::HealthStatus;

/// Probes one service's health endpoint. `base_url: None` means the
/// service was never configured — reported as `unknown` without issuing
/// any HTTP call. The probe uses a fixed timeout independent of any
/// caller-supplied cancellation, per the controller's health-probe rule.
pub async fn probe(
    client: &reqwest::Client,
    component: &str,
    base_url: Option<&Url>,
    health_path: &str,
    auth: Option<&AuthMode>,
    timeout: Duration,
) -> HealthStatus {
    let Some(base_url) = base_url else {
        return HealthStatus::unknown(component, "base URL not configured");
    };

    let url = match base_url.join(health_path) {
        Ok(url) => url,
        Err(e) => return HealthStatus::error(component, format!("invalid health path: {e}")),
    };

    let mut builder = client.get(url).timeout(timeout);
    if let Some(auth) = auth {
        builder = auth.apply(builder);
    }

    match builder.send().await {
        Ok(response) if response.status().is_success() => HealthStatus::ok(component),
        Ok(response) => HealthStatus::error(component, response.status().to_string()),
        Err(e) => HealthStatus::error(component, e.to_string()),
    }
}
