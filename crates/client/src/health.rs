//! Single-shot backend liveness check.

use async_trait::async_trait;
use reqwest::Client;

/// Path of the liveness endpoint, relative to the API base address.
pub const HEALTH_PATH: &str = "/health";

/// One liveness check. Implementations do not retry; the wake loop does.
#[async_trait(?Send)]
pub trait HealthProbe {
    /// `true` if the backend answered with a 2xx status.
    async fn check(&self) -> bool;
}

/// `GET {base}/health` over HTTP. Any non-2xx status or transport error is a
/// failure, and the body is ignored.
#[derive(Debug, Clone)]
pub struct HttpHealthProbe {
    client: Client,
    url: String,
}

impl HttpHealthProbe {
    pub fn new(client: Client, base_url: &str) -> Self {
        Self {
            client,
            url: format!("{}{HEALTH_PATH}", base_url.trim_end_matches('/')),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait(?Send)]
impl HealthProbe for HttpHealthProbe {
    async fn check(&self) -> bool {
        match self.client.get(&self.url).send().await {
            Ok(resp) if resp.status().is_success() => true,
            Ok(resp) => {
                crate::log_debug!("health check {} returned {}", self.url, resp.status());
                false
            }
            Err(e) => {
                crate::log_debug!("health check {} failed: {}", self.url, e);
                false
            }
        }
    }
}
