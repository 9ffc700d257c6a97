//! Client configuration.

use std::time::Duration;

use anyhow::Context;

use crate::wake::WakePolicy;

pub const API_URL_VAR: &str = "CITY_INSIGHT_API_URL";
pub const REQUEST_TIMEOUT_VAR: &str = "CITY_INSIGHT_REQUEST_TIMEOUT_MS";
pub const WAKE_BUDGET_VAR: &str = "CITY_INSIGHT_WAKE_BUDGET_MS";

/// Settings shared by every request the client makes.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    /// Base address of the backend; the liveness endpoint is `{base_url}/health`
    pub base_url: String,
    /// Transport timeout per request (native only; the browser uses fetch's own)
    pub request_timeout: Duration,
    /// How long a cold-start recovery may poll before giving up
    pub wake_budget: Duration,
    pub wake: WakePolicy,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            request_timeout: Duration::from_millis(15_000),
            wake_budget: Duration::from_millis(60_000),
            wake: WakePolicy::default(),
        }
    }
}

impl ClientConfig {
    /// Read configuration from environment variables.
    ///
    /// Environment variables:
    /// - `CITY_INSIGHT_API_URL`: backend base address (default: page origin on
    ///   the web, `http://localhost:3000` natively)
    /// - `CITY_INSIGHT_REQUEST_TIMEOUT_MS`: per-request timeout (default: 15000)
    /// - `CITY_INSIGHT_WAKE_BUDGET_MS`: cold-start recovery budget (default: 60000)
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let mut config = Self::default();

        if let Some(url) = lookup(API_URL_VAR) {
            let url = url.trim();
            if !url.is_empty() {
                config.base_url = url.trim_end_matches('/').to_string();
            }
        }
        if let Some(timeout) = millis(&lookup, REQUEST_TIMEOUT_VAR)? {
            config.request_timeout = timeout;
        }
        if let Some(budget) = millis(&lookup, WAKE_BUDGET_VAR)? {
            config.wake_budget = budget;
        }

        Ok(config)
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_wake_budget(mut self, wake_budget: Duration) -> Self {
        self.wake_budget = wake_budget;
        self
    }

    pub fn with_wake_policy(mut self, wake: WakePolicy) -> Self {
        self.wake = wake;
        self
    }
}

fn millis(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> anyhow::Result<Option<Duration>> {
    let Some(raw) = lookup(key) else {
        return Ok(None);
    };
    let ms: u64 = raw
        .trim()
        .parse()
        .with_context(|| format!("{key} must be a whole number of milliseconds, got {raw:?}"))?;
    Ok(Some(Duration::from_millis(ms)))
}

#[cfg(not(target_arch = "wasm32"))]
fn default_base_url() -> String {
    "http://localhost:3000".to_string()
}

#[cfg(target_arch = "wasm32")]
fn default_base_url() -> String {
    web_sys::window()
        .and_then(|window| window.location().origin().ok())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = ClientConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, ClientConfig::default());
        assert_eq!(config.base_url, "http://localhost:3000");
        assert_eq!(config.request_timeout, Duration::from_secs(15));
        assert_eq!(config.wake_budget, Duration::from_secs(60));
        assert_eq!(config.wake, WakePolicy::default());
    }

    #[test]
    fn test_overrides() {
        let config = ClientConfig::from_lookup(lookup(&[
            (API_URL_VAR, " https://city-insight.onrender.com/ "),
            (REQUEST_TIMEOUT_VAR, "5000"),
            (WAKE_BUDGET_VAR, "90000"),
        ]))
        .unwrap();
        assert_eq!(config.base_url, "https://city-insight.onrender.com");
        assert_eq!(config.request_timeout, Duration::from_secs(5));
        assert_eq!(config.wake_budget, Duration::from_secs(90));
    }

    #[test]
    fn test_rejects_malformed_millis() {
        let err = ClientConfig::from_lookup(lookup(&[(WAKE_BUDGET_VAR, "a minute")])).unwrap_err();
        assert!(err.to_string().contains(WAKE_BUDGET_VAR));
    }
}
