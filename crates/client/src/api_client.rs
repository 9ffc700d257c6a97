//! HTTP API client with cold-start recovery.
//!
//! Every API call goes through [`ApiClient::send`]. A failure that looks like
//! a sleeping backend (no status, 502, 503, timeout) triggers a shared wake
//! attempt and, if the backend comes back, one replay of the original
//! request. Anything else is reported as-is.

use std::rc::Rc;
use std::time::Duration;

use anyhow::Context;
use city_insight_shared::ApiError;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Method};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::config::ClientConfig;
use crate::health::{HealthProbe, HttpHealthProbe};
use crate::platform::Spawner;
use crate::stores::{ConnectivityPatch, ConnectivityStore, UNAVAILABLE_MESSAGE};
use crate::wake::WakeCoordinator;

/// Marker header sent on every request, GETs included, so the server can
/// tell script-originated API calls from plain form posts.
pub const REQUESTED_WITH_HEADER: &str = "X-Requested-With";
pub const REQUESTED_WITH_VALUE: &str = "XMLHttpRequest";

/// A request that can be issued, and replayed, verbatim.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub body: Option<Vec<u8>>,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            body: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    /// Attach a JSON body.
    pub fn json<T: Serialize + ?Sized>(mut self, body: &T) -> Result<Self, ApiError> {
        let bytes = serde_json::to_vec(body).map_err(|e| ApiError::Serialize(e.to_string()))?;
        self.body = Some(bytes);
        Ok(self)
    }
}

/// A successful (2xx) response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: String,
}

impl ApiResponse {
    /// Decode the body; an empty body decodes as JSON `null`.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, ApiError> {
        let text = if self.body.trim().is_empty() {
            "null"
        } else {
            self.body.as_str()
        };
        serde_json::from_str(text).map_err(|e| ApiError::Deserialize(e.to_string()))
    }
}

/// Whether `error` is consistent with a backend that is asleep.
///
/// A failure with no HTTP status at all always counts, which also sweeps in
/// genuine offline and DNS failures; those get one wasted wake attempt
/// before the original error is returned.
pub fn looks_like_cold_start(error: &ApiError) -> bool {
    match error {
        ApiError::Network { .. } => true,
        ApiError::Http { status, .. } => matches!(status, 502 | 503),
        ApiError::Deserialize(_) | ApiError::Serialize(_) => false,
    }
}

/// HTTP client for the City Insight API.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    wake: WakeCoordinator,
    status: ConnectivityStore,
    wake_budget: Duration,
}

impl ApiClient {
    /// Build a client and its wake coordinator, publishing connectivity
    /// changes to `status`.
    ///
    /// Fails if the HTTP client cannot be configured. There is no fallback:
    /// a client without a cookie jar could never keep a session.
    pub fn new(config: &ClientConfig, status: ConnectivityStore) -> anyhow::Result<Self> {
        let client = build_http_client(config)?;
        let health: Rc<dyn HealthProbe> =
            Rc::new(HttpHealthProbe::new(client.clone(), &config.base_url));
        let wake = WakeCoordinator::new(health, status.clone(), config.wake);

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            wake,
            status,
            wake_budget: config.wake_budget,
        })
    }

    /// Replace the wake coordinator (custom liveness check or policy).
    pub fn with_wake_coordinator(mut self, wake: WakeCoordinator) -> Self {
        self.wake = wake;
        self
    }

    /// Run wake attempts on `spawner` instead of the platform default.
    pub fn with_spawner(self, spawner: Spawner) -> Self {
        let wake = self.wake.clone().with_spawner(spawner);
        self.with_wake_coordinator(wake)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// The connectivity store this client publishes to.
    pub fn status(&self) -> &ConnectivityStore {
        &self.status
    }

    pub fn wake_coordinator(&self) -> &WakeCoordinator {
        &self.wake
    }

    fn url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }
        let path = path.trim_start_matches('/');
        if self.base_url.is_empty() {
            format!("/{path}")
        } else {
            format!("{}/{path}", self.base_url)
        }
    }

    /// Issue `request`, recovering once from a cold-start-shaped failure.
    ///
    /// Genuine failures, and a second cold-start failure of the replayed
    /// request, mark the backend down and return the error unchanged. If the
    /// wake attempt itself times out, the original error is returned.
    pub async fn send(&self, request: &ApiRequest) -> Result<ApiResponse, ApiError> {
        let mut retried = false;

        loop {
            let err = match self.dispatch(request).await {
                Ok(resp) => return Ok(resp),
                Err(err) => err,
            };

            if retried || !looks_like_cold_start(&err) {
                crate::log_warn!("{} {} failed: {}", request.method, request.path, err);
                self.status.set(ConnectivityPatch::down(UNAVAILABLE_MESSAGE));
                return Err(err);
            }

            retried = true;
            crate::log_info!(
                "{} {} looks like a cold start ({}), waking backend",
                request.method,
                request.path,
                err
            );
            if !self.wake.wake(self.wake_budget).await {
                return Err(err);
            }
            crate::log_info!("retrying {} {}", request.method, request.path);
        }
    }

    async fn dispatch(&self, request: &ApiRequest) -> Result<ApiResponse, ApiError> {
        let url = self.url(&request.path);
        let mut rb = self
            .client
            .request(request.method.clone(), &url)
            .header(REQUESTED_WITH_HEADER, REQUESTED_WITH_VALUE);

        #[cfg(target_arch = "wasm32")]
        {
            rb = rb.fetch_credentials_include();
        }

        if let Some(body) = &request.body {
            rb = rb.header(CONTENT_TYPE, "application/json").body(body.clone());
        }

        let resp = rb.send().await.map_err(network_error)?;

        let status = resp.status().as_u16();
        let is_success = resp.status().is_success();
        let body = resp
            .text()
            .await
            .map_err(|e| body_read_failure(status, is_success, e.to_string()))?;

        if !is_success {
            return Err(ApiError::Http { status, body });
        }

        Ok(ApiResponse { status, body })
    }

    /// GET `path` and decode the JSON response.
    pub async fn get_json<TRes: DeserializeOwned>(&self, path: &str) -> Result<TRes, ApiError> {
        self.send(&ApiRequest::get(path)).await?.json()
    }

    /// POST a JSON body to `path` and decode the JSON response.
    pub async fn post_json<TReq: Serialize + ?Sized, TRes: DeserializeOwned>(
        &self,
        path: &str,
        body: &TReq,
    ) -> Result<TRes, ApiError> {
        self.send(&ApiRequest::post(path).json(body)?).await?.json()
    }

    /// PUT a JSON body to `path` and decode the JSON response.
    pub async fn put_json<TReq: Serialize + ?Sized, TRes: DeserializeOwned>(
        &self,
        path: &str,
        body: &TReq,
    ) -> Result<TRes, ApiError> {
        self.send(&ApiRequest::put(path).json(body)?).await?.json()
    }

    /// POST to `path` without a body.
    pub async fn post(&self, path: &str) -> Result<ApiResponse, ApiError> {
        self.send(&ApiRequest::post(path)).await
    }

    pub async fn delete(&self, path: &str) -> Result<(), ApiError> {
        self.send(&ApiRequest::delete(path)).await.map(|_| ())
    }

    /// Wake the backend on demand (a "try again" button), sharing any attempt
    /// already in flight.
    pub async fn retry_wake_now(&self) -> bool {
        self.wake.wake(self.wake_budget).await
    }
}

fn network_error(e: reqwest::Error) -> ApiError {
    ApiError::Network {
        timed_out: e.is_timeout(),
        message: e.to_string(),
    }
}

/// The server answered but its body could not be read. The status is kept:
/// a 4xx stays a genuine failure, and a 2xx with a broken body is a decode
/// problem rather than a sleeping backend.
fn body_read_failure(status: u16, is_success: bool, message: String) -> ApiError {
    crate::log_warn!("failed to read body of HTTP {} response: {}", status, message);
    if is_success {
        ApiError::Deserialize(format!("failed to read response body: {message}"))
    } else {
        ApiError::Http {
            status,
            body: String::new(),
        }
    }
}

#[cfg_attr(target_arch = "wasm32", allow(unused_variables))]
fn build_http_client(config: &ClientConfig) -> anyhow::Result<Client> {
    // The session lives in an httpOnly cookie: keep a cookie jar natively,
    // and ask fetch to send credentials on the web (per request).
    #[cfg(not(target_arch = "wasm32"))]
    let builder = Client::builder()
        .cookie_store(true)
        .timeout(config.request_timeout);
    #[cfg(target_arch = "wasm32")]
    let builder = Client::builder();

    builder.build().context("failed to build HTTP client")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(base_url: &str) -> ApiClient {
        ApiClient::new(
            &ClientConfig::default().with_base_url(base_url),
            ConnectivityStore::new(),
        )
        .unwrap()
    }

    #[test]
    fn test_cold_start_classification() {
        let network = ApiError::Network {
            message: "connection refused".to_string(),
            timed_out: false,
        };
        let timeout = ApiError::Network {
            message: "timed out".to_string(),
            timed_out: true,
        };
        assert!(looks_like_cold_start(&network));
        assert!(looks_like_cold_start(&timeout));

        for status in [502, 503] {
            let err = ApiError::Http {
                status,
                body: String::new(),
            };
            assert!(looks_like_cold_start(&err), "{status} should wake");
        }
        for status in [400, 401, 403, 404, 409, 500, 504] {
            let err = ApiError::Http {
                status,
                body: String::new(),
            };
            assert!(!looks_like_cold_start(&err), "{status} should not wake");
        }

        assert!(!looks_like_cold_start(&ApiError::Deserialize("eof".to_string())));
    }

    #[test]
    fn test_unreadable_body_keeps_status() {
        let not_found = body_read_failure(404, false, "connection reset".to_string());
        assert_eq!(not_found.status(), Some(404));
        assert!(!looks_like_cold_start(&not_found));

        let unavailable = body_read_failure(503, false, "connection reset".to_string());
        assert_eq!(unavailable.status(), Some(503));
        assert!(looks_like_cold_start(&unavailable));

        let ok = body_read_failure(200, true, "connection reset".to_string());
        assert!(matches!(ok, ApiError::Deserialize(ref m) if m.contains("connection reset")));
        assert!(!looks_like_cold_start(&ok));
    }

    #[test]
    fn test_url_joining() {
        let api = client("http://localhost:3000/");
        assert_eq!(api.url("/api/me"), "http://localhost:3000/api/me");
        assert_eq!(api.url("api/me"), "http://localhost:3000/api/me");
        assert_eq!(
            api.url("https://other.example.com/x"),
            "https://other.example.com/x"
        );

        let relative = client("");
        assert_eq!(relative.url("api/me"), "/api/me");
    }

    #[test]
    fn test_request_json_body() {
        let request = ApiRequest::post("/api/auth/login")
            .json(&serde_json::json!({ "idToken": "t" }))
            .unwrap();
        assert_eq!(request.method, Method::POST);
        assert_eq!(request.body.as_deref(), Some(br#"{"idToken":"t"}"#.as_slice()));
    }

    #[test]
    fn test_empty_body_decodes_as_null() {
        let resp = ApiResponse {
            status: 204,
            body: String::new(),
        };
        let value: Option<serde_json::Value> = resp.json().unwrap();
        assert!(value.is_none());

        let bad = ApiResponse {
            status: 200,
            body: "not json".to_string(),
        };
        assert!(matches!(
            bad.json::<serde_json::Value>(),
            Err(ApiError::Deserialize(_))
        ));
    }
}
