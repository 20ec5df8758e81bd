//! Request execution
//!
//! [`RequestRunner::send`] ties the pieces together: it stamps the request,
//! fingerprints it, records the loading state, executes it through the
//! inspector's relay endpoint and records the outcome.

use crate::cache::CacheManager;
use crate::error::{IhppError, IhppResult};
use crate::request::{fingerprint, Fingerprint, RequestDescriptor};
use crate::response::{ResponseData, ResponseUpdate};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Relay endpoint path, relative to the API base URL
pub const HTTPREQ_PATH: &str = "/api/httpreq";

/// What gets sent to the relay
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecuteRequest {
    pub method: String,
    pub url: String,
    pub headers: BTreeMap<String, String>,
    pub body: String,
}

impl From<&RequestDescriptor> for ExecuteRequest {
    fn from(request: &RequestDescriptor) -> Self {
        let headers = request
            .enabled_headers()
            .map(|h| (h.key.clone(), h.value.clone()))
            .collect();
        Self {
            method: request.method.clone(),
            url: request.url.clone(),
            headers,
            body: request.body.clone(),
        }
    }
}

/// Performs a request and returns the upstream response
#[async_trait]
pub trait Executor: Send + Sync {
    async fn execute(&self, request: &ExecuteRequest) -> IhppResult<ResponseData>;
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireResponse {
    status: u16,
    #[serde(default)]
    status_text: String,
    #[serde(default)]
    headers: BTreeMap<String, String>,
    #[serde(default)]
    body: String,
    #[serde(default)]
    duration: u64,
}

impl From<WireResponse> for ResponseData {
    fn from(wire: WireResponse) -> Self {
        Self {
            status: wire.status,
            status_text: wire.status_text,
            headers: wire
                .headers
                .into_iter()
                .map(|(k, v)| (k, vec![v]))
                .collect(),
            body: wire.body,
            duration: wire.duration,
        }
    }
}

#[derive(Debug, Deserialize)]
struct WireError {
    error: String,
    #[serde(default)]
    details: String,
}

impl WireError {
    fn message(self) -> String {
        if self.details.is_empty() {
            self.error
        } else {
            format!("{}: {}", self.error, self.details)
        }
    }
}

/// Executes requests through the inspector's HTTP relay
pub struct HttpExecutor {
    agent: ureq::Agent,
    endpoint: String,
}

impl HttpExecutor {
    pub fn new(api_url: &str, timeout: Duration) -> Self {
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(Some(timeout))
            .build()
            .into();
        Self {
            agent,
            endpoint: format!("{}{}", api_url.trim_end_matches('/'), HTTPREQ_PATH),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl Executor for HttpExecutor {
    async fn execute(&self, request: &ExecuteRequest) -> IhppResult<ResponseData> {
        let agent = self.agent.clone();
        let endpoint = self.endpoint.clone();
        let payload = request.clone();

        debug!("POST {} for {} {}", endpoint, payload.method, payload.url);
        tokio::task::spawn_blocking(move || relay(&agent, &endpoint, &payload)).await?
    }
}

fn relay(agent: &ureq::Agent, endpoint: &str, payload: &ExecuteRequest) -> IhppResult<ResponseData> {
    let mut response = agent
        .post(endpoint)
        .send_json(payload)
        .map_err(|e| IhppError::Execute(e.to_string()))?;

    let status = response.status().as_u16();
    let text = response
        .body_mut()
        .read_to_string()
        .map_err(|e| IhppError::Execute(format!("reading relay response: {}", e)))?;

    decode_relay(status, &text)
}

/// Turn a relay reply into a response or an error
fn decode_relay(status: u16, text: &str) -> IhppResult<ResponseData> {
    if (200..300).contains(&status) {
        let wire: WireResponse = serde_json::from_str(text)?;
        return Ok(wire.into());
    }

    let message = serde_json::from_str::<WireError>(text)
        .map(WireError::message)
        .unwrap_or_else(|_| text.trim().to_string());
    Err(IhppError::ExecuteStatus { status, message })
}

/// Sends requests and records their lifecycle in the cache
pub struct RequestRunner {
    cache: Arc<CacheManager>,
    executor: Arc<dyn Executor>,
}

impl RequestRunner {
    pub fn new(cache: Arc<CacheManager>, executor: Arc<dyn Executor>) -> Self {
        Self { cache, executor }
    }

    pub fn cache(&self) -> &CacheManager {
        &self.cache
    }

    /// Send a request and return the fingerprint its outcome is stored under
    ///
    /// The request is stamped first, so every send gets its own entry. An
    /// execution failure is recorded in the state rather than returned.
    pub async fn send(&self, request: &mut RequestDescriptor) -> Fingerprint {
        request.touch();
        let key = fingerprint(request);
        info!("Sending {} {} as {}", request.method, request.url, key.short());

        self.cache
            .update_state(&key, ResponseUpdate::loading(request.clone()));

        let outcome = self.executor.execute(&ExecuteRequest::from(&*request)).await;
        match outcome {
            Ok(data) => {
                debug!("{} completed with status {}", key.short(), data.status);
                self.cache.update_state(&key, ResponseUpdate::completed(data));
            }
            Err(e) => {
                let message = match e {
                    IhppError::ExecuteStatus { message, .. } => message,
                    other => other.to_string(),
                };
                warn!("{} failed: {}", key.short(), message);
                self.cache.update_state(&key, ResponseUpdate::failed(message));
            }
        }
        key
    }
}
