//! reqwest-backed [`HttpClient`]

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result},
    http::{HttpClient, HttpRequest, HttpResponse, RetryPolicy},
};
use reqwest::Client;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, warn};

/// Per-request timeout applied when the caller sets none
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// HTTP client for desktop and headless hosts.
///
/// Pools connections, uses rustls, and retries 5xx/429 answers according
/// to its [`RetryPolicy`]. Every other status, 4xx included, is handed back
/// unchanged so callers can tell an expired photo link from an outage.
/// Transport failures are returned on the first attempt, so a dead host
/// costs at most one timeout per request.
pub struct ReqwestHttpClient {
    client: Client,
    policy: RetryPolicy,
}

impl ReqwestHttpClient {
    pub fn new() -> Result<Self> {
        Self::with_timeout(DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(CONNECT_TIMEOUT)
            .pool_max_idle_per_host(4)
            .user_agent(concat!("photo-frame-core/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| {
                BridgeError::NotAvailable(format!("Failed to build HTTP client: {}", e))
            })?;

        Ok(Self {
            client,
            policy: RetryPolicy::default(),
        })
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    fn build_request(&self, request: &HttpRequest) -> reqwest::RequestBuilder {
        let mut builder = self.client.get(&request.url);
        for (key, value) in &request.headers {
            builder = builder.header(key, value);
        }
        if let Some(timeout) = request.timeout {
            builder = builder.timeout(timeout);
        }
        builder
    }

    fn is_retryable(status: u16) -> bool {
        status >= 500 || status == 429
    }

    async fn into_response(response: reqwest::Response) -> Result<HttpResponse> {
        let status = response.status().as_u16();
        let headers: HashMap<String, String> = response
            .headers()
            .iter()
            .filter_map(|(k, v)| v.to_str().ok().map(|s| (k.to_string(), s.to_string())))
            .collect();
        let body = response
            .bytes()
            .await
            .map_err(|e| BridgeError::OperationFailed(format!("Failed to read body: {}", e)))?;

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }

    fn transport_error(e: reqwest::Error) -> BridgeError {
        if e.is_timeout() {
            BridgeError::OperationFailed("Request timed out".to_string())
        } else if e.is_connect() {
            BridgeError::OperationFailed(format!("Connection failed: {}", e))
        } else {
            BridgeError::OperationFailed(e.to_string())
        }
    }
}

#[async_trait]
impl HttpClient for ReqwestHttpClient {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
        let attempts = self.policy.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            debug!(attempt, attempts, "Sending GET");
            let last = attempt == attempts;

            match self.build_request(&request).send().await {
                Ok(response) if last || !Self::is_retryable(response.status().as_u16()) => {
                    return Self::into_response(response).await;
                }
                Ok(response) => {
                    warn!(
                        status = response.status().as_u16(),
                        attempt, "Retryable HTTP status"
                    );
                }
                Err(e) => {
                    warn!(error = %e, attempt, "HTTP transport failure");
                    return Err(Self::transport_error(e));
                }
            }

            tokio::time::sleep(self.policy.delay_for(attempt)).await;
            attempt += 1;
        }
    }
}
