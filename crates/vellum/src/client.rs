//! The request executor every resource service goes through.
//!
//! [`ApiClient`] resolves paths against the configured base URL, encodes
//! query directives deterministically, buffers bodies so retries replay
//! identical bytes, classifies failures through [`crate::error`], and runs a
//! bounded retry loop when the server reports rate limiting together with a
//! parseable reset window.

use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use url::Url;

use crate::error::{ApiError, Error, ErrorEnvelope, VERSION_HEADER};
use crate::http::reqwest_transport::ReqwestTransport;
use crate::http::{Headers, Method, Request, Response, Transport};

/// Header carrying the seconds-until-reset hint on rate-limited responses.
pub const RATE_LIMIT_RESET_HEADER: &str = "X-Vellum-Ratelimit-Reset";

/// Media type for the management surface.
pub const MANAGEMENT_CONTENT_TYPE: &str = "application/vnd.vellum.management.v1+json";

/// Media type for the delivery surface.
pub const DELIVERY_CONTENT_TYPE: &str = "application/vnd.vellum.delivery.v1+json";

/// Default management API host.
pub const MANAGEMENT_BASE_URL: &str = "https://api.vellum.dev";

/// Default delivery API host.
pub const DELIVERY_BASE_URL: &str = "https://cdn.vellum.dev";

const DEFAULT_USER_AGENT: &str = concat!("sdk vellum.rs/", env!("CARGO_PKG_VERSION"));
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Bounds on the rate-limit retry loop.
///
/// The server directs the delay via the reset header; the policy caps both
/// how often a single call is re-issued and how long any one wait can be.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum number of re-issues for one logical call.
    pub max_retries: u32,
    /// Ceiling on the server-directed wait.
    pub reset_wait_ceiling: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            reset_wait_ceiling: Duration::from_secs(60),
        }
    }
}

/// Client configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub base_url: String,
    pub token: String,
    /// Media type sent as `Content-Type`.
    pub content_type: String,
    pub user_agent: String,
    /// Optional organization id, sent as `X-Vellum-Organization`.
    pub organization: Option<String>,
    pub retry: RetryPolicy,
}

impl ApiConfig {
    /// Configuration for the management surface.
    #[must_use]
    pub fn management(token: impl Into<String>) -> Self {
        Self {
            base_url: MANAGEMENT_BASE_URL.to_string(),
            token: token.into(),
            content_type: MANAGEMENT_CONTENT_TYPE.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            organization: None,
            retry: RetryPolicy::default(),
        }
    }

    /// Configuration for the read-only delivery surface.
    #[must_use]
    pub fn delivery(token: impl Into<String>) -> Self {
        Self {
            base_url: DELIVERY_BASE_URL.to_string(),
            token: token.into(),
            content_type: DELIVERY_CONTENT_TYPE.to_string(),
            ..Self::management(String::new())
        }
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}

/// Authenticated API client.
///
/// Cheap to clone; the transport and configuration are shared and immutable.
/// Collections hold a clone and issue all their page fetches through it.
#[derive(Clone)]
pub struct ApiClient {
    transport: Arc<dyn Transport>,
    base_url: Url,
    default_headers: Headers,
    retry: RetryPolicy,
}

impl ApiClient {
    /// Build a client over the reqwest transport.
    pub fn new(config: ApiConfig) -> Result<Self, Error> {
        let transport = ReqwestTransport::with_timeout(DEFAULT_TIMEOUT)?;
        Self::with_transport(config, Arc::new(transport))
    }

    /// Build a client over a caller-supplied transport.
    pub fn with_transport(config: ApiConfig, transport: Arc<dyn Transport>) -> Result<Self, Error> {
        let base_url = Url::parse(&config.base_url)?;

        let mut default_headers: Headers = vec![
            (
                "Authorization".to_string(),
                format!("Bearer {}", config.token),
            ),
            ("Content-Type".to_string(), config.content_type),
            ("X-Vellum-User-Agent".to_string(), config.user_agent),
        ];
        if let Some(organization) = config.organization {
            default_headers.push(("X-Vellum-Organization".to_string(), organization));
        }

        Ok(Self {
            transport,
            base_url,
            default_headers,
            retry: config.retry,
        })
    }

    /// The configured base URL.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Execute one request against the configured base URL.
    pub async fn execute(
        &self,
        method: Method,
        path: &str,
        query: &[(String, String)],
        headers: &[(String, String)],
        body: Option<Vec<u8>>,
    ) -> Result<Response, Error> {
        self.execute_at(None, method, path, query, headers, body)
            .await
    }

    /// Execute one request, optionally against a per-call endpoint override
    /// (used by upload-style endpoints that live on a different host). The
    /// client's own base URL is never mutated.
    pub async fn execute_at(
        &self,
        endpoint: Option<&Url>,
        method: Method,
        path: &str,
        query: &[(String, String)],
        headers: &[(String, String)],
        body: Option<Vec<u8>>,
    ) -> Result<Response, Error> {
        let mut url = endpoint.unwrap_or(&self.base_url).join(path)?;
        if !query.is_empty() {
            url.query_pairs_mut().clear().extend_pairs(query);
        }

        // Caller headers first, defaults second: defaults win on collision.
        let mut merged: Headers = headers.to_vec();
        for (name, value) in &self.default_headers {
            set_header(&mut merged, name, value);
        }

        let body = body.unwrap_or_default();
        let request = Request {
            method,
            url: url.to_string(),
            headers: merged,
            body,
        };

        let mut attempt = 0u32;
        loop {
            tracing::debug!(method = method.as_str(), url = %request.url, attempt, "dispatching request");

            let response = self.transport.send(request.clone()).await?;
            if response.is_success() {
                return Ok(response);
            }

            let error = self.classify_failure(&request, &response)?;
            if !error.is_rate_limited() {
                return Err(error.into());
            }

            let reset = response
                .header(RATE_LIMIT_RESET_HEADER)
                .and_then(|value| value.parse::<u64>().ok());
            let Some(reset_secs) = reset else {
                // No usable reset hint: surface the error without retrying.
                return Err(error.into());
            };

            if attempt >= self.retry.max_retries {
                return Err(error.into());
            }
            attempt += 1;

            let wait = Duration::from_secs(reset_secs).min(self.retry.reset_wait_ceiling);
            tracing::debug!(
                attempt,
                wait_secs = wait.as_secs(),
                url = %request.url,
                "rate limited, waiting for reset window"
            );
            tokio::time::sleep(wait).await;
        }
    }

    /// Decode and classify a failure body.
    ///
    /// A body that is not a valid error envelope produces a decode error,
    /// which loses the HTTP status.
    fn classify_failure(&self, request: &Request, response: &Response) -> Result<ApiError, Error> {
        let envelope: ErrorEnvelope = serde_json::from_slice(&response.body)?;
        Ok(ApiError::classify(request, response, envelope))
    }

    pub async fn get(
        &self,
        path: &str,
        query: &[(String, String)],
        headers: &[(String, String)],
    ) -> Result<Response, Error> {
        self.execute(Method::Get, path, query, headers, None).await
    }

    pub async fn post(
        &self,
        path: &str,
        query: &[(String, String)],
        headers: &[(String, String)],
        body: Vec<u8>,
    ) -> Result<Response, Error> {
        self.execute(Method::Post, path, query, headers, Some(body))
            .await
    }

    pub async fn put(
        &self,
        path: &str,
        query: &[(String, String)],
        headers: &[(String, String)],
        body: Vec<u8>,
    ) -> Result<Response, Error> {
        self.execute(Method::Put, path, query, headers, Some(body))
            .await
    }

    pub async fn delete(
        &self,
        path: &str,
        query: &[(String, String)],
        headers: &[(String, String)],
    ) -> Result<Response, Error> {
        self.execute(Method::Delete, path, query, headers, None)
            .await
    }
}

/// Set a header, replacing an existing value case-insensitively.
fn set_header(headers: &mut Headers, name: &str, value: &str) {
    if let Some(pair) = headers
        .iter_mut()
        .find(|(k, _)| k.eq_ignore_ascii_case(name))
    {
        pair.1 = value.to_string();
    } else {
        headers.push((name.to_string(), value.to_string()));
    }
}

/// The optimistic-concurrency header for a mutating call.
#[must_use]
pub fn version_header(version: u32) -> (String, String) {
    (VERSION_HEADER.to_string(), version.to_string())
}

/// Decode a success body.
pub fn decode<T: DeserializeOwned>(response: &Response) -> Result<T, Error> {
    Ok(serde_json::from_slice(&response.body)?)
}
