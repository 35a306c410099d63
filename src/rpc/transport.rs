//! RPC transport implementations.

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::time::Duration;
use url::Url;

use super::protocol::JsonRpcRequest;

/// Default per-call timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Status and body of an HTTP exchange, before JSON-RPC decoding.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
}

impl RawResponse {
    #[must_use]
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }
}

/// Trait for RPC transports.
///
/// A transport performs exactly one request/response exchange per call and
/// never retries. An `Err` means no response was obtained at all; any
/// response, whatever its status, is returned as `Ok`.
///
/// # Example
///
/// ```ignore
/// use toolloop::rpc::{HttpTransport, RpcTransport};
///
/// let transport = HttpTransport::new(Duration::from_secs(10))?;
/// let raw = transport.send(&endpoint, &request).await?;
/// ```
#[async_trait]
pub trait RpcTransport: Send + Sync {
    /// Send a request to `endpoint` and wait for the raw response.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection fails, times out, or the body
    /// cannot be read.
    async fn send(&self, endpoint: &Url, request: &JsonRpcRequest) -> Result<RawResponse>;
}

/// JSON-RPC over HTTP POST, one call per exchange.
#[derive(Clone, Debug)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// Create a transport whose calls give up after `timeout`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("toolloop/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self { client })
    }
}

#[async_trait]
impl RpcTransport for HttpTransport {
    async fn send(&self, endpoint: &Url, request: &JsonRpcRequest) -> Result<RawResponse> {
        let response = self
            .client
            .post(endpoint.clone())
            .json(request)
            .send()
            .await
            .with_context(|| format!("POST {endpoint} failed"))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .with_context(|| format!("failed to read response body from {endpoint}"))?;

        log::debug!(
            "rpc exchange endpoint={endpoint} method={} status={status} body_len={}",
            request.method,
            body.len()
        );

        Ok(RawResponse { status, body })
    }
}
