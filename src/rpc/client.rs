//! RPC client: one JSON-RPC call to a logical server.

use serde_json::{Map, Value};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use super::protocol::{JsonRpcRequest, JsonRpcResponse};
use super::transport::{RawResponse, RpcTransport};
use crate::config::ServerRegistry;
use crate::error::RpcError;

/// Calls tools on the servers named in a [`ServerRegistry`].
///
/// The registry is fixed at construction. Request ids come from a counter
/// owned by the client and start at 1.
///
/// # Example
///
/// ```ignore
/// use toolloop::rpc::{HttpTransport, RpcClient};
///
/// let client = RpcClient::new(registry, Arc::new(HttpTransport::new(timeout)?));
/// let result = client.call("memory", "read_graph", Map::new()).await?;
/// ```
pub struct RpcClient {
    registry: Arc<ServerRegistry>,
    transport: Arc<dyn RpcTransport>,
    next_id: AtomicU64,
}

impl RpcClient {
    #[must_use]
    pub fn new(registry: Arc<ServerRegistry>, transport: Arc<dyn RpcTransport>) -> Self {
        Self {
            registry,
            transport,
            next_id: AtomicU64::new(1),
        }
    }

    /// Call `method` on `server` and return its `result` value.
    ///
    /// # Errors
    ///
    /// - [`RpcError::Configuration`] if `server` is not registered; the
    ///   transport is not touched.
    /// - [`RpcError::Transport`] if no response was received.
    /// - [`RpcError::Remote`] for a non-2xx status, an undecodable body, a
    ///   JSON-RPC error object, or a response without `result`.
    pub async fn call(
        &self,
        server: &str,
        method: &str,
        params: Map<String, Value>,
    ) -> Result<Value, RpcError> {
        let endpoint = self
            .registry
            .endpoint(server)
            .ok_or_else(|| RpcError::Configuration {
                server: server.to_string(),
            })?;

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let request = JsonRpcRequest::new(method, params, id);

        let raw = self
            .transport
            .send(endpoint, &request)
            .await
            .map_err(|source| RpcError::Transport {
                server: server.to_string(),
                source,
            })?;

        decode_result(server, raw)
    }
}

fn decode_result(server: &str, raw: RawResponse) -> Result<Value, RpcError> {
    let remote = |raw: RawResponse| RpcError::Remote {
        server: server.to_string(),
        status: raw.status,
        body: raw.body,
    };

    if !raw.is_success() {
        return Err(remote(raw));
    }

    let Ok(response) = serde_json::from_str::<JsonRpcResponse>(&raw.body) else {
        return Err(remote(raw));
    };

    if let Some(error) = response.error {
        log::debug!(
            "rpc error from {server}: code={} message={}",
            error.code,
            error.message
        );
        return Err(remote(raw));
    }

    response.result.ok_or_else(|| remote(raw))
}
