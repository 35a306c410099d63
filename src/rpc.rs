//! JSON-RPC client for remote tool servers.
//!
//! - [`RpcClient`] - Resolves a logical server key and performs one call
//! - [`RpcTransport`] - Trait for transport implementations
//! - [`HttpTransport`] - JSON-RPC over HTTP POST
//!
//! Every call is a single request/response exchange: no batching, no
//! notifications, no retries.

pub mod client;
pub mod protocol;
pub mod transport;

pub use client::RpcClient;
pub use protocol::{JsonRpcError, JsonRpcRequest, JsonRpcResponse, RequestId};
pub use transport::{HttpTransport, RawResponse, RpcTransport};
