//! RPC transport implementation.
//!
//! Requests and replies are CBOR bodies POSTed to the authority's inotify
//! endpoints. The actual client is abstracted via a trait so any HTTP
//! library (or an in-process loopback) can carry them.

use crate::error::{StreamError, StreamResult};
use crate::transport::{AuthorityConnector, BatchFetcher};
use nsnotify_protocol::{
    FetchRequest, FetchResponse, PositionRequest, PositionResponse, EDITS_ENDPOINT,
    POSITION_ENDPOINT,
};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// RPC client abstraction.
///
/// Implement this trait to provide the actual transport.
pub trait RpcClient: Send + Sync {
    /// Sends a POST request and returns the response body.
    fn post(&self, url: &str, body: Vec<u8>) -> Result<Vec<u8>, String>;
}

/// Fetcher speaking CBOR over an `RpcClient`.
pub struct RpcFetcher<C: RpcClient> {
    /// Base URL of the authority (e.g., "http://nn0:50070").
    base_url: String,
    client: C,
    last_error: RwLock<Option<String>>,
}

impl<C: RpcClient> RpcFetcher<C> {
    /// Creates a new fetcher.
    pub fn new(base_url: impl Into<String>, client: C) -> Self {
        Self {
            base_url: base_url.into(),
            client,
            last_error: RwLock::new(None),
        }
    }

    /// Returns the base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Returns the last transport error message.
    pub fn last_error(&self) -> Option<String> {
        self.last_error.read().clone()
    }

    fn post(&self, endpoint: &str, body: Vec<u8>) -> StreamResult<Vec<u8>> {
        let url = format!("{}{}", self.base_url, endpoint);
        match self.client.post(&url, body) {
            Ok(reply) => {
                *self.last_error.write() = None;
                Ok(reply)
            }
            Err(e) => {
                *self.last_error.write() = Some(e.clone());
                Err(StreamError::transport_retryable(e))
            }
        }
    }
}

impl<C: RpcClient> BatchFetcher for RpcFetcher<C> {
    fn fetch(&self, request: &FetchRequest) -> StreamResult<FetchResponse> {
        let reply = self.post(EDITS_ENDPOINT, request.encode()?)?;
        Ok(FetchResponse::decode(&reply)?)
    }

    fn position(&self) -> StreamResult<PositionResponse> {
        let reply = self.post(POSITION_ENDPOINT, PositionRequest::default().encode()?)?;
        Ok(PositionResponse::decode(&reply)?)
    }
}

/// Trait for servers that can handle loopback requests.
pub trait LoopbackServer: Send + Sync {
    /// Handles a POST request and returns the response.
    fn handle_post(&self, path: &str, body: &[u8]) -> Result<Vec<u8>, String>;
}

/// A loopback client that routes requests directly to a server.
///
/// Useful for testing without actual network overhead.
pub struct LoopbackClient<S: LoopbackServer> {
    server: Arc<S>,
}

impl<S: LoopbackServer> LoopbackClient<S> {
    /// Creates a new loopback client connected to the given server.
    pub fn new(server: Arc<S>) -> Self {
        Self { server }
    }
}

impl<S: LoopbackServer> RpcClient for LoopbackClient<S> {
    fn post(&self, url: &str, body: Vec<u8>) -> Result<Vec<u8>, String> {
        let path = url.find("/inotify/").map(|i| &url[i..]).unwrap_or(url);
        self.server.handle_post(path, &body)
    }
}

/// Connector resolving addresses to in-process loopback servers.
pub struct LoopbackNetwork<S: LoopbackServer> {
    servers: RwLock<HashMap<String, Arc<S>>>,
}

impl<S: LoopbackServer> LoopbackNetwork<S> {
    /// Creates an empty network.
    pub fn new() -> Self {
        Self {
            servers: RwLock::new(HashMap::new()),
        }
    }

    /// Binds a server to an address.
    pub fn bind(&self, addr: impl Into<String>, server: Arc<S>) {
        self.servers.write().insert(addr.into(), server);
    }

    /// Removes the server bound to an address.
    pub fn unbind(&self, addr: &str) {
        self.servers.write().remove(addr);
    }
}

impl<S: LoopbackServer> Default for LoopbackNetwork<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: LoopbackServer> AuthorityConnector for LoopbackNetwork<S> {
    type Fetcher = RpcFetcher<LoopbackClient<S>>;

    fn connect(&self, addr: &str) -> StreamResult<Self::Fetcher> {
        let server = self
            .servers
            .read()
            .get(addr)
            .cloned()
            .ok_or_else(|| StreamError::transport_retryable(format!("no route to {addr}")))?;
        Ok(RpcFetcher::new(
            format!("loopback://{addr}"),
            LoopbackClient::new(server),
        ))
    }
}

impl<S: LoopbackServer> AuthorityConnector for Arc<LoopbackNetwork<S>> {
    type Fetcher = RpcFetcher<LoopbackClient<S>>;

    fn connect(&self, addr: &str) -> StreamResult<Self::Fetcher> {
        (**self).connect(addr)
    }
}
