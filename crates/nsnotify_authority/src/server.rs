//! CBOR endpoint dispatch for one authority node.

use crate::error::{AuthorityError, AuthorityResult};
use crate::node::AuthorityNode;
use nsnotify_protocol::{
    FetchRequest, FetchResponse, PositionRequest, PositionResponse, EDITS_ENDPOINT,
    POSITION_ENDPOINT,
};
use std::sync::Arc;

/// Request front end of an authority node.
///
/// Decodes CBOR request bodies, dispatches them to the node and encodes
/// the reply. In a deployment these are the bodies of HTTP POSTs to
/// `/inotify/edits` and `/inotify/position`.
///
/// # Example
///
/// ```
/// use nsnotify_authority::{AuthorityConfig, AuthorityServer, Nameservice};
/// use nsnotify_protocol::{FetchRequest, FetchResponse};
///
/// let ns = Nameservice::with_nodes(["nn0"], AuthorityConfig::default());
/// ns.transition_to_active("nn0").unwrap();
/// let server = AuthorityServer::new(ns.node("nn0").unwrap());
///
/// let body = FetchRequest::new(0, 100).encode().unwrap();
/// let reply = server.handle_post("/inotify/edits", &body).unwrap();
/// assert!(matches!(
///     FetchResponse::decode(&reply).unwrap(),
///     FetchResponse::Empty { last_committed: 0 }
/// ));
/// ```
pub struct AuthorityServer {
    node: Arc<AuthorityNode>,
}

impl AuthorityServer {
    /// Creates a server for a node.
    pub fn new(node: Arc<AuthorityNode>) -> Self {
        Self { node }
    }

    /// Returns the served node.
    pub fn node(&self) -> &Arc<AuthorityNode> {
        &self.node
    }

    /// Returns the served node's address.
    pub fn address(&self) -> &str {
        self.node.address()
    }

    /// Handles a fetch request.
    pub fn handle_fetch(&self, request: FetchRequest) -> AuthorityResult<FetchResponse> {
        self.node.handle_fetch(&request)
    }

    /// Handles a position request.
    pub fn handle_position(&self, _request: PositionRequest) -> AuthorityResult<PositionResponse> {
        self.node.handle_position()
    }

    /// Handles an encoded POST to one of the inotify endpoints.
    pub fn handle_post(&self, path: &str, body: &[u8]) -> AuthorityResult<Vec<u8>> {
        match path {
            EDITS_ENDPOINT => {
                let request = FetchRequest::decode(body)?;
                Ok(self.handle_fetch(request)?.encode()?)
            }
            POSITION_ENDPOINT => {
                let request = PositionRequest::decode(body)?;
                Ok(self.handle_position(request)?.encode()?)
            }
            other => Err(AuthorityError::UnknownEndpoint(other.to_string())),
        }
    }
}
