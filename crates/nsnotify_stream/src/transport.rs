//! Transport layer abstraction for reaching an authority.

use crate::error::{StreamError, StreamResult};
use nsnotify_protocol::{FetchRequest, FetchResponse, PositionResponse};
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

/// A connection to one authority.
///
/// This trait abstracts the network layer, allowing for different
/// implementations (RPC over HTTP, in-process loopback, mock for testing).
pub trait BatchFetcher: Send + Sync {
    /// Requests committed operations after `request.after`.
    fn fetch(&self, request: &FetchRequest) -> StreamResult<FetchResponse>;

    /// Asks for the authority's highest committed sequence number.
    fn position(&self) -> StreamResult<PositionResponse>;
}

/// Opens connections to authorities by address.
///
/// The stream owns the connector and replaces its fetcher wholesale when
/// it is redirected or fails over.
pub trait AuthorityConnector {
    /// Connection type produced by this connector.
    type Fetcher: BatchFetcher;

    /// Connects to the authority at `addr`.
    fn connect(&self, addr: &str) -> StreamResult<Self::Fetcher>;
}

enum MockReply {
    Response(FetchResponse),
    Failure { message: String, retryable: bool },
}

#[derive(Default)]
struct MockState {
    replies: VecDeque<MockReply>,
    position: Option<PositionResponse>,
    requests: Vec<FetchRequest>,
}

/// A scripted fetcher for testing.
///
/// Replies are served in the order they were queued; once the queue is
/// drained every fetch reports `Empty`. Clones share their script.
#[derive(Clone, Default)]
pub struct MockFetcher {
    state: Arc<Mutex<MockState>>,
}

impl MockFetcher {
    /// Creates a new mock fetcher.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a fetch response.
    pub fn push_response(&self, response: FetchResponse) {
        self.state
            .lock()
            .replies
            .push_back(MockReply::Response(response));
    }

    /// Queues a transport failure.
    pub fn push_failure(&self, message: impl Into<String>, retryable: bool) {
        self.state.lock().replies.push_back(MockReply::Failure {
            message: message.into(),
            retryable,
        });
    }

    /// Sets the position response.
    pub fn set_position(&self, response: PositionResponse) {
        self.state.lock().position = Some(response);
    }

    /// Returns every fetch request seen so far.
    pub fn requests(&self) -> Vec<FetchRequest> {
        self.state.lock().requests.clone()
    }
}

impl BatchFetcher for MockFetcher {
    fn fetch(&self, request: &FetchRequest) -> StreamResult<FetchResponse> {
        let mut state = self.state.lock();
        state.requests.push(request.clone());
        match state.replies.pop_front() {
            Some(MockReply::Response(response)) => Ok(response),
            Some(MockReply::Failure { message, retryable }) => {
                Err(StreamError::Transport { message, retryable })
            }
            None => Ok(FetchResponse::Empty {
                last_committed: request.after,
            }),
        }
    }

    fn position(&self) -> StreamResult<PositionResponse> {
        Ok(self
            .state
            .lock()
            .position
            .clone()
            .unwrap_or(PositionResponse::Position { last_committed: 0 }))
    }
}

/// A connector over a fixed set of mock fetchers.
#[derive(Default)]
pub struct MockConnector {
    fetchers: Mutex<HashMap<String, MockFetcher>>,
    connections: Mutex<Vec<String>>,
}

impl MockConnector {
    /// Creates a connector with no reachable authority.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes `addr` reachable and returns its fetcher.
    pub fn add(&self, addr: impl Into<String>) -> MockFetcher {
        let fetcher = MockFetcher::new();
        self.fetchers.lock().insert(addr.into(), fetcher.clone());
        fetcher
    }

    /// Makes `addr` unreachable.
    pub fn remove(&self, addr: &str) {
        self.fetchers.lock().remove(addr);
    }

    /// Addresses connected to so far, in order.
    pub fn connections(&self) -> Vec<String> {
        self.connections.lock().clone()
    }
}

impl AuthorityConnector for MockConnector {
    type Fetcher = MockFetcher;

    fn connect(&self, addr: &str) -> StreamResult<MockFetcher> {
        self.connections.lock().push(addr.to_string());
        self.fetchers
            .lock()
            .get(addr)
            .cloned()
            .ok_or_else(|| StreamError::transport_retryable(format!("connection refused: {addr}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nsnotify_protocol::OpBatch;

    #[test]
    fn mock_fetcher_replays_script() {
        let fetcher = MockFetcher::new();
        fetcher.push_response(FetchResponse::Batch(OpBatch::new(vec![], 4)));
        fetcher.push_failure("reset by peer", true);

        let request = FetchRequest::new(2, 10);
        assert!(matches!(
            fetcher.fetch(&request),
            Ok(FetchResponse::Batch(_))
        ));
        let err = fetcher.fetch(&request).unwrap_err();
        assert!(err.is_retryable());
        assert_eq!(
            fetcher.fetch(&request).unwrap(),
            FetchResponse::Empty { last_committed: 2 }
        );
        assert_eq!(fetcher.requests().len(), 3);
    }

    #[test]
    fn mock_fetcher_position() {
        let fetcher = MockFetcher::new();
        assert_eq!(
            fetcher.position().unwrap(),
            PositionResponse::Position { last_committed: 0 }
        );
        fetcher.set_position(PositionResponse::Position { last_committed: 9 });
        assert_eq!(
            fetcher.position().unwrap(),
            PositionResponse::Position { last_committed: 9 }
        );
    }

    #[test]
    fn mock_connector_reachability() {
        let connector = MockConnector::new();
        let handle = connector.add("nn0");
        handle.set_position(PositionResponse::Position { last_committed: 3 });

        let fetcher = connector.connect("nn0").unwrap();
        assert_eq!(
            fetcher.position().unwrap(),
            PositionResponse::Position { last_committed: 3 }
        );

        connector.remove("nn0");
        let err = connector.connect("nn0").err().unwrap();
        assert!(err.is_retryable());
        assert_eq!(connector.connections(), vec!["nn0", "nn0"]);
    }
}
