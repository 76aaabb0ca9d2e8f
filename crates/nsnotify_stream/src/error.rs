//! Error types for the event stream.

use nsnotify_protocol::ProtocolError;
use thiserror::Error;

/// Result type for stream operations.
pub type StreamResult<T> = Result<T, StreamError>;

/// Errors that can occur while reading events.
#[derive(Error, Debug)]
pub enum StreamError {
    /// Network or transport error.
    #[error("transport error: {message}")]
    Transport {
        /// Error message.
        message: String,
        /// Whether the operation can be retried.
        retryable: bool,
    },

    /// Protocol error (invalid message or batch).
    #[error("protocol error: {0}")]
    Protocol(String),

    /// History between the cursor and the authority's retained log is gone.
    ///
    /// The caller has to resubscribe from a fresh position.
    #[error("missing events: cursor at {last_cursor}, authority retains from {first_available}")]
    MissingEvents {
        /// Last sequence number fully delivered.
        last_cursor: u64,
        /// Oldest sequence number the authority can still serve.
        first_available: u64,
    },

    /// Too many redirects were followed in one request.
    #[error("gave up after {hops} redirects")]
    RedirectLoop {
        /// Number of redirects followed.
        hops: u32,
    },

    /// The configuration lists no authority.
    #[error("no authority configured")]
    NoAuthorities,

    /// A blocking poll was cancelled.
    #[error("poll cancelled")]
    Cancelled,
}

impl StreamError {
    /// Creates a retryable transport error.
    pub fn transport_retryable(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            retryable: true,
        }
    }

    /// Creates a non-retryable transport error.
    pub fn transport_fatal(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            retryable: false,
        }
    }

    /// Returns true if this error can be retried.
    pub fn is_retryable(&self) -> bool {
        match self {
            StreamError::Transport { retryable, .. } => *retryable,
            StreamError::RedirectLoop { .. } => true,
            _ => false,
        }
    }
}

impl From<ProtocolError> for StreamError {
    fn from(err: ProtocolError) -> Self {
        StreamError::Protocol(err.to_string())
    }
}
