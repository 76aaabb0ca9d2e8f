//! Error types for the authority.

use nsnotify_protocol::ProtocolError;
use thiserror::Error;

/// Result type for authority operations.
pub type AuthorityResult<T> = Result<T, AuthorityError>;

/// Errors that can occur in the authority.
#[derive(Error, Debug)]
pub enum AuthorityError {
    /// Invalid request format.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Request for an endpoint that does not exist.
    #[error("unknown endpoint: {0}")]
    UnknownEndpoint(String),

    /// A newer epoch has been promised to the journal.
    #[error("writer fenced: epoch {epoch} superseded by {promised}")]
    Fenced {
        /// Epoch of the rejected writer.
        epoch: u64,
        /// Highest epoch promised by the journal.
        promised: u64,
    },

    /// The node is not serving as the active authority.
    #[error("authority {0} is not active")]
    NotActive(String),

    /// The node has been shut down.
    #[error("authority {0} is stopped")]
    Stopped(String),

    /// No node is registered under the address.
    #[error("unknown authority: {0}")]
    UnknownNode(String),

    /// Message encoding or decoding failed.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AuthorityError {
    /// Returns true if this is a client error (4xx).
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            AuthorityError::InvalidRequest(_)
                | AuthorityError::UnknownEndpoint(_)
                | AuthorityError::UnknownNode(_)
                | AuthorityError::Protocol(_)
        )
    }

    /// Returns true if this is a server error (5xx).
    pub fn is_server_error(&self) -> bool {
        matches!(
            self,
            AuthorityError::Fenced { .. }
                | AuthorityError::NotActive(_)
                | AuthorityError::Stopped(_)
                | AuthorityError::Internal(_)
        )
    }
}
