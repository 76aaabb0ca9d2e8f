//! Error types for the protocol crate.

use thiserror::Error;

/// Result type for protocol operations.
pub type ProtocolResult<T> = Result<T, ProtocolError>;

/// Errors that can occur while building, encoding or decoding protocol values.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// Failed to encode a message to CBOR.
    #[error("encoding failed: {message}")]
    EncodingFailed {
        /// Description of the encoding error.
        message: String,
    },

    /// Failed to decode CBOR bytes.
    #[error("decoding failed: {message}")]
    DecodingFailed {
        /// Description of the decoding error.
        message: String,
    },

    /// Operation code outside the catalog.
    #[error("unknown operation code: {0:#04x}")]
    UnknownOpCode(u8),

    /// Malformed symbolic permission string.
    #[error("invalid permission: {0}")]
    InvalidPermission(String),

    /// Malformed ACL entry or ACL spec.
    #[error("invalid ACL spec: {0}")]
    InvalidAclSpec(String),

    /// Extended attribute name without a known namespace prefix.
    #[error("invalid xattr name: {0}")]
    InvalidXAttrName(String),

    /// Operations in a batch are not in strictly increasing sequence order.
    #[error("batch out of order: {next} follows {previous}")]
    NonMonotonicBatch {
        /// Sequence number seen first.
        previous: u64,
        /// Sequence number that did not increase.
        next: u64,
    },
}

impl ProtocolError {
    /// Create an encoding failed error.
    pub fn encoding_failed(message: impl Into<String>) -> Self {
        Self::EncodingFailed {
            message: message.into(),
        }
    }

    /// Create a decoding failed error.
    pub fn decoding_failed(message: impl Into<String>) -> Self {
        Self::DecodingFailed {
            message: message.into(),
        }
    }
}
