//! Messages exchanged between a stream and the authority.
//!
//! Bodies are CBOR encoded.

use crate::error::{ProtocolError, ProtocolResult};
use crate::operation::Operation;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Endpoint serving `FetchRequest`.
pub const EDITS_ENDPOINT: &str = "/inotify/edits";

/// Endpoint serving `PositionRequest`.
pub const POSITION_ENDPOINT: &str = "/inotify/position";

fn to_cbor<T: Serialize>(value: &T) -> ProtocolResult<Vec<u8>> {
    let mut bytes = Vec::new();
    ciborium::ser::into_writer(value, &mut bytes)
        .map_err(|e| ProtocolError::encoding_failed(e.to_string()))?;
    Ok(bytes)
}

fn from_cbor<T: DeserializeOwned>(bytes: &[u8]) -> ProtocolResult<T> {
    ciborium::de::from_reader(bytes).map_err(|e| ProtocolError::decoding_failed(e.to_string()))
}

/// Request for committed operations after a position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchRequest {
    /// Last sequence number the client has fully consumed.
    pub after: u64,
    /// Maximum number of operations to return.
    pub limit: u32,
}

impl FetchRequest {
    /// Creates a new fetch request.
    pub fn new(after: u64, limit: u32) -> Self {
        Self { after, limit }
    }

    /// Encodes to CBOR.
    pub fn encode(&self) -> ProtocolResult<Vec<u8>> {
        to_cbor(self)
    }

    /// Decodes from CBOR.
    pub fn decode(bytes: &[u8]) -> ProtocolResult<Self> {
        from_cbor(bytes)
    }
}

/// A contiguous run of committed operations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpBatch {
    /// Operations in commit order.
    pub operations: Vec<Operation>,
    /// Highest sequence number the serving authority had committed when
    /// the batch was read.
    pub last_committed: u64,
}

impl OpBatch {
    /// Creates a new batch.
    pub fn new(operations: Vec<Operation>, last_committed: u64) -> Self {
        Self {
            operations,
            last_committed,
        }
    }

    /// Sequence number of the first operation.
    pub fn first_seq(&self) -> Option<u64> {
        self.operations.first().map(|op| op.seq)
    }

    /// Sequence number of the last operation.
    pub fn last_seq(&self) -> Option<u64> {
        self.operations.last().map(|op| op.seq)
    }

    /// Returns the number of operations.
    pub fn len(&self) -> usize {
        self.operations.len()
    }

    /// Returns true if the batch holds no operations.
    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// Returns the first sequence number missing between two operations
    /// of the batch, if the run is not contiguous.
    pub fn first_missing(&self) -> Option<u64> {
        self.operations
            .windows(2)
            .find(|pair| pair[0].seq.checked_add(1) != Some(pair[1].seq))
            .map(|pair| pair[0].seq.saturating_add(1))
    }

    /// Checks that sequence numbers strictly increase.
    pub fn validate(&self) -> ProtocolResult<()> {
        for pair in self.operations.windows(2) {
            if pair[1].seq <= pair[0].seq {
                return Err(ProtocolError::NonMonotonicBatch {
                    previous: pair[0].seq,
                    next: pair[1].seq,
                });
            }
        }
        Ok(())
    }
}

/// Authority reply to a `FetchRequest`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FetchResponse {
    /// Operations following the requested position.
    Batch(OpBatch),
    /// Nothing committed after the requested position yet.
    Empty {
        /// Highest committed sequence number.
        last_committed: u64,
    },
    /// This authority is not serving; ask `target` instead.
    Redirect {
        /// Address of the authority to reconnect to.
        target: String,
    },
    /// The requested position precedes retained history.
    Gap {
        /// Position the client asked to resume after.
        requested: u64,
        /// Oldest sequence number still retained.
        first_available: u64,
    },
}

impl FetchResponse {
    /// Encodes to CBOR.
    pub fn encode(&self) -> ProtocolResult<Vec<u8>> {
        to_cbor(self)
    }

    /// Decodes from CBOR.
    pub fn decode(bytes: &[u8]) -> ProtocolResult<Self> {
        from_cbor(bytes)
    }
}

/// Request for the authority's current committed position.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionRequest {}

impl PositionRequest {
    /// Encodes to CBOR.
    pub fn encode(&self) -> ProtocolResult<Vec<u8>> {
        to_cbor(self)
    }

    /// Decodes from CBOR.
    pub fn decode(bytes: &[u8]) -> ProtocolResult<Self> {
        from_cbor(bytes)
    }
}

/// Authority reply to a `PositionRequest`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PositionResponse {
    /// Highest committed sequence number.
    Position {
        /// Highest committed sequence number.
        last_committed: u64,
    },
    /// This authority is not serving; ask `target` instead.
    Redirect {
        /// Address of the authority to reconnect to.
        target: String,
    },
}

impl PositionResponse {
    /// Encodes to CBOR.
    pub fn encode(&self) -> ProtocolResult<Vec<u8>> {
        to_cbor(self)
    }

    /// Decodes from CBOR.
    pub fn decode(bytes: &[u8]) -> ProtocolResult<Self> {
        from_cbor(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operation::OpBody;
    use crate::types::{AclEntry, FsPermission, PermissionStatus, XAttr};

    fn sample_ops() -> Vec<Operation> {
        vec![
            Operation::new(
                11,
                OpBody::Mkdir {
                    path: "/dir".into(),
                    timestamp: 1_700_000_000_000,
                    permissions: PermissionStatus::new(
                        "hdfs",
                        "supergroup",
                        FsPermission::from_mode(0o755),
                    ),
                },
            ),
            Operation::new(
                12,
                OpBody::SetXAttr {
                    path: "/dir".into(),
                    xattrs: vec![XAttr::from_prefixed_name("user.k", Some(vec![0, 1, 255])).unwrap()],
                },
            ),
            Operation::new(
                13,
                OpBody::SetAcl {
                    path: "/dir".into(),
                    entries: AclEntry::parse_spec("user::rwx,group::r-x,other::---").unwrap(),
                },
            ),
            Operation::new(14, OpBody::EndLogSegment),
        ]
    }

    #[test]
    fn fetch_request_roundtrip() {
        let request = FetchRequest::new(41, 1000);
        let decoded = FetchRequest::decode(&request.encode().unwrap()).unwrap();
        assert_eq!(decoded, request);
    }

    #[test]
    fn batch_response_preserves_operations() {
        let response = FetchResponse::Batch(OpBatch::new(sample_ops(), 20));
        let decoded = FetchResponse::decode(&response.encode().unwrap()).unwrap();
        assert_eq!(decoded, response);
    }

    #[test]
    fn non_batch_responses() {
        for response in [
            FetchResponse::Empty { last_committed: 9 },
            FetchResponse::Redirect {
                target: "nn2:8020".into(),
            },
            FetchResponse::Gap {
                requested: 3,
                first_available: 50,
            },
        ] {
            let decoded = FetchResponse::decode(&response.encode().unwrap()).unwrap();
            assert_eq!(decoded, response);
        }
    }

    #[test]
    fn position_messages() {
        let request = PositionRequest::default();
        assert_eq!(
            PositionRequest::decode(&request.encode().unwrap()).unwrap(),
            request
        );

        let response = PositionResponse::Position { last_committed: 77 };
        assert_eq!(
            PositionResponse::decode(&response.encode().unwrap()).unwrap(),
            response
        );
    }

    #[test]
    fn decode_garbage_fails() {
        let err = FetchResponse::decode(&[0xff, 0x00, 0x13]).unwrap_err();
        assert!(matches!(err, ProtocolError::DecodingFailed { .. }));
    }

    #[test]
    fn batch_bounds_and_validation() {
        let batch = OpBatch::new(sample_ops(), 14);
        assert_eq!(batch.first_seq(), Some(11));
        assert_eq!(batch.last_seq(), Some(14));
        assert_eq!(batch.len(), 4);
        assert!(batch.validate().is_ok());

        let mut ops = sample_ops();
        ops.swap(1, 2);
        let err = OpBatch::new(ops, 14).validate().unwrap_err();
        assert_eq!(
            err,
            ProtocolError::NonMonotonicBatch {
                previous: 13,
                next: 12
            }
        );

        let empty = OpBatch::new(vec![], 0);
        assert!(empty.is_empty());
        assert_eq!(empty.first_seq(), None);
        assert_eq!(empty.first_missing(), None);
    }

    #[test]
    fn batch_holes_are_found() {
        assert_eq!(OpBatch::new(sample_ops(), 14).first_missing(), None);

        let mut ops = sample_ops();
        ops.remove(1);
        let batch = OpBatch::new(ops, 14);
        assert!(batch.validate().is_ok());
        assert_eq!(batch.first_missing(), Some(12));
    }
}
