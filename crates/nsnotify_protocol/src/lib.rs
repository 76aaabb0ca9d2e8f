//! # nsnotify Protocol
//!
//! Edit-log operations, change events and the translation between them.
//!
//! This crate provides:
//! - `OpCode`, the closed catalog of edit-log operation kinds
//! - `Operation` and `OpBody`, one logged namespace mutation
//! - `Event`, the typed change notifications handed to subscribers
//! - `translate`, the pure operation-to-events mapping
//! - Fetch and position messages exchanged with the authority (CBOR)
//!
//! This is a pure protocol crate with no I/O operations.
//!
//! ## Key Invariants
//!
//! - Every `OpCode` has an explicit (possibly empty) event mapping
//! - Translation is deterministic and depends only on the operation itself
//! - Multi-event expansions are emitted in a fixed order

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod event;
mod messages;
mod operation;
mod translate;
mod types;

pub use error::{ProtocolError, ProtocolResult};
pub use event::{
    AppendEvent, CloseEvent, CreateEvent, Event, EventBatch, EventType, INodeType,
    MetadataType, MetadataUpdate, MetadataUpdateEvent, RenameEvent, UnlinkEvent,
};
pub use messages::{
    FetchRequest, FetchResponse, OpBatch, PositionRequest, PositionResponse, EDITS_ENDPOINT,
    POSITION_ENDPOINT,
};
pub use operation::{OpBody, OpCode, Operation};
pub use translate::{translate, translate_all};
pub use types::{
    AclEntry, AclEntryScope, AclEntryType, Block, FsAction, FsPermission, PermissionStatus,
    XAttr, XAttrNamespace,
};
