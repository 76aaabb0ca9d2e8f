//! Change events delivered to subscribers.

use crate::types::{AclEntry, FsPermission, XAttr};
use serde::{Deserialize, Serialize};

/// Type of a change event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    /// Inode created.
    Create,
    /// File closed.
    Close,
    /// File reopened for append.
    Append,
    /// Inode renamed.
    Rename,
    /// Inode metadata changed.
    Metadata,
    /// Inode deleted.
    Unlink,
}

/// Kind of inode a create event refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum INodeType {
    /// Regular file.
    File,
    /// Directory.
    Directory,
    /// Symbolic link.
    Symlink,
}

/// An inode was created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateEvent {
    /// Created path.
    pub path: String,
    /// Kind of inode.
    pub inode_type: INodeType,
    /// Creation time (ms since epoch).
    pub ctime: i64,
    /// Replication factor; zero for directories and symlinks.
    pub replication: u16,
    /// Owning user.
    pub owner: String,
    /// Owning group.
    pub group: String,
    /// Permission bits.
    pub perms: FsPermission,
    /// Link target, for symlinks only.
    pub symlink_target: Option<String>,
    /// Whether an existing file was overwritten.
    pub overwrite: bool,
}

/// A file was closed after writing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CloseEvent {
    /// Closed path.
    pub path: String,
    /// Final size, unknown for concatenation targets.
    pub file_size: Option<u64>,
    /// Time of the close.
    pub timestamp: i64,
}

/// A file was reopened for append.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppendEvent {
    /// Appended path.
    pub path: String,
}

/// An inode was renamed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenameEvent {
    /// Previous path.
    pub src_path: String,
    /// New path.
    pub dst_path: String,
    /// Time of the rename.
    pub timestamp: i64,
}

/// An inode was deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnlinkEvent {
    /// Deleted path.
    pub path: String,
    /// Time of the deletion.
    pub timestamp: i64,
}

/// Which piece of metadata a metadata event changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetadataType {
    /// Modification/access times.
    Times,
    /// Replication factor.
    Replication,
    /// Owner and group.
    Owner,
    /// Permission bits.
    Perms,
    /// Access control list.
    Acls,
    /// Extended attributes.
    Xattrs,
}

/// Typed payload of a metadata change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MetadataUpdate {
    /// New times; `-1` means unchanged.
    Times {
        /// Modification time.
        mtime: i64,
        /// Access time.
        atime: i64,
    },
    /// New replication factor.
    Replication {
        /// Replication factor.
        replication: u16,
    },
    /// New owner and/or group.
    Owner {
        /// Owner, if changed.
        owner: Option<String>,
        /// Group, if changed.
        group: Option<String>,
    },
    /// New permission bits.
    Perms {
        /// Permission bits.
        perms: FsPermission,
    },
    /// New ACL; `None` means the ACL was removed.
    Acls {
        /// ACL entries.
        entries: Option<Vec<AclEntry>>,
    },
    /// Extended attributes set or removed.
    Xattrs {
        /// Affected attributes.
        xattrs: Vec<XAttr>,
        /// True when the attributes were removed.
        removed: bool,
    },
}

impl MetadataUpdate {
    /// Returns the metadata type tag.
    pub fn metadata_type(&self) -> MetadataType {
        match self {
            MetadataUpdate::Times { .. } => MetadataType::Times,
            MetadataUpdate::Replication { .. } => MetadataType::Replication,
            MetadataUpdate::Owner { .. } => MetadataType::Owner,
            MetadataUpdate::Perms { .. } => MetadataType::Perms,
            MetadataUpdate::Acls { .. } => MetadataType::Acls,
            MetadataUpdate::Xattrs { .. } => MetadataType::Xattrs,
        }
    }
}

/// Metadata of an inode changed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataUpdateEvent {
    /// Affected path.
    pub path: String,
    /// What changed.
    pub update: MetadataUpdate,
}

impl MetadataUpdateEvent {
    /// Creates a new metadata event.
    pub fn new(path: impl Into<String>, update: MetadataUpdate) -> Self {
        Self {
            path: path.into(),
            update,
        }
    }

    /// Returns the metadata type tag.
    pub fn metadata_type(&self) -> MetadataType {
        self.update.metadata_type()
    }
}

/// A change notification derived from one edit-log operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// Inode created.
    Create(CreateEvent),
    /// File closed.
    Close(CloseEvent),
    /// File reopened for append.
    Append(AppendEvent),
    /// Inode renamed.
    Rename(RenameEvent),
    /// Inode metadata changed.
    Metadata(MetadataUpdateEvent),
    /// Inode deleted.
    Unlink(UnlinkEvent),
}

impl Event {
    /// Returns the event type.
    pub fn event_type(&self) -> EventType {
        match self {
            Event::Create(_) => EventType::Create,
            Event::Close(_) => EventType::Close,
            Event::Append(_) => EventType::Append,
            Event::Rename(_) => EventType::Rename,
            Event::Metadata(_) => EventType::Metadata,
            Event::Unlink(_) => EventType::Unlink,
        }
    }

    /// Returns the path the event is about (the source path for renames).
    pub fn path(&self) -> &str {
        match self {
            Event::Create(e) => &e.path,
            Event::Close(e) => &e.path,
            Event::Append(e) => &e.path,
            Event::Rename(e) => &e.src_path,
            Event::Metadata(e) => &e.path,
            Event::Unlink(e) => &e.path,
        }
    }
}

/// All events derived from a single operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventBatch {
    /// Sequence number of the source operation.
    pub seq: u64,
    /// Events in emission order.
    pub events: Vec<Event>,
}

impl EventBatch {
    /// Creates a new batch.
    pub fn new(seq: u64, events: Vec<Event>) -> Self {
        Self { seq, events }
    }
}
