//! Edit-log operations.
//!
//! `OpCode` is the closed catalog of operation kinds the authority can
//! log. `OpBody` has exactly one variant per code so that every consumer
//! matching on it is checked for exhaustiveness by the compiler.

use crate::types::{AclEntry, Block, FsPermission, PermissionStatus, XAttr};
use serde::{Deserialize, Serialize};

/// Kind of an edit-log operation.
///
/// Adding a variant here changes `OpCode::COUNT` and fails the catalog
/// size test until the new kind has an explicit event mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum OpCode {
    /// File created or reopened for append.
    Add,
    /// Rename recorded by the legacy rename call.
    RenameOld,
    /// Inode deleted.
    Delete,
    /// Directory created.
    Mkdir,
    /// Replication factor changed.
    SetReplication,
    /// Obsolete data node registration.
    DatanodeAdd,
    /// Obsolete data node removal.
    DatanodeRemove,
    /// Permission bits changed.
    SetPermissions,
    /// Owner or group changed.
    SetOwner,
    /// File closed after writing.
    Close,
    /// Legacy generation stamp update.
    SetGenstampV1,
    /// Obsolete namespace quota set.
    SetNsQuota,
    /// Obsolete namespace quota clear.
    ClearNsQuota,
    /// Modification or access time changed.
    Times,
    /// Namespace and space quota set.
    SetQuota,
    /// Rename with options.
    Rename,
    /// Sources concatenated onto a target and deleted.
    ConcatDelete,
    /// Symbolic link created.
    Symlink,
    /// Delegation token issued.
    GetDelegationToken,
    /// Delegation token renewed.
    RenewDelegationToken,
    /// Delegation token cancelled.
    CancelDelegationToken,
    /// Token master key rolled.
    UpdateMasterKey,
    /// File lease moved to a new holder.
    ReassignLease,
    /// Log segment finalized.
    EndLogSegment,
    /// Log segment started.
    StartLogSegment,
    /// Block list of an open file updated.
    UpdateBlocks,
    /// Snapshot created.
    CreateSnapshot,
    /// Snapshot deleted.
    DeleteSnapshot,
    /// Snapshot renamed.
    RenameSnapshot,
    /// Directory made snapshottable.
    AllowSnapshot,
    /// Directory made non-snapshottable.
    DisallowSnapshot,
    /// Generation stamp update.
    SetGenstampV2,
    /// Block id allocated.
    AllocateBlockId,
    /// Block appended to an open file.
    AddBlock,
    /// Cache directive added.
    AddCacheDirective,
    /// Cache directive removed.
    RemoveCacheDirective,
    /// Cache pool added.
    AddCachePool,
    /// Cache pool modified.
    ModifyCachePool,
    /// Cache pool removed.
    RemoveCachePool,
    /// Cache directive modified.
    ModifyCacheDirective,
    /// ACL replaced or removed.
    SetAcl,
    /// Rolling upgrade started.
    RollingUpgradeStart,
    /// Rolling upgrade finalized.
    RollingUpgradeFinalize,
    /// Extended attributes set.
    SetXAttr,
    /// Extended attributes removed.
    RemoveXAttr,
    /// Marker for an unreadable record.
    Invalid,
}

impl OpCode {
    /// Number of operation kinds in the catalog.
    pub const COUNT: usize = 46;

    /// Every operation kind, in wire code order (`Invalid` last).
    pub const ALL: [OpCode; OpCode::COUNT] = [
        OpCode::Add,
        OpCode::RenameOld,
        OpCode::Delete,
        OpCode::Mkdir,
        OpCode::SetReplication,
        OpCode::DatanodeAdd,
        OpCode::DatanodeRemove,
        OpCode::SetPermissions,
        OpCode::SetOwner,
        OpCode::Close,
        OpCode::SetGenstampV1,
        OpCode::SetNsQuota,
        OpCode::ClearNsQuota,
        OpCode::Times,
        OpCode::SetQuota,
        OpCode::Rename,
        OpCode::ConcatDelete,
        OpCode::Symlink,
        OpCode::GetDelegationToken,
        OpCode::RenewDelegationToken,
        OpCode::CancelDelegationToken,
        OpCode::UpdateMasterKey,
        OpCode::ReassignLease,
        OpCode::EndLogSegment,
        OpCode::StartLogSegment,
        OpCode::UpdateBlocks,
        OpCode::CreateSnapshot,
        OpCode::DeleteSnapshot,
        OpCode::RenameSnapshot,
        OpCode::AllowSnapshot,
        OpCode::DisallowSnapshot,
        OpCode::SetGenstampV2,
        OpCode::AllocateBlockId,
        OpCode::AddBlock,
        OpCode::AddCacheDirective,
        OpCode::RemoveCacheDirective,
        OpCode::AddCachePool,
        OpCode::ModifyCachePool,
        OpCode::RemoveCachePool,
        OpCode::ModifyCacheDirective,
        OpCode::SetAcl,
        OpCode::RollingUpgradeStart,
        OpCode::RollingUpgradeFinalize,
        OpCode::SetXAttr,
        OpCode::RemoveXAttr,
        OpCode::Invalid,
    ];

    /// Converts to the one-byte wire code.
    pub fn to_code(&self) -> u8 {
        match self {
            OpCode::Add => 0,
            OpCode::RenameOld => 1,
            OpCode::Delete => 2,
            OpCode::Mkdir => 3,
            OpCode::SetReplication => 4,
            OpCode::DatanodeAdd => 5,
            OpCode::DatanodeRemove => 6,
            OpCode::SetPermissions => 7,
            OpCode::SetOwner => 8,
            OpCode::Close => 9,
            OpCode::SetGenstampV1 => 10,
            OpCode::SetNsQuota => 11,
            OpCode::ClearNsQuota => 12,
            OpCode::Times => 13,
            OpCode::SetQuota => 14,
            OpCode::Rename => 15,
            OpCode::ConcatDelete => 16,
            OpCode::Symlink => 17,
            OpCode::GetDelegationToken => 18,
            OpCode::RenewDelegationToken => 19,
            OpCode::CancelDelegationToken => 20,
            OpCode::UpdateMasterKey => 21,
            OpCode::ReassignLease => 22,
            OpCode::EndLogSegment => 23,
            OpCode::StartLogSegment => 24,
            OpCode::UpdateBlocks => 25,
            OpCode::CreateSnapshot => 26,
            OpCode::DeleteSnapshot => 27,
            OpCode::RenameSnapshot => 28,
            OpCode::AllowSnapshot => 29,
            OpCode::DisallowSnapshot => 30,
            OpCode::SetGenstampV2 => 31,
            OpCode::AllocateBlockId => 32,
            OpCode::AddBlock => 33,
            OpCode::AddCacheDirective => 34,
            OpCode::RemoveCacheDirective => 35,
            OpCode::AddCachePool => 36,
            OpCode::ModifyCachePool => 37,
            OpCode::RemoveCachePool => 38,
            OpCode::ModifyCacheDirective => 39,
            OpCode::SetAcl => 40,
            OpCode::RollingUpgradeStart => 41,
            OpCode::RollingUpgradeFinalize => 42,
            OpCode::SetXAttr => 43,
            OpCode::RemoveXAttr => 44,
            OpCode::Invalid => 0xFF,
        }
    }

    /// Converts from a wire code.
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0..=44 => Some(Self::ALL[code as usize]),
            0xFF => Some(OpCode::Invalid),
            _ => None,
        }
    }
}

/// Kind-specific payload of an edit-log operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum OpBody {
    /// Create (empty block list) or append (existing blocks).
    Add {
        /// File path.
        path: String,
        /// Replication factor.
        replication: u16,
        /// Modification time (ms since epoch).
        mtime: i64,
        /// Access time (ms since epoch).
        atime: i64,
        /// Preferred block size.
        block_size: u64,
        /// Blocks already present in the file.
        blocks: Vec<Block>,
        /// Owner, group and mode.
        permissions: PermissionStatus,
        /// Client holding the lease.
        client_name: String,
        /// Whether an existing file was overwritten.
        overwrite: bool,
    },
    /// Legacy rename.
    RenameOld {
        /// Source path.
        src: String,
        /// Destination path.
        dst: String,
        /// Time of the rename.
        timestamp: i64,
    },
    /// Delete.
    Delete {
        /// Deleted path.
        path: String,
        /// Time of the deletion.
        timestamp: i64,
    },
    /// Directory creation.
    Mkdir {
        /// Directory path.
        path: String,
        /// Creation time.
        timestamp: i64,
        /// Owner, group and mode.
        permissions: PermissionStatus,
    },
    /// Replication change.
    SetReplication {
        /// File path.
        path: String,
        /// New replication factor.
        replication: u16,
    },
    /// Obsolete.
    DatanodeAdd,
    /// Obsolete.
    DatanodeRemove,
    /// Permission change.
    SetPermissions {
        /// Inode path.
        path: String,
        /// New permission bits.
        permission: FsPermission,
    },
    /// Owner and/or group change.
    SetOwner {
        /// Inode path.
        path: String,
        /// New owner, if changed.
        owner: Option<String>,
        /// New group, if changed.
        group: Option<String>,
    },
    /// File close.
    Close {
        /// File path.
        path: String,
        /// Replication factor.
        replication: u16,
        /// Modification time.
        mtime: i64,
        /// Access time.
        atime: i64,
        /// Final block list.
        blocks: Vec<Block>,
        /// Owner, group and mode.
        permissions: PermissionStatus,
    },
    /// Legacy generation stamp.
    SetGenstampV1 {
        /// New generation stamp.
        generation_stamp: u64,
    },
    /// Obsolete namespace quota.
    SetNsQuota {
        /// Directory path.
        path: String,
        /// Namespace quota.
        ns_quota: i64,
    },
    /// Obsolete namespace quota clear.
    ClearNsQuota {
        /// Directory path.
        path: String,
    },
    /// Times change; `-1` leaves a time unchanged.
    Times {
        /// Inode path.
        path: String,
        /// Modification time.
        mtime: i64,
        /// Access time.
        atime: i64,
    },
    /// Quota change.
    SetQuota {
        /// Directory path.
        path: String,
        /// Namespace quota.
        ns_quota: i64,
        /// Disk space quota.
        ds_quota: i64,
    },
    /// Rename with options.
    Rename {
        /// Source path.
        src: String,
        /// Destination path.
        dst: String,
        /// Time of the rename.
        timestamp: i64,
        /// Whether an existing destination was replaced.
        overwrite: bool,
    },
    /// Concatenation of sources onto a target; the sources are deleted.
    ConcatDelete {
        /// Target file.
        target: String,
        /// Source files, in concatenation order.
        sources: Vec<String>,
        /// Time of the concatenation.
        timestamp: i64,
    },
    /// Symlink creation.
    Symlink {
        /// Link path.
        path: String,
        /// Link target.
        target: String,
        /// Modification time.
        mtime: i64,
        /// Access time.
        atime: i64,
        /// Owner, group and mode.
        permissions: PermissionStatus,
    },
    /// Delegation token issued.
    GetDelegationToken {
        /// Token sequence number.
        token_id: u64,
        /// Expiry time.
        expiry: i64,
    },
    /// Delegation token renewed.
    RenewDelegationToken {
        /// Token sequence number.
        token_id: u64,
        /// New expiry time.
        expiry: i64,
    },
    /// Delegation token cancelled.
    CancelDelegationToken {
        /// Token sequence number.
        token_id: u64,
    },
    /// Master key roll.
    UpdateMasterKey {
        /// New key id.
        key_id: u32,
    },
    /// Lease reassignment.
    ReassignLease {
        /// Previous lease holder.
        holder: String,
        /// File path.
        path: String,
        /// New lease holder.
        new_holder: String,
    },
    /// End of a log segment.
    EndLogSegment,
    /// Start of a log segment.
    StartLogSegment,
    /// Block list update for an open file.
    UpdateBlocks {
        /// File path.
        path: String,
        /// Current block list.
        blocks: Vec<Block>,
    },
    /// Snapshot creation.
    CreateSnapshot {
        /// Snapshottable directory.
        root: String,
        /// Snapshot name.
        name: String,
    },
    /// Snapshot deletion.
    DeleteSnapshot {
        /// Snapshottable directory.
        root: String,
        /// Snapshot name.
        name: String,
    },
    /// Snapshot rename.
    RenameSnapshot {
        /// Snapshottable directory.
        root: String,
        /// Previous name.
        old_name: String,
        /// New name.
        new_name: String,
    },
    /// Directory made snapshottable.
    AllowSnapshot {
        /// Directory path.
        root: String,
    },
    /// Directory made non-snapshottable.
    DisallowSnapshot {
        /// Directory path.
        root: String,
    },
    /// Generation stamp update.
    SetGenstampV2 {
        /// New generation stamp.
        generation_stamp: u64,
    },
    /// Block id allocation.
    AllocateBlockId {
        /// Allocated id.
        block_id: u64,
    },
    /// Block appended to an open file.
    AddBlock {
        /// File path.
        path: String,
        /// The new last block.
        block: Block,
    },
    /// Cache directive added.
    AddCacheDirective {
        /// Directive id.
        directive_id: u64,
        /// Cached path.
        path: String,
        /// Owning pool.
        pool: String,
    },
    /// Cache directive removed.
    RemoveCacheDirective {
        /// Directive id.
        directive_id: u64,
    },
    /// Cache pool added.
    AddCachePool {
        /// Pool name.
        pool: String,
    },
    /// Cache pool modified.
    ModifyCachePool {
        /// Pool name.
        pool: String,
    },
    /// Cache pool removed.
    RemoveCachePool {
        /// Pool name.
        pool: String,
    },
    /// Cache directive modified.
    ModifyCacheDirective {
        /// Directive id.
        directive_id: u64,
    },
    /// ACL replacement; an empty list removes the ACL.
    SetAcl {
        /// Inode path.
        path: String,
        /// New ACL entries.
        entries: Vec<AclEntry>,
    },
    /// Rolling upgrade start.
    RollingUpgradeStart {
        /// Start time.
        time: i64,
    },
    /// Rolling upgrade finalize.
    RollingUpgradeFinalize {
        /// Finalize time.
        time: i64,
    },
    /// Extended attributes set.
    SetXAttr {
        /// Inode path.
        path: String,
        /// Attributes with their new values.
        xattrs: Vec<XAttr>,
    },
    /// Extended attributes removed.
    RemoveXAttr {
        /// Inode path.
        path: String,
        /// Removed attributes.
        xattrs: Vec<XAttr>,
    },
    /// Unreadable record.
    Invalid,
}

impl OpBody {
    /// Returns the catalog kind of this body.
    pub fn op_code(&self) -> OpCode {
        match self {
            OpBody::Add { .. } => OpCode::Add,
            OpBody::RenameOld { .. } => OpCode::RenameOld,
            OpBody::Delete { .. } => OpCode::Delete,
            OpBody::Mkdir { .. } => OpCode::Mkdir,
            OpBody::SetReplication { .. } => OpCode::SetReplication,
            OpBody::DatanodeAdd => OpCode::DatanodeAdd,
            OpBody::DatanodeRemove => OpCode::DatanodeRemove,
            OpBody::SetPermissions { .. } => OpCode::SetPermissions,
            OpBody::SetOwner { .. } => OpCode::SetOwner,
            OpBody::Close { .. } => OpCode::Close,
            OpBody::SetGenstampV1 { .. } => OpCode::SetGenstampV1,
            OpBody::SetNsQuota { .. } => OpCode::SetNsQuota,
            OpBody::ClearNsQuota { .. } => OpCode::ClearNsQuota,
            OpBody::Times { .. } => OpCode::Times,
            OpBody::SetQuota { .. } => OpCode::SetQuota,
            OpBody::Rename { .. } => OpCode::Rename,
            OpBody::ConcatDelete { .. } => OpCode::ConcatDelete,
            OpBody::Symlink { .. } => OpCode::Symlink,
            OpBody::GetDelegationToken { .. } => OpCode::GetDelegationToken,
            OpBody::RenewDelegationToken { .. } => OpCode::RenewDelegationToken,
            OpBody::CancelDelegationToken { .. } => OpCode::CancelDelegationToken,
            OpBody::UpdateMasterKey { .. } => OpCode::UpdateMasterKey,
            OpBody::ReassignLease { .. } => OpCode::ReassignLease,
            OpBody::EndLogSegment => OpCode::EndLogSegment,
            OpBody::StartLogSegment => OpCode::StartLogSegment,
            OpBody::UpdateBlocks { .. } => OpCode::UpdateBlocks,
            OpBody::CreateSnapshot { .. } => OpCode::CreateSnapshot,
            OpBody::DeleteSnapshot { .. } => OpCode::DeleteSnapshot,
            OpBody::RenameSnapshot { .. } => OpCode::RenameSnapshot,
            OpBody::AllowSnapshot { .. } => OpCode::AllowSnapshot,
            OpBody::DisallowSnapshot { .. } => OpCode::DisallowSnapshot,
            OpBody::SetGenstampV2 { .. } => OpCode::SetGenstampV2,
            OpBody::AllocateBlockId { .. } => OpCode::AllocateBlockId,
            OpBody::AddBlock { .. } => OpCode::AddBlock,
            OpBody::AddCacheDirective { .. } => OpCode::AddCacheDirective,
            OpBody::RemoveCacheDirective { .. } => OpCode::RemoveCacheDirective,
            OpBody::AddCachePool { .. } => OpCode::AddCachePool,
            OpBody::ModifyCachePool { .. } => OpCode::ModifyCachePool,
            OpBody::RemoveCachePool { .. } => OpCode::RemoveCachePool,
            OpBody::ModifyCacheDirective { .. } => OpCode::ModifyCacheDirective,
            OpBody::SetAcl { .. } => OpCode::SetAcl,
            OpBody::RollingUpgradeStart { .. } => OpCode::RollingUpgradeStart,
            OpBody::RollingUpgradeFinalize { .. } => OpCode::RollingUpgradeFinalize,
            OpBody::SetXAttr { .. } => OpCode::SetXAttr,
            OpBody::RemoveXAttr { .. } => OpCode::RemoveXAttr,
            OpBody::Invalid => OpCode::Invalid,
        }
    }
}

/// One logged namespace mutation.
///
/// # Fields
///
/// - `seq`: position in the log, strictly increasing within one epoch
/// - `body`: kind-specific payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Operation {
    /// Log sequence number.
    pub seq: u64,
    /// Operation payload.
    pub body: OpBody,
}

impl Operation {
    /// Creates a new operation.
    pub fn new(seq: u64, body: OpBody) -> Self {
        Self { seq, body }
    }

    /// Returns the catalog kind of this operation.
    pub fn op_code(&self) -> OpCode {
        self.body.op_code()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn catalog_size_is_pinned() {
        // A new kind must get an explicit event mapping before this changes.
        let decodable: Vec<OpCode> = (0..=u8::MAX).filter_map(OpCode::from_code).collect();
        assert_eq!(decodable.len(), 46);
        assert_eq!(decodable.len(), OpCode::COUNT);
        assert_eq!(decodable, OpCode::ALL.to_vec());

        for code in 0..=44u8 {
            let kind = OpCode::from_code(code).unwrap();
            assert_eq!(kind.to_code(), code);
        }
    }

    #[test]
    fn op_codes_are_unique_and_invertible() {
        let mut seen = HashSet::new();
        for code in OpCode::ALL {
            assert!(seen.insert(code.to_code()), "duplicate code {}", code.to_code());
            assert_eq!(OpCode::from_code(code.to_code()), Some(code));
        }
    }

    #[test]
    fn unknown_codes_rejected() {
        assert_eq!(OpCode::from_code(45), None);
        assert_eq!(OpCode::from_code(0xFE), None);
        assert_eq!(OpCode::from_code(0xFF), Some(OpCode::Invalid));
    }

    #[test]
    fn body_reports_its_code() {
        let op = Operation::new(
            7,
            OpBody::Delete {
                path: "/a".into(),
                timestamp: 10,
            },
        );
        assert_eq!(op.op_code(), OpCode::Delete);
        assert_eq!(OpBody::EndLogSegment.op_code(), OpCode::EndLogSegment);
        assert_eq!(OpBody::Invalid.op_code(), OpCode::Invalid);
    }
}
