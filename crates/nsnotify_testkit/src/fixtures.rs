//! Operation builders and canned scenarios.
//!
//! Builders return bare `OpBody` values; `sequenced` stamps them with
//! consecutive sequence numbers the way an authority would.

use nsnotify_protocol::{
    AclEntry, Block, FsPermission, OpBody, OpCode, Operation, PermissionStatus, XAttr,
};

/// Block size used by file fixtures.
pub const BLOCK_SIZE: u64 = 1024;

/// Owner/group/mode used by fixtures unless stated otherwise.
pub fn default_perms() -> PermissionStatus {
    PermissionStatus::new("hdfs", "supergroup", FsPermission::from_mode(0o644))
}

/// Assigns consecutive sequence numbers starting at `first_seq`.
pub fn sequenced(first_seq: u64, bodies: Vec<OpBody>) -> Vec<Operation> {
    bodies
        .into_iter()
        .zip(first_seq..)
        .map(|(body, seq)| Operation::new(seq, body))
        .collect()
}

/// A file create, overwriting any existing file when `overwrite` is set.
pub fn create_file(path: &str, replication: u16, overwrite: bool, mtime: i64) -> OpBody {
    OpBody::Add {
        path: path.into(),
        replication,
        mtime,
        atime: mtime,
        block_size: BLOCK_SIZE,
        blocks: Vec::new(),
        permissions: default_perms(),
        client_name: "test-client".into(),
        overwrite,
    }
}

/// Reopening an existing file of `len` bytes for append.
pub fn append_file(path: &str, len: u64, mtime: i64) -> OpBody {
    OpBody::Add {
        path: path.into(),
        replication: 1,
        mtime,
        atime: mtime,
        block_size: BLOCK_SIZE,
        blocks: blocks_for(len),
        permissions: default_perms(),
        client_name: "test-client".into(),
        overwrite: false,
    }
}

/// Closing a file of `len` bytes.
pub fn close_file(path: &str, len: u64, mtime: i64) -> OpBody {
    OpBody::Close {
        path: path.into(),
        replication: 1,
        mtime,
        atime: mtime,
        blocks: blocks_for(len),
        permissions: default_perms(),
    }
}

/// Directory creation.
pub fn mkdir(path: &str, timestamp: i64) -> OpBody {
    OpBody::Mkdir {
        path: path.into(),
        timestamp,
        permissions: PermissionStatus::new("hdfs", "supergroup", FsPermission::from_mode(0o755)),
    }
}

/// Rename with options.
pub fn rename(src: &str, dst: &str, timestamp: i64) -> OpBody {
    OpBody::Rename {
        src: src.into(),
        dst: dst.into(),
        timestamp,
        overwrite: false,
    }
}

/// Legacy rename.
pub fn rename_old(src: &str, dst: &str, timestamp: i64) -> OpBody {
    OpBody::RenameOld {
        src: src.into(),
        dst: dst.into(),
        timestamp,
    }
}

/// Deletion.
pub fn delete(path: &str, timestamp: i64) -> OpBody {
    OpBody::Delete {
        path: path.into(),
        timestamp,
    }
}

/// Concatenation of `sources` onto `target`.
pub fn concat(target: &str, sources: &[&str], timestamp: i64) -> OpBody {
    OpBody::ConcatDelete {
        target: target.into(),
        sources: sources.iter().map(|s| s.to_string()).collect(),
        timestamp,
    }
}

/// Symlink creation.
pub fn symlink(path: &str, target: &str, mtime: i64) -> OpBody {
    OpBody::Symlink {
        path: path.into(),
        target: target.into(),
        mtime,
        atime: mtime,
        permissions: PermissionStatus::new("hdfs", "supergroup", FsPermission::from_mode(0o777)),
    }
}

/// Access time update.
pub fn touch_atime(path: &str, atime: i64) -> OpBody {
    OpBody::Times {
        path: path.into(),
        mtime: -1,
        atime,
    }
}

/// Replication change.
pub fn set_replication(path: &str, replication: u16) -> OpBody {
    OpBody::SetReplication {
        path: path.into(),
        replication,
    }
}

/// Permission change from a symbolic mode.
///
/// Panics on a malformed mode; fixtures are static.
pub fn set_permission(path: &str, symbolic: &str) -> OpBody {
    OpBody::SetPermissions {
        path: path.into(),
        permission: FsPermission::from_symbolic(symbolic).expect("fixture permission"),
    }
}

/// Owner and group change.
pub fn set_owner(path: &str, owner: &str, group: &str) -> OpBody {
    OpBody::SetOwner {
        path: path.into(),
        owner: Some(owner.into()),
        group: Some(group.into()),
    }
}

/// Setting one extended attribute.
pub fn set_xattr(path: &str, name: &str, value: &[u8]) -> OpBody {
    OpBody::SetXAttr {
        path: path.into(),
        xattrs: vec![XAttr::from_prefixed_name(name, Some(value.to_vec())).expect("fixture xattr")],
    }
}

/// Removing one extended attribute.
pub fn remove_xattr(path: &str, name: &str) -> OpBody {
    OpBody::RemoveXAttr {
        path: path.into(),
        xattrs: vec![XAttr::from_prefixed_name(name, None).expect("fixture xattr")],
    }
}

/// Replacing the ACL from a comma separated spec; an empty spec removes it.
pub fn set_acl(path: &str, spec: &str) -> OpBody {
    OpBody::SetAcl {
        path: path.into(),
        entries: AclEntry::parse_spec(spec).expect("fixture acl"),
    }
}

fn blocks_for(len: u64) -> Vec<Block> {
    let mut blocks = Vec::new();
    let mut remaining = len;
    let mut id = 1;
    while remaining > 0 {
        let n = remaining.min(BLOCK_SIZE);
        blocks.push(Block::new(id, n, 1000 + id));
        remaining -= n;
        id += 1;
    }
    blocks
}

/// Every event-producing mutation, one after another.
///
/// Expected events, in order: Rename, Rename, Create(overwrite), Close,
/// Append, Close, Metadata(times), Metadata(replication), Append, Unlink,
/// Close, Unlink, Create(dir), Metadata(perms), Metadata(owner),
/// Create(symlink), Metadata(xattrs), Metadata(xattrs removed),
/// Metadata(acls), Metadata(acls removed).
pub fn full_mutation_script(ts: i64) -> Vec<OpBody> {
    vec![
        rename("/file", "/file4", ts),
        rename_old("/file4", "/file2", ts + 1),
        create_file("/file2", 2, true, ts + 2),
        close_file("/file2", BLOCK_SIZE, ts + 3),
        append_file("/file2", BLOCK_SIZE, ts + 4),
        close_file("/file2", 2 * BLOCK_SIZE, ts + 5),
        touch_atime("/file2", ts + 6),
        set_replication("/file2", 1),
        concat("/file2", &["/file3"], ts + 7),
        delete("/file2", ts + 8),
        mkdir("/dir", ts + 9),
        set_permission("/dir", "-rw-rw-rw-"),
        set_owner("/dir", "username", "groupname"),
        symlink("/dir2", "/dir", ts + 10),
        set_xattr("/file5", "user.field", b"value"),
        remove_xattr("/file5", "user.field"),
        set_acl("/file5", "user::rwx,user:foo:rw-,group::r--,other::---"),
        set_acl("/file5", ""),
    ]
}

/// Number of events `full_mutation_script` expands to.
pub const FULL_SCRIPT_EVENT_COUNT: usize = 20;

/// A representative body for any operation kind.
pub fn sample_body(code: OpCode) -> OpBody {
    let ts = 1_700_000_000_000;
    match code {
        OpCode::Add => create_file("/sample", 3, false, ts),
        OpCode::RenameOld => rename_old("/sample", "/sample.old", ts),
        OpCode::Delete => delete("/sample", ts),
        OpCode::Mkdir => mkdir("/sample.d", ts),
        OpCode::SetReplication => set_replication("/sample", 2),
        OpCode::DatanodeAdd => OpBody::DatanodeAdd,
        OpCode::DatanodeRemove => OpBody::DatanodeRemove,
        OpCode::SetPermissions => set_permission("/sample", "rwxr-x---"),
        OpCode::SetOwner => set_owner("/sample", "alice", "staff"),
        OpCode::Close => close_file("/sample", 10, ts),
        OpCode::SetGenstampV1 => OpBody::SetGenstampV1 {
            generation_stamp: 1000,
        },
        OpCode::SetNsQuota => OpBody::SetNsQuota {
            path: "/sample.d".into(),
            ns_quota: 100,
        },
        OpCode::ClearNsQuota => OpBody::ClearNsQuota {
            path: "/sample.d".into(),
        },
        OpCode::Times => touch_atime("/sample", ts),
        OpCode::SetQuota => OpBody::SetQuota {
            path: "/sample.d".into(),
            ns_quota: 100,
            ds_quota: 1 << 30,
        },
        OpCode::Rename => rename("/sample", "/sample.new", ts),
        OpCode::ConcatDelete => concat("/sample", &["/part-0", "/part-1"], ts),
        OpCode::Symlink => symlink("/sample.lnk", "/sample", ts),
        OpCode::GetDelegationToken => OpBody::GetDelegationToken {
            token_id: 1,
            expiry: ts + 86_400_000,
        },
        OpCode::RenewDelegationToken => OpBody::RenewDelegationToken {
            token_id: 1,
            expiry: ts + 2 * 86_400_000,
        },
        OpCode::CancelDelegationToken => OpBody::CancelDelegationToken { token_id: 1 },
        OpCode::UpdateMasterKey => OpBody::UpdateMasterKey { key_id: 2 },
        OpCode::ReassignLease => OpBody::ReassignLease {
            holder: "client-a".into(),
            path: "/sample".into(),
            new_holder: "recovery".into(),
        },
        OpCode::EndLogSegment => OpBody::EndLogSegment,
        OpCode::StartLogSegment => OpBody::StartLogSegment,
        OpCode::UpdateBlocks => OpBody::UpdateBlocks {
            path: "/sample".into(),
            blocks: blocks_for(3 * BLOCK_SIZE),
        },
        OpCode::CreateSnapshot => OpBody::CreateSnapshot {
            root: "/sample.d".into(),
            name: "s0".into(),
        },
        OpCode::DeleteSnapshot => OpBody::DeleteSnapshot {
            root: "/sample.d".into(),
            name: "s0".into(),
        },
        OpCode::RenameSnapshot => OpBody::RenameSnapshot {
            root: "/sample.d".into(),
            old_name: "s0".into(),
            new_name: "s1".into(),
        },
        OpCode::AllowSnapshot => OpBody::AllowSnapshot {
            root: "/sample.d".into(),
        },
        OpCode::DisallowSnapshot => OpBody::DisallowSnapshot {
            root: "/sample.d".into(),
        },
        OpCode::SetGenstampV2 => OpBody::SetGenstampV2 {
            generation_stamp: 1001,
        },
        OpCode::AllocateBlockId => OpBody::AllocateBlockId { block_id: 1 << 30 },
        OpCode::AddBlock => OpBody::AddBlock {
            path: "/sample".into(),
            block: Block::new(1 << 30, 0, 1001),
        },
        OpCode::AddCacheDirective => OpBody::AddCacheDirective {
            directive_id: 1,
            path: "/sample".into(),
            pool: "pool".into(),
        },
        OpCode::RemoveCacheDirective => OpBody::RemoveCacheDirective { directive_id: 1 },
        OpCode::AddCachePool => OpBody::AddCachePool {
            pool: "pool".into(),
        },
        OpCode::ModifyCachePool => OpBody::ModifyCachePool {
            pool: "pool".into(),
        },
        OpCode::RemoveCachePool => OpBody::RemoveCachePool {
            pool: "pool".into(),
        },
        OpCode::ModifyCacheDirective => OpBody::ModifyCacheDirective { directive_id: 1 },
        OpCode::SetAcl => set_acl("/sample", "user::rw-,group::r--,other::r--"),
        OpCode::RollingUpgradeStart => OpBody::RollingUpgradeStart { time: ts },
        OpCode::RollingUpgradeFinalize => OpBody::RollingUpgradeFinalize { time: ts },
        OpCode::SetXAttr => set_xattr("/sample", "user.tag", b"x"),
        OpCode::RemoveXAttr => remove_xattr("/sample", "user.tag"),
        OpCode::Invalid => OpBody::Invalid,
    }
}
