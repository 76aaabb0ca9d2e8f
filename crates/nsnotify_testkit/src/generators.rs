//! Property-based test generators using proptest.
//!
//! Provides strategies for generating random operations that keep the
//! invariants the authority guarantees (absolute paths, increasing
//! sequence numbers).

use crate::fixtures::sample_body;
use nsnotify_protocol::{
    AclEntry, AclEntryScope, AclEntryType, Block, FsAction, FsPermission, OpBody, OpCode,
    Operation, PermissionStatus, XAttr, XAttrNamespace,
};
use proptest::prelude::*;
use proptest::strategy::Union;

/// Strategy for absolute namespace paths.
pub fn path_strategy() -> impl Strategy<Value = String> {
    prop::collection::vec("[a-z0-9_]{1,8}", 1..4).prop_map(|parts| format!("/{}", parts.join("/")))
}

/// Strategy for any catalog kind.
pub fn op_code_strategy() -> impl Strategy<Value = OpCode> {
    prop::sample::select(OpCode::ALL.to_vec())
}

/// Strategy for permission bits.
pub fn permission_strategy() -> impl Strategy<Value = FsPermission> {
    (0u16..0o2000).prop_map(FsPermission::from_mode)
}

/// Strategy for owner/group/mode triples.
pub fn permission_status_strategy() -> impl Strategy<Value = PermissionStatus> {
    ("[a-z]{1,8}", "[a-z]{1,8}", permission_strategy())
        .prop_map(|(owner, group, perm)| PermissionStatus::new(owner, group, perm))
}

/// Strategy for block lists.
pub fn blocks_strategy() -> impl Strategy<Value = Vec<Block>> {
    prop::collection::vec(
        (any::<u64>(), 0u64..=4096, any::<u64>()).prop_map(|(id, len, gs)| Block::new(id, len, gs)),
        0..4,
    )
}

/// Strategy for single ACL entries.
pub fn acl_entry_strategy() -> impl Strategy<Value = AclEntry> {
    let scope = prop_oneof![Just(AclEntryScope::Access), Just(AclEntryScope::Default)];
    let kind = prop_oneof![
        Just(AclEntryType::User),
        Just(AclEntryType::Group),
        Just(AclEntryType::Mask),
        Just(AclEntryType::Other),
    ];
    (scope, kind, prop::option::of("[a-z]{1,6}"), 0u8..8).prop_map(
        |(scope, entry_type, name, bits)| {
            let name = match entry_type {
                AclEntryType::User | AclEntryType::Group => name,
                AclEntryType::Mask | AclEntryType::Other => None,
            };
            AclEntry {
                scope,
                entry_type,
                name,
                permission: FsAction::from_bits(bits),
            }
        },
    )
}

/// Strategy for extended attributes.
pub fn xattr_strategy() -> impl Strategy<Value = XAttr> {
    let namespace = prop_oneof![
        Just(XAttrNamespace::User),
        Just(XAttrNamespace::Trusted),
        Just(XAttrNamespace::Security),
        Just(XAttrNamespace::System),
        Just(XAttrNamespace::Raw),
    ];
    (
        namespace,
        "[a-z]{1,10}",
        prop::option::of(prop::collection::vec(any::<u8>(), 0..16)),
    )
        .prop_map(|(namespace, name, value)| XAttr {
            namespace,
            name,
            value,
        })
}

/// Strategy for operation bodies.
///
/// Kinds with an event mapping get randomized fields; every kind in the
/// catalog can also appear through its sample body.
pub fn op_body_strategy() -> impl Strategy<Value = OpBody> {
    let ts = any::<i64>();
    Union::new(vec![
        (
            path_strategy(),
            1u16..=10,
            ts,
            blocks_strategy(),
            permission_status_strategy(),
            any::<bool>(),
        )
            .prop_map(|(path, replication, mtime, blocks, permissions, overwrite)| OpBody::Add {
                path,
                replication,
                mtime,
                atime: mtime,
                block_size: 1024,
                blocks,
                permissions,
                client_name: "prop-client".into(),
                overwrite,
            })
            .boxed(),
        (path_strategy(), ts, blocks_strategy(), permission_status_strategy())
            .prop_map(|(path, mtime, blocks, permissions)| OpBody::Close {
                path,
                replication: 1,
                mtime,
                atime: mtime,
                blocks,
                permissions,
            })
            .boxed(),
        (path_strategy(), path_strategy(), ts, any::<bool>())
            .prop_map(|(src, dst, timestamp, overwrite)| OpBody::Rename {
                src,
                dst,
                timestamp,
                overwrite,
            })
            .boxed(),
        (path_strategy(), path_strategy(), ts)
            .prop_map(|(src, dst, timestamp)| OpBody::RenameOld {
                src,
                dst,
                timestamp,
            })
            .boxed(),
        (path_strategy(), prop::collection::vec(path_strategy(), 1..4), ts)
            .prop_map(|(target, sources, timestamp)| OpBody::ConcatDelete {
                target,
                sources,
                timestamp,
            })
            .boxed(),
        (path_strategy(), ts)
            .prop_map(|(path, timestamp)| OpBody::Delete { path, timestamp })
            .boxed(),
        (path_strategy(), ts, permission_status_strategy())
            .prop_map(|(path, timestamp, permissions)| OpBody::Mkdir {
                path,
                timestamp,
                permissions,
            })
            .boxed(),
        (path_strategy(), prop::collection::vec(acl_entry_strategy(), 0..5))
            .prop_map(|(path, entries)| OpBody::SetAcl { path, entries })
            .boxed(),
        (path_strategy(), prop::collection::vec(xattr_strategy(), 1..3), any::<bool>())
            .prop_map(|(path, xattrs, remove)| {
                if remove {
                    OpBody::RemoveXAttr { path, xattrs }
                } else {
                    OpBody::SetXAttr { path, xattrs }
                }
            })
            .boxed(),
        op_code_strategy().prop_map(sample_body).boxed(),
    ])
}

/// Strategy for a run of operations with consecutive sequence numbers.
pub fn operation_run_strategy(max_len: usize) -> impl Strategy<Value = Vec<Operation>> {
    (1u64..1_000_000, prop::collection::vec(op_body_strategy(), 0..max_len)).prop_map(
        |(first, bodies)| {
            bodies
                .into_iter()
                .zip(first..)
                .map(|(body, seq)| Operation::new(seq, body))
                .collect()
        },
    )
}
