//! Operation-to-event translation.
//!
//! `translate` is total over the operation catalog: every `OpBody` variant
//! is listed explicitly (no wildcard arm), and kinds without a namespace
//! meaning for subscribers map to no events.

use crate::event::{
    AppendEvent, CloseEvent, CreateEvent, Event, EventBatch, INodeType, MetadataUpdate,
    MetadataUpdateEvent, RenameEvent, UnlinkEvent,
};
use crate::operation::{OpBody, Operation};
use crate::types::Block;

/// Translates one operation into its events, in emission order.
pub fn translate(op: &Operation) -> Vec<Event> {
    match &op.body {
        OpBody::Add {
            path,
            replication,
            mtime,
            blocks,
            permissions,
            overwrite,
            ..
        } => {
            if blocks.is_empty() {
                vec![Event::Create(CreateEvent {
                    path: path.clone(),
                    inode_type: INodeType::File,
                    ctime: *mtime,
                    replication: *replication,
                    owner: permissions.owner.clone(),
                    group: permissions.group.clone(),
                    perms: permissions.permission,
                    symlink_target: None,
                    overwrite: *overwrite,
                })]
            } else {
                vec![Event::Append(AppendEvent { path: path.clone() })]
            }
        }

        OpBody::Close {
            path, mtime, blocks, ..
        } => vec![Event::Close(CloseEvent {
            path: path.clone(),
            file_size: Some(Block::total_len(blocks)),
            timestamp: *mtime,
        })],

        OpBody::Rename {
            src,
            dst,
            timestamp,
            ..
        }
        | OpBody::RenameOld {
            src,
            dst,
            timestamp,
        } => vec![Event::Rename(RenameEvent {
            src_path: src.clone(),
            dst_path: dst.clone(),
            timestamp: *timestamp,
        })],

        OpBody::Times { path, mtime, atime } => vec![metadata(
            path,
            MetadataUpdate::Times {
                mtime: *mtime,
                atime: *atime,
            },
        )],

        OpBody::SetReplication { path, replication } => vec![metadata(
            path,
            MetadataUpdate::Replication {
                replication: *replication,
            },
        )],

        OpBody::ConcatDelete {
            target,
            sources,
            timestamp,
        } => {
            let mut events = Vec::with_capacity(sources.len() + 2);
            events.push(Event::Append(AppendEvent {
                path: target.clone(),
            }));
            events.extend(sources.iter().map(|src| {
                Event::Unlink(UnlinkEvent {
                    path: src.clone(),
                    timestamp: *timestamp,
                })
            }));
            events.push(Event::Close(CloseEvent {
                path: target.clone(),
                file_size: None,
                timestamp: *timestamp,
            }));
            events
        }

        OpBody::Delete { path, timestamp } => vec![Event::Unlink(UnlinkEvent {
            path: path.clone(),
            timestamp: *timestamp,
        })],

        OpBody::Mkdir {
            path,
            timestamp,
            permissions,
        } => vec![Event::Create(CreateEvent {
            path: path.clone(),
            inode_type: INodeType::Directory,
            ctime: *timestamp,
            replication: 0,
            owner: permissions.owner.clone(),
            group: permissions.group.clone(),
            perms: permissions.permission,
            symlink_target: None,
            overwrite: false,
        })],

        OpBody::SetPermissions { path, permission } => vec![metadata(
            path,
            MetadataUpdate::Perms { perms: *permission },
        )],

        OpBody::SetOwner { path, owner, group } => vec![metadata(
            path,
            MetadataUpdate::Owner {
                owner: owner.clone(),
                group: group.clone(),
            },
        )],

        OpBody::Symlink {
            path,
            target,
            mtime,
            permissions,
            ..
        } => vec![Event::Create(CreateEvent {
            path: path.clone(),
            inode_type: INodeType::Symlink,
            ctime: *mtime,
            replication: 0,
            owner: permissions.owner.clone(),
            group: permissions.group.clone(),
            perms: permissions.permission,
            symlink_target: Some(target.clone()),
            overwrite: false,
        })],

        OpBody::SetXAttr { path, xattrs } => vec![metadata(
            path,
            MetadataUpdate::Xattrs {
                xattrs: xattrs.clone(),
                removed: false,
            },
        )],

        OpBody::RemoveXAttr { path, xattrs } => vec![metadata(
            path,
            MetadataUpdate::Xattrs {
                xattrs: xattrs.clone(),
                removed: true,
            },
        )],

        OpBody::SetAcl { path, entries } => {
            let entries = if entries.is_empty() {
                None
            } else {
                Some(entries.clone())
            };
            vec![metadata(path, MetadataUpdate::Acls { entries })]
        }

        // No subscriber-visible namespace change.
        OpBody::DatanodeAdd
        | OpBody::DatanodeRemove
        | OpBody::SetGenstampV1 { .. }
        | OpBody::SetNsQuota { .. }
        | OpBody::ClearNsQuota { .. }
        | OpBody::SetQuota { .. }
        | OpBody::GetDelegationToken { .. }
        | OpBody::RenewDelegationToken { .. }
        | OpBody::CancelDelegationToken { .. }
        | OpBody::UpdateMasterKey { .. }
        | OpBody::ReassignLease { .. }
        | OpBody::EndLogSegment
        | OpBody::StartLogSegment
        | OpBody::UpdateBlocks { .. }
        | OpBody::CreateSnapshot { .. }
        | OpBody::DeleteSnapshot { .. }
        | OpBody::RenameSnapshot { .. }
        | OpBody::AllowSnapshot { .. }
        | OpBody::DisallowSnapshot { .. }
        | OpBody::SetGenstampV2 { .. }
        | OpBody::AllocateBlockId { .. }
        | OpBody::AddBlock { .. }
        | OpBody::AddCacheDirective { .. }
        | OpBody::RemoveCacheDirective { .. }
        | OpBody::AddCachePool { .. }
        | OpBody::ModifyCachePool { .. }
        | OpBody::RemoveCachePool { .. }
        | OpBody::ModifyCacheDirective { .. }
        | OpBody::RollingUpgradeStart { .. }
        | OpBody::RollingUpgradeFinalize { .. }
        | OpBody::Invalid => Vec::new(),
    }
}

/// Translates a run of operations into one `EventBatch` per operation.
///
/// Operations that produce no events still get an (empty) batch so the
/// caller can account for their sequence numbers.
pub fn translate_all<'a, I>(ops: I) -> Vec<EventBatch>
where
    I: IntoIterator<Item = &'a Operation>,
{
    ops.into_iter()
        .map(|op| EventBatch::new(op.seq, translate(op)))
        .collect()
}

fn metadata(path: &str, update: MetadataUpdate) -> Event {
    Event::Metadata(MetadataUpdateEvent::new(path, update))
}
