//! A single authority node.

use crate::config::AuthorityConfig;
use crate::error::{AuthorityError, AuthorityResult};
use crate::journal::SharedJournal;
use nsnotify_protocol::{FetchRequest, FetchResponse, OpBatch, OpBody, PositionResponse};
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Serving role of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeRole {
    /// Accepts edits and serves fetches.
    Active,
    /// Redirects readers to the known active node.
    Standby,
    /// Shut down; unreachable.
    Stopped,
}

struct NodeState {
    role: NodeRole,
    epoch: u64,
    /// Logged but not yet synced to the journal.
    pending: Vec<OpBody>,
    /// Highest sequence number this node committed or recovered.
    horizon: u64,
    active_hint: Option<String>,
}

/// One authority of a nameservice.
///
/// A node only serves operations up to its own horizon. A node that has
/// been fenced by a newer epoch keeps its old horizon, so readers attached
/// to it never see edits committed by its successor.
pub struct AuthorityNode {
    addr: String,
    config: AuthorityConfig,
    journal: Arc<SharedJournal>,
    state: RwLock<NodeState>,
}

impl AuthorityNode {
    /// Creates a standby node on top of a shared journal.
    pub fn new(addr: impl Into<String>, journal: Arc<SharedJournal>, config: AuthorityConfig) -> Self {
        Self {
            addr: addr.into(),
            config,
            journal,
            state: RwLock::new(NodeState {
                role: NodeRole::Standby,
                epoch: 0,
                pending: Vec::new(),
                horizon: 0,
                active_hint: None,
            }),
        }
    }

    /// Returns the node address.
    pub fn address(&self) -> &str {
        &self.addr
    }

    /// Returns the current role.
    pub fn role(&self) -> NodeRole {
        self.state.read().role
    }

    /// Returns the epoch the node last became active in.
    pub fn epoch(&self) -> u64 {
        self.state.read().epoch
    }

    /// Returns the serving horizon.
    pub fn horizon(&self) -> u64 {
        self.state.read().horizon
    }

    /// Returns the number of logged edits not yet synced.
    pub fn pending_edits(&self) -> usize {
        self.state.read().pending.len()
    }

    fn check_active(&self, role: NodeRole) -> AuthorityResult<()> {
        match role {
            NodeRole::Active => Ok(()),
            NodeRole::Standby => Err(AuthorityError::NotActive(self.addr.clone())),
            NodeRole::Stopped => Err(AuthorityError::Stopped(self.addr.clone())),
        }
    }

    /// Buffers an edit; it becomes visible after `log_sync`.
    pub fn log_edit(&self, body: OpBody) -> AuthorityResult<()> {
        let mut state = self.state.write();
        self.check_active(state.role)?;
        state.pending.push(body);
        Ok(())
    }

    /// Flushes buffered edits to the journal and advances the horizon.
    ///
    /// A fenced node loses its buffered edits.
    pub fn log_sync(&self) -> AuthorityResult<u64> {
        let mut state = self.state.write();
        self.check_active(state.role)?;
        if state.pending.is_empty() {
            return Ok(state.horizon);
        }

        let pending = std::mem::take(&mut state.pending);
        let count = pending.len();
        match self.journal.append(state.epoch, pending) {
            Ok(last) => {
                state.horizon = last;
                debug!(addr = %self.addr, count, horizon = last, "edits synced");
                Ok(last)
            }
            Err(e) => {
                warn!(addr = %self.addr, count, error = %e, "edits dropped");
                Err(e)
            }
        }
    }

    /// Logs and syncs a run of edits.
    pub fn commit(&self, bodies: impl IntoIterator<Item = OpBody>) -> AuthorityResult<u64> {
        for body in bodies {
            self.log_edit(body)?;
        }
        self.log_sync()
    }

    /// Makes the node active in `epoch`, recovering the journal head.
    pub(crate) fn become_active(&self, epoch: u64) -> AuthorityResult<()> {
        let mut state = self.state.write();
        if state.role == NodeRole::Stopped {
            return Err(AuthorityError::Stopped(self.addr.clone()));
        }
        state.role = NodeRole::Active;
        state.epoch = epoch;
        state.pending.clear();
        state.horizon = self.journal.last_committed();
        state.active_hint = None;
        info!(addr = %self.addr, epoch, horizon = state.horizon, "became active");
        Ok(())
    }

    /// Makes the node a standby, dropping any unsynced edits.
    pub(crate) fn become_standby(&self) {
        let mut state = self.state.write();
        if state.role == NodeRole::Stopped {
            return;
        }
        state.role = NodeRole::Standby;
        state.pending.clear();
        info!(addr = %self.addr, "became standby");
    }

    /// Records where the active node can be found.
    pub(crate) fn set_active_hint(&self, active: Option<String>) {
        self.state.write().active_hint = active;
    }

    /// Stops the node, losing unsynced edits.
    pub(crate) fn stop(&self) {
        let mut state = self.state.write();
        let lost = state.pending.len();
        state.pending.clear();
        state.role = NodeRole::Stopped;
        info!(addr = %self.addr, lost, "stopped");
    }

    fn redirect_target(&self, state: &NodeState) -> AuthorityResult<String> {
        match state.role {
            NodeRole::Active => Err(AuthorityError::Internal("active node redirect".into())),
            NodeRole::Stopped => Err(AuthorityError::Stopped(self.addr.clone())),
            NodeRole::Standby => state
                .active_hint
                .clone()
                .ok_or_else(|| AuthorityError::NotActive(self.addr.clone())),
        }
    }

    /// Serves a fetch request.
    pub fn handle_fetch(&self, request: &FetchRequest) -> AuthorityResult<FetchResponse> {
        let state = self.state.read();
        if state.role != NodeRole::Active {
            let target = self.redirect_target(&state)?;
            debug!(addr = %self.addr, %target, "redirecting fetch");
            return Ok(FetchResponse::Redirect { target });
        }

        let horizon = state.horizon;
        let first_available = self.journal.first_available();
        if request.after.saturating_add(1) < first_available {
            warn!(
                addr = %self.addr,
                requested = request.after,
                first_available,
                "fetch precedes retained history"
            );
            return Ok(FetchResponse::Gap {
                requested: request.after,
                first_available,
            });
        }

        if request.after >= horizon {
            return Ok(FetchResponse::Empty {
                last_committed: horizon,
            });
        }

        let limit = self.config.effective_limit(request.limit);
        let operations = self.journal.read_range(request.after, horizon, limit);
        debug!(
            addr = %self.addr,
            after = request.after,
            count = operations.len(),
            horizon,
            "serving fetch"
        );
        Ok(FetchResponse::Batch(OpBatch::new(operations, horizon)))
    }

    /// Serves a position request.
    pub fn handle_position(&self) -> AuthorityResult<PositionResponse> {
        let state = self.state.read();
        if state.role != NodeRole::Active {
            let target = self.redirect_target(&state)?;
            return Ok(PositionResponse::Redirect { target });
        }
        Ok(PositionResponse::Position {
            last_committed: state.horizon,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nsnotify_protocol::{FsPermission, PermissionStatus};

    fn mkdir(path: &str) -> OpBody {
        OpBody::Mkdir {
            path: path.into(),
            timestamp: 1,
            permissions: PermissionStatus::new("hdfs", "supergroup", FsPermission::from_mode(0o755)),
        }
    }

    fn active_node(journal: &Arc<SharedJournal>) -> AuthorityNode {
        let node = AuthorityNode::new("nn0", Arc::clone(journal), AuthorityConfig::default());
        node.become_active(journal.new_epoch()).unwrap();
        node
    }

    #[test]
    fn edits_visible_after_sync() {
        let journal = Arc::new(SharedJournal::new());
        let node = active_node(&journal);

        node.log_edit(mkdir("/a")).unwrap();
        assert_eq!(node.pending_edits(), 1);
        assert_eq!(
            node.handle_fetch(&FetchRequest::new(0, 10)).unwrap(),
            FetchResponse::Empty { last_committed: 0 }
        );

        assert_eq!(node.log_sync().unwrap(), 1);
        let FetchResponse::Batch(batch) = node.handle_fetch(&FetchRequest::new(0, 10)).unwrap()
        else {
            panic!("expected batch");
        };
        assert_eq!(batch.len(), 1);
        assert_eq!(batch.last_committed, 1);
    }

    #[test]
    fn standby_rejects_edits_and_redirects() {
        let journal = Arc::new(SharedJournal::new());
        let node = AuthorityNode::new("nn1", journal, AuthorityConfig::default());

        assert!(matches!(node.log_edit(mkdir("/a")), Err(AuthorityError::NotActive(_))));
        assert!(matches!(
            node.handle_fetch(&FetchRequest::new(0, 10)),
            Err(AuthorityError::NotActive(_))
        ));

        node.set_active_hint(Some("nn0".into()));
        assert_eq!(
            node.handle_fetch(&FetchRequest::new(0, 10)).unwrap(),
            FetchResponse::Redirect {
                target: "nn0".into()
            }
        );
        assert_eq!(
            node.handle_position().unwrap(),
            PositionResponse::Redirect {
                target: "nn0".into()
            }
        );
    }

    #[test]
    fn fenced_node_keeps_its_horizon() {
        let journal = Arc::new(SharedJournal::new());
        let old = active_node(&journal);
        old.commit((0..3).map(|i| mkdir(&format!("/old{i}")))).unwrap();

        let new = AuthorityNode::new("nn1", Arc::clone(&journal), AuthorityConfig::default());
        new.become_active(journal.new_epoch()).unwrap();
        assert_eq!(new.horizon(), 3);
        new.commit((0..2).map(|i| mkdir(&format!("/new{i}")))).unwrap();

        let err = old.commit(vec![mkdir("/late")]).unwrap_err();
        assert!(matches!(err, AuthorityError::Fenced { .. }));
        assert_eq!(old.pending_edits(), 0);
        assert_eq!(old.horizon(), 3);
        assert_eq!(
            old.handle_fetch(&FetchRequest::new(3, 10)).unwrap(),
            FetchResponse::Empty { last_committed: 3 }
        );
        assert_eq!(new.horizon(), 5);
    }

    #[test]
    fn purged_history_is_a_gap() {
        let journal = Arc::new(SharedJournal::new());
        let node = active_node(&journal);
        node.commit((0..10).map(|i| mkdir(&format!("/d{i}")))).unwrap();
        journal.purge_before(6);

        assert_eq!(
            node.handle_fetch(&FetchRequest::new(2, 10)).unwrap(),
            FetchResponse::Gap {
                requested: 2,
                first_available: 6
            }
        );
        let FetchResponse::Batch(batch) = node.handle_fetch(&FetchRequest::new(5, 10)).unwrap()
        else {
            panic!("expected batch");
        };
        assert_eq!(batch.first_seq(), Some(6));
    }

    #[test]
    fn stopped_node_is_unreachable() {
        let journal = Arc::new(SharedJournal::new());
        let node = active_node(&journal);
        node.log_edit(mkdir("/lost")).unwrap();
        node.stop();

        assert_eq!(node.role(), NodeRole::Stopped);
        assert_eq!(journal.last_committed(), 0);
        assert!(matches!(
            node.handle_fetch(&FetchRequest::new(0, 1)),
            Err(AuthorityError::Stopped(_))
        ));
        assert!(matches!(node.become_active(9), Err(AuthorityError::Stopped(_))));
    }

    #[test]
    fn batch_size_is_capped() {
        let journal = Arc::new(SharedJournal::new());
        let node = AuthorityNode::new(
            "nn0",
            Arc::clone(&journal),
            AuthorityConfig::new().with_max_batch(4),
        );
        node.become_active(journal.new_epoch()).unwrap();
        node.commit((0..10).map(|i| mkdir(&format!("/d{i}")))).unwrap();

        let FetchResponse::Batch(batch) = node.handle_fetch(&FetchRequest::new(0, 100)).unwrap()
        else {
            panic!("expected batch");
        };
        assert_eq!(batch.len(), 4);
        assert_eq!(batch.last_committed, 10);
    }
}
