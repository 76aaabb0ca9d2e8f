//! Registry of the authority nodes sharing one journal.

use crate::config::AuthorityConfig;
use crate::error::{AuthorityError, AuthorityResult};
use crate::journal::SharedJournal;
use crate::node::{AuthorityNode, NodeRole};
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::info;

/// A highly available nameservice: several nodes over one shared journal,
/// at most one of which was most recently made active.
pub struct Nameservice {
    journal: Arc<SharedJournal>,
    nodes: RwLock<Vec<Arc<AuthorityNode>>>,
    active: RwLock<Option<String>>,
}

impl Nameservice {
    /// Creates an empty nameservice over a fresh journal.
    pub fn new() -> Self {
        Self::with_journal(Arc::new(SharedJournal::new()))
    }

    /// Creates an empty nameservice over an existing journal.
    pub fn with_journal(journal: Arc<SharedJournal>) -> Self {
        Self {
            journal,
            nodes: RwLock::new(Vec::new()),
            active: RwLock::new(None),
        }
    }

    /// Creates a nameservice with one standby node per address.
    pub fn with_nodes<I, S>(addrs: I, config: AuthorityConfig) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let ns = Self::new();
        for addr in addrs {
            ns.add_node(addr, config.clone());
        }
        ns
    }

    /// Returns the shared journal.
    pub fn journal(&self) -> &Arc<SharedJournal> {
        &self.journal
    }

    /// Registers a new standby node.
    pub fn add_node(&self, addr: impl Into<String>, config: AuthorityConfig) -> Arc<AuthorityNode> {
        let node = Arc::new(AuthorityNode::new(addr, Arc::clone(&self.journal), config));
        node.set_active_hint(self.active.read().clone());
        self.nodes.write().push(Arc::clone(&node));
        node
    }

    /// Looks up a node by address.
    pub fn node(&self, addr: &str) -> AuthorityResult<Arc<AuthorityNode>> {
        self.nodes
            .read()
            .iter()
            .find(|node| node.address() == addr)
            .cloned()
            .ok_or_else(|| AuthorityError::UnknownNode(addr.to_string()))
    }

    /// Addresses of every registered node, in registration order.
    pub fn addresses(&self) -> Vec<String> {
        self.nodes
            .read()
            .iter()
            .map(|node| node.address().to_string())
            .collect()
    }

    /// Returns the most recently activated node, if it is still running.
    pub fn active(&self) -> Option<Arc<AuthorityNode>> {
        let addr = self.active.read().clone()?;
        self.node(&addr)
            .ok()
            .filter(|node| node.role() == NodeRole::Active)
    }

    /// Makes `addr` active in a new epoch.
    ///
    /// The previous active node is fenced but not demoted: it keeps
    /// serving up to its own horizon until it is transitioned to standby
    /// or shut down.
    pub fn transition_to_active(&self, addr: &str) -> AuthorityResult<u64> {
        let node = self.node(addr)?;
        if node.role() == NodeRole::Stopped {
            return Err(AuthorityError::Stopped(addr.to_string()));
        }

        let epoch = self.journal.new_epoch();
        node.become_active(epoch)?;
        *self.active.write() = Some(addr.to_string());

        for other in self.nodes.read().iter() {
            if other.address() != addr {
                other.set_active_hint(Some(addr.to_string()));
            }
        }
        info!(addr, epoch, "transitioned to active");
        Ok(epoch)
    }

    /// Demotes `addr` to standby.
    pub fn transition_to_standby(&self, addr: &str) -> AuthorityResult<()> {
        let node = self.node(addr)?;
        node.become_standby();
        let mut active = self.active.write();
        if active.as_deref() == Some(addr) {
            *active = None;
        }
        node.set_active_hint(active.clone());
        Ok(())
    }

    /// Graceful failover: demotes `from` and activates `to`.
    pub fn failover(&self, from: &str, to: &str) -> AuthorityResult<u64> {
        self.transition_to_standby(from)?;
        self.transition_to_active(to)
    }

    /// Stops `addr`; its unsynced edits are lost.
    pub fn shutdown(&self, addr: &str) -> AuthorityResult<()> {
        let node = self.node(addr)?;
        node.stop();
        let mut active = self.active.write();
        if active.as_deref() == Some(addr) {
            *active = None;
        }
        Ok(())
    }
}

impl Default for Nameservice {
    fn default() -> Self {
        Self::new()
    }
}
