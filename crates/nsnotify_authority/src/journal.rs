//! Shared edit journal.

use crate::error::{AuthorityError, AuthorityResult};
use nsnotify_protocol::{OpBody, Operation};
use parking_lot::RwLock;
use std::collections::VecDeque;
use tracing::{debug, info};

/// Committed operation log shared by every node of a nameservice.
///
/// The journal maintains:
/// - Committed operations in sequence order (sequence numbers start at 1)
/// - The highest epoch promised to a writer
/// - The retention horizon left by `purge_before`
pub struct SharedJournal {
    state: RwLock<JournalState>,
}

struct JournalState {
    operations: VecDeque<Operation>,
    last_committed: u64,
    promised_epoch: u64,
}

impl JournalState {
    fn first_available(&self) -> u64 {
        self.operations
            .front()
            .map(|op| op.seq)
            .unwrap_or(self.last_committed + 1)
    }
}

impl SharedJournal {
    /// Creates a new empty journal.
    pub fn new() -> Self {
        Self {
            state: RwLock::new(JournalState {
                operations: VecDeque::new(),
                last_committed: 0,
                promised_epoch: 0,
            }),
        }
    }

    /// Highest committed sequence number, zero when nothing was committed.
    pub fn last_committed(&self) -> u64 {
        self.state.read().last_committed
    }

    /// Oldest sequence number still retained.
    pub fn first_available(&self) -> u64 {
        self.state.read().first_available()
    }

    /// Highest epoch promised so far.
    pub fn promised_epoch(&self) -> u64 {
        self.state.read().promised_epoch
    }

    /// Promises a new epoch, fencing every writer of an older one.
    pub fn new_epoch(&self) -> u64 {
        let mut state = self.state.write();
        state.promised_epoch += 1;
        info!(epoch = state.promised_epoch, "journal promised new epoch");
        state.promised_epoch
    }

    /// Appends bodies on behalf of a writer in `epoch`.
    ///
    /// Returns the sequence number of the last committed operation.
    pub fn append(&self, epoch: u64, bodies: Vec<OpBody>) -> AuthorityResult<u64> {
        let mut state = self.state.write();
        if epoch < state.promised_epoch {
            return Err(AuthorityError::Fenced {
                epoch,
                promised: state.promised_epoch,
            });
        }

        for body in bodies {
            state.last_committed += 1;
            let seq = state.last_committed;
            state.operations.push_back(Operation::new(seq, body));
        }

        debug!(epoch, last_committed = state.last_committed, "journal append");
        Ok(state.last_committed)
    }

    /// Returns up to `limit` operations with `after < seq <= up_to`.
    pub fn read_range(&self, after: u64, up_to: u64, limit: usize) -> Vec<Operation> {
        let state = self.state.read();
        let first = state.first_available();
        let skip = after.saturating_add(1).saturating_sub(first) as usize;
        state
            .operations
            .iter()
            .skip(skip)
            .take_while(|op| op.seq <= up_to)
            .take(limit)
            .cloned()
            .collect()
    }

    /// Discards every operation with a sequence number below `seq`.
    pub fn purge_before(&self, seq: u64) {
        let mut state = self.state.write();
        let mut purged = 0usize;
        while state.operations.front().is_some_and(|op| op.seq < seq) {
            state.operations.pop_front();
            purged += 1;
        }
        if purged > 0 {
            info!(purged, first_available = state.first_available(), "journal purged");
        }
    }

    /// Returns the number of retained operations.
    pub fn len(&self) -> usize {
        self.state.read().operations.len()
    }

    /// Returns true if no operations are retained.
    pub fn is_empty(&self) -> bool {
        self.state.read().operations.is_empty()
    }
}

impl Default for SharedJournal {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn delete(path: &str) -> OpBody {
        OpBody::Delete {
            path: path.into(),
            timestamp: 0,
        }
    }

    #[test]
    fn append_assigns_sequence_numbers() {
        let journal = SharedJournal::new();
        assert_eq!(journal.last_committed(), 0);
        assert_eq!(journal.first_available(), 1);

        let epoch = journal.new_epoch();
        assert_eq!(journal.append(epoch, vec![delete("/a"), delete("/b")]).unwrap(), 2);
        assert_eq!(journal.append(epoch, vec![delete("/c")]).unwrap(), 3);

        let ops = journal.read_range(0, 3, 10);
        let seqs: Vec<u64> = ops.iter().map(|op| op.seq).collect();
        assert_eq!(seqs, vec![1, 2, 3]);
    }

    #[test]
    fn stale_epoch_is_fenced() {
        let journal = SharedJournal::new();
        let old = journal.new_epoch();
        let new = journal.new_epoch();
        assert!(new > old);

        let err = journal.append(old, vec![delete("/a")]).unwrap_err();
        assert!(matches!(
            err,
            AuthorityError::Fenced {
                epoch: 1,
                promised: 2
            }
        ));
        assert_eq!(journal.last_committed(), 0);
        assert!(journal.append(new, vec![delete("/a")]).is_ok());
    }

    #[test]
    fn read_range_respects_bounds() {
        let journal = SharedJournal::new();
        let epoch = journal.new_epoch();
        journal
            .append(epoch, (0..10).map(|i| delete(&format!("/d{i}"))).collect())
            .unwrap();

        let ops = journal.read_range(3, 7, 100);
        assert_eq!(ops.first().map(|op| op.seq), Some(4));
        assert_eq!(ops.last().map(|op| op.seq), Some(7));

        let ops = journal.read_range(3, 10, 2);
        assert_eq!(ops.len(), 2);

        assert!(journal.read_range(10, 10, 5).is_empty());
    }

    #[test]
    fn purge_moves_first_available() {
        let journal = SharedJournal::new();
        let epoch = journal.new_epoch();
        journal
            .append(epoch, (0..5).map(|i| delete(&format!("/d{i}"))).collect())
            .unwrap();

        journal.purge_before(4);
        assert_eq!(journal.first_available(), 4);
        assert_eq!(journal.len(), 2);

        let ops = journal.read_range(3, 5, 10);
        assert_eq!(ops.iter().map(|op| op.seq).collect::<Vec<_>>(), vec![4, 5]);

        journal.purge_before(100);
        assert!(journal.is_empty());
        assert_eq!(journal.first_available(), 6);
        assert_eq!(journal.last_committed(), 5);
    }
}
