//! Membership store — the local view of one remote cluster's members.
//!
//! Split into a writer half ([`MembershipStore`]) and a cheaply-clonable
//! reader half ([`MembershipView`]) over a `tokio::sync::watch` channel.
//! The writer half is owned by exactly one session's listener task, which
//! makes the single-writer invariant a property of ownership rather than
//! of locking discipline. Readers get eventually-consistent snapshots:
//! the set may change between `snapshot()` and use, never mid-read.

use std::collections::BTreeSet;

use tokio::sync::watch;
use tracing::debug;

use gridlink_core::MemberId;

/// Writer half: the set of members currently present in one cluster.
///
/// Not `Clone` — there is exactly one writer per store.
pub struct MembershipStore {
    tx: watch::Sender<BTreeSet<MemberId>>,
}

impl MembershipStore {
    /// Create an empty store and its first reader.
    pub fn new() -> (Self, MembershipView) {
        let (tx, rx) = watch::channel(BTreeSet::new());
        (Self { tx }, MembershipView { rx })
    }

    /// Mark a member present. Idempotent: returns `false` if it already
    /// was.
    pub fn add(&mut self, member: MemberId) -> bool {
        let inserted = self.tx.send_if_modified(|set| set.insert(member.clone()));
        if inserted {
            debug!(%member, "member added");
        }
        inserted
    }

    /// Mark a member absent. Idempotent: returns `false` if it already
    /// was.
    pub fn remove(&mut self, member: &MemberId) -> bool {
        let removed = self.tx.send_if_modified(|set| set.remove(member));
        if removed {
            debug!(%member, "member removed");
        }
        removed
    }

    /// Create another reader.
    pub fn view(&self) -> MembershipView {
        MembershipView {
            rx: self.tx.subscribe(),
        }
    }

    /// Current member count (writer-side convenience).
    pub fn len(&self) -> usize {
        self.tx.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Read-only view of a membership store.
///
/// Handed to status-reporting code; outlives reconnects only in the sense
/// that a replaced session comes with a fresh view — an old view keeps
/// showing the old session's last state, which is the stale-but-consistent
/// read the caller signed up for.
#[derive(Debug, Clone)]
pub struct MembershipView {
    rx: watch::Receiver<BTreeSet<MemberId>>,
}

impl MembershipView {
    /// Sorted snapshot of the currently present members.
    pub fn snapshot(&self) -> Vec<MemberId> {
        self.rx.borrow().iter().cloned().collect()
    }

    /// Whether a member is currently present.
    pub fn contains(&self, member: &MemberId) -> bool {
        self.rx.borrow().contains(member)
    }

    /// Number of currently present members.
    pub fn len(&self) -> usize {
        self.rx.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
