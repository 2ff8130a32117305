//! Cluster status snapshots for the managed resource's status block.
//!
//! Read-only consumers: these functions take whatever the membership
//! view holds right now, which may already be stale by the time the
//! status is written back. A degraded session reports its last observed
//! members — the UI shows stale data rather than flapping to empty.

use serde::{Deserialize, Serialize};

use gridlink_cluster::{SessionHandle, SessionState};
use gridlink_core::{MemberId, ResourceId};

/// Health of the management connection to one cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum ConnectionHealth {
    /// Session live, membership current.
    Connected,
    /// Connection lost mid-session; membership below is last-known.
    Degraded,
    /// No session, or session stopped.
    Disconnected,
}

/// Observed cluster state for a resource's status block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterStatus {
    pub resource: ResourceId,
    pub connection: ConnectionHealth,
    pub member_count: usize,
    pub members: Vec<MemberId>,
}

impl ClusterStatus {
    /// Status for a resource with a registered session.
    pub fn from_handle(handle: &SessionHandle) -> Self {
        let connection = match handle.state() {
            SessionState::Live => ConnectionHealth::Connected,
            SessionState::Degraded => ConnectionHealth::Degraded,
            SessionState::Stopped => ConnectionHealth::Disconnected,
        };
        let members = handle.membership().snapshot();
        Self {
            resource: handle.resource().clone(),
            connection,
            member_count: members.len(),
            members,
        }
    }

    /// Status for a resource with no session at all.
    pub fn absent(resource: ResourceId) -> Self {
        Self {
            resource,
            connection: ConnectionHealth::Disconnected,
            member_count: 0,
            members: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_status_is_disconnected_and_empty() {
        let status = ClusterStatus::absent(ResourceId::new("prod", "grid"));
        assert_eq!(status.connection, ConnectionHealth::Disconnected);
        assert_eq!(status.member_count, 0);
        assert!(status.members.is_empty());
    }

    #[test]
    fn health_serializes_pascal_case() {
        assert_eq!(
            serde_json::to_string(&ConnectionHealth::Connected).unwrap(),
            "\"Connected\""
        );
        assert_eq!(
            serde_json::to_string(&ConnectionHealth::Degraded).unwrap(),
            "\"Degraded\""
        );
    }
}
