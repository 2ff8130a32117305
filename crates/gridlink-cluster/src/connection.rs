//! Connection seam to the external grid cluster.
//!
//! The remote cluster's client protocol (handshake, auth, TLS, the
//! membership-listener subscription) is a capability gridlink consumes,
//! not one it implements. [`ClusterConnect`] is that seam: a connector
//! turns a [`ConnectionConfig`] into a live connection handle plus a
//! stream of typed membership events.
//!
//! The stream contract: events for a single member arrive in the order
//! the cluster delivered them, already serialized by the connection
//! layer; the channel closing without a prior [`ClusterConnection::close`]
//! call means the connection died.

use async_trait::async_trait;
use tokio::sync::mpsc;

use gridlink_core::{ConnectionConfig, MemberId};

use crate::error::SessionResult;

/// Direction of a membership change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MembershipChange {
    Added,
    Removed,
}

/// One membership notification from the remote cluster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MembershipEvent {
    pub member: MemberId,
    pub change: MembershipChange,
}

impl MembershipEvent {
    pub fn added(member: impl Into<MemberId>) -> Self {
        Self {
            member: member.into(),
            change: MembershipChange::Added,
        }
    }

    pub fn removed(member: impl Into<MemberId>) -> Self {
        Self {
            member: member.into(),
            change: MembershipChange::Removed,
        }
    }
}

/// Stream of membership events from one connection.
pub type EventStream = mpsc::Receiver<MembershipEvent>;

/// Opens client connections to grid clusters.
#[async_trait]
pub trait ClusterConnect: Send + Sync + 'static {
    type Conn: ClusterConnection;

    /// Open a connection and subscribe to membership notifications.
    ///
    /// Blocks until the handshake completes. Fails with
    /// [`SessionError::Connect`](crate::SessionError::Connect) when the
    /// cluster is unreachable or rejects the config; never retries.
    async fn connect(&self, config: &ConnectionConfig) -> SessionResult<(Self::Conn, EventStream)>;
}

/// A live connection handle.
#[async_trait]
pub trait ClusterConnection: Send + 'static {
    /// Gracefully close the connection, waiting for the remote side to
    /// acknowledge. The caller enforces any deadline around this.
    async fn close(self) -> SessionResult<()>;
}
