//! Cluster session — one live connection, one listener task, one store.
//!
//! `ClusterSession::start` opens the connection and spawns the listener
//! task that owns the [`MembershipStore`]. Each membership event becomes
//! exactly one store mutation followed by exactly one reconcile signal,
//! in receipt order, never batched. The listener never blocks on signal
//! emission and never lets an error escape onto the event path.
//!
//! Unexpected disconnect is not an error return — nobody is synchronously
//! waiting for one. The session transitions to [`SessionState::Degraded`]
//! and stays there until the lifecycle manager decides what to do.

use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use gridlink_core::{ConnectionConfig, ResourceId};
use gridlink_trigger::ReconcileTrigger;

use crate::connection::{ClusterConnect, ClusterConnection, EventStream, MembershipChange};
use crate::error::{SessionError, SessionResult};
use crate::membership::{MembershipStore, MembershipView};

/// Liveness of a cluster session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Connected; membership events are flowing.
    Live,
    /// The connection died mid-session. The store is frozen at its last
    /// observed state; no mutations happen until a reconnect replaces
    /// this session.
    Degraded,
    /// Stopped, or abandoned after a shutdown timeout.
    Stopped,
}

/// One live client session to one grid cluster.
///
/// Owns the listener task; dropping the session aborts it. Prefer
/// [`stop`](ClusterSession::stop) for a graceful close.
#[derive(Debug)]
pub struct ClusterSession {
    resource: ResourceId,
    state_tx: watch::Sender<SessionState>,
    state_rx: watch::Receiver<SessionState>,
    view: MembershipView,
    shutdown_tx: watch::Sender<bool>,
    listener: JoinHandle<()>,
}

impl ClusterSession {
    /// Open a connection for `resource` and start listening.
    ///
    /// Blocks until the handshake completes. On error the session does
    /// not exist; retrying is the caller's policy, not this type's.
    pub async fn start<C: ClusterConnect>(
        connector: &C,
        resource: ResourceId,
        config: &ConnectionConfig,
        trigger: ReconcileTrigger,
    ) -> SessionResult<Self> {
        let (conn, events) = connector.connect(config).await?;

        let (store, view) = MembershipStore::new();
        let (state_tx, state_rx) = watch::channel(SessionState::Live);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let listener = tokio::spawn(run_listener(
            resource.clone(),
            conn,
            events,
            store,
            trigger,
            state_tx.clone(),
            shutdown_rx,
        ));

        info!(%resource, cluster = %config.cluster_name, "cluster session started");

        Ok(Self {
            resource,
            state_tx,
            state_rx,
            view,
            shutdown_tx,
            listener,
        })
    }

    /// Gracefully close the session, waiting at most `deadline` for the
    /// remote side to acknowledge.
    ///
    /// On timeout the listener task is aborted and the connection
    /// abandoned best-effort; [`SessionError::ShutdownTimeout`] is
    /// returned so the caller can log it, but the session is Stopped
    /// either way. No-op if the session already stopped or degraded.
    pub async fn stop(mut self, deadline: Duration) -> SessionResult<()> {
        self.shutdown_tx.send_replace(true);

        match tokio::time::timeout(deadline, &mut self.listener).await {
            Ok(_) => {
                self.state_tx.send_replace(SessionState::Stopped);
                info!(resource = %self.resource, "cluster session stopped");
                Ok(())
            }
            Err(_) => {
                self.listener.abort();
                self.state_tx.send_replace(SessionState::Stopped);
                warn!(
                    resource = %self.resource,
                    ?deadline,
                    "close not acknowledged in time, abandoning connection"
                );
                Err(SessionError::ShutdownTimeout(deadline))
            }
        }
    }

    /// Current liveness.
    pub fn state(&self) -> SessionState {
        *self.state_rx.borrow()
    }

    /// Read-only view of this session's membership store.
    pub fn membership(&self) -> MembershipView {
        self.view.clone()
    }

    /// The managed resource this session belongs to.
    pub fn resource(&self) -> &ResourceId {
        &self.resource
    }

    /// Cheap read surface for registries and status code.
    pub fn handle(&self) -> SessionHandle {
        SessionHandle {
            resource: self.resource.clone(),
            state_rx: self.state_rx.clone(),
            view: self.view.clone(),
        }
    }
}

impl Drop for ClusterSession {
    fn drop(&mut self) {
        self.listener.abort();
    }
}

/// Clonable read-only handle to a session: liveness plus membership view.
#[derive(Clone)]
pub struct SessionHandle {
    resource: ResourceId,
    state_rx: watch::Receiver<SessionState>,
    view: MembershipView,
}

impl SessionHandle {
    pub fn resource(&self) -> &ResourceId {
        &self.resource
    }

    pub fn state(&self) -> SessionState {
        *self.state_rx.borrow()
    }

    pub fn membership(&self) -> &MembershipView {
        &self.view
    }

    /// Wait for the next state transition and return the new state.
    pub async fn changed(&mut self) -> SessionState {
        let _ = self.state_rx.changed().await;
        self.state()
    }
}

/// The per-session listener task: sole writer of the store.
async fn run_listener<Conn: ClusterConnection>(
    resource: ResourceId,
    conn: Conn,
    mut events: EventStream,
    mut store: MembershipStore,
    trigger: ReconcileTrigger,
    state_tx: watch::Sender<SessionState>,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut conn = Some(conn);

    loop {
        tokio::select! {
            maybe = events.recv() => match maybe {
                Some(event) => {
                    // One mutation, then one signal, per event. No
                    // coalescing here even during topology storms; the
                    // work queue dedups by identity.
                    match event.change {
                        MembershipChange::Added => {
                            store.add(event.member);
                        }
                        MembershipChange::Removed => {
                            store.remove(&event.member);
                        }
                    }
                    trigger.emit(resource.clone());
                }
                None => {
                    warn!(%resource, "cluster connection lost, session degraded");
                    state_tx.send_replace(SessionState::Degraded);
                    // Keep the task alive so a graceful stop still joins
                    // promptly; no further store mutations can happen.
                    let _ = shutdown.changed().await;
                    break;
                }
            },
            _ = shutdown.changed() => {
                if let Some(conn) = conn.take() {
                    match conn.close().await {
                        Ok(()) => info!(%resource, "cluster connection closed"),
                        Err(e) => warn!(%resource, error = %e, "error closing cluster connection"),
                    }
                }
                state_tx.send_replace(SessionState::Stopped);
                break;
            }
        }
    }
}
