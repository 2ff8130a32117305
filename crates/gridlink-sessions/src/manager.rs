//! Session registry — at most one live session per resource identity.
//!
//! The registry itself is a plain `RwLock<HashMap>` so `get` never
//! blocks; lifecycle mutations (`ensure`, `remove`) are additionally
//! serialized through a per-identity async mutex held across the
//! connect/close awaits, which is what makes two concurrent `ensure`
//! calls for the same identity collapse into one session. Each identity
//! has its own lock, so a slow connect or a close running to its full
//! deadline never stalls lifecycle work for unrelated identities.
//! Session bodies need no locking of their own — each store has exactly
//! one writer, its session's listener task.

use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex, RwLock};
use std::time::Duration;

use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use gridlink_cluster::{ClusterConnect, ClusterSession, SessionHandle, SessionState};
use gridlink_core::{ConnectionConfig, ResourceId};
use gridlink_trigger::ReconcileTrigger;

use crate::error::{ManagerError, ManagerResult};

/// Default deadline for a graceful session close.
const DEFAULT_STOP_DEADLINE: Duration = Duration::from_secs(10);

struct Slot {
    /// `None` only transiently while a replacement is being started;
    /// the handle stays so readers keep a consistent (if stale) view.
    session: Option<ClusterSession>,
    handle: SessionHandle,
    config: ConnectionConfig,
}

/// Owns every cluster session in the process, keyed by resource identity.
pub struct SessionManager<C: ClusterConnect> {
    connector: C,
    trigger: ReconcileTrigger,
    registry: RwLock<HashMap<ResourceId, Slot>>,
    /// Per-identity locks serializing ensure/remove across their awaits.
    ops: StdMutex<HashMap<ResourceId, Arc<Mutex<()>>>>,
    stop_deadline: Duration,
}

impl<C: ClusterConnect> SessionManager<C> {
    /// Create a manager that opens connections through `connector` and
    /// hands `trigger` to every session it starts.
    pub fn new(connector: C, trigger: ReconcileTrigger) -> Self {
        Self {
            connector,
            trigger,
            registry: RwLock::new(HashMap::new()),
            ops: StdMutex::new(HashMap::new()),
            stop_deadline: DEFAULT_STOP_DEADLINE,
        }
    }

    /// Set the graceful-close deadline used for stops and restarts.
    pub fn with_stop_deadline(mut self, deadline: Duration) -> Self {
        self.stop_deadline = deadline;
        self
    }

    /// Fetch (or create) the lifecycle lock for one identity. Concurrent
    /// callers for the same identity get the same lock; everyone else is
    /// untouched.
    fn op_lock(&self, resource: &ResourceId) -> Arc<Mutex<()>> {
        let mut ops = self.ops.lock().unwrap();
        ops.entry(resource.clone()).or_default().clone()
    }

    /// Drop an identity's lifecycle lock once no other caller holds it.
    /// A strong count of two means the map's clone and ours: cloning only
    /// happens under the `ops` mutex, so the check cannot race a new
    /// waiter.
    fn release_op_lock(&self, resource: &ResourceId, lock: &Arc<Mutex<()>>) {
        let mut ops = self.ops.lock().unwrap();
        if Arc::strong_count(lock) == 2 {
            ops.remove(resource);
        }
    }

    /// Make sure exactly one live session exists for `resource` with
    /// `config`.
    ///
    /// Idempotent when an up-to-date live session exists. When the config
    /// changed, or the existing session is degraded, the old session is
    /// stopped first and a replacement started; readers holding the old
    /// membership view keep seeing its last consistent state throughout.
    ///
    /// A failed first start leaves the identity absent; a failed restart
    /// keeps the dead slot registered (stale handle, no session) so the
    /// reconnect loop can keep trying. Either way the error is returned —
    /// retry policy belongs to the caller.
    pub async fn ensure(
        &self,
        resource: ResourceId,
        config: ConnectionConfig,
    ) -> ManagerResult<()> {
        let lock = self.op_lock(&resource);
        let _guard = lock.lock().await;

        {
            let registry = self.registry.read().unwrap();
            if let Some(slot) = registry.get(&resource) {
                if slot.config == config && slot.handle.state() == SessionState::Live {
                    debug!(%resource, "session up to date");
                    return Ok(());
                }
            }
        }

        // Stop the old session, if any, before starting its replacement.
        // The slot (and its handle) stays registered meanwhile.
        let old = {
            let mut registry = self.registry.write().unwrap();
            registry
                .get_mut(&resource)
                .and_then(|slot| slot.session.take())
        };
        if let Some(old) = old {
            info!(%resource, "replacing cluster session");
            if let Err(e) = old.stop(self.stop_deadline).await {
                warn!(%resource, error = %e, "old session did not stop cleanly");
            }
        }

        match ClusterSession::start(&self.connector, resource.clone(), &config, self.trigger.clone())
            .await
        {
            Ok(session) => {
                let handle = session.handle();
                self.registry.write().unwrap().insert(
                    resource,
                    Slot {
                        session: Some(session),
                        handle,
                        config,
                    },
                );
                Ok(())
            }
            Err(source) => {
                // If this was a restart, keep the slot: readers keep the
                // stale handle and the reconnect loop keeps the identity
                // on its radar. A fresh ensure never registered anything,
                // so its lock goes too.
                let slot_kept = {
                    let mut registry = self.registry.write().unwrap();
                    match registry.get_mut(&resource) {
                        Some(slot) => {
                            slot.config = config;
                            true
                        }
                        None => false,
                    }
                };
                if !slot_kept {
                    self.release_op_lock(&resource, &lock);
                }
                Err(ManagerError::Start { resource, source })
            }
        }
    }

    /// Stop and unregister the session for `resource`.
    ///
    /// Returns whether a session was registered. Idempotent; a shutdown
    /// timeout is logged and absorbed, the identity ends up absent either
    /// way.
    pub async fn remove(&self, resource: &ResourceId) -> bool {
        let lock = self.op_lock(resource);
        let guard = lock.lock().await;

        let slot = self.registry.write().unwrap().remove(resource);
        let removed = match slot {
            Some(slot) => {
                if let Some(session) = slot.session {
                    if let Err(e) = session.stop(self.stop_deadline).await {
                        warn!(%resource, error = %e, "session stop failed during remove");
                    }
                }
                info!(%resource, "session removed");
                true
            }
            None => false,
        };
        drop(guard);
        self.release_op_lock(resource, &lock);
        removed
    }

    /// Non-blocking lookup for status-reporting code.
    pub fn get(&self, resource: &ResourceId) -> Option<SessionHandle> {
        self.registry
            .read()
            .unwrap()
            .get(resource)
            .map(|slot| slot.handle.clone())
    }

    /// Handles for every registered session.
    pub fn handles(&self) -> Vec<SessionHandle> {
        self.registry
            .read()
            .unwrap()
            .values()
            .map(|slot| slot.handle.clone())
            .collect()
    }

    /// Number of registered sessions.
    pub fn len(&self) -> usize {
        self.registry.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Stop every session (graceful process teardown). Each identity is
    /// stopped under its own lifecycle lock, so in-flight ensures finish
    /// or lose to the removal per identity.
    pub async fn shutdown(&self) {
        let resources: Vec<ResourceId> =
            self.registry.read().unwrap().keys().cloned().collect();
        for resource in resources {
            self.remove(&resource).await;
        }
        info!("all cluster sessions stopped");
    }

    /// Identities the reconnect loop should retry: degraded sessions and
    /// slots whose restart failed, with their last-known configs.
    pub(crate) fn needs_reconnect(&self) -> Vec<(ResourceId, ConnectionConfig)> {
        self.registry
            .read()
            .unwrap()
            .iter()
            .filter(|(_, slot)| {
                slot.session.is_none() || slot.handle.state() == SessionState::Degraded
            })
            .map(|(resource, slot)| (resource.clone(), slot.config.clone()))
            .collect()
    }
}
