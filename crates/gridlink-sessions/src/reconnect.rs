//! Timed reconnect policy for degraded sessions.
//!
//! A session that loses its connection mid-flight parks in `Degraded`
//! and stays there — the session itself never retries. This module is
//! the optional policy that un-parks it: a background loop that sweeps
//! the registry on a fixed cadence and re-`ensure`s whatever is
//! degraded, up to a per-identity attempt budget. Operators that prefer
//! to drive reconnection from their own reconcile passes simply don't
//! run it.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use gridlink_cluster::ClusterConnect;
use gridlink_core::ResourceId;

use crate::manager::SessionManager;

/// Reconnect policy knobs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconnectPolicy {
    /// Time between sweeps over the degraded set.
    pub retry_interval: Duration,
    /// Attempts per identity before giving up; `0` means unlimited.
    /// A successful reconnect or a manual `ensure` resets the count.
    pub max_retries: u32,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            retry_interval: Duration::from_secs(10),
            max_retries: 0,
        }
    }
}

impl<C: ClusterConnect> SessionManager<C> {
    /// Run the timed reconnect loop until `shutdown` fires.
    ///
    /// Each tick re-`ensure`s every degraded session with its last-known
    /// config. Failures count against the policy's retry budget; an
    /// identity over budget is left degraded for a manual `ensure` to
    /// revive.
    pub async fn run_reconnects(
        &self,
        policy: ReconnectPolicy,
        mut shutdown: watch::Receiver<bool>,
    ) {
        let mut attempts: HashMap<ResourceId, u32> = HashMap::new();
        info!(
            interval = ?policy.retry_interval,
            max_retries = policy.max_retries,
            "reconnect loop started"
        );

        loop {
            tokio::select! {
                _ = tokio::time::sleep(policy.retry_interval) => {
                    let pending = self.needs_reconnect();
                    for (resource, config) in &pending {
                        let made = *attempts.get(resource).unwrap_or(&0);
                        if policy.max_retries != 0 && made >= policy.max_retries {
                            debug!(%resource, attempts = made, "reconnect budget exhausted");
                            continue;
                        }

                        match self.ensure(resource.clone(), config.clone()).await {
                            Ok(()) => {
                                attempts.remove(resource);
                                info!(%resource, "session reconnected");
                            }
                            Err(e) => {
                                attempts.insert(resource.clone(), made + 1);
                                warn!(
                                    %resource,
                                    attempt = made + 1,
                                    error = %e,
                                    "reconnect attempt failed"
                                );
                            }
                        }
                    }

                    // Forget counters for identities that recovered (or
                    // were removed) outside this loop.
                    let pending_ids: HashSet<ResourceId> =
                        pending.into_iter().map(|(resource, _)| resource).collect();
                    attempts.retain(|resource, _| pending_ids.contains(resource));
                }
                _ = shutdown.changed() => {
                    info!("reconnect loop shutting down");
                    break;
                }
            }
        }
    }
}
