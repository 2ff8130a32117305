//! End-to-end lifecycle scenarios: one fake grid cluster, a real
//! session manager, and the reconcile signal channel in between.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{mpsc, watch};

use gridlink_cluster::{
    ClusterConnect, ClusterConnection, EventStream, MembershipEvent, SessionError, SessionResult,
    SessionState,
};
use gridlink_core::{ConnectionConfig, ResourceId};
use gridlink_sessions::{ClusterStatus, ConnectionHealth, ReconnectPolicy, SessionManager};
use gridlink_trigger::{reconcile_channel, TriggerReceiver, DEFAULT_CAPACITY};

// ── Fake grid cluster ──────────────────────────────────────────────

#[derive(Default)]
struct GridState {
    connects: AtomicUsize,
    /// Connects left to reject before accepting again.
    fail_remaining: AtomicUsize,
    close_delay: Mutex<Duration>,
    /// Event senders for every accepted connection, oldest first.
    conns: Mutex<Vec<mpsc::Sender<MembershipEvent>>>,
    /// Configs seen by accepted connections, oldest first.
    configs: Mutex<Vec<ConnectionConfig>>,
}

/// Connector whose remote side the test scripts directly.
#[derive(Clone, Default)]
struct FakeGrid(Arc<GridState>);

impl FakeGrid {
    fn connect_count(&self) -> usize {
        self.0.connects.load(Ordering::SeqCst)
    }

    fn fail_next(&self, n: usize) {
        self.0.fail_remaining.store(n, Ordering::SeqCst);
    }

    fn set_close_delay(&self, delay: Duration) {
        *self.0.close_delay.lock().unwrap() = delay;
    }

    /// Deliver a membership event on the newest connection.
    async fn send(&self, event: MembershipEvent) {
        let tx = self
            .0
            .conns
            .lock()
            .unwrap()
            .last()
            .cloned()
            .expect("no live connection");
        tx.send(event).await.expect("listener gone");
    }

    /// Sever every connection without a goodbye.
    fn kill_connections(&self) {
        self.0.conns.lock().unwrap().clear();
    }

    fn last_config(&self) -> ConnectionConfig {
        self.0.configs.lock().unwrap().last().cloned().expect("no connection")
    }
}

struct FakeConn {
    close_delay: Duration,
}

#[async_trait]
impl ClusterConnect for FakeGrid {
    type Conn = FakeConn;

    async fn connect(
        &self,
        config: &ConnectionConfig,
    ) -> SessionResult<(Self::Conn, EventStream)> {
        self.0.connects.fetch_add(1, Ordering::SeqCst);

        let remaining = self.0.fail_remaining.load(Ordering::SeqCst);
        if remaining > 0 {
            self.0.fail_remaining.store(remaining - 1, Ordering::SeqCst);
            return Err(SessionError::Connect(format!(
                "cluster {} refused connection",
                config.cluster_name
            )));
        }

        let (tx, rx) = mpsc::channel(16);
        self.0.conns.lock().unwrap().push(tx);
        self.0.configs.lock().unwrap().push(config.clone());
        Ok((
            FakeConn {
                close_delay: *self.0.close_delay.lock().unwrap(),
            },
            rx,
        ))
    }
}

#[async_trait]
impl ClusterConnection for FakeConn {
    async fn close(self) -> SessionResult<()> {
        tokio::time::sleep(self.close_delay).await;
        Ok(())
    }
}

// ── Helpers ────────────────────────────────────────────────────────

fn rid(name: &str) -> ResourceId {
    ResourceId::new("default", name)
}

fn cfg(addr: &str) -> ConnectionConfig {
    ConnectionConfig::new("dev", vec![addr.to_string()])
}

fn setup() -> (FakeGrid, Arc<SessionManager<FakeGrid>>, TriggerReceiver) {
    let grid = FakeGrid::default();
    let (trigger, signals) = reconcile_channel(DEFAULT_CAPACITY);
    let manager = Arc::new(SessionManager::new(grid.clone(), trigger));
    (grid, manager, signals)
}

/// Poll until the session for `resource` reports `state`.
async fn wait_for_state(
    manager: &SessionManager<FakeGrid>,
    resource: &ResourceId,
    state: SessionState,
) {
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            if manager.get(resource).map(|h| h.state()) == Some(state) {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .unwrap_or_else(|_| panic!("session never reached {state:?}"));
}

// ── Scenarios ──────────────────────────────────────────────────────

#[tokio::test]
async fn membership_changes_flow_to_store_and_signals() {
    let (grid, manager, mut signals) = setup();
    let id = rid("grid-a");

    manager.ensure(id.clone(), cfg("10.0.0.1:5701")).await.unwrap();
    let handle = manager.get(&id).unwrap();

    grid.send(MembershipEvent::added("m1")).await;
    assert_eq!(signals.recv().await, Some(id.clone()));
    assert_eq!(handle.membership().snapshot(), vec!["m1".into()]);

    grid.send(MembershipEvent::added("m2")).await;
    assert_eq!(signals.recv().await, Some(id.clone()));
    assert_eq!(handle.membership().snapshot(), vec!["m1".into(), "m2".into()]);

    grid.send(MembershipEvent::removed("m1")).await;
    assert_eq!(signals.recv().await, Some(id.clone()));
    assert_eq!(handle.membership().snapshot(), vec!["m2".into()]);

    // Exactly three signals, nothing buffered beyond them.
    assert_eq!(signals.try_recv(), None);
}

#[tokio::test]
async fn concurrent_ensure_creates_exactly_one_session() {
    let (grid, manager, _signals) = setup();
    let id = rid("grid-a");

    let (a, b) = tokio::join!(
        manager.ensure(id.clone(), cfg("10.0.0.1:5701")),
        manager.ensure(id.clone(), cfg("10.0.0.1:5701")),
    );
    a.unwrap();
    b.unwrap();

    assert_eq!(grid.connect_count(), 1);
    assert_eq!(manager.len(), 1);
}

#[tokio::test]
async fn config_change_swaps_session_without_tearing_views() {
    let (grid, manager, mut signals) = setup();
    let id = rid("grid-a");

    manager.ensure(id.clone(), cfg("10.0.0.1:5701")).await.unwrap();
    grid.send(MembershipEvent::added("m1")).await;
    assert_eq!(signals.recv().await, Some(id.clone()));

    let old_handle = manager.get(&id).unwrap();
    assert_eq!(old_handle.membership().snapshot(), vec!["m1".into()]);

    manager.ensure(id.clone(), cfg("10.0.0.9:5701")).await.unwrap();
    assert_eq!(grid.connect_count(), 2);
    assert_eq!(grid.last_config().addresses, vec!["10.0.0.9:5701".to_string()]);

    // New session, fresh store, live.
    let new_handle = manager.get(&id).unwrap();
    assert_eq!(new_handle.state(), SessionState::Live);
    assert!(new_handle.membership().is_empty());

    // The old view is stale but consistent — still the pre-swap set.
    assert_eq!(old_handle.membership().snapshot(), vec!["m1".into()]);
}

#[tokio::test]
async fn disconnect_degrades_and_reconnect_loop_revives() {
    let (grid, manager, mut signals) = setup();
    let id = rid("grid-a");

    manager.ensure(id.clone(), cfg("10.0.0.1:5701")).await.unwrap();
    grid.send(MembershipEvent::added("m1")).await;
    assert_eq!(signals.recv().await, Some(id.clone()));

    grid.kill_connections();
    wait_for_state(&manager, &id, SessionState::Degraded).await;

    // Degraded status reports last-known members.
    let status = ClusterStatus::from_handle(&manager.get(&id).unwrap());
    assert_eq!(status.connection, ConnectionHealth::Degraded);
    assert_eq!(status.member_count, 1);

    let (stop_tx, stop_rx) = watch::channel(false);
    let policy = ReconnectPolicy {
        retry_interval: Duration::from_millis(20),
        max_retries: 0,
    };
    let worker = {
        let manager = manager.clone();
        tokio::spawn(async move { manager.run_reconnects(policy, stop_rx).await })
    };

    wait_for_state(&manager, &id, SessionState::Live).await;
    assert_eq!(grid.connect_count(), 2);

    // The replacement session reports current membership again.
    grid.send(MembershipEvent::added("m2")).await;
    assert_eq!(signals.recv().await, Some(id.clone()));
    assert_eq!(
        manager.get(&id).unwrap().membership().snapshot(),
        vec!["m2".into()]
    );

    stop_tx.send(true).unwrap();
    worker.await.unwrap();
}

#[tokio::test]
async fn reconnect_budget_gives_up_until_manual_ensure() {
    let (grid, manager, _signals) = setup();
    let id = rid("grid-a");

    manager.ensure(id.clone(), cfg("10.0.0.1:5701")).await.unwrap();
    grid.kill_connections();
    wait_for_state(&manager, &id, SessionState::Degraded).await;

    // Every reconnect attempt fails; the budget allows exactly one.
    grid.fail_next(usize::MAX);
    let (stop_tx, stop_rx) = watch::channel(false);
    let policy = ReconnectPolicy {
        retry_interval: Duration::from_millis(20),
        max_retries: 1,
    };
    let worker = {
        let manager = manager.clone();
        tokio::spawn(async move { manager.run_reconnects(policy, stop_rx).await })
    };

    tokio::time::sleep(Duration::from_millis(300)).await;
    stop_tx.send(true).unwrap();
    worker.await.unwrap();

    // Initial connect plus the single budgeted retry.
    assert_eq!(grid.connect_count(), 2);
    assert!(manager.get(&id).is_some());

    // The dead slot stays registered after the budget runs out; a manual
    // ensure replaces it with a live session.
    grid.fail_next(0);
    manager.ensure(id.clone(), cfg("10.0.0.1:5701")).await.unwrap();
    assert_eq!(manager.get(&id).unwrap().state(), SessionState::Live);
}

#[tokio::test(start_paused = true)]
async fn remove_is_bounded_when_close_hangs() {
    let grid = FakeGrid::default();
    let (trigger, _signals) = reconcile_channel(8);
    let id = rid("grid-a");

    grid.set_close_delay(Duration::from_secs(3600));
    let manager = SessionManager::new(grid.clone(), trigger)
        .with_stop_deadline(Duration::from_millis(100));

    manager.ensure(id.clone(), cfg("10.0.0.1:5701")).await.unwrap();
    assert!(manager.remove(&id).await);
    // Absent despite the hung close; the timeout was logged, not raised.
    assert!(manager.get(&id).is_none());
}

#[tokio::test]
async fn failed_ensure_surfaces_connect_error_and_leaves_absent() {
    let (grid, manager, _signals) = setup();
    let id = rid("grid-a");

    grid.fail_next(1);
    let err = manager.ensure(id.clone(), cfg("10.0.0.1:5701")).await.unwrap_err();
    assert!(err.to_string().contains("refused connection"));
    assert!(manager.get(&id).is_none());

    // Next attempt succeeds.
    manager.ensure(id.clone(), cfg("10.0.0.1:5701")).await.unwrap();
    assert_eq!(manager.get(&id).unwrap().state(), SessionState::Live);
}

#[tokio::test]
async fn sessions_for_different_resources_are_independent() {
    let (grid, manager, mut signals) = setup();
    let a = rid("grid-a");
    let b = rid("grid-b");

    manager.ensure(a.clone(), cfg("10.0.0.1:5701")).await.unwrap();
    manager.ensure(b.clone(), cfg("10.0.0.2:5701")).await.unwrap();
    assert_eq!(manager.len(), 2);
    assert!(manager
        .handles()
        .iter()
        .all(|h| h.state() == SessionState::Live));

    // Only the newest connection (b's) receives this event; a stays empty.
    grid.send(MembershipEvent::added("m1")).await;
    assert_eq!(signals.recv().await, Some(b.clone()));
    assert!(manager.get(&a).unwrap().membership().is_empty());
    assert_eq!(manager.get(&b).unwrap().membership().len(), 1);

    manager.shutdown().await;
    assert!(manager.is_empty());
}
