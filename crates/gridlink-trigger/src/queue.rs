//! Drop-oldest signal queue.
//!
//! `tokio::sync::mpsc` can only reject the *newest* element when full, so
//! the ring here is a mutex-guarded `VecDeque` with a `Notify` for the
//! async consumer. The mutex is held only for a push or pop; `emit` never
//! awaits.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::Notify;
use tracing::warn;

use gridlink_core::ResourceId;

/// Default signal buffer capacity.
///
/// A mass topology change on a large cluster emits one signal per member
/// event; the buffer only needs to outlast the consumer's dedup cycle,
/// not hold the whole burst.
pub const DEFAULT_CAPACITY: usize = 64;

struct Ring {
    queue: VecDeque<ResourceId>,
    /// Signals discarded because the consumer fell behind.
    dropped: u64,
}

struct Shared {
    ring: Mutex<Ring>,
    notify: Notify,
    senders: AtomicUsize,
}

/// Create a reconcile signal channel with the given buffer capacity.
///
/// The trigger half is `Clone`; the receiver half is single-consumer.
pub fn reconcile_channel(capacity: usize) -> (ReconcileTrigger, TriggerReceiver) {
    assert!(capacity > 0, "signal buffer capacity must be non-zero");
    let shared = Arc::new(Shared {
        ring: Mutex::new(Ring {
            queue: VecDeque::with_capacity(capacity),
            dropped: 0,
        }),
        notify: Notify::new(),
        senders: AtomicUsize::new(1),
    });
    (
        ReconcileTrigger {
            shared: shared.clone(),
            capacity,
        },
        TriggerReceiver { shared },
    )
}

/// Producer half: posts reconcile signals without ever blocking.
pub struct ReconcileTrigger {
    shared: Arc<Shared>,
    capacity: usize,
}

impl ReconcileTrigger {
    /// Post one reconcile signal for `resource`.
    ///
    /// Returns immediately in all cases. If the buffer is full the oldest
    /// queued signal is discarded to make room; the discard is counted and
    /// logged, not surfaced as an error (the consumer coalesces by
    /// identity, so at-least-once still holds for the newest state).
    pub fn emit(&self, resource: ResourceId) {
        {
            let mut ring = self.shared.ring.lock().unwrap();
            if ring.queue.len() == self.capacity {
                let evicted = ring.queue.pop_front();
                ring.dropped += 1;
                warn!(
                    evicted = %evicted.map(|r| r.to_string()).unwrap_or_default(),
                    dropped_total = ring.dropped,
                    "reconcile signal buffer full, dropped oldest"
                );
            }
            ring.queue.push_back(resource);
        }
        self.shared.notify.notify_one();
    }

    /// Total signals dropped so far due to a slow consumer.
    pub fn dropped(&self) -> u64 {
        self.shared.ring.lock().unwrap().dropped
    }

    /// Number of signals currently buffered.
    pub fn len(&self) -> usize {
        self.shared.ring.lock().unwrap().queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Clone for ReconcileTrigger {
    fn clone(&self) -> Self {
        self.shared.senders.fetch_add(1, Ordering::Relaxed);
        Self {
            shared: self.shared.clone(),
            capacity: self.capacity,
        }
    }
}

impl Drop for ReconcileTrigger {
    fn drop(&mut self) {
        if self.shared.senders.fetch_sub(1, Ordering::AcqRel) == 1 {
            // Last producer gone: wake the receiver so it can observe closure.
            self.shared.notify.notify_waiters();
        }
    }
}

/// Consumer half, handed to the embedding operator's work-queue adapter.
pub struct TriggerReceiver {
    shared: Arc<Shared>,
}

impl TriggerReceiver {
    /// Receive the next signal, waiting if the buffer is empty.
    ///
    /// Returns `None` once every [`ReconcileTrigger`] has been dropped and
    /// the buffer is drained.
    pub async fn recv(&mut self) -> Option<ResourceId> {
        loop {
            // Register interest before checking the ring so a concurrent
            // `emit` cannot slip between the check and the await.
            let notified = self.shared.notify.notified();

            if let Some(id) = self.pop() {
                return Some(id);
            }
            if self.shared.senders.load(Ordering::Acquire) == 0 {
                // A producer may have pushed right before it dropped.
                return self.pop();
            }

            notified.await;
        }
    }

    /// Pop the next buffered signal without waiting.
    pub fn try_recv(&mut self) -> Option<ResourceId> {
        self.pop()
    }

    fn pop(&self) -> Option<ResourceId> {
        self.shared.ring.lock().unwrap().queue.pop_front()
    }
}
