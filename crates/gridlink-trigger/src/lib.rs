//! gridlink-trigger — delivery of reconcile signals to the work queue.
//!
//! A reconcile signal is a [`ResourceId`](gridlink_core::ResourceId) and
//! nothing else: "something about this resource's cluster changed, run a
//! convergence pass". The producer is a session's listener task, which
//! runs on the cluster connection's event path and must never stall there,
//! so [`ReconcileTrigger::emit`] is non-blocking no matter how far behind
//! the consumer is.
//!
//! Delivery is at-least-once with a bounded buffer: when the consumer
//! stalls, the oldest queued signal is dropped to make room for the newest.
//! The consuming work queue deduplicates by identity, so a dropped older
//! signal for an identity that still has a newer one queued loses nothing.

mod queue;

pub use queue::{reconcile_channel, ReconcileTrigger, TriggerReceiver, DEFAULT_CAPACITY};
