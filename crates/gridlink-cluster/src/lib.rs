//! gridlink-cluster — one client session per managed grid cluster.
//!
//! Provides the membership store, the connection seam to the external
//! cluster, and the session that ties them together.
//!
//! # Architecture
//!
//! ```text
//! ClusterSession (one per managed resource)
//!   ├── ClusterConnect::connect() → (connection handle, event stream)
//!   ├── listener task (sole writer of the store)
//!   │   ├── MembershipEvent::Added   → store.add()    + trigger.emit()
//!   │   ├── MembershipEvent::Removed → store.remove() + trigger.emit()
//!   │   └── stream closed            → state = Degraded
//!   └── MembershipStore
//!       └── MembershipView (read-only snapshots for status code)
//! ```
//!
//! The external cluster's membership-notification protocol is a given
//! capability behind the [`ClusterConnect`] trait; this crate never
//! speaks the wire format itself. Events arrive on an mpsc stream so the
//! connection library's threading model never touches the store: the
//! listener task is the store's only writer, everyone else reads through
//! a [`MembershipView`].

pub mod connection;
pub mod error;
pub mod membership;
pub mod session;

pub use connection::{ClusterConnect, ClusterConnection, EventStream, MembershipChange, MembershipEvent};
pub use error::{SessionError, SessionResult};
pub use membership::{MembershipStore, MembershipView};
pub use session::{ClusterSession, SessionHandle, SessionState};
