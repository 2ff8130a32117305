//! gridlink-sessions — session lifecycle management.
//!
//! Maintains the invariant "at most one live cluster session per managed
//! resource identity". The reconcile loop calls
//! [`SessionManager::ensure`] on every pass; the manager works out
//! whether that means "nothing to do", "first connect", or "config
//! changed, reconnect". Deletion goes through
//! [`SessionManager::remove`].
//!
//! Reconnection after a mid-session disconnect is policy, not mechanism:
//! a degraded session stays degraded until either the next `ensure` or
//! the optional [`run_reconnects`](SessionManager::run_reconnects) loop
//! (driven by a [`ReconnectPolicy`]) replaces it.

pub mod error;
pub mod manager;
pub mod reconnect;
pub mod status;

pub use error::{ManagerError, ManagerResult};
pub use manager::SessionManager;
pub use reconnect::ReconnectPolicy;
pub use status::{ClusterStatus, ConnectionHealth};
